use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "farmtrack", about = "Track resource-farming routes", version)]
pub struct Cli {
    /// Data directory (default: platform data dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show storage health and the active run
    Status,

    /// List stored routes
    Routes,

    /// List completed runs
    History {
        /// Only runs of this route
        #[arg(long)]
        route: Option<String>,
    },

    /// Export routes to a JSON file
    Export {
        /// Output file
        path: PathBuf,
    },

    /// Import routes from a JSON file
    Import {
        /// Input file
        path: PathBuf,

        /// Replace stored routes instead of merging
        #[arg(long)]
        replace: bool,
    },

    /// Delete every history entry of a route
    ForgetHistory {
        /// Route id
        route_id: String,
    },
}
