//! FarmTrack command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use farmtrack::routes::queries::{calculate_progress, format_duration};
use farmtrack::routes::progress::elapsed_ms;
use farmtrack::storage::config::{get_data_dir, load_config_from};
use farmtrack::transfer::{self, ImportMode};
use farmtrack::PersistenceGateway;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::{Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(get_data_dir);
    let config = load_config_from(&data_dir.join("config.toml"), data_dir)
        .context("Failed to load configuration")?;

    tracing::debug!("Starting FarmTrack v{}", config.version);

    let gateway = PersistenceGateway::open(&config).context("Failed to open storage")?;

    match cli.command {
        Command::Status => status(&gateway),
        Command::Routes => {
            for route in gateway.load_routes() {
                println!(
                    "{}\t{}\t{} stops\t{} items\t{} runs",
                    route.id,
                    route.name,
                    route.stops.len(),
                    route.item_count(),
                    route.completed_runs
                );
            }
        }
        Command::History { route } => {
            let histories = match route {
                Some(route_id) => gateway.load_route_history_by_route_id(&route_id),
                None => gateway.load_all_route_history(),
            };
            for h in histories {
                let collected = h.collected_items.values().filter(|c| **c).count();
                println!(
                    "{}\t{}\t{}\t{} collected",
                    h.id,
                    h.route_name,
                    format_duration(h.duration),
                    collected
                );
            }
        }
        Command::Export { path } => {
            let doc = transfer::export_document(&gateway);
            transfer::write_export(&doc, &path)?;
            println!("Exported {} routes to {}", doc.routes.len(), path.display());
        }
        Command::Import { path, replace } => {
            let doc = transfer::read_import(&path)?;
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Merge
            };
            let summary = transfer::apply_import(&gateway, &doc, mode)?;
            println!(
                "Imported {} routes, removed {}",
                summary.saved, summary.removed
            );
        }
        Command::ForgetHistory { route_id } => {
            gateway
                .delete_all_route_history_by_route_id(&route_id)
                .with_context(|| format!("Failed to delete history of {}", route_id))?;
            println!("Deleted history of {}", route_id);
        }
    }

    Ok(())
}

fn status(gateway: &PersistenceGateway) {
    let health = gateway.storage_health();
    if health.reliable {
        println!("Storage: ok");
    } else {
        println!(
            "Storage: degraded ({})",
            health.error.as_deref().unwrap_or("unknown error")
        );
    }

    match gateway.load_active_tracking() {
        Some(progress) => {
            let now = chrono::Utc::now().timestamp_millis();
            let stop = progress
                .route
                .stops
                .get(progress.current_stop_index)
                .map(|s| s.name.as_str())
                .unwrap_or("-");
            println!(
                "Active run: {} at {} ({}%, {})",
                progress.route.name,
                stop,
                calculate_progress(&progress.route, &progress.collected_items),
                format_duration(elapsed_ms(&progress, now))
            );
        }
        None => println!("No active run"),
    }
}
