//! Integration test modules.

mod fallback_test;
mod run_lifecycle_test;
mod transfer_test;

use farmtrack::storage::config::load_config_from;
use farmtrack::{AppConfig, PersistenceGateway};
use std::path::Path;
use tempfile::TempDir;

/// Config rooted in `dir`.
pub fn config_in(dir: &Path) -> AppConfig {
    load_config_from(&dir.join("config.toml"), dir.to_path_buf()).unwrap()
}

/// Gateway over both engines in a fresh data directory.
pub fn temp_gateway() -> (TempDir, PersistenceGateway) {
    let dir = TempDir::new().unwrap();
    let gateway = PersistenceGateway::open(&config_in(dir.path())).unwrap();
    (dir, gateway)
}
