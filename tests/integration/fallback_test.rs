//! Behaviour when the SQLite store cannot be used.

use crate::{config_in, temp_gateway};
use farmtrack::routes::progress::{build_history, start_progress};
use farmtrack::routes::Route;
use farmtrack::storage::blob_store::{CURRENT_ROUTE_ID_KEY, ROUTES_KEY};
use farmtrack::storage::RouteStore;
use farmtrack::PersistenceGateway;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn route(id: &str, name: &str) -> Route {
    Route {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        stops: vec![],
        completed_runs: 0,
        auto_inventory_checks: false,
    }
}

/// Make the database path unusable by putting a directory there.
fn block_database(dir: &Path) {
    let db_path = config_in(dir).database_path();
    if db_path.exists() {
        fs::remove_file(&db_path).unwrap();
    }
    fs::create_dir_all(&db_path).unwrap();
}

#[test]
fn test_unopenable_database_reports_unreliable() {
    let dir = TempDir::new().unwrap();
    block_database(dir.path());

    let gateway = PersistenceGateway::open(&config_in(dir.path())).unwrap();
    let health = gateway.storage_health();
    assert!(!health.reliable);
    assert!(health.error.is_some());
}

#[test]
fn test_fallback_only_round_trip() {
    let dir = TempDir::new().unwrap();
    block_database(dir.path());
    let gateway = PersistenceGateway::open(&config_in(dir.path())).unwrap();

    gateway.save_route(&route("A", "Alpha")).unwrap();
    gateway.save_current_route_id(Some("A")).unwrap();

    assert_eq!(gateway.load_routes(), vec![route("A", "Alpha")]);
    assert_eq!(gateway.load_current_route_id(), Some("A".to_string()));
    assert_eq!(
        gateway.fallback().get_raw(CURRENT_ROUTE_ID_KEY).unwrap().as_deref(),
        Some("A")
    );
}

#[test]
fn test_mirrored_routes_survive_database_loss() {
    let (dir, gateway) = temp_gateway();
    gateway.save_route(&route("A", "Alpha")).unwrap();
    gateway.save_route(&route("B", "Beta")).unwrap();
    assert!(gateway.fallback().get_raw(ROUTES_KEY).unwrap().is_some());
    drop(gateway);

    block_database(dir.path());
    let degraded = PersistenceGateway::open(&config_in(dir.path())).unwrap();
    assert!(!degraded.storage_health().reliable);

    let names: Vec<String> = degraded.load_routes().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
}

#[test]
fn test_fallback_history_respects_configured_limit() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[storage]\nfallback_history_limit = 2\n",
    )
    .unwrap();
    let gateway = PersistenceGateway::open(&config_in(dir.path())).unwrap();

    let progress = start_progress(&route("A", "Alpha"), 0);
    for start in 0..4 {
        let mut history = build_history(&progress, 10);
        history.start_time = start;
        gateway.save_route_history(&history).unwrap();
    }

    // Primary keeps everything, the fallback only the newest
    assert_eq!(gateway.load_all_route_history().len(), 4);
    let mirrored: Vec<i64> = gateway
        .fallback()
        .load_all_history()
        .unwrap()
        .iter()
        .map(|h| h.start_time)
        .collect();
    assert_eq!(mirrored, vec![2, 3]);
}

#[test]
fn test_deletes_reach_both_engines() {
    let (_dir, gateway) = temp_gateway();
    gateway.save_route(&route("A", "Alpha")).unwrap();
    let history = build_history(&start_progress(&route("A", "Alpha"), 0), 5);
    gateway.save_route_history(&history).unwrap();

    gateway.delete_route("A").unwrap();
    gateway.delete_all_route_history_by_route_id("A").unwrap();

    assert!(gateway.load_routes().is_empty());
    assert!(gateway.fallback().load_routes().unwrap().is_empty());
    assert!(gateway.load_all_route_history().is_empty());
    assert!(gateway.fallback().load_all_history().unwrap().is_empty());
}
