//! Export and import through the gateway.

use crate::temp_gateway;
use farmtrack::routes::Route;
use farmtrack::transfer::{
    apply_import, export_document, parse_import, read_import, write_export, ImportMode,
    TransferError,
};

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

const IMPORT: &str = r#"{
  "routes": [{"id":"A","name":"New"},{"id":"B","name":"Brand New"}],
  "currentRouteId": null,
  "activeTracking": null,
  "version": "1.0.0",
  "exportDate": "2026-03-01T12:00:00.000Z"
}"#;

#[test]
fn test_merge_import() {
    let (_dir, gateway) = temp_gateway();
    gateway.save_route(&route("A", "Old")).unwrap();

    let doc = parse_import(IMPORT).unwrap();
    let summary = apply_import(&gateway, &doc, ImportMode::Merge).unwrap();

    assert_eq!(summary.saved, 2);
    assert_eq!(summary.removed, 0);
    assert_eq!(gateway.load_routes(), vec![route("A", "New"), route("B", "Brand New")]);
}

#[test]
fn test_replace_import_removes_absent_routes() {
    let (_dir, gateway) = temp_gateway();
    gateway.save_route(&route("A", "Old")).unwrap();
    gateway.save_route(&route("C", "Stale")).unwrap();

    let doc = parse_import(IMPORT).unwrap();
    let summary = apply_import(&gateway, &doc, ImportMode::Replace).unwrap();

    assert_eq!(summary.removed, 1);
    assert_eq!(gateway.load_routes(), vec![route("A", "New"), route("B", "Brand New")]);
    assert_eq!(
        farmtrack::storage::RouteStore::load_routes(gateway.fallback()).unwrap(),
        vec![route("A", "New"), route("B", "Brand New")]
    );
}

#[test]
fn test_invalid_import_writes_nothing() {
    let (dir, gateway) = temp_gateway();
    gateway.save_route(&route("A", "Old")).unwrap();

    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"{"version":"1.0.0"}"#).unwrap();

    assert!(matches!(
        read_import(&path),
        Err(TransferError::InvalidDocument(_))
    ));
    assert_eq!(gateway.load_routes(), vec![route("A", "Old")]);
}

#[test]
fn test_export_then_import_elsewhere() {
    let (dir, source) = temp_gateway();
    source.save_route(&route("A", "Alpha")).unwrap();
    source.save_current_route_id(Some("A")).unwrap();

    let path = dir.path().join("export.json");
    let doc = export_document(&source);
    assert_eq!(doc.current_route_id.as_deref(), Some("A"));
    assert!(!doc.export_date.is_empty());
    write_export(&doc, &path).unwrap();

    let (_other, target) = temp_gateway();
    let imported = read_import(&path).unwrap();
    apply_import(&target, &imported, ImportMode::Merge).unwrap();

    assert_eq!(target.load_routes(), vec![route("A", "Alpha")]);
    assert_eq!(target.load_current_route_id(), None);
}

#[test]
fn test_import_ignores_foreign_session_shape() {
    let (_dir, gateway) = temp_gateway();
    let doc = parse_import(
        r#"{
          "routes": [{"id":"A","name":"Alpha"}],
          "currentRouteId": "A",
          "activeTracking": {"routeId": "A", "startTime": 5, "currentStopIndex": 0},
          "version": "1.0.0",
          "exportDate": "2026-03-01T12:00:00.000Z"
        }"#,
    )
    .unwrap();

    apply_import(&gateway, &doc, ImportMode::Merge).unwrap();
    assert_eq!(gateway.load_routes(), vec![route("A", "Alpha")]);
    assert_eq!(gateway.load_active_tracking(), None);
}
