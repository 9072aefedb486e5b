//! Route export and import.
//!
//! The document format is shared with other tools:
//!
//! ```json
//! { "routes": [...], "currentRouteId": "R" | null, "activeTracking": {...} | null,
//!   "version": "0.1.0", "exportDate": "2026-01-01T00:00:00.000Z" }
//! ```
//!
//! Import only touches routes. The session fields are carried for completeness
//! and ignored on the way in, so `activeTracking` is kept as raw JSON and never
//! validated.

use crate::routes::types::Route;
use crate::storage::{PersistenceGateway, StorageError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// A full export of the route collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub routes: Vec<Route>,
    #[serde(default)]
    pub current_route_id: Option<String>,
    /// Active run as written by the exporting side; not interpreted on import
    #[serde(default)]
    pub active_tracking: Option<serde_json::Value>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub export_date: String,
}

/// How imported routes combine with the stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Imported ids overwrite stored ones in place, new ids are appended
    Merge,
    /// The imported array supersedes the stored one
    Replace,
}

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Routes written
    pub saved: usize,
    /// Stored routes removed in replace mode
    pub removed: usize,
}

/// Export and import errors.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Invalid import file: {0}")]
    InvalidDocument(String),

    #[error("Failed to write export: {0}")]
    WriteFailed(String),

    #[error("Failed to read import: {0}")]
    ReadFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Snapshot everything the gateway holds into an export document.
pub fn export_document(gateway: &PersistenceGateway) -> ExportDocument {
    ExportDocument {
        routes: gateway.load_routes(),
        current_route_id: gateway.load_current_route_id(),
        active_tracking: gateway
            .load_active_tracking()
            .and_then(|progress| serde_json::to_value(progress).ok()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Write `doc` as pretty JSON to `path`.
pub fn write_export(doc: &ExportDocument, path: &Path) -> Result<(), TransferError> {
    let json =
        serde_json::to_string_pretty(doc).map_err(|e| TransferError::WriteFailed(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| TransferError::WriteFailed(e.to_string()))?;
    tracing::info!("Exported {} routes to {}", doc.routes.len(), path.display());
    Ok(())
}

/// Parse an import document, rejecting anything without a `routes` array.
pub fn parse_import(json: &str) -> Result<ExportDocument, TransferError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| TransferError::InvalidDocument(e.to_string()))?;

    if !value.get("routes").is_some_and(|r| r.is_array()) {
        return Err(TransferError::InvalidDocument(
            "missing routes array".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| TransferError::InvalidDocument(e.to_string()))
}

/// Read and parse an import file.
pub fn read_import(path: &Path) -> Result<ExportDocument, TransferError> {
    let json = std::fs::read_to_string(path).map_err(|e| TransferError::ReadFailed(e.to_string()))?;
    parse_import(&json)
}

/// Combine stored and imported routes.
pub fn merge_routes(existing: &[Route], imported: &[Route], mode: ImportMode) -> Vec<Route> {
    match mode {
        ImportMode::Replace => imported.to_vec(),
        ImportMode::Merge => {
            let mut merged = existing.to_vec();
            for route in imported {
                match merged.iter_mut().find(|r| r.id == route.id) {
                    Some(slot) => *slot = route.clone(),
                    None => merged.push(route.clone()),
                }
            }
            merged
        }
    }
}

/// Persist the routes of `doc` according to `mode`.
///
/// Stops at the first storage error; routes already written stay written.
pub fn apply_import(
    gateway: &PersistenceGateway,
    doc: &ExportDocument,
    mode: ImportMode,
) -> Result<ImportSummary, TransferError> {
    let existing = gateway.load_routes();
    let merged = merge_routes(&existing, &doc.routes, mode);
    let mut summary = ImportSummary::default();

    for route in &merged {
        gateway.save_route(route)?;
        summary.saved += 1;
    }

    if mode == ImportMode::Replace {
        let kept: HashSet<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        for stale in existing.iter().filter(|r| !kept.contains(r.id.as_str())) {
            gateway.delete_route(&stale.id)?;
            summary.removed += 1;
        }
    }

    tracing::info!(
        "Imported {} routes ({} removed)",
        summary.saved,
        summary.removed
    );
    Ok(summary)
}
