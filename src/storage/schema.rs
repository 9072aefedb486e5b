//! Versioned schema for the primary store.
//!
//! Steps run in ascending order, each only when the stored version is below
//! its own. Steps 2 and 3 drop `active_tracking` outright: the key layout
//! changed twice and any session stored under an older layout is discarded.

use crate::storage::error::StorageError;
use rusqlite::{params, Connection};

/// Latest schema version.
pub const CURRENT_VERSION: i32 = 4;

/// Bookkeeping table, created before any step runs.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#;

/// One schema upgrade step.
pub struct Migration {
    /// Version reached after this step
    pub version: i32,
    /// Short label recorded in `schema_version`
    pub name: &'static str,
    /// Applies the step
    pub apply: fn(&Connection) -> rusqlite::Result<()>,
}

/// All steps, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_stores",
        apply: initial_stores,
    },
    Migration {
        version: 2,
        name: "recreate_active_tracking",
        apply: recreate_active_tracking,
    },
    Migration {
        version: 3,
        name: "active_tracking_by_route",
        apply: active_tracking_by_route,
    },
    Migration {
        version: 4,
        name: "route_history",
        apply: route_history,
    },
];

fn initial_stores(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS routes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            data_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_routes_name ON routes(name);

        -- Singleton pointer
        CREATE TABLE IF NOT EXISTS current_route_id (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            route_id TEXT NOT NULL
        );

        -- Legacy, not read by current code
        CREATE TABLE IF NOT EXISTS item_inventory (
            item_name TEXT PRIMARY KEY,
            count INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
}

fn recreate_active_tracking(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS active_tracking;
        CREATE TABLE active_tracking (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            route_id TEXT,
            data_json TEXT NOT NULL
        );
        "#,
    )
}

fn active_tracking_by_route(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS active_tracking;
        CREATE TABLE active_tracking (
            route_id TEXT PRIMARY KEY,
            data_json TEXT NOT NULL,
            saved_at TEXT NOT NULL
        );
        "#,
    )
}

fn route_history(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS route_history (
            id TEXT PRIMARY KEY,
            route_id TEXT NOT NULL,
            start_time INTEGER NOT NULL,
            data_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_route_history_route_id ON route_history(route_id);
        CREATE INDEX IF NOT EXISTS idx_route_history_start_time ON route_history(start_time);
        "#,
    )
}

/// Highest applied version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<i32, StorageError> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StorageError::QueryFailed(e.to_string()))
}

/// Bring the schema up to `target`, returning the resulting version.
///
/// All pending steps run in a single transaction.
pub fn migrate(conn: &Connection, target: i32) -> Result<i32, StorageError> {
    conn.execute_batch(SCHEMA_VERSION_TABLE)
        .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

    let from_version = schema_version(conn)?;
    if from_version >= target {
        return Ok(from_version);
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;

    let mut reached = from_version;
    for step in MIGRATIONS
        .iter()
        .filter(|m| m.version > from_version && m.version <= target)
    {
        (step.apply)(&tx).map_err(|e| {
            StorageError::MigrationFailed(format!("v{} ({}): {}", step.version, step.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_version (version, name, applied_at) VALUES (?1, ?2, datetime('now'))",
            params![step.version, step.name],
        )
        .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        reached = step.version;
        tracing::info!("Applied schema migration v{} ({})", step.version, step.name);
    }

    tx.commit()
        .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;

    Ok(reached)
}
