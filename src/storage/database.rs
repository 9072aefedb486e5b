//! Primary store backed by SQLite.
//!
//! Each record is kept as a JSON document in `data_json`, with the columns the
//! indexes need stored alongside it.

use crate::routes::types::{Route, RouteHistory, RouteProgress};
use crate::storage::error::StorageError;
use crate::storage::schema::{self, CURRENT_VERSION};
use crate::storage::RouteStore;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Apply pending schema migrations.
    fn initialize(&self) -> Result<(), StorageError> {
        let version = schema::migrate(&self.conn, CURRENT_VERSION)?;
        tracing::debug!("Database schema at version {}", version);
        Ok(())
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> Result<i32, StorageError> {
        schema::schema_version(&self.conn)
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_documents<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<T>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params, |row| row.get::<_, String>(0))
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let mut documents = Vec::new();
        for row in rows {
            let json = row.map_err(|e| StorageError::QueryFailed(e.to_string()))?;
            documents.push(from_json(&json)?);
        }
        Ok(documents)
    }
}

impl RouteStore for Database {
    fn engine_name(&self) -> &'static str {
        "sqlite"
    }

    fn probe(&self) -> Result<(), StorageError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM routes", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    // ========== Routes ==========

    fn load_routes(&self) -> Result<Vec<Route>, StorageError> {
        self.query_documents("SELECT data_json FROM routes ORDER BY rowid", &[])
    }

    fn get_route(&self, id: &str) -> Result<Option<Route>, StorageError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT data_json FROM routes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        json.as_deref().map(from_json).transpose()
    }

    fn put_route(&self, route: &Route) -> Result<(), StorageError> {
        let data_json = to_json(route)?;
        self.conn
            .execute(
                "INSERT INTO routes (id, name, data_json, updated_at)
                 VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    data_json = excluded.data_json,
                    updated_at = excluded.updated_at",
                params![route.id, route.name, data_json],
            )
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn delete_route(&self, id: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM routes WHERE id = ?1", params![id])
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    // ========== Current route pointer ==========

    fn load_current_route_id(&self) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row(
                "SELECT route_id FROM current_route_id WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))
    }

    fn put_current_route_id(&self, id: Option<&str>) -> Result<(), StorageError> {
        let result = match id {
            Some(route_id) => self.conn.execute(
                "INSERT OR REPLACE INTO current_route_id (id, route_id) VALUES (1, ?1)",
                params![route_id],
            ),
            None => self.conn.execute("DELETE FROM current_route_id", []),
        };
        result.map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    // ========== Active tracking ==========

    fn load_active_tracking(&self) -> Result<Option<RouteProgress>, StorageError> {
        let mut sessions: Vec<RouteProgress> = self.query_documents(
            "SELECT data_json FROM active_tracking ORDER BY saved_at DESC LIMIT 1",
            &[],
        )?;
        Ok(sessions.pop())
    }

    fn replace_active_tracking(&self, progress: Option<&RouteProgress>) -> Result<(), StorageError> {
        let data_json = progress.map(to_json).transpose()?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;

        tx.execute("DELETE FROM active_tracking", [])
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        if let (Some(progress), Some(data_json)) = (progress, data_json) {
            tx.execute(
                "INSERT INTO active_tracking (route_id, data_json, saved_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%d %H:%M:%f', 'now'))",
                params![progress.route_id, data_json],
            )
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    // ========== Route history ==========

    fn load_all_history(&self) -> Result<Vec<RouteHistory>, StorageError> {
        self.query_documents(
            "SELECT data_json FROM route_history ORDER BY start_time ASC",
            &[],
        )
    }

    fn load_history_by_route(&self, route_id: &str) -> Result<Vec<RouteHistory>, StorageError> {
        self.query_documents(
            "SELECT data_json FROM route_history WHERE route_id = ?1 ORDER BY start_time ASC",
            &[&route_id],
        )
    }

    fn put_history(&self, history: &RouteHistory) -> Result<(), StorageError> {
        let data_json = to_json(history)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO route_history (id, route_id, start_time, data_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![history.id, history.route_id, history.start_time, data_json],
            )
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn delete_history(&self, id: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM route_history WHERE id = ?1", params![id])
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn delete_history_by_route(&self, route_id: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "DELETE FROM route_history WHERE route_id = ?1",
                params![route_id],
            )
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::DeserializationError(e.to_string()))
}
