//! Fallback store: fixed keys, each holding a whole collection as one blob.
//!
//! ```text
//! <dir>/
//!   farmingRoutes.json    # JSON array of routes
//!   activeTracking.json   # JSON object, absent when no session
//!   currentRouteId.json   # plain route id string
//!   routeHistories.json   # JSON array, newest `history_limit` entries
//! ```
//!
//! Every write rewrites the whole value for its key.

use crate::routes::types::{Route, RouteHistory, RouteProgress};
use crate::storage::error::StorageError;
use crate::storage::RouteStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::{fs, io};

pub const ROUTES_KEY: &str = "farmingRoutes";
pub const ACTIVE_TRACKING_KEY: &str = "activeTracking";
pub const CURRENT_ROUTE_ID_KEY: &str = "currentRouteId";
pub const ROUTE_HISTORIES_KEY: &str = "routeHistories";

/// Default number of history entries kept in the fallback blob.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Flat key-value store over a directory of files.
pub struct BlobStore {
    dir: PathBuf,
    history_limit: usize,
}

impl BlobStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>, history_limit: usize) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::IoError(e.to_string()))?;
        Ok(Self { dir, history_limit })
    }

    /// Directory holding the blobs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Raw value for `key`, `None` when unset.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(e.to_string())),
        }
    }

    /// Overwrite the value for `key`.
    pub fn set_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.key_path(key), value).map_err(|e| StorageError::IoError(e.to_string()))
    }

    /// Remove `key`. Missing keys are not an error.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(e.to_string())),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        self.get_raw(key)?
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| StorageError::DeserializationError(format!("{}: {}", key, e)))
            })
            .transpose()
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.set_raw(key, &raw)
    }

    /// Replace the whole route collection.
    pub fn write_routes(&self, routes: &[Route]) -> Result<(), StorageError> {
        self.set_json(ROUTES_KEY, routes)
    }

    /// Replace the whole history collection, keeping the newest entries.
    pub fn write_histories(&self, mut histories: Vec<RouteHistory>) -> Result<(), StorageError> {
        histories.sort_by_key(|h| h.start_time);
        if histories.len() > self.history_limit {
            let excess = histories.len() - self.history_limit;
            histories.drain(..excess);
            tracing::debug!("Dropped {} oldest history entries from fallback", excess);
        }
        self.set_json(ROUTE_HISTORIES_KEY, &histories)
    }
}

impl RouteStore for BlobStore {
    fn engine_name(&self) -> &'static str {
        "blob"
    }

    fn probe(&self) -> Result<(), StorageError> {
        self.get_raw(ROUTES_KEY).map(|_| ())
    }

    fn load_routes(&self) -> Result<Vec<Route>, StorageError> {
        Ok(self.get_json(ROUTES_KEY)?.unwrap_or_default())
    }

    fn get_route(&self, id: &str) -> Result<Option<Route>, StorageError> {
        Ok(self.load_routes()?.into_iter().find(|r| r.id == id))
    }

    fn put_route(&self, route: &Route) -> Result<(), StorageError> {
        let mut routes = self.load_routes()?;
        match routes.iter_mut().find(|r| r.id == route.id) {
            Some(existing) => *existing = route.clone(),
            None => routes.push(route.clone()),
        }
        self.write_routes(&routes)
    }

    fn delete_route(&self, id: &str) -> Result<(), StorageError> {
        let mut routes = self.load_routes()?;
        routes.retain(|r| r.id != id);
        self.write_routes(&routes)
    }

    fn load_current_route_id(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .get_raw(CURRENT_ROUTE_ID_KEY)?
            .filter(|id| !id.is_empty()))
    }

    fn put_current_route_id(&self, id: Option<&str>) -> Result<(), StorageError> {
        match id {
            Some(route_id) => self.set_raw(CURRENT_ROUTE_ID_KEY, route_id),
            None => self.remove(CURRENT_ROUTE_ID_KEY),
        }
    }

    fn load_active_tracking(&self) -> Result<Option<RouteProgress>, StorageError> {
        self.get_json(ACTIVE_TRACKING_KEY)
    }

    fn replace_active_tracking(&self, progress: Option<&RouteProgress>) -> Result<(), StorageError> {
        match progress {
            Some(progress) => self.set_json(ACTIVE_TRACKING_KEY, progress),
            None => self.remove(ACTIVE_TRACKING_KEY),
        }
    }

    fn load_all_history(&self) -> Result<Vec<RouteHistory>, StorageError> {
        Ok(self.get_json(ROUTE_HISTORIES_KEY)?.unwrap_or_default())
    }

    fn load_history_by_route(&self, route_id: &str) -> Result<Vec<RouteHistory>, StorageError> {
        Ok(self
            .load_all_history()?
            .into_iter()
            .filter(|h| h.route_id == route_id)
            .collect())
    }

    fn put_history(&self, history: &RouteHistory) -> Result<(), StorageError> {
        let mut histories = self.load_all_history()?;
        match histories.iter_mut().find(|h| h.id == history.id) {
            Some(existing) => *existing = history.clone(),
            None => histories.push(history.clone()),
        }
        self.write_histories(histories)
    }

    fn delete_history(&self, id: &str) -> Result<(), StorageError> {
        let mut histories = self.load_all_history()?;
        histories.retain(|h| h.id != id);
        self.set_json(ROUTE_HISTORIES_KEY, &histories)
    }

    fn delete_history_by_route(&self, route_id: &str) -> Result<(), StorageError> {
        let mut histories = self.load_all_history()?;
        histories.retain(|h| h.route_id != route_id);
        self.set_json(ROUTE_HISTORIES_KEY, &histories)
    }
}
