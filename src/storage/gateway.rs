//! Storage-engine-agnostic persistence for routes, the active session, and history.
//!
//! Every call tries the primary engine first and falls back to the blob store
//! when it errors or was never opened. Reads that fail on both engines degrade
//! to an empty result; writes that fail on both return the fallback's error.
//!
//! Route and history writes are mirrored into the blob store even when the
//! primary succeeds. Route mirroring re-reads the whole primary collection and
//! rewrites the `farmingRoutes` blob on every save, trading write cost for a
//! fallback that stays complete. Mirroring is not transactional: a failed
//! mirror is logged and the two engines may disagree until the next save.
//!
//! Clearing the active session or the current-route pointer hits both
//! engines, so a copy written during an earlier outage cannot resurface.

use crate::routes::types::{Route, RouteHistory, RouteProgress};
use crate::storage::blob_store::BlobStore;
use crate::storage::config::AppConfig;
use crate::storage::database::Database;
use crate::storage::error::StorageError;
use crate::storage::RouteStore;

/// Result of the most recent storage probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageHealth {
    /// Primary engine answered the probe
    pub reliable: bool,
    /// Why it did not
    pub error: Option<String>,
}

impl Default for StorageHealth {
    fn default() -> Self {
        Self {
            reliable: true,
            error: None,
        }
    }
}

/// Facade over the primary and fallback engines.
pub struct PersistenceGateway {
    primary: Option<Box<dyn RouteStore>>,
    fallback: BlobStore,
    open_error: Option<String>,
    health: StorageHealth,
}

impl PersistenceGateway {
    /// Open both engines from configuration and probe the primary.
    ///
    /// A primary that cannot be opened is recorded as unavailable; only a
    /// fallback that cannot be created fails the gateway.
    pub fn open(config: &AppConfig) -> Result<Self, StorageError> {
        let fallback = BlobStore::open(
            config.fallback_dir(),
            config.storage.fallback_history_limit,
        )?;

        let mut gateway = match Database::open(&config.database_path()) {
            Ok(db) => Self::with_engines(Some(Box::new(db)), fallback),
            Err(e) => {
                tracing::warn!("Primary storage unavailable, using fallback only: {}", e);
                let mut gateway = Self::with_engines(None, fallback);
                gateway.open_error = Some(e.to_string());
                gateway
            }
        };

        gateway.check_storage();
        Ok(gateway)
    }

    /// Assemble a gateway from already-open engines.
    pub fn with_engines(primary: Option<Box<dyn RouteStore>>, fallback: BlobStore) -> Self {
        Self {
            primary,
            fallback,
            open_error: None,
            health: StorageHealth::default(),
        }
    }

    /// Probe the primary engine and record the outcome.
    pub fn check_storage(&mut self) -> &StorageHealth {
        self.health = match &self.primary {
            Some(primary) => match primary.probe() {
                Ok(()) => StorageHealth::default(),
                Err(e) => {
                    tracing::warn!("Storage probe failed on {}: {}", primary.engine_name(), e);
                    StorageHealth {
                        reliable: false,
                        error: Some(e.to_string()),
                    }
                }
            },
            None => StorageHealth {
                reliable: false,
                error: Some(
                    self.open_error
                        .clone()
                        .unwrap_or_else(|| "primary storage engine not available".to_string()),
                ),
            },
        };
        &self.health
    }

    /// Outcome of the last [`check_storage`](Self::check_storage).
    pub fn storage_health(&self) -> &StorageHealth {
        &self.health
    }

    /// The fallback engine.
    pub fn fallback(&self) -> &BlobStore {
        &self.fallback
    }

    // ========== Routes ==========

    pub fn load_routes(&self) -> Vec<Route> {
        self.read("load_routes", |store| store.load_routes())
    }

    pub fn get_route_by_id(&self, id: &str) -> Option<Route> {
        self.read("get_route", |store| store.get_route(id))
    }

    /// Upsert a route, then rewrite the fallback's route blob from the primary.
    pub fn save_route(&self, route: &Route) -> Result<(), StorageError> {
        if let Some(primary) = &self.primary {
            match primary.put_route(route) {
                Ok(()) => {
                    self.mirror_routes(primary.as_ref());
                    tracing::debug!("Saved route {}", route.id);
                    return Ok(());
                }
                Err(e) => tracing::warn!(
                    "save_route failed on {}, falling back: {}",
                    primary.engine_name(),
                    e
                ),
            }
        }
        self.fallback
            .put_route(route)
            .map_err(|e| log_write_failure("save_route", e))
    }

    /// Remove a route from both engines.
    pub fn delete_route(&self, id: &str) -> Result<(), StorageError> {
        self.write_both("delete_route", |store| store.delete_route(id))
    }

    // ========== Current route pointer ==========

    pub fn load_current_route_id(&self) -> Option<String> {
        self.read("load_current_route_id", |store| store.load_current_route_id())
    }

    /// Set the pointer; `None` removes it from both engines.
    pub fn save_current_route_id(&self, id: Option<&str>) -> Result<(), StorageError> {
        match id {
            Some(_) => self.write("save_current_route_id", |store| {
                store.put_current_route_id(id)
            }),
            None => self.write_both("clear_current_route_id", |store| {
                store.put_current_route_id(None)
            }),
        }
    }

    // ========== Active tracking ==========

    pub fn load_active_tracking(&self) -> Option<RouteProgress> {
        self.read("load_active_tracking", |store| store.load_active_tracking())
    }

    /// Store the single active session, replacing any other; `None` removes it
    /// from both engines.
    ///
    /// A session without a route id is rejected before either engine is touched.
    pub fn save_active_tracking(&self, progress: Option<&RouteProgress>) -> Result<(), StorageError> {
        if let Some(progress) = progress {
            if progress.route_id.trim().is_empty() {
                return Err(StorageError::InvalidRecord(
                    "active tracking requires a route id".to_string(),
                ));
            }
        }
        match progress {
            Some(_) => self.write("save_active_tracking", |store| {
                store.replace_active_tracking(progress)
            }),
            None => self.write_both("clear_active_tracking", |store| {
                store.replace_active_tracking(None)
            }),
        }
    }

    /// Remove the active session, if any.
    pub fn clear_active_session(&self) -> Result<(), StorageError> {
        self.save_active_tracking(None)
    }

    // ========== Route history ==========

    pub fn load_all_route_history(&self) -> Vec<RouteHistory> {
        self.read("load_all_route_history", |store| store.load_all_history())
    }

    pub fn load_route_history_by_route_id(&self, route_id: &str) -> Vec<RouteHistory> {
        self.read("load_route_history_by_route_id", |store| {
            store.load_history_by_route(route_id)
        })
    }

    /// Upsert a history entry and mirror it into the capped fallback blob.
    pub fn save_route_history(&self, history: &RouteHistory) -> Result<(), StorageError> {
        if let Some(primary) = &self.primary {
            match primary.put_history(history) {
                Ok(()) => {
                    if let Err(e) = self.fallback.put_history(history) {
                        tracing::warn!("Failed to mirror history {} to fallback: {}", history.id, e);
                    }
                    return Ok(());
                }
                Err(e) => tracing::warn!(
                    "save_route_history failed on {}, falling back: {}",
                    primary.engine_name(),
                    e
                ),
            }
        }
        self.fallback
            .put_history(history)
            .map_err(|e| log_write_failure("save_route_history", e))
    }

    pub fn delete_route_history(&self, id: &str) -> Result<(), StorageError> {
        self.write_both("delete_route_history", |store| store.delete_history(id))
    }

    pub fn delete_all_route_history_by_route_id(&self, route_id: &str) -> Result<(), StorageError> {
        self.write_both("delete_all_route_history_by_route_id", |store| {
            store.delete_history_by_route(route_id)
        })
    }

    // ========== Engine selection ==========

    fn read<T: Default>(
        &self,
        op: &str,
        f: impl Fn(&dyn RouteStore) -> Result<T, StorageError>,
    ) -> T {
        if let Some(primary) = &self.primary {
            match f(primary.as_ref()) {
                Ok(value) => return value,
                Err(e) => tracing::warn!(
                    "{} failed on {}, falling back: {}",
                    op,
                    primary.engine_name(),
                    e
                ),
            }
        }
        match f(self.fallback_store()) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("{} failed on fallback, returning empty: {}", op, e);
                T::default()
            }
        }
    }

    fn write(
        &self,
        op: &str,
        f: impl Fn(&dyn RouteStore) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        if let Some(primary) = &self.primary {
            match f(primary.as_ref()) {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(
                    "{} failed on {}, falling back: {}",
                    op,
                    primary.engine_name(),
                    e
                ),
            }
        }
        f(self.fallback_store()).map_err(|e| log_write_failure(op, e))
    }

    fn write_both(
        &self,
        op: &str,
        f: impl Fn(&dyn RouteStore) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        let primary_ok = match &self.primary {
            Some(primary) => match f(primary.as_ref()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("{} failed on {}: {}", op, primary.engine_name(), e);
                    false
                }
            },
            None => false,
        };

        match f(self.fallback_store()) {
            Ok(()) => Ok(()),
            Err(e) if primary_ok => {
                tracing::warn!("{} failed on fallback mirror: {}", op, e);
                Ok(())
            }
            Err(e) => Err(log_write_failure(op, e)),
        }
    }

    fn fallback_store(&self) -> &dyn RouteStore {
        &self.fallback
    }

    fn mirror_routes(&self, primary: &dyn RouteStore) {
        let result = primary
            .load_routes()
            .and_then(|routes| self.fallback.write_routes(&routes));
        if let Err(e) = result {
            tracing::warn!("Failed to mirror routes to fallback: {}", e);
        }
    }
}

fn log_write_failure(op: &str, e: StorageError) -> StorageError {
    tracing::error!("{} failed on every storage engine: {}", op, e);
    e
}
