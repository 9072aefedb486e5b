//! Storage module: the two engines, configuration, and the gateway in front of them.

pub mod blob_store;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod schema;

use crate::routes::types::{Route, RouteHistory, RouteProgress};

pub use blob_store::BlobStore;
pub use config::{AppConfig, ConfigError, StorageSettings};
pub use database::Database;
pub use error::StorageError;
pub use gateway::{PersistenceGateway, StorageHealth};

/// Record-level operations both engines provide.
///
/// The gateway decides which engine to call and when to mirror; an engine
/// only has to store and return what it is given.
pub trait RouteStore: Send {
    /// Short engine label for log lines
    fn engine_name(&self) -> &'static str;

    /// Harmless read used to judge whether the engine is usable
    fn probe(&self) -> Result<(), StorageError>;

    fn load_routes(&self) -> Result<Vec<Route>, StorageError>;

    fn get_route(&self, id: &str) -> Result<Option<Route>, StorageError>;

    /// Insert or update by id
    fn put_route(&self, route: &Route) -> Result<(), StorageError>;

    fn delete_route(&self, id: &str) -> Result<(), StorageError>;

    fn load_current_route_id(&self) -> Result<Option<String>, StorageError>;

    /// `None` removes the pointer
    fn put_current_route_id(&self, id: Option<&str>) -> Result<(), StorageError>;

    fn load_active_tracking(&self) -> Result<Option<RouteProgress>, StorageError>;

    /// Remove every stored session, then store `progress` if given
    fn replace_active_tracking(&self, progress: Option<&RouteProgress>) -> Result<(), StorageError>;

    fn load_all_history(&self) -> Result<Vec<RouteHistory>, StorageError>;

    fn load_history_by_route(&self, route_id: &str) -> Result<Vec<RouteHistory>, StorageError>;

    /// Insert or update by id
    fn put_history(&self, history: &RouteHistory) -> Result<(), StorageError>;

    fn delete_history(&self, id: &str) -> Result<(), StorageError>;

    fn delete_history_by_route(&self, route_id: &str) -> Result<(), StorageError>;
}
