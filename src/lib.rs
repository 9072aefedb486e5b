//! FarmTrack - resource-farming route tracker
//!
//! Routes are ordered stops of collectible items. A run walks a route, marks
//! items collected, and is archived to history on completion. Everything is
//! persisted locally through a SQLite primary store with a flat-file fallback.

pub mod routes;
pub mod storage;
pub mod transfer;

// Re-export commonly used types
pub use routes::tracker::Tracker;
pub use routes::types::{Route, RouteHistory, RouteProgress};
pub use storage::config::AppConfig;
pub use storage::gateway::PersistenceGateway;
