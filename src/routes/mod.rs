//! Routes module: the route model, run progress, and the session tracker.

pub mod progress;
pub mod queries;
pub mod tracker;
pub mod types;

pub use progress::{InventoryChange, ToggleOutcome, ToggleRequest};
pub use queries::StopStatus;
pub use tracker::{CompletedRun, SessionState, Tracker, TrackerError};
pub use types::{
    CollectibleDetails, InventoryData, Item, ItemAnswer, ItemType, Route, RouteHistory,
    RouteProgress, Stop,
};
