//! Session state machine for the single active run.
//!
//! The tracker holds the in-memory snapshot and hands every transition's
//! result to the gateway. Routine transitions persist best-effort: the new
//! snapshot is kept even when the write fails, and the failure is logged.

use crate::routes::progress::{
    self, build_history, start_progress, InventoryChange, ToggleRequest,
};
use crate::routes::types::{Route, RouteHistory, RouteProgress};
use crate::storage::{PersistenceGateway, StorageError};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Where the tracker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No run in progress
    NotStarted,
    /// A run is in progress
    Active,
    /// Last run was completed and archived
    Completed,
    /// Last run was abandoned
    Cancelled,
}

/// Outcome of completing a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    /// Route with its run counter incremented
    pub route: Route,
    /// Archived run
    pub history: RouteHistory,
}

/// Tracker errors.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("No run in progress")]
    NotActive,

    #[error("Route {0} has no stops")]
    EmptyRoute(String),

    #[error("Storage lock failed: {0}")]
    LockPoisoned(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Drives one run at a time against the persistence gateway.
pub struct Tracker {
    gateway: Arc<Mutex<PersistenceGateway>>,
    progress: Option<RouteProgress>,
    state: SessionState,
    clock: fn() -> i64,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl Tracker {
    /// Create an idle tracker.
    pub fn new(gateway: Arc<Mutex<PersistenceGateway>>) -> Self {
        Self {
            gateway,
            progress: None,
            state: SessionState::NotStarted,
            clock: now_ms,
        }
    }

    /// Replace the millisecond clock.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current snapshot, if a run is active.
    pub fn progress(&self) -> Option<&RouteProgress> {
        self.progress.as_ref()
    }

    /// Milliseconds since the active run started.
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.progress
            .as_ref()
            .map(|p| progress::elapsed_ms(p, (self.clock)()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, PersistenceGateway>, TrackerError> {
        self.gateway
            .lock()
            .map_err(|e| TrackerError::LockPoisoned(e.to_string()))
    }

    /// Pick up a run persisted by an earlier process.
    pub fn resume(&mut self) -> Result<Option<&RouteProgress>, TrackerError> {
        let stored = self.lock()?.load_active_tracking();
        if let Some(progress) = stored {
            tracing::info!("Resumed run of route {}", progress.route_id);
            self.progress = Some(progress);
            self.state = SessionState::Active;
        }
        Ok(self.progress.as_ref())
    }

    /// Start a run of `route`, discarding any run already in progress.
    ///
    /// The new run is active in memory even if persisting it fails.
    pub fn start(&mut self, route: &Route) -> Result<&RouteProgress, TrackerError> {
        if route.stops.is_empty() {
            return Err(TrackerError::EmptyRoute(route.id.clone()));
        }

        let progress = start_progress(route, (self.clock)());
        let persisted = {
            let gateway = self.lock()?;
            gateway
                .clear_active_session()
                .and_then(|_| gateway.save_active_tracking(Some(&progress)))
                .and_then(|_| gateway.save_current_route_id(Some(&route.id)))
        };

        if let Some(previous) = self.progress.take() {
            tracing::info!("Discarded run of route {}", previous.route_id);
        }
        tracing::info!("Started run of route {}", route.id);
        self.state = SessionState::Active;
        let progress = self.progress.insert(progress);

        persisted?;
        Ok(progress)
    }

    /// Apply a transition to the active snapshot and persist it best-effort.
    pub fn apply(
        &mut self,
        transition: impl FnOnce(&RouteProgress) -> RouteProgress,
    ) -> Result<&RouteProgress, TrackerError> {
        let current = self.progress.as_ref().ok_or(TrackerError::NotActive)?;
        let next = transition(current);
        self.persist(&next);
        Ok(self.progress.insert(next))
    }

    pub fn select_stop(&mut self, index: usize) -> Result<&RouteProgress, TrackerError> {
        self.apply(|p| progress::select_stop(p, index))
    }

    pub fn next_stop(&mut self) -> Result<&RouteProgress, TrackerError> {
        self.apply(progress::next_stop)
    }

    pub fn previous_stop(&mut self) -> Result<&RouteProgress, TrackerError> {
        self.apply(progress::previous_stop)
    }

    pub fn set_notes(&mut self, notes: &str) -> Result<&RouteProgress, TrackerError> {
        self.apply(|p| progress::set_notes(p, notes))
    }

    /// Add an item found mid-run to a stop of the session's route copy.
    pub fn add_spawned_item(
        &mut self,
        stop_index: usize,
        id: &str,
        name: &str,
        quantity: u32,
    ) -> Result<&RouteProgress, TrackerError> {
        self.apply(|p| progress::add_spawned_item(p, stop_index, id, name, quantity))
    }

    /// Toggle an item, returning the inventory effect.
    pub fn toggle_item(&mut self, request: &ToggleRequest) -> Result<InventoryChange, TrackerError> {
        let current = self.progress.as_ref().ok_or(TrackerError::NotActive)?;
        let outcome = progress::toggle_item(current, request);
        self.persist(&outcome.progress);
        self.progress = Some(outcome.progress);
        Ok(outcome.inventory)
    }

    /// Archive a snapshot of the active run without ending it.
    pub fn log_run(&mut self) -> Result<RouteHistory, TrackerError> {
        let current = self.progress.as_ref().ok_or(TrackerError::NotActive)?;
        let history = build_history(current, (self.clock)());
        self.lock()?.save_route_history(&history)?;
        tracing::info!("Logged run of route {}", history.route_id);
        Ok(history)
    }

    /// Complete the active run.
    ///
    /// If the history entry cannot be written the run stays active so the
    /// caller can retry. Later bookkeeping failures are logged only.
    pub fn complete(&mut self) -> Result<CompletedRun, TrackerError> {
        let current = self.progress.as_ref().ok_or(TrackerError::NotActive)?;
        let history = build_history(current, (self.clock)());

        let route = {
            let gateway = self.lock()?;
            gateway.save_route_history(&history)?;

            let mut route = gateway
                .get_route_by_id(&current.route_id)
                .unwrap_or_else(|| current.route.clone());
            route.completed_runs += 1;

            if let Err(e) = gateway.save_route(&route) {
                tracing::warn!("Failed to record completed run on route {}: {}", route.id, e);
            }
            if let Err(e) = gateway.clear_active_session() {
                tracing::warn!("Failed to clear active run: {}", e);
            }
            if let Err(e) = gateway.save_current_route_id(None) {
                tracing::warn!("Failed to clear current route: {}", e);
            }
            route
        };

        tracing::info!(
            "Completed run {} of route {} in {} ms",
            route.completed_runs,
            route.id,
            history.duration
        );
        self.progress = None;
        self.state = SessionState::Completed;
        Ok(CompletedRun { route, history })
    }

    /// Abandon the active run without archiving it.
    ///
    /// The run is dropped from memory even if clearing storage fails.
    pub fn cancel(&mut self) -> Result<(), TrackerError> {
        let current = self.progress.take().ok_or(TrackerError::NotActive)?;
        self.state = SessionState::Cancelled;
        tracing::info!("Cancelled run of route {}", current.route_id);

        let gateway = self.lock()?;
        gateway.clear_active_session()?;
        gateway.save_current_route_id(None)?;
        Ok(())
    }

    fn persist(&self, progress: &RouteProgress) {
        match self.gateway.lock() {
            Ok(gateway) => {
                if let Err(e) = gateway.save_active_tracking(Some(progress)) {
                    tracing::warn!("Active run not persisted: {}", e);
                }
            }
            Err(e) => tracing::warn!("Active run not persisted, storage lock failed: {}", e),
        }
    }
}
