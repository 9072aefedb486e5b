//! Transitions over a [`RouteProgress`] snapshot.
//!
//! Every function here takes the current snapshot by reference and returns the
//! next one. None of them touch storage; the caller persists the result.

use crate::routes::queries::get_item_type;
use crate::routes::types::{
    CollectibleDetails, Item, ItemAnswer, ItemType, Route, RouteHistory, RouteProgress,
};
use uuid::Uuid;

/// A request to flip the collected state of one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToggleRequest {
    /// Item to toggle
    pub item_id: String,
    /// Quantity collected; defaults to the item's static quantity
    pub quantity: Option<u32>,
    /// Confirmation answer, if the item was prompted
    pub answer: Option<ItemAnswer>,
    /// Resolved collectible identity
    pub collectible_details: Option<CollectibleDetails>,
}

impl ToggleRequest {
    /// Toggle with no prompt data.
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Default::default()
        }
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn answer(mut self, answer: ItemAnswer) -> Self {
        self.answer = Some(answer);
        self
    }

    pub fn details(mut self, details: CollectibleDetails) -> Self {
        self.collectible_details = Some(details);
        self
    }
}

/// Effect of a toggle on the per-session inventory tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryChange {
    /// Tally untouched
    Unchanged,
    /// `amount` added under `name`
    Added { name: String, amount: u32 },
    /// `amount` removed from `name`; `cleared` when the entry was dropped
    Removed {
        name: String,
        amount: u32,
        cleared: bool,
    },
}

/// Result of [`toggle_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    /// Next snapshot
    pub progress: RouteProgress,
    /// Inventory side effect, already applied to `progress`
    pub inventory: InventoryChange,
}

/// Begin a run of `route` at the first stop.
pub fn start_progress(route: &Route, now_ms: i64) -> RouteProgress {
    RouteProgress {
        route_id: route.id.clone(),
        start_time: now_ms,
        current_stop_index: 0,
        collected_items: Default::default(),
        collected_quantities: Default::default(),
        item_answers: Default::default(),
        collectible_details: Default::default(),
        notes: String::new(),
        inventory_data: Default::default(),
        route: route.clone(),
    }
}

/// Move to `index`. Out-of-range indices leave the snapshot unchanged.
pub fn select_stop(progress: &RouteProgress, index: usize) -> RouteProgress {
    let mut next = progress.clone();
    if index < progress.route.stops.len() {
        next.current_stop_index = index;
    } else {
        tracing::debug!(
            "Ignoring stop index {} (route has {} stops)",
            index,
            progress.route.stops.len()
        );
    }
    next
}

/// Advance one stop; no-op on the last stop.
pub fn next_stop(progress: &RouteProgress) -> RouteProgress {
    select_stop(progress, progress.current_stop_index + 1)
}

/// Go back one stop; no-op on the first stop.
pub fn previous_stop(progress: &RouteProgress) -> RouteProgress {
    match progress.current_stop_index.checked_sub(1) {
        Some(index) => select_stop(progress, index),
        None => progress.clone(),
    }
}

/// Replace the session notes.
pub fn set_notes(progress: &RouteProgress, notes: impl Into<String>) -> RouteProgress {
    let mut next = progress.clone();
    next.notes = notes.into();
    next
}

/// Append a spawned item to a stop of the working route copy.
///
/// The canonical route is untouched. Out-of-range stops leave the snapshot unchanged.
pub fn add_spawned_item(
    progress: &RouteProgress,
    stop_index: usize,
    id: impl Into<String>,
    name: impl Into<String>,
    quantity: u32,
) -> RouteProgress {
    let mut next = progress.clone();
    if let Some(stop) = next.route.stops.get_mut(stop_index) {
        stop.items.push(
            Item::new(id, ItemType::Spawned)
                .named(name)
                .with_quantity(quantity),
        );
    }
    next
}

/// Whether collecting `item` must wait for an external prompt.
///
/// Un-collecting never needs one.
pub fn requires_confirmation(item: &Item, is_collected: bool) -> bool {
    if is_collected {
        return false;
    }
    get_item_type(item).is_some_and(|kind| kind.needs_confirmation())
}

/// Milliseconds since the run started.
pub fn elapsed_ms(progress: &RouteProgress, now_ms: i64) -> i64 {
    (now_ms - progress.start_time).max(0)
}

/// Flip the collected state of one item.
///
/// The item is looked up in the current stop first, then across the route.
/// Unknown item ids leave the snapshot unchanged.
pub fn toggle_item(progress: &RouteProgress, request: &ToggleRequest) -> ToggleOutcome {
    let item_id = request.item_id.as_str();
    let Some((stop_index, item_index)) = progress
        .route
        .locate_item(item_id, progress.current_stop_index)
    else {
        tracing::debug!("Ignoring toggle for unknown item {}", item_id);
        return ToggleOutcome {
            progress: progress.clone(),
            inventory: InventoryChange::Unchanged,
        };
    };
    let item = &progress.route.stops[stop_index].items[item_index];

    let quantity = request.quantity.unwrap_or(item.quantity);
    let is_collected = progress.is_collected(item_id);
    let recorded = progress
        .collected_quantities
        .get(item_id)
        .copied()
        .unwrap_or(0);

    let mut next = progress.clone();
    next.collected_items.insert(item_id.to_string(), !is_collected);
    next.collected_quantities.insert(
        item_id.to_string(),
        if is_collected { 0 } else { quantity },
    );

    if let (Some(details), Some(ItemAnswer::Yes)) = (&request.collectible_details, request.answer) {
        next.collectible_details
            .insert(item_id.to_string(), details.clone());
        next.route.stops[stop_index].items[item_index].name = details.display_name();
    }

    if let Some(answer) = request.answer {
        next.item_answers.insert(item_id.to_string(), answer);
    }

    let name = next.route.stops[stop_index].items[item_index].name.clone();

    let inventory = if !is_collected {
        if quantity > 0 {
            *next
                .inventory_data
                .route_inventory
                .entry(name.clone())
                .or_insert(0) += quantity;
            InventoryChange::Added {
                name,
                amount: quantity,
            }
        } else {
            InventoryChange::Unchanged
        }
    } else {
        match next.inventory_data.route_inventory.get(&name).copied() {
            Some(count) if recorded > 0 => {
                let remaining = count.saturating_sub(recorded);
                let cleared = remaining == 0;
                if cleared {
                    next.inventory_data.route_inventory.remove(&name);
                } else {
                    next.inventory_data
                        .route_inventory
                        .insert(name.clone(), remaining);
                }
                InventoryChange::Removed {
                    name,
                    amount: count - remaining,
                    cleared,
                }
            }
            _ => InventoryChange::Unchanged,
        }
    };

    ToggleOutcome {
        progress: next,
        inventory,
    }
}

/// Archive the final state of a run.
pub fn build_history(progress: &RouteProgress, now_ms: i64) -> RouteHistory {
    RouteHistory {
        id: Uuid::new_v4().to_string(),
        route_id: progress.route_id.clone(),
        route_name: progress.route.name.clone(),
        start_time: progress.start_time,
        duration: elapsed_ms(progress, now_ms),
        collected_items: progress.collected_items.clone(),
        collected_quantities: progress.collected_quantities.clone(),
        item_answers: progress.item_answers.clone(),
        collectible_details: progress.collectible_details.clone(),
        notes: progress.notes.clone(),
    }
}
