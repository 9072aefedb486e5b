//! Read-only helpers over routes and progress maps.

use crate::routes::types::{Item, ItemType, Route, Stop};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display status of a stop relative to the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    Completed,
    Skipped,
    Current,
    Incomplete,
}

/// Classify an item by its type label, case-insensitively.
///
/// Unlabelled or unrecognized items with a quantity above one are treated as
/// consumables; anything else gets no special handling.
pub fn get_item_type(item: &Item) -> Option<ItemType> {
    match item.item_type.parse::<ItemType>() {
        Ok(kind) => Some(kind),
        Err(_) if item.quantity > 1 => Some(ItemType::Consumable),
        Err(_) => None,
    }
}

/// True when every item in the stop has a truthy entry in `collected_items`.
pub fn are_all_stop_items_collected(stop: &Stop, collected_items: &HashMap<String, bool>) -> bool {
    stop.items
        .iter()
        .all(|item| collected_items.get(&item.id).copied().unwrap_or(false))
}

/// Status of the stop at `stop_index`. Completion is checked before position.
pub fn get_stop_completion_status(
    stop: &Stop,
    stop_index: usize,
    current_stop_index: usize,
    collected_items: &HashMap<String, bool>,
) -> StopStatus {
    if are_all_stop_items_collected(stop, collected_items) {
        StopStatus::Completed
    } else if stop_index < current_stop_index {
        StopStatus::Skipped
    } else if stop_index == current_stop_index {
        StopStatus::Current
    } else {
        StopStatus::Incomplete
    }
}

/// Percentage of route items present in `collected_items`, rounded.
///
/// Counts keys, not `true` values: an item toggled back off still counts.
/// A route without items reports 0.
pub fn calculate_progress(route: &Route, collected_items: &HashMap<String, bool>) -> u32 {
    let total = route.item_count();
    if total == 0 {
        return 0;
    }
    let collected = collected_items.len();
    (100.0 * collected as f64 / total as f64).round() as u32
}

/// First item in the stop, in array order, that is not collected.
pub fn next_uncollected_item<'a>(
    stop: &'a Stop,
    collected_items: &HashMap<String, bool>,
) -> Option<&'a Item> {
    stop.items
        .iter()
        .find(|item| !collected_items.get(&item.id).copied().unwrap_or(false))
}

/// Format a millisecond duration as `H:MM:SS`.
pub fn format_duration(duration_ms: i64) -> String {
    let total_secs = duration_ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}
