//! Route, stop, item, and run-progress types.
//!
//! All types serialize with camelCase field names so the same JSON shape is
//! used by the fallback blob store, the primary store's document columns, and
//! export files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Category of a collectible or task at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Bobblehead collectible
    Bobblehead,
    /// Magazine collectible (may carry an issue number)
    Magazine,
    /// Timed or world event
    Event,
    /// Consumable with a meaningful count
    Consumable,
    /// Plant or resource node
    Harvestable,
    /// Free-form task
    Task,
    /// Item spawned ad hoc during a run
    Spawned,
}

impl ItemType {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Bobblehead => "bobblehead",
            ItemType::Magazine => "magazine",
            ItemType::Event => "event",
            ItemType::Consumable => "consumable",
            ItemType::Harvestable => "harvestable",
            ItemType::Task => "task",
            ItemType::Spawned => "spawned",
        }
    }

    /// Whether collecting an item of this type waits for a yes/no/quantity answer.
    pub fn needs_confirmation(&self) -> bool {
        matches!(
            self,
            ItemType::Bobblehead
                | ItemType::Magazine
                | ItemType::Consumable
                | ItemType::Event
                | ItemType::Spawned
        )
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemType::Bobblehead => "Bobblehead",
            ItemType::Magazine => "Magazine",
            ItemType::Event => "Event",
            ItemType::Consumable => "Consumable",
            ItemType::Harvestable => "Harvestable",
            ItemType::Task => "Task",
            ItemType::Spawned => "Spawned",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for ItemType {
    type Err = String;

    /// Case-insensitive parse of a type name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bobblehead" => Ok(ItemType::Bobblehead),
            "magazine" => Ok(ItemType::Magazine),
            "event" => Ok(ItemType::Event),
            "consumable" => Ok(ItemType::Consumable),
            "harvestable" => Ok(ItemType::Harvestable),
            "task" => Ok(ItemType::Task),
            "spawned" => Ok(ItemType::Spawned),
            other => Err(format!("Unknown item type: {}", other)),
        }
    }
}

/// A single collectible or task within a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Stable identifier, unique within the owning stop
    pub id: String,
    /// Raw type label as authored; see [`crate::routes::queries::get_item_type`]
    #[serde(rename = "type", default)]
    pub item_type: String,
    /// Display name
    pub name: String,
    /// Static quantity; meaningful for consumables
    #[serde(default)]
    pub quantity: u32,
    /// Legacy static flag, superseded by live progress
    #[serde(default)]
    pub collected: bool,
    /// Optional free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Item {
    /// Create an item of a known type with its name defaulting to the type label.
    pub fn new(id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id: id.into(),
            item_type: item_type.as_str().to_string(),
            name: item_type.to_string(),
            quantity: 1,
            collected: false,
            description: None,
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the static quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

/// An ordered waypoint in a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Order is significant for display and next-uncollected lookup
    #[serde(default)]
    pub items: Vec<Item>,
}

/// A named, ordered collection of stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Traversal order
    #[serde(default)]
    pub stops: Vec<Stop>,
    /// Incremented only on explicit completion
    #[serde(default)]
    pub completed_runs: u32,
    /// Advisory toggle, not consulted by transitions
    #[serde(default)]
    pub auto_inventory_checks: bool,
}

impl Route {
    /// Total number of items across all stops.
    pub fn item_count(&self) -> usize {
        self.stops.iter().map(|s| s.items.len()).sum()
    }

    /// Find an item anywhere in the route.
    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.stops
            .iter()
            .flat_map(|s| s.items.iter())
            .find(|i| i.id == item_id)
    }

    /// Position `(stop, item)` of an item, looking in `preferred_stop` first.
    ///
    /// Item ids are only unique within a stop, so a duplicate id resolves to
    /// the preferred stop's copy, then to the first match in route order.
    pub fn locate_item(&self, item_id: &str, preferred_stop: usize) -> Option<(usize, usize)> {
        let in_stop = |stop_index: usize| {
            self.stops.get(stop_index).and_then(|stop| {
                stop.items
                    .iter()
                    .position(|i| i.id == item_id)
                    .map(|item_index| (stop_index, item_index))
            })
        };
        in_stop(preferred_stop).or_else(|| (0..self.stops.len()).find_map(in_stop))
    }
}

/// Answer to a collection prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAnswer {
    Yes,
    No,
}

/// Resolved identity of an ambiguous collectible slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectibleDetails {
    /// Type of the resolved collectible
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Title of the collectible
    pub name: String,
    /// Issue number, for magazines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u32>,
}

impl CollectibleDetails {
    /// Display name written back onto the item.
    ///
    /// Magazines with an issue number render as `"<Title> #<Issue>"`.
    pub fn display_name(&self) -> String {
        match (self.item_type, self.issue_number) {
            (ItemType::Magazine, Some(issue)) => format!("{} #{}", self.name, issue),
            _ => self.name.clone(),
        }
    }
}

/// Per-session inventory tally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryData {
    /// Count per item display name; items sharing a name share a count
    #[serde(default)]
    pub route_inventory: HashMap<String, u32>,
}

/// Live state of the single in-progress run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProgress {
    /// Key of the record; must be non-empty to persist
    pub route_id: String,
    /// Epoch milliseconds, set once
    pub start_time: i64,
    pub current_stop_index: usize,
    /// Absence means not collected
    #[serde(default)]
    pub collected_items: HashMap<String, bool>,
    /// 0 is distinct from absent
    #[serde(default)]
    pub collected_quantities: HashMap<String, u32>,
    #[serde(default)]
    pub item_answers: HashMap<String, ItemAnswer>,
    #[serde(default)]
    pub collectible_details: HashMap<String, CollectibleDetails>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub inventory_data: InventoryData,
    /// Working copy of the route; resolved collectible names are written here
    pub route: Route,
}

impl RouteProgress {
    /// Whether the item is currently toggled on.
    pub fn is_collected(&self, item_id: &str) -> bool {
        self.collected_items.get(item_id).copied().unwrap_or(false)
    }

    /// Whether the item counts toward completion.
    ///
    /// An item that was found but answered "no" is collected without counting.
    pub fn counts_as_collected(&self, item_id: &str) -> bool {
        self.is_collected(item_id) && self.item_answers.get(item_id) != Some(&ItemAnswer::No)
    }
}

/// Archival record of an ended run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHistory {
    pub id: String,
    pub route_id: String,
    /// Route name at the time the run ended
    #[serde(default)]
    pub route_name: String,
    /// Epoch milliseconds
    pub start_time: i64,
    /// Milliseconds
    pub duration: i64,
    #[serde(default)]
    pub collected_items: HashMap<String, bool>,
    #[serde(default)]
    pub collected_quantities: HashMap<String, u32>,
    #[serde(default)]
    pub item_answers: HashMap<String, ItemAnswer>,
    #[serde(default)]
    pub collectible_details: HashMap<String, CollectibleDetails>,
    #[serde(default)]
    pub notes: String,
}
