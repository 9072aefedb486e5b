//! A run from start to archived history, through the on-disk gateway.

use crate::{config_in, temp_gateway};
use farmtrack::routes::queries::{calculate_progress, get_stop_completion_status, StopStatus};
use farmtrack::routes::{
    InventoryChange, Item, ItemAnswer, ItemType, Route, SessionState, Stop, ToggleRequest,
    Tracker,
};
use farmtrack::storage::RouteStore;
use farmtrack::PersistenceGateway;
use std::sync::{Arc, Mutex};

fn farm_route() -> Route {
    Route {
        id: "R".to_string(),
        name: "Savage Divide".to_string(),
        description: String::new(),
        stops: vec![
            Stop {
                id: "S1".to_string(),
                name: "Top of the World".to_string(),
                description: String::new(),
                items: vec![Item::new("I1", ItemType::Task).named("Buy plans")],
            },
            Stop {
                id: "S2".to_string(),
                name: "Monorail".to_string(),
                description: String::new(),
                items: vec![Item::new("I2", ItemType::Bobblehead)],
            },
        ],
        completed_runs: 0,
        auto_inventory_checks: true,
    }
}

fn start_clock() -> i64 {
    1_000_000
}

fn finish_clock() -> i64 {
    1_000_000 + 754_000
}

#[test]
fn test_full_run_archives_history() {
    let (_dir, gateway) = temp_gateway();
    gateway.save_route(&farm_route()).unwrap();
    let gateway = Arc::new(Mutex::new(gateway));

    let mut tracker = Tracker::new(gateway.clone()).with_clock(start_clock);
    let route = gateway.lock().unwrap().get_route_by_id("R").unwrap();
    tracker.start(&route).unwrap();

    tracker.toggle_item(&ToggleRequest::new("I1")).unwrap();
    tracker.next_stop().unwrap();
    let change = tracker
        .toggle_item(&ToggleRequest::new("I2").answer(ItemAnswer::Yes))
        .unwrap();
    assert_eq!(
        change,
        InventoryChange::Added {
            name: "Bobblehead".to_string(),
            amount: 1
        }
    );

    let progress = tracker.progress().unwrap();
    assert_eq!(calculate_progress(&progress.route, &progress.collected_items), 100);
    assert_eq!(
        get_stop_completion_status(
            &progress.route.stops[0],
            0,
            progress.current_stop_index,
            &progress.collected_items
        ),
        StopStatus::Completed
    );

    let mut tracker = tracker.with_clock(finish_clock);
    let done = tracker.complete().unwrap();
    assert_eq!(tracker.state(), SessionState::Completed);
    assert_eq!(done.history.duration, 754_000);

    let gw = gateway.lock().unwrap();
    let histories = gw.load_all_route_history();
    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].route_name, "Savage Divide");
    assert_eq!(histories[0].item_answers.get("I2"), Some(&ItemAnswer::Yes));
    assert!(histories[0].collected_items["I1"]);
    assert_eq!(gw.get_route_by_id("R").unwrap().completed_runs, 1);
    assert_eq!(gw.load_active_tracking(), None);

    // Mirrored into the fallback
    assert_eq!(gw.fallback().load_all_history().unwrap(), histories);
    assert_eq!(gw.fallback().get_route("R").unwrap().unwrap().completed_runs, 1);
}

#[test]
fn test_run_survives_restart() {
    let (dir, gateway) = temp_gateway();
    gateway.save_route(&farm_route()).unwrap();
    let gateway = Arc::new(Mutex::new(gateway));

    let mut tracker = Tracker::new(gateway.clone()).with_clock(start_clock);
    tracker.start(&farm_route()).unwrap();
    tracker.toggle_item(&ToggleRequest::new("I1")).unwrap();
    tracker.set_notes("server hop after monorail").unwrap();
    drop(tracker);
    drop(gateway);

    let reopened = PersistenceGateway::open(&config_in(dir.path())).unwrap();
    let mut resumed = Tracker::new(Arc::new(Mutex::new(reopened)));
    let progress = resumed.resume().unwrap().cloned().unwrap();

    assert!(progress.is_collected("I1"));
    assert_eq!(progress.notes, "server hop after monorail");
    assert_eq!(resumed.state(), SessionState::Active);
}

#[test]
fn test_uncollect_reverses_inventory() {
    let (_dir, gateway) = temp_gateway();
    let mut route = farm_route();
    route.stops[0]
        .items
        .push(Item::new("ore", ItemType::Harvestable).named("Lead").with_quantity(4));
    gateway.save_route(&route).unwrap();

    let mut tracker = Tracker::new(Arc::new(Mutex::new(gateway))).with_clock(start_clock);
    tracker.start(&route).unwrap();
    tracker
        .toggle_item(&ToggleRequest::new("ore").quantity(6))
        .unwrap();
    assert_eq!(
        tracker.progress().unwrap().inventory_data.route_inventory["Lead"],
        6
    );

    let change = tracker.toggle_item(&ToggleRequest::new("ore")).unwrap();
    assert_eq!(
        change,
        InventoryChange::Removed {
            name: "Lead".to_string(),
            amount: 6,
            cleared: true
        }
    );
    let progress = tracker.progress().unwrap();
    assert!(!progress.inventory_data.route_inventory.contains_key("Lead"));
    assert_eq!(progress.collected_items.get("ore"), Some(&false));
}

#[test]
fn test_single_item_run() {
    let (_dir, gateway) = temp_gateway();
    let route = Route {
        id: "R".to_string(),
        name: "Quick".to_string(),
        description: String::new(),
        stops: vec![Stop {
            id: "S1".to_string(),
            name: "Shack".to_string(),
            description: String::new(),
            items: vec![Item::new("I1", ItemType::Task).named("Check mailbox")],
        }],
        completed_runs: 0,
        auto_inventory_checks: false,
    };
    gateway.save_route(&route).unwrap();
    let gateway = Arc::new(Mutex::new(gateway));

    let mut tracker = Tracker::new(gateway.clone()).with_clock(start_clock);
    tracker.start(&route).unwrap();
    tracker
        .toggle_item(&ToggleRequest::new("I1").quantity(1))
        .unwrap();

    let progress = tracker.progress().unwrap();
    assert_eq!(progress.collected_items.get("I1"), Some(&true));
    assert_eq!(progress.inventory_data.route_inventory.len(), 1);
    assert_eq!(progress.inventory_data.route_inventory["Check mailbox"], 1);

    let done = tracker.with_clock(finish_clock).complete().unwrap();
    assert_eq!(done.history.duration, finish_clock() - start_clock());

    let gw = gateway.lock().unwrap();
    assert_eq!(gw.get_route_by_id("R").unwrap().completed_runs, 1);
    assert_eq!(gw.load_active_tracking(), None);
    assert_eq!(gw.load_current_route_id(), None);
}
