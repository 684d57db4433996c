//! Behavioural tests for the dispatcher.
#![expect(
    clippy::expect_used,
    reason = "behaviour steps fail fast when the world is not in the expected state"
)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use courier_core::test_support::{StaticGeocoder, StaticTravelTimes};
use courier_core::{OrderId, OrderStatus, RejectionReason, SlotKind, SlotLayout, SlotName};
use courier_planner::{
    CycleReport, DepotSettings, DispatchError, Dispatcher, GreedyPlanner, PlannerConfig,
};
use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;

const WAREHOUSE: &str = "198 Morris Rd, Schenectady, NY";

type TestDispatcher = Dispatcher<StaticGeocoder, StaticTravelTimes>;

struct DispatchWorld {
    runtime: Runtime,
    dispatcher: TestDispatcher,
    orders: RefCell<HashMap<&'static str, OrderId>>,
    report: RefCell<Option<CycleReport>>,
    submit_error: RefCell<Option<DispatchError>>,
}

impl DispatchWorld {
    fn submit(&self, label: &'static str) {
        let order = self
            .runtime
            .block_on(self.dispatcher.submit(label))
            .expect("order should be accepted");
        self.orders.borrow_mut().insert(label, order.id);
    }

    fn id(&self, label: &str) -> OrderId {
        *self
            .orders
            .borrow()
            .get(label)
            .unwrap_or_else(|| panic!("no order submitted for {label}"))
    }

    fn cycle(&self) {
        let report = self
            .runtime
            .block_on(self.dispatcher.run_cycle())
            .expect("cycle should complete");
        self.report.replace(Some(report));
    }
}

#[fixture]
fn world() -> DispatchWorld {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime");
    let geocoder = StaticGeocoder::new()
        .with_address(WAREHOUSE, Coord { x: -73.93, y: 42.79 })
        .with_address("near", Coord { x: -73.90, y: 42.80 })
        .with_address("next-door", Coord { x: -73.89, y: 42.80 })
        .with_address("far", Coord { x: -75.0, y: 44.0 });
    let travel = StaticTravelTimes::new()
        .with_minutes(WAREHOUSE, "near", 10)
        .with_minutes(WAREHOUSE, "next-door", 12)
        .with_minutes(WAREHOUSE, "far", 150);
    let depot = DepotSettings::new(
        WAREHOUSE,
        SlotLayout::new(SlotKind::Driver, 2).expect("valid layout"),
        Duration::from_secs(120 * 60),
    );
    let planner = GreedyPlanner::new(geocoder, travel, depot, PlannerConfig::default());
    DispatchWorld {
        runtime,
        dispatcher: Dispatcher::new(planner),
        orders: RefCell::new(HashMap::new()),
        report: RefCell::new(None),
        submit_error: RefCell::new(None),
    }
}

// --- Given steps ---

#[given("a dispatcher for a warehouse with two drivers")]
fn given_dispatcher(world: &DispatchWorld) {
    assert!(world.runtime.block_on(world.dispatcher.pending()).is_empty());
}

#[given("orders for the near, far and next-door addresses")]
fn given_three_orders(world: &DispatchWorld) {
    world.submit("near");
    world.submit("far");
    world.submit("next-door");
}

#[given("an order for the far address")]
fn given_far_order(world: &DispatchWorld) {
    world.submit("far");
}

// --- When steps ---

#[when("an unknown address is submitted")]
fn when_unknown_submitted(world: &DispatchWorld) {
    let outcome = world.runtime.block_on(world.dispatcher.submit("atlantis"));
    world.submit_error.replace(outcome.err());
}

#[when("a cycle runs")]
fn when_cycle(world: &DispatchWorld) {
    world.cycle();
}

#[when("three cycles run")]
fn when_three_cycles(world: &DispatchWorld) {
    for _ in 0..3 {
        world.cycle();
    }
}

#[when("DRIVER 1 completes its assigned orders")]
fn when_driver_completes(world: &DispatchWorld) {
    let slot = SlotName::from("DRIVER 1");
    let ids: Vec<OrderId> = world
        .report
        .borrow()
        .as_ref()
        .and_then(|report| report.assignment.slot(&slot))
        .expect("DRIVER 1 should have an assignment")
        .iter()
        .map(|order| order.id)
        .collect();
    let cleared = world
        .runtime
        .block_on(world.dispatcher.complete_slot(&slot, &ids))
        .expect("completion should succeed");
    assert_eq!(cleared, ids.len());
}

// --- Then steps ---

#[then("the submission is refused as unresolvable")]
fn then_refused(world: &DispatchWorld) {
    let err = world.submit_error.borrow();
    assert!(
        matches!(&*err, Some(DispatchError::Unresolvable { address, .. }) if address == "atlantis"),
        "expected Unresolvable, got {err:?}"
    );
}

#[then("the dispatcher has no pending orders")]
fn then_none_pending(world: &DispatchWorld) {
    assert!(world.runtime.block_on(world.dispatcher.pending()).is_empty());
}

#[then("the near and next-door orders share DRIVER 1")]
fn then_shared(world: &DispatchWorld) {
    let report = world.report.borrow();
    let assignment = &report.as_ref().expect("cycle should have run").assignment;
    let driver_one: Vec<OrderId> = assignment
        .slot(&SlotName::from("DRIVER 1"))
        .expect("slot exists")
        .iter()
        .map(|order| order.id)
        .collect();
    assert_eq!(driver_one, vec![world.id("near"), world.id("next-door")]);
    assert_eq!(assignment.slot_of(world.id("far")), None);
}

#[then("the far order is deferred once")]
fn then_far_deferred(world: &DispatchWorld) {
    let far = world.id("far");
    assert_eq!(world.dispatcher.planner().deferrals(far), 1);
    assert_eq!(
        world.runtime.block_on(world.dispatcher.status(far)),
        Some(OrderStatus::Pending)
    );
}

#[then("the far order is rejected as infeasible")]
fn then_far_rejected(world: &DispatchWorld) {
    let far = world.id("far");
    assert_eq!(
        world.runtime.block_on(world.dispatcher.status(far)),
        Some(OrderStatus::Rejected(RejectionReason::Infeasible))
    );
    let report = world.report.borrow();
    let last = report.as_ref().expect("cycle should have run");
    assert_eq!(last.rejected.len(), 1);
}

#[then("only the far order remains pending")]
fn then_only_far(world: &DispatchWorld) {
    let pending: Vec<OrderId> = world
        .runtime
        .block_on(world.dispatcher.pending())
        .iter()
        .map(|order| order.id)
        .collect();
    assert_eq!(pending, vec![world.id("far")]);
    assert_eq!(
        world.runtime.block_on(world.dispatcher.status(world.id("near"))),
        None
    );
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/dispatch.feature", name = $title)]
        fn $fn_name(world: DispatchWorld) {
            let _ = world;
        }
    };
}

register_scenario!(
    unknown_address_refused,
    "An address the geocoder cannot find is refused"
);
register_scenario!(
    cycle_clusters_and_defers,
    "A cycle clusters nearby orders and defers the distant one"
);
register_scenario!(
    distant_order_rejected,
    "A distant order is rejected once its deferrals run out"
);
register_scenario!(completing_slot_clears, "Completing a slot clears its orders");
