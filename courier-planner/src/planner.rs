//! One planning cycle: lookups, deferral bookkeeping, then assignment.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use courier_core::{
    Assignment, AssignmentParams, Candidate, Geocoder, Order, OrderId, RejectionReason,
    SlotLayout, TravelTimeEstimator, assign,
};
use futures_util::stream::{self, StreamExt};
use geo::Coord;
use tokio_util::sync::CancellationToken;

use crate::cache::CoordinateCache;
use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::lookup::{LookupError, LookupService};

/// Fixed facts about the depot the planner dispatches from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepotSettings {
    /// Origin address for every travel-time lookup.
    pub warehouse_address: String,
    /// Slots orders are partitioned into.
    pub layout: SlotLayout,
    /// Longest acceptable drive from the warehouse.
    pub max_travel: Duration,
}

impl DepotSettings {
    /// Bundle the depot settings.
    #[must_use]
    pub fn new(warehouse_address: impl Into<String>, layout: SlotLayout, max_travel: Duration) -> Self {
        Self {
            warehouse_address: warehouse_address.into(),
            layout,
            max_travel,
        }
    }
}

/// An order withdrawn from assignment during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedOrder {
    /// The withdrawn order.
    pub id: OrderId,
    /// Why it was withdrawn.
    pub reason: RejectionReason,
}

/// Outcome of one planning cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Per-slot order lists plus the orders skipped this cycle.
    pub assignment: Assignment,
    /// Orders that exhausted their deferrals or can never resolve.
    pub rejected: Vec<RejectedOrder>,
    /// Coordinates resolved this cycle for orders that had none.
    pub resolved: Vec<(OrderId, Coord<f64>)>,
    /// Resolved warehouse coordinate.
    pub warehouse: Coord<f64>,
}

/// A finished cycle whose deferral counters have not been applied yet.
#[derive(Debug, Clone)]
pub struct PendingCycle {
    report: CycleReport,
    deferrals: HashMap<OrderId, u32>,
}

impl PendingCycle {
    /// The report the cycle produced.
    #[must_use]
    pub const fn report(&self) -> &CycleReport {
        &self.report
    }
}

struct LookupOutcome {
    order: Order,
    coordinate: Result<Coord<f64>, LookupError>,
    travel_time: Option<Result<Duration, LookupError>>,
}

/// Greedy cycle driver.
///
/// Owns the lookup stack and the per-order deferral counters. A counter
/// grows by one for every committed cycle in which the order's travel time
/// was missing for good or above budget; reaching
/// [`PlannerConfig::max_deferrals`] rejects the order. Transient lookup
/// failures leave the counter untouched. A feasible cycle resets it.
#[derive(Debug)]
pub struct GreedyPlanner<G, T> {
    lookups: LookupService<G, T>,
    depot: DepotSettings,
    config: PlannerConfig,
    deferrals: Mutex<HashMap<OrderId, u32>>,
}

impl<G, T> GreedyPlanner<G, T>
where
    G: Geocoder,
    T: TravelTimeEstimator,
{
    /// Create a planner with a private coordinate cache.
    #[must_use]
    pub fn new(geocoder: G, estimator: T, depot: DepotSettings, config: PlannerConfig) -> Self {
        Self::with_cache(geocoder, estimator, CoordinateCache::new(), depot, config)
    }

    /// Create a planner that shares `cache` with other components.
    #[must_use]
    pub fn with_cache(
        geocoder: G,
        estimator: T,
        cache: CoordinateCache,
        depot: DepotSettings,
        config: PlannerConfig,
    ) -> Self {
        Self {
            lookups: LookupService::new(geocoder, estimator, cache, &config),
            depot,
            config,
            deferrals: Mutex::new(HashMap::new()),
        }
    }

    /// Depot settings.
    #[must_use]
    pub const fn depot(&self) -> &DepotSettings {
        &self.depot
    }

    /// Lookup stack, for cache and breaker inspection.
    #[must_use]
    pub const fn lookups(&self) -> &LookupService<G, T> {
        &self.lookups
    }

    /// Deferrals counted so far for `id`.
    #[must_use]
    pub fn deferrals(&self, id: OrderId) -> u32 {
        self.deferrals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    /// Resolve a single address through the cache, breaker and timeout.
    ///
    /// # Errors
    ///
    /// Propagates the [`LookupError`].
    pub async fn resolve_address(&self, address: &str) -> Result<Coord<f64>, LookupError> {
        self.lookups.coordinate(address).await
    }

    /// Run one cycle over `pending` and commit its deferral bookkeeping.
    ///
    /// Lookups run with at most [`PlannerConfig::max_concurrency`] in flight
    /// and their results are consumed in input order. Cycles must not
    /// overlap: the deferral counters of the later commit win.
    ///
    /// # Errors
    ///
    /// [`PlanError::Cancelled`] when `cancel` fires first and
    /// [`PlanError::WarehouseUnresolvable`] when the depot does not geocode.
    pub async fn plan(
        &self,
        pending: Vec<Order>,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, PlanError> {
        let cycle = self.prepare(pending, cancel).await?;
        Ok(self.commit(cycle))
    }

    /// Run one cycle over `pending` without touching the deferral counters.
    ///
    /// The returned [`PendingCycle`] carries the counters the cycle would
    /// leave behind; they only take effect through [`GreedyPlanner::commit`].
    /// Dropping it discards the cycle, so a cancelled cycle leaves no trace.
    ///
    /// # Errors
    ///
    /// [`PlanError::Cancelled`] when `cancel` fires first and
    /// [`PlanError::WarehouseUnresolvable`] when the depot does not geocode.
    pub async fn prepare(
        &self,
        pending: Vec<Order>,
        cancel: &CancellationToken,
    ) -> Result<PendingCycle, PlanError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PlanError::Cancelled),
            cycle = self.run(pending) => cycle,
        }
    }

    /// Apply the deferral counters of `cycle` and return its report.
    #[must_use = "the report carries the rejections to write back"]
    pub fn commit(&self, cycle: PendingCycle) -> CycleReport {
        *self.deferrals.lock().unwrap_or_else(PoisonError::into_inner) = cycle.deferrals;
        cycle.report
    }

    async fn run(&self, pending: Vec<Order>) -> Result<PendingCycle, PlanError> {
        let warehouse = self
            .lookups
            .coordinate(&self.depot.warehouse_address)
            .await
            .map_err(|source| PlanError::WarehouseUnresolvable {
                address: self.depot.warehouse_address.clone(),
                source,
            })?;
        let departure = SystemTime::now();

        let outcomes: Vec<LookupOutcome> = stream::iter(pending)
            .map(|order| self.look_up(order, departure))
            .buffered(self.config.max_concurrency())
            .collect()
            .await;

        Ok(self.settle(outcomes, warehouse))
    }

    async fn look_up(&self, order: Order, departure: SystemTime) -> LookupOutcome {
        let coordinate = match order.coordinate {
            Some(known) => Ok(known),
            None => self.lookups.coordinate(&order.address).await,
        };
        let travel_time = match &coordinate {
            Err(err) if err.is_permanent() => None,
            _ => Some(
                self.lookups
                    .travel_time(&self.depot.warehouse_address, &order.address, departure)
                    .await,
            ),
        };
        LookupOutcome {
            order,
            coordinate,
            travel_time,
        }
    }

    fn settle(&self, outcomes: Vec<LookupOutcome>, warehouse: Coord<f64>) -> PendingCycle {
        let mut deferrals = self
            .deferrals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let live: HashSet<OrderId> = outcomes.iter().map(|outcome| outcome.order.id).collect();
        deferrals.retain(|id, _| live.contains(id));

        let max_deferrals = self.config.max_deferrals();
        let mut candidates = Vec::with_capacity(outcomes.len());
        let mut rejected = Vec::new();
        let mut resolved = Vec::new();

        for outcome in outcomes {
            let id = outcome.order.id;
            let coordinate = match outcome.coordinate {
                Ok(found) => {
                    if outcome.order.coordinate.is_none() {
                        resolved.push((id, found));
                    }
                    Some(found)
                }
                Err(err) if err.is_permanent() => {
                    log::warn!("rejecting order {id}: {err}");
                    deferrals.remove(&id);
                    rejected.push(RejectedOrder {
                        id,
                        reason: RejectionReason::Unresolvable,
                    });
                    continue;
                }
                Err(err) => {
                    log::warn!("order {id} deferred, coordinate unavailable: {err}");
                    None
                }
            };

            let travel_time = match outcome.travel_time {
                Some(Ok(duration)) => Some(duration),
                Some(Err(err)) if err.is_permanent() => {
                    if defer(&mut deferrals, id, max_deferrals) {
                        log::warn!("rejecting order {id} after {max_deferrals} cycles: {err}");
                        rejected.push(RejectedOrder {
                            id,
                            reason: RejectionReason::Unreachable,
                        });
                        continue;
                    }
                    log::warn!("order {id} deferred: {err}");
                    None
                }
                Some(Err(err)) => {
                    log::warn!("order {id} deferred, travel time unavailable: {err}");
                    None
                }
                None => None,
            };

            if let Some(duration) = travel_time {
                if duration > self.depot.max_travel {
                    if defer(&mut deferrals, id, max_deferrals) {
                        log::warn!(
                            "rejecting order {id}: {duration:?} exceeds {:?} for {max_deferrals} cycles",
                            self.depot.max_travel
                        );
                        rejected.push(RejectedOrder {
                            id,
                            reason: RejectionReason::Infeasible,
                        });
                        continue;
                    }
                    log::warn!(
                        "order {id} deferred: {duration:?} exceeds {:?}",
                        self.depot.max_travel
                    );
                } else if coordinate.is_some() {
                    deferrals.remove(&id);
                }
            }

            candidates.push(Candidate {
                order: outcome.order,
                coordinate,
                travel_time,
            });
        }

        let params = AssignmentParams {
            layout: self.depot.layout,
            warehouse,
            max_travel: self.depot.max_travel,
        };
        let assignment = assign(candidates, &params);
        log::debug!(
            "cycle assigned {} of {} orders; {} skipped, {} rejected",
            assignment.assigned_count(),
            assignment.pending_count(),
            assignment.skipped_count(),
            rejected.len()
        );

        PendingCycle {
            report: CycleReport {
                assignment,
                rejected,
                resolved,
                warehouse,
            },
            deferrals,
        }
    }
}

/// Count a deferral for `id`; `true` once the cap is reached, at which point
/// the counter is dropped.
fn defer(deferrals: &mut HashMap<OrderId, u32>, id: OrderId, max_deferrals: u32) -> bool {
    let count = deferrals.entry(id).or_insert(0);
    *count = count.saturating_add(1);
    if *count >= max_deferrals {
        deferrals.remove(&id);
        return true;
    }
    false
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests fail fast on fixtures that are known to be valid"
)]
mod tests {
    use super::*;
    use courier_core::test_support::{StaticGeocoder, StaticTravelTimes};
    use courier_core::{SkipReason, SlotKind, TravelTimeError};
    use rstest::{fixture, rstest};

    const DEPOT: &str = "198 Morris Rd";
    const DEPOT_AT: Coord<f64> = Coord { x: -73.93, y: 42.79 };

    fn order(id: u64, address: &str) -> Order {
        Order::new(
            OrderId::new(id),
            address,
            SystemTime::UNIX_EPOCH + Duration::from_secs(id),
        )
    }

    #[fixture]
    fn depot() -> DepotSettings {
        DepotSettings::new(
            DEPOT,
            SlotLayout::new(SlotKind::Driver, 2).expect("valid layout"),
            Duration::from_secs(120 * 60),
        )
    }

    fn geocoder() -> StaticGeocoder {
        StaticGeocoder::new()
            .with_address(DEPOT, DEPOT_AT)
            .with_address("near", Coord { x: -73.90, y: 42.80 })
            .with_address("far", Coord { x: -75.0, y: 44.0 })
    }

    fn travel() -> StaticTravelTimes {
        StaticTravelTimes::new()
            .with_minutes(DEPOT, "near", 10)
            .with_minutes(DEPOT, "far", 150)
    }

    #[rstest]
    #[tokio::test]
    async fn assigns_feasible_orders_and_reports_resolved_coordinates(depot: DepotSettings) {
        let planner = GreedyPlanner::new(geocoder(), travel(), depot, PlannerConfig::default());

        let report = planner
            .plan(vec![order(1, "near"), order(2, "far")], &CancellationToken::new())
            .await
            .expect("cycle completes");

        assert_eq!(report.warehouse, DEPOT_AT);
        assert_eq!(report.assignment.assigned_count(), 1);
        assert_eq!(
            report.assignment.skipped().first().map(|skipped| skipped.reason),
            Some(SkipReason::Infeasible {
                travel_time: Duration::from_secs(150 * 60)
            })
        );
        assert_eq!(report.resolved.len(), 2);
        assert!(report.rejected.is_empty());
        assert_eq!(planner.deferrals(OrderId::new(2)), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn infeasible_order_is_rejected_after_max_deferrals(depot: DepotSettings) {
        let config = PlannerConfig::default().with_max_deferrals(2);
        let planner = GreedyPlanner::new(geocoder(), travel(), depot, config);
        let token = CancellationToken::new();

        let first = planner.plan(vec![order(2, "far")], &token).await.expect("cycle");
        assert!(first.rejected.is_empty());

        let second = planner.plan(vec![order(2, "far")], &token).await.expect("cycle");
        assert_eq!(
            second.rejected,
            vec![RejectedOrder {
                id: OrderId::new(2),
                reason: RejectionReason::Infeasible
            }]
        );
        assert_eq!(second.assignment.pending_count(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn geocoder_no_match_rejects_immediately(depot: DepotSettings) {
        let estimator = travel();
        let planner = GreedyPlanner::new(geocoder(), estimator.clone(), depot, PlannerConfig::default());

        let report = planner
            .plan(vec![order(3, "atlantis")], &CancellationToken::new())
            .await
            .expect("cycle completes");

        assert_eq!(
            report.rejected,
            vec![RejectedOrder {
                id: OrderId::new(3),
                reason: RejectionReason::Unresolvable
            }]
        );
        assert_eq!(estimator.calls(), 0, "no directions lookup for unresolvable orders");
    }

    #[rstest]
    #[tokio::test]
    async fn transient_failures_never_count_as_deferrals(depot: DepotSettings) {
        let estimator = travel().with_failure(
            DEPOT,
            "near",
            TravelTimeError::Timeout {
                endpoint: "http://directions.test".into(),
                timeout_secs: 1,
            },
        );
        let config = PlannerConfig::default().with_max_deferrals(1);
        let planner = GreedyPlanner::new(geocoder(), estimator, depot, config);

        let report = planner
            .plan(vec![order(1, "near")], &CancellationToken::new())
            .await
            .expect("cycle completes");

        assert!(report.rejected.is_empty());
        assert_eq!(
            report.assignment.skipped().first().map(|skipped| skipped.reason),
            Some(SkipReason::TravelTimeUnavailable)
        );
        assert_eq!(planner.deferrals(OrderId::new(1)), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn unresolvable_warehouse_fails_the_cycle(depot: DepotSettings) {
        let planner = GreedyPlanner::new(
            StaticGeocoder::new(),
            travel(),
            depot,
            PlannerConfig::default(),
        );

        let err = planner
            .plan(vec![order(1, "near")], &CancellationToken::new())
            .await
            .expect_err("warehouse must resolve");

        assert!(matches!(err, PlanError::WarehouseUnresolvable { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn cancelled_token_short_circuits(depot: DepotSettings) {
        let planner = GreedyPlanner::new(geocoder(), travel(), depot, PlannerConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        let err = planner
            .plan(vec![order(2, "far")], &token)
            .await
            .expect_err("cancelled");

        assert_eq!(err, PlanError::Cancelled);
        assert_eq!(planner.deferrals(OrderId::new(2)), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn prepared_cycles_leave_counters_alone_until_committed(depot: DepotSettings) {
        let planner = GreedyPlanner::new(geocoder(), travel(), depot, PlannerConfig::default());
        let token = CancellationToken::new();

        let cycle = planner
            .prepare(vec![order(2, "far")], &token)
            .await
            .expect("cycle completes");
        assert_eq!(cycle.report().assignment.skipped_count(), 1);
        assert_eq!(planner.deferrals(OrderId::new(2)), 0);

        let report = planner.commit(cycle);
        assert_eq!(report.assignment.skipped_count(), 1);
        assert_eq!(planner.deferrals(OrderId::new(2)), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn discarded_cycle_at_the_cap_keeps_the_order_counted(depot: DepotSettings) {
        let config = PlannerConfig::default().with_max_deferrals(2);
        let planner = GreedyPlanner::new(geocoder(), travel(), depot, config);
        let token = CancellationToken::new();
        let far = OrderId::new(2);

        planner.plan(vec![order(2, "far")], &token).await.expect("cycle");
        assert_eq!(planner.deferrals(far), 1);

        let discarded = planner
            .prepare(vec![order(2, "far")], &token)
            .await
            .expect("cycle completes");
        assert_eq!(discarded.report().rejected.len(), 1);
        drop(discarded);
        assert_eq!(planner.deferrals(far), 1, "a discarded rejection must stay retryable");

        let retried = planner.plan(vec![order(2, "far")], &token).await.expect("cycle");
        assert_eq!(
            retried.rejected,
            vec![RejectedOrder {
                id: far,
                reason: RejectionReason::Infeasible
            }]
        );
        assert_eq!(planner.deferrals(far), 0);
    }

    #[rstest]
    fn defer_counts_up_to_the_cap() {
        let mut counts = HashMap::new();
        let id = OrderId::new(1);
        assert!(!defer(&mut counts, id, 3));
        assert!(!defer(&mut counts, id, 3));
        assert!(defer(&mut counts, id, 3));
        assert!(counts.is_empty());
    }
}
