//! Greedy nearest-cluster assignment of orders to slots.
//!
//! [`assign`] is a pure function: all external lookups have already been
//! performed and are carried by each [`Candidate`]. Given identical
//! candidates and parameters it always produces the same [`Assignment`].
//!
//! The heuristic visits orders first-come-first-served and drops each one into
//! the slot whose existing orders are, on average, closest to it. An empty
//! slot scores the distance from the warehouse, so a new cluster only opens
//! when the order is nearer the warehouse than to every existing cluster.

use std::cmp::Ordering;
use std::time::Duration;

use geo::Coord;

use crate::distance::{geodesic_miles, is_valid_coordinate};
use crate::{Order, OrderId, SlotLayout, SlotName};

/// A pending order together with the outcome of its lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The order to place.
    pub order: Order,
    /// Resolved coordinate, or `None` when geocoding failed this cycle.
    pub coordinate: Option<Coord<f64>>,
    /// Driving time from the warehouse, or `None` when unavailable.
    pub travel_time: Option<Duration>,
}

impl Candidate {
    /// Candidate whose lookups both succeeded.
    #[must_use]
    pub const fn resolved(order: Order, coordinate: Coord<f64>, travel_time: Duration) -> Self {
        Self {
            order,
            coordinate: Some(coordinate),
            travel_time: Some(travel_time),
        }
    }
}

/// Fixed inputs of an assignment cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentParams {
    /// Slots to partition orders into.
    pub layout: SlotLayout,
    /// Warehouse coordinate, used to score empty slots.
    pub warehouse: Coord<f64>,
    /// Longest acceptable drive from the warehouse.
    pub max_travel: Duration,
}

/// Why a candidate was left out of this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "reason", rename_all = "snake_case"))]
pub enum SkipReason {
    /// No usable coordinate.
    Unresolvable,
    /// No travel-time estimate.
    TravelTimeUnavailable,
    /// Travel time exceeded the budget.
    Infeasible {
        /// Estimated drive from the warehouse.
        travel_time: Duration,
    },
}

/// A candidate deferred to a later cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkippedOrder {
    /// Deferred order.
    pub id: OrderId,
    /// Why it was deferred.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub reason: SkipReason,
}

/// Orders placed in one slot, in submission order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotAssignment {
    /// Slot name.
    pub name: SlotName,
    /// Assigned orders, oldest first.
    pub orders: Vec<Order>,
}

/// Result of one assignment cycle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    slots: Vec<SlotAssignment>,
    skipped: Vec<SkippedOrder>,
    pending: usize,
}

impl Assignment {
    /// Every slot of the layout, in index order, including empty ones.
    #[must_use]
    pub fn slots(&self) -> &[SlotAssignment] {
        &self.slots
    }

    /// Orders assigned to `name`, or `None` for a slot outside the layout.
    #[must_use]
    pub fn slot(&self, name: &SlotName) -> Option<&[Order]> {
        self.slots
            .iter()
            .find(|slot| &slot.name == name)
            .map(|slot| slot.orders.as_slice())
    }

    /// Slot an order was placed in.
    #[must_use]
    pub fn slot_of(&self, id: OrderId) -> Option<&SlotName> {
        self.slots
            .iter()
            .find(|slot| slot.orders.iter().any(|order| order.id == id))
            .map(|slot| &slot.name)
    }

    /// Candidates deferred this cycle, in the order they were visited.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedOrder] {
        &self.skipped
    }

    /// Number of candidates deferred this cycle.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Number of pending orders the cycle considered.
    #[must_use]
    pub const fn pending_count(&self) -> usize {
        self.pending
    }

    /// Number of orders placed in a slot.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.orders.len()).sum()
    }

    /// Consume the assignment, returning the slots.
    #[must_use]
    pub fn into_slots(self) -> Vec<SlotAssignment> {
        self.slots
    }
}

struct SlotState {
    name: SlotName,
    members: Vec<(Order, Coord<f64>)>,
}

impl SlotState {
    fn score(&self, warehouse: Coord<f64>, coordinate: Coord<f64>) -> f64 {
        if self.members.is_empty() {
            return geodesic_miles(warehouse, coordinate);
        }
        let total: f64 = self
            .members
            .iter()
            .map(|(_, member)| geodesic_miles(*member, coordinate))
            .sum();
        total / self.members.len() as f64
    }
}

/// Partition candidates across the layout's slots.
///
/// Candidates are visited oldest first (submission time, then identifier).
/// Each feasible candidate goes to the slot with the lowest score; ties go to
/// the lowest slot index. Candidates without a coordinate, without a travel
/// time, or with a travel time above `params.max_travel` are reported in
/// [`Assignment::skipped`] and placed nowhere.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
/// use geo::Coord;
/// use courier_core::{assign, AssignmentParams, Candidate, Order, OrderId, SlotKind, SlotLayout};
///
/// # fn main() -> Result<(), courier_core::LayoutError> {
/// let params = AssignmentParams {
///     layout: SlotLayout::new(SlotKind::Driver, 2)?,
///     warehouse: Coord { x: 0.0, y: 0.0 },
///     max_travel: Duration::from_secs(2 * 60 * 60),
/// };
/// let order = Order::new(OrderId::new(1), "1 Main St", SystemTime::UNIX_EPOCH);
/// let candidate = Candidate::resolved(order, Coord { x: 0.01, y: 0.0 }, Duration::from_secs(600));
///
/// let assignment = assign(vec![candidate], &params);
/// assert_eq!(assignment.assigned_count(), 1);
/// assert_eq!(assignment.slots()[0].name.as_str(), "DRIVER 1");
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn assign(mut candidates: Vec<Candidate>, params: &AssignmentParams) -> Assignment {
    let pending = candidates.len();
    candidates.sort_by_key(|candidate| candidate.order.chronological_key());

    let mut slots: Vec<SlotState> = params
        .layout
        .names()
        .map(|name| SlotState {
            name,
            members: Vec::new(),
        })
        .collect();
    let mut skipped = Vec::new();

    for candidate in candidates {
        let id = candidate.order.id;
        let coordinate = match candidate.coordinate {
            Some(coordinate) if is_valid_coordinate(coordinate) => coordinate,
            _ => {
                skipped.push(SkippedOrder {
                    id,
                    reason: SkipReason::Unresolvable,
                });
                continue;
            }
        };
        let Some(travel_time) = candidate.travel_time else {
            skipped.push(SkippedOrder {
                id,
                reason: SkipReason::TravelTimeUnavailable,
            });
            continue;
        };
        if travel_time > params.max_travel {
            skipped.push(SkippedOrder {
                id,
                reason: SkipReason::Infeasible { travel_time },
            });
            continue;
        }

        let best = best_slot(&slots, params.warehouse, coordinate);
        if let Some(slot) = slots.get_mut(best) {
            slot.members.push((candidate.order, coordinate));
        }
    }

    let slots = slots
        .into_iter()
        .map(|state| {
            let mut orders: Vec<Order> = state.members.into_iter().map(|(order, _)| order).collect();
            orders.sort_by_key(Order::chronological_key);
            SlotAssignment {
                name: state.name,
                orders,
            }
        })
        .collect();

    Assignment {
        slots,
        skipped,
        pending,
    }
}

/// Index of the lowest-scoring slot; the first slot wins ties and NaN scores
/// never win.
fn best_slot(slots: &[SlotState], warehouse: Coord<f64>, coordinate: Coord<f64>) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (index, slot) in slots.iter().enumerate() {
        let score = slot.score(warehouse, coordinate);
        let better = match best {
            None => !score.is_nan(),
            Some((_, current)) => score.partial_cmp(&current) == Some(Ordering::Less),
        };
        if better {
            best = Some((index, score));
        }
    }
    best.map_or(0, |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotKind;
    use rstest::{fixture, rstest};
    use std::time::SystemTime;

    const MINUTE: Duration = Duration::from_secs(60);

    #[fixture]
    fn params() -> AssignmentParams {
        AssignmentParams {
            layout: SlotLayout::new(SlotKind::Driver, 2).expect("valid layout"),
            warehouse: Coord { x: 0.0, y: 0.0 },
            max_travel: 120 * MINUTE,
        }
    }

    fn order(id: u64, secs: u64) -> Order {
        Order::new(
            OrderId::new(id),
            format!("order {id}"),
            SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        )
    }

    fn at(id: u64, secs: u64, x: f64, y: f64) -> Candidate {
        Candidate::resolved(order(id, secs), Coord { x, y }, 10 * MINUTE)
    }

    fn ids(orders: &[Order]) -> Vec<u64> {
        orders.iter().map(|order| order.id.get()).collect()
    }

    #[rstest]
    fn empty_input_yields_empty_slots(params: AssignmentParams) {
        let assignment = assign(Vec::new(), &params);
        assert_eq!(assignment.slots().len(), 2);
        assert!(assignment.slots().iter().all(|slot| slot.orders.is_empty()));
        assert_eq!(assignment.pending_count(), 0);
        assert_eq!(assignment.skipped_count(), 0);
    }

    #[rstest]
    fn second_cluster_opens_for_order_nearer_the_warehouse(params: AssignmentParams) {
        // Order 1 sits east; order 2 sits west, closer to the warehouse than to
        // order 1, so it opens the second slot.
        let assignment = assign(
            vec![at(1, 0, 0.5, 0.0), at(2, 1, -0.2, 0.0), at(3, 2, 0.6, 0.0)],
            &params,
        );
        let slots = assignment.slots();
        assert_eq!(ids(&slots[0].orders), vec![1, 3]);
        assert_eq!(ids(&slots[1].orders), vec![2]);
    }

    #[rstest]
    fn visits_candidates_in_submission_order(params: AssignmentParams) {
        // Supplied out of order; the oldest order must seed the first slot.
        let assignment = assign(vec![at(2, 5, -0.2, 0.0), at(1, 1, 0.5, 0.0)], &params);
        assert_eq!(ids(&assignment.slots()[0].orders), vec![1]);
        assert_eq!(ids(&assignment.slots()[1].orders), vec![2]);
    }

    #[rstest]
    fn equal_timestamps_fall_back_to_id(params: AssignmentParams) {
        let assignment = assign(vec![at(7, 0, -0.2, 0.0), at(3, 0, 0.5, 0.0)], &params);
        assert_eq!(ids(&assignment.slots()[0].orders), vec![3]);
    }

    #[rstest]
    #[case(None, Some(10 * MINUTE), SkipReason::Unresolvable)]
    #[case(Some(Coord { x: f64::NAN, y: 0.0 }), Some(10 * MINUTE), SkipReason::Unresolvable)]
    #[case(Some(Coord { x: 0.1, y: 0.0 }), None, SkipReason::TravelTimeUnavailable)]
    #[case(
        Some(Coord { x: 0.1, y: 0.0 }),
        Some(150 * MINUTE),
        SkipReason::Infeasible { travel_time: 150 * MINUTE }
    )]
    fn skips_unusable_candidates(
        params: AssignmentParams,
        #[case] coordinate: Option<Coord<f64>>,
        #[case] travel_time: Option<Duration>,
        #[case] expected: SkipReason,
    ) {
        let candidate = Candidate {
            order: order(1, 0),
            coordinate,
            travel_time,
        };
        let assignment = assign(vec![candidate], &params);
        assert_eq!(assignment.assigned_count(), 0);
        assert_eq!(
            assignment.skipped(),
            &[SkippedOrder {
                id: OrderId::new(1),
                reason: expected,
            }]
        );
        assert_eq!(assignment.pending_count(), 1);
    }

    #[rstest]
    fn travel_time_equal_to_budget_is_feasible(params: AssignmentParams) {
        let candidate = Candidate::resolved(order(1, 0), Coord { x: 0.1, y: 0.0 }, 120 * MINUTE);
        let assignment = assign(vec![candidate], &params);
        assert_eq!(assignment.assigned_count(), 1);
    }

    #[rstest]
    fn reports_slot_membership(params: AssignmentParams) {
        let assignment = assign(vec![at(1, 0, 0.5, 0.0)], &params);
        assert_eq!(
            assignment.slot_of(OrderId::new(1)),
            Some(&SlotName::from("DRIVER 1"))
        );
        assert_eq!(assignment.slot_of(OrderId::new(2)), None);
        assert_eq!(assignment.slot(&SlotName::from("DRIVER 2")), Some(&[][..]));
        assert_eq!(assignment.slot(&SlotName::from("DRIVER 9")), None);
    }

    #[cfg(feature = "serde")]
    #[rstest]
    #[case::unresolvable(SkipReason::Unresolvable, "unresolvable")]
    #[case::travel_time_unavailable(SkipReason::TravelTimeUnavailable, "travel_time_unavailable")]
    #[case::infeasible(SkipReason::Infeasible { travel_time: 150 * MINUTE }, "infeasible")]
    fn skipped_orders_serialise_with_a_flat_reason_tag(
        #[case] reason: SkipReason,
        #[case] tag: &str,
    ) {
        let skipped = SkippedOrder {
            id: OrderId::new(7),
            reason,
        };

        let json = serde_json::to_value(skipped).expect("serialise skipped order");
        assert_eq!(json["id"], 7);
        assert_eq!(json["reason"], tag);

        let decoded: SkippedOrder = serde_json::from_value(json).expect("deserialise skipped order");
        assert_eq!(decoded, skipped);
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn infeasible_reason_carries_its_travel_time_beside_the_tag() {
        let json = serde_json::to_value(SkippedOrder {
            id: OrderId::new(3),
            reason: SkipReason::Infeasible {
                travel_time: 150 * MINUTE,
            },
        })
        .expect("serialise skipped order");

        assert_eq!(json["travel_time"]["secs"], 9000);
        let unknown = serde_json::json!({ "id": 3, "reason": "lost" });
        assert!(serde_json::from_value::<SkippedOrder>(unknown).is_err());
    }
}
