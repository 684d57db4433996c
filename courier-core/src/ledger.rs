//! The working set of orders and their delivery state.
//!
//! The ledger is an explicit object owned by the caller. It has no interior
//! mutability; callers that share it across tasks must serialise access (the
//! planner's dispatcher keeps it behind a single async mutex).
//!
//! Invariants maintained by every operation:
//! - an order is delivered in at most one slot;
//! - an order is either pending, delivered or rejected, never two at once;
//! - identifiers are never reused, even after [`Ledger::clear`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::SystemTime;

use geo::Coord;
use thiserror::Error;

use crate::{Order, OrderId, SlotLayout, SlotName};

/// Why an order was withdrawn from assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RejectionReason {
    /// The geocoder has no coordinates for the address.
    Unresolvable,
    /// The address stayed outside the travel-time budget for too many cycles.
    Infeasible,
    /// The directions service found no route for too many cycles.
    Unreachable,
}

/// Where an order sits in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    /// Waiting to be assigned and delivered.
    Pending,
    /// Marked delivered by the given slot.
    Delivered(SlotName),
    /// Withdrawn from assignment.
    Rejected(RejectionReason),
}

/// Errors returned by ledger mutations.
///
/// A failed mutation leaves the ledger unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The submitted address was blank.
    #[error("order address must not be empty")]
    EmptyAddress,
    /// The slot is not part of the ledger's layout.
    #[error("unknown slot {slot}")]
    UnknownSlot {
        /// Offending slot name.
        slot: SlotName,
    },
    /// No order with this identifier is in the working set.
    #[error("unknown order {id}")]
    UnknownOrder {
        /// Offending identifier.
        id: OrderId,
    },
    /// The order was already delivered by a different slot.
    #[error("order {id} was already delivered by {slot}")]
    DeliveredElsewhere {
        /// Offending identifier.
        id: OrderId,
        /// Slot that delivered it.
        slot: SlotName,
    },
}

/// Process-wide working set of orders.
///
/// # Examples
///
/// ```
/// use courier_core::{Ledger, SlotKind, SlotLayout};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let layout = SlotLayout::new(SlotKind::Driver, 2)?;
/// let mut ledger = Ledger::new(layout);
/// let order = ledger.submit("1 Main St")?;
/// assert_eq!(ledger.pending().len(), 1);
///
/// let slot = layout.name(0).ok_or("missing slot")?;
/// ledger.mark_delivered(&slot, &[order.id])?;
/// assert!(ledger.pending().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Ledger {
    layout: SlotLayout,
    next_id: u64,
    orders: Vec<Order>,
    delivered: BTreeMap<SlotName, BTreeSet<OrderId>>,
    delivered_by: HashMap<OrderId, SlotName>,
    rejected: BTreeMap<OrderId, RejectionReason>,
}

impl Ledger {
    /// Create an empty ledger for the given slots.
    #[must_use]
    pub fn new(layout: SlotLayout) -> Self {
        Self {
            layout,
            next_id: 1,
            orders: Vec::new(),
            delivered: BTreeMap::new(),
            delivered_by: HashMap::new(),
            rejected: BTreeMap::new(),
        }
    }

    /// Slots this ledger tracks deliveries for.
    #[must_use]
    pub const fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    /// Record a new order stamped with the current time.
    pub fn submit(&mut self, address: impl Into<String>) -> Result<Order, LedgerError> {
        self.insert(address.into(), SystemTime::now(), None)
    }

    /// Record a new order whose address was geocoded at submission.
    pub fn submit_resolved(
        &mut self,
        address: impl Into<String>,
        coordinate: Coord<f64>,
    ) -> Result<Order, LedgerError> {
        self.insert(address.into(), SystemTime::now(), Some(coordinate))
    }

    /// Record a new order with an explicit submission instant.
    ///
    /// Used when replaying orders captured elsewhere.
    pub fn submit_at(
        &mut self,
        address: impl Into<String>,
        submitted_at: SystemTime,
    ) -> Result<Order, LedgerError> {
        self.insert(address.into(), submitted_at, None)
    }

    fn insert(
        &mut self,
        address: String,
        submitted_at: SystemTime,
        coordinate: Option<Coord<f64>>,
    ) -> Result<Order, LedgerError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::EmptyAddress);
        }
        let id = OrderId::new(self.next_id);
        self.next_id += 1;
        let order = Order {
            id,
            address: trimmed.to_owned(),
            submitted_at,
            coordinate,
        };
        self.orders.push(order.clone());
        Ok(order)
    }

    /// Look up an order in the working set.
    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }

    /// All orders in the working set, in submission order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Orders neither delivered nor rejected, in submission order.
    #[must_use]
    pub fn pending(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|order| self.is_pending(order.id))
            .cloned()
            .collect()
    }

    fn is_pending(&self, id: OrderId) -> bool {
        !self.delivered_by.contains_key(&id) && !self.rejected.contains_key(&id)
    }

    /// Lifecycle state of an order, or `None` when it is not in the working
    /// set.
    #[must_use]
    pub fn status(&self, id: OrderId) -> Option<OrderStatus> {
        self.get(id)?;
        if let Some(slot) = self.delivered_by.get(&id) {
            return Some(OrderStatus::Delivered(slot.clone()));
        }
        Some(
            self.rejected
                .get(&id)
                .map_or(OrderStatus::Pending, |reason| OrderStatus::Rejected(*reason)),
        )
    }

    /// Orders delivered by `slot`.
    pub fn delivered(&self, slot: &SlotName) -> impl Iterator<Item = OrderId> + '_ {
        self.delivered.get(slot).into_iter().flatten().copied()
    }

    /// Orders withdrawn from assignment, by identifier.
    pub fn rejected(&self) -> impl Iterator<Item = (OrderId, RejectionReason)> + '_ {
        self.rejected.iter().map(|(id, reason)| (*id, *reason))
    }

    /// Mark orders as delivered by `slot`.
    ///
    /// Re-marking an order already delivered by the same slot is a no-op.
    /// Rejected orders may be delivered; delivery clears the rejection. The
    /// whole batch is validated before anything changes.
    ///
    /// Returns the number of orders newly marked delivered.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownSlot`] for a slot outside the layout,
    /// [`LedgerError::UnknownOrder`] for an identifier not in the working set
    /// and [`LedgerError::DeliveredElsewhere`] when another slot already
    /// delivered one of the orders.
    pub fn mark_delivered(&mut self, slot: &SlotName, ids: &[OrderId]) -> Result<usize, LedgerError> {
        if !self.layout.contains(slot) {
            return Err(LedgerError::UnknownSlot { slot: slot.clone() });
        }
        for &id in ids {
            if self.get(id).is_none() {
                return Err(LedgerError::UnknownOrder { id });
            }
            if let Some(existing) = self.delivered_by.get(&id)
                && existing != slot
            {
                return Err(LedgerError::DeliveredElsewhere {
                    id,
                    slot: existing.clone(),
                });
            }
        }

        let mut newly_marked = 0;
        for &id in ids {
            if self.delivered_by.contains_key(&id) {
                continue;
            }
            self.rejected.remove(&id);
            self.delivered_by.insert(id, slot.clone());
            self.delivered.entry(slot.clone()).or_default().insert(id);
            newly_marked += 1;
        }
        Ok(newly_marked)
    }

    /// Withdraw a pending order from assignment.
    ///
    /// Rejecting an already rejected order replaces the reason.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownOrder`] when the order is not in the working set
    /// and [`LedgerError::DeliveredElsewhere`] when it was already delivered.
    pub fn reject(&mut self, id: OrderId, reason: RejectionReason) -> Result<(), LedgerError> {
        if self.get(id).is_none() {
            return Err(LedgerError::UnknownOrder { id });
        }
        if let Some(slot) = self.delivered_by.get(&id) {
            return Err(LedgerError::DeliveredElsewhere {
                id,
                slot: slot.clone(),
            });
        }
        self.rejected.insert(id, reason);
        Ok(())
    }

    /// Record a coordinate resolved after submission.
    ///
    /// Returns `false` when the order is not in the working set. An existing
    /// coordinate is left untouched.
    pub fn record_coordinate(&mut self, id: OrderId, coordinate: Coord<f64>) -> bool {
        match self.orders.iter_mut().find(|order| order.id == id) {
            Some(order) => {
                order.coordinate.get_or_insert(coordinate);
                true
            }
            None => false,
        }
    }

    /// Remove orders from the working set entirely.
    ///
    /// Unknown identifiers are ignored. Returns the number of orders removed.
    pub fn clear(&mut self, ids: &[OrderId]) -> usize {
        let targets: BTreeSet<OrderId> = ids.iter().copied().collect();
        let before = self.orders.len();
        self.orders.retain(|order| !targets.contains(&order.id));
        for id in &targets {
            if let Some(slot) = self.delivered_by.remove(id)
                && let Some(set) = self.delivered.get_mut(&slot)
            {
                set.remove(id);
                if set.is_empty() {
                    self.delivered.remove(&slot);
                }
            }
            self.rejected.remove(id);
        }
        before - self.orders.len()
    }
}
