//! Delivery orders and their identities.

use std::fmt;
use std::time::SystemTime;

use geo::Coord;

/// Opaque identifier allocated by the [`Ledger`](crate::Ledger) when an order
/// is submitted.
///
/// Identifiers increase monotonically and are never reused, so two orders for
/// the same address are always distinguishable, even after one is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OrderId(u64);

impl OrderId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A customer delivery order.
///
/// Orders are created by [`Ledger::submit`](crate::Ledger::submit) and its
/// variants. The `coordinate` is populated when the address was geocoded at
/// submission time (or back-filled after a cycle resolved it) so later cycles
/// do not need to resolve it again.
///
/// # Examples
///
/// ```
/// use std::time::SystemTime;
/// use courier_core::{Order, OrderId};
///
/// let order = Order::new(OrderId::new(1), "198 Morris Rd", SystemTime::UNIX_EPOCH);
/// assert_eq!(order.address, "198 Morris Rd");
/// assert!(order.coordinate.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    /// Unique identity used for all equality and membership checks.
    pub id: OrderId,
    /// Free-form postal address as entered by the caller.
    pub address: String,
    /// Instant the order was submitted.
    pub submitted_at: SystemTime,
    /// Cached coordinate (`x` = longitude, `y` = latitude), if known.
    #[cfg_attr(feature = "serde", serde(default))]
    pub coordinate: Option<Coord<f64>>,
}

impl Order {
    /// Construct an order without a cached coordinate.
    pub fn new(id: OrderId, address: impl Into<String>, submitted_at: SystemTime) -> Self {
        Self {
            id,
            address: address.into(),
            submitted_at,
            coordinate: None,
        }
    }

    /// Attach a cached coordinate.
    #[must_use]
    pub const fn with_coordinate(mut self, coordinate: Coord<f64>) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    /// Ordering key used everywhere orders are sequenced: submission time,
    /// then identifier.
    #[must_use]
    pub const fn chronological_key(&self) -> (SystemTime, OrderId) {
        (self.submitted_at, self.id)
    }
}
