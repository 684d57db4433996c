//! Fixed pools of drivers or delivery zones.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use thiserror::Error;

/// What a slot represents. Only affects slot naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SlotKind {
    /// A driver; slots are named `DRIVER 1`, `DRIVER 2`, ...
    #[default]
    Driver,
    /// A delivery zone; slots are named `ZONE 1`, `ZONE 2`, ...
    Zone,
}

impl SlotKind {
    /// Upper-case prefix used in slot names.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Driver => "DRIVER",
            Self::Zone => "ZONE",
        }
    }
}

/// Error returned when parsing an unknown [`SlotKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown slot kind {0:?} (expected `driver` or `zone`)")]
pub struct ParseSlotKindError(String);

impl FromStr for SlotKind {
    type Err = ParseSlotKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driver" | "drivers" => Ok(Self::Driver),
            "zone" | "zones" => Ok(Self::Zone),
            _ => Err(ParseSlotKindError(s.to_owned())),
        }
    }
}

/// Stable name of a slot, e.g. `DRIVER 3`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SlotName(String);

impl SlotName {
    /// Wrap a slot name. Names are not validated until used against a
    /// [`SlotLayout`].
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Errors returned by [`SlotLayout::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// A layout needs at least one slot.
    #[error("slot capacity must be at least one")]
    ZeroCapacity,
}

/// The fixed set of slots orders are partitioned into.
///
/// # Examples
///
/// ```
/// use courier_core::{SlotKind, SlotLayout};
///
/// # fn main() -> Result<(), courier_core::LayoutError> {
/// let layout = SlotLayout::new(SlotKind::Zone, 2)?;
/// let names: Vec<String> = layout.names().map(|name| name.to_string()).collect();
/// assert_eq!(names, ["ZONE 1", "ZONE 2"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotLayout {
    kind: SlotKind,
    capacity: NonZeroUsize,
}

impl SlotLayout {
    /// Validate and construct a layout of `capacity` slots.
    pub fn new(kind: SlotKind, capacity: usize) -> Result<Self, LayoutError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(LayoutError::ZeroCapacity)?;
        Ok(Self { kind, capacity })
    }

    /// Slot kind used for naming.
    #[must_use]
    pub const fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Name of the slot at zero-based `index`, if within capacity.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<SlotName> {
        (index < self.capacity()).then(|| self.name_unchecked(index))
    }

    /// Slot names in index order.
    pub fn names(&self) -> impl Iterator<Item = SlotName> + '_ {
        (0..self.capacity()).map(|index| self.name_unchecked(index))
    }

    /// Zero-based index of `name`, if it belongs to this layout.
    #[must_use]
    pub fn index_of(&self, name: &SlotName) -> Option<usize> {
        let number = name
            .as_str()
            .strip_prefix(self.kind.prefix())?
            .strip_prefix(' ')?;
        // Reject forms such as "DRIVER 01" that would alias "DRIVER 1".
        if number.starts_with('0') {
            return None;
        }
        let position: usize = number.parse().ok()?;
        let index = position.checked_sub(1)?;
        (index < self.capacity()).then_some(index)
    }

    /// Whether `name` is one of this layout's slots.
    #[must_use]
    pub fn contains(&self, name: &SlotName) -> bool {
        self.index_of(name).is_some()
    }

    fn name_unchecked(&self, index: usize) -> SlotName {
        SlotName(format!("{} {}", self.kind.prefix(), index + 1))
    }
}
