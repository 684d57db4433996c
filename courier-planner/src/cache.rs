//! Process-wide coordinate cache keyed by normalised address.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use geo::Coord;

/// Canonical cache key for `address`: trimmed, inner whitespace collapsed to
/// single spaces, lower-cased.
///
/// # Examples
///
/// ```
/// use courier_planner::normalise_address;
///
/// assert_eq!(normalise_address("  1 Main   St\tAlbany "), "1 main st albany");
/// ```
#[must_use]
pub fn normalise_address(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Shared map from normalised address to coordinate.
///
/// Clones share storage. Entries never expire.
#[derive(Debug, Clone, Default)]
pub struct CoordinateCache {
    entries: Arc<RwLock<HashMap<String, Coord<f64>>>>,
}

impl CoordinateCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached coordinate for `address`, if any.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<Coord<f64>> {
        let key = normalise_address(address);
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
    }

    /// Remember `coordinate` for `address`, replacing any previous entry.
    pub fn insert(&self, address: &str, coordinate: Coord<f64>) {
        let key = normalise_address(address);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, coordinate);
    }

    /// Number of cached addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
