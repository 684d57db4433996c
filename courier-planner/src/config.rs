//! Lookup tuning for a planning cycle.

use std::time::Duration;

/// Default number of orders looked up concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
/// Default per-call timeout for geocoding and directions requests.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of failed cycles before an order is rejected.
pub const DEFAULT_MAX_DEFERRALS: u32 = 3;
/// Default number of consecutive transient failures that opens a breaker.
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 5;
/// Default time an open breaker waits before allowing a trial call.
pub const DEFAULT_BREAKER_COOLDOWN: Duration = Duration::from_secs(30);

const MIN_LOOKUP_TIMEOUT: Duration = Duration::from_millis(1);

/// Tuning for [`crate::GreedyPlanner`].
///
/// Every setter clamps its input into a usable range, so a configuration
/// built from user input can never disable lookups entirely.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use courier_planner::PlannerConfig;
///
/// let config = PlannerConfig::default()
///     .with_max_concurrency(0)
///     .with_lookup_timeout(Duration::from_secs(3));
/// assert_eq!(config.max_concurrency(), 1);
/// assert_eq!(config.lookup_timeout(), Duration::from_secs(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    max_concurrency: usize,
    lookup_timeout: Duration,
    max_deferrals: u32,
    breaker_threshold: u32,
    breaker_cooldown: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            max_deferrals: DEFAULT_MAX_DEFERRALS,
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
            breaker_cooldown: DEFAULT_BREAKER_COOLDOWN,
        }
    }
}

impl PlannerConfig {
    /// Cap on concurrent lookups; at least one.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = if max_concurrency == 0 { 1 } else { max_concurrency };
        self
    }

    /// Per-call timeout; at least one millisecond.
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout.max(MIN_LOOKUP_TIMEOUT);
        self
    }

    /// Failed cycles tolerated before rejection; at least one.
    #[must_use]
    pub fn with_max_deferrals(mut self, max_deferrals: u32) -> Self {
        self.max_deferrals = max_deferrals.max(1);
        self
    }

    /// Consecutive transient failures that open a breaker; at least one.
    #[must_use]
    pub fn with_breaker_threshold(mut self, threshold: u32) -> Self {
        self.breaker_threshold = threshold.max(1);
        self
    }

    /// Time an open breaker waits before a trial call.
    #[must_use]
    pub const fn with_breaker_cooldown(mut self, cooldown: Duration) -> Self {
        self.breaker_cooldown = cooldown;
        self
    }

    /// Cap on concurrent lookups.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Per-call timeout.
    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// Failed cycles tolerated before rejection.
    #[must_use]
    pub const fn max_deferrals(&self) -> u32 {
        self.max_deferrals
    }

    /// Consecutive transient failures that open a breaker.
    #[must_use]
    pub const fn breaker_threshold(&self) -> u32 {
        self.breaker_threshold
    }

    /// Time an open breaker waits before a trial call.
    #[must_use]
    pub const fn breaker_cooldown(&self) -> Duration {
        self.breaker_cooldown
    }
}
