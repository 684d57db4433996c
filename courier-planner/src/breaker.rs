//! Circuit breaker guarding calls to an external service.
//!
//! After `threshold` consecutive transient failures the breaker opens and
//! callers fail fast. Once `cooldown` has elapsed a single trial call is let
//! through; its outcome closes the breaker or re-opens it for another
//! cooldown. Time is read from `tokio::time` so paused-clock tests can drive
//! it.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls flow normally.
    Closed,
    /// Calls are refused until the cooldown elapses.
    Open,
    /// Cooldown elapsed; the next call is a trial.
    HalfOpen,
}

#[derive(Debug, Default)]
struct Inner {
    failures: u32,
    opened_at: Option<Instant>,
    trial_started: Option<Instant>,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a closed breaker for the service called `name`.
    #[must_use]
    pub fn new(name: &'static str, threshold: u32, cooldown: Duration) -> Self {
        Self {
            name,
            threshold: threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        let inner = self.lock();
        match inner.opened_at {
            None => BreakerState::Closed,
            Some(opened) if opened.elapsed() >= self.cooldown => BreakerState::HalfOpen,
            Some(_) => BreakerState::Open,
        }
    }

    /// Ask to make a call. Returns `false` when the call must be skipped.
    ///
    /// While half-open only one trial is admitted per cooldown; a trial whose
    /// outcome is never recorded stops blocking once another cooldown passes.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        let Some(opened) = inner.opened_at else {
            return true;
        };
        if opened.elapsed() < self.cooldown {
            return false;
        }
        if inner
            .trial_started
            .is_some_and(|started| started.elapsed() < self.cooldown)
        {
            return false;
        }
        inner.trial_started = Some(Instant::now());
        true
    }

    /// Record a call that reached the service.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.opened_at.is_some() {
            log::info!("{} circuit closed", self.name);
        }
        *inner = Inner::default();
    }

    /// Record a transient failure.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        if inner.trial_started.take().is_some() {
            inner.opened_at = Some(Instant::now());
            log::warn!("{} trial call failed; circuit re-opened", self.name);
            return;
        }
        inner.failures = inner.failures.saturating_add(1);
        if inner.opened_at.is_none() && inner.failures >= self.threshold {
            inner.opened_at = Some(Instant::now());
            log::warn!(
                "{} circuit opened after {} consecutive failures; pausing for {:?}",
                self.name,
                inner.failures,
                self.cooldown
            );
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const COOLDOWN: Duration = Duration::from_secs(30);

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_and_fails_fast() {
        let breaker = CircuitBreaker::new("geocoder", 2, COOLDOWN);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.try_acquire());

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.try_acquire());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn success_resets_the_failure_count() {
        let breaker = CircuitBreaker::new("geocoder", 2, COOLDOWN);
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn admits_one_trial_after_cooldown() {
        let breaker = CircuitBreaker::new("directions", 1, COOLDOWN);
        breaker.record_failure();
        tokio::time::advance(COOLDOWN).await;

        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(breaker.try_acquire());
        assert!(!breaker.try_acquire(), "only one trial per cooldown");

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.try_acquire());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn failed_trial_reopens_for_a_full_cooldown() {
        let breaker = CircuitBreaker::new("directions", 1, COOLDOWN);
        breaker.record_failure();
        tokio::time::advance(COOLDOWN).await;
        assert!(breaker.try_acquire());

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        tokio::time::advance(COOLDOWN / 2).await;
        assert!(!breaker.try_acquire());
        tokio::time::advance(COOLDOWN / 2).await;
        assert!(breaker.try_acquire());
    }
}
