//! Circuit breaker over the cumulative store error rate.
//!
//! Unlike a consecutive-failure breaker, this one tracks the error rate
//! across every batch commit the reconciler has attempted since the circuit
//! last closed. When the rate crosses the threshold the circuit opens and
//! invocations are refused outright for the reset window; the first attempt
//! after the window runs as a half-open probe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Refusing work until the reset window elapses.
    Open,
    /// One probe invocation allowed through.
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    opened_at: Option<Instant>,
}

/// Error-rate circuit breaker shared by all reconciler invocations.
#[derive(Debug)]
pub struct CircuitBreaker {
    error_threshold: f64,
    reset_after: Duration,
    inner: RwLock<Inner>,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl CircuitBreaker {
    /// Create a breaker with the given threshold and reset window.
    #[must_use]
    pub fn new(error_threshold: f64, reset_after: Duration) -> Self {
        Self {
            error_threshold,
            reset_after,
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                opened_at: None,
            }),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Current state, transitioning Open → HalfOpen when the window elapsed.
    pub async fn state(&self) -> CircuitState {
        {
            let inner = self.inner.read().await;
            match inner.state {
                CircuitState::Open => {
                    let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                    if elapsed < self.reset_after {
                        return CircuitState::Open;
                    }
                }
                other => return other,
            }
        }
        let mut inner = self.inner.write().await;
        if inner.state == CircuitState::Open {
            let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
            if elapsed >= self.reset_after {
                debug!("circuit transitioning to half-open");
                inner.state = CircuitState::HalfOpen;
            }
        }
        inner.state
    }

    /// Milliseconds until the open window elapses (0 when not open).
    pub async fn retry_after_ms(&self) -> u64 {
        let inner = self.inner.read().await;
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(opened_at)) => self
                .reset_after
                .saturating_sub(opened_at.elapsed())
                .as_millis() as u64,
            _ => 0,
        }
    }

    /// Whether an invocation may proceed.
    pub async fn allows(&self) -> bool {
        !matches!(self.state().await, CircuitState::Open)
    }

    /// Cumulative error rate since the circuit last closed.
    pub fn error_rate(&self) -> f64 {
        let failures = self.failures.load(Ordering::Relaxed);
        let total = failures + self.successes.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            failures as f64 / total as f64
        }
    }

    /// Record a successful store operation.
    pub async fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.write().await;
        if inner.state == CircuitState::HalfOpen {
            debug!("half-open probe succeeded, closing circuit");
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
            // The rate restarts with the recovery, otherwise the stale
            // failure history would reopen the circuit immediately.
            self.successes.store(1, Ordering::Relaxed);
            self.failures.store(0, Ordering::Relaxed);
        }
    }

    /// Record a failed store operation; may open the circuit.
    pub async fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.write().await;
        match inner.state {
            CircuitState::HalfOpen => {
                warn!("half-open probe failed, reopening circuit");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                let rate = self.error_rate();
                if rate > self.error_threshold {
                    warn!(
                        error_rate = rate,
                        threshold = self.error_threshold,
                        "error rate over threshold, opening circuit"
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }
}
