use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CircuitBreakerConfig;

/// The state of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, calls go to the provider
    Closed,
    /// Circuit is open, the provider is skipped
    Open,
    /// Cool-down elapsed; trial calls decide whether to close again
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: usize,
    half_open_successes: usize,
    opened_at: Option<Instant>,
}

/// Circuit breaker guarding one provider.
///
/// A provider that fails `failure_threshold` times in a row is skipped until
/// `reset_timeout` has passed.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    inner: Mutex<BreakerState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
            }),
            config,
        }
    }

    /// Check if the circuit breaker allows the call to proceed
    pub async fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock().await;

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.reset_timeout);

                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    debug!(provider = %self.name, "Circuit breaker half-open");
                }
                cooled_down
            }
        }
    }

    /// Record a successful call
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.half_open_successes += 1;
            if inner.half_open_successes >= self.config.success_threshold.max(1) {
                inner.state = CircuitState::Closed;
                inner.half_open_successes = 0;
                inner.opened_at = None;
                debug!(provider = %self.name, "Circuit breaker closed");
            }
        }
    }

    /// Record a failed call
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold.max(1) {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        provider = %self.name,
                        failures = inner.consecutive_failures,
                        cool_down = ?self.config.reset_timeout,
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Any failure during the trial re-opens the circuit
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_successes = 0;
                warn!(provider = %self.name, "Circuit breaker re-opened after failed trial");
            }
            CircuitState::Open => {}
        }
    }

    /// Get the current state of the circuit breaker
    pub async fn get_state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Time left before an open circuit lets a trial call through
    pub async fn remaining_cool_down(&self) -> Option<Duration> {
        let inner = self.inner.lock().await;
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) => {
                Some(self.config.reset_timeout.saturating_sub(at.elapsed()))
            }
            _ => None,
        }
    }
}
