//! Per-service circuit breaker
//!
//! Failure-tracking state machine with three states: Closed (normal
//! operation), Open (failing fast), and HalfOpen (probing recovery). One
//! breaker exists per configured service; all transitions happen under the
//! breaker's mutex so concurrent callers observe a linearized state sequence.

use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::CircuitBreakerConfig;
use crate::events::{EventBus, McpEvent};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
    /// Probes admitted since the breaker last entered HalfOpen. Counts
    /// attempted probes, not in-flight ones; it resets on every entry into
    /// HalfOpen and is never decremented on completion.
    half_open_attempts: u32,
}

/// Circuit breaker for one service
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    events: EventBus,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig, events: EventBus) -> Self {
        Self {
            service: service.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
                half_open_attempts: 0,
            }),
            events,
        }
    }

    /// Evaluate whether a call may proceed.
    ///
    /// Checking admission is what drives recovery: when the circuit is Open
    /// and the recovery timeout has elapsed since the last failure, this call
    /// flips the breaker to HalfOpen and admits the caller as the first probe.
    /// Only the caller that observes the elapsed timeout performs the
    /// transition; concurrent callers see the already-updated state.
    pub fn is_admitted(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovered = inner
                    .last_failure_time
                    .map(|t| t.elapsed() > self.config.recovery_timeout())
                    .unwrap_or(true);
                if recovered {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.half_open_attempts = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_attempts < self.config.half_open_max_calls {
                    inner.half_open_attempts += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a failed call. Opens the circuit once the consecutive-failure
    /// threshold is reached, and reopens it immediately from HalfOpen.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                inner.last_failure_time = Some(Instant::now());
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.last_failure_time = Some(Instant::now());
                inner.half_open_attempts = 0;
                self.transition(&mut inner, CircuitState::Open);
            }
            // Already failing fast; the open window is not extended.
            CircuitState::Open => {}
        }
    }

    /// Record a successful call. No-op unless the breaker is HalfOpen, in
    /// which case the probe's success closes the circuit.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == CircuitState::HalfOpen {
            inner.failure_count = 0;
            inner.last_failure_time = None;
            self.transition(&mut inner, CircuitState::Closed);
        }
    }

    /// Operator override: close the circuit and clear all counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count = 0;
        inner.last_failure_time = None;
        inner.half_open_attempts = 0;
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed);
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().unwrap().failure_count
    }

    /// Serializable view of the live state for the metrics surface.
    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.inner.lock().unwrap();
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            seconds_since_last_failure: inner.last_failure_time.map(|t| t.elapsed().as_secs()),
            half_open_attempts: inner.half_open_attempts,
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        if to == CircuitState::HalfOpen {
            inner.half_open_attempts = 0;
        }
        match to {
            CircuitState::Open => warn!(
                service = %self.service,
                failures = inner.failure_count,
                "circuit breaker opened"
            ),
            CircuitState::HalfOpen => info!(service = %self.service, "circuit breaker half-open"),
            CircuitState::Closed => info!(service = %self.service, "circuit breaker closed"),
        }
        self.events.emit(McpEvent::CircuitTransition {
            service: self.service.clone(),
            from,
            to,
        });
    }
}

/// Point-in-time view of one breaker's state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub seconds_since_last_failure: Option<u64>,
    pub half_open_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfig;
    use std::thread;
    use std::time::Duration;

    fn breaker(threshold: u32, recovery_ms: u64, half_open_max: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test-service",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout_ms: recovery_ms,
                half_open_max_calls: half_open_max,
            },
            EventBus::new(16),
        )
    }

    #[test]
    fn test_opens_after_threshold_failures() {
        let cb = breaker(3, 60_000, 3);

        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_admitted());
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.is_admitted());

        // Further failures while open do not change the bookkeeping.
        let count = cb.failure_count();
        cb.record_failure();
        assert_eq!(cb.failure_count(), count);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_recovery_timeout_flips_to_half_open() {
        let cb = breaker(1, 50, 3);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.is_admitted());

        thread::sleep(Duration::from_millis(80));

        // The admission check itself performs the transition.
        assert!(cb.is_admitted());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_success_in_half_open_closes() {
        let cb = breaker(1, 10, 3);
        cb.record_failure();
        thread::sleep(Duration::from_millis(30));
        assert!(cb.is_admitted());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
        assert!(cb.snapshot().seconds_since_last_failure.is_none());
    }

    #[test]
    fn test_failure_in_half_open_reopens() {
        let cb = breaker(1, 10, 3);
        cb.record_failure();
        thread::sleep(Duration::from_millis(30));
        assert!(cb.is_admitted());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.is_admitted());
    }

    #[test]
    fn test_half_open_bounds_probe_count() {
        let cb = breaker(1, 10, 2);
        cb.record_failure();
        thread::sleep(Duration::from_millis(30));

        // First probe rides the Open -> HalfOpen transition.
        assert!(cb.is_admitted());
        assert!(cb.is_admitted());
        assert!(!cb.is_admitted());
        assert_eq!(cb.snapshot().half_open_attempts, 2);
    }

    #[test]
    fn test_success_when_closed_is_noop() {
        let cb = breaker(3, 60_000, 3);
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.failure_count(), 1);
    }

    #[test]
    fn test_reset_closes_and_clears() {
        let cb = breaker(1, 60_000, 3);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
        assert!(cb.is_admitted());
    }

    #[tokio::test]
    async fn test_transition_emits_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let cb = CircuitBreaker::new(
            "test-service",
            CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout_ms: 60_000,
                half_open_max_calls: 1,
            },
            bus,
        );

        cb.record_failure();
        match rx.recv().await.unwrap() {
            McpEvent::CircuitTransition { from, to, .. } => {
                assert_eq!(from, CircuitState::Closed);
                assert_eq!(to, CircuitState::Open);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
