//! Retry executor with exponential/linear backoff and jitter
//!
//! Runs an operation up to `max_attempts + 1` times (the first attempt plus
//! `max_attempts` retries). Delays between attempts follow the policy's
//! backoff curve, capped at `max_delay_ms`, optionally multiplied by a uniform
//! jitter factor in [0.5, 1.0]. The last error is always surfaced to the
//! caller, never discarded.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::config::{BackoffStrategy, RetryPolicy};
use crate::error::McpError;

/// Delay to sleep after the failed attempt with the given zero-based index.
/// Jitter aside, this is `min(initial_delay * factor(attempt), max_delay)`
/// with `factor = 2^attempt` (exponential) or `attempt + 1` (linear).
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let factor = match policy.backoff_strategy {
        BackoffStrategy::Exponential => 2_u64.saturating_pow(attempt),
        BackoffStrategy::Linear => (attempt + 1) as u64,
    };
    let mut delay_ms = policy
        .initial_delay_ms
        .saturating_mul(factor)
        .min(policy.max_delay_ms) as f64;
    if policy.jitter {
        delay_ms *= rand::thread_rng().gen_range(0.5..=1.0);
    }
    Duration::from_millis(delay_ms as u64)
}

/// Run `op` under the policy. The operation receives the zero-based attempt
/// index. Returns the final outcome together with the number of retries
/// performed beyond the first attempt.
///
/// Errors classified as non-retryable end the sequence immediately; recording
/// failures against the circuit breaker is the operation's own responsibility
/// so that every failed attempt counts, not just the last.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> (Result<T, McpError>, u32)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, McpError>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return (Ok(value), attempt),
            Err(err) => {
                if attempt >= policy.max_attempts || !err.is_retryable() {
                    return (Err(err), attempt);
                }
                let delay = backoff_delay(policy, attempt);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(strategy: BackoffStrategy, jitter: bool) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff_strategy: strategy,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            jitter,
        }
    }

    #[test]
    fn test_exponential_backoff_sequence() {
        let policy = RetryPolicy {
            max_attempts: 10,
            ..policy(BackoffStrategy::Exponential, false)
        };
        let delays: Vec<u64> = (0..6)
            .map(|a| backoff_delay(&policy, a).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 10_000, 10_000]);
    }

    #[test]
    fn test_linear_backoff_sequence() {
        let policy = RetryPolicy {
            max_attempts: 10,
            ..policy(BackoffStrategy::Linear, false)
        };
        let delays: Vec<u64> = (0..4)
            .map(|a| backoff_delay(&policy, a).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1_000, 2_000, 3_000, 4_000]);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = policy(BackoffStrategy::Exponential, true);
        for _ in 0..100 {
            let delay = backoff_delay(&policy, 1).as_millis() as u64;
            assert!((1_000..=2_000).contains(&delay), "jittered delay {}", delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_fail_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = policy(BackoffStrategy::Exponential, false);

        let (result, retries) = run_with_retry(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<(), _>(McpError::downstream_status(
                    "billing",
                    500,
                    format!("attempt {}", attempt),
                ))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(retries, 3);
        match result.unwrap_err() {
            McpError::Downstream { message, .. } => assert_eq!(message, "attempt 3"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_stops_retrying() {
        let policy = policy(BackoffStrategy::Exponential, false);

        let (result, retries) = run_with_retry(&policy, |attempt| async move {
            if attempt < 2 {
                Err(McpError::downstream("billing", "flaky"))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_short_circuits() {
        let calls = AtomicU32::new(0);
        let policy = policy(BackoffStrategy::Exponential, false);

        let (result, retries) = run_with_retry(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(McpError::authentication("unsupported auth type")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(retries, 0);
        assert!(matches!(
            result.unwrap_err(),
            McpError::Authentication { .. }
        ));
    }

    #[tokio::test]
    async fn test_zero_max_attempts_runs_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..policy(BackoffStrategy::Linear, false)
        };
        let (result, retries) =
            run_with_retry(&policy, |_| async { Err::<(), _>(McpError::downstream("s", "x")) })
                .await;
        assert!(result.is_err());
        assert_eq!(retries, 0);
    }
}
