//! Per-service token-bucket rate limiter with request queueing
//!
//! Each service owns a bucket of `burst_limit` tokens refilled at
//! `requests_per_minute` tokens per minute. Refill is computed lazily on every
//! access. Callers that find the bucket empty suspend in a strict-FIFO queue;
//! a once-per-second drain step (driven by the registry) grants tokens to the
//! oldest waiters as they become available. A waiter that spends more than 30
//! seconds in the queue is resumed with `RateLimitQueueTimeout` and never
//! granted a later token.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::error::McpError;

/// Maximum time a caller may wait in the queue for a token.
pub const QUEUE_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the background drain step runs.
pub const DRAIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Waiter {
    id: u64,
    grant: oneshot::Sender<()>,
    enqueued_at: Instant,
}

#[derive(Debug)]
struct BucketInner {
    tokens: f64,
    last_refill: Instant,
    queue: VecDeque<Waiter>,
    next_waiter_id: u64,
}

/// Token bucket for one service
#[derive(Debug)]
pub struct RateLimiter {
    service: String,
    config: RateLimitConfig,
    inner: Mutex<BucketInner>,
}

impl RateLimiter {
    pub fn new(service: impl Into<String>, config: RateLimitConfig) -> Self {
        let burst = config.burst_limit as f64;
        Self {
            service: service.into(),
            config,
            inner: Mutex::new(BucketInner {
                tokens: burst,
                last_refill: Instant::now(),
                queue: VecDeque::new(),
                next_waiter_id: 0,
            }),
        }
    }

    /// Consume one token, suspending in the FIFO queue when the bucket is
    /// empty. Resolves once the drain step grants a token, or fails with
    /// `RateLimitQueueTimeout` after 30 seconds in the queue.
    pub async fn acquire(&self) -> Result<(), McpError> {
        let (id, mut rx) = {
            let mut inner = self.inner.lock().unwrap();
            self.refill(&mut inner);
            if inner.tokens >= 1.0 {
                inner.tokens -= 1.0;
                return Ok(());
            }

            let (tx, rx) = oneshot::channel();
            let id = inner.next_waiter_id;
            inner.next_waiter_id += 1;
            inner.queue.push_back(Waiter {
                id,
                grant: tx,
                enqueued_at: Instant::now(),
            });
            debug!(
                service = %self.service,
                queue_length = inner.queue.len(),
                "rate limit exhausted, caller queued"
            );
            (id, rx)
        };

        tokio::select! {
            granted = &mut rx => match granted {
                Ok(()) => Ok(()),
                // Sender dropped: the drain step expired this waiter.
                Err(_) => Err(self.timeout_error()),
            },
            _ = tokio::time::sleep(QUEUE_TIMEOUT) => {
                let mut inner = self.inner.lock().unwrap();
                if let Some(pos) = inner.queue.iter().position(|w| w.id == id) {
                    inner.queue.remove(pos);
                    drop(inner);
                    Err(self.timeout_error())
                } else {
                    drop(inner);
                    // Already dequeued: either a token was granted inside the
                    // window, or the drain step expired the waiter.
                    match rx.try_recv() {
                        Ok(()) => Ok(()),
                        Err(_) => Err(self.timeout_error()),
                    }
                }
            }
        }
    }

    /// One drain step: refill, then grant tokens to the oldest waiters while
    /// both tokens and waiters remain. Returns the number of grants made.
    pub fn drain(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        self.refill(&mut inner);

        // Expired waiters never receive a token; dropping the sender resumes
        // them on their error path if their own timer has not fired yet.
        inner
            .queue
            .retain(|w| w.enqueued_at.elapsed() < QUEUE_TIMEOUT);

        let mut granted = 0;
        while inner.tokens >= 1.0 {
            let Some(waiter) = inner.queue.pop_front() else {
                break;
            };
            if waiter.grant.send(()).is_ok() {
                inner.tokens -= 1.0;
                granted += 1;
            }
        }
        if granted > 0 {
            debug!(service = %self.service, granted, "drained rate limit queue");
        }
        granted
    }

    /// Serializable view of the live state for the metrics surface.
    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let mut inner = self.inner.lock().unwrap();
        self.refill(&mut inner);
        RateLimiterSnapshot {
            tokens: inner.tokens,
            millis_since_last_refill: inner.last_refill.elapsed().as_millis() as u64,
            queue_length: inner.queue.len(),
        }
    }

    /// Lazy refill: whole tokens earned since `last_refill`, capped at the
    /// burst limit. `last_refill` advances by the intervals consumed so
    /// fractional progress is not lost between accesses.
    fn refill(&self, inner: &mut BucketInner) {
        let interval_ms = 60_000.0 / self.config.requests_per_minute as f64;
        let elapsed_ms = inner.last_refill.elapsed().as_millis() as f64;
        let earned = (elapsed_ms / interval_ms).floor();
        if earned >= 1.0 {
            inner.tokens = (inner.tokens + earned).min(self.config.burst_limit as f64);
            inner.last_refill += Duration::from_millis((earned * interval_ms) as u64);
        }
    }

    fn timeout_error(&self) -> McpError {
        McpError::RateLimitQueueTimeout {
            service: self.service.clone(),
        }
    }
}

/// Point-in-time view of one bucket's state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterSnapshot {
    pub tokens: f64,
    /// Milliseconds since the bucket last consumed a refill interval
    #[serde(rename = "lastRefill")]
    pub millis_since_last_refill: u64,
    pub queue_length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::advance;

    fn limiter(requests_per_minute: u32, burst_limit: u32) -> RateLimiter {
        RateLimiter::new(
            "test-service",
            RateLimitConfig {
                requests_per_minute,
                burst_limit,
            },
        )
    }

    #[tokio::test]
    async fn test_burst_admitted_without_waiting() {
        let limiter = limiter(60, 10);
        for _ in 0..10 {
            limiter.acquire().await.unwrap();
        }

        // The 11th caller suspends in the queue.
        let fut = limiter.acquire();
        tokio::pin!(fut);
        assert!(futures::poll!(&mut fut).is_pending());
        assert_eq!(limiter.snapshot().queue_length, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_after_one_second() {
        let limiter = limiter(60, 1);
        limiter.acquire().await.unwrap();

        advance(Duration::from_millis(1_001)).await;

        // 60 rpm earns one token per second; the next acquire is immediate.
        limiter.acquire().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_never_exceeds_burst() {
        let limiter = limiter(600, 5);
        advance(Duration::from_secs(120)).await;
        assert_eq!(limiter.snapshot().tokens, 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_timeout_rejects_and_forgets_waiter() {
        let limiter = limiter(1, 1);
        limiter.acquire().await.unwrap();

        // No token can arrive within 30 s at 1 rpm; the waiter times out.
        let err = limiter.acquire().await.unwrap_err();
        assert_eq!(
            err,
            McpError::RateLimitQueueTimeout {
                service: "test-service".into()
            }
        );

        // A token later becomes free but the timed-out caller is gone.
        advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.drain(), 0);
        assert_eq!(limiter.snapshot().queue_length, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_serves_waiters_in_fifo_order() {
        let limiter = Arc::new(limiter(60, 1));
        limiter.acquire().await.unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));

        let (l, o) = (limiter.clone(), order.clone());
        let first = tokio::spawn(async move {
            l.acquire().await.unwrap();
            o.lock().unwrap().push(1);
        });
        tokio::task::yield_now().await;

        let (l, o) = (limiter.clone(), order.clone());
        let second = tokio::spawn(async move {
            l.acquire().await.unwrap();
            o.lock().unwrap().push(2);
        });
        tokio::task::yield_now().await;
        assert_eq!(limiter.snapshot().queue_length, 2);

        // One token refills; only the head of the queue is granted.
        advance(Duration::from_millis(1_100)).await;
        assert_eq!(limiter.drain(), 1);
        first.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1]);

        advance(Duration::from_millis(1_100)).await;
        assert_eq!(limiter.drain(), 1);
        second.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }
}
