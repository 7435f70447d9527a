use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Token bucket with capacity 1: at most one admission per `interval`.
///
/// The first admission after construction (or after an idle stretch longer
/// than `interval`) is immediate. Waiting callers queue on an internal mutex,
/// so admissions stay spaced regardless of how many callers are waiting.
/// Time is read from tokio's clock, which tests can pause and advance.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_admitted: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a request may be sent, or until `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), FetchError> {
        let mut last = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            guard = self.last_admitted.lock() => guard,
        };

        if let Some(prev) = *last {
            let ready_at = prev + self.interval;
            if Instant::now() < ready_at {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep_until(ready_at) => {}
                }
            }
        }

        *last = Some(Instant::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(5);

    /// Paused time advances in whole-millisecond ticks.
    fn assert_near(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff <= Duration::from_millis(2),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate() {
        let limiter = RateLimiter::new(INTERVAL);
        let start = Instant::now();
        limiter.acquire(&CancellationToken::new()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_acquires_are_spaced() {
        let limiter = RateLimiter::new(INTERVAL);
        let cancel = CancellationToken::new();
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire(&cancel).await.unwrap();
        }
        assert_near(start.elapsed(), INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_longer_than_interval_refills() {
        let limiter = RateLimiter::new(INTERVAL);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        tokio::time::sleep(INTERVAL * 3).await;
        let start = Instant::now();
        limiter.acquire(&cancel).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_the_budget() {
        let limiter = Arc::new(RateLimiter::new(INTERVAL));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire(&CancellationToken::new()).await.unwrap();
                    Instant::now()
                })
            })
            .collect();

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap() - start);
        }
        admitted.sort();
        for (i, at) in admitted.into_iter().enumerate() {
            assert_near(at, INTERVAL * i as u32);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_wait() {
        let limiter = RateLimiter::new(INTERVAL);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = limiter.acquire(&cancel).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_near(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_does_not_consume_a_token() {
        let limiter = RateLimiter::new(INTERVAL);
        limiter.acquire(&CancellationToken::new()).await.unwrap();

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        assert!(limiter.acquire(&cancelled).await.is_err());

        let start = Instant::now();
        limiter.acquire(&CancellationToken::new()).await.unwrap();
        assert_near(start.elapsed(), INTERVAL);
    }
}
