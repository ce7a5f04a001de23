//! Concurrency cap and request spacing for sitemap fetches.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Limits how many fetches run at once and how close together they start.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_delay: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// - `max_concurrent`: maximum number of permits held at once
    /// - `min_delay_ms`: minimum milliseconds between two permit grants
    pub fn new(max_concurrent: usize, min_delay_ms: u64) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            min_delay: Duration::from_millis(min_delay_ms),
            last_request: tokio::sync::Mutex::new(None),
        }
    }

    /// Wait for a free slot. The slot is released when the guard drops.
    pub async fn acquire(&self) -> Result<RateLimitGuard, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;

        if !self.min_delay.is_zero() {
            let mut last = self.last_request.lock().await;
            if let Some(prev) = *last {
                let elapsed = prev.elapsed();
                if elapsed < self.min_delay {
                    tokio::time::sleep(self.min_delay - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        Ok(RateLimitGuard { _permit: permit })
    }
}

/// Holds one concurrency slot until dropped.
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_released_on_drop() {
        let limiter = RateLimiter::new(2, 0);
        let g1 = limiter.acquire().await.unwrap();
        let _g2 = limiter.acquire().await.unwrap();

        drop(g1);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_acquire_blocks_at_capacity() {
        let limiter = RateLimiter::new(1, 0);
        let _held = limiter.acquire().await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(blocked.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_delay_spaces_requests() {
        let limiter = RateLimiter::new(4, 200);
        let start = Instant::now();
        let _g1 = limiter.acquire().await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(200));

        let _g2 = limiter.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
