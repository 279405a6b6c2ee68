use crate::app::ports::PacingPort;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum interval between consecutive acquisitions.
///
/// The first acquisition never waits.
#[derive(Debug)]
pub struct FixedIntervalPacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl FixedIntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PacingPort for FixedIntervalPacer {
    async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                debug!("Pacing: waiting {:?} before next request", ready_at - Instant::now());
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Token bucket shared by concurrent fetchers
#[derive(Debug)]
pub struct TokenBucketPacer {
    capacity: f64,
    refill_per_sec: f64,
    // tokens available and the time of the last refill
    bucket: Mutex<(f64, Instant)>,
}

impl TokenBucketPacer {
    /// `requests_per_min` sustained rate with bursts up to `burst` requests
    pub fn new(requests_per_min: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            capacity,
            refill_per_sec: requests_per_min.max(f64::MIN_POSITIVE) / 60.0,
            bucket: Mutex::new((capacity, Instant::now())),
        }
    }

    /// Bucket with the same sustained rate as a fixed `interval`
    pub fn from_interval(interval: Duration, burst: u32) -> Self {
        let secs = interval.as_secs_f64();
        let rpm = if secs > 0.0 { 60.0 / secs } else { f64::MAX };
        Self::new(rpm, burst)
    }
}

#[async_trait]
impl PacingPort for TokenBucketPacer {
    async fn acquire(&self) {
        // Refill continuously, wait until a whole token is available
        loop {
            let mut guard = self.bucket.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *tokens = (*tokens + elapsed * self.refill_per_sec).min(self.capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                break;
            }
            let need = 1.0 - *tokens;
            let secs = (need / self.refill_per_sec).max(0.001);
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_interval_spacing() {
        let pacer = FixedIntervalPacer::new(Duration::from_millis(40));
        let start = Instant::now();
        pacer.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(40));
        pacer.acquire().await;
        pacer.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let pacer = FixedIntervalPacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            pacer.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_token_bucket_burst_then_waits() {
        // 1200 rpm = one token every 50ms
        let pacer = TokenBucketPacer::new(1200.0, 2);
        let start = Instant::now();
        pacer.acquire().await;
        pacer.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(40));
        pacer.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
