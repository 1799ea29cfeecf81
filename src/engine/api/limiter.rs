use crate::{error::Result, transport::sleep_until};
use std::{sync::Mutex, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Bucket {
    tokens: f64,
    refreshed: Instant,
}

/// Token bucket gating every outbound api call. Callers that find the bucket
/// empty take a token on credit and sleep until it would have refilled, so
/// waiters queue up in arrival order instead of being rejected. A reservation
/// is spent even when its wait is cancelled: later waiters have already been
/// scheduled behind it.
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            rate: rate_per_sec.max(f64::MIN_POSITIVE),
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                refreshed: Instant::now(),
            }),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn reserve(&self) -> Duration {
        let now = Instant::now();
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let elapsed = now.duration_since(bucket.refreshed).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.refreshed = now;
        bucket.tokens -= 1.0;
        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / self.rate)
        }
    }

    /// Waits for an admission.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(crate::error::cancelled());
        }
        let wait = self.reserve();
        if wait.is_zero() {
            return Ok(());
        }
        log::debug!("rate limiter: waiting {:?}", wait);
        sleep_until(Instant::now() + wait, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn k_calls_take_at_least_k_minus_one_intervals() {
        let limiter = RateLimiter::new(4.0, 1);
        let cancel = CancellationToken::new();
        let started = Instant::now();
        for _ in 0..5 {
            limiter.acquire(&cancel).await.unwrap();
        }
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_is_admitted_immediately() {
        let limiter = RateLimiter::new(0.5, 1);
        let started = Instant::now();
        limiter.acquire(&CancellationToken::new()).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_is_distinguishable() {
        let limiter = RateLimiter::new(0.5, 1);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let waiter = {
            let cancel = cancel.clone();
            async move { limiter.acquire(&cancel).await }
        };
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        };
        let (res, ()) = tokio::join!(waiter, trigger);
        assert!(res.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_waiter_keeps_its_slot() {
        let limiter = Arc::new(RateLimiter::new(1.0, 1));
        limiter.acquire(&CancellationToken::new()).await.unwrap();

        let second = CancellationToken::new();
        let waiting = {
            let limiter = limiter.clone();
            let cancel = second.clone();
            tokio::spawn(async move { limiter.acquire(&cancel).await })
        };
        let third = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.acquire(&CancellationToken::new()).await.map(|_| Instant::now())
            })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        second.cancel();
        assert!(waiting.await.unwrap().unwrap_err().is_cancelled());

        limiter.acquire(&CancellationToken::new()).await.unwrap();
        let fourth = Instant::now();
        let third = third.await.unwrap().unwrap();
        assert!(fourth.duration_since(third) >= Duration::from_secs(1));
    }
}
