// Minimum-interval rate limiter for the Google APIs.
//
// Translation and Vision are both billed per request and throttle bursts.
// Each request waits until at least `1 / requests_per_second` has passed
// since the previous one was let through.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            inner: Arc::new(Mutex::new(Inner {
                interval,
                last_request: None,
            })),
        }
    }

    /// Wait until the next request is allowed.
    pub async fn acquire(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(last) = inner.last_request {
            let elapsed = last.elapsed();
            if elapsed < inner.interval {
                let wait = inner.interval - elapsed;
                // Reserve the slot before releasing the lock so concurrent
                // callers queue behind us instead of all waking together.
                inner.last_request = Some(last + inner.interval);
                drop(inner);
                tokio::time::sleep(wait).await;
                return;
            }
        }

        inner.last_request = Some(Instant::now());
    }
}
