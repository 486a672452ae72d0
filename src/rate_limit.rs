//! Request pacing for the ADS API.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Paces outgoing requests to a maximum rate and backs off when the
/// server-reported `x-ratelimit-*` quota is exhausted.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Pacing>>,
}

#[derive(Debug)]
struct Pacing {
    min_interval: Duration,
    last_request: Option<Instant>,
    server_remaining: Option<u32>,
    server_reset: Option<Instant>,
}

impl Pacing {
    /// How long the next request must still wait, if at all.
    fn required_wait(&self, now: Instant) -> Option<Duration> {
        if let (Some(0), Some(reset)) = (self.server_remaining, self.server_reset) {
            if now < reset {
                return Some(reset - now);
            }
        }
        let last = self.last_request?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.min_interval).then(|| self.min_interval - elapsed)
    }
}

impl RateLimiter {
    /// Create a limiter allowing at most `per_second` requests per second.
    pub fn new(per_second: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Pacing {
                min_interval: Duration::from_secs_f64(1.0 / per_second),
                last_request: None,
                server_remaining: None,
                server_reset: None,
            })),
        }
    }

    /// Wait until the next request is allowed, then mark it as sent.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut inner = self.inner.lock().await;
                match inner.required_wait(Instant::now()) {
                    None => {
                        inner.last_request = Some(Instant::now());
                        return;
                    }
                    Some(wait) => wait,
                }
            };
            // Lock released while sleeping; re-check after, another task
            // may have consumed the slot.
            tokio::time::sleep(wait).await;
        }
    }

    /// Record quota headers from an ADS response.
    pub async fn observe(&self, headers: &reqwest::header::HeaderMap) {
        let mut inner = self.inner.lock().await;

        if let Some(remaining) = header_u64(headers, "x-ratelimit-remaining") {
            inner.server_remaining = Some(remaining as u32);
        }

        // The reset header is a Unix timestamp.
        if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
            let now_unix = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            if reset > now_unix {
                inner.server_reset = Some(Instant::now() + Duration::from_secs(reset - now_unix));
            }
        }
    }
}

fn header_u64(headers: &reqwest::header::HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}
