//! Request spacing for rate-limited APIs.
//!
//! Lexoffice allows two requests per second. Every request made through one
//! client passes `RequestThrottle::acquire`, which waits until the minimum
//! interval since the previous request has elapsed. Callers queue on the
//! throttle's lock, so concurrent callers are serialized rather than racing
//! past the limit.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between consecutive requests.
#[derive(Debug)]
pub struct RequestThrottle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    /// Creates a throttle with the given minimum spacing.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until a request may be sent, then records it as sent.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
