//! RateLimiter - グローバルな発行間隔
//!
//! 全 worker で共有し、fetch の発行を少なくとも `1 / rate` 秒ずつ空ける。
//! 間隔の上限は `MAX_SPAN`。

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Upper bound on the spacing between two issues (one year).
pub const MAX_SPAN: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug)]
pub struct RateLimiter {
    /// `None` when disabled.
    span: Option<Duration>,

    /// When the most recently admitted issue was scheduled to start.
    last_scheduled: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `rate_per_second <= 0` disables the limiter. Rates so small that the
    /// spacing does not fit in a `Duration` are clamped to `MAX_SPAN`.
    pub fn new(rate_per_second: f64) -> Self {
        let span = (rate_per_second.is_finite() && rate_per_second > 0.0).then(|| {
            Duration::try_from_secs_f64(1.0 / rate_per_second)
                .map_or(MAX_SPAN, |span| span.min(MAX_SPAN))
        });
        Self {
            span,
            last_scheduled: Mutex::new(None),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0.0)
    }

    pub fn span(&self) -> Option<Duration> {
        self.span
    }

    pub fn is_enabled(&self) -> bool {
        self.span.is_some()
    }

    /// Reserve the next issue slot and return how long the caller must wait.
    ///
    /// delay = last_scheduled + span - now
    /// - delay > 0: last_scheduled = now + delay
    /// - else:      last_scheduled = now, no wait
    pub(crate) fn reserve(&self, now: Instant) -> Duration {
        let Some(span) = self.span else {
            return Duration::ZERO;
        };

        let mut last = self
            .last_scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match last.map(|t| t + span) {
            Some(slot) if slot > now => {
                *last = Some(slot);
                slot - now
            }
            _ => {
                *last = Some(now);
                Duration::ZERO
            }
        }
    }

    /// Wait until this caller may issue its fetch.
    pub async fn gate(&self) {
        let delay = self.reserve(Instant::now());
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "rate limited");
            tokio::time::sleep(delay).await;
        }
    }
}
