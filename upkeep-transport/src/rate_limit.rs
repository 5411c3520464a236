//! Outbound request ceiling.
//!
//! A token bucket shared by every request the client makes. Callers over the
//! ceiling wait for a token; nothing is rejected.

use std::fmt;
use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use tracing::trace;

/// Queueing rate limiter for outbound calls.
pub struct RequestLimiter {
    limiter: DefaultDirectRateLimiter,
    per_second: NonZeroU32,
}

impl RequestLimiter {
    /// `per_second` calls per second, bursting up to the same number.
    /// Zero falls back to the default ceiling.
    pub fn per_second(per_second: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(nonzero!(10u32));
        Self {
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            per_second,
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.per_second.get()
    }

    /// Wait until a request may go out.
    pub async fn acquire(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        trace!(ceiling = self.per_second.get(), "request queued by rate limit");
        self.limiter.until_ready().await;
    }
}

impl fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLimiter")
            .field("per_second", &self.per_second)
            .finish_non_exhaustive()
    }
}
