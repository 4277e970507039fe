//! src/network/rate_limit.rs
//!
//! Request rate limiting for the HTTP surface.

use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::core::errors::WalletError;

/// A process-wide rate limiter, wrapping the `governor` crate.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<
        GovernorRateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl RateLimiter {
    /// Creates a new rate limiter.
    ///
    /// # Arguments
    /// * `requests` - The number of requests allowed per window.
    /// * `window` - Length of the window; capacity refills evenly across it.
    pub fn new(requests: u32, window: Duration) -> Result<Self, WalletError> {
        let burst = NonZeroU32::new(requests)
            .ok_or_else(|| WalletError::ConfigError("rate limit requests must be positive".into()))?;
        let quota = Quota::with_period(window / requests)
            .ok_or_else(|| WalletError::ConfigError("rate limit window must be positive".into()))?
            .allow_burst(burst);
        Ok(Self { limiter: Arc::new(GovernorRateLimiter::direct(quota)) })
    }

    /// Checks if a request is allowed under the current rate limit.
    pub fn allow(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
