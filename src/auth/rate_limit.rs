//! Admission control for auth-sensitive operations.
//!
//! One token bucket is shared by every registration, reset and login call.
//! A denied call fails before any store access or password hashing.
//!
//! # Tracing Events
//!
//! - `auth.rate_limited` - Request rejected by the limiter

use crate::error::{AccountError, Result};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

/// Bucket size and refill rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted back to back (default: 3).
    pub capacity: u32,
    /// Time to regain one token (default: 6s, 10 per minute).
    pub refill_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            refill_interval: Duration::from_secs(6),
        }
    }
}

impl RateLimitConfig {
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_interval,
        }
    }

    fn quota(&self) -> Result<Quota> {
        let capacity = NonZeroU32::new(self.capacity)
            .ok_or_else(|| AccountError::configuration("rate limit capacity must be positive"))?;
        let quota = Quota::with_period(self.refill_interval).ok_or_else(|| {
            AccountError::configuration("rate limit refill interval must be positive")
        })?;
        Ok(quota.allow_burst(capacity))
    }
}

type DirectLimiter<C> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Token-bucket limiter in front of [`AccountService`](crate::auth::AccountService).
///
/// Generic over the clock so tests can drive it with
/// `governor::clock::FakeRelativeClock`. Clones share one bucket.
#[derive(Clone)]
pub struct AuthRateLimiter<C: Clock = DefaultClock> {
    limiter: Arc<DirectLimiter<C>>,
    clock: C,
}

impl AuthRateLimiter<DefaultClock> {
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        Self::with_clock(config, DefaultClock::default())
    }
}

impl<C: Clock> AuthRateLimiter<C> {
    pub fn with_clock(config: &RateLimitConfig, clock: C) -> Result<Self> {
        let quota = config.quota()?;
        Ok(Self {
            limiter: Arc::new(RateLimiter::direct_with_clock(quota, &clock)),
            clock,
        })
    }

    /// Consume one token or fail with `RateLimited`.
    pub fn check(&self) -> Result<()> {
        match self.limiter.check() {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                let retry_after_secs = retry_after_secs(wait);
                tracing::warn!(
                    target: "auth.rate_limited",
                    retry_after_secs,
                    "Request rejected by rate limiter"
                );
                Err(AccountError::RateLimited { retry_after_secs })
            }
        }
    }
}

/// Whole seconds to wait, rounded up, never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

impl<C: Clock> std::fmt::Debug for AuthRateLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRateLimiter").finish_non_exhaustive()
    }
}
