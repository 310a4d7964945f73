//! Per-Client Rate Limiting
//!
//! Admission control for the streaming endpoints, keyed by client IP. Each
//! client gets a token bucket refilled at `requests_per_minute` with room for
//! `burst` back-to-back requests.
//!
//! Stale keys are dropped every [`RETAIN_INTERVAL`] checks so memory stays
//! bounded when many distinct addresses show up.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::models::settings::RateLimitConfig;
use crate::utils::error::{AppError, AppResult};

/// Checks between two sweeps of idle keys
pub const RETAIN_INTERVAL: u64 = 100;

pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
    checks: AtomicU64,
}

impl ClientRateLimiter {
    pub fn new(config: &RateLimitConfig) -> AppResult<Self> {
        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| AppError::config("rate_limit.requests_per_minute must be positive"))?;
        let burst = NonZeroU32::new(config.burst)
            .ok_or_else(|| AppError::config("rate_limit.burst must be positive"))?;
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Ok(Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            checks: AtomicU64::new(0),
        })
    }

    /// Admit one request from `ip`, or fail with a 429-mapped error.
    pub fn check(&self, ip: IpAddr) -> AppResult<()> {
        let count = self.checks.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % RETAIN_INTERVAL == 0 {
            self.limiter.retain_recent();
            tracing::debug!("[RateLimit] swept idle clients, {} tracked", self.limiter.len());
        }

        match self.limiter.check_key(&ip) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                tracing::warn!("[RateLimit] rejected {} (retry in {:?})", ip, wait);
                Err(AppError::rate_limited(format!(
                    "Too many requests; retry in {} seconds",
                    wait.as_secs().max(1)
                )))
            }
        }
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}
