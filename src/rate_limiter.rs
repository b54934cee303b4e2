// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Dispatch Rate Limiter
 * Token bucket pacing one task start per 1/rate seconds
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use nonzero_ext::*;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Paces task dispatch to at most `rate` starts per second.
///
/// The bucket holds a single token, so a backlog never turns into a burst.
pub struct DispatchRateLimiter {
    rate: u32,
    limiter: GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    dispatched: AtomicU64,
}

impl DispatchRateLimiter {
    pub fn new(rate: u32) -> Self {
        let rate = rate.max(1);
        let period = Duration::from_secs(1) / rate;
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(rate).unwrap_or(nonzero!(1u32))))
            .allow_burst(nonzero!(1u32));

        debug!("Dispatch rate limiter: {} starts/s ({:?} period)", rate, period);

        Self {
            rate,
            limiter: GovernorRateLimiter::direct(quota),
            dispatched: AtomicU64::new(0),
        }
    }

    /// Wait for the next dispatch slot
    pub async fn wait_for_slot(&self) {
        self.limiter.until_ready().await;
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Slots handed out so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}
