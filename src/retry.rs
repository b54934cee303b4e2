// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Host Spraying Retry Policy
 * Transport errors are retried with capped, jittered waits. HTTP answers never are.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::errors::ReconResult;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// First wait after a failed attempt
pub const SPRAY_WAIT_MIN: Duration = Duration::from_millis(100);

/// No single wait grows past this
pub const SPRAY_WAIT_MAX: Duration = Duration::from_secs(10);

/// Retry policy for one request. Waits double from `wait_min` up to `wait_max`, and each
/// is drawn from the upper half of its window so hosts failing together drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprayPolicy {
    /// Extra attempts after the first
    pub retries: u32,
    pub wait_min: Duration,
    pub wait_max: Duration,
}

impl SprayPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            wait_min: SPRAY_WAIT_MIN,
            wait_max: SPRAY_WAIT_MAX,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (1-based)
    pub fn wait(&self, retry: u32) -> Duration {
        let ceiling = self.window(retry);
        if ceiling.is_zero() {
            return ceiling;
        }
        let half = ceiling / 2;
        rand::rng().random_range(half..=ceiling)
    }

    fn window(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(31);
        self.wait_min
            .saturating_mul(1u32 << shift)
            .min(self.wait_max)
    }
}

/// Run `request` against `url` until it answers, fails with a non-retryable error or
/// the policy runs out of attempts. The last error is returned as-is.
pub async fn retry_request<F, Fut, T>(policy: &SprayPolicy, url: &str, mut request: F) -> ReconResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ReconResult<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match request().await {
            Ok(answer) => {
                if attempt > 1 {
                    debug!(url = %url, attempt, "Request answered after retry");
                }
                return Ok(answer);
            }
            Err(e) if attempt >= attempts || !e.is_retryable() => {
                debug!(url = %url, attempt, error = %e, "Giving up on request");
                return Err(e);
            }
            Err(e) => {
                let wait = policy.wait(attempt);
                debug!(
                    url = %url,
                    attempt,
                    attempts,
                    error = %e,
                    wait_ms = wait.as_millis() as u64,
                    "Transport error, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
