// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Fingerprint Dispatcher
 * Bounded, deadline-guarded hand-off of response evidence to a fingerprint engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::favicon::technologies_for_hash;
use crate::types::FingerprintEvidence;

/// Deadline for one fingerprint dispatch
pub const DEFAULT_FINGERPRINT_TIMEOUT: Duration = Duration::from_secs(5);

/// Matches response evidence against technology signatures.
///
/// Called on a blocking thread; implementations may be CPU-heavy.
pub trait FingerprintEngine: Send + Sync + 'static {
    fn identify(&self, evidence: &FingerprintEvidence) -> Vec<String>;
}

/// Engine that never matches
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl FingerprintEngine for NullEngine {
    fn identify(&self, _evidence: &FingerprintEvidence) -> Vec<String> {
        Vec::new()
    }
}

/// Tags a response by its favicon hash using the built-in signature table
#[derive(Debug, Default, Clone, Copy)]
pub struct FaviconSignatureEngine;

impl FingerprintEngine for FaviconSignatureEngine {
    fn identify(&self, evidence: &FingerprintEvidence) -> Vec<String> {
        match evidence.favicon_hash.parse::<i32>() {
            Ok(hash) => technologies_for_hash(hash).map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Fingerprint slots for a given scan rate: a fraction of it that shrinks on
/// smaller machines, never below one
pub fn fingerprint_concurrency(rate_limit: u32, cpu_cores: usize) -> usize {
    let divisor = match cpu_cores {
        0..=2 => 80,
        3..=4 => 60,
        5..=8 => 50,
        9..=12 => 40,
        13..=16 => 35,
        _ => 30,
    };
    ((rate_limit / divisor) as usize).max(1)
}

pub struct FingerprintDispatcher {
    engine: Arc<dyn FingerprintEngine>,
    permits: Arc<Semaphore>,
    concurrency: usize,
    timeout: Duration,
    timed_out: AtomicU64,
}

impl FingerprintDispatcher {
    pub fn new(engine: Arc<dyn FingerprintEngine>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            engine,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            timeout: DEFAULT_FINGERPRINT_TIMEOUT,
            timed_out: AtomicU64::new(0),
        }
    }

    /// Dispatcher sized from the scan rate and this machine's core count
    pub fn for_rate(engine: Arc<dyn FingerprintEngine>, rate_limit: u32) -> Self {
        let cores = num_cpus::get();
        let concurrency = fingerprint_concurrency(rate_limit, cores);
        debug!(
            "Fingerprint concurrency {} (rate {}, {} cores)",
            concurrency, rate_limit, cores
        );
        Self::new(engine, concurrency)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Dispatches that hit the deadline so far
    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    /// Comma-joined tags, or "" when nothing matched or the deadline passed.
    ///
    /// On deadline the background task is left to finish on its own and its
    /// result is dropped. It keeps its slot until then.
    pub async fn dispatch(&self, evidence: FingerprintEvidence) -> String {
        let engine = Arc::clone(&self.engine);
        let permits = Arc::clone(&self.permits);
        let target = evidence.target.clone();

        let task = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok()?;
            tokio::task::spawn_blocking(move || engine.identify(&evidence))
                .await
                .ok()
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Some(tags))) => join_tags(tags),
            Ok(Ok(None)) => String::new(),
            Ok(Err(e)) => {
                warn!("Fingerprint task for {} failed: {}", target, e);
                String::new()
            }
            Err(_) => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                debug!("Fingerprint for {} timed out after {:?}", target, self.timeout);
                String::new()
            }
        }
    }
}

fn join_tags(tags: Vec<String>) -> String {
    tags.into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
