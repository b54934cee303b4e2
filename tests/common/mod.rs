// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/*
 * Bountyy Oy - Shared Test Doubles
 * Scripted transport and helpers for deterministic runner and prober tests
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

#![allow(dead_code)]

use async_trait::async_trait;
use lonkero_recon::errors::{NetworkError, ReconError, ReconResult};
use lonkero_recon::http_client::{HttpResponse, RedirectMode, Transport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Transport answering from a fixed URL table. Unknown URLs fail with a
/// connection error. Tracks how many fetches overlap.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: HashMap<String, (u16, Vec<u8>)>,
    delay: Duration,
    requested: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(url.to_string(), (status, body.into()));
        self
    }

    /// Delay applied to every page fetch. Favicon fetches answer at once.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &str, _redirect: RedirectMode) -> ReconResult<HttpResponse> {
        self.requested.lock().push(url.to_string());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() && !url.ends_with("favicon.ico") {
            tokio::time::sleep(self.delay).await;
        }

        let result = match self.routes.get(url) {
            Some((status, body)) => Ok(HttpResponse::from_parts(url, *status, &[], body.clone())),
            None => Err(ReconError::Network(NetworkError::ConnectionFailed {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn ip(addr: &str) -> IpAddr {
    addr.parse().unwrap()
}

/// Minimal ICO header followed by some payload bytes
pub fn ico_bytes() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x10, 0x10];
    data.extend((0u8..=255).cycle().take(512));
    data
}
