// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome flag for a scanned host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanFlag {
    #[default]
    Success,
    Failed,
}

impl ScanFlag {
    pub fn as_u8(&self) -> u8 {
        match self {
            ScanFlag::Success => 0,
            ScanFlag::Failed => 1,
        }
    }
}

/// Full per-host result record. Built by one scan task, handed to the result store
/// once enrichment is done.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScanOutcome {
    pub flag: ScanFlag,
    pub full_url: String,
    /// Hostname or IP, no scheme or port
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// One or more IPs, comma-joined
    pub ip: String,
    pub title: String,
    pub body: String,
    #[serde(skip)]
    pub raw_body: Vec<u8>,
    #[serde(skip)]
    pub raw_header: Vec<u8>,
    #[serde(skip)]
    pub raw: Vec<u8>,
    #[serde(skip)]
    pub headers: HashMap<String, String>,
    pub status_code: u16,
    pub content_length: u64,
    pub response_time_ms: u64,
    pub favicon_hash: String,
    /// Comma-joined fingerprint tags
    pub fingerprint: String,
    /// `CDN:<provider>`, `CDN` or empty
    pub cdn: String,
}

impl ScanOutcome {
    /// Outcome recorded when every attempt for a host failed
    pub fn failed(host: impl Into<String>) -> Self {
        Self {
            flag: ScanFlag::Failed,
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.flag == ScanFlag::Failed
    }

    /// Key under which the outcome lands in the result store
    pub fn store_key(&self) -> &str {
        if self.full_url.is_empty() {
            &self.host
        } else {
            &self.full_url
        }
    }
}

/// Evidence handed to the fingerprint engine
#[derive(Debug, Clone, Default)]
pub struct FingerprintEvidence {
    pub target: String,
    pub body: Vec<u8>,
    pub raw: Vec<u8>,
    pub raw_header: Vec<u8>,
    pub favicon_hash: String,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
}

impl FingerprintEvidence {
    pub fn from_outcome(outcome: &ScanOutcome) -> Self {
        Self {
            target: outcome.full_url.clone(),
            body: outcome.raw_body.clone(),
            raw: outcome.raw.clone(),
            raw_header: outcome.raw_header.clone(),
            favicon_hash: outcome.favicon_hash.clone(),
            status_code: outcome.status_code,
            headers: outcome.headers.clone(),
        }
    }
}

/// Run phase. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Scanning,
    Done,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Scanning => write!(f, "scanning"),
            Phase::Done => write!(f, "done"),
        }
    }
}
