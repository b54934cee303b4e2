// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Recon Library
 * Host reconnaissance engine: protocol probing, CDN classification,
 * favicon hashing and fingerprint dispatch
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod config;
pub mod errors;
pub mod types;

// Transport
pub mod encoding;
pub mod http_client;
pub mod retry;

// Enrichment
pub mod cdn_detector;
pub mod dns_cache;
pub mod favicon;
pub mod fingerprint;

// Scheduling
pub mod prober;
pub mod rate_limiter;
pub mod result_store;
pub mod runner;

pub mod reporting;

pub use config::{ProxyConfig, ScanOptions};
pub use errors::{NetworkError, ReconError, ReconResult};
pub use http_client::{HttpClient, HttpResponse, RedirectMode, Transport};
pub use result_store::ResultStore;
pub use runner::{Runner, RunnerComponents};
pub use types::{Phase, ScanFlag, ScanOutcome};
