// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Recon Error Types
 * Startup, per-host and enrichment errors with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::time::Duration;
use thiserror::Error;

/// Main error type for the recon engine
///
/// Only the startup variants (`NoInput`, `Configuration`, `Validation`) abort a run.
/// Everything else is contained per host and turned into a failed outcome or an
/// empty enrichment field by the caller.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Neither inline hosts nor a hosts file were given
    #[error("no input list provided")]
    NoInput,

    /// Invalid option value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation failures reported by `validator`
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Request could not be built or the response could not be read
    #[error("HTTP error for {url}: {reason}")]
    Http { url: String, reason: String },

    /// Every scheme/port combination failed for a host
    #[error("scan host failed: {host}")]
    ScanHostFailed { host: String },

    /// DNS resolution failed or returned nothing
    #[error("DNS resolution failed for {host}: {reason}")]
    DnsResolution { host: String, reason: String },

    /// Timeout errors
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Temporary file / output errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Network-specific errors with detailed classification
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection timeout to {url}")]
    ConnectionTimeout { url: String },

    #[error("Connection failed for {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Proxy error: {reason}")]
    ProxyError { reason: String },

    #[error("Too many redirects (>{max_redirects}) for {url}")]
    TooManyRedirects { url: String, max_redirects: usize },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("Body read failed for {url}: {reason}")]
    BodyRead { url: String, reason: String },
}

impl NetworkError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::ConnectionTimeout { .. } => true,
            NetworkError::ConnectionFailed { .. } => true,
            NetworkError::BodyRead { .. } => true,
            NetworkError::ProxyError { .. } => true,
            NetworkError::TooManyRedirects { .. } => false,
            NetworkError::InvalidUrl { .. } => false,
        }
    }
}

impl ReconError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconError::Network(e) => e.is_retryable(),
            ReconError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// True for the errors that must abort a run before any task starts
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconError::NoInput | ReconError::Configuration(_) | ReconError::Validation(_)
        )
    }
}

/// Convert reqwest errors to our error types
impl From<reqwest::Error> for ReconError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();

        if err.is_timeout() {
            ReconError::Network(NetworkError::ConnectionTimeout { url })
        } else if err.is_redirect() {
            ReconError::Network(NetworkError::TooManyRedirects {
                url,
                max_redirects: crate::http_client::MAX_REDIRECTS,
            })
        } else if err.is_connect() {
            ReconError::Network(NetworkError::ConnectionFailed {
                url,
                reason: err.to_string(),
            })
        } else if err.is_body() || err.is_decode() {
            ReconError::Network(NetworkError::BodyRead {
                url,
                reason: err.to_string(),
            })
        } else if err.is_builder() {
            ReconError::Network(NetworkError::InvalidUrl { url })
        } else if err.is_request() {
            ReconError::Network(NetworkError::ConnectionFailed {
                url,
                reason: err.to_string(),
            })
        } else {
            ReconError::Http {
                url,
                reason: err.to_string(),
            }
        }
    }
}

/// Result type for recon operations
pub type ReconResult<T> = Result<T, ReconError>;
