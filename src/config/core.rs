// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use validator::Validate;

use super::proxy::ProxyConfig;
use crate::errors::{ReconError, ReconResult};

pub const DEFAULT_RETRIES: u32 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Options consumed by the runner. Validated once in `Runner::new`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScanOptions {
    /// Inline hosts: bare host, `host:port` or full URL
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Line-delimited hosts file
    #[serde(default)]
    pub hosts_file: Option<PathBuf>,

    /// Extra attempts after a transport error. Unbounded, each wait is capped.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Requests per second and concurrency ceiling. `None` derives it from the CPU count.
    #[validate(range(min = 1, max = 100000))]
    #[serde(default)]
    pub rate_limit: Option<u32>,

    /// `http://`, `https://` or `socks5://` proxy, optionally with `user:pass@`
    #[serde(default)]
    pub proxy: Option<String>,

    /// Only resolve hosts and classify CDN, no HTTP
    #[serde(default)]
    pub cdn_only: bool,

    /// Accept self-signed and mismatched certificates
    #[serde(default = "default_true")]
    pub insecure_tls: bool,

    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Suppress banner and progress logging
    #[serde(default)]
    pub silent: bool,

    /// Only report successful outcomes
    #[serde(default)]
    pub clear: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            hosts_file: None,
            retries: DEFAULT_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rate_limit: None,
            proxy: None,
            cdn_only: false,
            insecure_tls: true,
            output: None,
            silent: false,
            clear: false,
        }
    }
}

impl ScanOptions {
    pub fn with_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Reject invalid options before any task starts
    pub fn validate_options(&self) -> ReconResult<()> {
        if self.hosts.is_empty() && self.hosts_file.is_none() {
            return Err(ReconError::NoInput);
        }

        if self.timeout_secs == 0 {
            return Err(ReconError::Configuration(
                "timeout cannot be zero".to_string(),
            ));
        }

        if self.rate_limit == Some(0) {
            return Err(ReconError::Configuration("rate cannot be zero".to_string()));
        }

        self.validate()?;

        // Surfaces unsupported proxy schemes at startup instead of on first request
        ProxyConfig::parse(self.proxy.as_deref())?;

        Ok(())
    }

    pub fn proxy_config(&self) -> ReconResult<ProxyConfig> {
        ProxyConfig::parse(self.proxy.as_deref())
    }

    /// Rate limit in effect for this run
    pub fn effective_rate_limit(&self) -> u32 {
        match self.rate_limit {
            Some(rate) => rate,
            None => {
                let cores = num_cpus::get();
                let rate = auto_rate_limit(cores);
                info!(
                    "Auto-adjusted rate limit to {} based on {} CPU cores",
                    rate, cores
                );
                rate
            }
        }
    }
}

/// Conservative rate table keyed by core count, avoids an initial burst on small machines
pub fn auto_rate_limit(cpu_cores: usize) -> u32 {
    match cpu_cores {
        0..=2 => 10,
        3..=4 => 20,
        5..=8 => 30,
        9..=16 => 40,
        _ => 50,
    }
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ScanOptions::default();
        assert_eq!(opts.retries, 1);
        assert_eq!(opts.timeout_secs, 10);
        assert!(opts.rate_limit.is_none());
        assert!(opts.insecure_tls);
        assert!(!opts.cdn_only);
    }

    #[test]
    fn test_no_input_rejected() {
        let opts = ScanOptions::default();
        assert!(matches!(opts.validate_options(), Err(ReconError::NoInput)));
    }

    #[test]
    fn test_hosts_file_counts_as_input() {
        let opts = ScanOptions {
            hosts_file: Some(PathBuf::from("targets.txt")),
            ..Default::default()
        };
        assert!(opts.validate_options().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let opts = ScanOptions {
            timeout_secs: 0,
            ..ScanOptions::with_hosts(["example.com"])
        };
        assert!(matches!(
            opts.validate_options(),
            Err(ReconError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let opts = ScanOptions {
            rate_limit: Some(0),
            ..ScanOptions::with_hosts(["example.com"])
        };
        let err = opts.validate_options().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bad_proxy_rejected() {
        let opts = ScanOptions {
            proxy: Some("ftp://proxy.local:21".to_string()),
            ..ScanOptions::with_hosts(["example.com"])
        };
        assert!(opts.validate_options().is_err());
    }

    #[test]
    fn test_large_retry_count_accepted() {
        let opts = ScanOptions {
            retries: 25,
            ..ScanOptions::with_hosts(["example.com"])
        };
        assert!(opts.validate_options().is_ok());
    }

    #[test]
    fn test_explicit_rate_wins() {
        let opts = ScanOptions {
            rate_limit: Some(7),
            ..ScanOptions::with_hosts(["example.com"])
        };
        assert_eq!(opts.effective_rate_limit(), 7);
    }

    #[test]
    fn test_auto_rate_table() {
        assert_eq!(auto_rate_limit(1), 10);
        assert_eq!(auto_rate_limit(2), 10);
        assert_eq!(auto_rate_limit(4), 20);
        assert_eq!(auto_rate_limit(8), 30);
        assert_eq!(auto_rate_limit(12), 40);
        assert_eq!(auto_rate_limit(16), 40);
        assert_eq!(auto_rate_limit(64), 50);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let opts: ScanOptions =
            serde_json::from_str(r#"{"hosts": ["example.com"], "cdn_only": true}"#).unwrap();
        assert_eq!(opts.hosts, vec!["example.com".to_string()]);
        assert!(opts.cdn_only);
        assert_eq!(opts.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(opts.insecure_tls);
    }
}
