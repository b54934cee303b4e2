// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DNS Caching Module
 * hickory lookups with a moka TTL cache and a hard lookup timeout
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use moka::future::Cache;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ScanOptions;
use crate::errors::{ReconError, ReconResult};

/// Default TTL for DNS cache entries (5 minutes)
const DEFAULT_DNS_TTL: u64 = 300;

/// Default maximum cache size
const DEFAULT_MAX_CAPACITY: u64 = 10000;

/// Upper bound for a single lookup
pub const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Hostname to address resolution
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// All addresses for `host`, deduplicated, in resolver order.
    /// An empty answer is an error.
    async fn resolve(&self, host: &str) -> ReconResult<Vec<IpAddr>>;
}

/// hickory resolver fronted by a moka cache
pub struct CachedResolver {
    resolver: TokioResolver,
    cache: Cache<String, Vec<IpAddr>>,
}

impl CachedResolver {
    /// System resolver configuration, retried `options.retries` times per query.
    ///
    /// Lookups always go to the system nameservers directly; a configured proxy
    /// only carries HTTP traffic.
    pub fn from_options(options: &ScanOptions) -> ReconResult<Self> {
        if options.proxy.is_some() {
            warn!("DNS lookups for CDN checks are not sent through the proxy");
        }

        let mut builder = TokioResolver::builder(TokioConnectionProvider::default())
            .map_err(|e| ReconError::Configuration(format!("Failed to create resolver: {}", e)))?;
        builder.options_mut().attempts = resolver_attempts(options.retries);
        let resolver = builder.build();

        let cache = Cache::builder()
            .max_capacity(DEFAULT_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(DEFAULT_DNS_TTL))
            .build();

        info!(
            "DNS cache initialized: max_capacity={}, ttl={}s, attempts={}",
            DEFAULT_MAX_CAPACITY,
            DEFAULT_DNS_TTL,
            resolver_attempts(options.retries)
        );

        Ok(Self { resolver, cache })
    }

    async fn lookup(&self, host: &str) -> ReconResult<Vec<IpAddr>> {
        let lookup = tokio::time::timeout(DNS_LOOKUP_TIMEOUT, self.resolver.lookup_ip(host))
            .await
            .map_err(|_| ReconError::DnsResolution {
                host: host.to_string(),
                reason: format!("lookup timed out after {:?}", DNS_LOOKUP_TIMEOUT),
            })?
            .map_err(|e| ReconError::DnsResolution {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        Ok(dedupe(lookup.iter()))
    }
}

/// hickory retry count for a failed query, never below one
fn resolver_attempts(retries: u32) -> usize {
    (retries as usize).max(1)
}

#[async_trait]
impl DnsResolver for CachedResolver {
    async fn resolve(&self, host: &str) -> ReconResult<Vec<IpAddr>> {
        if host.is_empty() {
            return Err(ReconError::DnsResolution {
                host: String::new(),
                reason: "empty hostname".to_string(),
            });
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        if let Some(ips) = self.cache.get(host).await {
            debug!("DNS cache hit for: {}", host);
            return Ok(ips);
        }

        let ips = self.lookup(host).await?;

        if ips.is_empty() {
            return Err(ReconError::DnsResolution {
                host: host.to_string(),
                reason: "no addresses returned".to_string(),
            });
        }

        debug!("DNS resolved and cached: {} -> {:?}", host, ips);
        self.cache.insert(host.to_string(), ips.clone()).await;
        Ok(ips)
    }
}

/// Fixed host table. Serves offline runs and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    records: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, host: &str, ips: &[IpAddr]) -> Self {
        self.records.insert(host.to_string(), ips.to_vec());
        self
    }
}

#[async_trait]
impl DnsResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> ReconResult<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        match self.records.get(host) {
            Some(ips) if !ips.is_empty() => Ok(dedupe(ips.iter().copied())),
            _ => Err(ReconError::DnsResolution {
                host: host.to_string(),
                reason: "no addresses returned".to_string(),
            }),
        }
    }
}

/// Drop repeated addresses, keeping first-seen order
fn dedupe(ips: impl Iterator<Item = IpAddr>) -> Vec<IpAddr> {
    let mut out: Vec<IpAddr> = Vec::new();
    for ip in ips {
        if !out.contains(&ip) {
            out.push(ip);
        }
    }
    out
}
