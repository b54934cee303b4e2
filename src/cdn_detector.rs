// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - CDN Detection Module
 * Classifies a host as CDN-fronted, load-balanced or direct from its resolved addresses
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::dns_cache::DnsResolver;
use crate::errors::{ReconError, ReconResult};

/// Provider reported by the multi-IP heuristic
pub const LOAD_BALANCER_PROVIDER: &str = "load-balancer";

/// Known provider ranges, checked in this order
const CDN_PROVIDER_RANGES: &[(&str, &[&str])] = &[
    (
        "Cloudflare",
        &[
            "103.21.244.0/22", "103.22.200.0/22", "103.31.4.0/22", "104.16.0.0/12",
            "108.162.192.0/18", "131.0.72.0/22", "141.101.64.0/18", "162.158.0.0/15",
            "172.64.0.0/13", "173.245.48.0/20", "188.114.96.0/20", "190.93.240.0/20",
            "197.234.240.0/22", "198.41.128.0/17",
        ],
    ),
    (
        "Akamai",
        &[
            "23.32.0.0/11", "104.64.0.0/10", "184.24.0.0/13", "184.50.0.0/15",
            "184.84.0.0/14", "2.16.0.0/13", "95.100.0.0/15", "23.0.0.0/12",
            "96.16.0.0/15", "72.246.0.0/15",
        ],
    ),
    (
        "Amazon CloudFront",
        &[
            "54.182.0.0/16", "54.192.0.0/16", "54.230.0.0/16", "54.239.128.0/18",
            "54.239.192.0/19", "99.84.0.0/16", "205.251.192.0/19", "52.124.128.0/17",
            "204.246.164.0/22", "204.246.168.0/22", "204.246.174.0/23", "204.246.176.0/20",
            "13.32.0.0/15", "13.224.0.0/14", "13.35.0.0/16", "204.246.172.0/24",
            "204.246.173.0/24",
        ],
    ),
    (
        "Fastly",
        &[
            "23.235.32.0/20", "43.249.72.0/22", "103.244.50.0/24", "103.245.222.0/23",
            "103.245.224.0/24", "104.156.80.0/20", "146.75.0.0/16", "151.101.0.0/16",
            "157.52.64.0/18", "167.82.0.0/17", "167.82.128.0/20", "167.82.160.0/20",
            "167.82.224.0/20", "172.111.64.0/18", "185.31.16.0/22", "199.27.72.0/21",
            "199.232.0.0/16",
        ],
    ),
    (
        "Google",
        &[
            "34.64.0.0/10", "34.128.0.0/10", "35.184.0.0/13", "35.192.0.0/14",
            "35.196.0.0/15", "35.198.0.0/16", "35.199.0.0/17", "35.199.128.0/18",
            "35.200.0.0/13", "35.208.0.0/12", "35.224.0.0/12", "35.240.0.0/13",
            "64.233.160.0/19", "66.102.0.0/20", "66.249.64.0/19", "70.32.128.0/19",
            "72.14.192.0/18", "74.125.0.0/16", "108.177.0.0/17", "142.250.0.0/15",
            "172.217.0.0/16", "173.194.0.0/16", "209.85.128.0/17", "216.58.192.0/19",
            "216.239.32.0/19",
        ],
    ),
    (
        "Microsoft Azure",
        &[
            "13.64.0.0/11", "13.96.0.0/13", "13.104.0.0/14", "20.33.0.0/16",
            "20.34.0.0/15", "20.36.0.0/14", "20.40.0.0/13", "20.48.0.0/12",
            "20.64.0.0/10", "20.128.0.0/16", "20.135.0.0/16", "20.136.0.0/16",
            "20.143.0.0/16", "20.144.0.0/14", "20.150.0.0/15", "20.152.0.0/16",
            "20.153.0.0/16", "20.157.0.0/16", "20.158.0.0/15", "20.160.0.0/12",
            "20.176.0.0/14", "20.180.0.0/14", "20.184.0.0/13", "20.192.0.0/10",
        ],
    ),
];

/// IP to provider lookup
pub trait CdnDatabase: Send + Sync {
    /// `(true, provider)` when `ip` falls in a known provider range
    fn check_ip(&self, ip: IpAddr) -> (bool, String);
}

/// Provider CIDR table compiled in
pub struct BuiltinCdnDatabase {
    providers: Vec<(String, Vec<IpNetwork>)>,
}

impl BuiltinCdnDatabase {
    pub fn new() -> Self {
        let providers = CDN_PROVIDER_RANGES
            .iter()
            .map(|(name, ranges)| {
                let networks = ranges
                    .iter()
                    .filter_map(|cidr| match IpNetwork::from_str(cidr) {
                        Ok(net) => Some(net),
                        Err(e) => {
                            debug!("Skipping invalid CIDR {} for {}: {}", cidr, name, e);
                            None
                        }
                    })
                    .collect();
                (name.to_string(), networks)
            })
            .collect();

        Self { providers }
    }

    /// Provider names in lookup order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|(name, _)| name.as_str())
    }
}

impl Default for BuiltinCdnDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl CdnDatabase for BuiltinCdnDatabase {
    fn check_ip(&self, ip: IpAddr) -> (bool, String) {
        for (name, networks) in &self.providers {
            if networks.iter().any(|net| net.contains(ip)) {
                return (true, name.clone());
            }
        }
        (false, String::new())
    }
}

/// Classification of one host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CdnCheckResult {
    pub ips: Vec<IpAddr>,
    pub is_cdn: bool,
    /// Single provider, comma-joined providers, or empty
    pub provider: String,
}

impl CdnCheckResult {
    /// Comma-joined address list
    pub fn ip_list(&self) -> String {
        self.ips
            .iter()
            .map(|ip| ip.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn label(&self) -> String {
        format_cdn_label(self.is_cdn, &self.provider)
    }
}

/// `CDN:<provider>` for a single clean provider, `CDN` for an empty or compound one,
/// empty when not a CDN
pub fn format_cdn_label(is_cdn: bool, provider: &str) -> String {
    if !is_cdn {
        return String::new();
    }
    if !provider.is_empty() && !provider.contains(',') {
        format!("CDN:{}", provider)
    } else {
        "CDN".to_string()
    }
}

/// Resolves a host and labels its infrastructure
pub struct CdnClassifier {
    resolver: Arc<dyn DnsResolver>,
    database: Arc<dyn CdnDatabase>,
    multi_ip_heuristic: bool,
}

impl CdnClassifier {
    pub fn new(resolver: Arc<dyn DnsResolver>, database: Arc<dyn CdnDatabase>) -> Self {
        Self {
            resolver,
            database,
            multi_ip_heuristic: true,
        }
    }

    /// Treat an unmatched domain with exactly two addresses as load-balanced.
    /// Round-robin DNS on plain multi-homed hosts trips this too.
    pub fn with_multi_ip_heuristic(mut self, enabled: bool) -> Self {
        self.multi_ip_heuristic = enabled;
        self
    }

    pub async fn classify(&self, host: &str) -> ReconResult<CdnCheckResult> {
        if host.is_empty() {
            return Err(ReconError::DnsResolution {
                host: String::new(),
                reason: "empty hostname".to_string(),
            });
        }

        // IP literals skip DNS and the multi-IP rule
        if let Ok(ip) = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
            let (is_cdn, provider) = self.database.check_ip(ip);
            return Ok(CdnCheckResult {
                ips: vec![ip],
                is_cdn,
                provider,
            });
        }

        let ips = self.resolver.resolve(host).await?;

        let mut providers: Vec<String> = Vec::new();
        for ip in &ips {
            let (is_cdn, provider) = self.database.check_ip(*ip);
            if is_cdn && !providers.contains(&provider) {
                providers.push(provider);
            }
        }

        let mut result = CdnCheckResult {
            is_cdn: !providers.is_empty(),
            provider: providers.join(","),
            ips,
        };

        if !result.is_cdn && self.multi_ip_heuristic && result.ips.len() == 2 {
            debug!("{} resolves to two unmatched addresses, flagging as load-balanced", host);
            result.is_cdn = true;
            result.provider = LOAD_BALANCER_PROVIDER.to_string();
        }

        Ok(result)
    }

    /// `(comma-joined IPs, CDN label)` for a host
    pub async fn lookup(&self, host: &str) -> ReconResult<(String, String)> {
        let result = self.classify(host).await?;
        Ok((result.ip_list(), result.label()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns_cache::StaticResolver;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn classifier(resolver: StaticResolver) -> CdnClassifier {
        CdnClassifier::new(Arc::new(resolver), Arc::new(BuiltinCdnDatabase::new()))
    }

    #[test]
    fn test_builtin_table_parses_every_range() {
        let db = BuiltinCdnDatabase::new();
        let total: usize = db.providers.iter().map(|(_, nets)| nets.len()).sum();
        let expected: usize = CDN_PROVIDER_RANGES.iter().map(|(_, r)| r.len()).sum();
        assert_eq!(total, expected);
        assert_eq!(db.providers().next(), Some("Cloudflare"));
    }

    #[test]
    fn test_check_ip() {
        let db = BuiltinCdnDatabase::new();
        assert_eq!(db.check_ip(ip("104.16.1.1")), (true, "Cloudflare".to_string()));
        assert_eq!(db.check_ip(ip("151.101.1.69")), (true, "Fastly".to_string()));
        assert_eq!(db.check_ip(ip("93.184.216.34")), (false, String::new()));
    }

    #[test]
    fn test_label_formatting() {
        assert_eq!(format_cdn_label(true, "Cloudflare"), "CDN:Cloudflare");
        assert_eq!(format_cdn_label(true, "Cloudflare,Fastly"), "CDN");
        assert_eq!(format_cdn_label(true, ""), "CDN");
        assert_eq!(format_cdn_label(false, "Cloudflare"), "");
    }

    #[tokio::test]
    async fn test_cloudflare_domain() {
        let c = classifier(StaticResolver::new().with_record("cf.test", &[ip("104.16.1.1")]));
        let (ips, label) = c.lookup("cf.test").await.unwrap();
        assert_eq!(ips, "104.16.1.1");
        assert_eq!(label, "CDN:Cloudflare");
    }

    #[tokio::test]
    async fn test_two_unmatched_ips_are_load_balanced() {
        let c = classifier(
            StaticResolver::new().with_record("lb.test", &[ip("10.0.0.1"), ip("10.0.0.2")]),
        );
        let result = c.classify("lb.test").await.unwrap();
        assert!(result.is_cdn);
        assert_eq!(result.label(), "CDN:load-balancer");
        assert_eq!(result.ip_list(), "10.0.0.1,10.0.0.2");
    }

    #[tokio::test]
    async fn test_heuristic_can_be_disabled() {
        let c = classifier(
            StaticResolver::new().with_record("lb.test", &[ip("10.0.0.1"), ip("10.0.0.2")]),
        )
        .with_multi_ip_heuristic(false);
        assert_eq!(c.lookup("lb.test").await.unwrap().1, "");
    }

    #[tokio::test]
    async fn test_single_unmatched_ip_has_no_label() {
        let c = classifier(StaticResolver::new().with_record("plain.test", &[ip("10.0.0.1")]));
        assert_eq!(c.lookup("plain.test").await.unwrap(), ("10.0.0.1".to_string(), String::new()));
    }

    #[tokio::test]
    async fn test_three_unmatched_ips_have_no_label() {
        let c = classifier(StaticResolver::new().with_record(
            "many.test",
            &[ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.3")],
        ));
        assert_eq!(c.lookup("many.test").await.unwrap().1, "");
    }

    #[tokio::test]
    async fn test_mixed_providers_are_compound() {
        let c = classifier(
            StaticResolver::new().with_record("multi.test", &[ip("104.16.1.1"), ip("151.101.1.1")]),
        );
        let result = c.classify("multi.test").await.unwrap();
        assert_eq!(result.provider, "Cloudflare,Fastly");
        assert_eq!(result.label(), "CDN");
    }

    #[tokio::test]
    async fn test_ip_literal_skips_dns() {
        let c = classifier(StaticResolver::new());
        let (ips, label) = c.lookup("104.16.1.1").await.unwrap();
        assert_eq!(ips, "104.16.1.1");
        assert_eq!(label, "CDN:Cloudflare");
    }

    #[tokio::test]
    async fn test_empty_host_and_resolution_failure() {
        let c = classifier(StaticResolver::new());
        assert!(c.classify("").await.is_err());
        assert!(matches!(
            c.classify("nowhere.test").await,
            Err(ReconError::DnsResolution { .. })
        ));
    }
}
