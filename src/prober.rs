// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Protocol Prober
 * Scheme/port disambiguation and per-host enrichment
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::net::Ipv6Addr;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::cdn_detector::CdnClassifier;
use crate::errors::{NetworkError, ReconError, ReconResult};
use crate::favicon::FaviconHasher;
use crate::fingerprint::FingerprintDispatcher;
use crate::http_client::{HttpResponse, RedirectMode, Transport};
use crate::types::{FingerprintEvidence, ScanFlag, ScanOutcome};

const HTTPS_PREFIX: &str = "https://";
const HTTP_PREFIX: &str = "http://";

/// Rejection page nginx serves when plain HTTP reaches a TLS-only port
pub const HTTPS_PORT_MISMATCH_MARKER: &str =
    "<title>400 The plain HTTP request was sent to HTTPS port</title>";

/// Decides scheme and port for a host, fetches it and enriches the outcome
pub struct ProtocolProber {
    transport: Arc<dyn Transport>,
    classifier: Arc<CdnClassifier>,
    favicon: FaviconHasher,
    fingerprint: Arc<FingerprintDispatcher>,
}

impl ProtocolProber {
    pub fn new(
        transport: Arc<dyn Transport>,
        classifier: Arc<CdnClassifier>,
        fingerprint: Arc<FingerprintDispatcher>,
    ) -> Self {
        Self {
            favicon: FaviconHasher::new(Arc::clone(&transport)),
            transport,
            classifier,
            fingerprint,
        }
    }

    /// Probe one input line: bare host, `host:port` or full URL
    pub async fn probe(&self, input: &str) -> ReconResult<ScanOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ReconError::ScanHostFailed {
                host: input.to_string(),
            });
        }

        if input.starts_with(HTTPS_PREFIX) {
            let mut outcome = self.fetch(input).await?;
            outcome.port = 443;
            outcome.tls = true;
            outcome.host = url_hostname(input);
            return Ok(self.enrich(outcome).await);
        }

        if input.starts_with(HTTP_PREFIX) {
            let mut outcome = self.fetch(input).await?;
            outcome.port = 80;
            outcome.tls = false;
            outcome.host = url_hostname(input);
            return Ok(self.enrich(outcome).await);
        }

        let (hostname, port) = split_host_port(input)?;

        match port {
            Some(80) => {
                let mut outcome = self.fetch(&format!("{}{}", HTTP_PREFIX, input)).await?;
                outcome.port = 80;
                outcome.tls = false;
                outcome.host = hostname;
                Ok(self.enrich(outcome).await)
            }
            Some(443) => {
                let mut outcome = self.fetch(&format!("{}{}", HTTPS_PREFIX, input)).await?;
                outcome.port = 443;
                outcome.tls = true;
                outcome.host = hostname;
                Ok(self.enrich(outcome).await)
            }
            _ => self.probe_ambiguous(input, hostname, port).await,
        }
    }

    /// No usable scheme hint: HTTPS first, then HTTP with mismatch detection
    async fn probe_ambiguous(
        &self,
        input: &str,
        hostname: String,
        port: Option<u16>,
    ) -> ReconResult<ScanOutcome> {
        let https_err = match self.fetch(&format!("{}{}", HTTPS_PREFIX, input)).await {
            Ok(outcome) => {
                let outcome = as_tls(outcome, &hostname, port);
                return Ok(self.enrich(outcome).await);
            }
            Err(e) => e,
        };
        debug!("HTTPS attempt for {} failed: {}", input, https_err);

        match self.fetch(&format!("{}{}", HTTP_PREFIX, input)).await {
            Ok(outcome) if outcome.body.contains(HTTPS_PORT_MISMATCH_MARKER) => {
                debug!("{} answered plain HTTP with a TLS-port rejection", input);
                let outcome = as_tls(outcome, &hostname, port);
                Ok(self.enrich(outcome).await)
            }
            Ok(mut outcome) => {
                outcome.port = port.unwrap_or(80);
                outcome.tls = false;
                outcome.full_url = build_url(HTTP_PREFIX, &hostname, port);
                outcome.host = hostname;
                Ok(self.enrich(outcome).await)
            }
            Err(http_err) => {
                debug!("HTTP attempt for {} failed: {}", input, http_err);
                Err(ReconError::ScanHostFailed {
                    host: input.to_string(),
                })
            }
        }
    }

    /// Resolve and classify only, no HTTP
    pub async fn probe_cdn_only(&self, input: &str) -> ReconResult<ScanOutcome> {
        let input = input.trim();

        let (hostname, full_url) =
            if input.starts_with(HTTPS_PREFIX) || input.starts_with(HTTP_PREFIX) {
                let parsed = Url::parse(input).map_err(|_| {
                    ReconError::Network(NetworkError::InvalidUrl {
                        url: input.to_string(),
                    })
                })?;
                let hostname = parsed.host_str().unwrap_or_default().to_string();
                (hostname, input.to_string())
            } else {
                let hostname = input.split(':').next().unwrap_or_default().to_string();
                (hostname.clone(), hostname)
            };

        let (ip, cdn) = self.classifier.lookup(&hostname).await?;

        Ok(ScanOutcome {
            flag: ScanFlag::Success,
            full_url,
            host: hostname,
            ip,
            cdn,
            ..Default::default()
        })
    }

    async fn fetch(&self, url: &str) -> ReconResult<ScanOutcome> {
        let response = self.transport.fetch(url, RedirectMode::Follow).await?;
        Ok(outcome_from_response(url, response))
    }

    /// CDN, favicon and fingerprint fields. Failures leave the field empty.
    async fn enrich(&self, mut outcome: ScanOutcome) -> ScanOutcome {
        let (cdn, favicon_hash) = tokio::join!(
            self.classifier.lookup(&outcome.host),
            self.favicon.hash(&outcome.full_url, &outcome.body)
        );

        match cdn {
            Ok((ip, label)) => {
                outcome.ip = ip;
                outcome.cdn = label;
            }
            Err(e) => warn!("Failed to get CDN info for {}: {}", outcome.host, e),
        }

        outcome.favicon_hash = favicon_hash;
        outcome.fingerprint = self
            .fingerprint
            .dispatch(FingerprintEvidence::from_outcome(&outcome))
            .await;

        outcome
    }
}

fn outcome_from_response(url: &str, response: HttpResponse) -> ScanOutcome {
    ScanOutcome {
        flag: ScanFlag::Success,
        full_url: url.to_string(),
        title: response.title,
        body: response.body,
        raw_body: response.raw_body,
        raw_header: response.raw_header,
        raw: response.raw,
        headers: response.headers,
        status_code: response.status_code,
        content_length: response.content_length,
        response_time_ms: response.duration_ms,
        ..Default::default()
    }
}

/// Mark an outcome as TLS on the requested port, 443 when none was given
fn as_tls(mut outcome: ScanOutcome, hostname: &str, port: Option<u16>) -> ScanOutcome {
    outcome.port = port.unwrap_or(443);
    outcome.tls = true;
    outcome.full_url = build_url(HTTPS_PREFIX, hostname, port);
    outcome.host = hostname.to_string();
    outcome
}

fn build_url(prefix: &str, hostname: &str, port: Option<u16>) -> String {
    let host = if hostname.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]", hostname)
    } else {
        hostname.to_string()
    };
    match port {
        Some(p) => format!("{}{}:{}", prefix, host, p),
        None => format!("{}{}", prefix, host),
    }
}

fn url_hostname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_matches(|c| c == '[' || c == ']').to_string()))
        .unwrap_or_default()
}

/// Split `host[:port][/path]` into hostname and explicit port.
///
/// The port is `Some` only when written out, so `host:80` and `host` stay distinct.
fn split_host_port(input: &str) -> ReconResult<(String, Option<u16>)> {
    let invalid = || {
        ReconError::Network(NetworkError::InvalidUrl {
            url: input.to_string(),
        })
    };

    let authority = input
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
        (host, after.strip_prefix(':'))
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(invalid());
    }

    let port = match port {
        Some("") | None => None,
        Some(p) => Some(p.parse::<u16>().map_err(|_| invalid())?),
    };

    Ok((host.to_lowercase(), port))
}
