// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::{ProxyConfig, ScanOptions};
use crate::encoding::{extract_title, normalize_body};
use crate::errors::{NetworkError, ReconError, ReconResult};
use crate::retry::{retry_request, SprayPolicy};

/// Realistic browser User-Agents to avoid detection
const BROWSER_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Safari on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Get a realistic browser User-Agent (rotates to avoid blocks)
fn get_browser_user_agent() -> &'static str {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let index = COUNTER.fetch_add(1, Ordering::Relaxed) % BROWSER_USER_AGENTS.len();
    BROWSER_USER_AGENTS[index]
}

/// Maximum response body size (2MB), larger bodies are truncated
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Redirect hops followed in `RedirectMode::Follow`. Past the cap the last
/// redirect response is returned as the answer.
pub const MAX_REDIRECTS: usize = 10;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(15);
const TCP_KEEPALIVE: Duration = Duration::from_secs(15);

/// Whether a fetch follows redirects or returns the first response as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Follow,
    None,
}

/// HTTP fetch capability used by the prober and the favicon hasher
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, redirect: RedirectMode) -> ReconResult<HttpResponse>;

    async fn get(&self, url: &str) -> ReconResult<HttpResponse> {
        self.fetch(url, RedirectMode::Follow).await
    }
}

/// Retrying HTTP client with a redirecting and a non-redirecting variant
/// sharing one configuration.
#[derive(Clone)]
pub struct HttpClient {
    redirect_client: Client,
    no_redirect_client: Client,
    retry: SprayPolicy,
    max_body_size: usize,
}

impl HttpClient {
    pub fn new(timeout_secs: u64, max_retries: u32) -> ReconResult<Self> {
        Self::with_config(timeout_secs, SprayPolicy::new(max_retries), true, &ProxyConfig::None)
    }

    pub fn from_options(options: &ScanOptions) -> ReconResult<Self> {
        let proxy = options.proxy_config()?;
        Self::with_config(
            options.timeout_secs,
            SprayPolicy::new(options.retries),
            options.insecure_tls,
            &proxy,
        )
    }

    pub fn with_config(
        timeout_secs: u64,
        retry: SprayPolicy,
        accept_invalid_certs: bool,
        proxy: &ProxyConfig,
    ) -> ReconResult<Self> {
        let timeout = Duration::from_secs(timeout_secs);

        // Asset discovery, not trust validation: self-signed and mismatched certificates
        // are the norm on non-standard ports. `--strict-tls` turns verification back on.
        if accept_invalid_certs {
            warn!("Certificate validation is DISABLED for this run");
        }

        if let Some(addr) = proxy.display_addr() {
            debug!("Routing requests through proxy {}", addr);
        }

        let redirect_client = Self::build_client(
            timeout,
            accept_invalid_certs,
            proxy,
            capped_redirect_policy(MAX_REDIRECTS),
        )?;
        let no_redirect_client =
            Self::build_client(timeout, accept_invalid_certs, proxy, redirect::Policy::none())?;

        Ok(Self {
            redirect_client,
            no_redirect_client,
            retry,
            max_body_size: MAX_BODY_SIZE,
        })
    }

    fn build_client(
        timeout: Duration,
        accept_invalid_certs: bool,
        proxy: &ProxyConfig,
        policy: redirect::Policy,
    ) -> ReconResult<Client> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(policy)
            .pool_max_idle_per_host(num_cpus::get() * 2)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .tcp_nodelay(true);

        if let Some(p) = proxy.to_reqwest()? {
            builder = builder.proxy(p);
        }

        builder.build().map_err(|e| {
            ReconError::Configuration(format!("Failed to create HTTP client: {}", e))
        })
    }

    async fn fetch_once(&self, client: &Client, url: &str) -> ReconResult<HttpResponse> {
        let start = Instant::now();

        let mut response = client
            .get(url)
            .header(reqwest::header::USER_AGENT, get_browser_user_agent())
            .send()
            .await?;

        // Headers are in once send() resolves, which is our first-byte mark
        let duration_ms = start.elapsed().as_millis() as u64;

        let status = response.status();
        let version = format!("{:?}", response.version());
        let final_url = response.url().to_string();
        let header_pairs: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).to_string(),
                )
            })
            .collect();
        let declared_length = response.content_length();

        let mut raw_body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let remaining = self.max_body_size.saturating_sub(raw_body.len());
            if chunk.len() >= remaining {
                raw_body.extend_from_slice(&chunk[..remaining]);
                debug!("Truncated body of {} at {} bytes", url, self.max_body_size);
                break;
            }
            raw_body.extend_from_slice(&chunk);
        }

        let mut http_response = HttpResponse::from_parts(
            final_url,
            status.as_u16(),
            &header_pairs,
            raw_body,
        );
        http_response.duration_ms = duration_ms;
        http_response.raw_header = build_raw_header(
            &version,
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            &header_pairs,
        );
        http_response.raw = [
            http_response.raw_header.as_slice(),
            b"\r\n",
            http_response.raw_body.as_slice(),
        ]
        .concat();
        if let Some(len) = declared_length {
            http_response.content_length = len;
        }

        Ok(http_response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn fetch(&self, url: &str, redirect: RedirectMode) -> ReconResult<HttpResponse> {
        if url.is_empty() {
            return Err(ReconError::Network(NetworkError::InvalidUrl {
                url: url.to_string(),
            }));
        }

        let client = match redirect {
            RedirectMode::Follow => &self.redirect_client,
            RedirectMode::None => &self.no_redirect_client,
        };

        retry_request(&self.retry, url, || self.fetch_once(client, url)).await
    }
}

fn capped_redirect_policy(max_redirects: usize) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

/// Status line plus header lines, CRLF terminated
fn build_raw_header(version: &str, status: u16, reason: &str, headers: &[(String, String)]) -> Vec<u8> {
    let mut raw = format!("{} {} {}\r\n", version, status, reason);
    for (name, value) in headers {
        raw.push_str(name);
        raw.push_str(": ");
        raw.push_str(value);
        raw.push_str("\r\n");
    }
    raw.into_bytes()
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    pub status_code: u16,
    /// Lower-cased header name to first value
    pub headers: HashMap<String, String>,
    /// Normalized UTF-8 body
    pub body: String,
    pub raw_body: Vec<u8>,
    pub raw_header: Vec<u8>,
    pub raw: Vec<u8>,
    pub title: String,
    pub content_length: u64,
    pub duration_ms: u64,
}

impl HttpResponse {
    /// Build a response from captured parts. Also used by test transports.
    pub fn from_parts(
        url: impl Into<String>,
        status_code: u16,
        header_pairs: &[(String, String)],
        raw_body: Vec<u8>,
    ) -> Self {
        let mut headers = HashMap::with_capacity(header_pairs.len());
        for (k, v) in header_pairs {
            headers
                .entry(k.to_lowercase())
                .or_insert_with(|| v.clone());
        }

        let body = normalize_body(&raw_body);
        let title = extract_title(&body);
        let raw_header = build_raw_header("HTTP/1.1", status_code, "", header_pairs);
        let raw = [raw_header.as_slice(), b"\r\n", raw_body.as_slice()].concat();

        Self {
            url: url.into(),
            status_code,
            headers,
            content_length: raw_body.len() as u64,
            body,
            raw_body,
            raw_header,
            raw,
            title,
            duration_ms: 0,
        }
    }
}
