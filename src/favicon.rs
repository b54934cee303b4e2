// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Favicon hashing
//!
//! Locates a page's favicon and computes the Shodan-compatible mmh3 hash over it:
//! base64 with a newline every 76 characters, MurmurHash3 (x86, 32-bit, seed 0),
//! rendered as a signed decimal. Absence of a favicon is a normal outcome and yields
//! an empty string.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::http_client::Transport;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("link[href][rel]").expect("link selector is valid"));

/// `rel` values that name an icon
const ICON_RELS: &[&str] = &["icon", "shortcut icon", "mask-icon", "apple-touch-icon"];

/// Relative hrefs are only trusted when they look like an image
const RELATIVE_ICON_SUFFIXES: &[&str] = &[".ico", ".png", ".jpg"];

const BASE64_LINE_WIDTH: usize = 76;

pub struct FaviconHasher {
    transport: Arc<dyn Transport>,
}

impl FaviconHasher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Hash the favicon of the page at `page_url`, or "" when there is none
    pub async fn hash(&self, page_url: &str, body: &str) -> String {
        if page_url.is_empty() || body.is_empty() {
            return String::new();
        }

        let icon_url = if page_url.ends_with(".ico") {
            page_url.to_string()
        } else {
            match resolve_icon_url(page_url, &extract_icon_urls(body)) {
                Some(url) => url,
                None => return String::new(),
            }
        };

        self.hash_icon(&icon_url).await
    }

    async fn hash_icon(&self, icon_url: &str) -> String {
        let response = match self.transport.get(icon_url).await {
            Ok(r) => r,
            Err(e) => {
                debug!("Favicon fetch failed for {}: {}", icon_url, e);
                return String::new();
            }
        };

        if response.status_code != 200 || response.raw_body.is_empty() {
            return String::new();
        }

        match favicon_hash(&response.raw_body) {
            Some(hash) => {
                debug!("Favicon {} hashed to {}", icon_url, hash);
                hash.to_string()
            }
            None => {
                debug!("Favicon {} is not an image", icon_url);
                String::new()
            }
        }
    }
}

/// `href` of every icon `<link>`, in document order
pub fn extract_icon_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&LINK_SELECTOR)
        .filter(|link| {
            link.value()
                .attr("rel")
                .map(|rel| ICON_RELS.iter().any(|r| rel.eq_ignore_ascii_case(r)))
                .unwrap_or(false)
        })
        .filter_map(|link| link.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Pick the first usable candidate, falling back to `/favicon.ico` on the page origin.
/// `None` only when the page URL itself cannot be parsed.
pub fn resolve_icon_url(page_url: &str, candidates: &[String]) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    let host = parsed.host_str()?;
    let base = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };

    for candidate in candidates.iter().filter(|c| !c.is_empty()) {
        if candidate.starts_with("//") {
            return Some(format!("http:{}", candidate));
        }
        if candidate.starts_with("http") {
            return Some(candidate.clone());
        }
        if RELATIVE_ICON_SUFFIXES.iter().any(|s| candidate.ends_with(s)) {
            return Some(format!("{}/{}", base, candidate.trim_matches('/')));
        }
    }

    Some(format!("{}/favicon.ico", base))
}

/// mmh3 favicon hash, `None` when the bytes do not sniff as an image
pub fn favicon_hash(data: &[u8]) -> Option<i32> {
    if !is_image(data) {
        return None;
    }
    Some(mmh3_hash(data))
}

/// Hash arbitrary bytes the way Shodan hashes favicons
pub fn mmh3_hash(data: &[u8]) -> i32 {
    let encoded = insert_newlines(&BASE64.encode(data), BASE64_LINE_WIDTH);
    murmur3_32(encoded.as_bytes(), 0) as i32
}

/// Newline after every `interval` characters (not after the last one), plus a
/// trailing newline
fn insert_newlines(s: &str, interval: usize) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / interval + 1);
    let last = s.len().saturating_sub(1);
    for (i, ch) in s.char_indices() {
        out.push(ch);
        if i % interval == interval - 1 && i != last {
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

/// Magic-byte sniffing for the image formats browsers accept as icons
fn is_image(data: &[u8]) -> bool {
    const SIGNATURES: &[&[u8]] = &[
        b"\x00\x00\x01\x00",  // ico
        b"\x00\x00\x02\x00",  // cur
        b"\x89PNG\r\n\x1a\n",
        b"GIF87a",
        b"GIF89a",
        b"\xff\xd8\xff",      // jpeg
        b"BM",
    ];

    if SIGNATURES.iter().any(|sig| data.starts_with(sig)) {
        return true;
    }

    // webp: RIFF????WEBPVP
    data.len() >= 14 && &data[..4] == b"RIFF" && &data[8..14] == b"WEBPVP"
}

/// MurmurHash3 32-bit implementation
fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e2d51;
    const C2: u32 = 0x1b873593;
    const R1: u32 = 15;
    const R2: u32 = 13;
    const M: u32 = 5;
    const N: u32 = 0xe6546b64;

    let mut h1 = seed;
    let len = data.len();

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let mut k1 = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(R1);
        k1 = k1.wrapping_mul(C2);

        h1 ^= k1;
        h1 = h1.rotate_left(R2);
        h1 = h1.wrapping_mul(M).wrapping_add(N);
    }

    // Tail
    let tail = blocks.remainder();
    let mut k1: u32 = 0;
    if tail.len() >= 3 {
        k1 ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k1 ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k1 ^= tail[0] as u32;
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(R1);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
    }

    // Finalization
    h1 ^= len as u32;
    h1 ^= h1 >> 16;
    h1 = h1.wrapping_mul(0x85ebca6b);
    h1 ^= h1 >> 13;
    h1 = h1.wrapping_mul(0xc2b2ae35);
    h1 ^= h1 >> 16;

    h1
}

/// Known favicon hash mapped to the technology that ships it
#[derive(Debug, Clone, Copy)]
pub struct FaviconSignature {
    pub hash: i32,
    pub technology: &'static str,
}

/// Default favicons of common servers, panels and appliances
pub const KNOWN_FAVICONS: &[FaviconSignature] = &[
    // Web Servers & Proxies
    FaviconSignature { hash: 116323821, technology: "Apache Tomcat" },
    FaviconSignature { hash: -297069493, technology: "Apache HTTP Server" },
    FaviconSignature { hash: 1485257654, technology: "Nginx" },
    // Admin Panels
    FaviconSignature { hash: -1588080585, technology: "phpMyAdmin" },
    FaviconSignature { hash: 988422585, technology: "cPanel" },
    FaviconSignature { hash: -1615535515, technology: "Plesk" },
    FaviconSignature { hash: 1848946384, technology: "Webmin" },
    // Frameworks
    FaviconSignature { hash: 1565952765, technology: "Django" },
    FaviconSignature { hash: -1203021870, technology: "Laravel" },
    FaviconSignature { hash: 1916063088, technology: "Ruby on Rails" },
    // Spring Boot and Jenkins ship the same default icon
    FaviconSignature { hash: 81586312, technology: "Spring Boot" },
    FaviconSignature { hash: 81586312, technology: "Jenkins" },
    // CMS
    FaviconSignature { hash: -335242539, technology: "WordPress" },
    FaviconSignature { hash: -1395229095, technology: "Drupal" },
    FaviconSignature { hash: 1354567968, technology: "Joomla" },
    // CI/CD & DevOps
    FaviconSignature { hash: -1950415971, technology: "GitLab" },
    FaviconSignature { hash: 516963061, technology: "SonarQube" },
    FaviconSignature { hash: 999357577, technology: "Grafana" },
    FaviconSignature { hash: -962726853, technology: "Kibana" },
    // Network Devices
    FaviconSignature { hash: 362091310, technology: "Cisco" },
    FaviconSignature { hash: 1966194251, technology: "Fortinet/FortiGate" },
    FaviconSignature { hash: 945408572, technology: "pfSense" },
    FaviconSignature { hash: -305179312, technology: "MikroTik" },
    // Cloud & Infrastructure
    FaviconSignature { hash: -1697433463, technology: "AWS" },
    FaviconSignature { hash: -1425097061, technology: "VMware vSphere" },
    FaviconSignature { hash: 2032348034, technology: "Proxmox" },
    FaviconSignature { hash: 1571628010, technology: "Burp Suite Collaborator" },
    // Microsoft
    FaviconSignature { hash: -2057558656, technology: "Microsoft IIS" },
    FaviconSignature { hash: -1293593351, technology: "Microsoft Exchange/OWA" },
    FaviconSignature { hash: 1407375695, technology: "Microsoft SharePoint" },
    // Databases
    FaviconSignature { hash: -440644498, technology: "MongoDB" },
    FaviconSignature { hash: 1417512613, technology: "Redis Commander" },
    FaviconSignature { hash: -128467043, technology: "Elasticsearch" },
    // Monitoring & asset management
    FaviconSignature { hash: 1141848389, technology: "GLPI" },
    FaviconSignature { hash: -1166125415, technology: "Zabbix" },
    FaviconSignature { hash: -1355043104, technology: "Nagios" },
];

/// Every technology whose default favicon hashes to `hash`
pub fn technologies_for_hash(hash: i32) -> impl Iterator<Item = &'static str> {
    KNOWN_FAVICONS
        .iter()
        .filter(move |sig| sig.hash == hash)
        .map(|sig| sig.technology)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur3_reference_values() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"hello", 0) as i32, 613153351);
        assert_eq!(murmur3_32(b"foo", 0) as i32, -156908512);
    }

    #[test]
    fn test_mmh3_hash_is_deterministic() {
        let icon = [0u8, 0, 1, 0, 1, 0, 16, 16, 0, 0];
        assert_eq!(mmh3_hash(&icon), mmh3_hash(&icon));
        assert_eq!(favicon_hash(&icon), Some(mmh3_hash(&icon)));
    }

    #[test]
    fn test_insert_newlines() {
        assert_eq!(insert_newlines("abcd", 2), "ab\ncd\n");
        assert_eq!(insert_newlines("abcde", 2), "ab\ncd\ne\n");
        assert_eq!(insert_newlines("", 76), "\n");

        let line = "A".repeat(76);
        assert_eq!(insert_newlines(&line, 76), format!("{}\n", line));
        let long = "A".repeat(77);
        assert_eq!(insert_newlines(&long, 76), format!("{}\nA\n", "A".repeat(76)));
    }

    #[test]
    fn test_image_sniffing() {
        assert!(is_image(b"\x89PNG\r\n\x1a\n...."));
        assert!(is_image(b"\x00\x00\x01\x00\x01\x00"));
        assert!(is_image(b"GIF89a...."));
        assert!(is_image(b"\xff\xd8\xff\xe0"));
        assert!(is_image(b"RIFF\x00\x00\x00\x00WEBPVP8 "));
        assert!(!is_image(b"<html><body>Not found</body></html>"));
        assert!(favicon_hash(b"<html></html>").is_none());
    }

    #[test]
    fn test_extract_icon_urls() {
        let html = r#"
            <html><head>
                <link rel="stylesheet" href="/style.css">
                <link rel="Shortcut Icon" href="/static/favicon.ico">
                <link rel="apple-touch-icon" href="/apple.png">
                <link rel="icon">
            </head></html>
        "#;
        assert_eq!(
            extract_icon_urls(html),
            vec!["/static/favicon.ico".to_string(), "/apple.png".to_string()]
        );
    }

    #[test]
    fn test_resolve_icon_url() {
        let page = "https://example.com:8443/app/index.html";

        assert_eq!(
            resolve_icon_url(page, &["//cdn.example.com/f.ico".to_string()]).unwrap(),
            "http://cdn.example.com/f.ico"
        );
        assert_eq!(
            resolve_icon_url(page, &["https://static.example.com/icon.png".to_string()]).unwrap(),
            "https://static.example.com/icon.png"
        );
        assert_eq!(
            resolve_icon_url(page, &["/static/favicon.ico".to_string()]).unwrap(),
            "https://example.com:8443/static/favicon.ico"
        );
        // a trailing slash hides the suffix
        assert_eq!(
            resolve_icon_url(page, &["/static/favicon.ico/".to_string()]).unwrap(),
            "https://example.com:8443/favicon.ico"
        );
        // svg is not trusted as relative, falls through to the default
        assert_eq!(
            resolve_icon_url(page, &["/icon.svg".to_string()]).unwrap(),
            "https://example.com:8443/favicon.ico"
        );
        assert_eq!(
            resolve_icon_url("http://example.com", &[]).unwrap(),
            "http://example.com/favicon.ico"
        );
        assert!(resolve_icon_url("not a url", &[]).is_none());
    }

    #[test]
    fn test_known_signatures() {
        let techs: Vec<_> = technologies_for_hash(81586312).collect();
        assert_eq!(techs, vec!["Spring Boot", "Jenkins"]);
        assert!(KNOWN_FAVICONS.iter().any(|s| s.technology == "Grafana"));
        assert_eq!(technologies_for_hash(1).count(), 0);
    }
}
