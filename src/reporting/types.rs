// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::ScanOutcome;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Txt,
    Json,
    Csv,
}

impl ReportFormat {
    /// Format implied by the file extension; anything unknown is plain text
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => ReportFormat::Csv,
            Some("json") => ReportFormat::Json,
            _ => ReportFormat::Txt,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One output row. Raw bytes and bodies stay out of reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutputRecord {
    #[serde(rename = "fullurl", skip_serializing_if = "String::is_empty", default)]
    pub full_url: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub ip: String,
    pub port: u16,
    pub tls: bool,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub title: String,
    #[serde(rename = "statuscode", default)]
    pub status_code: u16,
    #[serde(rename = "contentlength", default)]
    pub content_length: u64,
    #[serde(rename = "responsetime", default)]
    pub response_time: u64,
    #[serde(rename = "faviconhash", skip_serializing_if = "String::is_empty", default)]
    pub favicon_hash: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub cdn: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub fingerprint: String,
    #[serde(skip_serializing_if = "is_false", default)]
    pub failed: bool,
}

impl From<&ScanOutcome> for OutputRecord {
    fn from(outcome: &ScanOutcome) -> Self {
        Self {
            full_url: outcome.full_url.clone(),
            host: outcome.host.clone(),
            ip: outcome.ip.clone(),
            port: outcome.port,
            tls: outcome.tls,
            title: outcome.title.clone(),
            status_code: outcome.status_code,
            content_length: outcome.content_length,
            response_time: outcome.response_time_ms,
            favicon_hash: outcome.favicon_hash.clone(),
            cdn: outcome.cdn.clone(),
            fingerprint: outcome.fingerprint.clone(),
            failed: outcome.is_failed(),
        }
    }
}

impl OutputRecord {
    /// Full URL, or the bare host for failures
    pub fn target(&self) -> &str {
        if self.full_url.is_empty() {
            &self.host
        } else {
            &self.full_url
        }
    }
}
