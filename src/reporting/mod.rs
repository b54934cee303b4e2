// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod formats;
pub mod types;

pub use types::{OutputRecord, ReportFormat};

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::result_store::ResultStore;
use crate::types::ScanOutcome;
use formats::{csv::CsvReportGenerator, json::JsonReportGenerator, txt::TxtReportGenerator};

/// Report rows for a store, sorted by target. Failed outcomes only when `include_failed`.
pub fn collect_records(store: &ResultStore, include_failed: bool) -> Vec<OutputRecord> {
    let mut records: Vec<OutputRecord> = store
        .snapshot()
        .iter()
        .filter(|o| include_failed || !o.is_failed())
        .map(OutputRecord::from)
        .collect();
    records.sort_by(|a, b| a.target().cmp(b.target()));
    records
}

/// Render records in the given format
pub fn render(records: &[OutputRecord], format: ReportFormat) -> Result<Vec<u8>> {
    match format {
        ReportFormat::Csv => CsvReportGenerator::new().generate(records),
        ReportFormat::Json => JsonReportGenerator::new().generate(records),
        ReportFormat::Txt => Ok(TxtReportGenerator::new().generate(records)),
    }
}

/// Write the store to `path`, format picked from the extension.
///
/// Nothing is written when there are no records. Returns the number of records written.
pub async fn write_results(store: &ResultStore, path: &Path, include_failed: bool) -> Result<usize> {
    let records = collect_records(store, include_failed);
    if records.is_empty() {
        debug!("No results to write to {}", path.display());
        return Ok(0);
    }

    let format = ReportFormat::from_path(path);
    let data = render(&records, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Could not create output folder {}", parent.display()))?;
    }

    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("Could not write output file {}", path.display()))?;

    info!("Wrote {} results to {} ({:?})", records.len(), path.display(), format);
    Ok(records.len())
}

/// Console line for one outcome; `None` for failures when `clear` is set
pub fn console_line(outcome: &ScanOutcome, clear: bool) -> Option<String> {
    if outcome.is_failed() {
        if clear {
            return None;
        }
        return Some(format!("{} [failed]", outcome.host));
    }

    // CDN-only outcomes carry no HTTP fields
    if outcome.status_code == 0 {
        return Some(format!("{} [{}] [{}]", outcome.full_url, outcome.ip, outcome.cdn));
    }

    Some(format!(
        "{} [{}] [{}] [{}] [{}] [{}]",
        outcome.full_url,
        outcome.status_code,
        outcome.title,
        outcome.favicon_hash,
        outcome.cdn,
        outcome.fingerprint
    ))
}
