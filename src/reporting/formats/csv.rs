// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use crate::reporting::types::OutputRecord;
use anyhow::Result;
use csv::Writer;

/// Excel needs the BOM to pick UTF-8 for non-ASCII titles
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct CsvReportGenerator;

impl CsvReportGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, records: &[OutputRecord]) -> Result<Vec<u8>> {
        let mut wtr = Writer::from_writer(UTF8_BOM.to_vec());

        wtr.write_record([
            "FullURL",
            "Title",
            "StatusCode",
            "Faviconhash",
            "ContentLength",
            "ResponseTime",
            "Host",
            "IP",
            "Port",
            "TLS",
            "CDN",
            "Fingerprint",
        ])?;

        for record in records {
            wtr.write_record([
                record.target(),
                record.title.as_str(),
                record.status_code.to_string().as_str(),
                record.favicon_hash.as_str(),
                record.content_length.to_string().as_str(),
                record.response_time.to_string().as_str(),
                record.host.as_str(),
                record.ip.as_str(),
                record.port.to_string().as_str(),
                record.tls.to_string().as_str(),
                record.cdn.as_str(),
                record.fingerprint.as_str(),
            ])?;
        }

        let data = wtr.into_inner()?;
        Ok(data)
    }
}

impl Default for CsvReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}
