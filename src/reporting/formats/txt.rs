// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use crate::reporting::types::OutputRecord;

/// `full_url<TAB>title<TAB>favicon_hash`, one line per record
pub struct TxtReportGenerator;

impl TxtReportGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, records: &[OutputRecord]) -> Vec<u8> {
        let mut out = String::new();
        for record in records {
            out.push_str(&format!(
                "{}\t{}\t{}\n",
                record.target(),
                record.title,
                record.favicon_hash
            ));
        }
        out.into_bytes()
    }
}

impl Default for TxtReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}
