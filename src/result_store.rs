// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::types::ScanOutcome;

/// Outcomes keyed by full URL (host for failures and CDN-only runs).
///
/// Written by scan tasks, read by the output stage. A later outcome for the same key
/// replaces the earlier one.
#[derive(Debug, Default)]
pub struct ResultStore {
    hosts: RwLock<HashMap<String, ScanOutcome>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, outcome: ScanOutcome) {
        let key = outcome.store_key().to_string();
        self.hosts.write().insert(key, outcome);
    }

    pub fn has_results(&self) -> bool {
        !self.hosts.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.hosts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_results()
    }

    pub fn get(&self, key: &str) -> Option<ScanOutcome> {
        self.hosts.read().get(key).cloned()
    }

    /// Copy of every outcome, unordered
    pub fn snapshot(&self) -> Vec<ScanOutcome> {
        self.hosts.read().values().cloned().collect()
    }

    /// Take every outcome out of the store, unordered
    pub fn drain(&self) -> Vec<ScanOutcome> {
        self.hosts.write().drain().map(|(_, v)| v).collect()
    }

    pub fn success_count(&self) -> usize {
        self.hosts.read().values().filter(|o| !o.is_failed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.hosts.read().values().filter(|o| o.is_failed()).count()
    }
}
