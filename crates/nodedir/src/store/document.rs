// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The single logical record behind the service.
///
/// Country counters serialize as `logs` to stay readable alongside
/// documents written by earlier deployments.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDocument {
    #[serde(default)]
    pub nodes: String,
    #[serde(default, rename = "logs")]
    pub country_counters: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub login_failures: BTreeMap<String, FailureRecord>,
}

/// Failed-login bookkeeping for one source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub count: u32,
    /// Epoch milliseconds of the most recent failure.
    pub last_failure_at: u64,
}

impl DirectoryDocument {
    /// Parse a stored document. `None` when the JSON is unusable.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn failures(&self, source: &str) -> Option<&FailureRecord> {
        self.login_failures.get(source)
    }
}
