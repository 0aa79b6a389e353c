//! JSON report of a fingerprinting pass

use anyhow::{Context, Result};
use fp_execution::{FileFingerprints, InputFingerprints, ValueSnapshots};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Every fingerprint of one pass, known and fresh
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Report {
    pub value_snapshots: ValueSnapshots,
    pub file_fingerprints: FileFingerprints,
    #[serde(default)]
    pub properties_requiring_is_empty_check: BTreeSet<String>,
}

impl Report {
    pub fn from_fingerprints(fingerprints: &InputFingerprints) -> Self {
        Self {
            value_snapshots: ValueSnapshots::clone(&fingerprints.all_value_snapshots()),
            file_fingerprints: FileFingerprints::clone(&fingerprints.all_file_fingerprints()),
            properties_requiring_is_empty_check: fingerprints.properties_requiring_is_empty_check().clone(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse report {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))
    }
}
