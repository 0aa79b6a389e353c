//! Command implementations

pub mod check;
pub mod fingerprint;

use crate::work::WorkFile;
use anyhow::{Context, Result};
use fp_execution::{FileFingerprints, FingerprinterRegistry, InputFingerprinter, InputFingerprints, ValueSnapshots};
use fp_files::FileCollectionSnapshotter;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Run one fingerprinting pass over every input the work file declares
pub(crate) fn run_pass(
    work: &WorkFile,
    previous_values: &ValueSnapshots,
    previous_files: &FileFingerprints,
) -> Result<InputFingerprints> {
    let fingerprinter = InputFingerprinter::new(
        FileCollectionSnapshotter::new(work.snapshotter.clone()),
        Arc::new(FingerprinterRegistry::new()),
    );

    fingerprinter
        .fingerprint_input_properties(
            previous_values,
            previous_files,
            Arc::new(BTreeMap::new()),
            Arc::new(BTreeMap::new()),
            |visitor| {
                for (name, value) in &work.values {
                    visitor.visit_input_property(name, || value)?;
                }
                for input in &work.files {
                    visitor.visit_input_file_property(&input.name, input.behavior, || input.to_file_value(work))?;
                }
                Ok(())
            },
        )
        .context("Fingerprinting failed")
}
