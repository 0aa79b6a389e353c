//! Up-to-date check of a work unit against a previous report

use crate::report::Report;
use crate::work::WorkFile;
use anyhow::Result;
use fp_execution::InputChanges;
use owo_colors::OwoColorize;
use std::path::Path;

/// Returns whether the work unit is up to date
pub fn run(work_path: &Path, against: &Path) -> Result<bool> {
    let work = WorkFile::load(work_path)?;
    let previous = Report::load(against)?;
    let result = super::run_pass(&work, &previous.value_snapshots, &previous.file_fingerprints)?;

    let changes = InputChanges::detect(&previous.value_snapshots, &previous.file_fingerprints, &result);
    if changes.is_up_to_date() {
        println!("{}", "UP-TO-DATE".green().bold());
        return Ok(true);
    }

    println!("{}", "OUT-OF-DATE".red().bold());
    for change in changes.changes() {
        println!("{change}");
    }
    Ok(false)
}
