//! Fingerprint a work unit and print the combined hashes

use crate::report::Report;
use crate::work::WorkFile;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::collections::BTreeMap;
use std::path::Path;

pub fn run(work_path: &Path, report_path: Option<&Path>) -> Result<()> {
    let work = WorkFile::load(work_path)?;
    let result = super::run_pass(&work, &BTreeMap::new(), &BTreeMap::new())?;

    let values = result.value_snapshots();
    if !values.is_empty() {
        println!("{}", "Values".bold());
        for (name, snapshot) in values {
            println!("  {:<24} {}", name.cyan(), snapshot.structural_hash().short().dimmed());
        }
    }

    let files = result.file_fingerprints();
    if !files.is_empty() {
        println!("{}", "Files".bold());
        for (name, fingerprint) in files {
            let mut note = format!("({} entries, {})", fingerprint.len(), fingerprint.strategy_identifier());
            if result.properties_requiring_is_empty_check().contains(name) {
                note.push_str(", requires emptiness check");
            }
            println!(
                "  {:<24} {} {}",
                name.cyan(),
                fingerprint.hash().short(),
                note.dimmed()
            );
        }
    }

    if let Some(path) = report_path {
        Report::from_fingerprints(&result).save(path)?;
        println!("{} {}", "Report written to".green(), path.display());
    }

    Ok(())
}
