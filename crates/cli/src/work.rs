//! Work-unit description files
//!
//! A work file declares the inputs of one unit of work:
//!
//! ```toml
//! [snapshotter]
//! additional_excludes = ["*.log"]
//!
//! [values]
//! optimize = true
//! defines = { DEBUG = "0" }
//!
//! [[files]]
//! name = "sources"
//! paths = ["src"]
//! includes = ["*.c", "*.h"]
//! normalizer = "relative"
//! line_endings = "normalize"
//! behavior = "primary"
//! ```
//!
//! Relative paths resolve against the directory holding the work file.

use anyhow::{bail, Context, Result};
use fp_execution::{
    DirectorySensitivity, InputBehavior, InputFileValue, LineEndingSensitivity, PathSensitivity,
};
use fp_files::{FileCollection, PatternSpec, SnapshotterConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Parsed work file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkFile {
    #[serde(default)]
    pub snapshotter: SnapshotterConfig,
    #[serde(default)]
    pub values: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub files: Vec<FileInput>,
    /// Directory relative paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// One declared file property
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileInput {
    pub name: String,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub archives: Vec<PathBuf>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default = "default_normalizer")]
    pub normalizer: PathSensitivity,
    #[serde(default)]
    pub directory_sensitivity: DirectorySensitivity,
    #[serde(default)]
    pub line_endings: LineEndingSensitivity,
    #[serde(default)]
    pub behavior: InputBehavior,
}

fn default_normalizer() -> PathSensitivity {
    PathSensitivity::Absolute
}

impl WorkFile {
    /// Load and validate a work file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read work file {}", path.display()))?;
        let mut work: WorkFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse work file {}", path.display()))?;
        work.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        work.validate()?;
        Ok(work)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for input in &self.files {
            if input.name.trim().is_empty() {
                bail!("File property names must not be empty");
            }
            if !seen.insert(input.name.as_str()) {
                bail!("File property '{}' is declared twice", input.name);
            }
        }
        Ok(())
    }

    /// Resolve `path` against the work file's directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }
}

impl FileInput {
    /// Build the file value handed to the fingerprinter
    pub fn to_file_value(&self, work: &WorkFile) -> InputFileValue {
        let mut files = FileCollection::new();
        let patterns = PatternSpec {
            includes: self.includes.clone(),
            excludes: self.excludes.clone(),
        };
        for path in &self.paths {
            files = if patterns.is_empty() {
                files.with_path(work.resolve(path))
            } else {
                files.with_tree(work.resolve(path), patterns.clone())
            };
        }
        for archive in &self.archives {
            files = files.with_archive(work.resolve(archive));
        }
        InputFileValue::new(files, self.normalizer)
            .with_directory_sensitivity(self.directory_sensitivity)
            .with_line_ending_sensitivity(self.line_endings)
    }
}
