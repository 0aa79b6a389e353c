//! File collection snapshotter

use crate::archive::snapshot_archive;
use crate::collection::{FileCollection, FileRoot, PatternSpec};
use crate::config::SnapshotterConfig;
use crate::error::FileSnapshotError;
use crate::filter::PatternFilter;
use crate::walk::snapshot_path;
use fp_core::FileSystemSnapshot;
use std::time::Instant;
use tracing::debug;

/// Raw snapshot of a file collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotResult {
    /// Captured tree, one root per declared root
    pub snapshot: FileSystemSnapshot,
    /// Whether any declared root was an archive tree
    pub contains_archive_trees: bool,
}

impl SnapshotResult {
    /// Whether an archive tree was traversed
    pub fn contains_archive_trees(&self) -> bool {
        self.contains_archive_trees
    }
}

/// Source of raw snapshots for declared file collections
pub trait CollectionSnapshotter: Send + Sync {
    fn snapshot(&self, files: &FileCollection) -> Result<SnapshotResult, FileSnapshotError>;
}

/// Captures declared file collections as raw snapshot trees
///
/// Stateless apart from its configuration, so one instance can be shared
/// across threads.
#[derive(Debug, Clone, Default)]
pub struct FileCollectionSnapshotter {
    config: SnapshotterConfig,
}

impl FileCollectionSnapshotter {
    /// Create a snapshotter with the given configuration
    pub fn new(config: SnapshotterConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &SnapshotterConfig {
        &self.config
    }

    /// Snapshot every root of `files`, in declaration order
    pub fn snapshot(&self, files: &FileCollection) -> Result<SnapshotResult, FileSnapshotError> {
        let start = Instant::now();
        let mut snapshot = FileSystemSnapshot::new();
        let mut contains_archive_trees = false;

        for root in files.roots() {
            let root_snapshot = match root {
                FileRoot::Path(path) => {
                    let filter = PatternFilter::new(path, &PatternSpec::default(), &self.config)?;
                    snapshot_path(path, &filter, &self.config)?
                }
                FileRoot::Tree { root, patterns } => {
                    let filter = PatternFilter::new(root, patterns, &self.config)?;
                    snapshot_path(root, &filter, &self.config)?
                }
                FileRoot::Archive(path) => {
                    contains_archive_trees = true;
                    snapshot_archive(path)?
                }
            };
            snapshot.push(root_snapshot);
        }

        debug!(
            "Snapshotted {} ({} entries) in {:?}",
            files,
            snapshot.len(),
            start.elapsed()
        );

        Ok(SnapshotResult {
            snapshot,
            contains_archive_trees,
        })
    }
}

impl CollectionSnapshotter for FileCollectionSnapshotter {
    fn snapshot(&self, files: &FileCollection) -> Result<SnapshotResult, FileSnapshotError> {
        FileCollectionSnapshotter::snapshot(self, files)
    }
}
