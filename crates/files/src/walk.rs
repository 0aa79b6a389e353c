//! Directory tree walking
//!
//! Walks a declared root with walkdir, children sorted by name, producing
//! entries in pre-order. Excluded directories are pruned before descent.

use crate::config::SnapshotterConfig;
use crate::error::FileSnapshotError;
use crate::filter::PatternFilter;
use fp_core::hash::{hash_bytes, hash_file_sized};
use fp_core::{EntryKind, FileMetadata, RelativePath, RootSnapshot, SnapshotEntry};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Snapshot one file-or-directory root
pub(crate) fn snapshot_path(
    root: &Path,
    filter: &PatternFilter,
    config: &SnapshotterConfig,
) -> Result<RootSnapshot, FileSnapshotError> {
    let metadata = if config.follow_links {
        fs::metadata(root)
    } else {
        fs::symlink_metadata(root)
    };

    let entries = match metadata {
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("Declared root {} does not exist", root.display());
            vec![SnapshotEntry::missing(root.to_path_buf(), RelativePath::root())]
        }
        Err(err) => return Err(FileSnapshotError::from_io(root, err)),
        Ok(metadata) if metadata.is_dir() => walk_directory(root, filter, config)?,
        Ok(metadata) => vec![snapshot_file(root, RelativePath::root(), &metadata, config)?],
    };

    Ok(RootSnapshot {
        root: root.to_path_buf(),
        archive: false,
        entries,
    })
}

fn walk_directory(
    root: &Path,
    filter: &PatternFilter,
    config: &SnapshotterConfig,
) -> Result<Vec<SnapshotEntry>, FileSnapshotError> {
    let walker = WalkDir::new(root)
        .follow_links(config.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            !filter.is_excluded(relative, entry.file_type().is_dir())
        });

    let mut entries = Vec::new();
    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                let kind = err.io_error().map(io::Error::kind);
                if kind == Some(io::ErrorKind::NotFound) {
                    // Deleted mid-walk, or a dangling link
                    trace!("Vanished during walk: {}", path.display());
                    let relative = relative_to(root, &path);
                    entries.push(SnapshotEntry::missing(path, relative));
                    continue;
                }
                return Err(FileSnapshotError::from_io(&path, io::Error::from(err)));
            }
        };

        let path = entry.path();
        let relative = relative_to(root, path);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            entries.push(SnapshotEntry::directory(path.to_path_buf(), relative));
        } else if file_type.is_file() || file_type.is_symlink() {
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    let err = io::Error::from(err);
                    if err.kind() == io::ErrorKind::NotFound {
                        entries.push(SnapshotEntry::missing(path.to_path_buf(), relative));
                        continue;
                    }
                    return Err(FileSnapshotError::from_io(path, err));
                }
            };
            entries.push(snapshot_file(path, relative, &metadata, config)?);
        } else {
            debug!("Skipping special file {}", path.display());
        }
    }

    if filter.has_includes() {
        entries = retain_included(entries, filter);
    }
    Ok(entries)
}

/// Snapshot a regular file, or an unfollowed symlink by its target
fn snapshot_file(
    path: &Path,
    relative: RelativePath,
    metadata: &fs::Metadata,
    config: &SnapshotterConfig,
) -> Result<SnapshotEntry, FileSnapshotError> {
    let file_metadata = FileMetadata::from_std(metadata);
    let hashed = if metadata.file_type().is_symlink() {
        fs::read_link(path).map(|target| {
            let target_hash = hash_bytes(target.to_string_lossy().as_bytes());
            SnapshotEntry::symlink(path.to_path_buf(), relative.clone(), target_hash, file_metadata)
        })
    } else {
        hash_file_sized(path, metadata.len(), config.mmap_threshold_bytes)
            .map(|hash| SnapshotEntry::regular_file(path.to_path_buf(), relative.clone(), hash, file_metadata))
    };

    match hashed {
        Ok(entry) => Ok(entry),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Ok(SnapshotEntry::missing(path.to_path_buf(), relative))
        }
        Err(err) => Err(FileSnapshotError::from_io(path, err)),
    }
}

/// Keep included files and missing entries, their ancestor directories and the root
fn retain_included(entries: Vec<SnapshotEntry>, filter: &PatternFilter) -> Vec<SnapshotEntry> {
    let mut keep = BTreeSet::new();
    for entry in &entries {
        if entry.kind == EntryKind::Directory {
            continue;
        }
        let relative = entry.relative_path.to_slash_string();
        if filter.is_included(Path::new(&relative)) {
            let mut current = Some(entry.relative_path.clone());
            while let Some(path) = current {
                current = path.parent();
                keep.insert(path);
            }
        }
    }
    keep.insert(RelativePath::root());

    entries
        .into_iter()
        .filter(|entry| keep.contains(&entry.relative_path))
        .collect()
}

fn relative_to(root: &Path, path: &Path) -> RelativePath {
    match path.strip_prefix(root) {
        Ok(relative) => RelativePath::from_path(relative),
        Err(_) => RelativePath::root(),
    }
}
