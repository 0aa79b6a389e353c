//! Errors raised while snapshotting declared file collections

use std::io;
use std::path::{Path, PathBuf};

/// Failure while capturing a file collection
#[derive(Debug, thiserror::Error)]
pub enum FileSnapshotError {
    /// The filesystem refused access
    #[error("Permission denied reading {}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An archive root could not be opened as an archive
    #[error("Failed to read archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    /// An include or exclude pattern did not parse
    #[error("Invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },
}

impl FileSnapshotError {
    /// Classify an I/O error, splitting access-control failures from the rest
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            FileSnapshotError::Access {
                path: path.to_path_buf(),
                source,
            }
        } else {
            FileSnapshotError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Path the failure relates to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            FileSnapshotError::Access { path, .. }
            | FileSnapshotError::Io { path, .. }
            | FileSnapshotError::Archive { path, .. } => Some(path),
            FileSnapshotError::Pattern { .. } => None,
        }
    }
}
