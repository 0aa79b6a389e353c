//! Fingerprinting errors

use crate::normalization::FileNormalizationSpec;
use fp_core::SnapshotError;
use fp_files::FileSnapshotError;
use std::io;
use std::path::PathBuf;

/// Failure while fingerprinting one file collection
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error(transparent)]
    Snapshot(#[from] FileSnapshotError),

    /// Content could not be re-read for line-ending normalization
    #[error("Failed to hash {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No fingerprinter registered for {0}")]
    UnknownNormalization(FileNormalizationSpec),
}

/// Failure of a whole fingerprinting pass, naming the offending property
#[derive(Debug, thiserror::Error)]
pub enum InputFingerprintingError {
    #[error("Cannot fingerprint input property '{property}': value '{value}' cannot be serialized")]
    Snapshotting {
        property: String,
        /// Debug rendering of the value
        value: String,
        #[source]
        source: SnapshotError,
    },

    #[error("Cannot fingerprint input file property '{property}': {source}")]
    FileFingerprinting {
        property: String,
        #[source]
        source: FingerprintError,
    },

    #[error("Input property '{property}' is declared more than once")]
    DuplicateProperty { property: String },

    /// A visit failed earlier in the pass; no result can be produced
    #[error("Fingerprinting of input property '{property}' failed earlier in this pass")]
    Aborted { property: String },
}

impl InputFingerprintingError {
    /// Name of the property that failed
    pub fn property(&self) -> &str {
        match self {
            InputFingerprintingError::Snapshotting { property, .. }
            | InputFingerprintingError::FileFingerprinting { property, .. }
            | InputFingerprintingError::DuplicateProperty { property }
            | InputFingerprintingError::Aborted { property } => property,
        }
    }
}
