//! Fingerprint Execution - input fingerprinting for units of work
//!
//! This crate provides:
//! - Normalization specs and the fingerprinter registry
//! - File collection fingerprints with order-independent combined hashes
//! - The input collecting visitor and the fingerprinting pass around it
//! - Change detection against a previous state

pub mod changes;
pub mod error;
pub mod fingerprint;
pub mod fingerprinter;
pub mod input_fingerprinter;
pub mod normalization;
pub mod operation;
pub mod visitor;

// Re-exports
pub use changes::{ChangeKind, FileChange, FingerprintChanges, InputChange, InputChanges};
pub use error::{FingerprintError, InputFingerprintingError};
pub use fingerprint::{FileCollectionFingerprint, FileSystemLocationFingerprint};
pub use fingerprinter::{FileCollectionFingerprinter, FingerprinterRegistry, FingerprintingStrategy};
pub use input_fingerprinter::{FileFingerprints, InputFingerprinter, InputFingerprints, ValueSnapshots};
pub use normalization::{
    DirectorySensitivity, FileNormalizationSpec, LineEndingSensitivity, PathSensitivity,
};
pub use operation::{NoopOperationRunner, OperationDescriptor, OperationRunner, TracingOperationRunner};
pub use visitor::{InputBehavior, InputCollectingVisitor, InputFileValue};
