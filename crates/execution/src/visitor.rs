//! Input collecting visitor
//!
//! The caller's enumeration callback reports every declared input of one
//! unit of work to an [`InputCollectingVisitor`], which snapshots values,
//! fingerprints file collections and accumulates the results in name order.

use crate::error::{FingerprintError, InputFingerprintingError};
use crate::fingerprint::FileCollectionFingerprint;
use crate::input_fingerprinter::{FileFingerprints, InputFingerprinter, InputFingerprints, ValueSnapshots};
use crate::normalization::{
    DirectorySensitivity, FileNormalizationSpec, LineEndingSensitivity, PathSensitivity,
};
use crate::operation::{OperationDescriptor, OperationRunner};
use fp_files::FileCollection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// How the unit of work consumes a file input
///
/// Recorded for diagnostics; it does not affect the fingerprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputBehavior {
    #[default]
    NonIncremental,
    Incremental,
    /// Incremental, and drives whether the work runs at all
    Primary,
}

/// Declared file input, as produced by a file value supplier
#[derive(Debug, Clone)]
pub struct InputFileValue {
    pub files: FileCollection,
    pub normalizer: PathSensitivity,
    pub directory_sensitivity: DirectorySensitivity,
    pub line_ending_sensitivity: LineEndingSensitivity,
}

impl InputFileValue {
    pub fn new(files: FileCollection, normalizer: PathSensitivity) -> Self {
        Self {
            files,
            normalizer,
            directory_sensitivity: DirectorySensitivity::Default,
            line_ending_sensitivity: LineEndingSensitivity::Default,
        }
    }

    pub fn with_directory_sensitivity(mut self, directory_sensitivity: DirectorySensitivity) -> Self {
        self.directory_sensitivity = directory_sensitivity;
        self
    }

    pub fn with_line_ending_sensitivity(mut self, line_ending_sensitivity: LineEndingSensitivity) -> Self {
        self.line_ending_sensitivity = line_ending_sensitivity;
        self
    }

    pub fn normalization_spec(&self) -> FileNormalizationSpec {
        FileNormalizationSpec::new(self.normalizer)
            .with_directories(self.directory_sensitivity)
            .with_line_endings(self.line_ending_sensitivity)
    }
}

/// Accumulates the fingerprints of one pass
///
/// Not shareable between threads; one visitor exists per pass.
pub struct InputCollectingVisitor<'a, R> {
    fingerprinter: &'a InputFingerprinter<R>,
    previous_value_snapshots: &'a ValueSnapshots,
    previous_file_fingerprints: &'a FileFingerprints,
    known_value_snapshots: Arc<ValueSnapshots>,
    known_file_fingerprints: Arc<FileFingerprints>,
    value_snapshots: ValueSnapshots,
    file_fingerprints: FileFingerprints,
    properties_requiring_is_empty_check: BTreeSet<String>,
    /// First property whose visit failed
    failed_property: Option<String>,
}

impl<'a, R: OperationRunner> InputCollectingVisitor<'a, R> {
    pub(crate) fn new(
        fingerprinter: &'a InputFingerprinter<R>,
        previous_value_snapshots: &'a ValueSnapshots,
        previous_file_fingerprints: &'a FileFingerprints,
        known_value_snapshots: Arc<ValueSnapshots>,
        known_file_fingerprints: Arc<FileFingerprints>,
    ) -> Self {
        Self {
            fingerprinter,
            previous_value_snapshots,
            previous_file_fingerprints,
            known_value_snapshots,
            known_file_fingerprints,
            value_snapshots: BTreeMap::new(),
            file_fingerprints: BTreeMap::new(),
            properties_requiring_is_empty_check: BTreeSet::new(),
            failed_property: None,
        }
    }

    /// Record `error` as the pass failure, unless one is already recorded
    fn fail(&mut self, error: InputFingerprintingError) -> Result<(), InputFingerprintingError> {
        if self.failed_property.is_none() {
            self.failed_property = Some(error.property().to_string());
        }
        Err(error)
    }

    fn check_not_aborted(&self) -> Result<(), InputFingerprintingError> {
        match &self.failed_property {
            Some(property) => Err(InputFingerprintingError::Aborted {
                property: property.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Snapshot a value-typed input
    ///
    /// `value` is not called when `name` was already fingerprinted earlier
    /// in the build. Once a visit has failed, every later visit fails too.
    pub fn visit_input_property<T, F>(&mut self, name: &str, value: F) -> Result<(), InputFingerprintingError>
    where
        T: Serialize + fmt::Debug,
        F: FnOnce() -> T,
    {
        self.check_not_aborted()?;
        if self.known_value_snapshots.contains_key(name) {
            trace!(property = name, "Value already fingerprinted");
            return Ok(());
        }
        if self.value_snapshots.contains_key(name) {
            warn!(property = name, "Value property visited twice");
            return self.fail(InputFingerprintingError::DuplicateProperty {
                property: name.to_string(),
            });
        }

        let value = value();
        let snapshotter = &self.fingerprinter.value_snapshotter;
        let snapshot = match self.previous_value_snapshots.get(name) {
            Some(previous) => snapshotter.snapshot_with_previous(&value, previous),
            None => snapshotter.snapshot(&value),
        };
        match snapshot {
            Ok(snapshot) => {
                self.value_snapshots.insert(name.to_string(), snapshot);
                Ok(())
            }
            Err(source) => self.fail(InputFingerprintingError::Snapshotting {
                property: name.to_string(),
                value: format!("{value:?}"),
                source,
            }),
        }
    }

    /// Snapshot and fingerprint a file-typed input
    ///
    /// `value` is not called when `name` was already fingerprinted earlier
    /// in the build.
    pub fn visit_input_file_property<F>(
        &mut self,
        name: &str,
        behavior: InputBehavior,
        value: F,
    ) -> Result<(), InputFingerprintingError>
    where
        F: FnOnce() -> InputFileValue,
    {
        self.check_not_aborted()?;
        if self.known_file_fingerprints.contains_key(name) {
            trace!(property = name, "Files already fingerprinted");
            return Ok(());
        }
        if self.file_fingerprints.contains_key(name) {
            warn!(property = name, "File property visited twice");
            return self.fail(InputFingerprintingError::DuplicateProperty {
                property: name.to_string(),
            });
        }

        let value = value();
        let spec = value.normalization_spec();
        debug!(property = name, ?behavior, normalization = %spec, files = %value.files, "Fingerprinting file property");

        let fingerprinter = self.fingerprinter;
        let previous = self.previous_file_fingerprints.get(name);
        let descriptor = OperationDescriptor::new(format!("Fingerprint input file property '{name}'"));
        let outcome = fingerprinter.runner.call(
            descriptor,
            || -> Result<(FileCollectionFingerprint, bool), FingerprintError> {
                let collection_fingerprinter = fingerprinter
                    .registry
                    .get(&spec)
                    .ok_or(FingerprintError::UnknownNormalization(spec))?;
                let snapshot = fingerprinter.snapshotter.snapshot(&value.files)?;
                let fingerprint = collection_fingerprinter.fingerprint(&snapshot.snapshot, previous)?;
                Ok((fingerprint, snapshot.contains_archive_trees()))
            },
        );
        let (fingerprint, contains_archive_trees) = match outcome {
            Ok(outcome) => outcome,
            Err(source) => {
                return self.fail(InputFingerprintingError::FileFingerprinting {
                    property: name.to_string(),
                    source,
                })
            }
        };

        if contains_archive_trees {
            self.properties_requiring_is_empty_check.insert(name.to_string());
        }
        self.file_fingerprints.insert(name.to_string(), fingerprint);
        Ok(())
    }

    /// Freeze the accumulated results
    ///
    /// Fails if any visit failed, even when the caller carried on past it.
    pub fn complete(self) -> Result<InputFingerprints, InputFingerprintingError> {
        self.check_not_aborted()?;
        Ok(InputFingerprints::new(
            Arc::new(self.value_snapshots),
            self.known_value_snapshots,
            Arc::new(self.file_fingerprints),
            self.known_file_fingerprints,
            self.properties_requiring_is_empty_check,
        ))
    }
}
