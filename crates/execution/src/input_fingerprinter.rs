//! Fingerprinting pass over the declared inputs of one unit of work

use crate::error::InputFingerprintingError;
use crate::fingerprint::FileCollectionFingerprint;
use crate::fingerprinter::FingerprinterRegistry;
use crate::operation::{OperationRunner, TracingOperationRunner};
use crate::visitor::InputCollectingVisitor;
use fp_core::{ValueSnapshot, ValueSnapshotter};
use fp_files::{CollectionSnapshotter, FileCollectionSnapshotter};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Value snapshots keyed by property name
pub type ValueSnapshots = BTreeMap<String, ValueSnapshot>;

/// File fingerprints keyed by property name
pub type FileFingerprints = BTreeMap<String, FileCollectionFingerprint>;

/// Outcome of one fingerprinting pass
///
/// Properties that were already known when the pass started stay in the
/// known partitions; everything computed by the pass is in the fresh ones.
/// A property never appears in both partitions of the same kind.
#[derive(Debug, Clone)]
pub struct InputFingerprints {
    value_snapshots: Arc<ValueSnapshots>,
    known_value_snapshots: Arc<ValueSnapshots>,
    file_fingerprints: Arc<FileFingerprints>,
    known_file_fingerprints: Arc<FileFingerprints>,
    properties_requiring_is_empty_check: BTreeSet<String>,
}

impl InputFingerprints {
    pub(crate) fn new(
        value_snapshots: Arc<ValueSnapshots>,
        known_value_snapshots: Arc<ValueSnapshots>,
        file_fingerprints: Arc<FileFingerprints>,
        known_file_fingerprints: Arc<FileFingerprints>,
        properties_requiring_is_empty_check: BTreeSet<String>,
    ) -> Self {
        Self {
            value_snapshots,
            known_value_snapshots,
            file_fingerprints,
            known_file_fingerprints,
            properties_requiring_is_empty_check,
        }
    }

    /// Value snapshots computed by this pass
    pub fn value_snapshots(&self) -> &ValueSnapshots {
        &self.value_snapshots
    }

    /// Value snapshots that were known before the pass
    pub fn known_value_snapshots(&self) -> &ValueSnapshots {
        &self.known_value_snapshots
    }

    /// Known and fresh value snapshots together
    pub fn all_value_snapshots(&self) -> Arc<ValueSnapshots> {
        union(&self.known_value_snapshots, &self.value_snapshots)
    }

    /// File fingerprints computed by this pass
    pub fn file_fingerprints(&self) -> &FileFingerprints {
        &self.file_fingerprints
    }

    /// File fingerprints that were known before the pass
    pub fn known_file_fingerprints(&self) -> &FileFingerprints {
        &self.known_file_fingerprints
    }

    /// Known and fresh file fingerprints together
    pub fn all_file_fingerprints(&self) -> Arc<FileFingerprints> {
        union(&self.known_file_fingerprints, &self.file_fingerprints)
    }

    /// File properties whose snapshot went through an archive tree
    pub fn properties_requiring_is_empty_check(&self) -> &BTreeSet<String> {
        &self.properties_requiring_is_empty_check
    }
}

fn union<V: Clone>(known: &Arc<BTreeMap<String, V>>, fresh: &Arc<BTreeMap<String, V>>) -> Arc<BTreeMap<String, V>> {
    if known.is_empty() {
        return Arc::clone(fresh);
    }
    if fresh.is_empty() {
        return Arc::clone(known);
    }
    let mut all = BTreeMap::clone(known);
    all.extend(fresh.iter().map(|(k, v)| (k.clone(), v.clone())));
    Arc::new(all)
}

/// Computes the fingerprints of all declared inputs of a unit of work
///
/// Holds no per-pass state; independent passes may run concurrently on a
/// shared instance.
pub struct InputFingerprinter<R = TracingOperationRunner> {
    pub(crate) snapshotter: Box<dyn CollectionSnapshotter>,
    pub(crate) registry: Arc<FingerprinterRegistry>,
    pub(crate) value_snapshotter: ValueSnapshotter,
    pub(crate) runner: R,
}

impl InputFingerprinter<TracingOperationRunner> {
    pub fn new(snapshotter: FileCollectionSnapshotter, registry: Arc<FingerprinterRegistry>) -> Self {
        Self {
            snapshotter: Box::new(snapshotter),
            registry,
            value_snapshotter: ValueSnapshotter::new(),
            runner: TracingOperationRunner,
        }
    }
}

impl Default for InputFingerprinter<TracingOperationRunner> {
    fn default() -> Self {
        Self::new(FileCollectionSnapshotter::default(), Arc::new(FingerprinterRegistry::new()))
    }
}

impl<R: OperationRunner> InputFingerprinter<R> {
    /// Replace the source of raw file collection snapshots
    pub fn with_snapshotter<S: CollectionSnapshotter + 'static>(mut self, snapshotter: S) -> Self {
        self.snapshotter = Box::new(snapshotter);
        self
    }

    /// Replace the runner wrapping each file fingerprinting
    pub fn with_runner<S: OperationRunner>(self, runner: S) -> InputFingerprinter<S> {
        InputFingerprinter {
            snapshotter: self.snapshotter,
            registry: self.registry,
            value_snapshotter: self.value_snapshotter,
            runner,
        }
    }

    /// Run one fingerprinting pass
    ///
    /// `inputs` is called once with a fresh visitor and must report every
    /// declared input. Properties present in the known maps are not
    /// recomputed. Previous maps are hints for snapshot reuse only. The
    /// first failing property aborts the pass, whether or not `inputs`
    /// propagates its error.
    pub fn fingerprint_input_properties<F>(
        &self,
        previous_value_snapshots: &ValueSnapshots,
        previous_file_fingerprints: &FileFingerprints,
        known_value_snapshots: Arc<ValueSnapshots>,
        known_file_fingerprints: Arc<FileFingerprints>,
        inputs: F,
    ) -> Result<InputFingerprints, InputFingerprintingError>
    where
        F: FnOnce(&mut InputCollectingVisitor<'_, R>) -> Result<(), InputFingerprintingError>,
    {
        let start = Instant::now();
        let mut visitor = InputCollectingVisitor::new(
            self,
            previous_value_snapshots,
            previous_file_fingerprints,
            known_value_snapshots,
            known_file_fingerprints,
        );
        inputs(&mut visitor)?;
        let result = visitor.complete()?;

        debug!(
            values = result.value_snapshots().len(),
            files = result.file_fingerprints().len(),
            "Fingerprinted inputs in {:?}",
            start.elapsed()
        );
        Ok(result)
    }
}
