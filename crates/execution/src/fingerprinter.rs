//! Fingerprinting strategies and the fingerprinter registry
//!
//! Each [`PathSensitivity`] has a strategy deciding how an entry is keyed.
//! A [`FileCollectionFingerprinter`] combines a strategy with directory and
//! line-ending handling; the [`FingerprinterRegistry`] holds one per
//! [`FileNormalizationSpec`] and is shared read-only between passes.

use crate::error::FingerprintError;
use crate::fingerprint::{FileCollectionFingerprint, FileSystemLocationFingerprint};
use crate::normalization::{
    DirectorySensitivity, FileNormalizationSpec, LineEndingSensitivity, PathSensitivity,
};
use ahash::AHashMap;
use fp_core::hash::hash_file_normalized_line_endings;
use fp_core::tree::missing_signature;
use fp_core::{Blake3Hash, EntryKind, FileSystemSnapshot, IncrementalHasher, RootSnapshot, SnapshotEntry};
use std::collections::BTreeMap;
use std::io;
use tracing::trace;

/// Decides the normalized key of each snapshot entry
pub trait FingerprintingStrategy: Send + Sync {
    /// Normalized path for `entry`, or `None` to leave it out
    fn normalize_path(&self, root: &RootSnapshot, entry: &SnapshotEntry) -> Option<String>;

    /// Whether only the presence of files counts, not their paths or content
    fn ignores_content(&self) -> bool {
        false
    }
}

/// Keys entries by absolute path
pub struct AbsolutePathStrategy;

impl FingerprintingStrategy for AbsolutePathStrategy {
    fn normalize_path(&self, _root: &RootSnapshot, entry: &SnapshotEntry) -> Option<String> {
        Some(entry.absolute_path.to_string_lossy().into_owned())
    }
}

/// Keys entries by their path below the declared root
///
/// A directory root maps to the empty path; a file or missing root maps to
/// its own name.
pub struct RelativePathStrategy;

impl FingerprintingStrategy for RelativePathStrategy {
    fn normalize_path(&self, _root: &RootSnapshot, entry: &SnapshotEntry) -> Option<String> {
        if entry.relative_path.is_root() {
            return Some(root_name(entry));
        }
        Some(entry.relative_path.to_slash_string())
    }
}

/// Keys entries by file name
pub struct NameOnlyStrategy;

impl FingerprintingStrategy for NameOnlyStrategy {
    fn normalize_path(&self, _root: &RootSnapshot, entry: &SnapshotEntry) -> Option<String> {
        if entry.relative_path.is_root() {
            return Some(root_name(entry));
        }
        Some(entry.name())
    }
}

/// Records regular files only, all under the empty path
pub struct IgnoredPathStrategy;

impl FingerprintingStrategy for IgnoredPathStrategy {
    fn normalize_path(&self, _root: &RootSnapshot, entry: &SnapshotEntry) -> Option<String> {
        (entry.kind == EntryKind::RegularFile).then(String::new)
    }

    fn ignores_content(&self) -> bool {
        true
    }
}

fn root_name(entry: &SnapshotEntry) -> String {
    if entry.kind == EntryKind::Directory {
        String::new()
    } else {
        entry.name()
    }
}

/// Turns raw snapshots into fingerprints for one normalization spec
pub struct FileCollectionFingerprinter {
    spec: FileNormalizationSpec,
    identifier: String,
    strategy: Box<dyn FingerprintingStrategy>,
}

impl FileCollectionFingerprinter {
    /// Fingerprinter using the built-in strategy for `spec.path`
    pub fn new(spec: FileNormalizationSpec) -> Self {
        let strategy: Box<dyn FingerprintingStrategy> = match spec.path {
            PathSensitivity::Absolute => Box::new(AbsolutePathStrategy),
            PathSensitivity::Relative => Box::new(RelativePathStrategy),
            PathSensitivity::NameOnly => Box::new(NameOnlyStrategy),
            PathSensitivity::Ignored => Box::new(IgnoredPathStrategy),
        };
        Self::with_strategy(spec, strategy)
    }

    /// Fingerprinter with a custom path strategy
    pub fn with_strategy(spec: FileNormalizationSpec, strategy: Box<dyn FingerprintingStrategy>) -> Self {
        Self {
            spec,
            identifier: spec.identifier(),
            strategy,
        }
    }

    pub fn spec(&self) -> FileNormalizationSpec {
        self.spec
    }

    /// Fingerprint a raw snapshot
    ///
    /// `previous` is only a hint: with line-ending normalization, a regular
    /// file whose length and modification time match its previous entry
    /// reuses the previous normalized hash instead of re-reading the file.
    pub fn fingerprint(
        &self,
        snapshot: &FileSystemSnapshot,
        previous: Option<&FileCollectionFingerprint>,
    ) -> Result<FileCollectionFingerprint, FingerprintError> {
        let previous = previous.filter(|p| p.strategy_identifier() == self.identifier);
        let mut fingerprints = BTreeMap::new();

        for (root, entry) in snapshot.entries() {
            if entry.kind == EntryKind::Directory
                && self.spec.directories == DirectorySensitivity::IgnoreDirectories
            {
                continue;
            }
            let normalized_path = match self.strategy.normalize_path(root, entry) {
                Some(path) => path,
                None => continue,
            };
            let absolute = entry.absolute_path.to_string_lossy().into_owned();
            // A location declared twice counts once
            if fingerprints.contains_key(&absolute) {
                continue;
            }
            let fingerprint = match self.content_hash(entry, &absolute, previous)? {
                Some(normalized_content_hash) => FileSystemLocationFingerprint {
                    normalized_path,
                    kind: entry.kind,
                    normalized_content_hash,
                    metadata: entry.metadata,
                },
                None => FileSystemLocationFingerprint {
                    normalized_path,
                    kind: EntryKind::Missing,
                    normalized_content_hash: missing_signature(),
                    metadata: None,
                },
            };
            fingerprints.insert(absolute, fingerprint);
        }

        let hash = self.combine(&fingerprints);
        Ok(FileCollectionFingerprint::new(hash, self.identifier.clone(), fingerprints))
    }

    /// Content hash of `entry` under this spec, `None` if the file vanished
    /// before it could be re-read for normalization
    fn content_hash(
        &self,
        entry: &SnapshotEntry,
        absolute: &str,
        previous: Option<&FileCollectionFingerprint>,
    ) -> Result<Option<Blake3Hash>, FingerprintError> {
        if entry.kind != EntryKind::RegularFile
            || self.spec.line_endings == LineEndingSensitivity::Default
        {
            return Ok(Some(entry.content_hash));
        }
        if let Some(hash) = entry.normalized_text_hash {
            return Ok(Some(hash));
        }
        if let Some(previous) = previous.and_then(|p| p.fingerprints().get(absolute)) {
            if previous.kind == EntryKind::RegularFile
                && entry.metadata.is_some()
                && previous.metadata == entry.metadata
            {
                trace!("Reusing normalized hash for {absolute}");
                return Ok(Some(previous.normalized_content_hash));
            }
        }
        match hash_file_normalized_line_endings(&entry.absolute_path) {
            Ok(hash) => Ok(Some(hash)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                trace!("Vanished before normalization: {absolute}");
                Ok(None)
            }
            Err(source) => Err(FingerprintError::Io {
                path: entry.absolute_path.clone(),
                source,
            }),
        }
    }

    fn combine(&self, fingerprints: &BTreeMap<String, FileSystemLocationFingerprint>) -> Blake3Hash {
        let mut hasher = IncrementalHasher::new();
        hasher.update_str(&self.identifier);

        if self.strategy.ignores_content() {
            let present = fingerprints
                .values()
                .any(|f| f.kind == EntryKind::RegularFile);
            hasher.update(&[u8::from(present)]);
            return hasher.finalize();
        }

        let mut entries: Vec<_> = fingerprints
            .values()
            .map(|f| (f.normalized_path.as_str(), f.kind, f.normalized_content_hash))
            .collect();
        entries.sort_unstable();
        for (path, kind, hash) in entries {
            hasher.update_str(path);
            hasher.update(&[kind_tag(kind)]);
            hasher.update_hash(&hash);
        }
        hasher.finalize()
    }
}

fn kind_tag(kind: EntryKind) -> u8 {
    match kind {
        EntryKind::RegularFile => 0,
        EntryKind::Directory => 1,
        EntryKind::Missing => 2,
    }
}

/// Read-only lookup from normalization spec to fingerprinter
pub struct FingerprinterRegistry {
    fingerprinters: AHashMap<FileNormalizationSpec, FileCollectionFingerprinter>,
}

impl FingerprinterRegistry {
    /// Registry with a fingerprinter for every spec
    pub fn new() -> Self {
        Self::from_fingerprinters(FileNormalizationSpec::all().map(FileCollectionFingerprinter::new))
    }

    /// Registry holding exactly the given fingerprinters
    pub fn from_fingerprinters(fingerprinters: impl IntoIterator<Item = FileCollectionFingerprinter>) -> Self {
        Self {
            fingerprinters: fingerprinters.into_iter().map(|f| (f.spec(), f)).collect(),
        }
    }

    /// Fingerprinter for `spec`
    pub fn get(&self, spec: &FileNormalizationSpec) -> Option<&FileCollectionFingerprinter> {
        self.fingerprinters.get(spec)
    }

    pub fn len(&self) -> usize {
        self.fingerprinters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprinters.is_empty()
    }
}

impl Default for FingerprinterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
