//! Normalized fingerprints of file collections

use fp_core::{Blake3Hash, EntryKind, FileMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized view of one snapshot entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemLocationFingerprint {
    /// Key under the chosen path sensitivity (absolute, relative, name, or empty)
    pub normalized_path: String,
    pub kind: EntryKind,
    /// Content signature after optional line-ending normalization
    pub normalized_content_hash: Blake3Hash,
    /// Filesystem metadata, kept for reuse on the next run
    pub metadata: Option<FileMetadata>,
}

/// Fingerprint of one declared file collection
///
/// Entries are keyed by absolute path; the combined `hash` is computed over
/// the normalized paths and content hashes in sorted order, so it does not
/// depend on traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCollectionFingerprint {
    hash: Blake3Hash,
    strategy: String,
    fingerprints: BTreeMap<String, FileSystemLocationFingerprint>,
}

impl FileCollectionFingerprint {
    pub(crate) fn new(
        hash: Blake3Hash,
        strategy: String,
        fingerprints: BTreeMap<String, FileSystemLocationFingerprint>,
    ) -> Self {
        Self {
            hash,
            strategy,
            fingerprints,
        }
    }

    /// Combined signature of the collection
    pub fn hash(&self) -> Blake3Hash {
        self.hash
    }

    /// Identifier of the normalization that produced this fingerprint
    pub fn strategy_identifier(&self) -> &str {
        &self.strategy
    }

    /// Entry fingerprints keyed by absolute path
    pub fn fingerprints(&self) -> &BTreeMap<String, FileSystemLocationFingerprint> {
        &self.fingerprints
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}
