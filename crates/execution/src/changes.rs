//! Change detection between a previous state and a fingerprinting pass

use crate::fingerprint::FileCollectionFingerprint;
use crate::input_fingerprinter::{FileFingerprints, InputFingerprints, ValueSnapshots};
use fp_core::Blake3Hash;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => f.write_str("added"),
            ChangeKind::Removed => f.write_str("removed"),
            ChangeKind::Modified => f.write_str("modified"),
        }
    }
}

/// Change of one normalized path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub normalized_path: String,
    pub kind: ChangeKind,
}

/// File-level differences between two fingerprints of the same property
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FingerprintChanges {
    changes: Vec<FileChange>,
}

impl FingerprintChanges {
    /// Compare two fingerprints by normalized path
    ///
    /// Several entries may share a normalized path (e.g. with name-only
    /// normalization), so each path is compared as a multiset of content
    /// hashes. Changes are ordered by path.
    pub fn between(previous: &FileCollectionFingerprint, current: &FileCollectionFingerprint) -> Self {
        let before = group_by_path(previous);
        let after = group_by_path(current);
        let paths: BTreeSet<&str> = before.keys().chain(after.keys()).copied().collect();

        let changes = paths
            .into_iter()
            .filter_map(|path| {
                let kind = match (before.get(path), after.get(path)) {
                    (None, Some(_)) => ChangeKind::Added,
                    (Some(_), None) => ChangeKind::Removed,
                    (Some(old), Some(new)) if old != new => ChangeKind::Modified,
                    _ => return None,
                };
                Some(FileChange {
                    normalized_path: path.to_string(),
                    kind,
                })
            })
            .collect();
        Self { changes }
    }

    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

fn group_by_path(fingerprint: &FileCollectionFingerprint) -> BTreeMap<&str, Vec<Blake3Hash>> {
    let mut grouped: BTreeMap<&str, Vec<Blake3Hash>> = BTreeMap::new();
    for location in fingerprint.fingerprints().values() {
        grouped
            .entry(location.normalized_path.as_str())
            .or_default()
            .push(location.normalized_content_hash);
    }
    for hashes in grouped.values_mut() {
        hashes.sort_unstable();
    }
    grouped
}

/// Change of one input property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputChange {
    Value {
        property: String,
        kind: ChangeKind,
    },
    Files {
        property: String,
        kind: ChangeKind,
        /// Per-path detail for modified properties
        details: FingerprintChanges,
    },
}

impl InputChange {
    pub fn property(&self) -> &str {
        match self {
            InputChange::Value { property, .. } | InputChange::Files { property, .. } => property,
        }
    }
}

impl fmt::Display for InputChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputChange::Value { property, kind } => {
                write!(f, "Value of input property '{property}' {kind}")
            }
            InputChange::Files {
                property,
                kind,
                details,
            } => {
                write!(f, "Input file property '{property}' {kind}")?;
                for change in details.changes() {
                    write!(f, "\n  {} {}", change.kind, display_path(&change.normalized_path))?;
                }
                Ok(())
            }
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// Up-to-date check of a pass against the previous state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputChanges {
    changes: Vec<InputChange>,
}

impl InputChanges {
    /// Compare the previous state with every property of `current`, known or fresh
    pub fn detect(
        previous_values: &ValueSnapshots,
        previous_files: &FileFingerprints,
        current: &InputFingerprints,
    ) -> Self {
        let mut changes = Vec::new();

        let values = current.all_value_snapshots();
        for (property, kind) in diff_keys(previous_values, &values, |old, new| old == new) {
            changes.push(InputChange::Value { property, kind });
        }

        let files = current.all_file_fingerprints();
        for (property, kind) in diff_keys(previous_files, &files, |old, new| old.hash() == new.hash()) {
            let details = match (previous_files.get(&property), files.get(&property)) {
                (Some(old), Some(new)) => FingerprintChanges::between(old, new),
                _ => FingerprintChanges::default(),
            };
            changes.push(InputChange::Files {
                property,
                kind,
                details,
            });
        }

        Self { changes }
    }

    pub fn changes(&self) -> &[InputChange] {
        &self.changes
    }

    pub fn is_up_to_date(&self) -> bool {
        self.changes.is_empty()
    }
}

fn diff_keys<V>(
    previous: &BTreeMap<String, V>,
    current: &BTreeMap<String, V>,
    same: impl Fn(&V, &V) -> bool,
) -> Vec<(String, ChangeKind)> {
    let names: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();
    names
        .into_iter()
        .filter_map(|name| {
            let kind = match (previous.get(name), current.get(name)) {
                (None, Some(_)) => ChangeKind::Added,
                (Some(_), None) => ChangeKind::Removed,
                (Some(old), Some(new)) if !same(old, new) => ChangeKind::Modified,
                _ => return None,
            };
            Some((name.clone(), kind))
        })
        .collect()
}
