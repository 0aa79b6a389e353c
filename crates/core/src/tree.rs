//! Raw file-system snapshot tree
//!
//! A [`FileSystemSnapshot`] is what the file collection snapshotter captures
//! for one declared input: one [`RootSnapshot`] per declared root, each holding
//! its entries in pre-order with children sorted by name.

use crate::hash::{hash_bytes, Blake3Hash};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::path::{Path, PathBuf};

/// Type of snapshot entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file
    RegularFile,
    /// Directory
    Directory,
    /// Path that did not exist when the snapshot was taken
    Missing,
}

impl EntryKind {
    /// Signature used for entries that have no content of their own
    pub fn fixed_signature(self) -> Option<Blake3Hash> {
        match self {
            EntryKind::RegularFile => None,
            EntryKind::Directory => Some(directory_signature()),
            EntryKind::Missing => Some(missing_signature()),
        }
    }
}

/// Content signature shared by every directory
pub fn directory_signature() -> Blake3Hash {
    hash_bytes(b"fp:directory")
}

/// Content signature shared by every missing entry
pub fn missing_signature() -> Blake3Hash {
    hash_bytes(b"fp:missing")
}

/// Filesystem metadata used to decide whether a previous content hash can be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Length in bytes
    pub length: u64,
    /// Modification time in nanoseconds since the Unix epoch
    pub modified_nanos: u128,
}

impl FileMetadata {
    /// Read the relevant fields out of `std::fs::Metadata`
    pub fn from_std(metadata: &std::fs::Metadata) -> Self {
        let modified_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self {
            length: metadata.len(),
            modified_nanos,
        }
    }
}

/// Path of an entry relative to its declared root, as name segments
///
/// Uses SmallVec because most entries sit only a few levels below their root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelativePath(SmallVec<[String; 4]>);

impl RelativePath {
    /// The root itself
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Build from a path relative to the root
    pub fn from_path(path: &Path) -> Self {
        Self(
            path.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect(),
        )
    }

    /// Build from a `/`-separated string, ignoring empty segments
    pub fn from_slash_separated(path: &str) -> Self {
        Self(
            path.split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string)
                .collect(),
        )
    }

    /// Whether this is the root itself
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Final segment, if any
    pub fn file_name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Path of the parent, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        let mut parent = self.0.clone();
        parent.pop();
        Some(Self(parent))
    }

    /// Whether `self` is `other` or one of its ancestors
    pub fn is_ancestor_of(&self, other: &RelativePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// `/`-joined form, empty for the root
    pub fn to_slash_string(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_slash_string())
    }
}

/// Entry in a root snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Absolute location; for archive members this is `<archive>/<member path>`
    pub absolute_path: PathBuf,
    /// Location relative to the declared root
    pub relative_path: RelativePath,
    /// Kind of entry
    pub kind: EntryKind,
    /// Content signature
    pub content_hash: Blake3Hash,
    /// Metadata for on-disk regular files
    pub metadata: Option<FileMetadata>,
    /// Content hash after line-ending normalization, precomputed when the
    /// content cannot be re-read later (archive members, unfollowed links)
    pub normalized_text_hash: Option<Blake3Hash>,
}

impl SnapshotEntry {
    /// Regular file on disk
    pub fn regular_file(
        absolute_path: PathBuf,
        relative_path: RelativePath,
        content_hash: Blake3Hash,
        metadata: FileMetadata,
    ) -> Self {
        Self {
            absolute_path,
            relative_path,
            kind: EntryKind::RegularFile,
            content_hash,
            metadata: Some(metadata),
            normalized_text_hash: None,
        }
    }

    /// Unfollowed symbolic link, signed by its target path
    ///
    /// The target path is the content; line-ending normalization leaves it as is.
    pub fn symlink(
        absolute_path: PathBuf,
        relative_path: RelativePath,
        target_hash: Blake3Hash,
        metadata: FileMetadata,
    ) -> Self {
        Self {
            absolute_path,
            relative_path,
            kind: EntryKind::RegularFile,
            content_hash: target_hash,
            metadata: Some(metadata),
            normalized_text_hash: Some(target_hash),
        }
    }

    /// Regular file read out of an archive
    pub fn archived_file(
        absolute_path: PathBuf,
        relative_path: RelativePath,
        content_hash: Blake3Hash,
        normalized_text_hash: Blake3Hash,
    ) -> Self {
        Self {
            absolute_path,
            relative_path,
            kind: EntryKind::RegularFile,
            content_hash,
            metadata: None,
            normalized_text_hash: Some(normalized_text_hash),
        }
    }

    /// Directory
    pub fn directory(absolute_path: PathBuf, relative_path: RelativePath) -> Self {
        Self {
            absolute_path,
            relative_path,
            kind: EntryKind::Directory,
            content_hash: directory_signature(),
            metadata: None,
            normalized_text_hash: None,
        }
    }

    /// Missing path
    pub fn missing(absolute_path: PathBuf, relative_path: RelativePath) -> Self {
        Self {
            absolute_path,
            relative_path,
            kind: EntryKind::Missing,
            content_hash: missing_signature(),
            metadata: None,
            normalized_text_hash: None,
        }
    }

    /// Final name of the entry, falling back to the absolute path's file name for roots
    pub fn name(&self) -> String {
        match self.relative_path.file_name() {
            Some(name) => name.to_string(),
            None => self
                .absolute_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Snapshot of one declared root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSnapshot {
    /// Declared root location
    pub root: PathBuf,
    /// Whether this root is an archive inspected as a pseudo-directory
    pub archive: bool,
    /// Entries in pre-order, children sorted by name
    pub entries: Vec<SnapshotEntry>,
}

impl RootSnapshot {
    /// Number of regular files below this root
    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::RegularFile)
            .count()
    }
}

/// Raw snapshot of a whole declared file collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemSnapshot {
    roots: Vec<RootSnapshot>,
}

impl FileSystemSnapshot {
    /// Create a new empty snapshot
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    /// Build from roots in declaration order
    pub fn from_roots(roots: Vec<RootSnapshot>) -> Self {
        Self { roots }
    }

    /// Append a root
    pub fn push(&mut self, root: RootSnapshot) {
        self.roots.push(root);
    }

    /// Roots in declaration order
    pub fn roots(&self) -> &[RootSnapshot] {
        &self.roots
    }

    /// All entries across roots
    pub fn entries(&self) -> impl Iterator<Item = (&RootSnapshot, &SnapshotEntry)> {
        self.roots
            .iter()
            .flat_map(|root| root.entries.iter().map(move |entry| (root, entry)))
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.roots.iter().map(|r| r.entries.len()).sum()
    }

    /// Check if the snapshot holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_segments() {
        let path = RelativePath::from_path(Path::new("a/b/c.txt"));
        assert_eq!(path.to_slash_string(), "a/b/c.txt");
        assert_eq!(path.file_name(), Some("c.txt"));
        assert_eq!(path.parent().unwrap().to_slash_string(), "a/b");
        assert!(!path.is_root());
        assert!(RelativePath::root().is_root());
        assert_eq!(RelativePath::root().parent(), None);
    }

    #[test]
    fn test_relative_path_from_slash_separated() {
        let path = RelativePath::from_slash_separated("./dir//file.txt");
        assert_eq!(path.segments(), &["dir".to_string(), "file.txt".to_string()]);
    }

    #[test]
    fn test_ancestor() {
        let dir = RelativePath::from_slash_separated("a/b");
        let file = RelativePath::from_slash_separated("a/b/c");
        let sibling = RelativePath::from_slash_separated("a/bc");
        assert!(dir.is_ancestor_of(&file));
        assert!(dir.is_ancestor_of(&dir));
        assert!(RelativePath::root().is_ancestor_of(&file));
        assert!(!dir.is_ancestor_of(&sibling));
        assert!(!file.is_ancestor_of(&dir));
    }

    #[test]
    fn test_fixed_signatures_are_distinct() {
        assert_ne!(directory_signature(), missing_signature());
        assert_eq!(EntryKind::RegularFile.fixed_signature(), None);
        assert_eq!(EntryKind::Directory.fixed_signature(), Some(directory_signature()));
    }

    #[test]
    fn test_root_entry_name_falls_back_to_absolute_path() {
        let entry = SnapshotEntry::missing(PathBuf::from("/work/input.txt"), RelativePath::root());
        assert_eq!(entry.name(), "input.txt");
    }

    #[test]
    fn test_snapshot_counts() {
        let mut snapshot = FileSystemSnapshot::new();
        assert!(snapshot.is_empty());
        snapshot.push(RootSnapshot {
            root: PathBuf::from("/r"),
            archive: false,
            entries: vec![
                SnapshotEntry::directory(PathBuf::from("/r"), RelativePath::root()),
                SnapshotEntry::regular_file(
                    PathBuf::from("/r/a"),
                    RelativePath::from_slash_separated("a"),
                    hash_bytes(b"a"),
                    FileMetadata { length: 1, modified_nanos: 0 },
                ),
            ],
        });
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.roots()[0].file_count(), 1);
        assert_eq!(snapshot.entries().count(), 2);
    }
}
