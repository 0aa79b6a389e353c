//! Fingerprint Core - hashing and snapshot primitives for input fingerprinting
//!
//! This crate provides the foundational layer:
//! - BLAKE3 content signatures (streaming, mmap, line-ending normalized)
//! - Raw file-system snapshot tree
//! - Structural value snapshots and the value snapshotter

pub mod hash;
pub mod snapshotter;
pub mod tree;
pub mod value;

// Re-export main types for convenience
pub use hash::{hash_bytes, Blake3Hash, ContentHasher, IncrementalHasher};
pub use snapshotter::{SnapshotError, ValueSnapshotter};
pub use tree::{EntryKind, FileMetadata, FileSystemSnapshot, RelativePath, RootSnapshot, SnapshotEntry};
pub use value::ValueSnapshot;
