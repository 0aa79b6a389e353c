//! Fingerprint Files - captures declared file collections as raw snapshot trees
//!
//! A [`FileCollection`] lists roots (plain paths, pattern-filtered trees and
//! archive trees). [`FileCollectionSnapshotter::snapshot`] walks them and
//! returns a [`fp_core::FileSystemSnapshot`] plus whether any archive tree
//! was involved.

mod archive;
pub mod collection;
pub mod config;
pub mod error;
pub mod filter;
pub mod snapshotter;
mod walk;

pub use collection::{FileCollection, FileRoot, PatternSpec};
pub use config::SnapshotterConfig;
pub use error::FileSnapshotError;
pub use filter::PatternFilter;
pub use snapshotter::{CollectionSnapshotter, FileCollectionSnapshotter, SnapshotResult};
