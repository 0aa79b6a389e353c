//! Declared file collections

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Include and exclude patterns for a directory tree (gitignore syntax)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// When non-empty, only files matching one of these are recorded
    #[serde(default)]
    pub includes: Vec<String>,
    /// Matching files and directories are skipped entirely
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl PatternSpec {
    /// Check if no pattern is set
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }
}

/// One declared root of a file collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRoot {
    /// A file or directory; directories are walked recursively
    Path(PathBuf),
    /// A directory walked with its own pattern set
    Tree { root: PathBuf, patterns: PatternSpec },
    /// A zip or tar archive inspected as a pseudo-directory
    Archive(PathBuf),
}

impl FileRoot {
    /// Location on disk
    pub fn location(&self) -> &Path {
        match self {
            FileRoot::Path(path) | FileRoot::Archive(path) => path,
            FileRoot::Tree { root, .. } => root,
        }
    }

    /// Whether this root is an archive tree
    pub fn is_archive(&self) -> bool {
        matches!(self, FileRoot::Archive(_))
    }
}

impl fmt::Display for FileRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRoot::Path(path) => write!(f, "{}", path.display()),
            FileRoot::Tree { root, .. } => write!(f, "tree({})", root.display()),
            FileRoot::Archive(path) => write!(f, "archive({})", path.display()),
        }
    }
}

/// Resolved set of files declared for one input property
///
/// Roots keep their declaration order; resolving them is the caller's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCollection {
    roots: Vec<FileRoot>,
}

impl FileCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    /// Collection of plain paths
    pub fn of_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: paths.into_iter().map(|p| FileRoot::Path(p.into())).collect(),
        }
    }

    /// Add a plain path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.roots.push(FileRoot::Path(path.into()));
        self
    }

    /// Add a directory tree with patterns
    pub fn with_tree(mut self, root: impl Into<PathBuf>, patterns: PatternSpec) -> Self {
        self.roots.push(FileRoot::Tree {
            root: root.into(),
            patterns,
        });
        self
    }

    /// Add an archive tree
    pub fn with_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.roots.push(FileRoot::Archive(path.into()));
        self
    }

    /// Append a root
    pub fn push(&mut self, root: FileRoot) {
        self.roots.push(root);
    }

    /// Roots in declaration order
    pub fn roots(&self) -> &[FileRoot] {
        &self.roots
    }

    /// Check if no roots are declared
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl fmt::Display for FileCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, root) in self.roots.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{root}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_declaration_order() {
        let files = FileCollection::new()
            .with_path("b")
            .with_archive("deps.zip")
            .with_tree("a", PatternSpec::default());
        let locations: Vec<_> = files.roots().iter().map(FileRoot::location).collect();
        assert_eq!(locations, vec![Path::new("b"), Path::new("deps.zip"), Path::new("a")]);
        assert!(files.roots()[1].is_archive());
    }

    #[test]
    fn test_display() {
        let files = FileCollection::of_paths(["src", "res"]).with_archive("lib.zip");
        assert_eq!(files.to_string(), "[src, res, archive(lib.zip)]");
        assert_eq!(FileCollection::new().to_string(), "[]");
    }
}
