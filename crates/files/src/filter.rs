//! Include/exclude pattern matching for walked directory trees
//!
//! Two sources of patterns, applied in order:
//! 1. Global excludes from [`SnapshotterConfig`] (default VCS/editor noise + configured extras)
//! 2. The tree's own [`PatternSpec`]

use crate::collection::PatternSpec;
use crate::config::SnapshotterConfig;
use crate::error::FileSnapshotError;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Compiled pattern set for one directory tree
pub struct PatternFilter {
    /// Global and per-tree excludes
    excludes: Option<Gitignore>,
    /// Per-tree includes
    includes: Option<Gitignore>,
}

impl PatternFilter {
    /// Compile patterns for the tree rooted at `root`
    pub fn new(
        root: &Path,
        patterns: &PatternSpec,
        config: &SnapshotterConfig,
    ) -> Result<Self, FileSnapshotError> {
        let excludes = build_matcher(
            root,
            config
                .global_excludes()
                .chain(patterns.excludes.iter().map(String::as_str)),
        )?;
        let includes = build_matcher(root, patterns.includes.iter().map(String::as_str))?;
        Ok(Self { excludes, includes })
    }

    /// Filter that lets everything through
    pub fn allow_all() -> Self {
        Self {
            excludes: None,
            includes: None,
        }
    }

    /// Whether a path (relative to the root) is excluded
    ///
    /// Excluded directories are not descended into.
    pub fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        if relative.as_os_str().is_empty() {
            return false;
        }
        match self.excludes {
            Some(ref excludes) => excludes.matched(relative, is_dir).is_ignore(),
            None => false,
        }
    }

    /// Whether a non-directory entry (relative to the root) is included
    ///
    /// A file is included when it, or one of its parent directories, matches
    /// an include pattern. Without include patterns everything is included.
    pub fn is_included(&self, relative: &Path) -> bool {
        match self.includes {
            Some(ref includes) => includes
                .matched_path_or_any_parents(relative, false)
                .is_ignore(),
            None => true,
        }
    }

    /// Whether include patterns restrict this tree
    pub fn has_includes(&self) -> bool {
        self.includes.is_some()
    }
}

fn build_matcher<'a>(
    root: &Path,
    patterns: impl Iterator<Item = &'a str>,
) -> Result<Option<Gitignore>, FileSnapshotError> {
    let mut builder = GitignoreBuilder::new(root);
    let mut any = false;
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|source| FileSnapshotError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
        any = true;
    }
    if !any {
        return Ok(None);
    }
    let matcher = builder.build().map_err(|source| FileSnapshotError::Pattern {
        pattern: "<combined>".to_string(),
        source,
    })?;
    Ok(Some(matcher))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(includes: &[&str], excludes: &[&str], config: SnapshotterConfig) -> PatternFilter {
        let patterns = PatternSpec {
            includes: includes.iter().map(|s| s.to_string()).collect(),
            excludes: excludes.iter().map(|s| s.to_string()).collect(),
        };
        PatternFilter::new(Path::new("/root"), &patterns, &config).unwrap()
    }

    #[test]
    fn test_default_excludes_enforced() {
        let filter = filter(&[], &[], SnapshotterConfig::default());

        assert!(filter.is_excluded(Path::new(".git"), true));
        assert!(filter.is_excluded(Path::new("nested/.svn"), true));
        assert!(filter.is_excluded(Path::new("notes.txt~"), false));
        assert!(filter.is_excluded(Path::new(".DS_Store"), false));
        assert!(filter.is_excluded(Path::new("#autosave#"), false));

        assert!(!filter.is_excluded(Path::new("src/main.rs"), false));
        assert!(!filter.is_excluded(Path::new("README.md"), false));
    }

    #[test]
    fn test_default_excludes_disabled() {
        let config = SnapshotterConfig {
            use_default_excludes: false,
            ..SnapshotterConfig::default()
        };
        let filter = filter(&[], &[], config);
        assert!(!filter.is_excluded(Path::new(".git"), true));
    }

    #[test]
    fn test_tree_excludes() {
        let filter = filter(&[], &["*.log", "build/"], SnapshotterConfig::default());
        assert!(filter.is_excluded(Path::new("debug.log"), false));
        assert!(filter.is_excluded(Path::new("sub/trace.log"), false));
        assert!(filter.is_excluded(Path::new("build"), true));
        assert!(!filter.is_excluded(Path::new("build"), false));
        assert!(!filter.is_excluded(Path::new("main.c"), false));
    }

    #[test]
    fn test_root_never_excluded() {
        let filter = filter(&[], &["*"], SnapshotterConfig::default());
        assert!(!filter.is_excluded(Path::new(""), true));
    }

    #[test]
    fn test_includes() {
        let filter = filter(&["*.txt", "docs/"], &[], SnapshotterConfig::default());
        assert!(filter.has_includes());
        assert!(filter.is_included(Path::new("a.txt")));
        assert!(filter.is_included(Path::new("deep/b.txt")));
        assert!(filter.is_included(Path::new("docs/guide.md")));
        assert!(!filter.is_included(Path::new("main.rs")));
    }

    #[test]
    fn test_allow_all() {
        let filter = PatternFilter::allow_all();
        assert!(!filter.has_includes());
        assert!(filter.is_included(Path::new("x")));
        assert!(!filter.is_excluded(Path::new(".git"), true));
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let patterns = PatternSpec {
            includes: vec![],
            excludes: vec!["*.[z-a]".to_string()],
        };
        let result = PatternFilter::new(Path::new("/root"), &patterns, &SnapshotterConfig::default());
        match result {
            Err(FileSnapshotError::Pattern { pattern, .. }) => assert_eq!(pattern, "*.[z-a]"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("inverted class range accepted"),
        }
    }

    #[test]
    fn test_unclosed_class_matches_literally() {
        let filter = filter(&[], &["a["], SnapshotterConfig::default());
        assert!(filter.is_excluded(Path::new("a["), false));
        assert!(!filter.is_excluded(Path::new("a"), false));
    }
}
