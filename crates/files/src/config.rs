//! Snapshotter configuration

use serde::{Deserialize, Serialize};

/// Files at or above this size are hashed through a memory map
pub const DEFAULT_MMAP_THRESHOLD: u64 = 4 * 1024 * 1024;

/// Version-control and editor noise excluded from every walked directory tree
///
/// Gitignore syntax; patterns without a slash match at any depth.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Editor temp and backup files
    "%*%",
    ".#*",
    "\\#*#",
    "*~",
    // MacOS system files
    ".DS_Store",
    "._*",
    // CVS
    "CVS",
    ".cvsignore",
    // SCCS / Visual SourceSafe
    "SCCS",
    "vssver.scc",
    // Subversion
    ".svn",
    // Bazaar
    ".bzr",
    ".bzrignore",
    // Git
    ".git",
    ".gitattributes",
    ".gitignore",
    ".gitmodules",
    // Mercurial
    ".hg",
    ".hgignore",
    ".hgsub",
    ".hgsubstate",
    ".hgtags",
];

/// File collection snapshotter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotterConfig {
    /// Switch from streaming to mmap hashing at this size (default: 4 MiB)
    #[serde(default = "default_mmap_threshold")]
    pub mmap_threshold_bytes: u64,

    /// Follow symbolic links while walking (default: true)
    #[serde(default = "default_true")]
    pub follow_links: bool,

    /// Apply [`DEFAULT_EXCLUDES`] to walked directories (default: true)
    #[serde(default = "default_true")]
    pub use_default_excludes: bool,

    /// Extra exclude patterns applied to every walked directory
    #[serde(default)]
    pub additional_excludes: Vec<String>,
}

impl SnapshotterConfig {
    /// Exclude patterns every walked tree gets, before its own
    pub fn global_excludes(&self) -> impl Iterator<Item = &str> {
        let defaults: &[&str] = if self.use_default_excludes {
            DEFAULT_EXCLUDES
        } else {
            &[]
        };
        defaults
            .iter()
            .copied()
            .chain(self.additional_excludes.iter().map(String::as_str))
    }
}

impl Default for SnapshotterConfig {
    fn default() -> Self {
        Self {
            mmap_threshold_bytes: DEFAULT_MMAP_THRESHOLD,
            follow_links: true,
            use_default_excludes: true,
            additional_excludes: vec![],
        }
    }
}

fn default_mmap_threshold() -> u64 {
    DEFAULT_MMAP_THRESHOLD
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_uses_defaults() {
        let config: SnapshotterConfig = toml::from_str("").unwrap();
        assert_eq!(config, SnapshotterConfig::default());
    }

    #[test]
    fn test_partial_table() {
        let config: SnapshotterConfig = toml::from_str(
            "use_default_excludes = false\nadditional_excludes = [\"*.log\"]\n",
        )
        .unwrap();
        assert!(!config.use_default_excludes);
        assert!(config.follow_links);
        assert_eq!(config.global_excludes().collect::<Vec<_>>(), vec!["*.log"]);
    }

    #[test]
    fn test_defaults_include_vcs_directories() {
        let config = SnapshotterConfig::default();
        let excludes: Vec<_> = config.global_excludes().collect();
        assert!(excludes.contains(&".git"));
        assert!(excludes.contains(&".svn"));
    }
}
