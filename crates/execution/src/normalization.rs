//! Normalization specifications
//!
//! A [`FileNormalizationSpec`] picks which aspects of a file tree take part
//! in its fingerprint: how paths are keyed, whether directories count, and
//! whether line endings are normalized before content hashing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How entry paths are keyed in a fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathSensitivity {
    /// Absolute path; moving the tree changes the fingerprint
    Absolute,
    /// Path relative to the declared root
    Relative,
    /// Final path segment only
    NameOnly,
    /// Paths and content are ignored; only presence counts
    Ignored,
}

impl PathSensitivity {
    /// Every path sensitivity
    pub const ALL: [PathSensitivity; 4] = [
        PathSensitivity::Absolute,
        PathSensitivity::Relative,
        PathSensitivity::NameOnly,
        PathSensitivity::Ignored,
    ];

    /// Stable identifier, part of every combined hash
    pub fn identifier(self) -> &'static str {
        match self {
            PathSensitivity::Absolute => "ABSOLUTE",
            PathSensitivity::Relative => "RELATIVE",
            PathSensitivity::NameOnly => "NAME_ONLY",
            PathSensitivity::Ignored => "IGNORED",
        }
    }
}

/// Whether directory entries take part in a fingerprint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectorySensitivity {
    #[default]
    Default,
    /// Only non-directory entries are fingerprinted
    IgnoreDirectories,
}

impl DirectorySensitivity {
    pub const ALL: [DirectorySensitivity; 2] = [
        DirectorySensitivity::Default,
        DirectorySensitivity::IgnoreDirectories,
    ];
}

/// Whether text content is hashed with normalized line endings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEndingSensitivity {
    #[default]
    Default,
    /// `\r\n` and `\r` hash like `\n`
    Normalize,
}

impl LineEndingSensitivity {
    pub const ALL: [LineEndingSensitivity; 2] = [
        LineEndingSensitivity::Default,
        LineEndingSensitivity::Normalize,
    ];
}

/// Full normalization settings for one file property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileNormalizationSpec {
    pub path: PathSensitivity,
    pub directories: DirectorySensitivity,
    pub line_endings: LineEndingSensitivity,
}

impl FileNormalizationSpec {
    /// Spec with default directory and line-ending handling
    pub fn new(path: PathSensitivity) -> Self {
        Self {
            path,
            directories: DirectorySensitivity::Default,
            line_endings: LineEndingSensitivity::Default,
        }
    }

    pub fn with_directories(mut self, directories: DirectorySensitivity) -> Self {
        self.directories = directories;
        self
    }

    pub fn with_line_endings(mut self, line_endings: LineEndingSensitivity) -> Self {
        self.line_endings = line_endings;
        self
    }

    /// Every combination, 16 in total
    pub fn all() -> impl Iterator<Item = FileNormalizationSpec> {
        PathSensitivity::ALL.into_iter().flat_map(|path| {
            DirectorySensitivity::ALL.into_iter().flat_map(move |directories| {
                LineEndingSensitivity::ALL.into_iter().map(move |line_endings| FileNormalizationSpec {
                    path,
                    directories,
                    line_endings,
                })
            })
        })
    }

    /// Stable identifier, e.g. `RELATIVE` or `NAME_ONLY+IGNORE_DIRECTORIES+NORMALIZE_LINE_ENDINGS`
    pub fn identifier(&self) -> String {
        let mut id = self.path.identifier().to_string();
        if self.directories == DirectorySensitivity::IgnoreDirectories {
            id.push_str("+IGNORE_DIRECTORIES");
        }
        if self.line_endings == LineEndingSensitivity::Normalize {
            id.push_str("+NORMALIZE_LINE_ENDINGS");
        }
        id
    }
}

impl fmt::Display for FileNormalizationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}
