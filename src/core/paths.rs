//! Path validation and normalization
//!
//! Every path coming from a user (CLI argument, URL, query parameter) goes
//! through [`RelativePath::new`] before a backend sees it. Backends only accept
//! `&RelativePath`, so they never re-validate.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::{BrowseError, Result};

/// A validated, normalized, '/'-separated path relative to a backend root.
/// The empty path is the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativePath(String);

impl RelativePath {
    /// Validate a user-supplied path.
    ///
    /// Fails on a leading `/` and on any `..` segment. Empty and `.` segments
    /// are dropped, which also strips a trailing slash.
    pub fn new(path: &str) -> Result<Self> {
        if path.starts_with('/') {
            return Err(BrowseError::PathSecurity {
                path: path.to_string(),
                reason: "absolute pathname",
            });
        }
        if path.split('/').any(|part| part == "..") {
            return Err(BrowseError::PathSecurity {
                path: path.to_string(),
                reason: "pathname contains '..'",
            });
        }

        let normalized = path
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/");
        Ok(RelativePath(normalized))
    }

    /// The backend root
    pub fn root() -> Self {
        RelativePath(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a relative path (a leaf name or a tool-reported path)
    pub fn join(&self, rest: &str) -> Result<RelativePath> {
        let rest = RelativePath::new(rest)?;
        Ok(self.join_validated(&rest))
    }

    pub fn join_validated(&self, rest: &RelativePath) -> RelativePath {
        match (self.is_root(), rest.is_root()) {
            (true, _) => rest.clone(),
            (false, true) => self.clone(),
            (false, false) => RelativePath(format!("{}/{}", self.0, rest.0)),
        }
    }

    /// Split off the first segment: `"aa/x/y"` becomes `("aa", "x/y")`.
    /// Returns `None` for the root.
    pub fn split_first(&self) -> Option<(&str, RelativePath)> {
        if self.is_root() {
            return None;
        }
        match self.0.split_once('/') {
            Some((head, tail)) => Some((head, RelativePath(tail.to_string()))),
            None => Some((self.0.as_str(), RelativePath::root())),
        }
    }

    /// Segments of the path, empty for the root
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Resolve against a directory on disk
    pub fn to_fs_path(&self, base: &Path) -> PathBuf {
        self.segments().fold(base.to_path_buf(), |acc, seg| acc.join(seg))
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Every (ancestor directory, remainder) split of a path, nearest directory first.
///
/// `"a/b/c.rs"` yields `("a/b", "c.rs")`, `("a", "b/c.rs")`, `("", "a/b/c.rs")`.
pub fn ancestor_splits(path: &RelativePath) -> Vec<(String, String)> {
    let parts: Vec<&str> = path.segments().collect();
    (0..parts.len())
        .rev()
        .map(|i| (parts[..i].join("/"), parts[i..].join("/")))
        .collect()
}

/// Compiled objects and editor droppings that never show up in listings
pub fn is_excluded_artifact(leaf: &str) -> bool {
    leaf.ends_with(".pyc")
        || leaf.ends_with('~')
        || (leaf.len() >= 2 && leaf.starts_with('#') && leaf.ends_with('#'))
}

/// Glob forms of [`is_excluded_artifact`] for tools that take `--exclude`
pub const EXCLUDED_ARTIFACT_GLOBS: [&str; 3] = ["*.pyc", "*~", "#*#"];
