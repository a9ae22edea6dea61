//! Direct access to a working tree on disk
//!
//! Every backend serves `is_dir`, `stat_path` and `open_file` from the files
//! on disk, whatever decides which paths get listed.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::core::error::{BrowseError, Result};
use crate::core::paths::RelativePath;

#[derive(Debug, Clone)]
pub struct LocalTree {
    root: PathBuf,
}

impl LocalTree {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn path(&self, rel: &RelativePath) -> PathBuf {
        rel.to_fs_path(&self.root)
    }

    /// On-disk directory a tool should run in, `NotFound` if it is not a directory
    pub fn dir(&self, rel: &RelativePath) -> Result<PathBuf> {
        let path = self.path(rel);
        if path.is_dir() {
            Ok(path)
        } else {
            Err(BrowseError::NotFound(rel.to_string()))
        }
    }

    pub fn is_dir(&self, rel: &RelativePath) -> bool {
        self.path(rel).is_dir()
    }

    /// Leaf names in a directory, sorted
    pub fn list_dir(&self, rel: &RelativePath) -> Result<Vec<String>> {
        let entries =
            fs::read_dir(self.path(rel)).map_err(|e| BrowseError::at_path(rel.as_str(), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    pub fn stat_path(&self, rel: &RelativePath) -> Result<u64> {
        let meta =
            fs::metadata(self.path(rel)).map_err(|e| BrowseError::at_path(rel.as_str(), e))?;
        Ok(meta.len())
    }

    pub fn open_file(&self, rel: &RelativePath) -> Result<File> {
        let path = self.path(rel);
        if path.is_dir() {
            return Err(BrowseError::NotFound(rel.to_string()));
        }
        File::open(&path).map_err(|e| BrowseError::at_path(rel.as_str(), e))
    }
}
