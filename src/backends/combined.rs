//! Virtual union of several trees
//!
//! Each child backend is mounted under a name. The first segment of a path
//! selects the child and the rest is passed through unchanged; at the top
//! level the mount names form a synthetic directory.

use std::collections::BTreeMap;
use std::fs::File;

use crate::backends::{Backend, FileSet, PathStream};
use crate::core::error::{BrowseError, Result};
use crate::core::paths::RelativePath;

#[derive(Debug)]
pub struct CombinedFileSet {
    children: BTreeMap<String, Backend>,
}

impl CombinedFileSet {
    pub fn new(children: BTreeMap<String, Backend>) -> Self {
        Self { children }
    }

    /// Child owning `path` and the path inside it; `None` for the top level
    fn route(&self, path: &RelativePath) -> Result<Option<(&Backend, RelativePath)>> {
        let Some((name, rest)) = path.split_first() else {
            return Ok(None);
        };
        match self.children.get(name) {
            Some(child) => Ok(Some((child, rest))),
            None => Err(BrowseError::NotFound(path.to_string())),
        }
    }

    /// Run `op` against every child at its root, prefixing results with the mount name
    fn across_children<'a, F>(&'a self, op: F) -> PathStream<'a>
    where
        F: Fn(&'a Backend) -> Result<PathStream<'a>> + 'a,
    {
        Box::new(self.children.iter().flat_map(move |(name, child)| {
            let stream: PathStream<'a> = match op(child) {
                Ok(stream) => Box::new(
                    stream.map(move |item| item.map(|path| format!("{}/{}", name, path))),
                ),
                Err(e) => Box::new(std::iter::once(Err(e))),
            };
            stream
        }))
    }
}

impl FileSet for CombinedFileSet {
    fn list_files(&self, subdir: &RelativePath) -> Result<PathStream<'_>> {
        match self.route(subdir)? {
            Some((child, rest)) => child.list_files(&rest),
            None => Ok(self.across_children(|child| child.list_files(&RelativePath::root()))),
        }
    }

    fn grep_files(&self, subdir: &RelativePath, sym: &str) -> Result<PathStream<'_>> {
        match self.route(subdir)? {
            Some((child, rest)) => child.grep_files(&rest, sym),
            None => {
                let sym = sym.to_string();
                Ok(self.across_children(move |child| child.grep_files(&RelativePath::root(), &sym)))
            }
        }
    }

    fn is_dir(&self, path: &RelativePath) -> bool {
        match self.route(path) {
            Ok(Some((child, rest))) => child.is_dir(&rest),
            Ok(None) => true,
            Err(_) => false,
        }
    }

    fn list_dir(&self, path: &RelativePath) -> Result<Vec<String>> {
        match self.route(path)? {
            Some((child, rest)) => child.list_dir(&rest),
            None => Ok(self.children.keys().cloned().collect()),
        }
    }

    fn stat_path(&self, path: &RelativePath) -> Result<u64> {
        match self.route(path)? {
            Some((child, rest)) => child.stat_path(&rest),
            None => Ok(0),
        }
    }

    fn open_file(&self, path: &RelativePath) -> Result<File> {
        match self.route(path)? {
            Some((child, rest)) => child.open_file(&rest),
            None => Err(BrowseError::NotFound(path.to_string())),
        }
    }

    fn kind(&self) -> &'static str {
        "combined"
    }
}
