//! Plain filesystem backend
//!
//! Lists by walking the tree with walkdir and searches with `grep -r`.
//! Compiled objects and editor droppings are left out of both.

use std::fs::File;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::backends::process::{ToolCommand, GREP_OK};
use crate::backends::tree::LocalTree;
use crate::backends::{FileSet, PathStream};
use crate::core::error::{BrowseError, Result};
use crate::core::paths::{is_excluded_artifact, make_relative, RelativePath, EXCLUDED_ARTIFACT_GLOBS};

#[derive(Debug, Clone)]
pub struct FsFileSet {
    tree: LocalTree,
    case_sensitive: bool,
}

impl FsFileSet {
    pub fn new(root: &Path, case_sensitive: bool) -> Self {
        Self {
            tree: LocalTree::new(root),
            case_sensitive,
        }
    }
}

impl FileSet for FsFileSet {
    fn list_files(&self, subdir: &RelativePath) -> Result<PathStream<'_>> {
        let base = self.tree.dir(subdir)?;

        let walker = WalkDir::new(&base)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_excluded_artifact(&e.file_name().to_string_lossy()));

        let mut paths = Vec::new();
        let mut failure = None;
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let at = e
                        .path()
                        .and_then(|p| make_relative(p, &base))
                        .unwrap_or_default();
                    debug!(path = %at, error = %e, "walk failed");
                    failure.get_or_insert_with(|| BrowseError::at_path(&at, e.into()));
                    continue;
                }
            };
            if let Some(relative) = make_relative(entry.path(), &base) {
                paths.push(relative);
            }
        }

        // Full-path order, not per-directory order
        paths.sort();
        // An unreadable entry ends the listing with an error after what was read
        Ok(Box::new(paths.into_iter().map(Ok).chain(failure.map(Err))))
    }

    fn grep_files(&self, subdir: &RelativePath, sym: &str) -> Result<PathStream<'_>> {
        let base = self.tree.dir(subdir)?;

        let mut cmd = ToolCommand::new("grep").args(["-r", "-l", "-Z", "-F"]);
        if !self.case_sensitive {
            cmd = cmd.arg("-i");
        }
        for glob in EXCLUDED_ARTIFACT_GLOBS {
            cmd = cmd.arg(format!("--exclude={}", glob));
        }
        let stream = cmd
            .args(["-e", sym, "."])
            .current_dir(&base)
            .nul_delimited()
            .ok_codes(GREP_OK)
            .stream();

        Ok(Box::new(stream.map(|item| {
            item.map(|path| match path.strip_prefix("./") {
                Some(stripped) => stripped.to_string(),
                None => path,
            })
        })))
    }

    fn is_dir(&self, path: &RelativePath) -> bool {
        self.tree.is_dir(path)
    }

    fn list_dir(&self, path: &RelativePath) -> Result<Vec<String>> {
        self.tree.list_dir(path)
    }

    fn stat_path(&self, path: &RelativePath) -> Result<u64> {
        self.tree.stat_path(path)
    }

    fn open_file(&self, path: &RelativePath) -> Result<File> {
        self.tree.open_file(path)
    }

    fn kind(&self) -> &'static str {
        "fs"
    }
}
