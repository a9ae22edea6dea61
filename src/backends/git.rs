//! Git working copy backend
//!
//! Only tracked files are listed or searched; `git ls-files` and `git grep`
//! run inside the requested directory so their output is already relative
//! to it.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use crate::backends::process::{ToolCommand, GREP_OK};
use crate::backends::tree::LocalTree;
use crate::backends::{FileSet, PathStream};
use crate::core::error::Result;
use crate::core::paths::RelativePath;

#[derive(Debug, Clone)]
pub struct GitFileSet {
    tree: LocalTree,
    case_sensitive: bool,
}

impl GitFileSet {
    pub fn new(root: &Path, case_sensitive: bool) -> Self {
        Self {
            tree: LocalTree::new(root),
            case_sensitive,
        }
    }

    fn ls_files(&self, dir: &RelativePath) -> Result<PathStream<'static>> {
        let base = self.tree.dir(dir)?;
        Ok(ToolCommand::new("git")
            .args(["ls-files", "-z"])
            .current_dir(&base)
            .nul_delimited()
            .stream())
    }
}

impl FileSet for GitFileSet {
    fn list_files(&self, subdir: &RelativePath) -> Result<PathStream<'_>> {
        self.ls_files(subdir)
    }

    fn grep_files(&self, subdir: &RelativePath, sym: &str) -> Result<PathStream<'_>> {
        let base = self.tree.dir(subdir)?;

        let mut cmd = ToolCommand::new("git").args(["grep", "--text", "-l", "-z", "-F"]);
        if !self.case_sensitive {
            cmd = cmd.arg("-i");
        }
        Ok(cmd
            .args(["-e", sym])
            .current_dir(&base)
            .nul_delimited()
            .ok_codes(GREP_OK)
            .stream())
    }

    fn is_dir(&self, path: &RelativePath) -> bool {
        self.tree.is_dir(path)
    }

    /// Tracked entries directly inside `path`
    fn list_dir(&self, path: &RelativePath) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for tracked in self.ls_files(path)? {
            let tracked = tracked?;
            let first = tracked.split('/').next().unwrap_or(&tracked);
            names.insert(first.to_string());
        }
        Ok(names.into_iter().collect())
    }

    fn stat_path(&self, path: &RelativePath) -> Result<u64> {
        self.tree.stat_path(path)
    }

    fn open_file(&self, path: &RelativePath) -> Result<File> {
        self.tree.open_file(path)
    }

    fn kind(&self) -> &'static str {
        "git"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::util::command_exists;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    /// `foo` and `mysubdir/jam` tracked, `bar` left untracked
    fn example_repo() -> Option<TempDir> {
        if !command_exists("git") {
            eprintln!("git not installed, skipping");
            return None;
        }
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo"), "Hello world").unwrap();
        fs::write(dir.path().join("bar"), "Hello, this is not listed").unwrap();
        fs::create_dir(dir.path().join("mysubdir")).unwrap();
        fs::write(dir.path().join("mysubdir/jam"), "raspberry").unwrap();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["add", "foo", "mysubdir/jam"]);
        Some(dir)
    }

    fn rel(p: &str) -> RelativePath {
        RelativePath::new(p).unwrap()
    }

    fn collect(stream: PathStream<'_>) -> Vec<String> {
        stream.collect::<Result<_>>().unwrap()
    }

    #[test]
    fn test_untracked_files_are_not_listed() {
        let Some(dir) = example_repo() else { return };
        let fileset = GitFileSet::new(dir.path(), false);
        assert_eq!(
            collect(fileset.list_files(&rel("")).unwrap()),
            vec!["foo", "mysubdir/jam"]
        );
        assert_eq!(collect(fileset.list_files(&rel("mysubdir")).unwrap()), vec!["jam"]);
    }

    #[test]
    fn test_untracked_files_are_not_searched() {
        let Some(dir) = example_repo() else { return };
        let fileset = GitFileSet::new(dir.path(), false);
        assert_eq!(collect(fileset.grep_files(&rel(""), "hello").unwrap()), vec!["foo"]);
        assert_eq!(collect(fileset.grep_files(&rel("mysubdir"), "berry").unwrap()), vec!["jam"]);
        assert!(collect(fileset.grep_files(&rel(""), "absent").unwrap()).is_empty());
    }

    #[test]
    fn test_case_sensitive_grep() {
        let Some(dir) = example_repo() else { return };
        let fileset = GitFileSet::new(dir.path(), true);
        assert!(collect(fileset.grep_files(&rel(""), "hello").unwrap()).is_empty());
        assert_eq!(collect(fileset.grep_files(&rel(""), "Hello").unwrap()), vec!["foo"]);
    }

    #[test]
    fn test_list_dir_tracked_only() {
        let Some(dir) = example_repo() else { return };
        let fileset = GitFileSet::new(dir.path(), false);
        assert_eq!(fileset.list_dir(&rel("")).unwrap(), vec!["foo", "mysubdir"]);
        assert_eq!(fileset.list_dir(&rel("mysubdir")).unwrap(), vec!["jam"]);
        assert!(fileset.is_dir(&rel("mysubdir")));
        assert_eq!(fileset.stat_path(&rel("foo")).unwrap(), 11);
    }

    #[test]
    fn test_outside_a_repository_is_a_tool_failure() {
        if !command_exists("git") {
            return;
        }
        let dir = TempDir::new().unwrap();
        let fileset = GitFileSet::new(dir.path(), false);
        let items: Vec<Result<String>> = fileset.list_files(&rel("")).unwrap().collect();
        assert!(matches!(
            items.last(),
            Some(Err(crate::core::error::BrowseError::ToolFailure { .. }))
        ));
    }
}
