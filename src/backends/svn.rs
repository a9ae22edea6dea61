//! Subversion working copy backend
//!
//! Listing comes from `svn list`; searching feeds that listing to `grep -l`
//! in batches so results stream as each batch finishes.

use std::fs::File;
use std::path::Path;

use crate::backends::process::{BatchedGrep, ToolCommand};
use crate::backends::tree::LocalTree;
use crate::backends::{FileSet, PathStream};
use crate::core::error::Result;
use crate::core::paths::RelativePath;

#[derive(Debug, Clone)]
pub struct SvnFileSet {
    tree: LocalTree,
    case_sensitive: bool,
}

impl SvnFileSet {
    pub fn new(root: &Path, case_sensitive: bool) -> Self {
        Self {
            tree: LocalTree::new(root),
            case_sensitive,
        }
    }

    fn svn_list(&self, dir: &RelativePath, recursive: bool) -> Result<PathStream<'static>> {
        let base = self.tree.dir(dir)?;
        let mut cmd = ToolCommand::new("svn").args(["list", "--non-interactive"]);
        if recursive {
            cmd = cmd.arg("--recursive");
        }
        let stream = cmd.current_dir(&base).stream();

        // Directory entries carry a trailing slash
        Ok(Box::new(stream.map(|item| {
            item.map(|path| path.trim_end_matches('/').to_string())
        })))
    }
}

impl FileSet for SvnFileSet {
    fn list_files(&self, subdir: &RelativePath) -> Result<PathStream<'_>> {
        self.svn_list(subdir, true)
    }

    fn grep_files(&self, subdir: &RelativePath, sym: &str) -> Result<PathStream<'_>> {
        let base = self.tree.dir(subdir)?;
        let files = self.svn_list(subdir, true)?;
        Ok(Box::new(BatchedGrep::new(files, &base, sym, self.case_sensitive)))
    }

    fn is_dir(&self, path: &RelativePath) -> bool {
        self.tree.is_dir(path)
    }

    /// Versioned entries directly inside `path`
    fn list_dir(&self, path: &RelativePath) -> Result<Vec<String>> {
        let mut names = self.svn_list(path, false)?.collect::<Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn stat_path(&self, path: &RelativePath) -> Result<u64> {
        self.tree.stat_path(path)
    }

    fn open_file(&self, path: &RelativePath) -> Result<File> {
        self.tree.open_file(path)
    }

    fn kind(&self) -> &'static str {
        "svn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::util::command_exists;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn run(dir: &Path, program: &str, args: &[&str]) {
        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "{} {:?} failed", program, args);
    }

    /// Checked-out working copy with `foo` and `mysubdir/jam` committed and
    /// `bar` left unversioned
    fn example_checkout() -> Option<(TempDir, std::path::PathBuf)> {
        if !command_exists("svn") || !command_exists("svnadmin") {
            eprintln!("svn not installed, skipping");
            return None;
        }
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("repo");
        let wc = dir.path().join("wc");
        run(dir.path(), "svnadmin", &["create", "repo"]);
        let url = format!("file://{}", repo.display());
        run(dir.path(), "svn", &["checkout", "-q", &url, "wc"]);

        fs::write(wc.join("foo"), "Hello world").unwrap();
        fs::create_dir(wc.join("mysubdir")).unwrap();
        fs::write(wc.join("mysubdir/jam"), "raspberry").unwrap();
        run(&wc, "svn", &["add", "-q", "foo", "mysubdir"]);
        run(&wc, "svn", &["commit", "-q", "-m", "import"]);
        run(&wc, "svn", &["update", "-q"]);
        fs::write(wc.join("bar"), "Hello, this is not listed").unwrap();
        Some((dir, wc))
    }

    fn rel(p: &str) -> RelativePath {
        RelativePath::new(p).unwrap()
    }

    fn collect(stream: PathStream<'_>) -> Vec<String> {
        stream.collect::<Result<_>>().unwrap()
    }

    #[test]
    fn test_unversioned_files_are_hidden() {
        let Some((_dir, wc)) = example_checkout() else { return };
        let fileset = SvnFileSet::new(&wc, false);

        let mut listed = collect(fileset.list_files(&rel("")).unwrap());
        listed.sort();
        assert_eq!(listed, vec!["foo", "mysubdir", "mysubdir/jam"]);

        assert_eq!(collect(fileset.grep_files(&rel(""), "hello").unwrap()), vec!["foo"]);
        assert_eq!(fileset.list_dir(&rel("")).unwrap(), vec!["foo", "mysubdir"]);
    }

    #[test]
    fn test_grep_in_subdir() {
        let Some((_dir, wc)) = example_checkout() else { return };
        let fileset = SvnFileSet::new(&wc, true);
        assert_eq!(collect(fileset.grep_files(&rel("mysubdir"), "berry").unwrap()), vec!["jam"]);
        assert!(collect(fileset.grep_files(&rel(""), "HELLO").unwrap()).is_empty());
    }
}
