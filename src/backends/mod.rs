//! Backends module - File enumeration and search over a tree
//!
//! Provides:
//! - fs: plain filesystem walk + `grep -r`
//! - git: tracked files of a Git working copy
//! - svn: versioned files of a Subversion working copy
//! - combined: several trees mounted under names
//! - process: external tool invocation
//! - doctor: Dependency checking

use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::core::error::Result;
use crate::core::paths::RelativePath;

pub mod combined;
pub mod doctor;
pub mod fs;
pub mod git;
pub mod process;
pub mod svn;
pub mod tree;

use combined::CombinedFileSet;
use fs::FsFileSet;
use git::GitFileSet;
use svn::SvnFileSet;

/// Lazily produced relative paths. Tool failures arrive as the last item.
pub type PathStream<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

/// What every backend can do with a tree.
///
/// Paths from `list_files` and `grep_files` are relative to `subdir`; every
/// other method takes a path relative to the backend root.
pub trait FileSet {
    fn list_files(&self, subdir: &RelativePath) -> Result<PathStream<'_>>;

    /// Files whose content contains `sym` as a literal string
    fn grep_files(&self, subdir: &RelativePath, sym: &str) -> Result<PathStream<'_>>;

    fn is_dir(&self, path: &RelativePath) -> bool;

    /// Leaf names inside a directory, sorted
    fn list_dir(&self, path: &RelativePath) -> Result<Vec<String>>;

    /// Size in bytes
    fn stat_path(&self, path: &RelativePath) -> Result<u64>;

    fn open_file(&self, path: &RelativePath) -> Result<File>;

    /// Short backend name (fs/git/svn/combined)
    fn kind(&self) -> &'static str;
}

/// Construction-time settings shared by all backends
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSetOptions {
    /// Search with case-sensitive grep (faster); listing is unaffected
    pub case_sensitive: bool,
}

#[derive(Debug)]
pub enum Backend {
    Fs(FsFileSet),
    Git(GitFileSet),
    Svn(SvnFileSet),
    Combined(CombinedFileSet),
}

impl Backend {
    fn inner(&self) -> &dyn FileSet {
        match self {
            Backend::Fs(b) => b,
            Backend::Git(b) => b,
            Backend::Svn(b) => b,
            Backend::Combined(b) => b,
        }
    }
}

impl FileSet for Backend {
    fn list_files(&self, subdir: &RelativePath) -> Result<PathStream<'_>> {
        self.inner().list_files(subdir)
    }

    fn grep_files(&self, subdir: &RelativePath, sym: &str) -> Result<PathStream<'_>> {
        self.inner().grep_files(subdir, sym)
    }

    fn is_dir(&self, path: &RelativePath) -> bool {
        self.inner().is_dir(path)
    }

    fn list_dir(&self, path: &RelativePath) -> Result<Vec<String>> {
        self.inner().list_dir(path)
    }

    fn stat_path(&self, path: &RelativePath) -> Result<u64> {
        self.inner().stat_path(path)
    }

    fn open_file(&self, path: &RelativePath) -> Result<File> {
        self.inner().open_file(path)
    }

    fn kind(&self) -> &'static str {
        self.inner().kind()
    }
}

/// Pick a backend for a directory: Subversion if it has `.svn`, else Git if
/// it has `.git`, else the plain filesystem. Never fails.
pub fn make_fileset(dir: &Path, options: FileSetOptions) -> Backend {
    let backend = if dir.join(".svn").exists() {
        Backend::Svn(SvnFileSet::new(dir, options.case_sensitive))
    } else if dir.join(".git").exists() {
        Backend::Git(GitFileSet::new(dir, options.case_sensitive))
    } else {
        Backend::Fs(FsFileSet::new(dir, options.case_sensitive))
    };
    debug!(dir = %dir.display(), kind = backend.kind(), "selected backend");
    backend
}

/// Mount several directories under names, each with its own detected backend
pub fn make_combined<I>(mounts: I, options: FileSetOptions) -> Backend
where
    I: IntoIterator<Item = (String, std::path::PathBuf)>,
{
    let children = mounts
        .into_iter()
        .map(|(name, dir)| {
            let child = make_fileset(&dir, options);
            (name, child)
        })
        .collect();
    Backend::Combined(CombinedFileSet::new(children))
}
