//! External tool invocation
//!
//! Tools are started with an argument vector (never through a shell) and
//! their stdout is read one record at a time, so a listing of a huge tree
//! streams instead of being buffered. The exit status is checked once stdout
//! is exhausted: a status outside the tool's success set becomes a final
//! `ToolFailure` item after the records already produced.

use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use tracing::debug;

use crate::backends::PathStream;
use crate::core::error::{BrowseError, Result};
use crate::core::util::truncate_string;

/// Exit codes meaning "ran fine" for grep-like tools (1 = nothing matched)
pub const GREP_OK: &[i32] = &[0, 1];

/// How much of a failing tool's stderr ends up in the error message
const STDERR_LIMIT: usize = 4096;

/// Number of file arguments per grep invocation when searching a file list
pub const GREP_BATCH_SIZE: usize = 256;

/// Builder for one tool invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    delimiter: u8,
    ok_codes: &'static [i32],
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
            delimiter: b'\n',
            ok_codes: &[0],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Records are terminated by NUL instead of newline (`-z` output)
    pub fn nul_delimited(mut self) -> Self {
        self.delimiter = b'\0';
        self
    }

    pub fn ok_codes(mut self, codes: &'static [i32]) -> Self {
        self.ok_codes = codes;
        self
    }

    /// Name used in logs and errors: the program plus its subcommand, if any
    fn describe(&self) -> String {
        match self.args.first().and_then(|a| a.to_str()) {
            Some(sub) if !sub.starts_with('-') && self.program != "grep" => {
                format!("{} {}", self.program, sub)
            }
            _ => self.program.clone(),
        }
    }

    pub fn spawn(self) -> Result<ToolLines> {
        let tool = self.describe();
        debug!(tool = %tool, args = ?self.args, cwd = ?self.cwd, "spawning tool");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| BrowseError::ToolSpawn {
            tool: tool.clone(),
            source,
        })?;

        let stdout = child.stdout.take().map(BufReader::new);
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                let text = String::from_utf8_lossy(&buf);
                truncate_string(&text, STDERR_LIMIT).0
            })
        });

        Ok(ToolLines {
            tool,
            child: Some(child),
            stdout,
            stderr,
            delimiter: self.delimiter,
            ok_codes: self.ok_codes,
            buf: Vec::new(),
        })
    }

    /// Spawn and stream the records; a spawn failure becomes the only item
    pub fn stream(self) -> PathStream<'static> {
        match self.spawn() {
            Ok(lines) => Box::new(lines),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }
}

/// Records read from a running tool's stdout
pub struct ToolLines {
    tool: String,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
    delimiter: u8,
    ok_codes: &'static [i32],
    buf: Vec<u8>,
}

impl ToolLines {
    /// Close stdout, reap the child and check how it exited
    fn finish(&mut self) -> Option<BrowseError> {
        self.stdout = None;
        let mut child = self.child.take()?;
        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => return Some(BrowseError::Io(e)),
        };
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        match status.code() {
            Some(code) if self.ok_codes.contains(&code) => None,
            _ => Some(BrowseError::ToolFailure {
                tool: self.tool.clone(),
                status: status.to_string(),
                stderr,
            }),
        }
    }
}

impl Iterator for ToolLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Result<String>> {
        loop {
            let reader = match self.stdout.as_mut() {
                Some(reader) => reader,
                None => return self.finish().map(Err),
            };

            self.buf.clear();
            match reader.read_until(self.delimiter, &mut self.buf) {
                Ok(0) => return self.finish().map(Err),
                Ok(_) => {
                    if self.buf.last() == Some(&self.delimiter) {
                        self.buf.pop();
                    }
                    if self.buf.is_empty() {
                        continue;
                    }
                    return Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()));
                }
                Err(e) => {
                    self.stdout = None;
                    if let Some(mut child) = self.child.take() {
                        let _ = child.kill();
                        let _ = child.wait();
                    }
                    return Some(Err(BrowseError::Io(e)));
                }
            }
        }
    }
}

impl Drop for ToolLines {
    fn drop(&mut self) {
        // Abandoned early: close the pipe and reap the child
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// `grep -l` over a stream of file paths, a batch of files per grep run
pub struct BatchedGrep<'a> {
    files: PathStream<'a>,
    cwd: PathBuf,
    grep_args: Vec<String>,
    current: Option<ToolLines>,
    pending_error: Option<BrowseError>,
    done: bool,
}

impl<'a> BatchedGrep<'a> {
    /// `files` are relative to `cwd`; entries that are not regular files are skipped
    pub fn new(files: PathStream<'a>, cwd: &Path, sym: &str, case_sensitive: bool) -> Self {
        let mut grep_args = vec!["-l".to_string(), "-Z".to_string(), "-F".to_string()];
        if !case_sensitive {
            grep_args.push("-i".to_string());
        }
        grep_args.extend(["-e".to_string(), sym.to_string(), "--".to_string()]);

        Self {
            files,
            cwd: cwd.to_path_buf(),
            grep_args,
            current: None,
            pending_error: None,
            done: false,
        }
    }

    fn next_batch(&mut self) -> Vec<String> {
        let mut batch = Vec::new();
        while batch.len() < GREP_BATCH_SIZE {
            match self.files.next() {
                None => {
                    self.done = true;
                    break;
                }
                Some(Err(e)) => {
                    self.pending_error = Some(e);
                    self.done = true;
                    break;
                }
                Some(Ok(path)) => {
                    if self.cwd.join(&path).is_file() {
                        batch.push(path);
                    }
                }
            }
        }
        batch
    }
}

impl Iterator for BatchedGrep<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Result<String>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }
            if self.done {
                return self.pending_error.take().map(Err);
            }

            let batch = self.next_batch();
            if batch.is_empty() {
                continue;
            }
            let spawned = ToolCommand::new("grep")
                .args(&self.grep_args)
                .args(&batch)
                .current_dir(&self.cwd)
                .nul_delimited()
                .ok_codes(GREP_OK)
                .spawn();
            match spawned {
                Ok(lines) => self.current = Some(lines),
                Err(e) => {
                    self.done = true;
                    self.pending_error = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_reads_lines() {
        let lines: Vec<String> = sh("printf 'a\\nb\\n\\nc'")
            .stream()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nul_delimited() {
        let lines: Vec<String> = sh("printf 'x y\\0z\\nw\\0'")
            .nul_delimited()
            .stream()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(lines, vec!["x y", "z\nw"]);
    }

    #[test]
    fn test_failure_comes_after_output() {
        let items: Vec<Result<String>> = sh("echo a; echo oops >&2; exit 3").stream().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        match &items[1] {
            Err(BrowseError::ToolFailure { tool, stderr, .. }) => {
                assert_eq!(tool, "sh");
                assert!(stderr.contains("oops"));
            }
            other => panic!("expected tool failure, got {:?}", other),
        }
    }

    #[test]
    fn test_ok_codes() {
        let items: Vec<Result<String>> = sh("exit 1").ok_codes(GREP_OK).stream().collect();
        assert!(items.is_empty());

        let items: Vec<Result<String>> = sh("exit 1").stream().collect();
        assert!(matches!(items.as_slice(), [Err(BrowseError::ToolFailure { .. })]));
    }

    #[test]
    fn test_spawn_failure() {
        let items: Vec<Result<String>> = ToolCommand::new("definitely-not-a-real-command-xyz")
            .stream()
            .collect();
        assert!(matches!(items.as_slice(), [Err(BrowseError::ToolSpawn { .. })]));
    }

    #[test]
    fn test_early_drop_does_not_hang() {
        let first: Vec<String> = ToolCommand::new("yes")
            .stream()
            .take(3)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(first, vec!["y", "y", "y"]);
    }

    #[test]
    fn test_describe() {
        assert_eq!(ToolCommand::new("git").arg("grep").describe(), "git grep");
        assert_eq!(ToolCommand::new("grep").arg("-r").describe(), "grep");
    }

    #[test]
    fn test_batched_grep() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("one"), "Hello world").unwrap();
        fs::write(dir.path().join("two"), "nothing").unwrap();
        fs::write(dir.path().join("sub/three"), "WORLD peace").unwrap();

        let files: Vec<Result<String>> = ["one", "sub", "sub/three", "two", "missing"]
            .iter()
            .map(|s| Ok(s.to_string()))
            .collect();

        let found: Vec<String> = BatchedGrep::new(Box::new(files.into_iter()), dir.path(), "world", false)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(found, vec!["one", "sub/three"]);
    }

    #[test]
    fn test_batched_grep_newline_in_file_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a\nb"), "Hello world").unwrap();

        let files: Vec<Result<String>> = vec![Ok("a\nb".to_string())];
        let found: Vec<String> = BatchedGrep::new(Box::new(files.into_iter()), dir.path(), "world", true)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(found, vec!["a\nb"]);
    }

    #[test]
    fn test_batched_grep_case_sensitive_and_metachars() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "x = $(rm -rf /)").unwrap();
        fs::write(dir.path().join("b"), "X = $(RM -RF /)").unwrap();

        let files: Vec<Result<String>> = vec![Ok("a".to_string()), Ok("b".to_string())];
        let found: Vec<String> = BatchedGrep::new(Box::new(files.into_iter()), dir.path(), "$(rm", true)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(found, vec!["a"]);
    }

    #[test]
    fn test_batched_grep_forwards_list_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "hit").unwrap();

        let files: Vec<Result<String>> = vec![
            Ok("a".to_string()),
            Err(BrowseError::NotFound("gone".to_string())),
        ];
        let items: Vec<Result<String>> =
            BatchedGrep::new(Box::new(files.into_iter()), dir.path(), "hit", true).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(matches!(items[1], Err(BrowseError::NotFound(_))));
    }
}
