//! CLI module - Command-line interface definitions and handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufWriter, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use crate::backends::{make_combined, make_fileset, Backend, FileSet, FileSetOptions, PathStream};
use crate::core::error::BrowseError;
use crate::core::links::Links;
use crate::core::model::{OutputFormat, PathRecord, Source};
use crate::core::paths::RelativePath;
use crate::core::render::{Sink, WriteSink};
use crate::flows::search::sym_search;
use crate::flows::show::show_file_or_dir;
use crate::server::{self, AppState};

/// sbrowse - browse and search a source tree as cross-linked HTML.
#[derive(Parser, Debug)]
#[command(name = "sbrowse")]
#[command(
    author,
    version,
    about,
    long_about = r#"sbrowse serves a directory tree (plain filesystem, Git or Subversion
working copy) as HTML pages: directory listings, files with every identifier
linked to a search for it, and symbol searches with matches highlighted.

The backend is picked from ROOT: `.svn` means Subversion, `.git` means Git
(only tracked files are shown), anything else is walked as a plain directory.

Examples:
    sbrowse serve --port 8000
    sbrowse -d ~/src/project search main_loop
    sbrowse show src/main.c --sym main_loop > main.html
    sbrowse --mount libc=/src/libc --mount app=/src/app ls
    sbrowse grep TODO --dir src --format raw
"#
)]
pub struct Cli {
    /// Directory to browse.
    #[arg(
        short = 'd',
        long,
        global = true,
        default_value = ".",
        env = "SBROWSE_ROOT",
        value_name = "DIR",
        long_help = "Directory to browse (defaults to the current directory).\n\n\
All paths given to subcommands and shown in pages are relative to it."
    )]
    pub root: PathBuf,

    /// Mount a directory under a name (repeatable).
    #[arg(
        long = "mount",
        global = true,
        value_name = "NAME=DIR",
        value_parser = parse_mount,
        long_help = "Browse several trees at once. Each --mount NAME=DIR appears as a\n\
top-level directory NAME, with its own backend detected from DIR.\n\n\
When given, --root is ignored."
    )]
    pub mounts: Vec<(String, PathBuf)>,

    /// Grep case-sensitively (faster).
    #[arg(
        long = "case-sensitive",
        alias = "cs",
        global = true,
        env = "SBROWSE_CASE_SENSITIVE",
        long_help = "Search file contents case-sensitively. This is noticeably faster on big\n\
trees. Filename matching and the related-symbols summary are unaffected."
    )]
    pub case_sensitive: bool,

    /// Prefix for generated links.
    #[arg(
        long,
        global = true,
        default_value = "",
        env = "SBROWSE_URL_ROOT",
        value_name = "PREFIX",
        long_help = "Prefix put in front of every generated link, for serving behind a\n\
reverse proxy under a sub-path (e.g. /browse)."
    )]
    pub url_root: String,

    /// Output format for ls/grep (jsonl/raw).
    #[arg(
        long,
        global = true,
        default_value = "jsonl",
        value_name = "FORMAT",
        long_help = "Select how `ls` and `grep` print paths.\n\n\
Supported values:\n\
- jsonl (default): one {\"path\", \"source\", \"backend\"} object per line\n\
- raw: bare paths"
    )]
    pub format: String,

    /// Disable colored output (when applicable).
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (warnings and errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug diagnostics on stderr).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the tree over HTTP.
    #[command(long_about = "Serve the tree over HTTP.\n\n\
Routes: / (redirects to /file/), /file/<path>, /search?sym=<term>&dir=<subdir>.")]
    Serve {
        /// TCP port to listen on.
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,
    },

    /// Render a symbol search page to stdout.
    Search {
        /// Search term.
        sym: String,

        /// Limit the search to a subdirectory.
        #[arg(long, default_value = "", value_name = "SUBDIR")]
        dir: String,
    },

    /// Render a file or directory page to stdout.
    Show {
        /// Path relative to the root (empty for the top directory).
        #[arg(default_value = "")]
        path: String,

        /// Highlight lines where this identifier appears.
        #[arg(long)]
        sym: Option<String>,
    },

    /// List paths as the backend sees them.
    Ls {
        /// Subdirectory to list (output is relative to it).
        #[arg(default_value = "")]
        subdir: String,
    },

    /// List files whose content contains a string.
    Grep {
        /// Literal string to look for.
        sym: String,

        /// Limit the search to a subdirectory.
        #[arg(long, default_value = "", value_name = "SUBDIR")]
        dir: String,
    },

    /// Check external tool availability (grep, git, svn).
    Doctor,
}

fn parse_mount(s: &str) -> std::result::Result<(String, PathBuf), String> {
    let (name, dir) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=DIR, got {:?}", s))?;
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(format!("invalid mount name {:?}", name));
    }
    if dir.is_empty() {
        return Err(format!("missing directory for mount {:?}", name));
    }
    Ok((name.to_string(), PathBuf::from(dir)))
}

/// Two mounts under one name would shadow each other
fn check_unique_mounts(mounts: &[(String, PathBuf)]) -> Result<()> {
    let mut seen = std::collections::BTreeMap::new();
    for (name, dir) in mounts {
        if let Some(previous) = seen.insert(name.as_str(), dir) {
            anyhow::bail!(
                "mount name {:?} given twice ({} and {})",
                name,
                previous.display(),
                dir.display()
            );
        }
    }
    Ok(())
}

/// Run the selected command
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    let options = FileSetOptions {
        case_sensitive: cli.case_sensitive,
    };
    let links = Links::new(&cli.url_root);

    let Cli {
        root,
        mounts,
        command,
        ..
    } = cli;
    check_unique_mounts(&mounts)?;
    let fileset = move || -> Backend {
        if mounts.is_empty() {
            // Get absolute root path
            let root = root.canonicalize().unwrap_or(root);
            make_fileset(&root, options)
        } else {
            make_combined(mounts, options)
        }
    };

    match command {
        Commands::Serve { port, bind } => {
            let state = Arc::new(AppState {
                fileset: fileset(),
                links,
            });
            let runtime = tokio::runtime::Runtime::new().context("cannot start async runtime")?;
            runtime.block_on(server::serve(state, SocketAddr::new(bind, port)))
        }

        Commands::Search { sym, dir } => {
            let subdir = user_path(&dir)?;
            let fileset = fileset();
            render_to_stdout(|sink| sym_search(&fileset, &links, &subdir, &sym, sink))
                .with_context(|| format!("search for {:?} failed", sym))
        }

        Commands::Show { path, sym } => {
            let path = user_path(&path)?;
            let fileset = fileset();
            render_to_stdout(|sink| show_file_or_dir(&fileset, &links, &path, sym.as_deref(), sink))
                .with_context(|| format!("cannot show {:?}", path.as_str()))
        }

        Commands::Ls { subdir } => {
            let subdir = user_path(&subdir)?;
            let fileset = fileset();
            let paths = fileset
                .list_files(&subdir)
                .with_context(|| format!("cannot list {:?}", subdir.as_str()))?;
            print_paths(paths, fileset.kind(), Source::List, format)
        }

        Commands::Grep { sym, dir } => {
            let subdir = user_path(&dir)?;
            let fileset = fileset();
            let paths = fileset
                .grep_files(&subdir, &sym)
                .with_context(|| format!("cannot search {:?}", subdir.as_str()))?;
            print_paths(paths, fileset.kind(), Source::Grep, format)
        }

        Commands::Doctor => crate::backends::doctor::run_doctor(),
    }
}

fn user_path(path: &str) -> Result<RelativePath> {
    RelativePath::new(path).context("rejected path argument")
}

/// Render a page to stdout; a closed pipe just ends the output
fn render_to_stdout<F>(render: F) -> Result<()>
where
    F: FnOnce(&mut dyn Sink) -> crate::core::error::Result<()>,
{
    let stdout = io::stdout();
    let mut sink = WriteSink::new(BufWriter::new(stdout.lock()));
    match render(&mut sink).and_then(|()| sink.flush()) {
        Ok(()) | Err(BrowseError::SinkClosed) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Print backend paths in the selected format
fn print_paths(paths: PathStream<'_>, backend: &str, source: Source, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for path in paths {
        let path = path?;
        let line = match format {
            OutputFormat::Jsonl => {
                serde_json::to_string(&PathRecord::new(path, source, backend))?
            }
            OutputFormat::Raw => path,
        };
        if let Err(e) = writeln!(out, "{}", line) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(e.into());
        }
    }

    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mount() {
        assert_eq!(
            parse_mount("libc=/src/libc").unwrap(),
            ("libc".to_string(), PathBuf::from("/src/libc"))
        );
        assert!(parse_mount("nodir").is_err());
        assert!(parse_mount("=x").is_err());
        assert!(parse_mount("a/b=x").is_err());
        assert!(parse_mount("..=x").is_err());
        assert!(parse_mount("a=").is_err());
    }

    #[test]
    fn test_duplicate_mount_names_rejected() {
        let unique = vec![
            ("a".to_string(), PathBuf::from("/x")),
            ("b".to_string(), PathBuf::from("/x")),
        ];
        assert!(check_unique_mounts(&unique).is_ok());

        let dup = vec![
            ("a".to_string(), PathBuf::from("/x")),
            ("a".to_string(), PathBuf::from("/y")),
        ];
        let err = check_unique_mounts(&dup).unwrap_err().to_string();
        assert!(err.contains("\"a\" given twice"), "{err}");
    }

    #[test]
    fn test_cli_parses_global_options() {
        let cli = Cli::parse_from([
            "sbrowse", "--cs", "-d", "/tmp", "--mount", "a=/x", "serve", "-p", "9000",
        ]);
        assert!(cli.case_sensitive);
        assert_eq!(cli.root, PathBuf::from("/tmp"));
        assert_eq!(cli.mounts.len(), 1);
        match cli.command {
            Commands::Serve { port, bind } => {
                assert_eq!(port, 9000);
                assert_eq!(bind.to_string(), "127.0.0.1");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["sbrowse", "show"]);
        assert!(!cli.case_sensitive);
        assert_eq!(cli.format, "jsonl");
        match cli.command {
            Commands::Show { path, sym } => {
                assert_eq!(path, "");
                assert!(sym.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
