//! Error kinds raised by the browsing core
//!
//! The core never formats errors for a particular front end: the CLI wraps
//! them with `anyhow` context and the HTTP layer maps them to status codes.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowseError>;

#[derive(Debug, Error)]
pub enum BrowseError {
    /// An absolute path or a `..` segment reached the core
    #[error("illegal path {path:?}: {reason}")]
    PathSecurity { path: String, reason: &'static str },

    /// The requested path does not exist in the backend
    #[error("not found: {0}")]
    NotFound(String),

    /// An external enumeration/search tool exited unsuccessfully
    #[error("{tool} failed ({status}){}", format_stderr(.stderr))]
    ToolFailure {
        tool: String,
        status: String,
        stderr: String,
    },

    /// An external tool could not be started at all
    #[error("failed to run {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The consumer of rendered output went away
    #[error("output closed by consumer")]
    SinkClosed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl BrowseError {
    /// Convert an I/O error on `path`, keeping "does not exist" distinct
    pub fn at_path(path: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            BrowseError::NotFound(path.to_string())
        } else {
            BrowseError::Io(err)
        }
    }

    /// Whether the failure is the client's fault (bad path) rather than ours
    pub fn is_client_error(&self) -> bool {
        matches!(self, BrowseError::PathSecurity { .. })
    }
}
