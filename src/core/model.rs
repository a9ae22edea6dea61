//! Shared data types
//!
//! Tokens produced by the tokenizer and the records emitted by `ls`/`grep`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One lexical span of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub is_identifier: bool,
}

impl<'a> Token<'a> {
    pub fn text(text: &'a str) -> Self {
        Self {
            text,
            is_identifier: false,
        }
    }

    pub fn identifier(text: &'a str) -> Self {
        Self {
            text,
            is_identifier: true,
        }
    }
}

/// How a path record was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Backend enumeration
    List,
    /// Backend content search
    Grep,
}

/// A path reported by a backend, as printed by `ls` and `grep`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    /// Path relative to the requested subdirectory, using '/' as separator
    pub path: String,

    pub source: Source,

    /// Backend that produced the record (fs/git/svn/combined)
    pub backend: String,
}

impl PathRecord {
    pub fn new(path: impl Into<String>, source: Source, backend: &str) -> Self {
        Self {
            path: path.into(),
            source,
            backend: backend.to_string(),
        }
    }
}

/// How `ls` and `grep` print paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// Bare paths, one per line
    Raw,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_constructors() {
        assert!(Token::identifier("foo").is_identifier);
        assert!(!Token::text(" + ").is_identifier);
    }

    #[test]
    fn test_path_record_serialization() {
        let record = PathRecord::new("src/main.rs", Source::Grep, "git");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"path":"src/main.rs","source":"grep","backend":"git"}"#
        );
    }

    #[test]
    fn test_path_record_deserialization() {
        let json = r#"{"path":"foo","source":"list","backend":"fs"}"#;
        let record: PathRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.path, "foo");
        assert_eq!(record.source, Source::List);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("jsonl".parse::<OutputFormat>().unwrap(), OutputFormat::Jsonl);
        assert_eq!("RAW".parse::<OutputFormat>().unwrap(), OutputFormat::Raw);
        assert!("md".parse::<OutputFormat>().is_err());
    }
}
