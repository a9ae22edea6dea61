//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Error kinds shared by every layer
//! - Path validation (the only way to build a `RelativePath`)
//! - The lexical tokenizer and the symbol matcher built on it
//! - HTML fragments, output sinks and link construction
//! - Line-by-line file reading
//! - Common utilities

pub mod error;
pub mod file_reader;
pub mod links;
pub mod matcher;
pub mod model;
pub mod paths;
pub mod render;
pub mod tokenizer;
pub mod util;
