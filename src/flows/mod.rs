//! Flows module - Pages combining a backend, the matcher and the renderer
//!
//! Provides:
//! - search: symbol search across a subtree
//! - show: file display and directory listing
//! - crossrefs: links from `crossrefs.sbrowse` files
//! - page: stylesheet, breadcrumbs and search form

pub mod crossrefs;
pub mod page;
pub mod search;
pub mod show;
