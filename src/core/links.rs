//! URL construction for pages
//!
//! All links are absolute from `url_root` (the prefix the server is mounted
//! under) except directory rows, which are relative to the listing page.

use crate::core::paths::RelativePath;
use crate::core::render::{tagp, Fragment};

/// Builds the links a page points at
#[derive(Debug, Clone, Default)]
pub struct Links {
    url_root: String,
    subdir: RelativePath,
}

impl Links {
    pub fn new(url_root: &str) -> Self {
        Self {
            url_root: url_root.trim_end_matches('/').to_string(),
            subdir: RelativePath::root(),
        }
    }

    /// Same root, with searches scoped to `subdir`
    pub fn scoped(&self, subdir: &RelativePath) -> Self {
        Self {
            url_root: self.url_root.clone(),
            subdir: subdir.clone(),
        }
    }

    pub fn url_root(&self) -> &str {
        &self.url_root
    }

    /// `{root}/search?dir=...&sym=...`
    pub fn search_url(&self, sym: &str) -> String {
        format!(
            "{}/search?dir={}&sym={}",
            self.url_root,
            urlencoding::encode(self.subdir.as_str()),
            urlencoding::encode(sym)
        )
    }

    /// `{root}/file/{path}`, each segment percent-encoded
    pub fn file_url(&self, path: &str) -> String {
        format!("{}/file/{}", self.url_root, encode_path(path))
    }

    /// Link to a line of a file, carrying the search term for highlighting
    pub fn line_url(&self, path: &str, sym: &str, line_no: usize) -> String {
        format!(
            "{}?sym={}#line{}",
            self.file_url(path),
            urlencoding::encode(sym),
            line_no
        )
    }

    /// An identifier rendered as a link that searches for it
    pub fn link_token(&self, token: &str) -> Fragment {
        tagp("a", &[("href", self.search_url(token).as_str())], Fragment::text(token))
    }
}

/// Percent-encode each '/'-separated segment, keeping the separators
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
