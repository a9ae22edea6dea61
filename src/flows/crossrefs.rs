//! Cross-reference links from `crossrefs.sbrowse` files
//!
//! A `crossrefs.sbrowse` file holds `name:url_template` lines. For a file
//! `a/b/c.rs`, a crossrefs file in `a/` contributes links whose template has
//! its first `%s` replaced by `b/c.rs`.

use tracing::warn;

use crate::backends::FileSet;
use crate::core::error::BrowseError;
use crate::core::file_reader::read_lines;
use crate::core::paths::{ancestor_splits, RelativePath};
use crate::core::render::{tag, tagp, Fragment};

pub const CROSSREFS_FILE: &str = "crossrefs.sbrowse";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRef {
    pub name: String,
    pub url: String,
}

/// Links for `path`, nearest directory first
pub fn get_file_links(fileset: &dyn FileSet, path: &RelativePath) -> Vec<CrossRef> {
    let mut links = Vec::new();

    for (dir, rest) in ancestor_splits(path) {
        let link_file = match RelativePath::new(&dir).and_then(|d| d.join(CROSSREFS_FILE)) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let file = match fileset.open_file(&link_file) {
            Ok(f) => f,
            Err(BrowseError::NotFound(_)) => continue,
            Err(e) => {
                warn!(file = %link_file, error = %e, "cannot read cross-reference file");
                continue;
            }
        };

        for (line_no, line) in read_lines(file).enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!(file = %link_file, error = %e, "cannot read cross-reference file");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line, &rest) {
                Some(link) => links.push(link),
                None => warn!(
                    file = %link_file,
                    line = line_no + 1,
                    "skipping cross-reference line without ':'"
                ),
            }
        }
    }

    links
}

fn parse_line(line: &str, rest: &str) -> Option<CrossRef> {
    let (name, template) = line.split_once(':')?;
    Some(CrossRef {
        name: name.trim().to_string(),
        url: template.trim().replacen("%s", rest, 1),
    })
}

/// One `<div><a href=...>name</a></div>` per link
pub fn link_fragments(links: &[CrossRef]) -> Vec<Fragment> {
    links
        .iter()
        .map(|link| {
            tag(
                "div",
                tagp("a", &[("href", link.url.as_str())], Fragment::text(&link.name)),
            )
        })
        .collect()
}
