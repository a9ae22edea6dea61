//! Symbol search page
//!
//! Three parts, streamed in order: files whose name contains the term, lines
//! containing the term as a whole identifier (found with the backend's grep
//! and re-checked with the symbol matcher), and a summary of the other
//! identifiers seen that contain the term.

use std::collections::BTreeMap;

use regex::RegexBuilder;
use tracing::{debug, warn};

use crate::backends::FileSet;
use crate::core::error::{BrowseError, Result};
use crate::core::file_reader::read_lines;
use crate::core::links::Links;
use crate::core::matcher::SymSearch;
use crate::core::paths::RelativePath;
use crate::core::render::{tag, tagp, Fragment, Sink};
use crate::flows::page::header;

/// Render the search page for `sym` under `subdir`
pub fn sym_search(
    fileset: &dyn FileSet,
    links: &Links,
    subdir: &RelativePath,
    sym: &str,
    sink: &mut dyn Sink,
) -> Result<()> {
    header(
        sink,
        links,
        &format!("symbol: {}", sym),
        &RelativePath::root(),
        sym,
        Vec::new(),
    )?;

    if sym.is_empty() {
        sink.emit("none")?;
        return sink.flush();
    }

    debug!(sym, subdir = %subdir, backend = fileset.kind(), "searching");
    search_in_filenames(fileset, links, subdir, sym, sink)?;

    let scoped = links.scoped(subdir);
    let mut matcher = SymSearch::new(sym, scoped.clone());
    search_in_contents(fileset, &scoped, subdir, &mut matcher, sink)?;
    other_symbols(&scoped, &matcher, sink)?;
    sink.flush()
}

/// Files whose path contains the term, case ignored, with the match in `<strong>`
fn search_in_filenames(
    fileset: &dyn FileSet,
    links: &Links,
    subdir: &RelativePath,
    sym: &str,
    sink: &mut dyn Sink,
) -> Result<()> {
    let sym_regex = RegexBuilder::new(&regex::escape(sym))
        .case_insensitive(true)
        .build()
        .map_err(|e| BrowseError::Io(std::io::Error::other(e)))?;

    sink.emit("<pre class=code>")?;
    for rel in fileset.list_files(subdir)? {
        let rel = rel?;
        let Some(m) = sym_regex.find(&rel) else {
            continue;
        };
        let Some(path) = join_reported(subdir, &rel) else {
            continue;
        };

        let text = vec![
            Fragment::text(&rel[..m.start()]),
            tag("strong", Fragment::text(m.as_str())),
            Fragment::text(&rel[m.end()..]),
        ];
        sink.emit_fragment(&tagp("a", &[("href", links.file_url(path.as_str()).as_str())], text))?;
        sink.emit("\n")?;
    }
    sink.emit("</pre>")
}

/// Lines where the term appears as a whole identifier, grouped by file
fn search_in_contents(
    fileset: &dyn FileSet,
    links: &Links,
    subdir: &RelativePath,
    matcher: &mut SymSearch,
    sink: &mut dyn Sink,
) -> Result<()> {
    let sym = matcher.sym().to_string();

    sink.emit("<div class=all_matches>")?;
    for rel in fileset.grep_files(subdir, &sym)? {
        let rel = rel?;
        let Some(path) = join_reported(subdir, &rel) else {
            continue;
        };
        let file = match fileset.open_file(&path) {
            Ok(f) => f,
            Err(BrowseError::NotFound(_)) => {
                warn!(path = %path, "file reported by search no longer exists");
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut file_matches = false;
        for found in matcher.match_lines(read_lines(file)) {
            let (line_no, rendered) = found?;
            let url = links.line_url(path.as_str(), &sym, line_no + 1);
            if !file_matches {
                file_matches = true;
                sink.emit_fragment(&tagp("a", &[("href", url.as_str())], Fragment::text(&rel)))?;
                sink.emit(":")?;
            }
            sink.emit("<div class='code matches_in_file'>")?;
            sink.emit_fragment(&tagp(
                "a",
                &[("href", url.as_str())],
                Fragment::raw((line_no + 1).to_string()),
            ))?;
            sink.emit(":")?;
            sink.emit_all(&rendered)?;
            sink.emit("</div>\n")?;
        }
    }
    sink.emit("</div>")
}

/// Summary of identifiers containing the term, exact case first
fn other_symbols(links: &Links, matcher: &SymSearch, sink: &mut dyn Sink) -> Result<()> {
    sink.emit("<hr>Other symbols found:\n")?;

    let exact = matcher.exact_matches();
    let relaxed = matcher.ci_matches();
    if exact.is_empty() && relaxed.is_empty() {
        return sink.emit("none");
    }
    if !exact.is_empty() {
        sink.emit_fragment(&format_sym_list(links, exact))?;
    }
    if !relaxed.is_empty() {
        sink.emit("with case relaxed:\n")?;
        sink.emit_fragment(&format_sym_list(links, relaxed))?;
    }
    Ok(())
}

/// `<ul>` of search links with counts, in identifier order
fn format_sym_list(links: &Links, syms: &BTreeMap<String, usize>) -> Fragment {
    let items = syms
        .iter()
        .map(|(symbol, count)| {
            tag(
                "li",
                vec![
                    links.link_token(symbol),
                    Fragment::raw(format!(" ({})", count)),
                ],
            )
        })
        .collect::<Vec<_>>();
    tag("ul", items)
}

/// Path reported by a backend tool, relative to the backend root
fn join_reported(subdir: &RelativePath, rel: &str) -> Option<RelativePath> {
    match subdir.join(rel) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(path = rel, error = %e, "ignoring path reported by backend");
            None
        }
    }
}
