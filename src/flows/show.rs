//! File and directory pages

use tracing::{debug, warn};

use crate::backends::FileSet;
use crate::core::error::{BrowseError, Result};
use crate::core::file_reader::read_lines;
use crate::core::links::{encode_path, Links};
use crate::core::matcher::SymSearch;
use crate::core::paths::{is_excluded_artifact, RelativePath};
use crate::core::render::{tag, tagp, Fragment, Sink};
use crate::core::tokenizer::tokenize;
use crate::flows::crossrefs::{get_file_links, link_fragments};
use crate::flows::page::header;

/// What a browse path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Dir,
    File,
}

/// Classify `path` before any output is produced, `NotFound` if it is neither
pub fn resolve_target(fileset: &dyn FileSet, path: &RelativePath) -> Result<Target> {
    if fileset.is_dir(path) {
        return Ok(Target::Dir);
    }
    fileset.stat_path(path)?;
    Ok(Target::File)
}

pub fn show_file_or_dir(
    fileset: &dyn FileSet,
    links: &Links,
    path: &RelativePath,
    sym: Option<&str>,
    sink: &mut dyn Sink,
) -> Result<()> {
    match resolve_target(fileset, path)? {
        Target::Dir => show_dir(fileset, links, path, sink),
        Target::File => show_file(fileset, links, path, sym, sink),
    }
}

/// A file with every identifier linked. With a non-empty `sym`, lines where it
/// appears are highlighted and listed at the top.
pub fn show_file(
    fileset: &dyn FileSet,
    links: &Links,
    path: &RelativePath,
    sym: Option<&str>,
    sink: &mut dyn Sink,
) -> Result<()> {
    debug!(path = %path, sym = ?sym, "showing file");
    let crossrefs = link_fragments(&get_file_links(fileset, path));
    header(sink, links, path.as_str(), path, "", crossrefs)?;

    match sym.filter(|s| !s.is_empty()) {
        Some(sym) => show_highlighted(fileset, links, path, sym, sink)?,
        None => show_plain(fileset, links, path, sink)?,
    }
    sink.flush()
}

fn show_highlighted(
    fileset: &dyn FileSet,
    links: &Links,
    path: &RelativePath,
    sym: &str,
    sink: &mut dyn Sink,
) -> Result<()> {
    // First pass: where the matches are
    let mut matcher = SymSearch::new(sym, links.clone());
    let mut match_line_nos = Vec::new();
    for (line_no, line) in read_lines(fileset.open_file(path)?).enumerate() {
        let (does_match, _) = matcher.match_line(&line?);
        if does_match {
            match_line_nos.push(line_no + 1);
        }
    }

    let jump_list: Vec<Fragment> = match_line_nos
        .iter()
        .flat_map(|n| {
            [
                tagp(
                    "a",
                    &[("href", format!("#line{}", n).as_str())],
                    Fragment::raw(n.to_string()),
                ),
                Fragment::raw(" "),
            ]
        })
        .collect();
    sink.emit_fragment(&tagp("div", &[("class", "box")], jump_list))?;

    // Second pass: the content
    let mut matcher = SymSearch::new(sym, links.clone());
    sink.emit("<pre class=code>")?;
    for (line_no, line) in read_lines(fileset.open_file(path)?).enumerate() {
        let (does_match, rendered) = matcher.match_line(&line?);
        sink.emit(if does_match {
            "<span class=highlight>"
        } else {
            "<span>"
        })?;
        sink.emit(&format!("<a name='line{}'></a>", line_no + 1))?;
        sink.emit_all(&rendered)?;
        sink.emit("</span>\n")?;
    }
    sink.emit("</pre>")
}

fn show_plain(
    fileset: &dyn FileSet,
    links: &Links,
    path: &RelativePath,
    sink: &mut dyn Sink,
) -> Result<()> {
    sink.emit("<pre class=code>")?;
    for (line_no, line) in read_lines(fileset.open_file(path)?).enumerate() {
        let line = line?;
        sink.emit(&format!("<a name='line{}'></a>", line_no + 1))?;
        for token in tokenize(&line) {
            if token.is_identifier {
                sink.emit_fragment(&links.link_token(token.text))?;
            } else if !token.text.is_empty() {
                sink.emit_fragment(&Fragment::text(token.text))?;
            }
        }
        sink.emit("\n")?;
    }
    sink.emit("</pre>")
}

/// Directory listing: one row per entry with size and a relative link
pub fn show_dir(
    fileset: &dyn FileSet,
    links: &Links,
    path: &RelativePath,
    sink: &mut dyn Sink,
) -> Result<()> {
    debug!(path = %path, "showing directory");
    let title = if path.is_root() { "[top]" } else { path.as_str() };
    header(sink, links, title, path, "", Vec::new())?;

    let mut names = fileset.list_dir(path)?;
    names.sort();

    sink.emit("<table class='dirlist'>")?;
    sink.emit_fragment(&tag(
        "tr",
        vec![
            tagp("th", &[("class", "file-size")], "size"),
            tagp("th", &[("class", "file-name")], "name"),
        ],
    ))?;
    for leaf in names.iter().filter(|n| !is_excluded_artifact(n)) {
        let child = match path.join(leaf) {
            Ok(child) => child,
            Err(e) => {
                warn!(leaf = %leaf, error = %e, "ignoring directory entry");
                continue;
            }
        };
        sink.emit_fragment(&format_entry(fileset, &child, leaf))?;
    }
    sink.emit("</table>")?;
    sink.flush()
}

fn format_entry(fileset: &dyn FileSet, child: &RelativePath, leaf: &str) -> Fragment {
    let (size, name) = if fileset.is_dir(child) {
        (String::new(), format!("{}/", leaf))
    } else {
        let size = match fileset.stat_path(child) {
            Ok(size) => size.to_string(),
            Err(BrowseError::NotFound(_)) => String::new(),
            Err(e) => {
                warn!(path = %child, error = %e, "cannot stat directory entry");
                String::new()
            }
        };
        (size, leaf.to_string())
    };

    let href = encode_path(&name);
    tag(
        "tr",
        vec![
            tagp("td", &[("class", "file-size")], Fragment::text(&size)),
            tagp(
                "td",
                &[("class", "file-name")],
                tagp("a", &[("href", href.as_str())], Fragment::text(&name)),
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fs::FsFileSet;
    use std::fs;
    use tempfile::TempDir;

    fn example_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub dir")).unwrap();
        fs::write(dir.path().join("main.c"), "int foo;\nfoo = bar < 2;\nint Food;\n").unwrap();
        fs::write(dir.path().join("b.txt"), "12345").unwrap();
        fs::write(dir.path().join("main.c~"), "backup").unwrap();
        fs::write(dir.path().join("#main.c#"), "lock").unwrap();
        dir
    }

    fn rel(p: &str) -> RelativePath {
        RelativePath::new(p).unwrap()
    }

    fn show(dir: &TempDir, path: &str, sym: Option<&str>) -> String {
        let fileset = FsFileSet::new(dir.path(), false);
        let mut out = String::new();
        show_file_or_dir(&fileset, &Links::new(""), &rel(path), sym, &mut out).unwrap();
        out
    }

    #[test]
    fn test_resolve_target() {
        let dir = example_tree();
        let fileset = FsFileSet::new(dir.path(), false);
        assert_eq!(resolve_target(&fileset, &rel("")).unwrap(), Target::Dir);
        assert_eq!(resolve_target(&fileset, &rel("sub dir")).unwrap(), Target::Dir);
        assert_eq!(resolve_target(&fileset, &rel("main.c")).unwrap(), Target::File);
        assert!(matches!(
            resolve_target(&fileset, &rel("missing")),
            Err(BrowseError::NotFound(_))
        ));
    }

    #[test]
    fn test_plain_file() {
        let dir = example_tree();
        let out = show(&dir, "main.c", None);
        assert!(out.contains("<title>main.c</title>"));
        assert!(out.contains(
            "<pre class=code><a name='line1'></a><a href='/search?dir=&amp;sym=int'>int</a> "
        ));
        assert!(out.contains("<a name='line2'></a>"));
        assert!(out.contains(" &lt; "));
        assert!(out.ends_with("</pre>"));
        assert!(!out.contains("highlight"));
    }

    #[test]
    fn test_highlighted_file() {
        let dir = example_tree();
        let out = show(&dir, "main.c", Some("foo"));
        assert!(out.contains("<div class='box'><a href='#line1'>1</a> <a href='#line2'>2</a> </div>"));
        assert!(out.contains("<span class=highlight><a name='line1'></a>"));
        assert!(out.contains("<span class=highlight><a name='line2'></a><strong>foo</strong>"));
        assert!(out.contains("<span><a name='line3'></a>"));
    }

    #[test]
    fn test_empty_sym_is_plain() {
        let dir = example_tree();
        assert_eq!(show(&dir, "main.c", Some("")), show(&dir, "main.c", None));
    }

    #[test]
    fn test_directory_listing() {
        let dir = example_tree();
        let out = show(&dir, "", None);
        assert!(out.contains("<title>[top]</title>"));
        assert!(out.contains(
            "<table class='dirlist'><tr><th class='file-size'>size</th><th class='file-name'>name</th></tr>"
        ));
        assert!(out.contains(
            "<tr><td class='file-size'>5</td><td class='file-name'><a href='b.txt'>b.txt</a></td></tr>"
        ));
        assert!(out.contains(
            "<tr><td class='file-size'></td><td class='file-name'><a href='sub%20dir/'>sub dir/</a></td></tr>"
        ));
        assert!(!out.contains("main.c~"));
        assert!(!out.contains("#main.c#"));

        let b = out.find("b.txt").unwrap();
        let m = out.find(">main.c<").unwrap();
        let s = out.find("sub dir/").unwrap();
        assert!(b < m && m < s);
    }

    #[test]
    fn test_subdirectory_title() {
        let dir = example_tree();
        let out = show(&dir, "sub dir", None);
        assert!(out.contains("<title>sub dir</title>"));
        assert!(out.contains("</tr></table>"));
    }

    #[test]
    fn test_missing_path() {
        let dir = example_tree();
        let fileset = FsFileSet::new(dir.path(), false);
        let mut out = String::new();
        let err = show_file_or_dir(&fileset, &Links::new(""), &rel("nope"), None, &mut out)
            .unwrap_err();
        assert!(matches!(err, BrowseError::NotFound(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_crossrefs_in_header() {
        let dir = example_tree();
        fs::write(dir.path().join("crossrefs.sbrowse"), "web:http://h/%s\n").unwrap();
        let out = show(&dir, "main.c", None);
        assert!(out.contains("<div><a href='http://h/main.c'>web</a></div></div>"));
    }
}
