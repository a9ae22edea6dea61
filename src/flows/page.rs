//! Page furniture: stylesheet, breadcrumbs, search form and the header box

use crate::core::error::Result;
use crate::core::links::Links;
use crate::core::paths::RelativePath;
use crate::core::render::{tag, tagp, Fragment, Sink};

const STYLESHEET: &str = include_str!("../../assets/styles.css");

const FOCUS_SCRIPT: &str = r#"
window.onload = function () {
    document.getElementById("form_field").focus();
}
"#;

pub fn stylesheet() -> Fragment {
    Fragment::Seq(vec![
        Fragment::raw("<style type='text/css'>\n"),
        Fragment::raw(STYLESHEET),
        Fragment::raw("</style>\n"),
    ])
}

/// Search box submitting `sym` to `{url_root}/search`, focused on load
pub fn search_form(links: &Links, default_sym: &str) -> Fragment {
    let action = format!("{}/search", links.url_root());
    tagp(
        "form",
        &[("action", action.as_str()), ("method", "get")],
        vec![
            tagp(
                "input",
                &[
                    ("id", "form_field"),
                    ("type", "text"),
                    ("name", "sym"),
                    ("value", default_sym),
                ],
                Fragment::empty(),
            ),
            tagp("button", &[("type", "submit")], "Go"),
            tagp("script", &[("language", "javascript")], FOCUS_SCRIPT),
        ],
    )
}

/// `[top]` followed by a link for each segment of `path`
pub fn breadcrumb_path(links: &Links, path: &RelativePath) -> Fragment {
    let mut crumbs = vec![tagp("a", &[("href", links.file_url("").as_str())], "[top]")];

    let mut path_got = String::new();
    for segment in path.segments() {
        if !path_got.is_empty() {
            path_got.push('/');
        }
        path_got.push_str(segment);
        crumbs.push(Fragment::raw("/"));
        crumbs.push(tagp(
            "a",
            &[("href", links.file_url(&path_got).as_str())],
            Fragment::text(segment),
        ));
    }
    Fragment::Seq(crumbs)
}

/// Stylesheet, `<title>` and the box with breadcrumbs, search form and `extra`
pub fn header(
    sink: &mut dyn Sink,
    links: &Links,
    title: &str,
    path: &RelativePath,
    default_sym: &str,
    extra: Vec<Fragment>,
) -> Result<()> {
    sink.emit_fragment(&stylesheet())?;

    let mut box_body = vec![
        tag("div", breadcrumb_path(links, path)),
        tag("div", search_form(links, default_sym)),
    ];
    box_body.extend(extra);

    sink.emit_fragment(&tag("title", Fragment::text(title)))?;
    sink.emit_fragment(&tagp("div", &[("class", "box")], box_body))
}
