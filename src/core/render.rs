//! HTML fragments and output sinks
//!
//! Pages are produced as a stream of small chunks pushed into a [`Sink`]
//! rather than built as one string. A [`Fragment`] is a tree of chunks that
//! are already safe to embed: untrusted text only gets in through
//! [`Fragment::text`] or attribute values passed to [`tagp`].

use std::borrow::Cow;
use std::io::Write;

use crate::core::error::{BrowseError, Result};

/// Escaped HTML, possibly nested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Html(Cow<'static, str>),
    Seq(Vec<Fragment>),
}

impl Fragment {
    /// Markup written by us (tags, fixed labels)
    pub fn raw(markup: impl Into<Cow<'static, str>>) -> Self {
        Fragment::Html(markup.into())
    }

    /// Untrusted text, escaped for element content
    pub fn text(text: &str) -> Self {
        Fragment::Html(Cow::Owned(html_escape::encode_text(text).into_owned()))
    }

    pub fn empty() -> Self {
        Fragment::Seq(Vec::new())
    }

    /// Flatten to a single string
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        match self {
            Fragment::Html(chunk) => out.push_str(chunk),
            Fragment::Seq(children) => {
                for child in children {
                    child.write_into(out);
                }
            }
        }
    }
}

impl From<&'static str> for Fragment {
    fn from(markup: &'static str) -> Self {
        Fragment::raw(markup)
    }
}

impl From<Vec<Fragment>> for Fragment {
    fn from(children: Vec<Fragment>) -> Self {
        Fragment::Seq(children)
    }
}

/// `<name>body</name>`
pub fn tag(name: &str, body: impl Into<Fragment>) -> Fragment {
    tagp(name, &[], body)
}

/// `<name key='value' ...>body</name>`, attribute values escaped
pub fn tagp(name: &str, attrs: &[(&str, &str)], body: impl Into<Fragment>) -> Fragment {
    let mut open = format!("<{}", name);
    for (key, value) in attrs {
        open.push_str(&format!(
            " {}='{}'",
            key,
            html_escape::encode_single_quoted_attribute(value)
        ));
    }
    open.push('>');

    Fragment::Seq(vec![
        Fragment::raw(open),
        body.into(),
        Fragment::raw(format!("</{}>", name)),
    ])
}

/// Consumer of rendered output, written to in order and never rewound
pub trait Sink {
    fn emit(&mut self, chunk: &str) -> Result<()>;

    fn emit_fragment(&mut self, fragment: &Fragment) -> Result<()> {
        match fragment {
            Fragment::Html(chunk) => self.emit(chunk),
            Fragment::Seq(children) => {
                for child in children {
                    self.emit_fragment(child)?;
                }
                Ok(())
            }
        }
    }

    fn emit_all(&mut self, fragments: &[Fragment]) -> Result<()> {
        for fragment in fragments {
            self.emit_fragment(fragment)?;
        }
        Ok(())
    }

    /// Push out anything buffered
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Sink for String {
    fn emit(&mut self, chunk: &str) -> Result<()> {
        self.push_str(chunk);
        Ok(())
    }
}

/// Sink over any writer (stdout for the CLI)
pub struct WriteSink<W: Write> {
    writer: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[allow(dead_code)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriteSink<W> {
    fn emit(&mut self, chunk: &str) -> Result<()> {
        self.writer.write_all(chunk.as_bytes()).map_err(sink_error)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(sink_error)
    }
}

fn sink_error(err: std::io::Error) -> BrowseError {
    if err.kind() == std::io::ErrorKind::BrokenPipe {
        BrowseError::SinkClosed
    } else {
        BrowseError::Io(err)
    }
}
