//! Symbol matcher
//!
//! One [`SymSearch`] lives for one search or highlighted file view. It renders
//! lines with the search term in `<strong>` and every other identifier as a
//! search link, and keeps count of the other identifiers that contain the term.

use std::collections::BTreeMap;
use std::io;

use regex::{Regex, RegexBuilder};

use crate::core::error::Result;
use crate::core::links::Links;
use crate::core::render::{tag, Fragment};
use crate::core::tokenizer::tokenize;

pub struct SymSearch {
    sym: String,
    sym_lower: String,
    /// Case-insensitive line pre-filter; `None` only if the term could not be compiled
    prefilter: Option<Regex>,
    links: Links,
    exact_matches: BTreeMap<String, usize>,
    ci_matches: BTreeMap<String, usize>,
}

impl SymSearch {
    pub fn new(sym: &str, links: Links) -> Self {
        let prefilter = RegexBuilder::new(&regex::escape(sym))
            .case_insensitive(true)
            .build()
            .ok();
        Self {
            sym: sym.to_string(),
            sym_lower: sym.to_lowercase(),
            prefilter,
            links,
            exact_matches: BTreeMap::new(),
            ci_matches: BTreeMap::new(),
        }
    }

    pub fn sym(&self) -> &str {
        &self.sym
    }

    /// Render one line. The flag is true when some identifier equals the term exactly.
    pub fn match_line(&mut self, line: &str) -> (bool, Vec<Fragment>) {
        let mut does_match = false;
        let mut out = Vec::new();

        for token in tokenize(line) {
            if !token.is_identifier {
                if !token.text.is_empty() {
                    out.push(Fragment::text(token.text));
                }
                continue;
            }
            if !self.sym.is_empty() && token.text == self.sym {
                out.push(tag("strong", Fragment::text(token.text)));
                does_match = true;
                continue;
            }

            out.push(self.links.link_token(token.text));
            if self.sym.is_empty() {
                continue;
            }
            if token.text.contains(self.sym.as_str()) {
                *self.exact_matches.entry(token.text.to_string()).or_insert(0) += 1;
            } else if token.text.to_lowercase().contains(&self.sym_lower) {
                *self.ci_matches.entry(token.text.to_string()).or_insert(0) += 1;
            }
        }

        (does_match, out)
    }

    fn might_match(&self, line: &str) -> bool {
        match &self.prefilter {
            Some(re) => re.is_match(line),
            None => true,
        }
    }

    /// Matching lines of a file as `(zero-based line number, rendered line)`.
    ///
    /// Read errors are yielded as they happen and end the sequence.
    pub fn match_lines<'s, I>(&'s mut self, lines: I) -> MatchLines<'s, I::IntoIter>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        MatchLines {
            search: self,
            lines: lines.into_iter().enumerate(),
            failed: false,
        }
    }

    /// Identifiers containing the term with the same case, with counts
    pub fn exact_matches(&self) -> &BTreeMap<String, usize> {
        &self.exact_matches
    }

    /// Identifiers containing the term only when case is ignored
    pub fn ci_matches(&self) -> &BTreeMap<String, usize> {
        &self.ci_matches
    }
}

pub struct MatchLines<'s, I> {
    search: &'s mut SymSearch,
    lines: std::iter::Enumerate<I>,
    failed: bool,
}

impl<I> Iterator for MatchLines<'_, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<(usize, Vec<Fragment>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        for (line_no, line) in self.lines.by_ref() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e.into()));
                }
            };
            if !self.search.might_match(&line) {
                continue;
            }
            let (does_match, rendered) = self.search.match_line(&line);
            if does_match {
                return Some(Ok((line_no, rendered)));
            }
        }
        None
    }
}
