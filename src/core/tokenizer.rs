//! Lexical tokenizer
//!
//! Splits a line into alternating runs of non-identifier text and identifiers
//! (`[A-Za-z0-9_]+`). No knowledge of comments, strings or any language: the
//! same rules apply to every file.

use crate::core::model::Token;

/// Tokenize a line. The iterator is lazy and can be cloned to restart.
pub fn tokenize(line: &str) -> Tokens<'_> {
    Tokens {
        line,
        pos: 0,
        pending: None,
        done: false,
    }
}

#[inline]
fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Iterator over the tokens of one line.
///
/// Concatenating every token's text gives back the line. The non-identifier
/// token before an identifier is skipped when empty; the trailing
/// non-identifier token is always produced, even when empty.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    line: &'a str,
    pos: usize,
    pending: Option<Token<'a>>,
    done: bool,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        if self.done {
            return None;
        }

        // Identifier bytes are ASCII, so every boundary found here is a char boundary.
        let bytes = self.line.as_bytes();
        let start = self.pos;
        let ident_start = match bytes[start..].iter().position(|&b| is_identifier_byte(b)) {
            Some(offset) => start + offset,
            None => {
                self.done = true;
                self.pos = bytes.len();
                return Some(Token::text(&self.line[start..]));
            }
        };
        let ident_end = bytes[ident_start..]
            .iter()
            .position(|&b| !is_identifier_byte(b))
            .map(|offset| ident_start + offset)
            .unwrap_or(bytes.len());
        self.pos = ident_end;

        let identifier = Token::identifier(&self.line[ident_start..ident_end]);
        if ident_start == start {
            Some(identifier)
        } else {
            self.pending = Some(identifier);
            Some(Token::text(&self.line[start..ident_start]))
        }
    }
}
