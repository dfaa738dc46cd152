//! Line scanners.
//!
//! A [`Scanner`] is a pure function from one line of text to the tokens on
//! that line. Because scanning never looks past the end of a line, the
//! [`Lexer`](crate::Lexer) can re-scan an edited window and get the same
//! result a whole-file scan would.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::token::{Location, Token, TokenKind, TokenSubtype};

/// Tokenization strategy for one kind of file.
pub trait Scanner: fmt::Debug + Send + Sync {
    /// Append the tokens found on `line` to `out`.
    ///
    /// `line_index` is stamped into every token's location.
    fn scan_line(&self, line: &str, line_index: u32, out: &mut Vec<Token>);
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "lines are far shorter than u32::MAX bytes"
)]
#[inline]
fn column(offset: usize) -> u32 {
    offset as u32
}

/// Byte offset of the first char at or after `pos` failing `pred`.
fn scan_while(line: &str, pos: usize, pred: impl Fn(char) -> bool) -> usize {
    line[pos..]
        .char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(line.len(), |(i, _)| pos + i)
}

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scanner for prose: words and single punctuation characters.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextScanner;

impl Scanner for PlainTextScanner {
    fn scan_line(&self, line: &str, line_index: u32, out: &mut Vec<Token>) {
        let mut pos = 0;
        while let Some(ch) = line[pos..].chars().next() {
            let start = pos;
            if ch.is_whitespace() {
                pos += ch.len_utf8();
                continue;
            }
            let kind = if is_ident_continue(ch) {
                pos = scan_while(line, pos, |c| is_ident_continue(c) || c == '\'');
                TokenKind::Text
            } else {
                pos += ch.len_utf8();
                TokenKind::Punctuation
            };
            out.push(Token::new(
                &line[start..pos],
                Location::new(line_index, column(start)),
                kind,
            ));
        }
    }
}

/// Multi-character operators, longest first so the first match wins.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "...", "->", "=>", "==", "!=", "<=", ">=", "::", "..", "&&", "||", "<<", ">>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
];

/// Scanner for symbol languages: identifiers, keywords, numbers, strings,
/// line comments, and operators.
#[derive(Clone, Debug, Default)]
pub struct SymbolScanner {
    keywords: FxHashSet<String>,
}

impl SymbolScanner {
    /// A scanner with no reserved words.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scanner that classifies `keywords` as [`TokenKind::Reserved`].
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SymbolScanner {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(word)
    }

    /// Digits, letters, and underscores; `.` only when a digit follows.
    fn number(line: &str, mut pos: usize) -> usize {
        let bytes = line.as_bytes();
        while pos < bytes.len() {
            let b = bytes[pos];
            let fraction = b == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
            if b.is_ascii_alphanumeric() || b == b'_' || fraction {
                pos += 1;
            } else {
                break;
            }
        }
        pos
    }

    /// Returns the end offset and whether the closing quote was found.
    fn quote(line: &str, start: usize) -> (usize, bool) {
        let mut escaped = false;
        for (i, c) in line[start + 1..].char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return (start + 1 + i + 1, true),
                _ => {}
            }
        }
        (line.len(), false)
    }

    fn operator(rest: &str) -> usize {
        OPERATORS
            .iter()
            .find(|op| rest.starts_with(*op))
            .map_or_else(|| rest.chars().next().map_or(0, char::len_utf8), |op| op.len())
    }
}

impl Scanner for SymbolScanner {
    fn scan_line(&self, line: &str, line_index: u32, out: &mut Vec<Token>) {
        let mut pos = 0;
        while let Some(ch) = line[pos..].chars().next() {
            let start = pos;
            let mut subtype = TokenSubtype::Normal;
            let kind = if ch.is_whitespace() {
                pos += ch.len_utf8();
                continue;
            } else if is_ident_start(ch) {
                pos = scan_while(line, pos, is_ident_continue);
                if self.is_keyword(&line[start..pos]) {
                    TokenKind::Reserved
                } else {
                    TokenKind::Identifier
                }
            } else if ch.is_ascii_digit() {
                pos = Self::number(line, pos);
                TokenKind::Number
            } else if ch == '"' {
                let (end, terminated) = Self::quote(line, pos);
                if !terminated {
                    subtype = TokenSubtype::Error;
                }
                pos = end;
                TokenKind::Quote
            } else if line[pos..].starts_with("//") {
                pos = line.len();
                TokenKind::Comment
            } else {
                pos += Self::operator(&line[pos..]);
                TokenKind::Punctuation
            };
            let mut token = Token::new(
                &line[start..pos],
                Location::new(line_index, column(start)),
                kind,
            );
            token.subtype = subtype;
            out.push(token);
        }
    }
}

/// Scanner lookup by file extension.
///
/// Extensions are matched case-insensitively and without the leading dot.
#[derive(Clone, Debug, Default)]
pub struct ScannerRegistry {
    by_extension: FxHashMap<String, Arc<dyn Scanner>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(extension: &str) -> String {
        extension.trim_start_matches('.').to_ascii_lowercase()
    }

    /// Register `scanner` for `extension`, replacing any previous entry.
    pub fn register(&mut self, extension: &str, scanner: Arc<dyn Scanner>) {
        self.by_extension
            .insert(Self::normalize(extension), scanner);
    }

    /// Builder form of [`ScannerRegistry::register`].
    #[must_use]
    pub fn with(mut self, extension: &str, scanner: Arc<dyn Scanner>) -> Self {
        self.register(extension, scanner);
        self
    }

    pub fn get(&self, extension: &str) -> Option<Arc<dyn Scanner>> {
        self.by_extension.get(&Self::normalize(extension)).cloned()
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.by_extension.contains_key(&Self::normalize(extension))
    }
}
