//! Per-file line and token buffers with incremental re-scan.
//!
//! # Invariants
//!
//! - `lines.len() == tokens.len() >= 1`
//! - every token in `tokens[i]` has `location.line == i`
//! - `meta_tokens[0]` is the end-of-file token and is never removed

use std::io::{self, BufRead};
use std::sync::Arc;

use crate::cursor::TokenCursor;
use crate::scanner::Scanner;
use crate::token::{Location, Token, TokenFlags};

#[allow(
    clippy::cast_possible_truncation,
    reason = "files and lines are far smaller than u32::MAX"
)]
#[inline]
fn to_u32(n: usize) -> u32 {
    n as u32
}

/// Largest char boundary of `line` at or below `column`.
fn floor_boundary(line: &str, column: u32) -> u32 {
    let mut col = (column as usize).min(line.len());
    while !line.is_char_boundary(col) {
        col -= 1;
    }
    to_u32(col)
}

/// Owns the text and tokens of one file.
#[derive(Clone, Debug)]
pub struct Lexer {
    path: String,
    lines: Vec<String>,
    tokens: Vec<Vec<Token>>,
    meta_tokens: Vec<Token>,
    scanner: Arc<dyn Scanner>,
}

impl Lexer {
    /// An empty, single-line lexer.
    pub fn new(scanner: Arc<dyn Scanner>) -> Self {
        Lexer {
            path: String::new(),
            lines: vec![String::new()],
            tokens: vec![Vec::new()],
            meta_tokens: vec![Token::end(Location::default())],
            scanner,
        }
    }

    /// Scan `lines` as the content of `path`.
    pub fn from_lines(
        scanner: Arc<dyn Scanner>,
        path: impl Into<String>,
        lines: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut lexer = Lexer::new(scanner).with_path(path);
        lexer.scan_lines(lines);
        lexer
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn scanner(&self) -> &Arc<dyn Scanner> {
        &self.scanner
    }

    /// Swap the scanner. Tokenization rules differ, so every line is re-scanned.
    pub fn set_scanner(&mut self, scanner: Arc<dyn Scanner>) {
        self.scanner = scanner;
        self.rescan(0, self.lines.len());
        self.meta_tokens.truncate(1);
    }

    /// Replace the whole file and re-scan it.
    #[tracing::instrument(level = "trace", skip_all, fields(path = %self.path))]
    pub fn scan_lines(&mut self, lines: impl IntoIterator<Item = impl Into<String>>) {
        self.lines = lines.into_iter().map(Into::into).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.tokens = vec![Vec::new(); self.lines.len()];
        self.meta_tokens.truncate(1);
        self.rescan(0, self.lines.len());
    }

    /// Replace the whole file with the contents of `reader`.
    pub fn scan_reader(&mut self, reader: impl BufRead) -> io::Result<()> {
        let lines = reader.lines().collect::<io::Result<Vec<String>>>()?;
        self.scan_lines(lines);
        Ok(())
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Text of line `index`, or `""` when out of range.
    pub fn line(&self, index: usize) -> &str {
        self.lines.get(index).map_or("", String::as_str)
    }

    /// Tokens on line `index`, or an empty slice when out of range.
    pub fn tokens_on_line(&self, index: usize) -> &[Token] {
        self.tokens.get(index).map_or(&[], Vec::as_slice)
    }

    /// Every token row, one per line.
    pub fn token_rows(&self) -> &[Vec<Token>] {
        &self.tokens
    }

    /// Total number of scanned tokens (meta tokens excluded).
    pub fn token_count(&self) -> usize {
        self.tokens.iter().map(Vec::len).sum()
    }

    /// The whole text, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// The end-of-file sentinel.
    pub fn end_token(&self) -> &Token {
        &self.meta_tokens[0]
    }

    /// Synthetic tokens; index 0 is always the end token.
    pub fn meta_tokens(&self) -> &[Token] {
        &self.meta_tokens
    }

    pub fn add_meta_token(&mut self, mut token: Token) {
        token.set_flags(TokenFlags::META);
        self.meta_tokens.push(token);
    }

    /// Drop every meta token except the end token.
    pub fn clear_meta_tokens(&mut self) {
        self.meta_tokens.truncate(1);
    }

    /// The token starting exactly at `location`.
    pub fn token_at(&self, location: Location) -> Option<&Token> {
        self.tokens
            .get(location.line as usize)?
            .iter()
            .find(|t| t.column() == location.column)
    }

    /// Mutable form of [`Lexer::token_at`], used to attach annotations.
    pub fn token_at_mut(&mut self, location: Location) -> Option<&mut Token> {
        self.tokens
            .get_mut(location.line as usize)?
            .iter_mut()
            .find(|t| t.column() == location.column)
    }

    /// Walk every token, then the end token once.
    pub fn cursor(&self) -> TokenCursor<'_> {
        TokenCursor::new(self)
    }

    /// Bound `location` to an existing line and a char boundary within it.
    pub fn clamp(&self, location: Location) -> Location {
        let line = (location.line as usize).min(self.lines.len() - 1);
        Location::new(to_u32(line), floor_boundary(&self.lines[line], location.column))
    }

    /// Text between two locations, one entry per line.
    ///
    /// Inputs are clamped and `end` is forced to be at or after `start`.
    pub fn get_text(&self, start: Location, end: Location) -> Vec<String> {
        let start = self.clamp(start);
        let end = self.clamp(end).max(start);
        let (sl, sc) = (start.line as usize, start.column as usize);
        let (el, ec) = (end.line as usize, end.column as usize);
        if sl == el {
            return vec![self.lines[sl][sc..ec].to_string()];
        }
        let mut text = Vec::with_capacity(el - sl + 1);
        text.push(self.lines[sl][sc..].to_string());
        text.extend(self.lines[sl + 1..el].iter().cloned());
        text.push(self.lines[el][..ec].to_string());
        text
    }

    /// Replace the text between `start` and `end` with `replacement`.
    ///
    /// Each entry is one line of new text. Entries containing line breaks
    /// (`\n` or `\r\n`) are split so every row still holds exactly one line.
    /// Inputs are clamped and `end` is forced to be at or after `start`. Only
    /// the lines touched by the edit are re-scanned; rows below it are
    /// renumbered when the line count changed. Meta tokens describe the old
    /// text and are dropped (the end token is moved instead).
    ///
    /// Returns the location just after the inserted text.
    #[tracing::instrument(level = "trace", skip(self, replacement), fields(path = %self.path))]
    pub fn replace_text<S: AsRef<str>>(
        &mut self,
        replacement: &[S],
        start: Location,
        end: Location,
    ) -> Location {
        let start = self.clamp(start);
        let end = self.clamp(end).max(start);
        let (sl, el) = (start.line as usize, end.line as usize);

        let prefix = self.lines[sl][..start.column as usize].to_string();
        let suffix = self.lines[el][end.column as usize..].to_string();
        let old_line_count = self.lines.len();

        // Collapse the replaced range onto line `sl`.
        self.lines.drain(sl + 1..=el);
        self.tokens.drain(sl + 1..=el);

        let replacement: Vec<&str> = replacement
            .iter()
            .flat_map(|entry| entry.as_ref().split('\n'))
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        let new_end = match replacement.as_slice() {
            [] => {
                self.lines[sl] = prefix + &suffix;
                start
            }
            [only] => {
                self.lines[sl] = format!("{prefix}{only}{suffix}");
                Location::new(start.line, start.column + to_u32(only.len()))
            }
            [first, middle @ .., last] => {
                self.lines[sl] = format!("{prefix}{first}");
                let mut inserted: Vec<String> = middle.iter().map(ToString::to_string).collect();
                inserted.push(format!("{last}{suffix}"));
                let count = inserted.len();
                let tail = self.lines.split_off(sl + 1);
                self.lines.extend(inserted);
                self.lines.extend(tail);
                let tail = self.tokens.split_off(sl + 1);
                self.tokens
                    .extend(std::iter::repeat_with(Vec::new).take(count));
                self.tokens.extend(tail);
                Location::new(to_u32(sl + count), to_u32(last.len()))
            }
        };

        let rescan_end = new_end.line as usize + 1;
        self.rescan(sl, rescan_end);
        if self.lines.len() != old_line_count {
            self.renumber_from(rescan_end);
        }
        self.meta_tokens.truncate(1);
        self.move_end_token();
        new_end
    }

    /// Copy with every annotation stripped.
    ///
    /// Keeps lines, token positions, kinds, and begin/end-of-line flags. Used
    /// to give a background pass a private, diagnostic-free snapshot while the
    /// original keeps evolving.
    pub fn snapshot(&self) -> Lexer {
        Lexer {
            path: self.path.clone(),
            lines: self.lines.clone(),
            tokens: self
                .tokens
                .iter()
                .map(|row| row.iter().map(Token::stripped).collect())
                .collect(),
            meta_tokens: vec![self.meta_tokens[0].stripped()],
            scanner: Arc::clone(&self.scanner),
        }
    }

    /// Re-scan lines in `start..end` with the current scanner.
    fn rescan(&mut self, start: usize, end: usize) {
        for index in start..end.min(self.lines.len()) {
            let row = &mut self.tokens[index];
            row.clear();
            self.scanner
                .scan_line(&self.lines[index], to_u32(index), row);
            let last = row.len().saturating_sub(1);
            for (i, token) in row.iter_mut().enumerate() {
                let mut flags = TokenFlags::empty();
                if i == 0 {
                    flags |= TokenFlags::BEGIN_OF_LINE;
                }
                if i == last {
                    flags |= TokenFlags::END_OF_LINE;
                }
                token.set_line_flags(flags);
            }
        }
        self.move_end_token();
    }

    /// Re-stamp the line index of every token from row `start` down.
    fn renumber_from(&mut self, start: usize) {
        for (index, row) in self.tokens.iter_mut().enumerate().skip(start) {
            let line = to_u32(index);
            for token in row {
                token.set_line(line);
            }
        }
    }

    fn move_end_token(&mut self) {
        let last = self.lines.len() - 1;
        let location = Location::new(to_u32(last), to_u32(self.lines[last].len()));
        self.meta_tokens[0] = Token::end(location);
    }
}
