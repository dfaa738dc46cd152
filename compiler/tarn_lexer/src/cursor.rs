//! Forward token walk over a [`Lexer`].

use crate::lexer::Lexer;
use crate::token::Token;

/// Walks tokens left-to-right, top-to-bottom.
///
/// Blank lines are skipped. After the last real token the lexer's end token
/// is yielded exactly once, then iteration stops.
#[derive(Clone, Debug)]
pub struct TokenCursor<'a> {
    lexer: &'a Lexer,
    line: usize,
    index: usize,
    finished: bool,
}

impl<'a> TokenCursor<'a> {
    pub(crate) fn new(lexer: &'a Lexer) -> Self {
        TokenCursor {
            lexer,
            line: 0,
            index: 0,
            finished: false,
        }
    }

    /// The next token without advancing.
    pub fn peek(&self) -> Option<&'a Token> {
        self.clone().next()
    }

    /// Line the cursor is positioned on.
    pub fn current_line(&self) -> usize {
        self.line
    }

    /// Skip whatever is left on the current line.
    pub fn skip_line(&mut self) {
        if self.line < self.lexer.line_count() {
            self.line += 1;
            self.index = 0;
        }
    }

    /// Jump to the first token of `line` (clamped to the end of the file).
    ///
    /// Used by passes that only care about a visible window.
    pub fn seek_line(&mut self, line: usize) {
        self.line = line.min(self.lexer.line_count());
        self.index = 0;
        self.finished = false;
    }
}

impl<'a> Iterator for TokenCursor<'a> {
    type Item = &'a Token;

    fn next(&mut self) -> Option<&'a Token> {
        loop {
            if self.line >= self.lexer.line_count() {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return Some(self.lexer.end_token());
            }
            let row = self.lexer.tokens_on_line(self.line);
            if let Some(token) = row.get(self.index) {
                self.index += 1;
                return Some(token);
            }
            self.line += 1;
            self.index = 0;
        }
    }
}
