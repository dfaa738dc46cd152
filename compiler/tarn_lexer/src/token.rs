//! Token model: position, classification, display flags, and diagnostics.
//!
//! A token's position is fixed by the lexer. Everything else (kind, subtype,
//! most flags, annotations) is written by later passes such as the parser,
//! the symbol table, and code verification.

use std::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;

/// Line/column position inside a file.
///
/// Columns are byte offsets into the line and always fall on a UTF-8
/// character boundary. Ordering is line-major.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Location { line, column }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // One-based for humans.
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

bitflags! {
    /// Per-token display and structure flags.
    ///
    /// `BEGIN_OF_LINE` and `END_OF_LINE` are owned by the lexer: they are
    /// stamped when a line is scanned and cannot be changed through
    /// [`Token::set_flags`] or [`Token::clear_flags`].
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TokenFlags: u8 {
        /// First token on its line.
        const BEGIN_OF_LINE = 1 << 0;
        /// Last token on its line.
        const END_OF_LINE = 1 << 1;
        /// Rendered dimmed (e.g. unreachable or inactive code).
        const GRAYED = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BOLD = 1 << 4;
        /// Synthesized by a later pass, not produced by scanning.
        const META = 1 << 5;
        /// Rendered with a smaller font.
        const SHRINK = 1 << 6;
    }
}

impl TokenFlags {
    /// Flags only the lexer may write.
    pub const LEXER_OWNED: Self = Self::BEGIN_OF_LINE.union(Self::END_OF_LINE);
}

/// Lexical classification assigned by the scanner (and refined by the parser).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum TokenKind {
    #[default]
    Normal,
    Identifier,
    Reserved,
    Number,
    Quote,
    Comment,
    Punctuation,
    /// Plain prose word (plain-text scanner).
    Text,
    /// Identifier known to name a type.
    TypeName,
    /// Identifier at its point of definition.
    DefineName,
}

/// Secondary classification used for error/warning rendering.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum TokenSubtype {
    #[default]
    Normal,
    Error,
    Warning,
}

/// Diagnostic or link attached to a token.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Annotation {
    ParseError(String),
    CompileError(String),
    VerifyError(String),
    Warning(String),
    Info(String),
    Url(String),
    /// Other tokens that belong with this one (matching braces, all uses of a name).
    ConnectedTokens(Vec<Location>),
}

impl Annotation {
    /// Whether this annotation is a hard error of any phase.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Annotation::ParseError(_) | Annotation::CompileError(_) | Annotation::VerifyError(_)
        )
    }

    /// The human-readable message, if this annotation carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Annotation::ParseError(m)
            | Annotation::CompileError(m)
            | Annotation::VerifyError(m)
            | Annotation::Warning(m)
            | Annotation::Info(m) => Some(m),
            Annotation::Url(_) | Annotation::ConnectedTokens(_) => None,
        }
    }
}

/// A lexical unit. Never spans lines.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Token {
    name: String,
    location: Location,
    pub kind: TokenKind,
    pub subtype: TokenSubtype,
    flags: TokenFlags,
    annotations: SmallVec<[Annotation; 1]>,
}

impl Token {
    pub fn new(name: impl Into<String>, location: Location, kind: TokenKind) -> Self {
        Token {
            name: name.into(),
            location,
            kind,
            subtype: TokenSubtype::Normal,
            flags: TokenFlags::empty(),
            annotations: SmallVec::new(),
        }
    }

    /// The end-of-file sentinel (empty name).
    pub fn end(location: Location) -> Self {
        Token::new(String::new(), location, TokenKind::Normal)
    }

    /// A synthetic token inserted by a later pass.
    pub fn meta(name: impl Into<String>, location: Location) -> Self {
        let mut token = Token::new(name, location, TokenKind::Punctuation);
        token.flags = TokenFlags::META;
        token
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.location.line
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.location.column
    }

    /// Column just past the last byte of the token.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "lines are far shorter than u32::MAX bytes"
    )]
    pub fn end_column(&self) -> u32 {
        self.location.column + self.name.len() as u32
    }

    /// Whether this is the end-of-file sentinel.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.name.is_empty()
    }

    #[inline]
    pub fn flags(&self) -> TokenFlags {
        self.flags
    }

    #[inline]
    pub fn has_flag(&self, flag: TokenFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Set display flags. Lexer-owned bits are ignored.
    pub fn set_flags(&mut self, flags: TokenFlags) {
        self.flags |= flags.difference(TokenFlags::LEXER_OWNED);
    }

    /// Clear display flags. Lexer-owned bits are ignored.
    pub fn clear_flags(&mut self, flags: TokenFlags) {
        self.flags.remove(flags.difference(TokenFlags::LEXER_OWNED));
    }

    pub(crate) fn set_line(&mut self, line: u32) {
        self.location.line = line;
    }

    pub(crate) fn set_line_flags(&mut self, flags: TokenFlags) {
        self.flags.remove(TokenFlags::LEXER_OWNED);
        self.flags |= flags.intersection(TokenFlags::LEXER_OWNED);
    }

    #[inline]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Whether any error annotation is attached.
    pub fn has_error(&self) -> bool {
        self.annotations.iter().any(Annotation::is_error)
    }

    /// Attach an annotation.
    ///
    /// An error is never stamped on a token that already carries one; the
    /// first error wins and `false` is returned. Errors and warnings also
    /// update [`Token::subtype`] so renderers need not scan the list.
    pub fn add_annotation(&mut self, annotation: Annotation) -> bool {
        if annotation.is_error() {
            if self.has_error() {
                return false;
            }
            self.subtype = TokenSubtype::Error;
        } else if matches!(annotation, Annotation::Warning(_))
            && self.subtype == TokenSubtype::Normal
        {
            self.subtype = TokenSubtype::Warning;
        }
        self.annotations.push(annotation);
        true
    }

    /// Remove every annotation and reset the subtype.
    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
        self.subtype = TokenSubtype::Normal;
    }

    /// Copy keeping only position, kind, and the lexer-owned flags.
    pub(crate) fn stripped(&self) -> Token {
        Token {
            name: self.name.clone(),
            location: self.location,
            kind: self.kind,
            subtype: TokenSubtype::Normal,
            flags: self.flags.intersection(TokenFlags::LEXER_OWNED),
            annotations: SmallVec::new(),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} @ {:?}", self.name, self.kind, self.location)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests;
