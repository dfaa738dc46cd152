//! Incremental lexer for the Tarn toolchain.
//!
//! The lexer keeps one row of tokens per source line so that an edit only
//! re-scans the lines it touched. Tokenization itself is delegated to a
//! pluggable [`Scanner`], chosen per file extension through a
//! [`ScannerRegistry`].
//!
//! # Architecture
//!
//! ```text
//! line text ──► Scanner::scan_line ──► Vec<Token>   (pure, per line)
//!                      │
//!                      ▼
//! Lexer { lines, tokens, meta_tokens }              (owns one file)
//!     │        ▲
//!     │        └── replace_text (splice + windowed re-scan + renumber)
//!     ▼
//! TokenCursor ──► &Token ... EndToken               (read side)
//! ```

mod cursor;
mod lexer;
mod scanner;
mod token;

pub use cursor::TokenCursor;
pub use lexer::Lexer;
pub use scanner::{PlainTextScanner, Scanner, ScannerRegistry, SymbolScanner};
pub use token::{Annotation, Location, Token, TokenFlags, TokenKind, TokenSubtype};
