//! The seam between the orchestrator and a language's grammar.
//!
//! The orchestrator knows nothing about syntax. It hands lexers to a
//! [`Frontend`] to parse, then hands every parsed unit back to build the
//! symbol table, verify the header, and generate and verify code.

use std::sync::Arc;

use tarn_lexer::Lexer;
use tarn_symbols::{FileId, SymbolTable, TokenSite};

/// Result of parsing one file.
#[derive(Debug)]
pub struct ParseOutput<T> {
    pub tree: T,
    /// Number of `ParseError` annotations added to the lexer.
    pub error_count: usize,
}

/// One parsed file as seen by the generate stage.
///
/// Both the lexer and the tree are immutable snapshots; the live lexer may
/// be replaced by an edit while the stage runs.
#[derive(Debug)]
pub struct SourceUnit<T> {
    pub file: FileId,
    pub path: String,
    pub lexer: Arc<Lexer>,
    pub tree: Arc<T>,
}

impl<T> Clone for SourceUnit<T> {
    fn clone(&self) -> Self {
        SourceUnit {
            file: self.file,
            path: self.path.clone(),
            lexer: Arc::clone(&self.lexer),
            tree: Arc::clone(&self.tree),
        }
    }
}

/// One textual instruction and the token it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub text: String,
    pub site: Option<TokenSite>,
}

impl Instruction {
    pub fn new(text: impl Into<String>, site: Option<TokenSite>) -> Self {
        Instruction {
            text: text.into(),
            site,
        }
    }
}

/// Generated code for one type, field, or function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeUnit {
    pub name: String,
    pub site: Option<TokenSite>,
    pub instructions: Vec<Instruction>,
}

impl CodeUnit {
    /// The code-listing line: name, then instructions separated by ` ; `.
    pub fn listing(&self) -> String {
        let body: Vec<&str> = self.instructions.iter().map(|i| i.text.as_str()).collect();
        format!("{}: {}", self.name, body.join(" ; "))
    }

    /// Site of instruction `index`, falling back to the unit's own site.
    pub fn site_of(&self, index: usize) -> Option<TokenSite> {
        self.instructions
            .get(index)
            .and_then(|i| i.site)
            .or(self.site)
    }
}

/// Grammar-specific stages plugged into the orchestrator.
///
/// Every method may run on a blocking worker thread.
pub trait Frontend: Send + Sync + 'static {
    type Tree: Send + Sync + 'static;

    /// Whether files with `extension` have a grammar. Files without one are
    /// lexed for display but never parsed or compiled.
    fn parses(&self, extension: &str) -> bool;

    /// Parse `lexer`, annotating and retagging its tokens in place.
    fn parse(&self, lexer: &mut Lexer) -> ParseOutput<Self::Tree>;

    /// Populate `table` from every parsed unit.
    fn build_symbols(&self, units: &[SourceUnit<Self::Tree>], table: &mut SymbolTable);

    /// Check the public surface, recording problems in `table`.
    fn verify_header(&self, units: &[SourceUnit<Self::Tree>], table: &mut SymbolTable);

    fn generate_code(&self, units: &[SourceUnit<Self::Tree>], table: &SymbolTable)
        -> Vec<CodeUnit>;

    /// Failing instruction indices of `unit`, with messages.
    fn verify_unit(&self, unit: &CodeUnit) -> Vec<(usize, String)>;
}
