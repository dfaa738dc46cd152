//! Reference frontend for line-oriented declaration files (`.tarn`).
//!
//! ```text
//! // doc comment lines attach to the next declaration
//! module geometry
//! pub type Pair[A, B] where A Eq
//! pub field first A
//! pub fun swap(p Pair[A, B]) (B, A) require p ok
//! fun area(w float, h float) float
//! ```
//!
//! Fields and functions belong to the most recent type of the file, or to
//! the current module before any type. Type parameters of that type are in
//! scope for its members.

mod codegen;
mod collect;
mod parser;

use tarn_lexer::{Lexer, SymbolScanner};
use tarn_symbols::SymbolTable;

pub use collect::{unknown_type, BUILTIN_MODULE, BUILTIN_TYPES, UNKNOWN_TYPE};
pub use parser::{Decl, DeclKind, DeclTree, Name, Param, TupleFieldExpr, TypeExpr};

use crate::frontend::{CodeUnit, Frontend, ParseOutput, SourceUnit};

pub const EXTENSION: &str = "tarn";

pub const KEYWORDS: &[&str] = &["module", "type", "field", "fun", "pub", "where", "require"];

/// The scanner for declaration files.
pub fn scanner() -> SymbolScanner {
    SymbolScanner::with_keywords(KEYWORDS.iter().copied())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeclFrontend;

impl Frontend for DeclFrontend {
    type Tree = DeclTree;

    fn parses(&self, extension: &str) -> bool {
        extension == EXTENSION
    }

    fn parse(&self, lexer: &mut Lexer) -> ParseOutput<DeclTree> {
        parser::parse(lexer)
    }

    fn build_symbols(&self, units: &[SourceUnit<DeclTree>], table: &mut SymbolTable) {
        collect::build_symbols(units, table);
    }

    fn verify_header(&self, _units: &[SourceUnit<DeclTree>], table: &mut SymbolTable) {
        collect::verify_header(table);
    }

    fn generate_code(&self, _units: &[SourceUnit<DeclTree>], table: &SymbolTable) -> Vec<CodeUnit> {
        codegen::generate(table)
    }

    fn verify_unit(&self, unit: &CodeUnit) -> Vec<(usize, String)> {
        codegen::verify(unit)
    }
}
