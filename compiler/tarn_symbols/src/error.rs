//! Contract violations of the specialization API.
//!
//! These are programmer errors in a frontend, not user diagnostics. User
//! diagnostics are annotations recorded with [`SymbolTable::reject`].
//!
//! [`SymbolTable::reject`]: crate::SymbolTable::reject

use thiserror::Error;

use crate::symbol::SymbolKind;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("`{0}` is already specialized")]
    AlreadySpecialized(String),

    #[error("{kind} `{name}` cannot be specialized")]
    NotSpecializable { kind: SymbolKind, name: String },

    #[error("expected {expected} tuple field names, found {found}")]
    TupleNameCount { expected: usize, found: usize },

    #[error("`{0}` is not a tuple")]
    NotATuple(String),
}
