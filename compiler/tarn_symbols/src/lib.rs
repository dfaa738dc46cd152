//! Symbol table for the Tarn toolchain.
//!
//! A forest of modules, types, functions, fields, and parameters stored in
//! one arena and addressed by [`SymbolId`]. On top of the tree sits the
//! specialization engine: generic definitions refer to their parameters
//! through shared `#i` leaves, and [`SymbolTable::create_specialized_type`]
//! instantiates them with concrete arguments, reusing earlier instances.
//!
//! # Full names
//!
//! | Symbol | Full name |
//! |---|---|
//! | child of the root | `name` |
//! | nested symbol | `parent.name` |
//! | generic type with N parameters | ``parent.name`N`` |
//! | generic parameter leaf | `#i` |
//! | function | `parent.name(T1,T2)` |
//! | tuple | `(T1,T2)` or `(a T1,b T2)` |
//! | other specialization | `parent.name<T1,T2>` |
//!
//! Diagnostics are not written to tokens directly. The table records them
//! per [`TokenSite`] and the build layer stamps them onto the lexers when it
//! publishes a pass.

mod error;
mod header;
mod specialize;
mod symbol;
mod table;

pub use error::SymbolError;
pub use header::HeaderSymbol;
pub use symbol::{FileId, Qualifiers, Symbol, SymbolId, SymbolKind, TokenSite, TupleField};
pub use table::{SymbolTable, LAMBDA_ROOT_NAME, TUPLE_ROOT_NAME};
