//! Errors surfaced by the build orchestrator.
//!
//! Every waiter of a failed pass receives its own copy, so the enum is
//! `Clone` and carries messages rather than `io::Error` values.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("file `{0}` was never loaded")]
    FileNotLoaded(String),

    #[error("file `{0}` is already loaded")]
    AlreadyLoaded(String),

    #[error("cannot read `{path}`: {message}")]
    Read { path: String, message: String },

    #[error("cannot write `{path}`: {message}")]
    Write { path: String, message: String },

    #[error("cannot serialize header: {0}")]
    Serialize(String),

    /// A panic or contract violation inside a pipeline stage.
    #[error("{0}")]
    CompilerFailure(String),

    /// The pass ended without reaching quiescence (its task was torn down).
    #[error("build pass aborted")]
    PassAborted,
}

impl BuildError {
    pub(crate) fn read(path: &str, error: &std::io::Error) -> Self {
        BuildError::Read {
            path: path.to_string(),
            message: error.to_string(),
        }
    }

    pub(crate) fn write(path: &str, error: &std::io::Error) -> Self {
        BuildError::Write {
            path: path.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(error: serde_json::Error) -> Self {
        BuildError::Serialize(error.to_string())
    }
}

impl From<tarn_symbols::SymbolError> for BuildError {
    fn from(error: tarn_symbols::SymbolError) -> Self {
        BuildError::CompilerFailure(error.to_string())
    }
}
