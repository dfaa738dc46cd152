//! Incremental build orchestration for Tarn projects.
//!
//! A [`BuildOrchestrator`] owns one project: the lexer of every loaded file,
//! the last parse of each, and the last published symbol table and
//! artifacts. Edits arrive as replacement lexers through
//! [`BuildOrchestrator::set_lexer`]; the pipeline re-parses what changed and
//! regenerates, abandoning any generate pass an edit races into.
//!
//! # Pipeline
//!
//! ```text
//! load_queue ──► read + lex ──► parse_queue ──► Frontend::parse
//!                                                     │
//!                  (both queues empty)                ▼
//!   build_symbols ─► verify_header ─► generate_code ─► verify (rayon)
//!                                                     │
//!                            publish: stamp diagnostics, swap results,
//!                            write build_report.txt / header.json / code.txt
//! ```
//!
//! Grammar-specific work sits behind the [`Frontend`] trait. The [`decl`]
//! module is the reference frontend for `.tarn` declaration files.
//!
//! # Tracing
//!
//! Set `RUST_LOG=tarn_build=debug` and call [`init_tracing`] to see pass
//! scheduling, abandoned generates, and discarded stale results.

mod artifacts;
mod config;
pub mod decl;
mod error;
mod events;
mod frontend;
mod fs;
mod orchestrator;
mod tracing_setup;

pub use artifacts::{
    build_report, BuildArtifacts, DiagnosticSummary, HeaderDocument, MemoryStats, PhaseTimings,
    ProjectInfo, CODE_FILE, HEADER_FILE, HEADER_FORMAT_VERSION, REPORT_FILE,
};
pub use config::{default_scanners, BuildConfig, Threading};
pub use error::BuildError;
pub use events::{BuildEvent, BuildObserver, EventChannel, NullObserver};
pub use frontend::{CodeUnit, Frontend, Instruction, ParseOutput, SourceUnit};
pub use fs::{DiskFileSystem, FileSystem, MemoryFileSystem};
pub use orchestrator::{BuildOrchestrator, BuildSummary, CompileHandle};
pub use tracing_setup::init_tracing;
