//! Artifacts published by a completed generate pass.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tarn_symbols::HeaderSymbol;

use crate::error::BuildError;
use crate::frontend::CodeUnit;

pub const REPORT_FILE: &str = "build_report.txt";
pub const HEADER_FILE: &str = "header.json";
pub const CODE_FILE: &str = "code.txt";

/// Bumped whenever the header layout changes.
pub const HEADER_FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub files: Vec<String>,
}

/// The public interface of a project, as written to `header.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDocument {
    pub compiler: String,
    pub compiler_version: String,
    pub format_version: u32,
    pub project: ProjectInfo,
    pub symbols: Vec<HeaderSymbol>,
}

impl HeaderDocument {
    pub fn new(project: ProjectInfo, symbols: Vec<HeaderSymbol>) -> Self {
        HeaderDocument {
            compiler: "tarn".to_string(),
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
            format_version: HEADER_FORMAT_VERSION,
            project,
            symbols,
        }
    }

    /// Pretty-printed JSON, one entry per line.
    pub fn to_lines(&self) -> Result<Vec<String>, BuildError> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json.lines().map(str::to_string).collect())
    }
}

/// Wall time spent in each phase of one pass.
///
/// Load and parse time accumulate over every file handled by the pass,
/// including work later discarded as stale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    /// Reading and lexing.
    pub load: Duration,
    pub parse: Duration,
    pub build_symbols: Duration,
    pub verify_header: Duration,
    pub generate_code: Duration,
    pub verify_code: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.load
            + self.parse
            + self.build_symbols
            + self.verify_header
            + self.generate_code
            + self.verify_code
    }
}

/// Sizes reported in the memory section of the build report.
#[derive(Copy, Clone, Debug, Default)]
pub struct MemoryStats {
    pub files: usize,
    pub lines: usize,
    pub tokens: usize,
    pub symbols: usize,
    /// Rough heap estimate for symbols and tokens.
    pub approx_bytes: usize,
}

/// Diagnostic counts for the report.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticSummary {
    pub errors: usize,
    pub warnings: usize,
    /// `path:line:column: message`, errors first.
    pub messages: Vec<String>,
}

/// Messages listed in the report before it truncates.
const MAX_REPORTED_MESSAGES: usize = 50;

/// Everything a generate pass publishes.
#[derive(Clone, Debug)]
pub struct BuildArtifacts {
    pub report: Vec<String>,
    pub timings: PhaseTimings,
    pub header: HeaderDocument,
    pub code: Vec<CodeUnit>,
}

impl BuildArtifacts {
    /// One listing line per code unit.
    pub fn code_lines(&self) -> Vec<String> {
        self.code.iter().map(CodeUnit::listing).collect()
    }
}

/// Render the plain-text build report.
pub fn build_report(
    project: &str,
    timings: &PhaseTimings,
    memory: &MemoryStats,
    diagnostics: &DiagnosticSummary,
) -> Vec<String> {
    let mut report = vec![format!("Build report for {project}"), String::new()];

    report.push("Timings:".to_string());
    for (label, time) in [
        ("load", timings.load),
        ("parse", timings.parse),
        ("build symbols", timings.build_symbols),
        ("verify header", timings.verify_header),
        ("generate code", timings.generate_code),
        ("verify code", timings.verify_code),
        ("total", timings.total()),
    ] {
        report.push(format!("  {label:<14}{:>10.3} ms", time.as_secs_f64() * 1000.0));
    }

    report.push(String::new());
    report.push("Memory:".to_string());
    report.push(format!("  files   {}", memory.files));
    report.push(format!("  lines   {}", memory.lines));
    report.push(format!("  tokens  {}", memory.tokens));
    report.push(format!("  symbols {}", memory.symbols));
    report.push(format!("  approx  {} KiB", memory.approx_bytes / 1024));

    report.push(String::new());
    let mut line = format!(
        "Diagnostics: {} errors, {} warnings",
        diagnostics.errors, diagnostics.warnings
    );
    if diagnostics.messages.len() > MAX_REPORTED_MESSAGES {
        let _ = write!(line, " (first {MAX_REPORTED_MESSAGES} shown)");
    }
    report.push(line);
    report.extend(
        diagnostics
            .messages
            .iter()
            .take(MAX_REPORTED_MESSAGES)
            .map(|m| format!("  {m}")),
    );
    report
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
