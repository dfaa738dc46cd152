//! Build configuration.

use std::sync::Arc;
use std::time::Duration;

use tarn_lexer::{PlainTextScanner, ScannerRegistry};

use crate::decl;

/// Where CPU and I/O work of a pipeline stage runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Threading {
    /// On tokio's blocking pool.
    #[default]
    Background,
    /// On the pipeline task itself.
    Inline,
}

/// Configuration for a [`BuildOrchestrator`](crate::BuildOrchestrator).
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// Project name written into the header document.
    pub project_name: String,
    /// Directory (relative to the file system root) for build artifacts.
    pub output_dir: String,
    /// Scanner per file extension. Files with other extensions are skipped.
    pub scanners: ScannerRegistry,
    pub threading: Threading,
    /// Pause at every suspension point so edits can interleave. Zero yields.
    pub stage_delay: Duration,
    /// `compile()` reloads every file from the file system.
    pub full_recompile: bool,
    /// Let panics in pipeline stages propagate instead of reporting them.
    pub fail_fast: bool,
    /// Report symbol-table errors as warnings.
    pub no_compiler_checks: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            project_name: "tarn".to_string(),
            output_dir: "build".to_string(),
            scanners: default_scanners(),
            threading: Threading::Background,
            stage_delay: Duration::ZERO,
            full_recompile: false,
            fail_fast: false,
            no_compiler_checks: false,
        }
    }
}

impl BuildConfig {
    #[must_use]
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_scanners(mut self, scanners: ScannerRegistry) -> Self {
        self.scanners = scanners;
        self
    }

    #[must_use]
    pub fn with_threading(mut self, threading: Threading) -> Self {
        self.threading = threading;
        self
    }

    #[must_use]
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = delay;
        self
    }

    #[must_use]
    pub fn with_full_recompile(mut self, enabled: bool) -> Self {
        self.full_recompile = enabled;
        self
    }

    #[must_use]
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    #[must_use]
    pub fn with_no_compiler_checks(mut self, enabled: bool) -> Self {
        self.no_compiler_checks = enabled;
        self
    }

    /// Path of artifact `name` inside the output directory.
    pub fn output_path(&self, name: &str) -> String {
        let dir = self.output_dir.trim_end_matches('/');
        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        }
    }
}

/// `.tarn` declaration files and `.txt` prose.
pub fn default_scanners() -> ScannerRegistry {
    ScannerRegistry::new()
        .with(decl::EXTENSION, Arc::new(decl::scanner()))
        .with("txt", Arc::new(PlainTextScanner))
}

#[cfg(test)]
mod tests;
