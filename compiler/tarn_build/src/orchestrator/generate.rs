//! The generate stage.
//!
//! Works on immutable snapshots of the parsed units. Between sub-stages it
//! checks whether anything was loaded or edited since the snapshot was
//! taken; if so the stage is abandoned and nothing is published. Results are
//! published (diagnostics stamped onto fresh lexer copies, symbol table and
//! artifacts swapped) under the state lock in one step.

use std::mem::size_of;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tarn_lexer::{Annotation, Lexer, Location, Token};
use tarn_symbols::{FileId, Symbol, SymbolTable, TokenSite};
use tracing::debug;

use super::{Published, Shared};
use crate::artifacts::{
    build_report, BuildArtifacts, DiagnosticSummary, HeaderDocument, MemoryStats, PhaseTimings,
    ProjectInfo, CODE_FILE, HEADER_FILE, REPORT_FILE,
};
use crate::error::BuildError;
use crate::frontend::{CodeUnit, Frontend, SourceUnit};

struct Snapshot<T> {
    epoch: u64,
    /// Files with a tree, in load order.
    units: Arc<[SourceUnit<T>]>,
    paths: FxHashMap<FileId, String>,
    /// Every registered file, in load order.
    files: Vec<String>,
    parse_errors: usize,
}

/// Verification failures that will be stamped, at most one per site.
struct VerifyStamps {
    by_site: FxHashMap<TokenSite, String>,
    /// Failures without a site; counted, never stamped.
    unsited: usize,
}

impl VerifyStamps {
    fn error_count(&self) -> usize {
        self.by_site.len() + self.unsited
    }
}

fn verify_code<F: Frontend>(frontend: &F, code: &[CodeUnit]) -> Vec<(Option<TokenSite>, String)> {
    code.par_iter()
        .flat_map_iter(|unit| {
            frontend
                .verify_unit(unit)
                .into_iter()
                .map(move |(index, message)| (unit.site_of(index), message))
        })
        .collect()
}

/// Drop failures that would land on a token already carrying an error.
fn select_verify_stamps<T>(
    units: &[SourceUnit<T>],
    table: &SymbolTable,
    failures: Vec<(Option<TokenSite>, String)>,
) -> VerifyStamps {
    let lexers: FxHashMap<FileId, &Lexer> =
        units.iter().map(|unit| (unit.file, &*unit.lexer)).collect();
    let mut stamps = VerifyStamps {
        by_site: FxHashMap::default(),
        unsited: 0,
    };
    for (site, message) in failures {
        let Some(site) = site else {
            stamps.unsited += 1;
            continue;
        };
        let parse_error = lexers
            .get(&site.file)
            .and_then(|lexer| lexer.token_at(site.location))
            .is_some_and(Token::has_error);
        let compile_error = table.annotations_at(site).iter().any(Annotation::is_error);
        if parse_error || compile_error || stamps.by_site.contains_key(&site) {
            continue;
        }
        stamps.by_site.insert(site, message);
    }
    stamps
}

fn stamp_diagnostics(
    lexer: &mut Lexer,
    file: FileId,
    table: &SymbolTable,
    stamps: &VerifyStamps,
) {
    for (site, annotations) in table.diagnostics() {
        if site.file != file {
            continue;
        }
        if let Some(token) = lexer.token_at_mut(site.location) {
            for annotation in annotations {
                token.add_annotation(annotation.clone());
            }
        }
    }
    for (site, message) in &stamps.by_site {
        if site.file != file {
            continue;
        }
        if let Some(token) = lexer.token_at_mut(site.location) {
            token.add_annotation(Annotation::VerifyError(message.clone()));
        }
    }
}

/// Report lines: errors before warnings, then by file and position.
fn diagnostic_messages<T>(
    snapshot: &Snapshot<T>,
    table: &SymbolTable,
    stamps: &VerifyStamps,
) -> Vec<String> {
    let mut entries: Vec<(bool, &str, Location, String)> = Vec::new();
    for unit in snapshot.units.iter() {
        for token in unit.lexer.token_rows().iter().flatten() {
            for annotation in token.annotations() {
                if let Annotation::ParseError(message) = annotation {
                    entries.push((false, unit.path.as_str(), token.location(), message.clone()));
                }
            }
        }
    }
    let path_of = |file: FileId| snapshot.paths.get(&file).map_or("?", String::as_str);
    for (site, annotations) in table.diagnostics() {
        for annotation in annotations {
            if let Some(message) = annotation.message() {
                let warning = !annotation.is_error();
                entries.push((warning, path_of(site.file), site.location, message.to_string()));
            }
        }
    }
    for (site, message) in &stamps.by_site {
        entries.push((false, path_of(site.file), site.location, message.clone()));
    }
    entries.sort();
    entries
        .into_iter()
        .map(|(_, path, location, message)| format!("{path}:{location}: {message}"))
        .collect()
}

fn memory_stats<T>(units: &[SourceUnit<T>], table: &SymbolTable) -> MemoryStats {
    let lines = units.iter().map(|unit| unit.lexer.line_count()).sum();
    let tokens = units.iter().map(|unit| unit.lexer.token_count()).sum();
    let text: usize = units
        .iter()
        .flat_map(|unit| unit.lexer.lines())
        .map(String::len)
        .sum();
    MemoryStats {
        files: units.len(),
        lines,
        tokens,
        symbols: table.len(),
        approx_bytes: text + tokens * size_of::<Token>() + table.len() * size_of::<Symbol>(),
    }
}

impl<F: Frontend> Shared<F> {
    fn generate_snapshot(&self) -> Snapshot<F::Tree> {
        let state = self.state.lock();
        let mut records: Vec<_> = state.files.values().collect();
        records.sort_by_key(|record| record.file_id);
        let units: Vec<SourceUnit<F::Tree>> = records
            .iter()
            .filter_map(|record| {
                Some(SourceUnit {
                    file: record.file_id,
                    path: record.path.clone(),
                    lexer: Arc::clone(record.parsed.as_ref()?),
                    tree: Arc::clone(record.tree.as_ref()?),
                })
            })
            .collect();
        Snapshot {
            epoch: state.epoch,
            units: Arc::from(units),
            paths: records
                .iter()
                .map(|record| (record.file_id, record.path.clone()))
                .collect(),
            files: records.iter().map(|record| record.path.clone()).collect(),
            parse_errors: records
                .iter()
                .filter(|record| record.tree.is_some())
                .map(|record| record.parse_error_count)
                .sum(),
        }
    }

    fn interrupted(&self, epoch: u64, stage: &str) -> bool {
        let stale = !self.state.lock().unchanged_since(epoch);
        if stale {
            debug!(stage, "generate interrupted");
        }
        stale
    }

    /// Run every generate sub-stage and publish. `None` means the stage was
    /// abandoned because the project changed underneath it. `timings` holds
    /// the load and parse time of the pass so far.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(super) async fn generate(
        self: &Arc<Self>,
        mut timings: PhaseTimings,
    ) -> Result<Option<(usize, usize)>, BuildError> {
        let snapshot = self.generate_snapshot();
        let epoch = snapshot.epoch;

        self.status("Compiling headers");
        self.pause().await;
        if self.interrupted(epoch, "start") {
            return Ok(None);
        }

        let started = Instant::now();
        let (shared, units) = (Arc::clone(self), Arc::clone(&snapshot.units));
        let no_compiler_checks = self.config.no_compiler_checks;
        let table = self
            .run_blocking(move || {
                let mut table = SymbolTable::new();
                table.set_no_compiler_checks(no_compiler_checks);
                shared.frontend.build_symbols(&units, &mut table);
                table.generate_lookup();
                table
            })
            .await?;
        timings.build_symbols = started.elapsed();
        if self.interrupted(epoch, "build symbols") {
            return Ok(None);
        }

        let started = Instant::now();
        let (shared, units) = (Arc::clone(self), Arc::clone(&snapshot.units));
        let table = self
            .run_blocking(move || {
                let mut table = table;
                shared.frontend.verify_header(&units, &mut table);
                Arc::new(table)
            })
            .await?;
        timings.verify_header = started.elapsed();
        if self.interrupted(epoch, "verify header") {
            return Ok(None);
        }

        self.status("Generating code");
        self.pause().await;
        let started = Instant::now();
        let (shared, units) = (Arc::clone(self), Arc::clone(&snapshot.units));
        let code_table = Arc::clone(&table);
        let code = self
            .run_blocking(move || Arc::new(shared.frontend.generate_code(&units, &code_table)))
            .await?;
        timings.generate_code = started.elapsed();
        if self.interrupted(epoch, "generate code") {
            return Ok(None);
        }

        let started = Instant::now();
        let (shared, verified) = (Arc::clone(self), Arc::clone(&code));
        let failures = self
            .run_blocking(move || verify_code(&shared.frontend, &verified))
            .await?;
        timings.verify_code = started.elapsed();
        if self.interrupted(epoch, "verify code") {
            return Ok(None);
        }

        let stamps = select_verify_stamps(&snapshot.units, &table, failures);
        let errors = snapshot.parse_errors + table.error_count() + stamps.error_count();
        let warnings = table.warning_count();
        let diagnostics = DiagnosticSummary {
            errors,
            warnings,
            messages: diagnostic_messages(&snapshot, &table, &stamps),
        };
        let memory = memory_stats(&snapshot.units, &table);
        let project = &self.config.project_name;
        let header = HeaderDocument::new(
            ProjectInfo {
                name: project.clone(),
                files: snapshot.files.clone(),
            },
            table.header_symbols(),
        );
        let header_lines = header.to_lines()?;
        let artifacts = Arc::new(BuildArtifacts {
            report: build_report(project, &timings, &memory, &diagnostics),
            timings,
            header,
            code: Arc::try_unwrap(code).unwrap_or_else(|shared| (*shared).clone()),
        });

        if !self.publish(epoch, &table, &artifacts, &stamps) {
            return Ok(None);
        }
        self.write_artifacts(&artifacts, header_lines).await?;
        self.observer.file_updated("");
        if errors == 0 {
            self.status("Done");
        } else {
            self.status(&format!("ERROR: {errors} errors"));
        }
        Ok(Some((errors, warnings)))
    }

    /// Stamp diagnostics and swap in the new results, unless the project
    /// changed since `epoch`.
    fn publish(
        &self,
        epoch: u64,
        table: &Arc<SymbolTable>,
        artifacts: &Arc<BuildArtifacts>,
        stamps: &VerifyStamps,
    ) -> bool {
        let dirty: FxHashSet<FileId> = table
            .diagnostics()
            .map(|(site, _)| site.file)
            .chain(stamps.by_site.keys().map(|site| site.file))
            .collect();

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.unchanged_since(epoch) {
            debug!("edit arrived before publishing");
            return false;
        }
        for record in state.files.values_mut() {
            let Some(parsed) = &record.parsed else {
                continue;
            };
            let unstamped = record
                .lexer
                .as_ref()
                .is_some_and(|live| Arc::ptr_eq(live, parsed));
            if unstamped && !dirty.contains(&record.file_id) {
                continue;
            }
            let mut lexer = Lexer::clone(parsed);
            stamp_diagnostics(&mut lexer, record.file_id, table, stamps);
            record.lexer = Some(Arc::new(lexer));
        }
        state.published = Some(Published {
            symbols: Arc::clone(table),
            artifacts: Arc::clone(artifacts),
        });
        true
    }

    async fn write_artifacts(
        &self,
        artifacts: &BuildArtifacts,
        header_lines: Vec<String>,
    ) -> Result<(), BuildError> {
        let outputs = [
            (self.config.output_path(REPORT_FILE), artifacts.report.clone()),
            (self.config.output_path(HEADER_FILE), header_lines),
            (self.config.output_path(CODE_FILE), artifacts.code_lines()),
        ];
        let fs = Arc::clone(&self.fs);
        self.run_blocking(move || {
            for (path, lines) in &outputs {
                fs.write_all_lines(path, lines)
                    .map_err(|error| BuildError::write(path, &error))?;
            }
            Ok::<(), BuildError>(())
        })
        .await?
    }
}
