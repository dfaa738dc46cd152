//! Per-project build coordinator.
//!
//! # State machine
//!
//! ```text
//!          compile / load_file / set_lexer
//!   Idle ───────────────────────────────────► Compiling
//!    ▲                                            │
//!    │        ┌──── load ∥ parse ◄───┐            │
//!    │        │   (until queues empty)│           │
//!    │        ▼                       │ edit      │
//!    │     generate ──── checkpoint ──┘ raced in  │
//!    │        │                                   │
//!    └── publish, resolve waiters (FIFO) ◄────────┘
//! ```
//!
//! At most one pass runs at a time. Requests made while it runs only
//! register a waiter; every waiter is resolved when the running pass reaches
//! quiescence (both queues empty and an uninterrupted generate), in the
//! order the requests were made.
//!
//! The state lock is never held across an `.await`.

mod generate;
mod pass;

use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tarn_lexer::Lexer;
use tarn_symbols::{FileId, SymbolTable};
use tokio::sync::oneshot;
use tracing::debug;

use crate::artifacts::BuildArtifacts;
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::events::BuildObserver;
use crate::frontend::Frontend;
use crate::fs::FileSystem;

/// Outcome of the pass that resolved a [`CompileHandle`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Parse, symbol, and verification errors of the published result.
    pub errors: usize,
    pub warnings: usize,
    /// Generate stages started during the pass.
    pub generate_runs: usize,
    /// Generate stages abandoned because an edit raced in.
    pub abandoned_runs: usize,
}

type PassResult = Result<BuildSummary, BuildError>;

/// Resolves when the pass serving the request reaches quiescence.
#[derive(Debug)]
#[must_use = "a compile handle does nothing unless awaited"]
pub struct CompileHandle {
    receiver: oneshot::Receiver<PassResult>,
}

impl Future for CompileHandle {
    type Output = PassResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<PassResult> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(BuildError::PassAborted)))
    }
}

struct FileRecord<T> {
    path: String,
    extension: String,
    file_id: FileId,
    /// Live lexer: the last load, edit, or published (annotated) copy.
    lexer: Option<Arc<Lexer>>,
    /// The lexer the last committed parse produced.
    parsed: Option<Arc<Lexer>>,
    tree: Option<Arc<T>>,
    parse_error_count: usize,
    /// Bumped by every edit; stale load and parse results are dropped.
    revision: u64,
    load_failed: bool,
}

impl<T> FileRecord<T> {
    fn new(path: String, extension: String, file_id: FileId) -> Self {
        FileRecord {
            path,
            extension,
            file_id,
            lexer: None,
            parsed: None,
            tree: None,
            parse_error_count: 0,
            revision: 0,
            load_failed: false,
        }
    }
}

#[derive(Clone)]
struct Published {
    symbols: Arc<SymbolTable>,
    artifacts: Arc<BuildArtifacts>,
}

struct State<T> {
    files: FxHashMap<String, FileRecord<T>>,
    load_queue: VecDeque<String>,
    parse_queue: VecDeque<String>,
    waiters: Vec<oneshot::Sender<PassResult>>,
    compiling: bool,
    /// Bumped by every external load or edit.
    epoch: u64,
    next_file_id: u32,
    published: Option<Published>,
}

impl<T> State<T> {
    fn new() -> Self {
        State {
            files: FxHashMap::default(),
            load_queue: VecDeque::new(),
            parse_queue: VecDeque::new(),
            waiters: Vec::new(),
            compiling: false,
            epoch: 0,
            next_file_id: 0,
            published: None,
        }
    }

    #[inline]
    fn is_quiescent(&self) -> bool {
        self.load_queue.is_empty() && self.parse_queue.is_empty()
    }

    /// Quiescent and no load or edit since `epoch`.
    #[inline]
    fn unchanged_since(&self, epoch: u64) -> bool {
        self.is_quiescent() && self.epoch == epoch
    }
}

fn remove_path(queue: &mut VecDeque<String>, path: &str) {
    queue.retain(|queued| queued != path);
}

fn enqueue_back(queue: &mut VecDeque<String>, path: &str) {
    remove_path(queue, path);
    queue.push_back(path.to_string());
}

fn enqueue_front(queue: &mut VecDeque<String>, path: &str) {
    remove_path(queue, path);
    queue.push_front(path.to_string());
}

fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

struct Shared<F: Frontend> {
    config: BuildConfig,
    frontend: F,
    fs: Arc<dyn FileSystem>,
    observer: Arc<dyn BuildObserver>,
    state: Mutex<State<F::Tree>>,
}

/// Drives the load, parse, and generate pipeline for one project.
///
/// Cheap to clone; clones share the same project. Methods returning a
/// [`CompileHandle`] spawn onto the current Tokio runtime and must be called
/// from within one.
pub struct BuildOrchestrator<F: Frontend> {
    shared: Arc<Shared<F>>,
}

impl<F: Frontend> Clone for BuildOrchestrator<F> {
    fn clone(&self) -> Self {
        BuildOrchestrator {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: Frontend> BuildOrchestrator<F> {
    pub fn new(
        config: BuildConfig,
        frontend: F,
        fs: Arc<dyn FileSystem>,
        observer: Arc<dyn BuildObserver>,
    ) -> Self {
        BuildOrchestrator {
            shared: Arc::new(Shared {
                config,
                frontend,
                fs,
                observer,
                state: Mutex::new(State::new()),
            }),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.shared.config
    }

    pub fn frontend(&self) -> &F {
        &self.shared.frontend
    }

    /// Run the pipeline until quiescent.
    ///
    /// Files whose last load failed are queued again; with
    /// `full_recompile` every file with a scanner is reloaded.
    pub fn compile(&self) -> CompileHandle {
        self.request(true)
    }

    /// Register `path` and queue it for loading. Call once per path.
    pub fn load_file(&self, path: impl Into<String>) -> Result<CompileHandle, BuildError> {
        let path = path.into();
        {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            if state.files.contains_key(&path) {
                return Err(BuildError::AlreadyLoaded(path));
            }
            let file_id = FileId::new(state.next_file_id);
            state.next_file_id += 1;
            let record = FileRecord::new(path.clone(), extension_of(&path), file_id);
            state.files.insert(path.clone(), record);
            enqueue_back(&mut state.load_queue, &path);
            state.epoch += 1;
        }
        debug!(%path, "file registered");
        Ok(self.request(false))
    }

    /// Replace the text of a loaded file with `lexer` (matched by path).
    ///
    /// The file jumps to the front of the parse queue, so the most recently
    /// edited file is parsed first.
    pub fn set_lexer(&self, lexer: Lexer) -> Result<CompileHandle, BuildError> {
        let path = lexer.path().to_string();
        {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let Some(record) = state.files.get_mut(&path) else {
                return Err(BuildError::FileNotLoaded(path));
            };
            record.lexer = Some(Arc::new(lexer));
            record.load_failed = false;
            record.revision += 1;
            remove_path(&mut state.load_queue, &path);
            enqueue_front(&mut state.parse_queue, &path);
            state.epoch += 1;
        }
        debug!(%path, "lexer replaced");
        Ok(self.request(false))
    }

    fn request(&self, requeue: bool) -> CompileHandle {
        let (sender, receiver) = oneshot::channel();
        let start = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            if requeue {
                self.requeue_loads(state);
            }
            state.waiters.push(sender);
            !std::mem::replace(&mut state.compiling, true)
        };
        if start {
            debug!("starting build pass");
            tokio::spawn(Arc::clone(&self.shared).run_pass());
        }
        CompileHandle { receiver }
    }

    fn requeue_loads(&self, state: &mut State<F::Tree>) {
        let config = &self.shared.config;
        let mut reload: Vec<(FileId, String)> = state
            .files
            .values()
            .filter(|record| {
                record.load_failed
                    || (config.full_recompile && config.scanners.contains(&record.extension))
            })
            .map(|record| (record.file_id, record.path.clone()))
            .collect();
        if reload.is_empty() {
            return;
        }
        reload.sort();
        for (_, path) in &reload {
            enqueue_back(&mut state.load_queue, path);
        }
        state.epoch += 1;
    }

    /// The live lexer of `path`, once loaded.
    pub fn lexer(&self, path: &str) -> Option<Arc<Lexer>> {
        self.shared.state.lock().files.get(path)?.lexer.clone()
    }

    /// Parse errors of the last committed parse of `path`.
    pub fn parse_error_count(&self, path: &str) -> Option<usize> {
        let state = self.shared.state.lock();
        let record = state.files.get(path)?;
        record.parsed.as_ref().map(|_| record.parse_error_count)
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        Some(self.shared.state.lock().files.get(path)?.file_id)
    }

    /// Every registered path, in load order.
    pub fn files(&self) -> Vec<String> {
        let state = self.shared.state.lock();
        let mut files: Vec<(FileId, String)> = state
            .files
            .values()
            .map(|record| (record.file_id, record.path.clone()))
            .collect();
        files.sort();
        files.into_iter().map(|(_, path)| path).collect()
    }

    /// The symbol table of the last published pass.
    ///
    /// Treat it as a snapshot: it is replaced, never mutated.
    pub fn symbols(&self) -> Option<Arc<SymbolTable>> {
        let state = self.shared.state.lock();
        state.published.as_ref().map(|p| Arc::clone(&p.symbols))
    }

    pub fn artifacts(&self) -> Option<Arc<BuildArtifacts>> {
        let state = self.shared.state.lock();
        state.published.as_ref().map(|p| Arc::clone(&p.artifacts))
    }

    pub fn is_compiling(&self) -> bool {
        self.shared.state.lock().compiling
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
