//! The pass loop: load and parse steps until quiescent, then generate.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tarn_lexer::{Lexer, Scanner};
use tracing::{debug, warn};

use super::{enqueue_back, BuildSummary, Shared};
use crate::artifacts::PhaseTimings;
use crate::config::Threading;
use crate::error::BuildError;
use crate::frontend::Frontend;

/// Fails every waiter if the pass task is torn down before it settles.
struct PassGuard<F: Frontend> {
    shared: Arc<Shared<F>>,
    armed: bool,
}

impl<F: Frontend> PassGuard<F> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<F: Frontend> Drop for PassGuard<F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("build pass ended without settling");
        let waiters = {
            let mut state = self.shared.state.lock();
            state.compiling = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(Err(BuildError::PassAborted));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline stage panicked".to_string()
    }
}

impl<F: Frontend> Shared<F> {
    pub(super) fn status(&self, message: &str) {
        debug!(status = message);
        self.observer.status(message);
    }

    /// Suspension point between stages.
    pub(super) async fn pause(&self) {
        if self.config.stage_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.stage_delay).await;
        }
    }

    /// Run CPU or I/O work where the configuration says, turning panics into
    /// [`BuildError::CompilerFailure`] unless `fail_fast` is set.
    pub(super) async fn run_blocking<R, W>(&self, work: W) -> Result<R, BuildError>
    where
        W: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let outcome = match self.config.threading {
            Threading::Background => match tokio::task::spawn_blocking(work).await {
                Ok(value) => Ok(value),
                Err(error) if error.is_panic() => Err(error.into_panic()),
                Err(_) => return Err(BuildError::PassAborted),
            },
            Threading::Inline => panic::catch_unwind(AssertUnwindSafe(work)),
        };
        outcome.map_err(|payload| {
            if self.config.fail_fast {
                panic::resume_unwind(payload);
            }
            BuildError::CompilerFailure(panic_message(&*payload))
        })
    }

    fn is_quiescent(&self) -> bool {
        self.state.lock().is_quiescent()
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub(super) async fn run_pass(self: Arc<Self>) {
        let mut guard = PassGuard {
            shared: Arc::clone(&self),
            armed: true,
        };
        let mut summary = BuildSummary::default();
        loop {
            let outcome = self.drive(&mut summary).await;
            let waiters = {
                let mut state = self.state.lock();
                if outcome.is_ok() && !state.is_quiescent() {
                    None
                } else {
                    state.compiling = false;
                    Some(std::mem::take(&mut state.waiters))
                }
            };
            let Some(waiters) = waiters else {
                debug!("work queued after publishing; continuing pass");
                continue;
            };
            guard.disarm();
            let result = outcome.map(|()| summary);
            if let Err(error) = &result {
                warn!(%error, "build pass failed");
                self.status(&format!("Compiler failure: {error}"));
            }
            debug!(waiters = waiters.len(), ?result, "build pass settled");
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
            return;
        }
    }

    /// Load and parse until both queues drain, then generate; repeat until a
    /// generate completes.
    async fn drive(self: &Arc<Self>, summary: &mut BuildSummary) -> Result<(), BuildError> {
        let mut timings = PhaseTimings::default();
        loop {
            while !self.is_quiescent() {
                let (loaded, parsed) = tokio::join!(self.load_step(), self.parse_step());
                timings.load += loaded?;
                timings.parse += parsed?;
            }
            summary.generate_runs += 1;
            if let Some((errors, warnings)) = self.generate(timings).await? {
                summary.errors = errors;
                summary.warnings = warnings;
                return Ok(());
            }
            summary.abandoned_runs += 1;
            debug!("generate abandoned; back to load and parse");
        }
    }

    /// Pop the next path that needs loading, with its revision and scanner.
    fn next_load(&self) -> Option<(String, u64, Arc<dyn Scanner>)> {
        let mut state = self.state.lock();
        while let Some(path) = state.load_queue.pop_front() {
            let Some(record) = state.files.get(&path) else {
                continue;
            };
            if record.lexer.is_some() && !self.config.full_recompile {
                continue;
            }
            let Some(scanner) = self.config.scanners.get(&record.extension) else {
                debug!(%path, "no scanner for extension; skipping");
                continue;
            };
            return Some((path, record.revision, scanner));
        }
        None
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn load_step(self: &Arc<Self>) -> Result<Duration, BuildError> {
        let Some((path, revision, scanner)) = self.next_load() else {
            return Ok(Duration::ZERO);
        };
        self.status(&format!("Loading {path}"));
        self.pause().await;

        let started = Instant::now();
        let fs = Arc::clone(&self.fs);
        let read_path = path.clone();
        let lexed = self
            .run_blocking(move || {
                let lines = fs
                    .read_all_lines(&read_path)
                    .map_err(|error| BuildError::read(&read_path, &error))?;
                Ok::<_, BuildError>(Lexer::from_lines(scanner, read_path, lines))
            })
            .await?;
        let elapsed = started.elapsed();

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(record) = state.files.get_mut(&path) else {
            return Ok(elapsed);
        };
        if record.revision != revision {
            debug!(%path, "discarding load superseded by an edit");
            return Ok(elapsed);
        }
        let lexer = match lexed {
            Ok(lexer) => lexer,
            Err(error) => {
                record.load_failed = true;
                return Err(error);
            }
        };
        record.lexer = Some(Arc::new(lexer));
        record.load_failed = false;
        enqueue_back(&mut state.parse_queue, &path);
        Ok(elapsed)
    }

    /// Pop the next path that has a lexer, with its revision, the lexer, and
    /// whether the frontend parses it.
    fn next_parse(&self) -> Option<(String, u64, Arc<Lexer>, bool)> {
        let mut state = self.state.lock();
        while let Some(path) = state.parse_queue.pop_front() {
            let Some(record) = state.files.get(&path) else {
                continue;
            };
            let Some(lexer) = &record.lexer else {
                continue;
            };
            let parses = self.frontend.parses(&record.extension);
            return Some((path, record.revision, Arc::clone(lexer), parses));
        }
        None
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn parse_step(self: &Arc<Self>) -> Result<Duration, BuildError> {
        let Some((path, revision, live, parses)) = self.next_parse() else {
            return Ok(Duration::ZERO);
        };
        self.status(&format!("Parsing {path}"));
        self.pause().await;

        let started = Instant::now();
        let shared = Arc::clone(self);
        let (lexer, output) = self
            .run_blocking(move || {
                let mut lexer = live.snapshot();
                let output = parses.then(|| shared.frontend.parse(&mut lexer));
                (lexer, output)
            })
            .await?;
        let elapsed = started.elapsed();

        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.parse_queue.contains(&path) {
                debug!(%path, "discarding parse; file was edited again");
                return Ok(elapsed);
            }
            let Some(record) = state.files.get_mut(&path) else {
                return Ok(elapsed);
            };
            if record.revision != revision {
                debug!(%path, "discarding parse of a stale revision");
                return Ok(elapsed);
            }
            let lexer = Arc::new(lexer);
            record.lexer = Some(Arc::clone(&lexer));
            record.parsed = Some(lexer);
            match output {
                Some(output) => {
                    record.parse_error_count = output.error_count;
                    record.tree = Some(Arc::new(output.tree));
                }
                None => {
                    record.parse_error_count = 0;
                    record.tree = None;
                }
            }
        }
        self.observer.file_updated(&path);
        Ok(elapsed)
    }
}
