//! The per-file, per-line scrape loop.

use crate::dedup::DedupIndex;
use crate::events::{RunOutcome, RunSummary, ScrapeObserver};
use crate::router::OutputRouter;
use crate::ScrapeError;
use line_matcher::LineMatcher;
use portsort_core::{LogLevel, StopFlag, RESULTS_DIR};
use services::{PortIndex, ServiceTable};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// Where per-service output files are written.
    pub results_dir: PathBuf,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        ScrapeOptions { results_dir: PathBuf::from(RESULTS_DIR) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Default)]
struct RunState {
    files_total: usize,
    files_processed: usize,
    files_failed: usize,
}

/// Start of the log line emitted as each file begins; the file name follows.
pub const PROCESSING_LOG_PREFIX: &str = "-> processing: ";

/// Drives one scrape of `input_dir` against a service table. An engine runs at most once.
pub struct ScrapeEngine<'t> {
    table: &'t ServiceTable,
    input_dir: PathBuf,
    options: ScrapeOptions,
    stop: StopFlag,
    state: EngineState,
}

impl<'t> ScrapeEngine<'t> {
    pub fn new(table: &'t ServiceTable, input_dir: impl Into<PathBuf>, options: ScrapeOptions) -> Self {
        ScrapeEngine { table, input_dir: input_dir.into(), options, stop: StopFlag::new(), state: EngineState::Idle }
    }

    /// Use a stop flag shared with the caller.
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Run to completion, cancellation or failure. The observer sees exactly one
    /// terminal event, after all others.
    pub fn run(&mut self, observer: &mut dyn ScrapeObserver) -> Result<RunSummary, ScrapeError> {
        if self.state != EngineState::Idle {
            return Err(ScrapeError::AlreadyStarted);
        }
        self.state = EngineState::Running;
        info!(input = %self.input_dir.display(), services = self.table.len(), "scrape started");
        match self.execute(observer) {
            Ok(summary) => {
                self.state = match summary.outcome {
                    RunOutcome::Completed => EngineState::Completed,
                    RunOutcome::Cancelled => EngineState::Cancelled,
                };
                info!(
                    outcome = ?summary.outcome,
                    files = summary.files_processed,
                    matches = summary.total_matches(),
                    "scrape finished"
                );
                observer.on_finished(&summary);
                Ok(summary)
            }
            Err(e) => {
                self.state = EngineState::Failed;
                tracing::error!(error = %e, "scrape failed");
                observer.on_failed(&e.to_string());
                Err(e)
            }
        }
    }

    fn execute(&self, observer: &mut dyn ScrapeObserver) -> Result<RunSummary, ScrapeError> {
        let matcher = LineMatcher::build(self.table.all_ports())?;
        debug!(ports = matcher.port_count(), "match pattern compiled");
        let ports = self.table.port_index();
        let files = discover_inputs(&self.input_dir)?;
        // dropping the router on an early return releases every destination
        let mut router = OutputRouter::open(self.table, &self.options.results_dir)?;
        let mut seen = DedupIndex::new();
        let mut run = RunState { files_total: files.len(), ..RunState::default() };

        if files.is_empty() {
            observer.on_log(&format!("no .txt files found in '{}'", display_name(&self.input_dir)), LogLevel::Info);
            router.close_all()?;
            return Ok(self.summary(RunOutcome::Completed, "finished: no files to process".into(), &run, &router));
        }

        let mut outcome = RunOutcome::Completed;
        for path in &files {
            if self.stop.is_stop_requested() {
                observer.on_log("stopped by user", LogLevel::Action);
                outcome = RunOutcome::Cancelled;
                break;
            }
            let name = display_name(path);
            observer.on_log(&format!("{}{}", PROCESSING_LOG_PREFIX, name), LogLevel::Info);
            match scan_file(path, &matcher, &ports, &mut seen, &mut router, observer) {
                Ok(new_matches) => debug!(file = %name, new_matches, "file done"),
                Err(ScrapeError::FileRead { source, .. }) => {
                    warn!(file = %name, error = %source, "skipping unreadable file");
                    run.files_failed += 1;
                    observer.on_log(&format!("  -> failed to process '{}': {}", name, source), LogLevel::Error);
                }
                Err(e) => return Err(e),
            }
            run.files_processed += 1;
            observer.on_progress(run.files_processed, run.files_total);
        }

        router.close_all()?;
        let message = match outcome {
            RunOutcome::Completed => {
                let msg = format!("scrape finished; results saved in '{}'", self.options.results_dir.display());
                observer.on_log(&msg, LogLevel::Success);
                msg
            }
            RunOutcome::Cancelled => {
                format!("scrape stopped after {} of {} files", run.files_processed, run.files_total)
            }
        };
        Ok(self.summary(outcome, message, &run, &router))
    }

    fn summary(&self, outcome: RunOutcome, message: String, run: &RunState, router: &OutputRouter) -> RunSummary {
        RunSummary {
            outcome,
            message,
            files_total: run.files_total,
            files_processed: run.files_processed,
            files_failed: run.files_failed,
            counts: router.counts(),
            results_dir: self.options.results_dir.clone(),
        }
    }
}

/// `*.txt` entries directly inside `dir`, sorted by file name.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, ScrapeError> {
    let list_err = |source| ScrapeError::ListInput { path: dir.to_path_buf(), source };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let path = entry.map_err(list_err)?.path();
        if path.extension() == Some(OsStr::new("txt")) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Stream one file line by line. Returns how many new matches were written.
fn scan_file(
    path: &Path,
    matcher: &LineMatcher,
    ports: &PortIndex,
    seen: &mut DedupIndex,
    router: &mut OutputRouter,
    observer: &mut dyn ScrapeObserver,
) -> Result<u64, ScrapeError> {
    let read_err = |source| ScrapeError::FileRead { path: path.to_path_buf(), source };
    let mut reader = BufReader::new(File::open(path).map_err(read_err)?);
    let mut buf = Vec::new();
    let mut written = 0u64;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(read_err)? == 0 {
            break;
        }
        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches(['\n', '\r']);
        for m in matcher.find_all(line) {
            if !seen.insert_if_absent(m.text) {
                continue;
            }
            // cannot happen for a pattern built from the same table
            let Some(service) = ports.service_for(m.port) else {
                continue;
            };
            if let Some(count) = router.write(service, m.text)? {
                written += 1;
                observer.on_count_changed(service, count);
            }
        }
    }
    Ok(written)
}

fn display_name(path: &Path) -> String {
    path.file_name().unwrap_or(path.as_os_str()).to_string_lossy().into_owned()
}
