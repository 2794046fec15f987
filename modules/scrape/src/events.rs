//! Observer boundary: everything a front-end learns about a running scrape.

use portsort_core::LogLevel;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Final report of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub message: String,
    pub files_total: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    /// Matches written per service, in table order.
    pub counts: Vec<(String, u64)>,
    pub results_dir: PathBuf,
}

impl RunSummary {
    pub fn count(&self, service: &str) -> Option<u64> {
        self.counts.iter().find(|(name, _)| name == service).map(|(_, n)| *n)
    }

    pub fn total_matches(&self) -> u64 {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

/// Receives run events in the order they happen. Exactly one of `on_finished` /
/// `on_failed` is called, last.
pub trait ScrapeObserver: Send {
    fn on_log(&mut self, _message: &str, _level: LogLevel) {}
    fn on_progress(&mut self, _files_done: usize, _files_total: usize) {}
    fn on_count_changed(&mut self, _service: &str, _count: u64) {}
    fn on_finished(&mut self, _summary: &RunSummary) {}
    fn on_failed(&mut self, _error: &str) {}
}

/// Owned form of each observer callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    Log { message: String, level: LogLevel },
    Progress { done: usize, total: usize },
    CountChanged { service: String, count: u64 },
    Finished(RunSummary),
    Failed(String),
}

impl ScrapeEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScrapeEvent::Finished(_) | ScrapeEvent::Failed(_))
    }
}

/// Records events in memory.
impl ScrapeObserver for Vec<ScrapeEvent> {
    fn on_log(&mut self, message: &str, level: LogLevel) {
        self.push(ScrapeEvent::Log { message: message.to_string(), level });
    }
    fn on_progress(&mut self, done: usize, total: usize) {
        self.push(ScrapeEvent::Progress { done, total });
    }
    fn on_count_changed(&mut self, service: &str, count: u64) {
        self.push(ScrapeEvent::CountChanged { service: service.to_string(), count });
    }
    fn on_finished(&mut self, summary: &RunSummary) {
        self.push(ScrapeEvent::Finished(summary.clone()));
    }
    fn on_failed(&mut self, error: &str) {
        self.push(ScrapeEvent::Failed(error.to_string()));
    }
}

/// Streams events to another thread. A dropped receiver just discards them.
impl ScrapeObserver for UnboundedSender<ScrapeEvent> {
    fn on_log(&mut self, message: &str, level: LogLevel) {
        let _ = self.send(ScrapeEvent::Log { message: message.to_string(), level });
    }
    fn on_progress(&mut self, done: usize, total: usize) {
        let _ = self.send(ScrapeEvent::Progress { done, total });
    }
    fn on_count_changed(&mut self, service: &str, count: u64) {
        let _ = self.send(ScrapeEvent::CountChanged { service: service.to_string(), count });
    }
    fn on_finished(&mut self, summary: &RunSummary) {
        let _ = self.send(ScrapeEvent::Finished(summary.clone()));
    }
    fn on_failed(&mut self, error: &str) {
        let _ = self.send(ScrapeEvent::Failed(error.to_string()));
    }
}
