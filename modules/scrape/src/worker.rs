//! Runs a scrape on its own thread so the caller stays responsive.

use crate::engine::{ScrapeEngine, ScrapeOptions};
use crate::events::{RunSummary, ScrapeObserver};
use crate::ScrapeError;
use portsort_core::StopFlag;
use services::ServiceTable;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

pub struct ScrapeHandle {
    stop: StopFlag,
    thread: JoinHandle<Result<RunSummary, ScrapeError>>,
}

/// Spawn the scrape worker. Events reach `observer` on the worker thread.
pub fn start<O>(
    input_dir: PathBuf,
    table: Arc<ServiceTable>,
    options: ScrapeOptions,
    observer: O,
) -> std::io::Result<ScrapeHandle>
where
    O: ScrapeObserver + 'static,
{
    start_with_stop_flag(input_dir, table, options, StopFlag::new(), observer)
}

/// Like [`start`], but the worker obeys a flag the caller already holds, so a stop
/// requested before the thread exists is still seen.
pub fn start_with_stop_flag<O>(
    input_dir: PathBuf,
    table: Arc<ServiceTable>,
    options: ScrapeOptions,
    stop: StopFlag,
    mut observer: O,
) -> std::io::Result<ScrapeHandle>
where
    O: ScrapeObserver + 'static,
{
    let worker_stop = stop.clone();
    let thread = std::thread::Builder::new().name("scrape".into()).spawn(move || {
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut engine = ScrapeEngine::new(&table, input_dir, options).with_stop_flag(worker_stop);
            engine.run(&mut observer)
        }));
        result.unwrap_or_else(|_| {
            tracing::error!("scrape worker panicked");
            observer.on_failed("internal error: scrape worker panicked");
            Err(ScrapeError::WorkerPanicked)
        })
    })?;
    Ok(ScrapeHandle { stop, thread })
}

impl ScrapeHandle {
    /// Ask the worker to stop before its next file. Idempotent.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn join(self) -> Result<RunSummary, ScrapeError> {
        self.thread.join().unwrap_or(Err(ScrapeError::WorkerPanicked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RunOutcome, ScrapeEvent};
    use services::ServiceRecord;
    use portsort_core::LogLevel;
    use std::fs;
    use std::sync::Mutex;

    /// Panics on the first progress report; records what reaches it.
    struct PanicOnProgress(Arc<Mutex<Vec<String>>>);

    impl ScrapeObserver for PanicOnProgress {
        fn on_log(&mut self, message: &str, _level: LogLevel) {
            self.0.lock().unwrap().push(format!("log: {message}"));
        }
        fn on_progress(&mut self, _done: usize, _total: usize) {
            panic!("observer blew up");
        }
        fn on_finished(&mut self, _summary: &RunSummary) {
            self.0.lock().unwrap().push("finished".into());
        }
        fn on_failed(&mut self, error: &str) {
            self.0.lock().unwrap().push(format!("failed: {error}"));
        }
    }

    fn table() -> Arc<ServiceTable> {
        Arc::new(ServiceTable::validate(&[ServiceRecord::new("FTP", &["21"])]).unwrap())
    }

    #[test]
    fn streams_events_from_worker_thread() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a.txt"), "http://a:21|u|p\nhttp://b:21|u|p\n").unwrap();
        let opts = ScrapeOptions { results_dir: dir.path().join("out") };

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ScrapeEvent>();
        let handle = start(input, table(), opts, tx).unwrap();
        let mut events = Vec::new();
        while let Some(ev) = rx.blocking_recv() {
            events.push(ev);
        }
        let summary = handle.join().unwrap();
        assert_eq!(summary.count("FTP"), Some(2));
        assert!(matches!(events.last(), Some(ScrapeEvent::Finished(s)) if s == &summary));
        assert!(events.contains(&ScrapeEvent::Progress { done: 1, total: 1 }));
    }

    #[test]
    fn failure_is_reported_once_through_channel() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ScrapeOptions { results_dir: dir.path().join("out") };
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ScrapeEvent>();
        let handle = start(dir.path().join("missing"), table(), opts, tx).unwrap();
        let mut events = Vec::new();
        while let Some(ev) = rx.blocking_recv() {
            events.push(ev);
        }
        assert!(matches!(handle.join(), Err(ScrapeError::ListInput { .. })));
        assert!(matches!(events.as_slice(), [ScrapeEvent::Failed(_)]));
    }

    #[test]
    fn stop_requested_right_after_start_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        for i in 0..50 {
            fs::write(input.join(format!("{i:02}.txt")), format!("http://h{i}:21|u|p\n")).unwrap();
        }
        let opts = ScrapeOptions { results_dir: dir.path().join("out") };
        let handle = start(input, table(), opts, Vec::<ScrapeEvent>::new()).unwrap();
        handle.request_stop();
        handle.request_stop();
        let summary = handle.join().unwrap();
        // the worker may already be inside a file when the flag lands
        assert!(summary.files_processed <= 50);
        if summary.files_processed < 50 {
            assert_eq!(summary.outcome, RunOutcome::Cancelled);
        }
        assert_eq!(summary.count("FTP"), Some(summary.files_processed as u64));
    }

    #[test]
    fn panic_on_worker_is_reported_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a.txt"), "http://a:21|u|p\n").unwrap();
        let opts = ScrapeOptions { results_dir: dir.path().join("out") };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = start(input, table(), opts, PanicOnProgress(seen.clone())).unwrap();
        assert!(matches!(handle.join(), Err(ScrapeError::WorkerPanicked)));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.iter().filter(|e| e.starts_with("failed: ")).count(), 1);
        assert!(seen.last().unwrap().starts_with("failed: "));
        assert!(!seen.iter().any(|e| e == "finished"));
    }

    #[test]
    fn stop_set_before_start_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a.txt"), "http://a:21|u|p\n").unwrap();
        let opts = ScrapeOptions { results_dir: dir.path().join("out") };
        let stop = StopFlag::new();
        stop.request_stop();
        let handle = start_with_stop_flag(input, table(), opts, stop, Vec::<ScrapeEvent>::new()).unwrap();
        let summary = handle.join().unwrap();
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.files_processed, 0);
        assert_eq!(summary.count("FTP"), Some(0));
    }
}
