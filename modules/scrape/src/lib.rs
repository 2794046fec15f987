//! Classify credential dump lines by embedded port and write each service's matches once.
//!
//! [`ScrapeEngine`] streams every `*.txt` file of an input directory, matches lines with a
//! [`line_matcher::LineMatcher`] built from the service table, drops matches already seen
//! in this run and appends the rest to one output file per service. [`worker::start`] runs
//! the same loop on a dedicated thread with a cooperative stop flag.

mod dedup;
mod engine;
mod error;
mod events;
mod router;
pub mod worker;

pub use dedup::DedupIndex;
pub use engine::{discover_inputs, PROCESSING_LOG_PREFIX, EngineState, ScrapeEngine, ScrapeOptions};
pub use error::ScrapeError;
pub use events::{RunOutcome, RunSummary, ScrapeEvent, ScrapeObserver};
pub use router::OutputRouter;
pub use worker::{start, start_with_stop_flag, ScrapeHandle};
