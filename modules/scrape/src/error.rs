use services::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot list input directory {path}: {source}")]
    ListInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot prepare output {path}: {source}")]
    OutputSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Recovered inside the file loop; never ends a run.
    #[error("cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scrape already started")]
    AlreadyStarted,
    #[error("scrape worker panicked")]
    WorkerPanicked,
}
