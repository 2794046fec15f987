use std::path::PathBuf;
use thiserror::Error;

/// Problems with the service table or the file it is stored in.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("service name must not be empty")]
    EmptyName,
    #[error("service '{service}' has no ports")]
    NoPorts { service: String },
    #[error("service '{service}' has invalid port '{port}' (digits only)")]
    InvalidPort { service: String, port: String },
    #[error("duplicate service name '{name}'")]
    DuplicateName { name: String },
    #[error("service '{service}' has invalid output file '{file}'")]
    InvalidOutputFile { service: String, file: String },
    #[error("output file '{file}' is used by more than one service")]
    DuplicateOutputFile { file: String },
    #[error("no service '{name}'")]
    UnknownService { name: String },
    #[error("no ports configured to scrape")]
    NoPortsConfigured,
    #[error("invalid match pattern: {0}")]
    InvalidPattern(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
