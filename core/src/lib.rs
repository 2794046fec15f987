//! Core utilities and shared types for the portsort engine.

use serde::Serialize;
use std::fmt;

pub mod stop;

pub use stop::StopFlag;

/// Directory (relative to the working directory) that receives one output file per service.
pub const RESULTS_DIR: &str = "RESULT LIST";

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Severity tag attached to user-facing run log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Error,
    Action,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Error => "ERROR",
            LogLevel::Action => "ACTION",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
