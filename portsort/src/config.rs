use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "portsort.yaml";

/// Optional CLI defaults; flags take precedence.
#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Service definitions JSON.
    pub services: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub format: Option<String>,
}

pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(CONFIG_FILE);
            if p.exists() { p.to_path_buf() } else { return None; }
        }
    };
    let s = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config not readable; ignoring");
            return None;
        }
    };
    match serde_yaml::from_str(&s) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config not valid YAML; ignoring");
            None
        }
    }
}
