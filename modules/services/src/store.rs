//! JSON file holding the editable list of services.

use crate::{ConfigError, ServiceRecord};
use serde_json::error::Category;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "services_config.json";

/// Built-in services written when no config exists yet.
pub fn default_records() -> Vec<ServiceRecord> {
    const DEFAULTS: &[(&str, &[&str], &str)] = &[
        ("FTP", &["21"], "fa5s.folder-open"),
        ("SSH", &["22"], "fa5s.terminal"),
        ("cPanel", &["2082", "2083"], "fa5s.tachometer-alt"),
        ("WHM", &["2086", "2087"], "fa5s.users-cog"),
        ("Plesk", &["8443"], "fa5s.th-large"),
    ];
    DEFAULTS
        .iter()
        .map(|(name, ports, icon)| ServiceRecord {
            name: name.to_string(),
            ports: ports.iter().map(|p| p.to_string()).collect(),
            file: Some(format!("{}.txt", name)),
            icon: Some(icon.to_string()),
        })
        .collect()
}

/// Load the records at `path`, writing the defaults first if the file is missing.
/// A file that is not valid JSON is replaced by the defaults; valid JSON of the wrong
/// shape is an error and the file is left alone.
pub fn load_or_init(path: &Path) -> Result<Vec<ServiceRecord>, ConfigError> {
    if !path.exists() {
        let defaults = default_records();
        save(path, &defaults)?;
        return Ok(defaults);
    }
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    match serde_json::from_str(&s) {
        Ok(records) => Ok(records),
        Err(e) if matches!(e.classify(), Category::Data | Category::Io) => {
            Err(ConfigError::Json { path: path.to_path_buf(), source: e })
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "service config unreadable; restoring defaults");
            let defaults = default_records();
            save(path, &defaults)?;
            Ok(defaults)
        }
    }
}

pub fn save(path: &Path, records: &[ServiceRecord]) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(records).map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?;
    fs::write(path, json).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

/// Parse a comma-separated port list ("21, 2121"). Duplicates collapse; result is sorted numerically.
pub fn parse_port_list(service: &str, spec: &str) -> Result<Vec<String>, ConfigError> {
    let mut ports = Vec::new();
    for part in spec.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidPort { service: service.to_string(), port: part.to_string() });
        }
        ports.push(part.to_string());
    }
    if ports.is_empty() {
        return Err(ConfigError::NoPorts { service: service.to_string() });
    }
    ports.sort_unstable_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    ports.dedup();
    Ok(ports)
}

/// Append a new service built from user input.
pub fn add_service(
    records: &mut Vec<ServiceRecord>,
    name: &str,
    ports_spec: &str,
    file: Option<String>,
    icon: Option<String>,
) -> Result<(), ConfigError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    if records.iter().any(|r| r.name.trim().eq_ignore_ascii_case(name)) {
        return Err(ConfigError::DuplicateName { name: name.to_string() });
    }
    let ports = parse_port_list(name, ports_spec)?;
    let icon = icon.unwrap_or_else(|| {
        if name.contains(' ') { "fa5s.question-circle".to_string() } else { format!("fa5s.{}", name.to_lowercase()) }
    });
    records.push(ServiceRecord {
        name: name.to_string(),
        ports,
        file: Some(file.unwrap_or_else(|| format!("{}.txt", name))),
        icon: Some(icon),
    });
    Ok(())
}

pub fn remove_service(records: &mut Vec<ServiceRecord>, name: &str) -> Result<ServiceRecord, ConfigError> {
    match records.iter().position(|r| r.name == name) {
        Some(i) => Ok(records.remove(i)),
        None => Err(ConfigError::UnknownService { name: name.to_string() }),
    }
}
