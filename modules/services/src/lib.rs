//! Service table: which ports belong to which named service, and where its matches go.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

mod error;
pub mod store;

pub use error::ConfigError;

/// A service as it appears in the JSON config, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default, alias = "outputFile", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Display hint for front-ends; ignored here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ServiceRecord {
    pub fn new(name: &str, ports: &[&str]) -> Self {
        ServiceRecord {
            name: name.to_string(),
            ports: ports.iter().map(|p| p.to_string()).collect(),
            file: None,
            icon: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub ports: Vec<String>,
    pub output_file: String,
}

/// Validated, immutable set of services in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTable {
    services: Vec<ServiceDefinition>,
}

impl ServiceTable {
    /// Validate raw records into a table.
    ///
    /// A port claimed by more than one service belongs to the last one declared; it is
    /// dropped from the earlier services so every port maps to exactly one service.
    pub fn validate(records: &[ServiceRecord]) -> Result<Self, ConfigError> {
        let mut services = Vec::with_capacity(records.len());
        let mut names = HashSet::new();
        let mut files = HashSet::new();

        for rec in records {
            let name = rec.name.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if !names.insert(name.to_lowercase()) {
                return Err(ConfigError::DuplicateName { name: name.to_string() });
            }
            if rec.ports.is_empty() {
                return Err(ConfigError::NoPorts { service: name.to_string() });
            }
            let mut ports: Vec<String> = Vec::with_capacity(rec.ports.len());
            for raw in &rec.ports {
                let p = raw.trim();
                if !is_port(p) {
                    return Err(ConfigError::InvalidPort { service: name.to_string(), port: raw.clone() });
                }
                if !ports.iter().any(|q| q == p) {
                    ports.push(p.to_string());
                }
            }
            let output_file = match rec.file.as_deref().map(str::trim) {
                Some(f) if !f.is_empty() => f.to_string(),
                _ => format!("{}.txt", name),
            };
            if !is_path_segment(&output_file) {
                return Err(ConfigError::InvalidOutputFile { service: name.to_string(), file: output_file });
            }
            if !files.insert(output_file.to_lowercase()) {
                return Err(ConfigError::DuplicateOutputFile { file: output_file });
            }
            services.push(ServiceDefinition { name: name.to_string(), ports, output_file });
        }

        // last declaration wins a contested port
        let owned: Vec<Vec<String>> = {
            let mut owner: HashMap<&str, usize> = HashMap::new();
            for (idx, svc) in services.iter().enumerate() {
                for p in &svc.ports {
                    if let Some(prev) = owner.insert(p.as_str(), idx) {
                        tracing::warn!(
                            port = %p,
                            dropped_from = %services[prev].name,
                            owner = %svc.name,
                            "port configured for two services; last one wins"
                        );
                    }
                }
            }
            services
                .iter()
                .enumerate()
                .map(|(idx, svc)| svc.ports.iter().filter(|p| owner.get(p.as_str()) == Some(&idx)).cloned().collect())
                .collect()
        };
        for (svc, ports) in services.iter_mut().zip(owned) {
            svc.ports = ports;
        }

        Ok(ServiceTable { services })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Every configured port across all services, in declaration order.
    pub fn all_ports(&self) -> Vec<&str> {
        self.services.iter().flat_map(|s| s.ports.iter().map(String::as_str)).collect()
    }

    pub fn port_index(&self) -> PortIndex {
        let mut map = HashMap::new();
        for svc in &self.services {
            for p in &svc.ports {
                map.insert(p.clone(), svc.name.clone());
            }
        }
        PortIndex { map }
    }
}

/// Port string -> owning service name.
#[derive(Debug, Clone, Default)]
pub struct PortIndex {
    map: HashMap<String, String>,
}

impl PortIndex {
    pub fn service_for(&self, port: &str) -> Option<&str> {
        self.map.get(port).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn is_port(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_path_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\'])
}
