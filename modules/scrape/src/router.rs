//! One truncated output file per service, plus running match counts.

use crate::ScrapeError;
use services::ServiceTable;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

struct Slot {
    service: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    count: u64,
}

/// Owns every output destination of a run. Destinations are flushed and released by
/// `close_all`, or on drop if that never happened.
pub struct OutputRouter {
    slots: Vec<Slot>,
    by_name: HashMap<String, usize>,
}

impl OutputRouter {
    /// Create `results_dir` if needed and truncate one file per service. Either every
    /// destination opens or none is kept.
    pub fn open(table: &ServiceTable, results_dir: &Path) -> Result<Self, ScrapeError> {
        fs::create_dir_all(results_dir)
            .map_err(|source| ScrapeError::OutputSetup { path: results_dir.to_path_buf(), source })?;
        let mut slots = Vec::with_capacity(table.len());
        let mut by_name = HashMap::with_capacity(table.len());
        for svc in table.iter() {
            let path = results_dir.join(&svc.output_file);
            let file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&path)
                .map_err(|source| ScrapeError::OutputSetup { path: path.clone(), source })?;
            by_name.insert(svc.name.clone(), slots.len());
            slots.push(Slot { service: svc.name.clone(), path, writer: Some(BufWriter::new(file)), count: 0 });
        }
        Ok(OutputRouter { slots, by_name })
    }

    /// Append `text` as one line to the service's destination. Returns the new count, or
    /// `None` when the service is unknown.
    pub fn write(&mut self, service: &str, text: &str) -> Result<Option<u64>, ScrapeError> {
        let Some(&idx) = self.by_name.get(service) else {
            return Ok(None);
        };
        let slot = &mut self.slots[idx];
        let Some(w) = slot.writer.as_mut() else {
            return Err(ScrapeError::Output {
                path: slot.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "destination already closed"),
            });
        };
        writeln!(w, "{}", text).map_err(|source| ScrapeError::Output { path: slot.path.clone(), source })?;
        slot.count += 1;
        Ok(Some(slot.count))
    }

    pub fn count(&self, service: &str) -> Option<u64> {
        self.by_name.get(service).map(|&i| self.slots[i].count)
    }

    /// Per-service counts in table order.
    pub fn counts(&self) -> Vec<(String, u64)> {
        self.slots.iter().map(|s| (s.service.clone(), s.count)).collect()
    }

    /// Flush and release every destination. Safe to call more than once; all
    /// destinations are released even if one fails, and the first failure is returned.
    pub fn close_all(&mut self) -> Result<(), ScrapeError> {
        let mut first_err = None;
        for slot in &mut self.slots {
            if let Some(mut w) = slot.writer.take() {
                if let Err(source) = w.flush() {
                    first_err.get_or_insert(ScrapeError::Output { path: slot.path.clone(), source });
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for OutputRouter {
    fn drop(&mut self) {
        if let Err(e) = self.close_all() {
            tracing::error!(error = %e, "flushing outputs on drop failed");
        }
    }
}
