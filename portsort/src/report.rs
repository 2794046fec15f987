//! Final run summary in text, JSON or CSV form.

use anyhow::Result;
use scrape::RunSummary;
use services::ServiceTable;
use std::io::Write;
use std::path::Path;

pub struct RunTimes {
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u128,
}

pub fn summary_text(table: &ServiceTable, summary: &RunSummary) -> String {
    let mut out = format!(
        "{} ({} of {} files, {} failed)\n",
        summary.message, summary.files_processed, summary.files_total, summary.files_failed
    );
    let width = table.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for svc in table.iter() {
        let n = summary.count(&svc.name).unwrap_or(0);
        let path = summary.results_dir.join(&svc.output_file);
        out.push_str(&format!("  {:<width$}  {:>7} -> {}\n", svc.name, n, path.display(), width = width));
    }
    out
}

pub fn summary_json(input: &Path, table: &ServiceTable, summary: &RunSummary, times: &RunTimes) -> serde_json::Value {
    let counts: Vec<serde_json::Value> = table
        .iter()
        .map(|svc| {
            serde_json::json!({
                "service": svc.name,
                "ports": svc.ports,
                "output_file": summary.results_dir.join(&svc.output_file),
                "matches": summary.count(&svc.name).unwrap_or(0),
            })
        })
        .collect();
    serde_json::json!({
        "input": input,
        "results_dir": summary.results_dir,
        "outcome": summary.outcome,
        "message": summary.message,
        "files_total": summary.files_total,
        "files_processed": summary.files_processed,
        "files_failed": summary.files_failed,
        "counts": counts,
        "started_at": times.started_at,
        "ended_at": times.ended_at,
        "duration_ms": times.duration_ms,
    })
}

pub fn write_csv<W: Write>(w: W, table: &ServiceTable, summary: &RunSummary) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(["service", "ports", "output_file", "matches"])?;
    for svc in table.iter() {
        let path = summary.results_dir.join(&svc.output_file);
        wtr.write_record([
            svc.name.clone(),
            svc.ports.join(";"),
            path.to_string_lossy().into_owned(),
            summary.count(&svc.name).unwrap_or(0).to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
