//! Trial summary → human/json string formatting.

use indexbench_core::Error;
use indexbench_engine::TrialSummary;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format a completed trial.
pub fn format_summary(summary: &TrialSummary, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(summary)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => format_human(summary),
    }
}

fn format_human(summary: &TrialSummary) -> String {
    let mut lines = Vec::new();
    lines.push(format!("[{}]", summary.backend));
    if let Some(p) = &summary.population {
        lines.push(format!(
            "  populated:   {} records in {:.1} ms ({:.0} records/s)",
            p.records,
            p.elapsed.as_secs_f64() * 1000.0,
            p.records_per_sec
        ));
    }
    lines.push(format!(
        "  indexed:     {} ops in {:.1} ms ({:.0} ops/s)",
        summary.operations,
        summary.measured.as_secs_f64() * 1000.0,
        summary.ops_per_sec
    ));
    lines.push(format!("  index size:  {}", summary.final_index_size));
    match summary.existing_hits {
        Some(hits) => lines.push(format!("  existing:    {} (validated)", hits)),
        None => lines.push("  existing:    n/a (append-only, not validated)".to_string()),
    }
    if let Some(rss) = summary.memory.rss_bytes {
        lines.push(format!("  rss:         {:.1} MiB", rss as f64 / (1024.0 * 1024.0)));
    }
    if let Some(e) = &summary.release_error {
        lines.push(format!("  release:     {}", e));
    }
    lines.join("\n")
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "error": format!("{}", err)
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Human => format!("(error) {}", err),
    }
}
