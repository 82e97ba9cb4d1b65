// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run summary — the block logged at the end of every run, plus an optional
// machine-readable JSON report.

use std::fmt::Write as _;
use std::path::Path;

use pdfguard_core::BatchResult;
use pdfguard_core::error::Result;
use tracing::info;

use crate::staging::write_atomic;

const RULE_WIDTH: usize = 60;

/// Render the summary block: totals, success rate, duration, backup location
/// and one entry per failure with its suggested fix.
pub fn render_summary(result: &BatchResult, backup_root: &Path) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "PROTECTION SUMMARY");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Run: {}", result.run_id);
    let _ = writeln!(out, "Total files processed: {}", result.processed);
    let _ = writeln!(out, "Successfully protected: {}", result.succeeded);
    let _ = writeln!(out, "Failed: {}", result.failed);
    let _ = writeln!(out, "Success rate: {:.1}%", result.success_rate());
    if let Some(finished) = result.finished_at {
        let millis = (finished - result.started_at).num_milliseconds().max(0);
        let _ = writeln!(out, "Duration: {:.2}s", millis as f64 / 1000.0);
    }
    let _ = writeln!(out, "Backups stored under: {}", backup_root.display());

    if !result.is_clean() {
        let _ = writeln!(out, "Failures:");
        for failure in result.failures() {
            let _ = writeln!(
                out,
                "  - {} [{}]: {}",
                failure.path.display(),
                failure.stage,
                failure.error.as_deref().unwrap_or("unknown error")
            );
            if let Some(suggestion) = &failure.suggestion {
                let _ = writeln!(out, "    {suggestion}");
            }
            if !failure.restored {
                let _ = writeln!(out, "    (original was NOT restored from backup)");
            }
        }
    }
    let _ = write!(out, "{rule}");
    out
}

/// Emit the summary through `tracing`, one event per line.
pub fn log_summary(result: &BatchResult, backup_root: &Path) {
    for line in render_summary(result, backup_root).lines() {
        info!("{line}");
    }
}

/// Write the full result (every outcome) as pretty JSON.
pub fn write_json_report(result: &BatchResult, path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    write_atomic(path.as_ref(), json.as_bytes())?;
    info!(path = %path.as_ref().display(), "Wrote JSON report");
    Ok(())
}
