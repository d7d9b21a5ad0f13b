// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Console rendering of batch events and inspection summaries.

use bindery_archive::ArchiveSummary;
use bindery_batch::BatchEvent;
use bindery_core::{BatchResult, ConversionJob, JobStatus};

/// Render one event as a console line, or `None` for events not shown.
pub fn render_event(event: &BatchEvent) -> Option<String> {
    match event {
        BatchEvent::Progress(progress) => Some(format!(
            "[{:>3}%] {}",
            progress.overall_percent, progress.message
        )),
        BatchEvent::JobStarted { .. } => None,
        BatchEvent::JobFinished(job) => Some(render_job(job)),
        BatchEvent::Finished(result) => Some(render_summary(result)),
    }
}

fn render_job(job: &ConversionJob) -> String {
    let name = job.display_name();
    let mut line = match job.status() {
        JobStatus::Succeeded => format!(
            "ok       {name} -> {} ({} pages)",
            job.target_path.display(),
            job.pages_written.unwrap_or_default()
        ),
        JobStatus::Cancelled => format!("skipped  {name}: cancelled"),
        _ => format!(
            "FAILED   {name}: {}",
            job.error_detail().unwrap_or("unknown error")
        ),
    };
    if let Some(hint) = &job.error_hint {
        line.push_str(&format!("\n         {hint}"));
    }
    for warning in &job.warnings {
        line.push_str(&format!("\n         warning: {warning}"));
    }
    line
}

fn render_summary(result: &BatchResult) -> String {
    format!(
        "{} converted, {} failed, {} cancelled ({} total)",
        result.succeeded_count, result.failed_count, result.cancelled_count, result.total
    )
}

pub fn render_summary_table(path: &str, summary: &ArchiveSummary) -> String {
    let mut out = format!(
        "{path}\n  format:   {}\n  pages:    {}\n  size:     {} bytes\n  metadata: {}\n  folders:  {}",
        summary.format,
        summary.page_count,
        summary.total_bytes,
        yes_no(summary.has_metadata),
        yes_no(summary.has_folders),
    );
    if let (Some(first), Some(last)) = (summary.page_names.first(), summary.page_names.last()) {
        out.push_str(&format!("\n  first:    {first}\n  last:     {last}"));
    }
    out
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
