// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator: runs conversion jobs on the blocking pool with
// per-job failure isolation.
//
// Every error a job can produce is caught at the job boundary and recorded on
// the job; nothing one job does reaches another job or the batch's control
// flow. Cancellation is checked before each job starts and, inside the
// pipeline, between pages.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use bindery_archive::{
    Capabilities, FileProgress, convert, is_same_file, validate_for_conversion, validate_output,
};
use bindery_core::error::JobStateError;
use bindery_core::human_errors::humanize_error;
use bindery_core::integrity::hash_file;
use bindery_core::{BatchResult, ConversionError, ConversionJob, JobStatus, ValidationError};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::events::{BatchEvent, ChannelSink, ProgressSink};
use crate::progress::ProgressReporter;

/// Runs batches of conversion jobs against one set of capabilities.
#[derive(Debug, Clone, Default)]
pub struct BatchOrchestrator {
    caps: Capabilities,
}

/// A batch running in the background.
pub struct BatchHandle {
    events: mpsc::UnboundedReceiver<BatchEvent>,
    cancel: CancellationToken,
    task: JoinHandle<BatchResult>,
}

impl BatchHandle {
    /// Next event from the batch; `None` once the batch is over and every
    /// event has been received.
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Ask the batch to stop. Jobs not yet started end `Cancelled`; the
    /// running job stops at its next page boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the batch to finish. Undelivered events are discarded.
    pub async fn wait(self) -> Result<BatchResult, JoinError> {
        self.task.await
    }
}

/// Per-job context shared with the blocking worker.
struct JobContext {
    caps: Capabilities,
    cancel: CancellationToken,
    reporter: Arc<ProgressReporter>,
    sink: Arc<dyn ProgressSink>,
    position: usize,
    total: usize,
}

impl BatchOrchestrator {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Start `jobs` in the background and return immediately. Must be called
    /// from within a tokio runtime.
    pub fn spawn(&self, jobs: Vec<ConversionJob>) -> BatchHandle {
        let (sink, events) = ChannelSink::new();
        let cancel = CancellationToken::new();
        let orchestrator = self.clone();
        let token = cancel.clone();
        let task =
            tokio::spawn(async move { orchestrator.run(jobs, Arc::new(sink), token).await });
        BatchHandle {
            events,
            cancel,
            task,
        }
    }

    /// Run every job to a terminal state and return the batch result, with
    /// jobs in submission order.
    ///
    /// Up to `max_concurrent_jobs` jobs convert at once; each holds its own
    /// reader, writer, and staging directory.
    #[instrument(skip_all, fields(jobs = jobs.len()))]
    pub async fn run(
        &self,
        jobs: Vec<ConversionJob>,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> BatchResult {
        let total = jobs.len();
        let reporter = Arc::new(ProgressReporter::new(
            total,
            self.caps.config.progress_interval(),
            Arc::clone(&sink),
        ));
        let permits = Arc::new(Semaphore::new(self.caps.config.max_concurrent_jobs.max(1)));
        info!(total, "Batch started");

        let conflicts = target_conflicts(&jobs);
        let mut slots: Vec<Slot> = Vec::with_capacity(total);
        for ((position, mut job), conflicted) in jobs.into_iter().enumerate().zip(conflicts) {
            if conflicted {
                let err = ValidationError::TargetConflict(job.target_path.clone());
                record_failure(&mut job, &ConversionError::Validation(err));
                finish_job(&job, &*sink);
                reporter.job_done(position);
                slots.push(Slot::Done(job));
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&permits).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit.filter(|_| !cancel.is_cancelled()) else {
                log_transition(job.cancel("cancelled before start"));
                finish_job(&job, &*sink);
                reporter.job_done(position);
                slots.push(Slot::Done(job));
                continue;
            };

            let ctx = JobContext {
                caps: self.caps.clone(),
                cancel: cancel.clone(),
                reporter: Arc::clone(&reporter),
                sink: Arc::clone(&sink),
                position,
                total,
            };
            let fallback = job.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                run_job(job, &ctx)
            });
            slots.push(Slot::Running { fallback, handle });
        }

        let mut finished = Vec::with_capacity(total);
        for slot in slots {
            finished.push(match slot {
                Slot::Done(job) => job,
                Slot::Running { mut fallback, handle } => match handle.await {
                    Ok(job) => job,
                    Err(err) => {
                        // The worker died mid-job; record it rather than lose it.
                        error!(job_id = %fallback.id, error = %err, "Conversion worker panicked");
                        if fallback.status() == JobStatus::Pending {
                            log_transition(fallback.fail(format!("conversion worker failed: {err}")));
                        }
                        finish_job(&fallback, &*sink);
                        fallback
                    }
                },
            });
        }

        reporter.finish();
        let result = BatchResult::from_jobs(finished);
        info!(
            succeeded = result.succeeded_count,
            failed = result.failed_count,
            cancelled = result.cancelled_count,
            "Batch finished"
        );
        sink.send(BatchEvent::Finished(result.clone()));
        result
    }
}

/// Flags every job whose target is another job's source, or a target an
/// earlier job already claimed. Such a job would overwrite a file the batch
/// still needs, so it fails instead.
fn target_conflicts(jobs: &[ConversionJob]) -> Vec<bool> {
    let sources: HashSet<&Path> = jobs.iter().map(|job| job.source_path.as_path()).collect();
    let mut claimed: HashSet<&Path> = HashSet::with_capacity(jobs.len());
    jobs.iter()
        .map(|job| {
            let target = job.target_path.as_path();
            let first_claim = claimed.insert(target);
            let overwrites_other_source = target != job.source_path && sources.contains(target);
            if !first_claim || overwrites_other_source {
                warn!(job_id = %job.id, target = %target.display(), "Target clashes with another job");
                true
            } else {
                false
            }
        })
        .collect()
}

enum Slot {
    Done(ConversionJob),
    Running {
        fallback: ConversionJob,
        handle: JoinHandle<ConversionJob>,
    },
}

/// Take one job from `Pending` to a terminal state. Runs on the blocking pool.
fn run_job(mut job: ConversionJob, ctx: &JobContext) -> ConversionJob {
    if ctx.cancel.is_cancelled() {
        log_transition(job.cancel("cancelled before start"));
        return conclude(job, ctx);
    }

    if let Err(err) = validate_for_conversion(&job, &ctx.caps) {
        record_failure(&mut job, &ConversionError::Validation(err));
        return conclude(job, ctx);
    }

    if let Err(err) = job.start() {
        warn!(error = %err, "Job was not pending; skipping");
        return conclude(job, ctx);
    }
    ctx.sink.send(BatchEvent::JobStarted {
        job_id: job.id,
        position: ctx.position,
        total: ctx.total,
        source: job.source_path.clone(),
    });

    let job_id = job.id;
    let prefix = format!("File {}/{}", ctx.position + 1, ctx.total);
    let result = convert(&job, &ctx.caps, &ctx.cancel, &mut |progress: FileProgress| {
        ctx.reporter.update(
            ctx.position,
            job_id,
            progress.percent,
            format!("{prefix}: {}", progress.message),
        );
    });

    match result {
        Ok(pages) => {
            let hash = match hash_file(&job.target_path) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    warn!(job_id = %job.id, error = %err, "Cannot fingerprint output");
                    None
                }
            };
            log_transition(job.succeed(pages, hash));
            if job.delete_original_on_success {
                delete_source(&mut job, pages, &ctx.caps);
            }
        }
        Err(err) if err.is_cancellation() => log_transition(job.cancel(err.to_string())),
        Err(err) => record_failure(&mut job, &err),
    }
    conclude(job, ctx)
}

fn conclude(job: ConversionJob, ctx: &JobContext) -> ConversionJob {
    ctx.reporter.job_done(ctx.position);
    finish_job(&job, &*ctx.sink);
    job
}

/// Log the terminal transition and tell collaborators about it.
fn finish_job(job: &ConversionJob, sink: &dyn ProgressSink) {
    match job.status() {
        JobStatus::Succeeded => info!(
            job_id = %job.id,
            source = %job.source_path.display(),
            pages = job.pages_written,
            "Job succeeded"
        ),
        status => warn!(
            job_id = %job.id,
            source = %job.source_path.display(),
            outcome = ?status,
            error = job.error_detail().unwrap_or_default(),
            "Job did not succeed"
        ),
    }
    sink.send(BatchEvent::JobFinished(job.clone()));
}

fn record_failure(job: &mut ConversionJob, err: &ConversionError) {
    let human = humanize_error(err);
    log_transition(job.fail(err.to_string()));
    job.error_hint = Some(human.suggestion);
}

/// Remove the source only once the written output proves sound. Neither a
/// failed check nor a failed delete changes the job's `Succeeded` status.
fn delete_source(job: &mut ConversionJob, pages: usize, caps: &Capabilities) {
    if is_same_file(&job.source_path, &job.target_path) {
        warn!(job_id = %job.id, "Output replaced the source path; keeping it");
        job.add_warning("source kept: the output was written over the source path");
        return;
    }
    if let Err(err) = validate_output(&job.target_path, job.target_format, pages, caps) {
        warn!(job_id = %job.id, error = %err, "Output failed validation; keeping source");
        job.add_warning(format!("source kept: {err}"));
        return;
    }
    match std::fs::remove_file(&job.source_path) {
        Ok(()) => info!(job_id = %job.id, source = %job.source_path.display(), "Source deleted"),
        Err(err) => {
            warn!(job_id = %job.id, error = %err, "Cannot delete source");
            job.add_warning(format!("could not delete source: {err}"));
        }
    }
}

fn log_transition(result: Result<(), JobStateError>) {
    if let Err(err) = result {
        warn!(error = %err, "Ignoring invalid job transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_archive::plan_job;
    use bindery_archive::testing::{sample_jpeg, test_capabilities, write_cbz};
    use bindery_core::ArchiveFormat;

    use crate::events::NullSink;

    #[tokio::test]
    async fn empty_batch_finishes_immediately() {
        let orchestrator = BatchOrchestrator::new(test_capabilities());
        let result = orchestrator
            .run(Vec::new(), Arc::new(NullSink), CancellationToken::new())
            .await;
        assert_eq!(result.total, 0);
        assert!(result.all_succeeded());
    }

    #[tokio::test]
    async fn pre_cancelled_batch_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("issue.cbz");
        write_cbz(&source, &[("01.jpg", sample_jpeg(1))]);
        let job = plan_job(&source, ArchiveFormat::Pdf, false);
        let target = job.target_path.clone();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = BatchOrchestrator::new(test_capabilities())
            .run(vec![job], Arc::new(NullSink), cancel)
            .await;
        assert_eq!(result.cancelled_count, 1);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn failure_carries_a_hint() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.cbz");
        std::fs::write(&source, b"PK\x03\x04nonsense").unwrap();
        let job = plan_job(&source, ArchiveFormat::Pdf, false);

        let result = BatchOrchestrator::new(test_capabilities())
            .run(vec![job], Arc::new(NullSink), CancellationToken::new())
            .await;
        let job = &result.jobs[0];
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.error_detail().is_some());
        assert!(job.error_hint.is_some());
    }

    #[test]
    fn clashing_targets_are_flagged_after_the_first_claim() {
        let jobs = vec![
            ConversionJob::new("/c/a.cbr", ArchiveFormat::Cbr, ArchiveFormat::Cbz, false),
            ConversionJob::new("/c/a.pdf", ArchiveFormat::Pdf, ArchiveFormat::Cbz, false),
            ConversionJob::new("/c/b.cbz", ArchiveFormat::Cbz, ArchiveFormat::Pdf, false),
        ];
        assert_eq!(target_conflicts(&jobs), [false, true, false]);
    }

    #[test]
    fn writing_over_another_jobs_source_is_flagged() {
        let jobs = vec![
            ConversionJob::new("/c/a.cbz", ArchiveFormat::Cbz, ArchiveFormat::Pdf, false),
            ConversionJob::new("/c/a.pdf", ArchiveFormat::Pdf, ArchiveFormat::Cbz, false),
        ];
        assert_eq!(target_conflicts(&jobs), [true, true]);
    }
}
