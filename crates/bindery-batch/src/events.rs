// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Events a running batch delivers to its collaborators (CLI, GUI, loggers).
//
// The orchestrator never calls back into the caller directly; everything
// flows through a `ProgressSink`, which must tolerate concurrent sends from
// several job workers.

use std::path::PathBuf;

use bindery_core::{BatchResult, ConversionJob, JobId, ProgressEvent};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Throttled progress for the job currently reporting.
    Progress(ProgressEvent),
    /// A job passed pre-flight validation and is now `Running`.
    JobStarted {
        job_id: JobId,
        /// 0-based position in the submitted batch.
        position: usize,
        total: usize,
        source: PathBuf,
    },
    /// A job reached its terminal state. Sent in completion order.
    JobFinished(ConversionJob),
    /// Every job is terminal. Always the last event of a batch.
    Finished(BatchResult),
}

/// Receives batch events. Implementations must be cheap and non-blocking;
/// they are called from conversion workers.
pub trait ProgressSink: Send + Sync {
    fn send(&self, event: BatchEvent);
}

/// Forwards events into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn send(&self, event: BatchEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn send(&self, _event: BatchEvent) {}
}
