// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Throttled progress reporting.
//
// Workers report every page; the reporter folds those ticks into an overall
// batch percentage and forwards at most one event per interval, so event
// volume stays bounded however many jobs or pages a batch holds.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bindery_core::{JobId, ProgressEvent};
use tracing::debug;

use crate::events::{BatchEvent, ProgressSink};

/// Overall progress never reaches this until the batch is finished.
const OVERALL_CAP: u8 = 99;

pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    interval: Duration,
    state: Mutex<State>,
}

struct State {
    /// Highest percentage seen per job, by batch position.
    file_percents: Vec<u8>,
    last_sent: Option<Instant>,
    last_job: Option<JobId>,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(total_jobs: usize, interval: Duration, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            interval,
            state: Mutex::new(State {
                file_percents: vec![0; total_jobs],
                last_sent: None,
                last_job: None,
                finished: false,
            }),
        }
    }

    /// Record progress for the job at `position` and forward it if the
    /// throttle interval has elapsed. Returns whether an event was sent.
    ///
    /// A job's percentage never goes backwards, so a late or repeated tick
    /// cannot make the reported progress regress.
    pub fn update(
        &self,
        position: usize,
        job_id: JobId,
        file_percent: u8,
        message: impl Into<String>,
    ) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = state.file_percents.get_mut(position) else {
            debug!(position, "Progress for a job outside the batch");
            return false;
        };
        *slot = (*slot).max(file_percent.min(100));
        let file_percent = *slot;
        state.last_job = Some(job_id);

        let now = Instant::now();
        let due = state
            .last_sent
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if !due || state.finished {
            return false;
        }
        state.last_sent = Some(now);

        let event = ProgressEvent {
            job_id,
            file_percent,
            overall_percent: overall(&state.file_percents),
            message: message.into(),
        };
        // Sent under the lock so concurrent workers cannot reorder events.
        self.sink.send(BatchEvent::Progress(event));
        true
    }

    /// Count the job at `position` as complete, whatever its outcome.
    pub fn job_done(&self, position: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = state.file_percents.get_mut(position) {
            *slot = 100;
        }
    }

    /// Current overall percentage (capped until [`finish`](Self::finish)).
    pub fn overall_percent(&self) -> u8 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.finished {
            100
        } else {
            overall(&state.file_percents)
        }
    }

    /// Send the single 100% event, bypassing the throttle. Only sent once,
    /// and only if some job reported progress.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.finished {
            return;
        }
        state.finished = true;
        if let Some(job_id) = state.last_job {
            self.sink.send(BatchEvent::Progress(ProgressEvent {
                job_id,
                file_percent: 100,
                overall_percent: 100,
                message: "Done".into(),
            }));
        }
    }
}

/// Average of per-job percentages, capped below 100.
fn overall(file_percents: &[u8]) -> u8 {
    if file_percents.is_empty() {
        return 0;
    }
    let sum: usize = file_percents.iter().map(|&p| p as usize).sum();
    ((sum / file_percents.len()) as u8).min(OVERALL_CAP)
}
