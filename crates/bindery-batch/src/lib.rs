// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bindery Batch: runs many conversions as one batch, in the background, with
// per-job failure isolation, cooperative cancellation, and throttled progress
// events. This crate sits between the single-file pipeline in
// `bindery-archive` and whatever front end consumes the events.

pub mod events;
pub mod orchestrator;
pub mod progress;

pub use events::{BatchEvent, ChannelSink, NullSink, ProgressSink};
pub use orchestrator::{BatchHandle, BatchOrchestrator};
pub use progress::ProgressReporter;
