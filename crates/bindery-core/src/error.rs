// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error taxonomy for Bindery.
//
// Each class maps to one stage of a conversion: detection, pre-flight and
// post-write validation, reading the source, writing the target, and the
// pipeline that drives both. Every error is caught at the job boundary by the
// batch orchestrator and turned into the job's error detail.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ArchiveFormat, JobId, JobStatus};

/// Why a file could not be classified. Never fatal: callers fall back to
/// [`ArchiveFormat::Unsupported`].
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no recognised signature in {}", .0.display())]
    NoSignature(PathBuf),
}

/// Pre-flight and post-write rejections raised by the validation gate.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("source is already {0}; nothing to convert")]
    SameFormat(ArchiveFormat),

    #[error("conversion from {from} to {to} is not supported")]
    UnsupportedPair {
        from: ArchiveFormat,
        to: ArchiveFormat,
    },

    #[error("{} is not a CBZ, CBR, or PDF file", .0.display())]
    UnsupportedSource(PathBuf),

    #[error("output {} would overwrite the source file", .0.display())]
    TargetIsSource(PathBuf),

    #[error("another job in this batch also reads or writes {}", .0.display())]
    TargetConflict(PathBuf),

    #[error("source failed integrity probe: {0}")]
    SourceUnreadable(#[from] ReadError),

    #[error("output failed integrity probe: {0}")]
    OutputUnreadable(#[source] ReadError),

    #[error("output {} does not exist", .0.display())]
    MissingOutput(PathBuf),

    #[error("output format mismatch: expected {expected}, found {actual}")]
    FormatMismatch {
        expected: ArchiveFormat,
        actual: ArchiveFormat,
    },

    #[error("output page count mismatch: expected {expected}, found {actual}")]
    PageCountMismatch { expected: usize, actual: usize },
}

/// Source-side failures while opening or reading a container.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("corrupt container: {0}")]
    Corrupt(String),

    #[error("unsupported container: {0}")]
    Unsupported(String),

    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

/// Target-side failures while creating, appending to, or finalising a
/// container. Partial output is always discarded when one of these occurs.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("required tool `{tool}` is not available")]
    ToolUnavailable { tool: String },

    #[error("`{tool}` failed: {detail}")]
    ToolFailed { tool: String, detail: String },

    #[error("cannot encode page: {0}")]
    Encode(String),
}

/// Pipeline-level failures for a single job.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("archive contains no page images")]
    EmptyArchive,

    #[error("page {index} ({name}) failed: {detail}")]
    EntryFailed {
        index: usize,
        name: String,
        detail: String,
    },

    #[error("conversion cancelled")]
    Cancelled,
}

impl ConversionError {
    /// True when the job should end as `Cancelled` rather than `Failed`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A job state change the lifecycle does not allow.
#[derive(Debug, Error)]
#[error("job {job_id}: cannot move from {from:?} to {to:?}")]
pub struct JobStateError {
    pub job_id: JobId,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
