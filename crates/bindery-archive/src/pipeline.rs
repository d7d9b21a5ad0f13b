// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion pipeline: drives one job from source reader to target writer.
//
// Pages are streamed one at a time. Any failure, or cancellation, drops the
// writer before finalize, which discards the staged output; the target path
// is only ever touched by a successful commit.

use bindery_core::{ConversionError, ConversionJob, WriteError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::capabilities::Capabilities;
use crate::container::{ContainerReader, ContainerWriter};

/// Per-file progress reported by [`convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProgress {
    /// 0-100, never decreasing within one conversion.
    pub percent: u8,
    pub message: String,
}

impl FileProgress {
    fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
        }
    }
}

/// Convert `job.source_path` into `job.target_path`, returning the number of
/// pages written.
///
/// Cancellation is checked before each page and before finalizing; the page
/// in flight always completes first.
#[instrument(skip_all, fields(job_id = %job.id, source = %job.source_path.display(), to = %job.target_format))]
pub fn convert(
    job: &ConversionJob,
    caps: &Capabilities,
    cancel: &CancellationToken,
    on_progress: &mut dyn FnMut(FileProgress),
) -> Result<usize, ConversionError> {
    on_progress(FileProgress::new(
        0,
        format!("Reading {} pages", job.source_format),
    ));
    let mut reader = ContainerReader::open(&job.source_path, job.source_format, caps)?;
    let entries = reader.entries().to_vec();
    let total = entries.len();
    if total == 0 {
        return Err(ConversionError::EmptyArchive);
    }
    if cancel.is_cancelled() {
        return Err(ConversionError::Cancelled);
    }

    let mut writer = ContainerWriter::create(&job.target_path, job.target_format, total, caps)?;
    info!(pages = total, "Converting");

    for entry in &entries {
        if cancel.is_cancelled() {
            debug!(done = entry.index, "Cancelled between pages");
            return Err(ConversionError::Cancelled);
        }

        let page = reader
            .read_entry(entry.index)
            .map_err(|err| ConversionError::EntryFailed {
                index: entry.index,
                name: entry.name.clone(),
                detail: err.to_string(),
            })?;
        writer.append_page(&page).map_err(|err| match err {
            WriteError::Encode(detail) => ConversionError::EntryFailed {
                index: entry.index,
                name: entry.name.clone(),
                detail,
            },
            other => ConversionError::Write(other),
        })?;

        let done = entry.index + 1;
        // 100 is reserved for a committed output.
        let percent = ((done * 100) / total).min(99) as u8;
        on_progress(FileProgress::new(
            percent,
            format!("Converting page {done}/{total}"),
        ));
    }

    if cancel.is_cancelled() {
        return Err(ConversionError::Cancelled);
    }
    on_progress(FileProgress::new(
        99,
        format!("Packing into {}", job.target_format),
    ));
    writer.finalize()?;

    on_progress(FileProgress::new(100, "Done"));
    info!(pages = total, target = %job.target_path.display(), "Conversion complete");
    Ok(total)
}
