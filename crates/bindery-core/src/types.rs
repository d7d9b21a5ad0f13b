// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bindery archive converter.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JobStateError;

/// Unique identifier for a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Container formats understood by the engine.
///
/// Always determined from file content; the extension is only a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// ZIP container of page images.
    Cbz,
    /// RAR container of page images.
    Cbr,
    /// PDF document, one page per comic page.
    Pdf,
    Unsupported,
}

impl ArchiveFormat {
    /// File extension (without the dot) used for output files.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Cbz => Some("cbz"),
            Self::Cbr => Some("cbr"),
            Self::Pdf => Some("pdf"),
            Self::Unsupported => None,
        }
    }

    /// Infer a format from a file extension. Used as a hint only.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "cbz" | "zip" => Self::Cbz,
            "cbr" | "rar" => Self::Cbr,
            "pdf" => Self::Pdf,
            _ => Self::Unsupported,
        }
    }

    /// Format hinted by the extension of `path`.
    pub fn from_path_hint(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unsupported)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Cbz => "CBZ",
            Self::Cbr => "CBR",
            Self::Pdf => "PDF",
            Self::Unsupported => "unsupported",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::from_extension(s.trim_start_matches('.')) {
            Self::Unsupported => Err(format!("unknown format `{s}` (expected cbz, cbr, or pdf)")),
            format => Ok(format),
        }
    }
}

/// Lifecycle states of a conversion job.
///
/// `Pending -> Running -> {Succeeded | Failed | Cancelled}`. A job rejected by
/// pre-flight validation goes straight from `Pending` to `Failed`, and a job
/// still queued when the batch is cancelled goes from `Pending` to
/// `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Whether the one-way state machine permits `self -> next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
        )
    }
}

/// One source-file-to-target-format conversion request.
///
/// The status and error detail are only changed through the transition
/// methods, which enforce the job state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionJob {
    pub id: JobId,
    pub source_path: PathBuf,
    /// Detected once when the job is planned and never re-detected.
    pub source_format: ArchiveFormat,
    pub target_format: ArchiveFormat,
    /// Source path with the target format's extension. Equal to the source
    /// path when the source's extension already names the target format.
    pub target_path: PathBuf,
    pub delete_original_on_success: bool,
    status: JobStatus,
    error_detail: Option<String>,
    /// Plain-language suggestion accompanying `error_detail`.
    pub error_hint: Option<String>,
    /// Non-fatal problems, e.g. the source could not be deleted.
    pub warnings: Vec<String>,
    /// Pages written to the target, once succeeded.
    pub pages_written: Option<usize>,
    /// SHA-256 of the written target file, once succeeded.
    pub output_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionJob {
    pub fn new(
        source_path: impl Into<PathBuf>,
        source_format: ArchiveFormat,
        target_format: ArchiveFormat,
        delete_original_on_success: bool,
    ) -> Self {
        let source_path = source_path.into();
        let target_path = match target_format.extension() {
            Some(ext) => source_path.with_extension(ext),
            None => source_path.clone(),
        };
        let now = Utc::now();
        Self {
            id: JobId::new(),
            source_path,
            source_format,
            target_format,
            target_path,
            delete_original_on_success,
            status: JobStatus::Pending,
            error_detail: None,
            error_hint: None,
            warnings: Vec::new(),
            pages_written: None,
            output_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// File name of the source, for status messages.
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// `Pending -> Running`. Entered exactly once.
    pub fn start(&mut self) -> Result<(), JobStateError> {
        self.transition(JobStatus::Running)
    }

    /// `Running -> Succeeded`.
    pub fn succeed(
        &mut self,
        pages_written: usize,
        output_hash: Option<String>,
    ) -> Result<(), JobStateError> {
        self.transition(JobStatus::Succeeded)?;
        self.error_detail = None;
        self.error_hint = None;
        self.pages_written = Some(pages_written);
        self.output_hash = output_hash;
        Ok(())
    }

    /// `Pending | Running -> Failed`.
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<(), JobStateError> {
        self.transition(JobStatus::Failed)?;
        self.error_detail = Some(detail.into());
        Ok(())
    }

    /// `Pending | Running -> Cancelled`.
    pub fn cancel(&mut self, detail: impl Into<String>) -> Result<(), JobStateError> {
        self.transition(JobStatus::Cancelled)?;
        self.error_detail = Some(detail.into());
        Ok(())
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
        self.updated_at = Utc::now();
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), JobStateError> {
        if !self.status.can_transition_to(next) {
            return Err(JobStateError {
                job_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Listing metadata for one page inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// 0-based page index; defines page order.
    pub index: usize,
    /// Entry name inside the container (`page 3` for PDF pages).
    pub name: String,
}

/// One page's image payload plus its position in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub index: usize,
    pub source_name: String,
    /// Encoded image bytes (JPEG, PNG, ...).
    pub payload: Vec<u8>,
}

impl PageEntry {
    /// Lower-cased extension of the source name, if any.
    pub fn extension_hint(&self) -> Option<String> {
        Path::new(&self.source_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Final outcome of a batch, constructed once every job is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub cancelled_count: usize,
    /// Jobs in submission order, each in its terminal state.
    pub jobs: Vec<ConversionJob>,
}

impl BatchResult {
    pub fn from_jobs(jobs: Vec<ConversionJob>) -> Self {
        let count = |status: JobStatus| jobs.iter().filter(|job| job.status() == status).count();
        Self {
            total: jobs.len(),
            succeeded_count: count(JobStatus::Succeeded),
            failed_count: count(JobStatus::Failed),
            cancelled_count: count(JobStatus::Cancelled),
            jobs,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded_count == self.total
    }
}

/// A bounded-rate progress notification for collaborators. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    /// Progress of the current file (0-100).
    pub file_percent: u8,
    /// Progress of the whole batch (0-100).
    pub overall_percent: u8,
    pub message: String,
}

/// Encoding used for images produced by the engine (rasterized PDF pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    Png,
    Jpeg { quality: u8 },
}

impl ImageEncoding {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    /// US comic book trim size (6.625 x 10.25 in).
    Comic,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Comic => (168, 260),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}
