// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindery-archive: Comic container handling for the Bindery converter.
//
// Provides content-based format detection, readers and writers for CBZ (ZIP),
// CBR (RAR), and PDF containers, the validation gate that guards conversions
// and source deletion, and the single-file conversion pipeline.

pub mod capabilities;
pub mod cbr;
pub mod cbz;
pub mod container;
pub mod detect;
pub mod image;
pub mod inspect;
pub mod pdf;
pub mod pipeline;
pub mod staging;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod validation;

use std::path::PathBuf;

use bindery_core::{ArchiveFormat, ConversionJob};

// Re-export the primary entry points so callers can use `bindery_archive::convert` etc.
pub use capabilities::Capabilities;
pub use container::{ContainerReader, ContainerWriter};
pub use detect::{detect, detect_with_reason};
pub use inspect::{ArchiveSummary, inspect};
pub use pipeline::{FileProgress, convert};
pub use validation::{is_same_file, is_supported_pair, validate_for_conversion, validate_output};

/// Plan a conversion of `source` to `target_format`. The source format is
/// detected here, once, from the file's content.
pub fn plan_job(
    source: impl Into<PathBuf>,
    target_format: ArchiveFormat,
    delete_original_on_success: bool,
) -> ConversionJob {
    let source = source.into();
    let source_format = detect(&source);
    ConversionJob::new(source, source_format, target_format, delete_original_on_success)
}
