// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archive inspection: what is inside a container, without converting it.

use std::path::Path;

use bindery_core::{ArchiveFormat, ReadError};
use serde::Serialize;
use tracing::instrument;

use crate::capabilities::Capabilities;
use crate::container::ContainerReader;
use crate::detect::detect;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub format: ArchiveFormat,
    pub page_count: usize,
    /// A `ComicInfo.xml` is present.
    pub has_metadata: bool,
    /// Pages or other entries live in subdirectories.
    pub has_folders: bool,
    /// Size of the container file on disk.
    pub total_bytes: u64,
    /// Pages in reading order.
    pub page_names: Vec<String>,
}

/// Detect and inspect `path`.
pub fn inspect(path: impl AsRef<Path>, caps: &Capabilities) -> Result<ArchiveSummary, ReadError> {
    let path = path.as_ref();
    inspect_as(path, detect(path), caps)
}

/// Inspect `path` as an already-detected `format`. Opening the container and
/// listing its entries doubles as the integrity probe.
#[instrument(skip(caps, path), fields(path = %path.display()))]
pub fn inspect_as(
    path: &Path,
    format: ArchiveFormat,
    caps: &Capabilities,
) -> Result<ArchiveSummary, ReadError> {
    let reader = ContainerReader::open(path, format, caps)?;
    let raw_names = reader.raw_names();
    let has_metadata = format != ArchiveFormat::Pdf
        && raw_names.iter().any(|name| {
            name.rsplit('/')
                .next()
                .is_some_and(|file| file.eq_ignore_ascii_case("ComicInfo.xml"))
        });
    let has_folders = format != ArchiveFormat::Pdf
        && raw_names
            .iter()
            .any(|name| name.trim_end_matches('/').contains('/'));

    Ok(ArchiveSummary {
        format,
        page_count: reader.entries().len(),
        has_metadata,
        has_folders,
        total_bytes: std::fs::metadata(path)?.len(),
        page_names: reader.entries().iter().map(|entry| entry.name.clone()).collect(),
    })
}
