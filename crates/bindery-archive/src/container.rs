// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Container readers and writers, dispatched on the detected format.
//
// Every reader yields page images in a deterministic order and every writer
// produces a complete container or nothing at all.

use std::path::Path;

use bindery_core::{ArchiveFormat, EntryInfo, PageEntry, ReadError, WriteError};

use crate::capabilities::Capabilities;
use crate::cbr::{CbrReader, CbrWriter};
use crate::cbz::{CbzReader, CbzWriter};
use crate::image::is_page_image;
use crate::pdf::{PdfReadOptions, PdfReader, PdfWriter};

/// Turn raw archive entry names into the ordered page list.
///
/// Directories, non-image files, hidden files, and macOS resource forks are
/// skipped. Pages sort by full entry name, byte-wise, so `001.jpg`,
/// `002.jpg`, `010.jpg` keep that order.
pub fn order_pages<S: AsRef<str>>(names: &[S]) -> Vec<EntryInfo> {
    let mut pages: Vec<&str> = names
        .iter()
        .map(S::as_ref)
        .filter(|name| is_page_candidate(name))
        .collect();
    pages.sort_unstable();
    pages.dedup();
    pages
        .into_iter()
        .enumerate()
        .map(|(index, name)| EntryInfo {
            index,
            name: name.to_string(),
        })
        .collect()
}

fn is_page_candidate(name: &str) -> bool {
    if name.ends_with('/') || name.starts_with("__MACOSX/") || name.contains("/__MACOSX/") {
        return false;
    }
    let file_name = name.rsplit('/').next().unwrap_or(name);
    !file_name.starts_with('.') && is_page_image(file_name)
}

/// Archive entry names always use `/`, whatever the archiver's platform.
pub fn normalize_entry_name(name: &str) -> String {
    name.replace('\\', "/")
}

/// Output page names: 1-based, zero-padded to at least four digits and to a
/// width that fits the whole book, so lexicographic order is page order.
#[derive(Debug, Clone, Copy)]
pub struct PageNamer {
    width: usize,
}

impl PageNamer {
    pub fn new(page_count: usize) -> Self {
        Self {
            width: page_count.to_string().len().max(4),
        }
    }

    pub fn name(&self, position: usize, extension: &str) -> String {
        format!("{:0width$}.{extension}", position + 1, width = self.width)
    }
}

/// An open source container.
pub enum ContainerReader {
    Cbz(CbzReader),
    Cbr(CbrReader),
    Pdf(PdfReader),
}

impl ContainerReader {
    /// Open `path` as `format`. The format comes from detection; it is not
    /// re-checked here.
    pub fn open(
        path: impl AsRef<Path>,
        format: ArchiveFormat,
        caps: &Capabilities,
    ) -> Result<Self, ReadError> {
        let path = path.as_ref();
        match format {
            ArchiveFormat::Cbz => CbzReader::open(path).map(Self::Cbz),
            ArchiveFormat::Cbr => CbrReader::open(path, caps.rar_extract.clone()).map(Self::Cbr),
            ArchiveFormat::Pdf => PdfReader::open(
                path,
                PdfReadOptions::from_config(&caps.config),
                caps.rasterizer.clone(),
            )
            .map(Self::Pdf),
            ArchiveFormat::Unsupported => Err(ReadError::Unsupported(format!(
                "{} is not a CBZ, CBR, or PDF file",
                path.display()
            ))),
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        match self {
            Self::Cbz(_) => ArchiveFormat::Cbz,
            Self::Cbr(_) => ArchiveFormat::Cbr,
            Self::Pdf(_) => ArchiveFormat::Pdf,
        }
    }

    /// Pages in reading order.
    pub fn entries(&self) -> &[EntryInfo] {
        match self {
            Self::Cbz(reader) => reader.entries(),
            Self::Cbr(reader) => reader.entries(),
            Self::Pdf(reader) => reader.entries(),
        }
    }

    /// Every entry name in the container, pages or not, sorted.
    pub fn raw_names(&self) -> &[String] {
        match self {
            Self::Cbz(reader) => reader.raw_names(),
            Self::Cbr(reader) => reader.raw_names(),
            Self::Pdf(reader) => reader.raw_names(),
        }
    }

    /// Read one page by its index in [`entries`](Self::entries).
    pub fn read_entry(&mut self, index: usize) -> Result<PageEntry, ReadError> {
        match self {
            Self::Cbz(reader) => reader.read_entry(index),
            Self::Cbr(reader) => reader.read_entry(index),
            Self::Pdf(reader) => reader.read_entry(index),
        }
    }
}

/// A target container being built. Dropping it without
/// [`finalize`](Self::finalize) discards everything written so far.
pub enum ContainerWriter {
    Cbz(CbzWriter),
    Cbr(CbrWriter),
    Pdf(PdfWriter),
}

impl ContainerWriter {
    /// Start a `format` container that will land at `path` on finalize.
    /// `page_count` fixes the width of generated page names.
    pub fn create(
        path: impl AsRef<Path>,
        format: ArchiveFormat,
        page_count: usize,
        caps: &Capabilities,
    ) -> Result<Self, WriteError> {
        let path = path.as_ref();
        match format {
            ArchiveFormat::Cbz => CbzWriter::create(path, page_count).map(Self::Cbz),
            ArchiveFormat::Cbr => {
                CbrWriter::create(path, page_count, caps.rar_create.clone()).map(Self::Cbr)
            }
            ArchiveFormat::Pdf => PdfWriter::create(path, &caps.config).map(Self::Pdf),
            ArchiveFormat::Unsupported => Err(WriteError::IoFailure(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "cannot write an unsupported container format",
            ))),
        }
    }

    pub fn append_page(&mut self, page: &PageEntry) -> Result<(), WriteError> {
        match self {
            Self::Cbz(writer) => writer.append_page(page),
            Self::Cbr(writer) => writer.append_page(page),
            Self::Pdf(writer) => writer.append_page(page),
        }
    }

    /// Write the container out and move it onto the target path.
    pub fn finalize(self) -> Result<(), WriteError> {
        match self {
            Self::Cbz(writer) => writer.finalize(),
            Self::Cbr(writer) => writer.finalize(),
            Self::Pdf(writer) => writer.finalize(),
        }
    }
}
