// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CBZ reader: lists a ZIP's page images and streams them one at a time.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use bindery_core::{EntryInfo, PageEntry, ReadError};
use tracing::{debug, instrument};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::container::order_pages;

/// Upper bound on the buffer reserved up front for one entry; the declared
/// size of a hostile archive is not trusted beyond this.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

pub struct CbzReader {
    archive: ZipArchive<BufReader<File>>,
    raw_names: Vec<String>,
    entries: Vec<EntryInfo>,
}

impl CbzReader {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let file = File::open(path.as_ref())?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(zip_read_error)?;

        let mut raw_names: Vec<String> = archive.file_names().map(str::to_owned).collect();
        raw_names.sort_unstable();
        let entries = order_pages(&raw_names);

        debug!(
            entries = raw_names.len(),
            pages = entries.len(),
            "ZIP central directory read"
        );
        Ok(Self {
            archive,
            raw_names,
            entries,
        })
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn raw_names(&self) -> &[String] {
        &self.raw_names
    }

    pub fn read_entry(&mut self, index: usize) -> Result<PageEntry, ReadError> {
        let name = self
            .entries
            .get(index)
            .map(|entry| entry.name.clone())
            .ok_or_else(|| ReadError::Corrupt(format!("no page at index {index}")))?;

        let mut file = self.archive.by_name(&name).map_err(zip_read_error)?;
        let mut payload = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut payload).map_err(io_read_error)?;

        Ok(PageEntry {
            index,
            source_name: name,
            payload,
        })
    }
}

fn zip_read_error(err: ZipError) -> ReadError {
    match err {
        ZipError::Io(io_err) => io_read_error(io_err),
        ZipError::UnsupportedArchive(detail) => ReadError::Unsupported(detail.to_string()),
        other => ReadError::Corrupt(other.to_string()),
    }
}

/// Truncated data and checksum mismatches are corruption, not I/O trouble.
fn io_read_error(err: io::Error) -> ReadError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
            ReadError::Corrupt(err.to_string())
        }
        _ => ReadError::IoFailure(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_jpeg, write_cbz};

    #[test]
    fn reads_pages_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issue.cbz");
        write_cbz(
            &path,
            &[
                ("010.jpg", sample_jpeg(3)),
                ("ComicInfo.xml", b"<ComicInfo/>".to_vec()),
                ("001.jpg", sample_jpeg(1)),
                ("002.jpg", sample_jpeg(2)),
            ],
        );

        let mut reader = CbzReader::open(&path).unwrap();
        let names: Vec<_> = reader.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["001.jpg", "002.jpg", "010.jpg"]);
        assert_eq!(reader.raw_names().len(), 4);

        let third = reader.read_entry(2).unwrap();
        assert_eq!(third.source_name, "010.jpg");
        assert_eq!(third.payload, sample_jpeg(3));
    }

    #[test]
    fn garbage_after_signature_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.cbz");
        std::fs::write(&path, b"PK\x03\x04 this is not really a zip file").unwrap();
        assert!(matches!(CbzReader::open(&path), Err(ReadError::Corrupt(_))));
    }

    #[test]
    fn missing_file_is_io_failure() {
        assert!(matches!(
            CbzReader::open("/no/such/issue.cbz"),
            Err(ReadError::IoFailure(_))
        ));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.cbz");
        write_cbz(&path, &[("1.jpg", sample_jpeg(1))]);
        let mut reader = CbzReader::open(&path).unwrap();
        assert!(reader.read_entry(1).is_err());
    }
}
