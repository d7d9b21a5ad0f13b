// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CBZ writer: packs pages into a staged ZIP under zero-padded names.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use bindery_core::{PageEntry, WriteError};
use tracing::{debug, instrument};
use zip::CompressionMethod;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use crate::container::PageNamer;
use crate::image::{is_precompressed, page_extension};
use crate::staging::StagedOutput;

pub struct CbzWriter {
    // Declared before `staged` so the ZIP handle closes before the scratch
    // directory is removed.
    zip: zip::ZipWriter<BufWriter<File>>,
    staged: StagedOutput,
    namer: PageNamer,
    written: usize,
}

impl CbzWriter {
    #[instrument(skip_all, fields(path = %path.as_ref().display(), page_count = page_count))]
    pub fn create(path: impl AsRef<Path>, page_count: usize) -> Result<Self, WriteError> {
        let staged = StagedOutput::new(path.as_ref())?;
        let file = File::create(staged.path())?;
        Ok(Self {
            zip: zip::ZipWriter::new(BufWriter::new(file)),
            staged,
            namer: PageNamer::new(page_count),
            written: 0,
        })
    }

    pub fn append_page(&mut self, page: &PageEntry) -> Result<(), WriteError> {
        let ext = page_extension(&page.payload, &page.source_name).ok_or_else(|| {
            WriteError::Encode(format!("{} is not a recognised image", page.source_name))
        })?;
        let name = self.namer.name(self.written, &ext);

        let method = if is_precompressed(&ext) {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = SimpleFileOptions::default().compression_method(method);

        self.zip
            .start_file(name.as_str(), options)
            .map_err(zip_write_error)?;
        self.zip.write_all(&page.payload)?;
        self.written += 1;

        debug!(%name, bytes = page.payload.len(), "Page added to ZIP");
        Ok(())
    }

    pub fn finalize(self) -> Result<(), WriteError> {
        let Self {
            zip,
            staged,
            written,
            ..
        } = self;
        let buffered = zip.finish().map_err(zip_write_error)?;
        let file = buffered.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;
        drop(file);
        staged.commit()?;
        debug!(pages = written, "ZIP finalised");
        Ok(())
    }
}

fn zip_write_error(err: ZipError) -> WriteError {
    match err {
        ZipError::Io(io_err) => WriteError::IoFailure(io_err),
        other => WriteError::IoFailure(io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbz::CbzReader;
    use crate::testing::{sample_jpeg, sample_png};

    fn page(index: usize, name: &str, payload: Vec<u8>) -> PageEntry {
        PageEntry {
            index,
            source_name: name.into(),
            payload,
        }
    }

    #[test]
    fn pages_are_renamed_and_payloads_kept_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.cbz");

        let mut writer = CbzWriter::create(&target, 3).unwrap();
        writer.append_page(&page(0, "a/cover.jpeg", sample_jpeg(1))).unwrap();
        writer.append_page(&page(1, "b.png", sample_png(2))).unwrap();
        writer.append_page(&page(2, "page 3", sample_jpeg(3))).unwrap();
        assert!(!target.exists());
        writer.finalize().unwrap();

        let mut reader = CbzReader::open(&target).unwrap();
        let names: Vec<_> = reader.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["0001.jpg", "0002.png", "0003.jpg"]);
        assert_eq!(reader.read_entry(1).unwrap().payload, sample_png(2));
    }

    #[test]
    fn abandoned_writer_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.cbz");
        {
            let mut writer = CbzWriter::create(&target, 2).unwrap();
            writer.append_page(&page(0, "1.jpg", sample_jpeg(1))).unwrap();
        }
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unrecognised_payload_is_an_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CbzWriter::create(dir.path().join("out.cbz"), 1).unwrap();
        let err = writer
            .append_page(&page(0, "notes.txt", b"hello".to_vec()))
            .unwrap_err();
        assert!(matches!(err, WriteError::Encode(_)));
    }
}
