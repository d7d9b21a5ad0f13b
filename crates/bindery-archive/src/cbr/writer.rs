// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CBR writer: stages pages as loose files, then hands them to the RAR
// creation capability in one call on finalize.
//
// Pages keep their source file names when those are unique and already sort
// in page order; otherwise every page is renumbered.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bindery_core::{PageEntry, WriteError};
use tracing::{debug, instrument};

use super::RarCreate;
use crate::container::PageNamer;
use crate::image::{is_page_image, page_extension};
use crate::staging::StagedOutput;

pub struct CbrWriter {
    staged: StagedOutput,
    pages_dir: PathBuf,
    pages: Vec<PathBuf>,
    namer: PageNamer,
    /// Source file names, while they can still be reused.
    source_names: Option<Vec<String>>,
    creator: Arc<dyn RarCreate>,
}

impl CbrWriter {
    /// Probes the RAR tool first, so a missing tool fails the job before any
    /// page is read.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), page_count = page_count))]
    pub fn create(
        path: impl AsRef<Path>,
        page_count: usize,
        creator: Arc<dyn RarCreate>,
    ) -> Result<Self, WriteError> {
        creator.probe()?;

        let staged = StagedOutput::new(path.as_ref())?;
        let pages_dir = staged.scratch_dir().join("pages");
        std::fs::create_dir(&pages_dir)?;

        Ok(Self {
            staged,
            pages_dir,
            pages: Vec::with_capacity(page_count),
            namer: PageNamer::new(page_count),
            source_names: Some(Vec::with_capacity(page_count)),
            creator,
        })
    }

    pub fn append_page(&mut self, page: &PageEntry) -> Result<(), WriteError> {
        let ext = page_extension(&page.payload, &page.source_name).ok_or_else(|| {
            WriteError::Encode(format!("{} is not a recognised image", page.source_name))
        })?;
        let file = self.pages_dir.join(self.namer.name(self.pages.len(), &ext));
        std::fs::write(&file, &page.payload)?;
        self.pages.push(file);
        self.track_source_name(&page.source_name);
        Ok(())
    }

    fn track_source_name(&mut self, source_name: &str) {
        let Some(names) = self.source_names.as_mut() else {
            return;
        };
        // Archive members are stored without their directories.
        let file_name = source_name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(source_name);
        let in_order = names.last().is_none_or(|last| last.as_str() < file_name);
        if in_order && !file_name.starts_with('.') && is_page_image(file_name) {
            names.push(file_name.to_string());
        } else {
            debug!(name = source_name, "Source names unusable; numbering pages");
            self.source_names = None;
        }
    }

    /// Move the staged pages to their source names.
    fn restore_source_names(&self, names: &[String]) -> Result<Vec<PathBuf>, WriteError> {
        let named_dir = self.staged.scratch_dir().join("named");
        std::fs::create_dir(&named_dir)?;
        let mut files = Vec::with_capacity(names.len());
        for (staged, name) in self.pages.iter().zip(names) {
            let file = named_dir.join(name);
            std::fs::rename(staged, &file)?;
            files.push(file);
        }
        Ok(files)
    }

    pub fn finalize(mut self) -> Result<(), WriteError> {
        let files = match self.source_names.take() {
            Some(names) => self.restore_source_names(&names)?,
            None => std::mem::take(&mut self.pages),
        };
        self.creator.create(self.staged.path(), &files)?;
        if !self.staged.path().exists() {
            return Err(WriteError::ToolFailed {
                tool: self.creator.tool_name(),
                detail: "no archive was produced".into(),
            });
        }
        let pages = files.len();
        self.staged.commit()?;
        debug!(pages, "RAR finalised");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbr::CbrReader;
    use crate::testing::{FakeRar, UnavailableRar, sample_jpeg, sample_png};

    fn page(index: usize, payload: Vec<u8>) -> PageEntry {
        named_page(index, &format!("{index}.jpg"), payload)
    }

    fn named_page(index: usize, source_name: &str, payload: Vec<u8>) -> PageEntry {
        PageEntry {
            index,
            source_name: source_name.to_string(),
            payload,
        }
    }

    fn write_pages(pages: &[PageEntry]) -> Vec<String> {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.cbr");
        let rar = Arc::new(FakeRar::new());
        let mut writer = CbrWriter::create(&target, pages.len(), rar.clone()).unwrap();
        for page in pages {
            writer.append_page(page).unwrap();
        }
        writer.finalize().unwrap();
        assert_eq!(rar.archives_created(), 1);

        let reader = CbrReader::open(&target, rar).unwrap();
        reader.entries().iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn writes_a_readable_archive() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.cbr");
        let rar = Arc::new(FakeRar::new());

        let mut writer = CbrWriter::create(&target, 2, rar.clone()).unwrap();
        writer.append_page(&page(0, sample_jpeg(1))).unwrap();
        writer.append_page(&page(1, sample_jpeg(2))).unwrap();
        writer.finalize().unwrap();

        assert_eq!(crate::detect::detect(&target), bindery_core::ArchiveFormat::Cbr);
        let mut reader = CbrReader::open(&target, rar).unwrap();
        let names: Vec<_> = reader.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["0.jpg", "1.jpg"]);
        assert_eq!(reader.read_entry(1).unwrap().payload, sample_jpeg(2));
    }

    #[test]
    fn ordered_source_names_are_kept() {
        let names = write_pages(&[
            named_page(0, "001.jpg", sample_jpeg(1)),
            named_page(1, "002.jpg", sample_jpeg(2)),
            named_page(2, "010.jpg", sample_jpeg(10)),
        ]);
        assert_eq!(names, ["001.jpg", "002.jpg", "010.jpg"]);
    }

    #[test]
    fn directories_are_dropped_from_kept_names() {
        let names = write_pages(&[
            named_page(0, "pages/a.jpg", sample_jpeg(1)),
            named_page(1, "pages/b.png", sample_png(2)),
        ]);
        assert_eq!(names, ["a.jpg", "b.png"]);
    }

    #[test]
    fn colliding_names_are_renumbered() {
        let names = write_pages(&[
            named_page(0, "ch1/01.jpg", sample_jpeg(1)),
            named_page(1, "ch2/01.jpg", sample_jpeg(2)),
        ]);
        assert_eq!(names, ["0001.jpg", "0002.jpg"]);
    }

    #[test]
    fn names_out_of_page_order_are_renumbered() {
        let names = write_pages(&[
            named_page(0, "a/9.jpg", sample_jpeg(1)),
            named_page(1, "b/10.jpg", sample_jpeg(2)),
            named_page(2, "b/11.png", sample_png(3)),
        ]);
        assert_eq!(names, ["0001.jpg", "0002.jpg", "0003.png"]);
    }

    #[test]
    fn synthetic_pdf_page_names_are_renumbered() {
        let names = write_pages(&[
            named_page(0, "page 1", sample_jpeg(1)),
            named_page(1, "page 2", sample_png(2)),
        ]);
        assert_eq!(names, ["0001.jpg", "0002.png"]);
    }

    #[test]
    fn missing_tool_fails_before_anything_is_staged() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.cbr");
        let err = CbrWriter::create(&target, 1, Arc::new(UnavailableRar))
            .err()
            .unwrap();
        assert!(matches!(err, WriteError::ToolUnavailable { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
