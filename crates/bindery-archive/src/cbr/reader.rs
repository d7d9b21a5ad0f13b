// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CBR reader.
//
// Opening only lists the archive. The first page read extracts every page in
// one pass into a private scratch directory (solid archives cannot be read
// out of order cheaply); later reads come from there.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bindery_core::{EntryInfo, PageEntry, ReadError};
use tempfile::TempDir;
use tracing::{debug, instrument};

use super::RarExtract;
use crate::container::order_pages;

pub struct CbrReader {
    path: PathBuf,
    extractor: Arc<dyn RarExtract>,
    raw_names: Vec<String>,
    entries: Vec<EntryInfo>,
    extracted: Option<TempDir>,
}

impl CbrReader {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, extractor: Arc<dyn RarExtract>) -> Result<Self, ReadError> {
        let path = path.as_ref();
        // Surface a missing file as I/O, not as a corrupt archive.
        std::fs::metadata(path)?;

        let mut raw_names = extractor.list(path)?;
        raw_names.sort_unstable();
        let entries = order_pages(&raw_names);
        debug!(
            entries = raw_names.len(),
            pages = entries.len(),
            "RAR listing read"
        );

        Ok(Self {
            path: path.to_path_buf(),
            extractor,
            raw_names,
            entries,
            extracted: None,
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

        let scratch = match self.extracted.take() {
            Some(scratch) => scratch,
            None => self.extract_pages()?,
        };
        let payload = std::fs::read(scratch.path().join(slot_name(index)));
        self.extracted = Some(scratch);

        let payload = payload.map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => {
                ReadError::Corrupt(format!("{name} could not be extracted"))
            }
            _ => ReadError::IoFailure(err),
        })?;

        Ok(PageEntry {
            index,
            source_name: name,
            payload,
        })
    }

    fn extract_pages(&self) -> Result<TempDir, ReadError> {
        let scratch = tempfile::Builder::new().prefix("bindery-cbr-").tempdir()?;
        let slots: HashMap<&str, usize> = self
            .entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.index))
            .collect();

        let mut extracted = 0usize;
        self.extractor.for_each_entry(
            &self.path,
            &|name: &str| slots.contains_key(name),
            &mut |name: &str, payload: Vec<u8>| {
                if let Some(index) = slots.get(name) {
                    std::fs::write(scratch.path().join(slot_name(*index)), payload)?;
                    extracted += 1;
                }
                Ok(())
            },
        )?;
        debug!(extracted, "RAR pages extracted");
        Ok(scratch)
    }
}

/// Scratch file name for a page; archive names never touch the filesystem.
fn slot_name(index: usize) -> String {
    format!("{index:06}")
}
