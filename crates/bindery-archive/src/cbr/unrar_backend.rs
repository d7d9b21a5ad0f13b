// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RAR extraction through the bundled unrar library.

use std::fmt::Display;
use std::io;
use std::path::Path;

use bindery_core::ReadError;
use tracing::{debug, instrument};

use super::RarExtract;
use crate::container::normalize_entry_name;

/// Extraction backed by the `unrar` crate. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnrarLibrary;

impl RarExtract for UnrarLibrary {
    #[instrument(skip_all, fields(archive = %archive.display()))]
    fn list(&self, archive: &Path) -> Result<Vec<String>, ReadError> {
        let listing = unrar::Archive::new(archive)
            .open_for_listing()
            .map_err(unrar_error)?;

        let mut names = Vec::new();
        for header in listing {
            let header = header.map_err(unrar_error)?;
            if header.is_split() {
                return Err(ReadError::Unsupported(
                    "multi-volume RAR sets are not supported".into(),
                ));
            }
            if header.is_encrypted() {
                return Err(ReadError::Unsupported("encrypted RAR entries".into()));
            }
            if header.is_directory() {
                continue;
            }
            names.push(normalize_entry_name(&header.filename.to_string_lossy()));
        }
        debug!(entries = names.len(), "RAR listing read");
        Ok(names)
    }

    #[instrument(skip_all, fields(archive = %archive.display()))]
    fn for_each_entry(
        &self,
        archive: &Path,
        wanted: &dyn Fn(&str) -> bool,
        sink: &mut dyn FnMut(&str, Vec<u8>) -> io::Result<()>,
    ) -> Result<(), ReadError> {
        let mut cursor = unrar::Archive::new(archive)
            .open_for_processing()
            .map_err(unrar_error)?;

        while let Some(header) = cursor.read_header().map_err(unrar_error)? {
            let entry = header.entry();
            let name = normalize_entry_name(&entry.filename.to_string_lossy());
            cursor = if entry.is_file() && wanted(&name) {
                let (payload, rest) = header.read().map_err(unrar_error)?;
                sink(&name, payload)?;
                rest
            } else {
                header.skip().map_err(unrar_error)?
            };
        }
        Ok(())
    }
}

fn unrar_error(err: impl Display) -> ReadError {
    ReadError::Corrupt(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::cbr::CbrReader;

    /// Stored RAR4 archive: a `pages/` directory holding `b.jpg` then
    /// `a.jpg`, followed by `ComicInfo.xml`.
    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn lists_files_and_skips_directories() {
        let names = UnrarLibrary.list(&fixture("pages.rar")).unwrap();
        assert_eq!(names, ["pages/b.jpg", "pages/a.jpg", "ComicInfo.xml"]);
    }

    #[test]
    fn hands_over_only_wanted_entries() {
        let mut seen = Vec::new();
        UnrarLibrary
            .for_each_entry(
                &fixture("pages.rar"),
                &|name: &str| name.ends_with(".jpg"),
                &mut |name: &str, payload: Vec<u8>| {
                    seen.push((name.to_string(), payload));
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(
            seen,
            [
                ("pages/b.jpg".to_string(), b"second page bytes".to_vec()),
                ("pages/a.jpg".to_string(), b"first page bytes".to_vec()),
            ]
        );
    }

    #[test]
    fn reader_orders_pages_from_a_real_archive() {
        let mut reader = CbrReader::open(fixture("pages.rar"), Arc::new(UnrarLibrary)).unwrap();
        let names: Vec<_> = reader.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, ["pages/a.jpg", "pages/b.jpg"]);
        assert_eq!(reader.read_entry(0).unwrap().payload, b"first page bytes");
        assert_eq!(reader.read_entry(1).unwrap().payload, b"second page bytes");
    }

    #[test]
    fn encrypted_entries_are_refused() {
        assert!(UnrarLibrary.list(&fixture("encrypted.rar")).is_err());
    }

    #[test]
    fn sink_failure_stops_the_walk() {
        let err = UnrarLibrary
            .for_each_entry(
                &fixture("pages.rar"),
                &|_: &str| true,
                &mut |_: &str, _: Vec<u8>| Err(io::Error::other("disk full")),
            )
            .unwrap_err();
        assert!(matches!(err, ReadError::IoFailure(_)));
    }
}
