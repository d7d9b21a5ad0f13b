// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format detection from leading bytes.
//
// Only a bounded prefix of the file is read. The extension breaks ties for
// files too short to carry any signature; it never overrides one.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bindery_core::{ArchiveFormat, DetectionError};
use tracing::{debug, instrument};

/// Bytes read from the start of a file. PDF allows junk before `%PDF-`
/// within the first kilobyte.
pub const PREFIX_LEN: usize = 1024;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const ZIP_SPANNED: &[u8] = b"PK\x07\x08";
const RAR4_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x00";
const RAR5_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x01\x00";
const PDF_MARKER: &[u8] = b"%PDF-";

/// Classify `path` by content. Unreadable or unrecognised files are
/// [`ArchiveFormat::Unsupported`]; detection never fails.
pub fn detect(path: impl AsRef<Path>) -> ArchiveFormat {
    detect_with_reason(path).unwrap_or(ArchiveFormat::Unsupported)
}

/// Like [`detect`], but says why a file was not classified.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn detect_with_reason(path: impl AsRef<Path>) -> Result<ArchiveFormat, DetectionError> {
    let path = path.as_ref();
    let prefix = read_prefix(path).map_err(|source| DetectionError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(format) = sniff(&prefix) {
        debug!(%format, "Signature matched");
        return Ok(format);
    }

    if prefix.is_empty() {
        // Nothing to sniff; the extension is the only evidence left.
        let hinted = ArchiveFormat::from_path_hint(path);
        if hinted.is_supported() {
            debug!(%hinted, "Empty file classified by extension");
            return Ok(hinted);
        }
    }

    Err(DetectionError::NoSignature(path.to_path_buf()))
}

/// Match known signatures against a byte prefix.
pub fn sniff(prefix: &[u8]) -> Option<ArchiveFormat> {
    if [ZIP_LOCAL_HEADER, ZIP_EMPTY_ARCHIVE, ZIP_SPANNED]
        .iter()
        .any(|sig| prefix.starts_with(sig))
    {
        return Some(ArchiveFormat::Cbz);
    }
    if prefix.starts_with(RAR5_SIGNATURE) || prefix.starts_with(RAR4_SIGNATURE) {
        return Some(ArchiveFormat::Cbr);
    }
    let window = &prefix[..prefix.len().min(PREFIX_LEN)];
    if window
        .windows(PDF_MARKER.len())
        .any(|candidate| candidate == PDF_MARKER)
    {
        return Some(ArchiveFormat::Pdf);
    }
    None
}

fn read_prefix(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(PREFIX_LEN);
    file.take(PREFIX_LEN as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}
