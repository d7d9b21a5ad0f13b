// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validation gate: pre-flight checks before a job runs, and the post-write
// check that must pass before a source file may be deleted.

use std::path::Path;

use bindery_core::{ArchiveFormat, ConversionJob, ValidationError};
use tracing::{debug, instrument, warn};

use crate::capabilities::Capabilities;
use crate::detect::detect;
use crate::inspect::{ArchiveSummary, inspect_as};

/// Conversions the engine performs directly. CBR and PDF only meet via CBZ.
pub fn is_supported_pair(from: ArchiveFormat, to: ArchiveFormat) -> bool {
    use ArchiveFormat::*;
    matches!(
        (from, to),
        (Cbz, Cbr) | (Cbz, Pdf) | (Cbr, Cbz) | (Pdf, Cbz)
    )
}

/// Reject a job that cannot or should not run, before any output is created.
/// On success the source's summary is returned.
#[instrument(skip_all, fields(source = %job.source_path.display(), from = %job.source_format, to = %job.target_format))]
pub fn validate_for_conversion(
    job: &ConversionJob,
    caps: &Capabilities,
) -> Result<ArchiveSummary, ValidationError> {
    if !job.source_format.is_supported() {
        return Err(ValidationError::UnsupportedSource(job.source_path.clone()));
    }
    if job.source_format == job.target_format {
        return Err(ValidationError::SameFormat(job.source_format));
    }
    if !is_supported_pair(job.source_format, job.target_format) {
        return Err(ValidationError::UnsupportedPair {
            from: job.source_format,
            to: job.target_format,
        });
    }

    // A source whose extension lies about its content maps onto itself.
    if is_same_file(&job.source_path, &job.target_path) {
        return Err(ValidationError::TargetIsSource(job.target_path.clone()));
    }

    let summary = inspect_as(&job.source_path, job.source_format, caps)?;
    debug!(pages = summary.page_count, "Pre-flight passed");
    Ok(summary)
}

/// Whether two paths name the same file. Symlinks and `..` are resolved
/// when both paths exist.
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Confirm a written output exists, is the expected format, opens cleanly,
/// and holds the expected number of pages.
#[instrument(skip(caps, path), fields(path = %path.display()))]
pub fn validate_output(
    path: &Path,
    expected_format: ArchiveFormat,
    expected_pages: usize,
    caps: &Capabilities,
) -> Result<(), ValidationError> {
    if !path.is_file() {
        return Err(ValidationError::MissingOutput(path.to_path_buf()));
    }
    let actual = detect(path);
    if actual != expected_format {
        return Err(ValidationError::FormatMismatch {
            expected: expected_format,
            actual,
        });
    }
    let summary =
        inspect_as(path, actual, caps).map_err(ValidationError::OutputUnreadable)?;
    if summary.page_count != expected_pages {
        warn!(
            expected = expected_pages,
            actual = summary.page_count,
            "Output page count mismatch"
        );
        return Err(ValidationError::PageCountMismatch {
            expected: expected_pages,
            actual: summary.page_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_jpeg, test_capabilities, write_cbz, write_fake_cbr};
    use bindery_core::ReadError;

    fn cbz_with_pages(dir: &tempfile::TempDir, name: &str, pages: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let entries: Vec<(String, Vec<u8>)> = (0..pages)
            .map(|i| (format!("{i:03}.jpg"), sample_jpeg(i as u8)))
            .collect();
        let borrowed: Vec<(&str, Vec<u8>)> =
            entries.iter().map(|(n, p)| (n.as_str(), p.clone())).collect();
        write_cbz(&path, &borrowed);
        path
    }

    #[test]
    fn pair_table() {
        use ArchiveFormat::*;
        assert!(is_supported_pair(Cbz, Cbr));
        assert!(is_supported_pair(Cbz, Pdf));
        assert!(is_supported_pair(Cbr, Cbz));
        assert!(is_supported_pair(Pdf, Cbz));
        assert!(!is_supported_pair(Cbr, Pdf));
        assert!(!is_supported_pair(Pdf, Cbr));
        assert!(!is_supported_pair(Cbz, Cbz));
    }

    #[test]
    fn same_format_is_rejected_without_touching_the_file() {
        let job = ConversionJob::new("/nowhere/a.cbz", ArchiveFormat::Cbz, ArchiveFormat::Cbz, true);
        assert!(matches!(
            validate_for_conversion(&job, &test_capabilities()),
            Err(ValidationError::SameFormat(ArchiveFormat::Cbz))
        ));
    }

    #[test]
    fn cbr_to_pdf_is_an_unsupported_pair() {
        let job = ConversionJob::new("/nowhere/a.cbr", ArchiveFormat::Cbr, ArchiveFormat::Pdf, false);
        assert!(matches!(
            validate_for_conversion(&job, &test_capabilities()),
            Err(ValidationError::UnsupportedPair { .. })
        ));
    }

    #[test]
    fn rar_named_cbz_cannot_convert_onto_itself() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issue.cbz");
        write_fake_cbr(&path, &[("01.jpg", sample_jpeg(1))]);
        let before = std::fs::read(&path).unwrap();

        let job = crate::plan_job(&path, ArchiveFormat::Cbz, true);
        assert_eq!(job.source_format, ArchiveFormat::Cbr);
        assert!(matches!(
            validate_for_conversion(&job, &test_capabilities()),
            Err(ValidationError::TargetIsSource(_))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn same_file_follows_dot_dot() {
        let dir = tempfile::tempdir().unwrap();
        let path = cbz_with_pages(&dir, "a.cbz", 1);
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let roundabout = dir.path().join("sub").join("..").join("a.cbz");

        assert!(is_same_file(&path, &path));
        assert!(is_same_file(&path, &roundabout));
        assert!(!is_same_file(&path, &dir.path().join("a.pdf")));
    }

    #[test]
    fn corrupt_source_fails_the_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.cbz");
        std::fs::write(&path, b"PK\x03\x04garbage").unwrap();
        let job = ConversionJob::new(&path, ArchiveFormat::Cbz, ArchiveFormat::Pdf, false);
        assert!(matches!(
            validate_for_conversion(&job, &test_capabilities()),
            Err(ValidationError::SourceUnreadable(ReadError::Corrupt(_)))
        ));
    }

    #[test]
    fn healthy_source_passes_with_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = cbz_with_pages(&dir, "ok.cbz", 3);
        let job = ConversionJob::new(&path, ArchiveFormat::Cbz, ArchiveFormat::Pdf, false);
        let summary = validate_for_conversion(&job, &test_capabilities()).unwrap();
        assert_eq!(summary.page_count, 3);
    }

    #[test]
    fn output_checks() {
        let dir = tempfile::tempdir().unwrap();
        let caps = test_capabilities();
        let path = cbz_with_pages(&dir, "out.cbz", 2);

        assert!(validate_output(&path, ArchiveFormat::Cbz, 2, &caps).is_ok());
        assert!(matches!(
            validate_output(&path, ArchiveFormat::Cbz, 3, &caps),
            Err(ValidationError::PageCountMismatch { expected: 3, actual: 2 })
        ));
        assert!(matches!(
            validate_output(&path, ArchiveFormat::Pdf, 2, &caps),
            Err(ValidationError::FormatMismatch { .. })
        ));
        assert!(matches!(
            validate_output(&dir.path().join("gone.cbz"), ArchiveFormat::Cbz, 2, &caps),
            Err(ValidationError::MissingOutput(_))
        ));
    }
}
