// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for conversion failures.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The batch runner stores the suggestion on the failed job so that any
// front end can show it without knowing the error taxonomy.

use crate::error::{ConversionError, ReadError, ValidationError, WriteError};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing wrong with the file; trying again may work.
    Transient,
    /// User must do something (install a tool, pick another target format).
    ActionRequired,
    /// The file itself is the problem.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `ConversionError` into a `HumanError`.
pub fn humanize_error(err: &ConversionError) -> HumanError {
    match err {
        ConversionError::Validation(inner) => humanize_validation(inner),
        ConversionError::Read(inner) => humanize_read(inner),
        ConversionError::Write(inner) => humanize_write(inner),

        ConversionError::EmptyArchive => HumanError {
            message: "This file has no comic pages in it.".into(),
            suggestion: "Only JPEG, PNG, GIF, WebP, BMP, and TIFF images are treated as pages. Check the archive's contents.".into(),
            severity: Severity::Permanent,
        },

        ConversionError::EntryFailed { index, name, .. } => HumanError {
            message: format!("Page {} ({name}) could not be converted.", index + 1),
            suggestion: "The page image may be damaged. Nothing was written, so the original is untouched.".into(),
            severity: Severity::Permanent,
        },

        ConversionError::Cancelled => HumanError {
            message: "The conversion was cancelled.".into(),
            suggestion: "Start the batch again to convert the remaining files.".into(),
            severity: Severity::Transient,
        },
    }
}

fn humanize_validation(err: &ValidationError) -> HumanError {
    match err {
        ValidationError::SameFormat(format) => HumanError {
            message: format!("This file is already a {format}."),
            suggestion: "Pick a different target format.".into(),
            severity: Severity::ActionRequired,
        },

        ValidationError::UnsupportedPair { from, to } => HumanError {
            message: format!("{from} files can't be converted straight to {to}."),
            suggestion: format!("Convert to CBZ first, then convert the CBZ to {to}."),
            severity: Severity::ActionRequired,
        },

        ValidationError::UnsupportedSource(_) => HumanError {
            message: "This isn't a comic archive or PDF.".into(),
            suggestion: "Only CBZ, CBR, and PDF files can be converted.".into(),
            severity: Severity::Permanent,
        },

        ValidationError::TargetIsSource(_) => HumanError {
            message: "Converting this file would overwrite the original.".into(),
            suggestion: "Its extension doesn't match what's inside. Rename it to match its real format and try again.".into(),
            severity: Severity::ActionRequired,
        },

        ValidationError::TargetConflict(_) => HumanError {
            message: "Another file in this batch converts to the same name.".into(),
            suggestion: "Convert these files in separate batches, or rename one of them.".into(),
            severity: Severity::ActionRequired,
        },

        ValidationError::SourceUnreadable(inner) => humanize_read(inner),

        ValidationError::MissingOutput(_)
        | ValidationError::OutputUnreadable(_)
        | ValidationError::FormatMismatch { .. }
        | ValidationError::PageCountMismatch { .. } => HumanError {
            message: "The converted file didn't pass its final check.".into(),
            suggestion: "The original was kept. Try converting it again.".into(),
            severity: Severity::Transient,
        },
    }
}

fn humanize_read(err: &ReadError) -> HumanError {
    match err {
        ReadError::Corrupt(_) => HumanError {
            message: "This file appears to be damaged.".into(),
            suggestion: "Try opening it in a comic reader to check it works, or download it again.".into(),
            severity: Severity::Permanent,
        },

        ReadError::Unsupported(detail) => HumanError {
            message: "This file uses a feature we can't read.".into(),
            suggestion: format!("Multi-volume and encrypted archives aren't supported. ({detail})"),
            severity: Severity::Permanent,
        },

        ReadError::IoFailure(io_err) => humanize_io(io_err),
    }
}

fn humanize_write(err: &WriteError) -> HumanError {
    match err {
        WriteError::ToolUnavailable { tool } => HumanError {
            message: format!("The `{tool}` program is needed for this conversion."),
            suggestion: format!("Install `{tool}` and make sure it is on your PATH, then try again."),
            severity: Severity::ActionRequired,
        },

        WriteError::ToolFailed { tool, .. } => HumanError {
            message: format!("`{tool}` reported an error."),
            suggestion: "Check there is enough free disk space, then try again.".into(),
            severity: Severity::Transient,
        },

        WriteError::Encode(_) => HumanError {
            message: "A page couldn't be written in the new format.".into(),
            suggestion: "The page image may be in an unusual format. Try converting to CBZ instead.".into(),
            severity: Severity::Permanent,
        },

        WriteError::IoFailure(io_err) => humanize_io(io_err),
    }
}

fn humanize_io(io_err: &std::io::Error) -> HumanError {
    match io_err.kind() {
        std::io::ErrorKind::NotFound => HumanError {
            message: "The file couldn't be found.".into(),
            suggestion: "It may have been moved or deleted. Try adding the file again.".into(),
            severity: Severity::ActionRequired,
        },
        std::io::ErrorKind::PermissionDenied => HumanError {
            message: "We don't have permission to use that file or folder.".into(),
            suggestion: "Check the permissions of the file and the folder it's in.".into(),
            severity: Severity::ActionRequired,
        },
        _ => HumanError {
            message: "There was a problem reading or writing a file.".into(),
            suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArchiveFormat;

    #[test]
    fn missing_rar_tool_is_action_required() {
        let err = ConversionError::from(WriteError::ToolUnavailable { tool: "rar".into() });
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("rar"));
    }

    #[test]
    fn unsupported_pair_suggests_going_through_cbz() {
        let err = ConversionError::from(ValidationError::UnsupportedPair {
            from: ArchiveFormat::Cbr,
            to: ArchiveFormat::Pdf,
        });
        let human = humanize_error(&err);
        assert!(human.suggestion.contains("CBZ first"));
    }

    #[test]
    fn overwriting_the_source_asks_for_a_rename() {
        let err = ConversionError::from(ValidationError::TargetIsSource("issue.cbz".into()));
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("Rename"));
    }

    #[test]
    fn corrupt_source_is_permanent() {
        let err = ConversionError::from(ValidationError::SourceUnreadable(ReadError::Corrupt(
            "truncated".into(),
        )));
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }

    #[test]
    fn entry_failure_uses_one_based_page_numbers() {
        let err = ConversionError::EntryFailed {
            index: 4,
            name: "005.jpg".into(),
            detail: "bad huffman table".into(),
        };
        assert!(humanize_error(&err).message.starts_with("Page 5"));
    }
}
