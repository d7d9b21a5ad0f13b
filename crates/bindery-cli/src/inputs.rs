// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turns command-line arguments into the list of files to convert.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Expand `inputs` in order. Files are taken as given; the engine checks
/// their content. A directory contributes its immediate children whose
/// extension is `.cbz`, `.cbr`, or `.pdf`, sorted by name.
pub fn expand_inputs(inputs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = comic_files_in(input)?;
            debug!(dir = %input.display(), count = found.len(), "Expanded directory");
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn comic_files_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_comic_extension(&path) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn has_comic_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "cbz" | "cbr" | "pdf"
            )
        })
}
