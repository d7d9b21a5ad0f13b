// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staged output: every writer builds its container inside a scratch directory
// next to the target and renames it into place on commit. Dropping a staged
// output without committing removes everything it wrote.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

pub struct StagedOutput {
    scratch: TempDir,
    staged_path: PathBuf,
    target: PathBuf,
}

impl StagedOutput {
    /// Reserve a scratch directory in the target's parent. Same filesystem, so
    /// the final rename is atomic.
    pub fn new(target: impl Into<PathBuf>) -> io::Result<Self> {
        let target = target.into();
        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = target.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("output path {} has no file name", target.display()),
            )
        })?;

        let scratch = tempfile::Builder::new()
            .prefix(".bindery-")
            .tempdir_in(&parent)?;
        let staged_path = scratch.path().join(file_name);

        Ok(Self {
            scratch,
            staged_path,
            target,
        })
    }

    /// Where the writer puts the container while it is being built.
    pub fn path(&self) -> &Path {
        &self.staged_path
    }

    /// Scratch space for intermediate files, removed with the staging area.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Move the staged container onto the target path.
    pub fn commit(self) -> io::Result<()> {
        std::fs::rename(&self.staged_path, &self.target)?;
        debug!(target = %self.target.display(), "Output committed");
        Ok(())
    }
}
