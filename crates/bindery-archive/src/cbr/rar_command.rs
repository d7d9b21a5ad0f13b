// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RAR creation by shelling out to the `rar` program.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use bindery_core::WriteError;
use tracing::{debug, instrument, warn};

use super::RarCreate;

/// The external `rar` archiver.
#[derive(Debug, Clone)]
pub struct RarCommand {
    program: PathBuf,
}

impl RarCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn spawn_error(&self, err: io::Error) -> WriteError {
        if err.kind() == io::ErrorKind::NotFound {
            warn!(program = %self.program.display(), "RAR tool not found");
            WriteError::ToolUnavailable {
                tool: self.tool_name(),
            }
        } else {
            WriteError::ToolFailed {
                tool: self.tool_name(),
                detail: err.to_string(),
            }
        }
    }
}

impl Default for RarCommand {
    fn default() -> Self {
        Self::new("rar")
    }
}

impl RarCreate for RarCommand {
    fn tool_name(&self) -> String {
        self.program.display().to_string()
    }

    fn probe(&self) -> Result<(), WriteError> {
        Command::new(&self.program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|err| self.spawn_error(err))
    }

    #[instrument(skip_all, fields(archive = %archive.display(), files = files.len()))]
    fn create(&self, archive: &Path, files: &[PathBuf]) -> Result<(), WriteError> {
        // a: add, -ep: drop directories from names, -m0: store (pages are
        // already compressed), -idq: quiet, -y: assume yes.
        let output = Command::new(&self.program)
            .args(["a", "-ep", "-m0", "-idq", "-y", "--"])
            .arg(archive)
            .args(files)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| self.spawn_error(err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                text => text.to_string(),
            };
            return Err(WriteError::ToolFailed {
                tool: self.tool_name(),
                detail,
            });
        }
        debug!("RAR archive created");
        Ok(())
    }
}
