// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CBR module: RAR containers of page images.
//
// Reading and creating RAR archives are separate capabilities. Extraction is
// backed by the unrar library; creation needs the proprietary `rar` program,
// so it can be missing on a system where reading works fine.

pub mod rar_command;
pub mod reader;
pub mod unrar_backend;
pub mod writer;

use std::io;
use std::path::{Path, PathBuf};

use bindery_core::{ReadError, WriteError};

pub use rar_command::RarCommand;
pub use reader::CbrReader;
pub use unrar_backend::UnrarLibrary;
pub use writer::CbrWriter;

/// Read access to RAR archives.
pub trait RarExtract: Send + Sync {
    /// Names of all file entries (directories excluded), using `/` as the
    /// separator.
    fn list(&self, archive: &Path) -> Result<Vec<String>, ReadError>;

    /// Walk the archive once, handing the payload of every file entry that
    /// `wanted` accepts to `sink`. Entries are decompressed one at a time.
    fn for_each_entry(
        &self,
        archive: &Path,
        wanted: &dyn Fn(&str) -> bool,
        sink: &mut dyn FnMut(&str, Vec<u8>) -> io::Result<()>,
    ) -> Result<(), ReadError>;
}

/// Creation of RAR archives.
pub trait RarCreate: Send + Sync {
    /// Name reported in `ToolUnavailable`/`ToolFailed` errors.
    fn tool_name(&self) -> String;

    /// Fail fast with `ToolUnavailable` before any page is processed.
    fn probe(&self) -> Result<(), WriteError>;

    /// Create `archive` holding `files`, stored under their file names only,
    /// in the given order.
    fn create(&self, archive: &Path, files: &[PathBuf]) -> Result<(), WriteError>;
}
