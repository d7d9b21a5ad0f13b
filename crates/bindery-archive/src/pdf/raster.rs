// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization for PDF pages that are not a single embedded image.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use bindery_core::{ImageEncoding, ReadError};
use tracing::{debug, instrument};

/// Renders one PDF page to an encoded image.
pub trait PageRasterizer: Send + Sync {
    /// Render 1-based `page_number` of `pdf` at `dpi`.
    fn rasterize(
        &self,
        pdf: &Path,
        page_number: u32,
        dpi: u32,
        encoding: ImageEncoding,
    ) -> Result<Vec<u8>, ReadError>;
}

/// Rasterizer backed by poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    program: PathBuf,
}

impl Pdftoppm {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl PageRasterizer for Pdftoppm {
    #[instrument(skip(self, pdf, encoding), fields(pdf = %pdf.display()))]
    fn rasterize(
        &self,
        pdf: &Path,
        page_number: u32,
        dpi: u32,
        encoding: ImageEncoding,
    ) -> Result<Vec<u8>, ReadError> {
        let scratch = tempfile::Builder::new().prefix("bindery-raster-").tempdir()?;
        let out_root = scratch.path().join("page");
        let page = page_number.to_string();

        let mut command = Command::new(&self.program);
        command
            .args(["-f", page.as_str(), "-l", page.as_str()])
            .args(["-r", dpi.to_string().as_str()])
            .arg("-singlefile");
        match encoding {
            ImageEncoding::Png => {
                command.arg("-png");
            }
            ImageEncoding::Jpeg { quality } => {
                command
                    .arg("-jpeg")
                    .args(["-jpegopt", format!("quality={quality}").as_str()]);
            }
        }
        let output = command
            .arg(pdf)
            .arg(&out_root)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => ReadError::Unsupported(format!(
                    "page {page_number} needs rasterizing but `{}` is not installed",
                    self.program.display()
                )),
                _ => ReadError::IoFailure(err),
            })?;

        if !output.status.success() {
            return Err(ReadError::Corrupt(format!(
                "`{}` could not render page {page_number}: {}",
                self.program.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let rendered = out_root.with_extension(encoding.extension());
        let payload = std::fs::read(&rendered)?;
        debug!(page_number, bytes = payload.len(), "Page rasterized");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_reported_as_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.5\n").unwrap();

        let raster = Pdftoppm::new("/definitely/not/installed/pdftoppm");
        let err = raster.rasterize(&pdf, 1, 150, ImageEncoding::Png).unwrap_err();
        match err {
            ReadError::Unsupported(detail) => assert!(detail.contains("page 1")),
            other => panic!("expected Unsupported, got {other:?}"),
        }
    }
}
