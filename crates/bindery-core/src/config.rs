// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Converter configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ImageEncoding, PaperSize};

/// How PDF pages are turned into page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfPageMode {
    /// Return a page's single embedded image untouched when it has one;
    /// rasterize otherwise.
    PreferEmbedded,
    /// Always rasterize at the configured DPI.
    Rasterize,
}

/// Page size policy for PDF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfPageSize {
    /// Each page is exactly the image's size at the configured DPI.
    MatchImage,
    /// Fixed paper; the image is fitted and centred, aspect ratio preserved.
    Paper(PaperSize),
}

/// Settings shared by readers, writers, the pipeline, and the batch runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Rasterization DPI for PDF pages, and the pixel-to-point scale for PDF
    /// output (default 150).
    pub pdf_dpi: u32,
    /// Encoding of images rasterized from PDF pages.
    pub pdf_page_image: ImageEncoding,
    pub pdf_page_mode: PdfPageMode,
    pub pdf_page_size: PdfPageSize,
    /// Minimum interval between forwarded progress events.
    pub progress_interval_ms: u64,
    /// Jobs converted concurrently (1 keeps one container open at a time).
    pub max_concurrent_jobs: usize,
    /// External tool used to create RAR archives.
    pub rar_program: PathBuf,
    /// External tool used to rasterize PDF pages.
    pub pdftoppm_program: PathBuf,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            pdf_dpi: 150,
            pdf_page_image: ImageEncoding::Png,
            pdf_page_mode: PdfPageMode::PreferEmbedded,
            pdf_page_size: PdfPageSize::MatchImage,
            progress_interval_ms: 100,
            max_concurrent_jobs: 1,
            rar_program: PathBuf::from("rar"),
            pdftoppm_program: PathBuf::from("pdftoppm"),
        }
    }
}

impl ConverterConfig {
    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pdf_dpi == 0 {
            return Err(ConfigError::Invalid("pdf_dpi must be greater than 0".into()));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_jobs must be at least 1".into(),
            ));
        }
        match self.pdf_page_image {
            ImageEncoding::Jpeg { quality } if !(1..=100).contains(&quality) => {
                return Err(ConfigError::Invalid(format!(
                    "JPEG quality must be 1-100, got {quality}"
                )));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ConverterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pdf_dpi, 150);
        assert_eq!(config.max_concurrent_jobs, 1);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindery.json");
        std::fs::write(&path, r#"{ "pdf_dpi": 300, "max_concurrent_jobs": 2 }"#).unwrap();

        let config = ConverterConfig::from_json_file(&path).unwrap();
        assert_eq!(config.pdf_dpi, 300);
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.progress_interval_ms, 100);
        assert_eq!(config.rar_program, PathBuf::from("rar"));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let config = ConverterConfig {
            max_concurrent_jobs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_out_of_range_jpeg_quality() {
        let config = ConverterConfig {
            pdf_page_image: ImageEncoding::Jpeg { quality: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindery.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ConverterConfig::from_json_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
