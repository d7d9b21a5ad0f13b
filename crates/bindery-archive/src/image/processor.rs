// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode page payloads and re-encode them when a target
// needs a different representation. Pages are never resized or recompressed
// unless a container forces it.

use bindery_core::{ImageEncoding, ReadError, WriteError};
use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, instrument};

/// A page payload that could not be decoded or encoded.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ImageFailure(String);

impl From<ImageFailure> for WriteError {
    fn from(err: ImageFailure) -> Self {
        WriteError::Encode(err.0)
    }
}

impl From<ImageFailure> for ReadError {
    fn from(err: ImageFailure) -> Self {
        ReadError::Corrupt(err.0)
    }
}

/// A single decoded page image.
///
/// ```ignore
/// let png = ImageProcessor::from_bytes(&jpeg_payload)?.to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    /// Decode an encoded payload (JPEG, PNG, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ImageFailure> {
        let img = image::load_from_memory(data)
            .map_err(|err| ImageFailure(format!("failed to decode image: {err}")))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Wrap raw 8-bit RGB samples, as stored in an uncompressed PDF image.
    pub fn from_rgb8(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, ImageFailure> {
        RgbImage::from_raw(width, height, samples)
            .map(|buffer| Self::from_dynamic(DynamicImage::ImageRgb8(buffer)))
            .ok_or_else(|| ImageFailure(format!("sample buffer does not fit {width}x{height} RGB")))
    }

    /// Wrap raw 8-bit grayscale samples.
    pub fn from_luma8(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, ImageFailure> {
        image::GrayImage::from_raw(width, height, samples)
            .map(|buffer| Self::from_dynamic(DynamicImage::ImageLuma8(buffer)))
            .ok_or_else(|| ImageFailure(format!("sample buffer does not fit {width}x{height} gray")))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return 8-bit RGB pixels (alpha dropped).
    pub fn into_rgb8(self) -> RgbImage {
        self.image.into_rgb8()
    }

    /// Encode as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ImageFailure> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, ImageFailure> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| ImageFailure(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode with the configured page encoding.
    pub fn encode(&self, encoding: ImageEncoding) -> Result<Vec<u8>, ImageFailure> {
        match encoding {
            ImageEncoding::Png => self.to_png_bytes(),
            ImageEncoding::Jpeg { quality } => self.to_jpeg_bytes(quality),
        }
    }
}

fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ImageFailure> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| ImageFailure(format!("image encoding failed: {err}")))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> ImageProcessor {
        let buffer = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 10) as u8, (y * 10) as u8, 128])
        });
        ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(buffer))
    }

    #[test]
    fn png_encoding_is_lossless() {
        let png = gradient(12, 7).to_png_bytes().unwrap();
        let decoded = ImageProcessor::from_bytes(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
        assert_eq!(decoded.into_rgb8(), gradient(12, 7).into_rgb8());
    }

    #[test]
    fn jpeg_encoding_honours_configured_encoding() {
        let jpeg = gradient(16, 16)
            .encode(ImageEncoding::Jpeg { quality: 80 })
            .unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn garbage_does_not_decode() {
        let err = ImageProcessor::from_bytes(b"definitely not an image").err().unwrap();
        assert!(matches!(WriteError::from(err), WriteError::Encode(_)));
    }

    #[test]
    fn raw_samples_must_match_dimensions() {
        assert!(ImageProcessor::from_rgb8(2, 2, vec![0; 12]).is_ok());
        assert!(ImageProcessor::from_rgb8(2, 2, vec![0; 11]).is_err());
        assert!(ImageProcessor::from_luma8(3, 1, vec![0; 3]).is_ok());
    }
}
