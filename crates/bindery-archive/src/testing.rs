// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process stand-ins for the external tools, plus fixture builders.
//
// `FakeRar` writes files that start with the real RAR5 signature (so format
// detection classifies them as CBR) followed by a simple length-prefixed
// entry list that only `FakeRar` can read back.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bindery_core::{ConverterConfig, ImageEncoding, ReadError, WriteError};
use ::image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use zip::write::SimpleFileOptions;

use crate::capabilities::Capabilities;
use crate::cbr::{RarCreate, RarExtract};
use crate::image::ImageProcessor;
use crate::pdf::PageRasterizer;

const RAR5_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x01\x00";

// -- Fake RAR ------------------------------------------------------------------

/// RAR read and create capability that needs no external tool.
#[derive(Debug, Default)]
pub struct FakeRar {
    drop_last_page: bool,
    delay: Duration,
    created: AtomicUsize,
}

impl FakeRar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates archives missing their last page, to exercise post-write
    /// validation.
    pub fn dropping_last_page() -> Self {
        Self {
            drop_last_page: true,
            ..Self::default()
        }
    }

    /// Sleeps for `delay` inside every archive creation.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Archives created so far.
    pub fn archives_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl RarExtract for FakeRar {
    fn list(&self, archive: &Path) -> Result<Vec<String>, ReadError> {
        Ok(parse_fake_rar(&std::fs::read(archive)?)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    fn for_each_entry(
        &self,
        archive: &Path,
        wanted: &dyn Fn(&str) -> bool,
        sink: &mut dyn FnMut(&str, Vec<u8>) -> io::Result<()>,
    ) -> Result<(), ReadError> {
        for (name, payload) in parse_fake_rar(&std::fs::read(archive)?)? {
            if wanted(&name) {
                sink(&name, payload)?;
            }
        }
        Ok(())
    }
}

impl RarCreate for FakeRar {
    fn tool_name(&self) -> String {
        "fake-rar".into()
    }

    fn probe(&self) -> Result<(), WriteError> {
        Ok(())
    }

    fn create(&self, archive: &Path, files: &[PathBuf]) -> Result<(), WriteError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let keep = if self.drop_last_page {
            files.len().saturating_sub(1)
        } else {
            files.len()
        };
        let mut entries = Vec::with_capacity(keep);
        for file in &files[..keep] {
            let name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push((name, std::fs::read(file)?));
        }
        std::fs::write(archive, encode_fake_rar(&entries))?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A RAR creator whose tool is never installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRar;

impl RarCreate for UnavailableRar {
    fn tool_name(&self) -> String {
        "rar".into()
    }

    fn probe(&self) -> Result<(), WriteError> {
        Err(WriteError::ToolUnavailable {
            tool: self.tool_name(),
        })
    }

    fn create(&self, _archive: &Path, _files: &[PathBuf]) -> Result<(), WriteError> {
        self.probe()
    }
}

fn encode_fake_rar(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut out = RAR5_SIGNATURE.to_vec();
    for (name, payload) in entries {
        out.extend_from_slice(&(name.len() as u32).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        out.extend_from_slice(payload);
    }
    out
}

fn parse_fake_rar(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>, ReadError> {
    let mut rest = bytes
        .strip_prefix(RAR5_SIGNATURE)
        .ok_or_else(corrupt_body)?;
    let mut entries = Vec::new();
    while !rest.is_empty() {
        let name_len = u32::from_le_bytes(take_array(&mut rest)?) as usize;
        let name = String::from_utf8(take(&mut rest, name_len)?.to_vec())
            .map_err(|_| corrupt_body())?;
        let data_len = u64::from_le_bytes(take_array(&mut rest)?) as usize;
        let payload = take(&mut rest, data_len)?.to_vec();
        entries.push((name, payload));
    }
    Ok(entries)
}

fn corrupt_body() -> ReadError {
    ReadError::Corrupt("malformed archive body".into())
}

fn take<'a>(rest: &mut &'a [u8], len: usize) -> Result<&'a [u8], ReadError> {
    if rest.len() < len {
        return Err(corrupt_body());
    }
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}

fn take_array<const N: usize>(rest: &mut &[u8]) -> Result<[u8; N], ReadError> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(rest, N)?);
    Ok(out)
}

/// Write a CBR readable by [`FakeRar`].
pub fn write_fake_cbr(path: impl AsRef<Path>, entries: &[(&str, Vec<u8>)]) {
    let owned: Vec<(String, Vec<u8>)> = entries
        .iter()
        .map(|(name, payload)| (name.to_string(), payload.clone()))
        .collect();
    std::fs::write(path, encode_fake_rar(&owned)).expect("write fake cbr");
}

// -- Rasterizers -----------------------------------------------------------------

/// A rasterizer that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRasterizer;

impl PageRasterizer for NoRasterizer {
    fn rasterize(
        &self,
        _pdf: &Path,
        page_number: u32,
        _dpi: u32,
        _encoding: ImageEncoding,
    ) -> Result<Vec<u8>, ReadError> {
        Err(ReadError::Unsupported(format!(
            "page {page_number} needs rasterizing and no rasterizer is available"
        )))
    }
}

/// A rasterizer that returns the same bytes for every page.
#[derive(Debug, Clone)]
pub struct FixedRasterizer(pub Vec<u8>);

impl PageRasterizer for FixedRasterizer {
    fn rasterize(
        &self,
        _pdf: &Path,
        _page_number: u32,
        _dpi: u32,
        _encoding: ImageEncoding,
    ) -> Result<Vec<u8>, ReadError> {
        Ok(self.0.clone())
    }
}

/// Default config with every external tool replaced by an in-process fake.
pub fn test_capabilities() -> Capabilities {
    let rar = Arc::new(FakeRar::new());
    Capabilities::system(ConverterConfig::default())
        .with_rar_extract(rar.clone())
        .with_rar_create(rar)
        .with_rasterizer(Arc::new(NoRasterizer))
}

// -- Fixtures --------------------------------------------------------------------

fn sample_image(seed: u8) -> ImageProcessor {
    let buffer = RgbImage::from_fn(16, 24, |x, y| {
        Rgb([
            seed.wrapping_mul(37),
            (x as u8).wrapping_mul(9).wrapping_add(seed),
            (y as u8).wrapping_mul(7),
        ])
    });
    ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(buffer))
}

/// A small, deterministic JPEG page; different seeds give different bytes.
pub fn sample_jpeg(seed: u8) -> Vec<u8> {
    sample_image(seed).to_jpeg_bytes(90).expect("encode sample jpeg")
}

/// A small, deterministic PNG page.
pub fn sample_png(seed: u8) -> Vec<u8> {
    sample_image(seed).to_png_bytes().expect("encode sample png")
}

/// Write a ZIP with the given entries, in the given order.
pub fn write_cbz(path: impl AsRef<Path>, entries: &[(&str, Vec<u8>)]) {
    let file = std::fs::File::create(path).expect("create cbz");
    let mut zip = zip::ZipWriter::new(file);
    for (name, payload) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        zip.write_all(payload).expect("write zip entry");
    }
    zip.finish().expect("finish cbz");
}

/// One page of a fixture PDF: a single full-page image XObject.
#[derive(Debug, Clone)]
pub enum FixturePage {
    /// A DCT-encoded JPEG, stored as-is.
    Jpeg(Vec<u8>),
    /// Raw 8-bit samples in `DeviceRGB` or `DeviceGray`, optionally Flate
    /// compressed.
    Samples {
        width: u32,
        height: u32,
        color_space: &'static str,
        bits_per_component: i64,
        samples: Vec<u8>,
        flate: bool,
    },
}

impl FixturePage {
    fn image_stream(&self) -> (Stream, i64, i64) {
        match self {
            Self::Jpeg(jpeg) => {
                let decoded = ImageProcessor::from_bytes(jpeg).expect("decode fixture jpeg");
                let (width, height) = (decoded.width() as i64, decoded.height() as i64);
                let stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width,
                        "Height" => height,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                        "Filter" => "DCTDecode",
                    },
                    jpeg.clone(),
                );
                (stream, width, height)
            }
            Self::Samples {
                width,
                height,
                color_space,
                bits_per_component,
                samples,
                flate,
            } => {
                let (width, height) = (*width as i64, *height as i64);
                let mut stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width,
                        "Height" => height,
                        "ColorSpace" => *color_space,
                        "BitsPerComponent" => *bits_per_component,
                    },
                    samples.clone(),
                );
                if *flate {
                    stream.compress().expect("compress fixture samples");
                    assert!(
                        stream.dict.has(b"Filter"),
                        "fixture samples too small to compress"
                    );
                }
                (stream, width, height)
            }
        }
    }
}

/// Write a PDF with one full-page DCT-encoded image per JPEG, the way scanners
/// and most comic tools lay them out.
pub fn write_image_pdf(path: impl AsRef<Path>, jpegs: &[Vec<u8>]) {
    let pages: Vec<FixturePage> = jpegs.iter().cloned().map(FixturePage::Jpeg).collect();
    write_fixture_pdf(path, &pages);
}

/// Write a PDF whose pages are each exactly one image and no text.
pub fn write_fixture_pdf(path: impl AsRef<Path>, pages: &[FixturePage]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for page in pages {
        let (stream, width, height) = page.image_stream();
        let image_id = doc.add_object(stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path.as_ref()).expect("save fixture pdf");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_rar_round_trips_entries() {
        let entries = vec![
            ("a.jpg".to_string(), vec![1, 2, 3]),
            ("b.png".to_string(), Vec::new()),
        ];
        let bytes = encode_fake_rar(&entries);
        assert!(bytes.starts_with(RAR5_SIGNATURE));
        assert_eq!(parse_fake_rar(&bytes).unwrap(), entries);
    }

    #[test]
    fn truncated_fake_rar_is_corrupt() {
        let mut bytes = encode_fake_rar(&[("a.jpg".to_string(), vec![1, 2, 3])]);
        bytes.pop();
        assert!(matches!(parse_fake_rar(&bytes), Err(ReadError::Corrupt(_))));
    }

    #[test]
    fn samples_are_deterministic_and_distinct() {
        assert_eq!(sample_jpeg(1), sample_jpeg(1));
        assert_ne!(sample_jpeg(1), sample_jpeg(2));
    }
}
