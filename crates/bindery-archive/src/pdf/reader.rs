// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: turns each page of an existing PDF into one page image using
// the `lopdf` crate.
//
// A page that is nothing but a single embedded image (the usual shape of a
// scanned comic) yields that image directly: JPEG streams byte-for-byte,
// uncompressed or Flate RGB/gray samples re-encoded with the configured
// encoding. Any other page is handed to the rasterizer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bindery_core::config::PdfPageMode;
use bindery_core::{ConverterConfig, EntryInfo, ImageEncoding, PageEntry, ReadError};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

use super::raster::PageRasterizer;
use crate::image::ImageProcessor;

/// Parent chain depth beyond which a page tree is treated as malformed.
const MAX_TREE_DEPTH: usize = 32;

/// How pages are turned into images.
#[derive(Debug, Clone, Copy)]
pub struct PdfReadOptions {
    pub mode: PdfPageMode,
    pub dpi: u32,
    pub encoding: ImageEncoding,
}

impl PdfReadOptions {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            mode: config.pdf_page_mode,
            dpi: config.pdf_dpi,
            encoding: config.pdf_page_image,
        }
    }
}

impl Default for PdfReadOptions {
    fn default() -> Self {
        Self::from_config(&ConverterConfig::default())
    }
}

pub struct PdfReader {
    document: Document,
    source_path: PathBuf,
    /// Page objects in page order.
    pages: Vec<ObjectId>,
    entries: Vec<EntryInfo>,
    raw_names: Vec<String>,
    options: PdfReadOptions,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl PdfReader {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(
        path: impl AsRef<Path>,
        options: PdfReadOptions,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Result<Self, ReadError> {
        let path_ref = path.as_ref();
        // Surface a missing file as I/O, not as a corrupt document.
        std::fs::metadata(path_ref)?;

        let document = Document::load(path_ref).map_err(|err| {
            ReadError::Corrupt(format!("failed to open {}: {err}", path_ref.display()))
        })?;
        if document.is_encrypted() {
            return Err(ReadError::Unsupported("encrypted PDF".into()));
        }

        // get_pages is keyed by 1-based page number, so values come out in
        // page order.
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        let entries: Vec<EntryInfo> = (0..pages.len())
            .map(|index| EntryInfo {
                index,
                name: format!("page {}", index + 1),
            })
            .collect();
        let raw_names = entries.iter().map(|entry| entry.name.clone()).collect();

        info!(pages = pages.len(), mode = ?options.mode, "PDF loaded");
        Ok(Self {
            document,
            source_path: path_ref.to_path_buf(),
            pages,
            entries,
            raw_names,
            options,
            rasterizer,
        })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    /// A PDF has no entry names of its own; these are the synthetic page names.
    pub fn raw_names(&self) -> &[String] {
        &self.raw_names
    }

    #[instrument(skip(self))]
    pub fn read_entry(&mut self, index: usize) -> Result<PageEntry, ReadError> {
        let page_id = *self.pages.get(index).ok_or_else(|| {
            ReadError::Corrupt(format!(
                "page {} out of range (document has {} pages)",
                index + 1,
                self.pages.len()
            ))
        })?;

        let embedded = match self.options.mode {
            PdfPageMode::PreferEmbedded => self.embedded_image(page_id),
            PdfPageMode::Rasterize => None,
        };
        let payload = match embedded {
            Some(payload) => {
                debug!(page = index + 1, "Using embedded page image");
                payload
            }
            None => self.rasterizer.rasterize(
                &self.source_path,
                (index + 1) as u32,
                self.options.dpi,
                self.options.encoding,
            )?,
        };

        Ok(PageEntry {
            index,
            source_name: self.entries[index].name.clone(),
            payload,
        })
    }

    // -- Embedded image extraction --------------------------------------------

    /// The page's only image, if the page is exactly one image and no text.
    fn embedded_image(&self, page_id: ObjectId) -> Option<Vec<u8>> {
        let resources = self.page_resources(page_id)?;
        if resources.has(b"Font") {
            return None;
        }
        let xobjects = self.resolve_dict(resources.get(b"XObject").ok()?)?;

        let mut images = xobjects.iter().filter_map(|(_, object)| {
            let stream = self
                .document
                .get_object(object.as_reference().ok()?)
                .ok()?
                .as_stream()
                .ok()?;
            is_image(stream).then_some(stream)
        });
        let image = images.next()?;
        if images.next().is_some() {
            return None;
        }
        self.decode_image_stream(image)
    }

    /// Resources of a page, inherited from the page tree when not set on the
    /// page itself.
    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(resources) = node.get(b"Resources") {
                return self.resolve_dict(resources);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        match object {
            Object::Dictionary(dict) => Some(dict),
            Object::Reference(id) => self.document.get_dictionary(*id).ok(),
            _ => None,
        }
    }

    fn decode_image_stream(&self, stream: &Stream) -> Option<Vec<u8>> {
        let filters = stream_filters(&stream.dict);
        match filters.as_slice() {
            [only] if only.as_slice() == b"DCTDecode" => Some(stream.content.clone()),
            [] => self.encode_samples(&stream.dict, stream.content.clone()),
            [only] if only.as_slice() == b"FlateDecode" => {
                let samples = stream.decompressed_content().ok()?;
                self.encode_samples(&stream.dict, samples)
            }
            _ => None,
        }
    }

    /// Re-encode raw 8-bit RGB or gray samples with the configured encoding.
    fn encode_samples(&self, dict: &Dictionary, samples: Vec<u8>) -> Option<Vec<u8>> {
        let integer = |key: &[u8]| dict.get(key).ok()?.as_i64().ok();
        let width = u32::try_from(integer(b"Width")?).ok()?;
        let height = u32::try_from(integer(b"Height")?).ok()?;
        if integer(b"BitsPerComponent")? != 8 {
            return None;
        }
        let processor = match dict.get(b"ColorSpace").ok()?.as_name().ok()? {
            b"DeviceRGB" => ImageProcessor::from_rgb8(width, height, samples).ok()?,
            b"DeviceGray" => ImageProcessor::from_luma8(width, height, samples).ok()?,
            _ => return None,
        };
        processor.encode(self.options.encoding).ok()
    }
}

fn is_image(stream: &Stream) -> bool {
    stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .map(|name| name == b"Image")
        .unwrap_or(false)
}

fn stream_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FixedRasterizer, FixturePage, NoRasterizer, sample_jpeg, write_fixture_pdf,
        write_image_pdf,
    };

    fn samples(
        color_space: &'static str,
        bits: i64,
        samples: Vec<u8>,
        flate: bool,
    ) -> FixturePage {
        FixturePage::Samples {
            width: 8,
            height: 6,
            color_space,
            bits_per_component: bits,
            samples,
            flate,
        }
    }

    fn open(path: &Path, options: PdfReadOptions, raster: Arc<dyn PageRasterizer>) -> PdfReader {
        PdfReader::open(path, options, raster).unwrap()
    }

    #[test]
    fn single_image_pages_yield_the_embedded_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        write_image_pdf(&path, &[sample_jpeg(1), sample_jpeg(2)]);

        let mut reader = open(&path, PdfReadOptions::default(), Arc::new(NoRasterizer));
        assert_eq!(reader.page_count(), 2);
        assert_eq!(reader.entries()[1].name, "page 2");

        let second = reader.read_entry(1).unwrap();
        assert_eq!(second.payload, sample_jpeg(2));
    }

    #[test]
    fn rasterize_mode_always_uses_the_rasterizer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        write_image_pdf(&path, &[sample_jpeg(1)]);

        let options = PdfReadOptions {
            mode: PdfPageMode::Rasterize,
            ..PdfReadOptions::default()
        };
        let mut reader = open(&path, options, Arc::new(FixedRasterizer(b"rendered".to_vec())));
        assert_eq!(reader.read_entry(0).unwrap().payload, b"rendered");
    }

    #[test]
    fn rasterizer_failure_surfaces_as_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        write_image_pdf(&path, &[sample_jpeg(1)]);

        let options = PdfReadOptions {
            mode: PdfPageMode::Rasterize,
            ..PdfReadOptions::default()
        };
        let mut reader = open(&path, options, Arc::new(NoRasterizer));
        assert!(matches!(reader.read_entry(0), Err(ReadError::Unsupported(_))));
    }

    #[test]
    fn truncated_pdf_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.5\n1 0 obj\n<< /Type /Catalog").unwrap();
        assert!(matches!(
            PdfReader::open(&path, PdfReadOptions::default(), Arc::new(NoRasterizer)),
            Err(ReadError::Corrupt(_))
        ));
    }

    #[test]
    fn flate_rgb_samples_are_reencoded_losslessly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.pdf");
        let red = [200u8, 30, 40].repeat(8 * 6);
        write_fixture_pdf(&path, &[samples("DeviceRGB", 8, red, true)]);

        let mut reader = open(&path, PdfReadOptions::default(), Arc::new(NoRasterizer));
        let page = reader.read_entry(0).unwrap();
        assert_eq!(crate::image::sniff_extension(&page.payload), Some("png"));

        let decoded = ImageProcessor::from_bytes(&page.payload).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert_eq!(decoded.into_rgb8().get_pixel(3, 2).0, [200, 30, 40]);
    }

    #[test]
    fn uncompressed_gray_samples_become_a_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.pdf");
        write_fixture_pdf(&path, &[samples("DeviceGray", 8, vec![128; 8 * 6], false)]);

        let mut reader = open(&path, PdfReadOptions::default(), Arc::new(NoRasterizer));
        let decoded = ImageProcessor::from_bytes(&reader.read_entry(0).unwrap().payload).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert_eq!(decoded.into_rgb8().get_pixel(0, 0).0, [128, 128, 128]);
    }

    #[test]
    fn jpeg_encoding_applies_to_reencoded_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.pdf");
        write_fixture_pdf(&path, &[samples("DeviceGray", 8, vec![90; 8 * 6], true)]);

        let options = PdfReadOptions {
            encoding: ImageEncoding::Jpeg { quality: 85 },
            ..PdfReadOptions::default()
        };
        let mut reader = open(&path, options, Arc::new(NoRasterizer));
        let payload = reader.read_entry(0).unwrap().payload;
        assert_eq!(crate::image::sniff_extension(&payload), Some("jpg"));
    }

    #[test]
    fn unusual_samples_fall_back_to_the_rasterizer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bilevel.pdf");
        // 1-bit gray, one byte per row of eight pixels.
        write_fixture_pdf(&path, &[samples("DeviceGray", 1, vec![0xAA; 6], false)]);

        let rasterizer = Arc::new(FixedRasterizer(b"rendered".to_vec()));
        let mut reader = open(&path, PdfReadOptions::default(), rasterizer);
        assert_eq!(reader.read_entry(0).unwrap().payload, b"rendered");

        let mut without = open(&path, PdfReadOptions::default(), Arc::new(NoRasterizer));
        assert!(matches!(without.read_entry(0), Err(ReadError::Unsupported(_))));
    }
}
