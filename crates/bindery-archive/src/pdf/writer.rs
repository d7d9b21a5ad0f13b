// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: one page per image using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. Every page image stays decoded in the document until
// finalize, so memory grows with page count.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use bindery_core::config::PdfPageSize;
use bindery_core::{ConverterConfig, PageEntry, PaperSize, WriteError};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::image::ImageProcessor;
use crate::staging::StagedOutput;

const MM_PER_INCH: f32 = 25.4;
const PT_PER_INCH: f32 = 72.0;

pub struct PdfWriter {
    staged: StagedOutput,
    document: PdfDocument,
    pages: Vec<PdfPage>,
    dpi: f32,
    page_size: PdfPageSize,
}

impl PdfWriter {
    /// Start a document titled after the target's file stem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn create(path: impl AsRef<Path>, config: &ConverterConfig) -> Result<Self, WriteError> {
        let staged = StagedOutput::new(path.as_ref())?;
        let title = path
            .as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Comic".to_string());

        info!(title, page_size = ?config.pdf_page_size, "Creating image PDF");
        Ok(Self {
            staged,
            document: PdfDocument::new(&title),
            pages: Vec::new(),
            dpi: config.pdf_dpi as f32,
            page_size: config.pdf_page_size,
        })
    }

    #[instrument(skip_all, fields(page = page.index + 1, bytes = page.payload.len()))]
    pub fn append_page(&mut self, page: &PageEntry) -> Result<(), WriteError> {
        let decoded = ImageProcessor::from_bytes(&page.payload)?;
        let (width, height) = (decoded.width(), decoded.height());
        let rgb = decoded.into_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width as usize,
            height: height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = self.document.add_image(&raw);

        // Image native size at the configured DPI.
        let img_w_pt = width as f32 / self.dpi * PT_PER_INCH;
        let img_h_pt = height as f32 / self.dpi * PT_PER_INCH;

        let (page_w, page_h, transform) = match self.page_size {
            PdfPageSize::MatchImage => (
                Mm(width as f32 / self.dpi * MM_PER_INCH),
                Mm(height as f32 / self.dpi * MM_PER_INCH),
                XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(1.0),
                    scale_y: Some(1.0),
                    dpi: Some(self.dpi),
                    rotate: None,
                },
            ),
            PdfPageSize::Paper(paper) => {
                let (page_w, page_h) = paper_dimensions(paper);
                let transform = fit_on_page(page_w, page_h, img_w_pt, img_h_pt, self.dpi);
                (page_w, page_h, transform)
            }
        };

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform,
        }];
        self.pages.push(PdfPage::new(page_w, page_h, ops));
        debug!(width, height, "Image placed on page");
        Ok(())
    }

    pub fn finalize(self) -> Result<(), WriteError> {
        let Self {
            staged,
            mut document,
            pages,
            ..
        } = self;
        let page_count = pages.len();
        document.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = document.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "printpdf reported warnings");
        }

        let mut file = File::create(staged.path())?;
        file.write_all(&output)?;
        file.sync_all()?;
        drop(file);
        staged.commit()?;

        info!(pages = page_count, bytes = output.len(), "PDF finalised");
        Ok(())
    }
}

fn paper_dimensions(paper: PaperSize) -> (Mm, Mm) {
    let (w_mm, h_mm) = paper.dimensions_mm();
    (Mm(w_mm as f32), Mm(h_mm as f32))
}

/// Scale the image to fit the page, preserving aspect ratio, and centre it.
fn fit_on_page(page_w: Mm, page_h: Mm, img_w_pt: f32, img_h_pt: f32, dpi: f32) -> XObjectTransform {
    let page_w_pt = page_w.into_pt().0;
    let page_h_pt = page_h.into_pt().0;
    let scale = (page_w_pt / img_w_pt).min(page_h_pt / img_h_pt);

    let x_offset = (page_w_pt - img_w_pt * scale) / 2.0;
    let y_offset = (page_h_pt - img_h_pt * scale) / 2.0;

    XObjectTransform {
        translate_x: Some(Pt(x_offset)),
        translate_y: Some(Pt(y_offset)),
        scale_x: Some(scale),
        scale_y: Some(scale),
        dpi: Some(dpi),
        rotate: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_jpeg, sample_png};

    fn page(index: usize, payload: Vec<u8>) -> PageEntry {
        PageEntry {
            index,
            source_name: format!("{index}.img"),
            payload,
        }
    }

    fn page_count(path: &Path) -> usize {
        lopdf::Document::load(path).unwrap().get_pages().len()
    }

    #[test]
    fn one_pdf_page_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("issue.pdf");

        let mut writer = PdfWriter::create(&target, &ConverterConfig::default()).unwrap();
        writer.append_page(&page(0, sample_jpeg(1))).unwrap();
        writer.append_page(&page(1, sample_png(2))).unwrap();
        writer.append_page(&page(2, sample_jpeg(3))).unwrap();
        writer.finalize().unwrap();

        assert!(std::fs::read(&target).unwrap().starts_with(b"%PDF-"));
        assert_eq!(page_count(&target), 3);
    }

    #[test]
    fn paper_pages_use_the_paper_size() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("issue.pdf");
        let config = ConverterConfig {
            pdf_page_size: PdfPageSize::Paper(PaperSize::A4),
            ..ConverterConfig::default()
        };

        let mut writer = PdfWriter::create(&target, &config).unwrap();
        writer.append_page(&page(0, sample_jpeg(1))).unwrap();
        writer.finalize().unwrap();
        assert_eq!(page_count(&target), 1);
    }

    #[test]
    fn fitted_image_is_centred() {
        // 100x200 pt image on a 210x297 mm page: height-bound.
        let transform = fit_on_page(Mm(210.0), Mm(297.0), 100.0, 200.0, 150.0);
        let scale = transform.scale_x.unwrap();
        let page_h_pt = Mm(297.0).into_pt().0;
        assert!((200.0 * scale - page_h_pt).abs() < 0.01);
        assert!(transform.translate_x.unwrap().0 > 0.0);
        assert!(transform.translate_y.unwrap().0.abs() < 0.01);
    }

    #[test]
    fn undecodable_page_is_an_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            PdfWriter::create(dir.path().join("x.pdf"), &ConverterConfig::default()).unwrap();
        let err = writer.append_page(&page(0, b"nope".to_vec())).unwrap_err();
        assert!(matches!(err, WriteError::Encode(_)));
    }

    #[test]
    fn abandoned_writer_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x.pdf");
        {
            let mut writer = PdfWriter::create(&target, &ConverterConfig::default()).unwrap();
            writer.append_page(&page(0, sample_jpeg(1))).unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
