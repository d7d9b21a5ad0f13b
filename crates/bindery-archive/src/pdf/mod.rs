// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: pages out of existing PDFs, and image-per-page PDFs in.

pub mod raster;
pub mod reader;
pub mod writer;

pub use raster::{PageRasterizer, Pdftoppm};
pub use reader::{PdfReadOptions, PdfReader};
pub use writer::PdfWriter;
