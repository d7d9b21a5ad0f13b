// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: the page-image allowlist, payload sniffing, and decode/encode.

pub mod processor;

pub use processor::{ImageFailure, ImageProcessor};

use std::path::Path;

use ::image::ImageFormat;

/// Extensions accepted as comic pages. Everything else in an archive
/// (ComicInfo.xml, thumbnails databases, text files) is ignored.
pub const PAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// True when `name` looks like a page image by extension.
pub fn is_page_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            PAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Extension matching the encoded image in `payload`, if it is one of the
/// allowlisted formats.
pub fn sniff_extension(payload: &[u8]) -> Option<&'static str> {
    match ::image::guess_format(payload).ok()? {
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Png => Some("png"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::WebP => Some("webp"),
        ImageFormat::Bmp => Some("bmp"),
        ImageFormat::Tiff => Some("tif"),
        _ => None,
    }
}

/// Extension for a page when it is written under a new name: the payload's
/// real format first, then the source name's allowlisted extension.
pub fn page_extension(payload: &[u8], source_name: &str) -> Option<String> {
    if let Some(ext) = sniff_extension(payload) {
        return Some(ext.to_string());
    }
    if is_page_image(source_name) {
        return Path::new(source_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
    }
    None
}

/// Formats that are already compressed; deflating them again wastes time.
pub fn is_precompressed(ext: &str) -> bool {
    matches!(ext, "jpg" | "jpeg" | "png" | "gif" | "webp")
}
