// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CBZ module: ZIP containers of page images.

pub mod reader;
pub mod writer;

pub use reader::CbzReader;
pub use writer::CbzWriter;
