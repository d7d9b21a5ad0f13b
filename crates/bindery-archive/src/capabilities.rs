// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The external capabilities a conversion may need, grouped so they can be
// swapped for in-process stand-ins on systems (and in tests) that lack them.

use std::fmt;
use std::sync::Arc;

use bindery_core::ConverterConfig;

use crate::cbr::{RarCommand, RarCreate, RarExtract, UnrarLibrary};
use crate::pdf::{PageRasterizer, Pdftoppm};

#[derive(Clone)]
pub struct Capabilities {
    pub config: ConverterConfig,
    pub rar_extract: Arc<dyn RarExtract>,
    pub rar_create: Arc<dyn RarCreate>,
    pub rasterizer: Arc<dyn PageRasterizer>,
}

impl Capabilities {
    /// The real implementations: unrar for reading, the configured `rar` and
    /// `pdftoppm` programs for creating archives and rendering pages.
    pub fn system(config: ConverterConfig) -> Self {
        Self {
            rar_extract: Arc::new(UnrarLibrary),
            rar_create: Arc::new(RarCommand::new(config.rar_program.clone())),
            rasterizer: Arc::new(Pdftoppm::new(config.pdftoppm_program.clone())),
            config,
        }
    }

    pub fn with_rar_extract(mut self, extract: Arc<dyn RarExtract>) -> Self {
        self.rar_extract = extract;
        self
    }

    pub fn with_rar_create(mut self, create: Arc<dyn RarCreate>) -> Self {
        self.rar_create = create;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::system(ConverterConfig::default())
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("config", &self.config)
            .field("rar_create", &self.rar_create.tool_name())
            .finish_non_exhaustive()
    }
}
