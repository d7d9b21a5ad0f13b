// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use bindery_core::ArchiveFormat;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "Convert comic archives between CBZ, CBR, and PDF", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert files, or every comic directly inside a directory
    Convert {
        /// Files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Target format: cbz, cbr, or pdf
        #[arg(long, short = 't')]
        to: ArchiveFormat,
        /// Delete each source once its output has been verified
        #[arg(long)]
        delete_original: bool,
        /// JSON settings file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Convert this many files at once (overrides the config file)
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
    },
    /// Show what a comic archive contains
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print one JSON object per file
        #[arg(long)]
        json: bool,
    },
}
