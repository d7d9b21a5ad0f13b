// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bindery: batch converter between CBZ, CBR, and PDF comic archives.
//
// Entry point. Initialises logging, expands the inputs, runs the batch in the
// background, and prints its events as they arrive. Ctrl-C cancels the batch
// cooperatively.

mod cli;
mod inputs;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use bindery_archive::{Capabilities, inspect, plan_job};
use bindery_batch::BatchOrchestrator;
use bindery_core::{ArchiveFormat, ConfigError, ConverterConfig};
use clap::Parser;
use thiserror::Error;
use tracing::{info, warn};

use cli::{Cli, Commands};
use inputs::expand_inputs;
use report::{render_event, render_summary_table};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot list inputs: {0}")]
    Inputs(#[source] std::io::Error),

    #[error("cannot encode summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("batch worker stopped unexpectedly: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Convert {
            inputs,
            to,
            delete_original,
            config,
            jobs,
        } => convert(inputs, to, delete_original, config, jobs).await,
        Commands::Inspect { files, json } => inspect_files(files, json),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

async fn convert(
    inputs: Vec<PathBuf>,
    to: ArchiveFormat,
    delete_original: bool,
    config_path: Option<PathBuf>,
    jobs: Option<usize>,
) -> Result<ExitCode, CliError> {
    let mut config = match config_path {
        Some(path) => ConverterConfig::from_json_file(path)?,
        None => ConverterConfig::default(),
    };
    if let Some(jobs) = jobs {
        config.max_concurrent_jobs = jobs;
        config.validate()?;
    }

    let files = expand_inputs(&inputs).map_err(CliError::Inputs)?;
    if files.is_empty() {
        println!("No comic files found.");
        return Ok(ExitCode::SUCCESS);
    }
    info!(files = files.len(), target = %to, "Planning batch");
    let jobs = files
        .into_iter()
        .map(|file| plan_job(file, to, delete_original))
        .collect();

    let mut handle = BatchOrchestrator::new(Capabilities::system(config)).spawn(jobs);
    let token = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after the current page");
            token.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        if let Some(line) = render_event(&event) {
            println!("{line}");
        }
    }
    let result = handle.wait().await?;

    Ok(if result.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn inspect_files(files: Vec<PathBuf>, json: bool) -> Result<ExitCode, CliError> {
    let caps = Capabilities::default();
    let mut code = ExitCode::SUCCESS;
    for file in files {
        match inspect(&file, &caps) {
            Ok(summary) if json => println!("{}", serde_json::to_string(&summary)?),
            Ok(summary) => println!("{}", render_summary_table(&file.display().to_string(), &summary)),
            Err(err) => {
                eprintln!("{}: {err}", file.display());
                code = ExitCode::FAILURE;
            }
        }
    }
    Ok(code)
}
