// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! jetspider - ahead-of-time bytecode compiler driver
//!
//! This is the main entry point for the jetspider CLI.
//!
//! ## Features
//!
//! - Compiles front-end ASTs (JSON) into listings or object files
//! - Parallel compilation of independent inputs
//! - `jetspider.toml` configuration with command-line overrides

mod cli;
mod config;
mod driver;
mod error;

use clap::Parser;
use owo_colors::OwoColorize;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;
use error::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            config.apply_cli(&cli);
            config
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log_level);

    let results = match driver::compile_all(&cli.inputs, &config) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut failed = 0;
    for (input, result) in cli.inputs.iter().zip(results) {
        if let Err(e) = result.and_then(|artifact| driver::write_artifact(&artifact)) {
            report(input, &e);
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!(
            "{}: {} of {} inputs failed",
            "Error".red().bold(),
            failed,
            cli.inputs.len()
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Logs to stderr, filtered by `RUST_LOG` or else by the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn report(input: &Path, e: &CliError) {
    eprintln!(
        "{}: {}: {}",
        "Error".red().bold(),
        input.display().cyan(),
        e
    );
    if e.is_internal() {
        eprintln!(
            "  {}: the AST breaks a guarantee the front end is expected to provide",
            "note".yellow().bold()
        );
    }
}
