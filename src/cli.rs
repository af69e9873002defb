// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI argument parsing for jetspider.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Emit;

/// jetspider - compile resolved JavaScript ASTs into SpiderMonkey-style bytecode
#[derive(Parser, Debug)]
#[command(name = "jetspider")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Program files, each a JSON-serialized AST from the front end
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub emit: Option<Emit>,

    /// Directory to write output files into
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Number of inputs compiled in parallel (default: CPU count)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Configuration file (default: ./jetspider.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
