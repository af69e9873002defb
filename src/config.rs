// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration management for jetspider.
//!
//! Settings come from `jetspider.toml` and are then overridden by command-line
//! flags:
//!
//! ```toml
//! emit = "json"
//! out_dir = "build"
//! log_level = "info"
//! jobs = 4
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::error::Result;

/// Configuration file looked up in the current directory.
pub const CONFIG_FILE: &str = "jetspider.toml";

/// What the driver writes for each compiled program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Emit {
    /// Human-readable disassembly
    #[default]
    Listing,
    /// The serialized object file
    Json,
}

impl Emit {
    /// File extension of the output, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Emit::Listing => "jsasm",
            Emit::Json => "jso.json",
        }
    }
}

/// Configuration for jetspider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output format
    pub emit: Emit,

    /// Output directory. Listings go to stdout and object files next to
    /// their input when unset.
    pub out_dir: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,

    /// Worker count. Unset means one per CPU.
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            emit: Emit::default(),
            out_dir: None,
            log_level: "warn".to_string(),
            jobs: None,
        }
    }
}

impl Config {
    /// Loads `path`, or `jetspider.toml` from the current directory when no
    /// path is given. A missing default file yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parses a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(emit) = cli.emit {
            self.emit = emit;
        }
        if let Some(out_dir) = &cli.out_dir {
            self.out_dir = Some(out_dir.clone());
        }
        if let Some(jobs) = cli.jobs {
            self.jobs = Some(jobs);
        }
        if cli.verbose {
            self.log_level = "debug".to_string();
        }
    }
}
