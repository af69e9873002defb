// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the jetspider driver.

use jetspider_compiler::CompileError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Everything that can stop one input (or the whole run) from completing.
#[derive(Error, Debug)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Program JSON could not be read, or the object file could not be written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// jetspider.toml could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The code generator rejected the program
    #[error("{0}")]
    Compile(#[from] CompileError),

    /// Several inputs would write the same output file
    #[error("output {} would be written by more than one input", .0.display())]
    OutputClash(PathBuf),

    /// The worker pool could not be started
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl CliError {
    /// Whether this error points at a front-end or compiler defect rather
    /// than at the input program.
    pub fn is_internal(&self) -> bool {
        matches!(self, CliError::Compile(err) if err.is_fatal())
    }
}
