// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiling input files and writing their outputs.

use jetspider_compiler::Program;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{Config, Emit};
use crate::error::{CliError, Result};

/// The rendered output of one successfully compiled input.
#[derive(Debug)]
pub struct Artifact {
    /// Rendered listing or object file
    pub text: String,
    /// Where to write it; `None` means stdout
    pub destination: Option<PathBuf>,
}

/// Compiles every input on a pool of `config.jobs` workers.
///
/// Results come back in input order. Inputs that would write the same output
/// file all fail with [`CliError::OutputClash`] and are not compiled.
pub fn compile_all(inputs: &[PathBuf], config: &Config) -> Result<Vec<Result<Artifact>>> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = config.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder.build()?;
    debug!(workers = pool.current_num_threads(), inputs = inputs.len(), "compiling");

    let clashes = clashing_destinations(inputs, config);
    Ok(pool.install(|| {
        inputs
            .par_iter()
            .map(|input| match destination(input, config) {
                Some(path) if clashes.contains(&path) => Err(CliError::OutputClash(path)),
                _ => compile_input(input, config),
            })
            .collect()
    }))
}

/// Output paths claimed by more than one input.
fn clashing_destinations(inputs: &[PathBuf], config: &Config) -> HashSet<PathBuf> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .filter_map(|input| destination(input, config))
        .filter(|path| !seen.insert(path.clone()))
        .collect()
}

/// Reads, compiles and renders one program file.
pub fn compile_input(input: &Path, config: &Config) -> Result<Artifact> {
    let source = fs::read_to_string(input)?;
    let program: Program = serde_json::from_str(&source)?;
    let object_file = jetspider_compiler::compile(&program)?;
    info!(input = %input.display(), units = object_file.len(), "compiled");

    let text = match config.emit {
        Emit::Listing => object_file.to_string(),
        Emit::Json => {
            let mut json = serde_json::to_string_pretty(&object_file)?;
            json.push('\n');
            json
        }
    };

    Ok(Artifact {
        text,
        destination: destination(input, config),
    })
}

/// Writes an artifact to its destination.
pub fn write_artifact(artifact: &Artifact) -> Result<()> {
    match &artifact.destination {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &artifact.text)?;
            debug!(output = %path.display(), "wrote");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(artifact.text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Output path for `input`: `<stem>.<ext>` in the output directory, or next
/// to the input for object files when no directory is configured.
fn destination(input: &Path, config: &Config) -> Option<PathBuf> {
    let stem = input.file_stem()?.to_string_lossy();
    let file_name = format!("{}.{}", stem, config.emit.extension());
    match (&config.out_dir, config.emit) {
        (Some(dir), _) => Some(dir.join(file_name)),
        (None, Emit::Json) => Some(input.with_file_name(file_name)),
        (None, Emit::Listing) => None,
    }
}
