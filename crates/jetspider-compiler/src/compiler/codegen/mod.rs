// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from AST to bytecode.
//!
//! The [`Compiler`] lowers a resolved [`Program`] into an [`ObjectFile`] in a
//! single pass:
//!
//! 1. Every top-level function declaration is compiled into its own unit, in
//!    declaration order.
//! 2. The top-level statements are compiled into one final unit. Function
//!    declarations met here are skipped, since step 1 already compiled them.
//!
//! Each unit is compiled through a [`Translator`], which owns the
//! [`Assembler`] bound to that unit, the mode flag and the loop context stack.
//! Dropping the translator releases the unit, so a failure anywhere aborts
//! the whole object file.

mod escape;
mod expressions;
mod statements;
mod variables;

#[cfg(test)]
mod tests;

pub use escape::decode_string_literal;

use tracing::{debug, instrument};

use crate::ast::{FunctionDeclaration, Program, Scope};
use crate::compiler::assembler::{Assembler, Label};
use crate::compiler::object_file::ObjectFile;
use crate::error::{CompileError, Result};

/// Compiles programs into object files.
#[derive(Debug, Default)]
pub struct Compiler {
    object_file: ObjectFile,
}

impl Compiler {
    /// Creates a new compiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles every unit of `program` and returns the finished object file.
    ///
    /// No object file is returned if any unit fails.
    pub fn generate_object_file(mut self, program: &Program) -> Result<ObjectFile> {
        for func in program.global_functions() {
            self.compile_function(func)?;
        }
        self.compile_toplevel(program)?;
        Ok(self.object_file)
    }

    #[instrument(level = "debug", skip_all, fields(function = %func.name))]
    fn compile_function(&mut self, func: &FunctionDeclaration) -> Result<()> {
        self.with_unit(
            &func.scope,
            &func.filename,
            func.lineno,
            Mode::Function,
            |t| t.compile_statements(&func.body),
        )
    }

    #[instrument(level = "debug", skip_all, fields(filename = %program.filename))]
    fn compile_toplevel(&mut self, program: &Program) -> Result<()> {
        self.with_unit(
            &program.scope,
            &program.filename,
            program.lineno,
            Mode::TopLevel,
            |t| t.compile_statements(&program.body),
        )
    }

    /// Opens a unit, runs `body` against it, then terminates and closes it.
    fn with_unit<F>(
        &mut self,
        scope: &Scope,
        filename: &str,
        lineno: u32,
        mode: Mode,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Translator<'_>) -> Result<()>,
    {
        debug!(unit = scope.name(), filename, lineno, "open unit");
        let unit = self.object_file.new_unit(scope, filename, lineno);
        let mut translator = Translator::new(Assembler::new(unit), mode);
        body(&mut translator)?;
        translator.finish()?;

        if let Some(unit) = self.object_file.units().last() {
            debug!(
                unit = scope.name(),
                instructions = unit.instructions().len(),
                bytes = unit.code().len(),
                max_stack = unit.max_stack_depth(),
                "close unit"
            );
        }
        Ok(())
    }
}

/// Whether statements belong to a function body or to the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Expression statement values are kept as the completion value, and
    /// function declarations are skipped
    TopLevel,
    /// Expression statement values are dropped
    Function,
}

/// Jump targets of one enclosing `while` loop.
#[derive(Debug, Clone, Copy)]
struct LoopContext {
    /// `continue` target
    start: Label,
    /// `break` target
    end: Label,
}

/// Translation state for the one open unit.
struct Translator<'u> {
    asm: Assembler<'u>,
    mode: Mode,
    loops: Vec<LoopContext>,
}

impl<'u> Translator<'u> {
    fn new(asm: Assembler<'u>, mode: Mode) -> Self {
        Self {
            asm,
            mode,
            loops: Vec::new(),
        }
    }

    /// Emits the terminator and seals the unit.
    fn finish(mut self) -> Result<()> {
        if !self.loops.is_empty() {
            return Err(CompileError::internal(format!(
                "{} loop contexts left open",
                self.loops.len()
            )));
        }
        self.asm.stop();
        self.asm.finish()
    }

    fn check_depth(&self, expected: u32, construct: &str) -> Result<()> {
        let depth = self.asm.depth();
        if depth != expected {
            return Err(CompileError::internal(format!(
                "{} left stack depth {}, expected {}",
                construct, depth, expected
            )));
        }
        Ok(())
    }
}
