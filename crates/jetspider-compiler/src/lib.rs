// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # jetspider-compiler
//!
//! An ahead-of-time code generator that lowers a JavaScript AST into
//! SpiderMonkey-style stack bytecode.
//!
//! ## Overview
//!
//! The front end (parsing and scope resolution) is external: this crate
//! consumes a [`Program`] whose variable references are already classified
//! as parameter, local or global. It provides:
//! - The typed AST the front end hands over (serde-serializable)
//! - A single-pass code generator with strict operand-stack discipline
//! - An assembler with two-phase labels and jump backpatching
//! - Object files holding one code unit per function plus the top level
//!
//! ## Quick Start
//!
//! ```rust
//! use jetspider_compiler::ast::{Expression, Identifier, Program, Statement};
//!
//! // var x = 1;
//! let program = Program::new(
//!     "example.js",
//!     vec![Statement::var(Identifier::global("x"), Some(Expression::number(1.0)))],
//! );
//! let object_file = jetspider_compiler::compile(&program)?;
//! let toplevel = object_file.toplevel().unwrap();
//! assert_eq!(toplevel.instructions().len(), 5);
//! # Ok::<(), jetspider_compiler::CompileError>(())
//! ```

#![warn(clippy::all)]

pub mod ast;
pub mod compiler;
pub mod error;

pub use ast::Program;
pub use compiler::{CodeUnit, Compiler, ObjectFile};
pub use error::{CompileError, ErrorCategory, Result};

/// Compiles a program into an object file.
///
/// Shorthand for `Compiler::new().generate_object_file(program)`.
pub fn compile(program: &Program) -> Result<ObjectFile> {
    Compiler::new().generate_object_file(program)
}
