// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode compiler for JavaScript.
//!
//! Lowers a resolved AST into an object file of SpiderMonkey-style bytecode
//! units.
//!
//! # Module Structure
//!
//! - `bytecode`: Opcodes, operands and instruction encoding
//! - `assembler`: Instruction emission, labels and stack depth accounting
//! - `object_file`: Code units and the object file that owns them
//! - `codegen`: Code generation from AST
//!   - `codegen::escape`: String literal decoding

pub mod assembler;
pub mod bytecode;
pub mod codegen;
pub mod object_file;

pub use assembler::{Assembler, Label};
pub use bytecode::{Instruction, OpCode, Operand, OperandKind};
pub use codegen::Compiler;
pub use object_file::{CodeUnit, ObjectFile};
