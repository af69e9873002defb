// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object files and the code units they own.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;

use crate::ast::{Scope, ScopeKind};
use crate::compiler::bytecode::{Instruction, Operand};
use crate::error::Result;

/// The output of a compilation run: one code unit per function, plus one for
/// the top level.
#[derive(Debug, Default, Serialize)]
pub struct ObjectFile {
    units: Vec<CodeUnit>,
}

impl ObjectFile {
    /// Creates an empty object file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new unit for the given scope and source location.
    ///
    /// The returned borrow is the only way to write the unit, so at most one
    /// unit can be open at a time.
    pub fn new_unit(&mut self, scope: &Scope, filename: &str, lineno: u32) -> &mut CodeUnit {
        self.units.push(CodeUnit::new(scope.clone(), filename.to_string(), lineno));
        let index = self.units.len() - 1;
        &mut self.units[index]
    }

    /// All units, in compilation order.
    pub fn units(&self) -> &[CodeUnit] {
        &self.units
    }

    /// Looks up the unit compiled for a function.
    pub fn function(&self, name: &str) -> Option<&CodeUnit> {
        self.units
            .iter()
            .find(|unit| matches!(&unit.scope.kind, ScopeKind::Function(n) if n == name))
    }

    /// The top-level unit.
    pub fn toplevel(&self) -> Option<&CodeUnit> {
        self.units
            .iter()
            .rev()
            .find(|unit| unit.scope.kind == ScopeKind::Global)
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit has been created.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl fmt::Display for ObjectFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, unit) in self.units.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", unit)?;
        }
        Ok(())
    }
}

/// One independently addressable instruction stream.
#[derive(Debug, Serialize)]
pub struct CodeUnit {
    scope: Scope,
    filename: String,
    lineno: u32,
    instructions: Vec<Instruction>,
    #[serde(skip)]
    offsets: Vec<usize>,
    atoms: Vec<String>,
    #[serde(skip)]
    atom_index: FxHashMap<String, u32>,
    code: Vec<u8>,
    max_stack_depth: u32,
    #[serde(skip)]
    closed: bool,
}

impl CodeUnit {
    fn new(scope: Scope, filename: String, lineno: u32) -> Self {
        Self {
            scope,
            filename,
            lineno,
            instructions: Vec::new(),
            offsets: Vec::new(),
            atoms: Vec::new(),
            atom_index: FxHashMap::default(),
            code: Vec::new(),
            max_stack_depth: 0,
            closed: false,
        }
    }

    /// The scope this unit was compiled for.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Source file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Source line.
    pub fn lineno(&self) -> u32 {
        self.lineno
    }

    /// Emitted instructions, in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Byte offset of the instruction at `index`.
    pub fn offset_of(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }

    /// The atom table.
    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    /// Looks up an atom by index.
    pub fn atom(&self, index: u32) -> Option<&str> {
        self.atoms.get(index as usize).map(String::as_str)
    }

    /// Encoded byte code. Empty until the unit is closed.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Deepest operand stack reached by the unit's code.
    pub fn max_stack_depth(&self) -> u32 {
        self.max_stack_depth
    }

    /// Whether the unit has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Length of the instruction stream in bytes.
    pub fn code_length(&self) -> usize {
        match (self.offsets.last(), self.instructions.last()) {
            (Some(offset), Some(last)) => offset + last.encoded_len(),
            _ => 0,
        }
    }

    /// Appends an instruction and returns its index.
    pub(crate) fn push(&mut self, instruction: Instruction) -> usize {
        let offset = self.code_length();
        self.offsets.push(offset);
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Rewrites the jump operand of the instruction at `index`.
    pub(crate) fn patch_jump(&mut self, index: usize, delta: i32) {
        if let Some(instruction) = self.instructions.get_mut(index) {
            instruction.operand = Some(Operand::Jump(delta));
        }
    }

    /// Interns a name or string and returns its atom index.
    pub(crate) fn intern(&mut self, atom: &str) -> u32 {
        if let Some(&index) = self.atom_index.get(atom) {
            return index;
        }
        let index = self.atoms.len() as u32;
        self.atoms.push(atom.to_string());
        self.atom_index.insert(atom.to_string(), index);
        index
    }

    /// Encodes the instruction stream and seals the unit.
    pub(crate) fn close(&mut self, max_stack_depth: u32) -> Result<()> {
        let mut code = Vec::with_capacity(self.code_length());
        for instruction in &self.instructions {
            instruction.encode(&mut code)?;
        }
        self.code = code;
        self.max_stack_depth = max_stack_depth;
        self.closed = true;
        Ok(())
    }
}

impl fmt::Display for CodeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "; {} ({}:{}) nargs={} nlocals={} maxstack={}",
            self.scope.name(),
            self.filename,
            self.lineno,
            self.scope.nargs(),
            self.scope.nlocals(),
            self.max_stack_depth
        )?;
        for (instruction, offset) in self.instructions.iter().zip(&self.offsets) {
            write!(f, "{:05}: {}", offset, instruction.opcode)?;
            match instruction.operand {
                None => {}
                Some(Operand::Jump(delta)) => {
                    let target = *offset as i64 + i64::from(delta);
                    write!(f, " {:05} ({:+})", target, delta)?;
                }
                Some(Operand::Atom(index)) => {
                    write!(f, " {:?}", self.atom(index).unwrap_or("<bad atom>"))?;
                }
                Some(Operand::Slot(n)) => write!(f, " {}", n)?,
                Some(Operand::ArgCount(n)) => write!(f, " {}", n)?,
                Some(Operand::Immediate(n)) => write!(f, " {}", n)?,
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
