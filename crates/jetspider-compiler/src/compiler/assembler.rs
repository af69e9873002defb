// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Instruction emission for one open code unit.
//!
//! The assembler owns the low-level details the code generator should not
//! care about: operand encoding, atom interning, jump offsets and the
//! operand-stack depth the emitted code needs.
//!
//! ## Labels
//!
//! A [`Label`] is either resolved (bound to a byte offset) or unresolved.
//! [`Assembler::lazy_location`] allocates an unresolved label for a forward
//! jump; jumps to it are emitted with a placeholder offset and backpatched
//! when [`Assembler::fix_location`] binds it. [`Assembler::location`] binds a
//! label to the current offset immediately, for backward jumps.
//!
//! ```text
//! start:                 ; location()
//!   [condition]
//!   ifeq end             ; end = lazy_location(), patched later
//!   [body]
//!   goto start           ; offset known, written directly
//! end:                   ; fix_location(end)
//! ```
//!
//! Fixing a label twice, reading an unresolved label, or closing the unit with
//! a label still unresolved are all internal errors.

use tracing::trace;

use crate::compiler::bytecode::{Instruction, OpCode, Operand};
use crate::compiler::object_file::CodeUnit;
use crate::error::{CompileError, Result};

/// A jump target within the unit being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug)]
enum LabelState {
    Unresolved {
        /// Jump instructions waiting for the offset
        pending: Vec<usize>,
        /// Stack depth at the first jump
        depth: Option<u32>,
    },
    Resolved {
        offset: usize,
        depth: u32,
    },
}

/// Writes instructions into one open [`CodeUnit`].
pub struct Assembler<'u> {
    unit: &'u mut CodeUnit,
    labels: Vec<LabelState>,
    depth: u32,
    max_depth: u32,
    violation: Option<String>,
    stopped: bool,
}

impl<'u> Assembler<'u> {
    /// Binds an assembler to an open unit.
    pub fn new(unit: &'u mut CodeUnit) -> Self {
        Self {
            unit,
            labels: Vec::new(),
            depth: 0,
            max_depth: 0,
            violation: None,
            stopped: false,
        }
    }

    /// Current operand stack depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Deepest operand stack reached so far.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Current byte offset.
    pub fn current_offset(&self) -> usize {
        self.unit.code_length()
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Appends an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let (pops, pushes) = instruction.stack_effect();
        if pops > self.depth {
            self.record_violation(format!(
                "stack underflow at offset {}: {} needs {} values, {} available",
                self.current_offset(),
                instruction.opcode,
                pops,
                self.depth
            ));
            self.depth = 0;
        } else {
            self.depth -= pops;
        }
        self.depth += pushes;
        self.max_depth = self.max_depth.max(self.depth);

        trace!(
            offset = self.current_offset(),
            instruction = %instruction,
            depth = self.depth,
            "emit"
        );
        self.unit.push(instruction)
    }

    fn op(&mut self, opcode: OpCode) {
        self.emit(Instruction::simple(opcode));
    }

    fn op_with(&mut self, opcode: OpCode, operand: Operand) {
        self.emit(Instruction::with_operand(opcode, operand));
    }

    fn op_atom(&mut self, opcode: OpCode, atom: &str) {
        let index = self.unit.intern(atom);
        self.op_with(opcode, Operand::Atom(index));
    }

    /// Emits an operand-less opcode such as a binary operator.
    pub fn simple(&mut self, opcode: OpCode) {
        self.op(opcode);
    }

    pub fn pop(&mut self) {
        self.op(OpCode::Pop);
    }

    /// Pops the top value, recording it as the unit's completion value.
    pub fn popv(&mut self) {
        self.op(OpCode::PopV);
    }

    pub fn dup(&mut self) {
        self.op(OpCode::Dup);
    }

    pub fn dup2(&mut self) {
        self.op(OpCode::Dup2);
    }

    pub fn swap(&mut self) {
        self.op(OpCode::Swap);
    }

    pub fn undefined(&mut self) {
        self.op(OpCode::Undefined);
    }

    pub fn one(&mut self) {
        self.op(OpCode::One);
    }

    pub fn int8(&mut self, value: i64) -> Result<()> {
        self.immediate(OpCode::Int8, value)
    }

    pub fn int32(&mut self, value: i64) -> Result<()> {
        self.immediate(OpCode::Int32, value)
    }

    fn immediate(&mut self, opcode: OpCode, value: i64) -> Result<()> {
        if !opcode.operand_kind().holds_immediate(value) {
            return Err(CompileError::internal(format!(
                "immediate {} does not fit {}",
                value, opcode
            )));
        }
        self.op_with(opcode, Operand::Immediate(value));
        Ok(())
    }

    /// Pushes a decoded string value.
    pub fn string(&mut self, value: &str) {
        self.op_atom(OpCode::String, value);
    }

    pub fn null(&mut self) {
        self.op(OpCode::Null);
    }

    pub fn push_true(&mut self) {
        self.op(OpCode::True);
    }

    pub fn push_false(&mut self) {
        self.op(OpCode::False);
    }

    pub fn this(&mut self) {
        self.op(OpCode::This);
    }

    pub fn add(&mut self) {
        self.op(OpCode::Add);
    }

    pub fn getarg(&mut self, slot: u16) {
        self.op_with(OpCode::GetArg, Operand::Slot(slot));
    }

    pub fn setarg(&mut self, slot: u16) {
        self.op_with(OpCode::SetArg, Operand::Slot(slot));
    }

    pub fn getlocal(&mut self, slot: u16) {
        self.op_with(OpCode::GetLocal, Operand::Slot(slot));
    }

    pub fn setlocal(&mut self, slot: u16) {
        self.op_with(OpCode::SetLocal, Operand::Slot(slot));
    }

    pub fn getgname(&mut self, name: &str) {
        self.op_atom(OpCode::GetGName, name);
    }

    pub fn setgname(&mut self, name: &str) {
        self.op_atom(OpCode::SetGName, name);
    }

    /// Binds `name` on the global object ahead of a `setgname`.
    pub fn bindgname(&mut self, name: &str) {
        self.op_atom(OpCode::BindGName, name);
    }

    pub fn newarray(&mut self, length: u16) {
        self.op_with(OpCode::NewArray, Operand::ArgCount(length));
    }

    /// Appends one element to the array beneath it.
    pub fn arraypush(&mut self) {
        self.op(OpCode::ArrayPush);
    }

    pub fn getprop(&mut self, name: &str) {
        self.op_atom(OpCode::GetProp, name);
    }

    pub fn setprop(&mut self, name: &str) {
        self.op_atom(OpCode::SetProp, name);
    }

    pub fn callprop(&mut self, name: &str) {
        self.op_atom(OpCode::CallProp, name);
    }

    pub fn callgname(&mut self, name: &str) {
        self.op_atom(OpCode::CallGName, name);
    }

    pub fn call(&mut self, argc: u16) {
        self.op_with(OpCode::Call, Operand::ArgCount(argc));
    }

    /// Pushes the construction marker that `new` expects under its arguments.
    pub fn push_marker(&mut self) {
        self.op(OpCode::Push);
    }

    pub fn construct(&mut self, argc: u16) {
        self.op_with(OpCode::New, Operand::ArgCount(argc));
    }

    pub fn ret(&mut self) {
        self.op(OpCode::Return);
    }

    /// Emits the unit terminator.
    pub fn stop(&mut self) {
        self.op(OpCode::Stop);
        self.stopped = true;
    }

    // ========================================================================
    // Labels and jumps
    // ========================================================================

    /// Allocates an unresolved label for a forward jump.
    pub fn lazy_location(&mut self) -> Label {
        self.labels.push(LabelState::Unresolved {
            pending: Vec::new(),
            depth: None,
        });
        Label(self.labels.len() - 1)
    }

    /// Allocates a label bound to the current offset.
    pub fn location(&mut self) -> Label {
        self.labels.push(LabelState::Resolved {
            offset: self.current_offset(),
            depth: self.depth,
        });
        Label(self.labels.len() - 1)
    }

    /// Binds an unresolved label to the current offset and patches every jump
    /// already emitted to it.
    pub fn fix_location(&mut self, label: Label) -> Result<()> {
        let offset = self.current_offset();
        let state = self
            .labels
            .get_mut(label.0)
            .ok_or_else(|| CompileError::internal(format!("unknown label {}", label.0)))?;

        let (pending, depth) = match state {
            LabelState::Resolved { offset: at, .. } => {
                return Err(CompileError::internal(format!(
                    "label {} fixed twice (already at offset {})",
                    label.0, at
                )));
            }
            LabelState::Unresolved { pending, depth } => (std::mem::take(pending), *depth),
        };

        // Code after an unconditional jump is only reachable through this
        // label, so the depth recorded at the jumps is authoritative.
        if let Some(depth) = depth {
            self.depth = depth;
        }
        *state = LabelState::Resolved {
            offset,
            depth: self.depth,
        };

        for index in pending {
            let delta = self.jump_delta(index, offset)?;
            self.unit.patch_jump(index, delta);
        }
        trace!(label = label.0, offset, "fix label");
        Ok(())
    }

    /// Returns a resolved label's offset.
    pub fn offset(&self, label: Label) -> Result<usize> {
        match self.labels.get(label.0) {
            Some(LabelState::Resolved { offset, .. }) => Ok(*offset),
            Some(LabelState::Unresolved { .. }) => Err(CompileError::internal(format!(
                "label {} read before being fixed",
                label.0
            ))),
            None => Err(CompileError::internal(format!("unknown label {}", label.0))),
        }
    }

    /// Emits an unconditional jump.
    pub fn goto(&mut self, label: Label) -> Result<()> {
        self.jump(OpCode::Goto, label)
    }

    /// Pops the top value and jumps if it is false.
    pub fn ifeq(&mut self, label: Label) -> Result<()> {
        self.jump(OpCode::IfEq, label)
    }

    fn jump(&mut self, opcode: OpCode, label: Label) -> Result<()> {
        let index = self.emit(Instruction::with_operand(opcode, Operand::Jump(0)));
        let depth = self.depth;

        let resolved = match self.labels.get(label.0) {
            Some(LabelState::Resolved { offset, depth }) => Some((*offset, *depth)),
            Some(LabelState::Unresolved { .. }) => None,
            None => return Err(CompileError::internal(format!("unknown label {}", label.0))),
        };

        let expected = match resolved {
            Some((target, expected)) => {
                let delta = self.jump_delta(index, target)?;
                self.unit.patch_jump(index, delta);
                expected
            }
            None => match &mut self.labels[label.0] {
                LabelState::Unresolved { pending, depth: at } => {
                    pending.push(index);
                    *at.get_or_insert(depth)
                }
                LabelState::Resolved { depth, .. } => *depth,
            },
        };

        if expected != depth {
            self.record_violation(format!(
                "inconsistent stack depth at label {}: {} vs {}",
                label.0, expected, depth
            ));
        }
        Ok(())
    }

    fn jump_delta(&self, index: usize, target: usize) -> Result<i32> {
        let from = self
            .unit
            .offset_of(index)
            .ok_or_else(|| CompileError::internal(format!("no instruction at index {}", index)))?;
        i32::try_from(target as i64 - from as i64)
            .map_err(|_| CompileError::internal("jump offset out of range"))
    }

    fn record_violation(&mut self, message: String) {
        if self.violation.is_none() {
            self.violation = Some(message);
        }
    }

    // ========================================================================
    // Closing
    // ========================================================================

    /// Validates the unit and seals it.
    ///
    /// Fails if the terminator was never emitted, a label was never fixed, or
    /// the emitted code breaks operand-stack discipline.
    pub fn finish(self) -> Result<()> {
        if let Some(violation) = self.violation {
            return Err(CompileError::Internal(violation));
        }
        if !self.stopped {
            return Err(CompileError::internal("unit closed without a terminator"));
        }
        if let Some(index) = self
            .labels
            .iter()
            .position(|state| matches!(state, LabelState::Unresolved { .. }))
        {
            return Err(CompileError::internal(format!(
                "label {} never fixed",
                index
            )));
        }
        if self.depth != 0 {
            return Err(CompileError::internal(format!(
                "{} value(s) left on the stack at end of unit",
                self.depth
            )));
        }
        self.unit.close(self.max_depth)
    }
}
