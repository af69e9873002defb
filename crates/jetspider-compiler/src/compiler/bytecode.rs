// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.
//!
//! Opcodes mirror SpiderMonkey's stack-machine instruction set. Each encodes
//! as a one-byte opcode followed by a big-endian operand whose width is fixed
//! by the opcode.

use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{CompileError, Result};

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        1 + self.opcode.operand_kind().width()
    }

    /// Values popped from and pushed onto the operand stack.
    pub fn stack_effect(&self) -> (u32, u32) {
        let argc = match self.operand {
            Some(Operand::ArgCount(n)) => u32::from(n),
            _ => 0,
        };
        match self.opcode {
            // callee, this, arguments -> result
            OpCode::Call | OpCode::New => (argc + 2, 1),
            op => op.fixed_stack_effect(),
        }
    }

    /// Appends the encoded instruction to `out`.
    ///
    /// Fails if an immediate does not fit the opcode's operand width.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.opcode as u8);
        match self.operand {
            None => {}
            Some(Operand::Slot(slot)) => out.extend_from_slice(&slot.to_be_bytes()),
            Some(Operand::Atom(index)) => out.extend_from_slice(&index.to_be_bytes()),
            Some(Operand::ArgCount(n)) => out.extend_from_slice(&n.to_be_bytes()),
            Some(Operand::Jump(offset)) => out.extend_from_slice(&offset.to_be_bytes()),
            Some(Operand::Immediate(value)) => {
                let kind = self.opcode.operand_kind();
                if !kind.holds_immediate(value) {
                    return Err(CompileError::internal(format!(
                        "immediate {} does not fit {}",
                        value, self.opcode
                    )));
                }
                // Range checked above, so the low bytes are the whole value
                match kind {
                    OperandKind::Int8 => out.push(value as u8),
                    _ => out.extend_from_slice(&(value as u32).to_be_bytes()),
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            None => write!(f, "{}", self.opcode.name()),
            Some(Operand::Jump(offset)) => write!(f, "{} {:+}", self.opcode.name(), offset),
            Some(Operand::Slot(n)) => write!(f, "{} {}", self.opcode.name(), n),
            Some(Operand::Atom(n)) => write!(f, "{} atom#{}", self.opcode.name(), n),
            Some(Operand::ArgCount(n)) => write!(f, "{} {}", self.opcode.name(), n),
            Some(Operand::Immediate(n)) => write!(f, "{} {}", self.opcode.name(), n),
        }
    }
}

/// Instruction operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operand {
    /// Parameter or local slot index
    Slot(u16),
    /// Index into the unit's atom table (names and strings)
    Atom(u32),
    /// Integer immediate, encoded at the opcode's width
    Immediate(i64),
    /// Number of arguments, or initial array length
    ArgCount(u16),
    /// Jump offset in bytes, relative to the jump instruction
    Jump(i32),
}

/// Operand layout of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand
    None,
    /// 16-bit slot
    Slot,
    /// 32-bit atom index
    Atom,
    /// 8-bit immediate
    Int8,
    /// 32-bit immediate
    Int32,
    /// 16-bit count
    Count,
    /// 32-bit signed jump offset
    Jump,
}

impl OperandKind {
    /// Encoded operand width in bytes.
    pub fn width(self) -> usize {
        match self {
            OperandKind::None => 0,
            OperandKind::Int8 => 1,
            OperandKind::Slot | OperandKind::Count => 2,
            OperandKind::Atom | OperandKind::Int32 | OperandKind::Jump => 4,
        }
    }

    /// Values an immediate of this kind can carry: negative values in two's
    /// complement, non-negative ones up to the unsigned maximum.
    pub fn immediate_range(self) -> Option<RangeInclusive<i64>> {
        match self {
            OperandKind::Int8 => Some(i64::from(i8::MIN)..=i64::from(u8::MAX)),
            OperandKind::Int32 => Some(i64::from(i32::MIN)..=i64::from(u32::MAX)),
            _ => None,
        }
    }

    /// Whether `value` encodes losslessly as this kind.
    pub fn holds_immediate(self, value: i64) -> bool {
        self.immediate_range()
            .is_some_and(|range| range.contains(&value))
    }
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum OpCode {
    // Stack operations
    /// Pop the top value
    Pop,
    /// Pop the top value and record it as the script's completion value
    PopV,
    /// Duplicate the top value
    Dup,
    /// Duplicate the top two values
    Dup2,
    /// Swap top two values on stack
    Swap,

    // Constants
    /// Push undefined
    Undefined,
    /// Push the number 1
    One,
    /// Push an 8-bit integer
    Int8,
    /// Push a 32-bit integer
    Int32,
    /// Push a string atom
    String,
    /// Push null
    Null,
    /// Push true
    True,
    /// Push false
    False,
    /// Push this
    This,

    // Variables
    /// Push an argument slot
    GetArg,
    /// Store the top value into an argument slot, leaving it on the stack
    SetArg,
    /// Push a local slot
    GetLocal,
    /// Store the top value into a local slot, leaving it on the stack
    SetLocal,
    /// Push a global by name
    GetGName,
    /// Store into a bound global: pops value and global object, pushes value
    SetGName,
    /// Push the global object a name is bound on
    BindGName,

    // Arrays and properties
    /// Push a new array
    NewArray,
    /// Append the top value to the array beneath it
    ArrayPush,
    /// Replace an object with one of its properties
    GetProp,
    /// Pops value and object, stores the property, pushes value
    SetProp,
    /// Replace an object with (method, object)
    CallProp,
    /// Push (global function, undefined this)
    CallGName,

    // Calls
    /// Call a function
    Call,
    /// Push the construction marker for new
    Push,
    /// Construct an object
    New,
    /// Return from function
    Return,

    // Arithmetic operations
    /// Add top two values
    Add,
    /// Subtract
    Sub,
    /// Multiply
    Mul,
    /// Divide
    Div,
    /// Modulo
    Mod,

    // Comparison operations
    /// Equal (==)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Strict equal (===)
    StrictEq,
    /// Strict not equal (!==)
    StrictNe,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,

    // Logical operations
    /// Logical AND
    And,
    /// Logical OR
    Or,

    // Control flow
    /// Unconditional jump
    Goto,
    /// Pop and jump if false
    IfEq,
    /// End of unit
    Stop,
}

impl OpCode {
    /// SpiderMonkey mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Pop => "pop",
            OpCode::PopV => "popv",
            OpCode::Dup => "dup",
            OpCode::Dup2 => "dup2",
            OpCode::Swap => "swap",
            OpCode::Undefined => "undefined",
            OpCode::One => "one",
            OpCode::Int8 => "int8",
            OpCode::Int32 => "int32",
            OpCode::String => "string",
            OpCode::Null => "null",
            OpCode::True => "true",
            OpCode::False => "false",
            OpCode::This => "this",
            OpCode::GetArg => "getarg",
            OpCode::SetArg => "setarg",
            OpCode::GetLocal => "getlocal",
            OpCode::SetLocal => "setlocal",
            OpCode::GetGName => "getgname",
            OpCode::SetGName => "setgname",
            OpCode::BindGName => "bindgname",
            OpCode::NewArray => "newarray",
            OpCode::ArrayPush => "arraypush",
            OpCode::GetProp => "getprop",
            OpCode::SetProp => "setprop",
            OpCode::CallProp => "callprop",
            OpCode::CallGName => "callgname",
            OpCode::Call => "call",
            OpCode::Push => "push",
            OpCode::New => "new",
            OpCode::Return => "return",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Mod => "mod",
            OpCode::Eq => "eq",
            OpCode::Ne => "ne",
            OpCode::StrictEq => "stricteq",
            OpCode::StrictNe => "strictne",
            OpCode::Lt => "lt",
            OpCode::Le => "le",
            OpCode::Gt => "gt",
            OpCode::Ge => "ge",
            OpCode::And => "and",
            OpCode::Or => "or",
            OpCode::Goto => "goto",
            OpCode::IfEq => "ifeq",
            OpCode::Stop => "stop",
        }
    }

    /// Operand layout.
    pub fn operand_kind(self) -> OperandKind {
        match self {
            OpCode::GetArg | OpCode::SetArg | OpCode::GetLocal | OpCode::SetLocal => {
                OperandKind::Slot
            }
            OpCode::GetGName
            | OpCode::SetGName
            | OpCode::BindGName
            | OpCode::String
            | OpCode::GetProp
            | OpCode::SetProp
            | OpCode::CallProp
            | OpCode::CallGName => OperandKind::Atom,
            OpCode::Int8 => OperandKind::Int8,
            OpCode::Int32 => OperandKind::Int32,
            OpCode::NewArray | OpCode::Call | OpCode::New => OperandKind::Count,
            OpCode::Goto | OpCode::IfEq => OperandKind::Jump,
            _ => OperandKind::None,
        }
    }

    /// Stack effect for opcodes whose effect does not depend on the operand.
    fn fixed_stack_effect(self) -> (u32, u32) {
        match self {
            OpCode::Pop | OpCode::PopV | OpCode::IfEq | OpCode::Return => (1, 0),
            OpCode::Dup => (1, 2),
            OpCode::Dup2 => (2, 4),
            OpCode::Swap => (2, 2),
            OpCode::Undefined
            | OpCode::One
            | OpCode::Int8
            | OpCode::Int32
            | OpCode::String
            | OpCode::Null
            | OpCode::True
            | OpCode::False
            | OpCode::This
            | OpCode::GetArg
            | OpCode::GetLocal
            | OpCode::GetGName
            | OpCode::BindGName
            | OpCode::NewArray
            | OpCode::Push => (0, 1),
            OpCode::SetArg | OpCode::SetLocal | OpCode::GetProp => (1, 1),
            OpCode::CallProp => (1, 2),
            OpCode::CallGName => (0, 2),
            OpCode::SetGName | OpCode::SetProp | OpCode::ArrayPush => (2, 1),
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Eq
            | OpCode::Ne
            | OpCode::StrictEq
            | OpCode::StrictNe
            | OpCode::Lt
            | OpCode::Le
            | OpCode::Gt
            | OpCode::Ge
            | OpCode::And
            | OpCode::Or => (2, 1),
            OpCode::Goto | OpCode::Stop => (0, 0),
            // Operand-dependent; handled by Instruction::stack_effect
            OpCode::Call | OpCode::New => (2, 1),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
