// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Variable access.
//!
//! Every variable reference arrives already classified. The instruction
//! sequence for each access depends only on that classification:
//!
//! | Kind | Read | Write | Declare | Increment |
//! |------|------|-------|---------|-----------|
//! | parameter | `getarg` | value, `setarg` | value, `setarg`, `pop` | `getarg`, `getarg`, `one`, `add`, `setarg`, `pop` |
//! | local | `getlocal` | value, `setlocal` | value, `setlocal`, `pop` | `getlocal`, `getlocal`, `one`, `add`, `setlocal`, `pop` |
//! | global | `getgname` | `bindgname`, value, `setgname` | `bindgname`, value, `setgname`, `pop` | `getgname`, `bindgname`, `getgname`, `one`, `add`, `setgname`, `pop` |
//!
//! A declaration without an initializer stores `undefined`, except for a
//! parameter, which keeps the value it was called with. Increments leave the
//! value from before the increment on the stack.

use super::Translator;
use crate::ast::{Expression, Identifier, Variable};
use crate::error::{CompileError, Result};

impl Translator<'_> {
    /// Pushes the variable's value.
    pub(super) fn read_variable(&mut self, id: &Identifier) -> Result<()> {
        match &id.variable {
            Variable::Parameter(slot) => self.asm.getarg(*slot),
            Variable::Local(slot) => self.asm.getlocal(*slot),
            Variable::Global(name) => self.asm.getgname(name),
            Variable::Unresolved => return Err(unresolved(id)),
        }
        Ok(())
    }

    /// Stores `value` into the variable, leaving the stored value on the
    /// stack.
    pub(super) fn write_variable(&mut self, id: &Identifier, value: &Expression) -> Result<()> {
        match &id.variable {
            Variable::Parameter(slot) => {
                self.compile_expression(value)?;
                self.asm.setarg(*slot);
            }
            Variable::Local(slot) => {
                self.compile_expression(value)?;
                self.asm.setlocal(*slot);
            }
            Variable::Global(name) => {
                self.asm.bindgname(name);
                self.compile_expression(value)?;
                self.asm.setgname(name);
            }
            Variable::Unresolved => return Err(unresolved(id)),
        }
        Ok(())
    }

    /// Lowers one `var` declarator. Stack neutral.
    pub(super) fn declare_variable(
        &mut self,
        id: &Identifier,
        init: Option<&Expression>,
    ) -> Result<()> {
        match &id.variable {
            Variable::Parameter(slot) => {
                if let Some(init) = init {
                    self.compile_expression(init)?;
                    self.asm.setarg(*slot);
                    self.asm.pop();
                }
            }
            Variable::Local(slot) => {
                self.initial_value(init)?;
                self.asm.setlocal(*slot);
                self.asm.pop();
            }
            Variable::Global(name) => {
                self.asm.bindgname(name);
                self.initial_value(init)?;
                self.asm.setgname(name);
                self.asm.pop();
            }
            Variable::Unresolved => return Err(unresolved(id)),
        }
        Ok(())
    }

    /// Postfix `++` on a variable.
    pub(super) fn increment_variable(&mut self, id: &Identifier) -> Result<()> {
        match &id.variable {
            Variable::Parameter(slot) => {
                self.asm.getarg(*slot);
                self.asm.getarg(*slot);
                self.asm.one();
                self.asm.add();
                self.asm.setarg(*slot);
                self.asm.pop();
            }
            Variable::Local(slot) => {
                self.asm.getlocal(*slot);
                self.asm.getlocal(*slot);
                self.asm.one();
                self.asm.add();
                self.asm.setlocal(*slot);
                self.asm.pop();
            }
            Variable::Global(name) => {
                self.asm.getgname(name);
                self.asm.bindgname(name);
                self.asm.getgname(name);
                self.asm.one();
                self.asm.add();
                self.asm.setgname(name);
                self.asm.pop();
            }
            Variable::Unresolved => return Err(unresolved(id)),
        }
        Ok(())
    }

    fn initial_value(&mut self, init: Option<&Expression>) -> Result<()> {
        match init {
            Some(init) => self.compile_expression(init),
            None => {
                self.asm.undefined();
                Ok(())
            }
        }
    }
}

fn unresolved(id: &Identifier) -> CompileError {
    CompileError::internal(format!(
        "variable '{}' was not classified by the scope resolver",
        id.name
    ))
}
