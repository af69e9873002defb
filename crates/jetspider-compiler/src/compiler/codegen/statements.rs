// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement compilation.
//!
//! Statements are stack neutral: the operand stack depth after a statement is
//! the depth before it.
//!
//! | Statement | Instructions | Notes |
//! |-----------|--------------|-------|
//! | expression | expr, `popv` / `pop` | `popv` at top level keeps the completion value |
//! | block | children in order | |
//! | `var` | one declaration per declarator | see `variables` |
//! | `while` | `ifeq`, `goto` (back) | pushes a loop context |
//! | `break` / `continue` | `goto` | innermost loop only |
//! | `return` | expr or `undefined`, `return` | function bodies only |
//! | function declaration | nothing | compiled before the top level |
//! | empty | nothing | |
//!
//! `if`, `do`-`while`, `for`, `for`-`in`, `switch`, labels, `with`, `try`,
//! `throw` and `debugger` are not lowered and fail compilation.
//!
//! ## While Loop
//!
//! ```text
//! while (test) { body }
//!
//! start:
//!   [test]
//!   ifeq end
//!   [body]          ; break -> goto end, continue -> goto start
//!   goto start
//! end:
//! ```

use super::{LoopContext, Mode, Translator};
use crate::ast::*;
use crate::error::{CompileError, Result};
use tracing::trace;

impl Translator<'_> {
    /// Compiles a statement sequence in order.
    pub(super) fn compile_statements(&mut self, statements: &[Statement]) -> Result<()> {
        for stmt in statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    /// Compiles one statement. Stack neutral.
    pub(super) fn compile_statement(&mut self, stmt: &Statement) -> Result<()> {
        let before = self.asm.depth();
        self.lower_statement(stmt)?;
        self.check_depth(before, stmt.kind_name())
    }

    fn lower_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Expression(expr_stmt) => {
                self.compile_expression(&expr_stmt.expression)?;
                match self.mode {
                    Mode::TopLevel => self.asm.popv(),
                    Mode::Function => self.asm.pop(),
                }
                Ok(())
            }
            Statement::Block(block) => self.compile_statements(&block.body),
            Statement::VariableDeclaration(decl) => self.compile_var_declaration(decl),
            Statement::While(while_stmt) => self.compile_while(while_stmt),
            Statement::Break => {
                let target = self.innermost_loop("break")?.end;
                self.asm.goto(target)
            }
            Statement::Continue => {
                let target = self.innermost_loop("continue")?.start;
                self.asm.goto(target)
            }
            Statement::Return(ret) => self.compile_return(ret),
            Statement::FunctionDeclaration(func) => match self.mode {
                // Already compiled into its own unit
                Mode::TopLevel => {
                    trace!(function = %func.name, "skip hoisted function");
                    Ok(())
                }
                Mode::Function => Err(CompileError::NestedFunction),
            },
            Statement::Empty => Ok(()),
            Statement::If(_)
            | Statement::Switch(_)
            | Statement::DoWhile(_)
            | Statement::For(_)
            | Statement::ForIn(_)
            | Statement::BreakLabel(_)
            | Statement::ContinueLabel(_)
            | Statement::Throw(_)
            | Statement::Try(_)
            | Statement::With(_)
            | Statement::Labeled(_)
            | Statement::Debugger => Err(CompileError::unsupported(stmt.kind_name())),
        }
    }

    fn compile_var_declaration(&mut self, decl: &VariableDeclaration) -> Result<()> {
        match decl.kind {
            VariableKind::Var => {}
            VariableKind::Let => return Err(CompileError::unsupported("let declaration")),
            VariableKind::Const => return Err(CompileError::unsupported("const declaration")),
        }
        for declarator in &decl.declarations {
            self.declare_variable(&declarator.id, declarator.init.as_ref())?;
        }
        Ok(())
    }

    fn compile_while(&mut self, while_stmt: &WhileStatement) -> Result<()> {
        let start = self.asm.location();
        let end = self.asm.lazy_location();

        self.with_loop(LoopContext { start, end }, |this| {
            this.compile_expression(&while_stmt.test)?;
            this.asm.ifeq(end)?;
            this.compile_statement(&while_stmt.body)?;
            this.asm.goto(start)
        })?;

        self.asm.fix_location(end)
    }

    fn compile_return(&mut self, ret: &ReturnStatement) -> Result<()> {
        if self.mode != Mode::Function {
            return Err(CompileError::ReturnOutsideFunction);
        }
        match &ret.argument {
            Some(argument) => self.compile_expression(argument)?,
            None => self.asm.undefined(),
        }
        self.asm.ret();
        Ok(())
    }

    /// Runs `body` with `context` as the innermost loop.
    fn with_loop<T>(
        &mut self,
        context: LoopContext,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.loops.push(context);
        let result = body(self);
        self.loops.pop();
        result
    }

    fn innermost_loop(&self, keyword: &'static str) -> Result<LoopContext> {
        self.loops
            .last()
            .copied()
            .ok_or(CompileError::NotInLoop(keyword))
    }
}
