// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation.
//!
//! Every expression leaves exactly one value on the operand stack, and
//! sub-expressions are evaluated left to right.
//!
//! | Expression | Instructions | Stack Effect |
//! |------------|--------------|--------------|
//! | Number | `one` / `int8` / `int32` | Push 1 |
//! | String | `string` | Push 1 |
//! | Boolean / null / this | `true` `false` / `null` / `this` | Push 1 |
//! | Identifier | see `variables` | Push 1 |
//! | Array | `newarray 0`, then `arraypush` per element | Push 1 |
//! | Binary | left, right, operator | Pop 2, push 1 |
//! | `a, b` | a, `pop`, b | Push 1 |
//! | `a.b` | a, `getprop b` | Pop 1, push 1 |
//! | Call | `callprop` / `callgname`, args, `call N` | Push 1 |
//! | `new` | callee, `push`, args, `new N` | Push 1 |
//! | Conditional | `ifeq`, `goto` | Push 1 |
//!
//! ## Numbers
//!
//! Only integer literals are supported. `1` has its own instruction; other
//! values use the narrowest immediate that holds them:
//!
//! | Value | Instruction |
//! |-------|-------------|
//! | `-2^7 ..= 2^8 - 1` | `int8` |
//! | `-2^31 ..= 2^32 - 1` | `int32` |
//! | otherwise | "number too large" |
//!
//! Unary minus is folded into a numeric literal operand and follows the same
//! rule, so `-200` needs `int32`. It is not supported on anything else.
//!
//! ## Postfix Increment on a Property
//!
//! The receiver is evaluated once and duplicated:
//!
//! ```text
//! obj.prop++
//!
//!   [compile obj]   ; [obj]
//!   dup             ; [obj, obj]
//!   getprop prop    ; [obj, v]
//!   dup2            ; [obj, v, obj, v]
//!   one             ; [obj, v, obj, v, 1]
//!   add             ; [obj, v, obj, v+1]
//!   setprop prop    ; [obj, v, v+1]
//!   pop             ; [obj, v]
//!   swap            ; [v, obj]
//!   pop             ; [v]
//! ```

use super::Translator;
use super::escape::decode_string_literal;
use crate::ast::*;
use crate::compiler::bytecode::OpCode;
use crate::error::{CompileError, Result};

/// Values an `int8` immediate is chosen for.
const INT8_RANGE: std::ops::Range<f64> = -128.0..256.0;
/// Values an `int32` immediate is chosen for.
const INT32_RANGE: std::ops::Range<f64> = -2_147_483_648.0..4_294_967_296.0;

impl Translator<'_> {
    /// Compiles an expression, leaving exactly one value on the stack.
    pub(super) fn compile_expression(&mut self, expr: &Expression) -> Result<()> {
        let before = self.asm.depth();
        self.lower_expression(expr)?;
        self.check_depth(before + 1, expr.kind_name())
    }

    fn lower_expression(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::Literal(literal) => self.compile_literal(literal),
            Expression::Identifier(id) => self.read_variable(id),
            Expression::This => {
                self.asm.this();
                Ok(())
            }
            Expression::Array(array) => self.compile_array(array),
            Expression::Binary(binary) => self.compile_binary(binary),
            Expression::Unary(unary) => self.compile_unary(unary),
            Expression::Assignment(assign) => self.compile_assignment(assign),
            Expression::Call(call) => self.compile_call(call),
            Expression::Member(member) => self.compile_member(member),
            Expression::Conditional(cond) => self.compile_conditional(cond),
            Expression::New(new_expr) => self.compile_new(new_expr),
            Expression::Update(update) => self.compile_update(update),
            Expression::Sequence(seq) => self.compile_sequence(seq),
            Expression::Paren(inner) => self.compile_expression(inner),
            Expression::Object(_) | Expression::Function(_) => {
                Err(CompileError::unsupported(expr.kind_name()))
            }
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn compile_literal(&mut self, literal: &Literal) -> Result<()> {
        match literal {
            Literal::Number(value) => self.compile_integer(*value)?,
            Literal::String(raw) => {
                let value = decode_string_literal(raw)?;
                self.asm.string(&value);
            }
            Literal::Boolean(true) => self.asm.push_true(),
            Literal::Boolean(false) => self.asm.push_false(),
            Literal::Null => self.asm.null(),
            Literal::RegExp { .. } => return Err(CompileError::unsupported("RegExpLiteral")),
        }
        Ok(())
    }

    fn compile_integer(&mut self, value: f64) -> Result<()> {
        if value.is_nan() || value.fract() != 0.0 {
            return Err(CompileError::unsupported(format!(
                "non-integer numeric literal {}",
                value
            )));
        }

        if value == 1.0 {
            self.asm.one();
            Ok(())
        } else if INT8_RANGE.contains(&value) {
            self.asm.int8(value as i64)
        } else if INT32_RANGE.contains(&value) {
            self.asm.int32(value as i64)
        } else {
            Err(CompileError::NumberTooLarge(value))
        }
    }

    fn compile_array(&mut self, array: &ArrayExpression) -> Result<()> {
        self.asm.newarray(0);
        for element in &array.elements {
            let element = element
                .as_ref()
                .ok_or_else(|| CompileError::unsupported("array hole"))?;
            self.compile_expression(element)?;
            self.asm.arraypush();
        }
        Ok(())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn compile_binary(&mut self, binary: &BinaryExpression) -> Result<()> {
        let opcode = binary_opcode(binary.operator).ok_or_else(|| {
            CompileError::unsupported(format!(
                "binary operator '{}'",
                binary_symbol(binary.operator)
            ))
        })?;
        self.compile_expression(&binary.left)?;
        self.compile_expression(&binary.right)?;
        self.asm.simple(opcode);
        Ok(())
    }

    fn compile_unary(&mut self, unary: &UnaryExpression) -> Result<()> {
        match (unary.operator, unary.argument.as_ref()) {
            (UnaryOperator::Minus, Expression::Literal(Literal::Number(value))) => {
                self.compile_integer(-value)
            }
            (UnaryOperator::Minus, argument) => Err(CompileError::unsupported(format!(
                "unary minus on {}",
                argument.kind_name()
            ))),
            (operator, _) => Err(CompileError::unsupported(format!(
                "unary operator '{}'",
                unary_symbol(operator)
            ))),
        }
    }

    /// Binary comma only. Longer chains are not lowered.
    fn compile_sequence(&mut self, seq: &SequenceExpression) -> Result<()> {
        match seq.expressions.as_slice() {
            [left, right] => {
                self.compile_expression(left)?;
                self.asm.pop();
                self.compile_expression(right)
            }
            _ => Err(CompileError::unsupported(format!(
                "comma expression with {} operands",
                seq.expressions.len()
            ))),
        }
    }

    fn compile_conditional(&mut self, cond: &ConditionalExpression) -> Result<()> {
        let else_label = self.asm.lazy_location();
        let end_label = self.asm.lazy_location();

        self.compile_expression(&cond.test)?;
        self.asm.ifeq(else_label)?;
        self.compile_expression(&cond.consequent)?;
        self.asm.goto(end_label)?;
        self.asm.fix_location(else_label)?;
        self.compile_expression(&cond.alternate)?;
        self.asm.fix_location(end_label)
    }

    fn compile_assignment(&mut self, assign: &AssignmentExpression) -> Result<()> {
        if assign.operator != AssignmentOperator::Assign {
            return Err(CompileError::unsupported(format!(
                "compound assignment '{}'",
                assignment_symbol(assign.operator)
            )));
        }

        match assign.left.as_ref() {
            Expression::Identifier(id) => self.write_variable(id, &assign.right),
            Expression::Member(member) => {
                let name = property_name(member)?;
                self.compile_expression(&member.object)?;
                self.compile_expression(&assign.right)?;
                self.asm.setprop(name);
                Ok(())
            }
            target => Err(CompileError::internal(format!(
                "invalid assignment target {}",
                target.kind_name()
            ))),
        }
    }

    fn compile_update(&mut self, update: &UpdateExpression) -> Result<()> {
        match (update.operator, update.prefix) {
            (UpdateOperator::Increment, false) => {}
            (UpdateOperator::Increment, true) => {
                return Err(CompileError::unsupported("prefix increment"));
            }
            (UpdateOperator::Decrement, true) => {
                return Err(CompileError::unsupported("prefix decrement"));
            }
            (UpdateOperator::Decrement, false) => {
                return Err(CompileError::unsupported("postfix decrement"));
            }
        }

        match update.argument.as_ref() {
            Expression::Identifier(id) => self.increment_variable(id),
            Expression::Member(member) => {
                let name = property_name(member)?;
                self.compile_expression(&member.object)?;
                self.asm.dup();
                self.asm.getprop(name);
                self.asm.dup2();
                self.asm.one();
                self.asm.add();
                self.asm.setprop(name);
                self.asm.pop();
                self.asm.swap();
                self.asm.pop();
                Ok(())
            }
            target => Err(CompileError::internal(format!(
                "invalid increment target {}",
                target.kind_name()
            ))),
        }
    }

    // ========================================================================
    // Properties, calls and construction
    // ========================================================================

    fn compile_member(&mut self, member: &MemberExpression) -> Result<()> {
        let name = property_name(member)?;
        self.compile_expression(&member.object)?;
        self.asm.getprop(name);
        Ok(())
    }

    fn compile_call(&mut self, call: &CallExpression) -> Result<()> {
        match call.callee.as_ref() {
            Expression::Member(member) => {
                let name = property_name(member)?;
                self.compile_expression(&member.object)?;
                self.asm.callprop(name);
            }
            Expression::Identifier(id) => match &id.variable {
                Variable::Global(name) => self.asm.callgname(name),
                variable @ (Variable::Parameter(_) | Variable::Local(_)) => {
                    return Err(CompileError::UnsupportedCallee(variable.kind_name().into()));
                }
                Variable::Unresolved => {
                    return Err(CompileError::internal(format!(
                        "callee '{}' was not classified by the scope resolver",
                        id.name
                    )));
                }
            },
            callee => return Err(CompileError::UnsupportedCallee(callee.kind_name().into())),
        }

        let argc = self.compile_arguments(&call.arguments)?;
        self.asm.call(argc);
        Ok(())
    }

    fn compile_new(&mut self, new_expr: &NewExpression) -> Result<()> {
        self.compile_expression(&new_expr.callee)?;
        self.asm.push_marker();
        let argc = self.compile_arguments(&new_expr.arguments)?;
        self.asm.construct(argc);
        Ok(())
    }

    fn compile_arguments(&mut self, arguments: &[Expression]) -> Result<u16> {
        let argc = u16::try_from(arguments.len()).map_err(|_| {
            CompileError::unsupported(format!("call with {} arguments", arguments.len()))
        })?;
        for argument in arguments {
            self.compile_expression(argument)?;
        }
        Ok(argc)
    }
}

/// Name of a dotted property access.
fn property_name(member: &MemberExpression) -> Result<&str> {
    if member.computed {
        return Err(CompileError::unsupported("bracket MemberExpression"));
    }
    match &member.property {
        MemberProperty::Identifier(name) => Ok(name),
        MemberProperty::Expression(_) => Err(CompileError::internal(
            "dotted member access without a property name",
        )),
    }
}

fn binary_opcode(op: BinaryOperator) -> Option<OpCode> {
    let opcode = match op {
        BinaryOperator::Add => OpCode::Add,
        BinaryOperator::Subtract => OpCode::Sub,
        BinaryOperator::Multiply => OpCode::Mul,
        BinaryOperator::Divide => OpCode::Div,
        BinaryOperator::Modulo => OpCode::Mod,
        BinaryOperator::Equal => OpCode::Eq,
        BinaryOperator::NotEqual => OpCode::Ne,
        BinaryOperator::StrictEqual => OpCode::StrictEq,
        BinaryOperator::StrictNotEqual => OpCode::StrictNe,
        BinaryOperator::LessThan => OpCode::Lt,
        BinaryOperator::LessThanEqual => OpCode::Le,
        BinaryOperator::GreaterThan => OpCode::Gt,
        BinaryOperator::GreaterThanEqual => OpCode::Ge,
        BinaryOperator::LogicalAnd => OpCode::And,
        BinaryOperator::LogicalOr => OpCode::Or,
        BinaryOperator::BitwiseAnd
        | BinaryOperator::BitwiseOr
        | BinaryOperator::BitwiseXor
        | BinaryOperator::LeftShift
        | BinaryOperator::RightShift
        | BinaryOperator::UnsignedRightShift
        | BinaryOperator::In
        | BinaryOperator::InstanceOf => return None,
    };
    Some(opcode)
}

fn binary_symbol(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::Modulo => "%",
        BinaryOperator::Equal => "==",
        BinaryOperator::NotEqual => "!=",
        BinaryOperator::StrictEqual => "===",
        BinaryOperator::StrictNotEqual => "!==",
        BinaryOperator::LessThan => "<",
        BinaryOperator::LessThanEqual => "<=",
        BinaryOperator::GreaterThan => ">",
        BinaryOperator::GreaterThanEqual => ">=",
        BinaryOperator::LogicalAnd => "&&",
        BinaryOperator::LogicalOr => "||",
        BinaryOperator::BitwiseAnd => "&",
        BinaryOperator::BitwiseOr => "|",
        BinaryOperator::BitwiseXor => "^",
        BinaryOperator::LeftShift => "<<",
        BinaryOperator::RightShift => ">>",
        BinaryOperator::UnsignedRightShift => ">>>",
        BinaryOperator::In => "in",
        BinaryOperator::InstanceOf => "instanceof",
    }
}

fn unary_symbol(op: UnaryOperator) -> &'static str {
    match op {
        UnaryOperator::Minus => "-",
        UnaryOperator::Plus => "+",
        UnaryOperator::LogicalNot => "!",
        UnaryOperator::BitwiseNot => "~",
        UnaryOperator::Typeof => "typeof",
        UnaryOperator::Void => "void",
        UnaryOperator::Delete => "delete",
    }
}

fn assignment_symbol(op: AssignmentOperator) -> &'static str {
    match op {
        AssignmentOperator::Assign => "=",
        AssignmentOperator::AddAssign => "+=",
        AssignmentOperator::SubtractAssign => "-=",
        AssignmentOperator::MultiplyAssign => "*=",
        AssignmentOperator::DivideAssign => "/=",
        AssignmentOperator::ModuloAssign => "%=",
        AssignmentOperator::LeftShiftAssign => "<<=",
        AssignmentOperator::RightShiftAssign => ">>=",
        AssignmentOperator::UnsignedRightShiftAssign => ">>>=",
        AssignmentOperator::BitwiseAndAssign => "&=",
        AssignmentOperator::BitwiseOrAssign => "|=",
        AssignmentOperator::BitwiseXorAssign => "^=",
    }
}
