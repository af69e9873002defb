// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the code generator.

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::ast::*;
use crate::compiler::bytecode::{OpCode, Operand};
use crate::compiler::object_file::CodeUnit;
use crate::error::ErrorCategory;

// ============================================================================
// Helpers
// ============================================================================

fn global(name: &str) -> Expression {
    Expression::Identifier(Identifier::global(name))
}

fn local(name: &str, slot: u16) -> Expression {
    Expression::ident(name, Variable::Local(slot))
}

fn param(name: &str, slot: u16) -> Expression {
    Expression::ident(name, Variable::Parameter(slot))
}

fn expr(expression: Expression) -> Statement {
    Statement::expression(expression)
}

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Instructions as text, with atom operands replaced by the atom itself.
fn listing(unit: &CodeUnit) -> Vec<String> {
    unit.instructions()
        .iter()
        .map(|instruction| match instruction.operand {
            Some(Operand::Atom(index)) => {
                format!("{} {}", instruction.opcode, unit.atom(index).unwrap())
            }
            _ => instruction.to_string(),
        })
        .collect()
}

fn compile_program(body: Vec<Statement>) -> Result<ObjectFile> {
    Compiler::new().generate_object_file(&Program::new("test.js", body))
}

fn toplevel(body: Vec<Statement>) -> Vec<String> {
    let object_file = compile_program(body).unwrap();
    listing(object_file.toplevel().unwrap())
}

fn toplevel_error(body: Vec<Statement>) -> CompileError {
    compile_program(body).unwrap_err()
}

fn function(params: &[&str], locals: &[&str], body: Vec<Statement>) -> FunctionDeclaration {
    let mut scope = Scope::function("f", params);
    for name in locals {
        scope.declare_local(*name);
    }
    FunctionDeclaration {
        name: "f".into(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        scope,
        filename: "test.js".into(),
        lineno: 3,
    }
}

fn compile_function(params: &[&str], locals: &[&str], body: Vec<Statement>) -> Result<ObjectFile> {
    compile_program(vec![Statement::FunctionDeclaration(function(
        params, locals, body,
    ))])
}

fn function_listing(params: &[&str], locals: &[&str], body: Vec<Statement>) -> Vec<String> {
    let object_file = compile_function(params, locals, body).unwrap();
    listing(object_file.function("f").unwrap())
}

// ============================================================================
// A straight-line interpreter for checking what emitted code computes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Num(i64),
    Obj(usize),
    Binding,
    Undefined,
}

#[derive(Default)]
struct Machine {
    args: Vec<Value>,
    locals: Vec<Value>,
    globals: HashMap<String, Value>,
    objects: Vec<HashMap<String, Value>>,
    stack: Vec<Value>,
    completions: Vec<Value>,
}

impl Machine {
    fn pop(&mut self) -> Value {
        self.stack.pop().expect("operand stack underflow")
    }

    fn run(&mut self, unit: &CodeUnit) {
        for instruction in unit.instructions() {
            let slot = match instruction.operand {
                Some(Operand::Slot(slot)) => slot as usize,
                _ => 0,
            };
            let atom = match instruction.operand {
                Some(Operand::Atom(index)) => unit.atom(index).unwrap().to_string(),
                _ => String::new(),
            };
            match instruction.opcode {
                OpCode::GetArg => self.stack.push(self.args[slot]),
                OpCode::SetArg => self.args[slot] = *self.stack.last().unwrap(),
                OpCode::GetLocal => self.stack.push(self.locals[slot]),
                OpCode::SetLocal => self.locals[slot] = *self.stack.last().unwrap(),
                OpCode::GetGName => self.stack.push(self.globals[&atom]),
                OpCode::BindGName => self.stack.push(Value::Binding),
                OpCode::SetGName => {
                    let value = self.pop();
                    assert_eq!(self.pop(), Value::Binding);
                    self.globals.insert(atom, value);
                    self.stack.push(value);
                }
                OpCode::GetProp => match self.pop() {
                    Value::Obj(id) => self.stack.push(self.objects[id][&atom]),
                    other => panic!("getprop on {:?}", other),
                },
                OpCode::SetProp => {
                    let value = self.pop();
                    match self.pop() {
                        Value::Obj(id) => self.objects[id].insert(atom, value),
                        other => panic!("setprop on {:?}", other),
                    };
                    self.stack.push(value);
                }
                OpCode::Undefined => self.stack.push(Value::Undefined),
                OpCode::One => self.stack.push(Value::Num(1)),
                OpCode::Int8 | OpCode::Int32 => match instruction.operand {
                    Some(Operand::Immediate(n)) => self.stack.push(Value::Num(n)),
                    _ => panic!("immediate without operand"),
                },
                OpCode::Add => match (self.pop(), self.pop()) {
                    (Value::Num(b), Value::Num(a)) => self.stack.push(Value::Num(a + b)),
                    other => panic!("add on {:?}", other),
                },
                OpCode::Dup => {
                    let top = *self.stack.last().unwrap();
                    self.stack.push(top);
                }
                OpCode::Dup2 => {
                    let len = self.stack.len();
                    let pair = [self.stack[len - 2], self.stack[len - 1]];
                    self.stack.extend(pair);
                }
                OpCode::Swap => {
                    let len = self.stack.len();
                    self.stack.swap(len - 2, len - 1);
                }
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::PopV => {
                    let value = self.pop();
                    self.completions.push(value);
                }
                OpCode::Stop => break,
                other => panic!("{} is not straight-line code", other),
            }
        }
        assert!(self.stack.is_empty(), "values left on the stack: {:?}", self.stack);
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_global_var_declaration() {
    let body = vec![Statement::var(
        Identifier::global("x"),
        Some(Expression::number(1.0)),
    )];
    assert_eq!(
        toplevel(body),
        strs(&["bindgname x", "one", "setgname x", "pop", "stop"])
    );
}

#[test]
fn test_local_read_in_function_body() {
    let body = vec![expr(local("x", 0))];
    assert_eq!(
        function_listing(&[], &["x"], body),
        strs(&["getlocal 0", "pop", "stop"])
    );
}

#[test]
fn test_method_call() {
    let call = Expression::call(Expression::member(global("a"), "b"), vec![]);
    assert_eq!(
        toplevel(vec![expr(call)]),
        strs(&["getgname a", "callprop b", "call 0", "popv", "stop"])
    );
}

#[test]
fn test_while_with_local_increment() {
    let body = vec![Statement::while_loop(
        local("x", 0),
        Statement::block(vec![expr(Expression::postfix_increment(local("x", 0)))]),
    )];
    assert_eq!(
        function_listing(&[], &["x"], body),
        strs(&[
            "getlocal 0", // 0: start
            "ifeq +22",   // 3
            "getlocal 0", // 8
            "getlocal 0", // 11
            "one",        // 14
            "add",        // 15
            "setlocal 0", // 16
            "pop",        // 19
            "goto -20",   // 20
            "stop",       // 25: end
        ])
    );
}

#[test]
fn test_conditional_expression() {
    let cond = Expression::conditional(
        global("cond"),
        Expression::number(1.0),
        Expression::number(2.0),
    );
    assert_eq!(
        toplevel(vec![expr(cond)]),
        strs(&[
            "getgname cond", // 0
            "ifeq +11",      // 5
            "one",           // 10
            "goto +7",       // 11
            "int8 2",        // 16: else
            "popv",          // 18: end
            "stop",
        ])
    );
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_number_widths() {
    let cases: [(f64, &str); 6] = [
        (0.0, "int8 0"),
        (1.0, "one"),
        (2.0, "int8 2"),
        (255.0, "int8 255"),
        (256.0, "int32 256"),
        (4294967295.0, "int32 4294967295"),
    ];
    for (value, expected) in cases {
        assert_eq!(
            toplevel(vec![expr(Expression::number(value))]),
            strs(&[expected, "popv", "stop"])
        );
    }
}

#[test]
fn test_number_too_large() {
    let err = toplevel_error(vec![expr(Expression::number(4294967296.0))]);
    assert_eq!(err, CompileError::NumberTooLarge(4294967296.0));
    assert_eq!(err.to_string(), "number too large: 4294967296");
}

#[test]
fn test_non_integer_number_is_unsupported() {
    let err = toplevel_error(vec![expr(Expression::number(1.5))]);
    assert_eq!(err.category(), ErrorCategory::Unsupported);
    let err = toplevel_error(vec![expr(Expression::number(f64::NAN))]);
    assert_eq!(err.category(), ErrorCategory::Unsupported);
}

fn negate(argument: Expression) -> Expression {
    Expression::Unary(UnaryExpression {
        operator: UnaryOperator::Minus,
        argument: Box::new(argument),
    })
}

#[test]
fn test_negative_literals() {
    let cases: [(f64, &str); 5] = [
        (1.0, "int8 -1"),
        (128.0, "int8 -128"),
        (129.0, "int32 -129"),
        (300.0, "int32 -300"),
        (2147483648.0, "int32 -2147483648"),
    ];
    for (value, expected) in cases {
        assert_eq!(
            toplevel(vec![expr(negate(Expression::number(value)))]),
            strs(&[expected, "popv", "stop"])
        );
    }
    for value in [2147483649.0, 4294967295.0, 4294967296.0] {
        assert_eq!(
            toplevel_error(vec![expr(negate(Expression::number(value)))]),
            CompileError::NumberTooLarge(-value)
        );
    }
}

/// Encoded bytes of a top-level program made of one expression statement.
fn encoded(expression: Expression) -> Vec<u8> {
    let object_file = compile_program(vec![expr(expression)]).unwrap();
    object_file.toplevel().unwrap().code().to_vec()
}

/// Reads back the immediate of an `int8`/`int32` at the start of `code`.
fn decode_immediate(code: &[u8]) -> i64 {
    match code[0] {
        op if op == OpCode::Int8 as u8 => i64::from(code[1] as i8),
        op if op == OpCode::Int32 as u8 => {
            i64::from(i32::from_be_bytes([code[1], code[2], code[3], code[4]]))
        }
        op => panic!("not an immediate: {}", op),
    }
}

#[test]
fn test_negative_literals_encode_their_own_value() {
    let minus_200 = encoded(negate(Expression::number(200.0)));
    assert_eq!(
        minus_200,
        vec![
            OpCode::Int32 as u8,
            0xFF,
            0xFF,
            0xFF,
            0x38,
            OpCode::PopV as u8,
            OpCode::Stop as u8
        ]
    );
    assert_ne!(minus_200, encoded(Expression::number(56.0)));
    assert_eq!(decode_immediate(&minus_200), -200);
    assert_eq!(decode_immediate(&encoded(negate(Expression::number(1.0)))), -1);
}

#[test]
fn test_unary_minus_on_non_literal() {
    assert_eq!(
        toplevel_error(vec![expr(negate(global("x")))]),
        CompileError::unsupported("unary minus on Identifier")
    );
}

#[test]
fn test_other_unary_operators_are_unsupported() {
    for (operator, symbol) in [
        (UnaryOperator::LogicalNot, "!"),
        (UnaryOperator::Typeof, "typeof"),
        (UnaryOperator::Void, "void"),
        (UnaryOperator::Delete, "delete"),
    ] {
        let unary = Expression::Unary(UnaryExpression {
            operator,
            argument: Box::new(global("x")),
        });
        assert_eq!(
            toplevel_error(vec![expr(unary)]).to_string(),
            format!("unary operator '{}' not implemented", symbol)
        );
    }
}

#[test]
fn test_string_literal_is_decoded() {
    let object_file = compile_program(vec![expr(Expression::string(r"'a\tb'"))]).unwrap();
    let unit = object_file.toplevel().unwrap();
    assert_eq!(listing(unit), strs(&["string a\tb", "popv", "stop"]));
    assert_eq!(unit.atoms(), &["a\tb".to_string()]);
}

#[test]
fn test_malformed_string_literal() {
    assert!(matches!(
        toplevel_error(vec![expr(Expression::string("'abc"))]),
        CompileError::MalformedString { .. }
    ));
}

#[test]
fn test_constant_literals() {
    let body = vec![
        expr(Expression::Literal(Literal::Boolean(true))),
        expr(Expression::Literal(Literal::Boolean(false))),
        expr(Expression::Literal(Literal::Null)),
        expr(Expression::This),
    ];
    assert_eq!(
        toplevel(body),
        strs(&["true", "popv", "false", "popv", "null", "popv", "this", "popv", "stop"])
    );
}

#[test]
fn test_regexp_literal_is_unsupported() {
    let regexp = Expression::Literal(Literal::RegExp {
        pattern: "a+".into(),
        flags: "g".into(),
    });
    assert_eq!(
        toplevel_error(vec![expr(regexp)]),
        CompileError::unsupported("RegExpLiteral")
    );
}

#[test]
fn test_array_literal() {
    let array = Expression::Array(ArrayExpression {
        elements: vec![Some(Expression::number(1.0)), Some(global("x"))],
    });
    assert_eq!(
        toplevel(vec![expr(array)]),
        strs(&[
            "newarray 0",
            "one",
            "arraypush",
            "getgname x",
            "arraypush",
            "popv",
            "stop"
        ])
    );
}

#[test]
fn test_array_hole_is_unsupported() {
    let array = Expression::Array(ArrayExpression {
        elements: vec![Some(Expression::number(1.0)), None],
    });
    assert_eq!(
        toplevel_error(vec![expr(array)]),
        CompileError::unsupported("array hole")
    );
}

#[test]
fn test_object_and_function_expressions_are_unsupported() {
    let object = Expression::Object(ObjectExpression { properties: vec![] });
    assert_eq!(
        toplevel_error(vec![expr(object)]),
        CompileError::unsupported("ObjectExpression")
    );

    let func = Expression::Function(FunctionExpression {
        name: None,
        params: vec![],
        body: vec![],
    });
    assert_eq!(
        toplevel_error(vec![expr(func)]),
        CompileError::unsupported("FunctionExpression")
    );
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_binary_operators() {
    let cases = [
        (BinaryOperator::Add, "add"),
        (BinaryOperator::Subtract, "sub"),
        (BinaryOperator::Multiply, "mul"),
        (BinaryOperator::Divide, "div"),
        (BinaryOperator::Modulo, "mod"),
        (BinaryOperator::Equal, "eq"),
        (BinaryOperator::NotEqual, "ne"),
        (BinaryOperator::StrictEqual, "stricteq"),
        (BinaryOperator::StrictNotEqual, "strictne"),
        (BinaryOperator::LessThan, "lt"),
        (BinaryOperator::LessThanEqual, "le"),
        (BinaryOperator::GreaterThan, "gt"),
        (BinaryOperator::GreaterThanEqual, "ge"),
        (BinaryOperator::LogicalAnd, "and"),
        (BinaryOperator::LogicalOr, "or"),
    ];
    for (operator, name) in cases {
        let binary = Expression::binary(operator, global("a"), global("b"));
        assert_eq!(
            toplevel(vec![expr(binary)]),
            strs(&["getgname a", "getgname b", name, "popv", "stop"])
        );
    }
}

#[test]
fn test_bitwise_operators_are_unsupported() {
    for (operator, symbol) in [
        (BinaryOperator::BitwiseAnd, "&"),
        (BinaryOperator::BitwiseOr, "|"),
        (BinaryOperator::LeftShift, "<<"),
        (BinaryOperator::UnsignedRightShift, ">>>"),
        (BinaryOperator::InstanceOf, "instanceof"),
    ] {
        let binary = Expression::binary(operator, global("a"), global("b"));
        assert_eq!(
            toplevel_error(vec![expr(binary)]),
            CompileError::unsupported(format!("binary operator '{}'", symbol))
        );
    }
}

#[test]
fn test_nested_binary_evaluates_left_to_right() {
    // a - b * 2
    let binary = Expression::binary(
        BinaryOperator::Subtract,
        global("a"),
        Expression::binary(BinaryOperator::Multiply, global("b"), Expression::number(2.0)),
    );
    assert_eq!(
        toplevel(vec![expr(binary)]),
        strs(&["getgname a", "getgname b", "int8 2", "mul", "sub", "popv", "stop"])
    );
}

#[test]
fn test_comma_expression() {
    let seq = Expression::Sequence(SequenceExpression {
        expressions: vec![global("a"), global("b")],
    });
    assert_eq!(
        toplevel(vec![expr(seq)]),
        strs(&["getgname a", "pop", "getgname b", "popv", "stop"])
    );
}

#[test]
fn test_long_comma_chain_is_unsupported() {
    let seq = Expression::Sequence(SequenceExpression {
        expressions: vec![global("a"), global("b"), global("c")],
    });
    assert_eq!(
        toplevel_error(vec![expr(seq)]).category(),
        ErrorCategory::Unsupported
    );
}

#[test]
fn test_parenthesized_expression() {
    let paren = Expression::Paren(Box::new(Expression::number(7.0)));
    assert_eq!(toplevel(vec![expr(paren)]), strs(&["int8 7", "popv", "stop"]));
}

// ============================================================================
// Properties, calls and construction
// ============================================================================

#[test]
fn test_property_read() {
    assert_eq!(
        toplevel(vec![expr(Expression::member(global("a"), "b"))]),
        strs(&["getgname a", "getprop b", "popv", "stop"])
    );
}

#[test]
fn test_bracket_access_is_unsupported() {
    let member = Expression::Member(MemberExpression {
        object: Box::new(global("a")),
        property: MemberProperty::Expression(Box::new(Expression::number(0.0))),
        computed: true,
    });
    assert_eq!(
        toplevel_error(vec![expr(member)]).to_string(),
        "bracket MemberExpression not implemented"
    );
}

#[test]
fn test_global_function_call() {
    let call = Expression::call(
        global("f"),
        vec![Expression::number(1.0), Expression::number(2.0)],
    );
    assert_eq!(
        toplevel(vec![expr(call)]),
        strs(&["callgname f", "one", "int8 2", "call 2", "popv", "stop"])
    );
}

#[test]
fn test_call_with_local_callee_is_unsupported() {
    let call = Expression::call(local("g", 0), vec![]);
    let err = compile_function(&[], &["g"], vec![expr(call)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "function call with local variable not implemented"
    );
}

#[test]
fn test_call_with_parameter_callee_is_unsupported() {
    let call = Expression::call(param("cb", 0), vec![]);
    assert_eq!(
        compile_function(&["cb"], &[], vec![expr(call)]).unwrap_err(),
        CompileError::UnsupportedCallee("parameter".into())
    );
}

#[test]
fn test_call_with_other_callee_is_unsupported() {
    let call = Expression::call(Expression::call(global("f"), vec![]), vec![]);
    assert_eq!(
        toplevel_error(vec![expr(call)]),
        CompileError::UnsupportedCallee("CallExpression".into())
    );
}

#[test]
fn test_new_expression() {
    let new_expr = Expression::New(NewExpression {
        callee: Box::new(global("C")),
        arguments: vec![Expression::number(1.0)],
    });
    assert_eq!(
        toplevel(vec![expr(new_expr)]),
        strs(&["getgname C", "push", "one", "new 1", "popv", "stop"])
    );
}

// ============================================================================
// Increment and assignment
// ============================================================================

#[test]
fn test_property_increment() {
    let increment = Expression::postfix_increment(Expression::member(global("o"), "p"));
    let object_file = compile_program(vec![expr(increment)]).unwrap();
    let unit = object_file.toplevel().unwrap();
    assert_eq!(
        listing(unit),
        strs(&[
            "getgname o",
            "dup",
            "getprop p",
            "dup2",
            "one",
            "add",
            "setprop p",
            "pop",
            "swap",
            "pop",
            "popv",
            "stop",
        ])
    );
    assert_eq!(unit.max_stack_depth(), 5);
}

#[test]
fn test_property_increment_evaluates_receiver_once() {
    // `f().p++`: the call must not be repeated for the store
    let receiver = Expression::call(global("f"), vec![]);
    let lines = toplevel(vec![expr(Expression::postfix_increment(Expression::member(
        receiver, "p",
    )))]);
    assert_eq!(
        lines,
        strs(&[
            "callgname f",
            "call 0",
            "dup",
            "getprop p",
            "dup2",
            "one",
            "add",
            "setprop p",
            "pop",
            "swap",
            "pop",
            "popv",
            "stop",
        ])
    );
    let count = |text: &str| lines.iter().filter(|line| *line == text).count();
    assert_eq!(count("callgname f"), 1);
    assert_eq!(count("call 0"), 1);
    assert_eq!(count("dup"), 1);

    // `a.b.c++`: the inner read of `b` happens once
    let lines = toplevel(vec![expr(Expression::postfix_increment(Expression::member(
        Expression::member(global("a"), "b"),
        "c",
    )))]);
    assert_eq!(&lines[..4], &strs(&["getgname a", "getprop b", "dup", "getprop c"])[..]);
    assert_eq!(lines.iter().filter(|line| *line == "getprop b").count(), 1);
}

#[test]
fn test_global_increment() {
    assert_eq!(
        toplevel(vec![expr(Expression::postfix_increment(global("x")))]),
        strs(&[
            "getgname x",
            "bindgname x",
            "getgname x",
            "one",
            "add",
            "setgname x",
            "pop",
            "popv",
            "stop",
        ])
    );
}

#[test]
fn test_parameter_increment() {
    assert_eq!(
        function_listing(&["n"], &[], vec![expr(Expression::postfix_increment(param("n", 0)))]),
        strs(&["getarg 0", "getarg 0", "one", "add", "setarg 0", "pop", "pop", "stop"])
    );
}

#[test]
fn test_increments_leave_the_previous_value() {
    // Globals and properties: `x++; x; o.p++; o.p;`
    let body = vec![
        expr(Expression::postfix_increment(global("x"))),
        expr(global("x")),
        expr(Expression::postfix_increment(Expression::member(global("o"), "p"))),
        expr(Expression::member(global("o"), "p")),
    ];
    let object_file = compile_program(body).unwrap();
    let mut machine = Machine::default();
    machine.globals.insert("x".into(), Value::Num(41));
    machine.globals.insert("o".into(), Value::Obj(0));
    machine.objects.push(HashMap::from([("p".to_string(), Value::Num(7))]));
    machine.run(object_file.toplevel().unwrap());
    assert_eq!(
        machine.completions,
        vec![Value::Num(41), Value::Num(42), Value::Num(7), Value::Num(8)]
    );

    // Slots: `var a = n++; var b = n; var c = x++; var d = x;`
    let slot = |name: &str, index: u16| Identifier::new(name, Variable::Local(index));
    let body = vec![
        Statement::var(slot("a", 1), Some(Expression::postfix_increment(param("n", 0)))),
        Statement::var(slot("b", 2), Some(param("n", 0))),
        Statement::var(slot("c", 3), Some(Expression::postfix_increment(local("x", 0)))),
        Statement::var(slot("d", 4), Some(local("x", 0))),
    ];
    let object_file = compile_function(&["n"], &["x", "a", "b", "c", "d"], body).unwrap();
    let mut machine = Machine {
        args: vec![Value::Num(10)],
        locals: vec![Value::Num(20), Value::Undefined, Value::Undefined, Value::Undefined, Value::Undefined],
        ..Machine::default()
    };
    machine.run(object_file.function("f").unwrap());
    assert_eq!(machine.args, vec![Value::Num(11)]);
    assert_eq!(
        machine.locals,
        vec![
            Value::Num(21),
            Value::Num(10),
            Value::Num(11),
            Value::Num(20),
            Value::Num(21)
        ]
    );
}

#[test]
fn test_other_update_forms_are_unsupported() {
    let update = |operator, prefix| {
        Expression::Update(UpdateExpression {
            operator,
            argument: Box::new(global("x")),
            prefix,
        })
    };
    assert_eq!(
        toplevel_error(vec![expr(update(UpdateOperator::Increment, true))]),
        CompileError::unsupported("prefix increment")
    );
    assert_eq!(
        toplevel_error(vec![expr(update(UpdateOperator::Decrement, true))]),
        CompileError::unsupported("prefix decrement")
    );
    assert_eq!(
        toplevel_error(vec![expr(update(UpdateOperator::Decrement, false))]),
        CompileError::unsupported("postfix decrement")
    );
}

#[test]
fn test_assignments() {
    assert_eq!(
        toplevel(vec![expr(Expression::assign(global("x"), Expression::number(2.0)))]),
        strs(&["bindgname x", "int8 2", "setgname x", "popv", "stop"])
    );
    assert_eq!(
        toplevel(vec![expr(Expression::assign(
            Expression::member(global("o"), "p"),
            Expression::number(2.0)
        ))]),
        strs(&["getgname o", "int8 2", "setprop p", "popv", "stop"])
    );
    assert_eq!(
        function_listing(
            &["n"],
            &["x"],
            vec![
                expr(Expression::assign(local("x", 0), Expression::number(2.0))),
                expr(Expression::assign(param("n", 0), local("x", 0))),
            ]
        ),
        strs(&["int8 2", "setlocal 0", "pop", "getlocal 0", "setarg 0", "pop", "stop"])
    );
}

#[test]
fn test_compound_assignment_is_unsupported() {
    let assign = Expression::Assignment(AssignmentExpression {
        operator: AssignmentOperator::AddAssign,
        left: Box::new(global("x")),
        right: Box::new(Expression::number(1.0)),
    });
    assert_eq!(
        toplevel_error(vec![expr(assign)]).to_string(),
        "compound assignment '+=' not implemented"
    );
}

#[test]
fn test_invalid_assignment_target_is_fatal() {
    let assign = Expression::assign(Expression::number(1.0), Expression::number(2.0));
    assert!(toplevel_error(vec![expr(assign)]).is_fatal());
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn test_local_declarations() {
    let decl = Statement::VariableDeclaration(VariableDeclaration {
        kind: VariableKind::Var,
        declarations: vec![
            VariableDeclarator {
                id: Identifier::new("x", Variable::Local(0)),
                init: None,
            },
            VariableDeclarator {
                id: Identifier::new("y", Variable::Local(1)),
                init: Some(Expression::number(5.0)),
            },
        ],
    });
    assert_eq!(
        function_listing(&[], &["x", "y"], vec![decl]),
        strs(&[
            "undefined",
            "setlocal 0",
            "pop",
            "int8 5",
            "setlocal 1",
            "pop",
            "stop"
        ])
    );
}

#[test]
fn test_global_declaration_without_initializer() {
    assert_eq!(
        toplevel(vec![Statement::var(Identifier::global("x"), None)]),
        strs(&["bindgname x", "undefined", "setgname x", "pop", "stop"])
    );
}

#[test]
fn test_parameter_redeclaration() {
    let id = Identifier::new("n", Variable::Parameter(0));
    assert_eq!(
        function_listing(&["n"], &[], vec![Statement::var(id.clone(), None)]),
        strs(&["stop"])
    );
    assert_eq!(
        function_listing(&["n"], &[], vec![Statement::var(id, Some(Expression::number(1.0)))]),
        strs(&["one", "setarg 0", "pop", "stop"])
    );
}

#[test]
fn test_let_and_const_are_unsupported() {
    for (kind, construct) in [
        (VariableKind::Let, "let declaration"),
        (VariableKind::Const, "const declaration"),
    ] {
        let decl = Statement::VariableDeclaration(VariableDeclaration {
            kind,
            declarations: vec![VariableDeclarator {
                id: Identifier::global("x"),
                init: None,
            }],
        });
        assert_eq!(
            toplevel_error(vec![decl]),
            CompileError::unsupported(construct)
        );
    }
}

#[test]
fn test_unresolved_variable_is_fatal() {
    let unresolved = Expression::ident("x", Variable::Unresolved);
    let err = toplevel_error(vec![expr(unresolved)]);
    assert!(err.is_fatal());
    assert!(err.to_string().starts_with("[FATAL]"));

    let decl = Statement::var(Identifier::new("y", Variable::Unresolved), None);
    assert!(toplevel_error(vec![decl]).is_fatal());
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_break_and_continue_target_innermost_loop() {
    let inner = Statement::while_loop(
        global("b"),
        Statement::block(vec![Statement::Break, Statement::Continue]),
    );
    let outer = Statement::while_loop(global("a"), inner);
    assert_eq!(
        toplevel(vec![outer]),
        strs(&[
            "getgname a", // 0: outer start
            "ifeq +35",   // 5  -> 40
            "getgname b", // 10: inner start
            "ifeq +20",   // 15 -> 35
            "goto +15",   // 20: break -> 35
            "goto -15",   // 25: continue -> 10
            "goto -20",   // 30 -> 10
            "goto -35",   // 35: inner end -> 0
            "stop",       // 40: outer end
        ])
    );
}

#[test]
fn test_break_after_inner_loop_targets_outer_loop() {
    let inner = Statement::while_loop(global("b"), Statement::Empty);
    let outer = Statement::while_loop(global("a"), Statement::block(vec![inner, Statement::Break]));
    assert_eq!(
        toplevel(vec![outer]),
        strs(&[
            "getgname a", // 0
            "ifeq +30",   // 5 -> 35
            "getgname b", // 10
            "ifeq +10",   // 15 -> 25
            "goto -10",   // 20 -> 10
            "goto +10",   // 25: break -> 35
            "goto -30",   // 30 -> 0
            "stop",       // 35
        ])
    );
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(
        toplevel_error(vec![Statement::Break]),
        CompileError::NotInLoop("break")
    );
    assert_eq!(
        toplevel_error(vec![Statement::Continue]),
        CompileError::NotInLoop("continue")
    );
    assert_eq!(
        toplevel_error(vec![Statement::Break]).category(),
        ErrorCategory::Nesting
    );
}

#[test]
fn test_loop_context_does_not_leak() {
    let body = vec![
        Statement::while_loop(global("a"), Statement::Break),
        Statement::Break,
    ];
    assert_eq!(toplevel_error(body), CompileError::NotInLoop("break"));
}

#[test]
fn test_return() {
    assert_eq!(
        function_listing(&["n"], &[], vec![Statement::ret(Some(param("n", 0)))]),
        strs(&["getarg 0", "return", "stop"])
    );
    assert_eq!(
        function_listing(&[], &[], vec![Statement::ret(None)]),
        strs(&["undefined", "return", "stop"])
    );
}

#[test]
fn test_return_at_top_level() {
    assert_eq!(
        toplevel_error(vec![Statement::ret(None)]),
        CompileError::ReturnOutsideFunction
    );
}

#[test]
fn test_unsupported_statements() {
    let if_stmt = Statement::If(IfStatement {
        test: global("a"),
        consequent: Box::new(Statement::Empty),
        alternate: None,
    });
    assert_eq!(
        toplevel_error(vec![if_stmt]).to_string(),
        "IfStatement not implemented"
    );
    assert_eq!(
        toplevel_error(vec![Statement::Debugger]),
        CompileError::unsupported("DebuggerStatement")
    );
    let labeled_break = Statement::while_loop(global("a"), Statement::BreakLabel("l".into()));
    assert_eq!(
        toplevel_error(vec![labeled_break]),
        CompileError::unsupported("labeled BreakStatement")
    );
}

#[test]
fn test_empty_statement_and_block() {
    assert_eq!(
        toplevel(vec![Statement::Empty, Statement::block(vec![Statement::Empty])]),
        strs(&["stop"])
    );
}

// ============================================================================
// Units
// ============================================================================

#[test]
fn test_functions_are_compiled_before_the_top_level() {
    let mut g = function(&["a"], &[], vec![Statement::ret(Some(param("a", 0)))]);
    g.name = "g".into();
    g.scope = Scope::function("g", &["a"]);
    let body = vec![
        expr(Expression::call(global("g"), vec![Expression::number(1.0)])),
        Statement::FunctionDeclaration(function(&[], &[], vec![])),
        Statement::block(vec![Statement::FunctionDeclaration(g)]),
    ];
    let object_file = compile_program(body).unwrap();

    let names: Vec<&str> = object_file.units().iter().map(|u| u.scope().name()).collect();
    assert_eq!(names, vec!["f", "g", "<toplevel>"]);
    assert_eq!(
        listing(object_file.toplevel().unwrap()),
        strs(&["callgname g", "one", "call 1", "popv", "stop"])
    );
    assert_eq!(
        listing(object_file.function("g").unwrap()),
        strs(&["getarg 0", "return", "stop"])
    );
    assert_eq!(object_file.function("f").unwrap().lineno(), 3);
    assert!(object_file.units().iter().all(|u| u.is_closed()));
}

#[test]
fn test_nested_function_declaration() {
    let inner = function(&[], &[], vec![]);
    let err = compile_function(&[], &[], vec![Statement::FunctionDeclaration(inner)]).unwrap_err();
    assert_eq!(err, CompileError::NestedFunction);
    assert_eq!(err.category(), ErrorCategory::Nesting);
}

#[test]
fn test_failure_in_function_aborts_compilation() {
    let body = vec![
        Statement::FunctionDeclaration(function(&[], &[], vec![Statement::Debugger])),
        expr(Expression::number(1.0)),
    ];
    assert!(compile_program(body).is_err());
}

#[test]
fn test_empty_program() {
    let object_file = compile_program(vec![]).unwrap();
    assert_eq!(object_file.len(), 1);
    assert_eq!(listing(object_file.toplevel().unwrap()), strs(&["stop"]));
}

#[test]
fn test_encoded_code() {
    let object_file = compile_program(vec![Statement::var(
        Identifier::global("x"),
        Some(Expression::number(1.0)),
    )])
    .unwrap();
    let unit = object_file.toplevel().unwrap();
    assert_eq!(
        unit.code(),
        &[
            OpCode::BindGName as u8,
            0,
            0,
            0,
            0,
            OpCode::One as u8,
            OpCode::SetGName as u8,
            0,
            0,
            0,
            0,
            OpCode::Pop as u8,
            OpCode::Stop as u8,
        ]
    );
    assert_eq!(unit.max_stack_depth(), 2);
}

// ============================================================================
// Properties
// ============================================================================

/// `while (c0) { while (c1) { ... { break; continue; } } }`, `depth` deep.
fn nested_loops(depth: usize) -> Statement {
    let mut body = Statement::block(vec![Statement::Break, Statement::Continue]);
    for level in (0..depth).rev() {
        body = Statement::while_loop(global(&format!("c{}", level)), body);
    }
    body
}

proptest! {
    #[test]
    fn prop_integer_width(value in 0u64..(1u64 << 32)) {
        let object_file = compile_program(vec![expr(Expression::number(value as f64))]).unwrap();
        let first = &object_file.toplevel().unwrap().instructions()[0];
        let expected = if value == 1 {
            OpCode::One
        } else if value < 256 {
            OpCode::Int8
        } else {
            OpCode::Int32
        };
        prop_assert_eq!(first.opcode, expected);
        if value != 1 {
            prop_assert_eq!(first.operand, Some(Operand::Immediate(value as i64)));
        }
    }

    #[test]
    fn prop_negated_integers_encode_exactly(value in 0u64..=(1u64 << 31)) {
        let code = encoded(negate(Expression::number(value as f64)));
        prop_assert_eq!(decode_immediate(&code), -(value as i64));
    }

    #[test]
    fn prop_large_integers_fail(value in (1u64 << 32)..(1u64 << 53)) {
        let err = compile_program(vec![expr(Expression::number(value as f64))]).unwrap_err();
        prop_assert_eq!(err, CompileError::NumberTooLarge(value as f64));
    }

    #[test]
    fn prop_expressions_push_one_value(value in 0u64..100_000, name in "[a-z]{1,8}") {
        let expressions = vec![
            Expression::number(value as f64),
            global(&name),
            Expression::member(global(&name), "p"),
            Expression::postfix_increment(global(&name)),
            Expression::postfix_increment(Expression::member(global(&name), "p")),
            Expression::call(global(&name), vec![Expression::number(value as f64)]),
            Expression::conditional(global(&name), Expression::number(1.0), global(&name)),
        ];
        for expression in expressions {
            // A top-level expression statement leaves nothing behind, so the
            // unit only closes if the expression pushed exactly one value.
            let object_file = compile_program(vec![expr(expression)]);
            prop_assert!(object_file.is_ok());
        }
    }

    #[test]
    fn prop_loop_nests_are_stack_neutral(depth in 1usize..12) {
        let object_file = compile_program(vec![nested_loops(depth)]).unwrap();
        let unit = object_file.toplevel().unwrap();
        let instructions = unit.instructions();

        let ifeqs = instructions.iter().filter(|i| i.opcode == OpCode::IfEq).count();
        let gotos = instructions.iter().filter(|i| i.opcode == OpCode::Goto).count();
        prop_assert_eq!(ifeqs, depth);
        prop_assert_eq!(gotos, depth + 2);
        prop_assert_eq!(unit.max_stack_depth(), 1);

        // The innermost loop's test is the last `getgname`/`ifeq` pair; break
        // jumps to its end, continue to its start.
        let inner_start = unit.offset_of(2 * (depth - 1)).unwrap() as i64;
        let inner_ifeq = 2 * (depth - 1) + 1;
        let inner_end = unit.offset_of(inner_ifeq).unwrap() as i64
            + match instructions[inner_ifeq].operand {
                Some(Operand::Jump(delta)) => i64::from(delta),
                _ => unreachable!(),
            };
        let jump_target = |index: usize| match instructions[index].operand {
            Some(Operand::Jump(delta)) => unit.offset_of(index).unwrap() as i64 + i64::from(delta),
            _ => unreachable!(),
        };
        prop_assert_eq!(jump_target(inner_ifeq + 1), inner_end);
        prop_assert_eq!(jump_target(inner_ifeq + 2), inner_start);
    }
}
