// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Whole-program code generation tests.
//!
//! Programs are written the way a front end hands them over: as JSON.

use jetspider_compiler::ast::Program;
use jetspider_compiler::compiler::{CodeUnit, Operand};
use jetspider_compiler::{CompileError, ErrorCategory, ObjectFile, compile};
use pretty_assertions::assert_eq;

fn parse(json: &str) -> Program {
    serde_json::from_str(json).expect("program JSON should deserialize")
}

fn compile_json(json: &str) -> Result<ObjectFile, CompileError> {
    compile(&parse(json))
}

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

const GLOBAL_VAR: &str = r#"{
    "filename": "a.js",
    "scope": { "kind": "global" },
    "body": [
        { "VariableDeclaration": {
            "kind": "var",
            "declarations": [
                { "id": { "name": "x", "variable": { "global": "x" } },
                  "init": { "Literal": { "Number": 1.0 } } }
            ]
        } }
    ]
}"#;

const WHILE_LOOP: &str = r#"{
    "filename": "loop.js",
    "scope": { "kind": "global" },
    "body": [
        { "FunctionDeclaration": {
            "name": "f",
            "params": [],
            "scope": { "kind": { "function": "f" }, "locals": ["x"] },
            "filename": "loop.js",
            "lineno": 2,
            "body": [
                { "While": {
                    "test": { "Identifier": { "name": "x", "variable": { "local": 0 } } },
                    "body": { "Block": { "body": [
                        { "Expression": { "expression": { "Update": {
                            "operator": "increment",
                            "prefix": false,
                            "argument": { "Identifier": { "name": "x", "variable": { "local": 0 } } }
                        } } } }
                    ] } }
                } }
            ]
        } },
        { "Expression": { "expression": { "Call": {
            "callee": { "Identifier": { "name": "f", "variable": { "global": "f" } } },
            "arguments": []
        } } } }
    ]
}"#;

#[test]
fn test_global_var_from_json() {
    let object_file = compile_json(GLOBAL_VAR).unwrap();
    assert_eq!(object_file.len(), 1);
    let unit = object_file.toplevel().unwrap();
    assert_eq!(
        listing(unit),
        vec!["bindgname x", "one", "setgname x", "pop", "stop"]
    );
    assert_eq!(unit.filename(), "a.js");
    assert_eq!(unit.lineno(), 1);
    assert_eq!(unit.max_stack_depth(), 2);
}

#[test]
fn test_function_and_toplevel_units() {
    let object_file = compile_json(WHILE_LOOP).unwrap();
    assert_eq!(object_file.len(), 2);

    let f = object_file.function("f").unwrap();
    assert_eq!(
        listing(f),
        vec![
            "getlocal 0",
            "ifeq +22",
            "getlocal 0",
            "getlocal 0",
            "one",
            "add",
            "setlocal 0",
            "pop",
            "goto -20",
            "stop",
        ]
    );
    assert_eq!(f.lineno(), 2);
    assert_eq!(f.scope().nlocals(), 1);

    assert_eq!(
        listing(object_file.toplevel().unwrap()),
        vec!["callgname f", "call 0", "popv", "stop"]
    );
}

#[test]
fn test_listing_output() {
    let object_file = compile_json(GLOBAL_VAR).unwrap();
    let text = object_file.to_string();
    assert!(text.starts_with("; <toplevel> (a.js:1) nargs=0 nlocals=0 maxstack=2\n"));
    assert!(text.contains("00000: bindgname \"x\""));
    assert!(text.contains("00012: stop"));
}

#[test]
fn test_object_file_serializes() {
    let object_file = compile_json(WHILE_LOOP).unwrap();
    let value = serde_json::to_value(&object_file).unwrap();
    let units = value["units"].as_array().unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0]["scope"]["kind"]["function"], "f");
    assert_eq!(units[1]["atoms"][0], "f");
    assert_eq!(units[1]["max_stack_depth"], 2);
    assert_eq!(
        units[0]["code"].as_array().unwrap().len(),
        object_file.function("f").unwrap().code_length()
    );
}

#[test]
fn test_unsupported_construct_fails_whole_program() {
    let json = r#"{
        "filename": "a.js",
        "scope": { "kind": "global" },
        "body": [
            { "Expression": { "expression": { "Literal": { "Number": 1.0 } } } },
            { "If": {
                "test": { "Literal": { "Boolean": true } },
                "consequent": "Empty",
                "alternate": null
            } }
        ]
    }"#;
    let err = compile_json(json).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unsupported);
    assert_eq!(err.to_string(), "IfStatement not implemented");
}

#[test]
fn test_unresolved_variable_is_fatal() {
    let json = r#"{
        "filename": "a.js",
        "scope": { "kind": "global" },
        "body": [
            { "Expression": { "expression":
                { "Identifier": { "name": "x", "variable": "unresolved" } } } }
        ]
    }"#;
    let err = compile_json(json).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.category(), ErrorCategory::Fatal);
}
