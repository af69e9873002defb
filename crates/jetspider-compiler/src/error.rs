// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for code generation.

use thiserror::Error;

/// Result type for code generation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised while lowering an AST to bytecode.
///
/// None of these are recovered locally: any error aborts the unit being
/// compiled and the whole object file with it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A node kind or operator/shape combination with no lowering rule
    #[error("{0} not implemented")]
    Unsupported(String),

    /// A call whose callee is neither a property access nor a global
    #[error("function call with {0} not implemented")]
    UnsupportedCallee(String),

    /// Numeric literal outside the 32-bit immediate range
    #[error("number too large: {0}")]
    NumberTooLarge(f64),

    /// String literal whose source text cannot be decoded
    #[error("malformed string literal {literal}: {reason}")]
    MalformedString { literal: String, reason: String },

    /// Function declaration inside a function body
    #[error("nested function not implemented")]
    NestedFunction,

    /// `break` or `continue` with no enclosing loop
    #[error("'{0}' outside of a loop")]
    NotInLoop(&'static str),

    /// `return` in the top-level unit
    #[error("'return' outside of a function")]
    ReturnOutsideFunction,

    /// A front-end guarantee or generator invariant was violated
    #[error("[FATAL] {0}")]
    Internal(String),
}

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The program uses a construct the generator cannot lower
    Unsupported,
    /// A construct appears somewhere it is not allowed to nest
    Nesting,
    /// Upstream defect or broken generator invariant
    Fatal,
}

impl CompileError {
    /// Shorthand for an [`CompileError::Unsupported`] error.
    pub fn unsupported(construct: impl Into<String>) -> Self {
        CompileError::Unsupported(construct.into())
    }

    /// Shorthand for an [`CompileError::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal(message.into())
    }

    /// Returns which part of the error taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompileError::Unsupported(_)
            | CompileError::UnsupportedCallee(_)
            | CompileError::NumberTooLarge(_)
            | CompileError::MalformedString { .. } => ErrorCategory::Unsupported,
            CompileError::NestedFunction
            | CompileError::NotInLoop(_)
            | CompileError::ReturnOutsideFunction => ErrorCategory::Nesting,
            CompileError::Internal(_) => ErrorCategory::Fatal,
        }
    }

    /// Whether this error signals a front-end or generator defect rather than
    /// a user program the generator does not support.
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Fatal
    }
}
