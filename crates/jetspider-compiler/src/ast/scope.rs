// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resolved scopes and variable classifications.
//!
//! The front end's scope resolver classifies every variable occurrence exactly
//! once; the code generator only reads the result.

use serde::{Deserialize, Serialize};

/// How a variable reference is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    /// Function parameter, addressed by zero-based slot
    Parameter(u16),
    /// Function-local `var`, addressed by zero-based slot
    Local(u16),
    /// Property of the global object, addressed by name
    Global(String),
    /// Left unclassified by the scope resolver
    Unresolved,
}

impl Variable {
    /// Human-readable classification, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Variable::Parameter(_) => "parameter",
            Variable::Local(_) => "local variable",
            Variable::Global(_) => "global variable",
            Variable::Unresolved => "unresolved variable",
        }
    }
}

/// What a scope belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// The top-level program
    Global,
    /// A function body
    Function(String),
}

/// The variables visible to a function body or to the top level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// What this scope belongs to
    pub kind: ScopeKind,
    /// Parameter names, in slot order
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Local variable names, in slot order
    #[serde(default)]
    pub locals: Vec<String>,
}

impl Scope {
    /// Creates the top-level scope. It has no slots: every name is global.
    pub fn global() -> Self {
        Self {
            kind: ScopeKind::Global,
            parameters: Vec::new(),
            locals: Vec::new(),
        }
    }

    /// Creates a function scope with the given parameters and no locals.
    pub fn function(name: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            kind: ScopeKind::Function(name.into()),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            locals: Vec::new(),
        }
    }

    /// The scope's display name: the function name, or `<toplevel>`.
    pub fn name(&self) -> &str {
        match &self.kind {
            ScopeKind::Global => "<toplevel>",
            ScopeKind::Function(name) => name,
        }
    }

    /// Number of parameter slots.
    pub fn nargs(&self) -> usize {
        self.parameters.len()
    }

    /// Number of local slots.
    pub fn nlocals(&self) -> usize {
        self.locals.len()
    }
}

/// Slot assignment as the front end's resolver performs it, for building
/// scopes in tests.
#[cfg(test)]
impl Scope {
    /// Declares a local and returns its variable. Redeclaring returns the
    /// existing slot.
    pub(crate) fn declare_local(&mut self, name: impl Into<String>) -> Variable {
        let name = name.into();
        if let ScopeKind::Global = self.kind {
            return Variable::Global(name);
        }
        if let Some(index) = self.parameters.iter().position(|p| *p == name) {
            return Variable::Parameter(index as u16);
        }
        if let Some(index) = self.locals.iter().position(|l| *l == name) {
            return Variable::Local(index as u16);
        }
        self.locals.push(name);
        Variable::Local((self.locals.len() - 1) as u16)
    }

    /// Classifies a name as seen from this scope. Parameters shadow locals,
    /// and anything undeclared is global.
    pub(crate) fn resolve(&self, name: &str) -> Variable {
        if let Some(index) = self.parameters.iter().position(|p| p == name) {
            return Variable::Parameter(index as u16);
        }
        if let Some(index) = self.locals.iter().position(|l| l == name) {
            return Variable::Local(index as u16);
        }
        Variable::Global(name.to_string())
    }
}
