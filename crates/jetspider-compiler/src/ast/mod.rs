// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions consumed by the code generator.
//!
//! The tree is produced by an external front end that has already parsed the
//! source and resolved every variable occurrence (see [`scope`]). Node shapes
//! follow ESTree where possible. The taxonomy is closed: the generator matches
//! exhaustively over it, so any node kind it cannot lower fails explicitly.
//!
//! All types are `serde`-serializable so a front end can hand a program over
//! as JSON.

pub mod scope;

pub use scope::{Scope, ScopeKind, Variable};

use serde::{Deserialize, Serialize};

/// A complete program: the top-level statement sequence plus its scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Source file name
    pub filename: String,
    /// First source line of the program
    #[serde(default = "first_line")]
    pub lineno: u32,
    /// The top-level scope
    pub scope: Scope,
    /// The top-level statements, function declarations included
    pub body: Vec<Statement>,
}

fn first_line() -> u32 {
    1
}

impl Program {
    /// Creates a program with a global scope.
    pub fn new(filename: impl Into<String>, body: Vec<Statement>) -> Self {
        Self {
            filename: filename.into(),
            lineno: 1,
            scope: Scope::global(),
            body,
        }
    }

    /// Collects the function declarations that belong to the top level, in
    /// source order.
    ///
    /// Declarations inside top-level blocks and loop bodies count; function
    /// bodies are not searched.
    pub fn global_functions(&self) -> Vec<&FunctionDeclaration> {
        let mut functions = Vec::new();
        for stmt in &self.body {
            collect_functions(stmt, &mut functions);
        }
        functions
    }
}

fn collect_functions<'a>(stmt: &'a Statement, functions: &mut Vec<&'a FunctionDeclaration>) {
    match stmt {
        Statement::FunctionDeclaration(func) => functions.push(func),
        Statement::Block(block) => {
            for inner in &block.body {
                collect_functions(inner, functions);
            }
        }
        Statement::While(while_stmt) => collect_functions(&while_stmt.body, functions),
        _ => {}
    }
}

/// A variable reference, already classified by the scope resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    /// The name as written in the source
    pub name: String,
    /// Classification and addressing datum
    pub variable: Variable,
}

impl Identifier {
    /// Creates an identifier with the given classification.
    pub fn new(name: impl Into<String>, variable: Variable) -> Self {
        Self {
            name: name.into(),
            variable,
        }
    }

    /// Creates a global identifier.
    pub fn global(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            variable: Variable::Global(name.clone()),
            name,
        }
    }
}

/// A JavaScript statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(FunctionDeclaration),
    /// Expression statement
    Expression(ExpressionStatement),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// Switch statement
    Switch(SwitchStatement),
    /// While statement
    While(WhileStatement),
    /// Do-while statement
    DoWhile(DoWhileStatement),
    /// For statement
    For(ForStatement),
    /// For-in statement
    ForIn(ForInStatement),
    /// Return statement
    Return(ReturnStatement),
    /// Break statement
    Break,
    /// Break with label
    BreakLabel(String),
    /// Continue statement
    Continue,
    /// Continue with label
    ContinueLabel(String),
    /// Throw statement
    Throw(ThrowStatement),
    /// Try statement
    Try(TryStatement),
    /// With statement
    With(WithStatement),
    /// Labeled statement
    Labeled(LabeledStatement),
    /// Debugger statement
    Debugger,
    /// Empty statement (;)
    Empty,
}

impl Statement {
    /// Node kind name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::VariableDeclaration(_) => "VariableDeclaration",
            Statement::FunctionDeclaration(_) => "FunctionDeclaration",
            Statement::Expression(_) => "ExpressionStatement",
            Statement::Block(_) => "BlockStatement",
            Statement::If(_) => "IfStatement",
            Statement::Switch(_) => "SwitchStatement",
            Statement::While(_) => "WhileStatement",
            Statement::DoWhile(_) => "DoWhileStatement",
            Statement::For(_) => "ForStatement",
            Statement::ForIn(_) => "ForInStatement",
            Statement::Return(_) => "ReturnStatement",
            Statement::Break => "BreakStatement",
            Statement::BreakLabel(_) => "labeled BreakStatement",
            Statement::Continue => "ContinueStatement",
            Statement::ContinueLabel(_) => "labeled ContinueStatement",
            Statement::Throw(_) => "ThrowStatement",
            Statement::Try(_) => "TryStatement",
            Statement::With(_) => "WithStatement",
            Statement::Labeled(_) => "LabeledStatement",
            Statement::Debugger => "DebuggerStatement",
            Statement::Empty => "EmptyStatement",
        }
    }

    /// Wraps an expression into an expression statement.
    pub fn expression(expression: Expression) -> Self {
        Statement::Expression(ExpressionStatement { expression })
    }

    /// Creates a `var` declaration with a single declarator.
    pub fn var(id: Identifier, init: Option<Expression>) -> Self {
        Statement::VariableDeclaration(VariableDeclaration {
            kind: VariableKind::Var,
            declarations: vec![VariableDeclarator { id, init }],
        })
    }

    /// Creates a block statement.
    pub fn block(body: Vec<Statement>) -> Self {
        Statement::Block(BlockStatement { body })
    }

    /// Creates a while statement.
    pub fn while_loop(test: Expression, body: Statement) -> Self {
        Statement::While(WhileStatement {
            test,
            body: Box::new(body),
        })
    }

    /// Creates a return statement.
    pub fn ret(argument: Option<Expression>) -> Self {
        Statement::Return(ReturnStatement { argument })
    }
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarator {
    /// The identifier being declared
    pub id: Identifier,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// The function name
    pub name: String,
    /// The parameter names
    pub params: Vec<String>,
    /// The function body
    pub body: Vec<Statement>,
    /// The function's resolved scope
    pub scope: Scope,
    /// Source file name
    pub filename: String,
    /// Source line of the declaration
    pub lineno: u32,
}

/// An expression statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatement {
    /// The expression
    pub expression: Expression,
}

/// A block statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    /// The initializer
    pub init: Option<ForInit>,
    /// The condition
    pub test: Option<Expression>,
    /// The update expression
    pub update: Option<Expression>,
    /// The loop body
    pub body: Box<Statement>,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    /// Variable declaration
    Declaration(Box<VariableDeclaration>),
    /// Expression
    Expression(Expression),
}

/// A switch statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatement {
    /// The discriminant expression
    pub discriminant: Expression,
    /// The case clauses
    pub cases: Vec<SwitchCase>,
}

/// A switch case clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// The test expression (None for default)
    pub test: Option<Expression>,
    /// The consequent statements
    pub consequent: Vec<Statement>,
}

/// A do-while statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoWhileStatement {
    /// The loop body
    pub body: Box<Statement>,
    /// The condition
    pub test: Expression,
}

/// A for-in statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForInStatement {
    /// The left-hand side
    pub left: ForInLeft,
    /// The object to iterate over
    pub right: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// Left-hand side of for-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInLeft {
    /// Variable declaration
    Declaration(Box<VariableDeclaration>),
    /// Expression (identifier or member)
    Expression(Expression),
}

/// A return statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    /// The return value
    pub argument: Option<Expression>,
}

/// A throw statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowStatement {
    /// The thrown expression
    pub argument: Expression,
}

/// A try statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStatement {
    /// The try block
    pub block: BlockStatement,
    /// The catch clause
    pub handler: Option<CatchClause>,
    /// The finally block
    pub finalizer: Option<BlockStatement>,
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// The error parameter
    pub param: Option<String>,
    /// The catch body
    pub body: BlockStatement,
}

/// A with statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithStatement {
    /// The object expression
    pub object: Expression,
    /// The body statement
    pub body: Box<Statement>,
}

/// A labeled statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledStatement {
    /// The label
    pub label: String,
    /// The labeled body
    pub body: Box<Statement>,
}

/// A JavaScript expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Variable reference
    Identifier(Identifier),
    /// this keyword
    This,
    /// Array literal
    Array(ArrayExpression),
    /// Object literal
    Object(ObjectExpression),
    /// Binary expression
    Binary(BinaryExpression),
    /// Unary expression
    Unary(UnaryExpression),
    /// Assignment expression
    Assignment(AssignmentExpression),
    /// Call expression
    Call(CallExpression),
    /// Member access expression
    Member(MemberExpression),
    /// Conditional (ternary) expression
    Conditional(ConditionalExpression),
    /// Function expression
    Function(FunctionExpression),
    /// new expression
    New(NewExpression),
    /// Update expression (++/--)
    Update(UpdateExpression),
    /// Sequence expression (comma operator)
    Sequence(SequenceExpression),
    /// Parenthesized expression
    Paren(Box<Expression>),
}

impl Expression {
    /// Node kind name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Literal(Literal::RegExp { .. }) => "RegExpLiteral",
            Expression::Literal(_) => "Literal",
            Expression::Identifier(_) => "Identifier",
            Expression::This => "ThisExpression",
            Expression::Array(_) => "ArrayExpression",
            Expression::Object(_) => "ObjectExpression",
            Expression::Binary(_) => "BinaryExpression",
            Expression::Unary(_) => "UnaryExpression",
            Expression::Assignment(_) => "AssignmentExpression",
            Expression::Call(_) => "CallExpression",
            Expression::Member(member) if member.computed => "bracket MemberExpression",
            Expression::Member(_) => "MemberExpression",
            Expression::Conditional(_) => "ConditionalExpression",
            Expression::Function(_) => "FunctionExpression",
            Expression::New(_) => "NewExpression",
            Expression::Update(_) => "UpdateExpression",
            Expression::Sequence(_) => "SequenceExpression",
            Expression::Paren(_) => "ParenthesizedExpression",
        }
    }

    /// Numeric literal.
    pub fn number(value: f64) -> Self {
        Expression::Literal(Literal::Number(value))
    }

    /// String literal from its quoted source text.
    pub fn string(raw: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(raw.into()))
    }

    /// Variable reference.
    pub fn ident(name: impl Into<String>, variable: Variable) -> Self {
        Expression::Identifier(Identifier::new(name, variable))
    }

    /// Binary expression.
    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Dotted property access `object.name`.
    pub fn member(object: Expression, name: impl Into<String>) -> Self {
        Expression::Member(MemberExpression {
            object: Box::new(object),
            property: MemberProperty::Identifier(name.into()),
            computed: false,
        })
    }

    /// Call expression.
    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call(CallExpression {
            callee: Box::new(callee),
            arguments,
        })
    }

    /// Plain `=` assignment.
    pub fn assign(left: Expression, right: Expression) -> Self {
        Expression::Assignment(AssignmentExpression {
            operator: AssignmentOperator::Assign,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Postfix `++`.
    pub fn postfix_increment(argument: Expression) -> Self {
        Expression::Update(UpdateExpression {
            operator: UpdateOperator::Increment,
            argument: Box::new(argument),
            prefix: false,
        })
    }

    /// Ternary conditional.
    pub fn conditional(test: Expression, consequent: Expression, alternate: Expression) -> Self {
        Expression::Conditional(ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric literal
    Number(f64),
    /// String literal, as quoted source text with escapes still encoded
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
    /// Regular expression literal
    RegExp { pattern: String, flags: String },
}

/// An array expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayExpression {
    /// The elements (None represents a hole)
    pub elements: Vec<Option<Expression>>,
}

/// An object expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectExpression {
    /// The properties
    pub properties: Vec<Property>,
}

/// An object property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// The property key
    pub key: String,
    /// The property value
    pub value: Expression,
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    // Comparison
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    // Logical
    LogicalAnd,
    LogicalOr,
    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    // Other
    In,
    InstanceOf,
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The left-hand side
    pub left: Box<Expression>,
    /// The right-hand side
    pub right: Box<Expression>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    BitwiseAndAssign,
    BitwiseOrAssign,
    BitwiseXorAssign,
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpression {
    /// The function being called
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
    /// Whether this is computed (bracket notation)
    pub computed: bool,
}

/// Member property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberProperty {
    /// Identifier property
    Identifier(String),
    /// Computed property expression
    Expression(Box<Expression>),
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpression {
    /// The condition
    pub test: Box<Expression>,
    /// The consequent (if true)
    pub consequent: Box<Expression>,
    /// The alternate (if false)
    pub alternate: Box<Expression>,
}

/// A function expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpression {
    /// Optional name
    pub name: Option<String>,
    /// Parameters
    pub params: Vec<String>,
    /// Body
    pub body: Vec<Statement>,
}

/// A new expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpression {
    /// The constructor
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

/// An update expression (++/--)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// The operand
    pub argument: Box<Expression>,
    /// Whether prefix (++x) or postfix (x++)
    pub prefix: bool,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// A sequence expression (comma operator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceExpression {
    /// The expressions
    pub expressions: Vec<Expression>,
}
