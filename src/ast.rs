//! AST node shapes delivered by the (out-of-scope) grammar/parser front end.
//!
//! These mirror `examples/original_source/src/ast_definition.py`'s node
//! kinds one for one; `main.rs` loads a tree of these from a `*.ast.json`
//! file rather than parsing concrete syntax (spec.md §1/§6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module(pub Block);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block(pub Vec<Statement>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedIdent {
    pub name: String,
    pub ty: TypeNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Statement {
    Expression(Expression),
    Assignment {
        lvalue: Expression,
        rvalue: Expression,
    },
    VarDeclaration {
        name: String,
        ty: TypeNode,
        init: Option<Expression>,
    },
    If {
        cond: Expression,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    While {
        cond: Expression,
        body: Block,
    },
    NamedBlock {
        name: String,
        body: Block,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expression {
    Number(i128),
    Identifier(String),
    BinaryOp {
        left: Box<Expression>,
        op: String,
        right: Box<Expression>,
    },
    FunctionDeclare {
        params: Vec<TypedIdent>,
        return_type: TypeNode,
        body: Block,
    },
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    StructValue {
        fields: Vec<(String, Expression)>,
    },
    FieldLookup {
        object: Box<Expression>,
        field: String,
    },
}

/// The `T`-shaped AST nodes (spec.md §6: "Type kinds"). `Uninit` is kept in
/// the enum to match the external node shape the grammar is expected to
/// produce, but never denotes a resolvable type in practice — a declaration
/// without an initializer is expressed as `VarDeclaration::init == None`,
/// not by this variant appearing in type-annotation position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeNode {
    Type(String),
    FunctionType {
        args: Vec<TypeNode>,
        ret: Box<TypeNode>,
    },
    StructureType {
        fields: Vec<(String, TypeNode)>,
    },
    Infer,
    NoReturn,
    Uninit,
}
