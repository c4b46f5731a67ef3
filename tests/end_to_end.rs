//! End-to-end interpreter scenarios built directly against AST nodes, since
//! the grammar/parser front end is out of scope for this crate (spec.md
//! §1/§6). Mirrors the shape of the teacher's `tests/peano_numbers.rs`:
//! build a small program, run it through the public API, assert on the
//! resulting values.
//!
//! These all run with the JIT engine absent (`Runtime::new(cfg, None)`) so
//! they exercise the interpreter in isolation and don't depend on `gcc`
//! being available in the test environment; the interpreter/JIT agreement
//! properties are covered separately in `src/shadow.rs`'s unit tests and
//! `src/jit/emitter.rs`'s compilation tests.

use std::cell::RefCell;
use std::rc::Rc;

use jil_core::ast::{Block, Expression, Module, Statement, TypeNode, TypedIdent};
use jil_core::config::Config;
use jil_core::interp::builtins::build_builtin_env;
use jil_core::interp::eval::{eval_expression, eval_module, Runtime};
use jil_core::value::{FunctionBody, FunctionValue, ReturnType, Type, Value};

fn interp_only_runtime() -> Runtime {
    Runtime::new(
        Config {
            jit_enabled: false,
            ..Config::default()
        },
        None,
    )
}

fn num(n: i128) -> Expression {
    Expression::Number(n)
}

fn binop(left: Expression, op: &str, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op: op.to_string(),
        right: Box::new(right),
    }
}

/// Scenario 1: `1 + 2 * 3` evaluates to `7`.
#[test]
fn arithmetic_precedence() {
    let env = build_builtin_env();
    let mut rt = interp_only_runtime();
    let expr = binop(num(1), "+", binop(num(2), "*", num(3)));
    assert_eq!(eval_expression(&expr, &env, &mut rt).unwrap(), Value::Int(7));
}

/// Scenario 2: `fn sum(n: int) -> int: let s: int = 0; while n > 0: s = s +
/// n; n = n - 1; s` called with `n = 10` returns `55`.
#[test]
fn function_with_while_loop_accumulates() {
    let env = build_builtin_env();
    let mut rt = interp_only_runtime();

    let sum_body = Block(vec![
        Statement::VarDeclaration {
            name: "s".into(),
            ty: TypeNode::Type("int".into()),
            init: Some(num(0)),
        },
        Statement::While {
            cond: binop(Expression::Identifier("n".into()), ">", num(0)),
            body: Block(vec![
                Statement::Assignment {
                    lvalue: Expression::Identifier("s".into()),
                    rvalue: binop(
                        Expression::Identifier("s".into()),
                        "+",
                        Expression::Identifier("n".into()),
                    ),
                },
                Statement::Assignment {
                    lvalue: Expression::Identifier("n".into()),
                    rvalue: binop(Expression::Identifier("n".into()), "-", num(1)),
                },
            ]),
        },
        Statement::Expression(Expression::Identifier("s".into())),
    ]);

    let sum_fn = Value::Function(Rc::new(FunctionValue {
        params: vec![("n".into(), Type::Int)],
        return_type: ReturnType::Value(Type::Int),
        body: FunctionBody::User(sum_body),
        jit_thunk: RefCell::new(None),
        jit_label: RefCell::new(None),
    }));
    env.set("sum".into(), sum_fn, Type::Int);

    let call = Expression::FunctionCall {
        name: "sum".into(),
        args: vec![num(10)],
    };
    assert_eq!(eval_expression(&call, &env, &mut rt).unwrap(), Value::Int(55));
}

/// Scenario 3: `fn fact(n: int) -> int: if n <= 1: 1 else: n * fact(n - 1)`
/// applied to `5` returns `120`. Recursion always stays interpreter-only
/// (the JIT never compiles calls to user-defined functions, spec.md §4.3).
#[test]
fn recursive_factorial() {
    let env = build_builtin_env();
    let mut rt = interp_only_runtime();

    let fact_body = Block(vec![Statement::If {
        cond: binop(Expression::Identifier("n".into()), "<=", num(1)),
        then_branch: Block(vec![Statement::Expression(num(1))]),
        else_branch: Some(Block(vec![Statement::Expression(binop(
            Expression::Identifier("n".into()),
            "*",
            Expression::FunctionCall {
                name: "fact".into(),
                args: vec![binop(Expression::Identifier("n".into()), "-", num(1))],
            },
        ))])),
    }]);
    let fact_fn = Value::Function(Rc::new(FunctionValue {
        params: vec![("n".into(), Type::Int)],
        return_type: ReturnType::Value(Type::Int),
        body: FunctionBody::User(fact_body),
        jit_thunk: RefCell::new(None),
        jit_label: RefCell::new(None),
    }));
    env.set("fact".into(), fact_fn, Type::Int);

    let call = Expression::FunctionCall {
        name: "fact".into(),
        args: vec![num(5)],
    };
    assert_eq!(eval_expression(&call, &env, &mut rt).unwrap(), Value::Int(120));
}

/// Scenario 4: the six comparison operators, each yielding `Int(0)` or
/// `Int(1)`.
#[test]
fn comparison_operators_yield_zero_or_one() {
    let env = build_builtin_env();
    let mut rt = interp_only_runtime();
    let cases = [
        (binop(num(3), "<", num(5)), 1),
        (binop(num(5), "<=", num(5)), 1),
        (binop(num(7), ">", num(2)), 1),
        (binop(num(2), "!=", num(2)), 0),
        (binop(num(2), ">=", num(9)), 0),
        (binop(num(4), "==", num(4)), 1),
    ];
    for (expr, expected) in cases {
        assert_eq!(
            eval_expression(&expr, &env, &mut rt).unwrap(),
            Value::Int(expected)
        );
    }
}

/// Scenario 5: `let p = { x: 1, y: 2 }; p.x + p.y` evaluates to `3`.
/// Structs are interpreter-only (spec.md §1 non-goals).
#[test]
fn struct_literal_and_field_lookup() {
    let env = build_builtin_env();
    let mut rt = interp_only_runtime();

    let decl = Statement::VarDeclaration {
        name: "p".into(),
        ty: TypeNode::StructureType {
            fields: vec![
                ("x".into(), TypeNode::Type("int".into())),
                ("y".into(), TypeNode::Type("int".into())),
            ],
        },
        init: Some(Expression::StructValue {
            fields: vec![("x".into(), num(1)), ("y".into(), num(2))],
        }),
    };
    let module = Module(Block(vec![decl]));
    eval_module(&module, &env, &mut rt).unwrap();

    let sum = binop(
        Expression::FieldLookup {
            object: Box::new(Expression::Identifier("p".into())),
            field: "x".into(),
        },
        "+",
        Expression::FieldLookup {
            object: Box::new(Expression::Identifier("p".into())),
            field: "y".into(),
        },
    );
    assert_eq!(eval_expression(&sum, &env, &mut rt).unwrap(), Value::Int(3));
}

/// `if`/`else` branches run in a child environment: a `let` inside a branch
/// does not leak into the enclosing scope (spec.md §4.1).
#[test]
fn if_branch_declarations_do_not_leak() {
    let env = build_builtin_env();
    let mut rt = interp_only_runtime();
    let module = Module(Block(vec![Statement::If {
        cond: num(1),
        then_branch: Block(vec![Statement::VarDeclaration {
            name: "local".into(),
            ty: TypeNode::Type("int".into()),
            init: Some(num(42)),
        }]),
        else_branch: None,
    }]));
    eval_module(&module, &env, &mut rt).unwrap();
    assert!(env.get("local").is_err());
}

/// A function declaration resolves its parameter/return types against the
/// *declaration-time* environment (spec.md §3 invariant 3), not the
/// call-site environment.
#[test]
fn function_value_param_types_resolved_at_declaration() {
    let env = build_builtin_env();
    let mut rt = interp_only_runtime();
    let decl = Expression::FunctionDeclare {
        params: vec![TypedIdent {
            name: "x".into(),
            ty: TypeNode::Type("u64".into()),
        }],
        return_type: TypeNode::Type("u64".into()),
        body: Block(vec![Statement::Expression(Expression::Identifier("x".into()))]),
    };
    let f = eval_expression(&decl, &env, &mut rt).unwrap();
    let Value::Function(f) = f else { panic!("expected a function value") };
    assert_eq!(f.params, vec![("x".to_string(), Type::U64)]);
    assert_eq!(f.return_type, ReturnType::Value(Type::U64));
}
