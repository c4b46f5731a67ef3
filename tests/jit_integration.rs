//! Drives a real `JitEngine` end to end: emit assembly, shell out to `gcc
//! -shared`, `dlopen` the result, and call the compiled thunk through the
//! shadow harness, asserting it agrees with the interpreter (spec.md §8
//! properties 1 and 7, scenario 6). Requires a system `gcc` on `PATH`, so
//! these are `#[ignore]`d by default; run with `cargo test -- --ignored`
//! on a machine that has one.

use std::cell::RefCell;
use std::rc::Rc;

use jil_core::ast::{Block, Expression, Statement, TypeNode};
use jil_core::config::Config;
use jil_core::interp::builtins::build_builtin_env;
use jil_core::interp::eval::{eval_expression, Runtime};
use jil_core::jit::JitEngine;
use jil_core::value::{FunctionBody, FunctionValue, ReturnType, Type, Value};

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

fn jit_runtime(cache_dir: &std::path::Path) -> Runtime {
    let engine = JitEngine::with_system_assembler(cache_dir).expect("jit engine construction");
    Runtime::new(Config::default(), Some(Rc::new(RefCell::new(engine))))
}

/// Scenario 6: `sum`'s interpreted result and its jitted result agree, and
/// the shadow harness actually took the jit path (not a silent fallback).
#[test]
#[ignore = "shells out to gcc"]
fn sum_via_while_agrees_between_interpreter_and_jit() {
    let dir = tempfile::tempdir().unwrap();
    let env = build_builtin_env();
    let mut rt = jit_runtime(dir.path());

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
    let result = eval_expression(&call, &env, &mut rt).unwrap();
    assert_eq!(result, Value::Int(55));
    assert_eq!(rt.shadow_stats.divergences, 0);
    assert_eq!(rt.shadow_stats.fallbacks, 0);
    assert_eq!(rt.shadow_stats.jit_calls, 1);
}

/// Regression: `1 + 2 * n` nests a call to the `mul` stencil inside an
/// argument of the `add` stencil call. Before argument marshalling was
/// fixed to evaluate every argument before moving any of them into ABI
/// registers, the `mul` call clobbered `%rdi` (holding `add`'s first
/// argument, `1`) before `add` ran, and the jit thunk silently returned the
/// wrong value while the interpreter stayed correct.
#[test]
#[ignore = "shells out to gcc"]
fn nested_stencil_call_does_not_clobber_outer_argument() {
    let dir = tempfile::tempdir().unwrap();
    let env = build_builtin_env();
    let mut rt = jit_runtime(dir.path());

    let f_body = Block(vec![Statement::Expression(binop(
        num(1),
        "+",
        binop(num(2), "*", Expression::Identifier("n".into())),
    ))]);
    let f_fn = Value::Function(Rc::new(FunctionValue {
        params: vec![("n".into(), Type::Int)],
        return_type: ReturnType::Value(Type::Int),
        body: FunctionBody::User(f_body),
        jit_thunk: RefCell::new(None),
        jit_label: RefCell::new(None),
    }));
    env.set("f".into(), f_fn, Type::Int);

    let call = Expression::FunctionCall {
        name: "f".into(),
        args: vec![num(5)],
    };
    let result = eval_expression(&call, &env, &mut rt).unwrap();
    assert_eq!(result, Value::Int(11));
    assert_eq!(rt.shadow_stats.divergences, 0);
    assert_eq!(rt.shadow_stats.fallbacks, 0);
    assert_eq!(rt.shadow_stats.jit_calls, 1);
}

/// Regression for the branch-local stack-slot drift: an `if`/`else` whose
/// branches declare unequal numbers of locals must still agree with the
/// interpreter on both the taken-then and taken-else paths.
#[test]
#[ignore = "shells out to gcc"]
fn unequal_branch_locals_agree_on_both_arms() {
    let dir = tempfile::tempdir().unwrap();
    let env = build_builtin_env();
    let mut rt = jit_runtime(dir.path());

    // fn h(p: int) -> int: if p: { let a: int = 1; a } else: { let b: int = 2; b + p }
    let h_body = Block(vec![Statement::If {
        cond: Expression::Identifier("p".into()),
        then_branch: Block(vec![
            Statement::VarDeclaration {
                name: "a".into(),
                ty: TypeNode::Type("int".into()),
                init: Some(num(1)),
            },
            Statement::Expression(Expression::Identifier("a".into())),
        ]),
        else_branch: Some(Block(vec![
            Statement::VarDeclaration {
                name: "b".into(),
                ty: TypeNode::Type("int".into()),
                init: Some(num(2)),
            },
            Statement::Expression(binop(
                Expression::Identifier("b".into()),
                "+",
                Expression::Identifier("p".into()),
            )),
        ])),
    }]);
    let h_fn = Value::Function(Rc::new(FunctionValue {
        params: vec![("p".into(), Type::Int)],
        return_type: ReturnType::Value(Type::Int),
        body: FunctionBody::User(h_body),
        jit_thunk: RefCell::new(None),
        jit_label: RefCell::new(None),
    }));
    env.set("h".into(), h_fn, Type::Int);

    let call_true = Expression::FunctionCall {
        name: "h".into(),
        args: vec![num(1)],
    };
    assert_eq!(eval_expression(&call_true, &env, &mut rt).unwrap(), Value::Int(1));

    let call_false = Expression::FunctionCall {
        name: "h".into(),
        args: vec![num(0)],
    };
    assert_eq!(eval_expression(&call_false, &env, &mut rt).unwrap(), Value::Int(2));

    assert_eq!(rt.shadow_stats.divergences, 0);
    assert_eq!(rt.shadow_stats.fallbacks, 0);
}
