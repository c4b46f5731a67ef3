//! Tree-walking evaluation (spec.md §4.1) plus the call-site dispatch that
//! ties the interpreter, the JIT engine, and the shadow harness together.
//! Grounded on `examples/original_source/src/interpreter.py`'s
//! `interpret_*` functions, including `interpret_func_call`'s
//! compile-on-first-call and dual-run-and-compare logic.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{info, trace, warn};

use crate::ast::{Block, Expression, Module, Statement, TypeNode};
use crate::config::Config;
use crate::environment::Environment;
use crate::jit::{self, JitEngine};
use crate::shadow::{self, ShadowStats};
use crate::value::{FunctionBody, FunctionValue, ReturnType, Type, Value};

use super::errors::InterpError;

/// Everything a call site needs beyond the AST and the environment: the
/// configuration, the (optional) JIT engine, and the running shadow-harness
/// statistics. Threaded through every `eval_*` call by `&mut` reference.
pub struct Runtime {
    pub config: Config,
    pub engine: Option<Rc<RefCell<JitEngine>>>,
    pub shadow_stats: ShadowStats,
}

impl Runtime {
    pub fn new(config: Config, engine: Option<Rc<RefCell<JitEngine>>>) -> Runtime {
        Runtime {
            config,
            engine,
            shadow_stats: ShadowStats::default(),
        }
    }
}

pub fn eval_module(module: &Module, env: &Environment, rt: &mut Runtime) -> Result<(), InterpError> {
    eval_block(&module.0, env, rt)?;
    Ok(())
}

pub fn eval_block(block: &Block, env: &Environment, rt: &mut Runtime) -> Result<Value, InterpError> {
    if block.0.is_empty() {
        return Err(InterpError::EmptyBlock);
    }
    let mut result = Value::NoReturn;
    for stmt in &block.0 {
        result = eval_statement(stmt, env, rt)?;
    }
    Ok(result)
}

fn truthy(v: &Value) -> Result<bool, InterpError> {
    match v {
        Value::Int(n) => Ok(*n != 0),
        Value::U64(n) => Ok(*n != 0),
        other => Err(InterpError::NotNumeric(other.type_name().to_string())),
    }
}

pub fn eval_statement(stmt: &Statement, env: &Environment, rt: &mut Runtime) -> Result<Value, InterpError> {
    match stmt {
        Statement::Expression(e) => eval_expression(e, env, rt),

        Statement::VarDeclaration { name, ty, init } => {
            if matches!(ty, TypeNode::Infer) {
                return Err(InterpError::NotImplemented(
                    "type inference not implemented yet".into(),
                ));
            }
            let resolved = eval_type(ty, env)?;
            let value = match init {
                Some(e) => {
                    let v = eval_expression(e, env, rt)?;
                    resolved.cast(v)?
                }
                None => Value::Uninit,
            };
            env.set(name.clone(), value, resolved);
            Ok(Value::NoReturn)
        }

        Statement::Assignment { lvalue, rvalue } => {
            let name = match lvalue {
                Expression::Identifier(name) => name,
                _ => {
                    return Err(InterpError::NotImplemented(
                        "assigning to a non-identifier lvalue".into(),
                    ))
                }
            };
            let declared_ty = env.get_type(name)?;
            let v = eval_expression(rvalue, env, rt)?;
            let casted = declared_ty.cast(v)?;
            env.update(name, casted)?;
            Ok(Value::NoReturn)
        }

        Statement::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond_val = eval_expression(cond, env, rt)?;
            let child = Environment::child(env);
            if truthy(&cond_val)? {
                eval_block(then_branch, &child, rt)
            } else if let Some(else_block) = else_branch {
                eval_block(else_block, &child, rt)
            } else {
                Ok(Value::NoReturn)
            }
        }

        Statement::While { cond, body } => {
            // Same environment across iterations, not a child — matches
            // the JIT emitter's top-tested lowering (spec.md §9).
            while truthy(&eval_expression(cond, env, rt)?)? {
                eval_block(body, env, rt)?;
            }
            Ok(Value::NoReturn)
        }

        Statement::NamedBlock { .. } => Err(InterpError::NotImplemented(
            "named blocks are reserved for future use".into(),
        )),
    }
}

pub fn eval_expression(expr: &Expression, env: &Environment, rt: &mut Runtime) -> Result<Value, InterpError> {
    match expr {
        Expression::Number(n) => Ok(Value::Int(crate::value::literal_to_i64(*n))),

        Expression::Identifier(name) => Ok(env.get(name)?),

        Expression::BinaryOp { left, op, right } => {
            let a = eval_expression(left, env, rt)?;
            let b = eval_expression(right, env, rt)?;
            let callee = env.get(op)?;
            call_value(rt, &callee, vec![a, b], env)
        }

        Expression::FunctionCall { name, args } => {
            let arg_vals = args
                .iter()
                .map(|a| eval_expression(a, env, rt))
                .collect::<Result<Vec<_>, _>>()?;
            let callee = env.get(name)?;
            call_value(rt, &callee, arg_vals, env)
        }

        Expression::FunctionDeclare {
            params,
            return_type,
            body,
        } => {
            let resolved_params = params
                .iter()
                .map(|p| Ok((p.name.clone(), eval_type(&p.ty, env)?)))
                .collect::<Result<Vec<_>, InterpError>>()?;
            let resolved_ret = eval_return_type(return_type, env)?;
            Ok(Value::Function(Rc::new(FunctionValue {
                params: resolved_params,
                return_type: resolved_ret,
                body: FunctionBody::User(body.clone()),
                jit_thunk: RefCell::new(None),
                jit_label: RefCell::new(None),
            })))
        }

        Expression::StructValue { fields } => {
            let mut out = Vec::with_capacity(fields.len());
            let mut seen = std::collections::HashSet::new();
            for (name, e) in fields {
                if !seen.insert(name.as_str()) {
                    return Err(InterpError::DuplicateField(name.clone()));
                }
                out.push((name.clone(), eval_expression(e, env, rt)?));
            }
            Ok(Value::Struct(out))
        }

        Expression::FieldLookup { object, field } => {
            let obj = eval_expression(object, env, rt)?;
            match obj {
                Value::Struct(fields) => fields
                    .into_iter()
                    .find(|(n, _)| n == field)
                    .map(|(_, v)| v)
                    .ok_or_else(|| InterpError::FieldNotFound { field: field.clone() }),
                other => Err(InterpError::NotAStruct(other.type_name().to_string())),
            }
        }
    }
}

/// Resolves a `T`-position (non-return) type annotation. `NoReturn` is
/// rejected here — it only makes sense as a function's return type — and
/// `Infer`/`Uninit` never denote a concrete resolvable type.
fn eval_type(node: &TypeNode, env: &Environment) -> Result<Type, InterpError> {
    match node {
        TypeNode::Type(name) => match name.as_str() {
            "int" => Ok(Type::Int),
            "u64" => Ok(Type::U64),
            other => Err(InterpError::NotImplemented(format!("unknown type '{other}'"))),
        },
        TypeNode::StructureType { fields } => {
            let mut seen = std::collections::HashSet::new();
            let mut resolved = Vec::with_capacity(fields.len());
            for (name, ty) in fields {
                if !seen.insert(name.as_str()) {
                    return Err(InterpError::DuplicateField(name.clone()));
                }
                resolved.push((name.clone(), eval_type(ty, env)?));
            }
            Ok(Type::Struct(resolved))
        }
        TypeNode::FunctionType { args, ret } => {
            let resolved_args = args.iter().map(|a| eval_type(a, env)).collect::<Result<_, _>>()?;
            let resolved_ret = eval_return_type(ret, env)?;
            Ok(Type::Function(resolved_args, Box::new(resolved_ret)))
        }
        TypeNode::Infer => Err(InterpError::NotImplemented("type inference not implemented yet".into())),
        TypeNode::NoReturn => Err(InterpError::NotImplemented(
            "NoReturn is only valid as a function return type".into(),
        )),
        TypeNode::Uninit => Err(InterpError::NotImplemented(
            "Uninit does not denote a resolvable type".into(),
        )),
    }
}

fn eval_return_type(node: &TypeNode, env: &Environment) -> Result<ReturnType, InterpError> {
    match node {
        TypeNode::NoReturn => Ok(ReturnType::NoReturn),
        other => Ok(ReturnType::Value(eval_type(other, env)?)),
    }
}

fn call_value(rt: &mut Runtime, callee: &Value, args: Vec<Value>, caller_env: &Environment) -> Result<Value, InterpError> {
    match callee {
        Value::Function(f) => match &f.body {
            FunctionBody::Native(op) => op.call(&args),
            FunctionBody::User(_) => call_user_function(rt, f, args, caller_env),
        },
        other => Err(InterpError::NotCallable(other.type_name().to_string())),
    }
}

/// Builds the function body's runtime environment as a child of the
/// *call-site's* environment, not of any declaration-time closure — this
/// interpreter has no closures (spec.md §1 non-goals), so a function body's
/// lexical parent is whatever environment happened to be active at its
/// call site, exactly like `interpreter.py`'s `Environment(parent=env)`.
fn interpret_user_body(func: &Rc<FunctionValue>, args: &[Value], caller_env: &Environment, rt: &mut Runtime) -> Result<Value, InterpError> {
    let body = match &func.body {
        FunctionBody::User(b) => b,
        FunctionBody::Native(_) => unreachable!("native bodies never reach interpret_user_body"),
    };
    let new_env = Environment::child(caller_env);
    for ((name, ty), arg) in func.params.iter().zip(args.iter()) {
        let casted = ty.cast(arg.clone())?;
        new_env.set(name.clone(), casted, ty.clone());
    }
    let result = eval_block(body, &new_env, rt)?;
    Ok(func.return_type.cast(result)?)
}

fn call_user_function(rt: &mut Runtime, func: &Rc<FunctionValue>, args: Vec<Value>, caller_env: &Environment) -> Result<Value, InterpError> {
    if args.len() != func.params.len() {
        return Err(InterpError::ArityMismatch {
            expected: func.params.len(),
            got: args.len(),
        });
    }

    if rt.config.jit_enabled && func.jit_thunk.borrow().is_none() {
        if let Some(engine) = rt.engine.clone() {
            match jit::engine::compile_function(&engine, func, caller_env) {
                Ok(()) => {}
                Err(jit::CompileError::Jit(e)) => {
                    info!(error = %e, "function stays interpreter-only");
                }
                Err(jit::CompileError::Engine(e)) => {
                    return Err(InterpError::JitBuildFailed(e.to_string()));
                }
            }
        }
    }

    let has_thunk = func.jit_thunk.borrow().is_some();
    if rt.config.jit_enabled && has_thunk {
        if rt.config.shadow_enabled {
            // `shadow::run_dual`'s generic two-closure shape doesn't fit
            // here: the interpreter arm needs `&mut Runtime` to recurse
            // into further calls, which would alias a `&mut` borrow of
            // `rt.shadow_stats` taken for the same call. Both arms are run
            // directly instead, updating `rt.shadow_stats` by hand — the
            // same always-run-both, thunk-error-falls-back, divergence-
            // logged-or-strict algorithm `run_dual` implements and tests.
            let t0 = std::time::Instant::now();
            let interpreted = interpret_user_body(func, &args, caller_env, rt)?;
            trace!(elapsed = ?t0.elapsed(), "shadow: interpreter arm finished");
            rt.shadow_stats.interpreted += 1;

            let t1 = std::time::Instant::now();
            let jit_outcome = {
                let thunk = func.jit_thunk.borrow();
                thunk.as_ref().expect("checked has_thunk above").call(&args)
            };
            match jit_outcome {
                Ok(jitted) => {
                    trace!(elapsed = ?t1.elapsed(), "shadow: jit arm finished");
                    rt.shadow_stats.jit_calls += 1;
                    if jitted != interpreted {
                        rt.shadow_stats.divergences += 1;
                        warn!(
                            interpreted = %interpreted,
                            jitted = %jitted,
                            "shadow: jit and interpreter results diverged"
                        );
                        if rt.config.strict_divergence {
                            return Err(InterpError::Divergence {
                                interpreted: interpreted.to_string(),
                                jitted: jitted.to_string(),
                            });
                        }
                    }
                    return Ok(jitted);
                }
                Err(e) => {
                    rt.shadow_stats.fallbacks += 1;
                    info!(error = %e, "shadow: jit call failed, using interpreter result");
                    return Ok(interpreted);
                }
            }
        } else {
            let call_result = {
                let thunk = func.jit_thunk.borrow();
                thunk.as_ref().expect("checked has_thunk above").call(&args)
            };
            match call_result {
                Ok(v) => return Ok(v),
                Err(e) => info!(error = %e, "jit thunk failed, falling back to interpreter"),
            }
        }
    }

    interpret_user_body(func, &args, caller_env, rt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::builtins::build_builtin_env;

    fn fresh_runtime() -> Runtime {
        Runtime::new(Config { jit_enabled: false, ..Config::default() }, None)
    }

    fn parse_block(stmts: Vec<Statement>) -> Block {
        Block(stmts)
    }

    #[test]
    fn arithmetic_precedence_is_left_to_the_ast() {
        let env = build_builtin_env();
        let mut rt = fresh_runtime();
        // 1 + 2 * 3, with the AST already reflecting precedence as
        // BinaryOp(1, "+", BinaryOp(2, "*", 3))
        let expr = Expression::BinaryOp {
            left: Box::new(Expression::Number(1)),
            op: "+".into(),
            right: Box::new(Expression::BinaryOp {
                left: Box::new(Expression::Number(2)),
                op: "*".into(),
                right: Box::new(Expression::Number(3)),
            }),
        };
        assert_eq!(eval_expression(&expr, &env, &mut rt).unwrap(), Value::Int(7));
    }

    #[test]
    fn while_loop_shares_the_enclosing_environment() {
        let env = build_builtin_env();
        let mut rt = fresh_runtime();
        env.set("n".into(), Value::Int(0), Type::Int);
        let block = parse_block(vec![Statement::While {
            cond: Expression::BinaryOp {
                left: Box::new(Expression::Identifier("n".into())),
                op: "<".into(),
                right: Box::new(Expression::Number(5)),
            },
            body: Block(vec![Statement::Assignment {
                lvalue: Expression::Identifier("n".into()),
                rvalue: Expression::BinaryOp {
                    left: Box::new(Expression::Identifier("n".into())),
                    op: "+".into(),
                    right: Box::new(Expression::Number(1)),
                },
            }]),
        }]);
        eval_block(&block, &env, &mut rt).unwrap();
        assert_eq!(env.get("n").unwrap(), Value::Int(5));
    }

    #[test]
    fn declaration_initializer_cannot_see_its_own_slot() {
        let env = build_builtin_env();
        env.set("x".into(), Value::Int(99), Type::Int);
        let child = Environment::child(&env);
        let mut rt = fresh_runtime();
        let stmt = Statement::VarDeclaration {
            name: "x".into(),
            ty: TypeNode::Type("int".into()),
            init: Some(Expression::Identifier("x".into())),
        };
        eval_statement(&stmt, &child, &mut rt).unwrap();
        assert_eq!(child.get("x").unwrap(), Value::Int(99));
    }

    #[test]
    fn struct_field_sum() {
        let env = build_builtin_env();
        let mut rt = fresh_runtime();
        let expr = Expression::BinaryOp {
            left: Box::new(Expression::FieldLookup {
                object: Box::new(Expression::StructValue {
                    fields: vec![
                        ("x".into(), Expression::Number(1)),
                        ("y".into(), Expression::Number(2)),
                    ],
                }),
                field: "x".into(),
            }),
            op: "+".into(),
            right: Box::new(Expression::Number(2)),
        };
        assert_eq!(eval_expression(&expr, &env, &mut rt).unwrap(), Value::Int(3));
    }

    #[test]
    fn struct_literal_rejects_duplicate_field_names() {
        let env = build_builtin_env();
        let mut rt = fresh_runtime();
        let expr = Expression::StructValue {
            fields: vec![("x".into(), Expression::Number(1)), ("x".into(), Expression::Number(2))],
        };
        assert!(matches!(
            eval_expression(&expr, &env, &mut rt),
            Err(InterpError::DuplicateField(_))
        ));
    }

    #[test]
    fn recursive_function_call() {
        let env = build_builtin_env();
        let mut rt = fresh_runtime();
        // fact(n) = if n <= 1 { 1 } else { n * fact(n - 1) }
        let fact_body = Block(vec![Statement::If {
            cond: Expression::BinaryOp {
                left: Box::new(Expression::Identifier("n".into())),
                op: "<=".into(),
                right: Box::new(Expression::Number(1)),
            },
            then_branch: Block(vec![Statement::Expression(Expression::Number(1))]),
            else_branch: Some(Block(vec![Statement::Expression(Expression::BinaryOp {
                left: Box::new(Expression::Identifier("n".into())),
                op: "*".into(),
                right: Box::new(Expression::FunctionCall {
                    name: "fact".into(),
                    args: vec![Expression::BinaryOp {
                        left: Box::new(Expression::Identifier("n".into())),
                        op: "-".into(),
                        right: Box::new(Expression::Number(1)),
                    }],
                }),
            })])),
        }]);
        let fact = Value::Function(Rc::new(FunctionValue {
            params: vec![("n".into(), Type::Int)],
            return_type: ReturnType::Value(Type::Int),
            body: FunctionBody::User(fact_body),
            jit_thunk: RefCell::new(None),
            jit_label: RefCell::new(None),
        }));
        env.set("fact".into(), fact, Type::Int);
        let call = Expression::FunctionCall {
            name: "fact".into(),
            args: vec![Expression::Number(5)],
        };
        assert_eq!(eval_expression(&call, &env, &mut rt).unwrap(), Value::Int(120));
    }
}
