//! Translates one function's AST body into position-independent x86-64
//! assembly (spec.md §4.3). Grounded on
//! `examples/original_source/src/compile.py`, whose `JITEngine` class holds
//! the emitter described there — except that file's `compile_statement`
//! never actually lowers `ASTIfStatement`/`ASTWhileStatement` (both are
//! `NotImplementedError` stubs) and `compile_expression`'s `ASTBinaryOp`
//! case only dispatches `+ - * /`, never the six comparisons. This emitter
//! completes both, choosing top-tested `while` to match the interpreter
//! (spec.md §9).

use std::collections::HashMap;

use crate::ast::{Block, Expression, Statement, TypeNode};
use crate::environment::Environment;
use crate::value::{literal_to_i64, FunctionBody, FunctionValue, NativeOp, ReturnType, Type};

use super::context::{CompilationContext, LabelAllocator, Slot};
use super::error::{JitError, JitResult};

/// Compile-time name -> stack-slot mapping for one function's body. A stack
/// of frames rather than a parent-linked tree: every `if`/`else` branch
/// pushes a fresh frame and pops it on exit, `while`'s body reuses the
/// enclosing frame (same-environment semantics, matching the interpreter).
struct JitScope {
    frames: Vec<HashMap<String, Slot>>,
}

impl JitScope {
    fn new() -> Self {
        JitScope {
            frames: vec![HashMap::new()],
        }
    }

    fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn bind(&mut self, name: String, slot: Slot) {
        self.frames.last_mut().expect("at least one frame").insert(name, slot);
    }

    fn lookup(&self, name: &str) -> Option<Slot> {
        self.frames.iter().rev().find_map(|f| f.get(name).copied())
    }
}

fn literal_to_i64_checked(n: i128) -> JitResult<i64> {
    let min = -(1i128 << 63);
    let max = 1i128 << 64;
    if n <= min || n >= max {
        Err(JitError::ImmediateOutOfRange(n))
    } else {
        Ok(literal_to_i64(n))
    }
}

fn resolve_jit_type(ty: &TypeNode) -> JitResult<()> {
    match ty {
        TypeNode::Type(name) if name == "int" => Ok(()),
        other => Err(JitError::NotImplemented(format!(
            "jit only supports 'int' locals, got {other:?}"
        ))),
    }
}

/// Looks `name` up in the function's *declaration-time* environment and,
/// if it's bound to a native builtin, returns the fixed stencil label the
/// JIT should `call`. User-defined functions never have a stencil label:
/// calling one from jitted code is not implemented (matching
/// `compile.py::compile_function_call`'s `NotImplementedError` for any
/// non-builtin-string callee, which is why recursive functions always fall
/// back to the interpreter).
fn resolve_stencil_label(name: &str, env: &Environment) -> Option<&'static str> {
    match env.get(name) {
        Ok(crate::value::Value::Function(f)) => match &f.body {
            FunctionBody::Native(op) => op.stencil_label(),
            FunctionBody::User(_) => None,
        },
        _ => None,
    }
}

pub fn compile_function(
    func: &FunctionValue,
    decl_env: &Environment,
    label: &str,
    labels: &mut LabelAllocator,
) -> JitResult<String> {
    let block = match &func.body {
        FunctionBody::User(b) => b,
        FunctionBody::Native(_) => {
            return Err(JitError::NotImplemented(
                "builtins are linked directly, not compiled through the emitter".into(),
            ))
        }
    };

    if !matches!(func.return_type, ReturnType::Value(Type::Int)) {
        return Err(JitError::NotImplemented(
            "only int-returning functions are jit-compilable".into(),
        ));
    }

    let mut ctx = CompilationContext::new(label.to_string());
    let mut scope = JitScope::new();
    ctx.emit_prologue();

    for (i, (name, ty)) in func.params.iter().enumerate() {
        if *ty != Type::Int {
            return Err(JitError::NotImplemented(format!(
                "parameter '{name}' has non-int type, only int is jit-compilable"
            )));
        }
        let slot = ctx.alloc_slot();
        match CompilationContext::arg_register(i) {
            Some(reg) => ctx.emit(format!("movq {reg}, {}", slot.operand())),
            None => {
                let caller_offset = 16 + 8 * (i as i32 - 6);
                ctx.emit(format!("movq {caller_offset}(%rbp), %rax"));
                ctx.store_rax(slot);
            }
        }
        scope.bind(name.clone(), slot);
    }

    compile_block(block, decl_env, &mut ctx, &mut scope, labels)?;
    ctx.emit_epilogue();
    Ok(ctx.render())
}

fn compile_block(
    block: &Block,
    env: &Environment,
    ctx: &mut CompilationContext,
    scope: &mut JitScope,
    labels: &mut LabelAllocator,
) -> JitResult<()> {
    if block.0.is_empty() {
        return Err(JitError::NotImplemented("empty block has no value".into()));
    }
    for stmt in &block.0 {
        compile_statement(stmt, env, ctx, scope, labels)?;
    }
    Ok(())
}

fn compile_statement(
    stmt: &Statement,
    env: &Environment,
    ctx: &mut CompilationContext,
    scope: &mut JitScope,
    labels: &mut LabelAllocator,
) -> JitResult<()> {
    match stmt {
        Statement::Expression(e) => compile_expression(e, env, ctx, scope, labels),

        Statement::VarDeclaration { name, ty, init } => {
            resolve_jit_type(ty)?;
            match init {
                Some(e) => compile_expression(e, env, ctx, scope, labels)?,
                None => ctx.emit("xor %rax, %rax"),
            }
            // The slot is only bound *after* the initializer is compiled,
            // so the initializer can never observe its own (uninitialized)
            // slot — the "safer" option from spec.md §9.
            let slot = ctx.alloc_slot();
            ctx.store_rax(slot);
            scope.bind(name.clone(), slot);
            Ok(())
        }

        Statement::Assignment { lvalue, rvalue } => {
            let name = match lvalue {
                Expression::Identifier(name) => name,
                _ => {
                    return Err(JitError::NotImplemented(
                        "assigning to a non-identifier lvalue".into(),
                    ))
                }
            };
            compile_expression(rvalue, env, ctx, scope, labels)?;
            let slot = scope.lookup(name).ok_or_else(|| {
                JitError::NotImplemented(format!("assignment to unknown local '{name}'"))
            })?;
            ctx.store_rax(slot);
            Ok(())
        }

        Statement::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let end_label = labels.next("end_if");
            compile_expression(cond, env, ctx, scope, labels)?;
            ctx.emit("cmpq $0, %rax");
            // Only one arm runs at runtime, so each arm's locally-allocated
            // slots must be released (both the emitted `%rsp` adjustment and
            // the compile-time `stack_size` counter) before the join point -
            // otherwise an arm that declares fewer locals than its sibling
            // leaves `%rsp` and the compile-time slot offsets disagreeing
            // for everything lowered after the `if`.
            match else_branch {
                Some(else_block) => {
                    let false_label = labels.next("if_false");
                    ctx.emit(format!("je {false_label}"));
                    let mark = ctx.stack_mark();
                    scope.push();
                    compile_block(then_branch, env, ctx, scope, labels)?;
                    scope.pop();
                    ctx.release_to(mark);
                    ctx.emit(format!("jmp {end_label}"));
                    ctx.emit(format!("{false_label}:"));
                    scope.push();
                    compile_block(else_block, env, ctx, scope, labels)?;
                    scope.pop();
                    ctx.release_to(mark);
                }
                None => {
                    ctx.emit(format!("je {end_label}"));
                    let mark = ctx.stack_mark();
                    scope.push();
                    compile_block(then_branch, env, ctx, scope, labels)?;
                    scope.pop();
                    ctx.release_to(mark);
                }
            }
            ctx.emit(format!("{end_label}:"));
            Ok(())
        }

        Statement::While { cond, body } => {
            let cond_label = labels.next("while_cond");
            let end_label = labels.next("while_end");
            ctx.emit(format!("{cond_label}:"));
            compile_expression(cond, env, ctx, scope, labels)?;
            ctx.emit("cmpq $0, %rax");
            ctx.emit(format!("je {end_label}"));
            // Same scope as the enclosing block: a `let` inside the loop
            // body re-shadows on every iteration, matching the interpreter.
            compile_block(body, env, ctx, scope, labels)?;
            ctx.emit(format!("jmp {cond_label}"));
            ctx.emit(format!("{end_label}:"));
            Ok(())
        }

        Statement::NamedBlock { .. } => Err(JitError::NotImplemented(
            "named blocks are not jit-compilable".into(),
        )),
    }
}

fn compile_expression(
    expr: &Expression,
    env: &Environment,
    ctx: &mut CompilationContext,
    scope: &mut JitScope,
    labels: &mut LabelAllocator,
) -> JitResult<()> {
    match expr {
        Expression::Number(n) => {
            let v = literal_to_i64_checked(*n)?;
            ctx.emit(format!("movq ${v}, %rax"));
            Ok(())
        }

        Expression::Identifier(name) => {
            let slot = scope.lookup(name).ok_or_else(|| {
                JitError::NotImplemented(format!(
                    "identifier '{name}' is not available in jit scope"
                ))
            })?;
            ctx.load_to_rax(slot);
            Ok(())
        }

        Expression::BinaryOp { left, op, right } => {
            let label = resolve_stencil_label(op, env)
                .ok_or_else(|| JitError::NotImplemented(format!("operator '{op}' has no jit stencil")))?;
            compile_builtin_call(label, &[left.as_ref(), right.as_ref()], env, ctx, scope, labels)
        }

        Expression::FunctionCall { name, args } => {
            let label = resolve_stencil_label(name, env).ok_or_else(|| {
                JitError::NotImplemented(format!(
                    "calling user-defined function '{name}' from jit is not supported"
                ))
            })?;
            let arg_refs: Vec<&Expression> = args.iter().collect();
            compile_builtin_call(label, &arg_refs, env, ctx, scope, labels)
        }

        Expression::FunctionDeclare { .. } => Err(JitError::NotImplemented(
            "nested function declarations are not jit-compilable".into(),
        )),

        Expression::StructValue { .. } => Err(JitError::NotImplemented(
            "struct values are interpreter-only".into(),
        )),

        Expression::FieldLookup { .. } => Err(JitError::NotImplemented(
            "field lookup is interpreter-only".into(),
        )),
    }
}

/// Compiles `label(args...)`, a call to a two-register built-in stencil or
/// (in principle) any fixed-label callee that takes up to six integer
/// arguments.
///
/// Every argument is evaluated first, each result pushed onto the stack
/// right after it is computed, and only once all arguments are evaluated
/// are they popped into their ABI registers (in reverse order, since the
/// stack is LIFO). An argument expression can itself be a nested call
/// (e.g. the `2 * n` in `1 + 2 * n`) that needs the very same argument
/// registers for its own call — moving each result into its register
/// immediately, before later arguments are evaluated, would let that
/// nested call clobber an earlier argument still waiting in `%rdi`/`%rsi`.
/// Routing every argument through the stack first avoids that.
fn compile_builtin_call(
    label: &str,
    args: &[&Expression],
    env: &Environment,
    ctx: &mut CompilationContext,
    scope: &mut JitScope,
    labels: &mut LabelAllocator,
) -> JitResult<()> {
    if args.len() > 6 {
        return Err(JitError::NotImplemented(
            "more than six call arguments are not jit-compilable".into(),
        ));
    }
    for arg in args {
        compile_expression(arg, env, ctx, scope, labels)?;
        ctx.emit("push %rax");
    }
    for i in (0..args.len()).rev() {
        let reg = CompilationContext::arg_register(i).expect("arity checked above");
        ctx.emit(format!("pop {reg}"));
    }
    ctx.emit(format!("call {label}"));
    Ok(())
}
