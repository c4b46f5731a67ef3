//! jil-core - tree-walking interpreter + per-function x86-64 JIT with a
//! shadow-execution harness for a small imperative language.
//!
//! # Architecture
//!
//! The AST (`ast` module) is produced by an out-of-scope grammar/parser
//! front end; this crate consumes it. Evaluation has two cooperating
//! back ends:
//!
//! 1. **Interpreter** (`interp` module) - a recursive tree-walking
//!    evaluator over a lexically scoped, typed `Environment`. Always
//!    correct, always available, and the sole back end for constructs the
//!    JIT doesn't cover (structs, recursion through non-stencil calls,
//!    non-`int` locals).
//! 2. **JIT** (`jit` module) - on a user function's first call, lowers its
//!    body to System V AMD64 assembly text, assembles it into a shared
//!    object via an external assembler/linker, `dlopen`s the result, and
//!    attaches a callable `JitThunk` to the function value. Unsupported
//!    constructs raise a recoverable error and the function stays
//!    interpreter-only.
//!
//! The `shadow` module ties the two together: every JIT-eligible call runs
//! both paths, compares results, and falls back to the interpreter's
//! result whenever the thunk can't complete the call.
//!
//! # Example
//!
//! ```rust
//! use jil_core::ast::{Block, Expression, Module, Statement, TypedIdent, TypeNode};
//! use jil_core::config::Config;
//! use jil_core::interp::builtins::build_builtin_env;
//! use jil_core::interp::eval::{eval_module, Runtime};
//!
//! // print(1 + 2 * 3)
//! let module = Module(Block(vec![Statement::Expression(Expression::FunctionCall {
//!     name: "print".into(),
//!     args: vec![Expression::BinaryOp {
//!         left: Box::new(Expression::Number(1)),
//!         op: "+".into(),
//!         right: Box::new(Expression::BinaryOp {
//!             left: Box::new(Expression::Number(2)),
//!             op: "*".into(),
//!             right: Box::new(Expression::Number(3)),
//!         }),
//!     }],
//! })]));
//!
//! let env = build_builtin_env();
//! let mut rt = Runtime::new(Config { jit_enabled: false, ..Config::default() }, None);
//! eval_module(&module, &env, &mut rt).unwrap(); // prints "7"
//! # let _ = TypedIdent { name: "unused".into(), ty: TypeNode::Type("int".into()) };
//! ```

pub mod ast;
pub mod config;
pub mod environment;
pub mod interp;
pub mod jit;
pub mod shadow;
pub mod value;

pub use config::Config;
pub use interp::eval::Runtime;
