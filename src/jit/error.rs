//! Error taxonomy for the JIT back end, styled after
//! `backend/bytecode/jit/types/error.rs::JitError` in the teacher crate:
//! a hand-rolled enum, manual `Display`, `impl std::error::Error`, a
//! `Result` type alias per error kind.

use std::fmt;

/// Raised by the emitter when a function's body touches a construct the
/// JIT doesn't lower. Non-fatal: the caller keeps the function
/// interpreter-only and logs the reason (spec.md §7).
#[derive(Debug, Clone)]
pub enum JitError {
    NotImplemented(String),
    ImmediateOutOfRange(i128),
}

impl fmt::Display for JitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitError::NotImplemented(what) => write!(f, "not jit-compilable: {what}"),
            JitError::ImmediateOutOfRange(n) => {
                write!(f, "integer literal {n} does not fit a 64-bit immediate")
            }
        }
    }
}

impl std::error::Error for JitError {}

pub type JitResult<T> = Result<T, JitError>;

/// Raised by the engine itself: writing the assembly file, invoking the
/// system assembler/linker, or loading the resulting shared object.
/// Fatal by spec.md §7 — unlike `JitError`, this aborts the whole run.
#[derive(Debug)]
pub enum EngineError {
    Io(std::io::Error),
    Assembler(String),
    Link(libloading::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Io(e) => write!(f, "jit engine i/o error: {e}"),
            EngineError::Assembler(stderr) => {
                write!(f, "assembler/linker invocation failed:\n{stderr}")
            }
            EngineError::Link(e) => write!(f, "could not load jitted shared object: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Whole-function compilation can fail in either layer; `compile_function`
/// needs to tell its caller which one happened, since `Jit` is recoverable
/// (stay interpreted) and `Engine` is fatal.
#[derive(Debug)]
pub enum CompileError {
    Jit(JitError),
    Engine(EngineError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Jit(e) => write!(f, "{e}"),
            CompileError::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Raised at an individual thunk call: an argument or return value that
/// can't be represented across the foreign-call boundary, an arity
/// mismatch, or a symbol lookup failure. Non-fatal: the shadow harness (or
/// the plain JIT call site, when shadow mode is off) falls back to the
/// interpreter for that one call.
#[derive(Debug, Clone)]
pub enum ThunkError {
    ArityMismatch { expected: usize, got: usize },
    Unrepresentable(String),
}

impl fmt::Display for ThunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThunkError::ArityMismatch { expected, got } => {
                write!(f, "jit thunk expected {expected} arguments, got {got}")
            }
            ThunkError::Unrepresentable(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ThunkError {}
