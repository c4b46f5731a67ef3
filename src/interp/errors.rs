//! Interpreter error taxonomy, styled after the teacher's `LoadError`/
//! `NativeError`/`VmError` enums: hand-rolled, manual `Display`, no
//! `thiserror`.

use std::fmt;

use crate::environment::EnvError;
use crate::value::CastError;

#[derive(Debug, Clone)]
pub enum InterpError {
    UnboundName(String),
    UndeclaredAssignment(String),
    Cast(CastError),
    ArityMismatch { expected: usize, got: usize },
    EmptyBlock,
    NotCallable(String),
    NotAStruct(String),
    FieldNotFound { field: String },
    DuplicateField(String),
    NotNumeric(String),
    NotImplemented(String),
    /// Carries the assembler/linker failure up from a fatal JIT build
    /// error (spec.md §7: fatal, unlike the recoverable `JitError`/
    /// `ThunkError` kinds).
    JitBuildFailed(String),
    /// Only reachable with `Config::strict_divergence` on.
    Divergence { interpreted: String, jitted: String },
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpError::UnboundName(n) => write!(f, "unbound name '{n}'"),
            InterpError::UndeclaredAssignment(n) => {
                write!(f, "assignment to undeclared name '{n}'")
            }
            InterpError::Cast(e) => write!(f, "{e}"),
            InterpError::ArityMismatch { expected, got } => {
                write!(f, "wrong number of arguments: expected {expected}, got {got}")
            }
            InterpError::EmptyBlock => write!(f, "a block must contain at least one statement"),
            InterpError::NotCallable(desc) => write!(f, "value is not callable: {desc}"),
            InterpError::NotAStruct(desc) => write!(f, "value is not a struct: {desc}"),
            InterpError::FieldNotFound { field } => write!(f, "no such field '{field}'"),
            InterpError::DuplicateField(name) => write!(f, "duplicate field name '{name}'"),
            InterpError::NotNumeric(desc) => {
                write!(f, "expected a numeric value, got: {desc}")
            }
            InterpError::NotImplemented(what) => write!(f, "not implemented: {what}"),
            InterpError::JitBuildFailed(msg) => write!(f, "jit build failed: {msg}"),
            InterpError::Divergence { interpreted, jitted } => write!(
                f,
                "jit and interpreter results diverged under strict mode: interpreted={interpreted}, jitted={jitted}"
            ),
        }
    }
}

impl std::error::Error for InterpError {}

impl From<CastError> for InterpError {
    fn from(e: CastError) -> Self {
        InterpError::Cast(e)
    }
}

impl From<EnvError> for InterpError {
    fn from(e: EnvError) -> Self {
        match e {
            EnvError::Unbound(n) => InterpError::UnboundName(n),
            EnvError::UndeclaredAssignment(n) => InterpError::UndeclaredAssignment(n),
        }
    }
}
