//! The runtime value domain `V` and type domain `T`.
//!
//! Grounded on `examples/original_source/src/runtime_values.py`
//! (`Number`, `Struct`, `Function`, `NoReturn`, `Uninit`, and their `cast`
//! methods) and on the teacher's error-enum style
//! (`backend/bytecode/jit/types/error.rs::JitError`).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Block;
use crate::jit::thunk::JitThunk;

/// Truncates a parsed literal magnitude to the 64-bit two's-complement bit
/// pattern shared by `Value::Int` and by the JIT emitter's immediate operand.
/// Keeping this in one place guarantees the interpreter and the JIT agree on
/// what `movq $n, %rax` actually loads, even for literals in
/// `2^63..2^64` that only make sense as unsigned text.
pub fn literal_to_i64(n: i128) -> i64 {
    n as i64
}

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    U64(u64),
    Struct(Vec<(String, Value)>),
    Function(Rc<FunctionValue>),
    NoReturn,
    Uninit,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::U64(_) => "u64",
            Value::Struct(_) => "struct",
            Value::Function(_) => "function",
            Value::NoReturn => "noreturn",
            Value::Uninit => "uninit",
        }
    }

    /// Strict same-dynamic-type equality, matching `Number.__eq__` in the
    /// prototype: `Int(1) != U64(1)` even though both carry `1`.
    pub fn val_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((an, av), (bn, bv))| an == bn && av.val_eq(bv))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NoReturn, Value::NoReturn) => true,
            (Value::Uninit, Value::Uninit) => true,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.val_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::U64(n) => write!(f, "{n}"),
            Value::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Function(_) => write!(f, "<function>"),
            Value::NoReturn => write!(f, "<noreturn>"),
            Value::Uninit => write!(f, "<uninit>"),
        }
    }
}

/// What a `Value::Function` actually calls when invoked by the interpreter.
///
/// Builtins (operators, `print`) are modeled as `Native` bodies rather than
/// as a separate `Value` variant, which keeps the formal value domain closed
/// to the six kinds in spec.md §3 while still letting binary-op dispatch and
/// user-function dispatch share one call path (spec.md §9: "operators as
/// ordinary bindings... keep this indirection").
#[derive(Debug, Clone)]
pub enum FunctionBody {
    User(Block),
    Native(NativeOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Print,
}

impl NativeOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            NativeOp::Add => "+",
            NativeOp::Sub => "-",
            NativeOp::Mul => "*",
            NativeOp::Div => "/",
            NativeOp::Lt => "<",
            NativeOp::Le => "<=",
            NativeOp::Gt => ">",
            NativeOp::Ge => ">=",
            NativeOp::Eq => "==",
            NativeOp::Ne => "!=",
            NativeOp::Print => "print",
        }
    }

    /// The built-in stencil label a JIT-compiled binary op lowers a call to.
    /// `None` for `Print`, which the JIT never lowers (stdout is
    /// interpreter-only).
    pub fn stencil_label(&self) -> Option<&'static str> {
        match self {
            NativeOp::Add => Some("add"),
            NativeOp::Sub => Some("sub"),
            NativeOp::Mul => Some("mul"),
            NativeOp::Div => Some("div"),
            NativeOp::Lt => Some("lt"),
            NativeOp::Le => Some("lte"),
            NativeOp::Gt => Some("gt"),
            NativeOp::Ge => Some("gte"),
            NativeOp::Eq => Some("eq"),
            NativeOp::Ne => Some("neq"),
            NativeOp::Print => None,
        }
    }
}

impl fmt::Display for NativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A user (or native) callable. Shared via `Rc` so that one declaration can
/// be bound under several names without recompiling it twice; `jit_thunk` is
/// the out-of-band mutable slot spec.md §3 describes (`None` until
/// compilation succeeds, monotonic thereafter).
pub struct FunctionValue {
    pub params: Vec<(String, Type)>,
    pub return_type: ReturnType,
    pub body: FunctionBody,
    pub jit_thunk: RefCell<Option<JitThunk>>,
    pub jit_label: RefCell<Option<String>>,
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("jit_compiled", &self.jit_thunk.borrow().is_some())
            .finish()
    }
}

impl FunctionValue {
    pub fn native(op: NativeOp, arity: usize) -> Rc<FunctionValue> {
        let params = (0..arity)
            .map(|i| (format!("arg{i}"), Type::Int))
            .collect();
        Rc::new(FunctionValue {
            params,
            return_type: ReturnType::Value(Type::Int),
            body: FunctionBody::Native(op),
            jit_thunk: RefCell::new(None),
            jit_label: RefCell::new(None),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    U64,
    Struct(Vec<(String, Type)>),
    Function(Vec<Type>, Box<ReturnType>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnType {
    Value(Type),
    NoReturn,
}

#[derive(Debug, Clone)]
pub enum CastError {
    Expected { expected: &'static str, got: String },
    MissingField(String),
    DuplicateField(String),
    NoReturnViolation,
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastError::Expected { expected, got } => {
                write!(f, "expected a value castable to {expected}, got {got}")
            }
            CastError::MissingField(name) => write!(f, "missing struct field '{name}'"),
            CastError::DuplicateField(name) => write!(f, "duplicate struct field '{name}'"),
            CastError::NoReturnViolation => {
                write!(f, "expected a NoReturn value, got something else")
            }
        }
    }
}

impl std::error::Error for CastError {}

impl Type {
    pub fn cast(&self, v: Value) -> Result<Value, CastError> {
        match self {
            Type::Int => match v {
                Value::Int(n) => Ok(Value::Int(n)),
                Value::U64(n) => Ok(Value::Int(n as i64)),
                other => Err(CastError::Expected {
                    expected: "int",
                    got: other.type_name().to_string(),
                }),
            },
            Type::U64 => match v {
                Value::Int(n) => Ok(Value::U64(n as u64)),
                Value::U64(n) => Ok(Value::U64(n)),
                other => Err(CastError::Expected {
                    expected: "u64",
                    got: other.type_name().to_string(),
                }),
            },
            Type::Struct(fields) => match v {
                Value::Struct(actual) => {
                    let mut seen = std::collections::HashSet::new();
                    for (name, _) in fields {
                        if !seen.insert(name.as_str()) {
                            return Err(CastError::DuplicateField(name.clone()));
                        }
                    }
                    let mut out = Vec::with_capacity(fields.len());
                    for (name, ty) in fields {
                        let found = actual
                            .iter()
                            .find(|(n, _)| n == name)
                            .ok_or_else(|| CastError::MissingField(name.clone()))?;
                        out.push((name.clone(), ty.cast(found.1.clone())?));
                    }
                    Ok(Value::Struct(out))
                }
                other => Err(CastError::Expected {
                    expected: "struct",
                    got: other.type_name().to_string(),
                }),
            },
            Type::Function(..) => match v {
                Value::Function(f) => Ok(Value::Function(f)),
                other => Err(CastError::Expected {
                    expected: "function",
                    got: other.type_name().to_string(),
                }),
            },
        }
    }
}

impl ReturnType {
    pub fn cast(&self, v: Value) -> Result<Value, CastError> {
        match self {
            ReturnType::Value(t) => t.cast(v),
            ReturnType::NoReturn => match v {
                Value::NoReturn => Ok(Value::NoReturn),
                _ => Err(CastError::NoReturnViolation),
            },
        }
    }

    /// Wraps a raw 64-bit value returned from a JIT thunk's `rax` into the
    /// function's declared return type. Structs and function values never
    /// come back through a thunk (the emitter refuses to compile functions
    /// that touch either), so only the integer cases are reachable in
    /// practice; the others exist for completeness against `cast`.
    pub fn cast_from_raw(&self, raw: i64) -> Result<Value, CastError> {
        match self {
            ReturnType::Value(Type::Int) => Ok(Value::Int(raw)),
            ReturnType::Value(Type::U64) => Ok(Value::U64(raw as u64)),
            ReturnType::NoReturn => Ok(Value::NoReturn),
            ReturnType::Value(other) => Err(CastError::Expected {
                expected: "int or u64",
                got: format!("{other:?}"),
            }),
        }
    }
}
