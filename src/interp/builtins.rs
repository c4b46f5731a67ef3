//! The built-in environment: operator symbols and `print` bound as native
//! callables (spec.md §9: "operators as ordinary bindings"). Grounded on
//! `examples/original_source/src/interpreter.py`'s `BUILTIN_FUNCTIONS`
//! table and, for the arithmetic/comparison semantics, `jit_builtins.py`.

use crate::environment::Environment;
use crate::interp::errors::InterpError;
use crate::value::{FunctionValue, NativeOp, Type, Value};

pub fn build_builtin_env() -> Environment {
    let env = Environment::root();
    for op in [
        NativeOp::Add,
        NativeOp::Sub,
        NativeOp::Mul,
        NativeOp::Div,
        NativeOp::Lt,
        NativeOp::Le,
        NativeOp::Gt,
        NativeOp::Ge,
        NativeOp::Eq,
        NativeOp::Ne,
    ] {
        let f = FunctionValue::native(op, 2);
        let ty = Type::Function(vec![Type::Int, Type::Int], Box::new(f.return_type.clone()));
        env.set(op.symbol().to_string(), Value::Function(f), ty);
    }
    let print_fn = FunctionValue::native(NativeOp::Print, 0);
    env.set(
        "print".to_string(),
        Value::Function(print_fn),
        Type::Function(vec![], Box::new(crate::value::ReturnType::NoReturn)),
    );
    env
}

fn as_i128(v: &Value) -> Result<(i128, bool), InterpError> {
    match v {
        Value::Int(n) => Ok((*n as i128, false)),
        Value::U64(n) => Ok((*n as i128, true)),
        other => Err(InterpError::NotNumeric(other.type_name().to_string())),
    }
}

/// `type(a)`-of-left-operand wrapping for arithmetic, `Int(0)`/`Int(1)` for
/// every comparison (spec.md §4.1's explicit simplification of the
/// prototype's `type(a)(int(a.value < b.value))`, which would otherwise
/// wrap comparison results in `U64` whenever the left operand is `U64`).
impl NativeOp {
    pub fn call(&self, args: &[Value]) -> Result<Value, InterpError> {
        if *self == NativeOp::Print {
            let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            println!("{}", rendered.join(" "));
            return Ok(Value::NoReturn);
        }

        if args.len() != 2 {
            return Err(InterpError::ArityMismatch {
                expected: 2,
                got: args.len(),
            });
        }
        let (a, a_is_u64) = as_i128(&args[0])?;
        let (b, _) = as_i128(&args[1])?;

        match self {
            NativeOp::Add | NativeOp::Sub | NativeOp::Mul | NativeOp::Div => {
                let raw = match self {
                    NativeOp::Add => a + b,
                    NativeOp::Sub => a - b,
                    NativeOp::Mul => a * b,
                    NativeOp::Div => {
                        if b == 0 {
                            return Err(InterpError::NotImplemented("division by zero".into()));
                        }
                        a / b
                    }
                    _ => unreachable!(),
                };
                if a_is_u64 {
                    Ok(Value::U64(raw as u64))
                } else {
                    Ok(Value::Int(raw as i64))
                }
            }
            NativeOp::Lt => Ok(Value::Int((a < b) as i64)),
            NativeOp::Le => Ok(Value::Int((a <= b) as i64)),
            NativeOp::Gt => Ok(Value::Int((a > b) as i64)),
            NativeOp::Ge => Ok(Value::Int((a >= b) as i64)),
            NativeOp::Eq => Ok(Value::Int((args[0] == args[1]) as i64)),
            NativeOp::Ne => Ok(Value::Int((args[0] != args[1]) as i64)),
            NativeOp::Print => unreachable!("handled above"),
        }
    }
}
