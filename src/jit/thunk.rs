//! `JitThunk`: the callable handle a `Function` value's `jit_thunk` slot
//! holds once compilation succeeds. Resolves its symbol against the
//! engine's currently loaded shared object lazily, on every call — so a
//! later `reload()` (triggered by compiling some other function) is picked
//! up automatically (spec.md §4.5).

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{ReturnType, Value};

use super::engine::JitEngine;
use super::error::ThunkError;

#[derive(Clone)]
pub struct JitThunk {
    engine: Rc<RefCell<JitEngine>>,
    label: String,
    arity: usize,
    return_type: ReturnType,
}

impl JitThunk {
    pub fn new(
        engine: Rc<RefCell<JitEngine>>,
        label: String,
        arity: usize,
        return_type: ReturnType,
    ) -> JitThunk {
        JitThunk {
            engine,
            label,
            arity,
            return_type,
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, ThunkError> {
        if args.len() != self.arity {
            return Err(ThunkError::ArityMismatch {
                expected: self.arity,
                got: args.len(),
            });
        }
        let raw_args: Vec<i64> = args
            .iter()
            .map(|v| match v {
                Value::Int(n) => Ok(*n),
                Value::U64(n) => Ok(*n as i64),
                other => Err(ThunkError::Unrepresentable(format!(
                    "cannot pass a {} across the jit foreign-call boundary",
                    other.type_name()
                ))),
            })
            .collect::<Result<_, _>>()?;

        let raw_result = self.engine.borrow().call_symbol(&self.label, &raw_args)?;

        self.return_type
            .cast_from_raw(raw_result)
            .map_err(|e| ThunkError::Unrepresentable(e.to_string()))
    }
}
