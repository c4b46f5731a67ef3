//! Lexically scoped, typed environment (spec.md §3/§4.2).
//!
//! Grounded on `examples/original_source/src/utils.py`'s `Environment`
//! class: a parent-chain tree of `name -> (value, type)` bindings. `get`
//! and `get_type` walk parents on miss; `update` mutates the nearest
//! existing binding; `set` always creates/shadows in the current frame.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::{Type, Value};

#[derive(Debug, Clone)]
pub enum EnvError {
    Unbound(String),
    UndeclaredAssignment(String),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::Unbound(name) => write!(f, "unbound identifier '{name}'"),
            EnvError::UndeclaredAssignment(name) => {
                write!(f, "cannot assign to undeclared name '{name}'")
            }
        }
    }
}

impl std::error::Error for EnvError {}

struct TypedVar {
    value: Value,
    ty: Type,
}

struct EnvNode {
    parent: Option<Environment>,
    bindings: HashMap<String, TypedVar>,
}

/// Cheaply cloneable handle onto a frame in the scope tree. Clones share
/// the same frame (`Rc<RefCell<..>>`); `child()` allocates a new frame
/// pointing at the clone it was called on.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<EnvNode>>);

impl Environment {
    pub fn root() -> Environment {
        Environment(Rc::new(RefCell::new(EnvNode {
            parent: None,
            bindings: HashMap::new(),
        })))
    }

    pub fn child(parent: &Environment) -> Environment {
        Environment(Rc::new(RefCell::new(EnvNode {
            parent: Some(parent.clone()),
            bindings: HashMap::new(),
        })))
    }

    pub fn get(&self, name: &str) -> Result<Value, EnvError> {
        let node = self.0.borrow();
        if let Some(v) = node.bindings.get(name) {
            return Ok(v.value.clone());
        }
        match &node.parent {
            Some(p) => p.get(name),
            None => Err(EnvError::Unbound(name.to_string())),
        }
    }

    pub fn get_type(&self, name: &str) -> Result<Type, EnvError> {
        let node = self.0.borrow();
        if let Some(v) = node.bindings.get(name) {
            return Ok(v.ty.clone());
        }
        match &node.parent {
            Some(p) => p.get_type(name),
            None => Err(EnvError::Unbound(name.to_string())),
        }
    }

    /// Always creates or shadows a binding in the *current* frame.
    pub fn set(&self, name: String, value: Value, ty: Type) {
        self.0
            .borrow_mut()
            .bindings
            .insert(name, TypedVar { value, ty });
    }

    /// Mutates the nearest existing binding in the parent chain. Errors if
    /// no such binding exists anywhere (assignment to an undeclared name).
    pub fn update(&self, name: &str, value: Value) -> Result<(), EnvError> {
        let mut node = self.0.borrow_mut();
        if let Some(v) = node.bindings.get_mut(name) {
            v.value = value;
            return Ok(());
        }
        let parent = node.parent.clone();
        drop(node);
        match parent {
            Some(p) => p.update(name, value),
            None => Err(EnvError::UndeclaredAssignment(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_inherits_and_can_shadow() {
        let root = Environment::root();
        root.set("x".into(), Value::Int(1), Type::Int);
        let child = Environment::child(&root);
        assert_eq!(child.get("x").unwrap(), Value::Int(1));
        child.set("x".into(), Value::Int(2), Type::Int);
        assert_eq!(child.get("x").unwrap(), Value::Int(2));
        assert_eq!(root.get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn update_mutates_nearest_existing_binding_in_parent() {
        let root = Environment::root();
        root.set("x".into(), Value::Int(1), Type::Int);
        let child = Environment::child(&root);
        child.update("x", Value::Int(9)).unwrap();
        assert_eq!(root.get("x").unwrap(), Value::Int(9));
    }

    #[test]
    fn update_on_undeclared_name_errors() {
        let root = Environment::root();
        assert!(matches!(
            root.update("nope", Value::Int(1)),
            Err(EnvError::UndeclaredAssignment(_))
        ));
    }

    #[test]
    fn get_on_unbound_name_errors() {
        let root = Environment::root();
        assert!(matches!(root.get("nope"), Err(EnvError::Unbound(_))));
    }
}
