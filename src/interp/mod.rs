//! The tree-walking interpreter (spec.md §4.1/§4.2).

pub mod builtins;
pub mod errors;
pub mod eval;

pub use errors::InterpError;
pub use eval::{eval_block, eval_expression, eval_module, eval_statement, Runtime};
