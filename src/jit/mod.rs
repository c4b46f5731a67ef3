//! The per-function x86-64 JIT back end (spec.md §4.3-§4.5).

pub mod context;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod stencils;
pub mod thunk;

pub use engine::{Assembler, JitEngine, SystemAssembler};
pub use error::{CompileError, EngineError, JitError, ThunkError};
pub use thunk::JitThunk;
