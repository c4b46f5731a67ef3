//! The shadow-execution harness (spec.md §4.6): on a JIT-eligible call,
//! runs the interpreter and the thunk side by side, compares results, and
//! falls back deterministically. Grounded on
//! `examples/original_source/src/interpreter.py`'s dual-run-and-compare
//! block in `interpret_func_call`, with timing/stats modeled after the
//! teacher's `HybridStats` (`backend/bytecode/jit/hybrid/config.rs`).

use std::fmt;
use std::time::Instant;

use tracing::{info, trace, warn};

use crate::jit::ThunkError;
use crate::value::Value;

#[derive(Debug, Default, Clone, Copy)]
pub struct ShadowStats {
    pub interpreted: u64,
    pub jit_calls: u64,
    pub divergences: u64,
    pub fallbacks: u64,
}

#[derive(Debug)]
pub struct Divergence {
    pub interpreted: String,
    pub jitted: String,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "jit and interpreter results diverged: interpreted={}, jitted={}",
            self.interpreted, self.jitted
        )
    }
}

impl std::error::Error for Divergence {}

/// Runs both `interp` and `jit`, always, per spec.md §4.6 step 1/2. The
/// interpreter's result is authoritative whenever the thunk raises a
/// `ThunkError` (non-fatal JIT value error); otherwise the JIT result wins,
/// with a divergence logged (or raised, under `strict`) when the two
/// disagree.
///
/// Takes and returns `stats` by value (it's a small `Copy` counter bundle)
/// rather than by `&mut` reference, since `interp` typically needs a
/// mutable borrow of the whole runtime (to recurse into further calls) that
/// would otherwise overlap with a borrow of the runtime's own stats field.
pub fn run_dual(
    mut stats: ShadowStats,
    strict: bool,
    interp: impl FnOnce() -> Value,
    jit: impl FnOnce() -> Result<Value, ThunkError>,
) -> (Result<Value, Divergence>, ShadowStats) {
    let t0 = Instant::now();
    let interpreted = interp();
    let interp_elapsed = t0.elapsed();
    stats.interpreted += 1;
    trace!(?interp_elapsed, "shadow: interpreter arm finished");

    let t1 = Instant::now();
    let outcome = match jit() {
        Ok(jitted) => {
            let jit_elapsed = t1.elapsed();
            stats.jit_calls += 1;
            trace!(?jit_elapsed, "shadow: jit arm finished");
            if jitted != interpreted {
                stats.divergences += 1;
                warn!(
                    interpreted = %interpreted,
                    jitted = %jitted,
                    "shadow: jit and interpreter results diverged"
                );
                if strict {
                    Err(Divergence {
                        interpreted: interpreted.to_string(),
                        jitted: jitted.to_string(),
                    })
                } else {
                    Ok(jitted)
                }
            } else {
                Ok(jitted)
            }
        }
        Err(e) => {
            stats.fallbacks += 1;
            info!(error = %e, "shadow: jit call failed, using interpreter result");
            Ok(interpreted)
        }
    };
    (outcome, stats)
}
