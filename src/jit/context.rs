//! Per-function compilation state and the process-wide label allocator
//! (spec.md §4.3: "labels generated from a monotonically increasing
//! per-prefix counter... unique across emissions").

use std::collections::HashMap;

/// Hands out `prefix_N` labels, one counter per prefix, so that e.g. two
/// `if` statements in different functions never collide on `if_true_0`.
/// Lives on the `JitEngine` so it persists across separate
/// `compile_function` calls (testable property 6: global uniqueness, not
/// just within one function).
#[derive(Default)]
pub struct LabelAllocator {
    counters: HashMap<&'static str, u64>,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, prefix: &'static str) -> String {
        let n = self.counters.entry(prefix).or_insert(0);
        let label = format!("{prefix}_{n}");
        *n += 1;
        label
    }
}

/// A local variable's stack slot, expressed as a negative offset from
/// `%rbp` (e.g. `-8`, `-16`). Assigned in declaration order as the
/// compiled frame grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub i32);

impl Slot {
    pub fn operand(&self) -> String {
        format!("{}(%rbp)", self.0)
    }
}

/// Accumulates the instruction lines for one function body and knows how to
/// grow/shrink the stack frame as locals and call arguments are pushed.
pub struct CompilationContext {
    pub label: String,
    lines: Vec<String>,
    stack_size: i32,
}

const ARG_REGS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

impl CompilationContext {
    pub fn new(label: String) -> Self {
        CompilationContext {
            label,
            lines: Vec::new(),
            stack_size: 0,
        }
    }

    pub fn arg_register(index: usize) -> Option<&'static str> {
        ARG_REGS.get(index).copied()
    }

    pub fn emit(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn emit_prologue(&mut self) {
        self.emit("push %rbp");
        self.emit("mov %rsp, %rbp");
    }

    pub fn emit_epilogue(&mut self) {
        self.emit("mov %rbp, %rsp");
        self.emit("pop %rbp");
        self.emit("ret");
    }

    /// Grows the frame by one 8-byte slot and returns it.
    pub fn alloc_slot(&mut self) -> Slot {
        self.stack_size += 8;
        self.emit("sub $8, %rsp");
        Slot(-self.stack_size)
    }

    /// Snapshot of the current compile-time stack depth, taken before
    /// compiling a branch whose arm may allocate locals the other arm
    /// doesn't.
    pub fn stack_mark(&self) -> i32 {
        self.stack_size
    }

    /// Releases every slot allocated since `mark`: emits the `%rsp`-growing
    /// counterpart of each `sub $8, %rsp` done since, and rewinds the
    /// compile-time counter to match. Only one of an `if`/`else` pair of
    /// branches runs at runtime, so without this the two arms' `sub`s
    /// leave `%rsp` at different depths depending on which one executed,
    /// while code after the join point keeps addressing locals from a
    /// single compile-time `stack_size` — drifting out of sync with
    /// whichever branch actually ran.
    pub fn release_to(&mut self, mark: i32) {
        let freed = self.stack_size - mark;
        if freed > 0 {
            self.emit(format!("add ${freed}, %rsp"));
            self.stack_size = mark;
        }
    }

    pub fn store_rax(&mut self, slot: Slot) {
        self.emit(format!("movq %rax, {}", slot.operand()));
    }

    pub fn load_to_rax(&mut self, slot: Slot) {
        self.emit(format!("movq {}, %rax", slot.operand()));
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            ".global {label}\n.type {label},@function\n{label}:\n",
            label = self.label
        );
        for line in &self.lines {
            out.push('\t');
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_allocator_is_unique_per_prefix_and_monotonic() {
        let mut labels = LabelAllocator::new();
        assert_eq!(labels.next("if_true"), "if_true_0");
        assert_eq!(labels.next("if_true"), "if_true_1");
        assert_eq!(labels.next("while_cond"), "while_cond_0");
    }

    #[test]
    fn slots_grow_downward_from_rbp() {
        let mut ctx = CompilationContext::new("f".into());
        let a = ctx.alloc_slot();
        let b = ctx.alloc_slot();
        assert_eq!(a, Slot(-8));
        assert_eq!(b, Slot(-16));
    }
}
