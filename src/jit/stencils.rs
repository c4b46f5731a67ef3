//! The ten fixed built-in assembly stencils (spec.md §4.4), each a
//! two-argument System V function taking its operands in `%rdi`/`%rsi` and
//! returning in `%rax`. Grounded on
//! `examples/original_source/src/jit_builtins.py`'s `ADD_ASM`/`SUB_ASM`/
//! `MUL_ASM`/`DIV_ASM` plus the comparison templates that file defines but
//! `compile.py::JITEngine.__init__` never actually wires up (a bug in the
//! prototype: only the four arithmetic stencils end up in
//! `_compiled_functions`, none of the six comparisons). This crate seeds
//! all ten, per spec.md §4.4.

fn frame(label: &str, body: &str) -> String {
    format!(
        ".global {label}\n\
         .type {label},@function\n\
         {label}:\n\
         \tpush %rbp\n\
         \tmov %rsp, %rbp\n\
         {body}\
         \tmov %rbp, %rsp\n\
         \tpop %rbp\n\
         \tret\n"
    )
}

fn arithmetic(label: &str, op: &str) -> String {
    frame(
        label,
        &format!("\tmovq %rdi, %rax\n\t{op} %rsi, %rax\n"),
    )
}

fn division(label: &str) -> String {
    frame(
        label,
        "\tmovq %rdi, %rax\n\txorq %rdx, %rdx\n\tdivq %rsi\n",
    )
}

fn comparison(label: &str, set: &str) -> String {
    frame(
        label,
        &format!("\txorq %rax, %rax\n\tcmpq %rsi, %rdi\n\t{set} %al\n"),
    )
}

/// Returns `(label, assembly text)` for all ten stencils, in a stable order
/// (arithmetic first, then comparisons) matching the accumulation order the
/// engine uses when computing `func_N` labels.
pub fn builtin_stencils() -> Vec<(&'static str, String)> {
    vec![
        ("add", arithmetic("add", "addq")),
        ("sub", arithmetic("sub", "subq")),
        ("mul", arithmetic("mul", "imulq")),
        ("div", division("div")),
        ("gt", comparison("gt", "setg")),
        ("lt", comparison("lt", "setl")),
        ("gte", comparison("gte", "setge")),
        ("lte", comparison("lte", "setle")),
        ("eq", comparison("eq", "sete")),
        ("neq", comparison("neq", "setne")),
    ]
}
