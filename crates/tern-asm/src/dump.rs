//! Human-readable assembly listings for debugging and tests.
//!
//! One instruction per line, two-space indented; label definitions sit at
//! column zero with a trailing colon. The format is stable enough to
//! assert against in tests but is not a wire format.

use std::fmt::Write as _;

use crate::instruction::{Instruction, Operand};
use crate::module::{Function, Module};

/// Render one function.
pub fn dump_function(f: &Function) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}/{} entry={}", f.name, f.arity, f.entry);
    for ins in &f.body {
        match ins {
            Instruction::Label(l) => {
                let _ = writeln!(out, "{l}:");
            }
            _ => {
                let _ = writeln!(out, "  {}", line(ins));
            }
        }
    }
    out
}

/// Render a whole module: header, exports, attributes, then every
/// function separated by blank lines.
pub fn dump_module(m: &Module) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module {} literals={}", m.name, m.literal_count);
    for e in &m.exports {
        let _ = writeln!(out, "export {}/{} {}", e.name, e.arity, e.label);
    }
    for a in &m.attributes {
        let _ = writeln!(out, "attr {} {}", a.name, a.value);
    }
    for f in &m.functions {
        out.push('\n');
        out.push_str(&dump_function(f));
    }
    out
}

fn operands(args: &[Operand]) -> String {
    let mut out = String::new();
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{a}");
    }
    out
}

fn fail_part(fail: &Option<crate::instruction::Label>) -> String {
    match fail {
        Some(l) => format!(" fail={l}"),
        None => String::new(),
    }
}

fn cases(cs: &[(Operand, crate::instruction::Label)]) -> String {
    let mut out = String::new();
    for (i, (v, l)) in cs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{v}=>{l}");
    }
    out
}

fn line(ins: &Instruction) -> String {
    use Instruction::*;
    match ins {
        Label(l) => format!("{l}:"),
        FuncInfo {
            module,
            function,
            arity,
        } => format!("func_info {module}:{function}/{arity}"),
        Jump(l) => format!("jump {l}"),
        Move { src, dst } => format!("move {src} -> {dst}"),
        Test { op, fail, args } => format!("test {op} fail={fail} [{}]", operands(args)),
        SelectVal { arg, fail, cases: cs } => {
            format!("select_val {arg} fail={fail} [{}]", cases(cs))
        }
        SelectTupleArity { arg, fail, cases: cs } => {
            format!("select_tuple_arity {arg} fail={fail} [{}]", cases(cs))
        }
        Call { arity, entry } => format!("call {arity} {entry}"),
        CallLast {
            arity,
            entry,
            dealloc,
        } => format!("call_last {arity} {entry} dealloc={dealloc}"),
        CallOnly { arity, entry } => format!("call_only {arity} {entry}"),
        CallExt { arity, func } => format!("call_ext {arity} {func}"),
        CallExtLast {
            arity,
            func,
            dealloc,
        } => format!("call_ext_last {arity} {func} dealloc={dealloc}"),
        CallExtOnly { arity, func } => format!("call_ext_only {arity} {func}"),
        ApplyLast { arity, dealloc } => format!("apply_last {arity} dealloc={dealloc}"),
        Return => "return".to_string(),
        Wait(l) => format!("wait {l}"),
        WaitTimeout { resume, timeout } => format!("wait_timeout {resume} {timeout}"),
        LoopRec { fail, dst } => format!("loop_rec fail={fail} {dst}"),
        LoopRecEnd(l) => format!("loop_rec_end {l}"),
        Try { reg, handler } => format!("try {reg} handler={handler}"),
        TryEnd(reg) => format!("try_end {reg}"),
        Catch { reg, handler } => format!("catch {reg} handler={handler}"),
        CatchEnd(reg) => format!("catch_end {reg}"),
        Kill(reg) => format!("kill {reg}"),
        Deallocate(n) => format!("deallocate {n}"),
        Bif { op, fail, args, dst } => {
            format!("bif {op}{} [{}] -> {dst}", fail_part(fail), operands(args))
        }
        GcBif {
            op,
            fail,
            live,
            args,
            dst,
        } => format!(
            "gc_bif {op} live={live}{} [{}] -> {dst}",
            fail_part(fail),
            operands(args)
        ),
        Bs { op, fail, args } => format!("{op}{} [{}]", fail_part(fail), operands(args)),
        BsContextToBinary(reg) => format!("bs_context_to_binary {reg}"),
        Block(ops) => format!("block[{}]", ops.len()),
        Badmatch(op) => format!("badmatch {op}"),
        CaseEnd(op) => format!("case_end {op}"),
        IfEnd => "if_end".to_string(),
        TryCaseEnd(op) => format!("try_case_end {op}"),
    }
}
