//! Unused-label removal.
//!
//! Collects every referenced label, then drops label definitions nothing
//! references. A dropped label may have been the only thing keeping a
//! stretch of code alive: when the instruction before it ends control
//! flow, everything up to the next label goes too.

use std::collections::HashSet;

use tern_asm::{Instruction, Label};

use super::classify::{RaiseOracle, branch_targets, is_unreachable_after};

/// Remove label definitions no surviving instruction references.
///
/// The prologue labels (the run of labels following `func_info`) are
/// caller-visible and always kept.
pub fn remove_unused_labels(body: Vec<Instruction>, oracle: &dyn RaiseOracle) -> Vec<Instruction> {
    let mut used = prologue_labels(&body);
    for ins in &body {
        used.extend(branch_targets(ins));
    }

    let mut out: Vec<Instruction> = Vec::with_capacity(body.len());
    let mut input = body.into_iter().peekable();
    while let Some(ins) = input.next() {
        match ins {
            Instruction::Label(l) if !used.contains(&l) => {
                let dead_tail = out
                    .last()
                    .is_some_and(|prev| is_unreachable_after(prev, oracle));
                if dead_tail {
                    while input.peek().is_some_and(|next| !next.is_label()) {
                        input.next();
                    }
                }
            }
            ins => out.push(ins),
        }
    }
    out
}

/// The labels of the `func_info, label(L), ...` prefix.
pub(crate) fn prologue_labels(body: &[Instruction]) -> HashSet<Label> {
    match body {
        [Instruction::FuncInfo { .. }, rest @ ..] => rest
            .iter()
            .map_while(|ins| ins.defined_label())
            .collect(),
        _ => HashSet::new(),
    }
}
