//! Branch peephole and unreachable-code pruning.
//!
//! A single forward walk applies, first match wins:
//! - test + jump to the test's own fail label, with the label about to
//!   start: both are dropped
//! - test + jump with the fail label about to start: the test is
//!   inverted when its opcode allows it and the jump disappears
//! - label followed by jump: the label is merged into the jump target
//!   and re-emitted at the target's definition
//! - jump to the very next label: dropped
//! - after any instruction control cannot fall through, everything up to
//!   the next referenced label is dropped
//!
//! Merging labels and inverting tests expose further rewrites, so the
//! walk reruns until it no longer changes the body.
//!
//! Two labels are sacred and never merged away: the caller-visible entry
//! and the function-class label.

use std::collections::{HashMap, HashSet};

use tern_asm::{Instruction, Label};

use super::classify::{RaiseOracle, branch_targets, is_unreachable_after};
use super::labels::prologue_labels;

/// Run the peephole walk to a fixed point.
pub fn peephole(
    body: Vec<Instruction>,
    entry: Label,
    fc: Label,
    oracle: &dyn RaiseOracle,
) -> Vec<Instruction> {
    let mut current = body;
    loop {
        let next = walk(current.clone(), entry, fc, oracle);
        if next == current {
            return current;
        }
        current = next;
    }
}

struct Walk<'a> {
    entry: Label,
    fc: Label,
    oracle: &'a dyn RaiseOracle,
    /// Target label -> labels merged into it, pending re-emission at the
    /// target's definition.
    relocated: HashMap<Label, Vec<Label>>,
    /// Labels referenced by an instruction emitted so far. Seeded with
    /// the prologue labels and the entry so the skip after `func_info`
    /// resumes at the class label.
    used: HashSet<Label>,
}

fn walk(
    body: Vec<Instruction>,
    entry: Label,
    fc: Label,
    oracle: &dyn RaiseOracle,
) -> Vec<Instruction> {
    let mut st = Walk {
        entry,
        fc,
        oracle,
        relocated: HashMap::new(),
        used: prologue_labels(&body),
    };
    st.used.insert(entry);

    let mut input: Vec<Instruction> = body.into_iter().rev().collect();
    let mut acc: Vec<Instruction> = Vec::new();

    while let Some(ins) = input.pop() {
        match ins {
            Instruction::Test { op, fail, args } => {
                if let Some(&Instruction::Jump(target)) = input.last()
                    && label_defined_next(&input, 1, fail)
                {
                    if target == fail {
                        // Both branches of the test land on the label
                        // about to start; neither instruction is needed.
                        input.pop();
                        continue;
                    }
                    if let Some(inverted) = op.inverse() {
                        input.pop();
                        input.push(Instruction::Test {
                            op: inverted,
                            fail: target,
                            args,
                        });
                        continue;
                    }
                }
                st.used.insert(fail);
                acc.push(Instruction::Test { op, fail, args });
            }
            Instruction::Label(l) => {
                if l != st.entry
                    && l != st.fc
                    && let Some(&Instruction::Jump(target)) = input.last()
                    && target != l
                {
                    // The label's whole body is a jump: merge it into the
                    // target and re-emit it there.
                    st.relocated.entry(target).or_default().push(l);
                    continue;
                }
                if st.relocated.contains_key(&l) {
                    insert_merged_labels(l, &mut st, &mut input, &mut acc);
                    continue;
                }
                acc.push(Instruction::Label(l));
            }
            Instruction::Jump(l) => {
                if input.last() == Some(&Instruction::Label(l)) {
                    // Falls through to its own target.
                    continue;
                }
                st.used.insert(l);
                acc.push(Instruction::Jump(l));
                skip_unreachable(&mut input, &mut acc, &st.used);
            }
            ins => {
                st.used.extend(branch_targets(&ins));
                let ends_flow = is_unreachable_after(&ins, st.oracle);
                acc.push(ins);
                if ends_flow {
                    skip_unreachable(&mut input, &mut acc, &st.used);
                }
            }
        }
    }

    if st.relocated.contains_key(&st.fc) {
        splice_class_aliases(&mut st, &mut acc);
    }
    acc
}

/// Emit a label together with everything merged into it, flattening
/// nested merges. A label whose emission lands right after a jump to it
/// makes that jump a fall-through: the jump is dropped and the label is
/// pushed back onto the input to be rescanned.
fn insert_merged_labels(
    label: Label,
    st: &mut Walk<'_>,
    input: &mut Vec<Instruction>,
    acc: &mut Vec<Instruction>,
) {
    let mut group = Vec::new();
    collect_merged(label, &mut st.relocated, &mut group);
    for member in group {
        if acc.last() == Some(&Instruction::Jump(member)) {
            acc.pop();
            input.push(Instruction::Label(member));
        } else {
            acc.push(Instruction::Label(member));
        }
    }
}

fn collect_merged(label: Label, relocated: &mut HashMap<Label, Vec<Label>>, out: &mut Vec<Label>) {
    out.push(label);
    if let Some(absorbed) = relocated.remove(&label) {
        for l in absorbed {
            collect_merged(l, relocated, out);
        }
    }
}

/// Labels merged into the function-class label after its definition has
/// already been emitted: re-emit them next to it so the aliases keep
/// denoting the class position.
fn splice_class_aliases(st: &mut Walk<'_>, acc: &mut Vec<Instruction>) {
    let mut group = Vec::new();
    collect_merged(st.fc, &mut st.relocated, &mut group);
    let aliases = group.into_iter().skip(1).map(Instruction::Label);
    match acc.iter().position(|ins| *ins == Instruction::Label(st.fc)) {
        Some(at) => {
            let mut rest = acc.split_off(at + 1);
            acc.extend(aliases);
            acc.append(&mut rest);
        }
        None => acc.extend(aliases),
    }
}

/// True if `label` is defined before the first non-label instruction,
/// looking past `skip` pending entries. Intervening label definitions do
/// not block the search; several labels may denote one position.
fn label_defined_next(input: &[Instruction], skip: usize, label: Label) -> bool {
    input
        .iter()
        .rev()
        .skip(skip)
        .map_while(|ins| ins.defined_label())
        .any(|l| l == label)
}

/// Drop instructions following a terminator until the next label that is
/// referenced. A jump emitted right before its own target becomes a
/// fall-through once the dead code between them is gone and is dropped
/// as well.
fn skip_unreachable(
    input: &mut Vec<Instruction>,
    acc: &mut Vec<Instruction>,
    used: &HashSet<Label>,
) {
    while let Some(next) = input.last() {
        if let Instruction::Label(l) = next {
            let l = *l;
            if acc.last() == Some(&Instruction::Jump(l)) {
                acc.pop();
                return;
            }
            if used.contains(&l) {
                return;
            }
        }
        input.pop();
    }
}
