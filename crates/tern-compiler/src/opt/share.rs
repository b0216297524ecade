//! Tail-sharing pass: collapse identical instruction tails.
//!
//! Whenever two labels begin identical tails that end in an instruction
//! control cannot fall through, all but the last occurrence are replaced
//! by a jump to the last one:
//!
//! Before:             After:
//!   l3: move, return    l3: jump l5
//!   l4: ...             l4: ...
//!   l5: move, return    l5: move, return
//!
//! The pass first makes every label reachable only through an explicit
//! branch by inserting a jump wherever an instruction would fall through
//! into a label definition. Without that step a rewrite could bypass the
//! code between a shared tail and the label above it.

use std::collections::HashMap;

use tern_asm::{Instruction, Label};

use super::classify::{RaiseOracle, is_unreachable_after};

/// Collapse identical terminated tails into jumps to one occurrence.
pub fn share_tails(body: Vec<Instruction>, oracle: &dyn RaiseOracle) -> Vec<Instruction> {
    let prepared = insert_fallthrough_jumps(body, oracle);

    // Tail shapes already seen, keyed on the instruction sequence and
    // mapping to the label that owns it. Walked back-to-front so the
    // last occurrence is the one every duplicate jumps to.
    let mut seen: HashMap<Vec<Instruction>, Label> = HashMap::new();
    let mut seq: Vec<Instruction> = Vec::new();
    let mut out: Vec<Instruction> = Vec::new(); // built in reverse

    let mut input = prepared;
    while let Some(ins) = input.pop() {
        match ins {
            Instruction::Label(l) => {
                if seq.is_empty() {
                    out.push(Instruction::Label(l));
                } else if let Some(&prior) = seen.get(&seq) {
                    // Duplicate tail: keep the label, drop its body.
                    out.push(Instruction::Jump(prior));
                    out.push(Instruction::Label(l));
                    seq.clear();
                } else {
                    seen.insert(seq.clone(), l);
                    out.append(&mut seq);
                    out.push(Instruction::Label(l));
                }
            }
            Instruction::FuncInfo { .. } => {
                // The prologue sentinel; everything above it is emitted
                // untouched.
                out.push(ins);
                out.extend(input.drain(..).rev());
                break;
            }
            ins if is_unreachable_after(&ins, oracle) => {
                // A terminator starts a fresh candidate tail. Anything
                // accumulated below it without an intervening label is
                // unreachable and dropped here.
                seq.clear();
                seq.push(ins);
            }
            ins => seq.push(ins),
        }
    }

    out.reverse();
    out
}

/// Insert `jump` between every instruction that falls through and the
/// label definition following it.
fn insert_fallthrough_jumps(
    body: Vec<Instruction>,
    oracle: &dyn RaiseOracle,
) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(body.len());
    let mut input = body.into_iter().peekable();
    while let Some(ins) = input.next() {
        let falls_into = match input.peek() {
            Some(Instruction::Label(l)) => {
                (!ins.is_label() && !is_unreachable_after(&ins, oracle)).then_some(*l)
            }
            _ => None,
        };
        out.push(ins);
        if let Some(l) = falls_into {
            out.push(Instruction::Jump(l));
        }
    }
    out
}
