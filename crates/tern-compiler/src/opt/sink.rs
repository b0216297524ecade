//! Exit-sinking pass: move raising stubs out of the hot path.
//!
//! An error stub is a label, at most one straight-line lead-in (a block
//! or `bs_context_to_binary`), and an instruction that always raises.
//! Stubs are appended to a tail region behind everything else so the
//! code between branches stays dense.
//!
//! Runs after tail sharing, which guarantees every label is preceded by
//! an instruction control cannot fall through; relocating a stub can
//! therefore never cut a fall-through edge.

use tern_asm::{Instruction, Label};

use super::classify::{RaiseOracle, is_exit};

/// Relocate raising stubs to the end of the body.
pub fn sink_exits(body: Vec<Instruction>, oracle: &dyn RaiseOracle) -> Vec<Instruction> {
    let mut input: Vec<Instruction> = body.into_iter().rev().collect();
    let mut acc: Vec<Instruction> = Vec::new();
    let mut end: Vec<Instruction> = Vec::new(); // appended in reverse at the finish

    while let Some(ins) = input.pop() {
        if is_exit(&ins, oracle)
            && let Some((label, lead)) = take_stub(&mut acc)
        {
            end.push(ins);
            if let Some(lead) = lead {
                end.push(lead);
            }
            end.push(Instruction::Label(label));
            // The instruction the label was shielding is next in line
            // again; if it is itself an exit it can relocate too.
            if let Some(orphan) = acc.pop() {
                input.push(orphan);
            }
            continue;
        }
        acc.push(ins);
    }

    acc.extend(end.into_iter().rev());
    acc
}

/// Pop the stub prefix (label plus optional lead-in) off the
/// accumulator, declining when the label opens the function body.
fn take_stub(acc: &mut Vec<Instruction>) -> Option<(Label, Option<Instruction>)> {
    let has_lead = matches!(
        acc.last(),
        Some(Instruction::Block(_) | Instruction::BsContextToBinary(_))
    );
    let label_at = if has_lead {
        acc.len().checked_sub(2)?
    } else {
        acc.len().checked_sub(1)?
    };
    let label = match acc.get(label_at) {
        Some(Instruction::Label(l)) => *l,
        _ => return None,
    };
    match acc.get(label_at.checked_sub(1)?) {
        Some(Instruction::FuncInfo { .. }) | None => return None,
        Some(_) => {}
    }

    let lead = if has_lead { acc.pop() } else { None };
    acc.pop();
    Some((label, lead))
}
