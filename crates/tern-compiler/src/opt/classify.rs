//! Instruction classifiers and label extraction.
//!
//! The optimizer only ever asks three questions about an instruction:
//! does control fall through it, does it always raise, and which
//! function-local labels does it reference. Everything else is opaque
//! and forwarded untouched.
//!
//! The matches here are deliberately exhaustive over the shapes that
//! answer "yes"; the catch-all arm is only ever the
//! never-terminates / never-raises / carries-no-labels case. A new
//! instruction that branches, raises, or carries a label must be added
//! here or unreachable-code removal will delete live code.

use tern_asm::{BlockOp, ExtFunc, Instruction, Label};

/// Answers whether calling an external function always raises.
///
/// The table behind this lives outside the optimizer (it is owned by the
/// stage that knows the standard library); the optimizer only consumes
/// the answer. The conservative [`NoRaiseInfo`] implementation is always
/// safe: it only costs missed sinking opportunities.
pub trait RaiseOracle {
    fn always_raises(&self, func: &ExtFunc) -> bool;
}

/// Oracle that knows nothing: no external callee is assumed to raise.
pub struct NoRaiseInfo;

impl RaiseOracle for NoRaiseInfo {
    fn always_raises(&self, _func: &ExtFunc) -> bool {
        false
    }
}

/// True if control never falls through to the next instruction.
pub fn is_unreachable_after(ins: &Instruction, oracle: &dyn RaiseOracle) -> bool {
    match ins {
        Instruction::FuncInfo { .. }
        | Instruction::Return
        | Instruction::Jump(_)
        | Instruction::CallLast { .. }
        | Instruction::CallOnly { .. }
        | Instruction::CallExtLast { .. }
        | Instruction::CallExtOnly { .. }
        | Instruction::ApplyLast { .. }
        | Instruction::SelectVal { .. }
        | Instruction::SelectTupleArity { .. }
        | Instruction::LoopRecEnd(_)
        | Instruction::Wait(_) => true,
        // wait_timeout falls through when the timer fires
        _ => is_exit(ins, oracle),
    }
}

/// True if the instruction always raises (a strict subset of
/// [`is_unreachable_after`]).
pub fn is_exit(ins: &Instruction, oracle: &dyn RaiseOracle) -> bool {
    match ins {
        Instruction::Badmatch(_)
        | Instruction::CaseEnd(_)
        | Instruction::IfEnd
        | Instruction::TryCaseEnd(_) => true,
        Instruction::CallExt { func, .. } => oracle.always_raises(func),
        _ => false,
    }
}

/// The function-local labels an instruction references.
///
/// Call targets are excluded: local and external calls name function
/// entries, not positions inside this function. Block interiors are not
/// consulted either; lowering never leaves a direct failure label on a
/// blocked operation (see [`is_label_used_in`] for the passes that must
/// look inside anyway).
pub fn branch_targets(ins: &Instruction) -> Vec<Label> {
    match ins {
        Instruction::Test { fail, .. } => vec![*fail],
        Instruction::SelectVal { fail, cases, .. }
        | Instruction::SelectTupleArity { fail, cases, .. } => {
            let mut out = vec![*fail];
            out.extend(cases.iter().map(|(_, l)| *l));
            out
        }
        Instruction::Jump(l) | Instruction::LoopRecEnd(l) | Instruction::Wait(l) => vec![*l],
        Instruction::WaitTimeout { resume, .. } => vec![*resume],
        Instruction::LoopRec { fail, .. } => vec![*fail],
        Instruction::Try { handler, .. } | Instruction::Catch { handler, .. } => vec![*handler],
        Instruction::Bif { fail, .. }
        | Instruction::GcBif { fail, .. }
        | Instruction::Bs { fail, .. } => fail.iter().copied().collect(),
        _ => Vec::new(),
    }
}

/// True if `label` is referenced anywhere in `body`, including by
/// operations inside blocks.
pub fn is_label_used_in(label: Label, body: &[Instruction]) -> bool {
    body.iter().any(|ins| match ins {
        Instruction::Block(ops) => ops.iter().any(|op| block_op_target(op) == Some(label)),
        _ => branch_targets(ins).contains(&label),
    })
}

fn block_op_target(op: &BlockOp) -> Option<Label> {
    match op {
        BlockOp::Bif { fail, .. } | BlockOp::GcBif { fail, .. } => *fail,
        BlockOp::Catch { handler, .. } => Some(*handler),
        BlockOp::Set { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use tern_asm::Operand;

    use super::*;
    use crate::test_utils::{KnownRaises, x};

    fn raising_callee() -> ExtFunc {
        ExtFunc::new("rt", "raise", 1)
    }

    #[test]
    fn terminators() {
        let oracle = NoRaiseInfo;
        for ins in [
            Instruction::Return,
            Instruction::Jump(Label(4)),
            Instruction::Wait(Label(4)),
            Instruction::LoopRecEnd(Label(4)),
            Instruction::CallLast {
                arity: 1,
                entry: Label(9),
                dealloc: 0,
            },
            Instruction::ApplyLast {
                arity: 2,
                dealloc: 1,
            },
            Instruction::SelectVal {
                arg: x(0),
                fail: Label(4),
                cases: vec![],
            },
            Instruction::Badmatch(x(0)),
        ] {
            assert!(is_unreachable_after(&ins, &oracle), "{ins:?}");
        }
    }

    #[test]
    fn fallthrough_instructions_are_not_terminators() {
        let oracle = NoRaiseInfo;
        for ins in [
            Instruction::Move {
                src: x(0),
                dst: x(1),
            },
            Instruction::WaitTimeout {
                resume: Label(4),
                timeout: Operand::Int(100),
            },
            Instruction::Call {
                arity: 1,
                entry: Label(9),
            },
            Instruction::Deallocate(2),
        ] {
            assert!(!is_unreachable_after(&ins, &oracle), "{ins:?}");
        }
    }

    #[test]
    fn exit_calls_need_the_oracle() {
        let call = Instruction::CallExt {
            arity: 1,
            func: raising_callee(),
        };
        assert!(!is_exit(&call, &NoRaiseInfo));
        let oracle = KnownRaises(vec![raising_callee()]);
        assert!(is_exit(&call, &oracle));
        assert!(is_unreachable_after(&call, &oracle));
    }

    #[test]
    fn select_targets_include_fail_and_cases() {
        let ins = Instruction::SelectVal {
            arg: x(0),
            fail: Label(9),
            cases: vec![
                (Operand::Atom("a".to_string()), Label(4)),
                (Operand::Atom("b".to_string()), Label(5)),
            ],
        };
        assert_eq!(branch_targets(&ins), vec![Label(9), Label(4), Label(5)]);
    }

    #[test]
    fn absent_fail_labels_contribute_nothing() {
        let ins = Instruction::Bif {
            op: "node".to_string(),
            fail: None,
            args: vec![],
            dst: x(0),
        };
        assert_eq!(branch_targets(&ins), Vec::<Label>::new());
    }

    #[test]
    fn call_targets_are_not_branch_targets() {
        let ins = Instruction::Call {
            arity: 2,
            entry: Label(7),
        };
        assert_eq!(branch_targets(&ins), Vec::<Label>::new());
    }

    #[test]
    fn label_use_sees_into_blocks() {
        let body = vec![
            Instruction::Block(vec![
                BlockOp::Set {
                    dst: x(0),
                    args: vec![x(1)],
                },
                BlockOp::GcBif {
                    op: "length".to_string(),
                    fail: Some(Label(8)),
                    live: 1,
                    args: vec![x(0)],
                    dst: x(0),
                },
            ]),
            Instruction::Return,
        ];
        assert!(is_label_used_in(Label(8), &body));
        assert!(!is_label_used_in(Label(9), &body));
        // the plain extraction deliberately does not look inside
        assert_eq!(branch_targets(&body[0]), Vec::<Label>::new());
    }

    #[test]
    fn catch_block_op_carries_its_handler() {
        let body = vec![Instruction::Block(vec![BlockOp::Catch {
            dst: Operand::Y(0),
            handler: Label(12),
        }])];
        assert!(is_label_used_in(Label(12), &body));
    }
}
