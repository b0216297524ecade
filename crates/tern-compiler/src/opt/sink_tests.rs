//! Unit tests for the exit-sinking pass.

use tern_asm::{BlockOp, ExtFunc, Instruction, TestOp};

use crate::opt::{NoRaiseInfo, sink_exits};
use crate::test_utils::{KnownRaises, badmatch, func_info, int, is_eq, label, mov, ret, test, x};

#[test]
fn moves_stub_past_live_code() {
    let body = vec![
        func_info("f", 2),
        label(2),
        is_eq(3, x(0), x(1)),
        test(TestOp::IsLt, 4, vec![x(0), int(0)]),
        ret(),
        label(3),
        badmatch(x(0)),
        label(4),
        mov(int(1), x(0)),
        ret(),
    ];

    let out = sink_exits(body, &NoRaiseInfo);

    assert_eq!(
        out,
        vec![
            func_info("f", 2),
            label(2),
            is_eq(3, x(0), x(1)),
            test(TestOp::IsLt, 4, vec![x(0), int(0)]),
            ret(),
            label(4),
            mov(int(1), x(0)),
            ret(),
            label(3),
            badmatch(x(0)),
        ]
    );
}

#[test]
fn cascades_over_adjacent_stubs() {
    let body = vec![
        func_info("f", 2),
        label(2),
        is_eq(3, x(0), x(1)),
        test(TestOp::IsLt, 4, vec![x(0), int(0)]),
        ret(),
        label(3),
        badmatch(x(0)),
        label(4),
        Instruction::CaseEnd(x(1)),
    ];

    let out = sink_exits(body, &NoRaiseInfo);

    assert_eq!(
        out,
        vec![
            func_info("f", 2),
            label(2),
            is_eq(3, x(0), x(1)),
            test(TestOp::IsLt, 4, vec![x(0), int(0)]),
            ret(),
            label(4),
            Instruction::CaseEnd(x(1)),
            label(3),
            badmatch(x(0)),
        ]
    );
}

#[test]
fn stub_at_the_function_top_stays() {
    let body = vec![func_info("f", 1), label(2), badmatch(x(0))];
    let out = sink_exits(body.clone(), &NoRaiseInfo);
    assert_eq!(out, body);
}

#[test]
fn block_lead_in_moves_with_the_stub() {
    let block = Instruction::Block(vec![BlockOp::Set {
        dst: x(1),
        args: vec![x(0)],
    }]);
    let body = vec![
        func_info("f", 2),
        label(2),
        is_eq(3, x(0), x(1)),
        ret(),
        label(3),
        block.clone(),
        badmatch(x(1)),
        label(4),
        mov(int(1), x(0)),
        ret(),
    ];

    let out = sink_exits(body, &NoRaiseInfo);

    assert_eq!(
        out,
        vec![
            func_info("f", 2),
            label(2),
            is_eq(3, x(0), x(1)),
            ret(),
            label(4),
            mov(int(1), x(0)),
            ret(),
            label(3),
            block,
            badmatch(x(1)),
        ]
    );
}

#[test]
fn bs_context_lead_in_moves_with_the_stub() {
    let lead = Instruction::BsContextToBinary(x(0));
    let body = vec![
        func_info("f", 2),
        label(2),
        is_eq(3, x(0), x(1)),
        ret(),
        label(3),
        lead.clone(),
        badmatch(x(0)),
        label(4),
        mov(int(1), x(0)),
        ret(),
    ];

    let out = sink_exits(body, &NoRaiseInfo);

    assert_eq!(
        out,
        vec![
            func_info("f", 2),
            label(2),
            is_eq(3, x(0), x(1)),
            ret(),
            label(4),
            mov(int(1), x(0)),
            ret(),
            label(3),
            lead,
            badmatch(x(0)),
        ]
    );
}

#[test]
fn raising_call_is_an_exit_only_with_oracle_backing() {
    let raise = Instruction::CallExt {
        arity: 1,
        func: ExtFunc::new("rt", "raise", 1),
    };
    let body = vec![
        func_info("f", 2),
        label(2),
        is_eq(3, x(0), x(1)),
        ret(),
        label(3),
        raise.clone(),
        label(4),
        mov(int(1), x(0)),
        ret(),
    ];

    let conservative = sink_exits(body.clone(), &NoRaiseInfo);
    assert_eq!(conservative, body);

    let oracle = KnownRaises(vec![ExtFunc::new("rt", "raise", 1)]);
    let informed = sink_exits(body, &oracle);
    assert_eq!(
        informed,
        vec![
            func_info("f", 2),
            label(2),
            is_eq(3, x(0), x(1)),
            ret(),
            label(4),
            mov(int(1), x(0)),
            ret(),
            label(3),
            raise,
        ]
    );
}
