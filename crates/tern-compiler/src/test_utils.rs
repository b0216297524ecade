//! Shared constructors for backend pass tests.

use tern_asm::{ExtFunc, Function, Instruction, Label, Operand, TestOp};

use crate::opt::RaiseOracle;

pub fn label(n: u32) -> Instruction {
    Instruction::Label(Label(n))
}

pub fn jump(n: u32) -> Instruction {
    Instruction::Jump(Label(n))
}

pub fn ret() -> Instruction {
    Instruction::Return
}

pub fn mov(src: Operand, dst: Operand) -> Instruction {
    Instruction::Move { src, dst }
}

pub fn x(n: u16) -> Operand {
    Operand::X(n)
}

pub fn int(i: i64) -> Operand {
    Operand::Int(i)
}

pub fn test(op: TestOp, fail: u32, args: Vec<Operand>) -> Instruction {
    Instruction::Test {
        op,
        fail: Label(fail),
        args,
    }
}

pub fn is_eq(fail: u32, a: Operand, b: Operand) -> Instruction {
    test(TestOp::IsEq, fail, vec![a, b])
}

pub fn badmatch(culprit: Operand) -> Instruction {
    Instruction::Badmatch(culprit)
}

pub fn func_info(name: &str, arity: u8) -> Instruction {
    Instruction::FuncInfo {
        module: "demo".to_string(),
        function: name.to_string(),
        arity,
    }
}

/// A function whose body is `func_info`, the entry label, then `rest`.
pub fn function(name: &str, arity: u8, entry: u32, rest: Vec<Instruction>) -> Function {
    let mut body = vec![func_info(name, arity), label(entry)];
    body.extend(rest);
    Function {
        name: name.to_string(),
        arity,
        entry: Label(entry),
        body,
    }
}

/// Oracle backed by an explicit table of raising callees.
pub struct KnownRaises(pub Vec<ExtFunc>);

impl RaiseOracle for KnownRaises {
    fn always_raises(&self, func: &ExtFunc) -> bool {
        self.0.contains(func)
    }
}
