//! The Tern assembly instruction set.
//!
//! Instructions are the linear, label-addressed form a function takes
//! between lowering and bytecode emission. Control flow is expressed with
//! `Label` pseudo-instructions and explicit branch operands; backend
//! passes rewrite the instruction list without ever resolving labels to
//! offsets (that happens during emission).
//!
//! The enum is closed on purpose: a new instruction either carries no
//! labels, never branches, and never raises (in which case backend passes
//! forward it untouched), or it must be registered with the classifiers
//! in `tern-compiler`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A function-local code label.
///
/// Label numbers are positive and unique within a function. A label is
/// *defined* by an [`Instruction::Label`] occurrence and *referenced* by
/// branch operands of other instructions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// An instruction operand.
///
/// Operands are opaque to the backend passes: they are compared, hashed,
/// and forwarded, never interpreted. Anything without a simple immediate
/// encoding (floats, binaries, big terms) lives in the module literal
/// pool and is referenced by index.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Operand {
    /// An argument/scratch register.
    X(u16),
    /// A stack slot register.
    Y(u16),
    /// An atom immediate.
    Atom(String),
    /// A small integer immediate.
    Int(i64),
    /// The empty list.
    Nil,
    /// An index into the module literal pool.
    Literal(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::X(n) => write!(f, "x{n}"),
            Operand::Y(n) => write!(f, "y{n}"),
            Operand::Atom(a) => write!(f, "{a}"),
            Operand::Int(i) => write!(f, "{i}"),
            Operand::Nil => write!(f, "[]"),
            Operand::Literal(i) => write!(f, "lit{i}"),
        }
    }
}

/// An external callee, identified module:function/arity.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ExtFunc {
    pub module: String,
    pub function: String,
    pub arity: u8,
}

impl ExtFunc {
    pub fn new(module: &str, function: &str, arity: u8) -> Self {
        ExtFunc {
            module: module.to_string(),
            function: function.to_string(),
            arity,
        }
    }
}

impl fmt::Display for ExtFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.module, self.function, self.arity)
    }
}

/// Conditional-branch opcodes.
///
/// A test branches to its fail label when the condition does not hold and
/// falls through otherwise. Exactly the six symmetric comparisons have an
/// inversion; every other test is one-directional.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TestOp {
    IsLt,
    IsGe,
    IsEq,
    IsNe,
    IsEqExact,
    IsNeExact,
    IsAtom,
    IsBinary,
    IsFloat,
    IsFunction,
    IsInteger,
    IsList,
    IsMap,
    IsNil,
    IsNonemptyList,
    IsNumber,
    IsPid,
    IsPort,
    IsReference,
    IsTaggedTuple,
    IsTuple,
    TestArity,
}

impl TestOp {
    /// The opcode testing the negated condition, if one exists.
    pub fn inverse(self) -> Option<TestOp> {
        match self {
            TestOp::IsLt => Some(TestOp::IsGe),
            TestOp::IsGe => Some(TestOp::IsLt),
            TestOp::IsEq => Some(TestOp::IsNe),
            TestOp::IsNe => Some(TestOp::IsEq),
            TestOp::IsEqExact => Some(TestOp::IsNeExact),
            TestOp::IsNeExact => Some(TestOp::IsEqExact),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TestOp::IsLt => "is_lt",
            TestOp::IsGe => "is_ge",
            TestOp::IsEq => "is_eq",
            TestOp::IsNe => "is_ne",
            TestOp::IsEqExact => "is_eq_exact",
            TestOp::IsNeExact => "is_ne_exact",
            TestOp::IsAtom => "is_atom",
            TestOp::IsBinary => "is_binary",
            TestOp::IsFloat => "is_float",
            TestOp::IsFunction => "is_function",
            TestOp::IsInteger => "is_integer",
            TestOp::IsList => "is_list",
            TestOp::IsMap => "is_map",
            TestOp::IsNil => "is_nil",
            TestOp::IsNonemptyList => "is_nonempty_list",
            TestOp::IsNumber => "is_number",
            TestOp::IsPid => "is_pid",
            TestOp::IsPort => "is_port",
            TestOp::IsReference => "is_reference",
            TestOp::IsTaggedTuple => "is_tagged_tuple",
            TestOp::IsTuple => "is_tuple",
            TestOp::TestArity => "test_arity",
        }
    }
}

impl fmt::Display for TestOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary-syntax opcodes that carry an optional failure label in their
/// first position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BsOp {
    Init2,
    InitBits,
    PutInteger,
    PutFloat,
    PutBinary,
    PutUtf8,
    PutUtf16,
    PutUtf32,
    Add,
    Append,
    Utf8Size,
    Utf16Size,
}

impl BsOp {
    pub fn name(self) -> &'static str {
        match self {
            BsOp::Init2 => "bs_init2",
            BsOp::InitBits => "bs_init_bits",
            BsOp::PutInteger => "bs_put_integer",
            BsOp::PutFloat => "bs_put_float",
            BsOp::PutBinary => "bs_put_binary",
            BsOp::PutUtf8 => "bs_put_utf8",
            BsOp::PutUtf16 => "bs_put_utf16",
            BsOp::PutUtf32 => "bs_put_utf32",
            BsOp::Add => "bs_add",
            BsOp::Append => "bs_append",
            BsOp::Utf8Size => "bs_utf8_size",
            BsOp::Utf16Size => "bs_utf16_size",
        }
    }
}

impl fmt::Display for BsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Straight-line operations allowed inside a [`Instruction::Block`].
///
/// Blocks are opaque fragments with no internal control flow; a block op
/// may *reference* a failure label but labels can never be defined inside
/// a block (there is no label variant here, so the invariant holds by
/// construction).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BlockOp {
    Set {
        dst: Operand,
        args: Vec<Operand>,
    },
    Bif {
        op: String,
        fail: Option<Label>,
        args: Vec<Operand>,
        dst: Operand,
    },
    GcBif {
        op: String,
        fail: Option<Label>,
        live: u32,
        args: Vec<Operand>,
        dst: Operand,
    },
    Catch {
        dst: Operand,
        handler: Label,
    },
}

/// A single Tern assembly instruction.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Instruction {
    /// Defines `Label` at this position.
    Label(Label),
    /// Function prologue sentinel; raises a function-clause error when
    /// entered, so control never falls through it into the body.
    FuncInfo {
        module: String,
        function: String,
        arity: u8,
    },
    /// Unconditional branch.
    Jump(Label),
    Move {
        src: Operand,
        dst: Operand,
    },
    /// Conditional branch to `fail` when `op` does not hold. Destructive
    /// tests carry their destination and liveness in `args`; backend
    /// passes only read `op` and `fail`.
    Test {
        op: TestOp,
        fail: Label,
        args: Vec<Operand>,
    },
    /// Multi-way dispatch on a value; branches to `fail` when no case
    /// matches and never falls through.
    SelectVal {
        arg: Operand,
        fail: Label,
        cases: Vec<(Operand, Label)>,
    },
    /// Multi-way dispatch on tuple arity.
    SelectTupleArity {
        arg: Operand,
        fail: Label,
        cases: Vec<(Operand, Label)>,
    },
    Call {
        arity: u8,
        entry: Label,
    },
    CallLast {
        arity: u8,
        entry: Label,
        dealloc: u32,
    },
    CallOnly {
        arity: u8,
        entry: Label,
    },
    CallExt {
        arity: u8,
        func: ExtFunc,
    },
    CallExtLast {
        arity: u8,
        func: ExtFunc,
        dealloc: u32,
    },
    CallExtOnly {
        arity: u8,
        func: ExtFunc,
    },
    ApplyLast {
        arity: u8,
        dealloc: u32,
    },
    Return,
    /// Suspend until a message arrives, then resume at the label.
    Wait(Label),
    /// Suspend until a message arrives or the timeout fires; falls
    /// through on timeout.
    WaitTimeout {
        resume: Label,
        timeout: Operand,
    },
    /// Pick up the next message, branching to `fail` when the mailbox is
    /// empty.
    LoopRec {
        fail: Label,
        dst: Operand,
    },
    /// Remove the current message and loop back to the receive label.
    LoopRecEnd(Label),
    Try {
        reg: Operand,
        handler: Label,
    },
    TryEnd(Operand),
    Catch {
        reg: Operand,
        handler: Label,
    },
    CatchEnd(Operand),
    Kill(Operand),
    Deallocate(u32),
    Bif {
        op: String,
        fail: Option<Label>,
        args: Vec<Operand>,
        dst: Operand,
    },
    GcBif {
        op: String,
        fail: Option<Label>,
        live: u32,
        args: Vec<Operand>,
        dst: Operand,
    },
    Bs {
        op: BsOp,
        fail: Option<Label>,
        args: Vec<Operand>,
    },
    BsContextToBinary(Operand),
    /// An opaque straight-line fragment.
    Block(Vec<BlockOp>),
    /// Raise a badmatch error with the operand as culprit.
    Badmatch(Operand),
    /// Raise a case-clause error.
    CaseEnd(Operand),
    /// Raise an if-clause error.
    IfEnd,
    /// Raise a try-clause error.
    TryCaseEnd(Operand),
}

impl Instruction {
    /// The label this instruction defines, if it is a definition.
    pub fn defined_label(&self) -> Option<Label> {
        match self {
            Instruction::Label(l) => Some(*l),
            _ => None,
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Instruction::Label(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_inverses_are_symmetric() {
        let pairs = [
            (TestOp::IsLt, TestOp::IsGe),
            (TestOp::IsEq, TestOp::IsNe),
            (TestOp::IsEqExact, TestOp::IsNeExact),
        ];
        for (a, b) in pairs {
            assert_eq!(a.inverse(), Some(b));
            assert_eq!(b.inverse(), Some(a));
        }
    }

    #[test]
    fn shape_tests_have_no_inverse() {
        for op in [
            TestOp::IsAtom,
            TestOp::IsNil,
            TestOp::IsTuple,
            TestOp::TestArity,
            TestOp::IsNonemptyList,
        ] {
            assert_eq!(op.inverse(), None);
        }
    }

    #[test]
    fn label_serializes_as_plain_number() {
        let json = serde_json::to_string(&Label(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn operand_display() {
        assert_eq!(Operand::X(0).to_string(), "x0");
        assert_eq!(Operand::Y(3).to_string(), "y3");
        assert_eq!(Operand::Atom("ok".into()).to_string(), "ok");
        assert_eq!(Operand::Int(-4).to_string(), "-4");
        assert_eq!(Operand::Nil.to_string(), "[]");
        assert_eq!(Operand::Literal(2).to_string(), "lit2");
    }
}
