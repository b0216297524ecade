//! Per-function and per-module assembly records.
//!
//! These are the units the backend pipeline passes between stages: a
//! [`Module`] is one compilation unit, a [`Function`] one lowered
//! function body. Backend passes replace `Function::body` and forward
//! everything else verbatim.

use serde::{Deserialize, Serialize};

use crate::instruction::{Instruction, Label};

/// One lowered function.
///
/// `entry` is the compilation-unit-wide label callers branch to; it must
/// be defined in `body` and no backend pass may delete or move it. The
/// body starts with the `func_info` prologue followed by the function's
/// class label (the destination for argument-shape failures).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub arity: u8,
    pub entry: Label,
    pub body: Vec<Instruction>,
}

impl Function {
    /// The function-class label: the label defined immediately after the
    /// `func_info` prologue. `None` when the body does not have the
    /// required layout.
    pub fn class_label(&self) -> Option<Label> {
        match self.body.as_slice() {
            [Instruction::FuncInfo { .. }, Instruction::Label(fc), ..] => Some(*fc),
            _ => None,
        }
    }
}

/// An exported function and the entry label callers use.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub arity: u8,
    pub label: Label,
}

/// A module attribute, forwarded untouched by the backend.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// One compilation unit.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub exports: Vec<Export>,
    pub attributes: Vec<Attribute>,
    pub functions: Vec<Function>,
    /// Number of entries in the literal pool; `Operand::Literal` indices
    /// are bounded by it.
    pub literal_count: u32,
}

impl Module {
    /// Look up a function by name and arity.
    pub fn function(&self, name: &str, arity: u8) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.name == name && f.arity == arity)
    }
}
