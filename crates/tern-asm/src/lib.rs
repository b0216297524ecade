//! Assembly-level instruction set and module records for the Tern VM.
//!
//! This crate contains:
//! - The instruction set as seen by backend passes (`instruction`)
//! - Per-function and per-module records (`module`)
//! - Human-readable listings for debugging and tests (`dump`)
//!
//! Lowering produces these records, the backend passes in
//! `tern-compiler` rewrite them, and emission turns them into bytecode.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod dump;
pub mod instruction;
pub mod module;

pub use instruction::{BlockOp, BsOp, ExtFunc, Instruction, Label, Operand, TestOp};
pub use module::{Attribute, Export, Function, Module};
