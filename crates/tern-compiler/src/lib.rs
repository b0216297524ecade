//! Backend passes for Tern VM assembly.
//!
//! The pipeline lowers each function to the linear instruction form in
//! `tern-asm`, runs the passes in this crate over it, and hands the
//! result to bytecode emission. Currently this crate provides:
//! - `opt` - jump optimization and unreachable-code removal
//!
//! Passes assume well-formed input (see [`Error`]); a violated layout
//! invariant is a bug in an upstream stage and aborts the pass with a
//! diagnostic instead of producing partial results.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod opt;

#[cfg(test)]
pub mod test_utils;

use tern_asm::{Instruction, Label};

/// Errors raised when a backend pass receives malformed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The body does not start with `func_info` followed by the
    /// function-class label.
    #[error("{function}/{arity}: body must start with func_info and its class label, found {found:?}")]
    MalformedPrologue {
        function: String,
        arity: u8,
        found: Option<Instruction>,
    },

    /// A label number is defined at more than one position.
    #[error("{function}/{arity}: label {label} is defined more than once")]
    DuplicateLabel {
        function: String,
        arity: u8,
        label: Label,
    },

    /// The caller-visible entry label is not defined in the body.
    #[error("{function}/{arity}: entry label {entry} is not defined in the body")]
    UndefinedEntry {
        function: String,
        arity: u8,
        entry: Label,
    },
}

/// Result type for backend passes.
pub type Result<T> = std::result::Result<T, Error>;
