//! Jump optimization and unreachable-code removal.
//!
//! Runs once per function, as a pipeline of four passes:
//!
//! ```text
//! body -> share_tails -> sink_exits -> peephole -> remove_unused_labels
//! ```
//!
//! - `share`: collapse identical terminated tails into jumps
//! - `sink`: move raising stubs behind the last live instruction
//! - `peephole`: invert tests, drop redundant jumps, merge labels, and
//!   delete unreachable code, iterated to a fixed point
//! - `labels`: drop label definitions nothing references
//!
//! The passes interact: sinking relies on sharing having removed every
//! fall-through into a label, and each peephole rewrite can expose more
//! work for the next walk and for the label cleanup. [`clean_module`]
//! runs the cleanup alone, for stages downstream of here that orphan
//! labels themselves.
//!
//! # Module Organization
//!
//! - `classify`: instruction classifiers, label extraction, raise oracle
//! - `share`: tail sharing
//! - `sink`: exit sinking
//! - `peephole`: branch peephole + pruning fixpoint
//! - `labels`: unused-label removal

mod classify;
mod labels;
mod peephole;
mod share;
mod sink;

#[cfg(test)]
mod sink_tests;

use std::collections::HashSet;

use tern_asm::{Function, Instruction, Label, Module};

use crate::{Error, Result};

pub use classify::{
    NoRaiseInfo, RaiseOracle, branch_targets, is_exit, is_label_used_in, is_unreachable_after,
};
pub use labels::remove_unused_labels;
pub use peephole::peephole;
pub use share::share_tails;
pub use sink::sink_exits;

/// Optimize every function of a module. Exports, attributes, and the
/// literal count are forwarded verbatim.
pub fn optimize_module(module: Module, oracle: &dyn RaiseOracle) -> Result<Module> {
    let mut module = module;
    module.functions = module
        .functions
        .into_iter()
        .map(|f| optimize_function(f, oracle))
        .collect::<Result<_>>()?;
    Ok(module)
}

/// Remove unused labels in every function of a module, without any other
/// rewriting.
pub fn clean_module(module: Module, oracle: &dyn RaiseOracle) -> Result<Module> {
    let mut module = module;
    module.functions = module
        .functions
        .into_iter()
        .map(|f| {
            check_layout(&f)?;
            let Function {
                name,
                arity,
                entry,
                body,
            } = f;
            Ok(Function {
                name,
                arity,
                entry,
                body: remove_unused_labels(body, oracle),
            })
        })
        .collect::<Result<_>>()?;
    Ok(module)
}

/// Optimize one function.
pub fn optimize_function(f: Function, oracle: &dyn RaiseOracle) -> Result<Function> {
    let fc = check_layout(&f)?;
    let Function {
        name,
        arity,
        entry,
        body,
    } = f;
    let body = share_tails(body, oracle);
    let body = sink_exits(body, oracle);
    let body = peephole(body, entry, fc, oracle);
    let body = remove_unused_labels(body, oracle);
    Ok(Function {
        name,
        arity,
        entry,
        body,
    })
}

/// Validate the layout invariants and return the function-class label.
fn check_layout(f: &Function) -> Result<Label> {
    let Some(fc) = f.class_label() else {
        let found = match f.body.first() {
            Some(Instruction::FuncInfo { .. }) => f.body.get(1).cloned(),
            other => other.cloned(),
        };
        return Err(Error::MalformedPrologue {
            function: f.name.clone(),
            arity: f.arity,
            found,
        });
    };

    let mut defined = HashSet::new();
    for ins in &f.body {
        if let Some(l) = ins.defined_label()
            && !defined.insert(l)
        {
            return Err(Error::DuplicateLabel {
                function: f.name.clone(),
                arity: f.arity,
                label: l,
            });
        }
    }
    if !defined.contains(&f.entry) {
        return Err(Error::UndefinedEntry {
            function: f.name.clone(),
            arity: f.arity,
            entry: f.entry,
        });
    }
    Ok(fc)
}
