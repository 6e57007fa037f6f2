//! This library provides typed, lifetime-checked wrappers over the object model
//! of [LLVM IR](https://llvm.org/docs/LangRef.html), allowing tools to inspect
//! and lightly modify IR from Rust.
//!
//! # Object Model
//!
//! IR is loaded into a [`context::SourceContext`], which hands out a
//! [`module::ModuleRef`] for each module it holds. From there the IR is
//! traversed as a tree of [`value::ValueRef`]s:
//!
//! 1. A module contains functions and global variables.
//! 2. A function contains arguments and basic blocks.
//! 3. A basic block contains instructions.
//! 4. An instruction, constant aggregate, or constant expression has operands.
//!
//! Every value records how it was reached, and this determines what can be
//! asked of it. Asking for the blocks of a global variable, for example, is a
//! usage error rather than a crash.
//!
//! # Safety
//!
//! The wrappers are built on [`inkwell`], reaching into LLVM's C API only for
//! the few queries that it does not expose. Every handle is tied by the
//! `'m` lifetime to a borrow of the module it came from, so that no handle can
//! outlive the LLVM state that it points into.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies
#![allow(clippy::missing_panics_doc)] // Panics are only present in tests

pub mod attribute;
pub mod context;
pub mod llvm;
pub mod module;
pub mod optimize;
pub mod value;

pub use attribute::{AttributeRef, Attributes};
pub use context::SourceContext;
pub use llvm::typesystem::{LLVMType, TypeRef};
pub use module::{ModuleMut, ModuleRef};
pub use optimize::{OptimizationOptions, PipelineLevel};
pub use value::{
    constant::{ConstantOptions, ConstantValue},
    kind::{Linkage, StorageClass, ValueKind, Visibility},
    Provenance,
    ValueRef,
};

#[cfg(test)]
mod test_utils {
    use irlens_errors::binding::Result;

    use crate::{
        context::SourceContext,
        module::{ModuleMut, ModuleRef},
    };

    const STRUCTURE: &str = include_str!("../input/structure.ll");

    fn structure_context() -> anyhow::Result<SourceContext> {
        let mut ctx = SourceContext::create();
        ctx.add_module(("structure.ll", STRUCTURE))?;
        Ok(ctx)
    }

    /// Runs `op` over a freshly loaded copy of `input/structure.ll`.
    pub fn with_structure_module(op: impl Fn(ModuleRef<'_>) -> Result<()>) -> anyhow::Result<()> {
        structure_context()?.analyze_modules(op)?;
        Ok(())
    }

    /// Runs the modifying `op` over a freshly loaded copy of
    /// `input/structure.ll`.
    pub fn with_structure_module_mut(op: impl Fn(ModuleMut<'_>) -> Result<()>) -> anyhow::Result<()> {
        structure_context()?.modify_modules(op)?;
        Ok(())
    }
}
