//! Contains the source context, which owns the LLVM state behind every module
//! being inspected.

pub mod module;

use inkwell::{context::Context as LLVMContext, module::Module};
use irlens_errors::binding::{Error, Result};
use module::SourceModule;
use ouroboros::self_referencing;
use tracing::debug;

use crate::module::{ModuleMut, ModuleRef};

/// The source context manages the LLVM state across inspections of the IR.
///
/// Every [`ModuleRef`] handed out by this context, and every value derived from
/// it, borrows from the context and so cannot outlive it.
///
/// # Self-Reference
///
/// We use the [`ouroboros`] crate to create a struct that can contain a field
/// and references to that field at once. These references do not leak into the
/// crate boundary.
///
/// Do note that _this requires unsafe code_, but that said unsafe code is
/// encapsulated within the library.
#[self_referencing]
#[derive(Debug)]
pub struct SourceContext {
    /// The underlying context that contains the LLVM representation of the
    /// input IR.
    llvm_context: LLVMContext,

    /// The modules that have been added to the LLVM context.
    #[borrows(llvm_context)]
    #[not_covariant]
    modules: Vec<Module<'this>>,
}

impl SourceContext {
    /// Creates a new, empty, source context.
    #[must_use]
    pub fn create() -> Self {
        let llvm_context = LLVMContext::create();

        SourceContextBuilder {
            llvm_context,
            modules_builder: |_| Vec::new(),
        }
        .build()
    }

    /// Parses the provided `module` and adds it to the context.
    ///
    /// # Errors
    ///
    /// - [`Error::UnableToAddModuleToContext`] if the module cannot be loaded
    ///   or is not valid IR.
    pub fn add_module(
        &mut self,
        module: impl TryInto<SourceModule, Error = impl ToString>,
    ) -> Result<()> {
        let module_source = module
            .try_into()
            .map_err(|e| Error::UnableToAddModuleToContext(e.to_string()))?;

        self.with_mut(|all_fields| -> Result<()> {
            let ctx = &all_fields.llvm_context;
            let module = ctx
                .create_module_from_ir(module_source.into())
                .map_err(|e| Error::UnableToAddModuleToContext(e.to_string()))?;
            debug!(
                name = %module.get_name().to_string_lossy(),
                functions = module.get_functions().count(),
                globals = module.get_globals().count(),
                "added module to context"
            );
            all_fields.modules.push(module);

            Ok(())
        })
    }

    /// Runs `op` over each module in the context, and returns the results in
    /// the order the modules were added.
    ///
    /// It does not have the ability to modify the underlying modules at all.
    ///
    /// # Errors
    ///
    /// - [`Error`] if `op` fails for any module.
    pub fn analyze_modules<T>(&self, op: impl Fn(ModuleRef<'_>) -> Result<T>) -> Result<Vec<T>> {
        self.with_modules(|mods| mods.iter().map(|m| op(ModuleRef::new(m))).collect())
    }

    /// Runs a modification `op` over each module in the context, returning any
    /// results from the modification.
    ///
    /// The [`ModuleMut`] given to `op` is the only way to change a module, and
    /// can only be obtained here, where the context is borrowed exclusively.
    ///
    /// # Errors
    ///
    /// - [`Error`] if `op` fails for any module.
    pub fn modify_modules<T>(&mut self, op: impl Fn(ModuleMut<'_>) -> Result<T>) -> Result<Vec<T>> {
        self.with_modules_mut(|mods| mods.iter_mut().map(|m| op(ModuleMut::new(m))).collect())
    }

    /// Gets the number of modules that have been added to the context.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.with_modules(|mods| mods.len())
    }

    /// Gets a reference to the underlying LLVM context.
    #[must_use]
    pub fn context_raw(&self) -> &LLVMContext {
        self.borrow_llvm_context()
    }
}
