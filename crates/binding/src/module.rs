//! The entry point into the value graph of a single LLVM module.
//!
//! A [`ModuleRef`] is a read-only view of a module, while a [`ModuleMut`] can
//! only be made from an exclusive borrow of one and is the sole route to
//! modifying the IR.

use std::{
    ffi::CStr,
    fmt::{Debug, Formatter},
    ops::Deref,
    rc::Rc,
};

use inkwell::{
    llvm_sys::prelude::LLVMModuleRef,
    module::Module,
    passes::PassBuilderOptions,
    support::LLVMString,
    targets::TargetMachine,
    values::{FunctionValue, GlobalValue},
};
use irlens_errors::binding::Result;

use crate::value::{
    handle::Handle,
    iter::{ModuleValuesIter, ValueIter},
    Parents,
    Provenance,
    ValueRef,
};

/// The parts of an inkwell [`Module`] that the bindings use.
///
/// [`Module`] is invariant in its context lifetime, so views hold it behind
/// this trait in order to only carry the lifetime of the borrow.
trait ModuleSource<'m> {
    fn raw(&self) -> LLVMModuleRef;

    fn name(&self) -> &CStr;

    fn first_function(&self) -> Option<FunctionValue<'m>>;

    fn first_global(&self) -> Option<GlobalValue<'m>>;

    fn function(&self, name: &str) -> Option<FunctionValue<'m>>;

    fn global(&self, name: &str) -> Option<GlobalValue<'m>>;

    fn run_passes(
        &self,
        passes: &str,
        machine: &TargetMachine,
        options: PassBuilderOptions,
    ) -> std::result::Result<(), LLVMString>;
}

impl<'m, 'ctx: 'm> ModuleSource<'m> for Module<'ctx> {
    fn raw(&self) -> LLVMModuleRef {
        self.as_mut_ptr()
    }

    fn name(&self) -> &CStr {
        self.get_name()
    }

    fn first_function(&self) -> Option<FunctionValue<'m>> {
        self.get_first_function()
    }

    fn first_global(&self) -> Option<GlobalValue<'m>> {
        self.get_first_global()
    }

    fn function(&self, name: &str) -> Option<FunctionValue<'m>> {
        self.get_function(name)
    }

    fn global(&self, name: &str) -> Option<GlobalValue<'m>> {
        self.get_global(name)
    }

    fn run_passes(
        &self,
        passes: &str,
        machine: &TargetMachine,
        options: PassBuilderOptions,
    ) -> std::result::Result<(), LLVMString> {
        Module::run_passes(self, passes, machine, options)
    }
}

/// A borrowed, read-only view of an LLVM module from which values can be
/// obtained.
///
/// Every value obtained through the view is bound to the lifetime `'m` of the
/// borrow, so that no value can outlive the module that owns it.
#[derive(Clone, Copy)]
pub struct ModuleRef<'m> {
    source: &'m dyn ModuleSource<'m>,
}

impl<'m> ModuleRef<'m> {
    /// Creates a view of the provided `module`.
    #[must_use]
    pub fn new<'ctx: 'm>(module: &'m Module<'ctx>) -> Self {
        Self { source: module }
    }

    /// Gets the identifier of the module.
    ///
    /// # Errors
    ///
    /// - [`irlens_errors::binding::Error::CStrConversionError`] if the name is
    ///   not valid UTF-8.
    pub fn name(&self) -> Result<String> {
        Ok(self.source.name().to_str()?.to_string())
    }

    /// Iterates over the functions, both declared and defined, in the module.
    #[must_use]
    pub fn functions(&self) -> ModuleValuesIter<'m> {
        ValueIter::functions(self.source.first_function(), self.parents())
    }

    /// Iterates over the global variables in the module.
    #[must_use]
    pub fn global_variables(&self) -> ModuleValuesIter<'m> {
        ValueIter::globals(self.source.first_global(), self.parents())
    }

    /// Gets the function called `name`, if one exists.
    #[must_use]
    pub fn get_function(&self, name: &str) -> Option<ValueRef<'m>> {
        if name.contains('\0') {
            return None;
        }
        let function = self.source.function(name)?;
        Some(ValueRef::new(Handle::from(function), Provenance::Function, self.parents()))
    }

    /// Gets the global variable called `name`, if one exists.
    #[must_use]
    pub fn get_global_variable(&self, name: &str) -> Option<ValueRef<'m>> {
        if name.contains('\0') {
            return None;
        }
        let global = self.source.global(name)?;
        Some(ValueRef::new(Handle::from(global), Provenance::Global, self.parents()))
    }

    pub(crate) fn run_passes(
        &self,
        passes: &str,
        machine: &TargetMachine,
        options: PassBuilderOptions,
    ) -> std::result::Result<(), LLVMString> {
        self.source.run_passes(passes, machine, options)
    }

    fn parents(&self) -> Rc<Parents<'m>> {
        Rc::new(Parents {
            module: Some(*self),
            ..Parents::default()
        })
    }
}

impl Debug for ModuleRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRef").field("name", &self.source.name()).finish()
    }
}

impl PartialEq for ModuleRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.source.raw() == other.source.raw()
    }
}

impl Eq for ModuleRef<'_> {}

/// A view of an LLVM module that was borrowed exclusively, and hence through
/// which the module may be modified.
///
/// It dereferences to a [`ModuleRef`] for everything that only reads the IR.
/// The modifications themselves live with the values they apply to, in
/// [`crate::value::edit`] and [`crate::optimize`].
#[derive(Debug)]
pub struct ModuleMut<'m> {
    module: ModuleRef<'m>,
}

impl<'m> ModuleMut<'m> {
    /// Creates a modifiable view of the provided `module`.
    #[must_use]
    pub fn new<'ctx: 'm>(module: &'m mut Module<'ctx>) -> Self {
        let module: &'m Module<'ctx> = module;
        Self {
            module: ModuleRef::new(module),
        }
    }

    /// Returns `true` if `value` was obtained from this module.
    pub(crate) fn owns(&self, value: &ValueRef<'m>) -> bool {
        value.module() == Some(self.module)
    }
}

impl<'m> Deref for ModuleMut<'m> {
    type Target = ModuleRef<'m>;

    fn deref(&self) -> &Self::Target {
        &self.module
    }
}
