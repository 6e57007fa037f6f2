//! Values in the LLVM IR object model.
//!
//! A [`ValueRef`] is a handle to one of LLVM's values: a global, a function, a
//! basic block, an argument, an instruction, an operand, or an initializer. It
//! records how it was obtained (its [`Provenance`]), and holds strong
//! references to the wrappers it was derived from so that they are released
//! only after it is.

pub mod constant;
pub mod edit;
pub(crate) mod handle;
pub mod iter;
pub mod kind;

use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    rc::Rc,
};

use inkwell::{
    basic_block::BasicBlock,
    llvm_sys::core::{LLVMGetGEPSourceElementType, LLVMGetIndices, LLVMGetNumIndices, LLVMGlobalGetValueType},
    types::AnyType,
    values::{AsValueRef, FunctionValue, GlobalValue, InstructionValue, PhiValue},
};
use irlens_errors::binding::{Error, Result};
use itertools::Itertools;
use tracing::debug;

use crate::{
    attribute::Attributes,
    llvm::{
        opcode::{opcode_name, MEMORY_OPCODES},
        typesystem::TypeRef,
    },
    module::ModuleRef,
    value::{
        handle::Handle,
        iter::{ArgumentsIter, BlocksIter, IncomingBlocksIter, IndicesIter, InstructionsIter, OperandsIter, ValueIter},
        kind::{Linkage, StorageClass, ValueKind, Visibility},
    },
};

/// How a value was obtained, which determines the operations that may be
/// performed on it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Provenance {
    /// A global variable obtained from its module.
    Global,

    /// A function obtained from its module.
    Function,

    /// A basic block obtained from its function, or as an incoming block of a
    /// `phi` instruction.
    Block,

    /// An argument obtained from its function.
    Argument,

    /// An instruction obtained from its basic block.
    Instruction,

    /// An operand obtained from its instruction or constant.
    Operand,

    /// The initializer of a global variable.
    Initializer,
}

impl Provenance {
    /// Gets the name of the provenance as used in diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Function => "function",
            Self::Block => "block",
            Self::Argument => "argument",
            Self::Instruction => "instruction",
            Self::Operand => "operand",
            Self::Initializer => "initializer",
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The wrappers that a value was derived from.
///
/// These are retained purely to keep the owners alive for as long as the
/// derived value, and are never used to drive traversal.
#[derive(Clone, Default)]
pub struct Parents<'m> {
    /// The module that a function or global was obtained from.
    pub module: Option<ModuleRef<'m>>,

    /// The function that an argument or basic block was obtained from.
    pub function: Option<ValueRef<'m>>,

    /// The basic block that an instruction was obtained from.
    pub block: Option<ValueRef<'m>>,

    /// The instruction or constant that an operand was obtained from.
    pub instruction: Option<ValueRef<'m>>,
}

/// A handle to an LLVM value.
///
/// Cloning a value is cheap, and produces another handle to the same native
/// value. Equality and hashing are by native identity.
#[derive(Clone)]
pub struct ValueRef<'m> {
    handle:     Handle<'m>,
    provenance: Provenance,
    parents:    Rc<Parents<'m>>,
}

/// Construction and access to how the value was obtained.
impl<'m> ValueRef<'m> {
    pub(crate) fn new(handle: Handle<'m>, provenance: Provenance, parents: Rc<Parents<'m>>) -> Self {
        Self {
            handle,
            provenance,
            parents,
        }
    }

    /// Gets the typed wrapper around the native value.
    pub(crate) fn handle(&self) -> Handle<'m> {
        self.handle
    }

    /// Gets how this value was obtained.
    #[must_use]
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// The module this function or global variable was obtained from.
    #[must_use]
    pub fn module(&self) -> Option<ModuleRef<'m>> {
        self.parents.module
    }

    /// The function this argument or basic block was obtained from.
    #[must_use]
    pub fn function(&self) -> Option<&ValueRef<'m>> {
        self.parents.function.as_ref()
    }

    /// The block this instruction was obtained from.
    #[must_use]
    pub fn block(&self) -> Option<&ValueRef<'m>> {
        self.parents.block.as_ref()
    }

    /// The instruction this operand was obtained from.
    #[must_use]
    pub fn instruction(&self) -> Option<&ValueRef<'m>> {
        self.parents.instruction.as_ref()
    }

    /// Builds the parents for a value derived from this one, with `update`
    /// recording this value in the appropriate slot.
    fn parents_with(&self, update: impl FnOnce(&mut Parents<'m>)) -> Rc<Parents<'m>> {
        let mut parents = (*self.parents).clone();
        update(&mut parents);
        Rc::new(parents)
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.provenance == Provenance::Global
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        self.provenance == Provenance::Function
    }

    #[must_use]
    pub fn is_block(&self) -> bool {
        self.provenance == Provenance::Block
    }

    #[must_use]
    pub fn is_argument(&self) -> bool {
        self.provenance == Provenance::Argument
    }

    #[must_use]
    pub fn is_instruction(&self) -> bool {
        self.provenance == Provenance::Instruction
    }

    #[must_use]
    pub fn is_operand(&self) -> bool {
        self.provenance == Provenance::Operand
    }

    /// Returns `true` if this is an instruction that accesses memory, and
    /// hence has a [`Self::memory_type`].
    #[must_use]
    pub fn is_memory_instruction(&self) -> bool {
        self.is_instruction() && self.opcode().is_ok_and(|op| MEMORY_OPCODES.contains(&op))
    }

    /// Requires that this value was obtained as a `provenance`.
    fn require(&self, provenance: Provenance) -> Result<()> {
        if self.provenance == provenance {
            Ok(())
        } else {
            Err(Error::unexpected_value(
                format!("{provenance} value"),
                self.provenance.as_str(),
            ))
        }
    }

    /// Requires that this value is a global value: a function, global
    /// variable, alias, or ifunc.
    pub(crate) fn require_global_value(&self) -> Result<GlobalValue<'m>> {
        self.handle.global_value().ok_or_else(|| {
            let kind = self.value_kind().map_or_else(|e| e.to_string(), |k| k.to_string());
            Error::unexpected_value("global value", format!("{self} (value kind is {kind})"))
        })
    }

    pub(crate) fn require_function(&self) -> Result<FunctionValue<'m>> {
        self.require(Provenance::Function)?;
        self.handle
            .function()
            .ok_or_else(|| Error::unexpected_value("function value", self.to_string()))
    }

    fn require_block(&self) -> Result<BasicBlock<'m>> {
        self.require(Provenance::Block)?;
        self.handle
            .block()
            .ok_or_else(|| Error::unexpected_value("block value", self.to_string()))
    }

    fn require_instruction(&self) -> Result<InstructionValue<'m>> {
        self.require(Provenance::Instruction)?;
        self.handle
            .instruction()
            .ok_or_else(|| Error::unexpected_value("instruction value", self.to_string()))
    }
}

/// General queries applicable to values.
impl<'m> ValueRef<'m> {
    /// Returns `true` if this value is a constant, and `false` otherwise.
    ///
    /// Note that functions and global variables are constants, as their
    /// addresses are.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.value_kind().is_ok_and(ValueKind::is_constant)
    }

    /// Gets the kind of this value as classified by LLVM.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownEnumValue`] if LLVM reports a kind that we do not know
    ///   about.
    pub fn value_kind(&self) -> Result<ValueKind> {
        self.handle.kind()
    }

    /// Gets the name of the value, which is empty for unnamed values.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversionError`] if the name is not valid UTF-8.
    pub fn name(&self) -> Result<String> {
        self.handle.name()
    }

    /// Gets the linkage of this global value.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a global value.
    pub fn linkage(&self) -> Result<Linkage> {
        Ok(self.require_global_value()?.get_linkage().into())
    }

    /// Gets the visibility of this global value.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a global value.
    pub fn visibility(&self) -> Result<Visibility> {
        Ok(self.require_global_value()?.get_visibility().into())
    }

    /// Gets the DLL storage class of this global value.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a global value.
    pub fn storage_class(&self) -> Result<StorageClass> {
        Ok(self.require_global_value()?.get_dll_storage_class().into())
    }

    /// Gets the LLVM type of this value.
    ///
    /// For global values this is always a pointer; see
    /// [`Self::global_value_type`] for the type of the value being pointed to.
    #[must_use]
    pub fn type_of(&self) -> TypeRef<'m> {
        self.handle.type_of()
    }

    /// Gets the type of the value that this global value refers to, such as the
    /// signature of a function or the type of a variable's initializer.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a global value.
    pub fn global_value_type(&self) -> Result<TypeRef<'m>> {
        if let Some(function) = self.handle.function() {
            return Ok(function.get_type().as_any_type_enum().into());
        }
        let global = self.require_global_value()?;
        Ok(unsafe { TypeRef::from_raw(LLVMGlobalGetValueType(global.as_value_ref())) })
    }

    /// Gets the type of the memory accessed by this instruction.
    ///
    /// This is the allocated type for `alloca`, the loaded type for `load`, the
    /// stored type for `store`, and the source element type for
    /// `getelementptr`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a memory instruction.
    pub fn memory_type(&self) -> Result<TypeRef<'m>> {
        if !self.is_memory_instruction() {
            Err(Error::unexpected_value("memory instruction", self.to_string()))?;
        }
        let inst = self.require_instruction()?;
        let ty: TypeRef<'m> = match self.opcode()? {
            "alloca" => inst
                .get_allocated_type()
                .map_err(|e| Error::unexpected_value("alloca instruction", e))?
                .into(),
            "store" => self
                .handle
                .operand(0)
                .ok_or_else(|| Error::unexpected_value("store with a value operand", self.to_string()))?
                .type_of(),
            "getelementptr" => unsafe { TypeRef::from_raw(LLVMGetGEPSourceElementType(inst.as_value_ref())) },
            _ => self.handle.type_of(),
        };
        Ok(ty)
    }

    /// Returns `true` if this global variable has an initializer.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a global variable.
    pub fn has_initializer(&self) -> Result<bool> {
        Ok(self.initializer()?.is_some())
    }

    /// Gets the initializer of this global variable, or [`None`] if it is
    /// declared externally.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a global variable.
    pub fn initializer(&self) -> Result<Option<ValueRef<'m>>> {
        if self.value_kind()? != ValueKind::GlobalVariable {
            Err(Error::unexpected_value("global variable", self.provenance.as_str()))?;
        }
        let init = self.require_global_value()?.get_initializer();
        Ok(init.map(|init| ValueRef::new(init.into(), Provenance::Initializer, self.parents.clone())))
    }

    /// Returns `true` if this global or function is only declared, rather than
    /// defined, in its module.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a global or function.
    pub fn is_declaration(&self) -> Result<bool> {
        if !(self.is_global() || self.is_function()) {
            Err(Error::unexpected_value(
                "global or function value",
                self.provenance.as_str(),
            ))?;
        }
        Ok(self.require_global_value()?.is_declaration())
    }

    /// Gets the attributes attached to this value.
    ///
    /// Functions and call or invoke instructions produce a list of attribute
    /// sets, one per position. Arguments and globals produce a single set. All
    /// other values have no attributes.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the kind of value cannot be determined.
    pub fn attributes(&self) -> Result<Attributes<'m>> {
        Attributes::of(self)
    }
}

/// Traversal of the structure of the IR.
impl<'m> ValueRef<'m> {
    /// Iterates over the basic blocks of this function.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a function.
    pub fn blocks(&self) -> Result<BlocksIter<'m>> {
        let function = self.require_function()?;
        let parents = self.parents_with(|p| p.function = Some(self.clone()));
        Ok(ValueIter::blocks(function, parents))
    }

    /// Iterates over the arguments of this function.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a function.
    pub fn arguments(&self) -> Result<ArgumentsIter<'m>> {
        let function = self.require_function()?;
        let parents = self.parents_with(|p| p.function = Some(self.clone()));
        Ok(ValueIter::params(function, parents))
    }

    /// Iterates over the instructions of this basic block.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a basic block.
    pub fn instructions(&self) -> Result<InstructionsIter<'m>> {
        let block = self.require_block()?;
        let parents = self.parents_with(|p| p.block = Some(self.clone()));
        Ok(ValueIter::instructions(block, parents))
    }

    /// Iterates over the operands of this instruction, constant aggregate,
    /// constant expression, or alias.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this value does not have operands.
    pub fn operands(&self) -> Result<OperandsIter<'m>> {
        if !self.is_instruction() && !self.value_kind()?.has_constant_operands() {
            Err(Error::unexpected_value(
                "instruction value, constant aggregate, or global",
                self.provenance.as_str(),
            ))?;
        }
        let parents = self.parents_with(|p| p.instruction = Some(self.clone()));
        debug!(count = self.handle.operand_count(), "iterating operands");
        Ok(ValueIter::operands(self.handle, parents))
    }

    /// Gets the name of this instruction's opcode, as written in textual IR.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not an instruction.
    pub fn opcode(&self) -> Result<&'static str> {
        Ok(opcode_name(self.require_instruction()?.get_opcode()))
    }

    /// Iterates over the incoming blocks of this `phi` instruction.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not a `phi` instruction.
    pub fn incoming_blocks(&self) -> Result<IncomingBlocksIter<'m>> {
        if !self.is_instruction() || self.opcode()? != "phi" {
            Err(Error::unexpected_value(
                "phi instruction value",
                self.provenance.as_str(),
            ))?;
        }
        let inst = self.require_instruction()?;
        // SAFETY: the opcode was checked to be `phi` above.
        let phi = unsafe { PhiValue::new(inst.as_value_ref()) };
        let parents = self.parents_with(|p| p.instruction = Some(self.clone()));
        Ok(ValueIter::incoming(phi, parents))
    }

    /// Iterates over the constant indices of this `insertvalue` or
    /// `extractvalue` instruction.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if this is not an `insertvalue` or
    ///   `extractvalue` instruction.
    pub fn indices(&self) -> Result<IndicesIter<'m>> {
        if !self.is_instruction() || !matches!(self.opcode()?, "insertvalue" | "extractvalue") {
            Err(Error::unexpected_value(
                "insertvalue or extractvalue instruction",
                self.provenance.as_str(),
            ))?;
        }
        // inkwell does not expose the index list of aggregate instructions.
        let raw = self.handle.raw();
        let count = unsafe { LLVMGetNumIndices(raw) };
        let indices = unsafe { LLVMGetIndices(raw) };
        let parents = self.parents_with(|p| p.instruction = Some(self.clone()));
        Ok(IndicesIter::new(indices, count, parents))
    }
}

/// Prints the value exactly as LLVM would in textual IR.
impl Display for ValueRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.handle.print())
    }
}

/// Summarizes the value in the style of a reference to it in textual IR.
impl Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = self.name().unwrap_or_default();
        if !name.is_empty() {
            return match self.value_kind() {
                Ok(kind) if kind.is_global_value() => write!(f, "ValueRef(@{name})"),
                Ok(ValueKind::BasicBlock) => write!(f, "ValueRef({name}: ...)"),
                _ => write!(f, "ValueRef(%{name})"),
            };
        }
        if self.is_constant() {
            return write!(f, "ValueRef({self})");
        }
        if self.is_instruction() {
            let opcode = self.opcode().unwrap_or("<unknown>");
            let ops = self
                .operands()
                .map(|ops| ops.map(|op| format!("{op:?}")).join(", "))
                .unwrap_or_default();
            return write!(f, "ValueRef({opcode}, ops=[{ops}])");
        }
        write!(f, "ValueRef({:p}, {})", self.handle.raw(), self.provenance)
    }
}

impl PartialEq for ValueRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.handle.raw() == other.handle.raw()
    }
}

impl Eq for ValueRef<'_> {}

impl Hash for ValueRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.raw().hash(state);
    }
}
