//! The typed inkwell wrapper held by every [`super::ValueRef`].
//!
//! inkwell splits LLVM's single `Value` hierarchy across several wrapper
//! types, and its constructors assume that the caller already knows which one
//! applies. A [`Handle`] classifies a native value once, when it enters the
//! bindings, so that everything downstream can go through the typed API.

use std::{ffi::CStr, marker::PhantomData};

use inkwell::{
    basic_block::BasicBlock,
    llvm_sys::{
        core::{
            LLVMBasicBlockAsValue,
            LLVMGetBasicBlockParent,
            LLVMGetNumOperands,
            LLVMGetOperand,
            LLVMGetParam,
            LLVMGetParamParent,
            LLVMGetTypeKind,
            LLVMGetValueKind,
            LLVMTypeOf,
            LLVMValueAsBasicBlock,
            LLVMValueIsBasicBlock,
        },
        prelude::LLVMValueRef,
        LLVMTypeKind,
        LLVMValueKind,
    },
    types::BasicType,
    values::{AnyValue, AsValueRef, BasicValueEnum, FunctionValue, GlobalValue, InstructionValue},
};
use irlens_errors::binding::{Error, Result};

use crate::{
    llvm::{native::print_value, typesystem::TypeRef},
    value::kind::ValueKind,
};

/// A value whose type inkwell has no wrapper for: metadata, tokens, and the
/// like. Only its kind, type, and printed form are available.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OpaqueValue<'m> {
    raw:       LLVMValueRef,
    _lifetime: PhantomData<&'m ()>,
}

/// A native value, classified into the inkwell wrapper that fits it.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Handle<'m> {
    Global(GlobalValue<'m>),
    Function(FunctionValue<'m>),
    Block(BasicBlock<'m>),
    Instruction(InstructionValue<'m>),
    Basic(BasicValueEnum<'m>),
    Opaque(OpaqueValue<'m>),
}

impl<'m> Handle<'m> {
    /// Classifies the native `raw` value.
    ///
    /// # Safety
    ///
    /// `raw` must be a valid, non-null value owned by a module that lives for
    /// at least `'m`.
    pub(crate) unsafe fn from_raw(raw: LLVMValueRef) -> Self {
        if LLVMValueIsBasicBlock(raw) != 0 {
            // inkwell keeps `BasicBlock::new` crate-private, so the block is
            // recovered through its parent function.
            let raw_block = LLVMValueAsBasicBlock(raw);
            if let Some(function) = FunctionValue::new(LLVMGetBasicBlockParent(raw_block)) {
                if let Some(block) =
                    function.get_basic_block_iter().find(|b| b.as_mut_ptr() == raw_block)
                {
                    return Self::Block(block);
                }
            }
        }

        match LLVMGetValueKind(raw) {
            LLVMValueKind::LLVMFunctionValueKind => {
                if let Some(function) = FunctionValue::new(raw) {
                    return Self::Function(function);
                }
            }
            LLVMValueKind::LLVMGlobalVariableValueKind
            | LLVMValueKind::LLVMGlobalAliasValueKind
            | LLVMValueKind::LLVMGlobalIFuncValueKind => return Self::Global(GlobalValue::new(raw)),
            LLVMValueKind::LLVMInstructionValueKind => {
                return Self::Instruction(InstructionValue::new(raw));
            }
            _ => {}
        }

        match LLVMGetTypeKind(LLVMTypeOf(raw)) {
            LLVMTypeKind::LLVMIntegerTypeKind
            | LLVMTypeKind::LLVMHalfTypeKind
            | LLVMTypeKind::LLVMFloatTypeKind
            | LLVMTypeKind::LLVMDoubleTypeKind
            | LLVMTypeKind::LLVMX86_FP80TypeKind
            | LLVMTypeKind::LLVMFP128TypeKind
            | LLVMTypeKind::LLVMPPC_FP128TypeKind
            | LLVMTypeKind::LLVMStructTypeKind
            | LLVMTypeKind::LLVMPointerTypeKind
            | LLVMTypeKind::LLVMArrayTypeKind
            | LLVMTypeKind::LLVMVectorTypeKind => Self::Basic(BasicValueEnum::new(raw)),
            _ => Self::Opaque(OpaqueValue {
                raw,
                _lifetime: PhantomData,
            }),
        }
    }

    /// Gets the native value behind the handle.
    pub(crate) fn raw(&self) -> LLVMValueRef {
        match self {
            Self::Global(global) => global.as_value_ref(),
            Self::Function(function) => function.as_value_ref(),
            Self::Block(block) => unsafe { LLVMBasicBlockAsValue(block.as_mut_ptr()) },
            Self::Instruction(inst) => inst.as_value_ref(),
            Self::Basic(value) => value.as_value_ref(),
            Self::Opaque(opaque) => opaque.raw,
        }
    }

    /// Gets the kind of the value as LLVM classifies it.
    pub(crate) fn kind(&self) -> Result<ValueKind> {
        match self {
            Self::Block(_) => Ok(ValueKind::BasicBlock),
            Self::Function(_) => Ok(ValueKind::Function),
            Self::Instruction(_) => Ok(ValueKind::Instruction),
            _ => ValueKind::try_from(unsafe { LLVMGetValueKind(self.raw()) } as u32),
        }
    }

    /// Prints the value as it appears in textual IR.
    pub(crate) fn print(&self) -> String {
        match self {
            Self::Global(global) => global.as_pointer_value().print_to_string().to_string(),
            Self::Function(function) => function.print_to_string().to_string(),
            Self::Instruction(inst) => inst.print_to_string().to_string(),
            Self::Basic(value) => value.print_to_string().to_string(),
            Self::Block(_) | Self::Opaque(_) => unsafe { print_value(self.raw()) },
        }
    }

    pub(crate) fn name(&self) -> Result<String> {
        let name: Option<&CStr> = match self {
            Self::Global(global) => Some(global.get_name()),
            Self::Function(function) => Some(function.get_name()),
            Self::Block(block) => Some(block.get_name()),
            Self::Instruction(inst) => inst.get_name(),
            Self::Basic(value) => Some(match value {
                BasicValueEnum::ArrayValue(v) => v.get_name(),
                BasicValueEnum::IntValue(v) => v.get_name(),
                BasicValueEnum::FloatValue(v) => v.get_name(),
                BasicValueEnum::PointerValue(v) => v.get_name(),
                BasicValueEnum::StructValue(v) => v.get_name(),
                BasicValueEnum::VectorValue(v) => v.get_name(),
            }),
            Self::Opaque(_) => None,
        };
        Ok(name.map(CStr::to_str).transpose()?.unwrap_or_default().to_string())
    }

    /// Renames the value. LLVM may adjust the name to keep it unique within
    /// its symbol table.
    pub(crate) fn set_name(&self, name: &str) -> Result<()> {
        match self {
            Self::Global(global) => global.as_pointer_value().set_name(name),
            Self::Function(function) => function.as_global_value().as_pointer_value().set_name(name),
            Self::Block(block) => block.set_name(name),
            Self::Instruction(inst) => inst
                .set_name(name)
                .map_err(|e| Error::unexpected_value("a nameable instruction", e))?,
            Self::Basic(value) => match value {
                BasicValueEnum::ArrayValue(v) => v.set_name(name),
                BasicValueEnum::IntValue(v) => v.set_name(name),
                BasicValueEnum::FloatValue(v) => v.set_name(name),
                BasicValueEnum::PointerValue(v) => v.set_name(name),
                BasicValueEnum::StructValue(v) => v.set_name(name),
                BasicValueEnum::VectorValue(v) => v.set_name(name),
            },
            Self::Opaque(_) => Err(Error::unexpected_value("a nameable value", self.print()))?,
        }
        Ok(())
    }

    /// Gets the LLVM type of the value.
    pub(crate) fn type_of(&self) -> TypeRef<'m> {
        match self {
            Self::Global(global) => global.as_pointer_value().get_type().as_basic_type_enum().into(),
            Self::Function(function) => function
                .as_global_value()
                .as_pointer_value()
                .get_type()
                .as_basic_type_enum()
                .into(),
            Self::Basic(value) => value.get_type().into(),
            // Instructions and blocks may have label, token, or void types,
            // which inkwell's type enums cannot hold.
            Self::Block(_) | Self::Instruction(_) | Self::Opaque(_) => unsafe {
                TypeRef::from_raw(LLVMTypeOf(self.raw()))
            },
        }
    }

    /// Views a function or global variable as a global value.
    pub(crate) fn global_value(&self) -> Option<GlobalValue<'m>> {
        match self {
            Self::Global(global) => Some(*global),
            Self::Function(function) => Some(function.as_global_value()),
            _ => None,
        }
    }

    pub(crate) fn function(&self) -> Option<FunctionValue<'m>> {
        match self {
            Self::Function(function) => Some(*function),
            _ => None,
        }
    }

    pub(crate) fn block(&self) -> Option<BasicBlock<'m>> {
        match self {
            Self::Block(block) => Some(*block),
            _ => None,
        }
    }

    pub(crate) fn instruction(&self) -> Option<InstructionValue<'m>> {
        match self {
            Self::Instruction(inst) => Some(*inst),
            _ => None,
        }
    }

    pub(crate) fn basic(&self) -> Option<BasicValueEnum<'m>> {
        match self {
            Self::Basic(value) => Some(*value),
            _ => None,
        }
    }

    /// Counts the operands of the value.
    ///
    /// inkwell only reads the operands of instructions, and panics on metadata
    /// operands such as those of `llvm.dbg.declare`, so operands are read
    /// natively for every kind of user.
    #[allow(clippy::cast_sign_loss)] // The operand count is never negative
    pub(crate) fn operand_count(&self) -> u32 {
        unsafe { LLVMGetNumOperands(self.raw()) }.max(0) as u32
    }

    /// Gets the operand at `index`, if there is one.
    pub(crate) fn operand(&self, index: u32) -> Option<Self> {
        if index >= self.operand_count() {
            return None;
        }
        let operand = unsafe { LLVMGetOperand(self.raw(), index) };
        (!operand.is_null()).then(|| unsafe { Self::from_raw(operand) })
    }

    /// Gets the parameter of `function` at `index`, which must be in range.
    pub(crate) fn param(function: FunctionValue<'m>, index: u32) -> Self {
        unsafe { Self::from_raw(LLVMGetParam(function.as_value_ref(), index)) }
    }

    /// Gets the function that this argument belongs to. inkwell offers no way
    /// back from an argument to its function.
    pub(crate) fn param_parent(&self) -> Option<FunctionValue<'m>> {
        if !matches!(self.kind(), Ok(ValueKind::Argument)) {
            return None;
        }
        unsafe { FunctionValue::new(LLVMGetParamParent(self.raw())) }
    }
}

impl<'m> From<BasicBlock<'m>> for Handle<'m> {
    fn from(block: BasicBlock<'m>) -> Self {
        Self::Block(block)
    }
}

impl<'m> From<FunctionValue<'m>> for Handle<'m> {
    fn from(function: FunctionValue<'m>) -> Self {
        Self::Function(function)
    }
}

impl<'m> From<GlobalValue<'m>> for Handle<'m> {
    fn from(global: GlobalValue<'m>) -> Self {
        Self::Global(global)
    }
}

impl<'m> From<InstructionValue<'m>> for Handle<'m> {
    fn from(inst: InstructionValue<'m>) -> Self {
        Self::Instruction(inst)
    }
}

impl<'m> From<BasicValueEnum<'m>> for Handle<'m> {
    /// inkwell wraps globals and instructions as basic values too, such as
    /// when they are an initializer, so the value is classified again.
    fn from(value: BasicValueEnum<'m>) -> Self {
        unsafe { Self::from_raw(value.as_value_ref()) }
    }
}

#[cfg(test)]
mod test {
    use crate::{test_utils::with_structure_module, value::kind::ValueKind};

    #[test]
    fn classifies_into_typed_wrappers() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            assert!(sum.handle().function().is_some());
            assert!(sum.handle().global_value().is_some());

            let counter = module.get_global_variable("counter").expect("counter exists");
            assert!(counter.handle().global_value().is_some());
            assert!(counter.handle().function().is_none());

            let entry = sum.blocks()?.next().expect("sum has blocks");
            assert!(entry.handle().block().is_some());
            assert_eq!(entry.handle().kind()?, ValueKind::BasicBlock);

            let arg = sum.arguments()?.next().expect("sum has arguments");
            assert!(arg.handle().basic().is_some());
            assert_eq!(arg.handle().param_parent(), sum.handle().function());

            let cmp = entry.instructions()?.next().expect("entry is not empty");
            assert!(cmp.handle().instruction().is_some());
            assert_eq!(cmp.handle().operand_count(), 2);
            assert!(cmp.handle().operand(2).is_none());
            Ok(())
        })
    }
}
