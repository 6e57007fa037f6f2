//! The fixed enumerations that LLVM uses to classify values.
//!
//! The numeric values of these enumerations are part of LLVM's stable C ABI
//! (see `llvm-c/Core.h`), and hence must match it exactly.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use inkwell::{module::Linkage as LLVMLinkage, DLLStorageClass, GlobalVisibility};
use irlens_errors::binding::Error;

/// Declares a C-compatible enumeration along with its conversions from the raw
/// numeric value and from its textual name.
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $native:literal {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
        #[repr(u32)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            /// Every variant of the enumeration, in ABI order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Gets the name of the variant as LLVM spells it.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl TryFrom<u32> for $name {
            type Error = Error;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(Error::UnknownEnumValue { name: $native, value }),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value as u32
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(Error::unexpected_value($native, s)),
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

native_enum! {
    /// The linkage of a global value, mirroring `LLVMLinkage`.
    pub enum Linkage as "linkage" {
        External = 0 => "external",
        AvailableExternally = 1 => "available_externally",
        LinkOnceAny = 2 => "linkonce_any",
        LinkOnceOdr = 3 => "linkonce_odr",
        /// Obsolete.
        LinkOnceOdrAutoHide = 4 => "linkonce_odr_autohide",
        WeakAny = 5 => "weak_any",
        WeakOdr = 6 => "weak_odr",
        Appending = 7 => "appending",
        Internal = 8 => "internal",
        Private = 9 => "private",
        /// Obsolete.
        DllImport = 10 => "dllimport",
        /// Obsolete.
        DllExport = 11 => "dllexport",
        ExternalWeak = 12 => "external_weak",
        /// Obsolete.
        Ghost = 13 => "ghost",
        Common = 14 => "common",
        LinkerPrivate = 15 => "linker_private",
        LinkerPrivateWeak = 16 => "linker_private_weak",
    }
}

native_enum! {
    /// The visibility of a global value, mirroring `LLVMVisibility`.
    pub enum Visibility as "visibility" {
        Default = 0 => "default",
        Hidden = 1 => "hidden",
        Protected = 2 => "protected",
    }
}

native_enum! {
    /// The DLL storage class of a global value, mirroring
    /// `LLVMDLLStorageClass`.
    pub enum StorageClass as "storage class" {
        Default = 0 => "default",
        DllImport = 1 => "dllimport",
        DllExport = 2 => "dllexport",
    }
}

native_enum! {
    /// The kind of a value, mirroring `LLVMValueKind`.
    pub enum ValueKind as "value kind" {
        Argument = 0 => "argument",
        BasicBlock = 1 => "basic_block",
        MemoryUse = 2 => "memory_use",
        MemoryDef = 3 => "memory_def",
        MemoryPhi = 4 => "memory_phi",
        Function = 5 => "function",
        GlobalAlias = 6 => "global_alias",
        GlobalIFunc = 7 => "global_ifunc",
        GlobalVariable = 8 => "global_variable",
        BlockAddress = 9 => "block_address",
        ConstantExpr = 10 => "constant_expr",
        ConstantArray = 11 => "constant_array",
        ConstantStruct = 12 => "constant_struct",
        ConstantVector = 13 => "constant_vector",
        UndefValue = 14 => "undef_value",
        ConstantAggregateZero = 15 => "constant_aggregate_zero",
        ConstantDataArray = 16 => "constant_data_array",
        ConstantDataVector = 17 => "constant_data_vector",
        ConstantInt = 18 => "constant_int",
        ConstantFp = 19 => "constant_fp",
        ConstantPointerNull = 20 => "constant_pointer_null",
        ConstantTokenNone = 21 => "constant_token_none",
        MetadataAsValue = 22 => "metadata_as_value",
        InlineAsm = 23 => "inline_asm",
        Instruction = 24 => "instruction",
        PoisonValue = 25 => "poison_value",
        ConstantTargetNone = 26 => "constant_target_none",
    }
}

impl ValueKind {
    /// Returns `true` if values of this kind are global values, which carry a
    /// linkage, visibility, and storage class.
    #[must_use]
    pub fn is_global_value(self) -> bool {
        matches!(
            self,
            Self::Function | Self::GlobalAlias | Self::GlobalIFunc | Self::GlobalVariable
        )
    }

    /// Returns `true` if values of this kind are constants. Functions and
    /// global variables count, as their addresses are constant.
    #[must_use]
    pub fn is_constant(self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::GlobalAlias
                | Self::GlobalIFunc
                | Self::GlobalVariable
                | Self::BlockAddress
                | Self::ConstantExpr
                | Self::ConstantArray
                | Self::ConstantStruct
                | Self::ConstantVector
                | Self::UndefValue
                | Self::ConstantAggregateZero
                | Self::ConstantDataArray
                | Self::ConstantDataVector
                | Self::ConstantInt
                | Self::ConstantFp
                | Self::ConstantPointerNull
                | Self::ConstantTokenNone
                | Self::PoisonValue
                | Self::ConstantTargetNone
        )
    }

    /// Returns `true` if values of this kind expose their elements as operands.
    #[must_use]
    pub fn has_constant_operands(self) -> bool {
        matches!(
            self,
            Self::ConstantArray
                | Self::ConstantVector
                | Self::ConstantStruct
                | Self::GlobalAlias
                | Self::ConstantExpr
        )
    }
}

/// Declares the conversions in both directions between one of our enumerations
/// and the inkwell enumeration that mirrors it.
macro_rules! inkwell_conversions {
    ($ours:ident <=> $theirs:ident { $($variant:ident <=> $other:ident,)+ }) => {
        impl From<$ours> for $theirs {
            fn from(value: $ours) -> Self {
                match value {
                    $($ours::$variant => $theirs::$other,)+
                }
            }
        }

        impl From<$theirs> for $ours {
            fn from(value: $theirs) -> Self {
                match value {
                    $($theirs::$other => $ours::$variant,)+
                }
            }
        }
    };
}

inkwell_conversions!(Linkage <=> LLVMLinkage {
    External <=> External,
    AvailableExternally <=> AvailableExternally,
    LinkOnceAny <=> LinkOnceAny,
    LinkOnceOdr <=> LinkOnceODR,
    LinkOnceOdrAutoHide <=> LinkOnceODRAutoHide,
    WeakAny <=> WeakAny,
    WeakOdr <=> WeakODR,
    Appending <=> Appending,
    Internal <=> Internal,
    Private <=> Private,
    DllImport <=> DLLImport,
    DllExport <=> DLLExport,
    ExternalWeak <=> ExternalWeak,
    Ghost <=> Ghost,
    Common <=> Common,
    LinkerPrivate <=> LinkerPrivate,
    LinkerPrivateWeak <=> LinkerPrivateWeak,
});

inkwell_conversions!(Visibility <=> GlobalVisibility {
    Default <=> Default,
    Hidden <=> Hidden,
    Protected <=> Protected,
});

inkwell_conversions!(StorageClass <=> DLLStorageClass {
    Default <=> Default,
    DllImport <=> Import,
    DllExport <=> Export,
});

#[cfg(test)]
mod test {
    use inkwell::{llvm_sys::LLVMValueKind, module::Linkage as LLVMLinkage, DLLStorageClass, GlobalVisibility};
    use irlens_errors::binding::Error;

    use crate::value::kind::{Linkage, StorageClass, ValueKind, Visibility};

    #[test]
    fn converts_to_and_from_inkwell() {
        for linkage in Linkage::ALL {
            assert_eq!(Linkage::from(LLVMLinkage::from(*linkage)), *linkage);
        }
        for visibility in Visibility::ALL {
            assert_eq!(Visibility::from(GlobalVisibility::from(*visibility)), *visibility);
        }
        for class in StorageClass::ALL {
            assert_eq!(StorageClass::from(DLLStorageClass::from(*class)), *class);
        }
        assert_eq!(LLVMLinkage::from(Linkage::WeakOdr), LLVMLinkage::WeakODR);
        assert_eq!(StorageClass::from(DLLStorageClass::Export), StorageClass::DllExport);
    }

    #[test]
    fn value_kinds_match_native_values() -> anyhow::Result<()> {
        assert_eq!(
            ValueKind::try_from(LLVMValueKind::LLVMArgumentValueKind as u32)?,
            ValueKind::Argument
        );
        assert_eq!(
            ValueKind::try_from(LLVMValueKind::LLVMConstantIntValueKind as u32)?,
            ValueKind::ConstantInt
        );
        assert_eq!(
            ValueKind::try_from(LLVMValueKind::LLVMInstructionValueKind as u32)?,
            ValueKind::Instruction
        );
        assert_eq!(
            ValueKind::try_from(LLVMValueKind::LLVMPoisonValueKind as u32)?,
            ValueKind::PoisonValue
        );

        Ok(())
    }

    #[test]
    fn parses_names() -> anyhow::Result<()> {
        assert_eq!("weak_odr".parse::<Linkage>()?, Linkage::WeakOdr);
        assert_eq!("hidden".parse::<Visibility>()?, Visibility::Hidden);
        assert_eq!("dllexport".parse::<StorageClass>()?, StorageClass::DllExport);
        assert!(matches!(
            "sideways".parse::<Visibility>(),
            Err(Error::UnexpectedValue { .. })
        ));

        Ok(())
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            Linkage::try_from(17),
            Err(Error::UnknownEnumValue { name: "linkage", value: 17 })
        ));
        assert!(ValueKind::try_from(99).is_err());
    }

    #[test]
    fn classifies_global_values() {
        assert!(ValueKind::Function.is_global_value());
        assert!(ValueKind::GlobalVariable.is_global_value());
        assert!(!ValueKind::Instruction.is_global_value());
        assert!(ValueKind::ConstantExpr.has_constant_operands());
        assert!(!ValueKind::ConstantDataArray.has_constant_operands());
    }

    #[test]
    fn classifies_constants() {
        assert!(ValueKind::ConstantInt.is_constant());
        assert!(ValueKind::GlobalVariable.is_constant());
        assert!(ValueKind::PoisonValue.is_constant());
        assert!(!ValueKind::Argument.is_constant());
        assert!(!ValueKind::BasicBlock.is_constant());
        assert!(!ValueKind::Instruction.is_constant());
        assert!(!ValueKind::MetadataAsValue.is_constant());
        assert!(!ValueKind::InlineAsm.is_constant());
    }
}
