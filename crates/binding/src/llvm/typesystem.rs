//! Types as seen through the bindings.
//!
//! A [`TypeRef`] is a handle to a type that lives inside an LLVM context, and
//! is only valid for as long as the module it was obtained from. An
//! [`LLVMType`] is a context-free description of such a type that can be
//! passed around liberally and compared structurally.

use std::{
    fmt::{Debug, Display, Formatter},
    marker::PhantomData,
};

use inkwell::{
    llvm_sys::{
        core::{
            LLVMCountParamTypes,
            LLVMGetArrayLength2,
            LLVMGetElementType,
            LLVMGetIntTypeWidth,
            LLVMGetParamTypes,
            LLVMGetPointerAddressSpace,
            LLVMGetReturnType,
            LLVMGetTypeKind,
            LLVMGetVectorSize,
            LLVMIsFunctionVarArg,
        },
        prelude::LLVMTypeRef,
        LLVMTypeKind,
    },
    types::{AnyTypeEnum, ArrayType, AsTypeRef, BasicTypeEnum, StructType, VectorType},
};
use irlens_errors::binding::{Error, Result};
use itertools::Itertools;

use crate::llvm::native::print_type;

/// A handle to an LLVM type, valid for as long as the module it was obtained
/// from.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct TypeRef<'m> {
    handle: LLVMTypeRef,
    _module: PhantomData<&'m ()>,
}

impl<'m> TypeRef<'m> {
    /// Wraps the native type `handle`.
    ///
    /// # Safety
    ///
    /// The handle must be a valid, non-null type that lives at least as long as
    /// `'m`.
    #[must_use]
    pub unsafe fn from_raw(handle: LLVMTypeRef) -> Self {
        Self {
            handle,
            _module: PhantomData,
        }
    }

    /// Gets the underlying native handle.
    #[must_use]
    pub fn as_raw(&self) -> LLVMTypeRef {
        self.handle
    }

    /// Gets the LLVM type kind of this type.
    #[must_use]
    pub fn kind(&self) -> LLVMTypeKind {
        unsafe { LLVMGetTypeKind(self.handle) }
    }

    /// Returns `true` if this is an integer type, and `false` otherwise.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.kind() == LLVMTypeKind::LLVMIntegerTypeKind
    }

    /// Gets the primitive size of this type in bits.
    ///
    /// This is the width of integer and floating-point types, and the total
    /// width of fixed-length vectors of them. All other types, including
    /// pointers, have no primitive size and report zero.
    #[must_use]
    pub fn type_width(&self) -> u32 {
        match self.kind() {
            LLVMTypeKind::LLVMIntegerTypeKind => unsafe { LLVMGetIntTypeWidth(self.handle) },
            LLVMTypeKind::LLVMHalfTypeKind | LLVMTypeKind::LLVMBFloatTypeKind => 16,
            LLVMTypeKind::LLVMFloatTypeKind => 32,
            LLVMTypeKind::LLVMDoubleTypeKind => 64,
            LLVMTypeKind::LLVMX86_FP80TypeKind => 80,
            LLVMTypeKind::LLVMFP128TypeKind | LLVMTypeKind::LLVMPPC_FP128TypeKind => 128,
            LLVMTypeKind::LLVMVectorTypeKind => {
                let count = unsafe { LLVMGetVectorSize(self.handle) };
                self.element_type().map_or(0, |elem| elem.type_width() * count)
            }
            _ => 0,
        }
    }

    /// Gets the number of elements in an array or vector type, and zero for
    /// every other type.
    #[must_use]
    pub fn element_count(&self) -> u64 {
        match self.kind() {
            LLVMTypeKind::LLVMArrayTypeKind => unsafe { LLVMGetArrayLength2(self.handle) },
            LLVMTypeKind::LLVMVectorTypeKind | LLVMTypeKind::LLVMScalableVectorTypeKind => {
                u64::from(unsafe { LLVMGetVectorSize(self.handle) })
            }
            _ => 0,
        }
    }

    /// Gets the element type of an array or vector type, and [`None`] for every
    /// other type.
    #[must_use]
    pub fn element_type(&self) -> Option<TypeRef<'m>> {
        match self.kind() {
            LLVMTypeKind::LLVMArrayTypeKind => {
                Some(unsafe { ArrayType::new(self.handle) }.get_element_type().into())
            }
            LLVMTypeKind::LLVMVectorTypeKind => {
                Some(unsafe { VectorType::new(self.handle) }.get_element_type().into())
            }
            LLVMTypeKind::LLVMScalableVectorTypeKind => {
                Some(unsafe { Self::from_raw(LLVMGetElementType(self.handle)) })
            }
            _ => None,
        }
    }

    /// Builds the context-free description of this type.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversionError`] if a structure name is not valid UTF-8.
    pub fn describe(&self) -> Result<LLVMType> {
        LLVMType::try_from(*self)
    }
}

impl<'m> From<BasicTypeEnum<'m>> for TypeRef<'m> {
    fn from(ty: BasicTypeEnum<'m>) -> Self {
        Self {
            handle:  ty.as_type_ref(),
            _module: PhantomData,
        }
    }
}

impl<'m> From<AnyTypeEnum<'m>> for TypeRef<'m> {
    fn from(ty: AnyTypeEnum<'m>) -> Self {
        Self {
            handle:  ty.as_type_ref(),
            _module: PhantomData,
        }
    }
}

/// Prints the type exactly as LLVM would in textual IR.
impl Display for TypeRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", unsafe { print_type(self.handle) })
    }
}

impl Debug for TypeRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeRef({self})")
    }
}

/// A representation of the LLVM [types](https://llvm.org/docs/LangRef.html#type-system)
/// that is not tied to any LLVM context.
///
/// # Value Semantics
///
/// It is intended that this type is used as having value semantics, and not
/// ever have a reference returned to it.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum LLVMType {
    /// An [integer type](https://llvm.org/docs/LangRef.html#integer-type) of
    /// any width, including the `i1` boolean.
    Integer { width: u32 },

    /// The IEEE-754 `binary16` [floating point type](https://llvm.org/docs/LangRef.html#floating-point-types).
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    half,

    /// The 16-bit brain floating point type.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    bfloat,

    /// The IEEE-754 `binary32` floating point type.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    float,

    /// The IEEE-754 `binary64` floating point type.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    double,

    /// The 80-bit x87 extended precision floating point type.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    x86_fp80,

    /// The IEEE-754 `binary128` floating point type.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    fp128,

    /// The PowerPC double-double floating point type.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    ppc_fp128,

    /// An opaque [pointer](https://llvm.org/docs/LangRef.html#pointer-type)
    /// into the given address space.
    Pointer { address_space: u32 },

    /// A [type](https://llvm.org/docs/LangRef.html#void-type) that does not
    /// represent any value and has no size.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    void,

    /// The type of basic block labels.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    label,

    /// The type of values that may not be inspected, such as those produced by
    /// `catchpad`.
    #[allow(non_camel_case_types)] // To better match the LLVM internal convention
    token,

    /// Embedded [metadata](https://llvm.org/docs/LangRef.html#metadata-type)
    /// used as a value has this type.
    Metadata,

    /// An [array](https://llvm.org/docs/LangRef.html#array-type) of `count`
    /// elements laid out linearly in memory.
    Array { count: u64, ty: Box<LLVMType> },

    /// A [vector](https://llvm.org/docs/LangRef.html#vector-type) of `count`
    /// elements, or of `vscale * count` elements if it is `scalable`.
    Vector {
        count:    u64,
        scalable: bool,
        ty:       Box<LLVMType>,
    },

    /// A [structure](https://llvm.org/docs/LangRef.html#structure-type), named
    /// if it was declared as an identified type.
    ///
    /// The order of the elements is semantically meaningful.
    Structure {
        name:     Option<String>,
        packed:   bool,
        elements: Vec<LLVMType>,
    },

    /// A [function](https://llvm.org/docs/LangRef.html#function-type) type,
    /// akin to a function signature.
    Function {
        return_type:     Box<LLVMType>,
        parameter_types: Vec<LLVMType>,
        var_args:        bool,
    },

    /// A type whose structure is not visible to us, such as an opaque
    /// structure or a target extension type. It carries LLVM's rendering of
    /// the type.
    Opaque(String),
}

/// Utility constructors for the compound types that avoid having to manage
/// boxing manually.
impl LLVMType {
    /// Builds the integer type of the given `width` in bits.
    #[must_use]
    pub fn int(width: u32) -> Self {
        Self::Integer { width }
    }

    /// Builds an array type containing `elem_count` elements of `elem_type`.
    #[must_use]
    pub fn make_array(elem_count: u64, elem_type: LLVMType) -> Self {
        Self::Array {
            count: elem_count,
            ty:    Box::new(elem_type),
        }
    }

    /// Builds a literal (unnamed) struct type from `elem_types`.
    #[must_use]
    pub fn make_struct(packed: bool, elem_types: &[LLVMType]) -> Self {
        Self::Structure {
            name: None,
            packed,
            elements: Vec::from(elem_types),
        }
    }

    /// Builds a non-variadic function type.
    #[must_use]
    pub fn make_function(return_type: LLVMType, param_types: &[LLVMType]) -> Self {
        Self::Function {
            return_type:     Box::new(return_type),
            parameter_types: Vec::from(param_types),
            var_args:        false,
        }
    }
}

/// This matches the LLVM representations where it is reasonable.
///
/// For arrays and vectors we use the Rust syntax as that is clearer to read
/// than the LLVM product-style syntax.
impl Display for LLVMType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LLVMType::Integer { width } => write!(f, "i{width}"),
            LLVMType::half => write!(f, "half"),
            LLVMType::bfloat => write!(f, "bfloat"),
            LLVMType::float => write!(f, "float"),
            LLVMType::double => write!(f, "double"),
            LLVMType::x86_fp80 => write!(f, "x86_fp80"),
            LLVMType::fp128 => write!(f, "fp128"),
            LLVMType::ppc_fp128 => write!(f, "ppc_fp128"),
            LLVMType::Pointer { address_space: 0 } => write!(f, "ptr"),
            LLVMType::Pointer { address_space } => write!(f, "ptr addrspace({address_space})"),
            LLVMType::void => write!(f, "void"),
            LLVMType::label => write!(f, "label"),
            LLVMType::token => write!(f, "token"),
            LLVMType::Metadata => write!(f, "metadata"),
            LLVMType::Array { count, ty } => write!(f, "[{ty}; {count}]"),
            LLVMType::Vector {
                count,
                scalable,
                ty,
            } => {
                if *scalable {
                    write!(f, "<vscale x {ty}; {count}>")
                } else {
                    write!(f, "<{ty}; {count}>")
                }
            }
            LLVMType::Structure {
                name,
                packed,
                elements,
            } => {
                if let Some(name) = name {
                    write!(f, "%{name} = ")?;
                }
                let elem_strs = elements.iter().map(ToString::to_string).join(", ");
                if *packed {
                    write!(f, "<{{ {elem_strs} }}>")
                } else {
                    write!(f, "{{ {elem_strs} }}")
                }
            }
            LLVMType::Function {
                return_type,
                parameter_types,
                var_args,
            } => {
                let mut params = parameter_types.iter().map(ToString::to_string).collect_vec();
                if *var_args {
                    params.push("...".to_string());
                }
                write!(f, "({}) -> {return_type}", params.join(", "))
            }
            LLVMType::Opaque(text) => write!(f, "{text}"),
        }
    }
}

/// Conversion from a live type handle to our type language.
impl TryFrom<TypeRef<'_>> for LLVMType {
    type Error = Error;

    fn try_from(value: TypeRef<'_>) -> Result<Self> {
        let handle = value.as_raw();
        #[allow(unreachable_patterns)] // Newer LLVM versions may add type kinds
        let result = match value.kind() {
            LLVMTypeKind::LLVMIntegerTypeKind => Self::int(value.type_width()),
            LLVMTypeKind::LLVMHalfTypeKind => Self::half,
            LLVMTypeKind::LLVMBFloatTypeKind => Self::bfloat,
            LLVMTypeKind::LLVMFloatTypeKind => Self::float,
            LLVMTypeKind::LLVMDoubleTypeKind => Self::double,
            LLVMTypeKind::LLVMX86_FP80TypeKind => Self::x86_fp80,
            LLVMTypeKind::LLVMFP128TypeKind => Self::fp128,
            LLVMTypeKind::LLVMPPC_FP128TypeKind => Self::ppc_fp128,
            LLVMTypeKind::LLVMVoidTypeKind => Self::void,
            LLVMTypeKind::LLVMLabelTypeKind => Self::label,
            LLVMTypeKind::LLVMTokenTypeKind => Self::token,
            LLVMTypeKind::LLVMMetadataTypeKind => Self::Metadata,
            LLVMTypeKind::LLVMPointerTypeKind => Self::Pointer {
                address_space: unsafe { LLVMGetPointerAddressSpace(handle) },
            },
            LLVMTypeKind::LLVMArrayTypeKind => {
                let elem = element_of(value)?;
                Self::make_array(value.element_count(), elem)
            }
            LLVMTypeKind::LLVMVectorTypeKind | LLVMTypeKind::LLVMScalableVectorTypeKind => {
                Self::Vector {
                    count:    value.element_count(),
                    scalable: value.kind() == LLVMTypeKind::LLVMScalableVectorTypeKind,
                    ty:       Box::new(element_of(value)?),
                }
            }
            LLVMTypeKind::LLVMStructTypeKind => {
                let structure = unsafe { StructType::new(handle) };
                if structure.is_opaque() {
                    Self::Opaque(value.to_string())
                } else {
                    let name = match structure.get_name() {
                        Some(name) => Some(name.to_str()?.to_string()).filter(|n| !n.is_empty()),
                        None => None,
                    };
                    let elements = structure
                        .get_field_types()
                        .into_iter()
                        .map(|field| Self::try_from(TypeRef::from(field)))
                        .collect::<Result<Vec<_>>>()?;
                    Self::Structure {
                        name,
                        packed: structure.is_packed(),
                        elements,
                    }
                }
            }
            LLVMTypeKind::LLVMFunctionTypeKind => {
                let return_type = Self::try_from(unsafe { TypeRef::from_raw(LLVMGetReturnType(handle)) })?;
                let count = unsafe { LLVMCountParamTypes(handle) } as usize;
                let mut raw_params = vec![std::ptr::null_mut(); count];
                unsafe { LLVMGetParamTypes(handle, raw_params.as_mut_ptr()) };
                let parameter_types = raw_params
                    .into_iter()
                    .map(|p| Self::try_from(unsafe { TypeRef::from_raw(p) }))
                    .collect::<Result<Vec<_>>>()?;
                Self::Function {
                    return_type: Box::new(return_type),
                    parameter_types,
                    var_args: unsafe { LLVMIsFunctionVarArg(handle) } != 0,
                }
            }
            _ => Self::Opaque(value.to_string()),
        };

        Ok(result)
    }
}

/// Describes the element type of the array or vector type `value`.
fn element_of(value: TypeRef<'_>) -> Result<LLVMType> {
    match value.element_type() {
        Some(elem) => LLVMType::try_from(elem),
        None => Err(Error::unexpected_value("array or vector type", value.to_string())),
    }
}

#[cfg(test)]
mod test {
    use crate::{llvm::typesystem::LLVMType, test_utils::with_structure_module};

    #[test]
    fn displays_compound_types() {
        let ty = LLVMType::make_struct(false, &[
            LLVMType::int(32),
            LLVMType::make_array(4, LLVMType::int(8)),
        ]);
        assert_eq!(ty.to_string(), "{ i32, [i8; 4] }");

        let func = LLVMType::make_function(LLVMType::void, &[LLVMType::Pointer { address_space: 0 }]);
        assert_eq!(func.to_string(), "(ptr) -> void");
    }

    #[test]
    fn describes_global_value_types() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let table = module.get_global_variable("table").expect("table exists");
            let ty = table.global_value_type()?;
            assert_eq!(ty.element_count(), 3);
            assert_eq!(ty.describe()?, LLVMType::make_array(3, LLVMType::int(32)));

            let pair = module.get_global_variable("pair").expect("pair exists");
            assert_eq!(
                pair.global_value_type()?.describe()?,
                LLVMType::make_struct(false, &[LLVMType::int(32), LLVMType::double])
            );
            Ok(())
        })
    }

    #[test]
    fn reports_primitive_widths() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let wide = module.get_global_variable("wide").expect("wide exists");
            assert_eq!(wide.global_value_type()?.type_width(), 128);
            assert!(wide.global_value_type()?.is_integer());

            // Globals are themselves pointers, which have no primitive width.
            assert_eq!(wide.type_of().type_width(), 0);
            assert_eq!(wide.type_of().to_string(), "ptr");

            let third = module.get_global_variable("third").expect("third exists");
            assert_eq!(third.global_value_type()?.type_width(), 128);

            let lanes = module.get_global_variable("lanes").expect("lanes exists").global_value_type()?;
            assert_eq!(lanes.type_width(), 128);
            assert_eq!(lanes.describe()?, LLVMType::Vector {
                count:    4,
                scalable: false,
                ty:       Box::new(LLVMType::int(32)),
            });
            Ok(())
        })
    }

    #[test]
    fn describes_function_types() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            assert_eq!(
                sum.global_value_type()?.describe()?,
                LLVMType::make_function(LLVMType::int(32), &[LLVMType::int(32), LLVMType::int(32)])
            );
            Ok(())
        })
    }
}
