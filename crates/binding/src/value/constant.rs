//! Extraction of constant values into Rust data.

use std::fmt::{Display, Formatter};

use inkwell::{
    llvm_sys::core::{LLVMGetAggregateElement, LLVMGetAsString},
    values::{ArrayValue, AsValueRef, BasicValueEnum, FloatValue, IntValue},
};
use irlens_errors::binding::{Error, Result};
use itertools::Itertools;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::One;
use tracing::warn;

use crate::{
    llvm::native::copy_bytes,
    value::{handle::Handle, kind::ValueKind, Provenance, ValueRef},
};

/// Options controlling how [`ValueRef::get_constant_value`] interprets the
/// constants it encounters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConstantOptions {
    signed_int: bool,
    round_fp:   bool,
}

impl ConstantOptions {
    /// Creates the default options: integers are read as unsigned, and lossy
    /// floating-point conversions are errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether integers are read as two's-complement signed values.
    #[must_use]
    pub fn with_signed_int(mut self, signed_int: bool) -> Self {
        self.signed_int = signed_int;
        self
    }

    /// Sets whether floating-point constants that cannot be represented exactly
    /// as an [`f64`] are rounded rather than rejected.
    #[must_use]
    pub fn with_round_fp(mut self, round_fp: bool) -> Self {
        self.round_fp = round_fp;
        self
    }

    #[must_use]
    pub fn signed_int(&self) -> bool {
        self.signed_int
    }

    #[must_use]
    pub fn round_fp(&self) -> bool {
        self.round_fp
    }
}

/// The Rust rendition of a constant.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue<'m> {
    /// An integer of any width.
    Int(BigInt),

    /// A floating-point value.
    Float(f64),

    /// Constant data that LLVM can render as a byte string.
    Bytes(Vec<u8>),

    /// The elements of an aggregate, or the operands of a constant expression.
    Sequence(Vec<ConstantValue<'m>>),

    /// A function or basic block, which stands for itself.
    Value(ValueRef<'m>),

    /// Any other constant, as LLVM renders it in textual IR.
    Text(String),
}

impl<'m> ConstantValue<'m> {
    #[must_use]
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Self::Int(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sequence(&self) -> Option<&[ConstantValue<'m>]> {
        match self {
            Self::Sequence(elements) => Some(elements),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&ValueRef<'m>> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Display for ConstantValue<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Bytes(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
            Self::Sequence(elements) => write!(f, "[{}]", elements.iter().join(", ")),
            Self::Value(value) => write!(f, "{value:?}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

impl<'m> ValueRef<'m> {
    /// Converts this constant into its Rust rendition.
    ///
    /// Global variables resolve to the value of their initializer, and
    /// constant expressions to the values of their operands. A global that
    /// is reached again while resolving its own initializer resolves to itself.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAConstant`] if this value is not a constant.
    /// - [`Error::AccuracyLoss`] if a floating-point constant cannot be
    ///   represented exactly as an [`f64`] and rounding was not requested.
    /// - [`Error::MissingInitializer`] if a global variable that must be
    ///   resolved has no initializer.
    pub fn get_constant_value(&self, options: ConstantOptions) -> Result<ConstantValue<'m>> {
        self.constant_value_in(options, &mut Vec::new())
    }

    fn constant_value_in(
        &self,
        options: ConstantOptions,
        resolving: &mut Vec<ValueRef<'m>>,
    ) -> Result<ConstantValue<'m>> {
        let kind = self.value_kind()?;
        if !self.is_constant() && kind != ValueKind::BasicBlock {
            Err(Error::NotAConstant(self.to_string()))?;
        }

        let value = match kind {
            ValueKind::ConstantInt => ConstantValue::Int(self.int_value(self.as_int()?, options)?),
            ValueKind::ConstantFp => ConstantValue::Float(self.float_value(self.as_float()?, options)?),
            ValueKind::ConstantExpr => Self::resolve_elements(self.operands()?, options, resolving)?,
            ValueKind::GlobalVariable => {
                if resolving.contains(self) {
                    return Ok(ConstantValue::Value(self.clone()));
                }
                let init = self
                    .initializer()?
                    .ok_or_else(|| Error::MissingInitializer(self.name().unwrap_or_default()))?;
                resolving.push(self.clone());
                let value = init.constant_value_in(options, resolving);
                resolving.pop();
                value?
            }
            ValueKind::ConstantArray | ValueKind::ConstantVector | ValueKind::ConstantStruct => {
                Self::resolve_elements(self.operands()?, options, resolving)?
            }
            ValueKind::ConstantDataArray | ValueKind::ConstantDataVector => match self.handle.basic() {
                Some(BasicValueEnum::ArrayValue(array)) if array.is_const_string() => {
                    ConstantValue::Bytes(Self::string_bytes(array))
                }
                _ => Self::resolve_elements(self.data_elements(), options, resolving)?,
            },
            ValueKind::Function | ValueKind::BasicBlock => ConstantValue::Value(self.clone()),
            _ => ConstantValue::Text(self.to_string()),
        };

        Ok(value)
    }

    fn resolve_elements(
        elements: impl Iterator<Item = ValueRef<'m>>,
        options: ConstantOptions,
        resolving: &mut Vec<ValueRef<'m>>,
    ) -> Result<ConstantValue<'m>> {
        let values = elements
            .map(|element| element.constant_value_in(options, resolving))
            .collect::<Result<Vec<_>>>()?;
        Ok(ConstantValue::Sequence(values))
    }

    /// Gets the elements of a constant data array or vector, which are not
    /// operands of it.
    #[allow(clippy::cast_possible_truncation)] // Constant data is never 4G elements long
    fn data_elements(&self) -> impl Iterator<Item = ValueRef<'m>> {
        let count = self.type_of().element_count() as u32;
        let parents = self.parents_with(|p| p.instruction = Some(self.clone()));
        let raw = self.handle.raw();
        (0..count)
            .map(move |index| unsafe { LLVMGetAggregateElement(raw, index) })
            .filter(|element| !element.is_null())
            .map(move |element| {
                let handle = unsafe { Handle::from_raw(element) };
                ValueRef::new(handle, Provenance::Operand, parents.clone())
            })
    }

    /// Reads the bytes of a constant string. inkwell returns these as a C
    /// string, which would end at the first NUL byte.
    fn string_bytes(array: ArrayValue<'m>) -> Vec<u8> {
        let mut len = 0;
        let ptr = unsafe { LLVMGetAsString(array.as_value_ref(), &mut len) };
        unsafe { copy_bytes(ptr, len) }
    }

    fn as_int(&self) -> Result<IntValue<'m>> {
        match self.handle.basic() {
            Some(BasicValueEnum::IntValue(value)) => Ok(value),
            _ => Err(Error::MalformedConstant(self.to_string())),
        }
    }

    fn as_float(&self) -> Result<FloatValue<'m>> {
        match self.handle.basic() {
            Some(BasicValueEnum::FloatValue(value)) => Ok(value),
            _ => Err(Error::MalformedConstant(self.to_string())),
        }
    }

    /// Reads a constant integer at the width of its type.
    ///
    /// The value is first laid out as a little-endian buffer of the type's
    /// width rounded up to whole bytes, and then reinterpreted as either an
    /// unsigned or two's-complement signed integer of exactly that width.
    fn int_value(&self, int: IntValue<'m>, options: ConstantOptions) -> Result<BigInt> {
        let width = int.get_type().get_bit_width();
        let bytes = self.int_bytes(int, width)?;

        let value = BigInt::from_bytes_le(Sign::Plus, &bytes);
        if options.signed_int() && width > 0 && value.bit(u64::from(width - 1)) {
            Ok(value - (BigInt::one() << width))
        } else {
            Ok(value)
        }
    }

    fn int_bytes(&self, int: IntValue<'m>, width: u32) -> Result<Vec<u8>> {
        let len = (width as usize).div_ceil(8).max(1);

        let magnitude = if let Some(value) = int.get_zero_extended_constant() {
            BigUint::from(value)
        } else {
            // LLVM offers no accessor for the words of a wide constant, but it
            // prints them as signed decimals in full.
            let text = self.to_string();
            let digits = text.rsplit(' ').next().unwrap_or_default();
            let value = digits
                .parse::<BigInt>()
                .map_err(|_| Error::MalformedConstant(text.clone()))?;
            let value = if value.sign() == Sign::Minus {
                value + (BigInt::one() << width)
            } else {
                value
            };
            value.to_biguint().ok_or(Error::MalformedConstant(text))?
        };

        let mut bytes = magnitude.to_bytes_le();
        bytes.resize(len, 0);
        Ok(bytes)
    }

    fn float_value(&self, float: FloatValue<'m>, options: ConstantOptions) -> Result<f64> {
        let (value, loses_info) = float
            .get_constant()
            .ok_or_else(|| Error::MalformedConstant(self.to_string()))?;
        if loses_info {
            if !options.round_fp() {
                Err(Error::AccuracyLoss(self.to_string()))?;
            }
            warn!(constant = %self, rounded = value, "rounded floating-point constant");
        }
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use irlens_errors::binding::Error;
    use num_bigint::BigInt;

    use crate::{
        test_utils::with_structure_module,
        value::{
            constant::{ConstantOptions, ConstantValue},
            kind::ValueKind,
        },
    };

    #[test]
    fn reads_narrow_integers() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let unsigned = ConstantOptions::new();
            let signed = ConstantOptions::new().with_signed_int(true);

            let counter = module.get_global_variable("counter").expect("counter exists");
            assert_eq!(counter.get_constant_value(unsigned)?, ConstantValue::Int(42.into()));
            assert_eq!(counter.get_constant_value(signed)?, ConstantValue::Int(42.into()));

            let negative = module.get_global_variable("negative").expect("negative exists");
            assert_eq!(negative.get_constant_value(unsigned)?, ConstantValue::Int(253.into()));
            assert_eq!(negative.get_constant_value(signed)?, ConstantValue::Int((-3).into()));
            Ok(())
        })
    }

    #[test]
    fn reads_integers_wider_than_64_bits() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let unsigned = ConstantOptions::new();
            let signed = ConstantOptions::new().with_signed_int(true);

            let wide = module.get_global_variable("wide").expect("wide exists");
            let all_ones = (BigInt::from(1) << 128) - 1;
            assert_eq!(wide.get_constant_value(unsigned)?, ConstantValue::Int(all_ones));
            assert_eq!(wide.get_constant_value(signed)?, ConstantValue::Int((-1).into()));

            let huge = module.get_global_variable("huge").expect("huge exists");
            let expected = (BigInt::from(1) << 80) + 5;
            assert_eq!(huge.get_constant_value(unsigned)?.as_int(), Some(&expected));
            assert_eq!(huge.get_constant_value(signed)?.as_int(), Some(&expected));
            Ok(())
        })
    }

    #[test]
    fn rejects_lossy_floats_unless_rounding() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let ratio = module.get_global_variable("ratio").expect("ratio exists");
            assert_eq!(ratio.get_constant_value(ConstantOptions::new())?, ConstantValue::Float(2.5));

            let third = module.get_global_variable("third").expect("third exists");
            assert!(matches!(
                third.get_constant_value(ConstantOptions::new()),
                Err(Error::AccuracyLoss(_))
            ));

            let rounded = third.get_constant_value(ConstantOptions::new().with_round_fp(true))?;
            let rounded = rounded.as_float().expect("third is a float");
            assert!((rounded - 1.0 / 3.0).abs() < 1e-15);
            Ok(())
        })
    }

    #[test]
    fn reads_aggregates() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let options = ConstantOptions::new();

            let message = module.get_global_variable("message").expect("message exists");
            assert_eq!(message.get_constant_value(options)?.as_bytes(), Some(&b"hello\0"[..]));

            let table = module.get_global_variable("table").expect("table exists");
            assert_eq!(
                table.get_constant_value(options)?,
                ConstantValue::Sequence(vec![
                    ConstantValue::Int(1.into()),
                    ConstantValue::Int(2.into()),
                    ConstantValue::Int(3.into()),
                ])
            );

            let pair = module.get_global_variable("pair").expect("pair exists");
            assert_eq!(
                pair.get_constant_value(options)?,
                ConstantValue::Sequence(vec![ConstantValue::Int(7.into()), ConstantValue::Float(2.5)])
            );

            let pointers = module.get_global_variable("pointers").expect("pointers exists");
            assert_eq!(pointers.get_constant_value(options)?.to_string(), "[42, 253]");

            let zeroes = module.get_global_variable("zeroes").expect("zeroes exists");
            assert_eq!(
                zeroes.get_constant_value(options)?.as_text(),
                Some("[4 x i32] zeroinitializer")
            );
            Ok(())
        })
    }

    #[test]
    fn reads_vectors() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let options = ConstantOptions::new();

            let lanes = module.get_global_variable("lanes").expect("lanes exists");
            let init = lanes.initializer()?.expect("lanes is initialized");
            assert_eq!(init.value_kind()?, ValueKind::ConstantDataVector);
            assert_eq!(
                lanes.get_constant_value(options)?,
                ConstantValue::Sequence((1..=4).map(|n| ConstantValue::Int(n.into())).collect())
            );

            let mixed = module.get_global_variable("mixed").expect("mixed exists");
            let init = mixed.initializer()?.expect("mixed is initialized");
            assert_eq!(init.value_kind()?, ValueKind::ConstantVector);
            assert_eq!(mixed.get_constant_value(options)?.to_string(), "[42, ptr null]");
            Ok(())
        })
    }

    #[test]
    fn self_referential_globals_stand_for_themselves() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let self_ref = module.get_global_variable("self_ref").expect("self_ref exists");
            let value = self_ref.get_constant_value(ConstantOptions::new())?;
            let value = value.as_value().expect("resolves to a value");
            assert_eq!(value, &self_ref);
            assert_eq!(value.name()?, "self_ref");
            assert_eq!(format!("{value:?}"), "ValueRef(@self_ref)");
            Ok(())
        })
    }

    #[test]
    fn reads_constant_expressions() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let offset = module.get_global_variable("offset").expect("offset exists");
            let value = offset.get_constant_value(ConstantOptions::new())?;
            assert_eq!(value.to_string(), "[b\"hello\\x00\", 2]");
            Ok(())
        })
    }

    #[test]
    fn functions_stand_for_themselves() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            assert_eq!(sum.get_constant_value(ConstantOptions::new())?.as_value(), Some(&sum));

            let entry = sum.blocks()?.next().expect("sum has blocks");
            assert_eq!(entry.get_constant_value(ConstantOptions::new())?.as_value(), Some(&entry));
            Ok(())
        })
    }

    #[test]
    fn rejects_non_constants() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            let arg = sum.arguments()?.next().expect("sum has arguments");
            assert!(matches!(
                arg.get_constant_value(ConstantOptions::new()),
                Err(Error::NotAConstant(_))
            ));

            let external = module.get_global_variable("external").expect("external exists");
            assert!(matches!(
                external.get_constant_value(ConstantOptions::new()),
                Err(Error::MissingInitializer(_))
            ));
            Ok(())
        })
    }
}
