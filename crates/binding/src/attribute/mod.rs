//! Attributes attached to functions, call sites, arguments, and globals.
//!
//! LLVM stores the attributes of a function or call site as an attribute
//! _list_: one attribute _set_ per position, where the positions are the
//! function itself, its return value, and each of its parameters. Arguments
//! have a single set, taken from their function's list at their position.
//!
//! These two levels are exposed as two iterators. [`AttributeListIter`] yields
//! an [`AttributeSetIter`] per position, and that in turn yields each
//! [`AttributeRef`] in the set.

pub mod names;
pub mod payload;

use std::{
    collections::HashMap,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    iter::FusedIterator,
    marker::PhantomData,
    sync::OnceLock,
};

use inkwell::{
    attributes::{Attribute, AttributeLoc},
    llvm_sys::core::LLVMGetTypeAttributeValue,
    types::AnyTypeEnum,
    values::{AsValueRef, CallSiteValue, FunctionValue, InstructionOpcode},
};
use irlens_errors::binding::Result;
use tracing::debug;

use crate::{
    llvm::{typesystem::TypeRef, FUNCTION_ATTRIBUTE_INDEX, RETURN_ATTRIBUTE_INDEX},
    value::{handle::Handle, kind::ValueKind, ValueRef},
};

/// Looks up the numeric kind of the enum attribute called `name`, returning
/// [`None`] if LLVM has no such attribute.
#[must_use]
pub fn kind_for_name(name: &str) -> Option<u32> {
    let kind = Attribute::get_named_enum_kind_id(name);
    (kind != 0).then_some(kind)
}

/// Looks up the name of the enum attribute with the numeric `kind`, returning
/// [`None`] if the kind is not known.
#[must_use]
pub fn name_for_kind(kind: u32) -> Option<&'static str> {
    static KIND_NAMES: OnceLock<HashMap<u32, &'static str>> = OnceLock::new();
    KIND_NAMES
        .get_or_init(|| {
            names::all_names()
                .filter_map(|name| kind_for_name(name).map(|kind| (kind, name)))
                .collect()
        })
        .get(&kind)
        .copied()
}

/// Gets the bound on the numeric kinds of enum attributes. Every kind lies in
/// `1..last_enum_kind()`.
#[must_use]
pub fn last_enum_kind() -> u32 {
    Attribute::get_last_enum_kind_id()
}

/// A single attribute.
#[derive(Clone, Copy)]
pub struct AttributeRef<'m> {
    attribute: Attribute,
    _module:   PhantomData<&'m ()>,
}

impl<'m> AttributeRef<'m> {
    fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            _module: PhantomData,
        }
    }

    /// Returns `true` for enum attributes, including those with an integer
    /// payload.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.attribute.is_enum()
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        self.attribute.is_string()
    }

    #[must_use]
    pub fn is_type(&self) -> bool {
        self.attribute.is_type()
    }

    /// Gets the numeric kind of an enum or type attribute, and [`None`] for a
    /// string attribute.
    #[must_use]
    pub fn kind(&self) -> Option<u32> {
        (!self.is_string()).then(|| self.attribute.get_enum_kind_id())
    }

    /// Gets the name of an enum or type attribute.
    #[must_use]
    pub fn kind_name(&self) -> Option<&'static str> {
        self.kind().and_then(name_for_kind)
    }

    /// Gets the integer payload of an enum attribute, which is zero for
    /// attributes that carry none.
    #[must_use]
    pub fn int_value(&self) -> Option<u64> {
        self.is_enum().then(|| self.attribute.get_enum_value())
    }

    /// Gets the key of a string attribute.
    ///
    /// # Errors
    ///
    /// - [`irlens_errors::binding::Error::CStrConversionError`] if the key is
    ///   not valid UTF-8.
    pub fn string_kind(&self) -> Result<Option<String>> {
        if !self.is_string() {
            return Ok(None);
        }
        Ok(Some(self.attribute.get_string_kind_id().to_str()?.to_string()))
    }

    /// Gets the value of a string attribute.
    ///
    /// # Errors
    ///
    /// - [`irlens_errors::binding::Error::CStrConversionError`] if the value is
    ///   not valid UTF-8.
    pub fn string_value(&self) -> Result<Option<String>> {
        if !self.is_string() {
            return Ok(None);
        }
        Ok(Some(self.attribute.get_string_value().to_str()?.to_string()))
    }

    /// Gets the type carried by a type attribute.
    #[must_use]
    pub fn type_value(&self) -> Option<TypeRef<'m>> {
        // inkwell ties the returned type to `&self`; rebuild it for `'m`.
        self.is_type().then(|| {
            unsafe {
                AnyTypeEnum::new(LLVMGetTypeAttributeValue(self.attribute.as_mut_ptr()))
            }
            .into()
        })
    }
}

/// Renders the attribute as it appears in textual IR.
impl Display for AttributeRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_string() {
            let key = self.string_kind().ok().flatten().unwrap_or_default();
            let value = self.string_value().ok().flatten().unwrap_or_default();
            return if value.is_empty() {
                write!(f, "\"{key}\"")
            } else {
                write!(f, "\"{key}\"=\"{value}\"")
            };
        }

        let name = self.kind_name().unwrap_or("<unknown>");
        if let Some(ty) = self.type_value() {
            return write!(f, "{name}({ty})");
        }
        let value = self.int_value().unwrap_or_default();
        match name {
            "align" => write!(f, "align {value}"),
            "alignstack" | "dereferenceable" | "dereferenceable_or_null" => write!(f, "{name}({value})"),
            "memory" => write!(f, "{}", payload::memory(value)),
            "uwtable" => write!(f, "{}", payload::uwtable(value)),
            "allocsize" => write!(f, "{}", payload::allocsize(value)),
            "vscale_range" => write!(f, "{}", payload::vscale_range(value)),
            "allockind" => write!(f, "{}", payload::allockind(value)),
            "nofpclass" => write!(f, "{}", payload::nofpclass(value)),
            _ if value == 0 => write!(f, "{name}"),
            _ => write!(f, "{name}({value})"),
        }
    }
}

impl Debug for AttributeRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AttributeRef({self})")
    }
}

impl PartialEq for AttributeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.attribute.as_mut_ptr() == other.attribute.as_mut_ptr()
    }
}

impl Eq for AttributeRef<'_> {}

impl Hash for AttributeRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attribute.as_mut_ptr().hash(state);
    }
}

/// A position within an attribute list.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AttributeIndex {
    /// The function or call site as a whole.
    Function,

    /// The return value.
    Return,

    /// The parameter at the given zero-based position.
    Param(u32),
}

impl AttributeIndex {
    /// Gets the index that LLVM uses for this position.
    #[must_use]
    pub fn as_raw(self) -> u32 {
        match self {
            Self::Function => FUNCTION_ATTRIBUTE_INDEX,
            Self::Return => RETURN_ATTRIBUTE_INDEX,
            Self::Param(n) => n + 1,
        }
    }

    /// Gets the position as inkwell names it.
    #[must_use]
    pub fn location(self) -> AttributeLoc {
        match self {
            Self::Function => AttributeLoc::Function,
            Self::Return => AttributeLoc::Return,
            Self::Param(n) => AttributeLoc::Param(n),
        }
    }
}

impl Display for AttributeIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Return => write!(f, "return"),
            Self::Param(n) => write!(f, "param {n}"),
        }
    }
}

/// The function or call site that an attribute list is read from.
#[derive(Clone, Copy, Debug)]
enum Owner<'m> {
    Function(FunctionValue<'m>),
    CallSite(CallSiteValue<'m>),
}

impl Owner<'_> {
    fn count(self, index: AttributeIndex) -> u32 {
        match self {
            Self::Function(function) => function.count_attributes(index.location()),
            Self::CallSite(call) => call.count_attributes(index.location()),
        }
    }

    fn read(self, index: AttributeIndex) -> Vec<Attribute> {
        match self {
            Self::Function(function) => function.attributes(index.location()),
            Self::CallSite(call) => call.attributes(index.location()),
        }
    }

    fn params(self) -> u32 {
        match self {
            Self::Function(function) => function.count_params(),
            Self::CallSite(call) => call.count_arguments(),
        }
    }
}

/// Iterates over the attributes in a single attribute set.
pub struct AttributeSetIter<'m> {
    index:   Option<AttributeIndex>,
    attrs:   std::vec::IntoIter<Attribute>,
    _module: PhantomData<&'m ()>,
}

impl<'m> AttributeSetIter<'m> {
    fn new(index: Option<AttributeIndex>, attrs: Vec<Attribute>) -> Self {
        Self {
            index,
            attrs: attrs.into_iter(),
            _module: PhantomData,
        }
    }

    /// Gets the position of this set within its owner's attribute list, or
    /// [`None`] for the attributes of a global variable.
    #[must_use]
    pub fn index(&self) -> Option<AttributeIndex> {
        self.index
    }
}

impl<'m> Iterator for AttributeSetIter<'m> {
    type Item = AttributeRef<'m>;

    fn next(&mut self) -> Option<Self::Item> {
        self.attrs.next().map(AttributeRef::new)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.attrs.size_hint()
    }
}

impl ExactSizeIterator for AttributeSetIter<'_> {}

impl FusedIterator for AttributeSetIter<'_> {}

/// Iterates over the attribute sets of a function or call site, in the order
/// function, return, and then each parameter. Trailing empty sets are not
/// produced.
pub struct AttributeListIter<'m> {
    owner:     Owner<'m>,
    positions: std::vec::IntoIter<AttributeIndex>,
}

impl<'m> AttributeListIter<'m> {
    fn new(owner: Owner<'m>) -> Self {
        let mut positions = [AttributeIndex::Function, AttributeIndex::Return]
            .into_iter()
            .chain((0..owner.params()).map(AttributeIndex::Param))
            .collect::<Vec<_>>();
        while positions.last().is_some_and(|pos| owner.count(*pos) == 0) {
            positions.pop();
        }

        Self {
            owner,
            positions: positions.into_iter(),
        }
    }
}

impl<'m> Iterator for AttributeListIter<'m> {
    type Item = AttributeSetIter<'m>;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.positions.next()?;
        Some(AttributeSetIter::new(Some(position), self.owner.read(position)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.positions.size_hint()
    }
}

impl ExactSizeIterator for AttributeListIter<'_> {}

impl FusedIterator for AttributeListIter<'_> {}

/// The attributes of a value, at the level at which LLVM stores them.
pub enum Attributes<'m> {
    /// The attribute list of a function or call site.
    List(AttributeListIter<'m>),

    /// The attribute set of an argument or global variable.
    Set(AttributeSetIter<'m>),

    /// The value cannot carry attributes.
    Empty,
}

impl<'m> Attributes<'m> {
    /// Reads the attributes attached to `value`.
    pub(crate) fn of(value: &ValueRef<'m>) -> Result<Self> {
        let handle = value.handle();
        if let Some(function) = handle.function() {
            return Ok(Self::List(AttributeListIter::new(Owner::Function(function))));
        }
        if let Some(inst) = handle.instruction() {
            if matches!(
                inst.get_opcode(),
                InstructionOpcode::Call | InstructionOpcode::Invoke | InstructionOpcode::CallBr
            ) {
                // SAFETY: the opcode was checked to be one of the call sites.
                let call = unsafe { CallSiteValue::new(inst.as_value_ref()) };
                return Ok(Self::List(AttributeListIter::new(Owner::CallSite(call))));
            }
        }

        let attributes = match value.value_kind()? {
            ValueKind::Argument => match handle.param_parent() {
                Some(function) => {
                    let position = (0..function.count_params())
                        .find(|&n| Handle::param(function, n).raw() == handle.raw())
                        .map_or(AttributeIndex::Param(0), AttributeIndex::Param);
                    let attrs = Owner::Function(function).read(position);
                    Self::Set(AttributeSetIter::new(Some(position), attrs))
                }
                None => Self::Empty,
            },
            ValueKind::GlobalVariable => {
                debug!(global = ?value, "global variable attributes are not readable, using an empty set");
                Self::Set(AttributeSetIter::new(None, Vec::new()))
            }
            _ => Self::Empty,
        };
        Ok(attributes)
    }

    /// Returns `true` if these are the attributes of a function or call site.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Flattens the attributes into a single sequence, discarding their
    /// positions.
    #[must_use]
    pub fn into_flat(self) -> std::vec::IntoIter<AttributeRef<'m>> {
        let attrs: Vec<_> = match self {
            Self::List(list) => list.flatten().collect(),
            Self::Set(set) => set.collect(),
            Self::Empty => Vec::new(),
        };
        attrs.into_iter()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use inkwell::attributes::AttributeLoc;

    use crate::{
        attribute::{
            kind_for_name,
            last_enum_kind,
            name_for_kind,
            names,
            AttributeIndex,
            Attributes,
        },
        test_utils::with_structure_module,
    };

    #[test]
    fn every_kind_has_a_name() {
        for kind in 1..last_enum_kind() {
            assert!(name_for_kind(kind).is_some(), "attribute kind {kind} has no name");
        }
    }

    #[test]
    fn kind_names_round_trip() {
        let mut recognized = 0;
        for name in names::all_names() {
            if let Some(kind) = kind_for_name(name) {
                assert!(kind <= last_enum_kind());
                assert_eq!(name_for_kind(kind), Some(name));
                recognized += 1;
            }
        }
        assert!(recognized > 70);
        assert_eq!(kind_for_name("not-an-attribute"), None);
        assert_eq!(name_for_kind(0), None);
    }

    fn render_sets(attributes: Attributes<'_>) -> Vec<(Option<AttributeIndex>, HashSet<String>)> {
        match attributes {
            Attributes::List(list) => list
                .map(|set| (set.index(), set.map(|a| a.to_string()).collect()))
                .collect(),
            Attributes::Set(set) => vec![(set.index(), set.map(|a| a.to_string()).collect())],
            Attributes::Empty => Vec::new(),
        }
    }

    fn strings(items: &[&str]) -> HashSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn reads_function_attribute_lists() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let store_through = module.get_function("store_through").expect("function exists");
            let attributes = store_through.attributes()?;
            assert!(attributes.is_list());

            assert_eq!(render_sets(attributes), [
                (
                    Some(AttributeIndex::Function),
                    strings(&["noinline", "nounwind", "\"frame-pointer\"=\"all\""])
                ),
                (Some(AttributeIndex::Return), strings(&[])),
                (Some(AttributeIndex::Param(0)), strings(&["noalias", "nocapture"])),
            ]);

            let sum = module.get_function("sum").expect("sum exists");
            assert!(render_sets(sum.attributes()?).is_empty());
            Ok(())
        })
    }

    #[test]
    fn reads_call_site_attribute_lists() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let caller = module.get_function("caller").expect("caller exists");
            let entry = caller.blocks()?.next().expect("caller has a block");
            let call = entry.instructions()?.next().expect("entry is not empty");
            assert_eq!(call.opcode()?, "call");

            assert_eq!(render_sets(call.attributes()?), [
                (Some(AttributeIndex::Function), strings(&["nounwind"])),
                (Some(AttributeIndex::Return), strings(&[])),
                (Some(AttributeIndex::Param(0)), strings(&["noundef"])),
            ]);
            Ok(())
        })
    }

    #[test]
    fn reads_invoke_attribute_lists() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let guarded = module.get_function("guarded").expect("guarded exists");
            let entry = guarded.blocks()?.next().expect("guarded has a block");
            let invoke = entry.instructions()?.next().expect("entry is not empty");
            assert_eq!(invoke.opcode()?, "invoke");

            assert_eq!(render_sets(invoke.attributes()?), [
                (Some(AttributeIndex::Function), strings(&["nounwind"])),
                (Some(AttributeIndex::Return), strings(&[])),
                (Some(AttributeIndex::Param(0)), strings(&["noundef"])),
            ]);
            Ok(())
        })
    }

    #[test]
    fn renders_encoded_payloads() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let allocate = module.get_function("allocate").expect("allocate exists");
            assert_eq!(render_sets(allocate.attributes()?), [
                (
                    Some(AttributeIndex::Function),
                    strings(&[
                        "allockind(\"alloc,zeroed\")",
                        "allocsize(0,1)",
                        "memory(inaccessiblemem: readwrite)",
                    ])
                ),
                (Some(AttributeIndex::Return), strings(&["noalias"])),
            ]);

            let grow = module.get_function("grow").expect("grow exists");
            let function_set = grow.attributes()?.into_flat().map(|a| a.to_string()).collect::<HashSet<_>>();
            assert_eq!(function_set, strings(&[
                "allockind(\"realloc\")",
                "allocsize(1)",
                "memory(argmem: readwrite, inaccessiblemem: readwrite)",
                "uwtable(sync)",
            ]));

            let effects = module.get_function("effects").expect("effects exists");
            let function_set = effects.attributes()?.into_flat().map(|a| a.to_string()).collect::<HashSet<_>>();
            assert_eq!(function_set, strings(&["memory(none)", "uwtable", "vscale_range(1,16)"]));

            let classify = module.get_function("classify").expect("classify exists");
            let arg = classify.arguments()?.next().expect("classify has an argument");
            assert_eq!(render_sets(arg.attributes()?), [(
                Some(AttributeIndex::Param(0)),
                strings(&["nofpclass(nan inf)"])
            )]);
            Ok(())
        })
    }

    #[test]
    fn reads_argument_attribute_sets() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let store_through = module.get_function("store_through").expect("function exists");
            let args = store_through.arguments()?.collect::<Vec<_>>();

            assert_eq!(render_sets(args[0].attributes()?), [(
                Some(AttributeIndex::Param(0)),
                strings(&["noalias", "nocapture"])
            )]);
            assert_eq!(render_sets(args[1].attributes()?), [(
                Some(AttributeIndex::Param(1)),
                strings(&[])
            )]);
            Ok(())
        })
    }

    #[test]
    fn classifies_attributes() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let store_through = module.get_function("store_through").expect("function exists");
            for attr in store_through.attributes()?.into_flat() {
                if attr.is_string() {
                    assert_eq!(attr.kind(), None);
                    assert_eq!(attr.string_kind()?.as_deref(), Some("frame-pointer"));
                    assert_eq!(attr.string_value()?.as_deref(), Some("all"));
                } else {
                    assert!(attr.is_enum());
                    assert!(!attr.is_type());
                    assert_eq!(attr.int_value(), Some(0));
                    assert_eq!(attr.kind(), attr.kind_name().and_then(kind_for_name));
                }
            }
            Ok(())
        })
    }

    #[test]
    fn other_values_have_no_attributes() -> anyhow::Result<()> {
        with_structure_module(|module| {
            let counter = module.get_global_variable("counter").expect("counter exists");
            assert_eq!(render_sets(counter.attributes()?), [(None, strings(&[]))]);

            let sum = module.get_function("sum").expect("sum exists");
            let entry = sum.blocks()?.next().expect("sum has blocks");
            assert!(matches!(entry.attributes()?, Attributes::Empty));
            Ok(())
        })
    }

    #[test]
    fn maps_positions_to_locations() {
        assert_eq!(AttributeIndex::Function.location(), AttributeLoc::Function);
        assert_eq!(AttributeIndex::Return.location(), AttributeLoc::Return);
        assert_eq!(AttributeIndex::Param(2).location(), AttributeLoc::Param(2));
        assert_eq!(AttributeIndex::Param(2).as_raw(), 3);
    }
}
