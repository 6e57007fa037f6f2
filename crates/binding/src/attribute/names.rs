//! The names of LLVM's enum, integer, and type attributes, as they are written
//! in textual IR.
//!
//! These are taken from `llvm/IR/Attributes.td` for LLVM 18. The numeric kinds
//! are assigned by LLVM's build and are looked up at runtime rather than
//! recorded here.

/// Attributes that carry no payload.
pub const ENUM_ATTRIBUTE_NAMES: &[&str] = &[
    "allocalign",
    "allocptr",
    "alwaysinline",
    "builtin",
    "cold",
    "convergent",
    "coro_only_destroy_when_complete",
    "dead_on_unwind",
    "disable_sanitizer_instrumentation",
    "fn_ret_thunk_extern",
    "hot",
    "immarg",
    "inreg",
    "inlinehint",
    "jumptable",
    "minsize",
    "mustprogress",
    "naked",
    "nest",
    "noalias",
    "nobuiltin",
    "nocallback",
    "nocapture",
    "nocf_check",
    "noduplicate",
    "nofree",
    "noimplicitfloat",
    "noinline",
    "nomerge",
    "noprofile",
    "norecurse",
    "noredzone",
    "noreturn",
    "nosanitize_bounds",
    "nosanitize_coverage",
    "nosync",
    "noundef",
    "nounwind",
    "nonlazybind",
    "nonnull",
    "null_pointer_is_valid",
    "optforfuzzing",
    "optdebug",
    "optsize",
    "optnone",
    "presplitcoroutine",
    "readnone",
    "readonly",
    "returned",
    "returns_twice",
    "signext",
    "safestack",
    "sanitize_address",
    "sanitize_hwaddress",
    "sanitize_memtag",
    "sanitize_memory",
    "sanitize_thread",
    "shadowcallstack",
    "skipprofile",
    "speculatable",
    "speculative_load_hardening",
    "ssp",
    "sspreq",
    "sspstrong",
    "strictfp",
    "swiftasync",
    "swifterror",
    "swiftself",
    "willreturn",
    "writable",
    "writeonly",
    "zeroext",
];

/// Attributes that carry an integer payload.
pub const INT_ATTRIBUTE_NAMES: &[&str] = &[
    "align",
    "allockind",
    "allocsize",
    "alignstack",
    "dereferenceable",
    "dereferenceable_or_null",
    "memory",
    "nofpclass",
    "uwtable",
    "vscale_range",
];

/// Attributes that carry a type payload.
pub const TYPE_ATTRIBUTE_NAMES: &[&str] = &[
    "byref",
    "byval",
    "elementtype",
    "inalloca",
    "preallocated",
    "sret",
];

/// Iterates over the names of every attribute that has a numeric kind.
pub fn all_names() -> impl Iterator<Item = &'static str> {
    ENUM_ATTRIBUTE_NAMES
        .iter()
        .chain(INT_ATTRIBUTE_NAMES)
        .chain(TYPE_ATTRIBUTE_NAMES)
        .copied()
}
