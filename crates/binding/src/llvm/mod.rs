//! Utilities for working with LLVM below the level of values: the type system,
//! opcode names, and the few C API calls that inkwell leaves unwrapped.

pub mod native;
pub mod opcode;
pub mod typesystem;

/// The attribute index that LLVM uses to address the attributes of the
/// function itself, rather than its return value or one of its parameters.
pub const FUNCTION_ATTRIBUTE_INDEX: u32 = u32::MAX;

/// The attribute index that LLVM uses to address the attributes of a
/// function's return value.
pub const RETURN_ATTRIBUTE_INDEX: u32 = 0;
