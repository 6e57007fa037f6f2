//! Error types and utilities to do with working with LLVM IR through the
//! bindings.

use std::str::Utf8Error;

use inkwell::support::LLVMString;
use thiserror::Error;

/// The result type for use in the bindings.
pub type Result<T> = std::result::Result<T, Error>;

/// This error type is for use when inspecting or modifying LLVM IR through the
/// bindings.
#[derive(Debug, Error)]
pub enum Error {
    /// Emitted when an operation is requested on a value whose provenance or
    /// kind does not support it, such as asking a basic block for its blocks.
    ///
    /// This is a usage error on the part of the caller.
    #[error("Expected {expected}, got {found}")]
    UnexpectedValue { expected: String, found: String },

    /// Emitted when a constant value is requested of a value that is not a
    /// constant.
    #[error("Expected a constant value, got {_0}")]
    NotAConstant(String),

    /// Emitted when converting a floating-point constant to `f64` would lose
    /// precision and rounding was not permitted by the caller.
    #[error("Accuracy loss encountered in conversion of constant value {_0}")]
    AccuracyLoss(String),

    /// Emitted when the constant value of a global variable without an
    /// initializer is requested.
    #[error("The global variable {_0} has no initializer")]
    MissingInitializer(String),

    /// Emitted when LLVM renders a constant in a way that cannot be parsed back
    /// into a value.
    #[error("Could not read the constant `{_0}`")]
    MalformedConstant(String),

    /// Emitted when an enum attribute name is not known to LLVM.
    #[error("No such attribute `{_0}`")]
    UnknownAttribute(String),

    /// Emitted when LLVM hands back a value for one of its C enumerations that
    /// falls outside the table that we know about.
    #[error("The value {value} is not a valid {name}")]
    UnknownEnumValue { name: &'static str, value: u32 },

    /// An error that occurs when trying to convert from the C string
    /// representation used by LLVM to the UTF-8 string representation used by
    /// Rust.
    #[error("Could not create Rust string from C string: {_0}")]
    CStrConversionError(#[from] Utf8Error),

    /// An error coming from LLVM, such as a failure to build a target machine
    /// or to run an optimization pipeline.
    ///
    /// Unfortunately this does not directly contain an `LLVMString` as we want
    /// our error types to be [`Send`] and `LLVMString` is not.
    #[error("LLVM Error: {_0}")]
    LLVMError(String),

    /// Emitted when an attempt is made to add a module to the source context,
    /// but it cannot be parsed or loaded.
    #[error("Unable to add module to context: {_0}")]
    UnableToAddModuleToContext(String),
}

impl Error {
    /// Constructs a usage error stating that `expected` was required where a
    /// value described by `found` was provided.
    pub fn unexpected_value(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            expected: expected.into(),
            found:    found.into(),
        }
    }
}

impl From<LLVMString> for Error {
    /// Wrap an error from LLVM into our error type.
    fn from(value: LLVMString) -> Self {
        Self::LLVMError(value.to_string())
    }
}
