//! There are many ways that IR can be loaded into a [`super::SourceContext`],
//! so rather than creating a proliferation of methods with subtly-different
//! input types, we instead take one type that can be created from many.

use std::path::Path;

use inkwell::{memory_buffer::MemoryBuffer, support::LLVMString};

/// A unified type for all the different ways that we support adding a module to
/// the [`super::SourceContext`].
pub struct SourceModule {
    /// The underlying representation of the module to be passed to LLVM.
    memory_buffer: MemoryBuffer,
}

impl TryFrom<(String, String)> for SourceModule {
    type Error = LLVMString;

    /// Try to create a module source from the provided tuple of `name` and
    /// textual IR `contents`.
    fn try_from((name, contents): (String, String)) -> Result<Self, Self::Error> {
        // The copy is required as LLVM would otherwise refer to `contents` after
        // it has been dropped.
        let memory_buffer = MemoryBuffer::create_from_memory_range_copy(contents.as_bytes(), &name);
        Ok(Self { memory_buffer })
    }
}

impl TryFrom<(&str, &str)> for SourceModule {
    type Error = LLVMString;

    fn try_from((name, contents): (&str, &str)) -> Result<Self, Self::Error> {
        Self::try_from((name.to_string(), contents.to_string()))
    }
}

impl TryFrom<&Path> for SourceModule {
    type Error = LLVMString;

    /// Try to create a module source from the LLVM IR at the provided `path`.
    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let memory_buffer = MemoryBuffer::create_from_file(path)?;
        Ok(Self { memory_buffer })
    }
}

impl From<SourceModule> for MemoryBuffer {
    fn from(value: SourceModule) -> Self {
        value.memory_buffer
    }
}
