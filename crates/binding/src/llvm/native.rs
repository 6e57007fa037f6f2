//! The LLVM C API entry points that inkwell does not wrap.
//!
//! Printing basic blocks, metadata, and types that inkwell cannot represent
//! still needs the C API. Messages are copied out and disposed of before these
//! functions return, so no LLVM-owned string escapes them.

use std::ffi::{c_char, CStr};

use inkwell::llvm_sys::{
    core::{LLVMDisposeMessage, LLVMPrintTypeToString, LLVMPrintValueToString},
    prelude::{LLVMTypeRef, LLVMValueRef},
};

/// Prints `value` as it appears in textual IR.
///
/// # Safety
///
/// `value` must be a valid, non-null value.
#[must_use]
pub unsafe fn print_value(value: LLVMValueRef) -> String {
    take_message(LLVMPrintValueToString(value))
}

/// Prints `ty` as it appears in textual IR.
///
/// # Safety
///
/// `ty` must be a valid, non-null type.
#[must_use]
pub unsafe fn print_type(ty: LLVMTypeRef) -> String {
    take_message(LLVMPrintTypeToString(ty))
}

/// Copies out and disposes of a message that LLVM allocated for us.
unsafe fn take_message(message: *mut c_char) -> String {
    if message.is_null() {
        return String::new();
    }
    let text = CStr::from_ptr(message).to_string_lossy().into_owned();
    LLVMDisposeMessage(message);
    text
}

/// Copies the LLVM-owned buffer of `len` bytes at `ptr`.
///
/// A null pointer is the empty buffer, as that is how LLVM signals that there
/// is nothing to return.
///
/// # Safety
///
/// If non-null, `ptr` must point to at least `len` readable bytes.
#[must_use]
pub unsafe fn copy_bytes(ptr: *const c_char, len: usize) -> Vec<u8> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec()
}

#[cfg(test)]
mod test {
    use std::ffi::c_char;

    use crate::llvm::native::{copy_bytes, take_message};

    #[test]
    fn null_message_is_empty() {
        let text = unsafe { take_message(std::ptr::null_mut()) };
        assert!(text.is_empty());
    }

    #[test]
    fn borrowed_bytes_respect_length() {
        let data = b"hello\0world";
        let bytes = unsafe { copy_bytes(data.as_ptr().cast::<c_char>(), 7) };
        assert_eq!(bytes, b"hello\0w");
        assert!(unsafe { copy_bytes(std::ptr::null(), 4) }.is_empty());
    }
}
