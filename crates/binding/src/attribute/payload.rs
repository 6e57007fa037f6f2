//! Decoding of the integer payloads that LLVM packs into some attributes.
//!
//! Each function renders the payload the way LLVM 18 writes it in textual IR,
//! so that an attribute prints identically whether it came from here or from
//! `llvm-dis`.

use itertools::Itertools;

/// The access that a function may make to one location of memory, stored in
/// two bits.
fn mod_ref(bits: u64) -> &'static str {
    match bits & 0b11 {
        0 => "none",
        1 => "read",
        2 => "write",
        _ => "readwrite",
    }
}

/// Renders a `memory` payload.
///
/// Each location has two bits: argument memory at the bottom, then
/// inaccessible memory, then all other memory. The access to other memory is
/// printed as the default, and any location that differs from it is listed
/// after it.
#[must_use]
pub fn memory(value: u64) -> String {
    const LOCATIONS: [(&str, u32); 2] = [("argmem", 0), ("inaccessiblemem", 2)];

    let other = (value >> 4) & 0b11;
    let union = LOCATIONS
        .iter()
        .fold(other, |acc, (_, shift)| acc | ((value >> shift) & 0b11));

    let mut parts = Vec::new();
    if other != 0 || union == other {
        parts.push(mod_ref(other).to_string());
    }
    for (name, shift) in LOCATIONS {
        let access = (value >> shift) & 0b11;
        if access != other {
            parts.push(format!("{name}: {}", mod_ref(access)));
        }
    }
    format!("memory({})", parts.join(", "))
}

/// Renders a `uwtable` payload. Asynchronous tables are the default, and print
/// without an argument.
#[must_use]
pub fn uwtable(value: u64) -> String {
    match value {
        1 => "uwtable(sync)".to_string(),
        _ => "uwtable".to_string(),
    }
}

/// Renders an `allocsize` payload. The element size argument sits in the high
/// half, and the optional count argument in the low half.
#[must_use]
pub fn allocsize(value: u64) -> String {
    const NOT_PRESENT: u64 = 0xFFFF_FFFF;

    let elem_size = value >> 32;
    match value & 0xFFFF_FFFF {
        NOT_PRESENT => format!("allocsize({elem_size})"),
        count => format!("allocsize({elem_size},{count})"),
    }
}

/// Renders a `vscale_range` payload. The minimum sits in the high half, and
/// the maximum, zero if unbounded, in the low half.
#[must_use]
pub fn vscale_range(value: u64) -> String {
    format!("vscale_range({},{})", value >> 32, value & 0xFFFF_FFFF)
}

/// Renders an `allockind` payload.
#[must_use]
pub fn allockind(value: u64) -> String {
    const KINDS: [(u64, &str); 6] = [
        (1, "alloc"),
        (2, "realloc"),
        (4, "free"),
        (8, "uninitialized"),
        (16, "zeroed"),
        (32, "aligned"),
    ];

    let kinds = KINDS
        .iter()
        .filter(|(bit, _)| value & bit != 0)
        .map(|(_, name)| name)
        .join(",");
    format!("allockind(\"{kinds}\")")
}

/// Renders a `nofpclass` payload.
///
/// Names that cover several classes come before the classes they cover, and
/// each class is only named once.
#[must_use]
pub fn nofpclass(value: u64) -> String {
    const CLASSES: [(u64, &str); 16] = [
        (0x3FF, "all"),
        (0x003, "nan"),
        (0x001, "snan"),
        (0x002, "qnan"),
        (0x204, "inf"),
        (0x004, "ninf"),
        (0x200, "pinf"),
        (0x060, "zero"),
        (0x020, "nzero"),
        (0x040, "pzero"),
        (0x090, "sub"),
        (0x010, "nsub"),
        (0x080, "psub"),
        (0x108, "norm"),
        (0x008, "nnorm"),
        (0x100, "pnorm"),
    ];

    if value == 0 {
        return "nofpclass(none)".to_string();
    }

    let mut remaining = value;
    let mut names = Vec::new();
    for (mask, name) in CLASSES {
        if remaining & mask == mask {
            names.push(name.to_string());
            remaining &= !mask;
        }
    }
    if remaining != 0 {
        names.push(format!("{remaining:#x}"));
    }
    format!("nofpclass({})", names.join(" "))
}
