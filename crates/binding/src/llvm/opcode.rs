//! The textual names of LLVM's instruction opcodes.
//!
//! inkwell only exposes opcodes as the [`InstructionOpcode`] enumeration, so we
//! carry the table of names that LLVM itself uses when printing IR.

use inkwell::values::InstructionOpcode;

/// The name that LLVM prints for unknown or user-defined opcodes.
pub const INVALID_OPCODE_NAME: &str = "<Invalid operator>";

/// Gets the name of `opcode` as it appears in textual LLVM IR.
#[must_use]
pub fn opcode_name(opcode: InstructionOpcode) -> &'static str {
    #[allow(unreachable_patterns)] // Newer inkwell versions may add opcodes
    match opcode {
        InstructionOpcode::Return => "ret",
        InstructionOpcode::Br => "br",
        InstructionOpcode::Switch => "switch",
        InstructionOpcode::IndirectBr => "indirectbr",
        InstructionOpcode::Invoke => "invoke",
        InstructionOpcode::Unreachable => "unreachable",
        InstructionOpcode::CallBr => "callbr",
        InstructionOpcode::FNeg => "fneg",
        InstructionOpcode::Add => "add",
        InstructionOpcode::FAdd => "fadd",
        InstructionOpcode::Sub => "sub",
        InstructionOpcode::FSub => "fsub",
        InstructionOpcode::Mul => "mul",
        InstructionOpcode::FMul => "fmul",
        InstructionOpcode::UDiv => "udiv",
        InstructionOpcode::SDiv => "sdiv",
        InstructionOpcode::FDiv => "fdiv",
        InstructionOpcode::URem => "urem",
        InstructionOpcode::SRem => "srem",
        InstructionOpcode::FRem => "frem",
        InstructionOpcode::Shl => "shl",
        InstructionOpcode::LShr => "lshr",
        InstructionOpcode::AShr => "ashr",
        InstructionOpcode::And => "and",
        InstructionOpcode::Or => "or",
        InstructionOpcode::Xor => "xor",
        InstructionOpcode::Alloca => "alloca",
        InstructionOpcode::Load => "load",
        InstructionOpcode::Store => "store",
        InstructionOpcode::GetElementPtr => "getelementptr",
        InstructionOpcode::Trunc => "trunc",
        InstructionOpcode::ZExt => "zext",
        InstructionOpcode::SExt => "sext",
        InstructionOpcode::FPToUI => "fptoui",
        InstructionOpcode::FPToSI => "fptosi",
        InstructionOpcode::UIToFP => "uitofp",
        InstructionOpcode::SIToFP => "sitofp",
        InstructionOpcode::FPTrunc => "fptrunc",
        InstructionOpcode::FPExt => "fpext",
        InstructionOpcode::PtrToInt => "ptrtoint",
        InstructionOpcode::IntToPtr => "inttoptr",
        InstructionOpcode::BitCast => "bitcast",
        InstructionOpcode::AddrSpaceCast => "addrspacecast",
        InstructionOpcode::ICmp => "icmp",
        InstructionOpcode::FCmp => "fcmp",
        InstructionOpcode::Phi => "phi",
        InstructionOpcode::Call => "call",
        InstructionOpcode::Select => "select",
        InstructionOpcode::VAArg => "va_arg",
        InstructionOpcode::ExtractElement => "extractelement",
        InstructionOpcode::InsertElement => "insertelement",
        InstructionOpcode::ShuffleVector => "shufflevector",
        InstructionOpcode::ExtractValue => "extractvalue",
        InstructionOpcode::InsertValue => "insertvalue",
        InstructionOpcode::Freeze => "freeze",
        InstructionOpcode::Fence => "fence",
        InstructionOpcode::AtomicCmpXchg => "cmpxchg",
        InstructionOpcode::AtomicRMW => "atomicrmw",
        InstructionOpcode::Resume => "resume",
        InstructionOpcode::LandingPad => "landingpad",
        InstructionOpcode::CleanupRet => "cleanupret",
        InstructionOpcode::CatchRet => "catchret",
        InstructionOpcode::CatchPad => "catchpad",
        InstructionOpcode::CleanupPad => "cleanuppad",
        InstructionOpcode::CatchSwitch => "catchswitch",
        InstructionOpcode::UserOp1 | InstructionOpcode::UserOp2 => INVALID_OPCODE_NAME,
        _ => INVALID_OPCODE_NAME,
    }
}

/// The opcodes of instructions that access memory, and hence have a memory
/// type distinct from their own type.
pub const MEMORY_OPCODES: [&str; 4] = ["alloca", "store", "load", "getelementptr"];
