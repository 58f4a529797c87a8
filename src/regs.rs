//! Machine register model: the integer bank's 15 parents with their
//! width-selected sub-registers, the 16-register xmm bank, and the
//! synthetic memory register used once the physical bank is exhausted.
//! `spec.md` §3 "Machine registers" / "Memory register".

use crate::ir::types::Type;

/// The 15 integer-bank parents, in allocation order. `Rax` is listed first
/// but is never handed out by the allocator (§4.7) — it is reserved as the
/// instruction selector's scratch register (§4.9). Keeping it *in* this
/// enumeration rather than excluding it from the type entirely is
/// deliberate (`spec.md` §9design notes: "make this explicit in the
/// register-bank enumeration, not by removing them from allocation lists
/// inside the allocator").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntReg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl IntReg {
    pub const ALL: [IntReg; 15] = [
        IntReg::Rax,
        IntReg::Rbx,
        IntReg::Rcx,
        IntReg::Rdx,
        IntReg::Rsi,
        IntReg::Rdi,
        IntReg::Rbp,
        IntReg::R8,
        IntReg::R9,
        IntReg::R10,
        IntReg::R11,
        IntReg::R12,
        IntReg::R13,
        IntReg::R14,
        IntReg::R15,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|r| *r == self).unwrap()
    }

    /// Every general-purpose parent except the reserved scratch register,
    /// in lowest-index-first allocation order.
    pub fn allocatable() -> impl Iterator<Item = IntReg> {
        Self::ALL.into_iter().filter(|r| *r != IntReg::Rax)
    }

    /// Sub-register name selected by operand width, matching the teacher's
    /// AT&T-style rendering discipline.
    pub fn sub_register_name(self, width: u32) -> &'static str {
        match self {
            IntReg::Rax => match width {
                1 => "al",
                2 => "ax",
                4 => "eax",
                _ => "rax",
            },
            IntReg::Rbx => match width {
                1 => "bl",
                2 => "bx",
                4 => "ebx",
                _ => "rbx",
            },
            IntReg::Rcx => match width {
                1 => "cl",
                2 => "cx",
                4 => "ecx",
                _ => "rcx",
            },
            IntReg::Rdx => match width {
                1 => "dl",
                2 => "dx",
                4 => "edx",
                _ => "rdx",
            },
            IntReg::Rsi => match width {
                1 => "sil",
                2 => "si",
                4 => "esi",
                _ => "rsi",
            },
            IntReg::Rdi => match width {
                1 => "dil",
                2 => "di",
                4 => "edi",
                _ => "rdi",
            },
            IntReg::Rbp => match width {
                1 => "bpl",
                2 => "bp",
                4 => "ebp",
                _ => "rbp",
            },
            IntReg::R8 => match width {
                1 => "r8b",
                2 => "r8w",
                4 => "r8d",
                _ => "r8",
            },
            IntReg::R9 => match width {
                1 => "r9b",
                2 => "r9w",
                4 => "r9d",
                _ => "r9",
            },
            IntReg::R10 => match width {
                1 => "r10b",
                2 => "r10w",
                4 => "r10d",
                _ => "r10",
            },
            IntReg::R11 => match width {
                1 => "r11b",
                2 => "r11w",
                4 => "r11d",
                _ => "r11",
            },
            IntReg::R12 => match width {
                1 => "r12b",
                2 => "r12w",
                4 => "r12d",
                _ => "r12",
            },
            IntReg::R13 => match width {
                1 => "r13b",
                2 => "r13w",
                4 => "r13d",
                _ => "r13",
            },
            IntReg::R14 => match width {
                1 => "r14b",
                2 => "r14w",
                4 => "r14d",
                _ => "r14",
            },
            IntReg::R15 => match width {
                1 => "r15b",
                2 => "r15w",
                4 => "r15d",
                _ => "r15",
            },
        }
    }
}

/// A synthetic, unlimited-supply register standing for a stack slot.
/// Identified by a monotonically increasing per-procedure serial; its
/// emitted form (`(memN)`) is left for the external assembler to resolve
/// to an actual memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemReg(pub u32);

/// Which bank a physical register belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Integer,
    Xmm,
}

/// Type→bank mapping: integer widths 1/2/4/8 (including pointers, which are
/// always 64-bit) go to the integer bank; every floating-point and
/// short-vector kind goes to the xmm bank.
pub fn bank_for_type(ty: Type) -> Bank {
    if ty.is_float() || ty.is_vector() {
        Bank::Xmm
    } else {
        Bank::Integer
    }
}

impl Bank {
    /// Registers available to the coloring allocator for this bank, lowest
    /// indexed first, with the bank's reserved scratch register (`%rax` or
    /// `%xmm0`) already excluded.
    pub fn allocatable(self) -> Vec<PhysReg> {
        match self {
            Bank::Integer => IntReg::allocatable().map(PhysReg::Int).collect(),
            Bank::Xmm => (1u8..16).map(PhysReg::Xmm).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysReg {
    Int(IntReg),
    /// xmm index 0..=15.
    Xmm(u8),
    Mem(MemReg),
}

impl PhysReg {
    pub fn bank(self) -> Option<Bank> {
        match self {
            PhysReg::Int(_) => Some(Bank::Integer),
            PhysReg::Xmm(_) => Some(Bank::Xmm),
            PhysReg::Mem(_) => None,
        }
    }

    pub fn is_memory(self) -> bool {
        matches!(self, PhysReg::Mem(_))
    }

    /// The reserved scratch register for a bank: `%rax`/sub-widths for the
    /// integer bank, `%xmm0` for the xmm bank. Never handed out by the
    /// allocator (§4.7); used by the instruction selector to shuttle
    /// memory-to-memory operations through (§4.9).
    pub fn temp(bank: Bank) -> PhysReg {
        match bank {
            Bank::Integer => PhysReg::Int(IntReg::Rax),
            Bank::Xmm => PhysReg::Xmm(0),
        }
    }

    /// AT&T-style operand rendering. `width` (in bytes) selects the
    /// integer-bank sub-register; it is ignored for xmm and memory
    /// operands.
    pub fn render(self, width: u32) -> String {
        match self {
            PhysReg::Int(r) => format!("%{}", r.sub_register_name(width)),
            PhysReg::Xmm(n) => format!("%xmm{}", n),
            PhysReg::Mem(MemReg(n)) => format!("(mem{})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::BasicKind;

    #[test]
    fn rax_is_never_in_the_allocatable_list() {
        assert!(IntReg::allocatable().all(|r| r != IntReg::Rax));
        assert_eq!(IntReg::allocatable().count(), 14);
    }

    #[test]
    fn sub_register_selected_by_width() {
        assert_eq!(IntReg::Rbx.sub_register_name(4), "ebx");
        assert_eq!(IntReg::Rbx.sub_register_name(8), "rbx");
        assert_eq!(IntReg::R9.sub_register_name(1), "r9b");
    }

    #[test]
    fn float_and_vector_kinds_use_the_xmm_bank() {
        assert_eq!(bank_for_type(Type::scalar(BasicKind::F64)), Bank::Xmm);
        assert_eq!(bank_for_type(Type::scalar(BasicKind::V4F32)), Bank::Xmm);
        assert_eq!(bank_for_type(Type::scalar(BasicKind::S32)), Bank::Integer);
        assert_eq!(bank_for_type(Type::pointer_to(BasicKind::S32)), Bank::Integer);
    }

    #[test]
    fn memory_register_renders_with_serial() {
        assert_eq!(PhysReg::Mem(MemReg(7)).render(8), "(mem7)");
    }

    #[test]
    fn bank_allocatable_lists_exclude_the_scratch_register() {
        let ints = Bank::Integer.allocatable();
        assert_eq!(ints.len(), 14);
        assert!(!ints.contains(&PhysReg::Int(IntReg::Rax)));

        let xmms = Bank::Xmm.allocatable();
        assert_eq!(xmms.len(), 15);
        assert!(!xmms.contains(&PhysReg::Xmm(0)));
    }
}
