/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Binary-assignment classification (C9): `x = y op z`, the full 32-case
//! table transcribed from `codegen.py`'s `classify_binary`/`commutative_seq`
//! pair. Cases 1-14 cover a register destination, driven by the kind of
//! `y`/`z` (register, memory, constant) and whether `x` aliases one of them;
//! cases 15-32 cover a memory destination, where aliasing alone isn't always
//! decidable and the classifier also asks whether `y`/`z` are dead after
//! this statement (a dead operand's register can be clobbered in place
//! instead of routed through the reserved temporary). `spec.md` §4.9, §9.
//!
//! `commutative_seq` is applied for every arithmetic operator, `sub`
//! included — the retrieved `insn_assign` never branches on the operator
//! before dispatching into it, substituting the statement's own mnemonic
//! into each template's `op` slot regardless. The source also carries a
//! three-entry `subtract_seq` table, but no call site in the retrieved
//! source ever indexes it; it is dead from the moment it's defined, so
//! nothing here reproduces it.

use tracing::trace;

use crate::errors::{CodegenError, Result};
use crate::select::templates::{render, Insn, Slot, Slots};
use crate::select::{Kind, Operand};

const S1: [Insn; 1] = [Insn::op(Slot::Y, Slot::X)];
const S2: [Insn; 1] = [Insn::op(Slot::X, Slot::Y)];
const S3: [Insn; 2] = [Insn::mov(Slot::Y, Slot::X), Insn::op(Slot::Z, Slot::X)];
const S4: [Insn; 1] = [Insn::op(Slot::Z, Slot::X)];
const S5: [Insn; 2] = [Insn::mov(Slot::Z, Slot::X), Insn::op(Slot::Y, Slot::X)];
const S6: [Insn; 2] = [Insn::op(Slot::Z, Slot::Y), Insn::mov(Slot::Y, Slot::X)];
const S7: [Insn; 2] = [Insn::op(Slot::Y, Slot::Z), Insn::mov(Slot::Z, Slot::X)];
const S8: [Insn; 3] = [Insn::mov(Slot::Y, Slot::Temp), Insn::op(Slot::Z, Slot::Temp), Insn::mov(Slot::Temp, Slot::X)];
const S9: [Insn; 2] = [Insn::mov(Slot::Z, Slot::Temp), Insn::op(Slot::Temp, Slot::X)];
const S10: [Insn; 2] = [Insn::mov(Slot::Y, Slot::Temp), Insn::op(Slot::Temp, Slot::X)];

/// Case number (1-32, `codegen.py`'s own numbering) to template sequence.
/// Index `i` in this array is case `i + 1`.
const COMMUTATIVE_SEQ: [&[Insn]; 32] = [
    &S1, &S2, &S3, &S1, &S2, &S4, &S3, // 1-7
    &S1, &S5, &S3, &S3, &S1, &S5, &S3, // 8-14
    &S6, &S7, &S8, &S1, &S6, &S8, // 15-20
    &S6, &S8, &S4, &S6, &S8, &S9, // 21-26
    &S10, &S8, &S7, &S8, &S1, &S8, // 27-32
];

/// Classifies `x = y op z` into one of the 32 cases, mirroring
/// `classify_binary`'s nested dispatch on (kind-of-x, kind-of-y, kind-of-z)
/// plus alias relations and, for a memory destination, post-statement
/// liveness of `y`/`z`. Callers have already rejected a constant `x`.
fn classify(x: &Operand, y: &Operand, z: &Operand, y_dead: bool, z_dead: bool) -> i32 {
    let x_is_y = x.kind != Kind::Constant && x.text == y.text;
    let x_is_z = x.kind != Kind::Constant && x.text == z.text;

    match x.kind {
        Kind::Register => match (y.kind, z.kind) {
            (Kind::Register, Kind::Register) => {
                if x_is_y {
                    1
                } else if x_is_z {
                    2
                } else {
                    3
                }
            }
            (Kind::Register, Kind::Memory) => {
                if x_is_y {
                    4
                } else {
                    5
                }
            }
            (Kind::Register, Kind::Constant) => {
                if x_is_y {
                    6
                } else {
                    7
                }
            }
            (Kind::Memory, Kind::Register) => {
                if x_is_z {
                    8
                } else {
                    9
                }
            }
            (Kind::Memory, Kind::Memory) => 10,
            (Kind::Memory, Kind::Constant) => 11,
            (Kind::Constant, Kind::Register) => {
                if x_is_z {
                    12
                } else {
                    13
                }
            }
            (Kind::Constant, Kind::Memory) => 14,
            (Kind::Constant, Kind::Constant) => unreachable!("y and z cannot both be constants"),
        },
        Kind::Memory | Kind::Constant => match (y.kind, z.kind) {
            (Kind::Register, Kind::Register) => {
                if y_dead {
                    15
                } else if z_dead {
                    16
                } else {
                    17
                }
            }
            (Kind::Register, Kind::Memory) => {
                if x_is_z {
                    18
                } else if y_dead {
                    19
                } else {
                    20
                }
            }
            (Kind::Register, Kind::Constant) => {
                if y_dead {
                    21
                } else {
                    22
                }
            }
            (Kind::Memory, Kind::Register) => {
                if x_is_y {
                    23
                } else if z_dead {
                    24
                } else {
                    25
                }
            }
            (Kind::Memory, Kind::Memory) => {
                if x_is_y {
                    26
                } else if x_is_z {
                    27
                } else {
                    28
                }
            }
            (Kind::Constant, Kind::Register) => {
                if z_dead {
                    29
                } else {
                    30
                }
            }
            (Kind::Constant, Kind::Memory) => {
                if x_is_z {
                    31
                } else {
                    32
                }
            }
            (Kind::Constant, Kind::Constant) => unreachable!("y and z cannot both be constants"),
        },
    }
}

/// Selects the instruction sequence for `x = y op z`. `y_dead`/`z_dead`
/// report whether the operand's register holds no value still live after
/// this statement — only consulted when `x` is a memory destination.
pub fn select(mnemonic: &str, x: &Operand, y: &Operand, z: &Operand, y_dead: bool, z_dead: bool, temp: &str) -> Result<Vec<String>> {
    if x.kind == Kind::Constant {
        return Err(CodegenError::invariant("select::binary::select", 0, "assignment target cannot be a constant"));
    }
    let case = classify(x, y, z, y_dead, z_dead);
    trace!(case, mnemonic, "binary classification hit");
    let slots = Slots { x: &x.text, y: &y.text, z: &z.text, temp };
    let template = COMMUTATIVE_SEQ[(case - 1) as usize];
    Ok(render(template, mnemonic, &slots))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(text: &str) -> Operand {
        Operand { text: text.to_string(), kind: Kind::Register }
    }
    fn mem(text: &str) -> Operand {
        Operand { text: text.to_string(), kind: Kind::Memory }
    }
    fn imm(text: &str) -> Operand {
        Operand { text: text.to_string(), kind: Kind::Constant }
    }

    #[test]
    fn case1_reg_alias_y_ops_in_place() {
        let lines = select("add", &reg("%ebx"), &reg("%ebx"), &reg("%ecx"), false, false, "%eax").unwrap();
        assert_eq!(lines, vec!["add %ecx, %ebx".to_string()]);
    }

    #[test]
    fn case3_reg_no_alias_moves_then_ops() {
        let lines = select("add", &reg("%ebx"), &reg("%ecx"), &reg("%edx"), false, false, "%eax").unwrap();
        assert_eq!(lines, vec!["mov %ecx, %ebx".to_string(), "add %edx, %ebx".to_string()]);
    }

    #[test]
    fn case10_reg_dest_both_memory_operands_goes_via_mov_then_op() {
        let lines = select("add", &reg("%ebx"), &mem("(mem1)"), &mem("(mem2)"), false, false, "%eax").unwrap();
        assert_eq!(lines, vec!["mov (mem1), %ebx".to_string(), "add (mem2), %ebx".to_string()]);
    }

    #[test]
    fn case15_mem_dest_y_dead_reuses_y_in_place() {
        let lines = select("add", &mem("(mem0)"), &reg("%ecx"), &reg("%edx"), true, false, "%eax").unwrap();
        assert_eq!(lines, vec!["add %edx, %ecx".to_string(), "mov %ecx, (mem0)".to_string()]);
    }

    #[test]
    fn case16_mem_dest_z_dead_reuses_z_in_place() {
        let lines = select("add", &mem("(mem0)"), &reg("%ecx"), &reg("%edx"), false, true, "%eax").unwrap();
        assert_eq!(lines, vec!["add %ecx, %edx".to_string(), "mov %edx, (mem0)".to_string()]);
    }

    #[test]
    fn case17_mem_dest_both_live_goes_via_temp() {
        let lines = select("add", &mem("(mem0)"), &reg("%ecx"), &reg("%edx"), false, false, "%eax").unwrap();
        assert_eq!(
            lines,
            vec!["mov %ecx, %eax".to_string(), "add %edx, %eax".to_string(), "mov %eax, (mem0)".to_string()]
        );
    }

    #[test]
    fn case18_mem_dest_aliases_z_memory_ops_in_place() {
        let lines = select("add", &mem("(mem0)"), &reg("%ecx"), &mem("(mem0)"), false, false, "%eax").unwrap();
        assert_eq!(lines, vec!["add %ecx, (mem0)".to_string()]);
    }

    #[test]
    fn case26_mem_dest_aliases_y_memory_both_sides_memory() {
        let lines = select("add", &mem("(mem0)"), &mem("(mem0)"), &mem("(mem1)"), false, false, "%eax").unwrap();
        assert_eq!(lines, vec!["mov (mem1), %eax".to_string(), "add %eax, (mem0)".to_string()]);
    }

    #[test]
    fn case29_constant_y_dead_z_reuses_z_in_place() {
        let lines = select("add", &mem("(mem0)"), &imm("$1"), &reg("%ecx"), false, true, "%eax").unwrap();
        assert_eq!(lines, vec!["add $1, %ecx".to_string(), "mov %ecx, (mem0)".to_string()]);
    }

    #[test]
    fn constant_destination_is_an_internal_invariant_violation() {
        assert!(select("add", &imm("$1"), &reg("%ecx"), &reg("%edx"), false, false, "%eax").is_err());
    }
}
