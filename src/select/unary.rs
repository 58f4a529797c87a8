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

//! Unary-assignment classification (C9): `x = op y`, a 7-case table over
//! (kind-of-x, kind-of-y, y-dead) faithfully transcribed from `codegen.py`'s
//! `classify_unary`/`unary_seq`, which is internally consistent as
//! retrieved — as is its sibling 32-case binary table in `binary.rs`.
//! `spec.md` §4.9.

use tracing::trace;

use crate::errors::{CodegenError, Result};
use crate::select::templates::{render, Insn, Slot, Slots};
use crate::select::{Kind, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    /// 1: `x is y`, both registers — single in-place op.
    RegAliasY,
    /// 2/3: `x` register, no alias (`y` register or memory) — move then op.
    RegNoAlias,
    /// 4: `x` memory, `y` register, `y` dead after this statement — negate
    /// `y` in place (it is never read again) and store.
    MemYDeadReuse,
    /// 5: `x` memory, `y` register, `y` still live — must not clobber it.
    MemYLiveViaTemp,
    /// 6: `x` memory, `y` memory, same slot — direct in-place memory op.
    MemAliasY,
    /// 7: `x` memory, `y` memory, different slots — via the temporary.
    MemNoAliasViaTemp,
}

impl Case {
    fn number(self) -> i32 {
        match self {
            Case::RegAliasY => 1,
            Case::RegNoAlias => 2,
            Case::MemYDeadReuse => 4,
            Case::MemYLiveViaTemp => 5,
            Case::MemAliasY => 6,
            Case::MemNoAliasViaTemp => 7,
        }
    }
}

const REG_ALIAS_Y: [Insn; 1] = [Insn::op1(Slot::X)];
const REG_NO_ALIAS: [Insn; 2] = [Insn::mov(Slot::Y, Slot::X), Insn::op1(Slot::X)];
const MEM_Y_DEAD_REUSE: [Insn; 2] = [Insn::op1(Slot::Y), Insn::mov(Slot::Y, Slot::X)];
const MEM_Y_LIVE_VIA_TEMP: [Insn; 3] = [Insn::mov(Slot::Y, Slot::Temp), Insn::op1(Slot::Temp), Insn::mov(Slot::Temp, Slot::X)];
const MEM_ALIAS_Y: [Insn; 1] = [Insn::op1(Slot::Y)];

fn classify(x: &Operand, y: &Operand, y_dead_after: bool) -> Case {
    let x_is_y = x.kind == Kind::Memory && y.kind == Kind::Memory && x.text == y.text;
    match (x.kind, y.kind) {
        (Kind::Register, Kind::Register) if x.text == y.text => Case::RegAliasY,
        (Kind::Register, _) => Case::RegNoAlias,
        (Kind::Memory, Kind::Register) => {
            if y_dead_after {
                Case::MemYDeadReuse
            } else {
                Case::MemYLiveViaTemp
            }
        }
        (Kind::Memory, Kind::Memory) if x_is_y => Case::MemAliasY,
        (Kind::Memory, Kind::Memory) => Case::MemNoAliasViaTemp,
        (Kind::Memory, Kind::Constant) => Case::MemYLiveViaTemp,
        (Kind::Constant, _) => unreachable!("assignment target cannot be a constant"),
    }
}

/// Selects the instruction sequence for `x = op y` (`op` one of `neg`/`not`
/// as a plain one-operand ALU mnemonic — logical `!y` of a non-comparison
/// operand is handled separately via the compare/setcc path, per
/// `predicate_insn`'s fallback in `codegen.py`).
pub fn select(mnemonic: &str, x: &Operand, y: &Operand, y_dead_after: bool, temp: &str) -> Result<Vec<String>> {
    if x.kind == Kind::Constant {
        return Err(CodegenError::invariant("select::unary::select", 0, "assignment target cannot be a constant"));
    }
    let case = classify(x, y, y_dead_after);
    trace!(case = case.number(), mnemonic, "unary classification hit");
    let slots = Slots { x: &x.text, y: &y.text, z: "", temp };
    let template: &[Insn] = match case {
        Case::RegAliasY => &REG_ALIAS_Y,
        Case::RegNoAlias => &REG_NO_ALIAS,
        Case::MemYDeadReuse => &MEM_Y_DEAD_REUSE,
        Case::MemYLiveViaTemp => &MEM_Y_LIVE_VIA_TEMP,
        Case::MemAliasY => &MEM_ALIAS_Y,
        Case::MemNoAliasViaTemp => &MEM_Y_LIVE_VIA_TEMP,
    };
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

    #[test]
    fn register_alias_negates_in_place() {
        let lines = select("neg", &reg("%ebx"), &reg("%ebx"), false, "%eax").unwrap();
        assert_eq!(lines, vec!["neg %ebx".to_string()]);
    }

    #[test]
    fn register_no_alias_moves_then_negates() {
        let lines = select("neg", &reg("%ebx"), &reg("%ecx"), false, "%eax").unwrap();
        assert_eq!(lines, vec!["mov %ecx, %ebx".to_string(), "neg %ebx".to_string()]);
    }

    #[test]
    fn dead_source_register_is_negated_in_place_before_the_store() {
        let lines = select("neg", &mem("(mem0)"), &reg("%ecx"), true, "%eax").unwrap();
        assert_eq!(lines, vec!["neg %ecx".to_string(), "mov %ecx, (mem0)".to_string()]);
    }

    #[test]
    fn live_source_register_is_preserved_via_the_temporary() {
        let lines = select("neg", &mem("(mem0)"), &reg("%ecx"), false, "%eax").unwrap();
        assert_eq!(lines, vec!["mov %ecx, %eax".to_string(), "neg %eax".to_string(), "mov %eax, (mem0)".to_string()]);
    }

    #[test]
    fn same_memory_slot_negates_directly() {
        let lines = select("neg", &mem("(mem0)"), &mem("(mem0)"), false, "%eax").unwrap();
        assert_eq!(lines, vec!["neg (mem0)".to_string()]);
    }

    #[test]
    fn different_memory_slots_go_via_the_temporary() {
        let lines = select("neg", &mem("(mem0)"), &mem("(mem1)"), false, "%eax").unwrap();
        assert_eq!(
            lines,
            vec!["mov (mem1), %eax".to_string(), "neg %eax".to_string(), "mov %eax, (mem0)".to_string()]
        );
    }
}
