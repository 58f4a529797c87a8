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

//! `@1/@2/@3/@t` template substitution (C9). Each classification table in
//! `binary.rs`/`unary.rs` maps a case number to a short array of `Insn`
//! templates; `render` fills in the operand slots and the statement's own
//! operator mnemonic. `spec.md` §4.9 design notes.

/// Which rendered operand text fills a template slot. `X` is always the
/// assignment's left-hand side; `Y`/`Z` are the statement's operands in
/// source order; `Temp` is the bank's reserved scratch register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    X,
    Y,
    Z,
    Temp,
}

/// A template instruction is either the statement's own operator (`Op`,
/// substituted with whatever mnemonic the case is being rendered for) or a
/// fixed mnemonic the shape itself requires.
#[derive(Debug, Clone, Copy)]
pub enum Mnemonic {
    /// Two-operand form of the statement's own operator: `op src, dst`.
    Op,
    /// Single-operand form of the statement's own operator: `op dst`. Used
    /// by the unary table, whose operator is always applied in place.
    OpUnary,
    Mov,
    Neg,
}

#[derive(Debug, Clone, Copy)]
pub struct Insn {
    pub mnemonic: Mnemonic,
    pub src: Slot,
    /// Ignored for `OpUnary`/`Neg`, which take a single operand.
    pub dst: Slot,
}

impl Insn {
    pub const fn op(src: Slot, dst: Slot) -> Insn {
        Insn { mnemonic: Mnemonic::Op, src, dst }
    }
    pub const fn op1(dst: Slot) -> Insn {
        Insn { mnemonic: Mnemonic::OpUnary, src: dst, dst }
    }
    pub const fn mov(src: Slot, dst: Slot) -> Insn {
        Insn { mnemonic: Mnemonic::Mov, src, dst }
    }
    pub const fn neg(dst: Slot) -> Insn {
        Insn { mnemonic: Mnemonic::Neg, src: dst, dst }
    }
}

/// Rendered operand text for every slot a template may reference.
pub struct Slots<'a> {
    pub x: &'a str,
    pub y: &'a str,
    pub z: &'a str,
    pub temp: &'a str,
}

impl<'a> Slots<'a> {
    fn text(&self, slot: Slot) -> &'a str {
        match slot {
            Slot::X => self.x,
            Slot::Y => self.y,
            Slot::Z => self.z,
            Slot::Temp => self.temp,
        }
    }
}

/// Expands a template into AT&T-order mnemonic lines (`mnemonic src, dst`),
/// substituting `op_mnemonic` for every `Mnemonic::Op` slot.
pub fn render(template: &[Insn], op_mnemonic: &str, slots: &Slots) -> Vec<String> {
    template
        .iter()
        .map(|insn| match insn.mnemonic {
            Mnemonic::Neg => format!("neg {}", slots.text(insn.dst)),
            Mnemonic::Mov => format!("mov {}, {}", slots.text(insn.src), slots.text(insn.dst)),
            Mnemonic::Op => format!("{} {}, {}", op_mnemonic, slots.text(insn.src), slots.text(insn.dst)),
            Mnemonic::OpUnary => format!("{} {}", op_mnemonic, slots.text(insn.dst)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_slot_substitutes_the_statement_mnemonic() {
        let template = [Insn::op(Slot::Z, Slot::X)];
        let slots = Slots { x: "%ebx", y: "%ecx", z: "%edx", temp: "%eax" };
        assert_eq!(render(&template, "add", &slots), vec!["add %edx, %ebx".to_string()]);
    }

    #[test]
    fn neg_renders_as_a_single_operand() {
        let template = [Insn::neg(Slot::X)];
        let slots = Slots { x: "%ebx", y: "", z: "", temp: "" };
        assert_eq!(render(&template, "sub", &slots), vec!["neg %ebx".to_string()]);
    }

    #[test]
    fn via_temp_sequence_renders_in_order() {
        let template = [Insn::mov(Slot::Y, Slot::Temp), Insn::op(Slot::Z, Slot::Temp), Insn::mov(Slot::Temp, Slot::X)];
        let slots = Slots { x: "(mem0)", y: "(mem1)", z: "(mem2)", temp: "%eax" };
        assert_eq!(
            render(&template, "xor", &slots),
            vec!["mov (mem1), %eax".to_string(), "xor (mem2), %eax".to_string(), "mov %eax, (mem0)".to_string()]
        );
    }
}
