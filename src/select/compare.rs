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

//! Comparison classification (C9): the 8-case table over
//! (lhs-kind, rhs-kind) ∈ {register, memory, constant}² \ {(const, const)},
//! grounded on `codegen.py`'s `classify_cmp`/`cmp_map`. `spec.md` §4.9.

use crate::errors::{CodegenError, Result};
use crate::ir::expr::BinOp;
use crate::select::{Kind, Operand};

/// The compare instructions to emit, plus whether the caller must swap its
/// predicate (`BinOp::swapped`) because the left operand was a constant.
pub struct CmpPlan {
    pub lines: Vec<String>,
    pub reverse: bool,
}

/// x86 CMP cannot take an immediate as its destination operand, so a
/// constant left-hand side is handled by comparing in the other direction
/// and asking the caller to swap its predicate accordingly (`a < b` becomes
/// `b > a`) rather than negate it (`spec.md` §4.9; a constant right-hand
/// side never needs this since CMP's source operand may be an immediate).
pub fn classify(mnemonic: &str, temp: &str, lhs: &Operand, rhs: &Operand) -> Result<CmpPlan> {
    use Kind::*;
    let plan = match (lhs.kind, rhs.kind) {
        (Constant, Constant) => {
            return Err(CodegenError::invariant(
                "select::compare::classify",
                0,
                "both comparison operands are constants; should have constant-folded before C9",
            ));
        }
        (Constant, _) => CmpPlan {
            lines: vec![format!("{} {}, {}", mnemonic, lhs.text, rhs.text)],
            reverse: true,
        },
        (Register, Register) | (Register, Memory) | (Register, Constant) | (Memory, Register) | (Memory, Constant) => {
            CmpPlan { lines: vec![format!("{} {}, {}", mnemonic, rhs.text, lhs.text)], reverse: false }
        }
        (Memory, Memory) => CmpPlan {
            lines: vec![format!("mov {}, {}", lhs.text, temp), format!("{} {}, {}", mnemonic, rhs.text, temp)],
            reverse: false,
        },
    };
    Ok(plan)
}

/// Jump mnemonic for a predicate, signed by the OR of both operands' types
/// (`spec.md` §4.9 / §8 Open Questions — deliberately asymmetric with
/// `setcc_mnemonic`'s AND rule).
pub fn jump_mnemonic(pred: BinOp, signed: bool) -> Result<&'static str> {
    use BinOp::*;
    Ok(match (pred, signed) {
        (Eq, _) => "je",
        (Ne, _) => "jne",
        (Lt, true) => "jl",
        (Lt, false) => "jb",
        (Le, true) => "jle",
        (Le, false) => "jbe",
        (Gt, true) => "jg",
        (Gt, false) => "ja",
        (Ge, true) => "jge",
        (Ge, false) => "jae",
        _ => {
            return Err(CodegenError::invariant(
                "select::compare::jump_mnemonic",
                0,
                format!("{:?} is not a comparison predicate", pred),
            ));
        }
    })
}

/// Set-cc mnemonic for a predicate, signed by the AND of both operands'
/// types (`spec.md` §4.9 / §8 Open Questions).
pub fn setcc_mnemonic(pred: BinOp, signed: bool) -> Result<&'static str> {
    use BinOp::*;
    Ok(match (pred, signed) {
        (Eq, _) => "sete",
        (Ne, _) => "setne",
        (Lt, true) => "setl",
        (Lt, false) => "setb",
        (Le, true) => "setle",
        (Le, false) => "setbe",
        (Gt, true) => "setg",
        (Gt, false) => "seta",
        (Ge, true) => "setge",
        (Ge, false) => "setae",
        _ => {
            return Err(CodegenError::invariant(
                "select::compare::setcc_mnemonic",
                0,
                format!("{:?} is not a comparison predicate", pred),
            ));
        }
    })
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
    fn register_register_compares_rhs_against_lhs() {
        let plan = classify("cmp", "%eax", &reg("%ebx"), &reg("%ecx")).unwrap();
        assert_eq!(plan.lines, vec!["cmp %ecx, %ebx".to_string()]);
        assert!(!plan.reverse);
    }

    #[test]
    fn memory_memory_spills_lhs_through_the_temporary() {
        let plan = classify("cmp", "%eax", &mem("(mem0)"), &mem("(mem1)")).unwrap();
        assert_eq!(plan.lines, vec!["mov (mem0), %eax".to_string(), "cmp (mem1), %eax".to_string()]);
        assert!(!plan.reverse);
    }

    #[test]
    fn constant_on_the_left_reverses_and_keeps_cmp_destination_valid() {
        let plan = classify("cmp", "%eax", &imm("$5"), &reg("%ebx")).unwrap();
        assert_eq!(plan.lines, vec!["cmp $5, %ebx".to_string()]);
        assert!(plan.reverse, "a constant lhs cannot be CMP's destination operand");
    }

    #[test]
    fn reverse_flag_pairs_with_swapped_not_opposite() {
        // 5 < 5 is false. After reversing, cmp leaves flags for rhs(5) vs
        // lhs(5); using `swapped()` (Gt) correctly reports false via `jg`,
        // whereas `opposite()` (Ge) would incorrectly report true.
        assert_eq!(BinOp::Lt.swapped(), BinOp::Gt);
    }

    #[test]
    fn both_constant_operands_is_an_internal_invariant_violation() {
        assert!(classify("cmp", "%eax", &imm("$1"), &imm("$2")).is_err());
    }
}
