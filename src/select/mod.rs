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

//! x86-64 instruction selection (C9): walks the colored, φ-eliminated
//! linear IR and emits one AT&T-syntax assembly line (or more) per node.
//! Per-shape classification lives in `templates`/`compare`/`binary`/`unary`;
//! this module is the dispatch table that builds their `Operand` inputs
//! from colored variables and stitches the per-statement output together.
//! `spec.md` §4.9.

pub mod binary;
pub mod compare;
pub mod templates;
pub mod unary;

use tracing::trace;

use crate::errors::{CodegenError, Result};
use crate::ir::expr::{BinOp, Constant, Expr, UnOp, Value};
use crate::ir::graph::{NodeId, Procedure};
use crate::ir::node::NodeKind;
use crate::ir::types::Type;
use crate::ir::var::VarId;
use crate::liveness::Liveness;
use crate::regs::{bank_for_type, IntReg, PhysReg};

/// Which addressing mode an operand's rendered text denotes. Drives every
/// classification table in this module's siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Register,
    Memory,
    Constant,
}

/// A fully rendered operand: the literal text to place in the assembly
/// line, tagged with the addressing mode it needs to be treated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub text: String,
    pub kind: Kind,
}

const INDENT: &str = "\t";

fn operand_of_var(proc: &Procedure, v: VarId) -> Operand {
    let ty = proc.var(v).ty;
    let reg = proc
        .var(v)
        .assigned_reg
        .get()
        .expect("instruction selection runs only after C7 has colored every variable");
    let kind = match reg {
        PhysReg::Mem(_) => Kind::Memory,
        _ => Kind::Register,
    };
    Operand { text: reg.render(ty.width()), kind }
}

/// Renders a constant leaf. Integers become plain immediates (`$N`);
/// floats are rendered as decimal literal text and left for the external
/// assembler to place in a data section and load — C9's job is choosing
/// instruction shapes, not managing a rodata layout, which is out of scope
/// here the same way it is for the scalar-immediate path.
fn render_constant(c: &Constant) -> String {
    match c.value {
        Value::Int(v) => format!("${}", v),
        Value::Float(v) => format!("${}", v),
    }
}

fn operand_of_leaf(proc: &Procedure, expr: &Expr) -> Result<Operand> {
    match expr {
        Expr::Var(v, _) => Ok(operand_of_var(proc, *v)),
        Expr::Const(c) => Ok(Operand { text: render_constant(c), kind: Kind::Constant }),
        other => Err(CodegenError::invariant(
            "select::operand_of_leaf",
            0,
            format!("expected a leaf operand, found {:?} — C3 should have hoisted this", other),
        )),
    }
}

/// Scratch register text for the bank `ty` lives in, at `ty`'s width.
fn scratch_text(ty: Type) -> String {
    PhysReg::temp(bank_for_type(ty)).render(ty.width())
}

fn label_name(proc: &Procedure, id: NodeId) -> &str {
    match &proc.get(id).kind {
        NodeKind::Label { name, .. } => name.as_str(),
        other => unreachable!("jump target must be a label node, found {:?}", other),
    }
}

fn arith_mnemonic(op: BinOp, signed: bool) -> Result<&'static str> {
    Ok(match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "imul",
        BinOp::BitAnd => "and",
        BinOp::BitOr => "or",
        BinOp::BitXor => "xor",
        BinOp::Shl => "shl",
        BinOp::Shr => {
            if signed {
                "sar"
            } else {
                "shr"
            }
        }
        other => {
            return Err(CodegenError::invariant(
                "select::arith_mnemonic",
                0,
                format!("{:?} is selected along its own path, not the generic binary table", other),
            ))
        }
    })
}

fn unary_mnemonic(op: UnOp) -> Result<&'static str> {
    Ok(match op {
        UnOp::Neg => "neg",
        UnOp::Not => "not",
        other => {
            return Err(CodegenError::invariant(
                "select::unary_mnemonic",
                0,
                format!("{:?} should have been simplified or routed elsewhere before C9", other),
            ))
        }
    })
}

/// Selects every instruction for a procedure, in source order. Labels are
/// rendered at column zero; every other line is indented, matching
/// `spec.md` §4.9's output contract.
#[tracing::instrument(skip(proc))]
pub fn select_procedure(proc: &Procedure) -> Result<Vec<String>> {
    let live = crate::liveness::compute(proc);
    let mut lines = Vec::new();
    for id in proc.iter_ids() {
        match &proc.get(id).kind {
            NodeKind::Label { name, .. } => lines.push(format!("{}:", name)),
            NodeKind::Jump { target, cond } => {
                let target_name = label_name(proc, *target).to_string();
                match cond {
                    None => lines.push(format!("{}jmp {}", INDENT, target_name)),
                    Some(cond) => lines.extend(select_conditional_jump(proc, cond, &target_name)?),
                }
            }
            NodeKind::Assign { lhs, rhs } => lines.extend(select_assign(proc, id, *lhs, rhs, &live)?),
            NodeKind::Swap { a, b } => lines.extend(select_swap(proc, *a, *b)),
        }
    }
    trace!(lines = lines.len(), "instruction selection complete");
    Ok(lines)
}

fn select_conditional_jump(proc: &Procedure, cond: &Expr, target: &str) -> Result<Vec<String>> {
    match cond {
        Expr::Binary { op, lhs, rhs, .. } if op.is_comparison() => {
            let lo = operand_of_leaf(proc, lhs)?;
            let ro = operand_of_leaf(proc, rhs)?;
            let signed = lhs.ty().is_signed() || rhs.ty().is_signed();
            let temp = scratch_text(lhs.ty());
            let plan = compare::classify("cmp", &temp, &lo, &ro)?;
            let pred = if plan.reverse { op.swapped() } else { *op };
            let mnemonic = compare::jump_mnemonic(pred, signed)?;

            let mut lines: Vec<String> = plan.lines.into_iter().map(|l| format!("{}{}", INDENT, l)).collect();
            lines.push(format!("{}{} {}", INDENT, mnemonic, target));
            Ok(lines)
        }
        _ => {
            let op = operand_of_leaf(proc, cond)?;
            if op.kind == Kind::Constant {
                return Err(CodegenError::invariant(
                    "select::select_conditional_jump",
                    0,
                    "a constant jump condition should have been folded away by control-flow cleanup",
                ));
            }
            Ok(vec![
                format!("{}cmp $0, {}", INDENT, op.text),
                format!("{}jne {}", INDENT, target),
            ])
        }
    }
}

/// Whether `expr` (a leaf operand of the statement at `id`) names a
/// variable that holds no value still live on any outgoing edge — a
/// constant leaf is vacuously dead. Backs the memory-destination cases in
/// `binary::select`/`unary::select` that may clobber a dying operand's
/// register instead of routing through the reserved temporary.
fn operand_dead_after(proc: &Procedure, id: NodeId, live: &Liveness, expr: &Expr) -> bool {
    match expr {
        Expr::Var(v, _) => {
            let successors = proc.successor(id);
            successors.iter().all(|&s| !live.live_before(s).contains(v))
        }
        _ => true,
    }
}

fn select_assign(proc: &Procedure, id: NodeId, lhs: VarId, rhs: &Expr, live: &Liveness) -> Result<Vec<String>> {
    let x = operand_of_var(proc, lhs);
    let temp = scratch_text(proc.var(lhs).ty);

    let lines = match rhs {
        Expr::Var(v, _) => vec![format!("mov {}, {}", operand_of_var(proc, *v).text, x.text)],
        Expr::Const(c) => vec![format!("mov {}, {}", render_constant(c), x.text)],

        Expr::Binary { op, lhs: l, rhs: r, .. } if op.is_comparison() => select_setcc(proc, lhs, &x, *op, l, r, &temp)?,

        Expr::Binary { op, lhs: l, rhs: r, .. } if matches!(*op, BinOp::Div | BinOp::Mod) => {
            select_div_mod(proc, &x, *op, l, r)?
        }

        Expr::Binary { op, lhs: l, rhs: r, .. } => {
            let y = operand_of_leaf(proc, l)?;
            let z = operand_of_leaf(proc, r)?;
            let signed = l.ty().is_signed() || r.ty().is_signed();
            let mnemonic = arith_mnemonic(*op, signed)?;
            let y_dead = operand_dead_after(proc, id, live, l);
            let z_dead = operand_dead_after(proc, id, live, r);
            binary::select(mnemonic, &x, &y, &z, y_dead, z_dead, &temp)?
        }

        Expr::Unary { op: UnOp::Load, operand, .. } => {
            let y = operand_of_leaf(proc, operand)?;
            vec![format!("mov ({}), {}", y.text, x.text)]
        }

        Expr::Unary { op, operand, .. } => {
            let y = operand_of_leaf(proc, operand)?;
            let mnemonic = unary_mnemonic(*op)?;
            let y_dead_after = operand_dead_after(proc, id, live, operand);
            unary::select(mnemonic, &x, &y, y_dead_after, &temp)?
        }

        Expr::Convert { target, operand } => select_convert(proc, &x, *target, operand)?,

        other => {
            return Err(CodegenError::invariant(
                "select::select_assign",
                0,
                format!("unexpected non-leaf assignment shape reaching C9: {:?}", other),
            ))
        }
    };
    Ok(lines.into_iter().map(|l| format!("{}{}", INDENT, l)).collect())
}

/// `x = y cmp z`: materializes the predicate via `cmp`+`setcc`, then
/// zero-extends the single byte `setcc` writes up to `x`'s width when `x`
/// is a wider register (memory destinations need no extension — the
/// synthetic memory register is width-agnostic text, resolved downstream).
fn select_setcc(proc: &Procedure, lhs: VarId, x: &Operand, op: BinOp, l: &Expr, r: &Expr, temp: &str) -> Result<Vec<String>> {
    let lo = operand_of_leaf(proc, l)?;
    let ro = operand_of_leaf(proc, r)?;
    let signed = l.ty().is_signed() || r.ty().is_signed();
    let plan = compare::classify("cmp", temp, &lo, &ro)?;
    let pred = if plan.reverse { op.swapped() } else { op };
    let mnemonic = compare::setcc_mnemonic(pred, signed)?;

    let mut lines = plan.lines;
    match proc.var(lhs).assigned_reg.get() {
        Some(PhysReg::Int(ireg)) => {
            let byte = ireg.sub_register_name(1);
            lines.push(format!("{} %{}", mnemonic, byte));
            let width = proc.var(lhs).ty.width();
            if width > 1 {
                lines.push(format!("movzx %{}, {}", byte, ireg.sub_register_name(width)));
            }
        }
        Some(PhysReg::Mem(_)) => lines.push(format!("{} {}", mnemonic, x.text)),
        _ => {
            return Err(CodegenError::invariant(
                "select::select_setcc",
                0,
                "a comparison result must target the integer bank",
            ))
        }
    }
    Ok(lines)
}

/// `x = y / z` / `x = y % z`. x86's `div`/`idiv` take the dividend split
/// across `%rax`/`%rdx` and cannot take an immediate divisor, so a constant
/// `z` is first staged through `x`'s own slot (not yet live) before the
/// dividend clobbers the scratch bank.
fn select_div_mod(proc: &Procedure, x: &Operand, op: BinOp, l: &Expr, r: &Expr) -> Result<Vec<String>> {
    let y = operand_of_leaf(proc, l)?;
    let z = operand_of_leaf(proc, r)?;
    let ty = l.ty();
    let width = ty.width();
    let signed = ty.is_signed();

    let dividend = PhysReg::Int(IntReg::Rax).render(width);
    let remainder = PhysReg::Int(IntReg::Rdx).render(width);

    let mut lines = Vec::new();
    let divisor_text = if z.kind == Kind::Constant {
        lines.push(format!("mov {}, {}", z.text, x.text));
        x.text.clone()
    } else {
        z.text.clone()
    };

    lines.push(format!("mov {}, {}", y.text, dividend));
    if signed {
        lines.push(if width == 8 { "cqto".to_string() } else { "cdq".to_string() });
    } else {
        lines.push(format!("xor {}, {}", remainder, remainder));
    }
    lines.push(format!("{} {}", if signed { "idiv" } else { "div" }, divisor_text));

    let result_reg = if op == BinOp::Div { dividend } else { remainder };
    lines.push(format!("mov {}, {}", result_reg, x.text));
    Ok(lines)
}

/// Integer widening/narrowing and float/integer conversion. Narrowing and
/// same-width float conversions fall back to a plain `mov`/`movss`-style
/// copy (the destination operand's own rendered width already selects the
/// right sub-register); widening picks `movzx`/`movsx` by source
/// signedness.
fn select_convert(proc: &Procedure, x: &Operand, target: Type, operand: &Expr) -> Result<Vec<String>> {
    let y = operand_of_leaf(proc, operand)?;
    let src_ty = operand.ty();

    let line = match (src_ty.is_float(), target.is_float()) {
        (false, false) if target.width() <= src_ty.width() => format!("mov {}, {}", y.text, x.text),
        (false, false) if src_ty.is_signed() => format!("movsx {}, {}", y.text, x.text),
        (false, false) => format!("movzx {}, {}", y.text, x.text),
        (true, false) => format!("cvttsd2si {}, {}", y.text, x.text),
        (false, true) => format!("cvtsi2sd {}, {}", y.text, x.text),
        (true, true) => format!("movsd {}, {}", y.text, x.text),
    };
    Ok(vec![format!("{}{}", INDENT, line)])
}

/// A φ-elimination swap on two register-allocated variables compiles to a
/// single `xchg`; if either side was spilled to memory, a corrected
/// three-move sequence is used instead (the retrieved `insn_swap` routine's
/// memory branch double-writes its second operand and loses the first
/// register's original value — `DESIGN.md`).
fn select_swap(proc: &Procedure, a: VarId, b: VarId) -> Vec<String> {
    let ra = operand_of_var(proc, a);
    let rb = operand_of_var(proc, b);
    let lines: Vec<String> = match (ra.kind, rb.kind) {
        (Kind::Register, Kind::Register) => vec![format!("xchg {}, {}", rb.text, ra.text)],
        _ => {
            let temp = scratch_text(proc.var(a).ty);
            vec![
                format!("mov {}, {}", ra.text, temp),
                format!("mov {}, {}", rb.text, ra.text),
                format!("mov {}, {}", temp, rb.text),
            ]
        }
    };
    lines.into_iter().map(|l| format!("{}{}", INDENT, l)).collect()
}
