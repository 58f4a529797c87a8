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

use std::collections::{HashMap, HashSet};

use crate::errors::{CodegenError, Result};
use crate::ir::types::{BasicKind, Type};
use crate::ir::var::VarId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: Value,
    pub ty: Type,
}

impl Constant {
    pub fn int(v: i64, ty: Type) -> Self {
        Constant { value: Value::Int(v), ty }
    }

    pub fn float(v: f64, ty: Type) -> Self {
        Constant { value: Value::Float(v), ty }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            Value::Int(v) => Some(v),
            Value::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self.value {
            Value::Int(v) => v == 0,
            Value::Float(v) => v == 0.0,
        }
    }

    pub fn is_one(&self) -> bool {
        match self.value {
            Value::Int(v) => v == 1,
            Value::Float(v) => v == 1.0,
        }
    }

    pub fn is_neg_one(&self) -> bool {
        match self.value {
            Value::Int(v) => v == -1,
            Value::Float(v) => v == -1.0,
        }
    }

    /// Truthiness used by ternary/constant-predicate reduction and by jump
    /// condition folding.
    pub fn truthy(&self) -> bool {
        !self.is_zero()
    }

    /// Wraps an integer value to the two's-complement range implied by
    /// `ty`'s width, matching `spec.md` §8 invariant 2.
    pub fn wrap_to_width(v: i64, ty: Type) -> i64 {
        match ty.width() {
            1 => v as i8 as i64,
            2 => v as i16 as i64,
            4 => v as i32 as i64,
            _ => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogAnd,
    LogOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::LogAnd | BinOp::LogOr)
    }

    pub fn is_shift_or_bitwise(self) -> bool {
        matches!(
            self,
            BinOp::Shl | BinOp::Shr | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor
        )
    }

    pub fn is_arith(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod)
    }

    /// The opposite predicate, used by `simplify()`'s `!(a<b)=(a>=b)` family
    /// and by C9's comparison-operand-reversal rule. Involution per
    /// `spec.md` §8 invariant 9.
    pub fn opposite(self) -> BinOp {
        match self {
            BinOp::Eq => BinOp::Ne,
            BinOp::Ne => BinOp::Eq,
            BinOp::Lt => BinOp::Ge,
            BinOp::Ge => BinOp::Lt,
            BinOp::Gt => BinOp::Le,
            BinOp::Le => BinOp::Gt,
            other => other,
        }
    }

    /// Predicate with operands swapped (`a < b` becomes `b > a`). Used by
    /// C9 when the selector must flip a constant from the left operand to
    /// the right one.
    pub fn swapped(self) -> BinOp {
        match self {
            BinOp::Lt => BinOp::Gt,
            BinOp::Gt => BinOp::Lt,
            BinOp::Le => BinOp::Ge,
            BinOp::Ge => BinOp::Le,
            other => other,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::LogAnd => "&&",
            BinOp::LogOr => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Neg,
    Not,
    /// `*p` — load through pointer.
    Load,
}

/// Sum type covering every expression shape. A single `match` in
/// `simplify`/`used_vars`/`replace_vars` dispatches on this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(VarId, Type),
    Const(Constant),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: Type,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        ty: Type,
    },
    Ternary {
        cond: Box<Expr>,
        then_val: Box<Expr>,
        else_val: Box<Expr>,
        ty: Type,
    },
    Intrinsic {
        name: String,
        args: Vec<Expr>,
        ty: Type,
    },
    Convert {
        target: Type,
        operand: Box<Expr>,
    },
    Paren(Box<Expr>),
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::Var(_, ty) => *ty,
            Expr::Const(c) => c.ty,
            Expr::Binary { ty, .. } => *ty,
            Expr::Unary { ty, .. } => *ty,
            Expr::Ternary { ty, .. } => *ty,
            Expr::Intrinsic { ty, .. } => *ty,
            Expr::Convert { target, .. } => *target,
            Expr::Paren(inner) => inner.ty(),
        }
    }

    fn convert_if_needed(e: Expr, target: Type) -> Expr {
        if e.ty() == target {
            e
        } else {
            Expr::Convert { target, operand: Box::new(e) }
        }
    }

    /// Builds a binary expression, resolving its result type from the
    /// operator-class table (`spec.md` §4.1) and wrapping either operand in
    /// a conversion node if its type does not already match the result.
    pub fn binary(
        op: BinOp,
        lhs: Expr,
        rhs: Expr,
        line: usize,
        col: usize,
    ) -> Result<Expr> {
        let lt = lhs.ty();
        let rt = rhs.ty();

        let result_ty = if op.is_logical() || op.is_comparison() {
            if !lt.is_integer() && !lt.is_pointer() || !rt.is_integer() && !rt.is_pointer() {
                return Err(CodegenError::TypeMismatch {
                    line,
                    col,
                    message: format!(
                        "operator {} requires integer or pointer operands, got {} and {}",
                        op.symbol(),
                        lt,
                        rt
                    ),
                });
            }
            Type::S32
        } else if op.is_shift_or_bitwise() {
            Type::promote_int(lt, rt).ok_or_else(|| CodegenError::TypeMismatch {
                line,
                col,
                message: format!(
                    "operator {} requires two integer operands, got {} and {}",
                    op.symbol(),
                    lt,
                    rt
                ),
            })?
        } else {
            Type::promote_arith(lt, rt)
        };

        let lhs = Expr::convert_if_needed(lhs, result_ty);
        let rhs = Expr::convert_if_needed(rhs, result_ty);

        Ok(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), ty: result_ty })
    }

    pub fn unary(op: UnOp, operand: Expr, line: usize, col: usize) -> Result<Expr> {
        let ty = match op {
            UnOp::Load => {
                if !operand.ty().is_pointer() {
                    return Err(CodegenError::TypeMismatch {
                        line,
                        col,
                        message: format!("cannot dereference non-pointer type {}", operand.ty()),
                    });
                }
                Type::scalar(operand.ty().basic)
            }
            UnOp::Not => Type::S32,
            UnOp::Plus | UnOp::Neg => operand.ty(),
        };
        Ok(Expr::Unary { op, operand: Box::new(operand), ty })
    }

    pub fn ternary(cond: Expr, then_val: Expr, else_val: Expr) -> Expr {
        let ty = Type::promote_arith(then_val.ty(), else_val.ty());
        let then_val = Expr::convert_if_needed(then_val, ty);
        let else_val = Expr::convert_if_needed(else_val, ty);
        Expr::Ternary { cond: Box::new(cond), then_val: Box::new(then_val), else_val: Box::new(else_val), ty }
    }

    pub fn intrinsic(name: impl Into<String>, args: Vec<Expr>, ty: Type) -> Expr {
        Expr::Intrinsic { name: name.into(), args, ty }
    }

    pub fn convert(target: Type, operand: Expr) -> Expr {
        Expr::Convert { target, operand: Box::new(operand) }
    }

    /// Value-preserving constant folding, applied bottom-up. See `spec.md`
    /// §4.1 for the exact identity list this must satisfy.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Var(..) | Expr::Const(_) => self.clone(),

            Expr::Paren(inner) => inner.simplify(),

            Expr::Convert { target, operand } => {
                let operand = operand.simplify();
                if let Expr::Const(c) = &operand {
                    return Expr::Const(fold_convert(c, *target));
                }
                Expr::Convert { target: *target, operand: Box::new(operand) }
            }

            Expr::Unary { op, operand, ty } => {
                let operand = operand.simplify();

                // --x = x
                if *op == UnOp::Neg {
                    if let Expr::Unary { op: UnOp::Neg, operand: inner, .. } = &operand {
                        return (**inner).clone();
                    }
                }

                // !(a < b) = (a >= b), and the other five inverses.
                if *op == UnOp::Not {
                    if let Expr::Binary { op: bop, lhs, rhs, ty: bty } = &operand {
                        if bop.is_comparison() {
                            return Expr::Binary {
                                op: bop.opposite(),
                                lhs: lhs.clone(),
                                rhs: rhs.clone(),
                                ty: *bty,
                            };
                        }
                    }
                }

                if let Expr::Const(c) = &operand {
                    if let Some(folded) = fold_unary(*op, c, *ty) {
                        return Expr::Const(folded);
                    }
                }

                Expr::Unary { op: *op, operand: Box::new(operand), ty: *ty }
            }

            Expr::Binary { op, lhs, rhs, ty } => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();

                if let (Expr::Const(lc), Expr::Const(rc)) = (&lhs, &rhs) {
                    if let Some(folded) = fold_binary(*op, lc, rc, *ty) {
                        return Expr::Const(folded);
                    }
                    // Division/modulo by zero: propagate unfolded rather
                    // than raising, per `spec.md` §4.1/§7.
                }

                if let Some(simplified) = algebraic_identity(*op, &lhs, &rhs, *ty) {
                    return simplified;
                }

                Expr::Binary { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs), ty: *ty }
            }

            Expr::Ternary { cond, then_val, else_val, ty } => {
                let cond = cond.simplify();
                let then_val = then_val.simplify();
                let else_val = else_val.simplify();
                if let Expr::Const(c) = &cond {
                    return if c.truthy() { then_val } else { else_val };
                }
                Expr::Ternary {
                    cond: Box::new(cond),
                    then_val: Box::new(then_val),
                    else_val: Box::new(else_val),
                    ty: *ty,
                }
            }

            Expr::Intrinsic { name, args, ty } => Expr::Intrinsic {
                name: name.clone(),
                args: args.iter().map(Expr::simplify).collect(),
                ty: *ty,
            },
        }
    }

    pub fn used_vars(&self, out: &mut HashSet<VarId>) {
        match self {
            Expr::Var(id, _) => {
                out.insert(*id);
            }
            Expr::Const(_) => {}
            Expr::Binary { lhs, rhs, .. } => {
                lhs.used_vars(out);
                rhs.used_vars(out);
            }
            Expr::Unary { operand, .. } | Expr::Convert { operand, .. } | Expr::Paren(operand) => {
                operand.used_vars(out);
            }
            Expr::Ternary { cond, then_val, else_val, .. } => {
                cond.used_vars(out);
                then_val.used_vars(out);
                else_val.used_vars(out);
            }
            Expr::Intrinsic { args, .. } => {
                for a in args {
                    a.used_vars(out);
                }
            }
        }
    }

    /// Substitutes every referenced variable per `map`; variables absent
    /// from `map` are left as-is (used when a use is live-in and has no
    /// current renaming-stack entry).
    pub fn replace_vars(&self, map: &HashMap<VarId, VarId>) -> Expr {
        match self {
            Expr::Var(id, ty) => {
                let replaced = map.get(id).copied().unwrap_or(*id);
                Expr::Var(replaced, *ty)
            }
            Expr::Const(_) => self.clone(),
            Expr::Binary { op, lhs, rhs, ty } => Expr::Binary {
                op: *op,
                lhs: Box::new(lhs.replace_vars(map)),
                rhs: Box::new(rhs.replace_vars(map)),
                ty: *ty,
            },
            Expr::Unary { op, operand, ty } => Expr::Unary {
                op: *op,
                operand: Box::new(operand.replace_vars(map)),
                ty: *ty,
            },
            Expr::Convert { target, operand } => Expr::Convert {
                target: *target,
                operand: Box::new(operand.replace_vars(map)),
            },
            Expr::Paren(inner) => Expr::Paren(Box::new(inner.replace_vars(map))),
            Expr::Ternary { cond, then_val, else_val, ty } => Expr::Ternary {
                cond: Box::new(cond.replace_vars(map)),
                then_val: Box::new(then_val.replace_vars(map)),
                else_val: Box::new(else_val.replace_vars(map)),
                ty: *ty,
            },
            Expr::Intrinsic { name, args, ty } => Expr::Intrinsic {
                name: name.clone(),
                args: args.iter().map(|a| a.replace_vars(map)).collect(),
                ty: *ty,
            },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Expr::Var(..) | Expr::Const(_))
    }
}

fn fold_convert(c: &Constant, target: Type) -> Constant {
    if target.is_float() {
        Constant::float(c.as_f64().unwrap_or(0.0), target)
    } else {
        let raw = match c.value {
            Value::Int(v) => v,
            Value::Float(v) => v as i64,
        };
        Constant::int(Constant::wrap_to_width(raw, target), target)
    }
}

fn fold_unary(op: UnOp, c: &Constant, ty: Type) -> Option<Constant> {
    match op {
        UnOp::Plus => Some(c.clone()),
        UnOp::Neg => Some(match c.value {
            Value::Int(v) => Constant::int(Constant::wrap_to_width(v.wrapping_neg(), ty), ty),
            Value::Float(v) => Constant::float(-v, ty),
        }),
        UnOp::Not => Some(Constant::int(if c.truthy() { 0 } else { 1 }, Type::S32)),
        UnOp::Load => None,
    }
}

fn algebraic_identity(op: BinOp, lhs: &Expr, rhs: &Expr, ty: Type) -> Option<Expr> {
    let lconst = if let Expr::Const(c) = lhs { Some(c) } else { None };
    let rconst = if let Expr::Const(c) = rhs { Some(c) } else { None };

    match op {
        BinOp::Add => {
            if let Some(r) = rconst {
                if r.is_zero() {
                    return Some(lhs.clone());
                }
            }
            if let Some(l) = lconst {
                if l.is_zero() {
                    return Some(rhs.clone());
                }
            }
            None
        }
        BinOp::Sub => {
            if let Some(r) = rconst {
                if r.is_zero() {
                    return Some(lhs.clone());
                }
            }
            if let Some(l) = lconst {
                if l.is_zero() {
                    return Some(Expr::Unary { op: UnOp::Neg, operand: Box::new(rhs.clone()), ty });
                }
            }
            None
        }
        BinOp::Mul => {
            if let Some(r) = rconst {
                if r.is_zero() {
                    return Some(Expr::Const(zero_like(ty)));
                }
                if r.is_one() {
                    return Some(lhs.clone());
                }
                if r.is_neg_one() {
                    return Some(Expr::Unary { op: UnOp::Neg, operand: Box::new(lhs.clone()), ty });
                }
            }
            if let Some(l) = lconst {
                if l.is_zero() {
                    return Some(Expr::Const(zero_like(ty)));
                }
                if l.is_one() {
                    return Some(rhs.clone());
                }
                if l.is_neg_one() {
                    return Some(Expr::Unary { op: UnOp::Neg, operand: Box::new(rhs.clone()), ty });
                }
            }
            None
        }
        BinOp::Div => {
            if let Some(r) = rconst {
                if r.is_one() {
                    return Some(lhs.clone());
                }
                if r.is_neg_one() {
                    return Some(Expr::Unary { op: UnOp::Neg, operand: Box::new(lhs.clone()), ty });
                }
            }
            if let Some(l) = lconst {
                if l.is_zero() {
                    return Some(Expr::Const(zero_like(ty)));
                }
            }
            None
        }
        _ => None,
    }
}

fn zero_like(ty: Type) -> Constant {
    if ty.is_float() {
        Constant::float(0.0, ty)
    } else {
        Constant::int(0, ty)
    }
}

/// `(c1 op c2) -> c` for every operator, when both sides are constants.
/// Division/modulo by zero returns `None` so the caller leaves the
/// expression unfolded.
fn fold_binary(op: BinOp, lhs: &Constant, rhs: &Constant, ty: Type) -> Option<Constant> {
    if op.is_comparison() {
        let ord = compare_constants(lhs, rhs)?;
        let result = match op {
            BinOp::Eq => ord == std::cmp::Ordering::Equal,
            BinOp::Ne => ord != std::cmp::Ordering::Equal,
            BinOp::Lt => ord == std::cmp::Ordering::Less,
            BinOp::Le => ord != std::cmp::Ordering::Greater,
            BinOp::Gt => ord == std::cmp::Ordering::Greater,
            BinOp::Ge => ord != std::cmp::Ordering::Less,
            _ => unreachable!(),
        };
        return Some(Constant::int(if result { 1 } else { 0 }, Type::S32));
    }

    if op.is_logical() {
        let result = match op {
            BinOp::LogAnd => lhs.truthy() && rhs.truthy(),
            BinOp::LogOr => lhs.truthy() || rhs.truthy(),
            _ => unreachable!(),
        };
        return Some(Constant::int(if result { 1 } else { 0 }, Type::S32));
    }

    if ty.is_float() {
        let a = lhs.as_f64()?;
        let b = rhs.as_f64()?;
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => {
                if b == 0.0 {
                    return None;
                }
                a / b
            }
            _ => return None,
        };
        return Some(Constant::float(result, ty));
    }

    let a = lhs.as_i64()?;
    let b = rhs.as_i64()?;
    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return None;
            }
            a.wrapping_div(b)
        }
        BinOp::Mod => {
            if b == 0 {
                return None;
            }
            a.wrapping_rem(b)
        }
        BinOp::Shl => a.wrapping_shl(b as u32),
        BinOp::Shr => a.wrapping_shr(b as u32),
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        _ => return None,
    };
    Some(Constant::int(Constant::wrap_to_width(result, ty), ty))
}

fn compare_constants(lhs: &Constant, rhs: &Constant) -> Option<std::cmp::Ordering> {
    match (lhs.value, rhs.value) {
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            lhs.as_f64()?.partial_cmp(&rhs.as_f64()?)
        }
        _ => lhs.as_i64()?.partial_cmp(&rhs.as_i64()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::BasicKind;

    fn s32(v: i64) -> Expr {
        Expr::Const(Constant::int(v, Type::scalar(BasicKind::S32)))
    }

    #[test]
    fn add_zero_identity() {
        let e = Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(s32(5)),
            rhs: Box::new(s32(0)),
            ty: Type::scalar(BasicKind::S32),
        };
        assert_eq!(e.simplify(), s32(5));
    }

    #[test]
    fn constant_fold_add() {
        let e = Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(s32(2)),
            rhs: Box::new(s32(3)),
            ty: Type::scalar(BasicKind::S32),
        };
        assert_eq!(e.simplify(), s32(5));
    }

    #[test]
    fn division_by_zero_is_left_unfolded() {
        let e = Expr::Binary {
            op: BinOp::Div,
            lhs: Box::new(s32(5)),
            rhs: Box::new(s32(0)),
            ty: Type::scalar(BasicKind::S32),
        };
        assert_eq!(e.simplify(), e);
    }

    #[test]
    fn double_negation_cancels() {
        let neg = Expr::Unary {
            op: UnOp::Neg,
            operand: Box::new(s32(5)),
            ty: Type::scalar(BasicKind::S32),
        };
        let dneg = Expr::Unary { op: UnOp::Neg, operand: Box::new(neg), ty: Type::scalar(BasicKind::S32) };
        // Constant-folds first (fold_unary catches the outer Neg over a
        // Const), so this settles directly on the original constant.
        assert_eq!(dneg.simplify(), s32(5));
    }

    #[test]
    fn not_of_comparison_uses_opposite_predicate() {
        let cmp = Expr::Binary {
            op: BinOp::Lt,
            lhs: Box::new(Expr::Var(VarId(0), Type::scalar(BasicKind::S32))),
            rhs: Box::new(Expr::Var(VarId(1), Type::scalar(BasicKind::S32))),
            ty: Type::S32,
        };
        let not_cmp = Expr::Unary { op: UnOp::Not, operand: Box::new(cmp), ty: Type::S32 };
        let simplified = not_cmp.simplify();
        match simplified {
            Expr::Binary { op: BinOp::Ge, .. } => {}
            other => panic!("expected >=, got {:?}", other),
        }
    }

    #[test]
    fn idempotent_simplify() {
        let e = Expr::Binary {
            op: BinOp::Mul,
            lhs: Box::new(s32(1)),
            rhs: Box::new(Expr::Binary {
                op: BinOp::Add,
                lhs: Box::new(s32(2)),
                rhs: Box::new(s32(0)),
                ty: Type::scalar(BasicKind::S32),
            }),
            ty: Type::scalar(BasicKind::S32),
        };
        let once = e.simplify();
        let twice = once.simplify();
        assert_eq!(once, twice);
    }

    #[test]
    fn opposite_is_an_involution() {
        for op in [
            BinOp::Eq, BinOp::Ne, BinOp::Lt, BinOp::Le, BinOp::Gt, BinOp::Ge,
        ] {
            assert_eq!(op.opposite().opposite(), op);
        }
    }
}
