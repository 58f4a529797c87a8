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

//! Three-address expansion (C3): every non-leaf subexpression in an
//! assignment's right-hand side or a conditional jump's predicate is
//! hoisted into a preceding assignment to a fresh temporary, so every
//! operand left in place after this pass is a variable or a constant.

use tracing::trace;

use crate::errors::Result;
use crate::ir::expr::Expr;
use crate::ir::graph::{NodeId, Procedure};
use crate::ir::node::NodeKind;

#[tracing::instrument(skip(proc))]
pub fn run(proc: &mut Procedure) -> Result<()> {
    let ids: Vec<NodeId> = proc.iter_ids().collect();
    for id in ids {
        let Some(node) = proc.try_get(id) else { continue };
        match &node.kind {
            NodeKind::Assign { rhs, .. } => {
                let rhs = rhs.clone();
                let lowered = lower_children(proc, id, rhs);
                if let NodeKind::Assign { rhs, .. } = &mut proc.get_mut(id).kind {
                    *rhs = lowered;
                }
            }
            NodeKind::Jump { cond: Some(cond), .. } => {
                let cond = cond.clone();
                let lowered = lower_children(proc, id, cond);
                if let NodeKind::Jump { cond, .. } = &mut proc.get_mut(id).kind {
                    *cond = Some(lowered);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Reduces `e` to a variable or constant, hoisting it into a fresh
/// temporary assignment inserted before `before` if it is not one already.
fn reduce_to_leaf(proc: &mut Procedure, before: NodeId, e: Expr) -> Expr {
    if e.is_leaf() {
        return e;
    }
    let lowered = lower_children(proc, before, e);
    let ty = lowered.ty();
    let temp = proc.fresh_temp(ty);
    proc.insert_before(before, NodeKind::Assign { lhs: temp, rhs: lowered });
    trace!(temp = temp.0, "hoisted subexpression into temporary");
    Expr::Var(temp, ty)
}

/// Keeps `e`'s own operator in place but reduces every direct child to a
/// leaf, recursively. Transparent through `Paren`, which is not itself an
/// operation.
fn lower_children(proc: &mut Procedure, before: NodeId, e: Expr) -> Expr {
    match e {
        Expr::Var(..) | Expr::Const(_) => e,
        Expr::Paren(inner) => lower_children(proc, before, *inner),
        Expr::Binary { op, lhs, rhs, ty } => {
            let lhs = reduce_to_leaf(proc, before, *lhs);
            let rhs = reduce_to_leaf(proc, before, *rhs);
            Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), ty }
        }
        Expr::Unary { op, operand, ty } => {
            let operand = reduce_to_leaf(proc, before, *operand);
            Expr::Unary { op, operand: Box::new(operand), ty }
        }
        Expr::Ternary { cond, then_val, else_val, ty } => {
            let cond = reduce_to_leaf(proc, before, *cond);
            let then_val = reduce_to_leaf(proc, before, *then_val);
            let else_val = reduce_to_leaf(proc, before, *else_val);
            Expr::Ternary { cond: Box::new(cond), then_val: Box::new(then_val), else_val: Box::new(else_val), ty }
        }
        Expr::Intrinsic { name, args, ty } => {
            let args = args.into_iter().map(|a| reduce_to_leaf(proc, before, a)).collect();
            Expr::Intrinsic { name, args, ty }
        }
        Expr::Convert { target, operand } => {
            let operand = reduce_to_leaf(proc, before, *operand);
            Expr::Convert { target, operand: Box::new(operand) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::{BinOp, Constant};
    use crate::ir::types::{BasicKind, Type};
    use crate::ir::var::Variable;

    fn s32(v: i64) -> Expr {
        Expr::Const(Constant::int(v, Type::scalar(BasicKind::S32)))
    }

    #[test]
    fn nested_binary_rhs_is_hoisted_into_temporaries() {
        let mut proc = Procedure::new("p");
        let x = proc.alloc_var(Variable::new("x", Type::scalar(BasicKind::S32)));
        let ty = Type::scalar(BasicKind::S32);
        // x = (1 + 2) * 3
        let rhs = Expr::Binary {
            op: BinOp::Mul,
            lhs: Box::new(Expr::Binary { op: BinOp::Add, lhs: Box::new(s32(1)), rhs: Box::new(s32(2)), ty }),
            rhs: Box::new(s32(3)),
            ty,
        };
        let assign = proc.push_back(NodeKind::Assign { lhs: x, rhs });

        run(&mut proc).unwrap();

        // One hoisted temp assignment should now precede the original node.
        let hoisted_id = proc.get(assign).prev.expect("a temporary assignment was inserted");
        let hoisted = proc.get(hoisted_id);
        match &hoisted.kind {
            NodeKind::Assign { rhs: Expr::Binary { op: BinOp::Add, lhs, rhs, .. }, .. } => {
                assert!(lhs.is_leaf());
                assert!(rhs.is_leaf());
            }
            other => panic!("expected hoisted add, got {:?}", other),
        }
        match &proc.get(assign).kind {
            NodeKind::Assign { rhs: Expr::Binary { op: BinOp::Mul, lhs, rhs, .. }, .. } => {
                assert!(lhs.is_leaf());
                assert!(rhs.is_leaf());
            }
            other => panic!("expected top-level mul with leaf operands, got {:?}", other),
        }
    }

    #[test]
    fn leaf_rhs_is_left_untouched() {
        let mut proc = Procedure::new("p");
        let x = proc.alloc_var(Variable::new("x", Type::scalar(BasicKind::S32)));
        let assign = proc.push_back(NodeKind::Assign { lhs: x, rhs: s32(5) });

        run(&mut proc).unwrap();

        assert!(proc.get(assign).prev.is_none());
    }

    #[test]
    fn conditional_jump_predicate_is_expanded() {
        let mut proc = Procedure::new("p");
        let x = proc.alloc_var(Variable::new("x", Type::scalar(BasicKind::S32)));
        let ty = Type::scalar(BasicKind::S32);
        let inner = Expr::Binary { op: BinOp::Add, lhs: Box::new(Expr::Var(x, ty)), rhs: Box::new(s32(1)), ty };
        let cond = Expr::Binary { op: BinOp::Lt, lhs: Box::new(inner), rhs: Box::new(s32(10)), ty: Type::S32 };
        let label = proc.push_back(NodeKind::Label {
            name: "L".to_string(),
            defined: true,
            jumps: Vec::new(),
            phis: Vec::new(),
        });
        let jump = proc.insert_before(label, NodeKind::Jump { target: label, cond: Some(cond) });

        run(&mut proc).unwrap();

        match &proc.get(jump).kind {
            NodeKind::Jump { cond: Some(Expr::Binary { op: BinOp::Lt, lhs, rhs, .. }), .. } => {
                assert!(lhs.is_leaf());
                assert!(rhs.is_leaf());
            }
            other => panic!("expected leaf-operand comparison, got {:?}", other),
        }
    }
}
