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

//! φ elimination (C8): converts each label's phi-list into copy/swap
//! sequences on its predecessor edges, splitting critical edges where the
//! predecessor is a conditional jump. `spec.md` §4.8.

use std::collections::HashMap;

use tracing::trace;

use crate::errors::Result;
use crate::ir::expr::{Expr, UnOp};
use crate::ir::graph::{NodeId, Procedure};
use crate::ir::node::NodeKind;
use crate::ir::phi::Phi;
use crate::ir::var::VarId;
use crate::regs::PhysReg;

fn detach_jump(proc: &mut Procedure, jump_id: NodeId) {
    let target = match &proc.get(jump_id).kind {
        NodeKind::Jump { target, .. } => *target,
        _ => return,
    };
    if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(target).kind {
        jumps.retain(|j| *j != jump_id);
    }
}

fn register_jump(proc: &mut Procedure, jump_id: NodeId, target: NodeId) {
    if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(target).kind {
        jumps.push(jump_id);
    }
}

fn retarget(proc: &mut Procedure, jump_id: NodeId, new_target: NodeId) {
    detach_jump(proc, jump_id);
    register_jump(proc, jump_id, new_target);
    if let NodeKind::Jump { target, .. } = &mut proc.get_mut(jump_id).kind {
        *target = new_target;
    }
}

fn negate_condition(cond: Expr) -> Expr {
    Expr::unary(UnOp::Not, cond, 0, 0)
        .expect("logical not of a well-typed condition never fails to type-check")
        .simplify()
}

fn reg_of(proc: &Procedure, v: VarId) -> Option<PhysReg> {
    proc.var(v).assigned_reg.get()
}

#[tracing::instrument(skip(proc))]
pub fn run(proc: &mut Procedure) -> Result<()> {
    let label_ids: Vec<NodeId> = proc.iter_ids().filter(|&id| proc.get(id).kind.is_label()).collect();

    for label in label_ids {
        let phis = match &proc.get(label).kind {
            NodeKind::Label { phis, .. } => phis.clone(),
            _ => continue,
        };
        if phis.is_empty() {
            continue;
        }

        for (pred, pairs) in group_by_predecessor(&phis) {
            let ops = schedule(proc, pairs);
            if !ops.is_empty() {
                place(proc, label, pred, ops);
            }
        }

        if let NodeKind::Label { phis, .. } = &mut proc.get_mut(label).kind {
            phis.clear();
        }
        trace!(label = label.0, "eliminated phis");
    }
    Ok(())
}

/// Groups φ-arg pairs by predecessor node, preserving first-encounter order
/// (`spec.md` §5's determinism guarantee on φ-argument order).
fn group_by_predecessor(phis: &[Phi]) -> Vec<(NodeId, Vec<(VarId, VarId)>)> {
    let mut order: Vec<NodeId> = Vec::new();
    let mut by_pred: HashMap<NodeId, Vec<(VarId, VarId)>> = HashMap::new();
    for phi in phis {
        for arg in &phi.args {
            if !by_pred.contains_key(&arg.pred) {
                order.push(arg.pred);
            }
            by_pred.entry(arg.pred).or_default().push((arg.src, phi.lhs));
        }
    }
    order.into_iter().map(|pred| (pred, by_pred.remove(&pred).unwrap())).collect()
}

/// Sequences one predecessor's (src, dst) permutation into copy/swap
/// `NodeKind`s via the "bring-each-element-into-position" method.
fn schedule(proc: &Procedure, mut pairs: Vec<(VarId, VarId)>) -> Vec<NodeKind> {
    pairs.retain(|&(src, dst)| reg_of(proc, src) != reg_of(proc, dst));

    let mut ops = Vec::new();
    let n = pairs.len();
    if n == 0 {
        return ops;
    }
    if n == 1 {
        let (src, dst) = pairs[0];
        ops.push(NodeKind::Assign { lhs: dst, rhs: Expr::Var(src, proc.var(dst).ty) });
        return ops;
    }

    let mut srcs: Vec<VarId> = pairs.iter().map(|p| p.0).collect();
    let dsts: Vec<VarId> = pairs.iter().map(|p| p.1).collect();

    for i in 0..n {
        if reg_of(proc, srcs[i]) == reg_of(proc, dsts[i]) {
            continue;
        }
        let dst_reg = reg_of(proc, dsts[i]);
        match ((i + 1)..n).find(|&j| reg_of(proc, srcs[j]) == dst_reg) {
            Some(j) => {
                ops.push(NodeKind::Swap { a: srcs[i], b: srcs[j] });
                srcs.swap(i, j);
            }
            None => {
                ops.push(NodeKind::Assign { lhs: dsts[i], rhs: Expr::Var(srcs[i], proc.var(dsts[i]).ty) });
            }
        }
    }
    ops
}

/// Inserts `ops` at the point dictated by `pred`'s shape: immediately
/// before `label` for a fallthrough predecessor, immediately before the
/// jump for an unconditional-jump predecessor, or via a split critical
/// edge for a conditional-jump predecessor.
fn place(proc: &mut Procedure, label: NodeId, pred: NodeId, ops: Vec<NodeKind>) {
    let cond = match &proc.get(pred).kind {
        NodeKind::Jump { cond, .. } => cond.clone(),
        _ => {
            for op in ops {
                proc.insert_before(label, op);
            }
            return;
        }
    };

    match cond {
        None => {
            for op in ops {
                proc.insert_before(pred, op);
            }
        }
        Some(cond) => split_critical_edge(proc, pred, label, cond, ops),
    }
}

/// Rewrites `jump-if-C L` as `jump-if-¬C Lnew; <ops>; jump L; Lnew:`,
/// where `Lnew` falls through to whatever the original jump's fallthrough
/// continuation was.
fn split_critical_edge(proc: &mut Procedure, jump_id: NodeId, label: NodeId, cond: Expr, ops: Vec<NodeKind>) {
    let negated = negate_condition(cond);
    let new_label_name = proc.fresh_label_name();
    let new_label_kind = NodeKind::Label { name: new_label_name, defined: true, jumps: Vec::new(), phis: Vec::new() };
    let new_label = match proc.get(jump_id).next {
        Some(after) => proc.insert_before(after, new_label_kind),
        None => proc.push_back(new_label_kind),
    };

    retarget(proc, jump_id, new_label);
    if let NodeKind::Jump { cond, .. } = &mut proc.get_mut(jump_id).kind {
        *cond = Some(negated);
    }

    let mut anchor = jump_id;
    for op in ops {
        anchor = proc.insert_after(anchor, op);
    }
    let jump_to_label = proc.insert_after(anchor, NodeKind::Jump { target: label, cond: None });
    register_jump(proc, jump_to_label, label);

    trace!(jump = jump_id.0, new_label = new_label.0, "split critical edge for phi elimination");
}
