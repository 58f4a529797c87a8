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

//! Iterated dominance-frontier φ placement and dominator-tree-walk renaming
//! (C5), Cytron-style. Placement and renaming are each exposed separately
//! so callers (and tests) can inspect the intermediate, pre-renamed φ set.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::dominators::Dominators;
use crate::errors::Result;
use crate::ir::expr::Expr;
use crate::ir::graph::{NodeId, Procedure};
use crate::ir::node::NodeKind;
use crate::ir::phi::{Phi, PhiArg};
use crate::ir::var::VarId;

#[tracing::instrument(skip(proc, dom))]
pub fn run(proc: &mut Procedure, dom: &Dominators) -> Result<()> {
    place_phis(proc, dom);
    rename(proc, dom);
    Ok(())
}

fn collect_defs_and_uses(proc: &Procedure) -> (HashMap<VarId, Vec<NodeId>>, HashSet<VarId>) {
    let mut assignments: HashMap<VarId, Vec<NodeId>> = HashMap::new();
    let mut used: HashSet<VarId> = HashSet::new();
    for id in proc.iter_ids() {
        match &proc.get(id).kind {
            NodeKind::Assign { lhs, rhs } => {
                assignments.entry(*lhs).or_default().push(id);
                rhs.used_vars(&mut used);
            }
            NodeKind::Jump { cond: Some(cond), .. } => {
                cond.used_vars(&mut used);
            }
            _ => {}
        }
    }
    (assignments, used)
}

fn add_phi(proc: &mut Procedure, label: NodeId, original: VarId) {
    if let NodeKind::Label { phis, .. } = &mut proc.get_mut(label).kind {
        // `lhs` is a placeholder until renaming assigns the real variant.
        phis.push(Phi::new(original, original));
    }
}

/// Builds the φ set at every merge point, per `spec.md` §4.5's worklist
/// algorithm: `has_already`/`work` are per-variable-pass counters kept in
/// local tables, not on `Node`, so nothing from this bookkeeping leaks past
/// this function.
pub fn place_phis(proc: &mut Procedure, dom: &Dominators) {
    let (assignments, variables_read) = collect_defs_and_uses(proc);

    let mut has_already: HashMap<NodeId, u32> = HashMap::new();
    let mut work: HashMap<NodeId, u32> = HashMap::new();
    let mut counter: u32 = 0;

    for (&v, defs) in &assignments {
        if !variables_read.contains(&v) {
            continue;
        }
        counter += 1;
        let c = counter;
        let mut queue: Vec<NodeId> = Vec::new();
        for &d in defs {
            work.insert(d, c);
            queue.push(d);
        }
        while let Some(x) = queue.pop() {
            for &y in dom.dominance_frontier(x) {
                let already = *has_already.get(&y).unwrap_or(&0);
                if already < c {
                    add_phi(proc, y, v);
                    has_already.insert(y, c);
                    trace!(label = y.0, var = v.0, "placed phi");
                    let w = *work.get(&y).unwrap_or(&0);
                    if w < c {
                        work.insert(y, c);
                        queue.push(y);
                    }
                }
            }
        }
    }
}

fn current_variant_map(proc: &Procedure, used: &HashSet<VarId>) -> HashMap<VarId, VarId> {
    let mut map = HashMap::new();
    for &v in used {
        if let Some(&top) = proc.var(v).rename_stack.borrow().last() {
            map.insert(v, top);
        }
    }
    map
}

enum Action {
    Enter(NodeId),
    Leave(Vec<VarId>),
}

/// Preorder walk of the dominator tree, renaming every use to the current
/// top-of-stack variant and every definition to a fresh one, propagating
/// φ-arguments to successor labels along the way. Iterative, with an
/// explicit `Leave` marker standing in for the recursive call's unwind.
pub fn rename(proc: &mut Procedure, dom: &Dominators) {
    let entry = proc.entry();
    let mut stack = vec![Action::Enter(entry)];

    while let Some(action) = stack.pop() {
        match action {
            Action::Enter(st) => {
                let mut pushed: Vec<VarId> = Vec::new();

                // Step 1: use-sites, substituted from the current stacks.
                match &proc.get(st).kind {
                    NodeKind::Assign { rhs, .. } => {
                        let mut used = HashSet::new();
                        rhs.used_vars(&mut used);
                        let map = current_variant_map(proc, &used);
                        let new_rhs = rhs.replace_vars(&map);
                        if let NodeKind::Assign { rhs, .. } = &mut proc.get_mut(st).kind {
                            *rhs = new_rhs;
                        }
                    }
                    NodeKind::Jump { cond: Some(cond), .. } => {
                        let mut used = HashSet::new();
                        cond.used_vars(&mut used);
                        let map = current_variant_map(proc, &used);
                        let new_cond: Expr = cond.replace_vars(&map);
                        if let NodeKind::Jump { cond, .. } = &mut proc.get_mut(st).kind {
                            *cond = Some(new_cond);
                        }
                    }
                    _ => {}
                }

                // Step 2: define-sites push a fresh variant each.
                if let NodeKind::Assign { lhs, .. } = &proc.get(st).kind {
                    let original = *lhs;
                    let variant = proc.next_variant(original);
                    proc.var(original).rename_stack.borrow_mut().push(variant);
                    pushed.push(original);
                    if let NodeKind::Assign { lhs, .. } = &mut proc.get_mut(st).kind {
                        *lhs = variant;
                    }
                }
                let phi_count = match &proc.get(st).kind {
                    NodeKind::Label { phis, .. } => phis.len(),
                    _ => 0,
                };
                for i in 0..phi_count {
                    let original = match &proc.get(st).kind {
                        NodeKind::Label { phis, .. } => phis[i].original,
                        _ => unreachable!(),
                    };
                    let variant = proc.next_variant(original);
                    proc.var(original).rename_stack.borrow_mut().push(variant);
                    pushed.push(original);
                    if let NodeKind::Label { phis, .. } = &mut proc.get_mut(st).kind {
                        phis[i].lhs = variant;
                    }
                }

                // Step 3: propagate φ-arguments to successor labels.
                for y in proc.successor(st) {
                    if !proc.get(y).kind.is_label() {
                        continue;
                    }
                    let phi_originals: Vec<VarId> = match &proc.get(y).kind {
                        NodeKind::Label { phis, .. } => phis.iter().map(|p| p.original).collect(),
                        _ => unreachable!(),
                    };
                    for orig in phi_originals {
                        let top = proc.var(orig).rename_stack.borrow().last().copied();
                        if let Some(top) = top {
                            if let NodeKind::Label { phis, .. } = &mut proc.get_mut(y).kind {
                                for p in phis.iter_mut() {
                                    if p.original == orig {
                                        p.args.push(PhiArg { src: top, pred: st });
                                    }
                                }
                            }
                        }
                        // Empty stack: the variable is live-in on this edge
                        // with no dominating definition reaching here (e.g.
                        // a procedure argument) — nothing to propagate.
                    }
                }

                // Step 4/5: recurse into dominator children, then pop.
                stack.push(Action::Leave(pushed));
                if let Some(kids) = dom.children.get(&st) {
                    for &c in kids.iter().rev() {
                        stack.push(Action::Enter(c));
                    }
                }
            }
            Action::Leave(pushed) => {
                for v in pushed {
                    proc.var(v).rename_stack.borrow_mut().pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dominators;
    use crate::ir::expr::{BinOp, Constant};
    use crate::ir::types::{BasicKind, Type};
    use crate::ir::var::Variable;

    fn label(name: &str) -> NodeKind {
        NodeKind::Label { name: name.to_string(), defined: true, jumps: Vec::new(), phis: Vec::new() }
    }

    fn register_jump(proc: &mut Procedure, jump_id: NodeId, target: NodeId) {
        if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(target).kind {
            jumps.push(jump_id);
        }
    }

    fn var_of(e: &Expr) -> VarId {
        match e {
            Expr::Var(id, _) => *id,
            other => panic!("expected a variable, got {:?}", other),
        }
    }

    /// entry: x = 1
    /// jc: if (x > 0) goto ELSE else fallthrough THEN
    /// THEN: x = x + 1; goto JOIN
    /// ELSE: x = x - 1  (falls through to JOIN)
    /// JOIN: y = x
    #[test]
    fn diamond_gets_one_phi_with_correctly_renamed_uses() {
        let mut proc = Procedure::new("p");
        let s32 = Type::scalar(BasicKind::S32);
        let x = proc.alloc_var(Variable::new("x", s32));
        let y = proc.alloc_var(Variable::new("y", s32));

        let entry = proc.push_back(label("entry"));
        let entry_assign = proc.push_back(NodeKind::Assign { lhs: x, rhs: Expr::Const(Constant::int(1, s32)) });
        let cond = Expr::Binary {
            op: BinOp::Gt,
            lhs: Box::new(Expr::Var(x, s32)),
            rhs: Box::new(Expr::Const(Constant::int(0, s32))),
            ty: Type::S32,
        };
        let jc = proc.push_back(NodeKind::Jump { target: entry, cond: Some(cond) });
        let then_label = proc.push_back(label("THEN"));
        let then_assign = proc.push_back(NodeKind::Assign {
            lhs: x,
            rhs: Expr::Binary { op: BinOp::Add, lhs: Box::new(Expr::Var(x, s32)), rhs: Box::new(Expr::Const(Constant::int(1, s32))), ty: s32 },
        });
        let j1 = proc.push_back(NodeKind::Jump { target: entry, cond: None });
        let else_label = proc.push_back(label("ELSE"));
        let else_assign = proc.push_back(NodeKind::Assign {
            lhs: x,
            rhs: Expr::Binary { op: BinOp::Sub, lhs: Box::new(Expr::Var(x, s32)), rhs: Box::new(Expr::Const(Constant::int(1, s32))), ty: s32 },
        });
        let join = proc.push_back(label("JOIN"));
        let join_assign = proc.push_back(NodeKind::Assign { lhs: y, rhs: Expr::Var(x, s32) });
        proc.append_done_label();

        if let NodeKind::Jump { target, .. } = &mut proc.get_mut(jc).kind {
            *target = else_label;
        }
        register_jump(&mut proc, jc, else_label);
        if let NodeKind::Jump { target, .. } = &mut proc.get_mut(j1).kind {
            *target = join;
        }
        register_jump(&mut proc, j1, join);

        let dom = dominators::compute(&proc);
        run(&mut proc, &dom).unwrap();

        let x1 = match &proc.get(entry_assign).kind {
            NodeKind::Assign { lhs, .. } => *lhs,
            _ => unreachable!(),
        };
        match &proc.get(jc).kind {
            NodeKind::Jump { cond: Some(Expr::Binary { lhs, .. }), .. } => assert_eq!(var_of(lhs), x1),
            other => panic!("unexpected jump kind: {:?}", other),
        }
        match &proc.get(then_assign).kind {
            NodeKind::Assign { rhs: Expr::Binary { lhs, .. }, .. } => assert_eq!(var_of(lhs), x1),
            other => panic!("unexpected: {:?}", other),
        }
        match &proc.get(else_assign).kind {
            NodeKind::Assign { rhs: Expr::Binary { lhs, .. }, .. } => assert_eq!(var_of(lhs), x1),
            other => panic!("unexpected: {:?}", other),
        }

        let (phi_lhs, args) = match &proc.get(join).kind {
            NodeKind::Label { phis, .. } => {
                assert_eq!(phis.len(), 1, "expected exactly one phi at the join point");
                assert_eq!(phis[0].original, x);
                (phis[0].lhs, phis[0].args.clone())
            }
            other => panic!("expected join label, got {:?}", other),
        };
        assert_eq!(args.len(), 2);
        assert!(args.iter().any(|a| a.pred == j1));
        assert!(args.iter().any(|a| a.pred == else_assign));

        match &proc.get(join_assign).kind {
            NodeKind::Assign { rhs, .. } => assert_eq!(var_of(rhs), phi_lhs),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
