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

//! Control-flow cleanup (C2): three idempotent passes over the linear IR.
//! Sequence is label-merge -> jump-peephole -> label-merge -> dead-code-strip.

use tracing::trace;

use crate::errors::Result;
use crate::ir::expr::{Expr, UnOp};
use crate::ir::graph::{NodeId, Procedure};
use crate::ir::node::NodeKind;

#[tracing::instrument(skip(proc))]
pub fn run(proc: &mut Procedure) -> Result<()> {
    label_merge(proc)?;
    jump_peephole(proc)?;
    label_merge(proc)?;
    dead_code_strip(proc)?;
    Ok(())
}

/// Removes `jump_id` from its current target's `jumps` list. Must be called
/// before deleting or retargeting a jump node — `Procedure::remove` only
/// relinks the linear list, it knows nothing about label back-references.
fn detach_jump(proc: &mut Procedure, jump_id: NodeId) {
    let target = match &proc.get(jump_id).kind {
        NodeKind::Jump { target, .. } => *target,
        _ => return,
    };
    if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(target).kind {
        jumps.retain(|j| *j != jump_id);
    }
}

fn retarget(proc: &mut Procedure, jump_id: NodeId, old_target: NodeId, new_target: NodeId) {
    detach_jump(proc, jump_id);
    if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(new_target).kind {
        jumps.push(jump_id);
    }
    if let NodeKind::Jump { target, .. } = &mut proc.get_mut(jump_id).kind {
        *target = new_target;
    }
    let _ = old_target;
}

fn negate_condition(cond: Expr) -> Expr {
    Expr::unary(UnOp::Not, cond, 0, 0)
        .expect("logical not of a well-typed condition never fails to type-check")
        .simplify()
}

/// Merges adjacent labels (retargeting the dropped label's jumps onto the
/// one kept) and deletes labels with neither an incoming jump nor a
/// fallthrough predecessor. Repeats to a fixed point since a merge or
/// deletion can make a further label adjacent or unreachable.
pub fn label_merge(proc: &mut Procedure) -> Result<()> {
    loop {
        let mut changed = false;
        let ids: Vec<NodeId> = proc.iter_ids().collect();
        for id in ids {
            if proc.try_get(id).is_none() {
                continue;
            }
            if !proc.get(id).kind.is_label() {
                continue;
            }

            if let Some(next_id) = proc.get(id).next {
                let next_is_label = proc.try_get(next_id).map(|n| n.kind.is_label()).unwrap_or(false);
                if next_is_label {
                    merge_adjacent(proc, id, next_id);
                    trace!(keep = id.0, dropped = next_id.0, "merged adjacent labels");
                    changed = true;
                    continue;
                }
            }

            if Some(id) != proc.head && proc.predecessor(id).is_empty() {
                proc.remove(id);
                trace!(label = id.0, "removed unreachable label");
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    Ok(())
}

fn merge_adjacent(proc: &mut Procedure, keep: NodeId, drop: NodeId) {
    let drop_jumps = match &proc.get(drop).kind {
        NodeKind::Label { jumps, .. } => jumps.clone(),
        _ => unreachable!("merge_adjacent called on a non-label node"),
    };
    for jid in &drop_jumps {
        if let NodeKind::Jump { target, .. } = &mut proc.get_mut(*jid).kind {
            *target = keep;
        }
    }
    if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(keep).kind {
        jumps.extend(drop_jumps);
    }
    proc.remove(drop);
}

/// Folds `[jump-if-C L1; jump L2; label L1]` into `[jump-if-¬C L2; label
/// L1]`, retargets a jump through a label whose next statement is an
/// unconditional jump to its ultimate target, and deletes a jump whose
/// target is the statement immediately following it.
pub fn jump_peephole(proc: &mut Procedure) -> Result<()> {
    loop {
        let mut changed = false;
        let ids: Vec<NodeId> = proc.iter_ids().collect();
        for id in ids {
            if proc.try_get(id).is_none() {
                continue;
            }
            let is_jump = matches!(proc.get(id).kind, NodeKind::Jump { .. });
            if !is_jump {
                continue;
            }
            let target = match &proc.get(id).kind {
                NodeKind::Jump { target, .. } => *target,
                _ => unreachable!(),
            };
            let cond = match &proc.get(id).kind {
                NodeKind::Jump { cond, .. } => cond.clone(),
                _ => unreachable!(),
            };

            if let Some(cond) = cond {
                if let Some(next_id) = proc.get(id).next {
                    let next_is_plain_jump = proc
                        .try_get(next_id)
                        .map(|n| matches!(n.kind, NodeKind::Jump { cond: None, .. }))
                        .unwrap_or(false);
                    if next_is_plain_jump {
                        let l2 = match &proc.get(next_id).kind {
                            NodeKind::Jump { target, .. } => *target,
                            _ => unreachable!(),
                        };
                        let after_next = proc.get(next_id).next;
                        if Some(target) == after_next {
                            let negated = negate_condition(cond);
                            detach_jump(proc, next_id);
                            proc.remove(next_id);
                            retarget(proc, id, target, l2);
                            if let NodeKind::Jump { cond: c, .. } = &mut proc.get_mut(id).kind {
                                *c = Some(negated);
                            }
                            trace!(jump = id.0, "folded jump-around-jump");
                            changed = true;
                            continue;
                        }
                    }
                }
            }

            let target_next = proc.get(target).next;
            if let Some(label_next) = target_next {
                let is_plain_jump = proc
                    .try_get(label_next)
                    .map(|n| matches!(n.kind, NodeKind::Jump { cond: None, .. }))
                    .unwrap_or(false);
                if is_plain_jump {
                    let ultimate = match &proc.get(label_next).kind {
                        NodeKind::Jump { target, .. } => *target,
                        _ => unreachable!(),
                    };
                    if ultimate != target {
                        retarget(proc, id, target, ultimate);
                        trace!(jump = id.0, via = target.0, to = ultimate.0, "retargeted through trivial jump");
                        changed = true;
                        continue;
                    }
                }
            }

            if Some(target) == proc.get(id).next {
                detach_jump(proc, id);
                proc.remove(id);
                trace!(jump = id.0, "removed jump to immediately following label");
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    Ok(())
}

/// Removes every statement between an unconditional jump and the next
/// label; control can never reach them.
pub fn dead_code_strip(proc: &mut Procedure) -> Result<()> {
    let ids: Vec<NodeId> = proc.iter_ids().collect();
    let mut in_dead_zone = false;
    for id in ids {
        let Some(node) = proc.try_get(id) else { continue };
        let is_label = node.kind.is_label();
        let is_jump_node = matches!(node.kind, NodeKind::Jump { .. });
        let is_uncond_jump = node.kind.is_unconditional_jump();

        if is_label {
            in_dead_zone = false;
            continue;
        }
        if in_dead_zone {
            if is_jump_node {
                detach_jump(proc, id);
            }
            proc.remove(id);
            trace!(node = id.0, "stripped dead code");
            continue;
        }
        if is_uncond_jump {
            in_dead_zone = true;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::{BinOp, Constant};
    use crate::ir::types::{BasicKind, Type};
    use crate::ir::var::VarId;

    fn label(name: &str) -> NodeKind {
        NodeKind::Label { name: name.to_string(), defined: true, jumps: Vec::new(), phis: Vec::new() }
    }

    fn register_jump(proc: &mut Procedure, jump_id: NodeId, target: NodeId) {
        if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(target).kind {
            jumps.push(jump_id);
        }
    }

    #[test]
    fn adjacent_labels_merge_and_retarget_jumps() {
        let mut proc = Procedure::new("p");
        let l1 = proc.push_back(label("L1"));
        let l2 = proc.push_back(label("L2"));
        let jump = proc.insert_before(l1, NodeKind::Jump { target: l2, cond: None });
        register_jump(&mut proc, jump, l2);

        label_merge(&mut proc).unwrap();

        assert!(proc.try_get(l2).is_none());
        match &proc.get(jump).kind {
            NodeKind::Jump { target, .. } => assert_eq!(*target, l1),
            _ => panic!("expected jump"),
        }
        match &proc.get(l1).kind {
            NodeKind::Label { jumps, .. } => assert_eq!(jumps, &[jump]),
            _ => panic!("expected label"),
        }
    }

    #[test]
    fn unreachable_label_is_removed() {
        let mut proc = Procedure::new("p");
        let done = proc.push_back(label("done"));
        let jump_over = proc.insert_before(done, NodeKind::Jump { target: done, cond: None });
        register_jump(&mut proc, jump_over, done);
        let dead = proc.insert_before(done, label("dead"));

        label_merge(&mut proc).unwrap();

        assert!(proc.try_get(dead).is_none());
    }

    #[test]
    fn jump_around_jump_folds_to_negated_jump() {
        let mut proc = Procedure::new("p");
        let l2 = proc.push_back(label("L2"));
        let l1 = proc.push_back(label("L1"));
        let cond = Expr::Binary {
            op: BinOp::Lt,
            lhs: Box::new(Expr::Var(VarId(0), Type::scalar(BasicKind::S32))),
            rhs: Box::new(Expr::Const(Constant::int(0, Type::scalar(BasicKind::S32)))),
            ty: Type::S32,
        };
        let jmp1 = proc.insert_before(l1, NodeKind::Jump { target: l2, cond: None });
        register_jump(&mut proc, jmp1, l2);
        let jmp0 = proc.insert_before(jmp1, NodeKind::Jump { target: l1, cond: Some(cond) });
        register_jump(&mut proc, jmp0, l1);

        jump_peephole(&mut proc).unwrap();

        assert!(proc.try_get(jmp1).is_none());
        match &proc.get(jmp0).kind {
            NodeKind::Jump { target, cond: Some(Expr::Binary { op, .. }) } => {
                assert_eq!(*target, l2);
                assert_eq!(*op, BinOp::Ge);
            }
            other => panic!("expected negated jump to L2, got {:?}", other),
        }
        match &proc.get(l1).kind {
            NodeKind::Label { jumps, .. } => assert!(jumps.is_empty()),
            _ => panic!("expected label"),
        }
        match &proc.get(l2).kind {
            NodeKind::Label { jumps, .. } => assert_eq!(jumps, &[jmp0]),
            _ => panic!("expected label"),
        }
    }

    #[test]
    fn jump_to_immediately_following_label_is_deleted() {
        let mut proc = Procedure::new("p");
        let l = proc.push_back(label("L"));
        let jump = proc.insert_before(l, NodeKind::Jump { target: l, cond: None });
        register_jump(&mut proc, jump, l);

        jump_peephole(&mut proc).unwrap();

        assert!(proc.try_get(jump).is_none());
        match &proc.get(l).kind {
            NodeKind::Label { jumps, .. } => assert!(jumps.is_empty()),
            _ => panic!("expected label"),
        }
    }

    #[test]
    fn dead_code_between_unconditional_jump_and_label_is_stripped() {
        let mut proc = Procedure::new("p");
        let done = proc.push_back(label("done"));
        let jump = proc.insert_before(done, NodeKind::Jump { target: done, cond: None });
        register_jump(&mut proc, jump, done);
        let v = proc.alloc_var(crate::ir::var::Variable::new("x", Type::scalar(BasicKind::S32)));
        let dead_assign = proc.insert_before(
            done,
            NodeKind::Assign { lhs: v, rhs: Expr::Const(Constant::int(1, Type::scalar(BasicKind::S32))) },
        );

        dead_code_strip(&mut proc).unwrap();

        assert!(proc.try_get(dead_assign).is_none());
        assert_eq!(proc.get(jump).next, Some(done));
    }
}
