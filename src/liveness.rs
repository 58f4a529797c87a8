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

//! Backward liveness (C6): a worklist fixed-point over the linear IR,
//! φ-aware at labels. `live`/`mark` are side tables scoped to this stage,
//! per `spec.md` §5's resource-discipline note.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::ir::graph::{NodeId, Procedure};
use crate::ir::node::NodeKind;
use crate::ir::var::VarId;

/// Liveness result: for each node, the set of variables live immediately
/// *before* it executes.
pub struct Liveness {
    pub live: HashMap<NodeId, HashSet<VarId>>,
}

impl Liveness {
    pub fn live_before(&self, node: NodeId) -> HashSet<VarId> {
        self.live.get(&node).cloned().unwrap_or_default()
    }
}

fn merge_into(live: &mut HashMap<NodeId, HashSet<VarId>>, id: NodeId, info: &HashSet<VarId>) {
    live.entry(id).or_default().extend(info.iter().copied());
}

/// Runs the backward worklist to a fixed point, starting from `(tail, ∅)`.
#[tracing::instrument(skip(proc))]
pub fn compute(proc: &Procedure) -> Liveness {
    let mut live: HashMap<NodeId, HashSet<VarId>> = HashMap::new();
    let mut mark: HashMap<NodeId, bool> = HashMap::new();
    let mut queue: Vec<(NodeId, HashSet<VarId>)> = Vec::new();

    let tail = proc.tail.expect("procedure must have at least one node");
    queue.push((tail, HashSet::new()));

    while let Some((id, info)) = queue.pop() {
        match &proc.get(id).kind {
            NodeKind::Label { phis, .. } => {
                let mut info = info;
                for phi in phis {
                    info.remove(&phi.lhs);
                }
                merge_into(&mut live, id, &info);

                let mut covered: HashSet<NodeId> = HashSet::new();
                for phi in phis {
                    for arg in &phi.args {
                        covered.insert(arg.pred);
                        let mut augmented = info.clone();
                        augmented.insert(arg.src);
                        queue.push((arg.pred, augmented));
                    }
                }
                for pred in proc.predecessor(id) {
                    if !covered.contains(&pred) {
                        queue.push((pred, info.clone()));
                    }
                }
            }
            kind => {
                let mut next_info = info.clone();
                let lhs = match kind {
                    NodeKind::Assign { lhs, rhs } => {
                        rhs.used_vars(&mut next_info);
                        Some(*lhs)
                    }
                    NodeKind::Jump { cond: Some(cond), .. } => {
                        cond.used_vars(&mut next_info);
                        None
                    }
                    _ => None,
                };
                if let Some(lhs) = lhs {
                    next_info.remove(&lhs);
                }

                let current = live.get(&id).cloned().unwrap_or_default();
                let grew = !next_info.is_subset(&current);
                let already_marked = *mark.get(&id).unwrap_or(&false);

                if grew {
                    merge_into(&mut live, id, &next_info);
                    mark.insert(id, true);
                    trace!(node = id.0, "live set grew, requeuing predecessors");
                    for pred in proc.predecessor(id) {
                        queue.push((pred, next_info.clone()));
                    }
                } else if !already_marked {
                    mark.insert(id, true);
                    for pred in proc.predecessor(id) {
                        queue.push((pred, next_info.clone()));
                    }
                }
            }
        }
    }

    Liveness { live }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dominators;
    use crate::ir::expr::{BinOp, Constant, Expr};
    use crate::ir::types::{BasicKind, Type};
    use crate::ir::var::Variable;
    use crate::phi_placement;

    fn label(name: &str) -> NodeKind {
        NodeKind::Label { name: name.to_string(), defined: true, jumps: Vec::new(), phis: Vec::new() }
    }

    fn register_jump(proc: &mut Procedure, jump_id: NodeId, target: NodeId) {
        if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(target).kind {
            jumps.push(jump_id);
        }
    }

    /// Builds and SSA-renames the same diamond used by `phi_placement`'s
    /// tests, returning every node id liveness assertions need.
    fn renamed_diamond() -> (Procedure, NodeId, NodeId, NodeId, NodeId, NodeId) {
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
        phi_placement::run(&mut proc, &dom).unwrap();

        (proc, entry_assign, jc, then_assign, else_assign, join_assign)
    }

    #[test]
    fn phi_lhs_is_not_live_across_the_join_label() {
        let (proc, _entry_assign, _jc, _then_assign, _else_assign, join_assign) = renamed_diamond();
        let join = proc.get(join_assign).prev.unwrap();
        let live = compute(&proc);

        assert!(live.live_before(join).is_empty(), "phi lhs must be killed, not live-in, at the join label");
    }

    #[test]
    fn each_diamond_arm_sees_only_its_own_predecessor_variant() {
        let (proc, entry_assign, jc, then_assign, else_assign, join_assign) = renamed_diamond();
        let live = compute(&proc);

        let x1 = match &proc.get(entry_assign).kind {
            NodeKind::Assign { lhs, .. } => *lhs,
            _ => unreachable!(),
        };

        assert_eq!(live.live_before(jc), HashSet::from([x1]));
        assert_eq!(live.live_before(then_assign), HashSet::from([x1]));
        assert_eq!(live.live_before(else_assign), HashSet::from([x1]));
        assert!(live.live_before(entry_assign).is_empty(), "x's first def has no prior use to keep alive");

        let phi_lhs = match &proc.get(join_assign).kind {
            NodeKind::Assign { rhs, .. } => match rhs {
                Expr::Var(id, _) => *id,
                other => panic!("unexpected: {:?}", other),
            },
            _ => unreachable!(),
        };
        assert_eq!(live.live_before(join_assign), HashSet::from([phi_lhs]));
    }
}
