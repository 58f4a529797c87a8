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

//! Interference graph construction and perfect-elimination-order coloring
//! (C7). The graph itself is a stage-local table; the coloring result
//! (`assigned_reg`) is written onto each `Variable`'s own slot since C8/C9
//! consume it long after this stage ends.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::dominators::Dominators;
use crate::errors::Result;
use crate::ir::graph::Procedure;
use crate::ir::node::NodeKind;
use crate::ir::var::VarId;
use crate::liveness::Liveness;
use crate::regs::{bank_for_type, MemReg, PhysReg};

/// Undirected interference edges, stored per variable as a set so
/// duplicates are suppressed (`spec.md` §4.7).
pub struct Interference {
    pub edges: HashMap<VarId, HashSet<VarId>>,
}

impl Interference {
    pub fn interferes(&self, a: VarId, b: VarId) -> bool {
        self.edges.get(&a).map(|s| s.contains(&b)).unwrap_or(false)
    }
}

#[tracing::instrument(skip(proc))]
pub fn run(proc: &mut Procedure, dom: &Dominators) -> Result<()> {
    let live = crate::liveness::compute(proc);
    let interference = build(proc, &live);
    color(proc, dom, &interference);
    Ok(())
}

/// Every pair of distinct variables simultaneously live before a node
/// becomes a mutual interference edge; also mirrored onto each variable's
/// own `interferes_with` slot, which `color` reads from.
pub fn build(proc: &Procedure, live: &Liveness) -> Interference {
    let mut edges: HashMap<VarId, HashSet<VarId>> = HashMap::new();
    for id in proc.iter_ids() {
        let vars: Vec<VarId> = live.live_before(id).into_iter().collect();
        for i in 0..vars.len() {
            for j in (i + 1)..vars.len() {
                let (a, b) = (vars[i], vars[j]);
                edges.entry(a).or_default().insert(b);
                edges.entry(b).or_default().insert(a);
            }
        }
    }

    for (&v, neighbors) in &edges {
        let mut slot = proc.var(v).interferes_with.borrow_mut();
        for &n in neighbors {
            if !slot.contains(&n) {
                slot.push(n);
            }
        }
    }

    Interference { edges }
}

/// Post-order walk of the dominator tree, collecting assignment and φ
/// left-hand sides in visitation order. This is the perfect elimination
/// order the graph admits (`spec.md` §4.7).
fn elimination_order(proc: &Procedure, dom: &Dominators) -> Vec<VarId> {
    let entry = proc.entry();
    let mut order: Vec<VarId> = Vec::new();
    let mut stack = vec![(entry, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            match &proc.get(id).kind {
                NodeKind::Assign { lhs, .. } => order.push(*lhs),
                NodeKind::Label { phis, .. } => {
                    for phi in phis {
                        order.push(phi.lhs);
                    }
                }
                _ => {}
            }
            continue;
        }
        stack.push((id, true));
        if let Some(kids) = dom.children.get(&id) {
            for &c in kids.iter().rev() {
                stack.push((c, false));
            }
        }
    }
    order
}

/// Walks the elimination order in reverse, assigning each variable the
/// lowest-indexed free register of its bank among already-processed
/// interfering neighbors, falling back to a fresh memory register.
pub fn color(proc: &mut Procedure, dom: &Dominators, _interference: &Interference) {
    let mut order = elimination_order(proc, dom);
    order.reverse();

    for v in order {
        if proc.var(v).present.get() {
            continue;
        }

        let bank = bank_for_type(proc.var(v).ty);
        let used: HashSet<PhysReg> = proc
            .var(v)
            .interferes_with
            .borrow()
            .iter()
            .filter(|&&n| proc.var(n).present.get())
            .filter_map(|&n| proc.var(n).assigned_reg.get())
            .collect();

        let chosen = bank.allocatable().into_iter().find(|r| !used.contains(r));
        let reg = match chosen {
            Some(r) => r,
            None => {
                let serial = proc.fresh_memreg_serial();
                trace!(var = v.0, serial, "register bank exhausted, spilling to memory");
                PhysReg::Mem(MemReg(serial))
            }
        };

        proc.var(v).assigned_reg.set(Some(reg));
        proc.var(v).present.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dominators;
    use crate::ir::expr::{BinOp, Constant, Expr};
    use crate::ir::types::{BasicKind, Type};
    use crate::ir::var::Variable;
    use crate::regs::IntReg;

    fn label(name: &str) -> NodeKind {
        NodeKind::Label { name: name.to_string(), defined: true, jumps: Vec::new(), phis: Vec::new() }
    }

    #[test]
    fn simultaneously_live_variables_interfere_and_get_distinct_registers() {
        let mut proc = Procedure::new("p");
        let s32 = Type::scalar(BasicKind::S32);
        let a = proc.alloc_var(Variable::new("a", s32));
        let b = proc.alloc_var(Variable::new("b", s32));
        let c = proc.alloc_var(Variable::new("c", s32));

        proc.push_back(label("entry"));
        proc.push_back(NodeKind::Assign { lhs: a, rhs: Expr::Const(Constant::int(1, s32)) });
        proc.push_back(NodeKind::Assign { lhs: b, rhs: Expr::Const(Constant::int(2, s32)) });
        proc.push_back(NodeKind::Assign {
            lhs: c,
            rhs: Expr::Binary { op: BinOp::Add, lhs: Box::new(Expr::Var(a, s32)), rhs: Box::new(Expr::Var(b, s32)), ty: s32 },
        });
        proc.append_done_label();

        let dom = dominators::compute(&proc);
        let live = crate::liveness::compute(&proc);
        let interference = build(&proc, &live);
        assert!(interference.interferes(a, b));
        assert!(!interference.interferes(a, c));

        color(&mut proc, &dom, &interference);

        let reg_a = proc.var(a).assigned_reg.get().expect("a colored");
        let reg_b = proc.var(b).assigned_reg.get().expect("b colored");
        assert_ne!(reg_a, reg_b, "interfering variables must not share a register");
        assert_ne!(reg_a, PhysReg::Int(IntReg::Rax));
        assert_ne!(reg_b, PhysReg::Int(IntReg::Rax));
    }

    #[test]
    fn register_bank_exhaustion_spills_to_a_memory_register() {
        let mut proc = Procedure::new("p");
        let s32 = Type::scalar(BasicKind::S32);
        proc.push_back(label("entry"));

        // 15 variables simultaneously live (via one big chained use) exceeds
        // the 14-register allocatable integer bank, forcing a spill.
        let vars: Vec<VarId> = (0..15).map(|i| proc.alloc_var(Variable::new(format!("v{i}"), s32))).collect();
        for &v in &vars {
            proc.push_back(NodeKind::Assign { lhs: v, rhs: Expr::Const(Constant::int(1, s32)) });
        }
        let mut sum = Expr::Var(vars[0], s32);
        for &v in &vars[1..] {
            sum = Expr::Binary { op: BinOp::Add, lhs: Box::new(sum), rhs: Box::new(Expr::Var(v, s32)), ty: s32 };
        }
        let result = proc.alloc_var(Variable::new("result", s32));
        proc.push_back(NodeKind::Assign { lhs: result, rhs: sum });
        proc.append_done_label();

        let dom = dominators::compute(&proc);
        let live = crate::liveness::compute(&proc);
        let interference = build(&proc, &live);
        color(&mut proc, &dom, &interference);

        assert!(
            vars.iter().any(|&v| proc.var(v).assigned_reg.get().map(|r| r.is_memory()).unwrap_or(false)),
            "expected at least one of the 15 simultaneously live variables to spill"
        );
    }
}
