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

//! Dominator construction (C4): Lengauer-Tarjan immediate dominators, the
//! dominator tree, and the dominance frontier. Every slot this stage needs
//! (`semi`, `d_label`, `ancestor`, `bucket`) lives in a local table here,
//! not on `Node` — the result handed to later stages is just `Dominators`.

use std::collections::HashMap;

use tracing::trace;

use crate::ir::graph::{NodeId, Procedure};

/// Output of dominator construction: immediate dominators, the dominator
/// tree (as parent-to-children adjacency), and each node's dominance
/// frontier.
pub struct Dominators {
    pub idom: HashMap<NodeId, Option<NodeId>>,
    pub children: HashMap<NodeId, Vec<NodeId>>,
    pub frontier: HashMap<NodeId, Vec<NodeId>>,
}

impl Dominators {
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(&node).copied().flatten()
    }

    pub fn dominance_frontier(&self, node: NodeId) -> &[NodeId] {
        self.frontier.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Path-compresses the ancestor chain from `v` up to (but not past) the
/// current root of its tree fragment, folding in the minimum-semi label
/// found along the way. Mirrors the textbook recursive `COMPRESS`.
fn compress(v: NodeId, ancestor: &mut HashMap<NodeId, Option<NodeId>>, label: &mut HashMap<NodeId, NodeId>, semi: &HashMap<NodeId, usize>) {
    let a = match ancestor[&v] {
        Some(a) => a,
        None => return,
    };
    if ancestor[&a].is_some() {
        compress(a, ancestor, label, semi);
        if semi[&label[&a]] < semi[&label[&v]] {
            let new_label = label[&a];
            label.insert(v, new_label);
        }
        let grandparent = ancestor[&a];
        ancestor.insert(v, grandparent);
    }
}

fn eval(v: NodeId, ancestor: &mut HashMap<NodeId, Option<NodeId>>, label: &mut HashMap<NodeId, NodeId>, semi: &HashMap<NodeId, usize>) -> NodeId {
    if ancestor[&v].is_none() {
        v
    } else {
        compress(v, ancestor, label, semi);
        label[&v]
    }
}

/// Computes dominators, the dominator tree, and dominance frontiers for
/// every node reachable from `proc`'s entry.
#[tracing::instrument(skip(proc))]
pub fn compute(proc: &Procedure) -> Dominators {
    let entry = proc.entry();

    // Depth-first preorder numbering via an explicit worklist, building the
    // reachable-subgraph predecessor list from successor edges as we go.
    let mut vertex: Vec<NodeId> = vec![entry];
    let mut number: HashMap<NodeId, usize> = HashMap::new();
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut pred: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    number.insert(entry, 0);

    let mut stack = vec![entry];
    while let Some(u) = stack.pop() {
        for s in proc.successor(u) {
            pred.entry(s).or_default().push(u);
            if !number.contains_key(&s) {
                number.insert(s, vertex.len());
                vertex.push(s);
                parent.insert(s, u);
                stack.push(s);
            }
        }
    }

    let n = vertex.len();
    let mut semi: HashMap<NodeId, usize> = number.clone();
    let mut label: HashMap<NodeId, NodeId> = vertex.iter().map(|&v| (v, v)).collect();
    let mut ancestor: HashMap<NodeId, Option<NodeId>> = vertex.iter().map(|&v| (v, None)).collect();
    let mut idom: HashMap<NodeId, NodeId> = HashMap::new();
    let mut bucket: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

    for i in (1..n).rev() {
        let w = vertex[i];
        for v in pred.get(&w).cloned().unwrap_or_default() {
            if !number.contains_key(&v) {
                continue;
            }
            let u = eval(v, &mut ancestor, &mut label, &semi);
            if semi[&u] < semi[&w] {
                semi.insert(w, semi[&u]);
            }
        }
        let semi_w_vertex = vertex[semi[&w]];
        bucket.entry(semi_w_vertex).or_default().push(w);

        let p = parent[&w];
        ancestor.insert(w, Some(p));

        if let Some(bucket_p) = bucket.remove(&p) {
            for v in bucket_p {
                let u = eval(v, &mut ancestor, &mut label, &semi);
                let idom_v = if semi[&u] < semi[&v] { u } else { p };
                idom.insert(v, idom_v);
            }
        }
    }

    for i in 1..n {
        let w = vertex[i];
        if idom[&w] != vertex[semi[&w]] {
            let fixed = idom[&idom[&w]];
            idom.insert(w, fixed);
        }
    }

    let mut idom_final: HashMap<NodeId, Option<NodeId>> = HashMap::new();
    idom_final.insert(entry, None);
    for i in 1..n {
        let w = vertex[i];
        idom_final.insert(w, Some(idom[&w]));
    }

    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for i in 1..n {
        let w = vertex[i];
        if let Some(d) = idom_final[&w] {
            children.entry(d).or_default().push(w);
        }
    }

    trace!(reachable = n, "computed immediate dominators");

    let frontier = compute_frontier(proc, &vertex, &idom_final, &children);
    Dominators { idom: idom_final, children, frontier }
}

/// Bottom-up over the dominator tree: DF(x) = {y in succ(x) : idom(y) != x}
/// union the frontiers of x's children, filtered the same way. Computed
/// over an explicit post-order instead of native recursion.
fn compute_frontier(
    proc: &Procedure,
    vertex: &[NodeId],
    idom: &HashMap<NodeId, Option<NodeId>>,
    children: &HashMap<NodeId, Vec<NodeId>>,
) -> HashMap<NodeId, Vec<NodeId>> {
    let entry = vertex[0];
    let mut post_order = Vec::with_capacity(vertex.len());
    let mut stack = vec![(entry, false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            post_order.push(node);
            continue;
        }
        stack.push((node, true));
        if let Some(kids) = children.get(&node) {
            for &c in kids {
                stack.push((c, false));
            }
        }
    }

    let mut df: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for &x in &post_order {
        let mut set: Vec<NodeId> = Vec::new();
        for y in proc.successor(x) {
            if idom.get(&y).copied().flatten() != Some(x) && !set.contains(&y) {
                set.push(y);
            }
        }
        if let Some(kids) = children.get(&x) {
            for &z in kids {
                for &y in df.get(&z).map(|v| v.as_slice()).unwrap_or(&[]) {
                    if idom.get(&y).copied().flatten() != Some(x) && !set.contains(&y) {
                        set.push(y);
                    }
                }
            }
        }
        df.insert(x, set);
    }
    df
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::{Constant, Expr};
    use crate::ir::node::NodeKind;
    use crate::ir::types::{BasicKind, Type};

    fn label(name: &str) -> NodeKind {
        NodeKind::Label { name: name.to_string(), defined: true, jumps: Vec::new(), phis: Vec::new() }
    }

    fn register_jump(proc: &mut Procedure, jump_id: NodeId, target: NodeId) {
        if let NodeKind::Label { jumps, .. } = &mut proc.get_mut(target).kind {
            jumps.push(jump_id);
        }
    }

    /// entry -> [jc: if cond goto ELSE else fallthrough THEN]
    /// THEN -> j1: goto JOIN
    /// ELSE -> (fallthrough) JOIN -> (fallthrough) done
    fn diamond() -> (Procedure, NodeId, NodeId, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut proc = Procedure::new("p");
        let entry = proc.push_back(label("entry"));
        let cond = Expr::Const(Constant::int(1, Type::scalar(BasicKind::S32)));
        let jc = proc.push_back(NodeKind::Jump { target: entry, cond: Some(cond) });
        let then_label = proc.push_back(label("THEN"));
        let j1 = proc.push_back(NodeKind::Jump { target: entry, cond: None });
        let else_label = proc.push_back(label("ELSE"));
        let join = proc.push_back(label("JOIN"));
        let done = proc.append_done_label();

        if let NodeKind::Jump { target, .. } = &mut proc.get_mut(jc).kind {
            *target = else_label;
        }
        register_jump(&mut proc, jc, else_label);
        if let NodeKind::Jump { target, .. } = &mut proc.get_mut(j1).kind {
            *target = join;
        }
        register_jump(&mut proc, j1, join);

        (proc, entry, jc, then_label, j1, else_label, join, done)
    }

    #[test]
    fn diamond_immediate_dominators() {
        let (proc, entry, jc, then_label, j1, else_label, join, done) = diamond();
        let dom = compute(&proc);

        assert_eq!(dom.immediate_dominator(entry), None);
        assert_eq!(dom.immediate_dominator(jc), Some(entry));
        assert_eq!(dom.immediate_dominator(then_label), Some(jc));
        assert_eq!(dom.immediate_dominator(j1), Some(then_label));
        assert_eq!(dom.immediate_dominator(else_label), Some(jc));
        assert_eq!(dom.immediate_dominator(join), Some(jc));
        assert_eq!(dom.immediate_dominator(done), Some(join));
    }

    #[test]
    fn diamond_dominance_frontier() {
        let (proc, _entry, jc, then_label, _j1, else_label, join, _done) = diamond();
        let dom = compute(&proc);

        assert_eq!(dom.dominance_frontier(then_label), &[join]);
        assert_eq!(dom.dominance_frontier(else_label), &[join]);
        assert!(dom.dominance_frontier(jc).is_empty());
    }

    #[test]
    fn diamond_dominator_tree_children() {
        let (proc, entry, jc, then_label, j1, else_label, join, done) = diamond();
        let dom = compute(&proc);

        let mut jc_children = dom.children.get(&jc).cloned().unwrap_or_default();
        jc_children.sort_by_key(|n| n.0);
        let mut expected = vec![then_label, else_label, join];
        expected.sort_by_key(|n| n.0);
        assert_eq!(jc_children, expected);

        assert_eq!(dom.children.get(&entry).cloned().unwrap_or_default(), vec![jc]);
        assert_eq!(dom.children.get(&then_label).cloned().unwrap_or_default(), vec![j1]);
        assert_eq!(dom.children.get(&join).cloned().unwrap_or_default(), vec![done]);
    }
}
