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

use crate::ir::node::{Node, NodeKind};
use crate::ir::types::Type;
use crate::ir::var::{VarId, Variable};

/// Index into a procedure's node arena. Neighbors are stored as indices, not
/// owning pointers, so the cyclic label→jumps and φ-arg→predecessor
/// references the source graph needs don't require `Rc`/`RefCell` cycles
/// (`spec.md` §9, "Cyclic IR graph").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// One procedure body: a doubly linked list of IR nodes plus the variable
/// arena and the monotonic counters `spec.md` §5 requires to be
/// per-procedure for deterministic output.
pub struct Procedure {
    pub name: String,
    nodes: Vec<Option<Node>>,
    pub head: Option<NodeId>,
    pub tail: Option<NodeId>,
    pub vars: Vec<Variable>,
    pub args: Vec<VarId>,
    pub return_var: Option<VarId>,
    pub done_label: NodeId,
    label_serial: u32,
    temp_serial: u32,
    memreg_serial: u32,
}

impl Procedure {
    pub fn new(name: impl Into<String>) -> Self {
        Procedure {
            name: name.into(),
            nodes: Vec::new(),
            head: None,
            tail: None,
            vars: Vec::new(),
            args: Vec::new(),
            return_var: None,
            done_label: NodeId(0),
            label_serial: 0,
            temp_serial: 0,
            memreg_serial: 0,
        }
    }

    /// Appends the procedure's dedicated "done" label, per `spec.md` §6
    /// ("The procedure terminates with a dedicated 'done' label that every
    /// `return` jumps to"). Called once, after the parser has emitted the
    /// procedure body.
    pub fn append_done_label(&mut self) -> NodeId {
        let done_name = self.fresh_label_name();
        let done_label = self.push_back(NodeKind::Label {
            name: done_name,
            defined: true,
            jumps: Vec::new(),
            phis: Vec::new(),
        });
        self.done_label = done_label;
        done_label
    }

    // ---- variables ----

    pub fn alloc_var(&mut self, var: Variable) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0 as usize]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0 as usize]
    }

    /// Creates a fresh renamed variant `base.N` of `original`, sharing its
    /// type but none of its analysis slots (`spec.md` §3, "Lifecycles").
    pub fn next_variant(&mut self, original: VarId) -> VarId {
        let ty = self.var(original).ty;
        let version = self.var(original).version_counter.get() + 1;
        self.var(original).version_counter.set(version);
        self.alloc_var(Variable::variant(original, version, ty))
    }

    pub fn fresh_temp(&mut self, ty: Type) -> VarId {
        let n = self.temp_serial;
        self.temp_serial += 1;
        self.alloc_var(Variable::new(format!("T.{}", n), ty))
    }

    pub fn fresh_label_name(&mut self) -> String {
        let n = self.label_serial;
        self.label_serial += 1;
        format!("L.{}", n)
    }

    pub fn fresh_memreg_serial(&mut self) -> u32 {
        let n = self.memreg_serial;
        self.memreg_serial += 1;
        n
    }

    // ---- node arena ----

    pub fn get(&self, id: NodeId) -> &Node {
        self.nodes[id.0 as usize]
            .as_ref()
            .expect("access to a removed IR node")
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0 as usize]
            .as_mut()
            .expect("access to a removed IR node")
    }

    pub fn try_get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(|n| n.as_ref())
    }

    fn alloc_node(&mut self, kind: NodeKind, prev: Option<NodeId>, next: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node { kind, prev, next }));
        id
    }

    pub fn push_back(&mut self, kind: NodeKind) -> NodeId {
        let id = self.alloc_node(kind, self.tail, None);
        if let Some(tail) = self.tail {
            self.get_mut(tail).next = Some(id);
        } else {
            self.head = Some(id);
        }
        self.tail = Some(id);
        id
    }

    /// Inserts a new node immediately before `at`, returning its id.
    pub fn insert_before(&mut self, at: NodeId, kind: NodeKind) -> NodeId {
        let prev = self.get(at).prev;
        let id = self.alloc_node(kind, prev, Some(at));
        match prev {
            Some(p) => self.get_mut(p).next = Some(id),
            None => self.head = Some(id),
        }
        self.get_mut(at).prev = Some(id);
        id
    }

    /// Inserts a new node immediately after `at`, returning its id.
    pub fn insert_after(&mut self, at: NodeId, kind: NodeKind) -> NodeId {
        let next = self.get(at).next;
        let id = self.alloc_node(kind, Some(at), next);
        match next {
            Some(n) => self.get_mut(n).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.get_mut(at).next = Some(id);
        id
    }

    /// Removes a node from the linear list, relinking its neighbors.
    /// Tombstones the slot rather than compacting so every other `NodeId`
    /// issued so far stays valid.
    pub fn remove(&mut self, id: NodeId) {
        let (prev, next) = {
            let node = self.get(id);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.get_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.get_mut(n).prev = prev,
            None => self.tail = prev,
        }
        self.nodes[id.0 as usize] = None;
    }

    /// Walks the linear list head-to-tail in source order.
    pub fn iter_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            let id = cur?;
            cur = self.get(id).next;
            Some(id)
        })
    }

    pub fn iter_ids_rev(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.tail;
        std::iter::from_fn(move || {
            let id = cur?;
            cur = self.get(id).prev;
            Some(id)
        })
    }

    /// `successor()` per `spec.md` §3: a jump's successor is its target
    /// plus the immediate next node when the jump is conditional; every
    /// other node's successor is simply the next linear node.
    pub fn successor(&self, id: NodeId) -> Vec<NodeId> {
        match &self.get(id).kind {
            NodeKind::Jump { target, cond } => {
                let mut out = vec![*target];
                if cond.is_some() {
                    if let Some(next) = self.get(id).next {
                        out.push(next);
                    }
                }
                out
            }
            _ => self.get(id).next.into_iter().collect(),
        }
    }

    /// `predecessor()` per `spec.md` §3: a label's predecessor is the
    /// falling-through previous node (if it is not an unconditional jump)
    /// union all entries in its `jumps` list; every other node's
    /// predecessor is just the previous linear node, unless that previous
    /// node is an unconditional jump (control never falls through one).
    pub fn predecessor(&self, id: NodeId) -> Vec<NodeId> {
        let node = self.get(id);
        match &node.kind {
            NodeKind::Label { jumps, .. } => {
                let mut out = Vec::with_capacity(jumps.len() + 1);
                if let Some(prev) = node.prev {
                    if !self.get(prev).kind.is_unconditional_jump() {
                        out.push(prev);
                    }
                }
                out.extend(jumps.iter().copied());
                out
            }
            _ => match node.prev {
                Some(prev) if !self.get(prev).kind.is_unconditional_jump() => vec![prev],
                _ => Vec::new(),
            },
        }
    }

    pub fn entry(&self) -> NodeId {
        self.head.expect("procedure must have at least the done label")
    }
}
