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

use crate::ir::expr::Expr;
use crate::ir::graph::NodeId;
use crate::ir::phi::Phi;
use crate::ir::var::VarId;

/// The base of the doubly linked IR list. Variants per `spec.md` §3.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Assign {
        lhs: VarId,
        rhs: Expr,
    },
    /// Unconditional when `cond` is `None`; taken iff `cond` is truthy
    /// otherwise. `target` names the label node this jump targets.
    Jump {
        target: NodeId,
        cond: Option<Expr>,
    },
    Label {
        name: String,
        defined: bool,
        /// Exact set of jumps (conditional and unconditional) whose target
        /// is this label. A fallthrough predecessor also counts but is not
        /// listed here.
        jumps: Vec<NodeId>,
        phis: Vec<Phi>,
    },
    /// Introduced only during φ-elimination (C8).
    Swap {
        a: VarId,
        b: VarId,
    },
}

impl NodeKind {
    pub fn is_unconditional_jump(&self) -> bool {
        matches!(self, NodeKind::Jump { cond: None, .. })
    }

    pub fn is_label(&self) -> bool {
        matches!(self, NodeKind::Label { .. })
    }

    pub fn as_label(&self) -> Option<(&str, &[NodeId], &[Phi])> {
        match self {
            NodeKind::Label { name, jumps, phis, .. } => Some((name.as_str(), jumps, phis)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
}
