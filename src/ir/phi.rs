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

use crate::ir::graph::NodeId;
use crate::ir::var::VarId;

/// One predecessor-edge argument of a φ function: the SSA version live on
/// that edge, paired with the predecessor node it comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhiArg {
    pub src: VarId,
    pub pred: NodeId,
}

/// Owned by a label. `original` is the pre-SSA variable being renamed;
/// `lhs` is the versioned variant assigned to this label entry. The count
/// and order of `args` equals the predecessor count at the moment renaming
/// visited this label (`spec.md` §3, "Phi function").
#[derive(Debug, Clone)]
pub struct Phi {
    pub original: VarId,
    pub lhs: VarId,
    pub args: Vec<PhiArg>,
}

impl Phi {
    pub fn new(original: VarId, lhs: VarId) -> Self {
        Phi { original, lhs, args: Vec::new() }
    }
}
