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

pub mod expr;
pub mod graph;
pub mod node;
pub mod phi;
pub mod types;
pub mod var;

pub use expr::{BinOp, Constant, Expr, UnOp, Value};
pub use graph::{NodeId, Procedure};
pub use node::{Node, NodeKind};
pub use phi::{Phi, PhiArg};
pub use types::{BasicKind, Type};
pub use var::{StorageClass, VarId, Variable};
