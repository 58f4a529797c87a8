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

use std::cell::{Cell, RefCell};

use crate::ir::expr::Expr;
use crate::ir::types::Type;
use crate::regs::PhysReg;

/// Storage-class flags carried on a variable declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageClass {
    pub is_static: bool,
    pub is_extern: bool,
}

/// Index into a procedure's variable arena. Cheap to copy, used everywhere
/// in place of an owning reference so the IR graph stays free of cycles of
/// `Rc`/`RefCell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// A source-level or compiler-introduced variable. Versioned variants
/// created during renaming (`base.N`) share the original's type but not its
/// analysis slots — each variant gets a fresh `Variable` of its own in the
/// arena.
#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    pub init: Option<Expr>,
    pub storage: StorageClass,

    /// The variable this one is a renamed variant of, if any (`None` for
    /// originals and for temporaries introduced by C3).
    pub variant_of: Option<VarId>,

    /// Bump counter used by `next_variant` during C5 renaming. Only ever
    /// touched on the *original* variable's slot.
    pub version_counter: Cell<u32>,
    /// Renaming stack of current variant ids, live only during C5's
    /// dominator-tree walk.
    pub rename_stack: RefCell<Vec<VarId>>,

    /// Liveness marker, scoped to C6.
    pub live_marker: Cell<bool>,
    /// Interference set, scoped to C7 (populated before coloring runs).
    pub interferes_with: RefCell<Vec<VarId>>,
    /// Physical register assigned by C7, consumed by C8/C9.
    pub assigned_reg: Cell<Option<PhysReg>>,
    /// Presence flag used during coloring's reverse walk.
    pub present: Cell<bool>,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Variable {
            name: name.into(),
            ty,
            init: None,
            storage: StorageClass::default(),
            variant_of: None,
            version_counter: Cell::new(0),
            rename_stack: RefCell::new(Vec::new()),
            live_marker: Cell::new(false),
            interferes_with: RefCell::new(Vec::new()),
            assigned_reg: Cell::new(None),
            present: Cell::new(false),
        }
    }

    pub fn variant(original: VarId, version: u32, ty: Type) -> Self {
        let mut v = Variable::new(String::new(), ty);
        v.variant_of = Some(original);
        v.name = format!("var{}.{}", original.0, version);
        v
    }
}
