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

pub mod errors;
pub mod ir;
pub mod regs;

pub mod cleanup;
pub mod dominators;
pub mod interference;
pub mod liveness;
pub mod phi_elim;
pub mod phi_placement;
pub mod pipeline;
pub mod ssa_expand;

pub mod front;
pub mod select;

pub use errors::{CodegenError, Result};
pub use pipeline::{compile_procedure, compile_source};
