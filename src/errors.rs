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

use thiserror::Error;

/// The three-member error taxonomy exposed to the driver: parse errors and
/// type mismatches are user-facing and carry a source locus; internal
/// invariant violations indicate a compiler bug and are never recovered
/// from locally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Parse error at {line}:{col}: {message}")]
    Parse {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("Type mismatch at {line}:{col}: {message}")]
    TypeMismatch {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("internal invariant violated in {component} (case {case}): {message}")]
    InternalInvariant {
        component: &'static str,
        case: i32,
        message: String,
    },
}

impl CodegenError {
    pub fn invariant(component: &'static str, case: i32, message: impl Into<String>) -> Self {
        CodegenError::InternalInvariant {
            component,
            case,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodegenError>;
