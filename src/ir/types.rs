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

/// Closed set of basic kinds a value can hold. `Void` only appears as a
/// procedure's return type; every other kind can be the basic-kind of a
/// variable, constant, or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Void,
    F32,
    F64,
    S8,
    S16,
    S32,
    S64,
    U8,
    U16,
    U32,
    U64,
    V2F64,
    V4F32,
    V2S64,
    V4S32,
    V8S16,
    V16S8,
}

impl BasicKind {
    pub fn is_signed_int(self) -> bool {
        matches!(self, BasicKind::S8 | BasicKind::S16 | BasicKind::S32 | BasicKind::S64)
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(self, BasicKind::U8 | BasicKind::U16 | BasicKind::U32 | BasicKind::U64)
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub fn is_float(self) -> bool {
        matches!(self, BasicKind::F32 | BasicKind::F64)
    }

    pub fn is_vector(self) -> bool {
        matches!(
            self,
            BasicKind::V2F64
                | BasicKind::V4F32
                | BasicKind::V2S64
                | BasicKind::V4S32
                | BasicKind::V8S16
                | BasicKind::V16S8
        )
    }

    /// Width in bytes of the scalar/vector, used for sub-register selection
    /// and for two's-complement folding.
    pub fn width(self) -> u32 {
        match self {
            BasicKind::Void => 0,
            BasicKind::S8 | BasicKind::U8 => 1,
            BasicKind::S16 | BasicKind::U16 => 2,
            BasicKind::S32 | BasicKind::U32 | BasicKind::F32 => 4,
            BasicKind::S64 | BasicKind::U64 | BasicKind::F64 => 8,
            BasicKind::V2F64 | BasicKind::V4F32 | BasicKind::V2S64 | BasicKind::V4S32 => 16,
            BasicKind::V8S16 => 16,
            BasicKind::V16S8 => 16,
        }
    }

    /// Relative rank in the general numeric promotion table: vector > float
    /// > wider-int > narrower-int.
    fn rank(self) -> u32 {
        if self.is_vector() {
            300
        } else if self.is_float() {
            200 + self.width()
        } else {
            100 + self.width()
        }
    }
}

/// A type is a basic-kind paired with an indirection level. `level > 0`
/// denotes a pointer at any level; pointers are always 64-bit regardless of
/// pointee.
#[derive(Debug, Clone, Copy, Eq, Hash)]
pub struct Type {
    pub basic: BasicKind,
    pub level: u32,
}

impl PartialEq for Type {
    /// Two types are equal iff basic-kinds match and both are level 0, or
    /// both have level > 0 (the pointee's basic-kind is otherwise ignored
    /// for equality, matching the source language's weak pointer typing).
    fn eq(&self, other: &Self) -> bool {
        if self.level > 0 && other.level > 0 {
            return true;
        }
        self.level == 0 && other.level == 0 && self.basic == other.basic
    }
}

impl Type {
    pub fn scalar(basic: BasicKind) -> Self {
        Type { basic, level: 0 }
    }

    pub fn pointer_to(basic: BasicKind) -> Self {
        Type { basic, level: 1 }
    }

    pub fn is_pointer(self) -> bool {
        self.level > 0
    }

    pub fn is_signed(self) -> bool {
        !self.is_pointer() && self.basic.is_signed_int()
    }

    pub fn is_integer(self) -> bool {
        !self.is_pointer() && self.basic.is_integer()
    }

    pub fn is_float(self) -> bool {
        !self.is_pointer() && self.basic.is_float()
    }

    pub fn is_vector(self) -> bool {
        !self.is_pointer() && self.basic.is_vector()
    }

    /// Width in bytes used for operand rendering; pointers are always
    /// 64-bit regardless of pointee width.
    pub fn width(self) -> u32 {
        if self.is_pointer() { 8 } else { self.basic.width() }
    }

    fn rank(self) -> u32 {
        if self.is_pointer() { 1000 } else { self.basic.rank() }
    }

    /// General numeric promotion used by arithmetic operators: the wider
    /// type wins, preferring the left operand on ties.
    pub fn promote_arith(lhs: Type, rhs: Type) -> Type {
        if rhs.rank() > lhs.rank() { rhs } else { lhs }
    }

    /// Shift/bitwise operators require two integer operands and yield the
    /// wider integer type.
    pub fn promote_int(lhs: Type, rhs: Type) -> Option<Type> {
        if !lhs.is_integer() || !rhs.is_integer() {
            return None;
        }
        Some(if rhs.width() > lhs.width() { rhs } else { lhs })
    }

    pub const VOID: Type = Type { basic: BasicKind::Void, level: 0 };
    pub const S32: Type = Type { basic: BasicKind::S32, level: 0 };
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.basic {
            BasicKind::Void => "void",
            BasicKind::F32 => "f32",
            BasicKind::F64 => "f64",
            BasicKind::S8 => "s8",
            BasicKind::S16 => "s16",
            BasicKind::S32 => "s32",
            BasicKind::S64 => "s64",
            BasicKind::U8 => "u8",
            BasicKind::U16 => "u16",
            BasicKind::U32 => "u32",
            BasicKind::U64 => "u64",
            BasicKind::V2F64 => "v2f64",
            BasicKind::V4F32 => "v4f32",
            BasicKind::V2S64 => "v2s64",
            BasicKind::V4S32 => "v4s32",
            BasicKind::V8S16 => "v8s16",
            BasicKind::V16S8 => "v16s8",
        };
        for _ in 0..self.level {
            write!(f, "*")?;
        }
        write!(f, "{}", name)
    }
}
