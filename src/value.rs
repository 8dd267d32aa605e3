// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! The tagged value model.
//!
//! On the wire and in the original runtime a value is a machine word:
//! an immediate integer shifted left one bit with the low bit set, or a
//! pointer into collector-managed memory with the low bit clear. Inside
//! the VM we keep the discrimination explicit instead of bit-stolen:
//! immediates, heap references, and resolved addresses (the product of
//! `LDA`) are separate variants, and the word encoding only exists at
//! the boundary helpers `Value::boxed` / `Value::unbox`.

use crate::vm::error::{Result, VmError};

/// Handle to an object in the [`Heap`](crate::heap::Heap) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(pub(crate) u32);

impl ObjRef {
    /// Raw arena index, for diagnostics.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A resolved storage location, as produced by place resolution and
/// carried by `LDA` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loc {
    /// A word in the work-memory arena (operand stack or globals).
    Mem(usize),
    /// A capture slot of a closure object.
    Capture(ObjRef, usize),
}

/// A tagged VM value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Unboxed immediate integer.
    Int(i32),
    /// Reference to a heap object (string, array, sexp, closure).
    Ref(ObjRef),
    /// A raw storage address produced by `LDA`.
    Addr(Loc),
}

impl Value {
    /// The boxed-zero immediate used to initialise globals and locals.
    pub const ZERO: Value = Value::Int(0);

    /// Box a machine integer into a tagged value.
    #[inline]
    pub fn boxed(n: i32) -> Value {
        Value::Int(n)
    }

    /// Box a boolean as the immediates 1/0.
    #[inline]
    pub fn boxed_bool(b: bool) -> Value {
        Value::Int(b as i32)
    }

    /// Unbox an immediate. Defined only on immediates; anything else is
    /// a type fault.
    #[inline]
    pub fn unbox(self) -> Result<i32> {
        match self {
            Value::Int(n) => Ok(n),
            other => Err(VmError::TypeError {
                expected: "immediate",
                got: other.kind_name(),
            }),
        }
    }

    /// True for immediates ("unboxed" in the collector's sense).
    #[inline]
    pub fn is_immediate(self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// Expect a heap reference.
    #[inline]
    pub fn as_ref(self) -> Result<ObjRef> {
        match self {
            Value::Ref(r) => Ok(r),
            other => Err(VmError::TypeError {
                expected: "heap reference",
                got: other.kind_name(),
            }),
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(self) -> &'static str {
        match self {
            Value::Int(_) => "immediate",
            Value::Ref(_) => "heap reference",
            Value::Addr(_) => "address",
        }
    }
}
