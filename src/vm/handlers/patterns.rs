// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Pattern-matching checks: `PATT`, `TAG`, `ARRAY`.
//!
//! A failed check is a normal matching outcome and pushes boxed false;
//! only an unrecognised pattern id or tag name is a fault.

use crate::heap::ObjKind;
use crate::opcode::Pattern;
use crate::value::Value;
use crate::vm::{Engine, Result};

impl Engine<'_> {
    /// `PATT`: pop a scrutinee and push the boxed result of the check.
    pub(crate) fn execute_patt(&mut self, kind: Pattern) -> Result<()> {
        let obj = self.mem.pop()?;

        let result = match kind {
            Pattern::Unboxed => obj.is_immediate(),
            Pattern::Boxed => !obj.is_immediate(),
            Pattern::String => self.scrutinee_kind(obj) == Some(ObjKind::String),
            Pattern::Array => self.scrutinee_kind(obj) == Some(ObjKind::Array),
            Pattern::Sexp => self.scrutinee_kind(obj) == Some(ObjKind::Sexp),
            Pattern::Closure => self.scrutinee_kind(obj) == Some(ObjKind::Closure),
            Pattern::StrCmp => {
                // The candidate string below the scrutinee is only
                // consumed when the scrutinee is a heap value; an
                // immediate scrutinee fails without touching it.
                match obj {
                    Value::Ref(r) => {
                        let other = self.mem.pop()?.as_ref()?;
                        self.heap.kind(r) == ObjKind::String && self.heap.string_equals(other, r)
                    }
                    _ => false,
                }
            }
        };

        self.mem.push(Value::boxed_bool(result))
    }

    /// `TAG(name, n)`: pop a scrutinee, push boxed true iff it is an
    /// s-expression with the hashed tag name and field count.
    pub(crate) fn execute_tag(&mut self, name: u32, arity: i32) -> Result<()> {
        let tag_name = self.bf.string(name)?;
        let tag_hash = self.heap.tag_hash(tag_name)?;
        let obj = self.mem.pop()?;

        let result = match obj {
            Value::Ref(r) => arity >= 0 && self.heap.is_sexp_with(r, tag_hash, arity as usize),
            _ => false,
        };

        self.mem.push(Value::boxed_bool(result))
    }

    /// `ARRAY(n)`: pop a scrutinee, push boxed true iff it is an array
    /// of length n.
    pub(crate) fn execute_array_patt(&mut self, n: i32) -> Result<()> {
        let obj = self.mem.pop()?;

        let result = match obj {
            Value::Ref(r) => {
                self.heap.kind(r) == ObjKind::Array && n >= 0 && self.heap.length(r) == n as usize
            }
            _ => false,
        };

        self.mem.push(Value::boxed_bool(result))
    }

    fn scrutinee_kind(&self, v: Value) -> Option<ObjKind> {
        match v {
            Value::Ref(r) => Some(self.heap.kind(r)),
            _ => None,
        }
    }
}
