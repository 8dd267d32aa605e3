// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Loads and stores: `LD`, `LDA`, `ST`, `STA`, `ELEM`.

use crate::opcode::Place;
use crate::value::Value;
use crate::vm::{Engine, Result, VmError};

impl Engine<'_> {
    /// `LD`: push the value at `place[idx]`.
    pub(crate) fn execute_ld(&mut self, place: Place, idx: i32) -> Result<()> {
        let loc = self.resolve(place, idx)?;
        let v = self.load(loc)?;
        self.mem.push(v)
    }

    /// `LDA`: push the *address* of `place[idx]`.
    pub(crate) fn execute_lda(&mut self, place: Place, idx: i32) -> Result<()> {
        let loc = self.resolve(place, idx)?;
        self.mem.push(Value::Addr(loc))
    }

    /// `ST`: store the top operand into `place[idx]`, leaving it on the
    /// stack (the store expression's own value).
    pub(crate) fn execute_st(&mut self, place: Place, idx: i32) -> Result<()> {
        let v = self.mem.peek()?;
        let loc = self.resolve(place, idx)?;
        self.store(loc, v)
    }

    /// `STA`: the two-shaped store. An immediate destination is an
    /// array index, and the backing collection is popped next; an
    /// address destination (from `LDA`) is stored through directly.
    /// Either way the stored value is pushed back as the result.
    pub(crate) fn execute_sta(&mut self) -> Result<()> {
        let value = self.mem.pop()?;
        let dest = self.mem.pop()?;

        match dest {
            Value::Int(idx) => {
                let coll = self.mem.pop()?.as_ref()?;
                self.heap.indexed_store(coll, idx, value)?;
            }
            Value::Addr(loc) => self.store(loc, value)?,
            Value::Ref(_) => {
                return Err(VmError::TypeError {
                    expected: "array index or address",
                    got: "heap reference",
                });
            }
        }

        self.mem.push(value)
    }

    /// `ELEM`: pop index, pop collection, push the element.
    pub(crate) fn execute_elem(&mut self) -> Result<()> {
        let idx = self.mem.pop()?.unbox()?;
        let coll = self.mem.pop()?.as_ref()?;
        let v = self.heap.elem(coll, idx)?;
        self.mem.push(v)
    }
}
