// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Control transfer and frame discipline: conditional jumps, `CALL`,
//! `CALLC`, `BEGIN`/`CBEGIN`, `END`, and `CLOSURE`.

use crate::opcode::Place;
use crate::value::Value;
use crate::vm::{ControlFlow, Engine, Result, VmError};

impl Engine<'_> {
    /// `CJMPz` / `CJMPnz`: pop, unbox, jump on zero / non-zero.
    pub(crate) fn execute_cjmp(&mut self, target: i32, jump_if_nonzero: bool) -> Result<()> {
        let v = self.mem.pop()?.unbox()?;
        if (v != 0) == jump_if_nonzero {
            self.update_ip(target)?;
        }
        Ok(())
    }

    /// `CALL`: push the return address and jump. The arguments are
    /// already on the operand stack, pushed by the caller.
    pub(crate) fn execute_call(&mut self, entry: i32, _n_args: i32) -> Result<()> {
        self.is_closure = false;
        self.calls.push(self.ip())?;
        self.update_ip(entry)
    }

    /// `CALLC`: like `CALL`, but the target address lives in slot 0 of
    /// the closure object sitting just above the `n_args` arguments.
    pub(crate) fn execute_callc(&mut self, n_args: i32) -> Result<()> {
        if n_args < 0 {
            return Err(VmError::Internal(format!(
                "CALLC with negative argument count {}",
                n_args
            )));
        }
        let clos = self.mem.read(self.mem.sp() + n_args as usize + 1)?.as_ref()?;
        let entry = self.heap.closure_entry(clos)?;

        self.is_closure = true;
        self.calls.push(self.ip())?;
        self.update_ip(entry as i32)
    }

    /// `BEGIN` / `CBEGIN`: save the caller's frame registers and the
    /// callee's closure flag on the call stack, anchor the new frame
    /// pointer at the operand-stack top, and push boxed-zero local
    /// slots.
    pub(crate) fn execute_begin(&mut self, n_args: i32, n_locals: i32) -> Result<()> {
        if n_args < 0 || n_locals < 0 {
            return Err(VmError::Internal(format!(
                "BEGIN with negative counts ({}, {})",
                n_args, n_locals
            )));
        }

        self.calls.push(self.fp)?;
        self.calls.push(self.n_args)?;
        self.calls.push(self.n_locals)?;
        self.calls.push(self.is_closure as usize)?;

        self.fp = self.mem.sp();
        self.n_args = n_args as usize;
        self.n_locals = n_locals as usize;

        for _ in 0..n_locals {
            self.mem.push(Value::ZERO)?;
        }
        Ok(())
    }

    /// `END`: pop the return value, reclaim the argument and local
    /// region (plus the closure reference for a closure call), restore
    /// the caller's registers, and either resume at the saved return
    /// address or stop the machine at the outermost frame.
    pub(crate) fn execute_end(&mut self) -> Result<ControlFlow> {
        let ret = self.mem.pop()?;
        self.mem.discard(self.n_args + self.n_locals)?;

        let was_closure = self.calls.pop()? != 0;
        if was_closure {
            self.mem.pop()?;
        }

        self.mem.push(ret)?;

        self.n_locals = self.calls.pop()?;
        self.n_args = self.calls.pop()?;
        self.fp = self.calls.pop()?;

        if self.calls.is_empty() {
            return Ok(ControlFlow::Stop);
        }
        let ret_addr = self.calls.pop()?;
        self.decoder.seek(ret_addr)?;
        Ok(ControlFlow::Continue)
    }

    /// `CLOSURE`: resolve every capture descriptor *now*, in the
    /// creating frame's addressing context, and copy the values into a
    /// fresh closure object. Capture is by value at creation time, not
    /// a live reference.
    pub(crate) fn execute_closure(&mut self, entry: i32, captures: &[(Place, i32)]) -> Result<()> {
        if entry < 0 || entry as usize >= self.bf.code().len() {
            return Err(VmError::OutOfBounds {
                at: entry.max(0) as usize,
            });
        }

        let mut values = Vec::with_capacity(captures.len());
        for &(place, idx) in captures {
            let loc = self.resolve(place, idx)?;
            values.push(self.load(loc)?);
        }

        let clos = self.heap.alloc_closure(entry as usize, captures.len());
        self.heap.with_root(clos, |heap| -> Result<()> {
            for (i, v) in values.into_iter().enumerate() {
                heap.set_slot(clos, i, v)?;
            }
            Ok(())
        })?;

        self.mem.push(Value::Ref(clos))
    }
}
