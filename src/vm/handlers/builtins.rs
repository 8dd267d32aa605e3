// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Heap-object construction and the builtin call surface: `STRING`,
//! `SEXP`, `Lread`, `Lwrite`, `Llength`, `Lstring`, `Barray`.

use std::io::Write as _;

use crate::value::Value;
use crate::vm::{Engine, Result, VmError};

impl Engine<'_> {
    /// `STRING`: allocate a string from the string table and push its
    /// reference.
    pub(crate) fn execute_string(&mut self, pos: u32) -> Result<()> {
        let bytes = self.bf.string(pos)?;
        let r = self.heap.alloc_string(bytes);
        self.mem.push(Value::Ref(r))
    }

    /// `SEXP`: allocate an s-expression and pop its fields in reverse,
    /// so they land in declaration order.
    pub(crate) fn execute_sexp(&mut self, tag: u32, arity: u32) -> Result<()> {
        let tag_name = self.bf.string(tag)?;
        let tag_hash = self.heap.tag_hash(tag_name)?;
        let n = arity as usize;

        // The fields must already be on the stack; an arity beyond the
        // current depth would underflow anyway, so fail it before
        // allocating the object.
        if n > self.mem.depth() {
            return Err(VmError::StackUnderflow { stack: "operand" });
        }

        let r = self.heap.alloc_sexp(tag_hash, n);
        let mem = &mut self.mem;
        self.heap.with_root(r, |heap| -> Result<()> {
            for i in (0..n).rev() {
                let field = mem.pop()?;
                heap.set_slot(r, i, field)?;
            }
            Ok(())
        })?;

        self.mem.push(Value::Ref(r))
    }

    /// `Barray`: build an array from the top n operands (popped in
    /// reverse, preserving push order).
    pub(crate) fn execute_barray(&mut self, n: i32) -> Result<()> {
        if n < 0 {
            return Err(VmError::Internal(format!(
                "BARRAY with negative length {}",
                n
            )));
        }
        let n = n as usize;

        if n > self.mem.depth() {
            return Err(VmError::StackUnderflow { stack: "operand" });
        }

        let r = self.heap.alloc_array(n);
        let mem = &mut self.mem;
        self.heap.with_root(r, |heap| -> Result<()> {
            for i in (0..n).rev() {
                let item = mem.pop()?;
                heap.set_slot(r, i, item)?;
            }
            Ok(())
        })?;

        self.mem.push(Value::Ref(r))
    }

    /// `Lread`: prompt, read one line from the host input, parse an
    /// integer, push it boxed. Blocks synchronously; a parse failure or
    /// end of input is fatal.
    pub(crate) fn execute_read(&mut self) -> Result<()> {
        write!(self.output, "> ").map_err(io_fault)?;
        self.output.flush().map_err(io_fault)?;

        let mut line = String::new();
        let n_read = self.input.read_line(&mut line).map_err(io_fault)?;
        if n_read == 0 {
            return Err(VmError::Internal("read: end of input".into()));
        }
        let value: i32 = line
            .trim()
            .parse()
            .map_err(|_| VmError::Internal(format!("read: not an integer: {:?}", line.trim())))?;

        self.mem.push(Value::boxed(value))
    }

    /// `Lwrite`: pop an integer, print it followed by a newline, push
    /// boxed zero.
    pub(crate) fn execute_write(&mut self) -> Result<()> {
        let v = self.mem.pop()?.unbox()?;
        writeln!(self.output, "{}", v).map_err(io_fault)?;
        self.mem.push(Value::ZERO)
    }

    /// `Llength`: pop a collection, push its boxed length.
    pub(crate) fn execute_length(&mut self) -> Result<()> {
        let r = self.mem.pop()?.as_ref()?;
        let len = self.heap.length(r);
        self.mem.push(Value::boxed(len as i32))
    }

    /// `Lstring`: pop a value, push a string rendering of it.
    pub(crate) fn execute_stringify(&mut self) -> Result<()> {
        let v = self.mem.pop()?;
        let r = self.heap.stringify(v)?;
        self.mem.push(Value::Ref(r))
    }
}

fn io_fault(e: std::io::Error) -> VmError {
    VmError::Internal(format!("host i/o: {}", e))
}
