// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Work-memory arena: the operand stack plus the global-variable area.
//!
//! The arena is a single block of tagged words. The globals block sits
//! at the top end, sized from the bytecode header; the operand stack
//! grows downward from just below it toward index 0. Keeping both in
//! one block preserves the original addressing formulas (`fp - idx`,
//! `fp + n_args - idx`, globals base + idx) as plain index arithmetic,
//! with every access bounds-checked.

use crate::value::Value;

use super::error::{Result, VmError};

/// The work-memory arena.
#[derive(Debug)]
pub struct Memory {
    words: Vec<Value>,
    /// Next free slot; the occupied operand region is
    /// `(sp, globals_base)`.
    sp: usize,
    /// Index of the first global word.
    globals_base: usize,
}

impl Memory {
    /// Create an arena of `total_words` with the top `global_words`
    /// reserved for globals, all initialised to the boxed-zero
    /// immediate.
    pub fn new(total_words: usize, global_words: usize) -> Result<Memory> {
        // Word 0 is the overflow guard and at least one operand slot
        // must exist below the globals.
        if global_words + 2 > total_words {
            return Err(VmError::FileFault(format!(
                "global area of {} words does not fit in {} memory words",
                global_words, total_words
            )));
        }
        let globals_base = total_words - global_words;
        Ok(Memory {
            words: vec![Value::ZERO; total_words],
            sp: globals_base - 1,
            globals_base,
        })
    }

    /// Index of the next free operand slot.
    #[inline]
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Base index of the globals block.
    #[inline]
    pub fn globals_base(&self) -> usize {
        self.globals_base
    }

    /// Number of operands currently on the stack.
    #[inline]
    pub fn depth(&self) -> usize {
        self.globals_base - 1 - self.sp
    }

    /// Push an operand. Fails when the stack would collide with the
    /// arena floor.
    #[inline]
    pub fn push(&mut self, v: Value) -> Result<()> {
        if self.sp == 0 {
            return Err(VmError::StackOverflow { stack: "operand" });
        }
        self.words[self.sp] = v;
        self.sp -= 1;
        if self.sp == 0 {
            return Err(VmError::StackOverflow { stack: "operand" });
        }
        Ok(())
    }

    /// Pop an operand. Fails at the boundary between the operand stack
    /// and the globals block.
    #[inline]
    pub fn pop(&mut self) -> Result<Value> {
        if self.sp + 1 >= self.globals_base {
            return Err(VmError::StackUnderflow { stack: "operand" });
        }
        self.sp += 1;
        Ok(self.words[self.sp])
    }

    /// Read the top operand without popping it.
    #[inline]
    pub fn peek(&self) -> Result<Value> {
        if self.sp + 1 >= self.globals_base {
            return Err(VmError::StackUnderflow { stack: "operand" });
        }
        Ok(self.words[self.sp + 1])
    }

    /// Discard `n` operands (frame teardown).
    pub fn discard(&mut self, n: usize) -> Result<()> {
        if self.sp + n >= self.globals_base {
            return Err(VmError::StackUnderflow { stack: "operand" });
        }
        self.sp += n;
        Ok(())
    }

    /// Read an arbitrary arena word.
    #[inline]
    pub fn read(&self, addr: usize) -> Result<Value> {
        self.words
            .get(addr)
            .copied()
            .ok_or(VmError::Addressing {
                kind: "memory",
                idx: addr as i32,
            })
    }

    /// Write an arbitrary arena word.
    #[inline]
    pub fn write(&mut self, addr: usize, v: Value) -> Result<()> {
        match self.words.get_mut(addr) {
            Some(slot) => {
                *slot = v;
                Ok(())
            }
            None => Err(VmError::Addressing {
                kind: "memory",
                idx: addr as i32,
            }),
        }
    }

    /// Resolve a global index to an arena address, bounds-checked
    /// against the globals region.
    pub fn global_addr(&self, idx: usize) -> Result<usize> {
        let addr = self.globals_base + idx;
        if addr >= self.words.len() {
            return Err(VmError::Addressing {
                kind: "global",
                idx: idx as i32,
            });
        }
        Ok(addr)
    }
}
