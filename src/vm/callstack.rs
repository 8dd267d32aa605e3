// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! The call stack.
//!
//! A fixed-capacity stack of raw bookkeeping words, disjoint from the
//! operand stack: saved frame pointers, argument and local counts, the
//! closure-call flag, and return addresses. Pushes and pops are paired
//! per call by construction of `BEGIN`/`END`; a mismatch reads back
//! wrong words, which the design treats as unrecoverable.

use super::error::{Result, VmError};

/// Call stack of raw words.
#[derive(Debug)]
pub struct CallStack {
    words: Vec<usize>,
    capacity: usize,
}

impl CallStack {
    pub fn new(capacity: usize) -> CallStack {
        CallStack {
            words: Vec::new(),
            capacity,
        }
    }

    /// Push a raw word.
    #[inline]
    pub fn push(&mut self, word: usize) -> Result<()> {
        if self.words.len() == self.capacity {
            return Err(VmError::StackOverflow { stack: "call" });
        }
        self.words.push(word);
        Ok(())
    }

    /// Pop a raw word.
    #[inline]
    pub fn pop(&mut self) -> Result<usize> {
        self.words
            .pop()
            .ok_or(VmError::StackUnderflow { stack: "call" })
    }

    /// True at the initial (main-program) depth.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Current depth in words.
    #[inline]
    pub fn depth(&self) -> usize {
        self.words.len()
    }
}
