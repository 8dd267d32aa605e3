// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Byte-cursor instruction decoder.
//!
//! Decodes exactly one instruction per call: one opcode byte (high
//! nibble = category, low nibble = operation) followed by fixed-width
//! operands. The decoder is pure with respect to VM state; it only
//! advances its cursor, so the executor and any disassembly tooling can
//! share it. Every read is validated against the code bounds, and every
//! string-table reference against the string-table size.

use crate::opcode::{BinOp, Insn, Pattern, Place};
use crate::vm::error::{Result, VmError};

/// Instruction categories, by high nibble.
const CAT_BINOP: u8 = 0;
const CAT_STACK: u8 = 1;
const CAT_LD: u8 = 2;
const CAT_LDA: u8 = 3;
const CAT_ST: u8 = 4;
const CAT_CONTROL: u8 = 5;
const CAT_PATT: u8 = 6;
const CAT_BUILTIN: u8 = 7;
const CAT_STOP: u8 = 15;

/// A decoding cursor over a code segment.
#[derive(Debug)]
pub struct Decoder<'a> {
    code: &'a [u8],
    strtab_size: usize,
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a decoder over a code segment. `strtab_size` is used to
    /// validate string-table references at decode time.
    pub fn new(code: &'a [u8], strtab_size: usize) -> Self {
        Self {
            code,
            strtab_size,
            pos: 0,
        }
    }

    /// Current cursor position (byte offset into the code segment).
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Reposition the cursor. The offset itself is validated; decoding
    /// at it will still bounds-check every read.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.code.len() {
            return Err(VmError::OutOfBounds { at: pos });
        }
        self.pos = pos;
        Ok(())
    }

    fn next_byte(&mut self) -> Result<u8> {
        let b = *self
            .code
            .get(self.pos)
            .ok_or(VmError::OutOfBounds { at: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    fn next_int(&mut self) -> Result<i32> {
        let end = self.pos.checked_add(4).filter(|&e| e <= self.code.len());
        let end = end.ok_or(VmError::OutOfBounds { at: self.pos })?;
        let bytes: [u8; 4] = self.code[self.pos..end].try_into().unwrap();
        self.pos = end;
        Ok(i32::from_le_bytes(bytes))
    }

    /// Read an int operand that references the string table and
    /// validate it against the table size.
    fn next_string_ref(&mut self) -> Result<u32> {
        let pos = self.next_int()?;
        if pos < 0 || pos as usize >= self.strtab_size {
            return Err(VmError::StringIndex(pos));
        }
        Ok(pos as u32)
    }

    /// Decode one instruction at the cursor.
    pub fn next(&mut self) -> Result<Insn> {
        let byte = self.next_byte()?;
        let (hi, lo) = (byte >> 4, byte & 0x0f);

        let insn = match hi {
            CAT_BINOP => {
                let op = BinOp::from_low_nibble(lo).ok_or(VmError::InvalidOpcode { hi, lo })?;
                Insn::Binop(op)
            }

            CAT_STACK => match lo {
                0 => Insn::Const(self.next_int()?),
                1 => Insn::String(self.next_string_ref()?),
                2 => {
                    let tag = self.next_string_ref()?;
                    let arity = self.next_int()?;
                    if arity < 0 {
                        return Err(VmError::Internal(format!(
                            "SEXP with negative arity {}",
                            arity
                        )));
                    }
                    Insn::Sexp {
                        tag,
                        arity: arity as u32,
                    }
                }
                3 => Insn::Sti,
                4 => Insn::Sta,
                5 => Insn::Jmp(self.next_int()?),
                6 => Insn::End,
                7 => Insn::Ret,
                8 => Insn::Drop,
                9 => Insn::Dup,
                10 => Insn::Swap,
                11 => Insn::Elem,
                _ => return Err(VmError::InvalidOpcode { hi, lo }),
            },

            CAT_LD => Insn::Ld(Place::from_code(lo)?, self.next_int()?),
            CAT_LDA => Insn::Lda(Place::from_code(lo)?, self.next_int()?),
            CAT_ST => Insn::St(Place::from_code(lo)?, self.next_int()?),

            CAT_CONTROL => match lo {
                0 => Insn::CJmpZ(self.next_int()?),
                1 => Insn::CJmpNz(self.next_int()?),
                2 => {
                    let n_args = self.next_int()?;
                    let n_locals = self.next_int()?;
                    Insn::Begin { n_args, n_locals }
                }
                3 => {
                    let n_args = self.next_int()?;
                    let n_locals = self.next_int()?;
                    Insn::CBegin { n_args, n_locals }
                }
                4 => {
                    let entry = self.next_int()?;
                    let n = self.next_int()?;
                    if n < 0 {
                        return Err(VmError::Internal(format!(
                            "CLOSURE with negative capture count {}",
                            n
                        )));
                    }
                    // Each capture descriptor needs five code bytes; a
                    // count the remaining code cannot satisfy is rejected
                    // before any space is reserved for it.
                    if n as usize > (self.code.len() - self.pos) / 5 {
                        return Err(VmError::OutOfBounds { at: self.pos });
                    }
                    let mut captures = Vec::with_capacity(n as usize);
                    for _ in 0..n {
                        let place = Place::from_code(self.next_byte()?)?;
                        let idx = self.next_int()?;
                        captures.push((place, idx));
                    }
                    Insn::Closure { entry, captures }
                }
                5 => Insn::CallC {
                    n_args: self.next_int()?,
                },
                6 => {
                    let entry = self.next_int()?;
                    let n_args = self.next_int()?;
                    Insn::Call { entry, n_args }
                }
                7 => {
                    let name = self.next_string_ref()?;
                    let arity = self.next_int()?;
                    Insn::Tag { name, arity }
                }
                8 => Insn::Array(self.next_int()?),
                9 => {
                    let line = self.next_int()?;
                    let col = self.next_byte()? as i32;
                    Insn::Fail { line, col }
                }
                10 => Insn::Line(self.next_int()?),
                _ => return Err(VmError::InvalidOpcode { hi, lo }),
            },

            CAT_PATT => {
                let kind = Pattern::from_low_nibble(lo).ok_or(VmError::InvalidOpcode { hi, lo })?;
                Insn::Patt(kind)
            }

            CAT_BUILTIN => match lo {
                0 => Insn::CallRead,
                1 => Insn::CallWrite,
                2 => Insn::CallLength,
                3 => Insn::CallString,
                4 => Insn::CallArray(self.next_int()?),
                _ => return Err(VmError::InvalidOpcode { hi, lo }),
            },

            CAT_STOP => Insn::Stop,

            _ => return Err(VmError::InvalidOpcode { hi, lo }),
        };

        Ok(insn)
    }
}
