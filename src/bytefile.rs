// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Bytecode file loader.
//!
//! The file layout is fixed by the producing toolchain: a header of
//! four little-endian 32-bit fields (string-table byte size, global
//! area word count, public-symbol count, reserved), a public-symbol
//! table of `{name_offset, code_offset}` pairs, the raw string table,
//! and the code segment running to end-of-file. The engine only reads
//! this structure; it never produces it.

use std::fs;
use std::path::Path;

use crate::vm::error::{Result, VmError};

/// A loaded, unpacked bytecode file.
#[derive(Debug, Clone)]
pub struct Bytefile {
    global_area: usize,
    publics: Vec<PublicSymbol>,
    strings: Vec<u8>,
    code: Vec<u8>,
}

/// One entry of the public-symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicSymbol {
    /// Byte offset of the symbol's name in the string table.
    pub name_offset: u32,
    /// Byte offset of the symbol's code in the code segment.
    pub code_offset: u32,
}

impl Bytefile {
    /// Read and unpack a bytecode file from disk.
    pub fn read(path: &Path) -> Result<Bytefile> {
        let bytes = fs::read(path)
            .map_err(|e| VmError::FileFault(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes)
    }

    /// Unpack a bytecode file image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Bytefile> {
        let mut cursor = 0usize;
        let field = |cursor: &mut usize| -> Result<i32> {
            let end = *cursor + 4;
            if end > bytes.len() {
                return Err(VmError::FileFault("truncated header".into()));
            }
            let v = i32::from_le_bytes(bytes[*cursor..end].try_into().unwrap());
            *cursor = end;
            Ok(v)
        };

        let stringtab_size = field(&mut cursor)?;
        let global_area = field(&mut cursor)?;
        let n_publics = field(&mut cursor)?;
        let _reserved = field(&mut cursor)?;

        if stringtab_size < 0 || global_area < 0 || n_publics < 0 {
            return Err(VmError::FileFault("negative header field".into()));
        }
        let stringtab_size = stringtab_size as usize;
        let n_publics = n_publics as usize;

        // Each entry is two fields; the declared count must be
        // satisfiable by the bytes actually present before anything is
        // reserved for it.
        if n_publics > (bytes.len() - cursor) / 8 {
            return Err(VmError::FileFault("truncated public-symbol table".into()));
        }

        let mut publics = Vec::with_capacity(n_publics);
        for _ in 0..n_publics {
            let name_offset = field(&mut cursor)?;
            let code_offset = field(&mut cursor)?;
            if name_offset < 0 || code_offset < 0 {
                return Err(VmError::FileFault("negative public-symbol offset".into()));
            }
            publics.push(PublicSymbol {
                name_offset: name_offset as u32,
                code_offset: code_offset as u32,
            });
        }

        let strings_end = cursor + stringtab_size;
        if strings_end > bytes.len() {
            return Err(VmError::FileFault("truncated string table".into()));
        }
        let strings = bytes[cursor..strings_end].to_vec();
        let code = bytes[strings_end..].to_vec();

        if code.is_empty() {
            return Err(VmError::FileFault("empty code segment".into()));
        }

        Ok(Bytefile {
            global_area: global_area as usize,
            publics,
            strings,
            code,
        })
    }

    /// The code segment.
    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Size of the string table in bytes.
    #[inline]
    pub fn stringtab_size(&self) -> usize {
        self.strings.len()
    }

    /// Number of words to reserve for the global-variable area.
    #[inline]
    pub fn global_area(&self) -> usize {
        self.global_area
    }

    /// The public-symbol table.
    #[inline]
    pub fn publics(&self) -> &[PublicSymbol] {
        &self.publics
    }

    /// Look up a NUL-terminated string in the string table by byte
    /// offset.
    pub fn string(&self, pos: u32) -> Result<&[u8]> {
        let start = pos as usize;
        if start >= self.strings.len() {
            return Err(VmError::StringIndex(pos as i32));
        }
        let rest = &self.strings[start..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(VmError::StringIndex(pos as i32))?;
        Ok(&rest[..nul])
    }

    /// The name of a public symbol.
    pub fn public_name(&self, i: usize) -> Result<&[u8]> {
        let sym = self
            .publics
            .get(i)
            .ok_or_else(|| VmError::Internal(format!("public symbol {} out of range", i)))?;
        self.string(sym.name_offset)
    }
}
