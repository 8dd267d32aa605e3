// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Heap interface shim.
//!
//! The engine treats the collector as an external collaborator and only
//! calls through the narrow primitive surface in this module:
//! allocation of the four object kinds, tag hashing, object
//! introspection, indexed stores, string comparison, and scoped root
//! registration. The backing store here is a plain arena of owned
//! objects; handles (`ObjRef`) never dangle because the shim never
//! collects, but every caller still brackets multi-step construction
//! with [`Heap::with_root`] so the discipline the collector contract
//! requires is in place.

use crate::value::{ObjRef, Value};
use crate::vm::error::{Result, VmError};

/// The 64-character tag alphabet; a tag hash packs character indices
/// 6 bits at a time.
const TAG_CHARS: &[u8] = b"_abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ'0123456789";

/// How many leading characters of a tag name participate in the hash.
const TAG_HASH_DEPTH: usize = 5;

/// Runtime type tag of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    String,
    Array,
    Sexp,
    Closure,
}

impl ObjKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjKind::String => "string",
            ObjKind::Array => "array",
            ObjKind::Sexp => "sexp",
            ObjKind::Closure => "closure",
        }
    }
}

#[derive(Debug, Clone)]
enum Obj {
    Str(Vec<u8>),
    Array(Vec<Value>),
    Sexp { tag: i32, fields: Vec<Value> },
    Closure { entry: usize, captures: Vec<Value> },
}

/// Arena of heap objects behind the collector interface.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Obj>,
    extra_roots: Vec<ObjRef>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, obj: Obj) -> ObjRef {
        let r = ObjRef(self.objects.len() as u32);
        self.objects.push(obj);
        r
    }

    fn get(&self, r: ObjRef) -> &Obj {
        // Handles are only minted by alloc and never invalidated.
        &self.objects[r.0 as usize]
    }

    fn get_mut(&mut self, r: ObjRef) -> &mut Obj {
        &mut self.objects[r.0 as usize]
    }

    /// Register `r` as an extra root for the duration of `f`, so a
    /// collection triggered mid-construction cannot reclaim a
    /// half-built object. Scoped acquisition: release is not left to
    /// the caller.
    pub fn with_root<T>(&mut self, r: ObjRef, f: impl FnOnce(&mut Heap) -> T) -> T {
        self.extra_roots.push(r);
        let out = f(self);
        self.extra_roots.pop();
        out
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    pub fn alloc_string(&mut self, bytes: &[u8]) -> ObjRef {
        self.alloc(Obj::Str(bytes.to_vec()))
    }

    /// Allocate an array of `n` boxed-zero slots.
    pub fn alloc_array(&mut self, n: usize) -> ObjRef {
        self.alloc(Obj::Array(vec![Value::ZERO; n]))
    }

    /// Allocate an s-expression with `n` boxed-zero fields.
    pub fn alloc_sexp(&mut self, tag: i32, n: usize) -> ObjRef {
        self.alloc(Obj::Sexp {
            tag,
            fields: vec![Value::ZERO; n],
        })
    }

    /// Allocate a closure for `entry` with `n` boxed-zero capture
    /// slots.
    pub fn alloc_closure(&mut self, entry: usize, n: usize) -> ObjRef {
        self.alloc(Obj::Closure {
            entry,
            captures: vec![Value::ZERO; n],
        })
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn kind(&self, r: ObjRef) -> ObjKind {
        match self.get(r) {
            Obj::Str(_) => ObjKind::String,
            Obj::Array(_) => ObjKind::Array,
            Obj::Sexp { .. } => ObjKind::Sexp,
            Obj::Closure { .. } => ObjKind::Closure,
        }
    }

    /// Number of elements: bytes of a string, elements of an array,
    /// fields of a sexp, captures of a closure.
    pub fn length(&self, r: ObjRef) -> usize {
        match self.get(r) {
            Obj::Str(bytes) => bytes.len(),
            Obj::Array(items) => items.len(),
            Obj::Sexp { fields, .. } => fields.len(),
            Obj::Closure { captures, .. } => captures.len(),
        }
    }

    /// Code address stored in slot 0 of a closure.
    pub fn closure_entry(&self, r: ObjRef) -> Result<usize> {
        match self.get(r) {
            Obj::Closure { entry, .. } => Ok(*entry),
            other => Err(VmError::TypeError {
                expected: "closure",
                got: kind_of(other).name(),
            }),
        }
    }

    /// True iff `r` is a sexp with the given tag hash and field count.
    pub fn is_sexp_with(&self, r: ObjRef, tag_hash: i32, n_fields: usize) -> bool {
        match self.get(r) {
            Obj::Sexp { tag, fields } => *tag == tag_hash && fields.len() == n_fields,
            _ => false,
        }
    }

    pub fn string_equals(&self, a: ObjRef, b: ObjRef) -> bool {
        match (self.get(a), self.get(b)) {
            (Obj::Str(x), Obj::Str(y)) => x == y,
            _ => false,
        }
    }

    // =========================================================================
    // Slot access
    // =========================================================================

    /// Read a value slot: array element, sexp field, or closure
    /// capture.
    pub fn get_slot(&self, r: ObjRef, i: usize) -> Result<Value> {
        let slots = self.value_slots(r)?;
        slots.get(i).copied().ok_or(VmError::Addressing {
            kind: self.kind(r).name(),
            idx: i as i32,
        })
    }

    /// Write a value slot: array element, sexp field, or closure
    /// capture.
    pub fn set_slot(&mut self, r: ObjRef, i: usize, v: Value) -> Result<()> {
        let kind = self.kind(r);
        let slots = self.value_slots_mut(r)?;
        match slots.get_mut(i) {
            Some(slot) => {
                *slot = v;
                Ok(())
            }
            None => Err(VmError::Addressing {
                kind: kind.name(),
                idx: i as i32,
            }),
        }
    }

    fn value_slots(&self, r: ObjRef) -> Result<&[Value]> {
        match self.get(r) {
            Obj::Array(items) => Ok(items),
            Obj::Sexp { fields, .. } => Ok(fields),
            Obj::Closure { captures, .. } => Ok(captures),
            Obj::Str(_) => Err(VmError::TypeError {
                expected: "array, sexp or closure",
                got: "string",
            }),
        }
    }

    fn value_slots_mut(&mut self, r: ObjRef) -> Result<&mut Vec<Value>> {
        match self.get_mut(r) {
            Obj::Array(items) => Ok(items),
            Obj::Sexp { fields, .. } => Ok(fields),
            Obj::Closure { captures, .. } => Ok(captures),
            Obj::Str(_) => Err(VmError::TypeError {
                expected: "array, sexp or closure",
                got: "string",
            }),
        }
    }

    /// `ELEM`: index into a collection. Strings yield the byte as an
    /// immediate.
    pub fn elem(&self, r: ObjRef, idx: i32) -> Result<Value> {
        if idx < 0 {
            return Err(VmError::Addressing {
                kind: self.kind(r).name(),
                idx,
            });
        }
        match self.get(r) {
            Obj::Str(bytes) => bytes
                .get(idx as usize)
                .map(|&b| Value::Int(b as i32))
                .ok_or(VmError::Addressing { kind: "string", idx }),
            _ => self.get_slot(r, idx as usize),
        }
    }

    /// Indexed store (the array-shaped half of `STA`). Strings store
    /// the low byte of an immediate.
    pub fn indexed_store(&mut self, r: ObjRef, idx: i32, v: Value) -> Result<()> {
        if idx < 0 {
            return Err(VmError::Addressing {
                kind: self.kind(r).name(),
                idx,
            });
        }
        match self.get_mut(r) {
            Obj::Str(bytes) => {
                let byte = v.unbox()? as u8;
                match bytes.get_mut(idx as usize) {
                    Some(slot) => {
                        *slot = byte;
                        Ok(())
                    }
                    None => Err(VmError::Addressing { kind: "string", idx }),
                }
            }
            _ => self.set_slot(r, idx as usize, v),
        }
    }

    /// Raw string bytes.
    pub fn string_bytes(&self, r: ObjRef) -> Result<&[u8]> {
        match self.get(r) {
            Obj::Str(bytes) => Ok(bytes),
            other => Err(VmError::TypeError {
                expected: "string",
                got: kind_of(other).name(),
            }),
        }
    }

    // =========================================================================
    // Tag hashing
    // =========================================================================

    /// Hash a tag name: fold the first five characters, 6 bits each,
    /// over the tag alphabet. A byte outside the alphabet is a fault.
    pub fn tag_hash(&self, name: &[u8]) -> Result<i32> {
        let mut h: i32 = 0;
        for &b in name.iter().take(TAG_HASH_DEPTH) {
            let pos = TAG_CHARS
                .iter()
                .position(|&c| c == b)
                .ok_or_else(|| VmError::TagFault(format!("bad tag character {:?}", b as char)))?;
            h = (h << 6) | pos as i32;
        }
        Ok(h)
    }

    /// Recover a printable tag name from its hash (used by the
    /// stringifier). Inverse of [`tag_hash`](Heap::tag_hash) up to a
    /// leading underscore, which hashes to zero bits.
    pub fn de_hash(&self, mut hash: i32) -> String {
        let mut chars = Vec::new();
        while hash != 0 {
            chars.push(TAG_CHARS[(hash & 0x3f) as usize]);
            hash >>= 6;
        }
        chars.reverse();
        String::from_utf8_lossy(&chars).into_owned()
    }

    // =========================================================================
    // Stringification (the `Lstring` builtin)
    // =========================================================================

    /// Render a value as a string object. A string renders as itself
    /// (the same object, no copy); everything else is formatted.
    pub fn stringify(&mut self, v: Value) -> Result<ObjRef> {
        if let Value::Ref(r) = v {
            if self.kind(r) == ObjKind::String {
                return Ok(r);
            }
        }
        let mut out = String::new();
        self.format_value(v, false, &mut out)?;
        Ok(self.alloc_string(out.as_bytes()))
    }

    fn format_value(&self, v: Value, nested: bool, out: &mut String) -> Result<()> {
        use std::fmt::Write;
        match v {
            Value::Int(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::Addr(_) => {
                return Err(VmError::Internal("cannot stringify a raw address".into()));
            }
            Value::Ref(r) => match self.get(r) {
                Obj::Str(bytes) => {
                    let s = String::from_utf8_lossy(bytes);
                    if nested {
                        let _ = write!(out, "\"{}\"", s);
                    } else {
                        out.push_str(&s);
                    }
                }
                Obj::Array(items) => {
                    out.push('[');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.format_value(*item, true, out)?;
                    }
                    out.push(']');
                }
                Obj::Sexp { tag, fields } => {
                    out.push_str(&self.de_hash(*tag));
                    if !fields.is_empty() {
                        out.push_str(" (");
                        for (i, field) in fields.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            self.format_value(*field, true, out)?;
                        }
                        out.push(')');
                    }
                }
                Obj::Closure { entry, .. } => {
                    let _ = write!(out, "#<closure {}>", entry);
                }
            },
        }
        Ok(())
    }
}

fn kind_of(obj: &Obj) -> ObjKind {
    match obj {
        Obj::Str(_) => ObjKind::String,
        Obj::Array(_) => ObjKind::Array,
        Obj::Sexp { .. } => ObjKind::Sexp,
        Obj::Closure { .. } => ObjKind::Closure,
    }
}
