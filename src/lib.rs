// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Bytecode virtual machine for the Ovis language.
//!
//! The engine executes a compiled bytecode file: a dual-stack machine
//! with an operand stack and a call stack, tagged values (immediates
//! and heap references), closures with by-value capture, and pattern
//! matching over strings, arrays, and s-expressions. The garbage
//! collector is an external collaborator reached through the narrow
//! primitive surface in [`heap`].

pub mod bytefile;
pub mod decode;
pub mod heap;
pub mod opcode;
pub mod value;
pub mod vm;

pub use bytefile::Bytefile;
pub use decode::Decoder;
pub use heap::{Heap, ObjKind};
pub use opcode::{BinOp, Insn, Pattern, Place};
pub use value::{Loc, ObjRef, Value};
pub use vm::{Engine, Result, VmError, VmState};
