// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Opcode handlers, organised by category.

pub mod arithmetic;
pub mod builtins;
pub mod control;
pub mod patterns;
pub mod variables;
