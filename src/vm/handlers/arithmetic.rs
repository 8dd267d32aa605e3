// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! The thirteen `BINOP` operators.

use crate::opcode::BinOp;
use crate::value::Value;
use crate::vm::{Engine, Result, VmError};

impl Engine<'_> {
    /// Pop b, pop a, unbox both, apply, push the boxed result.
    ///
    /// `+ - *` wrap on 32-bit overflow. Division and modulo by zero are
    /// arithmetic faults; `MIN / -1` wraps. Comparisons and the logical
    /// operators produce the immediates 0/1.
    pub(crate) fn execute_binop(&mut self, op: BinOp) -> Result<()> {
        let b = self.mem.pop()?.unbox()?;
        let a = self.mem.pop()?.unbox()?;

        let result = match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div => {
                if b == 0 {
                    return Err(VmError::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            BinOp::Rem => {
                if b == 0 {
                    return Err(VmError::DivisionByZero);
                }
                a.wrapping_rem(b)
            }
            BinOp::Lt => (a < b) as i32,
            BinOp::Le => (a <= b) as i32,
            BinOp::Gt => (a > b) as i32,
            BinOp::Ge => (a >= b) as i32,
            BinOp::Eq => (a == b) as i32,
            BinOp::Ne => (a != b) as i32,
            BinOp::And => (a != 0 && b != 0) as i32,
            BinOp::Or => (a != 0 || b != 0) as i32,
        };

        self.mem.push(Value::boxed(result))
    }
}
