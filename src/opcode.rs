// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Decoded instruction definitions.
//!
//! On the wire every instruction starts with one byte whose high nibble
//! selects a category and whose low nibble selects an operation within
//! it, followed by zero or more fixed-width operands (see
//! [`Decoder`](crate::decode::Decoder)). This module is the decoded,
//! structured form the executor dispatches on.

use crate::vm::error::{Result, VmError};

/// Addressing place for `LD`/`LDA`/`ST` and closure captures.
///
/// Encoded as 0..3 in the low nibble (loads/stores) or a standalone
/// byte (capture descriptors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    /// Offset from the globals base.
    Global,
    /// `fp - idx`.
    Local,
    /// `fp + n_args - idx` (arguments are pushed in declaration order,
    /// so this recovers declaration order).
    Arg,
    /// Slot of the active closure's capture vector.
    Capture,
}

impl Place {
    /// Decode a place selector; anything outside 0..3 is a fault.
    pub fn from_code(code: u8) -> Result<Place> {
        match code {
            0 => Ok(Place::Global),
            1 => Ok(Place::Local),
            2 => Ok(Place::Arg),
            3 => Ok(Place::Capture),
            other => Err(VmError::UnknownPlace(other)),
        }
    }

    /// Name used in addressing diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Place::Global => "global",
            Place::Local => "local",
            Place::Arg => "argument",
            Place::Capture => "capture",
        }
    }
}

/// The thirteen binary operators, in low-nibble order (nibble = op + 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub(crate) fn from_low_nibble(lo: u8) -> Option<BinOp> {
        Some(match lo {
            1 => BinOp::Add,
            2 => BinOp::Sub,
            3 => BinOp::Mul,
            4 => BinOp::Div,
            5 => BinOp::Rem,
            6 => BinOp::Lt,
            7 => BinOp::Le,
            8 => BinOp::Gt,
            9 => BinOp::Ge,
            10 => BinOp::Eq,
            11 => BinOp::Ne,
            12 => BinOp::And,
            13 => BinOp::Or,
            _ => return None,
        })
    }
}

/// Pattern kinds for the `PATT` category (low nibble order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Literal string equality; consumes the candidate string below the
    /// scrutinee.
    StrCmp,
    /// Scrutinee is a string object.
    String,
    /// Scrutinee is an array object.
    Array,
    /// Scrutinee is an s-expression object.
    Sexp,
    /// Scrutinee is any boxed (heap) value.
    Boxed,
    /// Scrutinee is an unboxed immediate.
    Unboxed,
    /// Scrutinee is a closure object.
    Closure,
}

impl Pattern {
    pub(crate) fn from_low_nibble(lo: u8) -> Option<Pattern> {
        Some(match lo {
            0 => Pattern::StrCmp,
            1 => Pattern::String,
            2 => Pattern::Array,
            3 => Pattern::Sexp,
            4 => Pattern::Boxed,
            5 => Pattern::Unboxed,
            6 => Pattern::Closure,
            _ => return None,
        })
    }
}

/// A fully decoded bytecode instruction.
///
/// String operands are byte offsets into the program's string table,
/// already validated against the table size by the decoder. Code
/// addresses are byte offsets into the code segment, validated by the
/// engine when the transfer happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insn {
    // =========================================================================
    // Binary operators (category 0)
    // =========================================================================
    /// Pop b, pop a, push boxed `a op b`.
    Binop(BinOp),

    // =========================================================================
    // Stack and object ops (category 1)
    // =========================================================================
    /// Push a boxed integer constant.
    Const(i32),

    /// Allocate a string from the string table, push its reference.
    String(u32),

    /// Allocate an s-expression: tag name (string table) and arity;
    /// fields are popped in reverse so they land in declaration order.
    Sexp { tag: u32, arity: u32 },

    /// Store indirect (legacy; decodes but does not execute).
    Sti,

    /// Two-shaped store: indexed store through an array, or a direct
    /// store through an `LDA`-produced address.
    Sta,

    /// Unconditional jump to a code offset.
    Jmp(i32),

    /// Tear down the current frame; stops the machine at the outermost
    /// frame.
    End,

    /// Legacy return (decodes but does not execute).
    Ret,

    /// Pop and discard the top operand.
    Drop,

    /// Duplicate the top operand.
    Dup,

    /// Legacy swap (decodes but does not execute).
    Swap,

    /// Pop index, pop collection, push the element.
    Elem,

    // =========================================================================
    // Loads and stores (categories 2..4; place in the low nibble)
    // =========================================================================
    /// Push the value at `place[idx]`.
    Ld(Place, i32),

    /// Push the *address* of `place[idx]`.
    Lda(Place, i32),

    /// Store the top operand (without popping it) into `place[idx]`.
    St(Place, i32),

    // =========================================================================
    // Control and frames (category 5)
    // =========================================================================
    /// Pop; jump if the unboxed value is zero.
    CJmpZ(i32),

    /// Pop; jump if the unboxed value is non-zero.
    CJmpNz(i32),

    /// Open a frame for a plain call.
    Begin { n_args: i32, n_locals: i32 },

    /// Open a frame for a closure call (a closure reference sits just
    /// above the arguments and is popped on return).
    CBegin { n_args: i32, n_locals: i32 },

    /// Allocate a closure for `entry`, capturing each descriptor by
    /// value in the creating frame's addressing context.
    Closure {
        entry: i32,
        captures: Vec<(Place, i32)>,
    },

    /// Call through the closure reference above the `n_args` arguments.
    CallC { n_args: i32 },

    /// Direct call to a code offset.
    Call { entry: i32, n_args: i32 },

    /// Pop a scrutinee, push boxed true iff it is a sexp with this tag
    /// name and field count.
    Tag { name: u32, arity: i32 },

    /// Pop a scrutinee, push boxed true iff it is an array of length n.
    Array(i32),

    /// Pattern-match failure at a source coordinate; fatal.
    Fail { line: i32, col: i32 },

    /// Source line marker; executes as a no-op.
    Line(i32),

    // =========================================================================
    // Pattern checks (category 6)
    // =========================================================================
    /// Pop a scrutinee, push the boxed result of the pattern check.
    Patt(Pattern),

    // =========================================================================
    // Builtin calls (category 7)
    // =========================================================================
    /// Read an integer from the host input, push it boxed.
    CallRead,

    /// Pop an integer, write it to the host output, push boxed 0.
    CallWrite,

    /// Pop a collection, push its boxed length.
    CallLength,

    /// Pop a value, push a string rendering of it.
    CallString,

    /// Build an array from the top n operands.
    CallArray(i32),

    // =========================================================================
    // Termination (category 15)
    // =========================================================================
    /// Stop the machine.
    Stop,
}
