// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! Runtime faults.
//!
//! Every fault is fatal: there is no recovery construct in the source
//! language, so each one propagates as an error value to the top-level
//! handler, which prints the diagnostic and exits non-zero. Modelling
//! faults as values (rather than aborting in place) keeps the engine
//! testable.

/// A fatal VM fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Bytecode file missing, unreadable or truncated.
    FileFault(String),
    /// Instruction pointer or operand read crossed the code bounds.
    OutOfBounds { at: usize },
    /// String-table reference out of range or unterminated.
    StringIndex(i32),
    /// Unrecognised opcode nibble combination.
    InvalidOpcode { hi: u8, lo: u8 },
    /// Operand or call stack push would exceed its reserved region.
    StackOverflow { stack: &'static str },
    /// Pop on an empty operand or call stack.
    StackUnderflow { stack: &'static str },
    /// Negative index, index past the current frame's argument/local
    /// count, or global index past the globals region.
    Addressing { kind: &'static str, idx: i32 },
    /// Addressing-place code outside Global/Local/Argument/Captured.
    UnknownPlace(u8),
    /// Division or modulo by zero.
    DivisionByZero,
    /// Unrecognised runtime type tag or tag name.
    TagFault(String),
    /// Operand of the wrong shape for an instruction.
    TypeError {
        expected: &'static str,
        got: &'static str,
    },
    /// Pattern-match failure reported by the program (`FAIL`).
    MatchFailure { line: i32, col: i32 },
    /// Broken engine invariant or unsupported legacy instruction.
    Internal(String),
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VmError::FileFault(msg) => write!(f, "bytecode file fault: {}", msg),
            VmError::OutOfBounds { at } => {
                write!(f, "instruction pointer out of code bounds at {}", at)
            }
            VmError::StringIndex(pos) => {
                write!(f, "string-table index {} out of range", pos)
            }
            VmError::InvalidOpcode { hi, lo } => {
                write!(f, "invalid opcode {}-{}", hi, lo)
            }
            VmError::StackOverflow { stack } => write!(f, "{} stack overflow", stack),
            VmError::StackUnderflow { stack } => write!(f, "{} stack underflow", stack),
            VmError::Addressing { kind, idx } => {
                write!(f, "addressing fault: {} index {} out of range", kind, idx)
            }
            VmError::UnknownPlace(code) => write!(f, "unknown addressing place {}", code),
            VmError::DivisionByZero => write!(f, "division by zero"),
            VmError::TagFault(msg) => write!(f, "tag fault: {}", msg),
            VmError::TypeError { expected, got } => {
                write!(f, "type error: expected {}, got {}", expected, got)
            }
            VmError::MatchFailure { line, col } => {
                write!(f, "match failure at {}:{}", line, col)
            }
            VmError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for VmError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, VmError>;
