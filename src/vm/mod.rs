// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! The execution engine.
//!
//! [`Engine`] owns every piece of mutable VM state: the instruction
//! cursor, the work-memory arena (operand stack + globals), the call
//! stack, the active frame registers, and the heap shim. The core loop
//! fetches one instruction at the cursor, dispatches it, and repeats
//! until `STOP`, an `END` that unwinds the outermost frame, or a fault.

pub mod callstack;
pub mod error;
pub mod handlers;
pub mod memory;

use std::io::{self, BufRead, Write};

use crate::bytefile::Bytefile;
use crate::decode::Decoder;
use crate::heap::Heap;
use crate::opcode::{Insn, Place};
use crate::value::{Loc, Value};

pub use callstack::CallStack;
pub use error::{Result, VmError};
pub use memory::Memory;

/// Default work-memory size in words (operand stack + globals).
pub const DEFAULT_MEM_WORDS: usize = 1 << 20;
/// Default call-stack capacity in words.
pub const DEFAULT_CALL_WORDS: usize = 1 << 20;

/// Machine state. `Stopped` and `Faulted` are terminal; the engine
/// never resumes from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Running,
    Stopped,
    Faulted,
}

/// Outcome of dispatching one instruction.
pub(crate) enum ControlFlow {
    Continue,
    Stop,
}

/// The virtual machine.
pub struct Engine<'a> {
    /// The program being executed (read-only).
    bf: &'a Bytefile,
    /// Instruction cursor; its position is the instruction pointer.
    decoder: Decoder<'a>,
    /// Operand stack and globals.
    mem: Memory,
    /// Bookkeeping words for nested calls.
    calls: CallStack,
    /// Heap interface shim.
    heap: Heap,

    // Active frame registers.
    fp: usize,
    n_args: usize,
    n_locals: usize,
    /// Set by `CALL`/`CALLC` for the frame about to open; saved by
    /// `BEGIN` and consulted by `END` to pop the closure reference.
    is_closure: bool,

    state: VmState,

    input: Box<dyn BufRead + 'a>,
    output: Box<dyn Write + 'a>,
}

impl<'a> Engine<'a> {
    /// Create an engine with default memory limits, reading from stdin
    /// and writing to stdout.
    pub fn new(bf: &'a Bytefile) -> Result<Engine<'a>> {
        Self::with_limits(bf, DEFAULT_MEM_WORDS, DEFAULT_CALL_WORDS)
    }

    /// Create an engine with explicit arena sizes (word counts), so
    /// overflow bounds can be exercised without megabyte arenas.
    pub fn with_limits(bf: &'a Bytefile, mem_words: usize, call_words: usize) -> Result<Engine<'a>> {
        let mem = Memory::new(mem_words, bf.global_area())?;
        Ok(Engine {
            bf,
            decoder: Decoder::new(bf.code(), bf.stringtab_size()),
            mem,
            calls: CallStack::new(call_words),
            heap: Heap::new(),
            fp: 0,
            n_args: 0,
            n_locals: 0,
            is_closure: false,
            state: VmState::Running,
            input: Box::new(io::BufReader::new(io::stdin())),
            output: Box::new(io::stdout()),
        })
    }

    /// Replace the host input/output (test and embedding hook).
    pub fn set_io(&mut self, input: Box<dyn BufRead + 'a>, output: Box<dyn Write + 'a>) {
        self.input = input;
        self.output = output;
    }

    /// Run the program to completion. Execution starts at code offset
    /// zero; a fault leaves the machine in the `Faulted` state and is
    /// returned to the caller.
    pub fn run(&mut self) -> Result<()> {
        match self.run_loop() {
            Ok(()) => {
                self.state = VmState::Stopped;
                Ok(())
            }
            Err(e) => {
                self.state = VmState::Faulted;
                Err(e)
            }
        }
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            let insn = self.decoder.next()?;
            match self.execute(insn)? {
                ControlFlow::Continue => {}
                ControlFlow::Stop => return Ok(()),
            }
        }
    }

    fn execute(&mut self, insn: Insn) -> Result<ControlFlow> {
        match insn {
            // Stack and constants - handled inline (simple operations)
            Insn::Const(n) => self.mem.push(Value::boxed(n))?,
            Insn::Drop => {
                self.mem.pop()?;
            }
            Insn::Dup => {
                let v = self.mem.peek()?;
                self.mem.push(v)?;
            }
            Insn::Line(_) => {}

            // Untested legacy operations, faithful to the wire format
            // but not the execution surface.
            Insn::Sti => return Err(VmError::Internal("unsupported instruction STI".into())),
            Insn::Ret => return Err(VmError::Internal("unsupported instruction RET".into())),
            Insn::Swap => return Err(VmError::Internal("unsupported instruction SWAP".into())),

            // Binary operators
            Insn::Binop(op) => self.execute_binop(op)?,

            // Loads and stores
            Insn::Ld(place, idx) => self.execute_ld(place, idx)?,
            Insn::Lda(place, idx) => self.execute_lda(place, idx)?,
            Insn::St(place, idx) => self.execute_st(place, idx)?,
            Insn::Sta => self.execute_sta()?,
            Insn::Elem => self.execute_elem()?,

            // Control flow and frames - may redirect or stop
            Insn::Jmp(target) => self.update_ip(target)?,
            Insn::CJmpZ(target) => self.execute_cjmp(target, false)?,
            Insn::CJmpNz(target) => self.execute_cjmp(target, true)?,
            Insn::Begin { n_args, n_locals } | Insn::CBegin { n_args, n_locals } => {
                self.execute_begin(n_args, n_locals)?;
            }
            Insn::Call { entry, n_args } => self.execute_call(entry, n_args)?,
            Insn::CallC { n_args } => self.execute_callc(n_args)?,
            Insn::Closure { entry, captures } => self.execute_closure(entry, &captures)?,
            Insn::End => return self.execute_end(),
            Insn::Fail { line, col } => return Err(VmError::MatchFailure { line, col }),

            // Pattern matching
            Insn::Patt(kind) => self.execute_patt(kind)?,
            Insn::Tag { name, arity } => self.execute_tag(name, arity)?,
            Insn::Array(n) => self.execute_array_patt(n)?,

            // Object construction and builtins
            Insn::String(pos) => self.execute_string(pos)?,
            Insn::Sexp { tag, arity } => self.execute_sexp(tag, arity)?,
            Insn::CallRead => self.execute_read()?,
            Insn::CallWrite => self.execute_write()?,
            Insn::CallLength => self.execute_length()?,
            Insn::CallString => self.execute_stringify()?,
            Insn::CallArray(n) => self.execute_barray(n)?,

            Insn::Stop => return Ok(ControlFlow::Stop),
        }
        Ok(ControlFlow::Continue)
    }

    // =========================================================================
    // Instruction pointer
    // =========================================================================

    /// Redirect the instruction pointer to a code offset, validating it
    /// against the code bounds.
    pub(crate) fn update_ip(&mut self, target: i32) -> Result<()> {
        if target < 0 {
            return Err(VmError::OutOfBounds { at: 0 });
        }
        self.decoder.seek(target as usize)
    }

    /// Current instruction pointer (offset of the next fetch).
    pub(crate) fn ip(&self) -> usize {
        self.decoder.pos()
    }

    // =========================================================================
    // Place resolution (the addressing rule)
    // =========================================================================

    /// Resolve a place/index pair to a storage location in the current
    /// frame's addressing context.
    pub(crate) fn resolve(&self, place: Place, idx: i32) -> Result<Loc> {
        if idx < 0 {
            return Err(VmError::Addressing {
                kind: place.name(),
                idx,
            });
        }
        let idx = idx as usize;
        match place {
            Place::Global => Ok(Loc::Mem(self.mem.global_addr(idx)?)),
            Place::Local => {
                if idx >= self.n_locals {
                    return Err(VmError::Addressing {
                        kind: "local",
                        idx: idx as i32,
                    });
                }
                Ok(Loc::Mem(self.fp - idx))
            }
            Place::Arg => {
                if idx >= self.n_args {
                    return Err(VmError::Addressing {
                        kind: "argument",
                        idx: idx as i32,
                    });
                }
                Ok(Loc::Mem(self.fp + self.n_args - idx))
            }
            Place::Capture => {
                let clos = self.mem.read(self.fp + self.n_args + 1)?.as_ref()?;
                Ok(Loc::Capture(clos, idx))
            }
        }
    }

    /// Read through a resolved location.
    pub(crate) fn load(&self, loc: Loc) -> Result<Value> {
        match loc {
            Loc::Mem(addr) => self.mem.read(addr),
            Loc::Capture(r, i) => self.heap.get_slot(r, i),
        }
    }

    /// Write through a resolved location.
    pub(crate) fn store(&mut self, loc: Loc, v: Value) -> Result<()> {
        match loc {
            Loc::Mem(addr) => self.mem.write(addr, v),
            Loc::Capture(r, i) => self.heap.set_slot(r, i, v),
        }
    }

    // =========================================================================
    // Inspection (embedders and tests)
    // =========================================================================

    /// Machine state after the last `run`.
    pub fn state(&self) -> VmState {
        self.state
    }

    /// The heap shim, for inspecting objects the program built.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Top of the operand stack, if any (the program's result after a
    /// normal stop).
    pub fn stack_top(&self) -> Option<Value> {
        self.mem.peek().ok()
    }

    /// Current operand-stack depth.
    pub fn stack_depth(&self) -> usize {
        self.mem.depth()
    }

    /// Read a global variable.
    pub fn global(&self, idx: usize) -> Result<Value> {
        let addr = self.mem.global_addr(idx)?;
        self.mem.read(addr)
    }
}
