// ovis-vm - Test harness
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

//! A small bytecode assembler plus run helpers for the integration
//! tests. The assembler emits the same file image the toolchain
//! produces: four-field header, public-symbol table (empty here),
//! string table, code segment.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::rc::Rc;

use ovis_vm::{Bytefile, Engine, Value, VmError};

/// Binary operator nibbles, in wire order.
pub const ADD: u8 = 1;
pub const SUB: u8 = 2;
pub const MUL: u8 = 3;
pub const DIV: u8 = 4;
pub const REM: u8 = 5;
pub const LT: u8 = 6;
pub const LE: u8 = 7;
pub const GT: u8 = 8;
pub const GE: u8 = 9;
pub const EQ: u8 = 10;
pub const NE: u8 = 11;
pub const AND: u8 = 12;
pub const OR: u8 = 13;

/// Place selectors.
pub const GLOBAL: u8 = 0;
pub const LOCAL: u8 = 1;
pub const ARG: u8 = 2;
pub const CAPTURE: u8 = 3;

/// Pattern kinds.
pub const P_STRCMP: u8 = 0;
pub const P_STRING: u8 = 1;
pub const P_ARRAY: u8 = 2;
pub const P_SEXP: u8 = 3;
pub const P_BOXED: u8 = 4;
pub const P_UNBOXED: u8 = 5;
pub const P_CLOSURE: u8 = 6;

/// Bytecode assembler producing a loadable file image.
#[derive(Default)]
pub struct Asm {
    code: Vec<u8>,
    strings: Vec<u8>,
    globals: u32,
}

impl Asm {
    pub fn new() -> Asm {
        Asm::default()
    }

    pub fn with_globals(n: u32) -> Asm {
        Asm {
            globals: n,
            ..Asm::default()
        }
    }

    /// Intern a NUL-terminated string, returning its table offset.
    pub fn string(&mut self, s: &str) -> u32 {
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
        offset
    }

    /// Current code offset (jump/call target of the next emit).
    pub fn here(&self) -> i32 {
        self.code.len() as i32
    }

    pub fn raw_byte(&mut self, b: u8) -> &mut Asm {
        self.code.push(b);
        self
    }

    pub fn raw_int(&mut self, v: i32) -> &mut Asm {
        self.code.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Patch a previously emitted int operand (forward references).
    pub fn patch_int(&mut self, at: usize, v: i32) {
        self.code[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn int_operand(&mut self, v: i32) -> usize {
        let at = self.code.len();
        self.raw_int(v);
        at
    }

    // --- category 0 ---

    pub fn binop(&mut self, nibble: u8) -> &mut Asm {
        self.raw_byte(nibble)
    }

    // --- category 1 ---

    pub fn const_(&mut self, n: i32) -> &mut Asm {
        self.raw_byte(0x10).raw_int(n)
    }

    pub fn string_lit(&mut self, offset: u32) -> &mut Asm {
        self.raw_byte(0x11).raw_int(offset as i32)
    }

    pub fn sexp(&mut self, tag_offset: u32, arity: i32) -> &mut Asm {
        self.raw_byte(0x12).raw_int(tag_offset as i32).raw_int(arity)
    }

    pub fn sti(&mut self) -> &mut Asm {
        self.raw_byte(0x13)
    }

    pub fn sta(&mut self) -> &mut Asm {
        self.raw_byte(0x14)
    }

    /// Emit `JMP`; returns the operand position for patching.
    pub fn jmp(&mut self, target: i32) -> usize {
        self.raw_byte(0x15);
        self.int_operand(target)
    }

    pub fn end(&mut self) -> &mut Asm {
        self.raw_byte(0x16)
    }

    pub fn drop_(&mut self) -> &mut Asm {
        self.raw_byte(0x18)
    }

    pub fn dup(&mut self) -> &mut Asm {
        self.raw_byte(0x19)
    }

    pub fn elem(&mut self) -> &mut Asm {
        self.raw_byte(0x1b)
    }

    // --- categories 2..4 ---

    pub fn ld(&mut self, place: u8, idx: i32) -> &mut Asm {
        self.raw_byte(0x20 | place).raw_int(idx)
    }

    pub fn lda(&mut self, place: u8, idx: i32) -> &mut Asm {
        self.raw_byte(0x30 | place).raw_int(idx)
    }

    pub fn st(&mut self, place: u8, idx: i32) -> &mut Asm {
        self.raw_byte(0x40 | place).raw_int(idx)
    }

    // --- category 5 ---

    pub fn cjmp_z(&mut self, target: i32) -> usize {
        self.raw_byte(0x50);
        self.int_operand(target)
    }

    pub fn cjmp_nz(&mut self, target: i32) -> usize {
        self.raw_byte(0x51);
        self.int_operand(target)
    }

    pub fn begin(&mut self, n_args: i32, n_locals: i32) -> &mut Asm {
        self.raw_byte(0x52).raw_int(n_args).raw_int(n_locals)
    }

    pub fn cbegin(&mut self, n_args: i32, n_locals: i32) -> &mut Asm {
        self.raw_byte(0x53).raw_int(n_args).raw_int(n_locals)
    }

    /// Emit `CLOSURE`; returns the entry operand position for patching.
    pub fn closure(&mut self, entry: i32, captures: &[(u8, i32)]) -> usize {
        self.raw_byte(0x54);
        let at = self.int_operand(entry);
        self.raw_int(captures.len() as i32);
        for &(place, idx) in captures {
            self.raw_byte(place).raw_int(idx);
        }
        at
    }

    pub fn callc(&mut self, n_args: i32) -> &mut Asm {
        self.raw_byte(0x55).raw_int(n_args)
    }

    /// Emit `CALL`; returns the entry operand position for patching.
    pub fn call(&mut self, entry: i32, n_args: i32) -> usize {
        self.raw_byte(0x56);
        let at = self.int_operand(entry);
        self.raw_int(n_args);
        at
    }

    pub fn tag(&mut self, name_offset: u32, arity: i32) -> &mut Asm {
        self.raw_byte(0x57).raw_int(name_offset as i32).raw_int(arity)
    }

    pub fn array_patt(&mut self, n: i32) -> &mut Asm {
        self.raw_byte(0x58).raw_int(n)
    }

    pub fn fail(&mut self, line: i32, col: u8) -> &mut Asm {
        self.raw_byte(0x59).raw_int(line).raw_byte(col)
    }

    pub fn line(&mut self, n: i32) -> &mut Asm {
        self.raw_byte(0x5a).raw_int(n)
    }

    // --- categories 6, 7, 15 ---

    pub fn patt(&mut self, kind: u8) -> &mut Asm {
        self.raw_byte(0x60 | kind)
    }

    pub fn lread(&mut self) -> &mut Asm {
        self.raw_byte(0x70)
    }

    pub fn lwrite(&mut self) -> &mut Asm {
        self.raw_byte(0x71)
    }

    pub fn llength(&mut self) -> &mut Asm {
        self.raw_byte(0x72)
    }

    pub fn lstring(&mut self) -> &mut Asm {
        self.raw_byte(0x73)
    }

    pub fn barray(&mut self, n: i32) -> &mut Asm {
        self.raw_byte(0x74).raw_int(n)
    }

    pub fn stop(&mut self) -> &mut Asm {
        self.raw_byte(0xf0)
    }

    /// Assemble the complete file image.
    pub fn build(&self) -> Vec<u8> {
        let mut image = Vec::new();
        image.extend_from_slice(&(self.strings.len() as i32).to_le_bytes());
        image.extend_from_slice(&(self.globals as i32).to_le_bytes());
        image.extend_from_slice(&0i32.to_le_bytes()); // no public symbols
        image.extend_from_slice(&0i32.to_le_bytes()); // reserved
        image.extend_from_slice(&self.strings);
        image.extend_from_slice(&self.code);
        image
    }
}

/// Shared output sink so tests can read back what the program wrote.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> SharedBuf {
        SharedBuf::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run a program and return the final stack top; panics on any fault.
pub fn run_ok(asm: &Asm) -> Value {
    let image = asm.build();
    let bf = Bytefile::from_bytes(&image).expect("load error");
    let mut engine = Engine::new(&bf).expect("init error");
    engine.run().expect("runtime fault");
    engine.stack_top().expect("empty stack at stop")
}

/// Run a program and return the fault it must produce.
pub fn run_err(asm: &Asm) -> VmError {
    let image = asm.build();
    let bf = Bytefile::from_bytes(&image).expect("load error");
    let mut engine = Engine::new(&bf).expect("init error");
    engine.run().expect_err("expected a fault")
}

/// Run with explicit arena limits (word counts).
pub fn run_with_limits(asm: &Asm, mem_words: usize, call_words: usize) -> Result<Value, VmError> {
    let image = asm.build();
    let bf = Bytefile::from_bytes(&image)?;
    let mut engine = Engine::with_limits(&bf, mem_words, call_words)?;
    engine.run()?;
    engine
        .stack_top()
        .ok_or_else(|| VmError::Internal("empty stack at stop".into()))
}

/// Run feeding `input` to the read builtin; returns the stack top and
/// everything the program wrote.
pub fn run_with_io(asm: &Asm, input: &str) -> (Result<Value, VmError>, String) {
    let image = asm.build();
    let bf = Bytefile::from_bytes(&image).expect("load error");
    let mut engine = Engine::new(&bf).expect("init error");
    let out = SharedBuf::new();
    engine.set_io(
        Box::new(Cursor::new(input.as_bytes().to_vec())),
        Box::new(out.clone()),
    );
    let result = engine
        .run()
        .map(|()| engine.stack_top().unwrap_or(Value::ZERO));
    (result, out.contents())
}
