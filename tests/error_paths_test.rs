// ovis-vm - Fault path tests
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

mod common;

use common::*;
use ovis_vm::{Bytefile, Engine, VmError, VmState};

#[test]
fn division_by_zero_faults() {
    let mut a = Asm::new();
    a.const_(5).const_(0).binop(DIV).stop();
    assert!(matches!(run_err(&a), VmError::DivisionByZero));
}

#[test]
fn remainder_by_zero_faults() {
    let mut a = Asm::new();
    a.const_(5).const_(0).binop(REM).stop();
    assert!(matches!(run_err(&a), VmError::DivisionByZero));
}

#[test]
fn fault_leaves_engine_in_faulted_state() {
    let mut a = Asm::new();
    a.const_(1).const_(0).binop(DIV).stop();
    let image = a.build();
    let bf = Bytefile::from_bytes(&image).unwrap();
    let mut engine = Engine::new(&bf).unwrap();
    assert!(engine.run().is_err());
    assert_eq!(engine.state(), VmState::Faulted);
    // Both operands were consumed before the fault fired.
    assert_eq!(engine.stack_depth(), 0);
}

#[test]
fn drop_on_empty_stack_underflows() {
    let mut a = Asm::new();
    a.drop_().stop();
    assert!(matches!(
        run_err(&a),
        VmError::StackUnderflow { stack: "operand" }
    ));
}

#[test]
fn binop_on_empty_stack_underflows() {
    let mut a = Asm::new();
    a.const_(1).binop(ADD).stop();
    assert!(matches!(
        run_err(&a),
        VmError::StackUnderflow { stack: "operand" }
    ));
}

#[test]
fn operand_stack_overflow() {
    let mut a = Asm::new();
    for _ in 0..32 {
        a.const_(1);
    }
    a.stop();
    // Eight words total, none reserved for globals.
    let err = run_with_limits(&a, 8, 64).unwrap_err();
    assert!(matches!(err, VmError::StackOverflow { stack: "operand" }));
}

#[test]
fn call_stack_overflow() {
    let mut a = Asm::new();
    a.begin(0, 0).stop();
    // BEGIN saves four words; a three-word call stack cannot hold them.
    let err = run_with_limits(&a, 1024, 3).unwrap_err();
    assert!(matches!(err, VmError::StackOverflow { stack: "call" }));
}

#[test]
fn deep_recursion_overflows_the_call_stack() {
    let mut a = Asm::new();
    let top = a.here();
    a.begin(0, 0);
    let fix = a.call(0, 0);
    a.end();
    a.patch_int(fix, top);
    let err = run_with_limits(&a, 4096, 64).unwrap_err();
    assert!(matches!(err, VmError::StackOverflow { stack: "call" }));
}

#[test]
fn invalid_opcode_reports_both_nibbles() {
    let mut a = Asm::new();
    a.raw_byte(0x8f);
    match run_err(&a) {
        VmError::InvalidOpcode { hi, lo } => {
            assert_eq!(hi, 8);
            assert_eq!(lo, 0xf);
        }
        other => panic!("expected InvalidOpcode, got {other}"),
    }
}

#[test]
fn unknown_place_designator_faults() {
    let mut a = Asm::new();
    a.raw_byte(0x24).raw_int(0); // LD with place code 4
    assert!(matches!(run_err(&a), VmError::UnknownPlace(4)));
}

#[test]
fn string_offset_past_table_end_faults() {
    let mut a = Asm::new();
    a.string_lit(100).stop(); // empty string table
    assert!(matches!(run_err(&a), VmError::StringIndex(100)));
}

#[test]
fn jump_past_code_end_faults() {
    let mut a = Asm::new();
    a.jmp(10_000);
    assert!(matches!(run_err(&a), VmError::OutOfBounds { .. }));
}

#[test]
fn negative_jump_target_faults() {
    let mut a = Asm::new();
    a.jmp(-4);
    assert!(matches!(run_err(&a), VmError::OutOfBounds { .. }));
}

#[test]
fn running_off_code_end_faults() {
    let mut a = Asm::new();
    a.const_(1); // no STOP
    assert!(matches!(run_err(&a), VmError::OutOfBounds { .. }));
}

#[test]
fn global_index_at_arena_boundary_faults() {
    let mut a = Asm::with_globals(2);
    a.ld(GLOBAL, 2).stop();
    match run_err(&a) {
        VmError::Addressing { kind, idx } => {
            assert_eq!(kind, "global");
            assert_eq!(idx, 2);
        }
        other => panic!("expected Addressing, got {other}"),
    }
}

#[test]
fn last_global_is_addressable() {
    let mut a = Asm::with_globals(2);
    a.const_(5).st(GLOBAL, 1).drop_();
    a.ld(GLOBAL, 1).stop();
    assert_eq!(run_ok(&a), ovis_vm::Value::Int(5));
}

#[test]
fn local_index_beyond_frame_faults() {
    let mut a = Asm::new();
    a.begin(0, 1);
    a.ld(LOCAL, 1).stop();
    assert!(matches!(
        run_err(&a),
        VmError::Addressing { kind: "local", .. }
    ));
}

#[test]
fn argument_index_beyond_frame_faults() {
    let mut a = Asm::new();
    a.begin(0, 0);
    a.ld(ARG, 0).stop();
    assert!(matches!(
        run_err(&a),
        VmError::Addressing { kind: "argument", .. }
    ));
}

#[test]
fn negative_place_index_faults() {
    let mut a = Asm::new();
    a.begin(0, 1);
    a.ld(LOCAL, -1).stop();
    assert!(matches!(run_err(&a), VmError::Addressing { idx: -1, .. }));
}

#[test]
fn fail_raises_match_failure_with_location() {
    let mut a = Asm::new();
    a.const_(0).fail(5, 7);
    match run_err(&a) {
        VmError::MatchFailure { line, col } => {
            assert_eq!(line, 5);
            assert_eq!(col, 7);
        }
        other => panic!("expected MatchFailure, got {other}"),
    }
}

#[test]
fn sexp_tag_with_invalid_character_faults() {
    let mut a = Asm::new();
    let tag = a.string("bad tag");
    a.const_(1).sexp(tag, 1).stop();
    assert!(matches!(run_err(&a), VmError::TagFault(_)));
}

#[test]
fn callc_through_non_closure_faults() {
    let mut a = Asm::new();
    a.const_(0).const_(1).callc(1);
    assert!(matches!(
        run_err(&a),
        VmError::TypeError { expected: "heap reference", .. }
    ));
}

#[test]
fn binop_on_reference_faults() {
    let mut a = Asm::new();
    a.const_(1).barray(1).const_(2).binop(ADD).stop();
    assert!(matches!(run_err(&a), VmError::TypeError { .. }));
}

#[test]
fn sti_is_unsupported() {
    let mut a = Asm::new();
    a.const_(1).const_(2).raw_byte(0x13);
    match run_err(&a) {
        VmError::Internal(msg) => assert!(msg.contains("unsupported")),
        other => panic!("expected Internal, got {other}"),
    }
}

#[test]
fn ret_is_unsupported() {
    let mut a = Asm::new();
    a.raw_byte(0x17);
    match run_err(&a) {
        VmError::Internal(msg) => assert!(msg.contains("unsupported")),
        other => panic!("expected Internal, got {other}"),
    }
}

#[test]
fn swap_is_unsupported() {
    let mut a = Asm::new();
    a.const_(1).const_(2).raw_byte(0x1a);
    match run_err(&a) {
        VmError::Internal(msg) => assert!(msg.contains("unsupported")),
        other => panic!("expected Internal, got {other}"),
    }
}

#[test]
fn read_with_unparsable_input_faults() {
    let mut a = Asm::new();
    a.lread().stop();
    let (result, _) = run_with_io(&a, "not a number\n");
    assert!(matches!(result, Err(VmError::Internal(_))));
}

#[test]
fn truncated_image_is_rejected() {
    assert!(matches!(
        Bytefile::from_bytes(&[1, 2, 3]),
        Err(VmError::FileFault(_))
    ));
}

#[test]
fn image_without_code_is_rejected() {
    // A valid header and string table but zero code bytes.
    let mut image = Vec::new();
    image.extend_from_slice(&1i32.to_le_bytes()); // stringtab size
    image.extend_from_slice(&0i32.to_le_bytes()); // globals
    image.extend_from_slice(&0i32.to_le_bytes()); // publics
    image.extend_from_slice(&0i32.to_le_bytes()); // reserved
    image.push(0); // one-byte string table
    assert!(matches!(
        Bytefile::from_bytes(&image),
        Err(VmError::FileFault(_))
    ));
}

#[test]
fn public_symbol_count_beyond_file_size_is_rejected() {
    // A tiny image declaring i32::MAX public symbols must be rejected
    // from the header alone, without reserving space for the entries.
    let mut image = Vec::new();
    image.extend_from_slice(&0i32.to_le_bytes()); // stringtab size
    image.extend_from_slice(&0i32.to_le_bytes()); // globals
    image.extend_from_slice(&i32::MAX.to_le_bytes()); // publics
    image.extend_from_slice(&0i32.to_le_bytes()); // reserved
    image.push(0xf0);
    assert!(matches!(
        Bytefile::from_bytes(&image),
        Err(VmError::FileFault(_))
    ));
}

#[test]
fn closure_capture_count_beyond_code_size_faults() {
    // CLOSURE declaring i32::MAX captures in a handful of code bytes
    // must fault at decode, before any capture space is reserved.
    let mut a = Asm::new();
    a.raw_byte(0x54).raw_int(0).raw_int(i32::MAX);
    assert!(matches!(run_err(&a), VmError::OutOfBounds { .. }));
}

#[test]
fn sexp_arity_beyond_stack_depth_underflows() {
    let mut a = Asm::new();
    let tag = a.string("cons");
    a.const_(1).sexp(tag, i32::MAX).stop();
    assert!(matches!(
        run_err(&a),
        VmError::StackUnderflow { stack: "operand" }
    ));
}

#[test]
fn barray_length_beyond_stack_depth_underflows() {
    let mut a = Asm::new();
    a.const_(1).barray(i32::MAX).stop();
    assert!(matches!(
        run_err(&a),
        VmError::StackUnderflow { stack: "operand" }
    ));
}

#[test]
fn negative_header_field_is_rejected() {
    let mut image = Vec::new();
    image.extend_from_slice(&(-1i32).to_le_bytes());
    image.extend_from_slice(&0i32.to_le_bytes());
    image.extend_from_slice(&0i32.to_le_bytes());
    image.extend_from_slice(&0i32.to_le_bytes());
    image.push(0xf0);
    assert!(matches!(
        Bytefile::from_bytes(&image),
        Err(VmError::FileFault(_))
    ));
}
