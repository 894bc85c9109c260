use super::*;

#[test]
fn jmp_overwrites_pc() {
    let cpu = run_words(
        1024,
        &[
            instr_j!(JMP, 24),
            instr_i!(MOVI, 1, 0, 0, 1),
            instr_i!(MOVI, 2, 0, 0, 2),
            halt!(),
        ],
    );

    assert_eq!(cpu.registers().read(1), 0);
    assert_eq!(cpu.registers().read(2), 0);
    assert_eq!(cpu.pc(), 32);
}

#[test]
fn jz_taken_on_zero_flag() {
    let cpu = run_words(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 5),
            instr_i!(MOVI, 2, 0, 0, 5),
            instr_r!(CMP, 0, 1, 2),
            instr_j!(JZ, 48),
            instr_i!(MOVI, 3, 0, 0, 1),
            halt!(),
            instr_i!(MOVI, 3, 0, 0, 7),
            halt!(),
        ],
    );

    assert_eq!(cpu.registers().read(3), 7);
}

#[test]
fn jz_falls_through_when_not_zero() {
    let cpu = run_words(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 5),
            instr_i!(MOVI, 2, 0, 0, 6),
            instr_r!(CMP, 0, 1, 2),
            instr_j!(JZ, 48),
            instr_i!(MOVI, 3, 0, 0, 1),
            halt!(),
            instr_i!(MOVI, 3, 0, 0, 7),
            halt!(),
        ],
    );

    assert_eq!(cpu.registers().read(3), 1);
}

#[test]
fn jnz_jc_jnc_js() {
    // CMP 1, 2 leaves NEGATIVE set and ZERO/CARRY clear.
    let cpu = run_words(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 1),  // 0
            instr_i!(MOVI, 2, 0, 0, 2),  // 8
            instr_r!(CMP, 0, 1, 2),      // 16
            instr_j!(JNZ, 40),           // 24
            halt!(),                     // 32
            instr_j!(JNC, 56),           // 40
            halt!(),                     // 48
            instr_j!(JS, 72),            // 56
            halt!(),                     // 64
            instr_i!(MOVI, 4, 0, 0, 9),  // 72
            halt!(),                     // 80
        ],
    );

    assert_eq!(cpu.registers().read(4), 9);
}

#[test]
fn jc_taken_after_carry() {
    // (i64::MIN + 1) added to itself wraps to a positive value, which is
    // exactly the carry condition.
    let cpu = run_words(
        1024,
        &[
            instr_i!(MOVI, 2, 0, 0, 63),     // 0
            instr_i!(MOVI, 1, 0, 0, 1),      // 8
            instr_r!(SHL, 1, 1, 2),          // 16
            instr_i!(ADDI, 1, 1, 0, 1),      // 24
            instr_r!(ADD, 4, 1, 1),          // 32
            instr_j!(JC, 56),                // 40
            halt!(),                         // 48
            instr_i!(MOVI, 5, 0, 0, 1),      // 56
            halt!(),                         // 64
        ],
    );

    assert_eq!(cpu.registers().read(5), 1);
    assert!(Flag::CARRY.read(cpu.flags()));
}

#[test]
fn call_ret_round_trip() {
    let cpu = run_words(
        1024,
        &[
            instr_j!(CALL, 16),
            halt!(),
            instr_i!(MOVI, 1, 0, 0, 42),
            instr_j!(RET, 0),
        ],
    );

    assert_eq!(cpu.registers().read(1), 42);
    assert_eq!(cpu.stack_pointer(), 1024);
    assert_eq!(cpu.cycle_count(), 4);
}

#[test]
fn nested_calls() {
    let cpu = run_words(
        1024,
        &[
            instr_j!(CALL, 16),  // 0
            halt!(),             // 8
            instr_j!(CALL, 32),  // 16: outer
            instr_j!(RET, 0),    // 24
            instr_i!(MOVI, 1, 0, 0, 3), // 32: inner
            instr_j!(RET, 0),    // 40
        ],
    );

    assert_eq!(cpu.registers().read(1), 3);
    assert_eq!(cpu.stack_pointer(), 1024);
}

#[test]
fn ret_with_empty_stack_underflows() {
    let err = run_words_err(1024, &[instr_j!(RET, 0), halt!()]);
    assert!(matches!(err, Error::StackUnderflow { .. }));
}

#[test]
fn push_pop_program_order() {
    let cpu = run_words(
        1024,
        &[
            instr_i!(PUSH, 0, 0, 0, 10),
            instr_i!(PUSH, 0, 0, 0, 20),
            instr_i!(PUSH, 0, 0, 0, 30),
            instr_i!(POP, 0, 0, 0, 0),
            instr_i!(POP, 1, 0, 0, 0),
            instr_i!(POP, 2, 0, 0, 0),
            halt!(),
        ],
    );

    assert_eq!(cpu.registers().read(0), 30);
    assert_eq!(cpu.registers().read(1), 20);
    assert_eq!(cpu.registers().read(2), 10);
    assert_eq!(cpu.stack_pointer(), 1024);
}

#[test]
fn push_register_form() {
    let cpu = run_words(
        1024,
        &[
            instr_i!(MOVI, 5, 0, 0, 123),
            instr_i!(PUSH, 0, 5, 1, 0),
            instr_i!(POP, 6, 0, 0, 0),
            halt!(),
        ],
    );

    assert_eq!(cpu.registers().read(6), 123);
}
