use super::*;
use std::io::Cursor;

const OUT_INT: u32 = constants::MMIO_CONSOLE_INT as u32;
const OUT_CHAR: u32 = constants::MMIO_CONSOLE_CHAR as u32;
const IN_INT: u32 = constants::MMIO_CONSOLE_IN_INT as u32;
const IN_CHAR: u32 = constants::MMIO_CONSOLE_IN_CHAR as u32;

#[test]
fn out_int_reaches_callback() {
    let (_, output) = run_collecting_ints(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 42),
            instr_i!(OUT, 0, 1, 0, OUT_INT),
            halt!(),
        ],
    );

    assert_eq!(output, vec![42]);
}

#[test]
fn out_int_signed_interpretation() {
    let (_, output) = run_collecting_ints(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 0),
            instr_i!(ADDI, 1, 1, 0, (-5i32) as u32),
            instr_i!(OUT, 0, 1, 0, OUT_INT),
            halt!(),
        ],
    );

    assert_eq!(output, vec![-5]);
}

#[test]
fn out_char_writes_low_byte() {
    let mut cpu = cpu_with_program(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 0x4241),
            instr_i!(OUT, 0, 1, 0, OUT_CHAR),
            halt!(),
        ],
    );

    let sink = Rc::new(RefCell::new(String::new()));
    let handle = Rc::clone(&sink);
    cpu.io.set_output_char(move |byte| {
        handle.borrow_mut().push(char::from(byte));
        Ok(())
    });

    cpu.run(Some(100)).unwrap();
    assert_eq!(*sink.borrow(), "A");
}

#[test]
fn out_without_callback_buffers() {
    let mut cpu = cpu_with_program(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 7),
            instr_i!(OUT, 0, 1, 0, OUT_INT),
            halt!(),
        ],
    );

    cpu.run(Some(100)).unwrap();
    assert_eq!(cpu.io().take_ints(), vec![7]);
    assert!(cpu.io().take_ints().is_empty());
}

#[test]
fn out_port_mode() {
    let (_, output) = run_collecting_ints(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 11),
            instr_i!(OUT, 0, 1, 1, 2),
            halt!(),
        ],
    );

    assert_eq!(output, vec![11]);
}

#[test]
fn out_to_low_address_writes_memory() {
    let cpu = run_words(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 5),
            instr_i!(OUT, 0, 1, 0, 256),
            halt!(),
        ],
    );

    assert_eq!(cpu.memory().read_word(256).unwrap(), 5);
}

#[test]
fn in_int_from_callback() {
    let mut cpu = cpu_with_program(
        1024,
        &[instr_i!(IN, 1, 0, 0, IN_INT), halt!()],
    );
    cpu.io.set_input_int(|| Ok(1234));

    cpu.run(Some(100)).unwrap();
    assert_eq!(cpu.registers().read(1), 1234);
}

#[test]
fn in_char_from_callback() {
    let mut cpu = cpu_with_program(
        1024,
        &[instr_i!(IN, 1, 0, 0, IN_CHAR), halt!()],
    );
    cpu.io.set_input_char(|| Ok(b'x'));

    cpu.run(Some(100)).unwrap();
    assert_eq!(cpu.registers().read(1), u64::from(b'x'));
}

#[test]
fn in_without_callback_reads_zero() {
    let cpu = run_words(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 9),
            instr_i!(IN, 1, 0, 0, IN_INT),
            halt!(),
        ],
    );

    assert_eq!(cpu.registers().read(1), 0);
}

#[test]
fn out_int_array_with_separator() {
    // FUNC: subop 1, separator ','.
    let func = (1 << 1) | ((b',' as u16) << 4);
    let mut cpu = cpu_with_program(
        2048,
        &[
            instr_i!(MOVI, 1, 0, 0, 512),
            instr_i!(MOVI, 2, 0, 0, 3),
            instr_i!(ST, 2, 1, 1, 0),
            instr_i!(MOVI, 2, 0, 0, 17),
            instr_i!(ST, 2, 1, 1, 8),
            instr_i!(MOVI, 2, 0, 0, 29),
            instr_i!(ST, 2, 1, 1, 16),
            instr_i!(OUT, 0, 1, func, 3),
            halt!(),
        ],
    );

    cpu.run(Some(100)).unwrap();
    assert_eq!(cpu.io().take_chars(), "3,17,29");
}

#[test]
fn out_int_plain_has_no_terminator() {
    let func = 2 << 1;
    let mut cpu = cpu_with_program(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 5),
            instr_i!(OUT, 0, 1, func, 0),
            instr_i!(OUT, 0, 1, func, 0),
            halt!(),
        ],
    );

    cpu.run(Some(100)).unwrap();
    assert_eq!(cpu.io().take_chars(), "55");
}

#[test]
fn in_int_array_parses_a_line() {
    // FUNC: subop 1, whitespace separation.
    let func = 1 << 1;
    let mut cpu = cpu_with_program(
        2048,
        &[
            instr_i!(MOVI, 1, 0, 0, 512),
            instr_i!(IN, 2, 1, func, 4),
            halt!(),
        ],
    );
    feed_chars(&mut cpu, "10 -3 0x20 junk 5\n");

    cpu.run(Some(100)).unwrap();
    assert_eq!(cpu.registers().read(2), 4);
    assert_eq!(cpu.memory().read_word(512).unwrap(), 10);
    assert_eq!(cpu.memory().read_word(520).unwrap() as i64, -3);
    assert_eq!(cpu.memory().read_word(528).unwrap(), 0x20);
    // Unparsable fields read as zero.
    assert_eq!(cpu.memory().read_word(536).unwrap(), 0);
}

#[test]
fn ins_reads_from_bound_port() {
    let port = constants::FILE_PORT_BASE as u32;
    let mut cpu = cpu_with_program(
        2048,
        &[
            instr_i!(MOVI, 1, 0, 0, 256),
            instr_i!(INS, 1, 0, 0, port),
            halt!(),
        ],
    );
    cpu.io
        .bind_reader(constants::FILE_PORT_BASE, Box::new(Cursor::new(b"hello\n".to_vec())));

    cpu.run(Some(100)).unwrap();
    assert_eq!(
        crate::io::read_string_from_memory(cpu.memory(), 256, constants::STRING_CAP),
        "hello"
    );
    // Null terminator in place.
    assert_eq!(cpu.memory().read_byte(261).unwrap(), 0);
}

#[test]
fn outs_writes_to_bound_port() {
    let port = constants::FILE_PORT_BASE as u32;
    let mut cpu = cpu_with_program(
        2048,
        &[
            instr_i!(MOVI, 1, 0, 0, 256),
            instr_i!(OUTS, 1, 0, 0, port),
            halt!(),
        ],
    );

    crate::io::write_string_to_memory(cpu.memory_mut(), 256, "ping", constants::STRING_CAP).unwrap();

    let sink = Rc::new(RefCell::new(Vec::new()));
    cpu.io.bind_writer(
        constants::FILE_PORT_BASE,
        Box::new(SharedWriter(Rc::clone(&sink))),
    );

    cpu.run(Some(100)).unwrap();
    assert_eq!(&*sink.borrow(), b"ping");
}

#[test]
fn outs_console_port_uses_char_channel() {
    let mut cpu = cpu_with_program(
        2048,
        &[
            instr_i!(MOVI, 1, 0, 0, 256),
            instr_i!(OUTS, 1, 0, 0, OUT_INT),
            halt!(),
        ],
    );
    crate::io::write_string_to_memory(cpu.memory_mut(), 256, "Hi", constants::STRING_CAP).unwrap();

    cpu.run(Some(100)).unwrap();
    assert_eq!(cpu.io().take_chars(), "Hi");
}

#[test]
fn unbound_string_port_degrades_gracefully() {
    let mut cpu = cpu_with_program(
        2048,
        &[
            instr_i!(MOVI, 1, 0, 0, 256),
            instr_i!(OUTS, 1, 0, 0, 0xFFFF_0030),
            instr_i!(INS, 1, 0, 0, 0xFFFF_0030),
            instr_i!(MOVI, 2, 0, 0, 1),
            halt!(),
        ],
    );

    // The run completes despite both ports being unbound.
    cpu.run(Some(100)).unwrap();
    assert_eq!(cpu.registers().read(2), 1);
}

#[test]
fn string_memory_round_trip_respects_cap() {
    let mut mem = Memory::new(64);
    crate::io::write_string_to_memory(&mut mem, 0, "abcdef", 4).unwrap();

    assert_eq!(crate::io::read_string_from_memory(&mem, 0, 64), "abcd");
}

#[test]
fn callback_failure_stops_the_run() {
    let mut cpu = cpu_with_program(
        1024,
        &[
            instr_i!(MOVI, 1, 0, 0, 1),
            instr_i!(OUT, 0, 1, 0, OUT_INT),
            halt!(),
        ],
    );
    cpu.io.set_output_int(|_| {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
    });

    assert!(matches!(cpu.run(Some(100)), Err(Error::Io(_))));
}
