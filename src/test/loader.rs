use super::*;
use crate::loader;
use eobj::image::Image;
use eobj::{MapEntry, Program, ProgramWord};
use std::io::Cursor;

fn entry(index: usize, address: Address, executable: bool) -> MapEntry {
    MapEntry {
        index,
        address,
        executable,
    }
}

#[test]
fn absolute_words_land_at_mapped_addresses() {
    let program = Program::from(
        vec![
            ProgramWord::Absolute(nop!()),
            ProgramWord::Absolute(halt!()),
            ProgramWord::Absolute(7),
        ],
        vec![entry(0, 0, true), entry(1, 8, true), entry(2, 64, false)],
    )
    .unwrap();

    let mut cpu = Cpu::new(1024);
    let loaded = loader::load_program(&mut cpu, &program, "demo", None).unwrap();

    assert_eq!(cpu.memory().read_word(0).unwrap(), nop!());
    assert_eq!(cpu.memory().read_word(64).unwrap(), 7);
    assert_eq!(cpu.pc(), 0);
    assert_eq!(loaded.segment.start, 0);
    assert_eq!(loaded.segment.end, 64);
    assert_eq!(loaded.executable_words, 2);

    cpu.run(Some(10)).unwrap();
    assert_eq!(cpu.cycle_count(), 2);
}

#[test]
fn reloc32_patches_low_half() {
    // Word 0 is `LD R1, [word 1]` with a placeholder immediate.
    let ld = instr_i!(LD, 1, 0, 0, 0);
    let program = Program::from(
        vec![
            ProgramWord::Reloc32 {
                prefix: (ld >> 32) as u32,
                target: 2,
            },
            ProgramWord::Absolute(halt!()),
            ProgramWord::Absolute(99),
        ],
        vec![entry(0, 0, true), entry(1, 8, true), entry(2, 16, false)],
    )
    .unwrap();

    let mut cpu = Cpu::new(1024);
    loader::load_program(&mut cpu, &program, "demo", None).unwrap();

    let patched = cpu.memory().read_word(0).unwrap();
    assert_eq!(patched >> 32, ld >> 32);
    assert_eq!(patched & 0xFFFF_FFFF, 16);

    cpu.run(Some(10)).unwrap();
    assert_eq!(cpu.registers().read(1), 99);
}

#[test]
fn reloc64_becomes_target_address() {
    let program = Program::from(
        vec![
            ProgramWord::Absolute(halt!()),
            ProgramWord::Reloc64 { target: 0 },
        ],
        vec![entry(0, 32, true), entry(1, 40, false)],
    )
    .unwrap();

    let mut cpu = Cpu::new(1024);
    loader::load_program(&mut cpu, &program, "demo", None).unwrap();

    assert_eq!(cpu.memory().read_word(40).unwrap(), 32);
    // PC points at the smallest executable address.
    assert_eq!(cpu.pc(), 32);
}

#[test]
fn start_override_wins() {
    let program = Program::from(
        vec![ProgramWord::Absolute(halt!()), ProgramWord::Absolute(halt!())],
        vec![entry(0, 0, true), entry(1, 8, true)],
    )
    .unwrap();

    let mut cpu = Cpu::new(1024);
    loader::load_program(&mut cpu, &program, "demo", Some(8)).unwrap();
    assert_eq!(cpu.pc(), 8);
}

#[test]
fn overlap_reports_colliding_words() {
    let first = Program::from(
        vec![ProgramWord::Absolute(halt!()), ProgramWord::Absolute(1)],
        vec![entry(0, 0, true), entry(1, 8, false)],
    )
    .unwrap();
    let second = Program::from(
        vec![ProgramWord::Absolute(halt!()), ProgramWord::Absolute(2)],
        vec![entry(0, 8, true), entry(1, 16, false)],
    )
    .unwrap();

    let mut cpu = Cpu::new(1024);
    loader::load_program(&mut cpu, &first, "a", None).unwrap();

    assert_eq!(loader::overlap(&cpu, &second), vec![8]);

    // The host may still decide to load; the loader itself never refuses.
    loader::load_program(&mut cpu, &second, "b", None).unwrap();
    assert_eq!(cpu.segments().len(), 2);
}

#[test]
fn load_rejects_words_outside_memory() {
    let program = Program::from(
        vec![ProgramWord::Absolute(halt!())],
        vec![entry(0, 4096, true)],
    )
    .unwrap();

    let mut cpu = Cpu::new(64);
    assert!(matches!(
        loader::load_program(&mut cpu, &program, "demo", None),
        Err(Error::AddressOutOfRange { .. })
    ));
}

#[test]
fn exec_sets_merge_across_images() {
    let first = Program::from(
        vec![ProgramWord::Absolute(nop!())],
        vec![entry(0, 0, true)],
    )
    .unwrap();
    let second = Program::from(
        vec![ProgramWord::Absolute(halt!())],
        vec![entry(0, 8, true)],
    )
    .unwrap();

    let mut cpu = Cpu::new(1024);
    loader::load_program(&mut cpu, &first, "a", None).unwrap();
    loader::load_program(&mut cpu, &second, "b", None).unwrap();

    let exec = cpu.exec_addresses().unwrap();
    assert!(exec.contains(&0) && exec.contains(&8));

    cpu.set_pc(0);
    cpu.run(Some(10)).unwrap();
    assert_eq!(cpu.cycle_count(), 2);
}

#[test]
fn legacy_image_with_exec_sidecar() {
    let image_text = format!(
        "# demo image\n0x10: 0x{:016X}, 0x{:016X}\n0x{:016X}\n",
        nop!(),
        nop!(),
        halt!()
    );
    let image = Image::parse(Cursor::new(image_text)).unwrap();
    let exec = eobj::image::parse_exec(Cursor::new("0x10\n0x18\n0x20\n")).unwrap();

    let mut cpu = Cpu::new(1024);
    let loaded = loader::load_image(&mut cpu, &image, Some(exec), "legacy", None).unwrap();

    assert_eq!(loaded.start, 0x10);
    assert_eq!(cpu.memory().read_word(0x20).unwrap(), halt!());

    cpu.run(Some(10)).unwrap();
    assert_eq!(cpu.cycle_count(), 3);
}
