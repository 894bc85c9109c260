use crate::alu::{self, AluOp};
use crate::{constants, io, Address, Cpu, Error, Instruction, Opcode, Result, Word};
use log::warn;

pub(crate) fn execute(cpu: &mut Cpu, opcode: Opcode, instr: &Instruction) -> Result<bool> {
    match opcode {
        Opcode::MOVI => movi(cpu, instr),
        Opcode::LD => ld(cpu, instr)?,
        Opcode::ST => st(cpu, instr)?,
        Opcode::ADDI => addi(cpu, instr)?,
        Opcode::CP => {
            // Register copy without touching flags.
            let value = cpu.registers.read(instr.rs1);
            cpu.registers.write(instr.rd, value);
        }
        Opcode::IN => input(cpu, instr)?,
        Opcode::OUT => output(cpu, instr)?,
        Opcode::INS => string_in(cpu, instr)?,
        Opcode::OUTS => string_out(cpu, instr)?,
        _ => unreachable!("not a data transfer opcode: {}", opcode),
    }

    Ok(true)
}

fn movi(cpu: &mut Cpu, instr: &Instruction) {
    let value = match instr.func {
        // Immediate, zero-extended.
        0 => Word::from(instr.imm32),
        // Register copy.
        1 => cpu.registers.read(instr.rs1),
        // IMM32 as IEEE-754 single, widened to the double stored in Rd.
        2 => f64::from(f32::from_bits(instr.imm32)).to_bits(),
        _ => Word::from(instr.imm32),
    };
    cpu.registers.write(instr.rd, value);
}

fn effective_address(cpu: &Cpu, instr: &Instruction) -> Address {
    if instr.func == 0 {
        Address::from(instr.imm32)
    } else {
        cpu.registers
            .read(instr.rs1)
            .wrapping_add(instr.imm_signed() as Word)
    }
}

fn ld(cpu: &mut Cpu, instr: &Instruction) -> Result<()> {
    let address = effective_address(cpu, instr);
    let value = cpu.mem.read_word(address)?;
    cpu.registers.write(instr.rd, value);
    Ok(())
}

fn st(cpu: &mut Cpu, instr: &Instruction) -> Result<()> {
    let address = effective_address(cpu, instr);
    let value = cpu.registers.read(instr.rd);
    cpu.mem.write_word(address, value)
}

fn addi(cpu: &mut Cpu, instr: &Instruction) -> Result<()> {
    let operand1 = cpu.registers.read(instr.rs1);
    let operand2 = instr.imm_signed() as Word;

    let (result, flags) = alu::execute(AluOp::Add, operand1, operand2)?;
    cpu.flags = flags;
    cpu.registers.write(instr.rd, result);
    Ok(())
}

fn input(cpu: &mut Cpu, instr: &Instruction) -> Result<()> {
    let subop = (instr.func >> constants::IO_FUNC_SUBOP_OFFSET) & constants::IO_FUNC_SUBOP_MASK;

    let value = if subop == constants::IO_SUBOP_INT_ARRAY {
        let separator = ((instr.func >> constants::IO_FUNC_SEPARATOR_OFFSET)
            & constants::IO_FUNC_SEPARATOR_MASK) as u8;
        let base = cpu.registers.read(instr.rs1);
        let count = cpu
            .io
            .read_int_array(&mut cpu.mem, base, instr.imm32, separator)?;
        Word::from(count)
    } else {
        cpu.io.read_input(&cpu.mem, instr.imm32, instr.func)?
    };

    cpu.registers.write(instr.rd, value);
    Ok(())
}

fn output(cpu: &mut Cpu, instr: &Instruction) -> Result<()> {
    // Both encodings are accepted: the source register is RS1 when present,
    // RD otherwise.
    let source = if instr.rs1 != 0 {
        cpu.registers.read(instr.rs1)
    } else {
        cpu.registers.read(instr.rd)
    };

    cpu.io
        .write_output(&mut cpu.mem, source, instr.imm32, instr.func)
}

fn string_in(cpu: &mut Cpu, instr: &Instruction) -> Result<()> {
    let buffer = cpu.registers.read(instr.rd);
    let port = Address::from(instr.imm32);

    let text = match cpu.io.read_string(port, constants::STRING_CAP) {
        Ok(text) => text,
        Err(err @ Error::PortUnbound { .. }) => {
            warn!("{}", err);
            String::new()
        }
        Err(err) => return Err(err),
    };

    io::write_string_to_memory(&mut cpu.mem, buffer, &text, constants::STRING_CAP)
}

fn string_out(cpu: &mut Cpu, instr: &Instruction) -> Result<()> {
    let base = cpu.registers.read(instr.rd);
    let port = Address::from(instr.imm32);

    let text = io::read_string_from_memory(&cpu.mem, base, constants::STRING_CAP);

    match cpu.io.write_string(&text, port) {
        Ok(()) => Ok(()),
        Err(err @ Error::PortUnbound { .. }) => {
            warn!("{}", err);
            Ok(())
        }
        Err(err) => Err(err),
    }
}
