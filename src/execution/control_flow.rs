use crate::{stack, Address, Cpu, Flag, Instruction, Opcode, Result};

pub(crate) fn execute(cpu: &mut Cpu, opcode: Opcode, instr: &Instruction) -> Result<bool> {
    let target = Address::from(instr.imm32);

    match opcode {
        Opcode::JMP => cpu.pc = target,
        Opcode::JZ => jump_if(cpu, target, Flag::ZERO.read(cpu.flags)),
        Opcode::JNZ => jump_if(cpu, target, !Flag::ZERO.read(cpu.flags)),
        Opcode::JC => jump_if(cpu, target, Flag::CARRY.read(cpu.flags)),
        Opcode::JNC => jump_if(cpu, target, !Flag::CARRY.read(cpu.flags)),
        Opcode::JS => jump_if(cpu, target, Flag::NEGATIVE.read(cpu.flags)),
        Opcode::CALL => {
            // PC already points at the next instruction.
            stack::push(&mut cpu.mem, &mut cpu.sp, cpu.pc)?;
            cpu.pc = target;
        }
        Opcode::RET => {
            cpu.pc = stack::pop(&cpu.mem, &mut cpu.sp)?;
        }
        _ => unreachable!("not a control flow opcode: {}", opcode),
    }

    Ok(true)
}

fn jump_if(cpu: &mut Cpu, target: Address, condition: bool) {
    if condition {
        cpu.pc = target;
    }
}
