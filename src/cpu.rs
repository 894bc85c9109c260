use super::{
    constants, execution, instruction::Instruction, io::IoPorts, isa::Opcode, memory::Memory,
    registers::RegisterFile, Address, Error, Result, Word,
};
use log::{debug, info};
use std::collections::BTreeSet;
use std::io::Write as _;
use std::path::Path;

/// The address range a loaded program occupies, keyed by its name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub start: Address,
    pub end: Address,
    pub name: String,
}

/// Snapshot of the machine state, handed to step observers and used for
/// core dumps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuState {
    pub pc: Address,
    pub ir: Word,
    pub flags: u8,
    pub registers: [Word; constants::REGISTER_COUNT],
    pub stack_pointer: Address,
    pub cycle_count: u64,
    pub running: bool,
    pub step_mode: bool,
}

pub type StepObserver = Box<dyn FnMut(&CpuState)>;

/// The EUCLID-64 processor: one memory buffer, sixteen registers, a flags
/// byte, a downward stack and the fetch-decode-execute loop.
///
/// The CPU is single-threaded and cooperative. Hosts drive it with [`step`]
/// or [`run`], cancel it with [`stop`], and observe it through the I/O
/// callbacks and the optional step observer. Observers and callbacks must
/// not re-enter the CPU.
///
/// [`step`]: Cpu::step
/// [`run`]: Cpu::run
/// [`stop`]: Cpu::stop
pub struct Cpu {
    pub(crate) mem: Memory,
    pub(crate) registers: RegisterFile,
    pub(crate) io: IoPorts,

    pub(crate) pc: Address,
    pub(crate) ir: Word,
    pub(crate) flags: u8,
    pub(crate) sp: Address,

    pub(crate) running: bool,
    pub(crate) cycle_count: u64,
    step_mode: bool,
    observer: Option<StepObserver>,

    pub(crate) exec_addresses: Option<BTreeSet<Address>>,
    pub(crate) segments: Vec<Segment>,
    pub(crate) occupied_words: BTreeSet<Address>,
}

impl Cpu {
    pub fn new(memory_size: usize) -> Cpu {
        Cpu::with_memory(Memory::new(memory_size))
    }

    pub fn with_memory(mem: Memory) -> Cpu {
        let sp = mem.size() as Address;
        Cpu {
            mem,
            registers: RegisterFile::new(),
            io: IoPorts::new(),
            pc: 0,
            ir: 0,
            flags: 0,
            sp,
            running: false,
            cycle_count: 0,
            step_mode: false,
            observer: None,
            exec_addresses: None,
            segments: Vec::new(),
            occupied_words: BTreeSet::new(),
        }
    }

    // === Accessors ===

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    pub fn io(&mut self) -> &mut IoPorts {
        &mut self.io
    }

    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn set_pc(&mut self, pc: Address) {
        self.pc = pc;
    }

    pub fn ir(&self) -> Word {
        self.ir
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    pub fn stack_pointer(&self) -> Address {
        self.sp
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Requests the run loop to stop before the next cycle.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn exec_addresses(&self) -> Option<&BTreeSet<Address>> {
        self.exec_addresses.as_ref()
    }

    /// Restricts fetches to the given address set. Fetching elsewhere skips
    /// forward to the next executable address, or faults if none exists.
    pub fn attach_exec_addresses(&mut self, addresses: BTreeSet<Address>) {
        match &mut self.exec_addresses {
            Some(existing) => existing.extend(addresses),
            None => self.exec_addresses = Some(addresses),
        }
    }

    pub fn state(&self) -> CpuState {
        CpuState {
            pc: self.pc,
            ir: self.ir,
            flags: self.flags,
            registers: self.registers.snapshot(),
            stack_pointer: self.sp,
            cycle_count: self.cycle_count,
            running: self.running,
            step_mode: self.step_mode,
        }
    }

    // === Program placement ===

    /// Copies a raw little-endian image into memory and points PC at it.
    pub fn load_image_bytes(&mut self, image: &[u8], start: Address) -> Result<()> {
        let end = start
            .checked_add(image.len() as Address)
            .filter(|end| *end <= self.mem.size() as Address)
            .ok_or(Error::ProgramTooLarge {
                start,
                len: image.len(),
            })?;

        self.mem.data_mut()[start as usize..end as usize].copy_from_slice(image);
        self.pc = start;
        Ok(())
    }

    // === Fetch-decode-execute ===

    /// Reads the instruction word at PC and advances PC by 8.
    ///
    /// With an executable-address set attached, a PC outside the set first
    /// jumps to the smallest executable address at or above it.
    pub fn fetch(&mut self) -> Result<Word> {
        if let Some(exec) = &self.exec_addresses {
            if !exec.contains(&self.pc) {
                match exec.range(self.pc..).next() {
                    Some(&next) => {
                        debug!("PC {:#010X} not executable, advancing to {:#010X}", self.pc, next);
                        self.pc = next;
                    }
                    None => return Err(Error::NonExecutableFetch { addr: self.pc }),
                }
            }
        }

        let word = self.mem.read_word(self.pc)?;
        self.ir = word;
        self.pc += Address::from(constants::WORD_BYTES);
        Ok(word)
    }

    /// Splits an instruction word into its five fields. Never fails.
    pub fn decode(&self, word: Word) -> Instruction {
        Instruction::decode(word)
    }

    /// Executes one decoded instruction. Returns `false` when the machine
    /// should halt, `true` otherwise.
    pub fn execute(&mut self, instr: &Instruction) -> Result<bool> {
        use Opcode::*;

        let opcode = instr.opcode().ok_or(Error::UnknownOpcode {
            opcode: instr.opcode,
            addr: self.pc.wrapping_sub(Address::from(constants::WORD_BYTES)),
        })?;

        match opcode {
            ADD | SUB | MUL | DIV | AND | OR | XOR | NOT | SHL | SHR | CMP | FADD | FSUB
            | FMUL | FDIV => execution::alu::execute(self, opcode, instr),
            MOVI | LD | ST | ADDI | CP | IN | OUT | INS | OUTS => {
                execution::data_transfer::execute(self, opcode, instr)
            }
            PUSH | POP => execution::stack::execute(self, opcode, instr),
            JMP | JZ | JNZ | JC | JNC | JS | CALL | RET => {
                execution::control_flow::execute(self, opcode, instr)
            }
            NOP => Ok(true),
            HALT => Ok(false),
        }
    }

    /// Runs one full cycle and bumps the cycle counter. In step mode the
    /// observer is invoked synchronously with a state snapshot afterwards.
    pub fn step(&mut self) -> Result<bool> {
        let word = self.fetch()?;
        let instr = self.decode(word);
        let proceed = self.execute(&instr)?;
        self.cycle_count += 1;

        if self.step_mode && self.observer.is_some() {
            let state = self.state();
            if let Some(observer) = &mut self.observer {
                observer(&state);
            }
        }

        Ok(proceed)
    }

    /// Runs until HALT, an error, `max_cycles`, or an external [`stop`].
    ///
    /// [`stop`]: Cpu::stop
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<()> {
        self.running = true;
        let mut cycles = 0u64;

        while self.running {
            if let Some(max) = max_cycles {
                if cycles >= max {
                    info!("cycle limit of {} reached", max);
                    break;
                }
            }

            if !self.step()? {
                self.running = false;
                break;
            }

            cycles += 1;
        }

        self.running = false;
        Ok(())
    }

    pub fn enable_step_mode(&mut self, observer: Option<StepObserver>) {
        self.step_mode = true;
        self.observer = observer;
    }

    pub fn disable_step_mode(&mut self) {
        self.step_mode = false;
        self.observer = None;
    }

    /// Returns the machine to its power-on state: registers, flags, memory,
    /// PC, IR and cycle counter zeroed, SP back at the top of memory, any
    /// executable-address set and segment records dropped.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.ir = 0;
        self.flags = 0;
        self.registers.reset();
        self.sp = self.mem.size() as Address;
        self.mem.clear();
        self.running = false;
        self.cycle_count = 0;
        self.step_mode = false;
        self.observer = None;
        self.exec_addresses = None;
        self.segments.clear();
        self.occupied_words.clear();
        self.io.clear_buffers();
    }

    /// Writes a register/memory snapshot: `<prefix>.regs` as text and
    /// `<prefix>.mem` as the raw buffer.
    pub fn core_dump<P: AsRef<Path>>(&self, prefix: P) -> Result<()> {
        let prefix = prefix.as_ref();

        let mut regs = std::fs::File::create(prefix.with_extension("regs"))?;
        writeln!(regs, "PC  {:#018X}", self.pc)?;
        writeln!(regs, "IR  {:#018X}", self.ir)?;
        writeln!(regs, "SP  {:#018X}", self.sp)?;
        writeln!(regs, "FLG {:#010b}", self.flags)?;
        writeln!(regs, "CYC {}", self.cycle_count)?;
        write!(regs, "{}", self.registers)?;

        self.mem.dump_to_file(prefix.with_extension("mem"))
    }
}
