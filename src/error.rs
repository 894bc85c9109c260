use super::Address;
use thiserror::Error;

/// Execution-time error set of the machine core.
///
/// Assembly-time errors live in `easm`, object validation errors in `eobj`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("address {addr:#010X}+{width} is outside memory of {size} bytes")]
    AddressOutOfRange {
        addr: Address,
        width: u32,
        size: usize,
    },

    #[error("stack overflow (SP = {sp:#010X})")]
    StackOverflow { sp: Address },

    #[error("stack underflow (SP = {sp:#010X})")]
    StackUnderflow { sp: Address },

    #[error("integer division by zero")]
    DivisionByZero,

    #[error("unknown opcode {opcode:#04X} at {addr:#010X}")]
    UnknownOpcode { opcode: u8, addr: Address },

    #[error("fetch from non-executable address {addr:#010X} with no executable successor")]
    NonExecutableFetch { addr: Address },

    #[error("port {port:#X} has no bound handler")]
    PortUnbound { port: Address },

    #[error("program of {len} bytes does not fit at {start:#010X}")]
    ProgramTooLarge { start: Address, len: usize },

    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// `PortUnbound` degrades gracefully at the instruction level; everything
    /// else aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::PortUnbound { .. })
    }
}
