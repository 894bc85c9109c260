use super::{Address, Word};
use std::mem;

pub const BYTE_BYTES: u32 = mem::size_of::<u8>() as u32;
pub const BYTE_WIDTH: u32 = 8;

pub const HALF_BYTES: u32 = mem::size_of::<u16>() as u32;
pub const HALF_WIDTH: u32 = HALF_BYTES * BYTE_WIDTH;

pub const DOUBLE_BYTES: u32 = mem::size_of::<u32>() as u32;
pub const DOUBLE_WIDTH: u32 = DOUBLE_BYTES * BYTE_WIDTH;

pub const WORD_BYTES: u32 = mem::size_of::<Word>() as u32;
pub const WORD_WIDTH: u32 = WORD_BYTES * BYTE_WIDTH;

pub const OPCODE_WIDTH: u32 = 8;
pub const REG_ID_WIDTH: u32 = 4;
pub const FUNC_WIDTH: u32 = 12;
pub const IMM_WIDTH: u32 = 32;

pub const OPCODE_MASK: Word = 0xFF00_0000_0000_0000;
pub const RD_MASK: Word = 0x00F0_0000_0000_0000;
pub const RS1_MASK: Word = 0x000F_0000_0000_0000;
pub const RS2_MASK: Word = 0x0000_F000_0000_0000;
pub const FUNC_MASK: Word = 0x0000_0FFF_0000_0000;
pub const IMM_MASK: Word = 0x0000_0000_FFFF_FFFF;

pub const OPCODE_OFFSET: u32 = 56;
pub const RD_OFFSET: u32 = 52;
pub const RS1_OFFSET: u32 = 48;
pub const RS2_OFFSET: u32 = 44;
pub const FUNC_OFFSET: u32 = 32;
pub const IMM_OFFSET: u32 = 0;

pub const REGISTER_COUNT: usize = 16;

pub const DEFAULT_MEMORY_SIZE: usize = 64 * 1024;

// The MMIO window is decoded by the I/O unit and never backed by the buffer.
pub const MMIO_BASE: Address = 0xFFFF_0000;
pub const MMIO_CONSOLE_CHAR: Address = 0xFFFF_0000;
pub const MMIO_CONSOLE_INT: Address = 0xFFFF_0008;
pub const MMIO_CONSOLE_IN_CHAR: Address = 0xFFFF_0010;
pub const MMIO_CONSOLE_IN_INT: Address = 0xFFFF_0018;

// Ports below this alias the console; anything at or above it may be bound
// to a host file.
pub const FILE_PORT_BASE: Address = 0xFFFF_0020;

pub const PORT_CONSOLE_CHAR: Address = 1;
pub const PORT_CONSOLE_INT: Address = 2;

// FUNC sub-fields of the IN/OUT extended forms.
pub const IO_FUNC_PORT_BIT: u16 = 0x001;
pub const IO_FUNC_SUBOP_OFFSET: u32 = 1;
pub const IO_FUNC_SUBOP_MASK: u16 = 0x7;
pub const IO_FUNC_SEPARATOR_OFFSET: u32 = 4;
pub const IO_FUNC_SEPARATOR_MASK: u16 = 0xFF;

pub const IO_SUBOP_INT_ARRAY: u16 = 1;
pub const IO_SUBOP_INT_PLAIN: u16 = 2;

// Safety caps for string transfer and the array print/parse sub-operations.
pub const STRING_CAP: usize = 1000;
pub const INT_ARRAY_CAP: u32 = 1_000_000;
pub const INPUT_LINE_CAP: usize = 4096;
