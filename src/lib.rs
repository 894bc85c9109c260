//! Emulator core for the EUCLID-64 machine, a 64-bit von Neumann
//! architecture with a fixed 64-bit instruction word.
//!
//! The crate provides the instruction set and word codec ([`isa`],
//! [`instruction`]), the byte-addressable [`memory`], the sixteen-slot
//! [`registers`] file, the integer and IEEE-754 [`alu`], the downward-growing
//! [`stack`], memory-mapped and port [`io`], the fetch-decode-execute engine
//! ([`cpu`]) and the relocating [`loader`].
//!
//! Assembly and object-file handling live in the sibling `easm` and `eobj`
//! crates; `erun` glues everything to a command line.

pub mod alu;
pub mod constants;
pub mod cpu;
pub mod error;
mod execution;
pub mod instruction;
pub mod io;
pub mod isa;
pub mod loader;
pub mod memory;
pub mod registers;
pub mod stack;


pub use crate::alu::{AluOp, FloatOp};
pub use crate::cpu::{Cpu, CpuState, Segment};
pub use crate::error::Error;
pub use crate::instruction::{make_i, make_j, make_r, make_s, Instruction};
pub use crate::io::IoPorts;
pub use crate::isa::{Flag, Form, Opcode};
pub use crate::loader::{load_image, load_program, overlap, LoadedImage};
pub use crate::memory::Memory;
pub use crate::registers::RegisterFile;
pub use util::Endian;

/// The machine's natural unit: one 64-bit word.
pub type Word = u64;

/// A byte address. The address space is 64-bit; how much of it is backed by
/// memory depends on the buffer handed to the CPU.
pub type Address = u64;

pub type Result<T> = std::result::Result<T, Error>;
