//! Assembler for the [EUCLID-64](../euclid/index.html) machine.
//!
//! The main entry point is [`assemble`], which takes assembly source text
//! and produces a relocatable [`Program`](../eobj/struct.Program.html)
//! (the textual `.bin`/`.map` pair defined by the `eobj` crate) together
//! with a [`SourceMap`] associating each emitted word with its source line.
//!
//! # Language
//!
//! Statements are newline-terminated; `#` starts a comment that runs to the
//! end of the line. A statement is an optional label (`name:`) followed by
//! an instruction or a directive.
//!
//! Registers are written `R0`..`R15`. Immediates are signed decimal or
//! `0x`-prefixed hexadecimal. Float literals (`1.5`, `-2.0e3`) are only
//! meaningful to `MOVI`, which stores them as a single widened to a double
//! at execute time. `[addr]` and `[label]` are memory references for
//! `LD`/`ST`. Bare identifiers in operand position refer to labels and are
//! resolved across the whole file, forward references included.
//!
//! ## Directives
//!
//!  Directive | Effect
//! -----------|--------------------------------------------------------
//! `ORG addr` | sets the location counter (bytes, word-aligned)
//! `DW v, …`  | emits one 64-bit word per value; labels emit the target address
//! `RESW n`   | reserves `n` zeroed words
//! `DB b, "text", …` | emits bytes, packed little-endian into words, zero-padded
//!
//! ## Relocation
//!
//! Label operands are not resolved to absolute addresses by the assembler.
//! Instead the instruction is emitted with a zeroed immediate and a
//! relocation keyed by the label's word index; the loader patches the final
//! address. In the textual binary this appears as `<32 bits>{N}` for
//! instruction immediates and `{N}` for full `DW` words.
//!
//! Parsing is implemented with [pest]; all errors ([`Error`]) carry source
//! spans and render with line/column context.
//!
//! [pest]: https://docs.rs/pest/

mod assembler;
mod encoder;
mod error;
mod int_util;
mod parser;
mod source_map;
mod symbols;


use parser::{AsmParser, Rule};
use pest::iterators::Pair;
use pest::Parser;

pub use encoder::{encode, EncodeError, Operand};
pub use error::Error;
pub use source_map::{SourceMap, SourceMapItem};

pub type Result<T> = std::result::Result<T, Error>;

/// Assembles source text into a relocatable program and its source map.
pub fn assemble(input: &str) -> Result<(eobj::Program, SourceMap)> {
    assembler::assemble_parsed(parse(input)?)
}

fn parse(input: &str) -> Result<Pair<Rule>> {
    Ok(AsmParser::parse(Rule::program, input)
        .map_err(|err| error::classify_parse_error(err, input))?
        .next()
        .unwrap())
}
