//! Relocatable object format for EUCLID-64 programs.
//!
//! An assembled program is a pair of UTF-8 text files: a *binary* (`.bin`)
//! with one 64-bit word per line, and a *memory map* (`.map`) with one record
//! per word. Binary lines come in three shapes:
//!
//! - `[01]{64}`: an absolute word;
//! - `<32 binary digits>{N}`: the high half is fixed, the low 32 bits are
//!   patched with the absolute address of word index `N` at load time;
//! - `{N}`: the whole word becomes the absolute address of word index `N`.
//!
//! Map records are `index,0x<address>,<flag>` with flag 1 for executable
//! words and 0 for data; `#` starts a comment, spaces are tolerated.
//!
//! [`Program::read`] parses and cross-validates both files, which is the
//! linker's job: shape of every line, equal word/record counts, contiguous
//! indices and in-range relocation targets. The legacy `.img` image form
//! lives in [`image`].

pub mod image;


use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub type Word = u64;
pub type Address = u64;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("binary line {line}: malformed word \"{text}\"")]
    BadBinaryLine { line: usize, text: String },

    #[error("map line {line}: malformed record \"{text}\"")]
    BadMapRecord { line: usize, text: String },

    #[error("binary contains no words")]
    EmptyBinary,

    #[error("map contains no records")]
    EmptyMap,

    #[error("binary has {words} words but the map has {entries} records")]
    CountMismatch { words: usize, entries: usize },

    #[error("map indices do not form the contiguous range 0..{len}")]
    NonContiguousIndices { len: usize },

    #[error("relocation references word {target}, but the program has {len} words")]
    BadRelocation { target: usize, len: usize },

    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// One line of the textual binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramWord {
    Absolute(Word),
    /// High 32 bits fixed, low 32 bits patched with the target's address.
    Reloc32 { prefix: u32, target: usize },
    /// Whole word patched with the target's address.
    Reloc64 { target: usize },
}

/// One record of the memory map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapEntry {
    pub index: usize,
    pub address: Address,
    pub executable: bool,
}

/// A word with its relocation already materialized, ready for placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub address: Address,
    pub value: Word,
    pub executable: bool,
}

/// A validated (binary, map) pair.
#[derive(Debug, PartialEq)]
pub struct Program {
    words: Vec<ProgramWord>,
    map: Vec<MapEntry>,
}

impl Program {
    /// Builds a program from parsed parts, running the full linker checks.
    pub fn from(words: Vec<ProgramWord>, map: Vec<MapEntry>) -> Result<Program> {
        validate(&words, &map)?;
        log::debug!("linked program of {} words", words.len());
        Ok(Program { words, map })
    }

    pub fn words(&self) -> &[ProgramWord] {
        &self.words
    }

    pub fn map(&self) -> &[MapEntry] {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Absolute address of the word with the given index.
    pub fn address_of(&self, index: usize) -> Option<Address> {
        self.map
            .iter()
            .find(|entry| entry.index == index)
            .map(|entry| entry.address)
    }

    /// Resolves every relocation against the map and pairs each word with
    /// its placement address and executability.
    pub fn placements(&self) -> Vec<Placement> {
        self.map
            .iter()
            .zip(&self.words)
            .map(|(entry, word)| Placement {
                address: entry.address,
                // Validation guarantees the target index exists.
                value: match *word {
                    ProgramWord::Absolute(value) => value,
                    ProgramWord::Reloc32 { prefix, target } => {
                        let target_addr = self.address_of(target).unwrap();
                        (Word::from(prefix) << 32) | (target_addr & 0xFFFF_FFFF)
                    }
                    ProgramWord::Reloc64 { target } => self.address_of(target).unwrap(),
                },
                executable: entry.executable,
            })
            .collect()
    }

    /// Parses and validates a binary/map pair.
    pub fn read<R: BufRead, M: BufRead>(bin: R, map: M) -> Result<Program> {
        Program::from(parse_bin(bin)?, parse_map(map)?)
    }

    pub fn read_files<P: AsRef<Path>, Q: AsRef<Path>>(bin: P, map: Q) -> Result<Program> {
        Program::read(
            BufReader::new(File::open(bin)?),
            BufReader::new(File::open(map)?),
        )
    }

    pub fn write<W: Write, M: Write>(&self, mut bin: W, mut map: M) -> std::io::Result<()> {
        for word in &self.words {
            match *word {
                ProgramWord::Absolute(value) => writeln!(bin, "{:064b}", value)?,
                ProgramWord::Reloc32 { prefix, target } => {
                    writeln!(bin, "{:032b}{{{}}}", prefix, target)?
                }
                ProgramWord::Reloc64 { target } => writeln!(bin, "{{{}}}", target)?,
            }
        }

        for entry in &self.map {
            writeln!(
                map,
                "{},0x{:08X},{}",
                entry.index,
                entry.address,
                if entry.executable { 1 } else { 0 }
            )?;
        }

        Ok(())
    }

    pub fn write_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        bin: P,
        map: Q,
    ) -> std::io::Result<()> {
        self.write(
            BufWriter::new(File::create(bin)?),
            BufWriter::new(File::create(map)?),
        )
    }
}

/// Parses the textual binary into program words.
pub fn parse_bin<R: BufRead>(reader: R) -> Result<Vec<ProgramWord>> {
    let mut words = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let word = parse_bin_line(text).ok_or_else(|| LinkError::BadBinaryLine {
            line: lineno + 1,
            text: text.to_string(),
        })?;
        words.push(word);
    }

    if words.is_empty() {
        return Err(LinkError::EmptyBinary);
    }

    Ok(words)
}

fn parse_bin_line(text: &str) -> Option<ProgramWord> {
    if let Some(placeholder) = parse_placeholder(text) {
        return Some(ProgramWord::Reloc64 {
            target: placeholder,
        });
    }

    if text.len() == 64 && text.bytes().all(|b| b == b'0' || b == b'1') {
        return Some(ProgramWord::Absolute(Word::from_str_radix(text, 2).ok()?));
    }

    if text.len() > 32 {
        let (prefix, rest) = text.split_at(32);
        if prefix.bytes().all(|b| b == b'0' || b == b'1') {
            if let Some(placeholder) = parse_placeholder(rest) {
                return Some(ProgramWord::Reloc32 {
                    prefix: u32::from_str_radix(prefix, 2).ok()?,
                    target: placeholder,
                });
            }
        }
    }

    None
}

fn parse_placeholder(text: &str) -> Option<usize> {
    let inner = text.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

/// Parses the three-column memory map.
pub fn parse_map<R: BufRead>(reader: R) -> Result<Vec<MapEntry>> {
    let mut entries = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let text = match line.find('#') {
            Some(pos) => &line[..pos],
            None => &line[..],
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let entry = parse_map_record(text).ok_or_else(|| LinkError::BadMapRecord {
            line: lineno + 1,
            text: text.to_string(),
        })?;
        entries.push(entry);
    }

    if entries.is_empty() {
        return Err(LinkError::EmptyMap);
    }

    Ok(entries)
}

fn parse_map_record(text: &str) -> Option<MapEntry> {
    let fields: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .collect();

    if fields.len() != 3 {
        return None;
    }

    let flag = parse_number(fields[2])?;
    if flag > 1 {
        return None;
    }

    Some(MapEntry {
        index: parse_number(fields[0])? as usize,
        address: parse_number(fields[1])?,
        executable: flag == 1,
    })
}

fn parse_number(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// The linker's consistency checks over a parsed binary/map pair.
pub fn validate(words: &[ProgramWord], map: &[MapEntry]) -> Result<()> {
    if words.len() != map.len() {
        return Err(LinkError::CountMismatch {
            words: words.len(),
            entries: map.len(),
        });
    }

    let indices: HashSet<usize> = map.iter().map(|entry| entry.index).collect();
    if indices.len() != map.len() || indices.iter().any(|&i| i >= map.len()) {
        return Err(LinkError::NonContiguousIndices { len: map.len() });
    }

    for word in words {
        let target = match *word {
            ProgramWord::Reloc32 { target, .. } | ProgramWord::Reloc64 { target } => target,
            ProgramWord::Absolute(_) => continue,
        };
        if target >= words.len() {
            return Err(LinkError::BadRelocation {
                target,
                len: words.len(),
            });
        }
    }

    Ok(())
}
