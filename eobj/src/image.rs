//! Legacy program image (`.img`) support.
//!
//! An image is UTF-8 text with lines of the form
//! `0x<addr>: 0x<word>[, 0x<word>]*`. A line without the leading address
//! continues from where the previous one stopped; `#` starts a comment.
//! Word values must fit in 64 bits. An image may be paired with an `.exec`
//! sidecar listing one executable hex address per line.

use super::{Address, LinkError, Result, Word};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A parsed legacy image: absolute words at absolute addresses.
#[derive(Debug, Default, PartialEq)]
pub struct Image {
    words: Vec<(Address, Word)>,
}

impl Image {
    pub fn words(&self) -> &[(Address, Word)] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Image> {
        let mut words = Vec::new();
        let mut next_address: Option<Address> = None;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let text = strip_comment(&line).trim();
            if text.is_empty() {
                continue;
            }

            let bad = || LinkError::BadBinaryLine {
                line: lineno + 1,
                text: text.to_string(),
            };

            let (mut address, values) = match text.find(':') {
                Some(pos) => {
                    let address = parse_hex(text[..pos].trim()).ok_or_else(bad)?;
                    (address, &text[pos + 1..])
                }
                None => (next_address.ok_or_else(bad)?, text),
            };

            for value in values.split(',') {
                let value = value.trim();
                if value.is_empty() {
                    return Err(bad());
                }
                words.push((address, parse_hex(value).ok_or_else(bad)?));
                address += 8;
            }

            next_address = Some(address);
        }

        if words.is_empty() {
            return Err(LinkError::EmptyBinary);
        }

        Ok(Image { words })
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Image> {
        Image::parse(BufReader::new(File::open(path)?))
    }
}

/// Parses an `.exec` sidecar: one executable address per line.
pub fn parse_exec<R: BufRead>(reader: R) -> Result<BTreeSet<Address>> {
    let mut addresses = BTreeSet::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let text = strip_comment(&line).trim();
        if text.is_empty() {
            continue;
        }

        let address = parse_hex(text).ok_or_else(|| LinkError::BadMapRecord {
            line: lineno + 1,
            text: text.to_string(),
        })?;
        addresses.insert(address);
    }

    Ok(addresses)
}

pub fn read_exec_file<P: AsRef<Path>>(path: P) -> Result<BTreeSet<Address>> {
    parse_exec(BufReader::new(File::open(path)?))
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_hex(text: &str) -> Option<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))?;
    if digits.is_empty() || digits.len() > 16 {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
