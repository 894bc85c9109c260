//! Places validated object programs into a CPU's memory.
//!
//! The linker checks live in `eobj`; this module materializes relocations,
//! writes the words, attaches the executable-address set and records the
//! loaded segment. Whether colliding images may be loaded is the host's
//! decision: [`overlap`] reports collisions, [`load_program`] never refuses
//! on its own.

use super::{Address, Cpu, Result, Segment};
use eobj::image::Image;
use eobj::Program;
use log::info;
use std::collections::BTreeSet;

/// What a successful load did: where the image landed and where execution
/// starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    pub name: String,
    pub start: Address,
    pub segment: Segment,
    pub executable_words: usize,
}

/// Word addresses of `program` that are already occupied by previously
/// loaded images.
pub fn overlap(cpu: &Cpu, program: &Program) -> Vec<Address> {
    program
        .map()
        .iter()
        .map(|entry| entry.address)
        .filter(|address| cpu.occupied_words.contains(address))
        .collect()
}

/// Loads a relocatable program: materializes every word against the map,
/// writes it at its absolute address, merges the executable addresses into
/// the CPU's set and points PC at the smallest executable address (or the
/// explicit override).
pub fn load_program(
    cpu: &mut Cpu,
    program: &Program,
    name: &str,
    start_override: Option<Address>,
) -> Result<LoadedImage> {
    let placements = program.placements();

    let mut min_addr = Address::max_value();
    let mut max_addr = 0;
    let mut exec = BTreeSet::new();

    for placement in &placements {
        cpu.mem.write_word(placement.address, placement.value)?;

        min_addr = min_addr.min(placement.address);
        max_addr = max_addr.max(placement.address);
        cpu.occupied_words.insert(placement.address);
        if placement.executable {
            exec.insert(placement.address);
        }
    }

    let start = match start_override {
        Some(start) => start,
        None => exec.iter().next().copied().unwrap_or(min_addr),
    };
    let executable_words = exec.len();

    cpu.attach_exec_addresses(exec);
    cpu.pc = start;

    let segment = Segment {
        start: min_addr,
        end: max_addr,
        name: name.to_string(),
    };
    cpu.segments.push(segment.clone());

    info!(
        "loaded {}: segment [{:#010X}, {:#010X}], PC = {:#010X}",
        name, min_addr, max_addr, start
    );

    Ok(LoadedImage {
        name: name.to_string(),
        start,
        segment,
        executable_words,
    })
}

/// Loads a legacy absolute image, optionally with an `.exec` sidecar set.
pub fn load_image(
    cpu: &mut Cpu,
    image: &Image,
    exec: Option<BTreeSet<Address>>,
    name: &str,
    start_override: Option<Address>,
) -> Result<LoadedImage> {
    let mut min_addr = Address::max_value();
    let mut max_addr = 0;

    for &(address, value) in image.words() {
        cpu.mem.write_word(address, value)?;
        min_addr = min_addr.min(address);
        max_addr = max_addr.max(address);
        cpu.occupied_words.insert(address);
    }

    let executable_words = exec.as_ref().map_or(0, BTreeSet::len);
    let start = match start_override {
        Some(start) => start,
        None => exec
            .as_ref()
            .and_then(|set| set.iter().next().copied())
            .unwrap_or(min_addr),
    };

    if let Some(exec) = exec {
        cpu.attach_exec_addresses(exec);
    }
    cpu.pc = start;

    let segment = Segment {
        start: min_addr,
        end: max_addr,
        name: name.to_string(),
    };
    cpu.segments.push(segment.clone());

    info!(
        "loaded image {}: segment [{:#010X}, {:#010X}], PC = {:#010X}",
        name, min_addr, max_addr, start
    );

    Ok(LoadedImage {
        name: name.to_string(),
        start,
        segment,
        executable_words,
    })
}
