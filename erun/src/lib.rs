//! Host glue for the EUCLID-64 core: assembles sources, loads relocatable
//! programs or legacy images into a [`Cpu`], wires console I/O callbacks
//! and drives the run loop. The `erun` binary exposes this as the `asm`,
//! `run` and `asmrun` subcommands.


use euclid::{constants, loader, Address, Cpu, LoadedImage};
use log::{info, warn};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum Error {
    Asm(easm::Error),
    Link(eobj::LinkError),
    Exec(euclid::Error),
    Io(io::Error, PathBuf),
    Overlap(Vec<Address>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Asm(err) => write!(f, "{}", err),
            Error::Link(err) => write!(f, "link error: {}", err),
            Error::Exec(err) => write!(f, "execution error: {}", err),
            Error::Io(err, path) => {
                write!(f, "accessing \"{}\" failed: {}", path.display(), err)
            }
            Error::Overlap(addresses) => {
                write!(
                    f,
                    "program overlaps {} already occupied word(s), first at {:#010X} \
                     (use --force to load anyway)",
                    addresses.len(),
                    addresses[0]
                )
            }
        }
    }
}

impl From<easm::Error> for Error {
    fn from(err: easm::Error) -> Error {
        Error::Asm(err)
    }
}

impl From<eobj::LinkError> for Error {
    fn from(err: eobj::LinkError) -> Error {
        Error::Link(err)
    }
}

impl From<euclid::Error> for Error {
    fn from(err: euclid::Error) -> Error {
        Error::Exec(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Knobs shared by the `run` and `asmrun` paths.
pub struct RunOptions {
    pub mem_size: usize,
    pub start: Option<Address>,
    pub max_cycles: Option<u64>,
    /// Print a state line after every cycle.
    pub trace: bool,
    /// Load even when the image collides with already loaded words.
    pub force: bool,
    /// Write `<prefix>.regs`/`<prefix>.mem` when execution fails.
    pub dump_prefix: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> RunOptions {
        RunOptions {
            mem_size: constants::DEFAULT_MEMORY_SIZE,
            start: None,
            max_cycles: None,
            trace: false,
            force: false,
            dump_prefix: None,
        }
    }
}

/// Assembles a source file to its `.bin`/`.map` pair and returns the
/// output paths.
pub fn assemble_file(
    input: &Path,
    output: Option<&Path>,
    map: Option<&Path>,
) -> Result<(PathBuf, PathBuf)> {
    let source = read_source(input)?;

    let (program, _) = easm::assemble(&source).map_err(|err| match input.to_str() {
        Some(path) => Error::Asm(err.with_path(path)),
        None => Error::Asm(err),
    })?;

    let bin_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("bin"));
    let map_path = map
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("map"));

    program
        .write_files(&bin_path, &map_path)
        .map_err(|err| Error::Io(err, bin_path.clone()))?;

    info!(
        "assembled {} words from {}",
        program.len(),
        input.display()
    );
    Ok((bin_path, map_path))
}

/// Loads an assembled source string into an existing CPU, honouring the
/// overlap policy.
pub fn load_source(
    cpu: &mut Cpu,
    source: &str,
    name: &str,
    opts: &RunOptions,
) -> Result<LoadedImage> {
    let (program, _) = easm::assemble(source)?;
    load_checked(cpu, &program, name, opts)
}

fn load_checked(
    cpu: &mut Cpu,
    program: &eobj::Program,
    name: &str,
    opts: &RunOptions,
) -> Result<LoadedImage> {
    let collisions = loader::overlap(cpu, program);
    if !collisions.is_empty() {
        if !opts.force {
            return Err(Error::Overlap(collisions));
        }
        warn!(
            "{}: overwriting {} occupied word(s)",
            name,
            collisions.len()
        );
    }

    Ok(loader::load_program(cpu, program, name, opts.start)?)
}

/// Runs an assembled `.bin`/`.map` pair with console I/O.
pub fn run_files(bin: &Path, map: &Path, opts: &RunOptions) -> Result<Cpu> {
    let program = eobj::Program::read_files(bin, map)?;

    let mut cpu = console_cpu(opts);
    let name = bin
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());
    load_checked(&mut cpu, &program, &name, opts)?;

    execute(&mut cpu, opts)?;
    Ok(cpu)
}

/// Assembles and immediately runs a source file with console I/O.
pub fn run_source_file(input: &Path, opts: &RunOptions) -> Result<Cpu> {
    let source = read_source(input)?;

    let mut cpu = console_cpu(opts);
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());
    load_source(&mut cpu, &source, &name, opts)?;

    execute(&mut cpu, opts)?;
    Ok(cpu)
}

/// Runs a legacy `.img` image, optionally restricted by an `.exec` sidecar.
pub fn run_image_file(image: &Path, exec: Option<&Path>, opts: &RunOptions) -> Result<Cpu> {
    let image_data = eobj::image::Image::read_file(image)?;
    let exec_set = match exec {
        Some(path) => Some(eobj::image::read_exec_file(path)?),
        None => None,
    };

    let mut cpu = console_cpu(opts);
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    loader::load_image(&mut cpu, &image_data, exec_set, &name, opts.start)?;

    execute(&mut cpu, opts)?;
    Ok(cpu)
}

/// Drives the run loop, tracing and core-dumping as configured.
pub fn execute(cpu: &mut Cpu, opts: &RunOptions) -> Result<()> {
    if opts.trace {
        cpu.enable_step_mode(Some(Box::new(|state: &euclid::CpuState| {
            eprintln!(
                "cycle {:>6}  PC {:#010X}  IR {:#018X}  FLAGS {:#010b}",
                state.cycle_count, state.pc, state.ir, state.flags
            );
        })));
    }

    let result = cpu.run(opts.max_cycles);

    if result.is_err() {
        if let Some(prefix) = &opts.dump_prefix {
            match cpu.core_dump(prefix) {
                Ok(()) => info!(
                    "core dumped to {}.regs / {}.mem",
                    prefix.display(),
                    prefix.display()
                ),
                Err(dump_err) => warn!("writing core dump failed: {}", dump_err),
            }
        }
    }

    result.map_err(Error::from)
}

/// A CPU with the four console callbacks attached: characters and integers
/// go to stdout, input is read from stdin.
pub fn console_cpu(opts: &RunOptions) -> Cpu {
    let mut cpu = Cpu::new(opts.mem_size);

    cpu.io().set_output_char(|byte| {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&[byte])?;
        handle.flush()
    });

    cpu.io().set_output_int(|value| {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", value)
    });

    cpu.io().set_input_char(|| {
        let mut byte = [0u8; 1];
        match io::stdin().read(&mut byte)? {
            0 => Ok(0),
            _ => Ok(byte[0]),
        }
    });

    cpu.io().set_input_int(|| {
        let stdin = io::stdin();
        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        Ok(line.trim().parse().unwrap_or(0))
    });

    cpu
}

fn read_source(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|err| Error::Io(err, path.to_path_buf()))?;
    let mut source = String::new();
    BufReader::new(file)
        .read_to_string(&mut source)
        .map_err(|err| Error::Io(err, path.to_path_buf()))?;
    Ok(source)
}
