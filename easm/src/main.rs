#[macro_use]
extern crate clap;

use clap::Arg;
use log::info;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum Error {
    Asm(easm::Error),
    Io(std::io::Error, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, path) => {
                writeln!(f, "accessing \"{}\" failed: {}", path.display(), err)
            }
            Error::Asm(err) => write!(f, "{}", err),
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the assembly source file to use")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the binary file to write to"),
        )
        .arg(
            Arg::with_name("map")
                .short("m")
                .long("map")
                .takes_value(true)
                .value_name("MAP")
                .help("Sets the memory map file to write to"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");
    let map = matches.value_of("map");

    if let Err(err) = run(input, output, map) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn run(input: &str, output: Option<&str>, map: Option<&str>) -> Result<(), Error> {
    let input_path = Path::new(input);

    let file = File::open(input_path).map_err(|err| Error::Io(err, input_path.to_owned()))?;
    let mut source = String::new();
    BufReader::new(file)
        .read_to_string(&mut source)
        .map_err(|err| Error::Io(err, input_path.to_owned()))?;

    let (program, _source_map) = easm::assemble(&source).map_err(|err| {
        Error::Asm(match input_path.to_str() {
            Some(path) => err.with_path(path),
            None => err,
        })
    })?;

    let bin_path: PathBuf = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("bin"));
    let map_path: PathBuf = map
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("map"));

    program
        .write_files(&bin_path, &map_path)
        .map_err(|err| Error::Io(err, bin_path.clone()))?;

    info!(
        "assembled {} words to {} and {}",
        program.len(),
        bin_path.display(),
        map_path.display()
    );
    Ok(())
}
