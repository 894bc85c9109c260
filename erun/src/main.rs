#[macro_use]
extern crate clap;

use clap::{Arg, ArgMatches, SubCommand};
use erun::RunOptions;
use std::path::{Path, PathBuf};

fn run_args() -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name("memory")
            .short("M")
            .long("memory")
            .takes_value(true)
            .value_name("BYTES")
            .default_value("65536")
            .help("Sets the size of the machine's memory"),
        Arg::with_name("start")
            .short("s")
            .long("start")
            .takes_value(true)
            .value_name("ADDRESS")
            .help("Overrides the start address (decimal or 0x hex)"),
        Arg::with_name("max_cycles")
            .short("c")
            .long("max-cycles")
            .takes_value(true)
            .value_name("CYCLES")
            .help("Stops the machine after this many cycles"),
        Arg::with_name("trace")
            .short("t")
            .long("trace")
            .help("Prints a state line after every cycle"),
        Arg::with_name("force")
            .short("f")
            .long("force")
            .help("Loads even when the program overlaps occupied memory"),
        Arg::with_name("dump")
            .short("d")
            .long("dump")
            .takes_value(true)
            .value_name("PREFIX")
            .help("Writes a register/memory core dump on execution errors"),
    ]
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .subcommand(
            SubCommand::with_name("asm")
                .about("Assembles a source file into a .bin/.map pair")
                .arg(
                    Arg::with_name("INPUT")
                        .help("The assembly source file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("OUTPUT")
                        .help("The binary file to write to"),
                )
                .arg(
                    Arg::with_name("map")
                        .short("m")
                        .long("map")
                        .takes_value(true)
                        .value_name("MAP")
                        .help("The memory map file to write to"),
                ),
        )
        .subcommand(
            SubCommand::with_name("run")
                .about("Runs an assembled program (.bin/.map, or a legacy .img)")
                .arg(
                    Arg::with_name("PROGRAM")
                        .help("The .bin file (with its .map next to it) or a .img image")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("map")
                        .short("m")
                        .long("map")
                        .takes_value(true)
                        .value_name("MAP")
                        .help("The memory map file (defaults to PROGRAM with .map)"),
                )
                .arg(
                    Arg::with_name("exec")
                        .short("x")
                        .long("exec")
                        .takes_value(true)
                        .value_name("EXEC")
                        .help("Executable-address sidecar for legacy images"),
                )
                .args(&run_args()),
        )
        .subcommand(
            SubCommand::with_name("asmrun")
                .about("Assembles a source file and runs it immediately")
                .arg(
                    Arg::with_name("INPUT")
                        .help("The assembly source file")
                        .required(true)
                        .index(1),
                )
                .args(&run_args()),
        )
        .get_matches();

    let outcome = match matches.subcommand() {
        ("asm", Some(sub)) => asm(sub),
        ("run", Some(sub)) => run(sub),
        ("asmrun", Some(sub)) => asmrun(sub),
        _ => {
            eprintln!("{}", matches.usage());
            std::process::exit(2);
        }
    };

    if let Err(err) = outcome {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn asm(matches: &ArgMatches) -> Result<(), String> {
    let input = Path::new(matches.value_of("INPUT").unwrap());
    let output = matches.value_of("output").map(Path::new);
    let map = matches.value_of("map").map(Path::new);

    let (bin, map) =
        erun::assemble_file(input, output, map).map_err(|err| err.to_string())?;
    println!("wrote {} and {}", bin.display(), map.display());
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), String> {
    let program = PathBuf::from(matches.value_of("PROGRAM").unwrap());
    let opts = options(matches)?;

    let cpu = if program.extension().map_or(false, |ext| ext == "img") {
        let exec = matches.value_of("exec").map(Path::new);
        erun::run_image_file(&program, exec, &opts)
    } else {
        let map = matches
            .value_of("map")
            .map(PathBuf::from)
            .unwrap_or_else(|| program.with_extension("map"));
        erun::run_files(&program, &map, &opts)
    }
    .map_err(|err| err.to_string())?;

    log::info!("halted after {} cycles", cpu.cycle_count());
    Ok(())
}

fn asmrun(matches: &ArgMatches) -> Result<(), String> {
    let input = Path::new(matches.value_of("INPUT").unwrap());
    let opts = options(matches)?;

    let cpu = erun::run_source_file(input, &opts).map_err(|err| err.to_string())?;
    log::info!("halted after {} cycles", cpu.cycle_count());
    Ok(())
}

fn options(matches: &ArgMatches) -> Result<RunOptions, String> {
    let mem_size = matches
        .value_of("memory")
        .map(parse_number)
        .transpose()?
        .unwrap_or(65536) as usize;

    Ok(RunOptions {
        mem_size,
        start: matches.value_of("start").map(parse_number).transpose()?,
        max_cycles: matches
            .value_of("max_cycles")
            .map(parse_number)
            .transpose()?,
        trace: matches.is_present("trace"),
        force: matches.is_present("force"),
        dump_prefix: matches.value_of("dump").map(PathBuf::from),
    })
}

fn parse_number(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| format!("not a number: \"{}\"", text))
}
