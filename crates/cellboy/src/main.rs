use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cellboy::{Outcome, RunConfig};

const USAGE: &str = "usage: cellboy [-o dump] [-b boot.bin] [-e sdcard.img] [-c cycles] rom.gb";

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<RunConfig> {
    let mut rom = None;
    let mut boot_rom = None;
    let mut flash_image = None;
    let mut instrumentation = None;
    let mut cycle_limit = None;

    while let Some(arg) = args.next() {
        let mut value = || args.next().with_context(|| format!("{arg} needs a value"));
        match arg.as_str() {
            "-o" => instrumentation = Some(value()?),
            "-b" => boot_rom = Some(value()?),
            "-e" => flash_image = Some(value()?),
            "-c" => {
                let cycles = value()?;
                cycle_limit = Some(
                    cycles
                        .parse::<u64>()
                        .with_context(|| format!("bad cycle count '{cycles}'"))?,
                );
            }
            flag if flag.starts_with('-') => bail!("unknown option {flag}"),
            _ if rom.is_some() => bail!("more than one ROM given"),
            _ => rom = Some(arg),
        }
    }

    let Some(rom) = rom else {
        bail!("no ROM given");
    };
    Ok(RunConfig::builder()
        .rom(rom)
        .boot_rom(boot_rom.map(PathBuf::from))
        .flash_image(flash_image.map(PathBuf::from))
        .instrumentation(instrumentation.map(PathBuf::from))
        .cycle_limit(cycle_limit)
        .build())
}

fn print_serial(bytes: &[u8]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()
}

fn main() {
    env_logger::init();

    let config = match parse_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            std::process::exit(2);
        }
    };

    match cellboy::run(&config) {
        Ok(summary) => {
            if let Err(err) = print_serial(&summary.serial) {
                log::warn!("failed to print serial output: {err}");
            }
            if let Outcome::IllegalOpcode { opcode, address } = summary.outcome {
                log::warn!("stopped on illegal opcode 0x{opcode:02X} at 0x{address:04X}");
            }
        }
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("cellboy: {err:#}");
            std::process::exit(1);
        }
    }
}
