use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cellboy_gb::{BankController, Cartridge, FlashCart, Machine, StepError, StopReason};
use typed_builder::TypedBuilder;

#[derive(TypedBuilder, Debug, Clone)]
pub struct RunConfig {
    #[builder(setter(into))]
    pub rom: PathBuf,
    #[builder(default, setter(into))]
    pub boot_rom: Option<PathBuf>,
    /// SD-card image backing the flash-card device.
    #[builder(default, setter(into))]
    pub flash_image: Option<PathBuf>,
    #[builder(default, setter(into))]
    pub instrumentation: Option<PathBuf>,
    #[builder(default)]
    pub cycle_limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stopped(StopReason),
    IllegalOpcode { opcode: u8, address: u16 },
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub serial: Vec<u8>,
    pub state: String,
    pub cycles: u64,
}

impl RunSummary {
    pub fn serial_text(&self) -> String {
        String::from_utf8_lossy(&self.serial).into_owned()
    }
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {what} '{}'", path.display()))
}

/// Build a machine from `config` without running it.
pub fn load(config: &RunConfig) -> Result<Machine> {
    let rom = read_file(&config.rom, "ROM")?;
    let cartridge = Cartridge::from_bytes(&rom)
        .with_context(|| format!("'{}' is not a cartridge image", config.rom.display()))?;

    let header = cartridge.header();
    log::info!(
        "title \"{}\" type 0x{:02X} rom size 0x{:02X} ram size 0x{:02X} color {}",
        header.title,
        header.cartridge_type,
        header.rom_size,
        header.ram_size,
        header.cgb,
    );
    if !header.checksum_ok() {
        log::warn!("header checksum mismatch");
    }
    if let Err(err) = cartridge.check_controller() {
        log::warn!("{err}");
    }

    let mut machine = match &config.boot_rom {
        Some(path) => {
            let boot = read_file(path, "boot ROM")?;
            log::info!("boot ROM '{}' ({} bytes)", path.display(), boot.len());
            Machine::with_boot_rom(cartridge, &boot)
        }
        None => Machine::new(cartridge),
    };
    machine.reset();

    if let Some(path) = &config.flash_image {
        let image = read_file(path, "flash image")?;
        log::info!("flash card backed by '{}'", path.display());
        machine.install_controller(BankController::FlashCart(Box::new(FlashCart::new(image))));
    }

    Ok(machine)
}

fn write_instrumentation(machine: &Machine, path: &Path) -> Result<()> {
    let mut sink = BufWriter::new(File::create(path)?);
    machine.dump_instrumentation(&mut sink)?;
    sink.flush()?;
    Ok(())
}

pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let mut machine = load(config)?;

    let outcome = match machine.run(config.cycle_limit) {
        Ok(reason) => {
            log::info!("stopped: {reason:?}");
            Outcome::Stopped(reason)
        }
        Err(StepError::IllegalOpcode { opcode, address }) => {
            Outcome::IllegalOpcode { opcode, address }
        }
    };

    let state = machine.state_line();
    log::info!("{state}");

    if let Some(path) = &config.instrumentation {
        write_instrumentation(&machine, path)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        log::info!("instrumentation written to '{}'", path.display());
    }

    Ok(RunSummary {
        outcome,
        serial: machine.serial_output().to_vec(),
        state,
        cycles: machine.cpu.cycles,
    })
}
