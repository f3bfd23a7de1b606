use std::io::{self, Write};

use crate::cell::{Cell, CellRef};
use crate::cpu::{Bus, Cpu, Operation};
use crate::error::StepError;

use super::cartridge::{BankController, Cartridge};
use super::SystemBus;

/// Why [`Machine::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Someone called [`Machine::request_quit`], or the cartridge asked for
    /// a reboot.
    Quit,
    CycleLimit,
}

/// The CPU and everything it is wired to.
pub struct Machine {
    pub cpu: Cpu,
    pub bus: SystemBus,
    quit: bool,
    /// The last step finished a frame.
    frame_done: bool,
}

impl Machine {
    pub fn new(cartridge: Cartridge) -> Self {
        Self::with_boot_rom(cartridge, &[])
    }

    /// Start from a boot ROM image instead of the post-boot defaults. The
    /// machine still has to be [`reset`](Machine::reset) before it runs.
    pub fn with_boot_rom(cartridge: Cartridge, boot: &[u8]) -> Self {
        Self {
            cpu: Cpu::new(),
            bus: SystemBus::new(cartridge, boot),
            quit: false,
            frame_done: false,
        }
    }

    /// Power on. Without a boot ROM the registers and I/O are left the way
    /// the boot ROM would have left them and execution starts at 0x0100.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu = Cpu::new();
        self.cpu.cgb = self.bus.cgb();
        self.quit = false;

        if !self.bus.has_boot_rom() {
            self.cpu.reset_post_boot();
            self.bus.seed_post_boot();
        }
    }

    pub fn resolve(&self, addr: u16) -> CellRef {
        self.bus.resolve(addr)
    }

    /// The cell at `at`, registers included.
    pub fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.cpu.cell(&self.bus, at)
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.cpu.load(&self.bus, self.bus.resolve(addr))
    }

    /// Store through the bus as an untracked scalar write.
    pub fn write(&mut self, addr: u16, value: u8) {
        let at = self.bus.resolve(addr);
        self.cpu.write(&mut self.bus, at, value);
    }

    pub fn decode(&mut self, address: u16) -> Operation {
        self.cpu.decode(&mut self.bus, address)
    }

    pub fn execute(&mut self, op: &Operation) {
        self.cpu.execute(&mut self.bus, op);
    }

    /// One instruction, or four idle cycles while halted. Returns the
    /// cycles consumed.
    pub fn step(&mut self) -> Result<u32, StepError> {
        let start = self.cpu.cycles;
        self.cpu.service_interrupts(&mut self.bus);

        if self.cpu.halted {
            self.cpu.cycles = self.cpu.cycles.wrapping_add(4);
        } else {
            let pc = self.cpu.pc;
            let op = self.decode(pc);
            if op.is_illegal() {
                let opcode = self.read(pc);
                let regs = &self.cpu.regs;
                log::error!(
                    "illegal opcode 0x{opcode:02X} at PC=0x{pc:04X} SP=0x{:04X} AF=0x{:04X} BC=0x{:04X} DE=0x{:04X} HL=0x{:04X}",
                    regs.sp(),
                    regs.af(),
                    regs.bc(),
                    regs.de(),
                    regs.hl(),
                );
                return Err(StepError::IllegalOpcode {
                    opcode,
                    address: pc,
                });
            }
            self.execute(&op);
        }

        self.frame_done = self.bus.update(self.cpu.cycles, self.cpu.speed);
        if self.bus.take_reboot_request() {
            log::info!("cartridge requested a reboot");
            self.quit = true;
        }
        Ok(self.cpu.cycles.wrapping_sub(start) as u32)
    }

    /// Step until the LCD finishes a frame, or a quit is requested. With the
    /// LCD off this runs for one frame's worth of cycles.
    pub fn step_frame(&mut self) -> Result<(), StepError> {
        const CYCLES_PER_FRAME: u64 = 70_224;
        let budget = CYCLES_PER_FRAME * self.cpu.speed.max(1) as u64;
        let start = self.cpu.cycles;
        while !self.quit && self.cpu.cycles.wrapping_sub(start) < budget {
            self.step()?;
            if self.frame_done {
                break;
            }
        }
        Ok(())
    }

    /// Step until a quit request or until `limit` more cycles have run.
    pub fn run(&mut self, limit: Option<u64>) -> Result<StopReason, StepError> {
        let start = self.cpu.cycles;
        loop {
            if self.quit {
                return Ok(StopReason::Quit);
            }
            if limit.is_some_and(|limit| self.cpu.cycles.wrapping_sub(start) >= limit) {
                return Ok(StopReason::CycleLimit);
            }
            self.step()?;
        }
    }

    /// Set bits in IF. A halted CPU wakes on the next step if any of them
    /// are enabled.
    pub fn raise_interrupt(&mut self, mask: u8) {
        self.bus.raise_interrupt(mask);
        if self.bus.interrupt_flag() & self.bus.interrupt_enable() != 0 {
            self.cpu.halted = false;
        }
    }

    pub fn service_interrupt(&mut self, vector: u16) {
        self.cpu.service_interrupt(&mut self.bus, vector);
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Replace ROM, SRAM and controller. Returns the old cartridge. Origins
    /// recorded against the old arenas stay as plain indices and are looked
    /// up leniently.
    pub fn swap_cartridge(&mut self, cartridge: Cartridge) -> Cartridge {
        log::info!("inserting cartridge \"{}\"", cartridge.header().title);
        let old = self.bus.swap_cartridge(cartridge);
        self.cpu.cgb = self.bus.cgb();
        old
    }

    pub fn install_controller(&mut self, controller: BankController) {
        self.bus.cartridge.install_controller(controller);
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.bus.cartridge
    }

    /// Every byte written to the serial port so far.
    pub fn serial_output(&self) -> &[u8] {
        self.bus.serial.output()
    }

    pub fn dump_instrumentation<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        self.bus.dump_instrumentation(sink)
    }

    /// `bank:pc:opcode:halted` followed by the registers.
    pub fn state_line(&self) -> String {
        let regs = &self.cpu.regs;
        format!(
            "{:02X}:{:04X}:{:02X}:{} AF={:04X} BC={:04X} DE={:04X} HL={:04X} SP={:04X} cycles={}",
            self.bus.rom_bank(),
            self.cpu.pc,
            self.read(self.cpu.pc),
            u8::from(self.cpu.halted),
            regs.af(),
            regs.bc(),
            regs.de(),
            regs.hl(),
            regs.sp(),
            self.cpu.cycles,
        )
    }
}
