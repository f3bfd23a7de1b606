//! LR35902 execution engine.
//!
//! The CPU never owns memory. Everything outside the register file is
//! reached through a [`Bus`], which resolves addresses to [`CellRef`]s and
//! applies device effects. Origin and usage bookkeeping for moves between
//! registers and memory happens here, on top of that seam.

mod decode;
mod exec;
mod interrupts;
mod regs;

pub use decode::{Condition, OpKind, Operation};
pub use interrupts::{Interrupt, INTERRUPT_PRIORITY};
pub use regs::{Flag, Reg, Registers};

use crate::cell::{Cell, CellRef, Usage, UNTRACKED};

/// Address space seen by the CPU.
pub trait Bus {
    /// Resolve a 16-bit address to the cell it names. Never fails: unmapped
    /// addresses resolve to [`CellRef::OpenBus`].
    fn resolve(&self, addr: u16) -> CellRef;

    fn cell(&self, at: CellRef) -> Option<&Cell>;

    fn cell_mut(&mut self, at: CellRef) -> Option<&mut Cell>;

    /// Current value of a cell, with device reads applied.
    fn load(&self, at: CellRef) -> u8;

    /// Apply the device write effect. Origin bookkeeping is the caller's job.
    fn store(&mut self, at: CellRef, value: u8);

    /// ROM bank stamped into usage records.
    fn rom_bank(&self) -> u32 {
        1
    }

    /// Told the cycle counter right after an instruction's base cost is
    /// added, before its effects apply.
    fn sync(&mut self, _cycles: u64) {}

    fn interrupt_flag(&self) -> u8;

    fn set_interrupt_flag(&mut self, value: u8);

    fn interrupt_enable(&self) -> u8;

    /// KEY1 bit 0: a STOP will switch speed.
    fn speed_switch_armed(&self) -> bool {
        false
    }

    fn set_double_speed(&mut self, _enabled: bool) {}
}

#[derive(Clone, Debug)]
pub struct Cpu {
    pub regs: Registers,
    pub pc: u16,
    /// Total CPU cycles since reset.
    pub cycles: u64,
    /// 1 at normal speed, 2 in Color double-speed mode.
    pub speed: u8,
    pub ime: bool,
    pub halted: bool,
    pub cgb: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            pc: 0,
            cycles: 0,
            speed: 1,
            ime: false,
            halted: false,
            cgb: false,
        }
    }

    /// Load the register values the boot ROM leaves behind.
    pub fn reset_post_boot(&mut self) {
        self.regs.set(Reg::A, if self.cgb { 0x11 } else { 0x01 });
        self.regs.set(Reg::F, 0xB0);
        self.regs.set_bc(0x0013);
        self.regs.set_de(0x00D8);
        self.regs.set_hl(0x014D);
        self.regs.set_sp(0xFFFE);
        self.pc = 0x0100;
    }

    pub(crate) fn cell<'a, B: Bus>(&'a self, bus: &'a B, at: CellRef) -> Option<&'a Cell> {
        match at {
            CellRef::Reg(reg) => Some(self.regs.cell(reg)),
            _ => bus.cell(at),
        }
    }

    pub(crate) fn cell_mut<'a, B: Bus>(
        &'a mut self,
        bus: &'a mut B,
        at: CellRef,
    ) -> Option<&'a mut Cell> {
        match at {
            CellRef::Reg(reg) => Some(self.regs.cell_mut(reg)),
            _ => bus.cell_mut(at),
        }
    }

    pub fn load<B: Bus>(&self, bus: &B, at: CellRef) -> u8 {
        match at {
            CellRef::Reg(reg) => self.regs.get(reg),
            _ => bus.load(at),
        }
    }

    fn store<B: Bus>(&mut self, bus: &mut B, at: CellRef, value: u8) {
        match at {
            CellRef::Reg(reg) => self.regs.store(reg, value),
            _ => bus.store(at, value),
        }
    }

    /// Scalar write: the cell no longer has a recorded source.
    pub fn write<B: Bus>(&mut self, bus: &mut B, at: CellRef, value: u8) {
        self.store(bus, at, value);
        if let Some(cell) = self.cell_mut(bus, at) {
            cell.origin = None;
        }
    }

    /// Copy `src` into `dst`, linking `dst` to the root of `src`'s origin
    /// chain and recording `dst`'s identity in that root's usage.
    pub fn write_from<B: Bus>(&mut self, bus: &mut B, dst: CellRef, src: CellRef) {
        let value = self.load(bus, src);
        self.store(bus, dst, value);

        let root = self.cell(bus, src).and_then(Cell::origin).unwrap_or(src);
        let dst_id = self.cell(bus, dst).map_or(UNTRACKED, Cell::id);
        if let Some(cell) = self.cell_mut(bus, dst) {
            cell.origin = Some(root);
        }
        if dst_id != UNTRACKED {
            if let Some(origin) = self.cell_mut(bus, root) {
                origin.record_destination(dst_id);
            }
        }
    }

    pub fn mark<B: Bus>(&mut self, bus: &mut B, at: CellRef, usage: Usage) {
        let bank = bus.rom_bank();
        if let Some(cell) = self.cell_mut(bus, at) {
            cell.mark(usage, bank);
        }
    }

    /// Forward a mark to the cell `at`'s value came from, if any.
    pub fn mark_origin<B: Bus>(&mut self, bus: &mut B, at: CellRef, usage: Usage) {
        if let Some(origin) = self.cell(bus, at).and_then(Cell::origin) {
            self.mark(bus, origin, usage);
        }
    }

    #[inline]
    pub(crate) fn read8<B: Bus>(&self, bus: &B, addr: u16) -> u8 {
        bus.load(bus.resolve(addr))
    }
}
