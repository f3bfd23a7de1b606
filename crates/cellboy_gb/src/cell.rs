//! Byte-sized storage cells.
//!
//! Every addressable byte of the machine (cartridge ROM/SRAM, WRAM, HRAM,
//! VRAM, OAM, hardware registers and the CPU register file) is a [`Cell`].
//! Besides its value a cell carries an identity tag and a usage record that
//! an external disassembly-assist tool consumes after a run. None of this
//! bookkeeping feeds back into emulated behaviour.

use std::io::{self, Write};

use bitflags::bitflags;

use crate::cpu::Reg;

/// Mask selecting the device class of an identity tag.
pub const ID_MASK: u64 = 0xFF << 32;
pub const ID_ROM: u64 = 0x00 << 32;
pub const ID_VRAM: u64 = 0x01 << 32;
pub const ID_SRAM: u64 = 0x02 << 32;
pub const ID_WRAM: u64 = 0x03 << 32;
pub const ID_OAM: u64 = 0x04 << 32;
pub const ID_IO: u64 = 0x05 << 32;
pub const ID_HRAM: u64 = 0x06 << 32;

/// Identity of cells that are never instrumented (CPU registers, open bus, ...).
pub const UNTRACKED: u64 = u64::MAX;

/// Mask over the usage bits of a usage record.
pub const USAGE_MASK: u64 = 0xFF << 40;
/// The active ROM bank is stamped into bits 48..60 of a usage record.
pub const BANK_SHIFT: u32 = 48;
pub const BANK_MASK: u64 = 0xFFF << BANK_SHIFT;

bitflags! {
    /// How a byte has been used by running code.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Usage: u64 {
        const INSTRUCTION = 0x01 << 40;
        const DATA = 0x02 << 40;
        const POINTER_LOW = 0x04 << 40;
        const POINTER_HIGH = 0x08 << 40;
        const WORD_LOW = 0x10 << 40;
        const WORD_HIGH = 0x20 << 40;
    }
}

/// Non-owning reference to a cell somewhere in the machine.
///
/// References are arena indices. A reference may outlive the arena slot it
/// names (e.g. after a cartridge hot-swap shrinks the ROM), in which case
/// lookups simply find nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellRef {
    /// CPU register file.
    Reg(Reg),
    /// Boot ROM byte at 0x0000-0x00FF.
    Boot(u16),
    /// Cartridge ROM: flat arena offset plus the bus address it was resolved
    /// from, so writes reach the bank controller with the right address.
    Rom {
        offset: u32,
        addr: u16,
    },
    /// Cartridge RAM, flat arena offset.
    SRam(u32),
    /// MBC3 real-time-clock register (0..5).
    Rtc(u8),
    /// Video RAM, flat offset over both Color banks.
    VRam(u16),
    /// Work RAM, flat offset over all eight Color banks.
    WRam(u16),
    Oam(u8),
    /// Hardware register at `0xFF00 + n`.
    Io(u8),
    HRam(u8),
    /// Interrupt-enable register at 0xFFFF.
    Ie,
    /// Unmapped: reads 0xFF, writes are discarded.
    OpenBus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub(crate) id: u64,
    pub(crate) value: u8,
    /// Root cell whose value last flowed into this one.
    pub(crate) origin: Option<CellRef>,
    pub(crate) used_as: u64,
}

impl Default for Cell {
    fn default() -> Self {
        Self::untracked()
    }
}

impl Cell {
    pub const fn tracked(id: u64) -> Self {
        Self {
            id,
            value: 0,
            origin: None,
            used_as: 0,
        }
    }

    pub const fn untracked() -> Self {
        Self::tracked(UNTRACKED)
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.value
    }

    #[inline]
    pub fn origin(&self) -> Option<CellRef> {
        self.origin
    }

    #[inline]
    pub fn used_as(&self) -> u64 {
        self.used_as
    }

    #[inline]
    pub fn usage(&self) -> Usage {
        Usage::from_bits_truncate(self.used_as)
    }

    #[inline]
    pub fn is_tracked(&self) -> bool {
        (self.id & ID_MASK) != ID_MASK
    }

    /// OR `usage` into the record and stamp the active ROM bank.
    pub fn mark(&mut self, usage: Usage, rom_bank: u32) {
        self.used_as |= usage.bits();
        let bank = ((rom_bank as u64) << BANK_SHIFT) & BANK_MASK;
        self.used_as = (self.used_as & !BANK_MASK) | bank;
    }

    /// Record that this cell's value was copied into the cell identified by
    /// `destination`. Usage bits and the bank stamp are kept.
    pub(crate) fn record_destination(&mut self, destination: u64) {
        self.used_as = (self.used_as & (USAGE_MASK | BANK_MASK)) | destination;
    }

    pub(crate) fn dump<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        if self.used_as == 0 || self.id == UNTRACKED {
            return Ok(());
        }
        sink.write_all(&self.id.to_le_bytes())?;
        sink.write_all(&self.used_as.to_le_bytes())
    }
}

/// Allocate an arena of `len` cells tagged `class | index`.
pub(crate) fn arena(class: u64, len: usize) -> Vec<Cell> {
    (0..len).map(|n| Cell::tracked(class | n as u64)).collect()
}

pub(crate) fn dump_arena<W: Write>(cells: &[Cell], sink: &mut W) -> io::Result<()> {
    for cell in cells {
        cell.dump(sink)?;
    }
    Ok(())
}
