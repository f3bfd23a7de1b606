use super::SramSlot;

/// MBC3 with an optional real-time clock.
///
/// The ROM bank register takes all 8 bits and 0 really selects bank 0.
/// 4000-5FFF selects RAM bank 0-3 or, with a clock fitted, one of the five
/// RTC registers (08-0C). The clock registers hold what is written to them
/// and never tick; the latch port at 6000-7FFF is accepted and ignored.
#[derive(Clone, Debug)]
pub struct Mbc3 {
    has_rtc: bool,
    ram_enabled: bool,
    rom_bank: u8,
    ram_select: u8,
}

impl Mbc3 {
    pub(super) fn new(has_rtc: bool) -> Self {
        Self {
            has_rtc,
            ram_enabled: false,
            rom_bank: 1,
            ram_select: 0,
        }
    }

    pub(super) fn has_rtc(&self) -> bool {
        self.has_rtc
    }

    pub(super) fn map_rom(&self, addr: u16) -> u32 {
        if addr < 0x4000 {
            return addr as u32;
        }
        self.rom_bank as u32 * 0x4000 + (addr & 0x3FFF) as u32
    }

    pub(super) fn map_sram(&self, offset: u16) -> SramSlot {
        match self.ram_select {
            0x08..=0x0C if self.has_rtc => SramSlot::Rtc(self.ram_select - 0x08),
            select => SramSlot::Ram((select & 0x03) as u32 * 0x2000 + offset as u32),
        }
    }

    pub(super) fn write_rom(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = value == 0x0A,
            0x2000..=0x3FFF => self.rom_bank = value,
            0x4000..=0x5FFF => self.ram_select = value,
            _ => {}
        }
    }

    pub(super) fn rom_bank_number(&self) -> u32 {
        self.rom_bank as u32
    }

    pub(super) fn sram_enabled(&self) -> bool {
        self.ram_enabled
    }
}
