use super::SramSlot;

/// MBC5: 9-bit ROM bank split over two ports, 4-bit RAM bank. Bank 0 is a
/// valid selection for 4000-7FFF.
#[derive(Clone, Debug)]
pub struct Mbc5 {
    ram_enabled: bool,
    rom_bank: u16,
    ram_bank: u8,
}

impl Default for Mbc5 {
    fn default() -> Self {
        Self {
            ram_enabled: false,
            rom_bank: 1,
            ram_bank: 0,
        }
    }
}

impl Mbc5 {
    pub(super) fn map_rom(&self, addr: u16) -> u32 {
        if addr < 0x4000 {
            return addr as u32;
        }
        self.rom_bank as u32 * 0x4000 + (addr & 0x3FFF) as u32
    }

    pub(super) fn map_sram(&self, offset: u16) -> SramSlot {
        SramSlot::Ram(self.ram_bank as u32 * 0x2000 + offset as u32)
    }

    pub(super) fn write_rom(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = value == 0x0A,
            0x2000..=0x2FFF => self.rom_bank = (self.rom_bank & 0x0100) | value as u16,
            0x3000..=0x3FFF => {
                self.rom_bank = (self.rom_bank & 0x00FF) | (((value & 0x01) as u16) << 8)
            }
            0x4000..=0x5FFF => self.ram_bank = value & 0x0F,
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
