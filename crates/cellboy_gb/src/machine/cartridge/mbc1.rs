use super::SramSlot;

/// MBC1 bank registers.
///
/// BANK1 (2000-3FFF) holds 5 bits and never reads 0. BANK2 (4000-5FFF)
/// holds 2 bits that always feed ROM bank bits 5-6 for 4000-7FFF. With
/// MODE set they also select the 0000-3FFF bank and the RAM bank.
#[derive(Clone, Debug)]
pub struct Mbc1 {
    ram_enabled: bool,
    bank1: u8,
    bank2: u8,
    mode: bool,
}

impl Default for Mbc1 {
    fn default() -> Self {
        Self {
            ram_enabled: false,
            bank1: 1,
            bank2: 0,
            mode: false,
        }
    }
}

impl Mbc1 {
    pub(super) fn map_rom(&self, addr: u16) -> u32 {
        let offset = (addr & 0x3FFF) as u32;
        if addr < 0x4000 {
            if self.mode {
                return ((self.bank2 as u32) << 5) * 0x4000 + offset;
            }
            return offset;
        }
        self.rom_bank_number() * 0x4000 + offset
    }

    pub(super) fn map_sram(&self, offset: u16) -> SramSlot {
        let bank = if self.mode { self.bank2 as u32 } else { 0 };
        SramSlot::Ram(bank * 0x2000 + offset as u32)
    }

    pub(super) fn write_rom(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = (value & 0x0F) == 0x0A,
            0x2000..=0x3FFF => {
                self.bank1 = value & 0x1F;
                if self.bank1 == 0 {
                    self.bank1 = 1;
                }
            }
            0x4000..=0x5FFF => self.bank2 = value & 0x03,
            _ => self.mode = value & 0x01 != 0,
        }
    }

    pub(super) fn rom_bank_number(&self) -> u32 {
        ((self.bank2 as u32) << 5) | self.bank1 as u32
    }

    pub(super) fn sram_enabled(&self) -> bool {
        self.ram_enabled
    }
}
