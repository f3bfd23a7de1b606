use super::SramSlot;

/// MBC2: 4-bit ROM bank and 512 half-bytes of built-in RAM.
///
/// Address bit 8 picks the register in 0000-3FFF: set selects the ROM bank,
/// clear is RAM enable.
#[derive(Clone, Debug)]
pub struct Mbc2 {
    ram_enabled: bool,
    rom_bank: u8,
}

impl Default for Mbc2 {
    fn default() -> Self {
        Self {
            ram_enabled: false,
            rom_bank: 1,
        }
    }
}

impl Mbc2 {
    pub(super) const RAM_SIZE: usize = 0x200;

    pub(super) fn map_rom(&self, addr: u16) -> u32 {
        if addr < 0x4000 {
            return addr as u32;
        }
        self.rom_bank as u32 * 0x4000 + (addr & 0x3FFF) as u32
    }

    pub(super) fn map_sram(&self, offset: u16) -> SramSlot {
        SramSlot::Ram((offset & 0x01FF) as u32)
    }

    pub(super) fn write_rom(&mut self, addr: u16, value: u8) {
        if addr >= 0x4000 {
            return;
        }
        if addr & 0x0100 != 0 {
            self.rom_bank = value & 0x0F;
            if self.rom_bank == 0 {
                self.rom_bank = 1;
            }
        } else {
            self.ram_enabled = (value & 0x0F) == 0x0A;
        }
    }

    pub(super) fn rom_bank_number(&self) -> u32 {
        self.rom_bank as u32
    }

    pub(super) fn sram_enabled(&self) -> bool {
        self.ram_enabled
    }
}
