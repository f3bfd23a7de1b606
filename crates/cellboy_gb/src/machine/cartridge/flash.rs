//! SD-card backed flash cartridge.
//!
//! The menu program on these carts talks to the SD card through a small
//! register window at 7F00-7FFF, unlocked by writing E1/E2/E3 to
//! 7F00/7F10/7F20 in order. Sector data and status bytes show up in SRAM.

use super::{CartCommand, SramSlot};

const SECTOR_SIZE: usize = 512;

#[derive(Clone, Debug)]
pub struct FlashCart {
    image: Vec<u8>,
    rom_bank: u8,
    /// Unlock sequence progress, 3 when the command window is open.
    unlock: u8,
    sector: u32,
    sector_count: u8,
}

impl FlashCart {
    /// SRAM window the menu expects to be able to use.
    pub const SRAM_SIZE: usize = 0x2000;

    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            rom_bank: 1,
            unlock: 0,
            sector: 0,
            sector_count: 0,
        }
    }

    pub fn unlocked(&self) -> bool {
        self.unlock == 3
    }

    pub fn sector(&self) -> u32 {
        self.sector
    }

    pub(super) fn map_rom(&self, addr: u16) -> u32 {
        if addr < 0x4000 {
            return addr as u32;
        }
        self.rom_bank as u32 * 0x4000 + (addr & 0x3FFF) as u32
    }

    pub(super) fn map_sram(&self, offset: u16) -> SramSlot {
        SramSlot::Ram(offset as u32)
    }

    pub(super) fn rom_bank_number(&self) -> u32 {
        self.rom_bank as u32
    }

    pub(super) fn write_rom(&mut self, addr: u16, value: u8) -> Option<CartCommand> {
        let unlocked = self.unlocked();
        match addr {
            // The menu writes FF here but then runs from bank 1.
            0x2000 => self.rom_bank = if value == 0xFF { 0x01 } else { value },
            0x7F00 => self.unlock = if value == 0xE1 { 1 } else { 0 },
            0x7F10 => self.unlock = if value == 0xE2 && self.unlock == 1 { 2 } else { 0 },
            0x7F20 => self.unlock = if value == 0xE3 && self.unlock == 2 { 3 } else { 0 },
            0x7FF0 => self.unlock = 0,
            0x7F30 if unlocked => match value {
                1 => return Some(self.sector_data()),
                3 => return Some(CartCommand::status(0x01)),
                _ => {}
            },
            0x7F36 if unlocked => {
                if value == 3 {
                    return Some(CartCommand::status(0x02));
                }
            }
            0x7FB0..=0x7FB3 if unlocked => {
                let shift = 8 * (addr - 0x7FB0) as u32;
                self.sector = (self.sector & !(0xFF << shift)) | ((value as u32) << shift);
            }
            0x7FB4 if unlocked => {
                self.sector_count = value;
                log::debug!(
                    "flash cart: SD sector 0x{:08X} count {}",
                    self.sector,
                    self.sector_count
                );
            }
            0x7FE0 if unlocked => {
                if value == 0x80 {
                    return Some(CartCommand::Reboot);
                }
            }
            _ => log::debug!("flash cart: ROM write 0x{addr:04X}=0x{value:02X}"),
        }
        None
    }

    /// The selected sector, padded with 0xFF past the end of the image.
    fn sector_data(&self) -> CartCommand {
        let start = self.sector as usize * SECTOR_SIZE;
        let bytes = (start..start + SECTOR_SIZE)
            .map(|n| self.image.get(n).copied().unwrap_or(0xFF))
            .collect();
        CartCommand::FillSram { offset: 0, bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlock(cart: &mut FlashCart) {
        assert!(cart.write_rom(0x7F00, 0xE1).is_none());
        assert!(cart.write_rom(0x7F10, 0xE2).is_none());
        assert!(cart.write_rom(0x7F20, 0xE3).is_none());
        assert!(cart.unlocked());
    }

    #[test]
    fn out_of_order_unlock_relocks() {
        let mut cart = FlashCart::new(Vec::new());
        cart.write_rom(0x7F00, 0xE1);
        cart.write_rom(0x7F20, 0xE3);
        assert!(!cart.unlocked());
        assert_eq!(cart.write_rom(0x7FE0, 0x80), None);
    }

    #[test]
    fn sector_read_copies_image_bytes() {
        let mut image = vec![0u8; SECTOR_SIZE * 3];
        image[SECTOR_SIZE * 2] = 0x42;
        image[SECTOR_SIZE * 2 + 511] = 0x99;
        let mut cart = FlashCart::new(image);
        unlock(&mut cart);

        cart.write_rom(0x7FB0, 0x02);
        cart.write_rom(0x7FB1, 0x00);
        cart.write_rom(0x7FB4, 0x01);
        assert_eq!(cart.sector(), 2);

        match cart.write_rom(0x7F30, 0x01) {
            Some(CartCommand::FillSram { offset, bytes }) => {
                assert_eq!(offset, 0);
                assert_eq!(bytes.len(), SECTOR_SIZE);
                assert_eq!(bytes[0], 0x42);
                assert_eq!(bytes[511], 0x99);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn status_and_reboot_commands() {
        let mut cart = FlashCart::new(Vec::new());
        unlock(&mut cart);
        let ready = CartCommand::status(0x01);
        assert_eq!(cart.write_rom(0x7F30, 0x03), Some(ready));
        let busy = CartCommand::status(0x02);
        assert_eq!(cart.write_rom(0x7F36, 0x03), Some(busy));
        assert_eq!(cart.write_rom(0x7FE0, 0x80), Some(CartCommand::Reboot));

        cart.write_rom(0x7FF0, 0xE4);
        assert!(!cart.unlocked());
    }

    #[test]
    fn bank_ff_means_one() {
        let mut cart = FlashCart::new(Vec::new());
        cart.write_rom(0x2000, 0xFF);
        assert_eq!(cart.rom_bank_number(), 1);
        cart.write_rom(0x2000, 0x05);
        assert_eq!(cart.map_rom(0x4001), 5 * 0x4000 + 1);
        assert_eq!(cart.map_rom(0x0123), 0x0123);
    }
}
