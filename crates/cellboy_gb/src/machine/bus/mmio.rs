//! FF00-FF7F. Each register is a tracked cell; the match arms below add
//! whatever the hardware does on top of plain storage.

use super::SystemBus;

pub(crate) const P1: u8 = 0x00;
pub(crate) const SB: u8 = 0x01;
pub(crate) const SC: u8 = 0x02;
pub(crate) const DIV: u8 = 0x04;
pub(crate) const TIMA: u8 = 0x05;
pub(crate) const TMA: u8 = 0x06;
pub(crate) const TAC: u8 = 0x07;
pub(crate) const IF: u8 = 0x0F;
pub(crate) const LCDC: u8 = 0x40;
pub(crate) const STAT: u8 = 0x41;
pub(crate) const LY: u8 = 0x44;
pub(crate) const LYC: u8 = 0x45;
pub(crate) const DMA: u8 = 0x46;
pub(crate) const KEY1: u8 = 0x4D;
pub(crate) const VBK: u8 = 0x4F;
pub(crate) const BOOT: u8 = 0x50;
pub(crate) const HDMA5: u8 = 0x55;
pub(crate) const BCPS: u8 = 0x68;
pub(crate) const BCPD: u8 = 0x69;
pub(crate) const OCPS: u8 = 0x6A;
pub(crate) const OCPD: u8 = 0x6B;
pub(crate) const SVBK: u8 = 0x70;

/// Register values the boot ROM leaves behind.
const POST_BOOT: [(u8, u8); 23] = [
    (LCDC, 0x91),
    (0x47, 0xFC),
    (0x48, 0xFF),
    (0x49, 0xFF),
    (0x10, 0x80),
    (0x11, 0xBF),
    (0x12, 0xF3),
    (0x14, 0xBF),
    (0x16, 0x3F),
    (0x17, 0x00),
    (0x19, 0xBF),
    (0x1A, 0x7F),
    (0x1B, 0xFF),
    (0x1C, 0x9F),
    (0x1E, 0xBF),
    (0x20, 0xFF),
    (0x21, 0x00),
    (0x22, 0x00),
    (0x23, 0xBF),
    (0x24, 0x77),
    (0x25, 0xF3),
    (0x26, 0xF1),
    (BOOT, 0x01),
];

/// Whether FF00+n is a register at all. Everything else is open bus.
pub(crate) fn listed(n: u8) -> bool {
    matches!(
        n,
        0x00..=0x02
            | 0x04..=0x07
            | 0x0F
            | 0x10..=0x14
            | 0x16..=0x1E
            | 0x20..=0x26
            | 0x30..=0x3F
            | 0x40..=0x4B
            | 0x4D
            | 0x4F
            | 0x50..=0x55
            | 0x68..=0x6B
            | 0x70
    )
}

impl SystemBus {
    /// Seed the registers as a finished boot ROM would, and unmap it.
    pub(crate) fn seed_post_boot(&mut self) {
        for (n, value) in POST_BOOT {
            self.io[n as usize].value = value;
        }
    }

    pub(super) fn io_load(&self, n: u8) -> u8 {
        let stored = self.io[n as usize].value;
        match n {
            P1 => (stored & 0x30) | 0xCF,
            SC => {
                let fast = if self.cgb { stored & 0x02 } else { 0 };
                let busy = if self.serial.transferring() { 0x80 } else { 0 };
                busy | fast | (stored & 0x01) | 0x7C
            }
            DIV => self.timer.div(self.now),
            TAC => stored | 0xF8,
            IF => stored | 0xE0,
            STAT => stored | 0x80,
            KEY1 if self.cgb => stored | 0x7E,
            KEY1 => 0xFF,
            VBK => stored | 0xFE,
            HDMA5 => 0xFF,
            BCPD => self.bg_palette[(self.io[BCPS as usize].value & 0x3F) as usize],
            OCPD => self.obj_palette[(self.io[OCPS as usize].value & 0x3F) as usize],
            SVBK => stored | 0xF8,
            _ => stored,
        }
    }

    pub(super) fn io_store(&mut self, n: u8, value: u8) {
        let stored = self.io[n as usize].value;
        let next = match n {
            P1 => value & 0x30,
            SC => {
                if value & 0x81 == 0x81 {
                    let sb = self.io[SB as usize].value;
                    self.serial.start(self.now, sb, value, self.cgb);
                }
                value
            }
            DIV => {
                self.timer.reset_div(self.now);
                0
            }
            IF => value & 0x1F,
            STAT => (stored & 0x07) | (value & 0x78),
            LY => stored,
            DMA => {
                self.oam_dma(value);
                value
            }
            KEY1 => (stored & 0x80) | (value & 0x01),
            VBK => value & 0x01,
            // Once unmapped the boot ROM stays unmapped.
            BOOT => stored | u8::from(value != 0),
            HDMA5 => {
                if self.cgb {
                    self.hdma(value);
                }
                0xFF
            }
            BCPD => {
                self.write_palette(BCPS, value);
                value
            }
            OCPD => {
                self.write_palette(OCPS, value);
                value
            }
            SVBK => value & 0x07,
            _ => value,
        };
        self.io[n as usize].value = next;
    }

    fn write_palette(&mut self, select: u8, value: u8) {
        let spec = self.io[select as usize].value;
        let index = (spec & 0x3F) as usize;
        if select == BCPS {
            self.bg_palette[index] = value;
        } else {
            self.obj_palette[index] = value;
        }
        if spec & 0x80 != 0 {
            self.io[select as usize].value = 0x80 | (spec.wrapping_add(1) & 0x3F);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Bus;
    use crate::machine::Cartridge;

    fn bus() -> SystemBus {
        SystemBus::new(Cartridge::empty(), &[])
    }

    fn write(bus: &mut SystemBus, addr: u16, value: u8) {
        let at = bus.resolve(addr);
        bus.store(at, value);
    }

    fn read(bus: &SystemBus, addr: u16) -> u8 {
        bus.load(bus.resolve(addr))
    }

    #[test]
    fn unlisted_registers_are_open_bus() {
        let mut bus = bus();
        for addr in [0xFF03, 0xFF15, 0xFF27, 0xFF4C, 0xFF56, 0xFF7F] {
            write(&mut bus, addr, 0x12);
            assert_eq!(read(&bus, addr), 0xFF, "{addr:04X}");
        }
        assert_eq!(read(&bus, 0xFEA5), 0xFF);
    }

    #[test]
    fn read_masks() {
        let mut bus = bus();
        write(&mut bus, 0xFF00, 0x00);
        assert_eq!(read(&bus, 0xFF00), 0xCF);
        write(&mut bus, 0xFF00, 0x20);
        assert_eq!(read(&bus, 0xFF00), 0xEF);

        write(&mut bus, 0xFF0F, 0x01);
        assert_eq!(read(&bus, 0xFF0F), 0xE1);
        assert_eq!(bus.interrupt_flag(), 0x01);

        write(&mut bus, 0xFF07, 0x05);
        assert_eq!(read(&bus, 0xFF07), 0xFD);
    }

    #[test]
    fn ly_and_stat_low_bits_are_read_only() {
        let mut bus = bus();
        bus.io[LY as usize].value = 0x42;
        bus.io[STAT as usize].value = 0x05;
        write(&mut bus, 0xFF44, 0x00);
        write(&mut bus, 0xFF41, 0xFF);
        assert_eq!(read(&bus, 0xFF44), 0x42);
        assert_eq!(read(&bus, 0xFF41), 0xFD);
    }

    #[test]
    fn div_write_resets_counter() {
        let mut bus = bus();
        bus.sync(256 * 5);
        assert_eq!(read(&bus, 0xFF04), 5);
        write(&mut bus, 0xFF04, 0x99);
        assert_eq!(read(&bus, 0xFF04), 0);
        bus.sync(256 * 7);
        assert_eq!(read(&bus, 0xFF04), 2);
    }

    #[test]
    fn boot_rom_unmap_is_sticky() {
        let mut bus = SystemBus::new(Cartridge::empty(), &[0x31; 0x100]);
        assert_eq!(read(&bus, 0x0000), 0x31);
        write(&mut bus, 0xFF50, 0x01);
        assert_ne!(bus.resolve(0x0000), crate::cell::CellRef::Boot(0));
        write(&mut bus, 0xFF50, 0x00);
        assert_ne!(bus.resolve(0x0000), crate::cell::CellRef::Boot(0));
    }

    #[test]
    fn serial_start_captures_sb() {
        let mut bus = bus();
        write(&mut bus, 0xFF01, b'A');
        write(&mut bus, 0xFF02, 0x81);
        assert_eq!(bus.serial.output(), b"A");
        assert_eq!(read(&bus, 0xFF02) & 0x80, 0x80);

        bus.update(8 * 512, 1);
        assert_eq!(read(&bus, 0xFF02) & 0x80, 0);
        assert_eq!(read(&bus, 0xFF01), 0xFF);
        assert_ne!(bus.interrupt_flag() & 0x08, 0);
    }

    #[test]
    fn key1_only_arm_bit_is_writable() {
        let mut rom = vec![0u8; 0x8000];
        rom[0x143] = 0x80;
        let mut bus = SystemBus::new(Cartridge::from_bytes(&rom).unwrap(), &[]);
        write(&mut bus, 0xFF4D, 0xFF);
        assert_eq!(read(&bus, 0xFF4D), 0x7F);
        assert!(bus.speed_switch_armed());
        bus.set_double_speed(true);
        assert_eq!(read(&bus, 0xFF4D), 0xFE);
        assert!(!bus.speed_switch_armed());
    }

    #[test]
    fn color_palette_auto_increment() {
        let mut rom = vec![0u8; 0x8000];
        rom[0x143] = 0xC0;
        let mut bus = SystemBus::new(Cartridge::from_bytes(&rom).unwrap(), &[]);
        write(&mut bus, 0xFF68, 0xBE);
        write(&mut bus, 0xFF69, 0x11);
        write(&mut bus, 0xFF69, 0x22);
        assert_eq!(read(&bus, 0xFF68), 0x80);
        write(&mut bus, 0xFF68, 0x3E);
        assert_eq!(read(&bus, 0xFF69), 0x11);
        write(&mut bus, 0xFF68, 0x3F);
        assert_eq!(read(&bus, 0xFF69), 0x22);
        write(&mut bus, 0xFF68, 0x00);
        assert_eq!(read(&bus, 0xFF69), 0xFF);
    }

    #[test]
    fn color_banking_of_vram_and_wram() {
        let mut rom = vec![0u8; 0x8000];
        rom[0x143] = 0x80;
        let mut bus = SystemBus::new(Cartridge::from_bytes(&rom).unwrap(), &[]);

        write(&mut bus, 0xD000, 0x01);
        write(&mut bus, 0xFF70, 0x03);
        assert_eq!(read(&bus, 0xFF70), 0xFB);
        write(&mut bus, 0xD000, 0x03);
        write(&mut bus, 0xFF70, 0x00);
        assert_eq!(read(&bus, 0xD000), 0x01);
        assert_eq!(read(&bus, 0xF000), 0x01);

        write(&mut bus, 0xFF4F, 0x01);
        write(&mut bus, 0x8000, 0xAA);
        write(&mut bus, 0xFF4F, 0x00);
        assert_eq!(read(&bus, 0x8000), 0x00);
        assert_eq!(read(&bus, 0xFF4F), 0xFE);
    }
}
