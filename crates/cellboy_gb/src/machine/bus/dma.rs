use crate::cell::CellRef;
use crate::cpu::Bus;

use super::SystemBus;

const HDMA1: usize = 0x51;

impl SystemBus {
    /// OAM DMA: XX00-XX9F to FE00-FE9F, all at once.
    pub(super) fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        for i in 0..0xA0u8 {
            let src = self.resolve(base.wrapping_add(i as u16));
            self.copy(CellRef::Oam(i), src);
        }
    }

    /// Color VRAM DMA. HBlank mode is not paced; every block moves now.
    pub(super) fn hdma(&mut self, control: u8) {
        let reg = |n: usize| self.io[HDMA1 + n].value as u16;
        let source = ((reg(0) << 8) | reg(1)) & 0xFFF0;
        let dest = 0x8000 | (((reg(2) << 8) | reg(3)) & 0x1FF0);
        let len = ((control & 0x7F) as u16 + 1) * 0x10;
        log::trace!("HDMA 0x{source:04X} -> 0x{dest:04X} len 0x{len:X}");

        for i in 0..len {
            let src = self.resolve(source.wrapping_add(i));
            // Destination wraps within VRAM.
            let dst = self.resolve(0x8000 | (dest.wrapping_add(i) & 0x1FFF));
            self.copy(dst, src);
        }
    }
}
