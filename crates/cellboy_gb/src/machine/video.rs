//! Scanline timing without a renderer.
//!
//! Only the parts software can observe through registers are kept: LY
//! counting through 154 lines of 456 dots, the STAT mode bits, the LY=LYC
//! coincidence flag and the VBlank/STAT interrupts.

use crate::cpu::Interrupt;

const VISIBLE_LINES: u8 = 144;
const DOTS_PER_LINE: u64 = 456;
const LINES_PER_FRAME: u8 = 154;
const OAM_SCAN_DOTS: u64 = 80;
const TRANSFER_DOTS: u64 = 172;

const STAT_COINCIDENCE: u8 = 0x04;
const STAT_LYC_INTERRUPT: u8 = 0x40;

/// What one update raised.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VideoEvents {
    pub(crate) interrupts: u8,
    pub(crate) frame: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Video {
    line_start: u64,
}

impl Video {
    pub(crate) fn update(
        &mut self,
        now: u64,
        speed: u8,
        lcdc: u8,
        lyc: u8,
        ly: &mut u8,
        stat: &mut u8,
    ) -> VideoEvents {
        let mut events = VideoEvents::default();

        if lcdc & 0x80 == 0 {
            self.line_start = now;
            *ly = 0;
            *stat &= !0x03;
            return events;
        }

        // Dots run at the single-speed rate whatever the CPU does.
        let line = DOTS_PER_LINE * speed.max(1) as u64;
        while now.saturating_sub(self.line_start) >= line {
            self.line_start += line;
            *ly = (*ly + 1) % LINES_PER_FRAME;
            compare_lyc(*ly, lyc, stat, &mut events);

            if *ly == VISIBLE_LINES {
                events.interrupts |= Interrupt::VBlank.mask();
                events.frame = true;
            }
        }

        // LYC may have been written, or the LCD just switched on.
        compare_lyc(*ly, lyc, stat, &mut events);

        let dot = (now - self.line_start) / speed.max(1) as u64;
        let mode = if *ly >= VISIBLE_LINES {
            1
        } else if dot < OAM_SCAN_DOTS {
            2
        } else if dot < OAM_SCAN_DOTS + TRANSFER_DOTS {
            3
        } else {
            0
        };
        *stat = (*stat & !0x03) | mode;
        events
    }
}

/// Update the coincidence flag. The STAT interrupt fires only when the flag
/// goes from clear to set.
fn compare_lyc(ly: u8, lyc: u8, stat: &mut u8, events: &mut VideoEvents) {
    if ly != lyc {
        *stat &= !STAT_COINCIDENCE;
        return;
    }
    if *stat & STAT_COINCIDENCE == 0 && *stat & STAT_LYC_INTERRUPT != 0 {
        events.interrupts |= Interrupt::LcdStat.mask();
    }
    *stat |= STAT_COINCIDENCE;
}
