/// Serial port with nothing plugged in.
///
/// Writing 0x81 to SC starts an internally clocked transfer. The outgoing
/// SB byte is captured for `output`, and eight bit-times later SB has
/// shifted in all ones and the serial interrupt fires.
#[derive(Debug, Default)]
pub(crate) struct Serial {
    bits_left: u8,
    next_bit: u64,
    bit_cycles: u64,
    output: Vec<u8>,
}

const BIT_CYCLES: u64 = 512;
const FAST_BIT_CYCLES: u64 = 16;

impl Serial {
    pub(crate) fn output(&self) -> &[u8] {
        &self.output
    }

    pub(crate) fn transferring(&self) -> bool {
        self.bits_left > 0
    }

    /// Drop a transfer in flight. The capture buffer is kept.
    pub(crate) fn cancel(&mut self) {
        self.bits_left = 0;
    }

    /// `sc` is the value just written; bit 1 selects the fast clock on color
    /// hardware.
    pub(crate) fn start(&mut self, now: u64, sb: u8, sc: u8, cgb: bool) {
        self.output.push(sb);
        log::trace!("serial out 0x{sb:02X}");

        self.bit_cycles = if cgb && sc & 0x02 != 0 {
            FAST_BIT_CYCLES
        } else {
            BIT_CYCLES
        };
        self.bits_left = 8;
        self.next_bit = now + self.bit_cycles;
    }

    /// Returns `true` once the transfer in flight completes.
    pub(crate) fn update(&mut self, now: u64, sb: &mut u8) -> bool {
        while self.bits_left > 0 && now >= self.next_bit {
            *sb = (*sb << 1) | 0x01;
            self.bits_left -= 1;
            self.next_bit += self.bit_cycles;
            if self.bits_left == 0 {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_takes_eight_bit_times() {
        let mut serial = Serial::default();
        let mut sb = b'P';
        serial.start(100, sb, 0x81, false);
        assert_eq!(serial.output(), b"P");
        assert!(serial.transferring());

        assert!(!serial.update(100 + 7 * 512, &mut sb));
        assert!(serial.transferring());
        assert!(serial.update(100 + 8 * 512, &mut sb));
        assert_eq!(sb, 0xFF);
        assert!(!serial.transferring());
        assert!(!serial.update(100 + 100 * 512, &mut sb));
    }

    #[test]
    fn fast_clock_only_on_color_hardware() {
        let mut serial = Serial::default();
        let mut sb = 0;
        serial.start(0, sb, 0x83, true);
        assert!(serial.update(8 * 16, &mut sb));

        serial.start(0, sb, 0x83, false);
        assert!(!serial.update(8 * 16, &mut sb));
    }
}
