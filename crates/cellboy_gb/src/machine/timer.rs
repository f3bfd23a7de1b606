/// Divider and programmable timer.
///
/// DIV is derived from the CPU cycle counter rather than stored: it reads
/// as the cycles elapsed since the last DIV write, divided by 256. TIMA
/// catches up on every update by however many periods have gone by.
#[derive(Debug, Default)]
pub(crate) struct Timer {
    div_base: u64,
    /// Cycle at which TIMA was last brought up to date.
    tick_base: u64,
}

/// Cycles per TIMA increment, indexed by TAC bits 0-1.
const PERIODS: [u64; 4] = [1024, 16, 64, 256];

impl Timer {
    pub(crate) fn div(&self, now: u64) -> u8 {
        (now.saturating_sub(self.div_base) >> 8) as u8
    }

    pub(crate) fn reset_div(&mut self, now: u64) {
        self.div_base = now;
    }

    /// Returns `true` if TIMA overflowed and was reloaded from TMA.
    pub(crate) fn update(&mut self, now: u64, tac: u8, tma: u8, tima: &mut u8) -> bool {
        if tac & 0x04 == 0 {
            self.tick_base = now;
            return false;
        }

        let period = PERIODS[(tac & 0x03) as usize];
        let mut overflowed = false;
        while now.saturating_sub(self.tick_base) >= period {
            self.tick_base += period;
            match tima.checked_add(1) {
                Some(next) => *tima = next,
                None => {
                    *tima = tma;
                    overflowed = true;
                }
            }
        }
        overflowed
    }
}
