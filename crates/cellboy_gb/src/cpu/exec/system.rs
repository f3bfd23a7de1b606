use crate::cpu::{Bus, Cpu};

impl Cpu {
    /// STOP only implements the Color speed switch. Without an armed KEY1 it
    /// does nothing; the low-power state is not modelled.
    pub(super) fn exec_stop<B: Bus>(&mut self, bus: &mut B) {
        if !(self.cgb && bus.speed_switch_armed()) {
            return;
        }
        self.speed = if self.speed == 1 { 2 } else { 1 };
        bus.set_double_speed(self.speed == 2);
        log::debug!("speed switch: x{} at cycle {}", self.speed, self.cycles);
    }
}
