use crate::cell::Usage;
use crate::cpu::{Bus, Cpu, Flag, Operation};

use super::slot;

impl Cpu {
    pub(super) fn exec_inc8<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let old = self.load(bus, dst);
        let result = old.wrapping_add(1);
        self.write(bus, dst, result);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, old & 0x0F == 0x0F);
    }

    pub(super) fn exec_dec8<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let old = self.load(bus, dst);
        let result = old.wrapping_sub(1);
        self.write(bus, dst, result);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, old & 0x0F == 0x00);
    }

    /// The high byte is only rewritten when the low byte wraps.
    pub(super) fn exec_inc16<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let (high, low) = (slot(op.dst_h), slot(op.dst_l));
        self.mark_origin(bus, low, Usage::WORD_LOW);
        self.mark_origin(bus, high, Usage::WORD_HIGH);

        let result = self.load(bus, low).wrapping_add(1);
        self.write(bus, low, result);
        if result == 0x00 {
            let carried = self.load(bus, high).wrapping_add(1);
            self.write(bus, high, carried);
        }
    }

    pub(super) fn exec_dec16<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let (high, low) = (slot(op.dst_h), slot(op.dst_l));
        self.mark_origin(bus, low, Usage::WORD_LOW);
        self.mark_origin(bus, high, Usage::WORD_HIGH);

        let result = self.load(bus, low).wrapping_sub(1);
        self.write(bus, low, result);
        if result == 0xFF {
            let borrowed = self.load(bus, high).wrapping_sub(1);
            self.write(bus, high, borrowed);
        }
    }
}
