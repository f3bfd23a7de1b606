use crate::cell::CellRef;
use crate::cpu::{Bus, Cpu, Operation};

use super::slot;

impl Cpu {
    pub(super) fn exec_push<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let sp = self.regs.sp();
        let high = bus.resolve(sp.wrapping_sub(1));
        let low = bus.resolve(sp.wrapping_sub(2));
        self.write_from(bus, high, slot(op.src_h));
        self.write_from(bus, low, slot(op.src_l));
        self.regs.set_sp(sp.wrapping_sub(2));
    }

    pub(super) fn exec_pop<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let sp = self.regs.sp();
        let low = bus.resolve(sp);
        let high = bus.resolve(sp.wrapping_add(1));
        self.write_from(bus, slot(op.dst_l), low);
        self.write_from(bus, slot(op.dst_h), high);
        self.regs.set_sp(sp.wrapping_add(2));
    }

    /// Push the program counter. It carries no origin.
    pub(crate) fn push_pc<B: Bus>(&mut self, bus: &mut B) {
        let sp = self.regs.sp();
        let [high, low] = self.pc.to_be_bytes();
        let high_at = bus.resolve(sp.wrapping_sub(1));
        self.write(bus, high_at, high);
        let low_at = bus.resolve(sp.wrapping_sub(2));
        self.write(bus, low_at, low);
        self.regs.set_sp(sp.wrapping_sub(2));
    }

    /// Cells holding the return address at the top of the stack.
    pub(super) fn stack_top<B: Bus>(&self, bus: &B) -> (CellRef, CellRef) {
        let sp = self.regs.sp();
        (bus.resolve(sp.wrapping_add(1)), bus.resolve(sp))
    }
}
