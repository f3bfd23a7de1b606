use crate::cell::Usage;
use crate::cpu::{Bus, Cpu, Operation};

use super::slot;

impl Cpu {
    pub(super) fn exec_ld8<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let (dst, src) = (slot(op.dst_l), slot(op.src_l));
        self.mark(bus, src, Usage::DATA);
        self.write_from(bus, dst, src);
    }

    /// LD rr,d16 / LD SP,HL / LD (a16),SP. Both bytes keep their sources.
    pub(super) fn exec_ld16<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        self.write_from(bus, slot(op.dst_h), slot(op.src_h));
        self.write_from(bus, slot(op.dst_l), slot(op.src_l));
    }
}
