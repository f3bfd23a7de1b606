//! CB-prefixed rotates, shifts and single-bit operations.

use crate::cpu::{Bus, Cpu, Flag, OpKind, Operation};

use super::slot;

/// Result and carry-out of a rotate/shift of `value`.
pub(super) fn shift(kind: OpKind, value: u8, carry_in: bool) -> (u8, bool) {
    match kind {
        OpKind::Rlc | OpKind::Rlca => (value.rotate_left(1), value & 0x80 != 0),
        OpKind::Rrc | OpKind::Rrca => (value.rotate_right(1), value & 0x01 != 0),
        OpKind::Rl | OpKind::Rla => ((value << 1) | carry_in as u8, value & 0x80 != 0),
        OpKind::Rr | OpKind::Rra => ((value >> 1) | ((carry_in as u8) << 7), value & 0x01 != 0),
        OpKind::Sla => (value << 1, value & 0x80 != 0),
        OpKind::Sra => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
        OpKind::Swap => (value.rotate_left(4), false),
        OpKind::Srl => (value >> 1, value & 0x01 != 0),
        _ => (value, carry_in),
    }
}

impl Cpu {
    pub(super) fn exec_shift<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let value = self.load(bus, dst);
        let (result, carry) = shift(op.kind, value, self.get_flag(Flag::C));
        self.write(bus, dst, result);
        self.set_flags(result == 0, false, false, carry);
    }

    pub(super) fn exec_bit<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let value = self.load(bus, slot(op.dst_l));
        self.set_flag(Flag::Z, value & (1 << op.value) == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, true);
    }

    pub(super) fn exec_res_set<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let value = self.load(bus, dst);
        let mask = 1u8 << op.value;
        let result = if op.kind == OpKind::Set {
            value | mask
        } else {
            value & !mask
        };
        self.write(bus, dst, result);
    }
}
