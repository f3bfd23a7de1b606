use crate::cell::{CellRef, Usage};
use crate::cpu::{Bus, Cpu, Flag, OpKind, Operation};

use super::bits::shift;
use super::slot;

impl Cpu {
    /// Store an 8-bit ALU result unless it equals what is already there, so
    /// idioms like `AND A` keep the register's origin.
    fn write_result<B: Bus>(&mut self, bus: &mut B, dst: CellRef, old: u8, result: u8) {
        if result != old {
            self.write(bus, dst, result);
        }
    }

    /// ADD/ADC/SUB/SBC. Half-carry and carry come from the operands, not the
    /// stored result.
    pub(super) fn exec_arith8<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let a = self.load(bus, dst);
        let b = self.load(bus, slot(op.src_l));
        let carry = matches!(op.kind, OpKind::Adc8 | OpKind::Sbc8) && self.get_flag(Flag::C);
        let c = carry as u8;

        let (result, half, full, subtract) = match op.kind {
            OpKind::Add8 | OpKind::Adc8 => {
                let sum = a as u16 + b as u16 + c as u16;
                let half = (a & 0x0F) + (b & 0x0F) + c > 0x0F;
                (sum as u8, half, sum > 0xFF, false)
            }
            _ => {
                let result = a.wrapping_sub(b).wrapping_sub(c);
                let half = (a & 0x0F) < (b & 0x0F) + c;
                let borrow = (a as u16) < b as u16 + c as u16;
                (result, half, borrow, true)
            }
        };

        self.set_flags(result == 0, subtract, half, full);
        self.write_result(bus, dst, a, result);
    }

    pub(super) fn exec_logic8<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let a = self.load(bus, dst);
        let b = self.load(bus, slot(op.src_l));
        let result = match op.kind {
            OpKind::And8 => a & b,
            OpKind::Xor8 => a ^ b,
            _ => a | b,
        };

        self.set_flags(result == 0, false, op.kind == OpKind::And8, false);
        self.write_result(bus, dst, a, result);
    }

    pub(super) fn exec_cp8<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let a = self.load(bus, slot(op.dst_l));
        let b = self.load(bus, slot(op.src_l));
        self.set_flags(a == b, true, (a & 0x0F) < (b & 0x0F), a < b);
    }

    /// ADD HL,rr. Z is left alone.
    pub(super) fn exec_add16<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let (dst_h, dst_l) = (slot(op.dst_h), slot(op.dst_l));
        let (src_h, src_l) = (slot(op.src_h), slot(op.src_l));
        self.mark_origin(bus, src_l, Usage::WORD_LOW);
        self.mark_origin(bus, src_h, Usage::WORD_HIGH);
        self.mark_origin(bus, dst_l, Usage::WORD_LOW);
        self.mark_origin(bus, dst_h, Usage::WORD_HIGH);

        let dst = u16::from_be_bytes([self.load(bus, dst_h), self.load(bus, dst_l)]);
        let src = u16::from_be_bytes([self.load(bus, src_h), self.load(bus, src_l)]);
        let (result, carry) = dst.overflowing_add(src);

        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, (dst & 0x0FFF) + (src & 0x0FFF) > 0x0FFF);
        self.set_flag(Flag::C, carry);

        let [high, low] = result.to_be_bytes();
        self.write(bus, dst_l, low);
        self.write(bus, dst_h, high);
    }

    /// ADD SP,e8 and LD HL,SP+e8. Flags come from the unsigned low byte.
    pub(super) fn exec_add_sp_offset<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let sp = self.regs.sp();
        let offset = self.load(bus, slot(op.src_l)) as i8 as i16 as u16;
        let result = sp.wrapping_add(offset);

        let half = (sp & 0x000F) + (offset & 0x000F) > 0x000F;
        let carry = (sp & 0x00FF) + (offset & 0x00FF) > 0x00FF;
        self.set_flags(false, false, half, carry);

        let [high, low] = result.to_be_bytes();
        self.write(bus, slot(op.dst_l), low);
        self.write(bus, slot(op.dst_h), high);
    }

    /// RLCA/RRCA/RLA/RRA always clear Z.
    pub(super) fn exec_rotate_a<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let value = self.load(bus, dst);
        let (result, carry) = shift(op.kind, value, self.get_flag(Flag::C));
        self.write(bus, dst, result);
        self.set_flags(false, false, false, carry);
    }

    pub(super) fn exec_daa<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let mut a = self.load(bus, dst);
        let mut carry = self.get_flag(Flag::C);
        let half = self.get_flag(Flag::H);

        if !self.get_flag(Flag::N) {
            if carry || a > 0x99 {
                a = a.wrapping_add(0x60);
                carry = true;
            }
            if half || (a & 0x0F) > 0x09 {
                a = a.wrapping_add(0x06);
            }
        } else {
            if carry {
                a = a.wrapping_sub(0x60);
            }
            if half {
                a = a.wrapping_sub(0x06);
            }
        }

        self.write(bus, dst, a);
        self.set_flag(Flag::Z, a == 0);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::C, carry);
    }

    pub(super) fn exec_cpl<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let dst = slot(op.dst_l);
        let value = self.load(bus, dst);
        self.write(bus, dst, !value);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, true);
    }

    pub(super) fn exec_scf(&mut self) {
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::C, true);
    }

    pub(super) fn exec_ccf(&mut self) {
        let carry = self.get_flag(Flag::C);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::C, !carry);
    }
}
