use crate::cell::Usage;
use crate::cpu::{Bus, Condition, Cpu, Flag, Operation};

use super::slot;

impl Cpu {
    #[inline]
    fn condition_met(&self, cond: Condition) -> bool {
        match cond {
            Condition::Always => true,
            Condition::Z => self.get_flag(Flag::Z),
            Condition::C => self.get_flag(Flag::C),
            Condition::NZ => !self.get_flag(Flag::Z),
            Condition::NC => !self.get_flag(Flag::C),
        }
    }

    /// Taken conditional branches pay `extra` on top of the base cost.
    #[inline]
    fn take_branch(&mut self, cond: Condition, extra: u64) -> bool {
        if !self.condition_met(cond) {
            return false;
        }
        if cond != Condition::Always {
            self.cycles = self.cycles.wrapping_add(extra);
        }
        true
    }

    fn target<B: Bus>(&self, bus: &B, op: &Operation) -> u16 {
        let high = self.load(bus, slot(op.src_h));
        let low = self.load(bus, slot(op.src_l));
        u16::from_be_bytes([high, low])
    }

    pub(super) fn exec_jr<B: Bus>(&mut self, bus: &mut B, op: &Operation, cond: Condition) {
        if self.take_branch(cond, 4) {
            let offset = self.load(bus, slot(op.src_l)) as i8;
            self.pc = self.pc.wrapping_add_signed(offset as i16);
        }
    }

    pub(super) fn exec_jp<B: Bus>(&mut self, bus: &mut B, op: &Operation, cond: Condition) {
        if !self.take_branch(cond, 4) {
            return;
        }
        if cond == Condition::Always {
            self.mark_origin(bus, slot(op.src_l), Usage::POINTER_LOW);
            self.mark_origin(bus, slot(op.src_h), Usage::POINTER_HIGH);
        }
        self.pc = self.target(bus, op);
    }

    pub(super) fn exec_call<B: Bus>(&mut self, bus: &mut B, op: &Operation, cond: Condition) {
        if self.take_branch(cond, 12) {
            self.push_pc(bus);
            self.pc = self.target(bus, op);
        }
    }

    pub(super) fn exec_ret<B: Bus>(&mut self, bus: &mut B, cond: Condition) {
        if self.take_branch(cond, 12) {
            self.pop_pc(bus);
        }
    }

    pub(super) fn exec_reti<B: Bus>(&mut self, bus: &mut B) {
        self.pop_pc(bus);
        self.ime = true;
    }

    pub(super) fn exec_rst<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        self.push_pc(bus);
        self.pc = op.value as u16;
    }

    fn pop_pc<B: Bus>(&mut self, bus: &mut B) {
        let (high, low) = self.stack_top(bus);
        self.mark_origin(bus, low, Usage::POINTER_LOW);
        self.mark_origin(bus, high, Usage::POINTER_HIGH);
        self.pc = u16::from_be_bytes([self.load(bus, high), self.load(bus, low)]);
        self.regs.set_sp(self.regs.sp().wrapping_add(2));
    }
}
