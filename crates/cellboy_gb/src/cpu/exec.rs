mod alu;
mod bits;
mod control;
mod incdec;
mod ld;
mod stack;
mod system;

use crate::cell::{CellRef, Usage};

use super::{Bus, Cpu, OpKind, Operation};

impl Cpu {
    /// Apply a decoded operation.
    ///
    /// The program counter and cycle counter are advanced before any effect,
    /// so a CALL pushes the address of the next instruction and devices see
    /// the cost of the instruction they are written by. Illegal operations
    /// are rejected by the run loop and do nothing here beyond the advance.
    pub fn execute<B: Bus>(&mut self, bus: &mut B, op: &Operation) {
        let start = self.pc;
        let first = bus.resolve(start);
        self.mark(bus, first, Usage::INSTRUCTION);
        for n in 1..op.length as u16 {
            let at = bus.resolve(start.wrapping_add(n));
            self.mark(bus, at, Usage::INSTRUCTION | Usage::DATA);
        }

        self.pc = self.pc.wrapping_add(op.length as u16);
        self.cycles = self.cycles.wrapping_add(op.cycles as u64);
        bus.sync(self.cycles);

        match op.kind {
            OpKind::Nop | OpKind::Illegal => {}
            OpKind::Stop => self.exec_stop(bus),
            OpKind::Halt => self.halted = true,
            OpKind::Di => self.ime = false,
            OpKind::Ei => self.ime = true,

            OpKind::Ld8 => self.exec_ld8(bus, op),
            OpKind::Ld16 => self.exec_ld16(bus, op),
            OpKind::LdHlSp => self.exec_add_sp_offset(bus, op),
            OpKind::Push16 => self.exec_push(bus, op),
            OpKind::Pop16 => self.exec_pop(bus, op),

            OpKind::Inc8 => self.exec_inc8(bus, op),
            OpKind::Dec8 => self.exec_dec8(bus, op),
            OpKind::Inc16 => self.exec_inc16(bus, op),
            OpKind::Dec16 => self.exec_dec16(bus, op),

            OpKind::Add8 | OpKind::Adc8 | OpKind::Sub8 | OpKind::Sbc8 => self.exec_arith8(bus, op),
            OpKind::And8 | OpKind::Xor8 | OpKind::Or8 => self.exec_logic8(bus, op),
            OpKind::Cp8 => self.exec_cp8(bus, op),
            OpKind::Add16 => self.exec_add16(bus, op),
            OpKind::AddSp => self.exec_add_sp_offset(bus, op),
            OpKind::Rlca | OpKind::Rrca | OpKind::Rla | OpKind::Rra => self.exec_rotate_a(bus, op),
            OpKind::Daa => self.exec_daa(bus, op),
            OpKind::Cpl => self.exec_cpl(bus, op),
            OpKind::Scf => self.exec_scf(),
            OpKind::Ccf => self.exec_ccf(),

            OpKind::Jr(cond) => self.exec_jr(bus, op, cond),
            OpKind::Jp(cond) => self.exec_jp(bus, op, cond),
            OpKind::Call(cond) => self.exec_call(bus, op, cond),
            OpKind::Ret(cond) => self.exec_ret(bus, cond),
            OpKind::Reti => self.exec_reti(bus),
            OpKind::Rst => self.exec_rst(bus, op),

            OpKind::Rlc
            | OpKind::Rrc
            | OpKind::Rl
            | OpKind::Rr
            | OpKind::Sla
            | OpKind::Sra
            | OpKind::Swap
            | OpKind::Srl => self.exec_shift(bus, op),
            OpKind::Bit => self.exec_bit(bus, op),
            OpKind::Res | OpKind::Set => self.exec_res_set(bus, op),
        }

        if op.hl_step != 0 {
            let hl = self.regs.hl().wrapping_add_signed(op.hl_step as i16);
            self.regs.set_hl(hl);
        }
    }
}

/// Operand slots are filled by the decoder for every kind that reads them.
#[inline]
fn slot(operand: Option<CellRef>) -> CellRef {
    operand.unwrap_or(CellRef::OpenBus)
}
