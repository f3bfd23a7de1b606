use crate::cell::{CellRef, Usage};

use super::{Bus, Cpu, Reg};

/// Branch condition of JR/JP/CALL/RET.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Z,
    C,
    NZ,
    NC,
}

impl Condition {
    /// Condition encoded in bits 3-4 of a conditional opcode.
    fn from_opcode(opcode: u8) -> Self {
        match (opcode >> 3) & 0x03 {
            0 => Condition::NZ,
            1 => Condition::Z,
            2 => Condition::NC,
            _ => Condition::C,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    Nop,
    Stop,
    Halt,
    Di,
    Ei,
    Ld8,
    Ld16,
    /// LD HL,SP+e8
    LdHlSp,
    Push16,
    Pop16,
    Inc8,
    Dec8,
    Inc16,
    Dec16,
    Add8,
    Adc8,
    Sub8,
    Sbc8,
    And8,
    Xor8,
    Or8,
    Cp8,
    Add16,
    /// ADD SP,e8
    AddSp,
    Rlca,
    Rrca,
    Rla,
    Rra,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Jr(Condition),
    Jp(Condition),
    Call(Condition),
    Ret(Condition),
    Reti,
    Rst,
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit,
    Res,
    Set,
    Illegal,
}

/// One decoded instruction.
///
/// Operands are cell references resolved at decode time. Jump, call and
/// relative-jump targets are carried in `src_h`/`src_l`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub length: u8,
    /// Base cost; the not-taken path for conditional operations.
    pub cycles: u32,
    pub dst_h: Option<CellRef>,
    pub dst_l: Option<CellRef>,
    pub src_h: Option<CellRef>,
    pub src_l: Option<CellRef>,
    /// Bit index for BIT/RES/SET, vector for RST.
    pub value: u8,
    /// HL adjustment of the `(HL+)`/`(HL-)` addressing forms.
    pub hl_step: i8,
}

impl Operation {
    pub const fn new(kind: OpKind, length: u8, cycles: u32) -> Self {
        Self {
            kind,
            length,
            cycles,
            dst_h: None,
            dst_l: None,
            src_h: None,
            src_l: None,
            value: 0,
            hl_step: 0,
        }
    }

    pub const fn illegal() -> Self {
        Self::new(OpKind::Illegal, 1, 0)
    }

    #[inline]
    pub fn is_illegal(&self) -> bool {
        self.kind == OpKind::Illegal
    }

    fn dst(mut self, high: CellRef, low: CellRef) -> Self {
        self.dst_h = Some(high);
        self.dst_l = Some(low);
        self
    }

    fn dst8(mut self, low: CellRef) -> Self {
        self.dst_l = Some(low);
        self
    }

    fn src(mut self, high: CellRef, low: CellRef) -> Self {
        self.src_h = Some(high);
        self.src_l = Some(low);
        self
    }

    fn src8(mut self, low: CellRef) -> Self {
        self.src_l = Some(low);
        self
    }

    fn with_value(mut self, value: u8) -> Self {
        self.value = value;
        self
    }

    fn with_hl_step(mut self, step: i8) -> Self {
        self.hl_step = step;
        self
    }
}

const A: CellRef = CellRef::Reg(Reg::A);
const F: CellRef = CellRef::Reg(Reg::F);
const H: CellRef = CellRef::Reg(Reg::H);
const L: CellRef = CellRef::Reg(Reg::L);

/// Register pair selected by bits 4-5 (BC, DE, HL, SP).
fn pair(opcode: u8) -> (CellRef, CellRef) {
    let (h, l) = match (opcode >> 4) & 0x03 {
        0 => (Reg::B, Reg::C),
        1 => (Reg::D, Reg::E),
        2 => (Reg::H, Reg::L),
        _ => (Reg::SpHigh, Reg::SpLow),
    };
    (CellRef::Reg(h), CellRef::Reg(l))
}

/// PUSH/POP pair: AF takes SP's slot.
fn stack_pair(opcode: u8) -> (CellRef, CellRef) {
    if (opcode >> 4) & 0x03 == 3 {
        (A, F)
    } else {
        pair(opcode)
    }
}

impl Cpu {
    /// Decode the instruction at `address`.
    ///
    /// The result depends only on bus contents and register values. Binding
    /// an indirect operand tags the bytes the pointer was built from, which
    /// is instrumentation only.
    pub fn decode<B: Bus>(&mut self, bus: &mut B, address: u16) -> Operation {
        let opcode = self.read8(bus, address);
        if opcode == 0xCB {
            return self.decode_cb(bus, address);
        }

        let imm_l = bus.resolve(address.wrapping_add(1));
        let imm_h = bus.resolve(address.wrapping_add(2));

        match opcode {
            0x40..=0x7F if opcode != 0x76 => {
                let dst = self.operand(bus, opcode >> 3);
                let src = self.operand(bus, opcode);
                let cycles = if (opcode >> 3) & 7 == 6 || opcode & 7 == 6 {
                    8
                } else {
                    4
                };
                Operation::new(OpKind::Ld8, 1, cycles).dst8(dst).src8(src)
            }
            0x80..=0xBF => {
                let src = self.operand(bus, opcode);
                let cycles = if opcode & 7 == 6 { 8 } else { 4 };
                Operation::new(alu_kind(opcode), 1, cycles)
                    .dst8(A)
                    .src8(src)
            }
            _ if opcode & 0xC7 == 0x04 => {
                let dst = self.operand(bus, opcode >> 3);
                let cycles = if (opcode >> 3) & 7 == 6 { 12 } else { 4 };
                Operation::new(OpKind::Inc8, 1, cycles).dst8(dst)
            }
            _ if opcode & 0xC7 == 0x05 => {
                let dst = self.operand(bus, opcode >> 3);
                let cycles = if (opcode >> 3) & 7 == 6 { 12 } else { 4 };
                Operation::new(OpKind::Dec8, 1, cycles).dst8(dst)
            }
            _ if opcode & 0xC7 == 0x06 => {
                let dst = self.operand(bus, opcode >> 3);
                let cycles = if (opcode >> 3) & 7 == 6 { 12 } else { 8 };
                Operation::new(OpKind::Ld8, 2, cycles).dst8(dst).src8(imm_l)
            }
            _ if opcode & 0xCF == 0x01 => {
                let (h, l) = pair(opcode);
                self.mark(bus, imm_l, Usage::WORD_LOW);
                self.mark(bus, imm_h, Usage::WORD_HIGH);
                Operation::new(OpKind::Ld16, 3, 12)
                    .dst(h, l)
                    .src(imm_h, imm_l)
            }
            _ if opcode & 0xCF == 0x03 => {
                let (h, l) = pair(opcode);
                Operation::new(OpKind::Inc16, 1, 8).dst(h, l)
            }
            _ if opcode & 0xCF == 0x0B => {
                let (h, l) = pair(opcode);
                Operation::new(OpKind::Dec16, 1, 8).dst(h, l)
            }
            _ if opcode & 0xCF == 0x09 => {
                let (h, l) = pair(opcode);
                Operation::new(OpKind::Add16, 1, 8).dst(H, L).src(h, l)
            }
            _ if opcode & 0xCF == 0xC1 => {
                let (h, l) = stack_pair(opcode);
                Operation::new(OpKind::Pop16, 1, 12).dst(h, l)
            }
            _ if opcode & 0xCF == 0xC5 => {
                let (h, l) = stack_pair(opcode);
                Operation::new(OpKind::Push16, 1, 16).src(h, l)
            }
            _ if opcode & 0xC7 == 0xC6 => {
                Operation::new(alu_kind(opcode), 2, 8).dst8(A).src8(imm_l)
            }
            _ if opcode & 0xC7 == 0xC7 => {
                Operation::new(OpKind::Rst, 1, 16).with_value(opcode & 0x38)
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                Operation::new(OpKind::Jr(Condition::from_opcode(opcode)), 2, 8).src8(imm_l)
            }
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                Operation::new(OpKind::Jp(Condition::from_opcode(opcode)), 3, 12).src(imm_h, imm_l)
            }
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                Operation::new(OpKind::Call(Condition::from_opcode(opcode)), 3, 12)
                    .src(imm_h, imm_l)
            }
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                Operation::new(OpKind::Ret(Condition::from_opcode(opcode)), 1, 8)
            }
            0x00 => Operation::new(OpKind::Nop, 1, 4),
            0x10 => Operation::new(OpKind::Stop, 1, 4),
            0x76 => Operation::new(OpKind::Halt, 1, 4),
            0xF3 => Operation::new(OpKind::Di, 1, 4),
            0xFB => Operation::new(OpKind::Ei, 1, 4),
            0x02 | 0x12 => {
                let (h, l) = pair(opcode);
                let dst = self.dereference(bus, h, l);
                Operation::new(OpKind::Ld8, 1, 8).dst8(dst).src8(A)
            }
            0x0A | 0x1A => {
                let (h, l) = pair(opcode);
                let src = self.dereference(bus, h, l);
                Operation::new(OpKind::Ld8, 1, 8).dst8(A).src8(src)
            }
            0x22 | 0x32 => {
                let dst = bus.resolve(self.regs.hl());
                Operation::new(OpKind::Ld8, 1, 8)
                    .dst8(dst)
                    .src8(A)
                    .with_hl_step(if opcode == 0x22 { 1 } else { -1 })
            }
            0x2A | 0x3A => {
                let src = bus.resolve(self.regs.hl());
                Operation::new(OpKind::Ld8, 1, 8)
                    .dst8(A)
                    .src8(src)
                    .with_hl_step(if opcode == 0x2A { 1 } else { -1 })
            }
            0x07 => Operation::new(OpKind::Rlca, 1, 4).dst8(A),
            0x0F => Operation::new(OpKind::Rrca, 1, 4).dst8(A),
            0x17 => Operation::new(OpKind::Rla, 1, 4).dst8(A),
            0x1F => Operation::new(OpKind::Rra, 1, 4).dst8(A),
            0x27 => Operation::new(OpKind::Daa, 1, 4).dst8(A),
            0x2F => Operation::new(OpKind::Cpl, 1, 4).dst8(A),
            0x37 => Operation::new(OpKind::Scf, 1, 4),
            0x3F => Operation::new(OpKind::Ccf, 1, 4),
            0x08 => {
                let addr = self.absolute(bus, imm_h, imm_l);
                let low = bus.resolve(addr);
                let high = bus.resolve(addr.wrapping_add(1));
                Operation::new(OpKind::Ld16, 3, 20)
                    .dst(high, low)
                    .src(CellRef::Reg(Reg::SpHigh), CellRef::Reg(Reg::SpLow))
            }
            0x18 => Operation::new(OpKind::Jr(Condition::Always), 2, 12).src8(imm_l),
            0xC3 => Operation::new(OpKind::Jp(Condition::Always), 3, 16).src(imm_h, imm_l),
            0xE9 => Operation::new(OpKind::Jp(Condition::Always), 1, 4).src(H, L),
            0xCD => Operation::new(OpKind::Call(Condition::Always), 3, 24).src(imm_h, imm_l),
            0xC9 => Operation::new(OpKind::Ret(Condition::Always), 1, 16),
            0xD9 => Operation::new(OpKind::Reti, 1, 16),
            0xE0 => {
                let dst = bus.resolve(0xFF00 | self.load(bus, imm_l) as u16);
                Operation::new(OpKind::Ld8, 2, 12).dst8(dst).src8(A)
            }
            0xF0 => {
                let src = bus.resolve(0xFF00 | self.load(bus, imm_l) as u16);
                Operation::new(OpKind::Ld8, 2, 12).dst8(A).src8(src)
            }
            0xE2 => {
                let dst = bus.resolve(0xFF00 | self.regs.get(Reg::C) as u16);
                Operation::new(OpKind::Ld8, 1, 8).dst8(dst).src8(A)
            }
            0xF2 => {
                let src = bus.resolve(0xFF00 | self.regs.get(Reg::C) as u16);
                Operation::new(OpKind::Ld8, 1, 8).dst8(A).src8(src)
            }
            0xEA => {
                let dst = self.absolute(bus, imm_h, imm_l);
                Operation::new(OpKind::Ld8, 3, 16)
                    .dst8(bus.resolve(dst))
                    .src8(A)
            }
            0xFA => {
                let src = self.absolute(bus, imm_h, imm_l);
                Operation::new(OpKind::Ld8, 3, 16)
                    .dst8(A)
                    .src8(bus.resolve(src))
            }
            0xE8 => Operation::new(OpKind::AddSp, 2, 16)
                .dst(CellRef::Reg(Reg::SpHigh), CellRef::Reg(Reg::SpLow))
                .src8(imm_l),
            0xF8 => Operation::new(OpKind::LdHlSp, 2, 12).dst(H, L).src8(imm_l),
            0xF9 => Operation::new(OpKind::Ld16, 1, 8)
                .dst(CellRef::Reg(Reg::SpHigh), CellRef::Reg(Reg::SpLow))
                .src(H, L),
            // D3 DB DD E3 E4 EB EC ED F4 FC FD
            _ => Operation::illegal(),
        }
    }

    fn decode_cb<B: Bus>(&mut self, bus: &mut B, address: u16) -> Operation {
        let opcode = self.read8(bus, address.wrapping_add(1));
        let dst = self.operand(bus, opcode);
        let indirect = opcode & 7 == 6;

        let (kind, value) = match opcode >> 6 {
            0 => {
                let kind = match (opcode >> 3) & 7 {
                    0 => OpKind::Rlc,
                    1 => OpKind::Rrc,
                    2 => OpKind::Rl,
                    3 => OpKind::Rr,
                    4 => OpKind::Sla,
                    5 => OpKind::Sra,
                    6 => OpKind::Swap,
                    _ => OpKind::Srl,
                };
                (kind, 0)
            }
            1 => (OpKind::Bit, (opcode >> 3) & 7),
            2 => (OpKind::Res, (opcode >> 3) & 7),
            _ => (OpKind::Set, (opcode >> 3) & 7),
        };

        let cycles = match (indirect, kind) {
            (false, _) => 8,
            (true, OpKind::Bit) => 12,
            (true, _) => 16,
        };
        Operation::new(kind, 2, cycles).dst8(dst).with_value(value)
    }

    /// 8-bit operand selected by the low three bits; 6 is `(HL)`.
    fn operand<B: Bus>(&mut self, bus: &mut B, index: u8) -> CellRef {
        let reg = match index & 7 {
            0 => Reg::B,
            1 => Reg::C,
            2 => Reg::D,
            3 => Reg::E,
            4 => Reg::H,
            5 => Reg::L,
            6 => return self.dereference(bus, H, L),
            _ => Reg::A,
        };
        CellRef::Reg(reg)
    }

    /// Resolve the byte a register pair points at, tagging the pair's
    /// sources as pointer bytes.
    fn dereference<B: Bus>(&mut self, bus: &mut B, high: CellRef, low: CellRef) -> CellRef {
        let addr = u16::from_be_bytes([self.load(bus, high), self.load(bus, low)]);
        self.mark_origin(bus, high, Usage::POINTER_HIGH);
        self.mark_origin(bus, low, Usage::POINTER_LOW);
        bus.resolve(addr)
    }

    /// Address held in an instruction's two immediate bytes.
    fn absolute<B: Bus>(&mut self, bus: &mut B, high: CellRef, low: CellRef) -> u16 {
        self.mark(bus, high, Usage::POINTER_HIGH);
        self.mark(bus, low, Usage::POINTER_LOW);
        u16::from_be_bytes([self.load(bus, high), self.load(bus, low)])
    }
}

fn alu_kind(opcode: u8) -> OpKind {
    match (opcode >> 3) & 7 {
        0 => OpKind::Add8,
        1 => OpKind::Adc8,
        2 => OpKind::Sub8,
        3 => OpKind::Sbc8,
        4 => OpKind::And8,
        5 => OpKind::Xor8,
        6 => OpKind::Or8,
        _ => OpKind::Cp8,
    }
}
