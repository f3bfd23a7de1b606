use crate::cell::Cell;

use super::Cpu;

/// One 8-bit slot of the register file.
///
/// The stack pointer is held as two halves so that a pushed or popped byte
/// keeps its origin like any other register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    SpHigh,
    SpLow,
}

impl Reg {
    pub const ALL: [Reg; 10] = [
        Reg::A,
        Reg::F,
        Reg::B,
        Reg::C,
        Reg::D,
        Reg::E,
        Reg::H,
        Reg::L,
        Reg::SpHigh,
        Reg::SpLow,
    ];
}

/// Registers for the Game Boy CPU (LR35902).
///
/// Each register is an untracked [`Cell`], so values loaded from memory
/// remember the byte they came from as they move through the CPU.
#[derive(Clone, Debug)]
pub struct Registers {
    cells: [Cell; 10],
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            cells: [Cell::untracked(); 10],
        }
    }
}

impl Registers {
    #[inline]
    pub fn get(&self, reg: Reg) -> u8 {
        self.cells[reg as usize].value
    }

    /// Scalar write. The register forgets where its previous value came from.
    #[inline]
    pub fn set(&mut self, reg: Reg, value: u8) {
        let cell = &mut self.cells[reg as usize];
        cell.value = Self::mask(reg, value);
        cell.origin = None;
    }

    /// Device effect only, origin left to the caller.
    #[inline]
    pub(crate) fn store(&mut self, reg: Reg, value: u8) {
        self.cells[reg as usize].value = Self::mask(reg, value);
    }

    #[inline]
    pub fn cell(&self, reg: Reg) -> &Cell {
        &self.cells[reg as usize]
    }

    #[inline]
    pub fn cell_mut(&mut self, reg: Reg) -> &mut Cell {
        &mut self.cells[reg as usize]
    }

    #[inline]
    fn mask(reg: Reg, value: u8) -> u8 {
        // Lower 4 bits of F are always zero.
        if reg == Reg::F {
            value & 0xF0
        } else {
            value
        }
    }

    #[inline]
    fn pair(&self, high: Reg, low: Reg) -> u16 {
        u16::from_be_bytes([self.get(high), self.get(low)])
    }

    #[inline]
    fn set_pair(&mut self, high: Reg, low: Reg, value: u16) {
        let [h, l] = value.to_be_bytes();
        self.set(high, h);
        self.set(low, l);
    }

    pub fn af(&self) -> u16 {
        self.pair(Reg::A, Reg::F)
    }

    pub fn set_af(&mut self, value: u16) {
        self.set_pair(Reg::A, Reg::F, value);
    }

    pub fn bc(&self) -> u16 {
        self.pair(Reg::B, Reg::C)
    }

    pub fn set_bc(&mut self, value: u16) {
        self.set_pair(Reg::B, Reg::C, value);
    }

    pub fn de(&self) -> u16 {
        self.pair(Reg::D, Reg::E)
    }

    pub fn set_de(&mut self, value: u16) {
        self.set_pair(Reg::D, Reg::E, value);
    }

    pub fn hl(&self) -> u16 {
        self.pair(Reg::H, Reg::L)
    }

    pub fn set_hl(&mut self, value: u16) {
        self.set_pair(Reg::H, Reg::L, value);
    }

    pub fn sp(&self) -> u16 {
        self.pair(Reg::SpHigh, Reg::SpLow)
    }

    pub fn set_sp(&mut self, value: u16) {
        self.set_pair(Reg::SpHigh, Reg::SpLow, value);
    }
}

/// Flag bits in the F register.
///
/// Layout (bit index in the byte, from MSB to LSB):
/// - bit 7: Z (zero)
/// - bit 6: N (subtract)
/// - bit 5: H (half carry)
/// - bit 4: C (carry)
/// - bits 0–3 are always zero.
#[derive(Clone, Copy, Debug)]
pub enum Flag {
    Z = 7,
    N = 6,
    H = 5,
    C = 4,
}

impl Cpu {
    #[inline]
    pub fn get_flag(&self, flag: Flag) -> bool {
        let bit = flag as u8;
        (self.regs.get(Reg::F) & (1 << bit)) != 0
    }

    /// Flag updates touch only the value; F keeps whatever origin it had.
    #[inline]
    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        let bit = flag as u8;
        let f = self.regs.get(Reg::F);
        let f = if value {
            f | (1 << bit)
        } else {
            f & !(1 << bit)
        };
        self.regs.store(Reg::F, f);
    }

    #[inline]
    pub(crate) fn set_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
        self.set_flag(Flag::Z, z);
        self.set_flag(Flag::N, n);
        self.set_flag(Flag::H, h);
        self.set_flag(Flag::C, c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_round_trip_through_halves() {
        let mut regs = Registers::default();
        for value in [0x0000u16, 0x00FF, 0x1234, 0xFF00, 0xBEEF, 0xFFFF] {
            regs.set_bc(value);
            assert_eq!(regs.get(Reg::B), (value >> 8) as u8);
            assert_eq!(regs.get(Reg::C), value as u8);
            assert_eq!(regs.bc(), value);

            regs.set_de(value);
            assert_eq!([regs.get(Reg::D), regs.get(Reg::E)], value.to_be_bytes());

            regs.set_hl(value);
            assert_eq!([regs.get(Reg::H), regs.get(Reg::L)], value.to_be_bytes());

            regs.set_sp(value);
            assert_eq!(
                [regs.get(Reg::SpHigh), regs.get(Reg::SpLow)],
                value.to_be_bytes()
            );
        }
    }

    #[test]
    fn f_low_nibble_reads_zero() {
        let mut regs = Registers::default();
        regs.set_af(0x12FF);
        assert_eq!(regs.af(), 0x12F0);
        assert_eq!(regs.get(Reg::F), 0xF0);
    }

    #[test]
    fn scalar_set_clears_origin() {
        let mut regs = Registers::default();
        regs.cell_mut(Reg::A).origin = Some(crate::cell::CellRef::Io(0x44));
        regs.set(Reg::A, 3);
        assert_eq!(regs.cell(Reg::A).origin(), None);
    }
}
