use super::{Bus, Cpu};

/// Interrupt sources, in dispatch priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    LcdStat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

pub const INTERRUPT_PRIORITY: [Interrupt; 5] = [
    Interrupt::VBlank,
    Interrupt::LcdStat,
    Interrupt::Timer,
    Interrupt::Serial,
    Interrupt::Joypad,
];

impl Interrupt {
    #[inline]
    pub fn mask(self) -> u8 {
        1 << self as u8
    }

    #[inline]
    pub fn vector(self) -> u16 {
        0x0040 + 8 * self as u16
    }
}

impl Cpu {
    /// Dispatch the highest-priority pending interrupt, if IME allows it.
    ///
    /// Any enabled pending interrupt ends HALT, with or without IME.
    /// Returns the cycles consumed.
    pub fn service_interrupts<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let iflags = bus.interrupt_flag();
        let pending = iflags & bus.interrupt_enable() & 0x1F;
        if pending == 0 {
            return 0;
        }
        self.halted = false;
        if !self.ime {
            return 0;
        }

        let Some(interrupt) = INTERRUPT_PRIORITY
            .into_iter()
            .find(|interrupt| pending & interrupt.mask() != 0)
        else {
            return 0;
        };

        bus.set_interrupt_flag(iflags & !interrupt.mask());
        log::debug!(
            "interrupt {:?}: vector=0x{:04X} pc=0x{:04X} sp=0x{:04X} IF=0x{:02X} IE=0x{:02X}",
            interrupt,
            interrupt.vector(),
            self.pc,
            self.regs.sp(),
            iflags,
            bus.interrupt_enable(),
        );
        self.service_interrupt(bus, interrupt.vector());
        20
    }

    /// Push PC and jump to `vector`, clearing IME.
    pub fn service_interrupt<B: Bus>(&mut self, bus: &mut B, vector: u16) {
        self.cycles = self.cycles.wrapping_add(20);
        self.ime = false;
        self.push_pc(bus);
        self.pc = vector;
    }
}
