//! The 16-bit address decoder and the arenas behind it.

use std::io::{self, Write};

use crate::cell::{self, Cell, CellRef, ID_HRAM, ID_IO, ID_OAM, ID_VRAM, ID_WRAM, UNTRACKED};
use crate::cpu::{Bus, Interrupt};

use super::cartridge::Cartridge;
use super::serial::Serial;
use super::timer::Timer;
use super::video::Video;

mod dma;
mod mmio;

use mmio::{IF, KEY1, SVBK, VBK};

const VRAM_BANK: usize = 0x2000;
const WRAM_BANK: usize = 0x1000;

fn io_arena() -> Vec<Cell> {
    let mut io: Vec<Cell> = (0..0x80u64)
        .map(|n| Cell::tracked(ID_IO | (0xFF00 + n)))
        .collect();
    io[0x7F] = Cell::untracked();
    io
}

/// Everything the CPU can address except its own registers.
pub struct SystemBus {
    pub(crate) cartridge: Cartridge,
    boot: Vec<Cell>,
    vram: Vec<Cell>,
    wram: Vec<Cell>,
    oam: Vec<Cell>,
    io: Vec<Cell>,
    hram: Vec<Cell>,
    ie: Cell,
    bg_palette: [u8; 0x40],
    obj_palette: [u8; 0x40],
    pub(crate) timer: Timer,
    pub(crate) serial: Serial,
    pub(crate) video: Video,
    cgb: bool,
    /// CPU cycle counter as of the last sync.
    now: u64,
    reboot_requested: bool,
}

impl SystemBus {
    pub fn new(cartridge: Cartridge, boot: &[u8]) -> Self {
        let cgb = cartridge.header().cgb;
        Self {
            cartridge,
            boot: boot
                .iter()
                .map(|&b| Cell {
                    value: b,
                    ..Cell::untracked()
                })
                .collect(),
            vram: cell::arena(ID_VRAM, 2 * VRAM_BANK),
            wram: cell::arena(ID_WRAM, 8 * WRAM_BANK),
            oam: cell::arena(ID_OAM, 0xA0),
            io: io_arena(),
            hram: cell::arena(ID_HRAM, 0x7F),
            ie: Cell::tracked(ID_IO | 0xFFFF),
            bg_palette: [0xFF; 0x40],
            obj_palette: [0xFF; 0x40],
            timer: Timer::default(),
            serial: Serial::default(),
            video: Video::default(),
            cgb,
            now: 0,
            reboot_requested: false,
        }
    }

    /// Power-cycle everything but the cartridge, the boot ROM and the serial
    /// capture.
    pub(crate) fn reset(&mut self) {
        self.cgb = self.cartridge.header().cgb;
        self.vram = cell::arena(ID_VRAM, 2 * VRAM_BANK);
        self.wram = cell::arena(ID_WRAM, 8 * WRAM_BANK);
        self.oam = cell::arena(ID_OAM, 0xA0);
        self.io = io_arena();
        self.hram = cell::arena(ID_HRAM, 0x7F);
        self.ie = Cell::tracked(ID_IO | 0xFFFF);
        self.bg_palette = [0xFF; 0x40];
        self.obj_palette = [0xFF; 0x40];
        self.timer = Timer::default();
        self.serial.cancel();
        self.video = Video::default();
        self.now = 0;
        self.reboot_requested = false;
    }

    pub fn cgb(&self) -> bool {
        self.cgb
    }

    pub fn has_boot_rom(&self) -> bool {
        self.boot.first().is_some_and(|cell| cell.value != 0)
    }

    fn boot_mapped(&self) -> bool {
        !self.boot.is_empty() && self.io[mmio::BOOT as usize].value == 0
    }

    /// Give the cartridge back and keep everything else.
    pub(crate) fn swap_cartridge(&mut self, cartridge: Cartridge) -> Cartridge {
        self.cgb = cartridge.header().cgb;
        std::mem::replace(&mut self.cartridge, cartridge)
    }

    pub(crate) fn take_reboot_request(&mut self) -> bool {
        std::mem::take(&mut self.reboot_requested)
    }

    pub fn raise_interrupt(&mut self, mask: u8) {
        self.io[IF as usize].value |= mask & 0x1F;
    }

    /// Advance the peripherals to `now`. Returns `true` when a frame finished.
    pub(crate) fn update(&mut self, now: u64, speed: u8) -> bool {
        self.now = now;

        let tac = self.io[mmio::TAC as usize].value;
        let tma = self.io[mmio::TMA as usize].value;
        if self
            .timer
            .update(now, tac, tma, &mut self.io[mmio::TIMA as usize].value)
        {
            self.raise_interrupt(Interrupt::Timer.mask());
        }

        if self.serial.update(now, &mut self.io[mmio::SB as usize].value) {
            self.io[mmio::SC as usize].value &= !0x80;
            self.raise_interrupt(Interrupt::Serial.mask());
        }

        let lcdc = self.io[mmio::LCDC as usize].value;
        let lyc = self.io[mmio::LYC as usize].value;
        let mut ly = self.io[mmio::LY as usize].value;
        let mut stat = self.io[mmio::STAT as usize].value;
        let events = self.video.update(now, speed, lcdc, lyc, &mut ly, &mut stat);
        self.io[mmio::LY as usize].value = ly;
        self.io[mmio::STAT as usize].value = stat;
        self.raise_interrupt(events.interrupts);
        events.frame
    }

    /// Bus-internal copy (DMA). Same bookkeeping as the CPU's moves.
    fn copy(&mut self, dst: CellRef, src: CellRef) {
        let value = self.load(src);
        self.store(dst, value);

        let root = self.cell(src).and_then(Cell::origin).unwrap_or(src);
        let dst_id = self.cell(dst).map_or(UNTRACKED, Cell::id);
        if let Some(cell) = self.cell_mut(dst) {
            cell.origin = Some(root);
        }
        if dst_id != UNTRACKED {
            if let Some(origin) = self.cell_mut(root) {
                origin.record_destination(dst_id);
            }
        }
    }

    /// ROM, SRAM, WRAM, HRAM, VRAM then OAM.
    pub fn dump_instrumentation<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        self.cartridge.dump_rom(sink)?;
        self.cartridge.dump_sram(sink)?;
        cell::dump_arena(&self.wram, sink)?;
        cell::dump_arena(&self.hram, sink)?;
        cell::dump_arena(&self.vram, sink)?;
        cell::dump_arena(&self.oam, sink)
    }
}

impl Bus for SystemBus {
    fn resolve(&self, addr: u16) -> CellRef {
        match addr {
            0x0000..=0x00FF if self.boot_mapped() => CellRef::Boot(addr),
            // Color boot ROMs also cover 0200-08FF.
            0x0200..=0x08FF if self.boot_mapped() && (addr as usize) < self.boot.len() => {
                CellRef::Boot(addr)
            }
            0x0000..=0x7FFF => self.cartridge.rom_cell(addr),
            0x8000..=0x9FFF => {
                let bank = if self.cgb {
                    (self.io[VBK as usize].value & 0x01) as usize
                } else {
                    0
                };
                CellRef::VRam((bank * VRAM_BANK + (addr - 0x8000) as usize) as u16)
            }
            0xA000..=0xBFFF => self.cartridge.sram_cell(addr),
            0xC000..=0xFDFF => {
                let offset = (addr - 0xC000) as usize & 0x1FFF;
                if offset < WRAM_BANK {
                    return CellRef::WRam(offset as u16);
                }
                let bank = if self.cgb {
                    (self.io[SVBK as usize].value & 0x07).max(1) as usize
                } else {
                    1
                };
                CellRef::WRam((bank * WRAM_BANK + offset - WRAM_BANK) as u16)
            }
            0xFE00..=0xFE9F => CellRef::Oam((addr - 0xFE00) as u8),
            0xFEA0..=0xFEFF => CellRef::OpenBus,
            0xFF00..=0xFF7F => {
                let n = (addr - 0xFF00) as u8;
                if mmio::listed(n) {
                    CellRef::Io(n)
                } else {
                    CellRef::OpenBus
                }
            }
            0xFF80..=0xFFFE => CellRef::HRam((addr - 0xFF80) as u8),
            0xFFFF => CellRef::Ie,
        }
    }

    fn cell(&self, at: CellRef) -> Option<&Cell> {
        match at {
            CellRef::Boot(addr) => self.boot.get(addr as usize),
            CellRef::Rom { .. } | CellRef::SRam(_) | CellRef::Rtc(_) => self.cartridge.cell(at),
            CellRef::VRam(n) => self.vram.get(n as usize),
            CellRef::WRam(n) => self.wram.get(n as usize),
            CellRef::Oam(n) => self.oam.get(n as usize),
            CellRef::Io(n) => self.io.get(n as usize),
            CellRef::HRam(n) => self.hram.get(n as usize),
            CellRef::Ie => Some(&self.ie),
            CellRef::Reg(_) | CellRef::OpenBus => None,
        }
    }

    fn cell_mut(&mut self, at: CellRef) -> Option<&mut Cell> {
        match at {
            CellRef::Boot(addr) => self.boot.get_mut(addr as usize),
            CellRef::Rom { .. } | CellRef::SRam(_) | CellRef::Rtc(_) => {
                self.cartridge.cell_mut(at)
            }
            CellRef::VRam(n) => self.vram.get_mut(n as usize),
            CellRef::WRam(n) => self.wram.get_mut(n as usize),
            CellRef::Oam(n) => self.oam.get_mut(n as usize),
            CellRef::Io(n) => self.io.get_mut(n as usize),
            CellRef::HRam(n) => self.hram.get_mut(n as usize),
            CellRef::Ie => Some(&mut self.ie),
            CellRef::Reg(_) | CellRef::OpenBus => None,
        }
    }

    fn load(&self, at: CellRef) -> u8 {
        match at {
            CellRef::Io(n) => self.io_load(n),
            CellRef::Rom { .. } | CellRef::SRam(_) | CellRef::Rtc(_) => self.cartridge.load(at),
            _ => self.cell(at).map_or(0xFF, Cell::value),
        }
    }

    fn store(&mut self, at: CellRef, value: u8) {
        match at {
            // Boot ROM is read-only.
            CellRef::Boot(_) | CellRef::Reg(_) | CellRef::OpenBus => {}
            CellRef::Rom { .. } | CellRef::SRam(_) | CellRef::Rtc(_) => {
                if self.cartridge.store(at, value) {
                    self.reboot_requested = true;
                }
            }
            CellRef::Io(n) => self.io_store(n, value),
            _ => {
                if let Some(cell) = self.cell_mut(at) {
                    cell.value = value;
                }
            }
        }
    }

    fn rom_bank(&self) -> u32 {
        self.cartridge.rom_bank_number()
    }

    fn sync(&mut self, cycles: u64) {
        self.now = cycles;
    }

    fn interrupt_flag(&self) -> u8 {
        self.io[IF as usize].value & 0x1F
    }

    fn set_interrupt_flag(&mut self, value: u8) {
        self.io[IF as usize].value = value & 0x1F;
    }

    fn interrupt_enable(&self) -> u8 {
        self.ie.value
    }

    fn speed_switch_armed(&self) -> bool {
        self.io[KEY1 as usize].value & 0x01 != 0
    }

    fn set_double_speed(&mut self, enabled: bool) {
        self.io[KEY1 as usize].value = if enabled { 0x80 } else { 0x00 };
    }
}
