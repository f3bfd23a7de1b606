//! Cartridge ROM/RAM arenas and the bank controller in front of them.
//!
//! The bus only talks to the controller through five operations: map a ROM
//! address, map an SRAM address, intercept a ROM write, report the ROM bank
//! and report whether SRAM is enabled. Offsets the controller returns are
//! reduced modulo the arena size here, never by the controller.

mod flash;
mod mbc1;
mod mbc2;
mod mbc3;
mod mbc5;

use std::io::{self, Write};

pub use flash::FlashCart;
pub use mbc1::Mbc1;
pub use mbc2::Mbc2;
pub use mbc3::Mbc3;
pub use mbc5::Mbc5;

use crate::cell::{self, Cell, CellRef, ID_ROM, ID_SRAM};
use crate::error::CartridgeError;

const ROM_BANK_SIZE: usize = 0x4000;
const HEADER_END: usize = 0x150;

/// Where an A000-BFFF access lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SramSlot {
    /// Flat offset into the SRAM arena.
    Ram(u32),
    /// MBC3 clock register index.
    Rtc(u8),
}

/// Side effects a controller asks the cartridge to carry out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartCommand {
    FillSram {
        offset: u32,
        bytes: Vec<u8>,
    },
    /// Restart into a freshly loaded image.
    Reboot,
}

impl CartCommand {
    pub(crate) fn status(byte: u8) -> Self {
        CartCommand::FillSram {
            offset: 0,
            bytes: vec![byte],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerKind {
    None,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc3Rtc,
    Mbc5,
    FlashCart,
}

/// The active memory bank controller.
#[derive(Clone, Debug)]
pub enum BankController {
    None,
    Mbc1(Mbc1),
    Mbc2(Mbc2),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
    FlashCart(Box<FlashCart>),
}

impl BankController {
    pub fn for_kind(kind: ControllerKind) -> Self {
        match kind {
            ControllerKind::None => BankController::None,
            ControllerKind::Mbc1 => BankController::Mbc1(Mbc1::default()),
            ControllerKind::Mbc2 => BankController::Mbc2(Mbc2::default()),
            ControllerKind::Mbc3 => BankController::Mbc3(Mbc3::new(false)),
            ControllerKind::Mbc3Rtc => BankController::Mbc3(Mbc3::new(true)),
            ControllerKind::Mbc5 => BankController::Mbc5(Mbc5::default()),
            ControllerKind::FlashCart => {
                BankController::FlashCart(Box::new(FlashCart::new(Vec::new())))
            }
        }
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            BankController::None => ControllerKind::None,
            BankController::Mbc1(_) => ControllerKind::Mbc1,
            BankController::Mbc2(_) => ControllerKind::Mbc2,
            BankController::Mbc3(m) if m.has_rtc() => ControllerKind::Mbc3Rtc,
            BankController::Mbc3(_) => ControllerKind::Mbc3,
            BankController::Mbc5(_) => ControllerKind::Mbc5,
            BankController::FlashCart(_) => ControllerKind::FlashCart,
        }
    }

    pub fn map_rom(&self, addr: u16) -> u32 {
        match self {
            BankController::None => addr as u32,
            BankController::Mbc1(m) => m.map_rom(addr),
            BankController::Mbc2(m) => m.map_rom(addr),
            BankController::Mbc3(m) => m.map_rom(addr),
            BankController::Mbc5(m) => m.map_rom(addr),
            BankController::FlashCart(m) => m.map_rom(addr),
        }
    }

    /// `offset` is relative to 0xA000.
    pub fn map_sram(&self, offset: u16) -> SramSlot {
        match self {
            BankController::None => SramSlot::Ram(offset as u32),
            BankController::Mbc1(m) => m.map_sram(offset),
            BankController::Mbc2(m) => m.map_sram(offset),
            BankController::Mbc3(m) => m.map_sram(offset),
            BankController::Mbc5(m) => m.map_sram(offset),
            BankController::FlashCart(m) => m.map_sram(offset),
        }
    }

    pub fn write_rom(&mut self, addr: u16, value: u8) -> Option<CartCommand> {
        match self {
            BankController::None => {}
            BankController::Mbc1(m) => m.write_rom(addr, value),
            BankController::Mbc2(m) => m.write_rom(addr, value),
            BankController::Mbc3(m) => m.write_rom(addr, value),
            BankController::Mbc5(m) => m.write_rom(addr, value),
            BankController::FlashCart(m) => return m.write_rom(addr, value),
        }
        None
    }

    pub fn rom_bank_number(&self) -> u32 {
        match self {
            BankController::None => 1,
            BankController::Mbc1(m) => m.rom_bank_number(),
            BankController::Mbc2(m) => m.rom_bank_number(),
            BankController::Mbc3(m) => m.rom_bank_number(),
            BankController::Mbc5(m) => m.rom_bank_number(),
            BankController::FlashCart(m) => m.rom_bank_number(),
        }
    }

    pub fn sram_enabled(&self) -> bool {
        match self {
            BankController::None | BankController::FlashCart(_) => true,
            BankController::Mbc1(m) => m.sram_enabled(),
            BankController::Mbc2(m) => m.sram_enabled(),
            BankController::Mbc3(m) => m.sram_enabled(),
            BankController::Mbc5(m) => m.sram_enabled(),
        }
    }

    /// SRAM arena size this controller needs regardless of the header.
    fn min_sram(&self) -> usize {
        match self {
            BankController::Mbc2(_) => Mbc2::RAM_SIZE,
            BankController::FlashCart(_) => FlashCart::SRAM_SIZE,
            _ => 0,
        }
    }

    fn nibble_ram(&self) -> bool {
        matches!(self, BankController::Mbc2(_))
    }
}

/// Decoded cartridge header (0x0134-0x014F).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub title: String,
    pub cgb: bool,
    pub cartridge_type: u8,
    pub rom_size: u8,
    pub ram_size: u8,
    pub header_checksum: u8,
    computed_checksum: u8,
}

impl Header {
    pub fn parse(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.len() < HEADER_END {
            return Err(CartridgeError::TooSmall(rom.len()));
        }
        let title = rom[0x134..0x144]
            .iter()
            .take_while(|&&b| b != 0)
            .filter(|b| b.is_ascii_graphic() || **b == b' ')
            .map(|&b| b as char)
            .collect();
        let computed_checksum = rom[0x134..=0x14C]
            .iter()
            .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1));

        Ok(Self {
            title,
            cgb: rom[0x143] & 0x80 != 0,
            cartridge_type: rom[0x147],
            rom_size: rom[0x148],
            ram_size: rom[0x149],
            header_checksum: rom[0x14D],
            computed_checksum,
        })
    }

    pub fn checksum_ok(&self) -> bool {
        self.header_checksum == self.computed_checksum
    }

    pub fn expected_controller(&self) -> ControllerKind {
        match self.cartridge_type {
            0x01..=0x03 => ControllerKind::Mbc1,
            0x05..=0x06 => ControllerKind::Mbc2,
            0x0F..=0x10 => ControllerKind::Mbc3Rtc,
            0x11..=0x13 => ControllerKind::Mbc3,
            0x19..=0x1E => ControllerKind::Mbc5,
            _ => ControllerKind::None,
        }
    }

    /// External RAM size declared by 0x0149.
    pub fn sram_bytes(&self) -> usize {
        match self.ram_size {
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x20000,
            0x05 => 0x10000,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cartridge {
    header: Header,
    rom: Vec<Cell>,
    sram: Vec<Cell>,
    rtc: [Cell; 5],
    controller: BankController,
}

impl Cartridge {
    /// Build a cartridge from a ROM image, picking the controller from the
    /// header.
    pub fn from_bytes(rom: &[u8]) -> Result<Self, CartridgeError> {
        let header = Header::parse(rom)?;
        let controller = BankController::for_kind(header.expected_controller());
        Ok(Self::assemble(header, rom, controller))
    }

    /// Like [`Cartridge::from_bytes`] with an explicit controller.
    pub fn with_controller(rom: &[u8], controller: BankController) -> Result<Self, CartridgeError> {
        let header = Header::parse(rom)?;
        Ok(Self::assemble(header, rom, controller))
    }

    /// No cartridge inserted: 32 KiB of an illegal opcode.
    pub fn empty() -> Self {
        Self::assemble(
            Header::default(),
            &[0xDD; 2 * ROM_BANK_SIZE],
            BankController::None,
        )
    }

    fn assemble(header: Header, image: &[u8], controller: BankController) -> Self {
        let banks = image
            .len()
            .div_ceil(ROM_BANK_SIZE)
            .next_power_of_two()
            .max(2);
        let mut rom = cell::arena(ID_ROM, banks * ROM_BANK_SIZE);
        let padded = image.iter().chain(std::iter::repeat(&0xFF));
        for (cell, &byte) in rom.iter_mut().zip(padded) {
            cell.value = byte;
        }

        let sram_len = header.sram_bytes().max(controller.min_sram());
        let mut sram = cell::arena(ID_SRAM, sram_len);
        let fill = if controller.nibble_ram() { 0xF0 } else { 0x00 };
        sram.iter_mut().for_each(|cell| cell.value = fill);

        Self {
            header,
            rom,
            sram,
            rtc: [Cell::untracked(); 5],
            controller,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn controller(&self) -> &BankController {
        &self.controller
    }

    pub fn rom_len(&self) -> usize {
        self.rom.len()
    }

    pub fn sram_len(&self) -> usize {
        self.sram.len()
    }

    /// Replace the controller, growing SRAM to what it needs.
    pub fn install_controller(&mut self, controller: BankController) {
        let needed = controller.min_sram();
        if self.sram.len() < needed {
            let start = self.sram.len();
            self.sram
                .extend((start..needed).map(|n| Cell::tracked(ID_SRAM | n as u64)));
        }
        self.controller = controller;
    }

    /// Compare the installed controller with what the header asks for.
    pub fn check_controller(&self) -> Result<(), CartridgeError> {
        let expected = self.header.expected_controller();
        let active = self.controller.kind();
        if expected == active {
            Ok(())
        } else {
            Err(CartridgeError::ControllerMismatch { expected, active })
        }
    }

    pub fn rom_bank_number(&self) -> u32 {
        self.controller.rom_bank_number()
    }

    pub(crate) fn rom_cell(&self, addr: u16) -> CellRef {
        let offset = self.controller.map_rom(addr) as usize % self.rom.len();
        CellRef::Rom {
            offset: offset as u32,
            addr,
        }
    }

    pub(crate) fn sram_cell(&self, addr: u16) -> CellRef {
        if !self.controller.sram_enabled() {
            return CellRef::OpenBus;
        }
        match self.controller.map_sram(addr.wrapping_sub(0xA000)) {
            SramSlot::Rtc(n) => CellRef::Rtc(n),
            SramSlot::Ram(_) if self.sram.is_empty() => CellRef::OpenBus,
            SramSlot::Ram(offset) => CellRef::SRam((offset as usize % self.sram.len()) as u32),
        }
    }

    pub(crate) fn cell(&self, at: CellRef) -> Option<&Cell> {
        match at {
            CellRef::Rom { offset, .. } => self.rom.get(offset as usize),
            CellRef::SRam(offset) => self.sram.get(offset as usize),
            CellRef::Rtc(n) => self.rtc.get(n as usize),
            _ => None,
        }
    }

    pub(crate) fn cell_mut(&mut self, at: CellRef) -> Option<&mut Cell> {
        match at {
            CellRef::Rom { offset, .. } => self.rom.get_mut(offset as usize),
            CellRef::SRam(offset) => self.sram.get_mut(offset as usize),
            CellRef::Rtc(n) => self.rtc.get_mut(n as usize),
            _ => None,
        }
    }

    pub(crate) fn load(&self, at: CellRef) -> u8 {
        self.cell(at).map_or(0xFF, Cell::value)
    }

    /// Device write. Returns `true` when the controller asked for a reboot.
    pub(crate) fn store(&mut self, at: CellRef, value: u8) -> bool {
        match at {
            CellRef::Rom { addr, .. } => match self.controller.write_rom(addr, value) {
                Some(CartCommand::Reboot) => return true,
                Some(CartCommand::FillSram { offset, bytes }) => self.fill_sram(offset, &bytes),
                None => {}
            },
            CellRef::SRam(_) => {
                let value = if self.controller.nibble_ram() {
                    value | 0xF0
                } else {
                    value
                };
                if let Some(cell) = self.cell_mut(at) {
                    cell.value = value;
                }
            }
            CellRef::Rtc(_) => {
                if let Some(cell) = self.cell_mut(at) {
                    cell.value = value;
                }
            }
            _ => {}
        }
        false
    }

    fn fill_sram(&mut self, offset: u32, bytes: &[u8]) {
        for (cell, &byte) in self.sram.iter_mut().skip(offset as usize).zip(bytes) {
            cell.value = byte;
            cell.origin = None;
        }
    }

    pub(crate) fn dump_rom<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        cell::dump_arena(&self.rom, sink)
    }

    pub(crate) fn dump_sram<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        cell::dump_arena(&self.sram, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with(cartridge_type: u8, ram_size: u8, banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * ROM_BANK_SIZE];
        for (bank, chunk) in rom.chunks_mut(ROM_BANK_SIZE).enumerate() {
            chunk[0] = bank as u8;
        }
        rom[0x147] = cartridge_type;
        rom[0x149] = ram_size;
        rom
    }

    fn bank_at(cart: &Cartridge, addr: u16) -> usize {
        match cart.rom_cell(addr) {
            CellRef::Rom { offset, .. } => offset as usize / ROM_BANK_SIZE,
            other => panic!("not a ROM cell: {other:?}"),
        }
    }

    fn write(cart: &mut Cartridge, addr: u16, value: u8) {
        let at = cart.rom_cell(addr);
        cart.store(at, value);
    }

    #[test]
    fn mbc1_bank_zero_select_reads_bank_one() {
        let mut cart = Cartridge::from_bytes(&rom_with(0x01, 0, 8)).unwrap();
        write(&mut cart, 0x2100, 0x00);
        assert_eq!(bank_at(&cart, 0x4000), 1);
        assert_eq!(cart.rom_bank_number(), 1);
    }

    #[test]
    fn mbc1_upper_bits_and_mode() {
        let mut cart = Cartridge::from_bytes(&rom_with(0x03, 0x03, 64)).unwrap();
        write(&mut cart, 0x2000, 0x04);
        write(&mut cart, 0x4000, 0x01);
        assert_eq!(bank_at(&cart, 0x4000), 0x24);
        // Mode 0: the low window stays on bank 0.
        assert_eq!(bank_at(&cart, 0x0000), 0);
        write(&mut cart, 0x6000, 0x01);
        assert_eq!(bank_at(&cart, 0x0000), 0x20);

        write(&mut cart, 0x0000, 0x0A);
        assert_eq!(cart.sram_cell(0xA000), CellRef::SRam(0x2000));
    }

    #[test]
    fn mbc1_bank_reduced_modulo_rom_size() {
        let mut cart = Cartridge::from_bytes(&rom_with(0x01, 0, 4)).unwrap();
        write(&mut cart, 0x2000, 0x06);
        assert_eq!(bank_at(&cart, 0x4000), 2);
    }

    #[test]
    fn mbc2_bit8_selects_register_and_ram_is_nibbles() {
        let mut cart = Cartridge::from_bytes(&rom_with(0x05, 0, 16)).unwrap();
        assert_eq!(cart.sram_len(), 0x200);

        write(&mut cart, 0x0100, 0x03);
        assert_eq!(bank_at(&cart, 0x4000), 3);
        write(&mut cart, 0x2100, 0x00);
        assert_eq!(bank_at(&cart, 0x4000), 1);

        assert_eq!(cart.sram_cell(0xA000), CellRef::OpenBus);
        write(&mut cart, 0x0000, 0x0A);
        let at = cart.sram_cell(0xA205);
        assert_eq!(at, CellRef::SRam(0x005));
        cart.store(at, 0x3C);
        assert_eq!(cart.load(at), 0xFC);
    }

    #[test]
    fn mbc3_bank_zero_is_not_coerced() {
        let mut cart = Cartridge::from_bytes(&rom_with(0x11, 0, 8)).unwrap();
        write(&mut cart, 0x2000, 0x00);
        assert_eq!(bank_at(&cart, 0x4000), 0);
        write(&mut cart, 0x2000, 0x05);
        assert_eq!(bank_at(&cart, 0x4000), 5);
    }

    #[test]
    fn mbc3_rtc_registers_hold_values() {
        let mut cart = Cartridge::from_bytes(&rom_with(0x10, 0x03, 8)).unwrap();
        write(&mut cart, 0x0000, 0x0A);
        write(&mut cart, 0x4000, 0x0A);
        let at = cart.sram_cell(0xA000);
        assert_eq!(at, CellRef::Rtc(2));
        cart.store(at, 17);
        write(&mut cart, 0x6000, 0x00);
        write(&mut cart, 0x6000, 0x01);
        assert_eq!(cart.load(at), 17);

        write(&mut cart, 0x4000, 0x02);
        assert_eq!(cart.sram_cell(0xA001), CellRef::SRam(0x4001));
    }

    #[test]
    fn mbc5_nine_bit_bank_and_zero_bank() {
        let mut cart = Cartridge::from_bytes(&rom_with(0x19, 0, 16)).unwrap();
        write(&mut cart, 0x2000, 0x00);
        assert_eq!(bank_at(&cart, 0x4000), 0);
        write(&mut cart, 0x2000, 0x34);
        write(&mut cart, 0x3000, 0x01);
        assert_eq!(cart.rom_bank_number(), 0x134);
        // Reduced by the arena, not the controller.
        assert_eq!(bank_at(&cart, 0x4000), 0x134 % 16);
        write(&mut cart, 0x3000, 0x00);
        assert_eq!(cart.rom_bank_number(), 0x34);
    }

    #[test]
    fn rom_only_has_identity_mapping() {
        let cart = Cartridge::from_bytes(&rom_with(0x00, 0x02, 2)).unwrap();
        assert_eq!(bank_at(&cart, 0x7FFF), 1);
        assert_eq!(cart.sram_cell(0xBFFF), CellRef::SRam(0x1FFF));
        assert_eq!(cart.rom_bank_number(), 1);
    }

    #[test]
    fn small_images_are_rejected_and_padded() {
        assert_eq!(
            Cartridge::from_bytes(&[0u8; 0x20]).unwrap_err(),
            CartridgeError::TooSmall(0x20)
        );
        let cart = Cartridge::from_bytes(&[0u8; 0x5000]).unwrap();
        assert_eq!(cart.rom_len(), 2 * ROM_BANK_SIZE);
        let tail = cart.rom_cell(0x7FFF);
        assert_eq!(cart.load(tail), 0xFF);
    }

    #[test]
    fn controller_mismatch_is_reported() {
        let rom = rom_with(0x01, 0, 4);
        let cart = Cartridge::with_controller(&rom, BankController::None).unwrap();
        assert_eq!(
            cart.check_controller(),
            Err(CartridgeError::ControllerMismatch {
                expected: ControllerKind::Mbc1,
                active: ControllerKind::None,
            })
        );
        let fresh = Cartridge::from_bytes(&rom).unwrap();
        assert!(fresh.check_controller().is_ok());
    }

    #[test]
    fn header_checksum() {
        let mut rom = rom_with(0x00, 0, 2);
        rom[0x134..0x139].copy_from_slice(b"HELLO");
        let sum = rom[0x134..=0x14C]
            .iter()
            .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1));
        rom[0x14D] = sum;
        let header = Header::parse(&rom).unwrap();
        assert_eq!(header.title, "HELLO");
        assert!(header.checksum_ok());
        rom[0x14D] ^= 1;
        assert!(!Header::parse(&rom).unwrap().checksum_ok());
    }

    #[test]
    fn flash_cart_grows_sram_and_fills_sector() {
        let mut cart = Cartridge::from_bytes(&rom_with(0x00, 0, 2)).unwrap();
        assert_eq!(cart.sram_len(), 0);
        let mut image = vec![0u8; 1024];
        image[0] = 0x5A;
        cart.install_controller(BankController::FlashCart(Box::new(FlashCart::new(image))));
        assert_eq!(cart.sram_len(), FlashCart::SRAM_SIZE);

        for (addr, value) in [(0x7F00, 0xE1), (0x7F10, 0xE2), (0x7F20, 0xE3), (0x7F30, 0x01)] {
            write(&mut cart, addr, value);
        }
        assert_eq!(cart.load(CellRef::SRam(0)), 0x5A);

        write(&mut cart, 0x7F36, 0x03);
        assert_eq!(cart.load(CellRef::SRam(0)), 0x02);

        let at = cart.rom_cell(0x7FE0);
        assert!(cart.store(at, 0x80));
    }
}
