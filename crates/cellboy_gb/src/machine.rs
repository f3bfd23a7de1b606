mod bus;
mod cartridge;
mod gameboy;
mod serial;
mod timer;
mod video;

pub use bus::SystemBus;
pub use cartridge::{
    BankController, CartCommand, Cartridge, ControllerKind, FlashCart, Header, Mbc1, Mbc2, Mbc3,
    Mbc5, SramSlot,
};
pub use gameboy::{Machine, StopReason};

#[cfg(test)]
mod tests;
