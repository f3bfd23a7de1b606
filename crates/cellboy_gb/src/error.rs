use thiserror::Error;

use crate::machine::ControllerKind;

/// Fatal conditions that stop the run loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("illegal opcode 0x{opcode:02X} at 0x{address:04X}")]
    IllegalOpcode { opcode: u8, address: u16 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("ROM image is {0} bytes, too small to hold a cartridge header")]
    TooSmall(usize),

    #[error("cartridge header asks for {expected:?} but {active:?} is installed")]
    ControllerMismatch {
        expected: ControllerKind,
        active: ControllerKind,
    },
}
