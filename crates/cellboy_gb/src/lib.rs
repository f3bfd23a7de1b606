//! Instrumented Game Boy / Game Boy Color core.
//!
//! Every byte the CPU can touch is a [`cell::Cell`] that remembers where its
//! value came from and how running code used it. [`Machine`] ties the CPU,
//! the bus and the cartridge together; a run can be followed by
//! [`Machine::dump_instrumentation`] to hand the usage records to an
//! external disassembly tool.

pub mod cell;
pub mod cpu;
mod error;
pub mod machine;

pub use error::{CartridgeError, StepError};
pub use machine::{
    BankController, Cartridge, ControllerKind, FlashCart, Header, Machine, StopReason,
};
