// Processor core for Classic, Woodstock and Voyager calculators.
//
// A Processor executes one ten bit ROM word per `tick`. The host owns the
// ROM image, feeds key presses in and reads registers back; everything
// else (timing, rendering, storage) stays outside the core.

mod actions;
pub mod alu;
pub mod card;
mod classic;
pub mod cpu;
pub mod decode;
pub mod display;
pub mod emulator;
pub mod error;
mod keyboard;
pub mod model;
mod nut;
pub mod persist;
pub mod printer;
pub mod rom;
pub mod types;
mod woodstock;

#[cfg(feature = "wasm")]
pub mod platform {
    pub mod wasm;
}

pub use cpu::{Processor, Register, RegisterId};
pub use decode::{ArithOp, Instruction};
pub use display::DisplayState;
pub use emulator::{Emulator, Halt};
pub use error::{DiagnosticSink, Error, Result, TracingSink, Warning};
pub use model::{Family, Field, Model, Variant};
pub use printer::PrintMode;
pub use rom::Rom;
pub use types::{Flag, Pointer, RegId, RomAddr};
