// Fatal errors and non-fatal diagnostics

use thiserror::Error;
use tracing::warn;

use crate::types::RomAddr;

/// Conditions that stop the current step.
#[derive(Error, Debug)]
pub enum Error {
    /// The fetched word is not a defined instruction for this family.
    #[error("unexpected opcode {opcode:04o} at {addr}")]
    UnexpectedOpcode { addr: RomAddr, opcode: u16 },

    /// A field depending on the pointer was selected while the pointer
    /// was outside the register.
    #[error("pointer {pointer} out of range at {addr}")]
    PointerOutOfRange { addr: RomAddr, pointer: u8 },

    /// The program counter left the ROM image.
    #[error("program counter {0} is outside the rom")]
    PcOutOfRange(RomAddr),

    #[error("unknown calculator model '{0}'")]
    UnknownModel(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable problems. Execution continues after one is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("invalid register {register} at {addr}, using {clamped}")]
    InvalidRegister {
        addr: RomAddr,
        register: usize,
        clamped: usize,
    },

    #[error("invalid address {target:#o} at {addr}")]
    InvalidAddress { addr: RomAddr, target: u32 },

    #[error("pointer {pointer} out of range at {addr}")]
    PointerClamped { addr: RomAddr, pointer: u8 },

    #[error("status bit {bit} does not exist at {addr}")]
    InvalidStatusBit { addr: RomAddr, bit: usize },

    #[error("rom patch line {line}: address {address:#o} beyond end of rom")]
    PatchOutOfRange { line: usize, address: u32 },

    #[error("print buffer full at {addr}")]
    PrinterOverflow { addr: RomAddr },
}

/// Receives non-fatal diagnostics from the processor.
pub trait DiagnosticSink {
    fn report(&mut self, warning: &Warning);
}

/// Default sink, forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, warning: &Warning) {
        warn!("{}", warning);
    }
}

impl<F> DiagnosticSink for F
where
    F: FnMut(&Warning),
{
    fn report(&mut self, warning: &Warning) {
        self(warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = Error::UnexpectedOpcode {
            addr: RomAddr(0o0017),
            opcode: 0o1760,
        };
        assert_eq!(e.to_string(), "unexpected opcode 1760 at 0-0017");

        let e = Error::UnknownModel("hp99".into());
        assert_eq!(e.to_string(), "unknown calculator model 'hp99'");
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |w: &Warning| seen.push(w.clone());
            sink.report(&Warning::PrinterOverflow { addr: RomAddr(1) });
        }
        assert_eq!(seen.len(), 1);
    }
}
