// Display snapshot
//
// The processor does not drive segments itself. Every family shows the
// contents of A (digits) and B (decimal points and blanking masks) while
// the display is enabled, so the host only needs a copy of those two
// registers plus the flags that decide whether anything is lit.

use crate::cpu::Processor;
use crate::types::*;

/// Read-only copy of what the host needs to render the display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayState {
    pub a: Nibbles,
    pub b: Nibbles,
    pub display_enable: bool,
    pub enabled: bool,
    pub sleeping: bool,
    pub status: u16,
}

impl DisplayState {
    /// True if something should be drawn.
    pub fn is_lit(&self) -> bool {
        self.enabled && self.display_enable
    }

    /// Digits of A, most significant first.
    pub fn digits(&self) -> String {
        self.a.iter().rev().map(|d| format!("{:x}", d)).collect()
    }
}

impl Processor {
    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            a: *self.get_reg(RegId::A),
            b: *self.get_reg(RegId::B),
            display_enable: self.display_enabled(),
            enabled: self.enabled,
            sleeping: self.sleep,
            status: self.status_word(),
        }
    }
}
