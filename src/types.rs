// Shared constants and small value types used across the processor core

use std::fmt;

/// Nibbles per register.
pub const REG_SIZE: usize = 14;
/// Nibbles holding the exponent and its sign.
pub const EXP_SIZE: usize = 3;
/// Depth of the circular return stack.
pub const STACK_SIZE: usize = 4;
/// Widest status word of any family (Woodstock).
pub const MAX_STATUS_BITS: usize = 16;

// Arithmetic base
pub const DEC: u8 = 10;
pub const HEX: u8 = 16;

// Banked Woodstock ROMs
pub const BANK_BIT: u16 = 0x1000;
pub const BANK_ZERO_LIMIT: u16 = 0x1400;

pub type Nibbles = [u8; REG_SIZE];

/// Named processor registers. Memory cells are addressed separately.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum RegId {
    A,
    B,
    C,
    Y,
    Z,
    T,
    M,
    N,
}

pub const REGISTERS: usize = 8;

impl RegId {
    pub const ALL: [RegId; REGISTERS] = [
        RegId::A,
        RegId::B,
        RegId::C,
        RegId::Y,
        RegId::Z,
        RegId::T,
        RegId::M,
        RegId::N,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Registers cleared by "clear registers" (everything but M and N).
    #[inline]
    pub fn is_volatile(self) -> bool {
        !matches!(self, RegId::M | RegId::N)
    }

    pub fn name(self) -> &'static str {
        match self {
            RegId::A => "a",
            RegId::B => "b",
            RegId::C => "c",
            RegId::Y => "y",
            RegId::Z => "z",
            RegId::T => "t",
            RegId::M => "m",
            RegId::N => "n",
        }
    }
}

/// Processor flags, in the order they are persisted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flag {
    Carry,
    PrevCarry,
    DelayedRom,
    DisplayEnable,
    BankSwitch,
    Mode,
}

pub const FLAGS: usize = 6;

/// Which pointer a Nut instruction addresses.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Pointer {
    #[default]
    P,
    Q,
}

/// A ROM address printed the way listings show it: bank digit, then a
/// four digit octal offset within the bank.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RomAddr(pub u16);

impl fmt::Display for RomAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:1o}-{:04o}", self.0 >> 12, self.0 & 0x0fff)
    }
}
