// Classic instruction set (HP-35, HP-45, HP-55, HP-70, HP-80)

use crate::alu::Span;
use crate::cpu::Processor;
use crate::decode::ArithOp::{self, *};
use crate::error::Result;
use crate::types::RegId::{A, B, C, M};
use crate::types::*;

/// Type 2 operations indexed by the five bit operation code.
pub static CLASSIC_ARITH: [ArithOp; 32] = [
    IfZero(B),                // 000
    Clear(B),                 // 001
    IfGreaterOrEqual(A, C),   // 002
    IfNotZero(C),             // 003
    Copy(C, B),               // 004
    Negate(C),                // 005
    Clear(C),                 // 006
    NegateDecrement(C),       // 007
    ShiftLeft(A),             // 010
    Copy(B, A),               // 011
    Sub(C, A, C),             // 012
    Decrement(C),             // 013
    Copy(A, C),               // 014
    IfZero(C),                // 015
    Add(C, A, C),             // 016
    Increment(C),             // 017
    IfGreaterOrEqual(A, B),   // 020
    Exchange(B, C),           // 021
    ShiftRight(C),            // 022
    IfNotZero(A),             // 023
    ShiftRight(B),            // 024
    Add(C, C, C),             // 025
    ShiftRight(A),            // 026
    Clear(A),                 // 027
    Sub(A, A, B),             // 030
    Exchange(A, B),           // 031
    Sub(A, A, C),             // 032
    Decrement(A),             // 033
    Add(A, A, B),             // 034
    Exchange(A, C),           // 035
    Add(A, A, C),             // 036
    Increment(A),             // 037
];

impl Processor {
    /// Type 0 on Classic parts. Bits 2-3 pick the group, bits 4-5 the
    /// subgroup and the top four bits are the operand.
    pub(crate) fn classic_special(&mut self, op: u16) -> Result<()> {
        let n = (op >> 6) as usize;
        match ((op >> 2) & 3, (op >> 4) & 3) {
            (0, 0) => match op {
                0o0000 => {} // nop
                _ => return Err(self.unexpected(op)),
            },
            (0, 1) => {
                if op & 0o100 == 0 {
                    // select rom n
                    self.pc = ((op >> 7) << 8) + (self.pc & 0xff);
                } else {
                    self.keys_to_rom_address();
                }
            }
            (0, 3) => match op {
                0o0060 => self.ret(),
                // c -> data address
                0o1160 => {
                    let digit = self.get_reg(C)[REG_SIZE - 2] as usize;
                    self.addr = self.clamp_data_address(digit);
                }
                // c -> data
                0o1360 => {
                    if let Some(i) = self.data_register(self.addr as usize) {
                        self.store_memory(i, C);
                    }
                }
                _ => return Err(self.unexpected(op)),
            },
            (1, 0) => self.set_status(n, true),
            (1, 1) => {
                // if s(n) = 0
                let bit = self.status_bit(n);
                self.set_flag(Flag::Carry, !bit);
                self.conditional_goto()?;
            }
            (1, 2) => self.set_status(n, false),
            (1, 3) => match op {
                0o0064 => self.status = [false; MAX_STATUS_BITS],
                0o1064 | 0o1264 => return Err(self.unexpected(op)),
                // delayed select rom
                _ => {
                    self.rom_number = op >> 7;
                    self.set_flag(Flag::DelayedRom, true);
                }
            },
            (2, 1) => self.load_constant(n as u8),
            (2, 2) => match op {
                0o0050 => self.toggle_display(),
                0o0250 => self.exchange_register(M, C, Span::WORD),
                0o0450 => self.push_stack(),
                0o0650 => self.pop_stack(),
                0o1050 => self.set_flag(Flag::DisplayEnable, false),
                0o1250 => self.copy_register(C, Some(M), Span::WORD),
                0o1450 => self.rotate_stack(),
                0o1650 => self.clear_registers(),
                _ => return Err(self.unexpected(op)),
            },
            (2, 3) => match op {
                // data -> c
                0o1370 => {
                    let i = self.data_register(self.addr as usize);
                    self.load_memory(C, i);
                }
                _ => return Err(self.unexpected(op)),
            },
            (3, 0) => self.p = n as u8,
            (3, 1) => self.dec_p(),
            (3, 2) => {
                // if p # n
                let differs = self.p as usize != n;
                self.set_flag(Flag::Carry, differs);
                self.conditional_goto()?;
            }
            (3, 3) => self.inc_p(),
            _ => return Err(self.unexpected(op)),
        }
        Ok(())
    }
}
