// Woodstock and Spice instruction set
//
// Also covers the HP-10 printer opcodes and the HP-67 card reader flags,
// both of which live in otherwise unused corners of the type 0 space.

use crate::alu::Span;
use crate::card::take;
use crate::cpu::Processor;
use crate::decode::ArithOp::{self, *};
use crate::error::{Result, Warning};
use crate::model::ClearData;
use crate::types::RegId::{A, B, C, M, N, Y};
use crate::types::*;

/// Type 2 operations indexed by the five bit operation code.
pub static WOODSTOCK_ARITH: [ArithOp; 32] = [
    Clear(A),               // 000
    Clear(B),               // 001
    Exchange(A, B),         // 002
    Copy(B, A),             // 003
    Exchange(A, C),         // 004
    Copy(A, C),             // 005
    Copy(C, B),             // 006
    Exchange(B, C),         // 007
    Clear(C),               // 010
    Add(A, A, B),           // 011
    Add(A, A, C),           // 012
    Add(C, C, C),           // 013
    Add(C, A, C),           // 014
    Increment(A),           // 015
    ShiftLeft(A),           // 016
    Increment(C),           // 017
    Sub(A, A, B),           // 020
    Sub(C, A, C),           // 021
    Decrement(A),           // 022
    Decrement(C),           // 023
    Negate(C),              // 024
    NegateDecrement(C),     // 025
    IfZero(B),              // 026
    IfZero(C),              // 027
    IfGreaterOrEqual(A, C), // 030
    IfGreaterOrEqual(A, B), // 031
    IfNotZero(A),           // 032
    IfNotZero(C),           // 033
    Sub(A, A, C),           // 034
    ShiftRight(A),          // 035
    ShiftRight(B),          // 036
    ShiftRight(C),          // 037
];

/// Pointer values for "p = n", indexed by the encoded operand.
const SET_P: [u8; 16] = [14, 4, 7, 8, 11, 2, 10, 12, 1, 3, 13, 6, 0, 9, 5, 14];

/// Pointer values for "if p = n" and "if p # n".
const TST_P: [u8; 16] = [4, 8, 12, 2, 9, 1, 6, 3, 1, 13, 5, 0, 11, 10, 7, 4];

/// Address the HP-10 uses to read the key code into c.
const KEY_ADDRESS: u16 = 0xff;

impl Processor {
    /// Type 0 on Woodstock and Spice parts.
    pub(crate) fn woodstock_special(&mut self, op: u16) -> Result<()> {
        let n = (op >> 6) as usize;
        match ((op >> 2) & 3, (op >> 4) & 3) {
            (0, 0) => match op {
                0o0000 => {} // nop
                _ if self.card_reader_op(op) => {}
                _ => return Err(self.unexpected(op)),
            },
            (0, 1) => match op {
                0o0020 => self.keys_to_rom_address(),
                // keys -> a
                0o0120 => {
                    let code = self.code;
                    let mode = self.printer.as_ref().map(|p| p.mode as u8);
                    let a = self.get_reg_mut(A);
                    match mode {
                        Some(mode) => a[1] = mode,
                        None => {
                            a[2] = code >> 4;
                            a[1] = code & 0xf;
                        }
                    }
                }
                0o0220 => self.a_to_rom_address(),
                0o0320 => {} // reset twf
                0o0420 => self.base = HEX,
                0o0520 => self.rotate_left_register(A),
                0o0620 => self.dec_p(),
                0o0720 => self.inc_p(),
                0o1020 => self.ret(),
                _ if self.printer_op(op) => {}
                _ => return Err(self.unexpected(op)),
            },
            (0, 2) => {
                // select rom n
                self.pc = ((op >> 6) << 8) + (self.pc & 0xff);
            }
            (0, 3) => match op {
                0o1060 => self.bank_switch(),
                // c -> data address
                0o1160 => {
                    let c = self.get_reg(C);
                    let addr = ((c[1] as usize) << 4) + c[0] as usize;
                    self.addr = if self.printer.is_some() && addr == KEY_ADDRESS as usize {
                        KEY_ADDRESS
                    } else {
                        self.clamp_data_address(addr)
                    };
                }
                0o1260 => self.clear_data_registers(),
                // c -> data
                0o1360 => {
                    if let Some(i) = self.data_register(self.addr as usize) {
                        self.store_memory(i, C);
                    }
                }
                // rom checksum
                0o1460 => {
                    self.status[5] = false;
                    self.ret();
                }
                0o1760 => {} // hi i'm woodstock
                _ if self.card_reader_op(op) => {}
                _ if self.printer_op(op) => {}
                _ => return Err(self.unexpected(op)),
            },
            (1, 0) => self.set_status(n, true),
            (1, 1) => {
                // if 1 = s(n)
                let bit = self.status_bit(n);
                self.set_flag(Flag::Carry, bit);
                self.conditional_goto()?;
            }
            (1, 2) => {
                // if p = n
                let equal = self.p == TST_P[n];
                self.set_flag(Flag::Carry, equal);
                self.conditional_goto()?;
            }
            (1, 3) => {
                // delayed select rom n
                self.rom_number = op >> 6;
                self.set_flag(Flag::DelayedRom, true);
            }
            (2, 0) => match op {
                0o0010 => self.clear_registers(),
                0o0110 => self.clear_status(),
                0o0210 => self.toggle_display(),
                0o0310 => self.set_flag(Flag::DisplayEnable, false),
                0o0410 => self.exchange_register(M, C, Span::WORD),
                0o0510 => self.copy_register(C, Some(M), Span::WORD),
                0o0610 => self.exchange_register(N, C, Span::WORD),
                0o0710 => self.copy_register(C, Some(N), Span::WORD),
                0o1010 => self.pop_stack(),
                0o1110 => self.rotate_stack(),
                0o1210 => self.copy_register(A, Some(Y), Span::WORD),
                0o1310 => self.push_stack(),
                0o1410 => self.base = DEC,
                // f -> a[x]
                0o1610 => {
                    let f = self.f;
                    self.get_reg_mut(A)[0] = f;
                }
                // f exch a[x]
                0o1710 => {
                    let f = self.f;
                    let a0 = std::mem::replace(&mut self.get_reg_mut(A)[0], f);
                    self.f = a0;
                }
                _ => return Err(self.unexpected(op)),
            },
            (2, 1) => self.load_constant(n as u8),
            (2, 2) => {
                // c -> data register(n)
                self.addr = (self.addr & 0xfff0) + n as u16;
                if let Some(i) = self.data_register(self.addr as usize) {
                    self.store_memory(i, C);
                }
            }
            (2, 3) => {
                // data register(n) -> c
                if self.printer.is_some() && n == 0xf && self.addr == KEY_ADDRESS {
                    let code = self.code;
                    let c = self.get_reg_mut(C);
                    c[2] = code >> 4;
                    c[1] = code & 0xf;
                    c[0] = 0;
                    self.code = 0;
                } else if n == 0 {
                    let i = self.data_register(self.addr as usize);
                    self.load_memory(C, i);
                } else if self.printer.is_none() {
                    self.addr = (self.addr & 0xfff0) + n as u16;
                    let i = self.data_register(self.addr as usize);
                    self.load_memory(C, i);
                }
                // the HP-10 has no numbered registers to read back
            }
            (3, 0) => self.set_status(n, false),
            (3, 1) => {
                // if 0 = s(n)
                let bit = self.status_bit(n);
                self.set_flag(Flag::Carry, !bit);
                self.conditional_goto()?;
            }
            (3, 2) => {
                // if p # n
                let differs = self.p != TST_P[n];
                self.set_flag(Flag::Carry, differs);
                self.conditional_goto()?;
            }
            (3, 3) => self.p = SET_P[n],
            _ => return Err(self.unexpected(op)),
        }
        Ok(())
    }

    /// a -> rom address: jump within the current page to a[2:1].
    fn a_to_rom_address(&mut self) {
        self.pc &= 0xff00;
        let a = self.get_reg(A);
        let target = self.pc as usize + ((a[2] as usize) << 4) + a[1] as usize;
        if target < self.variant.rom_size {
            self.pc = target as u16;
        } else {
            self.report(Warning::InvalidAddress {
                addr: RomAddr(self.last),
                target: target as u32,
            });
        }
        self.delayed_rom();
    }

    /// Clear every status bit except the hardware inputs (1, 2, 5 and 15).
    /// The HP-10 has no use for s5 and clears it too.
    fn clear_status(&mut self) {
        let keep: &[usize] = if self.printer.is_some() {
            &[1, 2, 15]
        } else {
            &[1, 2, 5, 15]
        };
        for (i, s) in self.status.iter_mut().enumerate() {
            if !keep.contains(&i) {
                *s = false;
            }
        }
    }

    /// Clear the block of sixteen registers containing the data address.
    fn clear_data_registers(&mut self) {
        match self.variant.clear_data {
            ClearData::Ignore => return,
            ClearData::AfterPowerOn => {
                if let Some(card) = self.card.as_mut() {
                    if !card.allow_clear() {
                        return;
                    }
                }
            }
            ClearData::Clear => {}
        }
        let first = (self.addr & !0xf) as usize;
        for m in self.mem.iter_mut().skip(first).take(16) {
            m.clear();
        }
    }

    /// HP-67 card reader controller flags. Returns false if `op` is not one
    /// of them or there is no card reader.
    fn card_reader_op(&mut self, op: u16) -> bool {
        let Some(card) = self.card.as_mut() else {
            return false;
        };
        let s3 = match op {
            0o0100 => {
                card.card = false;
                Some(true)
            }
            0o0300 => Some(!self.flags[Flag::Mode as usize]),
            0o0400 => {
                card.any_key = true;
                None
            }
            0o0500 => Some(take(&mut card.any_key)),
            0o1000 => {
                card.function = true;
                None
            }
            0o1100 => Some(take(&mut card.function)),
            0o1200 => {
                card.merge = true;
                None
            }
            0o1300 => Some(take(&mut card.merge)),
            0o1400 => {
                card.pause = true;
                None
            }
            0o1500 | 0o1700 => Some(take(&mut card.pause)),
            0o0060 => {
                card.display = true;
                None
            }
            0o0160 => Some(take(&mut card.display)),
            0o0560 => Some(card.card),
            0o0260 | 0o0360 | 0o0660 | 0o0760 => None,
            _ => return false,
        };
        if let Some(s3) = s3 {
            self.status[3] = s3;
        }
        true
    }

    /// HP-10 printer opcodes. Returns false if `op` is not one of them or
    /// there is no printer.
    fn printer_op(&mut self, op: u16) -> bool {
        let pressed = self.keypressed && self.code != 0;
        let c = *self.get_reg(C);
        let Some(printer) = self.printer.as_mut() else {
            return false;
        };
        let fits = match op {
            // print 6
            0o1120 | 0o1220 => {
                printer.flush();
                self.status[3] = true;
                true
            }
            // print 3
            0o1320 => {
                printer.flush();
                if pressed {
                    self.status[3] = true;
                }
                true
            }
            0o1720 => printer.print_numeric(&c),
            0o1660 => printer.print_alpha(&c),
            _ => return false,
        };
        if !fits {
            self.report(Warning::PrinterOverflow {
                addr: RomAddr(self.last),
            });
        }
        true
    }
}
