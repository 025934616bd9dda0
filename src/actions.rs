// Program counter, return stack, pointer and status bit primitives

use crate::cpu::Processor;
use crate::error::{Error, Result, Warning};
use crate::model::{Family, PointerStyle};
use crate::types::*;

impl Processor {
    // --- Program counter ---

    /// Read a ROM word, failing if `addr` is outside the image.
    pub(crate) fn fetch(&self, addr: u16) -> Result<u16> {
        self.rom
            .get(addr as usize)
            .ok_or(Error::PcOutOfRange(RomAddr(addr)))
    }

    /// Advance pc within the current ROM chip or bank, then age the carry.
    pub(crate) fn inc_pc(&mut self) {
        self.pc = match self.variant.family {
            Family::Classic => (self.pc & !0xff) | (self.pc.wrapping_add(1) & 0xff),
            _ if self.pc as usize >= self.variant.rom_size - 1 => 0,
            _ => (self.pc & 0xf000) | (self.pc.wrapping_add(1) & 0x0fff),
        };
        let carry = self.carry();
        self.set_flag(Flag::PrevCarry, carry);
        self.set_flag(Flag::Carry, false);
    }

    /// Apply a pending "delayed select rom", then map the first chip into
    /// bank 0.
    pub(crate) fn delayed_rom(&mut self) {
        if self.flag(Flag::DelayedRom) {
            self.pc = (self.rom_number << 8) | (self.pc & 0xf0ff);
            self.set_flag(Flag::DelayedRom, false);
        }
        if self.pc < BANK_ZERO_LIMIT {
            self.pc &= 0x0fff;
        }
    }

    pub(crate) fn bank_switch(&mut self) {
        let bank = self.flag(Flag::BankSwitch);
        self.set_flag(Flag::BankSwitch, !bank);
        self.pc ^= BANK_BIT;
    }

    // --- Return stack ---

    pub(crate) fn push_return_addr(&mut self, addr: u16) {
        self.stack[self.sp] = addr;
        self.sp = (self.sp + 1) & (STACK_SIZE - 1);
    }

    pub(crate) fn pop_return_addr(&mut self) -> u16 {
        self.sp = (self.sp + STACK_SIZE - 1) & (STACK_SIZE - 1);
        self.stack[self.sp]
    }

    /// Jump to subroutine. Classic and Woodstock take an eight bit address
    /// within the current page, Nut a full address.
    pub fn call(&mut self, address: u16) {
        self.push_return_addr(self.pc);
        match self.variant.family {
            Family::Nut => self.pc = address,
            _ => {
                self.pc = (self.pc & 0xff00) | (address & 0xff);
                self.delayed_rom();
            }
        }
    }

    /// Return from subroutine. Classic keeps the current ROM page.
    pub fn ret(&mut self) {
        let addr = self.pop_return_addr();
        self.pc = match self.variant.family {
            Family::Classic => (self.pc & !0xff) | (addr & 0xff),
            _ => addr,
        };
    }

    /// Branch following a test: the next word holds the target. Taken when
    /// the test set carry, otherwise the target word is skipped.
    pub(crate) fn conditional_goto(&mut self) -> Result<()> {
        let taken = self.carry();
        self.set_flag(Flag::PrevCarry, taken);
        self.set_flag(Flag::Carry, false);
        if taken {
            let target = self.fetch(self.pc)?;
            self.pc = match self.variant.family {
                Family::Classic => (self.pc & 0xff00) | (target >> 2),
                _ => (self.pc & 0xfc00) | target,
            };
        } else {
            self.inc_pc();
        }
        Ok(())
    }

    // --- Pointer ---

    pub(crate) fn inc_p(&mut self) {
        match self.variant.pointer {
            PointerStyle::Masked => self.p = self.p.wrapping_add(1) & 0xf,
            PointerStyle::Wrapping => {
                self.p = if self.p as usize == REG_SIZE { 0 } else { self.p + 1 };
            }
            PointerStyle::PreviousOpcode => {
                let pt = self.pt();
                let next = if pt as usize == REG_SIZE - 1 {
                    0
                } else if pt > 0 {
                    pt + 1
                } else {
                    // Only a repeated instruction leaves a zero pointer alone
                    let before = self.rom.get(self.pc.wrapping_sub(1) as usize);
                    if before != Some(self.opcode) {
                        1
                    } else {
                        0
                    }
                };
                *self.pt_mut() = next;
            }
        }
    }

    pub(crate) fn dec_p(&mut self) {
        match self.variant.pointer {
            PointerStyle::Masked => self.p = self.p.wrapping_sub(1) & 0xf,
            _ => {
                let pt = self.pt_mut();
                *pt = if *pt == 0 { REG_SIZE as u8 - 1 } else { *pt - 1 };
            }
        }
    }

    // --- Status bits ---

    pub(crate) fn status_bit(&mut self, n: usize) -> bool {
        if n < self.variant.status_bits {
            self.status[n]
        } else {
            self.report(Warning::InvalidStatusBit {
                addr: RomAddr(self.last),
                bit: n,
            });
            false
        }
    }

    pub(crate) fn set_status(&mut self, n: usize, value: bool) {
        if n < self.variant.status_bits {
            self.status[n] = value;
        } else {
            self.report(Warning::InvalidStatusBit {
                addr: RomAddr(self.last),
                bit: n,
            });
        }
    }

    // --- Data memory addressing ---

    /// Index of data register `addr`, or a clamped index with a warning.
    pub(crate) fn clamp_data_address(&mut self, addr: usize) -> u16 {
        let size = self.variant.memory_size;
        if addr < size {
            addr as u16
        } else {
            let clamped = size.saturating_sub(1);
            self.report(Warning::InvalidRegister {
                addr: RomAddr(self.last),
                register: addr,
                clamped,
            });
            clamped as u16
        }
    }

    /// Index of data register `addr` if it exists, reporting it otherwise.
    pub(crate) fn data_register(&mut self, addr: usize) -> Option<usize> {
        if addr < self.variant.memory_size {
            Some(addr)
        } else {
            self.report(Warning::InvalidAddress {
                addr: RomAddr(self.last),
                target: addr as u32,
            });
            None
        }
    }
}
