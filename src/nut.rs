// Nut instruction set (Voyager: HP-10C, 11C, 12C, 15C, 16C)
//
// Type 0 is split on bits 2-5 into sixteen classes. Most classes take a
// four bit operand in bits 6-9 which, for status and pointer numbers, is
// scrambled through NMAP.

use crate::alu::Span;
use crate::cpu::Processor;
use crate::decode::ArithOp::{self, *};
use crate::error::{Error, Result, Warning};
use crate::types::RegId::{A, B, C, M, N};
use crate::types::*;

/// Type 2 operations indexed by the five bit operation code.
pub static NUT_ARITH: [ArithOp; 32] = [
    Clear(A),           // 0x00 a=0
    Clear(B),           // 0x01 b=0
    Clear(C),           // 0x02 c=0
    Exchange(A, B),     // 0x03 ab ex
    Copy(B, A),         // 0x04 b=a
    Exchange(A, C),     // 0x05 ac ex
    Copy(C, B),         // 0x06 c=b
    Exchange(B, C),     // 0x07 bc ex
    Copy(A, C),         // 0x08 a=c
    Add(A, A, B),       // 0x09 a=a+b
    Add(A, A, C),       // 0x0a a=a+c
    Increment(A),       // 0x0b a=a+1
    Sub(A, A, B),       // 0x0c a=a-b
    Decrement(A),       // 0x0d a=a-1
    Sub(A, A, C),       // 0x0e a=a-c
    Add(C, C, C),       // 0x0f c=c+c
    Add(C, A, C),       // 0x10 c=a+c
    Increment(C),       // 0x11 c=c+1
    Sub(C, A, C),       // 0x12 c=a-c
    Decrement(C),       // 0x13 c=c-1
    Negate(C),          // 0x14 c=-c
    NegateDecrement(C), // 0x15 c=-c-1
    IfNotZero(B),       // 0x16 ?b#0
    IfNotZero(C),       // 0x17 ?c#0
    IfLess(A, C),       // 0x18 ?a<c
    IfLess(A, B),       // 0x19 ?a<b
    IfNotZero(A),       // 0x1a ?a#0
    IfNotEqual(A, C),   // 0x1b ?a#c
    ShiftRight(A),      // 0x1c rsh a
    ShiftRight(B),      // 0x1d rsh b
    ShiftRight(C),      // 0x1e rsh c
    ShiftLeft(A),       // 0x1f lsh a
];

/// Encoded operand to status bit or pointer value.
const NMAP: [u8; 16] = [3, 4, 5, 10, 8, 6, 11, 15, 2, 9, 7, 13, 1, 12, 0, 15];

/// Data addresses with no register behind them.
const MISSING_REGISTERS: [u16; 2] = [0x08, 0x18];

impl Processor {
    /// Type 0 on Nut parts.
    pub(crate) fn nut_special(&mut self, op: u16) -> Result<()> {
        let n = (op >> 6) as usize;
        match (op >> 2) & 0xf {
            0x0 => match n {
                0 => {} // nop
                _ => return Err(self.unexpected(op)),
            },
            // clear status bit / clear s0-s7
            0x1 => match n {
                7 => return Err(self.unexpected(op)),
                15 => self.status[..8].fill(false),
                _ => self.status[NMAP[n] as usize] = false,
            },
            // set status bit / reset keyboard
            0x2 => match n {
                7 => return Err(self.unexpected(op)),
                15 => {
                    if !self.keypressed {
                        self.set_flag(Flag::Carry, false);
                        self.kyf = false;
                    }
                }
                _ => self.status[NMAP[n] as usize] = true,
            },
            // ?s=1 / ?kb
            0x3 => match n {
                7 => return Err(self.unexpected(op)),
                15 => {
                    let kyf = self.kyf;
                    self.set_flag(Flag::Carry, kyf);
                }
                _ => {
                    let bit = self.status[NMAP[n] as usize];
                    self.set_flag(Flag::Carry, bit);
                }
            },
            0x4 => self.load_constant(n as u8),
            // ?pt=n / decpt
            0x5 => match n {
                7 => return Err(self.unexpected(op)),
                15 => self.dec_p(),
                _ => {
                    let equal = self.pt() == NMAP[n];
                    self.set_flag(Flag::Carry, equal);
                }
            },
            0x6 => self.nut_register_op(op, n)?,
            // pt=n / incpt
            0x7 => match n {
                7 => return Err(self.unexpected(op)),
                15 => self.inc_p(),
                _ => *self.pt_mut() = NMAP[n],
            },
            0x8 => self.nut_control_op(op, n)?,
            // write data register(n)
            0xa => {
                self.addr = (self.addr & 0xff0) | n as u16;
                if let Some(i) = self.nut_register() {
                    self.store_memory(i, C);
                }
            }
            0xc => self.nut_misc_op(op, n)?,
            // read data register(n)
            0xe => {
                if n != 0 {
                    self.addr = (self.addr & 0xff0) | n as u16;
                }
                let i = self.nut_register();
                self.load_memory(C, i);
            }
            // rcr n
            0xf => self.rotate_right_register(C, NMAP[n] as usize),
            _ => return Err(self.unexpected(op)),
        }
        Ok(())
    }

    /// g register, m register and status byte transfers.
    fn nut_register_op(&mut self, op: u16, n: usize) -> Result<()> {
        match n {
            // g=c
            0x1 => {
                let pt = self.checked_pt()?;
                let c = *self.get_reg(C);
                self.g[0] = c[pt];
                if pt < REG_SIZE - 1 {
                    self.g[1] = c[pt + 1];
                }
            }
            // c=g
            0x2 => {
                let pt = self.checked_pt()?;
                let g = self.g;
                let c = self.get_reg_mut(C);
                c[pt] = g[0];
                if pt < REG_SIZE - 1 {
                    c[pt + 1] = g[1];
                }
            }
            // c<>g
            0x3 => {
                let pt = self.checked_pt()?;
                let g = self.g;
                let mut swapped = [0u8; 2];
                let c = self.get_reg_mut(C);
                swapped[0] = std::mem::replace(&mut c[pt], g[0]);
                if pt < REG_SIZE - 1 {
                    swapped[1] = std::mem::replace(&mut c[pt + 1], g[1]);
                }
                self.g = swapped;
            }
            0x5 => self.copy_register(M, Some(C), Span::WORD),
            0x6 => self.copy_register(C, Some(M), Span::WORD),
            0x7 => self.exchange_register(C, M, Span::WORD),
            // c=st
            0xe => {
                let byte = self.status_byte();
                let c = self.get_reg_mut(C);
                c[0] = byte & 0xf;
                c[1] = byte >> 4;
            }
            // c<>st
            0xf => {
                let byte = self.status_byte();
                let c = self.get_reg(C);
                let incoming = c[0] | (c[1] << 4);
                self.set_status_byte(incoming);
                let c = self.get_reg_mut(C);
                c[0] = byte & 0xf;
                c[1] = byte >> 4;
            }
            _ => return Err(self.unexpected(op)),
        }
        Ok(())
    }

    /// Power, pointer selection, base and return instructions.
    fn nut_control_op(&mut self, op: u16, n: usize) -> Result<()> {
        match n {
            // power off
            0x1 => {
                if self.display_enabled() {
                    self.sleep = true;
                } else {
                    self.set_flag(Flag::Carry, true);
                    self.enabled = false;
                }
                self.pc = 0;
            }
            0x2 => self.ptr = Pointer::P,
            0x3 => self.ptr = Pointer::Q,
            // ?p=q
            0x4 => {
                if self.p == self.q {
                    self.set_flag(Flag::Carry, true);
                }
            }
            0x5 => {} // ?lld
            // clear abc
            0x6 => {
                for r in [A, B, C] {
                    self.copy_register(r, None, Span::WORD);
                }
            }
            // goto c[6:3]
            0x7 => self.pc = self.reg_word(C, 3),
            // c=keys
            0x8 => {
                let code = self.code;
                let c = self.get_reg_mut(C);
                c[3] = code & 0xf;
                c[4] = code >> 4;
            }
            0x9 => self.base = HEX,
            0xa => self.base = DEC,
            0xb => self.set_flag(Flag::DisplayEnable, false),
            0xc => self.toggle_display(),
            // ?c rtn
            0xd => {
                if self.prev_carry() {
                    self.ret();
                }
            }
            // ?nc rtn
            0xe => {
                if !self.prev_carry() {
                    self.ret();
                }
            }
            0xf => self.ret(),
            _ => return Err(self.unexpected(op)),
        }
        Ok(())
    }

    /// N register, constants, the return stack, data addressing and logic.
    fn nut_misc_op(&mut self, op: u16, n: usize) -> Result<()> {
        match n {
            // display blink; the core only turns the display on
            0x0 => self.set_flag(Flag::DisplayEnable, true),
            0x1 => self.copy_register(N, Some(C), Span::WORD),
            0x2 => self.copy_register(C, Some(N), Span::WORD),
            0x3 => self.exchange_register(C, N, Span::WORD),
            // ldi: next word -> c[2:0]
            0x4 => {
                let word = self.fetch(self.pc)?;
                let c = self.get_reg_mut(C);
                c[2] = ((word >> 8) & 0xf) as u8;
                c[1] = ((word >> 4) & 0xf) as u8;
                c[0] = (word & 0xf) as u8;
                self.inc_pc();
            }
            // push c[6:3]
            0x5 => {
                let addr = self.reg_word(C, 3);
                self.push_return_addr(addr);
            }
            // pop c[6:3]
            0x6 => {
                let addr = self.pop_return_addr();
                self.set_reg_word(C, 3, addr);
            }
            // data address = c[2:0]
            0x9 => {
                let c = self.get_reg(C);
                let addr = ((c[2] as u16) << 8) | ((c[1] as u16) << 4) | c[0] as u16;
                self.addr = addr & 0x3ff;
            }
            // data = c
            0xb => {
                if let Some(i) = self.nut_register() {
                    self.store_memory(i, C);
                }
            }
            // c[2:0] = rom[c[6:3]]
            0xc => {
                let addr = self.reg_word(C, 3);
                match self.rom.get(addr as usize) {
                    Some(word) => {
                        let c = self.get_reg_mut(C);
                        c[2] = ((word >> 8) & 0xf) as u8;
                        c[1] = ((word >> 4) & 0xf) as u8;
                        c[0] = (word & 0xf) as u8;
                    }
                    None => self.report(Warning::InvalidAddress {
                        addr: RomAddr(self.last),
                        target: addr as u32,
                    }),
                }
            }
            0xd => self.or_register(C, C, Some(A), Span::WORD),
            0xe => self.and_register(C, C, Some(A), Span::WORD),
            _ => return Err(self.unexpected(op)),
        }
        Ok(())
    }

    /// Index of the current data register, if one exists there.
    fn nut_register(&self) -> Option<usize> {
        let addr = self.addr;
        if (addr as usize) < self.variant.memory_size && !MISSING_REGISTERS.contains(&addr) {
            Some(addr as usize)
        } else {
            None
        }
    }

    fn checked_pt(&self) -> Result<usize> {
        let pt = self.pt();
        if (pt as usize) < REG_SIZE {
            Ok(pt as usize)
        } else {
            Err(Error::PointerOutOfRange {
                addr: RomAddr(self.last),
                pointer: pt,
            })
        }
    }

    /// s0-s7 packed into a byte.
    fn status_byte(&self) -> u8 {
        (0..8).fold(0, |byte, i| byte | ((self.status[i] as u8) << i))
    }

    fn set_status_byte(&mut self, byte: u8) {
        for i in 0..8 {
            self.status[i] = byte & (1 << i) != 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NMAP;
    use crate::cpu::Processor;
    use crate::model::Model;
    use crate::rom::Rom;
    use crate::types::*;
    use std::sync::Arc;

    fn cpu_with(program: &[u16]) -> Processor {
        let mut rom = vec![0u16; Model::Hp11c.variant().rom_size];
        rom[..program.len()].copy_from_slice(program);
        Processor::new(Model::Hp11c, Arc::new(Rom::new(rom)))
    }

    /// Encode a type 0 instruction from its class and operand.
    fn special(class: u16, n: u16) -> u16 {
        (n << 6) | (class << 2)
    }

    fn step(c: &mut Processor, n: usize) {
        for _ in 0..n {
            c.tick().unwrap();
        }
    }

    #[test]
    fn test_status_bits_use_map() {
        // s=1 with operand 0 sets s3, ?s=1 reads it back
        let mut c = cpu_with(&[special(2, 0), special(3, 0), special(1, 0)]);
        step(&mut c, 2);
        assert!(c.status()[3]);
        assert!(c.carry());
        step(&mut c, 1);
        assert!(!c.status()[3]);
    }

    #[test]
    fn test_c_from_status_keeps_status() {
        let mut c = cpu_with(&[special(6, 0xe)]);
        c.status[0] = true;
        c.status[5] = true;
        step(&mut c, 1);
        assert_eq!(c.get_reg(RegId::C)[0], 1);
        assert_eq!(c.get_reg(RegId::C)[1], 2);
        assert!(c.status()[0]);
        assert!(c.status()[5]);
    }

    #[test]
    fn test_clear_low_status() {
        let mut c = cpu_with(&[special(1, 15)]);
        c.status[2] = true;
        c.status[9] = true;
        step(&mut c, 1);
        assert!(!c.status()[2]);
        assert!(c.status()[9]);
    }

    #[test]
    fn test_pointer_load_and_test() {
        // pt=13 (operand 11), ?pt=13
        let mut c = cpu_with(&[special(7, 11), special(5, 11)]);
        step(&mut c, 2);
        assert_eq!(c.p(), 13);
        assert!(c.carry());
        assert_eq!(NMAP[11], 13);
    }

    #[test]
    fn test_select_q_pointer() {
        // sel q; pt=5 (operand 5 maps to 6); sel p
        let mut c = cpu_with(&[special(8, 3), special(7, 5), special(8, 2)]);
        step(&mut c, 3);
        assert_eq!(c.q(), 6);
        assert_eq!(c.p(), 0);
        assert_eq!(c.active_pointer(), Pointer::P);
    }

    #[test]
    fn test_g_register_transfers() {
        let mut c = cpu_with(&[special(6, 1), special(6, 3)]);
        c.p = 4;
        c.get_reg_mut(RegId::C)[4] = 7;
        c.get_reg_mut(RegId::C)[5] = 8;
        step(&mut c, 1);
        assert_eq!(c.g(), [7, 8]);
        c.get_reg_mut(RegId::C)[4] = 1;
        c.get_reg_mut(RegId::C)[5] = 2;
        step(&mut c, 1);
        assert_eq!(c.g(), [1, 2]);
        assert_eq!(c.get_reg(RegId::C)[4], 7);
        assert_eq!(c.get_reg(RegId::C)[5], 8);
    }

    #[test]
    fn test_g_at_top_nibble() {
        let mut c = cpu_with(&[special(6, 1)]);
        c.p = 13;
        c.g = [0, 5];
        c.get_reg_mut(RegId::C)[13] = 9;
        step(&mut c, 1);
        assert_eq!(c.g(), [9, 5]);
    }

    #[test]
    fn test_status_byte_exchange() {
        let mut c = cpu_with(&[special(6, 0xf)]);
        c.status[0] = true;
        c.status[7] = true;
        c.get_reg_mut(RegId::C)[0] = 0x6;
        step(&mut c, 1);
        assert_eq!(c.get_reg(RegId::C)[0], 0x1);
        assert_eq!(c.get_reg(RegId::C)[1], 0x8);
        assert!(c.status()[1] && c.status()[2]);
        assert!(!c.status()[0] && !c.status()[7]);
    }

    #[test]
    fn test_data_registers() {
        // dadd=c; regn=c 3; c=0; c=regn 3
        let mut c = cpu_with(&[
            special(0xc, 9),
            special(0xa, 3),
            (0x02 << 5) | (3 << 2) | 2,
            special(0xe, 3),
        ]);
        c.get_reg_mut(RegId::C)[1] = 2;
        c.get_reg_mut(RegId::C)[13] = 4;
        step(&mut c, 2);
        assert_eq!(c.data_address(), 0x23);
        assert_eq!(c.memory()[0x23].nibbles[13], 4);
        step(&mut c, 2);
        assert_eq!(c.get_reg(RegId::C)[13], 4);
    }

    #[test]
    fn test_missing_registers_read_zero() {
        let mut c = cpu_with(&[special(0xa, 8), special(0xe, 8)]);
        c.get_reg_mut(RegId::C)[0] = 3;
        step(&mut c, 2);
        assert_eq!(c.memory()[8].nibbles[0], 0);
        assert_eq!(c.get_reg(RegId::C)[0], 0);
    }

    #[test]
    fn test_load_immediate() {
        let mut c = cpu_with(&[special(0xc, 4), 0x2a5]);
        step(&mut c, 1);
        assert_eq!(c.pc(), 2);
        assert_eq!(&c.get_reg(RegId::C)[..3], &[5, 0xa, 2]);
    }

    #[test]
    fn test_push_pop_and_goto_c() {
        let mut c = cpu_with(&[special(0xc, 5), special(0xc, 6), special(8, 7)]);
        c.set_reg_word(RegId::C, 3, 0x0123);
        step(&mut c, 1);
        assert_eq!(c.stack()[0], 0x0123);
        c.set_reg_word(RegId::C, 3, 0);
        step(&mut c, 1);
        assert_eq!(c.reg_word(RegId::C, 3), 0x0123);
        step(&mut c, 1);
        assert_eq!(c.pc(), 0x0123);
    }

    #[test]
    fn test_rom_read_through_c() {
        let mut c = cpu_with(&[special(0xc, 0xc)]);
        c.set_reg_word(RegId::C, 3, 0);
        step(&mut c, 1);
        assert_eq!(&c.get_reg(RegId::C)[..3], &[0, 3, 3]);
    }

    #[test]
    fn test_logic_ops() {
        let mut c = cpu_with(&[special(0xc, 0xd), special(0xc, 0xe)]);
        c.get_reg_mut(RegId::A)[0] = 0b0101;
        c.get_reg_mut(RegId::C)[0] = 0b0011;
        step(&mut c, 1);
        assert_eq!(c.get_reg(RegId::C)[0], 0b0111);
        c.get_reg_mut(RegId::C)[0] = 0b1100;
        step(&mut c, 1);
        assert_eq!(c.get_reg(RegId::C)[0], 0b0100);
    }

    #[test]
    fn test_rotate_c_right() {
        // rcr with operand 0 rotates by three
        let mut c = cpu_with(&[special(0xf, 0)]);
        c.get_reg_mut(RegId::C)[3] = 6;
        step(&mut c, 1);
        assert_eq!(c.get_reg(RegId::C)[0], 6);
    }

    #[test]
    fn test_power_off() {
        // Display on: light sleep
        let mut c = cpu_with(&[special(8, 1)]);
        c.set_flag(Flag::DisplayEnable, true);
        step(&mut c, 1);
        assert!(c.is_sleeping());
        assert!(c.is_enabled());
        assert_eq!(c.pc(), 0);

        // Display off: deep sleep with carry set
        let mut c = cpu_with(&[special(8, 1)]);
        step(&mut c, 1);
        assert!(!c.is_enabled());
        assert!(c.carry());
    }

    #[test]
    fn test_conditional_returns() {
        let mut c = cpu_with(&[]);
        c.pc = 0x40;
        c.call(0x100);
        c.set_flag(Flag::PrevCarry, false);
        c.nut_control_op(0, 0xd).unwrap();
        assert_eq!(c.pc(), 0x100);
        c.nut_control_op(0, 0xe).unwrap();
        assert_eq!(c.pc(), 0x40);
    }

    #[test]
    fn test_keyboard_reset_keeps_held_key() {
        let mut c = cpu_with(&[special(2, 15), special(2, 15)]);
        c.keypressed = true;
        step(&mut c, 1);
        assert!(c.keyboard_flag());
        c.keypressed = false;
        step(&mut c, 1);
        assert!(!c.keyboard_flag());
    }

    #[test]
    fn test_undefined_operand_is_fatal() {
        let mut c = cpu_with(&[special(1, 7)]);
        assert!(c.tick().is_err());
        let mut c = cpu_with(&[special(9, 0)]);
        assert!(c.tick().is_err());
    }
}
