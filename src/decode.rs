// Instruction decoder and dispatcher
//
// The low two bits of every ten bit word select one of four instruction
// types. Type 0 ("special") is decoded per family in classic.rs,
// woodstock.rs and nut.rs; the other three share their structure and only
// differ in the tables and address arithmetic below.

use std::fmt;

use tracing::trace;

use crate::alu::Span;
use crate::classic::CLASSIC_ARITH;
use crate::cpu::Processor;
use crate::error::{Error, Result, Warning};
use crate::model::{Family, InputStyle};
use crate::nut::NUT_ARITH;
use crate::types::*;
use crate::woodstock::WOODSTOCK_ARITH;

/// A fetched word split by instruction type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// Type 0, family specific.
    Special(u16),
    /// Type 1: jsb (Nut: two word conditional call or goto).
    Subroutine(u16),
    /// Type 2: five bit operation on a three bit field.
    Arithmetic { op: usize, field: u8 },
    /// Type 3: conditional branch (Nut: relative).
    Branch(u16),
}

impl Instruction {
    pub fn decode(opcode: u16) -> Self {
        match opcode & 3 {
            0 => Instruction::Special(opcode),
            1 => Instruction::Subroutine(opcode),
            2 => Instruction::Arithmetic {
                op: ((opcode >> 5) & 0x1f) as usize,
                field: ((opcode >> 2) & 7) as u8,
            },
            _ => Instruction::Branch(opcode),
        }
    }
}

/// Type 2 operations. Register arguments read `(dst, src, arg)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArithOp {
    /// 0 -> r
    Clear(RegId),
    /// src -> dst
    Copy(RegId, RegId),
    Exchange(RegId, RegId),
    /// src + arg -> dst
    Add(RegId, RegId, RegId),
    /// src - arg -> dst
    Sub(RegId, RegId, RegId),
    Increment(RegId),
    Decrement(RegId),
    /// 0 - r -> r
    Negate(RegId),
    /// 0 - r - 1 -> r
    NegateDecrement(RegId),
    ShiftLeft(RegId),
    ShiftRight(RegId),
    IfZero(RegId),
    IfNotZero(RegId),
    /// r1 >= r2
    IfGreaterOrEqual(RegId, RegId),
    /// r1 < r2
    IfLess(RegId, RegId),
    IfNotEqual(RegId, RegId),
}

impl ArithOp {
    pub fn is_test(self) -> bool {
        matches!(
            self,
            ArithOp::IfZero(_)
                | ArithOp::IfNotZero(_)
                | ArithOp::IfGreaterOrEqual(..)
                | ArithOp::IfLess(..)
                | ArithOp::IfNotEqual(..)
        )
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ArithOp::*;
        match *self {
            Clear(r) => write!(f, "0 -> {}", r.name()),
            Copy(d, s) => write!(f, "{} -> {}", s.name(), d.name()),
            Exchange(a, b) => write!(f, "{} exch {}", a.name(), b.name()),
            Add(d, s, a) => write!(f, "{} + {} -> {}", s.name(), a.name(), d.name()),
            Sub(d, s, a) => write!(f, "{} - {} -> {}", s.name(), a.name(), d.name()),
            Increment(r) => write!(f, "{0} + 1 -> {0}", r.name()),
            Decrement(r) => write!(f, "{0} - 1 -> {0}", r.name()),
            Negate(r) => write!(f, "0 - {0} -> {0}", r.name()),
            NegateDecrement(r) => write!(f, "0 - {0} - 1 -> {0}", r.name()),
            ShiftLeft(r) => write!(f, "shift left {}", r.name()),
            ShiftRight(r) => write!(f, "shift right {}", r.name()),
            IfZero(r) => write!(f, "if {} = 0", r.name()),
            IfNotZero(r) => write!(f, "if {} != 0", r.name()),
            IfGreaterOrEqual(a, b) => write!(f, "if {} >= {}", a.name(), b.name()),
            IfLess(a, b) => write!(f, "if {} < {}", a.name(), b.name()),
            IfNotEqual(a, b) => write!(f, "if {} != {}", a.name(), b.name()),
        }
    }
}

impl Processor {
    /// Execute one instruction. Does nothing while powered off or asleep.
    pub fn tick(&mut self) -> Result<()> {
        if !self.enabled || self.sleep {
            return Ok(());
        }
        self.latch_inputs();

        let opcode = self.fetch(self.pc)?;
        self.last = self.pc;
        self.inc_pc();

        let instruction = Instruction::decode(opcode);
        if self.trace {
            trace!(
                target: "hpcore::trace",
                "{} {:04o} {:?}\n{}",
                RomAddr(self.last),
                opcode,
                instruction,
                self
            );
        }
        let result = self.execute(instruction);
        self.opcode = opcode;
        result
    }

    /// Copy switch and keyboard state into status bits the way each
    /// family's hardware does.
    fn latch_inputs(&mut self) {
        match self.variant.inputs {
            InputStyle::Classic => {
                if self.keypressed {
                    self.status[0] = true;
                }
                if self.mode {
                    self.status[3] = true;
                }
                if self.timer {
                    self.status[11] = true;
                }
            }
            InputStyle::Woodstock | InputStyle::Spice => {
                if self.keypressed {
                    self.status[15] = true;
                }
                if self.mode {
                    self.status[3] = true;
                }
                self.status[5] = self.variant.inputs == InputStyle::Woodstock;
            }
            InputStyle::Hp67 => {
                if self.keypressed {
                    self.status[15] = true;
                }
                self.set_flag(Flag::Mode, self.mode);
            }
            InputStyle::Nut => {
                if self.keypressed {
                    self.kyf = true;
                }
            }
            InputStyle::None => {}
        }
    }

    fn execute(&mut self, instruction: Instruction) -> Result<()> {
        let family = self.variant.family;
        match instruction {
            Instruction::Special(op) => match family {
                Family::Classic => self.classic_special(op),
                Family::Woodstock => self.woodstock_special(op),
                Family::Nut => self.nut_special(op),
            },
            Instruction::Subroutine(op) => match family {
                Family::Nut => self.nut_long_branch(op),
                _ => {
                    self.call(op >> 2);
                    Ok(())
                }
            },
            Instruction::Arithmetic { op, field } => self.arithmetic(op, field),
            Instruction::Branch(op) => {
                self.branch(op);
                Ok(())
            }
        }
    }

    fn arithmetic(&mut self, op: usize, code: u8) -> Result<()> {
        let table = match self.variant.family {
            Family::Classic => &CLASSIC_ARITH,
            Family::Woodstock => &WOODSTOCK_ARITH,
            Family::Nut => &NUT_ARITH,
        };
        let op = table[op];
        let (field, span) = self.select_field(code)?;
        if self.trace {
            trace!(target: "hpcore::trace", "{}[{}]", op, field.name());
        }
        self.execute_arith(op, span);
        // Nut tests only leave their result in carry
        if op.is_test() && self.variant.family != Family::Nut {
            self.conditional_goto()?;
        }
        Ok(())
    }

    /// Run a type 2 operation over `span`.
    pub fn execute_arith(&mut self, op: ArithOp, span: Span) {
        use ArithOp::*;
        match op {
            Clear(r) => self.copy_register(r, None, span),
            Copy(d, s) => self.copy_register(d, Some(s), span),
            Exchange(a, b) => self.exchange_register(a, b, span),
            Add(d, s, a) => self.add_register(Some(d), s, Some(a), span),
            Sub(d, s, a) => self.sub_register(Some(d), Some(s), Some(a), span),
            Increment(r) => self.increment_register(r, span),
            Decrement(r) => self.decrement_register(r, span),
            Negate(r) => self.sub_register(Some(r), None, Some(r), span),
            NegateDecrement(r) => {
                self.set_flag(Flag::Carry, true);
                self.sub_register(Some(r), None, Some(r), span);
            }
            ShiftLeft(r) => self.shift_left_register(r, span),
            ShiftRight(r) => self.shift_right_register(r, span),
            IfZero(r) => self.test_equal(r, None, span),
            IfNotZero(r) => self.test_not_equal(r, None, span),
            IfGreaterOrEqual(a, b) => {
                self.sub_register(None, Some(a), Some(b), span);
                let borrow = self.carry();
                self.set_flag(Flag::Carry, !borrow);
            }
            IfLess(a, b) => self.sub_register(None, Some(a), Some(b), span),
            IfNotEqual(a, b) => self.test_not_equal(a, Some(b), span),
        }
    }

    /// Type 3.
    fn branch(&mut self, op: u16) {
        match self.variant.family {
            Family::Nut => {
                let mut offset = (op >> 3) as i32;
                if offset >= 0x40 {
                    offset -= 128;
                }
                let on_carry = op & 0o4 != 0;
                if self.prev_carry() == on_carry {
                    self.pc = ((self.last as i32 + offset) & 0xffff) as u16;
                }
            }
            _ => {
                if !self.prev_carry() {
                    self.pc = (self.pc & 0xff00) | (op >> 2);
                    self.delayed_rom();
                }
            }
        }
    }

    /// Nut type 1: the second word carries the high address bits and the
    /// condition.
    fn nut_long_branch(&mut self, op: u16) -> Result<()> {
        let next = self.fetch(self.pc)?;
        let address = (op >> 2) | ((next & 0x3fc) << 6);
        let carry = self.prev_carry();
        self.set_flag(Flag::Carry, carry);
        self.inc_pc();
        let carry = self.prev_carry();
        let (taken, subroutine) = match next & 3 {
            0 => (!carry, true), // ?nc gsb
            1 => (carry, true),  // ?c gsb
            2 => (!carry, false), // ?nc goto
            _ => (carry, false), // ?c goto
        };
        if !taken {
            return Ok(());
        }
        if !subroutine {
            self.pc = address;
        } else if (address as usize) < self.variant.rom_size {
            self.call(address);
        } else {
            self.report(Warning::InvalidAddress {
                addr: RomAddr(self.last),
                target: address as u32,
            });
        }
        Ok(())
    }

    // --- Operations shared by more than one family ---

    pub(crate) fn unexpected(&self, opcode: u16) -> Error {
        Error::UnexpectedOpcode {
            addr: RomAddr(self.last),
            opcode,
        }
    }

    /// n -> c[pt], then decrement the pointer.
    pub(crate) fn load_constant(&mut self, n: u8) {
        let mut pt = self.pt() as usize;
        if pt >= REG_SIZE {
            self.report(Warning::PointerClamped {
                addr: RomAddr(self.last),
                pointer: pt as u8,
            });
            pt = REG_SIZE - 1;
        }
        self.get_reg_mut(RegId::C)[pt] = n & 0xf;
        self.dec_p();
    }

    pub(crate) fn keys_to_rom_address(&mut self) {
        self.pc &= 0xff00;
        self.delayed_rom();
        self.pc = self.pc.wrapping_add(self.code as u16);
    }

    /// Clear every register except M and N.
    pub(crate) fn clear_registers(&mut self) {
        for r in RegId::ALL {
            if r.is_volatile() {
                self.copy_register(r, None, Span::WORD);
            }
        }
    }

    /// c -> stack: T = Z, Z = Y, Y = C.
    pub(crate) fn push_stack(&mut self) {
        self.copy_register(RegId::T, Some(RegId::Z), Span::WORD);
        self.copy_register(RegId::Z, Some(RegId::Y), Span::WORD);
        self.copy_register(RegId::Y, Some(RegId::C), Span::WORD);
    }

    /// stack -> a: A = Y, Y = Z, Z = T.
    pub(crate) fn pop_stack(&mut self) {
        self.copy_register(RegId::A, Some(RegId::Y), Span::WORD);
        self.copy_register(RegId::Y, Some(RegId::Z), Span::WORD);
        self.copy_register(RegId::Z, Some(RegId::T), Span::WORD);
    }

    /// down rotate: C to T, Y to C, Z to Y, T to Z.
    pub(crate) fn rotate_stack(&mut self) {
        self.exchange_register(RegId::T, RegId::C, Span::WORD);
        self.exchange_register(RegId::C, RegId::Y, Span::WORD);
        self.exchange_register(RegId::Y, RegId::Z, Span::WORD);
    }

    pub(crate) fn toggle_display(&mut self) {
        let on = self.display_enabled();
        self.set_flag(Flag::DisplayEnable, !on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::rom::Rom;
    use std::sync::Arc;

    fn cpu_with(model: Model, words: &[(usize, u16)]) -> Processor {
        let mut rom = vec![0u16; model.variant().rom_size];
        for &(a, w) in words {
            rom[a] = w;
        }
        Processor::new(model, Arc::new(Rom::new(rom)))
    }

    #[test]
    fn test_decode_types() {
        assert_eq!(Instruction::decode(0o0000), Instruction::Special(0));
        assert_eq!(Instruction::decode(0o0101), Instruction::Subroutine(0o0101));
        assert_eq!(
            Instruction::decode(0o0616),
            Instruction::Arithmetic { op: 0o14, field: 3 }
        );
        assert_eq!(Instruction::decode(0o0763), Instruction::Branch(0o0763));
    }

    #[test]
    fn test_nop_advances_pc() {
        let mut c = cpu_with(Model::Hp25, &[]);
        c.tick().unwrap();
        assert_eq!(c.pc(), 1);
        assert_eq!(c.last_pc(), 0);
    }

    #[test]
    fn test_disabled_tick_is_noop() {
        let mut c = cpu_with(Model::Hp11c, &[]);
        c.enabled = false;
        c.tick().unwrap();
        assert_eq!(c.pc(), 0);
        c.enabled = true;
        c.sleep = true;
        c.tick().unwrap();
        assert_eq!(c.pc(), 0);
    }

    #[test]
    fn test_jsb_then_return() {
        // 0000: jsb 0040; 0040: return
        let mut c = cpu_with(Model::Hp25, &[(0, (0o040 << 2) | 1), (0o040, 0o1020)]);
        c.tick().unwrap();
        assert_eq!(c.pc(), 0o040);
        c.tick().unwrap();
        assert_eq!(c.pc(), 1);
    }

    #[test]
    fn test_woodstock_test_and_branch() {
        // if c[w] = 0 (027, field w = 6) then go to 0100
        let op = (0o27 << 5) | (6 << 2) | 2;
        let mut c = cpu_with(Model::Hp25, &[(0, op), (1, 0o100)]);
        c.tick().unwrap();
        assert_eq!(c.pc(), 0o100);
        assert!(c.prev_carry());
        assert!(!c.carry());

        let mut c = cpu_with(Model::Hp25, &[(0, op), (1, 0o100)]);
        c.get_reg_mut(RegId::C)[4] = 1;
        c.tick().unwrap();
        assert_eq!(c.pc(), 2);
    }

    #[test]
    fn test_nut_test_sets_carry_only() {
        // ?c#0[w] is 0x17, Nut field w = 3
        let op = (0x17 << 5) | (3 << 2) | 2;
        let mut c = cpu_with(Model::Hp11c, &[(0, op)]);
        c.get_reg_mut(RegId::C)[0] = 1;
        c.tick().unwrap();
        assert_eq!(c.pc(), 1);
        assert!(c.carry());
    }

    #[test]
    fn test_classic_if_no_carry_goto() {
        // Classic type 3: if nc go to 0123
        let mut c = cpu_with(Model::Hp35, &[(0, (0o123 << 2) | 3)]);
        c.tick().unwrap();
        assert_eq!(c.pc(), 0o123);
    }

    #[test]
    fn test_nut_relative_jump() {
        // jnc +5 at 0x10
        let mut c = cpu_with(Model::Hp11c, &[(0x10, (5 << 3) | 3)]);
        c.pc = 0x10;
        c.set_flag(Flag::Carry, false);
        c.tick().unwrap();
        assert_eq!(c.pc(), 0x15);

        // jnc -2 is not taken with carry set
        let mut c = cpu_with(Model::Hp11c, &[(0x10, (0x7e << 3) | 3)]);
        c.pc = 0x10;
        c.set_flag(Flag::Carry, true);
        c.tick().unwrap();
        assert_eq!(c.pc(), 0x11);

        // jc -2 is
        let mut c = cpu_with(Model::Hp11c, &[(0x10, (0x7e << 3) | 0o4 | 3)]);
        c.pc = 0x10;
        c.set_flag(Flag::Carry, true);
        c.tick().unwrap();
        assert_eq!(c.pc(), 0x0e);
    }

    #[test]
    fn test_nut_long_call_and_goto() {
        // ?nc gsb 0x0456: low byte 0x56 in the first word, high bits in the second
        let first = (0x56 << 2) | 1;
        let second = ((0x0456 >> 8) << 2) as u16;
        let mut c = cpu_with(Model::Hp11c, &[(0, first), (1, second)]);
        c.set_flag(Flag::Carry, false);
        c.tick().unwrap();
        assert_eq!(c.pc(), 0x0456);
        assert_eq!(c.stack()[0], 2);

        // ?c goto is not taken without carry
        let mut c = cpu_with(Model::Hp11c, &[(0, first), (1, second | 3)]);
        c.set_flag(Flag::Carry, false);
        c.tick().unwrap();
        assert_eq!(c.pc(), 2);
    }

    #[test]
    fn test_nut_call_beyond_rom_is_ignored() {
        let first = (0xff << 2) | 1;
        let second = (0xff << 2) as u16;
        let mut c = cpu_with(Model::Hp11c, &[(0, first), (1, second)]);
        c.set_flag(Flag::Carry, false);
        c.tick().unwrap();
        assert_eq!(c.pc(), 2);
        assert_eq!(c.sp(), 0);
    }

    #[test]
    fn test_load_constant_then_pointer_wraps() {
        // Woodstock load constant 7 is 0o0730
        let mut c = cpu_with(Model::Hp25, &[(0, (7 << 6) | 0o030)]);
        c.tick().unwrap();
        assert_eq!(c.get_reg(RegId::C)[0], 7);
        assert_eq!(c.p(), (REG_SIZE - 1) as u8);
    }

    #[test]
    fn test_unexpected_opcode_reports_address() {
        // 0o1720 is not defined on a plain Woodstock
        let mut c = cpu_with(Model::Hp25, &[(3, 0o1720)]);
        c.pc = 3;
        match c.tick() {
            Err(Error::UnexpectedOpcode { addr, opcode }) => {
                assert_eq!(addr, RomAddr(3));
                assert_eq!(opcode, 0o1720);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_inputs_latched_into_status() {
        let mut c = cpu_with(Model::Hp25, &[]);
        c.keypressed = true;
        c.mode = true;
        c.tick().unwrap();
        assert!(c.status()[15]);
        assert!(c.status()[3]);
        assert!(c.status()[5]);

        let mut c = cpu_with(Model::Hp33c, &[]);
        c.tick().unwrap();
        assert!(!c.status()[5]);

        let mut c = cpu_with(Model::Hp35, &[]);
        c.keypressed = true;
        c.timer = true;
        c.tick().unwrap();
        assert!(c.status()[0]);
        assert!(c.status()[11]);
    }

    #[test]
    fn test_arith_display() {
        assert_eq!(
            ArithOp::Add(RegId::C, RegId::A, RegId::C).to_string(),
            "a + c -> c"
        );
        assert_eq!(ArithOp::IfZero(RegId::B).to_string(), "if b = 0");
    }
}
