// Field selection and nibble-serial register arithmetic.
// Every operation walks the nibbles of the selected field from the least
// significant end, the way the hardware's serial adder does.

use std::ops::RangeInclusive;

use crate::cpu::Processor;
use crate::error::{Error, Result};
use crate::model::Field;
use crate::types::*;

/// Inclusive nibble range selected by a field code.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    pub first: usize,
    pub last: usize,
}

impl Span {
    pub const WORD: Span = Span {
        first: 0,
        last: REG_SIZE - 1,
    };

    #[inline]
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    #[inline]
    pub fn range(self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

impl Processor {
    /// Value of whichever pointer is active (always p outside Nut).
    #[inline]
    pub(crate) fn pt(&self) -> u8 {
        match self.ptr {
            Pointer::P => self.p,
            Pointer::Q => self.q,
        }
    }

    #[inline]
    pub(crate) fn pt_mut(&mut self) -> &mut u8 {
        match self.ptr {
            Pointer::P => &mut self.p,
            Pointer::Q => &mut self.q,
        }
    }

    /// Nibble range covered by `field` with the current pointers.
    pub fn field_span(&self, field: Field) -> Result<Span> {
        let pt = self.pt() as usize;
        let pointer_ok = (self.p as usize) < REG_SIZE && (self.q as usize) < REG_SIZE;
        let span = match field {
            Field::Pointer | Field::WordPointer | Field::PointerPair if !pointer_ok => {
                let pointer = if (self.p as usize) < REG_SIZE { self.q } else { self.p };
                return Err(Error::PointerOutOfRange {
                    addr: RomAddr(self.last),
                    pointer,
                });
            }
            Field::Pointer => Span::new(pt, pt),
            // Stops at the pointer rather than running to the top of the word
            Field::WordPointer => Span::new(0, pt),
            Field::PointerPair => {
                let (p, q) = (self.p as usize, self.q as usize);
                Span::new(p, if p > q { REG_SIZE - 1 } else { q })
            }
            Field::Mantissa => Span::new(EXP_SIZE, REG_SIZE - 2),
            Field::MantissaSign => Span::new(EXP_SIZE, REG_SIZE - 1),
            Field::Exponent => Span::new(0, EXP_SIZE - 1),
            Field::ExponentSign => Span::new(EXP_SIZE - 1, EXP_SIZE - 1),
            Field::Word => Span::WORD,
            Field::Sign => Span::new(REG_SIZE - 1, REG_SIZE - 1),
        };
        Ok(span)
    }

    /// Decode a three bit field code for this processor's family.
    pub fn select_field(&self, code: u8) -> Result<(Field, Span)> {
        let field = self.variant.fields()[(code & 7) as usize];
        Ok((field, self.field_span(field)?))
    }

    #[inline]
    fn operand(&self, r: Option<RegId>) -> Nibbles {
        match r {
            Some(r) => *self.get_reg(r),
            None => [0; REG_SIZE],
        }
    }

    // --- Data movement ---

    /// dst = src, or zero when `src` is None.
    pub fn copy_register(&mut self, dst: RegId, src: Option<RegId>, span: Span) {
        let s = self.operand(src);
        let d = self.get_reg_mut(dst);
        for i in span.range() {
            d[i] = s[i];
        }
    }

    pub fn exchange_register(&mut self, r1: RegId, r2: RegId, span: Span) {
        let a = *self.get_reg(r1);
        let b = *self.get_reg(r2);
        let x = self.get_reg_mut(r1);
        for i in span.range() {
            x[i] = b[i];
        }
        let y = self.get_reg_mut(r2);
        for i in span.range() {
            y[i] = a[i];
        }
    }

    // --- Arithmetic ---

    /// dst = src + arg + carry. With no destination only carry changes.
    pub fn add_register(&mut self, dst: Option<RegId>, src: RegId, arg: Option<RegId>, span: Span) {
        let r1 = *self.get_reg(src);
        let r2 = self.operand(arg);
        let base = self.base as i32;
        let mut c = self.carry();
        let mut res = dst.map(|d| *self.get_reg(d));
        for i in span.range() {
            let mut t = r1[i] as i32 + r2[i] as i32 + c as i32;
            if t >= base {
                t -= base;
                c = true;
            } else {
                c = false;
            }
            if let Some(res) = res.as_mut() {
                res[i] = (t & 0xf) as u8;
            }
        }
        if let (Some(d), Some(res)) = (dst, res) {
            *self.get_reg_mut(d) = res;
        }
        self.set_flag(Flag::Carry, c);
    }

    /// dst = src - arg - carry. A missing source or argument reads as zero,
    /// a missing destination discards the result.
    pub fn sub_register(
        &mut self,
        dst: Option<RegId>,
        src: Option<RegId>,
        arg: Option<RegId>,
        span: Span,
    ) {
        let r1 = self.operand(src);
        let r2 = self.operand(arg);
        let base = self.base as i32;
        let mut c = self.carry();
        let mut res = dst.map(|d| *self.get_reg(d));
        for i in span.range() {
            let mut t = r1[i] as i32 - r2[i] as i32 - c as i32;
            if t < 0 {
                t += base;
                c = true;
            } else {
                c = false;
            }
            if let Some(res) = res.as_mut() {
                res[i] = (t & 0xf) as u8;
            }
        }
        if let (Some(d), Some(res)) = (dst, res) {
            *self.get_reg_mut(d) = res;
        }
        self.set_flag(Flag::Carry, c);
    }

    pub fn increment_register(&mut self, r: RegId, span: Span) {
        self.set_flag(Flag::Carry, true);
        self.add_register(Some(r), r, None, span);
    }

    pub fn decrement_register(&mut self, r: RegId, span: Span) {
        self.set_flag(Flag::Carry, true);
        self.sub_register(Some(r), Some(r), None, span);
    }

    // --- Logic (Nut) ---

    pub fn or_register(&mut self, dst: RegId, src: RegId, arg: Option<RegId>, span: Span) {
        let r1 = *self.get_reg(src);
        let r2 = self.operand(arg);
        let d = self.get_reg_mut(dst);
        for i in span.range() {
            d[i] = r1[i] | r2[i];
        }
    }

    pub fn and_register(&mut self, dst: RegId, src: RegId, arg: Option<RegId>, span: Span) {
        let r1 = *self.get_reg(src);
        let r2 = self.operand(arg);
        let d = self.get_reg_mut(dst);
        for i in span.range() {
            d[i] = r1[i] & r2[i];
        }
    }

    // --- Tests ---

    /// carry = (r == src) over the field.
    pub fn test_equal(&mut self, r: RegId, src: Option<RegId>, span: Span) {
        let a = self.get_reg(r);
        let b = self.operand(src);
        let equal = span.range().all(|i| a[i] == b[i]);
        self.set_flag(Flag::Carry, equal);
    }

    pub fn test_not_equal(&mut self, r: RegId, src: Option<RegId>, span: Span) {
        self.test_equal(r, src, span);
        let c = self.carry();
        self.set_flag(Flag::Carry, !c);
    }

    // --- Shifts ---

    pub fn shift_right_register(&mut self, r: RegId, span: Span) {
        self.set_flag(Flag::Carry, false);
        let d = self.get_reg_mut(r);
        for i in span.range() {
            d[i] = if i == span.last { 0 } else { d[i + 1] };
        }
    }

    pub fn shift_left_register(&mut self, r: RegId, span: Span) {
        let d = self.get_reg_mut(r);
        for i in span.range().rev() {
            d[i] = if i == span.first { 0 } else { d[i - 1] };
        }
        self.set_flag(Flag::PrevCarry, false);
        self.set_flag(Flag::Carry, false);
    }

    /// Rotate the whole register one nibble towards the top.
    pub fn rotate_left_register(&mut self, r: RegId) {
        self.get_reg_mut(r).rotate_right(1);
        self.set_flag(Flag::PrevCarry, false);
        self.set_flag(Flag::Carry, false);
    }

    /// Rotate the whole register `n` nibbles towards the bottom.
    pub fn rotate_right_register(&mut self, r: RegId, n: usize) {
        for _ in 0..n {
            self.get_reg_mut(r).rotate_left(1);
            self.set_flag(Flag::PrevCarry, false);
            self.set_flag(Flag::Carry, false);
        }
    }

    // --- Data memory ---

    /// mem[index] = src over the whole word.
    pub(crate) fn store_memory(&mut self, index: usize, src: RegId) {
        let s = *self.get_reg(src);
        if let Some(m) = self.mem.get_mut(index) {
            m.nibbles = s;
        }
    }

    /// dst = mem[index], or zero when the cell does not exist.
    pub(crate) fn load_memory(&mut self, dst: RegId, index: Option<usize>) {
        let s = index
            .and_then(|i| self.mem.get(i))
            .map(|m| m.nibbles)
            .unwrap_or([0; REG_SIZE]);
        *self.get_reg_mut(dst) = s;
    }

    /// Read nibbles [lo..=lo+3] as a 16 bit address (c[6:3] on Nut).
    pub(crate) fn reg_word(&self, r: RegId, lo: usize) -> u16 {
        let d = self.get_reg(r);
        (lo..lo + 4)
            .rev()
            .fold(0u16, |w, i| (w << 4) | d[i] as u16)
    }

    pub(crate) fn set_reg_word(&mut self, r: RegId, lo: usize, value: u16) {
        let d = self.get_reg_mut(r);
        for (k, i) in (lo..lo + 4).enumerate() {
            d[i] = ((value >> (4 * k)) & 0xf) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::rom::Rom;
    use std::sync::Arc;

    fn cpu(model: Model) -> Processor {
        Processor::new(model, Arc::new(Rom::blank(model.variant().rom_size)))
    }

    fn set(c: &mut Processor, r: RegId, value: &[u8]) {
        let d = c.get_reg_mut(r);
        for (i, &n) in value.iter().enumerate() {
            d[i] = n;
        }
    }

    #[test]
    fn test_add_bcd_carry() {
        let mut c = cpu(Model::Hp25);
        set(&mut c, RegId::A, &[9]);
        set(&mut c, RegId::C, &[9]);
        c.add_register(Some(RegId::C), RegId::C, Some(RegId::A), Span::new(0, 0));
        assert_eq!(c.get_reg(RegId::C)[0], 8);
        assert!(c.carry());
    }

    #[test]
    fn test_add_hex_wraps_at_sixteen() {
        let mut c = cpu(Model::Hp25);
        c.base = HEX;
        set(&mut c, RegId::A, &[9]);
        set(&mut c, RegId::C, &[9]);
        c.add_register(Some(RegId::C), RegId::C, Some(RegId::A), Span::new(0, 0));
        assert_eq!(c.get_reg(RegId::C)[0], 0x2);
        assert!(c.carry());
        set(&mut c, RegId::A, &[0xf, 0xf]);
        set(&mut c, RegId::B, &[0, 0]);
        c.add_register(Some(RegId::B), RegId::A, Some(RegId::B), Span::new(0, 1));
        assert_eq!(&c.get_reg(RegId::B)[..2], &[0, 0]);
        assert!(c.carry());
    }

    #[test]
    fn test_carry_ripples_across_field() {
        let mut c = cpu(Model::Hp45);
        set(&mut c, RegId::A, &[9, 9, 9, 1]);
        c.increment_register(RegId::A, Span::WORD);
        assert_eq!(&c.get_reg(RegId::A)[..4], &[0, 0, 0, 2]);
        assert!(!c.carry());
    }

    #[test]
    fn test_add_then_sub_restores() {
        let mut c = cpu(Model::Hp21);
        set(&mut c, RegId::A, &[3, 4, 5, 6, 7, 8, 9, 0, 1, 2, 3, 4, 5, 6]);
        set(&mut c, RegId::C, &[9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 9, 8, 7, 6]);
        let before = *c.get_reg(RegId::A);
        c.add_register(Some(RegId::A), RegId::A, Some(RegId::C), Span::WORD);
        c.set_flag(Flag::Carry, false);
        c.sub_register(Some(RegId::A), Some(RegId::A), Some(RegId::C), Span::WORD);
        assert_eq!(*c.get_reg(RegId::A), before);
    }

    #[test]
    fn test_sub_borrow_and_negate() {
        let mut c = cpu(Model::Hp25);
        set(&mut c, RegId::C, &[3]);
        c.sub_register(Some(RegId::C), None, Some(RegId::C), Span::new(0, 1));
        // 0 - 03 = 97 with a borrow out
        assert_eq!(&c.get_reg(RegId::C)[..2], &[7, 9]);
        assert!(c.carry());
    }

    #[test]
    fn test_compare_without_destination() {
        let mut c = cpu(Model::Hp25);
        set(&mut c, RegId::A, &[2]);
        set(&mut c, RegId::C, &[5]);
        let a = *c.get_reg(RegId::A);
        c.sub_register(None, Some(RegId::A), Some(RegId::C), Span::new(0, 0));
        assert!(c.carry());
        assert_eq!(*c.get_reg(RegId::A), a);
    }

    #[test]
    fn test_equal_and_not_equal() {
        let mut c = cpu(Model::Hp25);
        set(&mut c, RegId::B, &[0, 0, 0, 1]);
        c.test_equal(RegId::B, None, Span::new(0, 2));
        assert!(c.carry());
        c.test_equal(RegId::B, None, Span::WORD);
        assert!(!c.carry());
        c.test_not_equal(RegId::B, None, Span::WORD);
        assert!(c.carry());
    }

    #[test]
    fn test_shifts() {
        let mut c = cpu(Model::Hp25);
        set(&mut c, RegId::A, &[1, 2, 3, 4]);
        c.shift_right_register(RegId::A, Span::new(0, 3));
        assert_eq!(&c.get_reg(RegId::A)[..4], &[2, 3, 4, 0]);
        c.set_flag(Flag::PrevCarry, true);
        c.shift_left_register(RegId::A, Span::new(0, 3));
        assert_eq!(&c.get_reg(RegId::A)[..4], &[0, 2, 3, 4]);
        assert!(!c.prev_carry());
    }

    #[test]
    fn test_rotate_registers() {
        let mut c = cpu(Model::Hp11c);
        set(&mut c, RegId::C, &[1, 2, 3]);
        c.rotate_right_register(RegId::C, 2);
        assert_eq!(c.get_reg(RegId::C)[0], 3);
        assert_eq!(c.get_reg(RegId::C)[12], 1);
        assert_eq!(c.get_reg(RegId::C)[13], 2);
        set(&mut c, RegId::A, &[5]);
        c.get_reg_mut(RegId::A)[13] = 7;
        c.rotate_left_register(RegId::A);
        assert_eq!(c.get_reg(RegId::A)[0], 7);
        assert_eq!(c.get_reg(RegId::A)[1], 5);
    }

    #[test]
    fn test_word_pointer_field_stops_at_pointer() {
        let mut c = cpu(Model::Hp25);
        c.p = 5;
        // Woodstock field code 1 is WP
        let (field, span) = c.select_field(1).unwrap();
        assert_eq!(field, Field::WordPointer);
        assert_eq!(span, Span::new(0, 5));
    }

    #[test]
    fn test_classic_field_codes() {
        let mut c = cpu(Model::Hp35);
        c.p = 4;
        assert_eq!(c.select_field(0).unwrap().1, Span::new(4, 4));
        assert_eq!(c.select_field(1).unwrap().1, Span::new(3, 12));
        assert_eq!(c.select_field(2).unwrap().1, Span::new(0, 2));
        assert_eq!(c.select_field(5).unwrap().1, Span::new(3, 13));
        assert_eq!(c.select_field(6).unwrap().1, Span::new(2, 2));
        assert_eq!(c.select_field(7).unwrap().1, Span::new(13, 13));
    }

    #[test]
    fn test_pointer_pair_field() {
        let mut c = cpu(Model::Hp15c);
        c.p = 3;
        c.q = 7;
        assert_eq!(c.select_field(4).unwrap().1, Span::new(3, 7));
        c.p = 9;
        assert_eq!(c.select_field(4).unwrap().1, Span::new(9, 13));
        c.ptr = Pointer::Q;
        assert_eq!(c.select_field(0).unwrap().1, Span::new(7, 7));
        assert_eq!(c.select_field(2).unwrap().1, Span::new(0, 7));
    }

    #[test]
    fn test_pointer_out_of_range_is_fatal() {
        let mut c = cpu(Model::Hp25);
        c.p = 14;
        assert!(matches!(
            c.select_field(0),
            Err(Error::PointerOutOfRange { pointer: 14, .. })
        ));
        // Fixed fields do not care about the pointer
        assert!(c.select_field(6).is_ok());
    }

    #[test]
    fn test_logic_ops() {
        let mut c = cpu(Model::Hp11c);
        set(&mut c, RegId::A, &[0b1010]);
        set(&mut c, RegId::C, &[0b0110]);
        c.or_register(RegId::C, RegId::C, Some(RegId::A), Span::WORD);
        assert_eq!(c.get_reg(RegId::C)[0], 0b1110);
        c.and_register(RegId::C, RegId::C, Some(RegId::A), Span::WORD);
        assert_eq!(c.get_reg(RegId::C)[0], 0b1010);
    }

    #[test]
    fn test_reg_word() {
        let mut c = cpu(Model::Hp11c);
        c.set_reg_word(RegId::C, 3, 0x1234);
        assert_eq!(&c.get_reg(RegId::C)[3..7], &[4, 3, 2, 1]);
        assert_eq!(c.reg_word(RegId::C, 3), 0x1234);
    }
}
