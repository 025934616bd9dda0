// Processor state shared by all three families

use std::fmt;
use std::sync::Arc;

use crate::card::CardReader;
use crate::error::{DiagnosticSink, TracingSink, Warning};
use crate::model::{Family, Model, Peripheral, Variant};
use crate::printer::{PrintMode, Printer};
use crate::rom::Rom;
use crate::types::*;

/// Identity of a register: a named processor register or a data memory cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegisterId {
    Named(RegId),
    Memory(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register {
    pub id: RegisterId,
    pub nibbles: Nibbles,
}

impl Register {
    pub fn new(id: RegisterId) -> Self {
        Self {
            id,
            nibbles: [0; REG_SIZE],
        }
    }

    pub fn clear(&mut self) {
        self.nibbles = [0; REG_SIZE];
    }

    pub fn is_zero(&self) -> bool {
        self.nibbles.iter().all(|&n| n == 0)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            RegisterId::Named(r) => write!(f, "reg[{}] = ", r.name())?,
            RegisterId::Memory(n) => write!(f, "mem[{:02}] = ", n)?,
        }
        for n in self.nibbles.iter().rev() {
            write!(f, "{:x}", n)?;
        }
        Ok(())
    }
}

pub struct Processor {
    pub(crate) rom: Arc<Rom>,
    pub(crate) model: Model,
    pub(crate) variant: Variant,

    pub(crate) reg: [Register; REGISTERS],
    pub(crate) mem: Vec<Register>,
    pub(crate) status: [bool; MAX_STATUS_BITS],
    pub(crate) flags: [bool; FLAGS],

    // Pointers (q and ptr are only used by Nut)
    pub(crate) p: u8,
    pub(crate) q: u8,
    pub(crate) ptr: Pointer,

    pub(crate) f: u8,
    pub(crate) g: [u8; 2],

    pub(crate) stack: [u16; STACK_SIZE],
    pub(crate) sp: usize,
    pub(crate) pc: u16,
    /// Address of the instruction being executed.
    pub(crate) last: u16,
    pub(crate) addr: u16,
    pub(crate) rom_number: u16,
    pub(crate) base: u8,

    /// Last executed opcode.
    pub(crate) opcode: u16,

    // Key input
    pub(crate) code: u8,
    pub(crate) keypressed: bool,
    pub(crate) kyf: bool,

    // Switches
    pub(crate) mode: bool,
    pub(crate) timer: bool,
    pub(crate) trace: bool,

    pub(crate) enabled: bool,
    pub(crate) sleep: bool,

    pub(crate) printer: Option<Printer>,
    pub(crate) card: Option<CardReader>,

    pub(crate) sink: Box<dyn DiagnosticSink>,
}

impl Processor {
    /// Create a processor for `model` running from `rom`. The ROM is shared,
    /// never copied. State starts out reset.
    pub fn new(model: Model, rom: Arc<Rom>) -> Self {
        let variant = model.variant();
        let reg = RegId::ALL.map(|r| Register::new(RegisterId::Named(r)));
        let mem = (0..variant.memory_size)
            .map(|n| Register::new(RegisterId::Memory(n)))
            .collect();
        let printer = (variant.peripheral == Peripheral::Printer).then(Printer::new);
        let card = (variant.peripheral == Peripheral::CardReader).then(CardReader::default);
        let mut cpu = Self {
            rom,
            model,
            variant,
            reg,
            mem,
            status: [false; MAX_STATUS_BITS],
            flags: [false; FLAGS],
            p: 0,
            q: 0,
            ptr: Pointer::P,
            f: 0,
            g: [0; 2],
            stack: [0; STACK_SIZE],
            sp: 0,
            pc: 0,
            last: 0,
            addr: 0,
            rom_number: 0,
            base: DEC,
            opcode: 0,
            code: 0,
            keypressed: false,
            kyf: false,
            mode: false,
            timer: false,
            trace: false,
            enabled: true,
            sleep: false,
            printer,
            card,
            sink: Box::new(TracingSink),
        };
        cpu.reset();
        cpu
    }

    /// Return every volatile part of the processor to its power-on value.
    /// The ROM, the switches and the trace setting are left alone.
    pub fn reset(&mut self) {
        for r in self.reg.iter_mut() {
            if let RegisterId::Named(id) = r.id {
                if id.is_volatile() {
                    r.clear();
                }
            }
        }
        self.stack = [0; STACK_SIZE];
        for m in self.mem.iter_mut() {
            m.clear();
        }
        self.status = [false; MAX_STATUS_BITS];
        self.flags = [false; FLAGS];
        self.opcode = 0;
        self.pc = 0;
        self.last = 0;
        self.sp = 0;
        self.f = 0;
        self.g = [0; 2];
        self.p = 0;
        self.addr = 0;
        self.base = DEC;
        self.code = 0;
        self.keypressed = false;
        self.kyf = false;
        self.enabled = true;
        self.sleep = false;

        if self.variant.family == Family::Woodstock {
            self.status[5] = true;
        }
        if let Some(card) = self.card.as_mut() {
            *card = CardReader::powered_on(self.variant.continuous);
        }
        if let Some(printer) = self.printer.as_mut() {
            printer.reset();
        }

        match self.variant.family {
            Family::Nut => {
                self.q = 0;
                self.ptr = Pointer::P;
                self.flags[Flag::Carry as usize] = true;
            }
            _ => self.rom_number = 0,
        }
    }

    /// Route non-fatal diagnostics somewhere other than `tracing`.
    pub fn set_diagnostics(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    pub(crate) fn report(&mut self, warning: Warning) {
        self.sink.report(&warning);
    }

    // --- Switches ---

    /// PRGM/RUN switch.
    pub fn set_mode(&mut self, program: bool) {
        self.mode = program;
    }

    /// TIMER switch (HP-55).
    pub fn set_timer(&mut self, timer: bool) {
        self.timer = timer;
    }

    /// HP-10 PRINT/DISPLAY switch. Ignored by models without a printer.
    pub fn set_print_mode(&mut self, mode: PrintMode) {
        if let Some(printer) = self.printer.as_mut() {
            printer.mode = mode;
        }
    }

    /// Emit one trace event per executed instruction.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    // --- Read-only inspection ---

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn rom(&self) -> &Arc<Rom> {
        &self.rom
    }

    #[inline]
    pub fn get_reg(&self, r: RegId) -> &Nibbles {
        &self.reg[r.index()].nibbles
    }

    #[inline]
    pub(crate) fn get_reg_mut(&mut self, r: RegId) -> &mut Nibbles {
        &mut self.reg[r.index()].nibbles
    }

    pub fn register(&self, r: RegId) -> &Register {
        &self.reg[r.index()]
    }

    pub fn memory(&self) -> &[Register] {
        &self.mem
    }

    pub fn status(&self) -> &[bool] {
        &self.status[..self.variant.status_bits]
    }

    /// Status word packed into an integer, bit n is s(n).
    pub fn status_word(&self) -> u16 {
        self.status()
            .iter()
            .enumerate()
            .fold(0, |w, (i, &s)| w | ((s as u16) << i))
    }

    #[inline]
    pub fn flag(&self, flag: Flag) -> bool {
        self.flags[flag as usize]
    }

    #[inline]
    pub(crate) fn set_flag(&mut self, flag: Flag, value: bool) {
        self.flags[flag as usize] = value;
    }

    pub fn carry(&self) -> bool {
        self.flag(Flag::Carry)
    }

    pub fn prev_carry(&self) -> bool {
        self.flag(Flag::PrevCarry)
    }

    pub fn display_enabled(&self) -> bool {
        self.flag(Flag::DisplayEnable)
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Address of the most recently fetched instruction.
    pub fn last_pc(&self) -> u16 {
        self.last
    }

    pub fn p(&self) -> u8 {
        self.p
    }

    pub fn q(&self) -> u8 {
        self.q
    }

    pub fn active_pointer(&self) -> Pointer {
        self.ptr
    }

    pub fn f(&self) -> u8 {
        self.f
    }

    pub fn g(&self) -> [u8; 2] {
        self.g
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn stack(&self) -> &[u16; STACK_SIZE] {
        &self.stack
    }

    pub fn data_address(&self) -> u16 {
        self.addr
    }

    pub fn base(&self) -> u8 {
        self.base
    }

    pub fn last_opcode(&self) -> u16 {
        self.opcode
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleep
    }

    pub fn keyboard_flag(&self) -> bool {
        self.kyf
    }

    pub fn card_reader(&self) -> Option<&CardReader> {
        self.card.as_ref()
    }

    pub fn printer(&self) -> Option<&Printer> {
        self.printer.as_ref()
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in self.reg.iter() {
            writeln!(f, "{}", r)?;
        }
        write!(
            f,
            "pc = {}  p = {:02}  sp = {}  base = {}  carry = {}  prev = {}  s = {:04x}",
            RomAddr(self.pc),
            self.p,
            self.sp,
            self.base,
            self.carry() as u8,
            self.prev_carry() as u8,
            self.status_word(),
        )?;
        if self.variant.family == Family::Nut {
            write!(
                f,
                "  q = {:02}  pt = {:?}  g = {:x}{:x}",
                self.q, self.ptr, self.g[1], self.g[0]
            )?;
        } else {
            write!(f, "  f = {:x}", self.f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(model: Model) -> Processor {
        let size = model.variant().rom_size;
        Processor::new(model, Arc::new(Rom::blank(size)))
    }

    #[test]
    fn test_reset_defaults() {
        let c = cpu(Model::Hp25);
        assert_eq!(c.pc(), 0);
        assert_eq!(c.base(), DEC);
        assert!(c.is_enabled());
        assert!(!c.is_sleeping());
        assert!(c.status()[5]);
        assert_eq!(c.status().len(), 16);
        assert_eq!(c.memory().len(), 16);
    }

    #[test]
    fn test_reset_keeps_m_and_n() {
        let mut c = cpu(Model::Hp45);
        c.get_reg_mut(RegId::M)[0] = 5;
        c.get_reg_mut(RegId::N)[1] = 6;
        c.get_reg_mut(RegId::A)[2] = 7;
        c.mem[0].nibbles[3] = 1;
        c.reset();
        assert_eq!(c.get_reg(RegId::M)[0], 5);
        assert_eq!(c.get_reg(RegId::N)[1], 6);
        assert_eq!(c.get_reg(RegId::A)[2], 0);
        assert!(c.memory()[0].is_zero());
    }

    #[test]
    fn test_nut_reset_sets_carry() {
        let c = cpu(Model::Hp11c);
        assert!(c.carry());
        assert_eq!(c.active_pointer(), Pointer::P);
        assert_eq!(c.status().len(), 14);
    }

    #[test]
    fn test_register_display() {
        let mut r = Register::new(RegisterId::Named(RegId::C));
        r.nibbles[0] = 0xa;
        r.nibbles[13] = 9;
        assert_eq!(r.to_string(), "reg[c] = 9000000000000a");
        let m = Register::new(RegisterId::Memory(3));
        assert_eq!(m.to_string(), "mem[03] = 00000000000000");
    }

    #[test]
    fn test_status_word() {
        let mut c = cpu(Model::Hp35);
        c.status[0] = true;
        c.status[11] = true;
        assert_eq!(c.status_word(), 0x801);
    }
}
