// Continuous memory state record
//
// A plain text dump of everything that survives power-off, written as two
// digit hex fields each followed by a comma, one group per line. Nut parts
// keep their whole CPU alive while off, so they save flags, status bits,
// registers and pointers ahead of the data registers. Other continuous
// models only save data registers.

use tracing::info;

use crate::cpu::Processor;
use crate::error::Warning;
use crate::model::Family;
use crate::types::*;

// --- Read helpers ---

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Fields successfully read so far.
    count: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            count: 0,
        }
    }

    /// Next comma-terminated hex field. None at the end of the record or on
    /// anything that is not a hex byte.
    fn read_8(&mut self) -> Option<u8> {
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos] != b',' {
            self.pos += 1;
        }
        if self.pos >= self.data.len() {
            return None;
        }
        let field = std::str::from_utf8(&self.data[start..self.pos]).ok()?;
        let v = u8::from_str_radix(field.trim(), 16).ok()?;
        self.pos += 1;
        self.count += 1;
        Some(v)
    }
}

// --- Write helpers ---

struct Writer {
    data: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self {
            data: Vec::with_capacity(4096),
        }
    }

    fn write_8(&mut self, val: u8) {
        self.data.extend_from_slice(format!("{:02x},", val).as_bytes());
    }

    fn write_nibbles(&mut self, n: &Nibbles) {
        for &d in n.iter().rev() {
            self.write_8(d);
        }
        self.end_line();
    }

    fn end_line(&mut self) {
        self.data.push(b'\n');
    }
}

/// Serialise the continuous memory of `cpu`. Empty for models without
/// continuous memory.
pub fn write_state(cpu: &Processor) -> Vec<u8> {
    let mut w = Writer::new();
    if !cpu.variant.continuous {
        return w.data;
    }

    if cpu.variant.family == Family::Nut {
        for &flag in cpu.flags.iter() {
            w.write_8(flag as u8);
        }
        w.end_line();
        for &bit in cpu.status().iter() {
            w.write_8(bit as u8);
        }
        w.end_line();
        for r in cpu.reg.iter() {
            w.write_nibbles(&r.nibbles);
        }
        for v in [cpu.p, cpu.q, cpu.f, cpu.g[0], cpu.g[1]] {
            w.write_8(v);
        }
        w.end_line();
    }

    for m in cpu.mem.iter() {
        w.write_nibbles(&m.nibbles);
    }

    info!(model = %cpu.model, bytes = w.data.len(), "saved continuous memory");
    w.data
}

/// Load a record written by `write_state` into `cpu`. Stops at the first
/// missing or malformed field, leaving everything after it untouched.
/// Returns the number of fields applied.
pub fn read_state(data: &[u8], cpu: &mut Processor) -> usize {
    if !cpu.variant.continuous {
        return 0;
    }
    let mut r = Reader::new(data);
    read_fields(&mut r, cpu);
    info!(model = %cpu.model, fields = r.count, "restored continuous memory");
    r.count
}

/// Saved pointers past the last nibble are pulled back to it.
fn checked_pointer(cpu: &mut Processor, value: u8) -> u8 {
    if (value as usize) < REG_SIZE {
        return value;
    }
    cpu.report(Warning::PointerClamped {
        addr: RomAddr(cpu.pc),
        pointer: value,
    });
    (REG_SIZE - 1) as u8
}

fn read_fields(r: &mut Reader<'_>, cpu: &mut Processor) {
    macro_rules! r8 {
        ($r:expr) => {
            match $r.read_8() {
                Some(v) => v,
                None => return,
            }
        };
    }

    if cpu.variant.family == Family::Nut {
        for i in 0..FLAGS {
            cpu.flags[i] = r8!(r) != 0;
        }
        for i in 0..cpu.variant.status_bits {
            cpu.status[i] = r8!(r) != 0;
        }
        for k in 0..REGISTERS {
            for i in (0..REG_SIZE).rev() {
                cpu.reg[k].nibbles[i] = r8!(r) & 0xf;
            }
        }
        let p = r8!(r) & 0xf;
        cpu.p = checked_pointer(cpu, p);
        let q = r8!(r) & 0xf;
        cpu.q = checked_pointer(cpu, q);
        cpu.f = r8!(r) & 0xf;
        cpu.g[0] = r8!(r) & 0xf;
        cpu.g[1] = r8!(r) & 0xf;
    }

    for k in 0..cpu.mem.len() {
        for i in (0..REG_SIZE).rev() {
            cpu.mem[k].nibbles[i] = r8!(r) & 0xf;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::rom::Rom;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn cpu(model: Model) -> Processor {
        let rom = Rom::blank(model.variant().rom_size);
        Processor::new(model, Arc::new(rom))
    }

    #[test]
    fn test_round_trip_nut() {
        let mut c = cpu(Model::Hp11c);
        c.get_reg_mut(RegId::C)[0] = 9;
        c.get_reg_mut(RegId::M)[13] = 0xa;
        c.mem[0x17].nibbles[5] = 3;
        c.status[4] = true;
        c.p = 7;
        c.q = 2;
        c.g = [1, 0xe];
        let saved = write_state(&c);

        let mut d = cpu(Model::Hp11c);
        let fields = read_state(&saved, &mut d);
        assert_eq!(fields, FLAGS + 14 + REGISTERS * REG_SIZE + 5 + 256 * REG_SIZE);
        assert_eq!(d.get_reg(RegId::C)[0], 9);
        assert_eq!(d.get_reg(RegId::M)[13], 0xa);
        assert_eq!(d.memory()[0x17].nibbles[5], 3);
        assert!(d.status()[4]);
        assert_eq!((d.p(), d.q(), d.g()), (7, 2, [1, 0xe]));
        assert_eq!(write_state(&d), saved);
    }

    #[test]
    fn test_pointer_past_register_is_clamped() {
        let mut c = cpu(Model::Hp11c);
        c.p = 3;
        c.q = 4;
        let saved = String::from_utf8(write_state(&c)).unwrap();
        // p and q follow flags, status and registers
        let at = FLAGS + 14 + REGISTERS * REG_SIZE;
        let mut fields: Vec<String> = saved.split(',').map(str::to_string).collect();
        fields[at] = fields[at].replace("03", "0f");
        fields[at + 1] = fields[at + 1].replace("04", "0e");
        let saved = fields.join(",");

        let clamped = Arc::new(AtomicUsize::new(0));
        let seen = clamped.clone();
        let mut d = cpu(Model::Hp11c);
        d.set_diagnostics(Box::new(move |w: &Warning| {
            if matches!(w, Warning::PointerClamped { .. }) {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));
        read_state(saved.as_bytes(), &mut d);
        assert_eq!((d.p(), d.q()), (13, 13));
        assert_eq!(clamped.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_record_format() {
        let mut c = cpu(Model::Hp25c);
        c.mem[0].nibbles[13] = 1;
        c.mem[0].nibbles[0] = 0xf;
        let saved = String::from_utf8(write_state(&c)).unwrap();
        let first = saved.lines().next().unwrap();
        assert_eq!(first, "01,00,00,00,00,00,00,00,00,00,00,00,00,0f,");
        assert_eq!(saved.lines().count(), 16);
    }

    #[test]
    fn test_truncated_record_keeps_rest() {
        let mut c = cpu(Model::Hp25c);
        c.mem[0].nibbles[13] = 4;
        c.mem[1].nibbles[13] = 5;
        let saved = write_state(&c);
        // Cut off in the middle of the second register
        let cut = &saved[..saved.len() / 16 + 10];

        let mut d = cpu(Model::Hp25c);
        d.mem[1].nibbles[0] = 7;
        let fields = read_state(cut, &mut d);
        assert_eq!(fields, REG_SIZE + 3);
        assert_eq!(d.memory()[0].nibbles[13], 4);
        assert_eq!(d.memory()[1].nibbles[13], 5);
        assert_eq!(d.memory()[1].nibbles[0], 7);
    }

    #[test]
    fn test_malformed_field_stops() {
        let mut d = cpu(Model::Hp25c);
        let fields = read_state(b"01,zz,03,", &mut d);
        assert_eq!(fields, 1);
        assert_eq!(d.memory()[0].nibbles[13], 1);
        assert_eq!(d.memory()[0].nibbles[12], 0);
    }

    #[test]
    fn test_volatile_models_do_nothing() {
        let mut c = cpu(Model::Hp25);
        c.mem[0].nibbles[0] = 1;
        assert!(write_state(&c).is_empty());
        assert_eq!(read_state(b"01,02,", &mut c), 0);
        assert_eq!(c.memory()[0].nibbles[13], 0);
    }
}
