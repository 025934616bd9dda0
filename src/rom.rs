// ROM image and the text listing loader
//
// Listings are lines of `address:opcode` (a comma also separates the two
// numbers). Octal for Classic and Woodstock, hexadecimal for Nut. Anything
// that does not parse as a pair of numbers is skipped, so listings can carry
// comments and headers.

use std::io::BufRead;
use std::ops::Index;

use crate::error::{DiagnosticSink, Result, Warning};
use crate::model::Model;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    words: Vec<u16>,
}

impl Rom {
    pub fn new(words: Vec<u16>) -> Self {
        Self { words }
    }

    /// A ROM of `size` words, all `nop`.
    pub fn blank(size: usize) -> Self {
        Self { words: vec![0; size] }
    }

    /// A blank ROM sized for `model` with a listing applied over it.
    pub fn load<R: BufRead>(model: Model, reader: R, sink: &mut dyn DiagnosticSink) -> Result<Self> {
        let variant = model.variant();
        let mut rom = Self::blank(variant.rom_size);
        rom.patch(reader, variant.listing_radix(), sink)?;
        Ok(rom)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[inline]
    pub fn get(&self, addr: usize) -> Option<u16> {
        self.words.get(addr).copied()
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Apply a listing on top of the current contents. Returns the number
    /// of words written. Addresses past the end are reported and skipped.
    pub fn patch<R: BufRead>(
        &mut self,
        reader: R,
        radix: u32,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<usize> {
        let mut written = 0;
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let Some((addr, opcode)) = parse_line(&line, radix) else {
                continue;
            };
            match self.words.get_mut(addr as usize) {
                Some(word) => {
                    *word = (opcode & 0x3ff) as u16;
                    written += 1;
                }
                None => sink.report(&Warning::PatchOutOfRange {
                    line: n + 1,
                    address: addr,
                }),
            }
        }
        Ok(written)
    }
}

impl Index<usize> for Rom {
    type Output = u16;

    fn index(&self, addr: usize) -> &u16 {
        &self.words[addr]
    }
}

fn parse_line(line: &str, radix: u32) -> Option<(u32, u32)> {
    let line = line.trim();
    let (addr, rest) = line.split_once(|c| c == ':' || c == ',')?;
    let opcode = rest
        .trim()
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .next()?;
    let addr = u32::from_str_radix(addr.trim(), radix).ok()?;
    let opcode = u32::from_str_radix(opcode, radix).ok()?;
    Some((addr, opcode))
}
