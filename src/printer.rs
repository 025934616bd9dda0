// HP-10 thermal printer (PIK chip)
//
// Characters are six bit codes written right to left into a line buffer.
// Flushing renders the whole line through the printer's character map and
// queues it for the caller.

use std::collections::VecDeque;

use crate::types::{Nibbles, REG_SIZE};

/// Characters per printed line.
pub const LINE_WIDTH: usize = 20;

/// Code of an empty position.
const BLANK: u8 = 0x3f;

/// Printer character set, indexed by six bit code.
static CHARMAP: [char; 0x40] = [
    ' ', ' ', '=', '0', 'L', 'M', '≠', '1', 'G', '¿', '>', '2', 'O', 'H', '≤', '3',
    'P', '√', 'X', '4', 'R', 'F', 'Z', '5', 'S', '?', 'x', '6', 'T', '→', '⇔', '7',
    '%', ' ', '¿', '8', 'J', 'X', '>', '9', 'A', '#', 'K', '.', 'B', 'b', '/', '-',
    'C', 'c', '÷', '+', 'D', 'd', '↑', '#', 'E', 'e', '↓', ' ', 'I', 'i', 'x', ' ',
];

/// Position of the PRINT/DISPLAY switch as read by "keys -> a".
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PrintMode {
    All = 1,
    Print = 2,
    #[default]
    Manual = 4,
}

#[derive(Clone, Debug)]
pub struct Printer {
    buffer: [u8; LINE_WIDTH],
    position: usize,
    pub mode: PrintMode,
    output: VecDeque<String>,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self {
            buffer: [BLANK; LINE_WIDTH],
            position: LINE_WIDTH,
            mode: PrintMode::default(),
            output: VecDeque::new(),
        }
    }

    /// Empty the line buffer. Printed lines already queued are kept.
    pub fn reset(&mut self) {
        self.buffer = [BLANK; LINE_WIDTH];
        self.position = LINE_WIDTH;
    }

    pub fn is_empty(&self) -> bool {
        self.position >= LINE_WIDTH
    }

    /// Print the buffer if anything was written to it.
    pub fn flush(&mut self) {
        if self.is_empty() {
            return;
        }
        let line: String = self
            .buffer
            .iter()
            .map(|&c| CHARMAP[(c & 0x3f) as usize])
            .collect();
        self.output.push_back(line);
        self.reset();
    }

    /// Queue BCD digits from `c`, least significant nibble first, stopping
    /// at the first 0xf. Returns false if the line filled up.
    pub fn print_numeric(&mut self, c: &Nibbles) -> bool {
        if self.position < LINE_WIDTH && self.buffer[self.position] == BLANK {
            self.position += 1;
        }
        for &digit in c.iter().take_while(|&&d| d != 0xf) {
            if self.position == 0 {
                return false;
            }
            self.position -= 1;
            self.buffer[self.position] = (digit << 2) | 0x3;
        }
        true
    }

    /// Queue six bit characters packed into `c`, stopping after a blank
    /// code. Returns false if the line filled up.
    pub fn print_alpha(&mut self, c: &Nibbles) -> bool {
        let mut odd = false;
        let mut i = 0;
        while i < REG_SIZE - 1 {
            if self.position == 0 {
                return false;
            }
            self.position -= 1;
            let ch = if odd {
                let ch = (c[i] >> 2) | (c[i + 1] << 2);
                i += 1;
                ch
            } else {
                c[i] | ((c[i + 1] & 0x3) << 4)
            };
            let ch = ch & 0x3f;
            self.buffer[self.position] = ch;
            odd = !odd;
            if ch == BLANK {
                break;
            }
            i += 1;
        }
        true
    }

    /// Remove and return every printed line.
    pub fn take_output(&mut self) -> Vec<String> {
        self.output.drain(..).collect()
    }

    pub fn pending_lines(&self) -> usize {
        self.output.len()
    }
}
