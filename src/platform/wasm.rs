// WASM interface via wasm-bindgen

use wasm_bindgen::prelude::*;

use crate::emulator::{Emulator, Halt};
use crate::model::Model;
use crate::types::RegId;

#[wasm_bindgen]
pub struct Calculator {
    emu: Emulator,
}

#[wasm_bindgen]
impl Calculator {
    /// Create a calculator.
    /// `model`: model name such as "hp25" or "11c".
    /// `listing`: ROM listing text, `address:opcode` per line.
    /// `state`: optional continuous memory record from save_state.
    #[wasm_bindgen(constructor)]
    pub fn new(model: &str, listing: &[u8], state: Option<Vec<u8>>) -> Result<Calculator, JsError> {
        let model: Model = model.parse()?;
        let emu = Emulator::from_listing(model, listing, state.as_deref())?;
        Ok(Self { emu })
    }

    /// Key code is row and column packed as the firmware reads them.
    pub fn press_key(&mut self, code: u8) {
        self.emu.press_key(code);
    }

    pub fn release_key(&mut self) {
        self.emu.release_key();
    }

    /// Run up to `steps` instructions. Returns false once the calculator
    /// is asleep or powered off.
    pub fn run(&mut self, steps: usize) -> Result<bool, JsError> {
        Ok(self.emu.run(steps)? == Halt::Budget)
    }

    /// Register 0-7 (A B C Y Z T M N), most significant nibble first.
    pub fn register(&self, index: usize) -> Vec<u8> {
        match RegId::ALL.get(index) {
            Some(&r) => self.emu.cpu.get_reg(r).iter().rev().copied().collect(),
            None => Vec::new(),
        }
    }

    pub fn display_enabled(&self) -> bool {
        self.emu.display().is_lit()
    }

    /// Continuous memory record; empty for models without one.
    pub fn save_state(&self) -> Vec<u8> {
        self.emu.save_state().unwrap_or_default()
    }

    /// Printed lines since the last call, newline separated.
    pub fn printer_output(&mut self) -> String {
        self.emu.printer_output().join("\n")
    }
}
