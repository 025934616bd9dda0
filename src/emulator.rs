// Top-level Emulator struct
//
// Owns one Processor and drives it in bursts of instructions. Continuous
// memory is restored at construction and handed back by save_state; where
// the bytes live is up to the host.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cpu::Processor;
use crate::display::DisplayState;
use crate::error::{Result, TracingSink};
use crate::model::Model;
use crate::persist;
use crate::rom::Rom;

/// Why `run` returned before executing every requested instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Halt {
    /// Ran the full budget.
    Budget,
    /// Light sleep: display on, waiting for a key.
    Sleeping,
    /// Powered off until a key wakes it.
    PoweredOff,
}

pub struct Emulator {
    pub cpu: Processor,
    pub model: Model,
    /// Instructions executed since construction.
    pub instructions: u64,
}

impl Emulator {
    /// Build an emulator for `model` and restore `state` into it if the
    /// model has continuous memory.
    pub fn new(model: Model, rom: Arc<Rom>, state: Option<&[u8]>) -> Self {
        let mut cpu = Processor::new(model, rom);
        if let Some(data) = state {
            if cpu.variant().continuous {
                let fields = persist::read_state(data, &mut cpu);
                if fields == 0 && !data.is_empty() {
                    warn!(model = %model, "state record unreadable, starting from reset");
                }
            }
        }
        info!(model = %model, words = cpu.rom().len(), "emulator ready");
        Self {
            cpu,
            model,
            instructions: 0,
        }
    }

    /// Build from a ROM listing (see `Rom::load`).
    pub fn from_listing(model: Model, listing: &[u8], state: Option<&[u8]>) -> Result<Self> {
        let rom = Rom::load(model, listing, &mut TracingSink)?;
        Ok(Self::new(model, Arc::new(rom), state))
    }

    /// Execute up to `steps` instructions. Stops early when the processor
    /// goes to sleep or powers off; a fatal decode error is returned as is.
    pub fn run(&mut self, steps: usize) -> Result<Halt> {
        for _ in 0..steps {
            if let Some(halt) = self.halted() {
                return Ok(halt);
            }
            self.cpu.tick()?;
            self.instructions += 1;
        }
        Ok(self.halted().unwrap_or(Halt::Budget))
    }

    fn halted(&self) -> Option<Halt> {
        if !self.cpu.is_enabled() {
            Some(Halt::PoweredOff)
        } else if self.cpu.is_sleeping() {
            Some(Halt::Sleeping)
        } else {
            None
        }
    }

    pub fn press_key(&mut self, code: u8) {
        self.cpu.press_key(code);
    }

    pub fn release_key(&mut self) {
        self.cpu.release_key();
    }

    pub fn wake(&mut self) {
        self.cpu.wake();
    }

    /// Continuous memory record, or None for models that forget everything
    /// at power off.
    pub fn save_state(&self) -> Option<Vec<u8>> {
        self.cpu
            .variant()
            .continuous
            .then(|| persist::write_state(&self.cpu))
    }

    /// Lines printed since the last call (HP-10 only).
    pub fn printer_output(&mut self) -> Vec<String> {
        self.cpu
            .printer
            .as_mut()
            .map(|p| p.take_output())
            .unwrap_or_default()
    }

    pub fn display(&self) -> DisplayState {
        self.cpu.display_state()
    }
}
