// Key input
//
// The host reports a key as the code the firmware expects to read back
// (row and column packed into one byte). Nothing is queued: the firmware
// polls the pressed flag through the status bits latched at each step.

use crate::cpu::Processor;
use crate::model::Family;

impl Processor {
    /// Hold down the key with `code`. A Nut that is asleep or powered
    /// off wakes up and resumes at address 0.
    pub fn press_key(&mut self, code: u8) {
        self.code = code;
        self.keypressed = true;
        if self.variant.family == Family::Nut && (self.sleep || !self.enabled) {
            self.wake();
        }
    }

    /// Release the held key. The code stays readable until the firmware
    /// consumes it.
    pub fn release_key(&mut self) {
        self.keypressed = false;
    }

    pub fn is_key_pressed(&self) -> bool {
        self.keypressed
    }

    pub fn key_code(&self) -> u8 {
        self.code
    }

    /// Leave light or deep sleep.
    pub fn wake(&mut self) {
        self.sleep = false;
        self.enabled = true;
    }
}
