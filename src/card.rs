// HP-67 card reader controller flags
//
// No card is ever inserted. The controller only keeps the handful of flags
// the firmware uses to remember keyboard and display state between
// instructions.

/// Clear-data-register instructions ignored after power on, so the
/// firmware's own initialisation does not wipe continuous memory.
const POWER_ON_CLEARS: i8 = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardReader {
    /// Counts up to zero while the startup clears are being skipped.
    pub ready: i8,
    pub card: bool,
    pub any_key: bool,
    pub function: bool,
    pub merge: bool,
    pub pause: bool,
    pub display: bool,
}

impl CardReader {
    pub fn powered_on(continuous: bool) -> Self {
        Self {
            ready: if continuous { -POWER_ON_CLEARS } else { 0 },
            ..Self::default()
        }
    }

    /// Called for "clear data registers". Returns true when the clear
    /// should go ahead.
    pub fn allow_clear(&mut self) -> bool {
        if self.ready != 0 {
            self.ready += 1;
            false
        } else {
            true
        }
    }
}

/// Read a one-shot flag and clear it.
#[inline]
pub(crate) fn take(flag: &mut bool) -> bool {
    std::mem::take(flag)
}
