//! Modifier-key state read once when a command is invoked
use serde::{Deserialize, Serialize};

pub const SHIFT: u32 = 1;
pub const CTRL: u32 = 1 << 1;
pub const ALT: u32 = 1 << 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierState {
    /// Run the alternate script
    pub shift: bool,
    /// Force debug mode
    pub ctrl: bool,
    /// Reveal the script instead of running it
    pub alt: bool,
}

impl ModifierState {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_bits(bits: u32) -> Self {
        Self {
            shift: bits & SHIFT != 0,
            ctrl: bits & CTRL != 0,
            alt: bits & ALT != 0,
        }
    }

    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.shift {
            bits |= SHIFT;
        }
        if self.ctrl {
            bits |= CTRL;
        }
        if self.alt {
            bits |= ALT;
        }
        bits
    }
}
