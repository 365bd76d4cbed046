// Scheduler settings
//
// Plain Copy struct with const defaults so a `static` scheduler can be
// built at compile time. sanitize() clamps anything that would stall
// the queue.

use core::fmt;

pub use super::queue::AdvanceMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub advance: AdvanceMode,
    // largest delay ever handed to TimeSource::arm; longer waits are
    // split into several wake-ups
    pub max_arm: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    pub const fn defaults() -> Self {
        Self {
            advance: AdvanceMode::Cascade,
            max_arm: u32::MAX as u64,
        }
    }

    pub const fn with_advance(mut self, advance: AdvanceMode) -> Self {
        self.advance = advance;
        self
    }

    pub const fn with_max_arm(mut self, max_arm: u64) -> Self {
        self.max_arm = max_arm;
        self
    }

    pub const fn sanitize(mut self) -> Self {
        if self.max_arm == 0 {
            self.max_arm = 1;
        }
        self
    }
}

impl fmt::Display for AdvanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvanceMode::Cascade => f.write_str("cascade"),
            AdvanceMode::HeadOnly => f.write_str("head-only"),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "advance={}, max_arm={}ms", self.advance, self.max_arm)
    }
}
