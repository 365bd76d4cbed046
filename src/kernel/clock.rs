// Time sources seen by the scheduler
//
// Clock: a free-running, wrapping counter in base units (ms).
// TimeSource: a clock that can also be asked to call the scheduler
// back later (hardware alarm, or a flag the main loop polls).
//
// TickClock is the counter most boards end up with: a periodic timer
// ISR bumps it. The tick weight compensates when the timer is slowed
// down (e.g. 10ms active, 100ms idle).

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;

pub trait Clock {
    /// Significant counter bits. A 16-bit hardware counter uses 0xFFFF.
    const MASK: u32 = u32::MAX;

    fn now(&self) -> u32;

    /// Units from `since` to `now`, correct across one counter wrap.
    #[inline]
    fn elapsed(&self, since: u32, now: u32) -> u32 {
        now.wrapping_sub(since) & Self::MASK
    }
}

pub trait TimeSource: Clock {
    /// Arrange for the scheduler to be fired about `delay` units from
    /// now. Replaces any earlier request.
    fn arm(&self, delay: u64);
}

/// Clock advanced by a periodic interrupt.
pub struct TickClock {
    // cs: riscv32imc has no atomic add
    ticks: Mutex<Cell<u32>>,
    // base units per tick() call
    weight: AtomicU32,
}

impl TickClock {
    pub const fn new() -> Self {
        Self::with_weight(1)
    }

    pub const fn with_weight(weight: u32) -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
            weight: AtomicU32::new(weight),
        }
    }

    /// Called from the timer ISR.
    #[inline]
    pub fn tick(&self) {
        self.advance(self.weight.load(Ordering::Relaxed));
    }

    pub fn advance(&self, units: u32) {
        critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().wrapping_add(units) & Self::MASK);
        });
    }

    pub fn set(&self, value: u32) {
        critical_section::with(|cs| self.ticks.borrow(cs).set(value & Self::MASK));
    }

    pub fn set_tick_weight(&self, weight: u32) {
        self.weight.store(weight, Ordering::Release);
    }

    pub fn tick_weight(&self) -> u32 {
        self.weight.load(Ordering::Acquire)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TickClock {
    fn now(&self) -> u32 {
        critical_section::with(|cs| self.ticks.borrow(cs).get())
    }
}
