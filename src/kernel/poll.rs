// Polled time source for boards without a spare alarm interrupt
// NOTE: precision is bounded by how often the main loop calls process():
// - arm() only records when the next check is due
// - process() fires the scheduler once that much time has passed
// - pending() tells the loop how long it may sleep (WFI) meanwhile

use core::cell::Cell;

use critical_section::Mutex;

use super::clock::{Clock, TimeSource};
use super::lock::Lock;
use super::scheduler::Scheduler;

#[derive(Debug, Clone, Copy)]
struct Wait {
    since: u32,
    delay: u32,
}

pub struct Polled<C> {
    clock: C,
    wait: Mutex<Cell<Option<Wait>>>,
}

impl<C: Clock> Polled<C> {
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            wait: Mutex::new(Cell::new(None)),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // a wait must stay well inside one counter period or elapsed() aliases
    const fn max_wait() -> u32 {
        C::MASK / 2
    }

    /// Time left until the armed check, `None` when nothing is armed.
    pub fn pending(&self) -> Option<u32> {
        let wait = critical_section::with(|cs| self.wait.borrow(cs).get())?;
        let elapsed = self.clock.elapsed(wait.since, self.clock.now());
        Some(wait.delay.saturating_sub(elapsed))
    }

    pub fn is_armed(&self) -> bool {
        critical_section::with(|cs| self.wait.borrow(cs).get().is_some())
    }

    pub fn disarm(&self) {
        critical_section::with(|cs| self.wait.borrow(cs).set(None));
    }

    /// Consumes the armed check if it is due, returning the current time.
    pub fn take_due(&self) -> Option<u32> {
        critical_section::with(|cs| {
            let slot = self.wait.borrow(cs);
            let wait = slot.get()?;
            let now = self.clock.now();
            if self.clock.elapsed(wait.since, now) < wait.delay {
                return None;
            }
            slot.set(None);
            Some(now)
        })
    }
}

impl<C: Clock> Clock for Polled<C> {
    const MASK: u32 = C::MASK;

    #[inline]
    fn now(&self) -> u32 {
        self.clock.now()
    }

    #[inline]
    fn elapsed(&self, since: u32, now: u32) -> u32 {
        self.clock.elapsed(since, now)
    }
}

impl<C: Clock> TimeSource for Polled<C> {
    fn arm(&self, delay: u64) {
        let delay = delay.min(Self::max_wait() as u64) as u32;
        let since = self.clock.now();
        critical_section::with(|cs| self.wait.borrow(cs).set(Some(Wait { since, delay })));
    }
}

impl<'a, C: Clock, L: Lock> Scheduler<'a, Polled<C>, L> {
    /// Main-loop hook: fires the scheduler if its armed delay has passed.
    /// Returns whether it fired.
    pub fn process(&self) -> bool {
        match self.source().take_due() {
            Some(now) => {
                self.fire(now);
                true
            }
            None => false,
        }
    }
}
