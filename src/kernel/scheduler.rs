// Callback scheduler: one-shot and periodic tickets on a delta queue
// NOTE: No dynamic allocation; tickets are owned by the caller
//
// Application code schedules tickets; the time source (alarm ISR or
// the polled main loop) calls fire()/tick(). Both paths take the same
// Lock, and callbacks run while it is held, so a callback may schedule
// or cancel tickets (its own included) but should stay short.
use core::cell::Cell;
use core::fmt;
use core::ptr;

use critical_section::{CriticalSection, Mutex};
use log::{debug, trace, warn};

use super::clock::TimeSource;
use super::config::Config;
use super::lock::{Interrupts, Lock};
use super::queue::DeltaQueue;
use super::ticket::{Callback, Ticket, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// Ticket is still pending; returned by the `try_` variants only
    AlreadyScheduled,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::AlreadyScheduled => write!(f, "ticket already scheduled"),
        }
    }
}

impl core::error::Error for ScheduleError {}

struct State<'a> {
    queue: DeltaQueue<'a>,
    // clock value the queue offsets are relative to
    last_tick: Cell<u32>,
    running: Cell<bool>,
}

/// The timer: schedules tickets against one time source.
///
/// Constructed stopped. Tickets can be scheduled before `start()`;
/// their delays count from the moment the timer starts.
pub struct Scheduler<'a, T, L = Interrupts> {
    source: T,
    lock: L,
    config: Config,
    state: Mutex<State<'a>>,
}

impl<'a, T: TimeSource, L: Lock> Scheduler<'a, T, L> {
    pub const fn new(source: T, lock: L) -> Self {
        Self::with_config(source, lock, Config::defaults())
    }

    pub const fn with_config(source: T, lock: L, config: Config) -> Self {
        Self {
            source,
            lock,
            config: config.sanitize(),
            state: Mutex::new(State {
                queue: DeltaQueue::new(),
                last_tick: Cell::new(0),
                running: Cell::new(false),
            }),
        }
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    pub fn config(&self) -> Config {
        self.config
    }

    // schedule

    /// Runs `ticket` once, `delay` from now.
    ///
    /// A ticket that is already pending is moved to the new deadline.
    pub fn schedule_once(&self, ticket: &'a Ticket<'a>, delay: u16, unit: Unit) {
        self.schedule_repeating(ticket, delay, unit, 0, Unit::Millis);
    }

    /// Runs `ticket` after `delay`, then every `period` (0 = one-shot).
    pub fn schedule_repeating(
        &self,
        ticket: &'a Ticket<'a>,
        delay: u16,
        delay_unit: Unit,
        period: u16,
        period_unit: Unit,
    ) {
        self.lock.lock(|cs| {
            self.schedule_locked(cs, ticket, delay_unit.to_base(delay), period, period_unit)
        });
    }

    /// Runs `ticket` on the next tick, then every `period`.
    pub fn schedule_every(&self, ticket: &'a Ticket<'a>, period: u16, unit: Unit) {
        self.schedule_repeating(ticket, 0, Unit::Millis, period, unit);
    }

    /// Like `schedule_once`, but leaves a pending ticket alone.
    pub fn try_schedule_once(
        &self,
        ticket: &'a Ticket<'a>,
        delay: u16,
        unit: Unit,
    ) -> Result<(), ScheduleError> {
        self.try_schedule_repeating(ticket, delay, unit, 0, Unit::Millis)
    }

    /// Like `schedule_repeating`, but leaves a pending ticket alone.
    pub fn try_schedule_repeating(
        &self,
        ticket: &'a Ticket<'a>,
        delay: u16,
        delay_unit: Unit,
        period: u16,
        period_unit: Unit,
    ) -> Result<(), ScheduleError> {
        self.lock.lock(|cs| {
            if ticket.is_scheduled(cs) {
                return Err(ScheduleError::AlreadyScheduled);
            }
            self.schedule_locked(cs, ticket, delay_unit.to_base(delay), period, period_unit);
            Ok(())
        })
    }

    fn schedule_locked(
        &self,
        cs: CriticalSection<'_>,
        ticket: &'a Ticket<'a>,
        delay: u64,
        period: u16,
        period_unit: Unit,
    ) {
        let state = self.state.borrow(cs);
        let mut offset = delay;
        let running = state.running.get();
        let now = self.source.now();
        if running {
            if state.queue.is_empty() {
                // nothing was armed, so last_tick may be more than a
                // counter period old
                state.last_tick.set(now);
            }
            // offsets count from the last tick, not from now
            offset += self.source.elapsed(state.last_tick.get(), now) as u64;
        }

        if !state.queue.insert(cs, ticket, offset) {
            warn!("timer: ticket belongs to another timer, not scheduled");
            return;
        }
        ticket.set_period(cs, period, period_unit);
        trace!(
            "timer: scheduled delay={}ms period={}{}",
            delay, period, period_unit
        );

        if running && state.queue.head().is_some_and(|h| ptr::eq(h, ticket)) {
            self.arm_head(cs, state, now);
        }
    }

    /// Removes `ticket` from the queue. No-op if it is not pending.
    pub fn cancel(&self, ticket: &Ticket<'a>) -> bool {
        self.lock.lock(|cs| self.state.borrow(cs).queue.remove(cs, ticket))
    }

    pub fn set_callback(&self, ticket: &Ticket<'a>, callback: Callback<'a>) {
        self.lock.lock(|cs| ticket.set_callback(cs, callback));
    }

    // firing

    /// Fires every ticket due at `now` and re-arms the time source.
    ///
    /// Tickets made due by a callback during this pass (a zero delay)
    /// run on the next call, so one call always returns.
    ///
    /// Called by the time source driver. A stopped timer only records
    /// `now`, so time spent stopped never counts against tickets.
    pub fn fire(&self, now: u32) {
        self.lock.lock(|cs| {
            let state = self.state.borrow(cs);
            if !state.running.get() {
                state.last_tick.set(now);
                return;
            }

            let elapsed = self.source.elapsed(state.last_tick.get(), now);
            state.last_tick.set(now);
            state.queue.advance(cs, elapsed as u64, self.config.advance);

            // only tickets due now; anything a callback makes due runs on
            // the next fire
            let due = state.queue.due_len(cs);
            let mut fired: usize = 0;
            while fired < due {
                let Some(ticket) = state.queue.pop_due(cs) else {
                    break;
                };
                // unlinked before the call so the callback may reschedule it
                ticket.callback(cs).invoke();
                fired += 1;

                if ticket.is_scheduled(cs) {
                    continue;
                }
                if let Some((period, unit)) = ticket.period(cs) {
                    state.queue.insert(cs, ticket, unit.to_base(period));
                }
            }

            if fired > 0 {
                trace!("timer: fired {} at {} (elapsed {})", fired, now, elapsed);
            }

            if state.running.get() {
                self.arm_head(cs, state, now);
            }
        });
    }

    /// `fire` at the source's current time.
    #[inline]
    pub fn tick(&self) {
        self.fire(self.source.now());
    }

    fn arm_head(&self, cs: CriticalSection<'_>, state: &State<'a>, now: u32) {
        let Some(offset) = state.queue.head_offset(cs) else {
            return;
        };
        let since = self.source.elapsed(state.last_tick.get(), now) as u64;
        // past half a counter period elapsed() can no longer tell
        let delay = offset
            .saturating_sub(since)
            .min(self.config.max_arm)
            .min((T::MASK / 2) as u64);
        trace!("timer: next tick in {}ms", delay);
        self.source.arm(delay);
    }

    // lifecycle

    pub fn start(&self) {
        self.lock.lock(|cs| {
            let state = self.state.borrow(cs);
            if state.running.get() {
                return;
            }
            let now = self.source.now();
            state.running.set(true);
            state.last_tick.set(now);
            debug!("timer: start, {} pending", state.queue.len(cs));
            self.arm_head(cs, state, now);
        });
    }

    /// Suspends firing. Pending tickets keep the delay they had left.
    pub fn stop(&self) {
        self.lock.lock(|cs| {
            let state = self.state.borrow(cs);
            if !state.running.get() {
                return;
            }
            // bank the time run so far; due tickets fire after start()
            let now = self.source.now();
            let elapsed = self.source.elapsed(state.last_tick.get(), now);
            state.queue.advance(cs, elapsed as u64, self.config.advance);
            state.last_tick.set(now);
            state.running.set(false);
            debug!("timer: stop, {} pending", state.queue.len(cs));
        });
    }

    pub fn is_running(&self) -> bool {
        self.lock.lock(|cs| self.state.borrow(cs).running.get())
    }

    // introspection

    pub fn is_scheduled(&self, ticket: &Ticket<'a>) -> bool {
        self.lock.lock(|cs| ticket.is_scheduled(cs))
    }

    /// Time left until `ticket` fires, `None` if it is not in this queue.
    pub fn remaining(&self, ticket: &Ticket<'a>) -> Option<u64> {
        self.lock.lock(|cs| {
            let state = self.state.borrow(cs);
            let deadline = state.queue.deadline(cs, ticket)?;
            Some(deadline.saturating_sub(self.since_last_tick(state)))
        })
    }

    /// Time left until the head of the queue fires.
    pub fn next_due(&self) -> Option<u64> {
        self.lock.lock(|cs| {
            let state = self.state.borrow(cs);
            let offset = state.queue.head_offset(cs)?;
            Some(offset.saturating_sub(self.since_last_tick(state)))
        })
    }

    fn since_last_tick(&self, state: &State<'a>) -> u64 {
        if state.running.get() {
            self.source
                .elapsed(state.last_tick.get(), self.source.now()) as u64
        } else {
            0
        }
    }

    pub fn len(&self) -> usize {
        self.lock.lock(|cs| self.state.borrow(cs).queue.len(cs))
    }

    pub fn is_empty(&self) -> bool {
        self.lock.lock(|cs| self.state.borrow(cs).queue.is_empty())
    }

    /// Writes `list={ticket, ticket, ...}` in firing order.
    pub fn dump<W: fmt::Write>(&self, w: &mut W) -> fmt::Result {
        self.lock.lock(|cs| {
            w.write_str("list={")?;
            for (i, ticket) in self.state.borrow(cs).queue.iter(cs).enumerate() {
                if i > 0 {
                    w.write_str(", ")?;
                }
                write!(w, "{}", ticket.info(cs))?;
            }
            w.write_str("}")
        })
    }

    pub fn log_queue(&self) {
        self.lock.lock(|cs| {
            let state = self.state.borrow(cs);
            debug!(
                "timer: running={} last_tick={} pending={}",
                state.running.get(),
                state.last_tick.get(),
                state.queue.len(cs)
            );
            for (i, ticket) in state.queue.iter(cs).enumerate() {
                debug!("  [{}] {}", i, ticket.info(cs));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::clock::{Clock, TickClock};
    use crate::kernel::config::AdvanceMode;
    use crate::kernel::lock::Cooperative;
    use crate::kernel::poll::Polled;
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::string::String;
    use std::sync::Mutex as StdMutex;

    type TestTimer<'a> = Scheduler<'a, Polled<TickClock>>;

    fn timer<'a>() -> TestTimer<'a> {
        Scheduler::new(Polled::new(TickClock::new()), Interrupts)
    }

    // move the clock forward and let the polled source fire if due
    fn step(timer: &TestTimer<'_>, ms: u32) {
        timer.source().clock().advance(ms);
        timer.process();
    }

    fn count(hits: &AtomicU32) -> u32 {
        hits.load(Ordering::Relaxed)
    }

    #[test]
    fn one_shot_fires_once() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let ticket = Ticket::with_callback(Callback::from(&bump));
        let timer = timer();

        timer.start();
        timer.schedule_once(&ticket, 100, Unit::Millis);

        step(&timer, 99);
        assert_eq!(count(&hits), 0);
        step(&timer, 1);
        assert_eq!(count(&hits), 1);
        assert!(!timer.is_scheduled(&ticket));

        step(&timer, 500);
        assert_eq!(count(&hits), 1);
        assert!(timer.is_empty());
    }

    #[test]
    fn periodic_rearms() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let ticket = Ticket::with_callback(Callback::from(&bump));
        let timer = timer();

        timer.schedule_every(&ticket, 50, Unit::Millis);
        timer.start();

        for expected in 1..=3 {
            step(&timer, 50);
            assert_eq!(count(&hits), expected);
            assert!(timer.is_scheduled(&ticket));
            assert_eq!(timer.remaining(&ticket), Some(50));
        }
    }

    #[test]
    fn delayed_periodic_uses_period_after_first_fire() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let ticket = Ticket::with_callback(Callback::from(&bump));
        let timer = timer();

        timer.start();
        timer.schedule_repeating(&ticket, 2, Unit::Seconds, 500, Unit::Millis);
        assert_eq!(timer.remaining(&ticket), Some(2_000));

        step(&timer, 2_000);
        assert_eq!(count(&hits), 1);
        assert_eq!(timer.remaining(&ticket), Some(500));
        step(&timer, 500);
        assert_eq!(count(&hits), 2);
    }

    #[test]
    fn fires_in_deadline_order() {
        let fired = StdMutex::new(Vec::new());
        let first = || fired.lock().unwrap().push(1);
        let second = || fired.lock().unwrap().push(2);
        let third = || fired.lock().unwrap().push(3);
        let a = Ticket::with_callback(Callback::from(&first));
        let b = Ticket::with_callback(Callback::from(&second));
        let c = Ticket::with_callback(Callback::from(&third));
        let timer = timer();

        timer.start();
        timer.schedule_once(&c, 30, Unit::Millis);
        timer.schedule_once(&a, 10, Unit::Millis);
        timer.schedule_once(&b, 20, Unit::Millis);

        step(&timer, 30);
        assert_eq!(*fired.lock().unwrap(), [1, 2, 3]);
        assert!(timer.is_empty());
    }

    #[test]
    fn ties_fire_in_schedule_order() {
        let fired = StdMutex::new(Vec::new());
        let first = || fired.lock().unwrap().push(1);
        let second = || fired.lock().unwrap().push(2);
        let a = Ticket::with_callback(Callback::from(&first));
        let b = Ticket::with_callback(Callback::from(&second));
        let timer = timer();

        timer.start();
        timer.schedule_once(&a, 10, Unit::Millis);
        timer.schedule_once(&b, 10, Unit::Millis);

        step(&timer, 10);
        assert_eq!(*fired.lock().unwrap(), [1, 2]);
    }

    #[test]
    fn reschedule_moves_not_duplicates() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let ticket = Ticket::with_callback(Callback::from(&bump));
        let timer = timer();

        timer.start();
        timer.schedule_once(&ticket, 100, Unit::Millis);
        timer.schedule_once(&ticket, 30, Unit::Millis);
        assert_eq!(timer.len(), 1);
        assert_eq!(timer.remaining(&ticket), Some(30));

        step(&timer, 30);
        assert_eq!(count(&hits), 1);
        step(&timer, 100);
        assert_eq!(count(&hits), 1);
    }

    #[test]
    fn try_schedule_rejects_pending_ticket() {
        let ticket = Ticket::new();
        let timer = timer();

        timer.start();
        assert_eq!(timer.try_schedule_once(&ticket, 40, Unit::Millis), Ok(()));
        assert_eq!(
            timer.try_schedule_once(&ticket, 10, Unit::Millis),
            Err(ScheduleError::AlreadyScheduled)
        );
        assert_eq!(timer.remaining(&ticket), Some(40));
        assert_eq!(
            format!("{}", ScheduleError::AlreadyScheduled),
            "ticket already scheduled"
        );
    }

    #[test]
    fn cancel_is_idempotent() {
        let (a, b) = (Ticket::new(), Ticket::new());
        let timer = timer();

        timer.start();
        timer.schedule_once(&a, 10, Unit::Millis);
        timer.schedule_once(&b, 20, Unit::Millis);

        assert!(timer.cancel(&a));
        assert!(!timer.cancel(&a));
        assert_eq!(timer.len(), 1);
        assert_eq!(timer.remaining(&b), Some(20));
    }

    #[test]
    fn elapsed_time_survives_clock_wrap() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let ticket = Ticket::with_callback(Callback::from(&bump));
        let timer = timer();
        timer.source().clock().set(u32::MAX - 20);

        timer.start();
        timer.schedule_once(&ticket, 50, Unit::Millis);
        step(&timer, 49);
        assert_eq!(count(&hits), 0);
        step(&timer, 1);
        assert_eq!(count(&hits), 1);
        assert!(timer.source().clock().now() < 100);
    }

    #[test]
    fn stopped_timer_does_not_fire() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let ticket = Ticket::with_callback(Callback::from(&bump));
        let timer = timer();

        timer.start();
        timer.schedule_once(&ticket, 100, Unit::Millis);
        step(&timer, 50);
        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.remaining(&ticket), Some(50));

        step(&timer, 500);
        timer.fire(timer.source().now());
        assert_eq!(count(&hits), 0);
        assert_eq!(timer.remaining(&ticket), Some(50));

        timer.start();
        step(&timer, 49);
        assert_eq!(count(&hits), 0);
        step(&timer, 1);
        assert_eq!(count(&hits), 1);
    }

    #[test]
    fn fire_before_start_is_noop() {
        let ticket = Ticket::new();
        let timer = timer();

        timer.schedule_once(&ticket, 10, Unit::Millis);
        timer.fire(1_000);
        assert!(timer.is_scheduled(&ticket));
        assert_eq!(timer.remaining(&ticket), Some(10));
    }

    #[test]
    fn empty_queue_never_arms() {
        let timer = timer();
        timer.start();
        step(&timer, 1_000);
        timer.tick();
        assert!(timer.is_empty());
        assert_eq!(timer.source().pending(), None);
        assert_eq!(timer.next_due(), None);
    }

    #[test]
    fn new_head_rearms_running_source() {
        let (a, b) = (Ticket::new(), Ticket::new());
        let timer = timer();

        timer.start();
        timer.schedule_once(&a, 100, Unit::Millis);
        assert_eq!(timer.source().pending(), Some(100));

        timer.schedule_once(&b, 20, Unit::Millis);
        assert_eq!(timer.source().pending(), Some(20));
        assert_eq!(timer.next_due(), Some(20));
    }

    #[test]
    fn schedule_mid_interval_counts_from_now() {
        let (a, b) = (Ticket::new(), Ticket::new());
        let timer = timer();

        timer.start();
        timer.schedule_once(&a, 100, Unit::Millis);
        timer.source().clock().advance(30);
        timer.schedule_once(&b, 100, Unit::Millis);

        assert_eq!(timer.remaining(&a), Some(70));
        assert_eq!(timer.remaining(&b), Some(100));
    }

    #[test]
    fn empty_callback_only_tracks_time() {
        let ticket = Ticket::new();
        let timer = timer();

        timer.start();
        timer.schedule_once(&ticket, 5, Unit::Millis);
        step(&timer, 5);
        assert!(!timer.is_scheduled(&ticket));
    }

    #[test]
    fn callback_can_reschedule_itself() {
        let hits = AtomicU32::new(0);
        let timer = timer();
        let ticket = Ticket::new();
        let again = || {
            if hits.fetch_add(1, Ordering::Relaxed) < 2 {
                timer.schedule_once(&ticket, 10, Unit::Millis);
            }
        };
        timer.set_callback(&ticket, Callback::from(&again));

        timer.start();
        timer.schedule_once(&ticket, 10, Unit::Millis);
        for _ in 0..5 {
            step(&timer, 10);
        }
        assert_eq!(count(&hits), 3);
        assert!(!timer.is_scheduled(&ticket));
    }

    #[test]
    fn zero_delay_reschedule_waits_for_next_fire() {
        let hits = AtomicU32::new(0);
        let timer = timer();
        let ticket = Ticket::new();
        let again = || {
            hits.fetch_add(1, Ordering::Relaxed);
            timer.schedule_once(&ticket, 0, Unit::Millis);
        };
        timer.set_callback(&ticket, Callback::from(&again));

        timer.start();
        timer.schedule_once(&ticket, 10, Unit::Millis);
        step(&timer, 10);
        assert_eq!(count(&hits), 1);
        assert!(timer.is_scheduled(&ticket));
        assert_eq!(timer.source().pending(), Some(0));

        // due again immediately, but one pass per call
        assert!(timer.process());
        assert_eq!(count(&hits), 2);
        timer.cancel(&ticket);
    }

    #[test]
    fn ticket_pending_on_another_timer_is_refused() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let ticket = Ticket::with_callback(Callback::from(&bump));
        let first = timer();
        let second = timer();

        first.start();
        second.start();
        first.schedule_every(&ticket, 20, Unit::Millis);

        second.schedule_once(&ticket, 5, Unit::Millis);
        assert!(second.is_empty());
        assert!(!second.cancel(&ticket));
        assert_eq!(
            second.try_schedule_once(&ticket, 5, Unit::Millis),
            Err(ScheduleError::AlreadyScheduled)
        );
        assert_eq!(first.remaining(&ticket), Some(0));
        critical_section::with(|cs| {
            assert_eq!(ticket.period(cs), Some((20, Unit::Millis)));
        });

        step(&first, 0);
        step(&second, 5);
        assert_eq!(count(&hits), 1);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    // one-shot hardware alarm on a 16-bit counter
    struct Alarm16 {
        now: Cell<u32>,
        armed: Cell<Option<u64>>,
    }

    impl Clock for Alarm16 {
        const MASK: u32 = 0xFFFF;

        fn now(&self) -> u32 {
            self.now.get()
        }
    }

    impl TimeSource for Alarm16 {
        fn arm(&self, delay: u64) {
            self.armed.set(Some(delay));
        }
    }

    #[test]
    fn arm_delay_stays_within_half_the_counter() {
        let ticket = Ticket::new();
        let alarm = Alarm16 {
            now: Cell::new(0),
            armed: Cell::new(None),
        };
        let timer = Scheduler::new(alarm, Interrupts);

        timer.start();
        timer.schedule_once(&ticket, 100, Unit::Seconds);
        assert_eq!(timer.source().armed.get(), Some(0x7FFF));
    }

    #[test]
    fn callback_can_schedule_another_ticket() {
        let hits = AtomicU32::new(0);
        let timer = timer();
        let follow_up = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let second = Ticket::with_callback(Callback::from(&follow_up));
        let chain = || timer.schedule_once(&second, 1, Unit::Seconds);
        let first = Ticket::with_callback(Callback::from(&chain));

        timer.start();
        timer.schedule_once(&first, 10, Unit::Millis);
        step(&timer, 10);
        assert!(timer.is_scheduled(&second));
        assert_eq!(timer.remaining(&second), Some(1_000));

        step(&timer, 1_000);
        assert_eq!(count(&hits), 1);
    }

    #[test]
    fn head_only_advance_catches_up_one_call_at_a_time() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let (a, b) = (
            Ticket::with_callback(Callback::from(&bump)),
            Ticket::with_callback(Callback::from(&bump)),
        );
        let config = Config::defaults().with_advance(AdvanceMode::HeadOnly);
        let timer: TestTimer<'_> =
            Scheduler::with_config(Polled::new(TickClock::new()), Interrupts, config);

        timer.start();
        timer.schedule_once(&a, 10, Unit::Millis);
        timer.schedule_once(&b, 20, Unit::Millis);

        step(&timer, 30);
        assert_eq!(count(&hits), 1);
        assert_eq!(timer.remaining(&b), Some(10));
        step(&timer, 10);
        assert_eq!(count(&hits), 2);
    }

    #[test]
    fn max_arm_splits_long_waits() {
        let ticket = Ticket::new();
        let config = Config::defaults().with_max_arm(25);
        let timer: TestTimer<'_> =
            Scheduler::with_config(Polled::new(TickClock::new()), Interrupts, config);

        timer.start();
        timer.schedule_once(&ticket, 100, Unit::Millis);
        assert_eq!(timer.source().pending(), Some(25));

        step(&timer, 25);
        assert!(timer.is_scheduled(&ticket));
        assert_eq!(timer.remaining(&ticket), Some(75));
        assert_eq!(timer.source().pending(), Some(25));

        for _ in 0..3 {
            step(&timer, 25);
        }
        assert!(!timer.is_scheduled(&ticket));
    }

    #[test]
    fn cooperative_lock_drives_the_same_engine() {
        let hits = AtomicU32::new(0);
        let bump = || {
            hits.fetch_add(1, Ordering::Relaxed);
        };
        let ticket = Ticket::with_callback(Callback::from(&bump));
        let timer = Scheduler::new(Polled::new(TickClock::new()), unsafe { Cooperative::new() });

        timer.start();
        timer.schedule_every(&ticket, 1, Unit::Seconds);
        for _ in 0..4 {
            timer.source().clock().advance(1_000);
            timer.process();
        }
        assert_eq!(count(&hits), 4);
    }

    #[test]
    fn dump_lists_tickets_in_order() {
        let (a, b) = (Ticket::new(), Ticket::new());
        let timer = timer();

        timer.schedule_once(&a, 10, Unit::Millis);
        timer.schedule_every(&b, 2, Unit::Seconds);

        let mut out = String::new();
        timer.dump(&mut out).unwrap();
        assert_eq!(
            out,
            "list={{offset=0, period=2s, scheduled=true}, \
             {offset=10, period=0ms, scheduled=true}}"
        );
        timer.log_queue();
    }
}
