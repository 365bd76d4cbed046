// Tickets: caller-owned records for one deferred or periodic callback
//
// A ticket is intrusive: the queue links tickets through their own
// `next` field and never allocates. All mutable state sits behind a
// critical_section::Mutex so a ticket can be a `static` shared with
// an ISR; every access needs a CriticalSection token.

use core::cell::Cell;
use core::fmt;

use critical_section::{CriticalSection, Mutex};

/// Time units accepted for delays and periods.
///
/// Everything is normalised to milliseconds (the base unit) before it
/// reaches the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl Unit {
    /// Milliseconds in one of this unit.
    pub const fn millis(self) -> u64 {
        match self {
            Unit::Millis => 1,
            Unit::Seconds => 1_000,
            Unit::Minutes => 60_000,
            Unit::Hours => 3_600_000,
            Unit::Days => 86_400_000,
        }
    }

    /// Converts a raw delay/period to base units. u16 * days still fits.
    pub const fn to_base(self, value: u16) -> u64 {
        value as u64 * self.millis()
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Unit::Millis => "ms",
            Unit::Seconds => "s",
            Unit::Minutes => " mins",
            Unit::Hours => "h",
            Unit::Days => " days",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// What a ticket runs when it fires.
///
/// `Closure` borrows the callable, so context (an object, a counter,
/// a pin) is captured by the closure itself. Nothing is passed at
/// invoke time.
#[derive(Clone, Copy, Default)]
pub enum Callback<'a> {
    /// Fires as a no-op; the ticket only tracks time.
    #[default]
    Empty,
    Function(fn()),
    Closure(&'a (dyn Fn() + Sync)),
}

impl<'a> Callback<'a> {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Callback::Empty)
    }

    #[inline]
    pub fn invoke(&self) {
        match self {
            Callback::Empty => {}
            Callback::Function(f) => f(),
            Callback::Closure(f) => f(),
        }
    }
}

impl fmt::Debug for Callback<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Empty => f.write_str("Empty"),
            Callback::Function(func) => write!(f, "Function({:p})", *func as *const ()),
            Callback::Closure(_) => f.write_str("Closure"),
        }
    }
}

impl From<fn()> for Callback<'_> {
    fn from(func: fn()) -> Self {
        Callback::Function(func)
    }
}

impl<'a, F: Fn() + Sync> From<&'a F> for Callback<'a> {
    fn from(closure: &'a F) -> Self {
        Callback::Closure(closure)
    }
}

// ticket state, only reachable with a CriticalSection
pub(crate) struct Slot<'a> {
    // relative to the previous ticket in the queue (absolute for head)
    pub(crate) offset: Cell<u64>,
    pub(crate) period: Cell<u16>,
    pub(crate) unit: Cell<Unit>,
    pub(crate) scheduled: Cell<bool>,
    pub(crate) callback: Cell<Callback<'a>>,
    pub(crate) next: Cell<Option<&'a Ticket<'a>>>,
}

/// One deferred or periodic callback registration.
///
/// A ticket can sit in at most one scheduler's queue at a time. The
/// `'a` lifetime ties the ticket to the callbacks it runs and to the
/// other tickets it may be linked with, so a linked ticket can never
/// be dropped while a scheduler still points at it.
///
/// ```ignore
/// static BLINK: Ticket<'static> = Ticket::with_callback(Callback::Function(toggle_led));
/// ```
pub struct Ticket<'a> {
    slot: Mutex<Slot<'a>>,
}

impl<'a> Ticket<'a> {
    pub const fn new() -> Self {
        Self::with_callback(Callback::Empty)
    }

    pub const fn with_callback(callback: Callback<'a>) -> Self {
        Self {
            slot: Mutex::new(Slot {
                offset: Cell::new(0),
                period: Cell::new(0),
                unit: Cell::new(Unit::Millis),
                scheduled: Cell::new(false),
                callback: Cell::new(callback),
                next: Cell::new(None),
            }),
        }
    }

    #[inline]
    pub(crate) fn slot<'cs>(&'cs self, cs: CriticalSection<'cs>) -> &'cs Slot<'a> {
        self.slot.borrow(cs)
    }

    pub fn is_scheduled(&self, cs: CriticalSection<'_>) -> bool {
        self.slot(cs).scheduled.get()
    }

    pub fn callback(&self, cs: CriticalSection<'_>) -> Callback<'a> {
        self.slot(cs).callback.get()
    }

    /// Replaces the callback. Allowed while scheduled; the new one runs
    /// on the next fire.
    pub fn set_callback(&self, cs: CriticalSection<'_>, callback: Callback<'a>) {
        self.slot(cs).callback.set(callback);
    }

    /// Repeat period, `None` for one-shot tickets.
    pub fn period(&self, cs: CriticalSection<'_>) -> Option<(u16, Unit)> {
        let slot = self.slot(cs);
        match slot.period.get() {
            0 => None,
            period => Some((period, slot.unit.get())),
        }
    }

    pub(crate) fn set_period(&self, cs: CriticalSection<'_>, period: u16, unit: Unit) {
        let slot = self.slot(cs);
        slot.period.set(period);
        slot.unit.set(unit);
    }

    pub fn info(&self, cs: CriticalSection<'_>) -> TicketInfo {
        let slot = self.slot(cs);
        TicketInfo {
            offset: slot.offset.get(),
            period: slot.period.get(),
            unit: slot.unit.get(),
            scheduled: slot.scheduled.get(),
            has_callback: !slot.callback.get().is_empty(),
        }
    }
}

impl Default for Ticket<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a ticket for debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketInfo {
    pub offset: u64,
    pub period: u16,
    pub unit: Unit,
    pub scheduled: bool,
    pub has_callback: bool,
}

impl fmt::Display for TicketInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{offset={}, period={}{}, scheduled={}}}",
            self.offset, self.period, self.unit, self.scheduled
        )
    }
}
