// Delta queue: a singly linked, time-ordered list of tickets
//
// Each ticket stores its delay relative to the ticket before it, so
// advancing time only touches the front of the list and the next due
// ticket is always the head. Links are borrowed `&'a Ticket<'a>`;
// the queue never owns or allocates a ticket.
//
// Every operation takes a CriticalSection token: the caller (the
// scheduler) holds its lock for the whole operation, so a half-spliced
// list is never visible to an ISR.

use core::cell::Cell;
use core::ptr;

use critical_section::CriticalSection;
use log::{trace, warn};

use super::ticket::Ticket;

/// How elapsed time larger than the head's remaining delay is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvanceMode {
    /// Carry the excess into the following tickets in the same pass.
    #[default]
    Cascade,
    /// Only decrement the head, clamped at zero; the excess is dropped.
    /// Later tickets catch up one driver call at a time.
    HeadOnly,
}

pub struct DeltaQueue<'a> {
    head: Cell<Option<&'a Ticket<'a>>>,
}

impl<'a> DeltaQueue<'a> {
    pub const fn new() -> Self {
        Self {
            head: Cell::new(None),
        }
    }

    #[inline]
    pub fn head(&self) -> Option<&'a Ticket<'a>> {
        self.head.get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.get().is_none()
    }

    pub fn len(&self, cs: CriticalSection<'_>) -> usize {
        self.iter(cs).count()
    }

    pub fn iter<'cs>(&self, cs: CriticalSection<'cs>) -> Iter<'a, 'cs> {
        Iter {
            next: self.head.get(),
            cs,
        }
    }

    /// Delay of the head, relative to the last advance.
    pub fn head_offset(&self, cs: CriticalSection<'_>) -> Option<u64> {
        self.head.get().map(|t| t.slot(cs).offset.get())
    }

    /// Absolute delay of `ticket` since the last advance (prefix sum of
    /// offsets), or `None` if it is not in this queue.
    pub fn deadline(&self, cs: CriticalSection<'_>, ticket: &Ticket<'a>) -> Option<u64> {
        let mut total: u64 = 0;
        for node in self.iter(cs) {
            total += node.slot(cs).offset.get();
            if ptr::eq(node, ticket) {
                return Some(total);
            }
        }
        None
    }

    /// Links `ticket` so it falls due `delay` units after the last advance.
    ///
    /// A ticket that is already scheduled is moved, never duplicated.
    /// Tickets with equal deadlines keep insertion order. Returns false,
    /// leaving both lists alone, if the ticket is pending in another queue.
    pub fn insert(&self, cs: CriticalSection<'_>, ticket: &'a Ticket<'a>, delay: u64) -> bool {
        if ticket.slot(cs).scheduled.get() && !self.remove(cs, ticket) {
            return false;
        }

        let mut remaining = delay;
        let mut prev: Option<&'a Ticket<'a>> = None;
        let mut cur = self.head.get();

        while let Some(node) = cur {
            let slot = node.slot(cs);
            let offset = slot.offset.get();
            if offset > remaining {
                // `node` now counts from the inserted ticket
                slot.offset.set(offset - remaining);
                break;
            }
            remaining -= offset;
            prev = Some(node);
            cur = slot.next.get();
        }

        let slot = ticket.slot(cs);
        slot.offset.set(remaining);
        slot.next.set(cur);
        slot.scheduled.set(true);

        match prev {
            Some(p) => p.slot(cs).next.set(Some(ticket)),
            None => self.head.set(Some(ticket)),
        }

        trace!("queue: insert delay={} offset={}", delay, remaining);
        true
    }

    /// Unlinks `ticket`, wherever it is. Its successor absorbs its offset
    /// so every other deadline is unchanged. Returns whether it was linked
    /// here; a ticket pending in another queue is left untouched.
    pub fn remove(&self, cs: CriticalSection<'_>, ticket: &Ticket<'a>) -> bool {
        let mut prev: Option<&'a Ticket<'a>> = None;
        let mut cur = self.head.get();

        while let Some(node) = cur {
            let slot = node.slot(cs);
            if ptr::eq(node, ticket) {
                let next = slot.next.get();
                if let Some(n) = next {
                    let n = n.slot(cs);
                    n.offset.set(n.offset.get() + slot.offset.get());
                }
                match prev {
                    Some(p) => p.slot(cs).next.set(next),
                    None => self.head.set(next),
                }
                slot.next.set(None);
                slot.scheduled.set(false);
                trace!("queue: remove");
                return true;
            }
            prev = Some(node);
            cur = slot.next.get();
        }

        if ticket.slot(cs).scheduled.get() {
            warn!("queue: ticket is pending in another queue");
        }
        false
    }

    /// Moves the queue forward by `elapsed` units.
    pub fn advance(&self, cs: CriticalSection<'_>, elapsed: u64, mode: AdvanceMode) {
        match mode {
            AdvanceMode::Cascade => {
                let mut rest = elapsed;
                let mut cur = self.head.get();
                while let Some(node) = cur {
                    if rest == 0 {
                        break;
                    }
                    let slot = node.slot(cs);
                    let offset = slot.offset.get();
                    if offset >= rest {
                        slot.offset.set(offset - rest);
                        break;
                    }
                    slot.offset.set(0);
                    rest -= offset;
                    cur = slot.next.get();
                }
            }
            AdvanceMode::HeadOnly => {
                if let Some(head) = self.head.get() {
                    let slot = head.slot(cs);
                    slot.offset.set(slot.offset.get().saturating_sub(elapsed));
                }
            }
        }
    }

    /// Number of tickets at the front that are due (offset zero).
    pub fn due_len(&self, cs: CriticalSection<'_>) -> usize {
        self.iter(cs)
            .take_while(|t| t.slot(cs).offset.get() == 0)
            .count()
    }

    /// Unlinks and returns the head if it is due (offset zero).
    pub fn pop_due(&self, cs: CriticalSection<'_>) -> Option<&'a Ticket<'a>> {
        let head = self.head.get()?;
        let slot = head.slot(cs);
        if slot.offset.get() != 0 {
            return None;
        }
        self.head.set(slot.next.get());
        slot.next.set(None);
        slot.scheduled.set(false);
        Some(head)
    }
}

impl Default for DeltaQueue<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the queue in firing order.
pub struct Iter<'a, 'cs> {
    next: Option<&'a Ticket<'a>>,
    cs: CriticalSection<'cs>,
}

impl<'a> Iterator for Iter<'a, '_> {
    type Item = &'a Ticket<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.slot(self.cs).next.get();
        Some(node)
    }
}
