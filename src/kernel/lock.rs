// Critical-section strategies for the scheduler
//
// The queue is shared between application code and whatever drives
// `fire` (usually an ISR). Every queue mutation runs inside Lock::lock.
// Nested locking must work: callbacks run under the lock and are
// allowed to schedule tickets.

use core::marker::PhantomData;

use critical_section::CriticalSection;

pub trait Lock {
    fn lock<R>(&self, f: impl FnOnce(CriticalSection<'_>) -> R) -> R;
}

/// Masks interrupts through the global `critical-section` implementation
/// (esp-hal on target, the `std` impl on host).
#[derive(Debug, Clone, Copy, Default)]
pub struct Interrupts;

impl Lock for Interrupts {
    #[inline]
    fn lock<R>(&self, f: impl FnOnce(CriticalSection<'_>) -> R) -> R {
        critical_section::with(f)
    }
}

/// No-op lock for a scheduler that only ever runs in one context (polled
/// from the main loop, never touched by an ISR).
///
/// `!Send + !Sync`, so a scheduler using it cannot be put in a `static`
/// or handed to another thread.
#[derive(Debug)]
pub struct Cooperative {
    _not_sync: PhantomData<*const ()>,
}

impl Cooperative {
    /// # Safety
    ///
    /// Nothing else may access the scheduler, or any ticket it links,
    /// from another execution context (ISR, thread) while it is in use.
    pub const unsafe fn new() -> Self {
        Self {
            _not_sync: PhantomData,
        }
    }
}

impl Lock for Cooperative {
    #[inline]
    fn lock<R>(&self, f: impl FnOnce(CriticalSection<'_>) -> R) -> R {
        // SAFETY: single execution context, guaranteed by `Cooperative::new`
        f(unsafe { CriticalSection::new() })
    }
}
