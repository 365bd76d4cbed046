// Delta-queue timer kernel
// Single core, no allocation. Tickets are caller-owned and linked into
// the scheduler's queue; an alarm ISR or the polled main loop fires it.
//
// ticket:    Ticket, Unit, Callback (the intrusive record)
// queue:     DeltaQueue (relative offsets, ordered insert/remove)
// scheduler: Scheduler (schedule/cancel/fire/start/stop)
// clock:     Clock + TimeSource traits, TickClock
// poll:      Polled software time source
// lock:      critical-section strategies

pub mod clock;
pub mod config;
pub mod lock;
pub mod poll;
pub mod queue;
pub mod scheduler;
pub mod ticket;

pub use clock::{Clock, TickClock, TimeSource};
pub use config::{AdvanceMode, Config};
pub use lock::{Cooperative, Interrupts, Lock};
pub use poll::Polled;
pub use queue::DeltaQueue;
pub use scheduler::{ScheduleError, Scheduler};
pub use ticket::{Callback, Ticket, TicketInfo, Unit};
