// pulp-timer: callback scheduling for single-core targets (ESP32-C3 and host)

#![cfg_attr(not(test), no_std)]

pub mod kernel;

pub use kernel::{
    AdvanceMode, Callback, Clock, Config, Cooperative, Interrupts, Lock, Polled, ScheduleError,
    Scheduler, Ticket, TicketInfo, TickClock, TimeSource, Unit,
};
