// pulp-timer hardware demo (ESP32-C3)
//
// Boot sequence: logger -> HAL -> LED + TIMG0 one-shot alarm -> tickets
// Main loop: WFI. All work happens in the alarm ISR, which fires the
// timer; the timer re-arms the alarm for whatever ticket is due next.
//
// Tickets and the timer are statics, so they outlive the ISR and
// need no allocator.

#![no_std]
#![no_main]

use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::time::{Duration, Instant};
use esp_hal::timer::OneShotTimer;
use esp_hal::timer::timg::TimerGroup;
use log::{info, warn};

use core::cell::RefCell;
use critical_section::Mutex;

use pulp_timer::{Callback, Clock, Interrupts, Scheduler, Ticket, TimeSource, Unit};

esp_bootloader_esp_idf::esp_app_desc!();

const BLINK_MS: u16 = 500;
const REPORT_SECS: u16 = 10;
const GREET_DELAY_SECS: u16 = 2;

static ALARM: Mutex<RefCell<Option<OneShotTimer<'static, esp_hal::Blocking>>>> =
    Mutex::new(RefCell::new(None));

static LED: Mutex<RefCell<Option<Output<'static>>>> = Mutex::new(RefCell::new(None));

// TIMG0 timer0 as a one-shot alarm, system timer as the clock
struct AlarmSource;

impl Clock for AlarmSource {
    fn now(&self) -> u32 {
        Instant::now().duration_since_epoch().as_millis() as u32
    }
}

impl TimeSource for AlarmSource {
    fn arm(&self, delay: u64) {
        critical_section::with(|cs| {
            if let Some(alarm) = ALARM.borrow_ref_mut(cs).as_mut() {
                // a zero timeout never raises the interrupt
                if let Err(e) = alarm.schedule(Duration::from_millis(delay.max(1))) {
                    warn!("alarm: schedule {}ms failed: {:?}", delay, e);
                }
            }
        });
    }
}

static TIMER: Scheduler<'static, AlarmSource> = Scheduler::new(AlarmSource, Interrupts);

static BLINK: Ticket<'static> = Ticket::with_callback(Callback::Function(toggle_led));
static REPORT: Ticket<'static> = Ticket::with_callback(Callback::Function(report));
static GREET: Ticket<'static> = Ticket::with_callback(Callback::Function(greet));

#[esp_hal::handler(priority = esp_hal::interrupt::Priority::Priority1)]
fn alarm_handler() {
    critical_section::with(|cs| {
        if let Some(alarm) = ALARM.borrow_ref_mut(cs).as_mut() {
            alarm.clear_interrupt();
        }
    });
    TIMER.tick();
}

fn toggle_led() {
    critical_section::with(|cs| {
        if let Some(led) = LED.borrow_ref_mut(cs).as_mut() {
            led.toggle();
        }
    });
}

fn report() {
    info!("uptime {}ms", AlarmSource.now());
    TIMER.log_queue();
}

fn greet() {
    info!("one-shot ticket fired, {} still pending", TIMER.len());
}

#[inline]
fn wait_for_interrupt() {
    #[cfg(target_arch = "riscv32")]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }
}

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    info!("booting...");

    let led = Output::new(peripherals.GPIO8, Level::High, OutputConfig::default());

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let mut alarm = OneShotTimer::new(timg0.timer0);
    critical_section::with(|cs| {
        alarm.set_interrupt_handler(alarm_handler);
        alarm.listen();
        ALARM.borrow_ref_mut(cs).replace(alarm);
        LED.borrow_ref_mut(cs).replace(led);
    });
    info!("alarm initialized.");

    TIMER.schedule_every(&BLINK, BLINK_MS, Unit::Millis);
    TIMER.schedule_repeating(
        &REPORT,
        REPORT_SECS,
        Unit::Seconds,
        REPORT_SECS,
        Unit::Seconds,
    );
    TIMER.schedule_once(&GREET, GREET_DELAY_SECS, Unit::Seconds);

    TIMER.start();
    info!("timer ready, {} tickets.", TIMER.len());

    loop {
        wait_for_interrupt();
    }
}
