//! CALalarm: calendar-driven alarm clock firmware for ESP32.
//!
//! Wires the portable core to the board: the stop button's GPIO interrupt
//! feeds the debouncer, the buzzer engine drives LEDC PWM and the haptic
//! pin, and calendar documents arrive as NDJSON on a UART from the network
//! bridge. All cross-context traffic goes through the two static mailboxes.

#![no_std]
#![no_main]

extern crate alloc;

use esp_backtrace as _;

esp_bootloader_esp_idf::esp_app_desc!();

mod buzzer;

use core::cell::RefCell;

use calalarm::alarm::{AlarmConfig, AlarmEngine};
use calalarm::board;
use calalarm::calendar::StatusLine;
use calalarm::clock::UptimeClock;
use calalarm::config::CoreConfig;
use calalarm::debounce::{Level, StopButton};
use calalarm::ingest::{self, LineReader};
use calalarm::mailbox::{Mailbox, DEFAULT_CAPACITY};
use calalarm::message::{AlarmMsg, BuzzerMsg};
use critical_section::Mutex;
use embassy_time::Instant;
use esp_hal::gpio::{Event, Input, InputConfig, Io, Pull};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{self, UartRx};
use esp_hal::{handler, ram, Async};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Mailboxes ─────────────────────────────────────────────────────────

type BuzzerMailbox = Mailbox<BuzzerMsg, DEFAULT_CAPACITY>;
type AlarmMailbox = Mailbox<AlarmMsg, DEFAULT_CAPACITY>;

/// START from the alarm task, STOP from the button interrupt
pub(crate) static BUZZER_MAILBOX: BuzzerMailbox = Mailbox::new();

/// Calendar lines from the serial ingestion task
static ALARM_MAILBOX: AlarmMailbox = Mailbox::new();

/// Stop-button pin and its debouncer, owned by the GPIO interrupt
static STOP_BUTTON: Mutex<RefCell<Option<(Input<'static>, StopButton<'static, DEFAULT_CAPACITY>)>>> =
    Mutex::new(RefCell::new(None));

/// Build-time override, e.g. `CALALARM_CONFIG='{"piezo_duty_pct":20}'`.
fn load_config() -> CoreConfig {
    match option_env!("CALALARM_CONFIG") {
        Some(json) => CoreConfig::from_json(json.as_bytes()).unwrap_or_else(|e| {
            log::warn!("Config override rejected ({}), using defaults", e);
            CoreConfig::new()
        }),
        None => CoreConfig::new(),
    }
}

#[handler]
#[ram]
fn stop_button_handler() {
    critical_section::with(|cs| {
        let mut slot = STOP_BUTTON.borrow_ref_mut(cs);
        let Some((pin, button)) = slot.as_mut() else {
            return;
        };
        if pin.is_interrupt_set() {
            let level = if pin.is_low() { Level::Low } else { Level::High };
            button.on_edge(level, Instant::now());
            pin.clear_interrupt();
        }
    });
}

#[esp_rtos::main]
async fn main(spawner: embassy_executor::Spawner) {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Calendar lines and event titles
    esp_alloc::heap_allocator!(size: 32 * 1024);

    // Start the RTOS: timer + software interrupt
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    log::info!("CALalarm v{} starting on {}", VERSION, board::BOARD_NAME);

    let config = load_config();
    log::info!(
        "Config: debounce {} ms, piezo {}% @ {} Hz, buzzer tick {} ms, alarm tick {} s",
        config.debounce_ms,
        config.piezo_duty_pct,
        config.piezo_freq_hz,
        config.buzzer_tick_ms,
        config.alarm_tick_secs,
    );

    #[cfg(feature = "calalarm")]
    let (button_pin, piezo_pin, haptic_pin, calendar_rx_pin) = (
        peripherals.GPIO4,
        peripherals.GPIO25,
        peripherals.GPIO26,
        peripherals.GPIO16,
    );
    #[cfg(all(feature = "devkit", not(feature = "calalarm")))]
    let (button_pin, piezo_pin, haptic_pin, calendar_rx_pin) = (
        peripherals.GPIO0,
        peripherals.GPIO18,
        peripherals.GPIO2,
        peripherals.GPIO16,
    );

    // ── Stop button ───────────────────────────────────────────────────
    let mut io = Io::new(peripherals.IO_MUX);
    io.set_interrupt_handler(stop_button_handler);

    let mut pin = Input::new(button_pin, InputConfig::default().with_pull(Pull::Up));
    critical_section::with(|cs| {
        pin.listen(Event::AnyEdge);
        STOP_BUTTON
            .borrow_ref_mut(cs)
            .replace((pin, StopButton::new(config.debounce_window(), &BUZZER_MAILBOX)));
    });
    log::info!("Stop button on GPIO{}", board::ALARM_OFF_PIN);

    // ── Calendar UART ─────────────────────────────────────────────────
    let calendar_rx = UartRx::new(peripherals.UART1, uart::Config::default())
        .unwrap()
        .with_rx(calendar_rx_pin)
        .into_async();
    log::info!("Calendar input on UART1 RX GPIO{}", board::CALENDAR_RX_PIN);

    spawner
        .spawn(buzzer::buzzer_task(
            peripherals.LEDC,
            piezo_pin,
            haptic_pin,
            config.buzzer(),
        ))
        .unwrap();
    spawner.spawn(alarm_task(config.alarm())).unwrap();
    spawner.spawn(calendar_task(calendar_rx)).unwrap();
}

/// Alarm matching task. Reports the status line whenever it changes; the
/// display driver is a separate collaborator.
#[embassy_executor::task]
async fn alarm_task(config: AlarmConfig) {
    log::info!("Alarm task started (tick {} s)", config.tick.as_secs());

    let mut engine = AlarmEngine::new(UptimeClock::new(), config);
    let mut shown = StatusLine::new();

    loop {
        engine.poll(&ALARM_MAILBOX, &BUZZER_MAILBOX).await;

        let line = engine.status_line();
        if line != shown {
            if board::HAS_DISPLAY {
                log::info!("Display: {}", line);
            }
            shown = line;
        }
    }
}

/// Reads NDJSON calendar documents from the bridge and hands each line to
/// the alarm task.
#[embassy_executor::task]
async fn calendar_task(mut rx: UartRx<'static, Async>) {
    let mut reader: LineReader = LineReader::new();
    let mut chunk = [0u8; 64];

    loop {
        match rx.read_async(&mut chunk).await {
            Ok(n) => {
                ingest::ingest_bytes(&mut reader, &ALARM_MAILBOX, &chunk[..n]);
            }
            Err(e) => log::warn!("Calendar UART error: {:?}", e),
        }
    }
}
