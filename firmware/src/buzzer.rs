//! Buzzer outputs on the LEDC PWM peripheral and a haptic GPIO.
//!
//! The engine itself lives in the core crate; this module only builds the
//! peripherals it drives and runs it as an Embassy task.

use calalarm::board;
use calalarm::buzzer::{BuzzerConfig, BuzzerEngine, BuzzerOutputs};
use esp_hal::gpio::{DriveMode, Level, Output, OutputConfig};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, config::Duty, TimerIFace};
use esp_hal::ledc::{Ledc, LowSpeed};
use esp_hal::time::Rate;

#[cfg(feature = "calalarm")]
pub type PiezoPin = esp_hal::peripherals::GPIO25<'static>;
#[cfg(feature = "calalarm")]
pub type HapticPin = esp_hal::peripherals::GPIO26<'static>;
#[cfg(all(feature = "devkit", not(feature = "calalarm")))]
pub type PiezoPin = esp_hal::peripherals::GPIO18<'static>;
#[cfg(all(feature = "devkit", not(feature = "calalarm")))]
pub type HapticPin = esp_hal::peripherals::GPIO2<'static>;

struct LedcOutputs<'a> {
    piezo: channel::Channel<'a, LowSpeed>,
    haptic: Output<'a>,
}

impl BuzzerOutputs for LedcOutputs<'_> {
    fn set_piezo(&mut self, duty_pct: u8) {
        if let Err(e) = self.piezo.set_duty(duty_pct) {
            log::warn!("Piezo duty {}% rejected: {:?}", duty_pct, e);
        }
    }

    fn set_haptic(&mut self, on: bool) {
        self.haptic.set_level(if on { Level::High } else { Level::Low });
    }
}

fn timer_number(n: u8) -> timer::Number {
    match n {
        1 => timer::Number::Timer1,
        2 => timer::Number::Timer2,
        3 => timer::Number::Timer3,
        _ => timer::Number::Timer0,
    }
}

fn channel_number(n: u8) -> channel::Number {
    match n {
        1 => channel::Number::Channel1,
        2 => channel::Number::Channel2,
        3 => channel::Number::Channel3,
        4 => channel::Number::Channel4,
        5 => channel::Number::Channel5,
        6 => channel::Number::Channel6,
        7 => channel::Number::Channel7,
        _ => channel::Number::Channel0,
    }
}

#[embassy_executor::task]
pub async fn buzzer_task(
    ledc_peripheral: esp_hal::peripherals::LEDC<'static>,
    piezo_pin: PiezoPin,
    haptic_pin: HapticPin,
    config: BuzzerConfig,
) {
    let ledc = Ledc::new(ledc_peripheral);

    let mut piezo_timer = ledc.timer::<LowSpeed>(timer_number(board::PIEZO_LEDC_TIMER));
    if let Err(e) = piezo_timer.configure(timer::config::Config {
        duty: Duty::Duty8Bit,
        clock_source: timer::LSClockSource::APBClk,
        frequency: Rate::from_hz(config.frequency_hz),
    }) {
        log::error!("LEDC timer init failed: {:?}", e);
        return;
    }

    let mut piezo = ledc.channel(channel_number(board::PIEZO_LEDC_CHANNEL), piezo_pin);
    if let Err(e) = piezo.configure(channel::config::Config {
        timer: &piezo_timer,
        duty_pct: 0,
        drive_mode: DriveMode::PushPull,
    }) {
        log::error!("LEDC channel init failed: {:?}", e);
        return;
    }

    let haptic = Output::new(haptic_pin, Level::Low, OutputConfig::default());

    log::info!(
        "Buzzer ready: piezo GPIO{}, haptic GPIO{}{}",
        board::PIEZO_PIN,
        board::HAPTIC_PIN,
        if board::HAS_HAPTIC { "" } else { " (indicator only)" }
    );

    let mut engine = BuzzerEngine::new(LedcOutputs { piezo, haptic }, config);
    engine.run(&crate::BUZZER_MAILBOX).await
}
