//! Buzzer engine. Turns START/STOP messages into sustained output state.
//!
//! Owns the buzzer mailbox. While ON the piezo runs at a fixed PWM duty and
//! the haptic motor toggles once per tick, giving a pulsing pattern rather
//! than a constant tone. STOP always wins: whatever order START and STOP
//! arrive in, the engine ends up in the state of the last one received.
//!
//! The task loop waits on its mailbox with the tick period as timeout. A
//! message applies a transition; a timeout is a tick. Both re-assert the
//! outputs for the current state, so a glitched output is corrected within
//! one tick.

use embassy_time::Duration;

use crate::mailbox::Mailbox;
use crate::message::BuzzerMsg;

/// Physical outputs of the buzzer: a PWM piezo channel and a haptic GPIO.
///
/// Implemented by the firmware on top of the LEDC peripheral and a push-pull
/// pin. Writes must be idempotent; the engine re-asserts them every tick.
pub trait BuzzerOutputs {
    /// Set the piezo PWM duty in percent. `0` silences it.
    fn set_piezo(&mut self, duty_pct: u8);
    /// Drive the haptic motor pin.
    fn set_haptic(&mut self, on: bool);
}

impl<T: BuzzerOutputs + ?Sized> BuzzerOutputs for &mut T {
    fn set_piezo(&mut self, duty_pct: u8) {
        (**self).set_piezo(duty_pct);
    }

    fn set_haptic(&mut self, on: bool) {
        (**self).set_haptic(on);
    }
}

/// Buzzer tuning, injected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuzzerConfig {
    /// PWM duty while sounding, percent.
    pub duty_pct: u8,
    /// PWM frequency; applied by the firmware when it configures the timer.
    pub frequency_hz: u32,
    /// Mailbox wait, i.e. haptic toggle and output refresh period.
    pub tick: Duration,
}

impl BuzzerConfig {
    pub const fn new() -> Self {
        Self {
            duty_pct: 5,
            frequency_hz: 1_000,
            tick: Duration::from_secs(1),
        }
    }
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine state. Only the engine's own task mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuzzerState {
    pub on: bool,
    pub haptic_phase: bool,
}

pub struct BuzzerEngine<O> {
    outputs: O,
    config: BuzzerConfig,
    state: BuzzerState,
}

impl<O: BuzzerOutputs> BuzzerEngine<O> {
    /// Starts OFF. Outputs are not touched until the first message or tick.
    pub const fn new(outputs: O, config: BuzzerConfig) -> Self {
        Self {
            outputs,
            config,
            state: BuzzerState {
                on: false,
                haptic_phase: false,
            },
        }
    }

    pub const fn state(&self) -> BuzzerState {
        self.state
    }

    pub const fn config(&self) -> &BuzzerConfig {
        &self.config
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Apply one message and re-assert the outputs.
    ///
    /// START while ON and STOP while OFF leave the state, including the
    /// haptic phase, as it was.
    pub fn handle(&mut self, msg: BuzzerMsg) {
        match (msg, self.state.on) {
            (BuzzerMsg::Start, false) => {
                log::info!("Buzzer on");
                self.state = BuzzerState {
                    on: true,
                    haptic_phase: false,
                };
            }
            (BuzzerMsg::Stop, true) => {
                log::info!("Buzzer off");
                self.state = BuzzerState::default();
            }
            (BuzzerMsg::Start, true) | (BuzzerMsg::Stop, false) => {
                log::debug!("Buzzer {:?} ignored, already in that state", msg);
            }
        }
        self.assert_outputs();
    }

    /// Periodic tick: advance the haptic pattern when ON, then re-assert.
    pub fn tick(&mut self) {
        if self.state.on {
            self.state.haptic_phase = !self.state.haptic_phase;
        }
        self.assert_outputs();
    }

    fn assert_outputs(&mut self) {
        if self.state.on {
            self.outputs.set_piezo(self.config.duty_pct);
            self.outputs.set_haptic(self.state.haptic_phase);
        } else {
            self.outputs.set_piezo(0);
            self.outputs.set_haptic(false);
        }
    }

    /// One loop iteration: wait up to one tick for a message.
    pub async fn poll<const N: usize>(&mut self, mailbox: &Mailbox<BuzzerMsg, N>) {
        match mailbox.receive(self.config.tick).await {
            Some(msg) => self.handle(msg),
            None => self.tick(),
        }
    }

    /// Buzzer task body. Never returns.
    pub async fn run<const N: usize>(&mut self, mailbox: &Mailbox<BuzzerMsg, N>) -> ! {
        log::info!(
            "Buzzer task started ({}% duty @ {} Hz, tick {} ms)",
            self.config.duty_pct,
            self.config.frequency_hz,
            self.config.tick.as_millis()
        );
        self.assert_outputs();
        loop {
            self.poll(mailbox).await;
        }
    }
}
