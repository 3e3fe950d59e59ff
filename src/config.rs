//! Runtime tuning for the core engines.
//!
//! Compiled-in defaults match the shipped hardware. A JSON document may
//! override any subset of the fields, e.g. from a provisioning blob:
//!
//! ```json
//! {"debounce_ms":80,"piezo_duty_pct":10}
//! ```
//!
//! Pins and PWM peripheral numbers are compile-time and live in
//! [`board`](crate::board).

use embassy_time::Duration;
use serde::Deserialize;

use crate::alarm::AlarmConfig;
use crate::buzzer::BuzzerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Minimum stop-button press, ms
    pub debounce_ms: u32,
    /// Piezo PWM duty while sounding, percent
    pub piezo_duty_pct: u8,
    /// Piezo PWM frequency
    pub piezo_freq_hz: u32,
    /// Buzzer mailbox wait and haptic toggle period, ms
    pub buzzer_tick_ms: u32,
    /// Alarm evaluation period, seconds
    pub alarm_tick_secs: u32,
}

impl CoreConfig {
    pub const fn new() -> Self {
        Self {
            debounce_ms: 100,
            piezo_duty_pct: 5,
            piezo_freq_hz: 1_000,
            buzzer_tick_ms: 1_000,
            alarm_tick_secs: 10,
        }
    }

    /// Defaults overridden by whatever fields `json` carries.
    pub fn from_json(json: &[u8]) -> Result<Self, ConfigError> {
        let (config, _) =
            serde_json_core::from_slice::<CoreConfig>(json).map_err(ConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.piezo_duty_pct > 100 {
            return Err(ConfigError::Duty(self.piezo_duty_pct));
        }
        if self.piezo_freq_hz == 0 {
            return Err(ConfigError::ZeroValue("piezo_freq_hz"));
        }
        if self.buzzer_tick_ms == 0 {
            return Err(ConfigError::ZeroValue("buzzer_tick_ms"));
        }
        if self.alarm_tick_secs == 0 {
            return Err(ConfigError::ZeroValue("alarm_tick_secs"));
        }
        Ok(())
    }

    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms as u64)
    }

    pub const fn buzzer(&self) -> BuzzerConfig {
        BuzzerConfig {
            duty_pct: self.piezo_duty_pct,
            frequency_hz: self.piezo_freq_hz,
            tick: Duration::from_millis(self.buzzer_tick_ms as u64),
        }
    }

    pub const fn alarm(&self) -> AlarmConfig {
        AlarmConfig {
            tick: Duration::from_secs(self.alarm_tick_secs as u64),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed config JSON: {0}")]
    Json(serde_json_core::de::Error),
    #[error("piezo duty {0}% out of range")]
    Duty(u8),
    #[error("`{0}` must be non-zero")]
    ZeroValue(&'static str),
}
