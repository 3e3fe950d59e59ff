//! Hardware abstraction for supported boards.
//!
//! Each board module defines pin assignments and PWM resources
//! selected at compile time via feature flags. The core never reads these
//! directly; firmware passes them into the engines at construction.

#[cfg(feature = "board-calalarm")]
mod hw {
    pub const ALARM_OFF_PIN: u8 = 4; // active-low, edge interrupt
    pub const PIEZO_PIN: u8 = 25;
    pub const HAPTIC_PIN: u8 = 26;
    pub const CALENDAR_RX_PIN: u8 = 16; // UART1, NDJSON from the calendar bridge
    pub const PIEZO_LEDC_TIMER: u8 = 0;
    pub const PIEZO_LEDC_CHANNEL: u8 = 0;
    pub const HAS_DISPLAY: bool = true;
    pub const HAS_HAPTIC: bool = true;
    pub const BOARD_NAME: &str = "calalarm";
}

#[cfg(all(feature = "board-devkit", not(feature = "board-calalarm")))]
mod hw {
    pub const ALARM_OFF_PIN: u8 = 0; // BOOT button
    pub const PIEZO_PIN: u8 = 18;
    pub const HAPTIC_PIN: u8 = 2; // on-board LED stands in for the motor
    pub const CALENDAR_RX_PIN: u8 = 16;
    pub const PIEZO_LEDC_TIMER: u8 = 0;
    pub const PIEZO_LEDC_CHANNEL: u8 = 0;
    pub const HAS_DISPLAY: bool = false;
    pub const HAS_HAPTIC: bool = false;
    pub const BOARD_NAME: &str = "esp32_devkit";
}

#[cfg(not(any(feature = "board-calalarm", feature = "board-devkit")))]
mod hw {
    pub const BOARD_NAME: &str = "unknown";
}

pub use hw::*;
