//! CALalarm library: portable coordination core of a calendar-driven alarm clock.
//!
//! The device fetches the next alarm from a calendar, shows it on a small
//! display and sounds a piezo buzzer plus a haptic motor at the alarm minute
//! until the stop button is pressed. This crate holds the parts where
//! cross-context correctness matters, with no platform dependencies and
//! testable on any host with `cargo test`. Platform binaries (the ESP32
//! firmware in `firmware/`) are thin consumers that wire GPIO, PWM and the
//! calendar transport to these types.
//!
//! - `message`, `mailbox`: owned-payload messages and the bounded FIFO that
//!   moves them between tasks and from interrupt context.
//! - `debounce`: stop-button edge debouncer, callable from an ISR.
//! - `buzzer`: START/STOP state machine driving the piezo and haptic outputs.
//! - `alarm`, `calendar`, `clock`: the alarm matching engine, the calendar
//!   event it owns and the wall clock it reads.
//! - `ingest`, `config`, `board`: calendar byte-stream framing, runtime
//!   configuration and the compile-time pin table.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod alarm;
pub mod board;
pub mod buzzer;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod ingest;
pub mod mailbox;
pub mod message;
