//! Stop-button edge debouncer.
//!
//! Runs in the GPIO interrupt on every edge of the active-low stop button.
//! A press (falling edge) starts the window; a release (rising edge) more
//! than `window` after the press queues [`BuzzerMsg::Stop`]. Anything
//! faster is contact bounce.
//!
//! ```text
//!            falling                    rising, held > window
//!   Idle ─────────────► WaitingForRelease ─────────────────────► Idle  (+ STOP)
//!                         │        ▲
//!                         └────────┘
//!                 falling (restart) / rising, held <= window
//! ```
//!
//! The state is touched only from the interrupt handler. The only thing that
//! leaves it is the STOP message, sent with the mailbox's non-blocking
//! [`send`](crate::mailbox::Mailbox::send); nothing here allocates.

use embassy_time::{Duration, Instant};

use crate::mailbox::Mailbox;
use crate::message::BuzzerMsg;

/// Minimum press duration for a release to count.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

/// Pin level sampled in the edge interrupt. The button pulls the line low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    WaitingForRelease { edge_start: Instant },
}

/// Two-state edge debouncer, gated by elapsed time only.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    state: DebounceState,
}

impl Debouncer {
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            state: DebounceState::Idle,
        }
    }

    pub const fn state(&self) -> DebounceState {
        self.state
    }

    /// Feed one edge. Returns `true` if it completes a real press.
    ///
    /// A bounced release leaves `edge_start` alone, so a lost falling edge
    /// cannot swallow the real release that follows.
    pub fn on_edge(&mut self, level: Level, now: Instant) -> bool {
        match (level, self.state) {
            (Level::Low, _) => {
                self.state = DebounceState::WaitingForRelease { edge_start: now };
                false
            }
            (Level::High, DebounceState::WaitingForRelease { edge_start }) => {
                let held = now.saturating_duration_since(edge_start);
                if held > self.window {
                    self.state = DebounceState::Idle;
                    true
                } else {
                    false
                }
            }
            (Level::High, DebounceState::Idle) => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Everything the stop-button interrupt needs: its debouncer and the buzzer
/// mailbox it reports to. Built once at startup and handed to the handler.
pub struct StopButton<'a, const N: usize> {
    debouncer: Debouncer,
    buzzer: &'a Mailbox<BuzzerMsg, N>,
}

impl<'a, const N: usize> StopButton<'a, N> {
    pub const fn new(window: Duration, buzzer: &'a Mailbox<BuzzerMsg, N>) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            buzzer,
        }
    }

    pub const fn state(&self) -> DebounceState {
        self.debouncer.state()
    }

    /// Edge interrupt entry. Returns `true` if a STOP was queued.
    ///
    /// A STOP rejected by a full mailbox is not retried: it has no payload
    /// to release and the buzzer task still has messages to wake up for.
    pub fn on_edge(&mut self, level: Level, now: Instant) -> bool {
        if !self.debouncer.on_edge(level, now) {
            return false;
        }
        self.buzzer.send(BuzzerMsg::Stop).is_ok()
    }
}
