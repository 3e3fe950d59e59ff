//! Bounded FIFO mailbox: the only mutable state shared between contexts.
//!
//! One mailbox per consumer task. Producers send without blocking (the stop
//! button sends from interrupt context), the owning task waits on
//! [`Mailbox::receive`] with a timeout that doubles as its periodic tick.
//!
//! Overflow policy is drop-newest: a send to a full mailbox hands the
//! rejected message straight back to the caller, so the payload is never
//! dropped inside the queue and never leaks. Messages already queued are
//! untouched.
//!
//! Built on `embassy_sync::channel::Channel` behind a critical-section
//! mutex. `send` is a single critical section around a fixed-size ring
//! buffer: no allocation, no waiting, safe from an ISR.

use core::future::poll_fn;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::{with_deadline, Duration, Instant, Timer};

/// Slots per mailbox. Only the latest state matters to every consumer in
/// this system, so two is enough.
pub const DEFAULT_CAPACITY: usize = 2;

/// Fixed-capacity FIFO of messages of type `T`.
pub struct Mailbox<T, const N: usize = DEFAULT_CAPACITY> {
    channel: Channel<CriticalSectionRawMutex, T, N>,
}

impl<T, const N: usize> Mailbox<T, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue without blocking.
    ///
    /// On a full mailbox the message comes back in `Err` and the caller owns
    /// it again. Usable from interrupt context.
    pub fn send(&self, msg: T) -> Result<(), T> {
        match self.channel.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(rejected)) => Err(rejected),
        }
    }

    /// Enqueue, waiting up to `timeout` for a free slot.
    ///
    /// A zero timeout is exactly [`send`](Self::send). On timeout the message
    /// is returned to the caller like a full-mailbox rejection. Task context
    /// only.
    pub async fn send_timeout(&self, msg: T, timeout: Duration) -> Result<(), T> {
        if timeout.as_ticks() == 0 {
            return self.send(msg);
        }

        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or(Instant::MAX);
        let mut pending = msg;
        loop {
            pending = match self.send(pending) {
                Ok(()) => return Ok(()),
                Err(rejected) => rejected,
            };

            let slot_free = poll_fn(|cx| self.channel.poll_ready_to_send(cx));
            if let Either::Second(()) = select(slot_free, Timer::at(deadline)).await {
                // Deadline hit: one final attempt, then give the message back.
                return self.send(pending);
            }
        }
    }

    /// Wait for the next message, at most `timeout`.
    ///
    /// `None` means the timeout elapsed with the mailbox empty; callers use
    /// that as their periodic tick. A message is only taken out of the
    /// queue when this returns `Some`.
    pub async fn receive(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or(Instant::MAX);
        with_deadline(deadline, self.channel.receive()).await.ok()
    }

    /// Take the oldest message if one is queued.
    pub fn try_receive(&self) -> Option<T> {
        self.channel.try_receive().ok()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }
}

impl<T, const N: usize> Default for Mailbox<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
