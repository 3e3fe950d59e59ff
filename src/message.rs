//! Messages moved between tasks through [`Mailbox`](crate::mailbox::Mailbox)es.
//!
//! Every message has exactly one owner. A sender gives the message up when
//! it hands it to a mailbox and gets it back, payload included, when the
//! mailbox is full. Payload-carrying variants hold their buffers by value
//! and none of them is `Clone`, so a payload cannot be released twice or
//! leaked by a failed send: whoever holds the message last drops it.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::calendar::CalendarUpdate;

/// Heap buffer with a single owner.
///
/// Not `Clone`. Dropping it is the only release point.
#[derive(Debug, PartialEq, Eq)]
pub struct OwnedBuf(Box<[u8]>);

impl OwnedBuf {
    /// Copy `bytes` into a fresh heap buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(Box::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The buffer as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Box<[u8]> {
        self.0
    }
}

impl From<Vec<u8>> for OwnedBuf {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

impl From<&str> for OwnedBuf {
    fn from(s: &str) -> Self {
        Self::from_slice(s.as_bytes())
    }
}

/// Commands for the buzzer task.
///
/// Neither variant carries a payload, so sending one from interrupt
/// context never touches the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzerMsg {
    /// Start sounding (alarm matching engine).
    Start,
    /// Silence (stop button).
    Stop,
}

/// Messages for the alarm matching engine.
#[derive(Debug)]
pub enum AlarmMsg {
    /// Calendar already decoded by the ingestion collaborator.
    Calendar(CalendarUpdate),
    /// Raw calendar JSON document, decoded by the engine itself.
    CalendarJson(OwnedBuf),
}
