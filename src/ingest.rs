//! Calendar ingestion: newline-delimited JSON from a byte transport.
//!
//! The calendar collaborator delivers one JSON document per line over
//! whatever byte stream the board has (UART console, HTTP body chunks).
//! [`LineReader`] reassembles lines; each complete line becomes an
//! [`OwnedBuf`] and is handed to the alarm engine's mailbox undecoded.

use heapless::Vec;

use crate::mailbox::Mailbox;
use crate::message::{AlarmMsg, OwnedBuf};

/// Longest accepted line. A calendar document with one event and a long
/// title fits comfortably.
pub const MAX_LINE_LEN: usize = 1024;

/// Accumulates bytes into lines.
///
/// `\n` and `\r` both end a line; empty lines are skipped. A line longer
/// than `N` is dropped whole: the reader discards bytes up to the next
/// terminator instead of emitting its tail as a line of its own.
pub struct LineReader<const N: usize = MAX_LINE_LEN> {
    buf: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineReader<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte. Returns the completed line, without terminator.
    pub fn feed(&mut self, byte: u8) -> Option<OwnedBuf> {
        if byte == b'\n' || byte == b'\r' {
            if self.overflowed {
                self.overflowed = false;
                return None;
            }
            if self.buf.is_empty() {
                return None;
            }
            let line = OwnedBuf::from_slice(&self.buf);
            self.buf.clear();
            Some(line)
        } else if self.overflowed {
            None
        } else if self.buf.push(byte).is_err() {
            log::warn!("Ingest line longer than {} bytes, dropped", N);
            self.buf.clear();
            self.overflowed = true;
            None
        } else {
            None
        }
    }

    /// Bytes of the line in progress.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl<const N: usize> Default for LineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand a line to the alarm engine. A rejected line is dropped here.
pub fn forward_line<const M: usize>(alarm: &Mailbox<AlarmMsg, M>, line: OwnedBuf) -> bool {
    match alarm.send(AlarmMsg::CalendarJson(line)) {
        Ok(()) => true,
        Err(rejected) => {
            log::warn!("Alarm mailbox full, calendar update dropped");
            drop(rejected);
            false
        }
    }
}

/// Feed a chunk of transport bytes, forwarding every completed line.
/// Returns how many lines were accepted by the mailbox.
pub fn ingest_bytes<const N: usize, const M: usize>(
    reader: &mut LineReader<N>,
    alarm: &Mailbox<AlarmMsg, M>,
    bytes: &[u8],
) -> usize {
    let mut accepted = 0;
    for &byte in bytes {
        if let Some(line) = reader.feed(byte) {
            if forward_line(alarm, line) {
                accepted += 1;
            }
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all<const N: usize>(reader: &mut LineReader<N>, bytes: &[u8]) -> std::vec::Vec<OwnedBuf> {
        bytes.iter().filter_map(|&b| reader.feed(b)).collect()
    }

    #[test]
    fn yields_complete_lines() {
        let mut reader: LineReader = LineReader::new();
        let lines = feed_all(&mut reader, b"{\"a\":1}\n{\"b\":2}\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_str(), Some("{\"a\":1}"));
        assert_eq!(lines[1].as_str(), Some("{\"b\":2}"));
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn partial_line_is_held_across_chunks() {
        let mut reader: LineReader = LineReader::new();
        assert!(feed_all(&mut reader, b"{\"time\":").is_empty());
        assert_eq!(reader.pending(), 8);
        let lines = feed_all(&mut reader, b"\"x\"}\n");
        assert_eq!(lines[0].as_str(), Some("{\"time\":\"x\"}"));
    }

    #[test]
    fn overflow_drops_whole_line_and_recovers() {
        let mut reader: LineReader<4> = LineReader::new();
        let lines = feed_all(&mut reader, b"abcdefgh\nok\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_str(), Some("ok"));
    }

    #[test]
    fn forwards_until_mailbox_full() {
        let alarm: Mailbox<AlarmMsg> = Mailbox::new();
        let mut reader: LineReader = LineReader::new();
        let accepted = ingest_bytes(&mut reader, &alarm, b"one\ntwo\nthree\n");
        assert_eq!(accepted, 2);
        assert_eq!(alarm.len(), 2);
        match alarm.try_receive() {
            Some(AlarmMsg::CalendarJson(buf)) => assert_eq!(buf.as_str(), Some("one")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
