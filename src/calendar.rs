//! Calendar event and the decoder for the calendar collaborator's JSON.
//!
//! The calendar script publishes the next alarm as one small document:
//!
//! ```json
//! {"time":"2024-05-01 07:41:09","pushId":"..","events":[
//!   {"title":"standup","alarm":"2024-05-01 08:00:00",
//!    "start":"2024-05-01 08:10:00","stop":"2024-05-01 08:25:00"}]}
//! ```
//!
//! `time` is the script's wall clock and is used to set the device clock.
//! Only `events[0]` matters; the script already picked it. Timestamps are
//! device-local civil time. Earlier script revisions sent `end` instead of
//! `stop` and no `alarm`; those documents still decode, with the alarm at
//! the event start. An empty `events` array is a valid document meaning
//! "no alarm". Anything else that does not decode completely is rejected as
//! a whole, so the engine never adopts half an event.

use alloc::string::String;
use core::fmt::Write;

use heapless::Vec;
use serde::Deserialize;
use time::macros::{datetime, format_description};
use time::PrimitiveDateTime;

/// Most events accepted in one document; only the first is used.
pub const MAX_EVENTS: usize = 8;

/// Width of one display line.
pub const STATUS_COLUMNS: usize = 16;

pub type StatusLine = heapless::String<STATUS_COLUMNS>;

/// Placeholder timestamp of an empty event.
const UNSET: PrimitiveDateTime = datetime!(1970-01-01 0:00);

/// The alarm the engine is armed with.
///
/// Created empty and invalid at startup and replaced wholesale on every
/// accepted calendar update; the old title is dropped with the old event.
#[derive(Debug, PartialEq, Eq)]
pub struct CalendarEvent {
    pub valid: bool,
    pub title: String,
    pub alarm_time: PrimitiveDateTime,
    pub start: PrimitiveDateTime,
    pub stop: PrimitiveDateTime,
}

impl CalendarEvent {
    /// No alarm.
    pub const fn empty() -> Self {
        Self {
            valid: false,
            title: String::new(),
            alarm_time: UNSET,
            start: UNSET,
            stop: UNSET,
        }
    }

    /// A valid event whose alarm sounds at `alarm_time`.
    pub fn new(
        title: String,
        alarm_time: PrimitiveDateTime,
        start: PrimitiveDateTime,
        stop: PrimitiveDateTime,
    ) -> Self {
        Self {
            valid: true,
            title,
            alarm_time,
            start,
            stop,
        }
    }

    /// Whether `now` falls in the alarm minute. Seconds are ignored.
    pub fn is_alarm_minute(&self, now: PrimitiveDateTime) -> bool {
        self.valid
            && now.hour() == self.alarm_time.hour()
            && now.minute() == self.alarm_time.minute()
    }

    /// One display line: `"HH:MM title"` (appointment start) or
    /// `"No alarm set"`, cut to [`STATUS_COLUMNS`].
    pub fn status_line(&self) -> StatusLine {
        let mut line = StatusLine::new();
        if !self.valid {
            let _ = line.push_str("No alarm set");
            return line;
        }
        let _ = write!(line, "{:02}:{:02} ", self.start.hour(), self.start.minute());
        for c in self.title.chars() {
            if line.push(c).is_err() {
                break;
            }
        }
        line
    }
}

impl Default for CalendarEvent {
    fn default() -> Self {
        Self::empty()
    }
}

/// One atomic replacement for the engine: the new event, plus the wall
/// clock if the source carried one.
#[derive(Debug, PartialEq, Eq)]
pub struct CalendarUpdate {
    pub now: Option<PrimitiveDateTime>,
    pub event: CalendarEvent,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar payload is not a JSON object")]
    NotAnObject,
    #[error("malformed calendar JSON: {0}")]
    Json(serde_json_core::de::Error),
    #[error("unparseable timestamp in `{field}`")]
    Timestamp { field: &'static str },
}

/// Wire format of the calendar document. Unknown fields are skipped.
#[derive(Deserialize)]
struct RawCalendar<'a> {
    time: &'a str,
    #[serde(borrow)]
    events: Vec<RawEvent<'a>, MAX_EVENTS>,
}

#[derive(Deserialize)]
struct RawEvent<'a> {
    title: String,
    #[serde(borrow, default)]
    alarm: Option<&'a str>,
    start: &'a str,
    #[serde(alias = "end")]
    stop: &'a str,
}

/// Decode a calendar document. All-or-nothing.
pub fn decode(json: &[u8]) -> Result<CalendarUpdate, CalendarError> {
    let json = json.trim_ascii();
    if json.first() != Some(&b'{') || json.last() != Some(&b'}') {
        return Err(CalendarError::NotAnObject);
    }

    // Escaped titles are unescaped into this scratch space
    let mut scratch = alloc::vec![0u8; json.len()];
    let (raw, _) = serde_json_core::from_slice_escaped::<RawCalendar<'_>>(json, &mut scratch)
        .map_err(CalendarError::Json)?;

    let now = parse_timestamp(raw.time, "time")?;
    let event = match raw.events.into_iter().next() {
        None => CalendarEvent::empty(),
        Some(first) => {
            let start = parse_timestamp(first.start, "start")?;
            let stop = parse_timestamp(first.stop, "stop")?;
            let alarm_time = match first.alarm {
                Some(alarm) => parse_timestamp(alarm, "alarm")?,
                None => start,
            };
            CalendarEvent::new(first.title, alarm_time, start, stop)
        }
    };

    Ok(CalendarUpdate {
        now: Some(now),
        event,
    })
}

/// Parse `"YYYY-MM-DD HH:MM:SS"`.
pub fn parse_timestamp(s: &str, field: &'static str) -> Result<PrimitiveDateTime, CalendarError> {
    PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .map_err(|_| CalendarError::Timestamp { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{"time":"2024-05-01 07:41:09","pushId":null,"events":[
        {"title":"standup","alarm":"2024-05-01 08:00:00",
         "start":"2024-05-01 08:10:00","stop":"2024-05-01 08:25:00"}]}"#;

    #[test]
    fn decodes_full_document() {
        let update = decode(FULL.as_bytes()).unwrap();
        assert_eq!(update.now, Some(datetime!(2024-05-01 07:41:09)));
        let ev = update.event;
        assert!(ev.valid);
        assert_eq!(ev.title, "standup");
        assert_eq!(ev.alarm_time, datetime!(2024-05-01 08:00));
        assert_eq!(ev.start, datetime!(2024-05-01 08:10));
        assert_eq!(ev.stop, datetime!(2024-05-01 08:25));
    }

    #[test]
    fn legacy_start_end_schema_alarms_at_start() {
        let json = r#"{"time":"2024-05-01 06:00:00","events":[
            {"start":"2024-05-01 07:30:00","end":"2024-05-01 08:00:00","title":"gym"}]}"#;
        let ev = decode(json.as_bytes()).unwrap().event;
        assert!(ev.valid);
        assert_eq!(ev.alarm_time, datetime!(2024-05-01 07:30));
        assert_eq!(ev.stop, datetime!(2024-05-01 08:00));
    }

    #[test]
    fn empty_events_means_no_alarm() {
        let update = decode(br#"{"time":"2024-05-01 06:00:00","events":[]}"#).unwrap();
        assert!(!update.event.valid);
        assert_eq!(update.now, Some(datetime!(2024-05-01 06:00)));
    }

    #[test]
    fn escaped_title_is_unescaped() {
        let json = r#"{"time":"2024-05-01 06:00:00","events":[{"title":"Bob\"s 1:1",
            "alarm":"2024-05-01 09:00:00","start":"2024-05-01 09:00:00","stop":"2024-05-01 09:30:00"}]}"#;
        assert_eq!(decode(json.as_bytes()).unwrap().event.title, "Bob\"s 1:1");
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(decode(b"[1,2]"), Err(CalendarError::NotAnObject));
        assert_eq!(decode(b""), Err(CalendarError::NotAnObject));
        assert_eq!(decode(b"  {\"time\":"), Err(CalendarError::NotAnObject));
    }

    #[test]
    fn rejects_missing_time() {
        let err = decode(br#"{"events":[]}"#).unwrap_err();
        assert!(matches!(err, CalendarError::Json(_)));
    }

    #[test]
    fn rejects_event_missing_title() {
        let json = r#"{"time":"2024-05-01 06:00:00","events":[
            {"alarm":"2024-05-01 08:00:00","start":"2024-05-01 08:00:00","stop":"2024-05-01 09:00:00"}]}"#;
        assert!(matches!(decode(json.as_bytes()), Err(CalendarError::Json(_))));
    }

    #[test]
    fn rejects_bad_timestamp() {
        let json = r#"{"time":"2024-05-01 06:00:00","events":[{"title":"x",
            "alarm":"tomorrow","start":"2024-05-01 08:00:00","stop":"2024-05-01 09:00:00"}]}"#;
        assert_eq!(
            decode(json.as_bytes()),
            Err(CalendarError::Timestamp { field: "alarm" })
        );
    }

    #[test]
    fn alarm_minute_ignores_seconds_and_date() {
        let ev = CalendarEvent::new(
            String::from("standup"),
            datetime!(2024-05-01 08:00),
            datetime!(2024-05-01 08:10),
            datetime!(2024-05-01 08:25),
        );
        assert!(ev.is_alarm_minute(datetime!(2024-05-01 08:00:59)));
        assert!(ev.is_alarm_minute(datetime!(2024-05-02 08:00:00)));
        assert!(!ev.is_alarm_minute(datetime!(2024-05-01 08:01:00)));
        assert!(!CalendarEvent::empty().is_alarm_minute(UNSET));
    }

    #[test]
    fn status_line_fits_display() {
        let ev = CalendarEvent::new(
            String::from("quarterly planning review"),
            datetime!(2024-05-01 08:50),
            datetime!(2024-05-01 09:05),
            datetime!(2024-05-01 10:00),
        );
        assert_eq!(ev.status_line().as_str(), "09:05 quarterly ");
        assert_eq!(CalendarEvent::empty().status_line().as_str(), "No alarm set");
    }
}
