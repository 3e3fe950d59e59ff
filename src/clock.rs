//! Wall clock for the alarm matching engine.
//!
//! The device has no RTC battery; wall time comes from the calendar
//! collaborator's `time` field and is carried forward on the monotonic
//! Embassy timer between updates.

use embassy_time::Instant;
use time::PrimitiveDateTime;

/// Settable wall clock. `now` is `None` until the first `set`.
pub trait TimeSource {
    fn now(&self) -> Option<PrimitiveDateTime>;
    fn set(&mut self, now: PrimitiveDateTime);
}

/// Wall clock anchored to the monotonic timer at the last `set`.
#[derive(Debug, Clone, Default)]
pub struct UptimeClock {
    anchor: Option<(PrimitiveDateTime, Instant)>,
}

impl UptimeClock {
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    pub fn is_set(&self) -> bool {
        self.anchor.is_some()
    }

    /// Wall time at monotonic instant `at`.
    ///
    /// Instants before the anchor read as the anchor itself.
    pub fn now_at(&self, at: Instant) -> Option<PrimitiveDateTime> {
        let (wall, mono) = self.anchor?;
        let elapsed = at.saturating_duration_since(mono);
        let millis = i64::try_from(elapsed.as_millis()).ok()?;
        wall.checked_add(time::Duration::milliseconds(millis))
    }

    pub fn set_at(&mut self, now: PrimitiveDateTime, at: Instant) {
        self.anchor = Some((now, at));
    }
}

impl TimeSource for UptimeClock {
    fn now(&self) -> Option<PrimitiveDateTime> {
        self.now_at(Instant::now())
    }

    fn set(&mut self, now: PrimitiveDateTime) {
        log::info!("Clock set to {}", now);
        self.set_at(now, Instant::now());
    }
}
