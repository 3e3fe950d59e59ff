//! Alarm matching engine.
//!
//! Owns the current [`CalendarEvent`] and the wall clock. Every tick it
//! takes at most one calendar update from its mailbox, then checks whether
//! the clock is inside the alarm minute and, if so, sends START to the
//! buzzer.
//!
//! The evaluation period is much shorter than a minute, so a matching
//! minute is seen by several ticks. The engine remembers the last minute it
//! fired in and fires at most once per minute. A START the buzzer mailbox
//! rejects does not count as fired; the next tick in the same minute tries
//! again.

use embassy_time::Duration;
use time::{Date, PrimitiveDateTime};

use crate::calendar::{self, CalendarError, CalendarEvent, CalendarUpdate, StatusLine};
use crate::clock::TimeSource;
use crate::mailbox::Mailbox;
use crate::message::{AlarmMsg, BuzzerMsg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmConfig {
    /// Mailbox wait between evaluations.
    pub tick: Duration,
}

impl AlarmConfig {
    pub const fn new() -> Self {
        Self {
            tick: Duration::from_secs(10),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Calendar minute a START was delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FiredMinute {
    date: Date,
    hour: u8,
    minute: u8,
}

impl FiredMinute {
    fn of(t: PrimitiveDateTime) -> Self {
        Self {
            date: t.date(),
            hour: t.hour(),
            minute: t.minute(),
        }
    }
}

pub struct AlarmEngine<C> {
    event: CalendarEvent,
    clock: C,
    last_fired: Option<FiredMinute>,
    config: AlarmConfig,
}

impl<C: TimeSource> AlarmEngine<C> {
    /// Starts with no alarm.
    pub const fn new(clock: C, config: AlarmConfig) -> Self {
        Self {
            event: CalendarEvent::empty(),
            clock,
            last_fired: None,
            config,
        }
    }

    pub fn event(&self) -> &CalendarEvent {
        &self.event
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub const fn config(&self) -> &AlarmConfig {
        &self.config
    }

    /// Display line for the current event.
    pub fn status_line(&self) -> StatusLine {
        self.event.status_line()
    }

    /// Apply one calendar message.
    ///
    /// Raw JSON is decoded here. On error the message is dropped and the
    /// current event stays armed.
    pub fn ingest(&mut self, msg: AlarmMsg) -> Result<(), CalendarError> {
        let update = match msg {
            AlarmMsg::Calendar(update) => update,
            AlarmMsg::CalendarJson(json) => calendar::decode(json.as_bytes())?,
        };
        self.apply(update);
        Ok(())
    }

    fn apply(&mut self, update: CalendarUpdate) {
        if let Some(now) = update.now {
            self.clock.set(now);
        }
        if update.event.valid {
            log::info!(
                "Alarm armed: {} at {:02}:{:02}",
                update.event.title,
                update.event.alarm_time.hour(),
                update.event.alarm_time.minute()
            );
        } else if self.event.valid {
            log::info!("Alarm cleared");
        }
        self.event = update.event;
    }

    /// Check the clock against the event. Returns `true` if START was sent.
    ///
    /// Does nothing until the clock has been set once.
    pub fn evaluate<const N: usize>(&mut self, buzzer: &Mailbox<BuzzerMsg, N>) -> bool {
        let Some(now) = self.clock.now() else {
            return false;
        };
        if !self.event.is_alarm_minute(now) {
            return false;
        }
        let minute = FiredMinute::of(now);
        if self.last_fired == Some(minute) {
            return false;
        }
        match buzzer.send(BuzzerMsg::Start) {
            Ok(()) => {
                log::info!("Alarm: {}", self.event.title);
                self.last_fired = Some(minute);
                true
            }
            Err(_) => {
                log::warn!("Buzzer mailbox full, alarm retried next tick");
                false
            }
        }
    }

    /// One tick: wait up to the tick period for an update, apply it, then
    /// evaluate. Returns whether START was sent.
    pub async fn poll<const M: usize, const N: usize>(
        &mut self,
        inbox: &Mailbox<AlarmMsg, M>,
        buzzer: &Mailbox<BuzzerMsg, N>,
    ) -> bool {
        if let Some(msg) = inbox.receive(self.config.tick).await {
            if let Err(e) = self.ingest(msg) {
                log::warn!("Calendar update rejected: {}", e);
            }
        }
        self.evaluate(buzzer)
    }

    /// Alarm task body. Never returns.
    pub async fn run<const M: usize, const N: usize>(
        &mut self,
        inbox: &Mailbox<AlarmMsg, M>,
        buzzer: &Mailbox<BuzzerMsg, N>,
    ) -> ! {
        log::info!(
            "Alarm task started (tick {} s)",
            self.config.tick.as_secs()
        );
        loop {
            self.poll(inbox, buzzer).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::OwnedBuf;
    use alloc::string::String;
    use embassy_futures::block_on;
    use time::macros::datetime;

    #[derive(Default)]
    struct ManualClock(Option<PrimitiveDateTime>);

    impl TimeSource for ManualClock {
        fn now(&self) -> Option<PrimitiveDateTime> {
            self.0
        }

        fn set(&mut self, now: PrimitiveDateTime) {
            self.0 = Some(now);
        }
    }

    fn standup() -> CalendarEvent {
        CalendarEvent::new(
            String::from("standup"),
            datetime!(2024-05-01 08:00),
            datetime!(2024-05-01 08:10),
            datetime!(2024-05-01 08:25),
        )
    }

    fn armed_at(now: PrimitiveDateTime) -> AlarmEngine<ManualClock> {
        let mut engine = AlarmEngine::new(ManualClock::default(), AlarmConfig::new());
        engine
            .ingest(AlarmMsg::Calendar(CalendarUpdate {
                now: Some(now),
                event: standup(),
            }))
            .unwrap();
        engine
    }

    fn drain(buzzer: &Mailbox<BuzzerMsg>) -> usize {
        let mut n = 0;
        while buzzer.try_receive().is_some() {
            n += 1;
        }
        n
    }

    #[test]
    fn fires_once_across_minute_steps() {
        let buzzer: Mailbox<BuzzerMsg> = Mailbox::new();
        let mut engine = armed_at(datetime!(2024-05-01 07:58));

        let mut fired_at = std::vec::Vec::new();
        let mut t = datetime!(2024-05-01 07:58);
        while t <= datetime!(2024-05-01 08:02) {
            engine.clock_mut().set(t);
            if engine.evaluate(&buzzer) {
                fired_at.push(t);
            }
            t += time::Duration::minutes(1);
        }

        assert_eq!(fired_at, [datetime!(2024-05-01 08:00)]);
        assert_eq!(buzzer.try_receive(), Some(BuzzerMsg::Start));
        assert_eq!(drain(&buzzer), 0);
    }

    #[test]
    fn many_ticks_in_matching_minute_fire_once() {
        let buzzer: Mailbox<BuzzerMsg> = Mailbox::new();
        let mut engine = armed_at(datetime!(2024-05-01 08:00));

        let mut starts = 0;
        for secs in (0..60).step_by(10) {
            engine.clock_mut().set(datetime!(2024-05-01 08:00) + time::Duration::seconds(secs));
            engine.evaluate(&buzzer);
            starts += drain(&buzzer);
        }
        assert_eq!(starts, 1);
    }

    #[test]
    fn invalid_event_never_fires() {
        let buzzer: Mailbox<BuzzerMsg> = Mailbox::new();
        let mut engine = AlarmEngine::new(ManualClock::default(), AlarmConfig::new());
        engine
            .ingest(AlarmMsg::CalendarJson(OwnedBuf::from(
                r#"{"time":"2024-05-01 07:58:00","events":[]}"#,
            )))
            .unwrap();

        let mut t = datetime!(2024-05-01 07:58);
        while t <= datetime!(2024-05-01 08:02) {
            engine.clock_mut().set(t);
            assert!(!engine.evaluate(&buzzer));
            t += time::Duration::minutes(1);
        }
        assert!(buzzer.is_empty());
    }

    #[test]
    fn unset_clock_skips_evaluation() {
        let buzzer: Mailbox<BuzzerMsg> = Mailbox::new();
        let mut engine = AlarmEngine::new(ManualClock::default(), AlarmConfig::new());
        engine
            .ingest(AlarmMsg::Calendar(CalendarUpdate {
                now: None,
                event: standup(),
            }))
            .unwrap();
        assert!(!engine.evaluate(&buzzer));
        assert!(engine.event().valid);
    }

    #[test]
    fn rejected_start_is_retried_in_same_minute() {
        let buzzer: Mailbox<BuzzerMsg> = Mailbox::new();
        buzzer.send(BuzzerMsg::Stop).unwrap();
        buzzer.send(BuzzerMsg::Stop).unwrap();
        let mut engine = armed_at(datetime!(2024-05-01 08:00:05));

        assert!(!engine.evaluate(&buzzer));
        assert_eq!(drain(&buzzer), 2);

        engine.clock_mut().set(datetime!(2024-05-01 08:00:15));
        assert!(engine.evaluate(&buzzer));
        assert_eq!(buzzer.try_receive(), Some(BuzzerMsg::Start));
    }

    #[test]
    fn fires_again_next_day() {
        let buzzer: Mailbox<BuzzerMsg> = Mailbox::new();
        let mut engine = armed_at(datetime!(2024-05-01 08:00));
        assert!(engine.evaluate(&buzzer));
        engine.clock_mut().set(datetime!(2024-05-02 08:00));
        assert!(engine.evaluate(&buzzer));
    }

    #[test]
    fn malformed_json_keeps_current_alarm() {
        let mut engine = armed_at(datetime!(2024-05-01 07:00));
        let err = engine
            .ingest(AlarmMsg::CalendarJson(OwnedBuf::from("{\"time\":\"2024-05")))
            .unwrap_err();
        assert_eq!(err, CalendarError::NotAnObject);
        assert_eq!(engine.event(), &standup());
        assert_eq!(engine.status_line().as_str(), "08:10 standup");
    }

    #[test]
    fn json_update_sets_clock_and_event() {
        let mut engine = AlarmEngine::new(ManualClock::default(), AlarmConfig::new());
        assert_eq!(engine.status_line().as_str(), "No alarm set");
        engine
            .ingest(AlarmMsg::CalendarJson(OwnedBuf::from(
                r#"{"time":"2024-05-01 06:30:00","events":[{"title":"gym",
                "start":"2024-05-01 07:00:00","end":"2024-05-01 08:00:00"}]}"#,
            )))
            .unwrap();
        assert_eq!(engine.clock().now(), Some(datetime!(2024-05-01 06:30)));
        assert_eq!(engine.event().alarm_time, datetime!(2024-05-01 07:00));
        assert_eq!(engine.status_line().as_str(), "07:00 gym");
    }

    #[test]
    fn poll_applies_update_then_evaluates() {
        let inbox: Mailbox<AlarmMsg> = Mailbox::new();
        let buzzer: Mailbox<BuzzerMsg> = Mailbox::new();
        let mut engine = AlarmEngine::new(ManualClock::default(), AlarmConfig::new());

        inbox
            .send(AlarmMsg::Calendar(CalendarUpdate {
                now: Some(datetime!(2024-05-01 08:00:30)),
                event: standup(),
            }))
            .unwrap();
        assert!(block_on(engine.poll(&inbox, &buzzer)));
        assert_eq!(buzzer.try_receive(), Some(BuzzerMsg::Start));
    }

    #[test]
    fn poll_timeout_still_evaluates() {
        let inbox: Mailbox<AlarmMsg> = Mailbox::new();
        let buzzer: Mailbox<BuzzerMsg> = Mailbox::new();
        let mut engine = AlarmEngine::new(
            ManualClock::default(),
            AlarmConfig {
                tick: Duration::from_millis(5),
            },
        );
        engine
            .ingest(AlarmMsg::Calendar(CalendarUpdate {
                now: Some(datetime!(2024-05-01 08:00)),
                event: standup(),
            }))
            .unwrap();
        assert!(block_on(engine.poll(&inbox, &buzzer)));
    }
}
