//! Timed replay of session logs.
//!
//! [`ReplaySession`] is the synchronous state machine:
//!
//! ```text
//! Idle -> Loaded -> Playing <-> Paused
//!                      |
//!                      v
//!                   Finished
//! ```
//!
//! It never sleeps. Each transition that needs a timer returns the delay to
//! wait before the next record, computed from the recorded `HH:MM:SS`
//! spacing divided by the speed multiplier. [`player`] drives a session with
//! real timers and feeds the records into the monitor.
//!
//! ```rust
//! use fieldwatch::replay::{ReplaySession, ReplaySpeed};
//! use std::time::Duration;
//!
//! let mut session = ReplaySession::new();
//! session.load(["10:00:00,0", "10:00:02,0", "10:00:07,0"]);
//! session.set_speed(ReplaySpeed::X5);
//!
//! assert_eq!(session.play(), Some(Duration::from_millis(400)));
//! let step = session.advance().unwrap();
//! assert_eq!(step.next_delay, Some(Duration::from_millis(1000)));
//! ```

pub mod player;

pub use player::{ReplayHandle, ReplayStatus};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::record::{LogRecord, TIME_FORMAT};
use crate::{MonitorError, Result};

/// Replay lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplayState {
    #[default]
    Idle,
    Loaded,
    Playing,
    Paused,
    Finished,
}

/// Supported playback speed multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplaySpeed {
    #[default]
    X1,
    X2,
    X5,
}

impl ReplaySpeed {
    pub fn multiplier(self) -> u64 {
        match self {
            ReplaySpeed::X1 => 1,
            ReplaySpeed::X2 => 2,
            ReplaySpeed::X5 => 5,
        }
    }

    pub fn from_multiplier(multiplier: u64) -> Option<Self> {
        match multiplier {
            1 => Some(ReplaySpeed::X1),
            2 => Some(ReplaySpeed::X2),
            5 => Some(ReplaySpeed::X5),
            _ => None,
        }
    }
}

/// A record to apply now, and how long to wait before the following one.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    pub record: LogRecord,
    /// `None` when no further timer is needed
    pub next_delay: Option<Duration>,
}

/// Elapsed whole seconds between two `HH:MM:SS` stamps.
///
/// No midnight handling: the result is negative when `to` is earlier than
/// `from`. Returns `None` if either stamp does not parse.
pub fn interval_seconds(from: &str, to: &str) -> Option<i64> {
    let from = NaiveTime::parse_from_str(from.trim(), TIME_FORMAT).ok()?;
    let to = NaiveTime::parse_from_str(to.trim(), TIME_FORMAT).ok()?;
    Some((to - from).num_seconds())
}

/// Replay state machine over an in-memory list of records.
#[derive(Debug, Clone, Default)]
pub struct ReplaySession {
    records: Vec<LogRecord>,
    cursor: usize,
    speed: ReplaySpeed,
    state: ReplayState,
}

impl ReplaySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn speed(&self) -> ReplaySpeed {
        self.speed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Replace the loaded log. Blank lines are skipped; short lines become
    /// partial records. Returns the first record, to be applied immediately.
    pub fn load<I, S>(&mut self, lines: I) -> Option<&LogRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.records = lines
            .into_iter()
            .filter(|line| !line.as_ref().trim().is_empty())
            .map(|line| LogRecord::parse(line.as_ref()))
            .collect();
        self.cursor = 0;
        self.state = ReplayState::Loaded;

        let partial = self.records.iter().filter(|r| !r.is_complete()).count();
        if partial > 0 {
            debug!("{} of {} log records are partial", partial, self.records.len());
        }
        info!("Loaded {} log records", self.records.len());
        self.records.first()
    }

    /// Start or resume playback. Returns the delay before the next record.
    ///
    /// Does nothing outside `Loaded`/`Paused` or when no records are loaded.
    pub fn play(&mut self) -> Option<Duration> {
        if !matches!(self.state, ReplayState::Loaded | ReplayState::Paused) || self.is_empty() {
            return None;
        }
        self.state = ReplayState::Playing;
        self.schedule_next()
    }

    /// The pending timer fired: move to the next record.
    pub fn advance(&mut self) -> Option<ReplayStep> {
        if self.state != ReplayState::Playing || self.cursor + 1 >= self.records.len() {
            return None;
        }
        self.cursor += 1;
        let record = self.records[self.cursor].clone();
        let next_delay = self.schedule_next();
        Some(ReplayStep { record, next_delay })
    }

    /// Suspend playback, keeping the cursor. Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        if self.state == ReplayState::Playing {
            self.state = ReplayState::Paused;
            true
        } else {
            false
        }
    }

    /// Jump to `index`. The record there is applied immediately; when playing,
    /// scheduling continues from it.
    pub fn seek(&mut self, index: usize) -> Result<ReplayStep> {
        if index >= self.records.len() {
            return Err(MonitorError::SeekOutOfRange { index, len: self.records.len() });
        }
        self.cursor = index;
        if self.state == ReplayState::Finished {
            self.state = ReplayState::Paused;
        }
        let next_delay =
            if self.state == ReplayState::Playing { self.schedule_next() } else { None };
        Ok(ReplayStep { record: self.records[index].clone(), next_delay })
    }

    /// Change the divisor for delays computed from now on.
    pub fn set_speed(&mut self, speed: ReplaySpeed) {
        self.speed = speed;
    }

    /// Drop the loaded log and return to `Idle`.
    pub fn stop(&mut self) {
        self.records.clear();
        self.cursor = 0;
        self.state = ReplayState::Idle;
    }

    /// Delay between the record at `index` and the one after it.
    pub fn delay_after(&self, index: usize) -> Duration {
        let (Some(current), Some(next)) = (self.records.get(index), self.records.get(index + 1))
        else {
            return Duration::ZERO;
        };
        let seconds = match interval_seconds(&current.time, &next.time) {
            Some(seconds) => seconds.max(0) as u64,
            None => {
                warn!(
                    "Unreadable timestamps {:?} -> {:?}, replaying without delay",
                    current.time, next.time
                );
                0
            }
        };
        Duration::from_millis(seconds * 1000 / self.speed.multiplier())
    }

    fn schedule_next(&mut self) -> Option<Duration> {
        if self.cursor + 1 >= self.records.len() {
            info!("Replay finished at record {}", self.cursor);
            self.state = ReplayState::Finished;
            return None;
        }
        let delay = self.delay_after(self.cursor);
        debug!("Next record {} in {:?}", self.cursor + 1, delay);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::timed_lines;

    fn loaded(times: &[&str]) -> ReplaySession {
        let mut session = ReplaySession::new();
        session.load(timed_lines(times));
        session
    }

    #[test]
    fn interval_parsing() {
        assert_eq!(interval_seconds("10:00:00", "10:00:07"), Some(7));
        assert_eq!(interval_seconds("10:59:58", "11:00:01"), Some(3));
        assert_eq!(interval_seconds("10:00:05", "10:00:00"), Some(-5));
        assert_eq!(interval_seconds("garbage", "10:00:00"), None);
    }

    #[test]
    fn load_applies_first_record() {
        let mut session = ReplaySession::new();
        let first = session.load(timed_lines(&["10:00:00", "10:00:02"])).cloned();
        assert_eq!(first.and_then(|r| r.message), Some("row 0".to_string()));
        assert_eq!(session.state(), ReplayState::Loaded);
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn delays_follow_recorded_spacing() {
        let mut session = loaded(&["10:00:00", "10:00:02", "10:00:07"]);
        assert_eq!(session.play(), Some(Duration::from_millis(2000)));
        let step = session.advance().unwrap();
        assert_eq!(step.record.message.as_deref(), Some("row 1"));
        assert_eq!(step.next_delay, Some(Duration::from_millis(5000)));
        let last = session.advance().unwrap();
        assert_eq!(last.next_delay, None);
        assert_eq!(session.state(), ReplayState::Finished);
        assert!(session.advance().is_none());
    }

    #[test]
    fn speed_divides_delays() {
        let mut session = loaded(&["10:00:00", "10:00:02", "10:00:07"]);
        session.set_speed(ReplaySpeed::X5);
        assert_eq!(session.play(), Some(Duration::from_millis(400)));
        assert_eq!(session.advance().unwrap().next_delay, Some(Duration::from_millis(1000)));
    }

    #[test]
    fn speed_change_affects_only_later_delays() {
        let mut session = loaded(&["10:00:00", "10:00:02", "10:00:07"]);
        let first = session.play();
        session.set_speed(ReplaySpeed::X2);
        assert_eq!(first, Some(Duration::from_millis(2000)));
        assert_eq!(session.advance().unwrap().next_delay, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn out_of_order_and_duplicate_stamps_are_immediate() {
        let mut session = loaded(&["10:00:05", "10:00:05", "10:00:01"]);
        assert_eq!(session.play(), Some(Duration::ZERO));
        assert_eq!(session.advance().unwrap().next_delay, Some(Duration::ZERO));
    }

    #[test]
    fn unreadable_stamp_is_immediate() {
        let mut session = ReplaySession::new();
        session.load(["noon,0", "10:00:02,0"]);
        assert_eq!(session.play(), Some(Duration::ZERO));
    }

    #[test]
    fn pause_keeps_cursor_and_resume_continues() {
        let mut session = loaded(&["10:00:00", "10:00:02", "10:00:07"]);
        session.play();
        session.advance();
        assert!(session.pause());
        assert_eq!(session.state(), ReplayState::Paused);
        assert!(session.advance().is_none());
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.play(), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn seek_while_playing_continues_from_target() {
        let mut session = loaded(&["10:00:00", "10:00:01", "10:00:03", "10:00:06"]);
        session.play();
        let step = session.seek(2).unwrap();
        assert_eq!(step.record.message.as_deref(), Some("row 2"));
        assert_eq!(step.next_delay, Some(Duration::from_millis(3000)));
        let next = session.advance().unwrap();
        assert_eq!(next.record.message.as_deref(), Some("row 3"));
    }

    #[test]
    fn seek_while_paused_stays_paused() {
        let mut session = loaded(&["10:00:00", "10:00:01", "10:00:03"]);
        session.play();
        session.pause();
        let step = session.seek(0).unwrap();
        assert_eq!(step.next_delay, None);
        assert_eq!(session.state(), ReplayState::Paused);
    }

    #[test]
    fn seek_after_finish_allows_replaying() {
        let mut session = loaded(&["10:00:00", "10:00:01"]);
        session.play();
        session.advance();
        assert_eq!(session.state(), ReplayState::Finished);
        session.seek(0).unwrap();
        assert_eq!(session.state(), ReplayState::Paused);
        assert_eq!(session.play(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn seek_out_of_range_is_rejected() {
        let mut session = loaded(&["10:00:00"]);
        assert!(matches!(
            session.seek(1),
            Err(MonitorError::SeekOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn empty_log_loads_but_never_plays() {
        let mut session = ReplaySession::new();
        assert!(session.load(Vec::<String>::new()).is_none());
        assert_eq!(session.state(), ReplayState::Loaded);
        assert_eq!(session.len(), 0);
        assert_eq!(session.play(), None);
        assert_eq!(session.state(), ReplayState::Loaded);
    }

    #[test]
    fn single_record_finishes_on_play() {
        let mut session = loaded(&["10:00:00"]);
        assert_eq!(session.play(), None);
        assert_eq!(session.state(), ReplayState::Finished);
    }

    #[test]
    fn blank_lines_are_not_records() {
        let mut session = ReplaySession::new();
        session.load(["10:00:00,0", "", "   ", "10:00:01,1"]);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn play_is_ignored_when_idle() {
        let mut session = ReplaySession::new();
        assert_eq!(session.play(), None);
        assert_eq!(session.state(), ReplayState::Idle);
    }

    #[test]
    fn speed_multipliers() {
        assert_eq!(ReplaySpeed::from_multiplier(5), Some(ReplaySpeed::X5));
        assert_eq!(ReplaySpeed::from_multiplier(3), None);
        assert_eq!(ReplaySpeed::X2.multiplier(), 2);
    }
}
