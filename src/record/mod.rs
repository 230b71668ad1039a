//! Session log records.
//!
//! A session log is UTF-8 text with one comma-separated line per accepted
//! robot update and no header row. Fields are positional:
//!
//! ```text
//! time, robot, color, id, fps, voltage, self_conf, ball_conf,
//! self_valid, self_x, self_y, self_theta,
//! ball_valid, ball_x, ball_y,
//! post0_valid, post0_x, post0_y, post1_valid, post1_x, post1_y,
//! message
//! ```
//!
//! Coordinates are display pixels, booleans are `0`/`1`, and the message is
//! the remainder of the line so it may contain commas.
//!
//! Parsing is lenient on purpose. Fields are read left to right and the first
//! missing or unparsable field ends the record; everything before it is kept
//! as a partial update and everything after it stays unset. Applying a partial
//! record only touches the fields it carries.

mod writer;

pub use writer::LogWriter;

use std::str::FromStr;

use crate::types::{RobotState, TeamColor};

/// `HH:MM:SS` wall-clock format used in the time column.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Number of positional fields in a complete record.
pub const FIELD_COUNT: usize = 22;

/// Current local wall-clock time in [`TIME_FORMAT`].
pub fn wall_clock_stamp() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

/// One line of a session log. Every field after `time` may be absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogRecord {
    pub time: String,
    pub robot: Option<usize>,
    pub team_color: Option<TeamColor>,
    pub sender_id: Option<u8>,
    pub fps: Option<u8>,
    pub voltage: Option<f64>,
    pub self_confidence: Option<u8>,
    pub ball_confidence: Option<u8>,
    pub self_pose_valid: Option<bool>,
    pub self_x: Option<i32>,
    pub self_y: Option<i32>,
    pub self_theta: Option<f64>,
    pub ball_valid: Option<bool>,
    pub ball_x: Option<i32>,
    pub ball_y: Option<i32>,
    pub goal_post_valid: [Option<bool>; 2],
    pub goal_post_x: [Option<i32>; 2],
    pub goal_post_y: [Option<i32>; 2],
    pub message: Option<String>,
}

impl LogRecord {
    /// Full record describing `state` at `time`.
    pub fn from_state(time: impl Into<String>, state: &RobotState) -> Self {
        Self {
            time: time.into(),
            robot: Some(state.index),
            team_color: Some(state.team_color),
            sender_id: Some(state.sender_id),
            fps: Some(state.fps),
            voltage: Some(state.voltage),
            self_confidence: Some(state.self_confidence),
            ball_confidence: Some(state.ball_confidence),
            self_pose_valid: Some(state.self_pose_valid),
            self_x: Some(state.self_pose.x),
            self_y: Some(state.self_pose.y),
            self_theta: Some(state.self_pose.theta),
            ball_valid: Some(state.ball_valid),
            ball_x: Some(state.ball.x),
            ball_y: Some(state.ball.y),
            goal_post_valid: state.goal_post_valid.map(Some),
            goal_post_x: state.goal_posts.map(|p| Some(p.x)),
            goal_post_y: state.goal_posts.map(|p| Some(p.y)),
            message: Some(state.message.clone()),
        }
    }

    /// Parse one log line. Never fails; see the module docs for partial records.
    pub fn parse(line: &str) -> Self {
        let mut fields = FieldReader::new(line);
        let time = fields.raw().unwrap_or_default().trim().to_string();

        let mut record = LogRecord { time, ..Default::default() };
        record.robot = fields.parse();
        record.team_color = fields.next_with(|s| TeamColor::from_label(s.trim()));
        record.sender_id = fields.parse();
        record.fps = fields.parse();
        record.voltage = fields.parse();
        record.self_confidence = fields.parse();
        record.ball_confidence = fields.parse();
        record.self_pose_valid = fields.flag();
        record.self_x = fields.parse();
        record.self_y = fields.parse();
        record.self_theta = fields.parse();
        record.ball_valid = fields.flag();
        record.ball_x = fields.parse();
        record.ball_y = fields.parse();
        for post in 0..2 {
            record.goal_post_valid[post] = fields.flag();
            record.goal_post_x[post] = fields.parse();
            record.goal_post_y[post] = fields.parse();
        }
        record.message = fields.raw().map(str::to_string);
        record
    }

    /// Render as one log line, stopping at the first absent field.
    pub fn to_line(&self) -> String {
        self.rendered_fields().join(",")
    }

    /// Number of leading fields present, `time` included.
    pub fn field_count(&self) -> usize {
        self.rendered_fields().len()
    }

    pub fn is_complete(&self) -> bool {
        self.field_count() == FIELD_COUNT
    }

    fn rendered_fields(&self) -> Vec<String> {
        let flag = |b: Option<bool>| b.map(|b| if b { "1" } else { "0" }.to_string());
        let num = |n: Option<i32>| n.map(|n| n.to_string());
        let fields = [
            Some(self.time.clone()),
            self.robot.map(|r| r.to_string()),
            self.team_color.map(|c| c.label().to_string()),
            self.sender_id.map(|id| id.to_string()),
            self.fps.map(|fps| fps.to_string()),
            self.voltage.map(|v| format!("{v:.2}")),
            self.self_confidence.map(|c| c.to_string()),
            self.ball_confidence.map(|c| c.to_string()),
            flag(self.self_pose_valid),
            num(self.self_x),
            num(self.self_y),
            self.self_theta.map(|t| format!("{t:.4}")),
            flag(self.ball_valid),
            num(self.ball_x),
            num(self.ball_y),
            flag(self.goal_post_valid[0]),
            num(self.goal_post_x[0]),
            num(self.goal_post_y[0]),
            flag(self.goal_post_valid[1]),
            num(self.goal_post_x[1]),
            num(self.goal_post_y[1]),
            self.message.as_ref().map(|m| m.replace(['\n', '\r'], " ")),
        ];
        fields.into_iter().map_while(|f| f).collect()
    }
}

/// Sequential reader that stops at the first bad field.
struct FieldReader<'a> {
    parts: std::str::SplitN<'a, char>,
    stopped: bool,
}

impl<'a> FieldReader<'a> {
    fn new(line: &'a str) -> Self {
        Self { parts: line.splitn(FIELD_COUNT, ','), stopped: false }
    }

    fn raw(&mut self) -> Option<&'a str> {
        if self.stopped {
            return None;
        }
        let part = self.parts.next();
        if part.is_none() {
            self.stopped = true;
        }
        part
    }

    fn next_with<T>(&mut self, convert: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let value = self.raw().and_then(convert);
        if value.is_none() {
            self.stopped = true;
        }
        value
    }

    fn parse<T: FromStr>(&mut self) -> Option<T> {
        self.next_with(|s| s.trim().parse().ok())
    }

    fn flag(&mut self) -> Option<bool> {
        self.next_with(|s| match s.trim() {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        })
    }
}
