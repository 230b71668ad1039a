//! Per-robot tracked state

use std::time::Instant;

use super::{Role, TeamColor};

/// A projected display position. `theta` is only meaningful for poses.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldPoint {
    pub x: i32,
    pub y: i32,
    pub theta: f64,
}

impl FieldPoint {
    pub fn new(x: i32, y: i32, theta: f64) -> Self {
        Self { x, y, theta }
    }
}

/// Everything known about one robot slot.
///
/// Position fields are only meaningful while their `*_valid` flag is set.
/// Expiry clears the flags but keeps the last numbers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RobotState {
    /// Slot index, which is also the channel offset
    pub index: usize,
    pub sender_id: u8,
    pub team_color: TeamColor,
    pub role: Role,
    pub message: String,
    pub voltage: f64,
    pub fps: u8,
    pub self_pose: FieldPoint,
    pub self_pose_valid: bool,
    pub ball: FieldPoint,
    pub ball_valid: bool,
    pub goal_posts: [FieldPoint; 2],
    pub goal_post_valid: [bool; 2],
    pub self_confidence: u8,
    pub ball_confidence: u8,
    /// `None` until the first update arrives
    pub last_update: Option<Instant>,
}

impl RobotState {
    pub fn new(index: usize) -> Self {
        Self { index, ..Default::default() }
    }

    /// Robot number as shown to operators (1-based).
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// `"MAGENTA 3"` style name.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.team_color.label(), self.sender_id)
    }

    /// Self confidence clamped to the 0..=100 display range.
    pub fn displayed_self_confidence(&self) -> u8 {
        self.self_confidence.min(100)
    }

    /// Ball confidence clamped to the 0..=100 display range.
    pub fn displayed_ball_confidence(&self) -> u8 {
        self.ball_confidence.min(100)
    }

    pub fn has_reported(&self) -> bool {
        self.last_update.is_some()
    }
}

/// Immutable copy of the whole tracker, published after every mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerSnapshot {
    pub robots: Vec<RobotState>,
    pub reverse: bool,
}

impl TrackerSnapshot {
    pub fn robot(&self, index: usize) -> Option<&RobotState> {
        self.robots.get(index)
    }
}
