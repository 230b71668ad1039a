//! Robot state tracking.
//!
//! The tracker owns one [`RobotState`] slot per configured robot. It is plain
//! synchronous data; serialization of mutations is the job of the monitor
//! task that owns it (see [`crate::monitor`]).

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::MonitorConfig;
use crate::projection::Projector;
use crate::record::LogRecord;
use crate::types::{FieldPoint, RobotState, Role, TelemetryPacket, TrackerSnapshot};
use crate::{MonitorError, Result};

/// Per-robot state table with projection and staleness expiry.
#[derive(Debug, Clone)]
pub struct Tracker {
    robots: Vec<RobotState>,
    projector: Projector,
    reverse: bool,
}

impl Tracker {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            robots: (0..config.network.robot_count).map(RobotState::new).collect(),
            projector: Projector::new(&config.field),
            reverse: false,
        }
    }

    pub fn robot_count(&self) -> usize {
        self.robots.len()
    }

    pub fn robot(&self, index: usize) -> Option<&RobotState> {
        self.robots.get(index)
    }

    pub fn robots(&self) -> &[RobotState] {
        &self.robots
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// Set the global reverse-field switch. Affects packets applied afterwards.
    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    /// Apply a decoded packet to robot `index`.
    ///
    /// Validity of pose, ball and goal posts is recomputed from this packet
    /// alone: a kind missing from the packet is invalid afterwards.
    pub fn apply_packet(
        &mut self,
        index: usize,
        packet: &TelemetryPacket,
        now: Instant,
    ) -> Result<&RobotState> {
        let robot_count = self.robots.len();
        let projector = self.projector;
        let reverse = self.reverse;
        let state = self
            .robots
            .get_mut(index)
            .ok_or(MonitorError::UnknownRobot { index, robot_count })?;

        let team = packet.team_color();
        state.sender_id = packet.sender_id;
        state.team_color = team;
        state.role = Role::classify(&packet.role_message);
        state.message = packet.role_message.clone();
        state.voltage = packet.voltage();
        state.fps = packet.fps;
        state.self_confidence = packet.self_confidence;
        state.ball_confidence = packet.ball_confidence;

        match packet.self_pose() {
            Some(pose) => {
                state.self_pose = projector.project_pose(pose, reverse);
                state.self_pose_valid = true;
            }
            None => state.self_pose_valid = false,
        }

        match packet.ball() {
            Some(ball) => {
                state.ball = projector.project_landmark(ball, team, reverse);
                state.ball_valid = true;
            }
            None => state.ball_valid = false,
        }

        state.goal_post_valid = [false; 2];
        for (slot, post) in packet.goal_posts().take(2).enumerate() {
            state.goal_posts[slot] = projector.project_landmark(post, team, reverse);
            state.goal_post_valid[slot] = true;
        }

        state.last_update = Some(now);
        trace!(
            robot = index,
            role = ?state.role,
            pose_valid = state.self_pose_valid,
            ball_valid = state.ball_valid,
            "Applied packet"
        );
        Ok(&*state)
    }

    /// Apply a replayed log record. Only fields present in the record change.
    ///
    /// Coordinates in a record are already projected and are stored as-is.
    /// Staleness is not evaluated here; the record marks the robot fresh as of `now`.
    pub fn apply_record(&mut self, record: &LogRecord, now: Instant) -> Result<&RobotState> {
        let robot_count = self.robots.len();
        let index = record
            .robot
            .ok_or_else(|| MonitorError::IncompleteRecord { time: record.time.clone() })?;
        let state = self
            .robots
            .get_mut(index)
            .ok_or(MonitorError::UnknownRobot { index, robot_count })?;

        set_if(&mut state.team_color, record.team_color);
        set_if(&mut state.sender_id, record.sender_id);
        set_if(&mut state.fps, record.fps);
        set_if(&mut state.voltage, record.voltage);
        set_if(&mut state.self_confidence, record.self_confidence);
        set_if(&mut state.ball_confidence, record.ball_confidence);
        set_if(&mut state.self_pose_valid, record.self_pose_valid);
        set_if(&mut state.self_pose.x, record.self_x);
        set_if(&mut state.self_pose.y, record.self_y);
        set_if(&mut state.self_pose.theta, record.self_theta);
        set_if(&mut state.ball_valid, record.ball_valid);
        set_if(&mut state.ball.x, record.ball_x);
        set_if(&mut state.ball.y, record.ball_y);
        for post in 0..2 {
            set_if(&mut state.goal_post_valid[post], record.goal_post_valid[post]);
            set_if(&mut state.goal_posts[post].x, record.goal_post_x[post]);
            set_if(&mut state.goal_posts[post].y, record.goal_post_y[post]);
        }
        if let Some(message) = &record.message {
            state.role = Role::classify(message);
            state.message = message.clone();
        }

        state.last_update = Some(now);
        trace!(robot = index, time = %record.time, "Applied log record");
        Ok(&*state)
    }

    /// Invalidate every robot silent for longer than `timeout`.
    ///
    /// Clears pose, ball and goal-post validity and zeroes the displayed
    /// confidences. Stored coordinates are kept. Returns the indices that
    /// expired on this call.
    pub fn expire_stale(&mut self, now: Instant, timeout: Duration) -> Vec<usize> {
        let mut expired = Vec::new();
        for state in &mut self.robots {
            let Some(last_update) = state.last_update else {
                continue;
            };
            if now.saturating_duration_since(last_update) <= timeout {
                continue;
            }
            let was_visible = state.self_pose_valid || state.ball_valid;
            state.self_pose_valid = false;
            state.ball_valid = false;
            state.goal_post_valid = [false; 2];
            state.self_confidence = 0;
            state.ball_confidence = 0;
            if was_visible {
                debug!(robot = state.index, "Robot timed out");
                expired.push(state.index);
            }
        }
        expired
    }

    /// Copy of the current table.
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot { robots: self.robots.clone(), reverse: self.reverse }
    }

    /// Projected self pose of robot `index`, if currently valid.
    pub fn pose(&self, index: usize) -> Option<FieldPoint> {
        self.robots.get(index).filter(|s| s.self_pose_valid).map(|s| s.self_pose)
    }
}

fn set_if<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
