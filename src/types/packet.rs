//! Decoded telemetry packet types

use serde::{Deserialize, Serialize};

use super::TeamColor;

/// Number of observation slots carried by every packet.
pub const OBSERVATION_SLOTS: usize = 4;

/// What an observation slot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObservationKind {
    /// Unused slot
    #[default]
    None,
    /// Robot's own estimated pose, heading included
    SelfPose,
    Ball,
    GoalPost,
    /// Tag value this monitor does not understand; skipped downstream
    Unrecognized(u8),
}

impl ObservationKind {
    /// Map a 3-bit wire tag to a kind.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => ObservationKind::None,
            1 => ObservationKind::SelfPose,
            2 => ObservationKind::Ball,
            3 => ObservationKind::GoalPost,
            other => ObservationKind::Unrecognized(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            ObservationKind::None => 0,
            ObservationKind::SelfPose => 1,
            ObservationKind::Ball => 2,
            ObservationKind::GoalPost => 3,
            ObservationKind::Unrecognized(tag) => tag,
        }
    }
}

/// One field-relative observation in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationKind,
    pub x_mm: i32,
    pub y_mm: i32,
    /// Heading in radians, meaningful for `SelfPose` only
    pub theta: f64,
}

impl Observation {
    pub fn new(kind: ObservationKind, x_mm: i32, y_mm: i32, theta: f64) -> Self {
        Self { kind, x_mm, y_mm, theta }
    }

    pub fn self_pose(x_mm: i32, y_mm: i32, theta: f64) -> Self {
        Self::new(ObservationKind::SelfPose, x_mm, y_mm, theta)
    }

    pub fn ball(x_mm: i32, y_mm: i32) -> Self {
        Self::new(ObservationKind::Ball, x_mm, y_mm, 0.0)
    }

    pub fn goal_post(x_mm: i32, y_mm: i32) -> Self {
        Self::new(ObservationKind::GoalPost, x_mm, y_mm, 0.0)
    }
}

/// A fully decoded telemetry datagram. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryPacket {
    /// Sender id, 7 bits
    pub sender_id: u8,
    /// Team color bit (0 or 1)
    pub team_color_flag: u8,
    pub voltage_raw: u8,
    pub fps: u8,
    /// Self-localization confidence, nominally 0..=100
    pub self_confidence: u8,
    /// Ball confidence, nominally 0..=100
    pub ball_confidence: u8,
    /// Role keyword plus free text
    pub role_message: String,
    pub observations: [Observation; OBSERVATION_SLOTS],
}

impl TelemetryPacket {
    /// Battery voltage in volts, reproducing the sender's `>> 3`, `* 100` encoding.
    pub fn voltage(&self) -> f64 {
        (u32::from(self.voltage_raw) << 3) as f64 / 100.0
    }

    pub fn team_color(&self) -> TeamColor {
        TeamColor::from_flag(self.team_color_flag)
    }

    /// First self-pose slot, if any.
    pub fn self_pose(&self) -> Option<&Observation> {
        self.first_of(ObservationKind::SelfPose)
    }

    /// First ball slot, if any.
    pub fn ball(&self) -> Option<&Observation> {
        self.first_of(ObservationKind::Ball)
    }

    /// Goal-post slots in slot order.
    pub fn goal_posts(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(|o| o.kind == ObservationKind::GoalPost)
    }

    fn first_of(&self, kind: ObservationKind) -> Option<&Observation> {
        self.observations.iter().find(|o| o.kind == kind)
    }
}
