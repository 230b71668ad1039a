//! Field-to-display coordinate projection.
//!
//! Robots report positions in field millimeters with the origin at the
//! center spot. The display image has its origin in the top-left corner and
//! the opposite handedness, so x is flipped and headings become `π - θ`.
//!
//! Two mirroring rules apply on top of the base projection:
//!
//! - Self poses follow the global "reverse field" switch only.
//! - Ball and goal-post observations mirror when the robot's team and the
//!   reverse switch disagree: Magenta with reverse on, or Cyan with reverse
//!   off. Each robot's landmarks stay oriented to its own attacking direction.

use std::f64::consts::PI;

use crate::config::FieldConfig;
use crate::types::{FieldPoint, Observation, TeamColor};

/// Pure mapping from field millimeters to display pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    image_width: i32,
    image_height: i32,
    size_x_mm: f64,
    size_y_mm: f64,
}

impl Projector {
    pub fn new(field: &FieldConfig) -> Self {
        Self {
            image_width: field.image_width,
            image_height: field.image_height,
            size_x_mm: field.size_x_mm,
            size_y_mm: field.size_y_mm,
        }
    }

    /// Project a self pose. Mirrors only when the field is reversed.
    pub fn project_pose(&self, pose: &Observation, reverse: bool) -> FieldPoint {
        let (x, y) = self.to_pixels(pose.x_mm, pose.y_mm);
        let point = FieldPoint::new(x, y, PI - pose.theta);
        if reverse { self.mirror(point) } else { point }
    }

    /// Project a ball or goal-post observation reported by a robot of `team`.
    pub fn project_landmark(
        &self,
        landmark: &Observation,
        team: TeamColor,
        reverse: bool,
    ) -> FieldPoint {
        let (x, y) = self.to_pixels(landmark.x_mm, landmark.y_mm);
        let point = FieldPoint::new(x, y, 0.0);
        if Self::mirrors_landmarks(team, reverse) {
            FieldPoint { theta: 0.0, ..self.mirror(point) }
        } else {
            point
        }
    }

    /// Whether landmarks of `team` are mirrored under the given reverse setting.
    pub fn mirrors_landmarks(team: TeamColor, reverse: bool) -> bool {
        match team {
            TeamColor::Magenta => reverse,
            TeamColor::Cyan => !reverse,
        }
    }

    // Arithmetic stays in f64; `as` saturates once at the i32 boundary.
    fn to_pixels(&self, x_mm: i32, y_mm: i32) -> (i32, i32) {
        let width = f64::from(self.image_width);
        let height = f64::from(self.image_height);
        let x = width - (f64::from(x_mm) * (width / self.size_x_mm) + width / 2.0).trunc();
        let y = f64::from(y_mm) * (height / self.size_y_mm) + height / 2.0;
        (x as i32, y as i32)
    }

    fn mirror(&self, point: FieldPoint) -> FieldPoint {
        FieldPoint {
            x: (f64::from(self.image_width) - f64::from(point.x)) as i32,
            y: (f64::from(self.image_height) - f64::from(point.y)) as i32,
            theta: point.theta + PI,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn projector() -> Projector {
        Projector::new(&FieldConfig::default())
    }

    #[test]
    fn center_spot_maps_to_image_center() {
        let point = projector().project_pose(&Observation::self_pose(0, 0, 0.0), false);
        assert_eq!((point.x, point.y), (370, 270));
        assert!((point.theta - PI).abs() < 1e-12);
    }

    /// 1/8 pixel per millimeter, exact in binary floating point.
    fn exact_projector() -> Projector {
        Projector::new(&FieldConfig {
            image_width: 1024,
            image_height: 512,
            size_x_mm: 8192.0,
            size_y_mm: 4096.0,
        })
    }

    #[test]
    fn positive_x_moves_left_on_screen() {
        let p = exact_projector();
        let point = p.project_pose(&Observation::self_pose(1000, 0, 0.0), false);
        assert_eq!(point.x, 1024 - (125 + 512));
        let point = p.project_pose(&Observation::self_pose(0, 800, 0.0), false);
        assert_eq!(point.y, 100 + 256);
    }

    #[test]
    fn fractional_pixels_truncate() {
        // 1004 mm is 125.5 px
        let point = exact_projector().project_pose(&Observation::self_pose(1004, 4, 0.0), false);
        assert_eq!(point.x, 1024 - 637);
        assert_eq!(point.y, 256);
    }

    #[test]
    fn oversized_image_saturates_instead_of_overflowing() {
        let p = Projector::new(&FieldConfig {
            image_width: 2_000_000_000,
            size_x_mm: 1.0,
            ..FieldConfig::default()
        });
        let far_left = p.project_pose(&Observation::self_pose(-10_240, 0, 0.0), false);
        assert_eq!(far_left.x, i32::MAX);
        let mirrored = p.project_pose(&Observation::self_pose(-10_240, 0, 0.0), true);
        assert_eq!(mirrored.x, 2_000_000_000 - i32::MAX);
        let far_right = p.project_landmark(&Observation::ball(10_240, 0), TeamColor::Magenta, false);
        assert_eq!(far_right.x, i32::MIN);
    }

    #[test]
    fn heading_is_flipped() {
        let point = projector().project_pose(&Observation::self_pose(0, 0, 0.25), false);
        assert!((point.theta - (PI - 0.25)).abs() < 1e-12);
    }

    #[test]
    fn reverse_mirrors_pose_and_turns_heading() {
        let pose = Observation::self_pose(1000, 700, 0.25);
        let normal = projector().project_pose(&pose, false);
        let reversed = projector().project_pose(&pose, true);
        assert_eq!(reversed.x, 740 - normal.x);
        assert_eq!(reversed.y, 540 - normal.y);
        assert!((reversed.theta - (normal.theta + PI)).abs() < 1e-12);
    }

    #[test]
    fn reverse_toggle_restores_pose() {
        let p = projector();
        let pose = Observation::self_pose(-2345, 1234, -0.7);
        let before = p.project_pose(&pose, false);
        let _ = p.project_pose(&pose, true);
        assert_eq!(p.project_pose(&pose, false), before);
    }

    #[test]
    fn landmark_mirroring_depends_on_team() {
        assert!(!Projector::mirrors_landmarks(TeamColor::Magenta, false));
        assert!(Projector::mirrors_landmarks(TeamColor::Magenta, true));
        assert!(Projector::mirrors_landmarks(TeamColor::Cyan, false));
        assert!(!Projector::mirrors_landmarks(TeamColor::Cyan, true));
    }

    #[test]
    fn cyan_ball_is_mirrored_without_reverse() {
        let p = projector();
        let ball = Observation::ball(1000, 700);
        let magenta = p.project_landmark(&ball, TeamColor::Magenta, false);
        let cyan = p.project_landmark(&ball, TeamColor::Cyan, false);
        assert_eq!(cyan.x, 740 - magenta.x);
        assert_eq!(cyan.y, 540 - magenta.y);
        assert_eq!(cyan.theta, 0.0);
    }

    #[test]
    fn self_pose_ignores_team_rule() {
        // Only the reverse flag affects poses; landmarks of a cyan robot mirror,
        // its own pose does not.
        let p = projector();
        let pose = p.project_pose(&Observation::self_pose(1000, 700, 0.0), false);
        let ball = p.project_landmark(&Observation::ball(1000, 700), TeamColor::Cyan, false);
        assert_ne!((pose.x, pose.y), (ball.x, ball.y));
    }

    proptest! {
        #[test]
        fn projection_is_deterministic(
            x in -10_240i32..10_240,
            y in -10_240i32..10_240,
            theta in -4.0f64..4.0,
            reverse in any::<bool>(),
        ) {
            let p = projector();
            let pose = Observation::self_pose(x, y, theta);
            prop_assert_eq!(p.project_pose(&pose, reverse), p.project_pose(&pose, reverse));
            let ball = Observation::ball(x, y);
            prop_assert_eq!(
                p.project_landmark(&ball, TeamColor::Cyan, reverse),
                p.project_landmark(&ball, TeamColor::Cyan, reverse)
            );
        }

        #[test]
        fn on_field_points_stay_on_image(x in -5000i32..=5000, y in -3500i32..=3500) {
            let point = projector().project_pose(&Observation::self_pose(x, y, 0.0), false);
            prop_assert!((0..=740).contains(&point.x));
            prop_assert!((0..=540).contains(&point.y));
        }
    }
}
