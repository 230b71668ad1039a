//! Scene composition: tracker state to backend-neutral draw primitives.
//!
//! The composer is the only thing a renderer needs. It produces a fresh,
//! immutable list every call; nothing here keeps a frame buffer.
//!
//! Layout:
//! - field layer in image pixel space (`0..image_width`, `0..image_height`)
//! - one status panel per robot to the right of the field, two per row

use crate::config::MonitorConfig;
use crate::types::{FieldPoint, RobotState, Rgb, Role, TrackerSnapshot};

/// Status panel width in pixels.
pub const PANEL_WIDTH: f64 = 200.0;
/// Status panel height in pixels.
pub const PANEL_HEIGHT: f64 = 120.0;
pub const PANELS_PER_ROW: usize = 2;

const TEXT_SIZE: u32 = 12;
const LINE_HEIGHT: f64 = 16.0;
const PANEL_PADDING: f64 = 8.0;
const LINE_WIDTH: u32 = 1;

/// A display position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<FieldPoint> for Position {
    fn from(point: FieldPoint) -> Self {
        Self { x: f64::from(point.x), y: f64::from(point.y) }
    }
}

/// One drawable element. Sizes and widths are in pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    Point { at: Position, color: Rgb, size: u32 },
    Line { from: Position, to: Position, color: Rgb, width: u32 },
    Circle { center: Position, radius: u32, color: Rgb, width: u32 },
    Text { at: Position, text: String, color: Rgb, size: u32 },
    FilledRect { origin: Position, width: f64, height: f64, color: Rgb },
}

/// Compose the full scene for one refresh tick.
pub fn compose(snapshot: &TrackerSnapshot, config: &MonitorConfig) -> Vec<DrawPrimitive> {
    let mut scene = Vec::new();
    for robot in &snapshot.robots {
        field_layer(robot, config, &mut scene);
    }
    for robot in &snapshot.robots {
        status_panel(robot, config, &mut scene);
    }
    scene
}

fn field_layer(robot: &RobotState, config: &MonitorConfig, scene: &mut Vec<DrawPrimitive>) {
    if !robot.self_pose_valid {
        return;
    }
    let markers = &config.markers;
    let pose = robot.self_pose;
    let at = Position::from(pose);
    let marker_color = if robot.role == Role::Attacker { Rgb::RED } else { Rgb::BLACK };
    let length = f64::from(markers.length);

    scene.push(DrawPrimitive::Point { at, color: marker_color, size: markers.robot_size });
    scene.push(DrawPrimitive::Line {
        from: at,
        to: Position::new(at.x + length * pose.theta.cos(), at.y + length * pose.theta.sin()),
        color: marker_color,
        width: LINE_WIDTH,
    });
    scene.push(label(at, robot.number().to_string(), Rgb::BLACK));

    for (post, valid) in robot.goal_posts.iter().zip(robot.goal_post_valid) {
        if valid {
            scene.push(DrawPrimitive::Circle {
                center: Position::from(*post),
                radius: markers.ball_size,
                color: Rgb::BLUE,
                width: LINE_WIDTH,
            });
        }
    }

    if robot.ball_valid {
        let ball = Position::from(robot.ball);
        scene.push(DrawPrimitive::Point { at: ball, color: Rgb::ORANGE, size: markers.ball_size });
        scene.push(label(ball, robot.number().to_string(), Rgb::BLACK));
    }
}

fn status_panel(robot: &RobotState, config: &MonitorConfig, scene: &mut Vec<DrawPrimitive>) {
    let origin = panel_origin(robot.index, config);
    scene.push(DrawPrimitive::FilledRect {
        origin,
        width: PANEL_WIDTH,
        height: PANEL_HEIGHT,
        color: Rgb::PANEL_GREY,
    });

    let lines = [
        (format!("Robot {}", robot.number()), Rgb::BLACK),
        (robot.display_name(), Rgb::BLACK),
        (format!("Voltage: {:.2} V", robot.voltage), Rgb::BLACK),
        (format!("FPS: {}", robot.fps), Rgb::BLACK),
        (robot.message.clone(), robot.role.color()),
        (
            format!(
                "Conf: self {} / ball {}",
                robot.displayed_self_confidence(),
                robot.displayed_ball_confidence()
            ),
            Rgb::BLACK,
        ),
    ];
    for (row, (text, color)) in lines.into_iter().enumerate() {
        let at = Position::new(
            origin.x + PANEL_PADDING,
            origin.y + LINE_HEIGHT * (row as f64 + 1.0),
        );
        scene.push(label(at, text, color));
    }
}

/// Top-left corner of the status panel for robot `index`.
pub fn panel_origin(index: usize, config: &MonitorConfig) -> Position {
    let column = (index % PANELS_PER_ROW) as f64;
    let row = (index / PANELS_PER_ROW) as f64;
    Position::new(
        f64::from(config.field.image_width) + column * PANEL_WIDTH,
        row * PANEL_HEIGHT,
    )
}

fn label(at: Position, text: String, color: Rgb) -> DrawPrimitive {
    DrawPrimitive::Text { at, text, color, size: TEXT_SIZE }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn snapshot(robots: Vec<RobotState>) -> TrackerSnapshot {
        TrackerSnapshot { robots, reverse: false }
    }

    fn field_primitives(scene: &[DrawPrimitive], width: i32) -> Vec<&DrawPrimitive> {
        let inside = |p: &Position| p.x < f64::from(width);
        scene
            .iter()
            .filter(|primitive| match primitive {
                DrawPrimitive::Point { at, .. } | DrawPrimitive::Text { at, .. } => inside(at),
                DrawPrimitive::Line { from, .. } => inside(from),
                DrawPrimitive::Circle { center, .. } => inside(center),
                DrawPrimitive::FilledRect { .. } => false,
            })
            .collect()
    }

    fn tracked_robot() -> RobotState {
        RobotState {
            index: 1,
            role: Role::Attacker,
            message: "Attacker".to_string(),
            self_pose: FieldPoint::new(100, 50, FRAC_PI_2),
            self_pose_valid: true,
            ball: FieldPoint::new(140, 60, 0.0),
            ball_valid: true,
            goal_posts: [FieldPoint::new(10, 20, 0.0), FieldPoint::new(30, 40, 0.0)],
            goal_post_valid: [true, false],
            ..RobotState::new(1)
        }
    }

    #[test]
    fn idle_robots_only_get_status_panels() {
        let config = MonitorConfig::default();
        let scene = compose(&snapshot((0..6).map(RobotState::new).collect()), &config);

        assert!(field_primitives(&scene, config.field.image_width).is_empty());
        let panels = scene
            .iter()
            .filter(|p| matches!(p, DrawPrimitive::FilledRect { color: Rgb::PANEL_GREY, .. }))
            .count();
        assert_eq!(panels, 6);
    }

    #[test]
    fn tracked_robot_draws_marker_heading_post_and_ball() {
        let config = MonitorConfig::default();
        let scene = compose(&snapshot(vec![tracked_robot()]), &config);
        let field = field_primitives(&scene, config.field.image_width);

        assert_eq!(
            field[0],
            &DrawPrimitive::Point { at: Position::new(100.0, 50.0), color: Rgb::RED, size: 10 }
        );
        match field[1] {
            DrawPrimitive::Line { from, to, color, .. } => {
                assert_eq!(*from, Position::new(100.0, 50.0));
                assert!((to.x - 100.0).abs() < 1e-9);
                assert!((to.y - 66.0).abs() < 1e-9);
                assert_eq!(*color, Rgb::RED);
            }
            other => panic!("expected heading line, got {other:?}"),
        }
        assert!(matches!(field[2], DrawPrimitive::Text { text, .. } if text == "2"));

        let circles: Vec<_> =
            field.iter().filter(|p| matches!(p, DrawPrimitive::Circle { .. })).collect();
        assert_eq!(circles.len(), 1);
        assert!(field.contains(&&DrawPrimitive::Point {
            at: Position::new(140.0, 60.0),
            color: Rgb::ORANGE,
            size: 6,
        }));
    }

    #[test]
    fn non_attackers_are_black() {
        let robot = RobotState { role: Role::Keeper, ..tracked_robot() };
        let scene = compose(&snapshot(vec![robot]), &MonitorConfig::default());
        assert!(matches!(scene[0], DrawPrimitive::Point { color: Rgb::BLACK, .. }));
    }

    #[test]
    fn ball_requires_valid_self_pose() {
        let robot = RobotState { self_pose_valid: false, ..tracked_robot() };
        let config = MonitorConfig::default();
        let scene = compose(&snapshot(vec![robot]), &config);
        assert!(field_primitives(&scene, config.field.image_width).is_empty());
    }

    #[test]
    fn status_panel_text_uses_role_color_and_clamps() {
        let robot = RobotState {
            voltage: 12.0,
            fps: 30,
            self_confidence: 250,
            ball_confidence: 40,
            ..tracked_robot()
        };
        let scene = compose(&snapshot(vec![robot]), &MonitorConfig::default());
        let texts: Vec<(&str, Rgb)> = scene
            .iter()
            .filter_map(|p| match p {
                DrawPrimitive::Text { text, color, at, .. } if at.x >= 740.0 => {
                    Some((text.as_str(), *color))
                }
                _ => None,
            })
            .collect();

        assert_eq!(
            texts,
            vec![
                ("Robot 2", Rgb::BLACK),
                ("MAGENTA 0", Rgb::BLACK),
                ("Voltage: 12.00 V", Rgb::BLACK),
                ("FPS: 30", Rgb::BLACK),
                ("Attacker", Rgb::RED),
                ("Conf: self 100 / ball 40", Rgb::BLACK),
            ]
        );
    }

    #[test]
    fn panels_tile_two_per_row() {
        let config = MonitorConfig::default();
        assert_eq!(panel_origin(0, &config), Position::new(740.0, 0.0));
        assert_eq!(panel_origin(1, &config), Position::new(940.0, 0.0));
        assert_eq!(panel_origin(4, &config), Position::new(740.0, 240.0));
    }
}
