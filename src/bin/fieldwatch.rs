//! Headless field monitor.
//!
//! ```text
//! fieldwatch [config.yaml] [--record FILE] [--replay FILE] [--speed 1|2|5] [--reverse]
//! ```
//!
//! Without `--replay` it listens on the robot ports. Status is logged once a
//! second until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use fieldwatch::{FieldMonitor, MonitorConfig, ReplaySpeed, TrackerSnapshot};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fieldwatch")]
#[command(about = "Live field monitor for robot soccer telemetry", long_about = None)]
struct Cli {
    /// YAML configuration file
    config: Option<PathBuf>,

    /// Append accepted packets to this session log
    #[arg(long)]
    record: Option<PathBuf>,

    /// Replay this session log instead of listening
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Replay speed multiplier (1, 2 or 5)
    #[arg(long, default_value = "1", value_parser = parse_speed)]
    speed: ReplaySpeed,

    /// Mirror the field
    #[arg(long)]
    reverse: bool,
}

fn parse_speed(value: &str) -> Result<ReplaySpeed, String> {
    let multiplier: u64 = value.parse().map_err(|_| format!("not a number: {value:?}"))?;
    ReplaySpeed::from_multiplier(multiplier)
        .ok_or_else(|| format!("speed must be 1, 2 or 5, got {multiplier}"))
}

fn log_status(snapshot: &TrackerSnapshot) {
    for robot in snapshot.robots.iter().filter(|r| r.has_reported()) {
        let pose = if robot.self_pose_valid {
            format!("({}, {})", robot.self_pose.x, robot.self_pose.y)
        } else {
            "lost".to_string()
        };
        info!(
            robot = robot.number(),
            name = %robot.display_name(),
            role = ?robot.role,
            voltage = %format!("{:.2}", robot.voltage),
            pose = %pose,
            ball = robot.ball_valid,
            "{}",
            robot.message
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Cli::parse();
    let config = match &args.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => MonitorConfig::default(),
    };

    let mut monitor = FieldMonitor::start(config)?;
    if args.reverse {
        monitor.set_reverse(true).await?;
    }
    if let Some(path) = &args.record {
        monitor.start_recording(path).await?;
        info!("Recording to {}", path.display());
    }

    match &args.replay {
        Some(path) => {
            let replay = monitor.replay();
            replay.set_speed(args.speed).await?;
            replay.load_file(path).await?;
            replay.play().await?;
        }
        None => monitor.set_receiving(true).await?,
    }

    let mut status = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = status.tick() => log_status(&monitor.snapshot()),
        }
    }

    info!("Shutting down");
    if let Some(path) = monitor.stop_recording().await? {
        info!("Session log written to {}", path.display());
    }
    monitor.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "fieldwatch",
            "field.yaml",
            "--record",
            "out.log",
            "--replay",
            "in.log",
            "--speed",
            "5",
            "--reverse",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("field.yaml")));
        assert_eq!(cli.record, Some(PathBuf::from("out.log")));
        assert_eq!(cli.replay, Some(PathBuf::from("in.log")));
        assert_eq!(cli.speed, ReplaySpeed::X5);
        assert!(cli.reverse);
    }

    #[test]
    fn defaults_to_live_at_normal_speed() {
        let cli = Cli::try_parse_from(["fieldwatch"]).unwrap();
        assert!(cli.config.is_none() && cli.replay.is_none());
        assert_eq!(cli.speed, ReplaySpeed::X1);
        assert!(!cli.reverse);
    }

    #[test]
    fn rejects_unsupported_speed() {
        assert!(Cli::try_parse_from(["fieldwatch", "--speed", "3"]).is_err());
        assert!(Cli::try_parse_from(["fieldwatch", "--speed", "fast"]).is_err());
    }
}
