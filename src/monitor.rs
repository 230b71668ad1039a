//! Monitor task: the single serialization point for tracker mutations.
//!
//! Receive loops, the replay player and the public API all talk to the
//! tracker through one command queue. The task applies commands in arrival
//! order, runs the staleness tick on the same loop, records accepted packets,
//! and publishes an immutable snapshot after every change.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::MonitorConfig;
use crate::record::{LogRecord, LogWriter, wall_clock_stamp};
use crate::tracker::Tracker;
use crate::types::{TelemetryPacket, TrackerSnapshot};
use crate::Result;

/// Depth of the command queue shared by all producers.
pub const COMMAND_QUEUE: usize = 256;

/// Work items for the monitor task.
#[derive(Debug)]
pub enum MonitorCommand {
    /// Decoded packet from the channel of robot `index`
    Packet { index: usize, packet: TelemetryPacket, received_at: Instant },
    /// Historical record from the replay player
    Record(LogRecord),
    SetReverse(bool),
    StartRecording { path: PathBuf, reply: oneshot::Sender<Result<()>> },
    StopRecording { reply: oneshot::Sender<Result<Option<PathBuf>>> },
}

/// Result of spawning the monitor task.
pub struct MonitorChannels {
    /// Command queue into the task
    pub commands: mpsc::Sender<MonitorCommand>,
    /// Latest tracker snapshot
    pub snapshots: watch::Receiver<Arc<TrackerSnapshot>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// Completes once the task has closed any open session log
    pub task: JoinHandle<()>,
}

/// Monotonic "now" that follows tokio's clock, so paused-time tests see it move.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Spawns and owns the tracker task.
pub struct Monitor;

impl Monitor {
    /// Spawn the monitor task for `config`.
    pub fn spawn(config: Arc<MonitorConfig>) -> MonitorChannels {
        let tracker = Tracker::new(&config);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(tracker.snapshot()));
        let cancel = CancellationToken::new();

        let cancel_task = cancel.clone();
        let task = tokio::spawn(async move {
            Self::run(tracker, config, command_rx, snapshot_tx, cancel_task).await;
        });

        MonitorChannels { commands: command_tx, snapshots: snapshot_rx, cancel, task }
    }

    async fn run(
        mut tracker: Tracker,
        config: Arc<MonitorConfig>,
        mut commands: mpsc::Receiver<MonitorCommand>,
        snapshots: watch::Sender<Arc<TrackerSnapshot>>,
        cancel: CancellationToken,
    ) {
        info!("Monitor task started ({} robots)", tracker.robot_count());
        let mut writer = LogWriter::new();
        let timeout = config.staleness.timeout();
        let mut tick = tokio::time::interval(config.staleness.tick_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut packet_count = 0u64;

        loop {
            let changed = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Monitor task cancelled");
                    break;
                }
                command = commands.recv() => match command {
                    Some(command) => {
                        Self::handle(&mut tracker, &mut writer, command, &mut packet_count)
                    }
                    None => {
                        debug!("All command senders dropped");
                        break;
                    }
                },
                _ = tick.tick() => {
                    let expired = tracker.expire_stale(now(), timeout);
                    if !expired.is_empty() {
                        info!("Robots timed out: {:?}", expired);
                    }
                    !expired.is_empty()
                }
            };

            if changed {
                snapshots.send_replace(Arc::new(tracker.snapshot()));
            }
        }

        if let Err(e) = writer.stop_recording() {
            error!("Failed to close session log: {}", e);
        }
        info!("Monitor task ended (applied {} packets)", packet_count);
    }

    /// Apply one command. Returns whether the tracker changed.
    fn handle(
        tracker: &mut Tracker,
        writer: &mut LogWriter,
        command: MonitorCommand,
        packet_count: &mut u64,
    ) -> bool {
        match command {
            MonitorCommand::Packet { index, packet, received_at } => {
                match tracker.apply_packet(index, &packet, received_at) {
                    Ok(state) => {
                        *packet_count += 1;
                        trace!("Applied packet from robot {}", index);
                        if let Err(e) = writer.record_update(state, &wall_clock_stamp()) {
                            warn!("Failed to record update: {}", e);
                        }
                        true
                    }
                    Err(e) => {
                        warn!("Dropping packet: {}", e);
                        false
                    }
                }
            }
            MonitorCommand::Record(record) => match tracker.apply_record(&record, now()) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Skipping log record: {}", e);
                    false
                }
            },
            MonitorCommand::SetReverse(reverse) => {
                info!("Reverse field {}", if reverse { "on" } else { "off" });
                tracker.set_reverse(reverse);
                true
            }
            MonitorCommand::StartRecording { path, reply } => {
                let _ = reply.send(writer.start_recording(path));
                false
            }
            MonitorCommand::StopRecording { reply } => {
                let _ = reply.send(writer.stop_recording());
                false
            }
        }
    }
}
