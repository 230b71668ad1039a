//! Live field monitor for multi-robot soccer telemetry.
//!
//! Fieldwatch listens to one UDP channel per robot, decodes the fixed 64-byte
//! telemetry packets, tracks each robot's pose, ball and goal-post sightings
//! with staleness expiry, and projects everything into display pixels. Sessions
//! can be recorded to a plain text log and replayed later with the original
//! timing at 1x, 2x or 5x speed.
//!
//! # Features
//!
//! - **Live ingestion**: independent receive loops, one per robot port
//! - **Single writer**: every tracker mutation goes through one task
//! - **Record and replay**: comma-separated session logs, pause and seek
//! - **Renderer neutral**: scenes are plain lists of draw primitives
//!
//! ## Example
//!
//! ```rust,no_run
//! use fieldwatch::{FieldMonitor, MonitorConfig};
//! use futures::StreamExt;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> fieldwatch::Result<()> {
//!     let mut monitor = FieldMonitor::start(MonitorConfig::load("fieldwatch.yaml")?)?;
//!     monitor.set_receiving(true).await?;
//!     monitor.start_recording("session.log").await?;
//!
//!     let mut scenes = monitor.scenes(Duration::from_millis(100));
//!     while let Some(scene) = scenes.next().await {
//!         println!("{} primitives", scene.len());
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(test)]
mod test_utils;
pub mod types;

// Ingestion and state
pub mod codec;
pub mod listener;
pub mod monitor;
pub mod projection;
pub mod tracker;

// Session logs
pub mod record;
pub mod replay;

// Rendering boundary
pub mod scene;

pub use config::*;
pub use error::*;
pub use types::*;

pub use listener::{Channel, Listener, UdpChannel};
pub use monitor::{Monitor, MonitorCommand};
pub use record::{LogRecord, LogWriter};
pub use replay::{ReplayHandle, ReplaySpeed, ReplayState, ReplayStatus};
pub use scene::{DrawPrimitive, Position, compose};

use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::{IntervalStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Shortest period [`FieldMonitor::scenes`] will tick at.
pub const MIN_SCENE_REFRESH: Duration = Duration::from_millis(1);

/// A running monitor: tracker task, replay player and listener.
///
/// Live packets and replayed records feed the same tracker, so switching
/// between them never loses tracked state.
///
/// ```rust,no_run
/// use fieldwatch::{FieldMonitor, MonitorConfig, ReplaySpeed};
///
/// # async fn demo() -> fieldwatch::Result<()> {
/// let monitor = FieldMonitor::start(MonitorConfig::default())?;
/// let replay = monitor.replay();
/// replay.set_speed(ReplaySpeed::X2).await?;
/// replay.load_file("session.log").await?;
/// replay.play().await?;
/// # Ok(())
/// # }
/// ```
pub struct FieldMonitor {
    config: Arc<MonitorConfig>,
    commands: mpsc::Sender<MonitorCommand>,
    snapshots: watch::Receiver<Arc<TrackerSnapshot>>,
    listener: Listener,
    replay: ReplayHandle,
    cancel: CancellationToken,
    monitor_task: JoinHandle<()>,
}

impl FieldMonitor {
    /// Validate `config` and spawn the background tasks.
    ///
    /// Must be called inside a Tokio runtime. The listener starts inactive.
    pub fn start(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let channels = Monitor::spawn(Arc::clone(&config));
        let replay = replay::player::spawn(channels.commands.clone(), channels.cancel.child_token());
        let listener =
            Listener::new(Arc::clone(&config), channels.commands.clone(), channels.cancel.clone());

        info!("Field monitor started ({} robots)", config.network.robot_count);
        Ok(Self {
            config,
            commands: channels.commands,
            snapshots: channels.snapshots,
            listener,
            replay,
            cancel: channels.cancel,
            monitor_task: channels.task,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start or stop the per-robot receive loops.
    pub async fn set_receiving(&mut self, active: bool) -> Result<()> {
        self.listener.set_active(active).await
    }

    pub fn is_receiving(&self) -> bool {
        self.listener.is_active()
    }

    /// Direct access to the listener, e.g. to attach custom channels.
    pub fn listener_mut(&mut self) -> &mut Listener {
        &mut self.listener
    }

    /// Control handle for log replay.
    pub fn replay(&self) -> ReplayHandle {
        self.replay.clone()
    }

    /// Mirror the field for packets applied from now on.
    pub async fn set_reverse(&self, reverse: bool) -> Result<()> {
        self.send(MonitorCommand::SetReverse(reverse)).await
    }

    /// Open `path` for appending and record every accepted live packet.
    pub async fn start_recording<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(MonitorCommand::StartRecording { path: path.as_ref().to_path_buf(), reply })
            .await?;
        response.await.map_err(|_| MonitorError::ChannelClosed { component: "monitor" })?
    }

    /// Close the session log. Returns the path that was being written, if any.
    pub async fn stop_recording(&self) -> Result<Option<PathBuf>> {
        let (reply, response) = oneshot::channel();
        self.send(MonitorCommand::StopRecording { reply }).await?;
        response.await.map_err(|_| MonitorError::ChannelClosed { component: "monitor" })?
    }

    /// Decode a raw datagram for robot `index` and apply it as a live packet.
    pub async fn ingest(&self, index: usize, datagram: &[u8]) -> Result<()> {
        let packet = codec::decode(datagram)?;
        self.send(MonitorCommand::Packet { index, packet, received_at: monitor::now() }).await
    }

    /// Latest published tracker state.
    pub fn snapshot(&self) -> Arc<TrackerSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Stream of tracker snapshots, starting with the current one.
    pub fn snapshots(&self) -> impl Stream<Item = Arc<TrackerSnapshot>> + 'static {
        WatchStream::new(self.snapshots.clone())
    }

    /// Compose the current scene.
    pub fn scene(&self) -> Vec<DrawPrimitive> {
        compose(&self.snapshot(), &self.config)
    }

    /// One composed scene per `refresh` tick.
    ///
    /// Refresh periods below [`MIN_SCENE_REFRESH`] are raised to it.
    pub fn scenes(&self, refresh: Duration) -> impl Stream<Item = Vec<DrawPrimitive>> + 'static {
        let snapshots = self.snapshots.clone();
        let config = Arc::clone(&self.config);
        let mut ticks = tokio::time::interval(refresh.max(MIN_SCENE_REFRESH));
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        IntervalStream::new(ticks).map(move |_| {
            let snapshot = snapshots.borrow().clone();
            compose(&snapshot, &config)
        })
    }

    /// Stop listening and replay, then wait for the session log to close.
    pub async fn shutdown(mut self) {
        self.listener.stop().await;
        self.cancel.cancel();
        if let Err(e) = (&mut self.monitor_task).await {
            tracing::error!("Monitor task panicked: {}", e);
        }
        info!("Field monitor shut down");
    }

    async fn send(&self, command: MonitorCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MonitorError::ChannelClosed { component: "monitor" })
    }
}

impl Drop for FieldMonitor {
    fn drop(&mut self) {
        debug!("Dropping field monitor");
        self.cancel.cancel();
    }
}
