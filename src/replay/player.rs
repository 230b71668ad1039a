//! Replay player task.
//!
//! Owns a [`ReplaySession`] and one optional one-shot timer. Control commands
//! and timer expiry are handled on the same task, so a pause or seek can never
//! race a record being applied. Records are forwarded to the monitor task,
//! which is the single point where tracker mutations happen.

use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Sleep, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{ReplaySession, ReplaySpeed, ReplayState};
use crate::monitor::MonitorCommand;
use crate::record::LogRecord;
use crate::{MonitorError, Result};

const COMMAND_QUEUE: usize = 32;

/// Published replay position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayStatus {
    pub state: ReplayState,
    pub cursor: usize,
    pub len: usize,
    pub speed: ReplaySpeed,
}

impl ReplayStatus {
    fn of(session: &ReplaySession) -> Self {
        Self {
            state: session.state(),
            cursor: session.cursor(),
            len: session.len(),
            speed: session.speed(),
        }
    }
}

enum ReplayCommand {
    Load(Vec<String>),
    Play,
    Pause,
    Seek { index: usize, reply: oneshot::Sender<Result<()>> },
    SetSpeed(ReplaySpeed),
    Stop,
}

/// Cloneable control handle for the replay player.
#[derive(Clone)]
pub struct ReplayHandle {
    commands: mpsc::Sender<ReplayCommand>,
    status: watch::Receiver<ReplayStatus>,
}

impl ReplayHandle {
    /// Load log lines already in memory. The first record is applied at once.
    pub async fn load_lines<I, S>(&self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(ReplayCommand::Load(lines.into_iter().map(Into::into).collect())).await
    }

    /// Read a whole log file and load it.
    ///
    /// A missing or unreadable file loads zero records instead of failing.
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let lines = match tokio::fs::read_to_string(path).await {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(e) => {
                warn!("Cannot read session log {}: {}", path.display(), e);
                Vec::new()
            }
        };
        info!("Loading session log {}", path.display());
        self.send(ReplayCommand::Load(lines)).await
    }

    pub async fn play(&self) -> Result<()> {
        self.send(ReplayCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(ReplayCommand::Pause).await
    }

    /// Jump to record `index` and apply it immediately.
    pub async fn seek(&self, index: usize) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(ReplayCommand::Seek { index, reply }).await?;
        response.await.map_err(|_| MonitorError::ChannelClosed { component: "replay player" })?
    }

    pub async fn set_speed(&self, speed: ReplaySpeed) -> Result<()> {
        self.send(ReplayCommand::SetSpeed(speed)).await
    }

    /// Cancel any pending timer and unload the log.
    pub async fn stop(&self) -> Result<()> {
        self.send(ReplayCommand::Stop).await
    }

    /// Current replay position.
    pub fn status(&self) -> ReplayStatus {
        *self.status.borrow()
    }

    /// Watch receiver for status changes.
    pub fn watch_status(&self) -> watch::Receiver<ReplayStatus> {
        self.status.clone()
    }

    async fn send(&self, command: ReplayCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MonitorError::ChannelClosed { component: "replay player" })
    }
}

/// Spawn the player task. Records are sent to `sink` as they come due.
pub fn spawn(sink: mpsc::Sender<MonitorCommand>, cancel: CancellationToken) -> ReplayHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (status_tx, status_rx) = watch::channel(ReplayStatus::default());

    tokio::spawn(async move {
        Player { session: ReplaySession::new(), timer: None, sink, status: status_tx }
            .run(command_rx, cancel)
            .await;
    });

    ReplayHandle { commands: command_tx, status: status_rx }
}

struct Player {
    session: ReplaySession,
    timer: Option<Pin<Box<Sleep>>>,
    sink: mpsc::Sender<MonitorCommand>,
    status: watch::Sender<ReplayStatus>,
}

impl Player {
    async fn run(mut self, mut commands: mpsc::Receiver<ReplayCommand>, cancel: CancellationToken) {
        debug!("Replay player started");
        loop {
            let keep_running = tokio::select! {
                _ = cancel.cancelled() => false,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => false,
                },
                _ = fire(&mut self.timer), if self.timer.is_some() => {
                    self.timer = None;
                    self.on_timer().await
                }
            };
            self.status.send_replace(ReplayStatus::of(&self.session));
            if !keep_running {
                break;
            }
        }
        debug!("Replay player stopped");
    }

    async fn handle(&mut self, command: ReplayCommand) -> bool {
        match command {
            ReplayCommand::Load(lines) => {
                self.timer = None;
                match self.session.load(lines).cloned() {
                    Some(first) => self.apply(first).await,
                    None => true,
                }
            }
            ReplayCommand::Play => {
                if let Some(delay) = self.session.play() {
                    self.arm(Some(delay));
                }
                true
            }
            ReplayCommand::Pause => {
                if self.session.pause() {
                    self.timer = None;
                    info!("Replay paused at record {}", self.session.cursor());
                }
                true
            }
            ReplayCommand::Seek { index, reply } => match self.session.seek(index) {
                Ok(step) => {
                    self.timer = None;
                    self.arm(step.next_delay);
                    let _ = reply.send(Ok(()));
                    self.apply(step.record).await
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                    true
                }
            },
            ReplayCommand::SetSpeed(speed) => {
                self.session.set_speed(speed);
                debug!("Replay speed set to {}x", speed.multiplier());
                true
            }
            ReplayCommand::Stop => {
                self.timer = None;
                self.session.stop();
                info!("Replay stopped");
                true
            }
        }
    }

    async fn on_timer(&mut self) -> bool {
        match self.session.advance() {
            Some(step) => {
                self.arm(step.next_delay);
                self.apply(step.record).await
            }
            None => true,
        }
    }

    fn arm(&mut self, delay: Option<Duration>) {
        self.timer = delay.map(|delay| {
            trace!("Replay timer armed for {:?}", delay);
            Box::pin(sleep(delay))
        });
    }

    /// Forward a record to the monitor. Returns false once the monitor is gone.
    async fn apply(&mut self, record: LogRecord) -> bool {
        if self.sink.send(MonitorCommand::Record(record)).await.is_err() {
            debug!("Monitor dropped, stopping replay player");
            return false;
        }
        true
    }
}

async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
