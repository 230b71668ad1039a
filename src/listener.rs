//! Multi-channel telemetry listener.
//!
//! One receive loop per robot. Each loop owns its [`Channel`], decodes every
//! datagram and forwards the packet to the monitor task tagged with the robot
//! index the channel belongs to. Loops are independent of each other and a
//! malformed datagram only costs that one packet.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec;
use crate::config::MonitorConfig;
use crate::monitor::{self, MonitorCommand};
use crate::{MonitorError, Result};

/// Receive buffer size. Larger than any valid datagram so oversize input is
/// seen whole and then handled by the decoder.
pub const RECEIVE_BUFFER: usize = 2048;

/// Consecutive transport errors after which a loop gives up.
const MAX_ERRORS: u32 = 10;

/// Transport for one robot's datagrams.
#[async_trait::async_trait]
pub trait Channel: Send + 'static {
    /// Wait for the next datagram and copy it into `buf`.
    ///
    /// Returns:
    /// - `Ok(Some(len))` - A datagram of `len` bytes was received
    /// - `Ok(None)` - The transport closed (normal termination)
    /// - `Err(e)` - Transport failure
    async fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>>;
}

/// UDP socket bound to one robot's port.
pub struct UdpChannel {
    socket: UdpSocket,
}

impl UdpChannel {
    pub async fn bind(address: &str, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind((address, port)).await.map_err(|e| {
            MonitorError::network_with_source(format!("cannot bind {address}:{port}"), Box::new(e))
        })?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| MonitorError::network_with_source("socket has no local address", Box::new(e)))
    }
}

#[async_trait::async_trait]
impl Channel for UdpChannel {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.socket.recv_from(buf).await {
            Ok((len, from)) => {
                trace!("{} bytes from {}", len, from);
                Ok(Some(len))
            }
            Err(e) => Err(MonitorError::network_with_source("receive failed", Box::new(e))),
        }
    }
}

/// Starts and stops the per-robot receive loops.
///
/// Stopping never touches tracked state; it only ends the loops and releases
/// their sockets.
pub struct Listener {
    config: Arc<MonitorConfig>,
    sink: mpsc::Sender<MonitorCommand>,
    shutdown: CancellationToken,
    active: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

impl Listener {
    /// Loops forward packets to `sink` and all end when `shutdown` is cancelled.
    pub fn new(
        config: Arc<MonitorConfig>,
        sink: mpsc::Sender<MonitorCommand>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { config, sink, shutdown, active: None, tasks: Vec::new() }
    }

    /// True while at least one receive loop is still running.
    pub fn is_active(&self) -> bool {
        self.active.is_some() && self.tasks.iter().any(|task| !task.is_finished())
    }

    // Drop handles of loops that ended on their own (closed transport or
    // error budget); with none left the listener is inactive again.
    fn reap(&mut self) {
        self.tasks.retain(|task| !task.is_finished());
        if self.tasks.is_empty() {
            if let Some(token) = self.active.take() {
                token.cancel();
            }
        }
    }

    /// Start or stop receiving on every configured robot port.
    ///
    /// Starting binds all sockets before any loop runs, so a port conflict
    /// leaves the listener inactive with nothing bound.
    pub async fn set_active(&mut self, active: bool) -> Result<()> {
        if !active {
            self.stop().await;
            return Ok(());
        }
        self.reap();
        if self.is_active() {
            return Ok(());
        }

        let network = &self.config.network;
        let mut channels = Vec::with_capacity(network.robot_count);
        for index in 0..network.robot_count {
            let port = network.port_for(index).ok_or_else(|| {
                MonitorError::config(format!("no port for robot index {index}"))
            })?;
            channels.push(UdpChannel::bind(&network.bind_address, port).await?);
        }
        info!(
            base_port = network.base_port,
            robots = network.robot_count,
            "Listening on {}",
            network.bind_address
        );

        for (index, channel) in channels.into_iter().enumerate() {
            self.attach(index, channel);
        }
        Ok(())
    }

    /// Run a receive loop for robot `index` over any transport.
    ///
    /// Marks the listener active if it was not already.
    pub fn attach<C: Channel>(&mut self, index: usize, channel: C) {
        self.reap();
        let token = self.active.get_or_insert_with(|| self.shutdown.child_token()).clone();
        let sink = self.sink.clone();
        self.tasks.push(tokio::spawn(receive_loop(index, channel, sink, token)));
    }

    /// Cancel every loop and wait until all of them have exited.
    pub async fn stop(&mut self) {
        let Some(token) = self.active.take() else {
            return;
        };
        token.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("Receive loop panicked: {}", e);
            }
        }
        info!("Listener stopped");
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(token) = &self.active {
            token.cancel();
        }
    }
}

async fn receive_loop<C: Channel>(
    index: usize,
    mut channel: C,
    sink: mpsc::Sender<MonitorCommand>,
    cancel: CancellationToken,
) {
    debug!("Receive loop for robot {} started", index);
    let mut buf = [0u8; RECEIVE_BUFFER];
    let mut packet_count = 0u64;
    let mut error_count = 0u32;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = channel.recv(&mut buf) => result,
        };

        match result {
            Ok(Some(len)) => {
                error_count = 0;
                let packet = match codec::decode(&buf[..len]) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!("Robot {}: dropping datagram: {}", index, e);
                        continue;
                    }
                };
                packet_count += 1;
                let command = MonitorCommand::Packet { index, packet, received_at: monitor::now() };
                let sent = tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = sink.send(command) => sent,
                };
                if sent.is_err() {
                    debug!("Monitor dropped, stopping receive loop {}", index);
                    break;
                }
            }
            Ok(None) => {
                info!("Channel for robot {} closed", index);
                break;
            }
            Err(e) => {
                error_count += 1;
                error!("Robot {} receive error ({}/{}): {}", index, error_count, MAX_ERRORS, e);
                if error_count >= MAX_ERRORS {
                    error!("Too many receive errors, giving up on robot {}", index);
                    break;
                }

                // 100ms, 200ms, ... capped at 1.6s
                let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }

    debug!("Receive loop for robot {} ended ({} packets)", index, packet_count);
}
