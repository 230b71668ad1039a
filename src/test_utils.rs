//! Test utilities for building telemetry packets and log fixtures
//!
//! Only compiled for unit tests.

#![cfg(test)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::Result;
use crate::listener::Channel;
use crate::types::{OBSERVATION_SLOTS, Observation, TelemetryPacket};

/// Fluent builder for [`TelemetryPacket`] values.
///
/// Observations fill the next free slot in call order; extra ones are dropped.
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    packet: TelemetryPacket,
    next_slot: usize,
}

impl PacketBuilder {
    pub fn new(sender_id: u8) -> Self {
        Self {
            packet: TelemetryPacket {
                sender_id,
                voltage_raw: 150,
                fps: 30,
                self_confidence: 80,
                ball_confidence: 60,
                ..Default::default()
            },
            next_slot: 0,
        }
    }

    pub fn team(mut self, flag: u8) -> Self {
        self.packet.team_color_flag = flag;
        self
    }

    pub fn confidences(mut self, own: u8, ball: u8) -> Self {
        self.packet.self_confidence = own;
        self.packet.ball_confidence = ball;
        self
    }

    pub fn fps(mut self, fps: u8) -> Self {
        self.packet.fps = fps;
        self
    }

    pub fn voltage_raw(mut self, raw: u8) -> Self {
        self.packet.voltage_raw = raw;
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.packet.role_message = message.to_string();
        self
    }

    pub fn self_pose(self, x_mm: i32, y_mm: i32, theta: f64) -> Self {
        self.observation(Observation::self_pose(x_mm, y_mm, theta))
    }

    pub fn ball(self, x_mm: i32, y_mm: i32) -> Self {
        self.observation(Observation::ball(x_mm, y_mm))
    }

    pub fn goal_post(self, x_mm: i32, y_mm: i32) -> Self {
        self.observation(Observation::goal_post(x_mm, y_mm))
    }

    pub fn observation(mut self, observation: Observation) -> Self {
        if self.next_slot < OBSERVATION_SLOTS {
            self.packet.observations[self.next_slot] = observation;
            self.next_slot += 1;
        }
        self
    }

    pub fn build(self) -> TelemetryPacket {
        self.packet
    }
}

/// A unique path in the system temp directory, removed by the caller.
pub fn temp_log_path(tag: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("fieldwatch-{}-{}-{}.log", tag, std::process::id(), n))
}

/// Log lines for robot 0 at the given timestamps, ball moving along x.
pub fn timed_lines(times: &[&str]) -> Vec<String> {
    times
        .iter()
        .enumerate()
        .map(|(i, time)| {
            format!(
                "{time},0,MAGENTA,1,30,12.00,80,60,1,{},{},0.0000,1,100,100,0,0,0,0,0,0,row {i}",
                100 + i,
                200 + i
            )
        })
        .collect()
}

/// In-memory [`Channel`] fed through an mpsc sender. Dropping the sender
/// closes the channel.
pub struct MemoryChannel {
    datagrams: mpsc::Receiver<Result<Vec<u8>>>,
}

impl MemoryChannel {
    pub fn new() -> (Self, mpsc::Sender<Result<Vec<u8>>>) {
        let (feed, datagrams) = mpsc::channel(16);
        (Self { datagrams }, feed)
    }
}

#[async_trait::async_trait]
impl Channel for MemoryChannel {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.datagrams.recv().await {
            Some(Ok(bytes)) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(Some(len))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
