//! Telemetry packet codec.
//!
//! Every robot sends one fixed 64-byte datagram per update:
//!
//! | Offset | Size | Field                                              |
//! |--------|------|----------------------------------------------------|
//! | 0      | 1    | bit 7 team color flag, bits 0-6 sender id          |
//! | 1      | 1    | self-position confidence                           |
//! | 2      | 1    | ball confidence                                    |
//! | 3      | 1    | reserved                                           |
//! | 4      | 1    | frames per second                                  |
//! | 5      | 1    | voltage, `volts * 100 >> 3`                        |
//! | 6      | 42   | role/message string, NUL padded                    |
//! | 48     | 16   | four observation words, little-endian `u32`        |
//!
//! Observation words are bit-packed:
//!
//! ```text
//!  31   29 28          18 17           7 6      0
//! +-------+--------------+--------------+--------+
//! |  tag  |  x (10 mm)   |  y (10 mm)   | theta  |
//! +-------+--------------+--------------+--------+
//! ```
//!
//! `x` and `y` are 11-bit two's complement in centimeters (±10.2 m), `theta` is
//! 7-bit two's complement in steps of π/64 radians.
//!
//! Decoding is pure. A buffer shorter than [`PACKET_SIZE`] is a
//! [`MonitorError::Decode`]; nothing is zero-filled.

use std::f64::consts::PI;

use crate::types::{OBSERVATION_SLOTS, Observation, ObservationKind, TelemetryPacket};
use crate::{MonitorError, Result};

/// Size of one telemetry datagram in bytes.
pub const PACKET_SIZE: usize = 64;
/// Capacity of the message field, NUL padding included.
pub const MESSAGE_CAPACITY: usize = 42;

const ID_OFFSET: usize = 0;
const SELF_CONFIDENCE_OFFSET: usize = 1;
const BALL_CONFIDENCE_OFFSET: usize = 2;
const FPS_OFFSET: usize = 4;
const VOLTAGE_OFFSET: usize = 5;
const MESSAGE_OFFSET: usize = 6;
const OBSERVATION_OFFSET: usize = MESSAGE_OFFSET + MESSAGE_CAPACITY;
const OBSERVATION_SIZE: usize = 4;

const TEAM_FLAG_MASK: u8 = 0x80;
const SENDER_ID_MASK: u8 = 0x7F;

const TAG_SHIFT: u32 = 29;
const X_SHIFT: u32 = 18;
const Y_SHIFT: u32 = 7;
const COORD_BITS: u32 = 11;
const THETA_BITS: u32 = 7;
const MM_PER_UNIT: i32 = 10;
const THETA_STEP: f64 = PI / 64.0;

/// Decode one datagram.
pub fn decode(buf: &[u8]) -> Result<TelemetryPacket> {
    if buf.len() < PACKET_SIZE {
        return Err(MonitorError::truncated(PACKET_SIZE, buf.len()));
    }

    let id = buf[ID_OFFSET];
    let message = &buf[MESSAGE_OFFSET..OBSERVATION_OFFSET];
    let message_len = message.iter().position(|&b| b == 0).unwrap_or(MESSAGE_CAPACITY);

    let mut observations = [Observation::default(); OBSERVATION_SLOTS];
    for (slot, observation) in observations.iter_mut().enumerate() {
        let start = OBSERVATION_OFFSET + slot * OBSERVATION_SIZE;
        let word = parse_u32_le(buf, start)?;
        *observation = decode_observation(word);
    }

    Ok(TelemetryPacket {
        sender_id: id & SENDER_ID_MASK,
        team_color_flag: (id & TEAM_FLAG_MASK) >> 7,
        voltage_raw: buf[VOLTAGE_OFFSET],
        fps: buf[FPS_OFFSET],
        self_confidence: buf[SELF_CONFIDENCE_OFFSET],
        ball_confidence: buf[BALL_CONFIDENCE_OFFSET],
        role_message: String::from_utf8_lossy(&message[..message_len]).into_owned(),
        observations,
    })
}

/// Encode a packet into its wire form.
///
/// Values that do not fit their fields saturate: the message is cut at
/// [`MESSAGE_CAPACITY`] - 1 bytes, coordinates clamp to ±10.24 m and headings
/// wrap into `[-π, π)`.
pub fn encode(packet: &TelemetryPacket) -> [u8; PACKET_SIZE] {
    let mut buf = [0u8; PACKET_SIZE];
    buf[ID_OFFSET] = (packet.sender_id & SENDER_ID_MASK) | ((packet.team_color_flag & 1) << 7);
    buf[SELF_CONFIDENCE_OFFSET] = packet.self_confidence;
    buf[BALL_CONFIDENCE_OFFSET] = packet.ball_confidence;
    buf[FPS_OFFSET] = packet.fps;
    buf[VOLTAGE_OFFSET] = packet.voltage_raw;

    let message = truncate_utf8(&packet.role_message, MESSAGE_CAPACITY - 1);
    buf[MESSAGE_OFFSET..MESSAGE_OFFSET + message.len()].copy_from_slice(message.as_bytes());

    for (slot, observation) in packet.observations.iter().enumerate() {
        let start = OBSERVATION_OFFSET + slot * OBSERVATION_SIZE;
        buf[start..start + OBSERVATION_SIZE]
            .copy_from_slice(&encode_observation(observation).to_le_bytes());
    }
    buf
}

fn decode_observation(word: u32) -> Observation {
    let tag = (word >> TAG_SHIFT) as u8;
    let x = sign_extend((word >> X_SHIFT) & field_mask(COORD_BITS), COORD_BITS);
    let y = sign_extend((word >> Y_SHIFT) & field_mask(COORD_BITS), COORD_BITS);
    let theta = sign_extend(word & field_mask(THETA_BITS), THETA_BITS);

    Observation {
        kind: ObservationKind::from_tag(tag),
        x_mm: x * MM_PER_UNIT,
        y_mm: y * MM_PER_UNIT,
        theta: f64::from(theta) * THETA_STEP,
    }
}

fn encode_observation(observation: &Observation) -> u32 {
    let tag = u32::from(observation.kind.tag() & 0x7);
    let x = quantize_mm(observation.x_mm) & field_mask(COORD_BITS);
    let y = quantize_mm(observation.y_mm) & field_mask(COORD_BITS);
    let theta = quantize_theta(observation.theta) & field_mask(THETA_BITS);
    (tag << TAG_SHIFT) | (x << X_SHIFT) | (y << Y_SHIFT) | theta
}

fn quantize_mm(mm: i32) -> u32 {
    let max = (1 << (COORD_BITS - 1)) - 1;
    let units = (f64::from(mm) / f64::from(MM_PER_UNIT)).round() as i32;
    units.clamp(-max - 1, max) as u32
}

fn quantize_theta(theta: f64) -> u32 {
    if !theta.is_finite() {
        return 0;
    }
    let mut wrapped = theta.rem_euclid(2.0 * PI);
    if wrapped >= PI {
        wrapped -= 2.0 * PI;
    }
    let half = 1 << (THETA_BITS - 1);
    let mut units = (wrapped / THETA_STEP).round() as i32;
    if units >= half {
        units -= 2 * half;
    }
    units as u32
}

fn field_mask(bits: u32) -> u32 {
    (1 << bits) - 1
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

fn truncate_utf8(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn parse_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| MonitorError::truncated(offset + 4, data.len()))
}
