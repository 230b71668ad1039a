//! Core data types shared by every component.
//!
//! - [`TelemetryPacket`] and [`Observation`] are what the codec produces
//! - [`RobotState`] and [`TrackerSnapshot`] are what the tracker maintains
//! - [`Role`], [`TeamColor`] and [`Rgb`] drive display coloring
//!
//! ```rust
//! use fieldwatch::types::{Role, Rgb};
//!
//! assert_eq!(Role::classify("Attacker: chasing ball"), Role::Attacker);
//! assert_eq!(Role::Keeper.color(), Rgb::ORANGE);
//! ```

mod color;
mod packet;
mod role;
mod state;

pub use color::Rgb;
pub use packet::{OBSERVATION_SLOTS, Observation, ObservationKind, TelemetryPacket};
pub use role::{Role, TeamColor};
pub use state::{FieldPoint, RobotState, TrackerSnapshot};
