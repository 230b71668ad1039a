//! Monitor configuration.
//!
//! Configuration is an immutable value handed to the projector, tracker and
//! scene composer at construction. It is usually loaded from YAML; every key
//! is optional and falls back to the defaults used on the competition field.
//!
//! ```rust
//! use fieldwatch::MonitorConfig;
//!
//! let config = MonitorConfig::from_yaml_str(
//!     "network:\n  base_port: 9000\nstaleness:\n  timeout_secs: 2.5\n",
//! )
//! .unwrap();
//! assert_eq!(config.network.base_port, 9000);
//! assert_eq!(config.field.image_width, 740);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{MonitorError, Result};

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub field: FieldConfig,
    pub markers: MarkerConfig,
    pub network: NetworkConfig,
    pub staleness: StalenessConfig,
}

/// Display image and physical field dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Field image width in pixels
    pub image_width: i32,
    /// Field image height in pixels
    pub image_height: i32,
    /// Physical field length in millimeters (robot map size)
    pub size_x_mm: f64,
    /// Physical field width in millimeters
    pub size_y_mm: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self { image_width: 740, image_height: 540, size_x_mm: 10000.0, size_y_mm: 7000.0 }
    }
}

/// Marker sizes used by the scene composer, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub robot_size: u32,
    pub ball_size: u32,
    /// Length of the heading line drawn from a robot marker
    pub length: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self { robot_size: 10, ball_size: 6, length: 16 }
    }
}

/// Receive channel layout: robot `i` listens on `base_port + i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub base_port: u16,
    pub robot_count: usize,
    pub bind_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { base_port: 7110, robot_count: 6, bind_address: "0.0.0.0".to_string() }
    }
}

impl NetworkConfig {
    /// Port for the given robot index.
    pub fn port_for(&self, index: usize) -> Option<u16> {
        u16::try_from(index).ok().and_then(|i| self.base_port.checked_add(i))
    }
}

/// Data expiry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    /// A robot silent for longer than this is shown as lost
    pub timeout_secs: f64,
    /// How often expiry is evaluated
    pub tick_interval_ms: u64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self { timeout_secs: 5.0, tick_interval_ms: 1000 }
    }
}

impl StalenessConfig {
    /// Saturates at [`Duration::MAX`] for values no `Duration` can hold.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::MAX)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl MonitorConfig {
    /// Load and validate a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null, which means "all defaults".
        let config: Self =
            if yaml.trim().is_empty() { Self::default() } else { serde_yaml_ng::from_str(yaml)? };
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration back to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject values the projector and tracker cannot work with.
    pub fn validate(&self) -> Result<()> {
        let field = &self.field;
        if field.image_width <= 0 || field.image_height <= 0 {
            return Err(MonitorError::config(format!(
                "field image must be positive, got {}x{}",
                field.image_width, field.image_height
            )));
        }
        if !(field.size_x_mm > 0.0 && field.size_y_mm > 0.0) {
            return Err(MonitorError::config(format!(
                "field size must be positive, got {}x{} mm",
                field.size_x_mm, field.size_y_mm
            )));
        }
        let markers = &self.markers;
        if markers.robot_size == 0 || markers.ball_size == 0 || markers.length == 0 {
            return Err(MonitorError::config("marker sizes must be positive"));
        }
        if self.network.robot_count == 0 {
            return Err(MonitorError::config("robot_count must be at least 1"));
        }
        if self.network.port_for(self.network.robot_count - 1).is_none() {
            return Err(MonitorError::config(format!(
                "base_port {} + robot_count {} overflows the port range",
                self.network.base_port, self.network.robot_count
            )));
        }
        let timeout_secs = self.staleness.timeout_secs;
        if !(timeout_secs > 0.0 && timeout_secs.is_finite()) {
            return Err(MonitorError::config("staleness timeout must be positive"));
        }
        if Duration::try_from_secs_f64(timeout_secs).is_err() {
            return Err(MonitorError::config(format!(
                "staleness timeout {timeout_secs} s is out of range"
            )));
        }
        if self.staleness.tick_interval_ms == 0 {
            return Err(MonitorError::config("staleness tick interval must be positive"));
        }
        Ok(())
    }
}
