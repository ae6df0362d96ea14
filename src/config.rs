// Loop rates, error bounds, serial defaults and the loadable robot configuration
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

// Operator-control loop frequency
pub const LOOP_HZ: u64 = 50;

// Turn loop tolerance (degrees) and how many consecutive in-band samples end it
pub const ERROR_BOUND_TURN: f64 = 0.5;
pub const TURN_FINAL_ITERATIONS: u32 = 3;

// Position loop tolerance (wheel revolutions) and its fixed output bound
pub const ERROR_BOUND_DRIVE: f64 = 0.001;
pub const POSITION_MAX_OUTPUT: f64 = 128.0;

// Encoder co-processor link
pub const SYNC_MARKER: u8 = 0x80;
pub const ENCODER_BAUDRATE: u32 = 115_200;
pub const ENCODER_PORT: &str = "/dev/ttyUSB0";

// Button-triggered fixed turn used during operator control
pub const QUICK_TURN_DEGREES: f64 = 90.0;

// Distance driven when the operator presses the drive button (inches)
pub const OPCONTROL_DRIVE_INCHES: f64 = 20.0;

/// Gains for the heading loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Loop period in milliseconds, also the time delta of the I and D terms
    pub period_ms: f64,
    pub min_output: f64,
    pub max_output: f64,
}

impl Default for TurnGains {
    fn default() -> Self {
        Self {
            kp: 1.2,
            ki: 0.0,
            kd: 0.0,
            period_ms: 10.0,
            min_output: 10.0,
            max_output: 100.0,
        }
    }
}

/// Gains for the linear distance loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub period_ms: f64,
}

impl Default for PositionGains {
    fn default() -> Self {
        Self {
            kp: 64.0,
            ki: 0.015,
            kd: 0.0,
            period_ms: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub count: usize,
    pub ppr: i32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self { count: 3, ppr: 360 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSettings {
    pub port: String,
    pub baudrate: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: ENCODER_PORT.to_string(),
            baudrate: ENCODER_BAUDRATE,
        }
    }
}

/// Everything needed to bring up a drive base, loadable from JSON
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub wheel: WheelSettings,
    pub turn: TurnGains,
    pub position: PositionGains,
    pub encoders: EncoderSettings,
    pub serial: SerialSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelSettings {
    /// Wheel diameter in inches; circumference is pi * diameter
    pub diameter: f64,
}

impl Default for WheelSettings {
    fn default() -> Self {
        Self { diameter: 4.0 }
    }
}

impl RobotConfig {
    /// Read a JSON config file; missing fields fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!("Loaded robot config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
