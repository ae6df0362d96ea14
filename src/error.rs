use std::time::Duration;

/// Error types for the drive core
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("{device} failed: {reason}")]
    Device { device: &'static str, reason: String },

    #[error("{maneuver} did not settle within {limit:?}")]
    DeadlineElapsed {
        maneuver: &'static str,
        limit: Duration,
    },
}

pub type Result<T> = std::result::Result<T, DriveError>;
