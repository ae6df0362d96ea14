// Linear distance loop state, measured in wheel revolutions

use tracing::debug;

use super::Pid;
use crate::config::{ERROR_BOUND_DRIVE, POSITION_MAX_OUTPUT, PositionGains};

/// Position loop; exits on the first sample inside the tolerance band
#[derive(Debug, Clone)]
pub struct PositionLoop {
    desired: f64,
    pid: Pid,
    error: f64,
}

impl PositionLoop {
    /// `desired` is in revolutions relative to the start position
    pub fn new(desired: f64, gains: PositionGains) -> Self {
        Self {
            desired,
            pid: Pid::new(gains.kp, gains.ki, gains.kd, gains.period_ms),
            error: ERROR_BOUND_DRIVE * 2.0,
        }
    }

    pub fn should_continue(&self) -> bool {
        self.error.abs() > ERROR_BOUND_DRIVE
    }

    /// Feed the revolutions travelled so far and get the left-side motor command
    pub fn update(&mut self, actual: f64) -> f64 {
        let error = self.desired - actual;
        let terms = self.pid.update(error);
        let output = terms.output.clamp(-POSITION_MAX_OUTPUT, POSITION_MAX_OUTPUT);
        debug!(
            "position: actual={:.4} error={:.4} integral={:.4} derivative={:.4} output={:.3} clamped={:.3}",
            actual, error, terms.integral, terms.derivative, terms.output, output
        );

        self.error = error;
        output
    }

    pub fn error(&self) -> f64 {
        self.error
    }
}
