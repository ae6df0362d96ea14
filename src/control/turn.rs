// Heading loop state
//
// The loop measures rotation relative to the yaw captured when the turn started,
// wraps the error onto the shortest path and only finishes once the error has
// stayed inside the tolerance band for several consecutive samples.

use tracing::debug;

use super::{Pid, clamp_magnitude};
use crate::config::{ERROR_BOUND_TURN, TURN_FINAL_ITERATIONS, TurnGains};

/// Wrap an angle in degrees into (-180, 180]
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 { wrapped + 360.0 } else { wrapped }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Error outside the tolerance band
    Running,
    /// Inside the band, waiting for it to hold
    Confirming,
    /// Held for the required number of samples
    Done,
}

#[derive(Debug, Clone)]
pub struct TurnLoop {
    desired: f64,
    min_output: f64,
    max_output: f64,
    pid: Pid,
    error: f64,
    remaining: u32,
}

impl TurnLoop {
    /// `desired` is relative to the heading at the start of the turn
    pub fn new(desired: f64, gains: TurnGains) -> Self {
        Self {
            desired,
            min_output: gains.min_output,
            max_output: gains.max_output,
            pid: Pid::new(gains.kp, gains.ki, gains.kd, gains.period_ms),
            // Starts outside the band so the first check never counts
            error: ERROR_BOUND_TURN * 2.0,
            remaining: TURN_FINAL_ITERATIONS,
        }
    }

    /// Debounce check made before every iteration
    ///
    /// Returns false once the last required in-band sample has been processed.
    /// An out-of-band error restarts the count.
    pub fn advance(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        if self.error.abs() < ERROR_BOUND_TURN {
            self.remaining -= 1;
        } else {
            self.remaining = TURN_FINAL_ITERATIONS;
        }
        true
    }

    /// Feed the rotation since the start of the turn and get the motor command
    pub fn update(&mut self, actual: f64) -> f64 {
        let error = normalize_angle(self.desired - actual);
        let terms = self.pid.update(error);
        let output = clamp_magnitude(terms.output, self.min_output, self.max_output);
        debug!(
            "turn: actual={:.3} error={:.3} integral={:.3} derivative={:.3} output={:.3} clamped={:.3}",
            actual, error, terms.integral, terms.derivative, terms.output, output
        );

        self.error = error;
        output
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn phase(&self) -> TurnPhase {
        if self.remaining == 0 {
            TurnPhase::Done
        } else if self.remaining < TURN_FINAL_ITERATIONS {
            TurnPhase::Confirming
        } else {
            TurnPhase::Running
        }
    }
}
