// Driver-control mixing for a tank drive base
//
// Maps stick readings onto the left and right motor pairs. Values pass through
// unclamped; the motors saturate them.

use crate::config::QUICK_TURN_DEGREES;
use crate::hardware::{Axis, ControllerInput};

/// Power for the left and right motor pairs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidePower {
    pub left: i32,
    pub right: i32,
}

impl SidePower {
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    /// Tank mixing from the controller's vertical axes
    pub fn tank_from(controller: &impl ControllerInput) -> Self {
        tank(controller.analog(Axis::LeftY), controller.analog(Axis::RightY))
    }

    /// Arcade mixing: left stick vertical drives, right stick horizontal steers
    pub fn arcade_from(controller: &impl ControllerInput) -> Self {
        arcade(controller.analog(Axis::LeftY), controller.analog(Axis::RightX))
    }
}

/// Left pair follows the left stick; the right pair is wired reversed
pub fn tank(left_y: i32, right_y: i32) -> SidePower {
    SidePower::new(left_y, right_y.saturating_neg())
}

pub fn arcade(vertical: i32, horizontal: i32) -> SidePower {
    SidePower::new(
        horizontal.saturating_sub(vertical),
        vertical.saturating_add(horizontal),
    )
}

// Quick turn speed profile
const QUICK_TURN_POWER: f64 = 25.0;
const QUICK_TURN_FINAL_POWER: f64 = 15.0;
const QUICK_TURN_SLOWDOWN: f64 = 0.6;

/// Which way a quick turn rotates, by sign of yaw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    /// Increasing yaw
    Positive,
    /// Decreasing yaw
    Negative,
}

impl TurnDirection {
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Positive => 1.0,
            TurnDirection::Negative => -1.0,
        }
    }
}

/// Rotation from `initial` to `current`, unwrapped by whole turns until it points along `direction`
///
/// A zero direction returns the plain difference.
pub fn rotation_difference(initial: f64, current: f64, direction: f64) -> f64 {
    let difference = current - initial;
    if !difference.is_finite() {
        return difference;
    }
    let direction = if direction == 0.0 { 0.0 } else { direction.signum() };
    let aligned = difference * direction;
    if aligned < 0.0 {
        aligned.rem_euclid(360.0) * direction
    } else {
        difference
    }
}

/// Motor power for a quick turn that has covered `turned` of `target` degrees
///
/// Full power until the last 60% of the turn, then a linear ramp down to the
/// final power as the remaining rotation reaches zero.
pub fn quick_turn_power(turned: f64, target: f64) -> f64 {
    let remaining = target - turned.abs();
    let window = target * QUICK_TURN_SLOWDOWN;
    let throttle = if remaining < window {
        (QUICK_TURN_POWER - QUICK_TURN_FINAL_POWER) / window * (window - remaining)
    } else {
        0.0
    };
    QUICK_TURN_POWER - throttle
}

/// A fixed-angle turn driven open loop from the gyro
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickTurn {
    direction: TurnDirection,
    start_yaw: f64,
    target: f64,
}

impl QuickTurn {
    pub fn new(direction: TurnDirection, start_yaw: f64) -> Self {
        Self::with_target(direction, start_yaw, QUICK_TURN_DEGREES)
    }

    pub fn with_target(direction: TurnDirection, start_yaw: f64, target: f64) -> Self {
        Self {
            direction,
            start_yaw,
            target,
        }
    }

    pub fn direction(&self) -> TurnDirection {
        self.direction
    }

    /// Power for all four motors, or `None` once the target rotation is covered
    pub fn power(&self, current_yaw: f64) -> Option<f64> {
        let sign = self.direction.sign();
        let turned = rotation_difference(self.start_yaw, current_yaw, sign);
        if turned.abs() < self.target {
            Some(quick_turn_power(turned, self.target) * sign)
        } else {
            None
        }
    }
}
