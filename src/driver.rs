// High-level driver for a four-motor tank drive base
//
// Owns the drive motors, gyro, encoder link and driver controller, plus the PID
// and encoder configuration, and exposes the closed-loop maneuvers and teleop
// mixing built on them.

use std::f64::consts::PI;
use std::time::Duration;

use tokio::time::{error::Elapsed, sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{EncoderSettings, PositionGains, RobotConfig, TurnGains};
use crate::control::{PositionLoop, TurnLoop};
use crate::encoder::EncoderAggregator;
use crate::error::{DriveError, Result};
use crate::hardware::{ControllerInput, DriveMotors, Gyro, Motor, SerialLink};
use crate::teleop::SidePower;

/// Loop period from a configured millisecond value; unusable values sleep for zero
fn loop_period(period_ms: f64) -> Duration {
    Duration::try_from_secs_f64(period_ms.max(0.0) / 1000.0).unwrap_or_default()
}

/// Closed-loop driver for the drive base
pub struct RobotDriver<M, G, S, C> {
    motors: DriveMotors<M>,
    gyro: G,
    encoder_link: S,
    controller: C,
    encoders: EncoderAggregator,
    wheel_circumference: f64,
    turn_gains: TurnGains,
    position_gains: PositionGains,
}

impl<M, G, S, C> RobotDriver<M, G, S, C>
where
    M: Motor,
    G: Gyro,
    S: SerialLink,
    C: ControllerInput,
{
    /// Create a driver from its hardware handles
    ///
    /// Gains and encoder settings start at their defaults; use the `configure_*`
    /// methods or [`RobotDriver::apply_config`] to set them.
    pub fn new(
        motors: DriveMotors<M>,
        gyro: G,
        encoder_link: S,
        controller: C,
        wheel_diameter: f64,
    ) -> Self {
        let encoder_settings = EncoderSettings::default();
        Self {
            motors,
            gyro,
            encoder_link,
            controller,
            encoders: EncoderAggregator::new(encoder_settings.count, encoder_settings.ppr),
            wheel_circumference: wheel_diameter * PI,
            turn_gains: TurnGains::default(),
            position_gains: PositionGains::default(),
        }
    }

    // === Configuration ===

    /// Set heading loop gains, period and output magnitude bounds
    pub fn configure_turn_pid(&mut self, gains: TurnGains) {
        info!("Turn PID configured: {:?}", gains);
        self.turn_gains = gains;
    }

    /// Set distance loop gains and period
    pub fn configure_position_pid(&mut self, gains: PositionGains) {
        info!("Position PID configured: {:?}", gains);
        self.position_gains = gains;
    }

    /// Set how many encoders the co-processor reports and their pulses per revolution
    pub fn configure_encoders(&mut self, count: usize, ppr: i32) {
        info!("Encoders configured: {} at {} pulses/rev", count, ppr);
        self.encoders.configure(count, ppr);
    }

    pub fn apply_config(&mut self, config: &RobotConfig) {
        self.wheel_circumference = config.wheel.diameter * PI;
        self.configure_turn_pid(config.turn);
        self.configure_position_pid(config.position);
        self.configure_encoders(config.encoders.count, config.encoders.ppr);
    }

    pub fn turn_gains(&self) -> TurnGains {
        self.turn_gains
    }

    pub fn position_gains(&self) -> PositionGains {
        self.position_gains
    }

    pub fn wheel_circumference(&self) -> f64 {
        self.wheel_circumference
    }

    // === Closed-loop maneuvers ===

    /// Turn by `desired_angle` degrees relative to the current heading
    ///
    /// Blocks the calling task until the heading error has stayed in band for
    /// the confirmation count; there is no timeout (see
    /// [`RobotDriver::turn_pid_within`]). Motors are left at the last output.
    pub async fn turn_pid(&mut self, desired_angle: f64) -> Result<()> {
        info!("Turning {:.2} degrees", desired_angle);
        let period = loop_period(self.turn_gains.period_ms);
        let mut turn = TurnLoop::new(desired_angle, self.turn_gains);
        let initial = self.gyro.yaw()?;

        let mut iterations = 0u64;
        while turn.advance() {
            let actual = self.gyro.yaw()? - initial;
            let output = turn.update(actual);
            self.motors.set_all(output)?;
            iterations += 1;
            sleep(period).await;
        }

        info!(
            "Turn settled after {} iterations, error {:.3}",
            iterations,
            turn.error()
        );
        Ok(())
    }

    /// Turn, then zero the gyro reference so the next turn starts from a fresh frame
    pub async fn turn_pid_and_recalibrate(&mut self, desired_angle: f64) -> Result<()> {
        self.turn_pid(desired_angle).await?;
        self.recalibrate_gyro()
    }

    pub fn recalibrate_gyro(&mut self) -> Result<()> {
        debug!("Resetting gyro reference");
        self.gyro.reset()
    }

    /// Drive `distance` inches (negative reverses) measured on the front-left wheel
    ///
    /// Finishes on the first sample inside the tolerance band. There is no
    /// timeout (see [`RobotDriver::position_pid_within`]).
    pub async fn position_pid(&mut self, distance: f64) -> Result<()> {
        let desired = distance / self.wheel_circumference;
        info!("Driving {:.2} in ({:.4} rev)", distance, desired);
        let period = loop_period(self.position_gains.period_ms);
        let mut position = PositionLoop::new(desired, self.position_gains);
        let initial = self.motors.front_left.position()?;

        let mut iterations = 0u64;
        while position.should_continue() {
            let actual = self.motors.front_left.position()? - initial;
            let output = position.update(actual);
            self.motors.set_sides(output, -output)?;
            iterations += 1;
            sleep(period).await;
        }

        info!(
            "Drive settled after {} iterations, error {:.4} rev",
            iterations,
            position.error()
        );
        Ok(())
    }

    /// [`RobotDriver::turn_pid`] with a deadline; on expiry the motors are stopped
    pub async fn turn_pid_within(&mut self, desired_angle: f64, limit: Duration) -> Result<()> {
        let outcome = timeout(limit, self.turn_pid(desired_angle)).await;
        self.finish_within("turn", limit, outcome)
    }

    /// [`RobotDriver::position_pid`] with a deadline; on expiry the motors are stopped
    pub async fn position_pid_within(&mut self, distance: f64, limit: Duration) -> Result<()> {
        let outcome = timeout(limit, self.position_pid(distance)).await;
        self.finish_within("drive", limit, outcome)
    }

    fn finish_within(
        &mut self,
        maneuver: &'static str,
        limit: Duration,
        outcome: std::result::Result<Result<()>, Elapsed>,
    ) -> Result<()> {
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("{} did not settle within {:?}, stopping", maneuver, limit);
                self.stop()?;
                Err(DriveError::DeadlineElapsed { maneuver, limit })
            }
        }
    }

    /// Zero all four drive motors
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping drive motors");
        self.motors.set_all(0.0)
    }

    /// Same output on all four motors
    pub fn drive_all(&mut self, output: f64) -> Result<()> {
        self.motors.set_all(output)
    }

    /// Current gyro yaw in degrees
    pub fn heading(&mut self) -> Result<f64> {
        self.gyro.yaw()
    }

    // === Encoders ===

    /// Pull the newest packet from the encoder link
    ///
    /// Link failures are logged and leave the previous values in place.
    /// Returns whether new values were decoded.
    pub fn update_encoder_vals(&mut self) -> bool {
        match self.encoders.poll(&mut self.encoder_link) {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Encoder link read failed, keeping stale values: {}", e);
                false
            }
        }
    }

    /// Degrees of shaft rotation for a 1-based encoder index, `None` if there is no such encoder
    pub fn encoder_val(&self, index: usize) -> Option<i32> {
        self.encoders.degrees(index)
    }

    /// Like [`RobotDriver::encoder_val`] but reports 0 for an unknown index
    pub fn get_encoder_val(&self, index: usize) -> i32 {
        self.encoder_val(index).unwrap_or(0)
    }

    /// Update from the link, then read one encoder
    pub fn read_encoder(&mut self, index: usize) -> i32 {
        self.update_encoder_vals();
        self.get_encoder_val(index)
    }

    pub fn encoders(&self) -> &EncoderAggregator {
        &self.encoders
    }

    // === Driver control ===

    pub fn tank_drive(&mut self) -> Result<()> {
        let power = SidePower::tank_from(&self.controller);
        self.apply_side_power(power)
    }

    pub fn arcade_drive(&mut self) -> Result<()> {
        let power = SidePower::arcade_from(&self.controller);
        self.apply_side_power(power)
    }

    fn apply_side_power(&mut self, power: SidePower) -> Result<()> {
        self.motors
            .set_sides(f64::from(power.left), f64::from(power.right))
    }

    /// Raw controller access for collaborators that need the sticks or buttons
    pub fn controller(&self) -> &C {
        &self.controller
    }
}
