// 50 Hz driver-control loop
// Each cycle: tank drive from the sticks, then the button actions. A quick turn
// started with A/Y overrides the stick output until it has covered its angle.

use std::time::Duration;
use tokio::time::interval;
use tracing::info;

use crate::config::{LOOP_HZ, OPCONTROL_DRIVE_INCHES};
use crate::driver::RobotDriver;
use crate::error::Result;
use crate::hardware::{Button, ControllerInput, Gyro, Motor, SerialLink};
use crate::teleop::{QuickTurn, TurnDirection};

#[derive(Debug, Default)]
pub struct OpControl {
    quick_turn: Option<QuickTurn>,
}

impl OpControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quick_turn(&self) -> Option<&QuickTurn> {
        self.quick_turn.as_ref()
    }

    /// Run one driver-control cycle
    pub async fn cycle<M, G, S, C>(&mut self, driver: &mut RobotDriver<M, G, S, C>) -> Result<()>
    where
        M: Motor,
        G: Gyro,
        S: SerialLink,
        C: ControllerInput,
    {
        driver.tank_drive()?;

        if self.quick_turn.is_none() {
            let controller = driver.controller();
            let direction = if controller.digital(Button::A) {
                Some(TurnDirection::Positive)
            } else if controller.digital(Button::Y) {
                Some(TurnDirection::Negative)
            } else {
                None
            };
            if let Some(direction) = direction {
                let start_yaw = driver.heading()?;
                info!("Quick turn {:?} from {:.1} degrees", direction, start_yaw);
                self.quick_turn = Some(QuickTurn::new(direction, start_yaw));
            }
        }

        if driver.controller().digital(Button::B) {
            driver.position_pid(OPCONTROL_DRIVE_INCHES).await?;
        }

        if let Some(turn) = self.quick_turn {
            let yaw = driver.heading()?;
            match turn.power(yaw) {
                Some(power) => driver.drive_all(power)?,
                None => {
                    info!("Quick turn complete at {:.1} degrees", yaw);
                    self.quick_turn = None;
                }
            }
        }

        Ok(())
    }
}

/// Run driver control until a hardware error occurs
pub async fn run<M, G, S, C>(driver: &mut RobotDriver<M, G, S, C>) -> Result<()>
where
    M: Motor,
    G: Gyro,
    S: SerialLink,
    C: ControllerInput,
{
    let mut opcontrol = OpControl::new();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!("Driver control started: {}Hz loop", LOOP_HZ);

    loop {
        tick.tick().await;
        opcontrol.cycle(driver).await?;
    }
}
