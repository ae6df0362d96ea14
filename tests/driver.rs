use std::time::Duration;

use robot_driver::config::{EncoderSettings, PositionGains, RobotConfig, TurnGains};
use robot_driver::hardware::sim::{
    MotorSlot, PlantResponse, SimController, SimGyro, SimMotor, SimRobot, SimSerial,
};
use robot_driver::hardware::{Axis, Button};
use robot_driver::runtime::{self, OpControl};
use robot_driver::teleop::TurnDirection;
use robot_driver::{DriveError, RobotDriver};

type SimDriver = RobotDriver<SimMotor, SimGyro, SimSerial, SimController>;

struct Rig {
    robot: SimRobot,
    link: SimSerial,
    controller: SimController,
    driver: SimDriver,
}

fn rig() -> Rig {
    let robot = SimRobot::new(PlantResponse::STATIC);
    let link = SimSerial::new();
    let controller = SimController::new();
    let mut driver = RobotDriver::new(
        robot.motors(),
        robot.gyro(),
        link.clone(),
        controller.clone(),
        4.0,
    );
    driver.configure_turn_pid(TurnGains {
        kp: 1.0,
        ki: 0.0,
        kd: 0.0,
        period_ms: 10.0,
        min_output: 5.0,
        max_output: 100.0,
    });
    Rig {
        robot,
        link,
        controller,
        driver,
    }
}

fn packet(values: &[i32]) -> Vec<u8> {
    let mut bytes = vec![0x80];
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

const ALL_SLOTS: [MotorSlot; 4] = [
    MotorSlot::FrontLeft,
    MotorSlot::BackLeft,
    MotorSlot::FrontRight,
    MotorSlot::BackRight,
];

// === Encoders ===

#[test]
fn test_read_encoder_decodes_packet() {
    let mut rig = rig();
    rig.driver.configure_encoders(3, 360);
    rig.link.push(&packet(&[100, -250, 0]));

    assert_eq!(rig.driver.read_encoder(1), 100);
    assert_eq!(rig.driver.get_encoder_val(2), -250);
    assert_eq!(rig.driver.get_encoder_val(3), 0);
}

#[test]
fn test_encoder_degrees_use_ppr() {
    let mut rig = rig();
    rig.driver.configure_encoders(3, 1440);
    rig.link.push(&packet(&[1440, -720, 0]));

    assert!(rig.driver.update_encoder_vals());
    assert_eq!(rig.driver.get_encoder_val(1), 360);
    assert_eq!(rig.driver.get_encoder_val(2), -180);
}

#[test]
fn test_misaligned_stream_matches_clean_stream() {
    let mut clean = rig();
    let mut noisy = rig();
    clean.driver.configure_encoders(3, 360);
    noisy.driver.configure_encoders(3, 360);
    clean.link.push(&packet(&[100, -250, 0]));
    noisy.link.push(&[0xAA, 0x55]);
    noisy.link.push(&packet(&[100, -250, 0]));

    assert!(clean.driver.update_encoder_vals());
    assert!(noisy.driver.update_encoder_vals());
    for index in 1..=3 {
        assert_eq!(
            clean.driver.get_encoder_val(index),
            noisy.driver.get_encoder_val(index)
        );
    }
}

#[test]
fn test_unknown_encoder_index_reads_zero() {
    let mut rig = rig();
    rig.driver.configure_encoders(3, 360);
    rig.link.push(&packet(&[5, 6, 7]));
    rig.driver.update_encoder_vals();

    assert_eq!(rig.driver.get_encoder_val(0), 0);
    assert_eq!(rig.driver.get_encoder_val(4), 0);
    assert_eq!(rig.driver.encoder_val(4), None);
    assert_eq!(rig.driver.encoder_val(3), Some(7));
}

#[test]
fn test_link_failure_keeps_stale_values() {
    let mut rig = rig();
    rig.driver.configure_encoders(2, 360);
    rig.link.push(&packet(&[30, 60]));
    assert!(rig.driver.update_encoder_vals());

    rig.link.set_failing(true);
    assert_eq!(rig.driver.read_encoder(2), 60);

    // Recovers once the link does
    rig.link.set_failing(false);
    rig.link.push(&packet(&[31, 61]));
    assert_eq!(rig.driver.read_encoder(1), 31);
}

#[test]
fn test_too_few_bytes_is_noop() {
    let mut rig = rig();
    rig.driver.configure_encoders(3, 360);
    rig.link.push(&packet(&[1, 2, 3])[..8]);

    assert!(!rig.driver.update_encoder_vals());
    assert_eq!(rig.link.pending(), 8);
    assert_eq!(rig.driver.get_encoder_val(1), 0);
}

// === Turn loop ===

#[tokio::test(start_paused = true)]
async fn test_turn_confirms_for_three_extra_iterations() {
    let mut rig = rig();
    // Initial capture, then snapped straight onto the target
    rig.robot.script_yaw([0.0, 90.0]);

    rig.driver.turn_pid(90.0).await.unwrap();

    assert_eq!(rig.robot.iterations(), 4);
    assert_eq!(rig.robot.yaw_reads(), 5);
    // Zero error still drives at the minimum output, same sign on every motor
    for slot in ALL_SLOTS {
        assert_eq!(rig.robot.outputs(slot), vec![5.0; 4]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_turn_regression_resets_confirmation() {
    let mut rig = rig();
    rig.robot.script_yaw([0.0, 90.0, 90.0, 80.0, 90.0]);

    rig.driver.turn_pid(90.0).await.unwrap();

    // Two in band, one out, then three more to confirm plus the settling sample
    assert_eq!(rig.robot.iterations(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_turn_measures_relative_to_start_across_wrap() {
    let mut rig = rig();
    // Start at 170, turn +40 to land on -150 after the gyro wraps
    rig.robot.script_yaw([170.0, -170.0, -150.0]);

    rig.driver.turn_pid(40.0).await.unwrap();

    let outputs = rig.robot.outputs(MotorSlot::FrontLeft);
    // 20 degrees still to go on the first sample
    assert_eq!(outputs[0], 20.0);
    assert_eq!(outputs.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_turn_and_recalibrate_resets_gyro() {
    let mut rig = rig();
    rig.robot.script_yaw([0.0, -45.0]);

    rig.driver.turn_pid_and_recalibrate(-45.0).await.unwrap();

    assert_eq!(rig.robot.gyro_resets(), 1);
    assert_eq!(rig.robot.yaw(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_turn_converges_on_plant() {
    let robot = SimRobot::new(PlantResponse::default());
    let mut driver = RobotDriver::new(
        robot.motors(),
        robot.gyro(),
        SimSerial::new(),
        SimController::new(),
        4.0,
    );
    driver.apply_config(&RobotConfig::default());

    driver
        .turn_pid_within(90.0, Duration::from_secs(30))
        .await
        .unwrap();

    assert!((robot.yaw() - 90.0).abs() < 1.0, "ended at {}", robot.yaw());
}

#[tokio::test(start_paused = true)]
async fn test_gyro_failure_aborts_turn() {
    let mut rig = rig();
    rig.robot.disconnect_gyro();

    let err = rig.driver.turn_pid(90.0).await.unwrap_err();
    assert!(matches!(err, DriveError::Device { device: "gyro", .. }));
    assert_eq!(rig.robot.iterations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_turn_deadline_stops_motors() {
    let mut rig = rig();
    // Static plant never reaches the target

    let err = rig
        .driver
        .turn_pid_within(90.0, Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::DeadlineElapsed { maneuver: "turn", .. }));
    assert!(rig.robot.iterations() > 10);
    for slot in ALL_SLOTS {
        assert_eq!(rig.robot.last_output(slot), Some(0.0));
    }
}

#[tokio::test(start_paused = true)]
async fn test_drive_deadline_stops_motors() {
    let mut rig = rig();
    // Wheels never turn, so the distance is never covered

    let err = rig
        .driver
        .position_pid_within(12.0, Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::DeadlineElapsed { maneuver: "drive", .. }));
    assert!(rig.robot.iterations() > 10);
    let left = rig.robot.outputs(MotorSlot::FrontLeft);
    assert!(left[0] > 0.0);
    for slot in ALL_SLOTS {
        assert_eq!(rig.robot.last_output(slot), Some(0.0));
    }
}

// === Position loop ===

#[tokio::test(start_paused = true)]
async fn test_position_exits_on_first_sample_at_target() {
    let mut rig = rig();
    let distance = 4.0 * rig.driver.wheel_circumference();
    rig.robot.script_position([0.0, 1.0, 2.0, 4.0]);

    rig.driver.position_pid(distance).await.unwrap();

    // One iteration after the jump, no confirmation
    assert_eq!(rig.robot.iterations(), 3);
    assert_eq!(rig.robot.position_reads(), 4);

    let left = rig.robot.outputs(MotorSlot::FrontLeft);
    let right = rig.robot.outputs(MotorSlot::FrontRight);
    assert_eq!(left[0], 128.0);
    for (l, r) in left.iter().zip(&right) {
        assert_eq!(*r, -*l);
    }
    assert_eq!(rig.robot.outputs(MotorSlot::BackLeft), left);
    assert_eq!(rig.robot.outputs(MotorSlot::BackRight), right);
}

#[tokio::test(start_paused = true)]
async fn test_position_is_relative_to_start() {
    let mut rig = rig();
    let distance = -rig.driver.wheel_circumference();
    // Starts at 10 revolutions, reverses one
    rig.robot.script_position([10.0, 9.5, 9.0]);

    rig.driver.position_pid(distance).await.unwrap();

    assert_eq!(rig.robot.iterations(), 2);
    assert!(rig.robot.outputs(MotorSlot::FrontLeft)[0] < 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_position_converges_on_plant() {
    let robot = SimRobot::new(PlantResponse::default());
    let mut driver = RobotDriver::new(
        robot.motors(),
        robot.gyro(),
        SimSerial::new(),
        SimController::new(),
        4.0,
    );
    driver.configure_position_pid(PositionGains {
        kp: 64.0,
        ki: 0.0,
        kd: 0.0,
        period_ms: 10.0,
    });

    driver
        .position_pid_within(12.0, Duration::from_secs(60))
        .await
        .unwrap();

    let travelled = robot.revolutions() * driver.wheel_circumference();
    assert!((travelled - 12.0).abs() < 0.05, "travelled {}", travelled);
}

// === Driver control ===

#[test]
fn test_tank_drive_mixing() {
    let mut rig = rig();
    rig.controller.set_axis(Axis::LeftY, 50);
    rig.controller.set_axis(Axis::RightY, 30);

    rig.driver.tank_drive().unwrap();

    assert_eq!(rig.robot.last_output(MotorSlot::FrontLeft), Some(50.0));
    assert_eq!(rig.robot.last_output(MotorSlot::BackLeft), Some(50.0));
    assert_eq!(rig.robot.last_output(MotorSlot::FrontRight), Some(-30.0));
    assert_eq!(rig.robot.last_output(MotorSlot::BackRight), Some(-30.0));
}

#[test]
fn test_arcade_drive_mixing() {
    let mut rig = rig();
    rig.controller.set_axis(Axis::LeftY, 40);
    rig.controller.set_axis(Axis::RightX, 10);

    rig.driver.arcade_drive().unwrap();

    assert_eq!(rig.robot.last_output(MotorSlot::FrontLeft), Some(-30.0));
    assert_eq!(rig.robot.last_output(MotorSlot::BackLeft), Some(-30.0));
    assert_eq!(rig.robot.last_output(MotorSlot::FrontRight), Some(50.0));
    assert_eq!(rig.robot.last_output(MotorSlot::BackRight), Some(50.0));
}

#[test]
fn test_controller_exposed_to_collaborators() {
    let rig = rig();
    use robot_driver::hardware::ControllerInput;
    rig.controller.press(Button::L1);
    assert!(rig.driver.controller().digital(Button::L1));
    assert!(!rig.driver.controller().digital(Button::L2));
}

#[test]
fn test_apply_config() {
    let mut rig = rig();
    let config = RobotConfig {
        encoders: EncoderSettings { count: 5, ppr: 90 },
        ..RobotConfig::default()
    };

    rig.driver.apply_config(&config);

    assert_eq!(rig.driver.encoders().count(), 5);
    assert_eq!(rig.driver.encoders().ppr(), 90);
    assert_eq!(rig.driver.turn_gains(), config.turn);
    assert_eq!(rig.driver.position_gains(), config.position);
    assert!((rig.driver.wheel_circumference() - 4.0 * std::f64::consts::PI).abs() < 1e-12);
}

#[tokio::test(start_paused = true)]
async fn test_quick_turn_overrides_sticks_until_done() {
    let mut rig = rig();
    let mut opcontrol = OpControl::new();
    rig.controller.set_axis(Axis::LeftY, 60);
    rig.robot.script_yaw([0.0, 0.0, 30.0, 60.0, 95.0]);
    rig.controller.press(Button::A);

    opcontrol.cycle(&mut rig.driver).await.unwrap();
    rig.controller.release(Button::A);
    let turn = opcontrol.quick_turn().unwrap();
    assert_eq!(turn.direction(), TurnDirection::Positive);
    assert_eq!(rig.robot.last_output(MotorSlot::FrontLeft), Some(25.0));
    assert_eq!(rig.robot.last_output(MotorSlot::FrontRight), Some(25.0));

    opcontrol.cycle(&mut rig.driver).await.unwrap();
    assert_eq!(rig.robot.last_output(MotorSlot::FrontLeft), Some(25.0));

    opcontrol.cycle(&mut rig.driver).await.unwrap();
    let slowed = rig.robot.last_output(MotorSlot::FrontLeft).unwrap();
    assert!(slowed < 25.0 && slowed > 15.0);

    // Target covered: the sticks take over again
    opcontrol.cycle(&mut rig.driver).await.unwrap();
    assert!(opcontrol.quick_turn().is_none());
    assert_eq!(rig.robot.last_output(MotorSlot::FrontLeft), Some(60.0));
}

#[tokio::test(start_paused = true)]
async fn test_drive_button_runs_position_loop() {
    let mut rig = rig();
    let mut opcontrol = OpControl::new();
    let target = 20.0 / rig.driver.wheel_circumference();
    rig.robot.script_position([0.0, target]);
    rig.controller.press(Button::B);

    opcontrol.cycle(&mut rig.driver).await.unwrap();

    assert_eq!(rig.robot.position_reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_drives_from_sticks() {
    let mut rig = rig();
    rig.controller.set_axis(Axis::LeftY, -40);
    rig.controller.set_axis(Axis::RightY, -40);

    let result = tokio::time::timeout(Duration::from_millis(200), runtime::run(&mut rig.driver)).await;

    assert!(result.is_err(), "driver control only ends on error");
    assert!(rig.robot.iterations() >= 5);
    assert_eq!(rig.robot.last_output(MotorSlot::BackLeft), Some(-40.0));
    assert_eq!(rig.robot.last_output(MotorSlot::BackRight), Some(40.0));
}
