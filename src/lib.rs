//! Closed-loop drive control for a four-motor tank drive competition robot.
//!
//! Turns and straight-line drives run PID loops against the gyro heading and a
//! drive motor's encoder, auxiliary encoders are read from a co-processor over a
//! serial link, and driver control maps the sticks onto the motor pairs.

pub mod config;
pub mod control;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod hardware;
pub mod runtime;
pub mod teleop;

pub use driver::RobotDriver;
pub use error::{DriveError, Result};
