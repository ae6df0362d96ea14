// Hardware seams for the drive core
//
// Provides:
// - Narrow traits for drive motors, the heading sensor, the encoder serial link
//   and the driver controller
// - A serialport-backed encoder link
// - A simulated drive base for dry runs and tests

mod serial;
pub mod sim;

pub use serial::open_encoder_link;

use crate::error::Result;

/// A drive motor
pub trait Motor {
    /// Send a signed velocity/voltage command; the device saturates it to its own range
    fn set_output(&mut self, output: f64) -> Result<()>;

    /// Shaft position in revolutions
    fn position(&mut self) -> Result<f64>;
}

/// Heading source
pub trait Gyro {
    /// Current yaw in degrees
    fn yaw(&mut self) -> Result<f64>;

    /// Zero the yaw reference frame
    fn reset(&mut self) -> Result<()>;
}

/// Byte link to the encoder co-processor
pub trait SerialLink {
    /// Number of bytes that can be read without blocking
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` bytes, returning how many were read
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Analog stick axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

/// Digital controller buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    X,
    Y,
    Up,
    Down,
    Left,
    Right,
    L1,
    L2,
    R1,
    R2,
}

/// Driver controller
pub trait ControllerInput {
    /// Signed stick reading, nominally -127..=127
    fn analog(&self, axis: Axis) -> i32;

    fn digital(&self, button: Button) -> bool;
}

/// The four motors of a tank drive base
#[derive(Debug)]
pub struct DriveMotors<M> {
    pub front_left: M,
    pub back_left: M,
    pub front_right: M,
    pub back_right: M,
}

impl<M: Motor> DriveMotors<M> {
    pub fn new(front_left: M, back_left: M, front_right: M, back_right: M) -> Self {
        Self {
            front_left,
            back_left,
            front_right,
            back_right,
        }
    }

    /// Same command to every motor
    pub fn set_all(&mut self, output: f64) -> Result<()> {
        self.set_sides(output, output)
    }

    /// Separate commands for the left and right pairs
    pub fn set_sides(&mut self, left: f64, right: f64) -> Result<()> {
        self.front_left.set_output(left)?;
        self.back_left.set_output(left)?;
        self.front_right.set_output(right)?;
        self.back_right.set_output(right)
    }
}
