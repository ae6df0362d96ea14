// Closed-loop control for the drive base
//
// Provides:
// - Signed magnitude clamping for motor commands
// - The PID term calculation shared by both loops
// - Heading (turn) and linear distance (position) loop state

mod clamp;
mod pid;
pub mod position;
pub mod turn;

pub use clamp::clamp_magnitude;
pub use pid::{Pid, PidTerms};
pub use position::PositionLoop;
pub use turn::{TurnLoop, TurnPhase, normalize_angle};
