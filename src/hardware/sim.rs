// Simulated drive base
//
// All handles from one `SimRobot` share a single plant. Each sensor read advances
// the plant by one step using the last commanded outputs, unless a scripted
// reading is queued, in which case the scripted value is reported instead.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Axis, Button, ControllerInput, DriveMotors, Gyro, Motor, SerialLink};
use crate::control::normalize_angle;
use crate::error::{DriveError, Result};

/// Which of the four drive motors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorSlot {
    FrontLeft,
    BackLeft,
    FrontRight,
    BackRight,
}

impl MotorSlot {
    const ALL: [MotorSlot; 4] = [
        MotorSlot::FrontLeft,
        MotorSlot::BackLeft,
        MotorSlot::FrontRight,
        MotorSlot::BackRight,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// How far the plant moves per unit of motor output per step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantResponse {
    /// Yaw change from the mean output of both sides (motors wired for in-place rotation)
    pub degrees_per_output: f64,
    /// Wheel revolutions from the left/right output difference
    pub revolutions_per_output: f64,
}

impl PlantResponse {
    /// A plant that never moves on its own; readings come only from scripts
    pub const STATIC: PlantResponse = PlantResponse {
        degrees_per_output: 0.0,
        revolutions_per_output: 0.0,
    };
}

impl Default for PlantResponse {
    fn default() -> Self {
        Self {
            degrees_per_output: 0.02,
            revolutions_per_output: 0.0005,
        }
    }
}

#[derive(Debug)]
struct Plant {
    response: PlantResponse,
    outputs: [f64; 4],
    history: [Vec<f64>; 4],
    yaw: f64,
    revolutions: f64,
    yaw_script: VecDeque<f64>,
    position_script: VecDeque<f64>,
    yaw_reads: usize,
    position_reads: usize,
    gyro_resets: usize,
    gyro_connected: bool,
}

impl Plant {
    fn step(&mut self) {
        let left = (self.outputs[0] + self.outputs[1]) / 2.0;
        let right = (self.outputs[2] + self.outputs[3]) / 2.0;
        self.yaw = normalize_angle(self.yaw + self.response.degrees_per_output * (left + right) / 2.0);
        self.revolutions += self.response.revolutions_per_output * (left - right) / 2.0;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared simulated drive base; hand out motors and a gyro, then inspect what happened
#[derive(Debug, Clone)]
pub struct SimRobot {
    plant: Arc<Mutex<Plant>>,
}

impl SimRobot {
    pub fn new(response: PlantResponse) -> Self {
        Self {
            plant: Arc::new(Mutex::new(Plant {
                response,
                outputs: [0.0; 4],
                history: Default::default(),
                yaw: 0.0,
                revolutions: 0.0,
                yaw_script: VecDeque::new(),
                position_script: VecDeque::new(),
                yaw_reads: 0,
                position_reads: 0,
                gyro_resets: 0,
                gyro_connected: true,
            })),
        }
    }

    pub fn motor(&self, slot: MotorSlot) -> SimMotor {
        SimMotor {
            slot,
            plant: Arc::clone(&self.plant),
        }
    }

    pub fn motors(&self) -> DriveMotors<SimMotor> {
        DriveMotors::new(
            self.motor(MotorSlot::FrontLeft),
            self.motor(MotorSlot::BackLeft),
            self.motor(MotorSlot::FrontRight),
            self.motor(MotorSlot::BackRight),
        )
    }

    pub fn gyro(&self) -> SimGyro {
        SimGyro {
            plant: Arc::clone(&self.plant),
        }
    }

    /// Queue yaw readings to report before the plant model takes over again
    pub fn script_yaw(&self, readings: impl IntoIterator<Item = f64>) {
        lock(&self.plant).yaw_script.extend(readings);
    }

    /// Queue motor position readings (revolutions)
    pub fn script_position(&self, readings: impl IntoIterator<Item = f64>) {
        lock(&self.plant).position_script.extend(readings);
    }

    /// Make every following gyro read fail
    pub fn disconnect_gyro(&self) {
        lock(&self.plant).gyro_connected = false;
    }

    /// Every command sent to one motor, oldest first
    pub fn outputs(&self, slot: MotorSlot) -> Vec<f64> {
        lock(&self.plant).history[slot.index()].clone()
    }

    pub fn last_output(&self, slot: MotorSlot) -> Option<f64> {
        lock(&self.plant).history[slot.index()].last().copied()
    }

    pub fn yaw(&self) -> f64 {
        lock(&self.plant).yaw
    }

    pub fn revolutions(&self) -> f64 {
        lock(&self.plant).revolutions
    }

    pub fn yaw_reads(&self) -> usize {
        lock(&self.plant).yaw_reads
    }

    pub fn position_reads(&self) -> usize {
        lock(&self.plant).position_reads
    }

    pub fn gyro_resets(&self) -> usize {
        lock(&self.plant).gyro_resets
    }

    /// Number of iterations a maneuver ran, counted as writes to the front-left motor
    pub fn iterations(&self) -> usize {
        lock(&self.plant).history[MotorSlot::FrontLeft.index()].len()
    }

    /// Forget recorded outputs (the plant state is kept)
    pub fn clear_history(&self) {
        let mut plant = lock(&self.plant);
        for slot in MotorSlot::ALL {
            plant.history[slot.index()].clear();
        }
    }
}

#[derive(Debug)]
pub struct SimMotor {
    slot: MotorSlot,
    plant: Arc<Mutex<Plant>>,
}

impl Motor for SimMotor {
    fn set_output(&mut self, output: f64) -> Result<()> {
        let mut plant = lock(&self.plant);
        plant.outputs[self.slot.index()] = output;
        plant.history[self.slot.index()].push(output);
        Ok(())
    }

    fn position(&mut self) -> Result<f64> {
        let mut plant = lock(&self.plant);
        plant.position_reads += 1;
        match plant.position_script.pop_front() {
            Some(revolutions) => plant.revolutions = revolutions,
            None => plant.step(),
        }
        Ok(plant.revolutions)
    }
}

#[derive(Debug)]
pub struct SimGyro {
    plant: Arc<Mutex<Plant>>,
}

impl Gyro for SimGyro {
    fn yaw(&mut self) -> Result<f64> {
        let mut plant = lock(&self.plant);
        if !plant.gyro_connected {
            return Err(DriveError::Device {
                device: "gyro",
                reason: "not responding".to_string(),
            });
        }
        plant.yaw_reads += 1;
        match plant.yaw_script.pop_front() {
            Some(yaw) => plant.yaw = yaw,
            None => plant.step(),
        }
        Ok(plant.yaw)
    }

    fn reset(&mut self) -> Result<()> {
        let mut plant = lock(&self.plant);
        plant.yaw = 0.0;
        plant.gyro_resets += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LinkState {
    bytes: VecDeque<u8>,
    failing: bool,
}

/// In-memory stand-in for the encoder co-processor link
#[derive(Debug, Clone, Default)]
pub struct SimSerial {
    state: Arc<Mutex<LinkState>>,
}

impl SimSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, bytes: &[u8]) {
        lock(&self.state).bytes.extend(bytes.iter().copied());
    }

    /// Bytes still waiting to be read
    pub fn pending(&self) -> usize {
        lock(&self.state).bytes.len()
    }

    /// Make the link report an I/O failure on every call until cleared
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}

impl SerialLink for SimSerial {
    fn bytes_available(&mut self) -> Result<usize> {
        let state = lock(&self.state);
        if state.failing {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }
        Ok(state.bytes.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }
        let n = buf.len().min(state.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(state.bytes.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

#[derive(Debug, Default)]
struct Sticks {
    axes: HashMap<Axis, i32>,
    buttons: HashSet<Button>,
}

/// Controller whose sticks and buttons are set programmatically
#[derive(Debug, Clone, Default)]
pub struct SimController {
    state: Arc<Mutex<Sticks>>,
}

impl SimController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_axis(&self, axis: Axis, value: i32) {
        lock(&self.state).axes.insert(axis, value);
    }

    pub fn press(&self, button: Button) {
        lock(&self.state).buttons.insert(button);
    }

    pub fn release(&self, button: Button) {
        lock(&self.state).buttons.remove(&button);
    }
}

impl ControllerInput for SimController {
    fn analog(&self, axis: Axis) -> i32 {
        lock(&self.state).axes.get(&axis).copied().unwrap_or(0)
    }

    fn digital(&self, button: Button) -> bool {
        lock(&self.state).buttons.contains(&button)
    }
}
