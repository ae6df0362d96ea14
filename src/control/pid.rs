/// One iteration's PID terms
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub error: f64,
    pub integral: f64,
    pub derivative: f64,
    /// Unclamped controller output
    pub output: f64,
}

/// Loop-local PID accumulator
///
/// The integral accumulates on every update with no windup limit, and `dt` is
/// used exactly as configured (the drive loops use milliseconds).
#[derive(Debug, Clone)]
pub struct Pid {
    kp: f64,
    ki: f64,
    kd: f64,
    dt: f64,
    error_prior: f64,
    integral: f64,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64, dt: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            dt,
            error_prior: 0.0,
            integral: 0.0,
        }
    }

    pub fn update(&mut self, error: f64) -> PidTerms {
        let integral = self.integral + error * self.dt;
        let derivative = (error - self.error_prior) / self.dt;
        let output = self.kp * error + self.ki * integral + self.kd * derivative;

        self.error_prior = error;
        self.integral = integral;

        PidTerms {
            error,
            integral,
            derivative,
            output,
        }
    }
}
