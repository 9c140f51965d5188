use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::integrator::Integrator;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidTuning {
    pub proportional_multiplier: f32,
    pub integral_multiplier: f32,
    pub derivative_multiplier: f32,
    pub max_integral_magnitude: f32,
}

/// PID over a 3-vector.
///
/// The derivative acts on the measurement rather than the error, and is skipped
/// on the first update after [`PidController::reset`] since there is no meaningful
/// previous sample yet.
pub struct PidController {
    tuning: PidTuning,
    previous_value: Vector3<f32>,
    error_integrator: Integrator,
    skip_next_derivative: bool,
}

impl PidController {
    pub fn new(tuning: PidTuning) -> Self {
        PidController {
            tuning,
            previous_value: Vector3::zeros(),
            error_integrator: Integrator::new(tuning.max_integral_magnitude),
            skip_next_derivative: true,
        }
    }

    pub fn tuning(&self) -> PidTuning {
        self.tuning
    }

    pub fn reset(&mut self) {
        self.previous_value = Vector3::zeros();
        self.error_integrator.reset();
        self.skip_next_derivative = true;
    }

    /// Output for this step. `iteration_length` is in seconds.
    pub fn update(
        &mut self,
        iteration_length: f32,
        measured_state: Vector3<f32>,
        desired_state: Vector3<f32>,
    ) -> Vector3<f32> {
        let error = desired_state - measured_state;
        let proportional_output = error * self.tuning.proportional_multiplier;

        let derivative_output = if self.skip_next_derivative || iteration_length <= 0.0 {
            Vector3::zeros()
        } else {
            let change_rate = -(measured_state - self.previous_value) / iteration_length;
            change_rate * self.tuning.derivative_multiplier
        };
        self.skip_next_derivative = false;
        self.previous_value = measured_state;

        let accumulated_error = self.error_integrator.add_new_value(error, iteration_length);
        let integral_output = accumulated_error * self.tuning.integral_multiplier;

        proportional_output + integral_output + derivative_output
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const TUNING: PidTuning = PidTuning {
        proportional_multiplier: 2.0,
        integral_multiplier: 0.5,
        derivative_multiplier: 0.1,
        max_integral_magnitude: 100.0,
    };

    #[test]
    fn first_update_has_no_derivative() {
        let mut pid = PidController::new(TUNING);
        let output = pid.update(0.1, Vector3::new(5.0, 0.0, 0.0), Vector3::new(6.0, 0.0, 0.0));
        // P = 2 * 1, I = 0.5 * (1 * 0.1)
        assert_relative_eq!(output, Vector3::new(2.05, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn derivative_opposes_measurement_change() {
        let mut pid = PidController::new(TUNING);
        pid.update(0.1, Vector3::zeros(), Vector3::zeros());
        let output = pid.update(0.1, Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
        // Error is zero, D = 0.1 * -(1 - 0) / 0.1
        assert_relative_eq!(output, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn reset_rearms_derivative_suppression() {
        let mut pid = PidController::new(TUNING);
        pid.update(0.1, Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        pid.reset();
        let output = pid.update(0.1, Vector3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, 3.0));
        assert_eq!(output, Vector3::zeros());
    }

    #[test]
    fn integral_is_clamped() {
        let mut pid = PidController::new(PidTuning {
            proportional_multiplier: 0.0,
            integral_multiplier: 1.0,
            derivative_multiplier: 0.0,
            max_integral_magnitude: 0.1,
        });
        let mut output = Vector3::zeros();
        for _ in 0..50 {
            output = pid.update(0.5, Vector3::zeros(), Vector3::new(0.0, 10.0, 0.0));
        }
        assert_relative_eq!(output, Vector3::new(0.0, 0.1, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn converges_towards_target() {
        let mut pid = PidController::new(crate::config::constants::TARGET_PID_TUNING);
        let target = Vector3::new(0.5, -0.5, 0.25);
        let mut current = Vector3::zeros();
        for _ in 0..2000 {
            current += pid.update(0.01, current, target);
        }
        assert_relative_eq!(current, target, epsilon = 1e-3);
    }
}
