use nalgebra::Vector3;

use crate::util::math::vectors::clamp_magnitude;

/// Accumulates a vector over time, never letting its magnitude pass `max_magnitude`.
pub struct Integrator {
    current_value: Vector3<f32>,
    max_magnitude: f32,
}

impl Integrator {
    pub fn new(max_magnitude: f32) -> Self {
        Integrator {
            current_value: Vector3::zeros(),
            max_magnitude,
        }
    }

    pub fn add_new_value(&mut self, value: Vector3<f32>, interval_seconds: f32) -> Vector3<f32> {
        self.current_value = clamp_magnitude(
            self.current_value + value * interval_seconds,
            self.max_magnitude,
        );
        self.current_value
    }

    pub fn get_current_value(&self) -> Vector3<f32> {
        self.current_value
    }

    pub fn reset(&mut self) {
        self.current_value = Vector3::zeros();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn accumulates_scaled_values() {
        let mut integrator = Integrator::new(10.0);
        integrator.add_new_value(Vector3::new(1.0, 0.0, 0.0), 0.5);
        let value = integrator.add_new_value(Vector3::new(1.0, 2.0, 0.0), 0.5);
        assert_relative_eq!(value, Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn magnitude_is_capped_keeping_direction() {
        let mut integrator = Integrator::new(0.1);
        let value = integrator.add_new_value(Vector3::new(3.0, 4.0, 0.0), 1.0);
        assert_relative_eq!(value.norm(), 0.1, epsilon = 1e-6);
        assert_relative_eq!(value, Vector3::new(0.06, 0.08, 0.0), epsilon = 1e-6);

        integrator.reset();
        assert_eq!(integrator.get_current_value(), Vector3::zeros());
    }
}
