use nalgebra::{UnitQuaternion, Vector2, Vector3};
use shared_definitions::{interpreted::InterpretedTarget, robotics::RoboticsCoordinates};

use crate::{
    config::{
        constants::{
            ANGLE_LIMIT_DEG, JOYSTICK_LIMIT, LATERAL_DOMAIN, ROOT_PID_TUNING, TARGET_PID_TUNING,
            TWIST_LIMIT_DEG, VERTICAL_DOMAIN,
        },
        settings::RoboticsConfig,
    },
    util::math::{
        constraint_value, normal_component_to_degrees, remap, remap_and_clamp,
        vectors::{clamp_magnitude_2d, reorient_to_device_space, rotation_about_z_degrees},
    },
};

use super::pid::PidController;

const MS_IN_SECOND: f32 = 1000.0_f32;

/// Turns interpreted targets into clamped six channel device commands.
///
/// Device space has X pointing up. Translation channels live in `[-1, 1]`,
/// rotation channels in degrees.
pub struct RoboticsDriver {
    config: RoboticsConfig,
    pitcher: UnitQuaternion<f32>,

    unsafe_joystick: Vector3<f32>,
    unsafe_angles: Vector3<f32>,
    unsafe_verticality: f32,
    transitional_coordinate: Vector3<f32>,

    target_pid: PidController,
    pid_target_current: Vector3<f32>,
    root_position_pid: PidController,
    pid_root_current: Vector3<f32>,
    pid_root_target: Vector3<f32>,

    safe_coordinates: RoboticsCoordinates,
}

impl RoboticsDriver {
    pub fn new(config: RoboticsConfig) -> Self {
        let config = config.sanitized();
        RoboticsDriver {
            config,
            pitcher: rotation_about_z_degrees(-config.system_pitch_degrees),
            unsafe_joystick: Vector3::zeros(),
            unsafe_angles: Vector3::zeros(),
            unsafe_verticality: 0.0,
            transitional_coordinate: Vector3::zeros(),
            target_pid: PidController::new(TARGET_PID_TUNING),
            pid_target_current: Vector3::zeros(),
            root_position_pid: PidController::new(ROOT_PID_TUNING),
            pid_root_current: Vector3::zeros(),
            pid_root_target: Vector3::zeros(),
            safe_coordinates: RoboticsCoordinates::default(),
        }
    }

    pub fn config(&self) -> &RoboticsConfig {
        &self.config
    }

    pub fn transitional_coordinate(&self) -> Vector3<f32> {
        self.transitional_coordinate
    }

    pub fn update_configuration(&mut self, config: RoboticsConfig) {
        let config = config.sanitized();

        if config.use_pid_root && !self.config.use_pid_root {
            log::warn!("Root stabilization enabled, its gains are not tuned yet");
            self.root_position_pid.reset();
            self.pid_root_current = Vector3::zeros();
            self.pid_root_target = Vector3::zeros();
        }
        if config.use_pid_target && !self.config.use_pid_target {
            self.target_pid.reset();
            self.pid_target_current = self.transitional_coordinate;
        }

        self.pitcher = rotation_about_z_degrees(-config.system_pitch_degrees);
        self.config = config;
        if !self.config.use_pid_target {
            self.calculate_outputs(self.transitional_coordinate);
        }
    }

    pub fn provide_target(&mut self, target: &InterpretedTarget) {
        if !target.has_target {
            // Nothing to recover from yet, the last outputs simply persist.
            return;
        }

        let mut position = reorient_to_device_space(target.position);
        let mut normal = reorient_to_device_space(target.normal);
        if self.config.system_pitch_degrees != 0.0 {
            position = self.pitcher * position;
            normal = self.pitcher * normal;
        }

        let scale = self.config.virtual_scale;
        let remapped = Vector3::new(
            remap(position.x / scale, VERTICAL_DOMAIN.0, VERTICAL_DOMAIN.1, -1.0, 1.0),
            remap(position.y / scale, LATERAL_DOMAIN.0, LATERAL_DOMAIN.1, -1.0, 1.0),
            remap(position.z / scale, LATERAL_DOMAIN.0, LATERAL_DOMAIN.1, -1.0, 1.0),
        );

        if remapped.iter().any(|component| !component.is_finite()) {
            log::debug!("Ignoring non-finite target {:?}", remapped);
            return;
        }

        let working = if self.config.use_pid_root {
            self.pid_root_target = remapped;
            remapped - self.pid_root_current
        } else {
            remapped
        };

        // The root controller absorbs large jumps on its own, so the gate only guards the direct path.
        if !self.config.use_pid_root && working.norm() > self.config.safety_ignore_distance {
            log::debug!(
                "Ignoring target {:?}, beyond safety distance {}",
                working,
                self.config.safety_ignore_distance
            );
            return;
        }

        self.unsafe_joystick =
            working.map(|component| constraint_value(component, -JOYSTICK_LIMIT, JOYSTICK_LIMIT));
        self.unsafe_verticality = (self.unsafe_joystick.x + 1.0) / 2.0;

        if target.has_normal {
            // A bare normal carries no twist. Deriving R0 from the tangent is not done yet.
            self.unsafe_angles = Vector3::new(
                0.0,
                normal_component_to_degrees(-normal.z),
                normal_component_to_degrees(normal.y),
            );
        }

        self.transitional_coordinate = self.apply_safety_polar_mode(self.unsafe_joystick);

        if !self.config.use_pid_target {
            self.calculate_outputs(self.transitional_coordinate);
        }
    }

    /// Loss of target hook. Recovery after a data outage is not handled yet.
    pub fn mark_data_failure(&mut self) {
        log::trace!("Data failure reported to robotics driver");
    }

    pub fn get_coordinates(&mut self, delta_time_ms: u64) -> RoboticsCoordinates {
        let delta_time = delta_time_ms as f32 / MS_IN_SECOND;

        if self.config.use_pid_root {
            self.pid_root_current += self.root_position_pid.update(
                delta_time,
                self.pid_root_current,
                self.pid_root_target,
            );
        }

        if self.config.use_pid_target {
            self.pid_target_current += self.target_pid.update(
                delta_time,
                self.pid_target_current,
                self.transitional_coordinate,
            );
            self.calculate_outputs(self.pid_target_current);
        }

        self.safe_coordinates
    }

    /// Keeps the lateral `(Y, Z)` part inside a disc whose radius grows with height.
    fn apply_safety_polar_mode(&self, joystick: Vector3<f32>) -> Vector3<f32> {
        if !self.config.use_polar_mode {
            return joystick;
        }

        let allowed_radius = remap_and_clamp(
            self.unsafe_verticality,
            0.0,
            1.0,
            self.config.polar_bottom_radius,
            self.config.polar_top_radius,
        );
        let radial = clamp_magnitude_2d(Vector2::new(joystick.y, joystick.z), allowed_radius);
        Vector3::new(joystick.x, radial.x, radial.y)
    }

    // The topmost limit ignores any PID integral state; a held target above it winds the integral up.
    fn calculate_outputs(&mut self, coordinate: Vector3<f32>) {
        let config = &self.config;

        let mut work_x = coordinate.x + config.offset_joystick_l0;
        if config.topmost_hard_limit < 1.0 {
            let joystick_limit = config.topmost_hard_limit * 2.0 - 1.0;
            if work_x > joystick_limit {
                work_x = joystick_limit;
            }
        }

        self.safe_coordinates = RoboticsCoordinates {
            joystick_target_l0: constraint_value(work_x, -JOYSTICK_LIMIT, JOYSTICK_LIMIT),
            joystick_target_l1: constraint_value(
                coordinate.y + config.offset_joystick_l1,
                -JOYSTICK_LIMIT,
                JOYSTICK_LIMIT,
            ),
            joystick_target_l2: constraint_value(
                coordinate.z + config.offset_joystick_l2,
                -JOYSTICK_LIMIT,
                JOYSTICK_LIMIT,
            ),
            angle_deg_r0: constraint_value(
                self.unsafe_angles.x + config.offset_angle_r0,
                -TWIST_LIMIT_DEG,
                TWIST_LIMIT_DEG,
            ),
            angle_deg_r1: constraint_value(
                self.unsafe_angles.y + config.offset_angle_r1,
                -ANGLE_LIMIT_DEG,
                ANGLE_LIMIT_DEG,
            ),
            angle_deg_r2: constraint_value(
                self.unsafe_angles.z + config.offset_angle_r2,
                -ANGLE_LIMIT_DEG,
                ANGLE_LIMIT_DEG,
            ),
        };
    }
}

impl Default for RoboticsDriver {
    fn default() -> Self {
        Self::new(RoboticsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn target(position: Vector3<f32>, normal: Option<Vector3<f32>>) -> InterpretedTarget {
        InterpretedTarget {
            has_target: true,
            position,
            has_normal: normal.is_some(),
            normal: normal.unwrap_or_else(Vector3::zeros),
            ..InterpretedTarget::none()
        }
    }

    fn assert_in_declared_ranges(coordinates: &RoboticsCoordinates) {
        for joystick in coordinates.joysticks() {
            assert!((-1.0..=1.0).contains(&joystick), "{coordinates:?}");
        }
        assert!(coordinates.angle_deg_r0.abs() <= 360.0);
        assert!(coordinates.angle_deg_r1.abs() <= 65.0);
        assert!(coordinates.angle_deg_r2.abs() <= 65.0);
    }

    #[test]
    fn no_target_keeps_previous_outputs() {
        let mut driver = RoboticsDriver::default();
        driver.provide_target(&target(Vector3::new(0.0, 0.5, 0.0), None));
        let before = driver.get_coordinates(10);

        driver.provide_target(&InterpretedTarget::none());
        assert_eq!(driver.get_coordinates(10), before);
    }

    #[test]
    fn centered_target_maps_to_center() {
        let mut driver = RoboticsDriver::default();
        // Device up is virtual Y; halfway up the vertical domain is the joystick center.
        driver.provide_target(&target(Vector3::new(0.0, 0.5, 0.0), None));
        let coordinates = driver.get_coordinates(10);

        assert_relative_eq!(coordinates.joystick_target_l0, 0.0);
        assert_relative_eq!(coordinates.joystick_target_l1, 0.0);
        assert_relative_eq!(coordinates.joystick_target_l2, 0.0);
    }

    #[test]
    fn axes_follow_device_permutation() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            use_polar_mode: false,
            ..RoboticsConfig::default()
        });
        driver.provide_target(&target(Vector3::new(0.1, 0.75, -0.2), None));
        let coordinates = driver.get_coordinates(10);

        assert_relative_eq!(coordinates.joystick_target_l0, 0.5, epsilon = 1e-6);
        assert_relative_eq!(coordinates.joystick_target_l1, 0.4, epsilon = 1e-6);
        assert_relative_eq!(coordinates.joystick_target_l2, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn virtual_scale_shrinks_inputs() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            use_polar_mode: false,
            virtual_scale: 2.0,
            ..RoboticsConfig::default()
        });
        driver.provide_target(&target(Vector3::new(0.4, 1.0, 0.0), None));
        let coordinates = driver.get_coordinates(10);

        assert_relative_eq!(coordinates.joystick_target_l0, 0.0, epsilon = 1e-6);
        assert_relative_eq!(coordinates.joystick_target_l2, 0.4, epsilon = 1e-6);
    }

    #[test]
    fn polar_clamp_bounds_lateral_at_bottom() {
        let config = RoboticsConfig::default();
        let mut driver = RoboticsDriver::new(config);

        for step in 0..40 {
            let angle = step as f32 * 0.157;
            let lateral = 0.5 * (step % 5) as f32 / 4.0;
            // Virtual Y of 0 is the lowest point, verticality 0.
            let position = Vector3::new(lateral * angle.cos(), 0.0, lateral * angle.sin());
            driver.provide_target(&target(position, None));

            let transitional = driver.transitional_coordinate();
            let lateral_magnitude = Vector2::new(transitional.y, transitional.z).norm();
            assert_relative_eq!(transitional.x, -1.0);
            assert!(lateral_magnitude <= config.polar_bottom_radius + 1e-6);
        }
    }

    #[test]
    fn polar_radius_grows_with_height() {
        let mut driver = RoboticsDriver::default();
        driver.provide_target(&target(Vector3::new(0.5, 0.5, 0.0), None));
        let coordinates = driver.get_coordinates(10);
        // Halfway up the allowed radius is halfway between 0.4 and 1.0.
        assert_relative_eq!(coordinates.joystick_target_l2, 0.7, epsilon = 1e-6);
    }

    #[test]
    fn angles_come_from_normal() {
        let mut driver = RoboticsDriver::default();
        let normal = Vector3::new(0.5, 0.0, 0.0);
        driver.provide_target(&target(Vector3::new(0.0, 0.5, 0.0), Some(normal)));
        let coordinates = driver.get_coordinates(10);

        // Device normal is (0, 0, 0.5): R1 from -z, R2 from y.
        assert_relative_eq!(coordinates.angle_deg_r0, 0.0);
        assert_relative_eq!(coordinates.angle_deg_r1, -30.0, epsilon = 1e-4);
        assert_relative_eq!(coordinates.angle_deg_r2, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn target_without_normal_keeps_angles() {
        let mut driver = RoboticsDriver::default();
        driver.provide_target(&target(Vector3::new(0.0, 0.5, 0.0), Some(Vector3::new(0.0, 0.0, -0.5))));
        let first = driver.get_coordinates(10);
        driver.provide_target(&target(Vector3::new(0.0, 0.6, 0.0), None));
        let second = driver.get_coordinates(10);

        assert_relative_eq!(first.angle_deg_r2, 30.0, epsilon = 1e-4);
        assert_eq!(second.angles(), first.angles());
        assert_ne!(second.joystick_target_l0, first.joystick_target_l0);
    }

    #[test]
    fn far_target_is_ignored_without_root_pid() {
        let mut driver = RoboticsDriver::default();
        driver.provide_target(&target(Vector3::new(0.0, 0.5, 0.0), None));
        let before = driver.get_coordinates(10);

        driver.provide_target(&target(Vector3::new(5.0, 0.5, 0.0), None));
        assert_eq!(driver.get_coordinates(10), before);
    }

    #[test]
    fn non_finite_target_is_ignored() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            system_pitch_degrees: 10.0,
            ..RoboticsConfig::default()
        });
        driver.provide_target(&target(Vector3::new(0.1, 0.8, 0.2), None));
        let before = driver.get_coordinates(10);

        // The pitch rotation turns an infinite component into NaN on other axes.
        driver.provide_target(&target(Vector3::new(f32::INFINITY, 0.5, 0.0), None));
        assert_eq!(driver.get_coordinates(10), before);
        driver.provide_target(&target(Vector3::new(0.0, f32::NAN, 0.0), None));
        assert_eq!(driver.get_coordinates(10), before);
    }

    #[test]
    fn non_finite_target_is_ignored_with_root_pid() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            use_pid_root: true,
            ..RoboticsConfig::default()
        });
        driver.provide_target(&target(Vector3::new(f32::INFINITY, 0.5, 0.0), None));
        let coordinates = driver.get_coordinates(10);

        assert!(coordinates.joysticks().iter().all(|value| value.is_finite()));
        assert_eq!(coordinates, RoboticsCoordinates::default());
    }

    #[test]
    fn root_pid_skips_safety_gate() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            use_pid_root: true,
            use_polar_mode: false,
            ..RoboticsConfig::default()
        });
        driver.provide_target(&target(Vector3::new(5.0, 0.5, 0.0), None));
        let coordinates = driver.get_coordinates(10);

        // Root estimate starts at zero, so the whole jump reaches the clamped output.
        assert_relative_eq!(coordinates.joystick_target_l2, 1.0);
        assert_relative_eq!(coordinates.joystick_target_l0, 0.0);
        assert_in_declared_ranges(&coordinates);
    }

    #[test]
    fn topmost_hard_limit_clips_vertical_axis() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            topmost_hard_limit: 0.75,
            ..RoboticsConfig::default()
        });
        driver.provide_target(&target(Vector3::new(0.0, 1.0, 0.0), None));
        assert_relative_eq!(driver.get_coordinates(10).joystick_target_l0, 0.5);

        driver.provide_target(&target(Vector3::new(0.0, 0.25, 0.0), None));
        assert_relative_eq!(driver.get_coordinates(10).joystick_target_l0, -0.5);
    }

    #[test]
    fn offsets_are_applied_before_final_clamp() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            offset_joystick_l1: 0.25,
            offset_angle_r1: 50.0,
            offset_angle_r0: 400.0,
            ..RoboticsConfig::default()
        });
        driver.provide_target(&target(
            Vector3::new(0.0, 0.5, 0.0),
            Some(Vector3::new(0.5, 0.0, 0.0)),
        ));
        let coordinates = driver.get_coordinates(10);

        assert_relative_eq!(coordinates.joystick_target_l1, 0.25);
        assert_relative_eq!(coordinates.angle_deg_r1, 20.0, epsilon = 1e-4);
        assert_relative_eq!(coordinates.angle_deg_r0, 360.0);
    }

    #[test]
    fn system_pitch_rotates_about_z() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            use_polar_mode: false,
            system_pitch_degrees: -90.0,
            ..RoboticsConfig::default()
        });
        // Device position (0.25, 0, 0) turns into (0, 0.25, 0).
        driver.provide_target(&target(Vector3::new(0.0, 0.25, 0.0), None));
        let coordinates = driver.get_coordinates(10);

        assert_relative_eq!(coordinates.joystick_target_l0, -1.0, epsilon = 1e-5);
        assert_relative_eq!(coordinates.joystick_target_l1, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn output_is_pure_without_pid() {
        let mut driver = RoboticsDriver::default();
        driver.provide_target(&target(
            Vector3::new(0.1, 0.3, -0.2),
            Some(Vector3::new(0.2, 0.3, 0.9)),
        ));
        let first = driver.get_coordinates(10);
        for delta in [0, 1, 250, 1000] {
            assert_eq!(driver.get_coordinates(delta), first);
        }

        let mut replay = RoboticsDriver::default();
        replay.get_coordinates(33);
        replay.provide_target(&target(
            Vector3::new(0.1, 0.3, -0.2),
            Some(Vector3::new(0.2, 0.3, 0.9)),
        ));
        assert_eq!(replay.get_coordinates(7), first);
    }

    #[test]
    fn target_pid_damps_towards_transitional() {
        let mut driver = RoboticsDriver::new(RoboticsConfig {
            use_pid_target: true,
            ..RoboticsConfig::default()
        });
        driver.provide_target(&target(Vector3::new(0.0, 1.0, 0.0), None));

        let first = driver.get_coordinates(10);
        assert!(first.joystick_target_l0 > 0.0 && first.joystick_target_l0 < 1.0);
        let mut latest = first;
        for _ in 0..2000 {
            latest = driver.get_coordinates(10);
        }
        assert_relative_eq!(latest.joystick_target_l0, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn enabling_target_pid_starts_from_current_pose() {
        let mut driver = RoboticsDriver::default();
        driver.provide_target(&target(Vector3::new(0.0, 0.75, 0.0), None));
        let undamped = driver.get_coordinates(10);

        driver.update_configuration(RoboticsConfig {
            use_pid_target: true,
            ..RoboticsConfig::default()
        });
        let damped = driver.get_coordinates(10);
        assert_relative_eq!(damped.joystick_target_l0, undamped.joystick_target_l0, epsilon = 1e-6);
    }

    #[test]
    fn every_path_respects_declared_ranges() {
        let configs = [
            RoboticsConfig::default(),
            RoboticsConfig {
                use_polar_mode: false,
                safety_ignore_distance: 100.0,
                ..RoboticsConfig::default()
            },
            RoboticsConfig {
                use_pid_target: true,
                offset_joystick_l0: 0.9,
                offset_angle_r2: -80.0,
                ..RoboticsConfig::default()
            },
        ];
        for config in configs {
            let mut driver = RoboticsDriver::new(config);
            for step in 0..25 {
                let t = step as f32;
                driver.provide_target(&target(
                    Vector3::new(t.sin() * 3.0, t.cos() * 2.0, (t * 0.3).sin()),
                    Some(Vector3::new(t.cos(), t.sin(), 0.5)),
                ));
                assert_in_declared_ranges(&driver.get_coordinates(16));
            }
        }
    }
}
