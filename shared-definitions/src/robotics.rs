use serde::{Deserialize, Serialize};

/// Six channel command for the actuator rig.
///
/// Joystick targets are normalized to `[-1, 1]`, angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoboticsCoordinates {
    pub joystick_target_l0: f32,
    pub joystick_target_l1: f32,
    pub joystick_target_l2: f32,
    pub angle_deg_r0: f32,
    pub angle_deg_r1: f32,
    pub angle_deg_r2: f32,
}

impl RoboticsCoordinates {
    pub fn joysticks(&self) -> [f32; 3] {
        [
            self.joystick_target_l0,
            self.joystick_target_l1,
            self.joystick_target_l2,
        ]
    }

    pub fn angles(&self) -> [f32; 3] {
        [self.angle_deg_r0, self.angle_deg_r1, self.angle_deg_r2]
    }
}
