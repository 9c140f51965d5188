use serde::{Deserialize, Serialize};
use shared_definitions::extraction::ExtractionCoordinates;

use crate::{decoding::bits::ThresholdPolicy, util::math::constraint_value};

const MIN_VIRTUAL_SCALE: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoboticsConfig {
    pub virtual_scale: f32,
    /// Experimental root stabilization, leave off until the gains are tuned.
    pub use_pid_root: bool,
    pub use_pid_target: bool,
    pub safety_ignore_distance: f32,
    pub use_polar_mode: bool,
    pub polar_top_radius: f32,
    pub polar_bottom_radius: f32,
    /// Fraction of the vertical travel the device may reach, `1.0` disables the limit.
    pub topmost_hard_limit: f32,
    pub system_pitch_degrees: f32,
    pub offset_joystick_l0: f32,
    pub offset_joystick_l1: f32,
    pub offset_joystick_l2: f32,
    pub offset_angle_r0: f32,
    pub offset_angle_r1: f32,
    pub offset_angle_r2: f32,
}

impl RoboticsConfig {
    /// Copy with every value forced into the range the driver can work with.
    pub fn sanitized(&self) -> Self {
        RoboticsConfig {
            virtual_scale: if self.virtual_scale.is_finite() {
                self.virtual_scale.max(MIN_VIRTUAL_SCALE)
            } else {
                1.0
            },
            safety_ignore_distance: finite_or(self.safety_ignore_distance, 3.0).max(0.0),
            polar_top_radius: constraint_value(self.polar_top_radius, 0.0, 1.0),
            polar_bottom_radius: constraint_value(self.polar_bottom_radius, 0.0, 1.0),
            topmost_hard_limit: constraint_value(self.topmost_hard_limit, 0.0, 1.0),
            system_pitch_degrees: finite_or(self.system_pitch_degrees, 0.0),
            offset_joystick_l0: finite_or(self.offset_joystick_l0, 0.0),
            offset_joystick_l1: finite_or(self.offset_joystick_l1, 0.0),
            offset_joystick_l2: finite_or(self.offset_joystick_l2, 0.0),
            offset_angle_r0: finite_or(self.offset_angle_r0, 0.0),
            offset_angle_r1: finite_or(self.offset_angle_r1, 0.0),
            offset_angle_r2: finite_or(self.offset_angle_r2, 0.0),
            ..*self
        }
    }
}

impl Default for RoboticsConfig {
    fn default() -> Self {
        RoboticsConfig {
            virtual_scale: 1.0,
            use_pid_root: false,
            use_pid_target: false,
            safety_ignore_distance: 3.0,
            use_polar_mode: true,
            polar_top_radius: 1.0,
            polar_bottom_radius: 0.4,
            topmost_hard_limit: 1.0,
            system_pitch_degrees: 0.0,
            offset_joystick_l0: 0.0,
            offset_joystick_l1: 0.0,
            offset_joystick_l2: 0.0,
            offset_angle_r0: 0.0,
            offset_angle_r1: 0.0,
            offset_angle_r2: 0.0,
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractorPreference {
    #[default]
    PrioritizeVr,
    WindowOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub window_coordinates: ExtractionCoordinates,
    pub vr_coordinates: ExtractionCoordinates,
    pub preference: ExtractorPreference,
    pub threshold_policy: ThresholdPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            window_coordinates: ExtractionCoordinates::window_default(),
            vr_coordinates: ExtractionCoordinates::vr_default(),
            preference: ExtractorPreference::PrioritizeVr,
            threshold_policy: ThresholdPolicy::Otsu,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineConfig {
    pub extraction: ExtractionConfig,
    pub robotics: RoboticsConfig,
    pub auto_update: bool,
}

impl Default for RoutineConfig {
    fn default() -> Self {
        RoutineConfig {
            extraction: ExtractionConfig::default(),
            robotics: RoboticsConfig::default(),
            auto_update: true,
        }
    }
}
