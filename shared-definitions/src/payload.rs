use bitflags::bitflags;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub const LIGHT_COUNT: usize = 4;

/// First encoded version carrying the camera position and rotation.
pub const CAMERA_POSE_MIN_VERSION: u32 = 1_001_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataValidity {
    #[default]
    NotInitialized,
    Ok,
    InvalidChecksum,
    UnexpectedVendor,
    UnexpectedMajorVersion,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct LightAvailability: u8 {
        const POSITION = 0b0000_0001;
        const COLOR = 0b0000_0010;
        const RANGE = 0b0000_0100;
    }
}

/// One light record of the payload. Fields flagged unavailable hold the last value that was.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodedLight {
    pub availability: LightAvailability,
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
    pub enabled: bool,
    pub attenuation: f32,
    pub range: f32,
}

impl DecodedLight {
    pub fn new() -> Self {
        DecodedLight {
            availability: LightAvailability::empty(),
            position: Vector3::zeros(),
            color: Vector3::zeros(),
            intensity: 0.0,
            enabled: false,
            attenuation: 0.0,
            range: 0.0,
        }
    }

    pub fn position(&self) -> Option<Vector3<f32>> {
        self.availability
            .contains(LightAvailability::POSITION)
            .then_some(self.position)
    }

    pub fn color(&self) -> Option<(Vector3<f32>, f32)> {
        self.availability
            .contains(LightAvailability::COLOR)
            .then_some((self.color, self.intensity))
    }

    pub fn range(&self) -> Option<f32> {
        self.availability
            .contains(LightAvailability::RANGE)
            .then_some(self.range)
    }

    pub fn is_black(&self) -> bool {
        self.color.x == 0.0 && self.color.y == 0.0 && self.color.z == 0.0
    }
}

impl Default for DecodedLight {
    fn default() -> Self {
        Self::new()
    }
}

/// Long lived decode state. A failed decode only touches `validity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodedPayload {
    pub validity: DataValidity,
    pub version: u32,
    /// NaN until the first frame is accepted, so that frame is never mistaken for a repeat.
    pub time: f32,
    pub lights: [DecodedLight; LIGHT_COUNT],
    pub camera_position: Vector3<f32>,
    pub camera_rotation: Vector3<f32>,
}

impl DecodedPayload {
    pub fn new() -> Self {
        DecodedPayload {
            validity: DataValidity::NotInitialized,
            version: 0,
            time: f32::NAN,
            lights: [DecodedLight::new(); LIGHT_COUNT],
            camera_position: Vector3::zeros(),
            camera_rotation: Vector3::zeros(),
        }
    }

    pub fn major_version(&self) -> u32 {
        self.version / 1_000_000
    }

    pub fn minor_version(&self) -> u32 {
        (self.version / 1_000) % 1_000
    }

    pub fn patch_version(&self) -> u32 {
        self.version % 1_000
    }

    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}",
            self.major_version(),
            self.minor_version(),
            self.patch_version()
        )
    }

    pub fn has_camera_pose(&self) -> bool {
        self.version >= CAMERA_POSE_MIN_VERSION
    }
}

impl Default for DecodedPayload {
    fn default() -> Self {
        Self::new()
    }
}

pub const fn encode_version(major: u32, minor: u32, patch: u32) -> u32 {
    major * 1_000_000 + minor * 1_000 + patch
}
