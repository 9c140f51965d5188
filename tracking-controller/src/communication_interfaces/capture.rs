use nalgebra::Vector3;
use shared_definitions::extraction::{ExtractionCoordinates, ExtractionResult};

use crate::config::constants::{VR_MIRROR_SCALE_DIVISOR, VR_REFERENCE_VERTICAL_RESOLUTION};

/// Source of monochrome pixels, such as a window grabber or a compositor mirror texture.
pub trait CaptureBackend {
    /// Grabs the requested area. A failed capture returns `success == false` and is retried next tick.
    fn extract(&mut self, coordinates: &ExtractionCoordinates) -> ExtractionResult;

    /// How much larger than the nominal encoded area this backend's captures are.
    fn scale_factor(&self) -> f32 {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeStatus {
    Running,
    Exited,
}

/// Connection to the external VR runtime. Polled from the routine thread only.
pub trait ExternalRuntimeSession {
    fn try_start(&mut self) -> bool;

    fn poll_events(&mut self) -> RuntimeStatus;

    fn hmd_position(&mut self) -> Option<Vector3<f32>> {
        None
    }
}

/// Scale of a compositor mirror capture for a headset with the given eye texture height.
pub fn vr_mirror_scale_factor(vertical_resolution: u32) -> f32 {
    (1.0 / VR_MIRROR_SCALE_DIVISOR) * (vertical_resolution as f32 / VR_REFERENCE_VERTICAL_RESOLUTION)
}

/// Runtime session for hosts without a VR runtime. Never starts.
#[derive(Debug, Default)]
pub struct NoRuntimeSession;

impl ExternalRuntimeSession for NoRuntimeSession {
    fn try_start(&mut self) -> bool {
        false
    }

    fn poll_events(&mut self) -> RuntimeStatus {
        RuntimeStatus::Exited
    }
}
