use nalgebra::Vector3;

use crate::config::constants::SCALE_EVALUATION_INTERVAL_MS;

const MIN_PHYSICAL_TRAVEL: f32 = 0.25;
const MAX_SETTLED_MOVEMENT: f32 = 0.005;

/// Estimates how virtual distances relate to physical ones by comparing how far the
/// headset moved against how far the rendering camera moved between two resting poses.
pub struct ScaleEvaluator {
    virtual_scale: f32,
    sampled_hmd_position: Vector3<f32>,
    sampled_camera_position: Vector3<f32>,
    last_hmd_position: Vector3<f32>,
    last_camera_position: Vector3<f32>,
    next_evaluation_ms: u64,
}

impl ScaleEvaluator {
    pub fn new() -> Self {
        ScaleEvaluator {
            virtual_scale: 1.0,
            sampled_hmd_position: Vector3::zeros(),
            sampled_camera_position: Vector3::zeros(),
            last_hmd_position: Vector3::zeros(),
            last_camera_position: Vector3::zeros(),
            next_evaluation_ms: 0,
        }
    }

    pub fn virtual_scale(&self) -> f32 {
        self.virtual_scale
    }

    pub fn evaluate(&mut self, now_ms: u64, hmd_position: Vector3<f32>, camera_position: Vector3<f32>) {
        if now_ms < self.next_evaluation_ms {
            return;
        }
        self.next_evaluation_ms = now_ms + SCALE_EVALUATION_INTERVAL_MS;

        // Both need to have moved since the last sample to compare anything.
        if hmd_position == self.sampled_hmd_position
            || camera_position == self.sampled_camera_position
        {
            self.last_hmd_position = hmd_position;
            self.last_camera_position = camera_position;
            return;
        }

        let virtual_change = (camera_position - self.sampled_camera_position).norm();
        let physical_change = (hmd_position - self.sampled_hmd_position).norm();

        if physical_change > MIN_PHYSICAL_TRAVEL {
            let recent_physical_change = (hmd_position - self.last_hmd_position).norm();
            if recent_physical_change < MAX_SETTLED_MOVEMENT {
                self.virtual_scale = virtual_change / physical_change;
                self.sampled_hmd_position = hmd_position;
                self.sampled_camera_position = camera_position;
                log::debug!("Virtual scale estimated at {}", self.virtual_scale);
            }
        }

        self.last_hmd_position = hmd_position;
        self.last_camera_position = camera_position;
    }
}

impl Default for ScaleEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
