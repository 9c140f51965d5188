use nalgebra::Vector3;
use shared_definitions::payload::{
    DataValidity, DecodedLight, DecodedPayload, LightAvailability, CAMERA_POSE_MIN_VERSION,
};

use crate::config::constants::{
    ATTENUATION_SCALE, FALLBACK_RANGE, OUR_MAJOR_VERSION, OUR_VENDOR, RANGE_MULTIPLIER,
    SAME_TIME_TOLERANCE,
};

use super::words::{
    checksum_of_bits, read_float, read_vector, read_word, WORD_CAMERA_POSITION,
    WORD_CAMERA_ROTATION, WORD_CHECKSUM, WORD_LIGHT_ATTENUATIONS, WORD_LIGHT_COLORS,
    WORD_LIGHT_POSITIONS, WORD_TIME, WORD_VENDOR, WORD_VERSION,
};

/// Decodes bit grids into a long lived [`DecodedPayload`].
///
/// A rejected frame only changes `validity`; every other field keeps the last accepted value.
/// The decoder remembers the last validity that got past the checksum, so a frame that repeats
/// the previous time reports that instead of flickering.
pub struct PayloadDecoder {
    last_checksum_passing_validity: DataValidity,
}

impl PayloadDecoder {
    pub fn new() -> Self {
        PayloadDecoder {
            last_checksum_passing_validity: DataValidity::NotInitialized,
        }
    }

    pub fn last_checksum_passing_validity(&self) -> DataValidity {
        self.last_checksum_passing_validity
    }

    pub fn decode_into(&mut self, payload: &mut DecodedPayload, bits: &[bool]) {
        let previous_validity = payload.validity;
        payload.validity = self.decode_frame(payload, bits);
        if payload.validity != previous_validity {
            log::debug!(
                "Payload validity {:?} -> {:?}",
                previous_validity,
                payload.validity
            );
        }
    }

    fn decode_frame(&mut self, payload: &mut DecodedPayload, bits: &[bool]) -> DataValidity {
        if read_word(bits, WORD_CHECKSUM) != checksum_of_bits(bits) {
            return DataValidity::InvalidChecksum;
        }

        let time = read_float(bits, WORD_TIME);
        if (time - payload.time).abs() < SAME_TIME_TOLERANCE {
            return self.last_checksum_passing_validity;
        }
        payload.time = time;

        if read_word(bits, WORD_VENDOR) != OUR_VENDOR {
            return self.remember(DataValidity::UnexpectedVendor);
        }

        let version = read_word(bits, WORD_VERSION);
        payload.version = version;
        if version / 1_000_000 != OUR_MAJOR_VERSION {
            return self.remember(DataValidity::UnexpectedMajorVersion);
        }

        for (index, light) in payload.lights.iter_mut().enumerate() {
            decode_light(light, bits, index);
        }

        if version >= CAMERA_POSE_MIN_VERSION {
            payload.camera_position = finite_or_zero(read_vector(bits, WORD_CAMERA_POSITION));
            payload.camera_rotation = finite_or_zero(read_vector(bits, WORD_CAMERA_ROTATION));
        } else {
            payload.camera_position = Vector3::zeros();
            payload.camera_rotation = Vector3::zeros();
        }

        self.remember(DataValidity::Ok)
    }

    fn remember(&mut self, validity: DataValidity) -> DataValidity {
        self.last_checksum_passing_validity = validity;
        validity
    }
}

impl Default for PayloadDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_light(light: &mut DecodedLight, bits: &[bool], index: usize) {
    let position = read_vector(bits, WORD_LIGHT_POSITIONS + index * 3);
    if has_nan(&position) {
        light.availability.remove(LightAvailability::POSITION);
    } else {
        light.position = position;
        light.availability.insert(LightAvailability::POSITION);
    }

    let color_index = WORD_LIGHT_COLORS + index * 4;
    let color = read_vector(bits, color_index);
    let intensity = read_float(bits, color_index + 3);
    if has_nan(&color) || intensity.is_nan() {
        light.availability.remove(LightAvailability::COLOR);
    } else {
        light.color = color;
        light.intensity = intensity;
        light.enabled = intensity > 0.0;
        light.availability.insert(LightAvailability::COLOR);
    }

    let attenuation = read_float(bits, WORD_LIGHT_ATTENUATIONS + index);
    if attenuation.is_nan() {
        light.availability.remove(LightAvailability::RANGE);
    } else {
        light.attenuation = attenuation;
        light.range = range_from_attenuation(attenuation);
        light.availability.insert(LightAvailability::RANGE);
    }
}

/// Light range encoded through attenuation; anything not finite falls back to `1.0`.
pub fn range_from_attenuation(attenuation: f32) -> f32 {
    let range =
        RANGE_MULTIPLIER * libm::sqrtf(ATTENUATION_SCALE - attenuation) / libm::sqrtf(attenuation);
    if range.is_finite() {
        range
    } else {
        FALLBACK_RANGE
    }
}

fn has_nan(vector: &Vector3<f32>) -> bool {
    vector.iter().any(|component| component.is_nan())
}

fn finite_or_zero(vector: Vector3<f32>) -> Vector3<f32> {
    if vector.iter().all(|component| component.is_finite()) {
        vector
    } else {
        Vector3::zeros()
    }
}
