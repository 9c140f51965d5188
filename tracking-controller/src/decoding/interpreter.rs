use shared_definitions::{
    interpreted::InterpretedTarget,
    payload::{DecodedLight, DecodedPayload},
};

use crate::config::constants::{
    DIRECTION_RANGE, HOLE_RANGE, RANGE_TOLERANCE, RING_RANGE, SUSPICIOUS_NORMAL_DISTANCE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LightRole {
    Hole,
    Ring,
    Direction,
}

impl LightRole {
    fn of(light: &DecodedLight) -> Option<Self> {
        if !light.enabled || !light.is_black() {
            return None;
        }
        [
            (LightRole::Hole, HOLE_RANGE),
            (LightRole::Ring, RING_RANGE),
            (LightRole::Direction, DIRECTION_RANGE),
        ]
        .into_iter()
        .find(|(_, range)| (light.range - range).abs() < RANGE_TOLERANCE)
        .map(|(role, _)| role)
    }
}

/// Picks the tracked target out of the decoded lights.
///
/// Data lights are black, enabled, and tag their role through their range.
/// The hole or ring closest to the origin is the target; a direction light
/// close enough to it gives the surface normal.
#[derive(Debug, Default)]
pub struct LightInterpreter;

impl LightInterpreter {
    pub fn new() -> Self {
        LightInterpreter
    }

    pub fn interpret(&self, payload: &DecodedPayload) -> InterpretedTarget {
        let tagged: Vec<(LightRole, &DecodedLight)> = payload
            .lights
            .iter()
            .filter_map(|light| LightRole::of(light).map(|role| (role, light)))
            .collect();

        let mut candidates: Vec<(LightRole, &DecodedLight)> = tagged
            .iter()
            .filter(|(role, _)| *role == LightRole::Hole)
            .chain(tagged.iter().filter(|(role, _)| *role == LightRole::Ring))
            .copied()
            .collect();
        candidates.sort_by(|(_, a), (_, b)| {
            a.position
                .norm_squared()
                .total_cmp(&b.position.norm_squared())
        });

        let Some((role, target)) = candidates.first().copied() else {
            return InterpretedTarget::none();
        };

        let mut interpreted = InterpretedTarget {
            has_target: true,
            position: target.position,
            is_hole: role == LightRole::Hole,
            is_ring: role == LightRole::Ring,
            ..InterpretedTarget::none()
        };

        let closest_direction = tagged
            .iter()
            .filter(|(role, _)| *role == LightRole::Direction)
            .map(|(_, light)| light.position)
            .min_by(|a, b| {
                (target.position - a)
                    .norm()
                    .total_cmp(&(target.position - b).norm())
            });

        if let Some(direction) = closest_direction {
            let offset = target.position - direction;
            if offset.norm() < SUSPICIOUS_NORMAL_DISTANCE {
                if let Some(normal) = offset.try_normalize(f32::EPSILON) {
                    interpreted.has_normal = true;
                    interpreted.normal = normal;
                }
            }
        }

        interpreted
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use shared_definitions::payload::LightAvailability;

    use super::*;

    fn data_light(position: Vector3<f32>, range: f32) -> DecodedLight {
        DecodedLight {
            availability: LightAvailability::all(),
            position,
            color: Vector3::zeros(),
            intensity: 1.0,
            enabled: true,
            attenuation: 0.0,
            range,
        }
    }

    fn payload_with(lights: [DecodedLight; 4]) -> DecodedPayload {
        DecodedPayload {
            lights,
            ..DecodedPayload::new()
        }
    }

    #[test]
    fn no_data_lights_means_no_target() {
        let target = LightInterpreter::new().interpret(&DecodedPayload::new());
        assert!(!target.has_target);
    }

    #[test]
    fn picks_closest_hole_or_ring_to_origin() {
        let payload = payload_with([
            data_light(Vector3::new(0.0, 2.0, 0.0), HOLE_RANGE),
            data_light(Vector3::new(0.0, 0.5, 0.0), RING_RANGE + 0.004),
            data_light(Vector3::new(0.0, 0.1, 0.0), 0.3),
            DecodedLight::new(),
        ]);
        let target = LightInterpreter::new().interpret(&payload);

        assert!(target.has_target);
        assert!(target.is_ring && !target.is_hole);
        assert_eq!(target.position, Vector3::new(0.0, 0.5, 0.0));
        assert!(!target.has_normal);
    }

    #[test]
    fn ties_keep_holes_first() {
        let payload = payload_with([
            data_light(Vector3::new(0.0, 1.0, 0.0), RING_RANGE),
            data_light(Vector3::new(1.0, 0.0, 0.0), HOLE_RANGE),
            DecodedLight::new(),
            DecodedLight::new(),
        ]);
        let target = LightInterpreter::new().interpret(&payload);
        assert!(target.is_hole);
        assert_eq!(target.position, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn colored_or_disabled_lights_are_ignored() {
        let mut colored = data_light(Vector3::new(0.1, 0.0, 0.0), HOLE_RANGE);
        colored.color = Vector3::new(0.0, 0.0, 0.01);
        let mut disabled = data_light(Vector3::new(0.2, 0.0, 0.0), HOLE_RANGE);
        disabled.enabled = false;

        let payload = payload_with([colored, disabled, DecodedLight::new(), DecodedLight::new()]);
        assert!(!LightInterpreter::new().interpret(&payload).has_target);
    }

    #[test]
    fn nearby_direction_light_gives_normal() {
        let payload = payload_with([
            data_light(Vector3::new(0.5, 0.0, 0.0), HOLE_RANGE),
            data_light(Vector3::new(0.5, 0.0, 0.2), DIRECTION_RANGE),
            data_light(Vector3::new(0.5, 0.0, 0.25), DIRECTION_RANGE),
            DecodedLight::new(),
        ]);
        let target = LightInterpreter::new().interpret(&payload);

        assert!(target.has_normal);
        assert_relative_eq!(target.normal, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn distant_direction_light_is_suspicious() {
        let payload = payload_with([
            data_light(Vector3::new(0.5, 0.0, 0.0), HOLE_RANGE),
            data_light(Vector3::new(0.5, 0.0, 0.35), DIRECTION_RANGE),
            DecodedLight::new(),
            DecodedLight::new(),
        ]);
        let target = LightInterpreter::new().interpret(&payload);
        assert!(target.has_target);
        assert!(!target.has_normal);
    }
}
