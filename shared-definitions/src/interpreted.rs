use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// The single tracked point chosen for this frame, with its optional surface orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpretedTarget {
    pub has_target: bool,
    pub position: Vector3<f32>,
    pub has_normal: bool,
    pub normal: Vector3<f32>,
    pub has_tangent: bool,
    pub tangent: Vector3<f32>,
    pub is_hole: bool,
    pub is_ring: bool,
}

impl InterpretedTarget {
    pub fn none() -> Self {
        InterpretedTarget {
            has_target: false,
            position: Vector3::zeros(),
            has_normal: false,
            normal: Vector3::zeros(),
            has_tangent: false,
            tangent: Vector3::zeros(),
            is_hole: false,
            is_ring: false,
        }
    }

    /// Target received from outside the capture pipeline. Directions are normalized here.
    pub fn direct(
        position: Vector3<f32>,
        normal: Vector3<f32>,
        tangent: Option<Vector3<f32>>,
    ) -> Self {
        InterpretedTarget {
            has_target: true,
            position,
            has_normal: true,
            normal: normalize_or_zero(normal),
            has_tangent: tangent.is_some(),
            tangent: tangent.map(normalize_or_zero).unwrap_or_else(Vector3::zeros),
            is_hole: false,
            is_ring: false,
        }
    }
}

impl Default for InterpretedTarget {
    fn default() -> Self {
        Self::none()
    }
}

fn normalize_or_zero(vector: Vector3<f32>) -> Vector3<f32> {
    vector
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_target_normalizes_directions() {
        let target = InterpretedTarget::direct(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, -4.0),
            Some(Vector3::new(2.0, 0.0, 0.0)),
        );
        assert!(target.has_target && target.has_normal && target.has_tangent);
        assert_eq!(target.normal, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(target.tangent, Vector3::new(1.0, 0.0, 0.0));
        assert!(!target.is_hole && !target.is_ring);
    }

    #[test]
    fn direct_target_without_tangent() {
        let target =
            InterpretedTarget::direct(Vector3::zeros(), Vector3::new(0.0, 3.0, 0.0), None);
        assert!(!target.has_tangent);
        assert_eq!(target.tangent, Vector3::zeros());
    }
}
