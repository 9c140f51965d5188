use nalgebra::{UnitQuaternion, Vector2, Vector3};

/// Virtual space axes to device axes: device up is virtual Y, device away is virtual -Z,
/// device lateral is virtual X.
pub fn reorient_to_device_space(virtual_vector: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(virtual_vector.y, -virtual_vector.z, virtual_vector.x)
}

/// Shrinks `vector` to `max_magnitude` when longer, keeping its direction.
pub fn clamp_magnitude(vector: Vector3<f32>, max_magnitude: f32) -> Vector3<f32> {
    let magnitude = vector.norm();
    if magnitude > max_magnitude && magnitude > 0.0 {
        vector * (max_magnitude / magnitude)
    } else {
        vector
    }
}

pub fn clamp_magnitude_2d(vector: Vector2<f32>, max_magnitude: f32) -> Vector2<f32> {
    let magnitude = vector.norm();
    if magnitude > max_magnitude && magnitude > 0.0 {
        vector * (max_magnitude / magnitude)
    } else {
        vector
    }
}

pub fn rotation_about_z_degrees(angle_degrees: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle_degrees.to_radians())
}
