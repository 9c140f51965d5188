pub mod vectors;

pub fn constraint_value(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        return constraint_value(0.0, min, max);
    }
    if value > max {
        return max;
    }
    if value < min {
        return min;
    }
    value
}

pub fn clamp01(value: f32) -> f32 {
    constraint_value(value, 0.0, 1.0)
}

/// Linear remap of `value` from `[from_min, from_max]` to `[to_min, to_max]`, unclamped.
pub fn remap(value: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    to_min + (value - from_min) * (to_max - to_min) / (from_max - from_min)
}

pub fn remap_and_clamp(value: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    let (low, high) = if to_min <= to_max {
        (to_min, to_max)
    } else {
        (to_max, to_min)
    };
    constraint_value(remap(value, from_min, from_max, to_min, to_max), low, high)
}

/// Angle in degrees whose sine is `component`; inputs outside `[-1, 1]` saturate.
pub fn normal_component_to_degrees(component: f32) -> f32 {
    libm::asinf(constraint_value(component, -1.0, 1.0)).to_degrees()
}
