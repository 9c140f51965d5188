use crate::control::pid::PidTuning;

// Frame protocol
pub const OUR_VENDOR: u32 = 1366692562;
pub const OUR_MAJOR_VERSION: u32 = 1;
pub const SAME_TIME_TOLERANCE: f32 = 0.0001;
pub const ATTENUATION_SCALE: f32 = 1_000_000.0;
pub const RANGE_MULTIPLIER: f32 = 0.005;
pub const FALLBACK_RANGE: f32 = 1.0;

// Bit sampling
pub const FIXED_BRIGHTNESS_THRESHOLD: u8 = 110;

// Light interpretation
pub const HOLE_RANGE: f32 = 0.41;
pub const RING_RANGE: f32 = 0.42;
pub const DIRECTION_RANGE: f32 = 0.45;
pub const RANGE_TOLERANCE: f32 = 0.005;
pub const SUSPICIOUS_NORMAL_DISTANCE: f32 = 0.3;

// Device limits
pub const JOYSTICK_LIMIT: f32 = 1.0;
pub const TWIST_LIMIT_DEG: f32 = 360.0;
pub const ANGLE_LIMIT_DEG: f32 = 65.0;
pub const VERTICAL_DOMAIN: (f32, f32) = (0.0, 1.0);
pub const LATERAL_DOMAIN: (f32, f32) = (-0.5, 0.5);

// PID gains
pub const ROOT_PID_TUNING: PidTuning = PidTuning {
    proportional_multiplier: 0.003,
    integral_multiplier: 0.003,
    derivative_multiplier: 0.01,
    max_integral_magnitude: 0.1,
};
pub const TARGET_PID_TUNING: PidTuning = PidTuning {
    proportional_multiplier: 0.05,
    integral_multiplier: 1.0,
    derivative_multiplier: 0.0,
    max_integral_magnitude: 0.1,
};

// Routine pacing
pub const TICK_BUDGET_MS: u64 = 10;
pub const FIRST_TICK_DELTA_MS: u64 = 10;
pub const MAX_TRANSMISSION_DELTA_MS: u64 = 1000;
pub const RUNTIME_RETRY_INTERVAL_MS: u64 = 5000;
pub const SCALE_EVALUATION_INTERVAL_MS: u64 = 100;

// VR mirror capture, eye texture height the encoded area was authored against
pub const VR_REFERENCE_VERTICAL_RESOLUTION: f32 = 3360.0;
pub const VR_MIRROR_SCALE_DIVISOR: f32 = 0.5945;

// Transport
pub const TCODE_BAUD_RATE: u32 = 115_200;
pub const TCODE_MAX_VALUE: u32 = 9999;
pub const TCODE_ROTATION_DEGREES_PER_UNIT: f32 = 35.0;
pub const NETWORK_DEFAULT_PORT: u16 = 56247;
pub const NETWORK_MESSAGE_PREFIX: &str = "PositionSystemInterpreted";
