use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

use shared_definitions::{payload::DataValidity, robotics::RoboticsCoordinates};

pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub const fn zero() -> Self {
        AtomicF32 {
            bits: AtomicU32::new(0),
        }
    }

    pub fn new(value: f32) -> Self {
        AtomicF32 {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

pub struct AtomicRoboticsCoordinates {
    joystick_target_l0: AtomicF32,
    joystick_target_l1: AtomicF32,
    joystick_target_l2: AtomicF32,
    angle_deg_r0: AtomicF32,
    angle_deg_r1: AtomicF32,
    angle_deg_r2: AtomicF32,
}

impl AtomicRoboticsCoordinates {
    pub const fn new() -> Self {
        Self {
            joystick_target_l0: AtomicF32::zero(),
            joystick_target_l1: AtomicF32::zero(),
            joystick_target_l2: AtomicF32::zero(),
            angle_deg_r0: AtomicF32::zero(),
            angle_deg_r1: AtomicF32::zero(),
            angle_deg_r2: AtomicF32::zero(),
        }
    }

    pub fn store(&self, coordinates: &RoboticsCoordinates) {
        self.joystick_target_l0.store(coordinates.joystick_target_l0);
        self.joystick_target_l1.store(coordinates.joystick_target_l1);
        self.joystick_target_l2.store(coordinates.joystick_target_l2);
        self.angle_deg_r0.store(coordinates.angle_deg_r0);
        self.angle_deg_r1.store(coordinates.angle_deg_r1);
        self.angle_deg_r2.store(coordinates.angle_deg_r2);
    }

    pub fn read(&self) -> RoboticsCoordinates {
        RoboticsCoordinates {
            joystick_target_l0: self.joystick_target_l0.load(),
            joystick_target_l1: self.joystick_target_l1.load(),
            joystick_target_l2: self.joystick_target_l2.load(),
            angle_deg_r0: self.angle_deg_r0.load(),
            angle_deg_r1: self.angle_deg_r1.load(),
            angle_deg_r2: self.angle_deg_r2.load(),
        }
    }
}

impl Default for AtomicRoboticsCoordinates {
    fn default() -> Self {
        Self::new()
    }
}

/// Values the routine publishes after every tick for other threads to read.
pub struct AtomicTelemetry {
    pub loop_exec_time_us: AtomicU64,
    validity: AtomicU8,
    pub has_target: AtomicBool,
    pub coordinates: AtomicRoboticsCoordinates,
    pub virtual_scale: AtomicF32,
    pub runtime_running: AtomicBool,
    pub transmitter_open: AtomicBool,
    pub tick_count: AtomicU64,
}

impl AtomicTelemetry {
    pub const fn new() -> Self {
        AtomicTelemetry {
            loop_exec_time_us: AtomicU64::new(0),
            validity: AtomicU8::new(validity_to_u8(DataValidity::NotInitialized)),
            has_target: AtomicBool::new(false),
            coordinates: AtomicRoboticsCoordinates::new(),
            // 1.0f32
            virtual_scale: AtomicF32 {
                bits: AtomicU32::new(0x3f80_0000),
            },
            runtime_running: AtomicBool::new(false),
            transmitter_open: AtomicBool::new(false),
            tick_count: AtomicU64::new(0),
        }
    }

    pub fn store_validity(&self, validity: DataValidity) {
        self.validity
            .store(validity_to_u8(validity), Ordering::Relaxed);
    }

    pub fn validity(&self) -> DataValidity {
        validity_from_u8(self.validity.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            loop_exec_time_us: self.loop_exec_time_us.load(Ordering::Relaxed),
            validity: self.validity(),
            has_target: self.has_target.load(Ordering::Relaxed),
            coordinates: self.coordinates.read(),
            virtual_scale: self.virtual_scale.load(),
            runtime_running: self.runtime_running.load(Ordering::Relaxed),
            transmitter_open: self.transmitter_open.load(Ordering::Relaxed),
            tick_count: self.tick_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for AtomicTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub loop_exec_time_us: u64,
    pub validity: DataValidity,
    pub has_target: bool,
    pub coordinates: RoboticsCoordinates,
    pub virtual_scale: f32,
    pub runtime_running: bool,
    pub transmitter_open: bool,
    pub tick_count: u64,
}

const fn validity_to_u8(validity: DataValidity) -> u8 {
    match validity {
        DataValidity::NotInitialized => 0,
        DataValidity::Ok => 1,
        DataValidity::InvalidChecksum => 2,
        DataValidity::UnexpectedVendor => 3,
        DataValidity::UnexpectedMajorVersion => 4,
    }
}

fn validity_from_u8(value: u8) -> DataValidity {
    match value {
        1 => DataValidity::Ok,
        2 => DataValidity::InvalidChecksum,
        3 => DataValidity::UnexpectedVendor,
        4 => DataValidity::UnexpectedMajorVersion,
        _ => DataValidity::NotInitialized,
    }
}
