use shared_definitions::robotics::RoboticsCoordinates;

use crate::util::error::AppResult;

/// Outbound link to the actuator rig.
///
/// Implementations own their transport: a failed write closes it and `is_open`
/// stays false until the host asks for `open` again.
pub trait Transmitter {
    fn is_open(&self) -> bool;

    fn open(&mut self) -> AppResult<()>;

    fn close(&mut self);

    fn provide_new_target(&mut self, coordinates: &RoboticsCoordinates);

    /// Called once per routine tick while open, with the time since the previous call.
    fn update(&mut self, elapsed_ms: u64);
}
