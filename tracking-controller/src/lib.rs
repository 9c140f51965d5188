//! Reads a bit-encoded position payload out of captured pixels and drives a T-code
//! actuator rig towards the light it describes.

pub mod communication_interfaces;
pub mod config;
pub mod control;
pub mod decoding;
pub mod shared_core_values;
pub mod telemetry;
pub mod threads;
pub mod util;

pub use control::control_loops::{Routine, RoutineCollaborators, RoutineHandle, RoutineRequest};
pub use util::error::{AppError, AppResult};
