pub mod extraction;
pub mod interpreted;
pub mod layout;
pub mod payload;
pub mod robotics;

pub use nalgebra::Vector3;
