pub mod control_loops;
pub mod integrator;
pub mod pid;
pub mod robotics_driver;
pub mod scale_evaluator;
