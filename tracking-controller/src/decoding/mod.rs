pub mod bits;
pub mod frame_builder;
pub mod interpreter;
pub mod payload_decoder;
pub mod words;
