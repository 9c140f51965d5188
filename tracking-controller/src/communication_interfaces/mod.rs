pub mod capture;
pub mod network;
pub mod tcode;
pub mod transmitter;
