use std::io::Write;

use serde::{Deserialize, Serialize};
use shared_definitions::robotics::RoboticsCoordinates;

use crate::{
    config::constants::{TCODE_MAX_VALUE, TCODE_ROTATION_DEGREES_PER_UNIT},
    util::{
        error::{AppError, AppResult},
        math::{clamp01, constraint_value},
    },
};

use super::transmitter::Transmitter;

pub type TcodePort = Box<dyn Write + Send>;

/// Produces the byte sink T-code lines are written to.
pub trait PortOpener: Send {
    fn describe(&self) -> String;

    fn open_port(&mut self) -> AppResult<TcodePort>;
}

/// Maps `[-1, 1]` into `0..=9999`, `0.0` landing on `5000`.
pub fn encode_tcode_value(value: f32) -> u16 {
    let normalized = clamp01((constraint_value(value, -1.0, 1.0) + 1.0) / 2.0);
    libm::roundf(normalized * TCODE_MAX_VALUE as f32) as u16
}

pub fn format_tcode_line(axis: char, channel: u8, value: u16) -> String {
    format!("{axis}{channel}{value:04}\n")
}

/// Device values for the six channels, in protocol units.
///
/// L0 goes up, L1 goes away, L2 goes left. R0 twists counter-clockwise seen from above,
/// R1 rolls clockwise seen from the front, R2 leans away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcodeData {
    pub l0: u16,
    pub l1: u16,
    pub l2: u16,
    pub r0: u16,
    pub r1: u16,
    pub r2: u16,
}

impl TcodeData {
    pub fn from_coordinates(coordinates: &RoboticsCoordinates) -> Self {
        TcodeData {
            l0: encode_tcode_value(coordinates.joystick_target_l0),
            l1: encode_tcode_value(coordinates.joystick_target_l1),
            l2: encode_tcode_value(coordinates.joystick_target_l2),
            r0: encode_tcode_value(coordinates.angle_deg_r0 / TCODE_ROTATION_DEGREES_PER_UNIT),
            r1: encode_tcode_value(coordinates.angle_deg_r1 / TCODE_ROTATION_DEGREES_PER_UNIT),
            r2: encode_tcode_value(coordinates.angle_deg_r2 / TCODE_ROTATION_DEGREES_PER_UNIT),
        }
    }

    pub fn lines(&self) -> [String; 6] {
        [
            format_tcode_line('L', 0, self.l0),
            format_tcode_line('L', 1, self.l1),
            format_tcode_line('L', 2, self.l2),
            format_tcode_line('R', 0, self.r0),
            format_tcode_line('R', 1, self.r1),
            format_tcode_line('R', 2, self.r2),
        ]
    }
}

impl Default for TcodeData {
    fn default() -> Self {
        let center = encode_tcode_value(0.0);
        TcodeData {
            l0: center,
            l1: center,
            l2: center,
            r0: center,
            r1: center,
            r2: center,
        }
    }
}

/// [`Transmitter`] speaking T-code over whatever port the opener provides.
pub struct TcodeTransmitter {
    opener: Box<dyn PortOpener>,
    port: Option<TcodePort>,
    pending: Option<TcodeData>,
}

impl TcodeTransmitter {
    pub fn new(opener: Box<dyn PortOpener>) -> Self {
        TcodeTransmitter {
            opener,
            port: None,
            pending: None,
        }
    }

    fn write_pending(&mut self) -> AppResult<()> {
        let (Some(port), Some(data)) = (self.port.as_mut(), self.pending.take()) else {
            return Ok(());
        };

        data.lines()
            .iter()
            .try_for_each(|line| port.write_all(line.as_bytes()))
            .and_then(|_| port.flush())
            .map_err(AppError::TransmitterIo)
    }
}

impl Transmitter for TcodeTransmitter {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open(&mut self) -> AppResult<()> {
        self.close();
        let port = self.opener.open_port()?;
        log::info!("Opened T-code port {}", self.opener.describe());
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut port) = self.port.take() {
            if let Err(error) = port.flush() {
                log::warn!("Flush of {} failed on close: {}", self.opener.describe(), error);
            }
            log::info!("Closed T-code port {}", self.opener.describe());
        }
        self.pending = None;
    }

    fn provide_new_target(&mut self, coordinates: &RoboticsCoordinates) {
        self.pending = Some(TcodeData::from_coordinates(coordinates));
    }

    fn update(&mut self, _elapsed_ms: u64) {
        if let Err(error) = self.write_pending() {
            log::error!(
                "Write to {} failed, closing the port: {}",
                self.opener.describe(),
                error
            );
            self.port = None;
        }
    }
}

#[cfg(feature = "serial")]
pub use serial::{available_ports, SerialPortOpener};

#[cfg(feature = "serial")]
mod serial {
    use std::time::Duration;

    use serialport::{DataBits, Parity, StopBits};

    use crate::{
        config::constants::TCODE_BAUD_RATE,
        util::error::{AppError, AppResult},
    };

    use super::{PortOpener, TcodePort};

    const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

    pub fn available_ports() -> AppResult<Vec<String>> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(|port| port.port_name).collect())
            .map_err(|error| AppError::SerialOpen {
                port: String::from("*"),
                message: error.to_string(),
            })
    }

    /// Opens a serial device at 115200 baud, 8N1.
    pub struct SerialPortOpener {
        port_name: String,
        baud_rate: u32,
    }

    impl SerialPortOpener {
        pub fn new(port_name: impl Into<String>) -> Self {
            SerialPortOpener {
                port_name: port_name.into(),
                baud_rate: TCODE_BAUD_RATE,
            }
        }
    }

    impl PortOpener for SerialPortOpener {
        fn describe(&self) -> String {
            self.port_name.clone()
        }

        fn open_port(&mut self) -> AppResult<TcodePort> {
            let port = serialport::new(&self.port_name, self.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .timeout(WRITE_TIMEOUT)
                .open()
                .map_err(|error| AppError::SerialOpen {
                    port: self.port_name.clone(),
                    message: error.to_string(),
                })?;
            Ok(Box::new(port))
        }
    }
}
