use std::io;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to open serial port {port}: {message}")]
    SerialOpen { port: String, message: String },

    #[error("Transmitter is not open")]
    TransmitterClosed,

    #[error("Transmitter I/O error: {0}")]
    TransmitterIo(#[source] io::Error),

    #[error("Failed to bind network listener on {address}: {source}")]
    NetworkBind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("The {name} thread panicked")]
    ThreadPanicked { name: &'static str },

    #[error("Routine request channel is closed")]
    ChannelClosed,
}

pub type AppResult<T> = Result<T, AppError>;
