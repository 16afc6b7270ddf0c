use thiserror::Error;

/// Errors raised by a MIDI backend.
///
/// The session never lets these escape; it turns them into `false` and a log
/// line. `PortNotOpen` is special: it tells the session the link is gone.
#[derive(Debug, Error)]
pub enum MidiError {
    #[error("Failed to initialize MIDI: {0}")]
    InitFailed(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("MIDI port is not open")]
    PortNotOpen,

    #[error("Invalid MIDI message: {0}")]
    InvalidMessage(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Close failed: {0}")]
    CloseFailed(String),
}
