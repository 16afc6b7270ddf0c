use serde::{Deserialize, Serialize};

use super::error::MidiError;
use super::message::MidiMessage;

/// Called with the raw bytes of every message arriving on an input port.
/// Runs on the backend's own thread.
pub type InputCallback = Box<dyn Fn(&[u8]) + Send + 'static>;

/// Port names currently visible to the OS MIDI subsystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortList {
    pub input: Vec<String>,
    pub output: Vec<String>,
}

/// Access to a MIDI subsystem: enumerate ports and open them by exact name.
pub trait MidiBackend: Send {
    fn input_port_names(&self) -> Result<Vec<String>, MidiError>;

    fn output_port_names(&self) -> Result<Vec<String>, MidiError>;

    fn open_output(&self, name: &str) -> Result<Box<dyn OutputPort>, MidiError>;

    fn open_input(&self, name: &str, callback: InputCallback)
        -> Result<Box<dyn InputPort>, MidiError>;
}

/// An open outbound connection.
pub trait OutputPort: Send {
    /// Write one message. Must return `MidiError::PortNotOpen` when the
    /// underlying connection has gone away.
    fn send(&mut self, msg: &MidiMessage) -> Result<(), MidiError>;

    fn close(self: Box<Self>) -> Result<(), MidiError>;
}

/// An open inbound connection. Messages are delivered to the callback given
/// at open time until the port is closed.
pub trait InputPort: Send {
    fn close(self: Box<Self>) -> Result<(), MidiError>;
}

/// Backend used when the crate is built without hardware MIDI support.
/// It sees no ports, so every connect attempt fails cleanly.
#[derive(Debug, Default)]
pub struct NullBackend;

impl MidiBackend for NullBackend {
    fn input_port_names(&self) -> Result<Vec<String>, MidiError> {
        Ok(Vec::new())
    }

    fn output_port_names(&self) -> Result<Vec<String>, MidiError> {
        Ok(Vec::new())
    }

    fn open_output(&self, name: &str) -> Result<Box<dyn OutputPort>, MidiError> {
        Err(MidiError::PortNotFound(name.to_string()))
    }

    fn open_input(
        &self,
        name: &str,
        _callback: InputCallback,
    ) -> Result<Box<dyn InputPort>, MidiError> {
        Err(MidiError::PortNotFound(name.to_string()))
    }
}

/// The backend for this build: the OS MIDI subsystem when `midi-io` is
/// enabled, otherwise [`NullBackend`].
pub fn default_backend() -> Box<dyn MidiBackend> {
    #[cfg(feature = "midi-io")]
    {
        Box::new(super::midir_backend::MidirBackend::new(env!("CARGO_PKG_NAME")))
    }
    #[cfg(not(feature = "midi-io"))]
    {
        Box::new(NullBackend)
    }
}
