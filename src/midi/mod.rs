pub mod backend;
pub mod error;
pub mod memory;
pub mod message;
#[cfg(feature = "midi-io")]
pub mod midir_backend;
pub mod session;

pub use backend::{default_backend, MidiBackend, NullBackend, PortList};
pub use error::MidiError;
pub use memory::{MemoryBackend, SendFailure};
pub use message::MidiMessage;
pub use session::{
    MidiSession, SessionGuard, DEFAULT_CHANNEL, DEFAULT_PORT_NAME, DEFAULT_VELOCITY,
};
