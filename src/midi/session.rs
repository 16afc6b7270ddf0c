use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::backend::{default_backend, InputCallback, InputPort, MidiBackend, OutputPort, PortList};
use super::error::MidiError;
use super::message::{parse_bytes, MidiMessage};

pub const DEFAULT_PORT_NAME: &str = "FLStudio_MIDI";
pub const DEFAULT_VELOCITY: i32 = 64;
pub const DEFAULT_CHANNEL: i32 = 0;

/// Both handles exist exactly when the session is connected.
enum Link {
    Disconnected,
    Connected {
        output: Box<dyn OutputPort>,
        input: Box<dyn InputPort>,
    },
}

/// A named MIDI port pair with a connected/disconnected lifecycle.
///
/// No operation here fails outward: connection problems surface as `false`
/// and a log line. The session is not internally synchronized; share it
/// behind a mutex.
pub struct MidiSession {
    port_name: String,
    backend: Box<dyn MidiBackend>,
    link: Link,
    received: Arc<AtomicU64>,
}

impl MidiSession {
    /// Session on the OS MIDI subsystem
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_backend(port_name, default_backend())
    }

    pub fn with_backend(port_name: impl Into<String>, backend: Box<dyn MidiBackend>) -> Self {
        Self {
            port_name: port_name.into(),
            backend,
            link: Link::Disconnected,
            received: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected { .. })
    }

    /// Messages seen on the input side since the session was created
    pub fn messages_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Open both directions of the configured port.
    ///
    /// Returns true immediately if already connected. Either both handles are
    /// opened and the session is connected, or nothing stays open.
    pub fn connect(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }

        let outputs = match self.backend.output_port_names() {
            Ok(ports) => ports,
            Err(e) => {
                error!("Failed to connect to MIDI port: {}", e);
                return false;
            }
        };
        let inputs = match self.backend.input_port_names() {
            Ok(ports) => ports,
            Err(e) => {
                error!("Failed to connect to MIDI port: {}", e);
                return false;
            }
        };

        if !outputs.iter().any(|p| p == &self.port_name) {
            warn!(
                "Output port '{}' not found. Available: {:?}",
                self.port_name, outputs
            );
            return false;
        }
        if !inputs.iter().any(|p| p == &self.port_name) {
            warn!(
                "Input port '{}' not found. Available: {:?}",
                self.port_name, inputs
            );
            return false;
        }

        let output = match self.backend.open_output(&self.port_name) {
            Ok(output) => output,
            Err(e) => {
                error!("Failed to connect to MIDI port: {}", e);
                return false;
            }
        };
        let input = match self.backend.open_input(&self.port_name, self.input_callback()) {
            Ok(input) => input,
            Err(e) => {
                error!("Failed to connect to MIDI port: {}", e);
                if let Err(close_err) = output.close() {
                    warn!("Error closing output after failed connect: {}", close_err);
                }
                return false;
            }
        };

        self.link = Link::Connected { output, input };
        info!("Connected to MIDI port: {}", self.port_name);
        true
    }

    /// Close both directions. Always ends disconnected; close errors are
    /// logged.
    pub fn disconnect(&mut self) {
        let Link::Connected { output, input } = std::mem::replace(&mut self.link, Link::Disconnected)
        else {
            return;
        };

        let mut clean = true;
        if let Err(e) = output.close() {
            error!("Error disconnecting from MIDI port: {}", e);
            clean = false;
        }
        if let Err(e) = input.close() {
            error!("Error disconnecting from MIDI port: {}", e);
            clean = false;
        }

        if clean {
            info!("Disconnected from MIDI port: {}", self.port_name);
        } else {
            warn!(
                "Disconnected from MIDI port with errors: {}",
                self.port_name
            );
        }
    }

    pub fn send_note_on(&mut self, note: i32, velocity: i32, channel: i32) -> bool {
        self.send(MidiMessage::NoteOn {
            note,
            velocity,
            channel,
        })
    }

    pub fn send_note_off(&mut self, note: i32, velocity: i32, channel: i32) -> bool {
        self.send(MidiMessage::NoteOff {
            note,
            velocity,
            channel,
        })
    }

    pub fn send_control_change(&mut self, control: i32, value: i32, channel: i32) -> bool {
        self.send(MidiMessage::ControlChange {
            control,
            value,
            channel,
        })
    }

    pub fn send_program_change(&mut self, program: i32, channel: i32) -> bool {
        self.send(MidiMessage::ProgramChange { program, channel })
    }

    pub fn send_pitch_bend(&mut self, pitch: i32, channel: i32) -> bool {
        self.send(MidiMessage::PitchBend { pitch, channel })
    }

    /// Write one message if connected.
    ///
    /// A `PortNotOpen` error drops the link so the next `connect` starts
    /// fresh. Other errors leave the state alone.
    pub fn send(&mut self, msg: MidiMessage) -> bool {
        let Link::Connected { output, .. } = &mut self.link else {
            warn!("Cannot send {}: MIDI not connected", msg.kind());
            return false;
        };

        match output.send(&msg) {
            Ok(()) => {
                debug!("Sent {}", msg);
                true
            }
            Err(MidiError::PortNotOpen) => {
                error!("MIDI port is not open");
                self.drop_link();
                false
            }
            Err(e) => {
                error!("Error sending {}: {}", msg.kind(), e);
                false
            }
        }
    }

    /// Currently visible port names. Enumeration errors are logged and
    /// reported as an empty list for that direction.
    pub fn list_ports(&self) -> PortList {
        let input = self.backend.input_port_names().unwrap_or_else(|e| {
            warn!("Failed to list MIDI input ports: {}", e);
            Vec::new()
        });
        let output = self.backend.output_port_names().unwrap_or_else(|e| {
            warn!("Failed to list MIDI output ports: {}", e);
            Vec::new()
        });
        PortList { input, output }
    }

    /// Connect now and disconnect when the returned guard drops.
    pub fn scoped(&mut self) -> SessionGuard<'_> {
        let connected = self.connect();
        SessionGuard {
            session: self,
            connected,
        }
    }

    fn drop_link(&mut self) {
        if let Link::Connected { input, .. } = std::mem::replace(&mut self.link, Link::Disconnected) {
            if let Err(e) = input.close() {
                warn!("Error closing MIDI input after port loss: {}", e);
            }
        }
    }

    fn input_callback(&self) -> InputCallback {
        let received = Arc::clone(&self.received);
        let port = self.port_name.clone();
        Box::new(move |data: &[u8]| {
            received.fetch_add(1, Ordering::Relaxed);
            match parse_bytes(data) {
                Some(msg) => debug!("MIDI in from {}: {}", port, msg),
                None => debug!("MIDI in from {}: {:02X?}", port, data),
            }
        })
    }
}

impl Drop for MidiSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Keeps a session connected for a scope.
pub struct SessionGuard<'a> {
    session: &'a mut MidiSession,
    connected: bool,
}

impl SessionGuard<'_> {
    /// Result of the connect attempt made when the guard was created
    pub fn connected(&self) -> bool {
        self.connected
    }
}

impl Deref for SessionGuard<'_> {
    type Target = MidiSession;

    fn deref(&self) -> &MidiSession {
        self.session
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut MidiSession {
        self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.session.disconnect();
    }
}
