//! In-memory MIDI backend.
//!
//! Virtual ports that record every write instead of touching hardware. Used
//! by the test suites and by embedders that want a dry-run session. Failures
//! can be injected to exercise the session's recovery paths.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::backend::{InputCallback, InputPort, MidiBackend, OutputPort};
use super::error::MidiError;
use super::message::MidiMessage;

/// How the next writes should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The port went away underneath us
    Closed,
    /// Any other transport error
    Other,
}

/// One recorded write
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: MidiMessage,
    pub at: Instant,
}

#[derive(Default)]
struct MemoryState {
    inputs: Vec<String>,
    outputs: Vec<String>,
    sent: Vec<SentMessage>,
    output_opens: usize,
    input_opens: usize,
    output_closes: usize,
    input_closes: usize,
    send_failure: Option<SendFailure>,
    fail_open_output: bool,
    fail_open_input: bool,
    fail_close: bool,
    fail_enumeration: bool,
    listeners: Vec<(usize, InputCallback)>,
    next_listener: usize,
}

/// Cloneable handle: keep one clone to inspect while the session owns another.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend exposing `name` in both directions
    pub fn with_port(name: &str) -> Self {
        Self::with_ports(&[name], &[name])
    }

    pub fn with_ports(inputs: &[&str], outputs: &[&str]) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock();
            state.inputs = inputs.iter().map(|s| s.to_string()).collect();
            state.outputs = outputs.iter().map(|s| s.to_string()).collect();
        }
        backend
    }

    pub fn sent(&self) -> Vec<MidiMessage> {
        self.state.lock().sent.iter().map(|s| s.message).collect()
    }

    pub fn sent_with_times(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    pub fn output_opens(&self) -> usize {
        self.state.lock().output_opens
    }

    pub fn input_opens(&self) -> usize {
        self.state.lock().input_opens
    }

    /// Total close calls across both directions
    pub fn closes(&self) -> usize {
        let state = self.state.lock();
        state.output_closes + state.input_closes
    }

    pub fn set_send_failure(&self, failure: Option<SendFailure>) {
        self.state.lock().send_failure = failure;
    }

    pub fn set_open_output_failure(&self, fail: bool) {
        self.state.lock().fail_open_output = fail;
    }

    pub fn set_open_input_failure(&self, fail: bool) {
        self.state.lock().fail_open_input = fail;
    }

    pub fn set_close_failure(&self, fail: bool) {
        self.state.lock().fail_close = fail;
    }

    pub fn set_enumeration_failure(&self, fail: bool) {
        self.state.lock().fail_enumeration = fail;
    }

    /// Deliver raw bytes to every open input, as if a device had sent them
    pub fn inject_input(&self, data: &[u8]) {
        let state = self.state.lock();
        for (_, callback) in &state.listeners {
            callback(data);
        }
    }
}

impl MidiBackend for MemoryBackend {
    fn input_port_names(&self) -> Result<Vec<String>, MidiError> {
        let state = self.state.lock();
        if state.fail_enumeration {
            return Err(MidiError::InitFailed("enumeration failed".to_string()));
        }
        Ok(state.inputs.clone())
    }

    fn output_port_names(&self) -> Result<Vec<String>, MidiError> {
        let state = self.state.lock();
        if state.fail_enumeration {
            return Err(MidiError::InitFailed("enumeration failed".to_string()));
        }
        Ok(state.outputs.clone())
    }

    fn open_output(&self, name: &str) -> Result<Box<dyn OutputPort>, MidiError> {
        let mut state = self.state.lock();
        if state.fail_open_output {
            return Err(MidiError::ConnectionFailed(format!("cannot open {}", name)));
        }
        if !state.outputs.iter().any(|p| p == name) {
            return Err(MidiError::PortNotFound(name.to_string()));
        }
        state.output_opens += 1;
        Ok(Box::new(MemoryOutput {
            state: Arc::clone(&self.state),
        }))
    }

    fn open_input(
        &self,
        name: &str,
        callback: InputCallback,
    ) -> Result<Box<dyn InputPort>, MidiError> {
        let mut state = self.state.lock();
        if state.fail_open_input {
            return Err(MidiError::ConnectionFailed(format!("cannot open {}", name)));
        }
        if !state.inputs.iter().any(|p| p == name) {
            return Err(MidiError::PortNotFound(name.to_string()));
        }
        state.input_opens += 1;
        let id = state.next_listener;
        state.next_listener += 1;
        state.listeners.push((id, callback));
        Ok(Box::new(MemoryInput {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryOutput {
    state: Arc<Mutex<MemoryState>>,
}

impl OutputPort for MemoryOutput {
    fn send(&mut self, msg: &MidiMessage) -> Result<(), MidiError> {
        let mut state = self.state.lock();
        match state.send_failure {
            Some(SendFailure::Closed) => return Err(MidiError::PortNotOpen),
            Some(SendFailure::Other) => {
                return Err(MidiError::SendFailed("device error".to_string()))
            }
            None => {}
        }
        state.sent.push(SentMessage {
            message: *msg,
            at: Instant::now(),
        });
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), MidiError> {
        let mut state = self.state.lock();
        state.output_closes += 1;
        if state.fail_close {
            return Err(MidiError::CloseFailed("output close failed".to_string()));
        }
        Ok(())
    }
}

struct MemoryInput {
    id: usize,
    state: Arc<Mutex<MemoryState>>,
}

impl InputPort for MemoryInput {
    fn close(self: Box<Self>) -> Result<(), MidiError> {
        let mut state = self.state.lock();
        state.input_closes += 1;
        state.listeners.retain(|(id, _)| *id != self.id);
        if state.fail_close {
            return Err(MidiError::CloseFailed("input close failed".to_string()));
        }
        Ok(())
    }
}
