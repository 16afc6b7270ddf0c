//! OS MIDI access through midir (ALSA, CoreMIDI, WinMM).

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::{debug, warn};

use super::backend::{InputCallback, InputPort, MidiBackend, OutputPort};
use super::error::MidiError;
use super::message::MidiMessage;

pub struct MidirBackend {
    client_name: String,
}

impl MidirBackend {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
        }
    }

    fn midi_output(&self, suffix: &str) -> Result<MidiOutput, MidiError> {
        midi_output(&self.client_name, suffix)
    }

    fn midi_input(&self, suffix: &str) -> Result<MidiInput, MidiError> {
        MidiInput::new(&format!("{}-{}", self.client_name, suffix))
            .map_err(|e| MidiError::InitFailed(e.to_string()))
    }
}

impl MidiBackend for MidirBackend {
    fn input_port_names(&self) -> Result<Vec<String>, MidiError> {
        let midi_in = self.midi_input("scan")?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .collect())
    }

    fn output_port_names(&self) -> Result<Vec<String>, MidiError> {
        output_port_names(&self.client_name)
    }

    fn open_output(&self, name: &str) -> Result<Box<dyn OutputPort>, MidiError> {
        let midi_out = self.midi_output("out")?;

        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|p| midi_out.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| MidiError::PortNotFound(name.to_string()))?;

        let connection = midi_out
            .connect(port, &format!("{}-output", self.client_name))
            .map_err(|e| MidiError::ConnectionFailed(e.to_string()))?;

        Ok(Box::new(MidirOutput {
            connection,
            port_name: name.to_string(),
            client_name: self.client_name.clone(),
        }))
    }

    fn open_input(
        &self,
        name: &str,
        callback: InputCallback,
    ) -> Result<Box<dyn InputPort>, MidiError> {
        let midi_in = self.midi_input("in")?;

        let ports = midi_in.ports();
        let port = ports
            .iter()
            .find(|p| midi_in.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| MidiError::PortNotFound(name.to_string()))?;

        let connection = midi_in
            .connect(
                port,
                &format!("{}-input", self.client_name),
                move |_timestamp_us, data, _| callback(data),
                (),
            )
            .map_err(|e| MidiError::ConnectionFailed(e.to_string()))?;

        Ok(Box::new(MidirInput { connection }))
    }
}

fn midi_output(client_name: &str, suffix: &str) -> Result<MidiOutput, MidiError> {
    MidiOutput::new(&format!("{}-{}", client_name, suffix))
        .map_err(|e| MidiError::InitFailed(e.to_string()))
}

fn output_port_names(client_name: &str) -> Result<Vec<String>, MidiError> {
    let midi_out = midi_output(client_name, "scan")?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}

/// midir reports a vanished port as an ordinary send error. A port that is
/// no longer listed means the link is gone; anything else, including a
/// failed rescan, stays a plain send failure.
fn classify_send_error(
    port_name: &str,
    visible: Result<Vec<String>, MidiError>,
    reason: String,
) -> MidiError {
    match visible {
        Ok(names) if !names.iter().any(|n| n == port_name) => {
            warn!("MIDI output '{}' disappeared: {}", port_name, reason);
            MidiError::PortNotOpen
        }
        _ => MidiError::SendFailed(reason),
    }
}

struct MidirOutput {
    connection: MidiOutputConnection,
    port_name: String,
    client_name: String,
}

impl OutputPort for MidirOutput {
    fn send(&mut self, msg: &MidiMessage) -> Result<(), MidiError> {
        let bytes = msg.to_bytes()?;
        if let Err(e) = self.connection.send(&bytes) {
            return Err(classify_send_error(
                &self.port_name,
                output_port_names(&self.client_name),
                e.to_string(),
            ));
        }
        debug!("MIDI out: {:02X?}", bytes);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), MidiError> {
        let MidirOutput { connection, .. } = *self;
        connection.close();
        Ok(())
    }
}

struct MidirInput {
    connection: MidiInputConnection<()>,
}

impl InputPort for MidirInput {
    fn close(self: Box<Self>) -> Result<(), MidiError> {
        let MidirInput { connection } = *self;
        connection.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Result<Vec<String>, MidiError> {
        Ok(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_missing_port_means_closed() {
        let err = classify_send_error("loopMIDI Port", names(&["Microsoft GS Wavetable Synth"]), "x".into());
        assert!(matches!(err, MidiError::PortNotOpen));

        let err = classify_send_error("loopMIDI Port", names(&[]), "x".into());
        assert!(matches!(err, MidiError::PortNotOpen));
    }

    #[test]
    fn test_listed_port_is_plain_send_failure() {
        let err = classify_send_error(
            "loopMIDI Port",
            names(&["loopMIDI Port", "Other"]),
            "buffer full".into(),
        );
        assert!(matches!(err, MidiError::SendFailed(ref r) if r == "buffer full"));
    }

    #[test]
    fn test_failed_rescan_is_plain_send_failure() {
        let err = classify_send_error(
            "loopMIDI Port",
            Err(MidiError::InitFailed("no subsystem".into())),
            "gone?".into(),
        );
        assert!(matches!(err, MidiError::SendFailed(_)));
    }

    #[test]
    fn test_names_match_exactly() {
        let err = classify_send_error("loopMIDI Port", names(&["loopMIDI Port 2"]), "x".into());
        assert!(matches!(err, MidiError::PortNotOpen));
    }
}
