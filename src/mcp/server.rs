use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::host::{HostError, HostSurface};
use crate::midi::{MidiSession, DEFAULT_CHANNEL, DEFAULT_VELOCITY};
use crate::mcp::tools::{self, HostTool, MidiTool, Tool};

/// Seconds a `midi_send_note` holds the note when no duration is given
pub const DEFAULT_NOTE_DURATION: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("invalid argument '{name}': expected {expected}")]
    InvalidArgument {
        name: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    Host(#[from] HostError),
}

/// MCP tool handler for FL Studio
pub struct FlStudioMcp {
    session: Arc<Mutex<MidiSession>>,
    host: Option<HostSurface>,
}

impl FlStudioMcp {
    /// `host` is `None` when FL Studio's scripting API was not found at
    /// startup. It cannot change afterwards.
    pub fn new(session: MidiSession, host: Option<HostSurface>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            host,
        }
    }

    /// Shared handle to the MIDI session
    pub fn session(&self) -> Arc<Mutex<MidiSession>> {
        self.session.clone()
    }

    pub fn host_available(&self) -> bool {
        self.host.is_some()
    }

    /// Get the list of available tools (for MCP discovery)
    pub fn list_tools(&self) -> Value {
        json!({ "tools": tools::advertised(self.host_available()) })
    }

    /// Handle an MCP tool call
    pub async fn handle_tool_call(&self, name: &str, args: &Value) -> Result<String, ToolError> {
        let tool = Tool::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        debug!("Tool call: {} {}", name, args);

        match tool {
            Tool::Midi(tool) => self.call_midi(tool, args).await,
            Tool::Host(tool) => match &self.host {
                Some(host) => call_host(host, tool, args),
                None => Ok(format!(
                    "FL Studio API not available. Tool '{}' cannot be executed.",
                    name
                )),
            },
        }
    }

    async fn call_midi(&self, tool: MidiTool, args: &Value) -> Result<String, ToolError> {
        let text = match tool {
            MidiTool::Connect => self.midi_connect(),
            MidiTool::Disconnect => self.midi_disconnect(),
            MidiTool::ListPorts => self.midi_list_ports(),
            MidiTool::SendNote => {
                let note = midi_arg(args, "note")?;
                let velocity = optional_midi_arg(args, "velocity", DEFAULT_VELOCITY)?;
                let duration = optional_f64(args, "duration", DEFAULT_NOTE_DURATION)?;
                let channel = optional_midi_arg(args, "channel", DEFAULT_CHANNEL)?;
                self.send_note(note, velocity, duration, channel).await
            }
            MidiTool::SendNoteOn => {
                let note = midi_arg(args, "note")?;
                let velocity = optional_midi_arg(args, "velocity", DEFAULT_VELOCITY)?;
                let channel = optional_midi_arg(args, "channel", DEFAULT_CHANNEL)?;
                self.send_note_on(note, velocity, channel)
            }
            MidiTool::SendNoteOff => {
                let note = midi_arg(args, "note")?;
                let velocity = optional_midi_arg(args, "velocity", DEFAULT_VELOCITY)?;
                let channel = optional_midi_arg(args, "channel", DEFAULT_CHANNEL)?;
                self.send_note_off(note, velocity, channel)
            }
            MidiTool::SendCc => {
                let control = midi_arg(args, "control")?;
                let value = midi_arg(args, "value")?;
                let channel = optional_midi_arg(args, "channel", DEFAULT_CHANNEL)?;
                self.send_cc(control, value, channel)
            }
            MidiTool::SendProgramChange => {
                let program = midi_arg(args, "program")?;
                let channel = optional_midi_arg(args, "channel", DEFAULT_CHANNEL)?;
                self.send_program_change(program, channel)
            }
            MidiTool::SendPitchBend => {
                let pitch = midi_arg(args, "pitch")?;
                let channel = optional_midi_arg(args, "channel", DEFAULT_CHANNEL)?;
                self.send_pitch_bend(pitch, channel)
            }
        };
        Ok(text)
    }

    // === MIDI Tools ===

    pub fn midi_connect(&self) -> String {
        let mut session = self.session.lock();
        if session.connect() {
            format!("Connected to MIDI port: {}", session.port_name())
        } else {
            format!("Failed to connect to MIDI port: {}", session.port_name())
        }
    }

    pub fn midi_disconnect(&self) -> String {
        let mut session = self.session.lock();
        session.disconnect();
        format!("Disconnected from MIDI port: {}", session.port_name())
    }

    pub fn midi_list_ports(&self) -> String {
        let ports = self.session.lock().list_ports();
        format!(
            "Available MIDI ports:\nInput: {:?}\nOutput: {:?}",
            ports.input, ports.output
        )
    }

    /// Note on, hold for `duration` seconds, note off.
    ///
    /// The session lock is released while the note is held. If this future
    /// is dropped mid-hold the note off is still sent.
    pub async fn send_note(&self, note: i32, velocity: i32, duration: f64, channel: i32) -> String {
        let on = self.session.lock().send_note_on(note, velocity, channel);
        let pending = PendingNoteOff {
            session: self.session.clone(),
            note,
            velocity,
            channel,
            armed: true,
        };

        tokio::time::sleep(hold_time(duration)).await;

        let off = pending.fire();
        if on && off {
            format!(
                "Sent MIDI note {} with velocity {} for {}s on channel {}",
                note, velocity, duration, channel
            )
        } else {
            format!("Failed to send MIDI note: note={}", note)
        }
    }

    pub fn send_note_on(&self, note: i32, velocity: i32, channel: i32) -> String {
        if self.session.lock().send_note_on(note, velocity, channel) {
            format!(
                "Sent MIDI note_on: note={}, velocity={}, channel={}",
                note, velocity, channel
            )
        } else {
            format!("Failed to send MIDI note_on: note={}", note)
        }
    }

    pub fn send_note_off(&self, note: i32, velocity: i32, channel: i32) -> String {
        if self.session.lock().send_note_off(note, velocity, channel) {
            format!(
                "Sent MIDI note_off: note={}, velocity={}, channel={}",
                note, velocity, channel
            )
        } else {
            format!("Failed to send MIDI note_off: note={}", note)
        }
    }

    pub fn send_cc(&self, control: i32, value: i32, channel: i32) -> String {
        if self.session.lock().send_control_change(control, value, channel) {
            format!(
                "Sent MIDI CC: control={}, value={}, channel={}",
                control, value, channel
            )
        } else {
            format!("Failed to send MIDI CC: control={}", control)
        }
    }

    pub fn send_program_change(&self, program: i32, channel: i32) -> String {
        if self.session.lock().send_program_change(program, channel) {
            format!(
                "Sent MIDI program change: program={}, channel={}",
                program, channel
            )
        } else {
            format!("Failed to send MIDI program change: program={}", program)
        }
    }

    pub fn send_pitch_bend(&self, pitch: i32, channel: i32) -> String {
        if self.session.lock().send_pitch_bend(pitch, channel) {
            format!("Sent MIDI pitch bend: pitch={}, channel={}", pitch, channel)
        } else {
            format!("Failed to send MIDI pitch bend: pitch={}", pitch)
        }
    }
}

/// Forward one FL Studio tool to the scripting surface
fn call_host(host: &HostSurface, tool: HostTool, args: &Value) -> Result<String, ToolError> {
    let text = match tool {
        // Transport
        HostTool::TransportStart => {
            host.transport.start()?;
            "FL Studio playback started".to_string()
        }
        HostTool::TransportStop => {
            host.transport.stop()?;
            "FL Studio playback stopped".to_string()
        }
        HostTool::TransportRecord => {
            host.transport.record()?;
            "FL Studio recording toggled".to_string()
        }
        HostTool::TransportGetSongPos => {
            format!("Current song position: {}", host.transport.song_pos()?)
        }
        HostTool::TransportSetSongPos => {
            let position = int_arg(args, "position")?;
            host.transport.set_song_pos(position)?;
            format!("Song position set to: {}", position)
        }

        // Mixer
        HostTool::MixerGetTrackVolume => {
            let track = int_arg(args, "track_num")?;
            format!("Track {} volume: {}", track, host.mixer.track_volume(track)?)
        }
        HostTool::MixerSetTrackVolume => {
            let track = int_arg(args, "track_num")?;
            let volume = f64_arg(args, "volume")?;
            host.mixer.set_track_volume(track, volume)?;
            format!("Track {} volume set to: {}", track, volume)
        }
        HostTool::MixerGetTrackName => {
            let track = int_arg(args, "track_num")?;
            format!("Track {} name: {}", track, host.mixer.track_name(track)?)
        }
        HostTool::MixerSetTrackName => {
            let track = int_arg(args, "track_num")?;
            let name = str_arg(args, "name")?;
            host.mixer.set_track_name(track, name)?;
            format!("Track {} name set to: {}", track, name)
        }

        // Channels
        HostTool::ChannelsChannelCount => {
            format!("Total channels: {}", host.channels.channel_count()?)
        }
        HostTool::ChannelsGetChannelName => {
            let channel = int_arg(args, "channel_num")?;
            format!("Channel {} name: {}", channel, host.channels.channel_name(channel)?)
        }
        HostTool::ChannelsSetChannelVolume => {
            let channel = int_arg(args, "channel_num")?;
            let volume = f64_arg(args, "volume")?;
            host.channels.set_channel_volume(channel, volume)?;
            format!("Channel {} volume set to: {}", channel, volume)
        }
        HostTool::ChannelsMuteChannel => {
            let channel = int_arg(args, "channel_num")?;
            let mute = bool_arg(args, "mute")?;
            host.channels.mute_channel(channel, mute)?;
            format!("Channel {} {}", channel, if mute { "muted" } else { "unmuted" })
        }

        // Patterns
        HostTool::PatternsPatternCount => {
            format!("Total patterns: {}", host.patterns.pattern_count()?)
        }
        HostTool::PatternsGetPatternName => {
            let pattern = int_arg(args, "pattern_num")?;
            format!("Pattern {} name: {}", pattern, host.patterns.pattern_name(pattern)?)
        }
        HostTool::PatternsSetPatternName => {
            let pattern = int_arg(args, "pattern_num")?;
            let name = str_arg(args, "name")?;
            host.patterns.set_pattern_name(pattern, name)?;
            format!("Pattern {} name set to: {}", pattern, name)
        }

        // General
        HostTool::GeneralGetProjectTitle => {
            format!("Project title: {}", host.general.project_title()?)
        }
        HostTool::GeneralGetVersion => {
            format!("FL Studio version: {}", host.general.version()?)
        }

        // UI
        HostTool::UiShowWindow => {
            let window_id = int_arg(args, "window_id")?;
            host.ui.show_window(window_id)?;
            format!("Showing window: {}", window_id)
        }

        // Playlist
        HostTool::PlaylistGetTrackName => {
            let track = int_arg(args, "track_num")?;
            format!("Playlist track {} name: {}", track, host.playlist.track_name(track)?)
        }
    };
    Ok(text)
}

/// Sends the note off for a held note, on `fire` or when dropped.
struct PendingNoteOff {
    session: Arc<Mutex<MidiSession>>,
    note: i32,
    velocity: i32,
    channel: i32,
    armed: bool,
}

impl PendingNoteOff {
    fn fire(mut self) -> bool {
        self.armed = false;
        self.session
            .lock()
            .send_note_off(self.note, self.velocity, self.channel)
    }
}

impl Drop for PendingNoteOff {
    fn drop(&mut self) {
        if self.armed {
            warn!("Timed note {} cancelled, sending note_off", self.note);
            self.session
                .lock()
                .send_note_off(self.note, self.velocity, self.channel);
        }
    }
}

/// Negative, NaN and infinite durations hold for zero time
fn hold_time(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}

// === Argument extraction ===

/// `null` counts as absent so clients may send explicit nulls for defaults
fn arg<'a>(args: &'a Value, key: &str) -> Option<&'a Value> {
    args.get(key).filter(|v| !v.is_null())
}

fn int_arg(args: &Value, key: &'static str) -> Result<i64, ToolError> {
    let value = arg(args, key).ok_or(ToolError::MissingArgument(key))?;
    value.as_i64().ok_or(ToolError::InvalidArgument {
        name: key,
        expected: "an integer",
    })
}

fn f64_arg(args: &Value, key: &'static str) -> Result<f64, ToolError> {
    let value = arg(args, key).ok_or(ToolError::MissingArgument(key))?;
    value.as_f64().ok_or(ToolError::InvalidArgument {
        name: key,
        expected: "a number",
    })
}

fn str_arg<'a>(args: &'a Value, key: &'static str) -> Result<&'a str, ToolError> {
    let value = arg(args, key).ok_or(ToolError::MissingArgument(key))?;
    value.as_str().ok_or(ToolError::InvalidArgument {
        name: key,
        expected: "a string",
    })
}

fn bool_arg(args: &Value, key: &'static str) -> Result<bool, ToolError> {
    let value = arg(args, key).ok_or(ToolError::MissingArgument(key))?;
    value.as_bool().ok_or(ToolError::InvalidArgument {
        name: key,
        expected: "a boolean",
    })
}

fn optional_f64(args: &Value, key: &'static str, default: f64) -> Result<f64, ToolError> {
    match arg(args, key) {
        Some(_) => f64_arg(args, key),
        None => Ok(default),
    }
}

/// MIDI fields are passed through unclamped; only the integer width is checked.
fn midi_arg(args: &Value, key: &'static str) -> Result<i32, ToolError> {
    i32::try_from(int_arg(args, key)?).map_err(|_| ToolError::InvalidArgument {
        name: key,
        expected: "a 32-bit integer",
    })
}

fn optional_midi_arg(args: &Value, key: &'static str, default: i32) -> Result<i32, ToolError> {
    match arg(args, key) {
        Some(_) => midi_arg(args, key),
        None => Ok(default),
    }
}
