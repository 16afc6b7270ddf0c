//! Tool registry: every tool the server knows, its group and its schema.

use serde::Serialize;
use serde_json::{json, Value};

/// Tools that drive the MIDI session. Always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiTool {
    Connect,
    Disconnect,
    ListPorts,
    SendNote,
    SendNoteOn,
    SendNoteOff,
    SendCc,
    SendProgramChange,
    SendPitchBend,
}

/// Tools that forward to the FL Studio scripting surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostTool {
    // Transport
    TransportStart,
    TransportStop,
    TransportRecord,
    TransportGetSongPos,
    TransportSetSongPos,

    // Mixer
    MixerGetTrackVolume,
    MixerSetTrackVolume,
    MixerGetTrackName,
    MixerSetTrackName,

    // Channels
    ChannelsChannelCount,
    ChannelsGetChannelName,
    ChannelsSetChannelVolume,
    ChannelsMuteChannel,

    // Patterns
    PatternsPatternCount,
    PatternsGetPatternName,
    PatternsSetPatternName,

    // General
    GeneralGetProjectTitle,
    GeneralGetVersion,

    // UI
    UiShowWindow,

    // Playlist
    PlaylistGetTrackName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Midi(MidiTool),
    Host(HostTool),
}

/// Advertised metadata for one tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl MidiTool {
    pub const ALL: [MidiTool; 9] = [
        MidiTool::Connect,
        MidiTool::Disconnect,
        MidiTool::ListPorts,
        MidiTool::SendNote,
        MidiTool::SendNoteOn,
        MidiTool::SendNoteOff,
        MidiTool::SendCc,
        MidiTool::SendProgramChange,
        MidiTool::SendPitchBend,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MidiTool::Connect => "midi_connect",
            MidiTool::Disconnect => "midi_disconnect",
            MidiTool::ListPorts => "midi_list_ports",
            MidiTool::SendNote => "midi_send_note",
            MidiTool::SendNoteOn => "midi_send_note_on",
            MidiTool::SendNoteOff => "midi_send_note_off",
            MidiTool::SendCc => "midi_send_cc",
            MidiTool::SendProgramChange => "midi_send_program_change",
            MidiTool::SendPitchBend => "midi_send_pitch_bend",
        }
    }

    fn description(self) -> &'static str {
        match self {
            MidiTool::Connect => "Connect to MIDI port",
            MidiTool::Disconnect => "Disconnect from MIDI port",
            MidiTool::ListPorts => "List available MIDI input and output ports",
            MidiTool::SendNote => "Send a MIDI note with specified duration",
            MidiTool::SendNoteOn => "Send a MIDI note on message",
            MidiTool::SendNoteOff => "Send a MIDI note off message",
            MidiTool::SendCc => "Send a MIDI control change message",
            MidiTool::SendProgramChange => "Send a MIDI program change message",
            MidiTool::SendPitchBend => "Send a MIDI pitch bend message",
        }
    }

    fn input_schema(self) -> Value {
        match self {
            MidiTool::Connect | MidiTool::Disconnect | MidiTool::ListPorts => no_args(),
            MidiTool::SendNote => json!({
                "type": "object",
                "properties": {
                    "note": note_prop(),
                    "velocity": velocity_prop(),
                    "duration": {
                        "type": "number",
                        "description": "Note duration in seconds",
                        "default": 0.5,
                        "minimum": 0
                    },
                    "channel": channel_prop()
                },
                "required": ["note"]
            }),
            MidiTool::SendNoteOn | MidiTool::SendNoteOff => json!({
                "type": "object",
                "properties": {
                    "note": note_prop(),
                    "velocity": velocity_prop(),
                    "channel": channel_prop()
                },
                "required": ["note"]
            }),
            MidiTool::SendCc => json!({
                "type": "object",
                "properties": {
                    "control": {
                        "type": "integer",
                        "description": "Control number (0-127)",
                        "minimum": 0,
                        "maximum": 127
                    },
                    "value": {
                        "type": "integer",
                        "description": "Control value (0-127)",
                        "minimum": 0,
                        "maximum": 127
                    },
                    "channel": channel_prop()
                },
                "required": ["control", "value"]
            }),
            MidiTool::SendProgramChange => json!({
                "type": "object",
                "properties": {
                    "program": {
                        "type": "integer",
                        "description": "Program number (0-127)",
                        "minimum": 0,
                        "maximum": 127
                    },
                    "channel": channel_prop()
                },
                "required": ["program"]
            }),
            MidiTool::SendPitchBend => json!({
                "type": "object",
                "properties": {
                    "pitch": {
                        "type": "integer",
                        "description": "Pitch bend value (-8192 to 8191)",
                        "minimum": -8192,
                        "maximum": 8191
                    },
                    "channel": channel_prop()
                },
                "required": ["pitch"]
            }),
        }
    }
}

impl HostTool {
    pub const ALL: [HostTool; 20] = [
        HostTool::TransportStart,
        HostTool::TransportStop,
        HostTool::TransportRecord,
        HostTool::TransportGetSongPos,
        HostTool::TransportSetSongPos,
        HostTool::MixerGetTrackVolume,
        HostTool::MixerSetTrackVolume,
        HostTool::MixerGetTrackName,
        HostTool::MixerSetTrackName,
        HostTool::ChannelsChannelCount,
        HostTool::ChannelsGetChannelName,
        HostTool::ChannelsSetChannelVolume,
        HostTool::ChannelsMuteChannel,
        HostTool::PatternsPatternCount,
        HostTool::PatternsGetPatternName,
        HostTool::PatternsSetPatternName,
        HostTool::GeneralGetProjectTitle,
        HostTool::GeneralGetVersion,
        HostTool::UiShowWindow,
        HostTool::PlaylistGetTrackName,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HostTool::TransportStart => "transport_start",
            HostTool::TransportStop => "transport_stop",
            HostTool::TransportRecord => "transport_record",
            HostTool::TransportGetSongPos => "transport_get_song_pos",
            HostTool::TransportSetSongPos => "transport_set_song_pos",
            HostTool::MixerGetTrackVolume => "mixer_get_track_volume",
            HostTool::MixerSetTrackVolume => "mixer_set_track_volume",
            HostTool::MixerGetTrackName => "mixer_get_track_name",
            HostTool::MixerSetTrackName => "mixer_set_track_name",
            HostTool::ChannelsChannelCount => "channels_channel_count",
            HostTool::ChannelsGetChannelName => "channels_get_channel_name",
            HostTool::ChannelsSetChannelVolume => "channels_set_channel_volume",
            HostTool::ChannelsMuteChannel => "channels_mute_channel",
            HostTool::PatternsPatternCount => "patterns_pattern_count",
            HostTool::PatternsGetPatternName => "patterns_get_pattern_name",
            HostTool::PatternsSetPatternName => "patterns_set_pattern_name",
            HostTool::GeneralGetProjectTitle => "general_get_project_title",
            HostTool::GeneralGetVersion => "general_get_version",
            HostTool::UiShowWindow => "ui_show_window",
            HostTool::PlaylistGetTrackName => "playlist_get_track_name",
        }
    }

    fn description(self) -> &'static str {
        match self {
            HostTool::TransportStart => "Start FL Studio playback",
            HostTool::TransportStop => "Stop FL Studio playback",
            HostTool::TransportRecord => "Toggle recording in FL Studio",
            HostTool::TransportGetSongPos => "Get current song position",
            HostTool::TransportSetSongPos => "Set song position",
            HostTool::MixerGetTrackVolume => "Get mixer track volume",
            HostTool::MixerSetTrackVolume => "Set mixer track volume",
            HostTool::MixerGetTrackName => "Get mixer track name",
            HostTool::MixerSetTrackName => "Set mixer track name",
            HostTool::ChannelsChannelCount => "Get total number of channels",
            HostTool::ChannelsGetChannelName => "Get channel name",
            HostTool::ChannelsSetChannelVolume => "Set channel volume",
            HostTool::ChannelsMuteChannel => "Mute or unmute a channel",
            HostTool::PatternsPatternCount => "Get total number of patterns",
            HostTool::PatternsGetPatternName => "Get pattern name",
            HostTool::PatternsSetPatternName => "Set pattern name",
            HostTool::GeneralGetProjectTitle => "Get the current project title",
            HostTool::GeneralGetVersion => "Get FL Studio version",
            HostTool::UiShowWindow => "Show a specific FL Studio window",
            HostTool::PlaylistGetTrackName => "Get playlist track name",
        }
    }

    fn input_schema(self) -> Value {
        match self {
            HostTool::TransportStart
            | HostTool::TransportStop
            | HostTool::TransportRecord
            | HostTool::TransportGetSongPos
            | HostTool::ChannelsChannelCount
            | HostTool::PatternsPatternCount
            | HostTool::GeneralGetProjectTitle
            | HostTool::GeneralGetVersion => no_args(),

            HostTool::TransportSetSongPos => json!({
                "type": "object",
                "properties": {
                    "position": {
                        "type": "integer",
                        "description": "Song position in ticks"
                    }
                },
                "required": ["position"]
            }),

            HostTool::MixerGetTrackVolume | HostTool::MixerGetTrackName => {
                index_only("track_num", "Mixer track number")
            }
            HostTool::MixerSetTrackVolume => json!({
                "type": "object",
                "properties": {
                    "track_num": { "type": "integer", "description": "Mixer track number" },
                    "volume": volume_prop()
                },
                "required": ["track_num", "volume"]
            }),
            HostTool::MixerSetTrackName => json!({
                "type": "object",
                "properties": {
                    "track_num": { "type": "integer", "description": "Mixer track number" },
                    "name": { "type": "string", "description": "Track name" }
                },
                "required": ["track_num", "name"]
            }),

            HostTool::ChannelsGetChannelName => index_only("channel_num", "Channel number"),
            HostTool::ChannelsSetChannelVolume => json!({
                "type": "object",
                "properties": {
                    "channel_num": { "type": "integer", "description": "Channel number" },
                    "volume": volume_prop()
                },
                "required": ["channel_num", "volume"]
            }),
            HostTool::ChannelsMuteChannel => json!({
                "type": "object",
                "properties": {
                    "channel_num": { "type": "integer", "description": "Channel number" },
                    "mute": {
                        "type": "boolean",
                        "description": "True to mute, False to unmute"
                    }
                },
                "required": ["channel_num", "mute"]
            }),

            HostTool::PatternsGetPatternName => index_only("pattern_num", "Pattern number"),
            HostTool::PatternsSetPatternName => json!({
                "type": "object",
                "properties": {
                    "pattern_num": { "type": "integer", "description": "Pattern number" },
                    "name": { "type": "string", "description": "Pattern name" }
                },
                "required": ["pattern_num", "name"]
            }),

            HostTool::UiShowWindow => index_only("window_id", "Window ID to show"),
            HostTool::PlaylistGetTrackName => index_only("track_num", "Playlist track number"),
        }
    }
}

impl Tool {
    /// Every registered tool, MIDI first
    pub fn all() -> impl Iterator<Item = Tool> {
        MidiTool::ALL
            .into_iter()
            .map(Tool::Midi)
            .chain(HostTool::ALL.into_iter().map(Tool::Host))
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::all().find(|t| t.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tool::Midi(t) => t.name(),
            Tool::Host(t) => t.name(),
        }
    }

    /// MIDI tools work without FL Studio; everything else needs the host.
    pub fn needs_host(self) -> bool {
        matches!(self, Tool::Host(_))
    }

    pub fn descriptor(self) -> ToolDescriptor {
        let (description, input_schema) = match self {
            Tool::Midi(t) => (t.description(), t.input_schema()),
            Tool::Host(t) => (t.description(), t.input_schema()),
        };
        ToolDescriptor {
            name: self.name(),
            description,
            input_schema,
        }
    }
}

/// Tools to advertise. Host tools are hidden when FL Studio was not detected.
pub fn advertised(host_available: bool) -> Vec<ToolDescriptor> {
    Tool::all()
        .filter(|t| host_available || !t.needs_host())
        .map(Tool::descriptor)
        .collect()
}

fn no_args() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn index_only(key: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            key: { "type": "integer", "description": description }
        },
        "required": [key]
    })
}

fn note_prop() -> Value {
    json!({
        "type": "integer",
        "description": "MIDI note number (0-127)",
        "minimum": 0,
        "maximum": 127
    })
}

fn velocity_prop() -> Value {
    json!({
        "type": "integer",
        "description": "Note velocity (0-127)",
        "default": 64,
        "minimum": 0,
        "maximum": 127
    })
}

fn channel_prop() -> Value {
    json!({
        "type": "integer",
        "description": "MIDI channel (0-15)",
        "default": 0,
        "minimum": 0,
        "maximum": 15
    })
}

fn volume_prop() -> Value {
    json!({ "type": "number", "description": "Volume level (0.0-1.0)" })
}
