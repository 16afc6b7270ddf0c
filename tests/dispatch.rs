//! End-to-end JSON-RPC tests against an in-memory MIDI port
//!
//! Run with:
//! ```bash
//! cargo test --test dispatch
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use flstudio_mcp::host::{
    Channels, General, HostError, HostResult, HostSurface, Mixer, Patterns, Playlist, Transport,
    Ui,
};
use flstudio_mcp::mcp::{handle_jsonrpc_line, FlStudioMcp};
use flstudio_mcp::midi::{MemoryBackend, MidiMessage, MidiSession};

const PORT: &str = "FLStudio_MIDI";

/// Four mixer tracks; anything else is out of range
#[derive(Default)]
struct StudioHost {
    calls: AtomicUsize,
}

impl StudioHost {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn track(&self, track: i64) -> HostResult<i64> {
        self.hit();
        if (0..4).contains(&track) {
            Ok(track)
        } else {
            Err(HostError::IndexOutOfRange(track))
        }
    }
}

impl Transport for StudioHost {
    fn start(&self) -> HostResult<()> {
        self.hit();
        Ok(())
    }
    fn stop(&self) -> HostResult<()> {
        self.hit();
        Ok(())
    }
    fn record(&self) -> HostResult<()> {
        self.hit();
        Ok(())
    }
    fn song_pos(&self) -> HostResult<i64> {
        self.hit();
        Ok(0)
    }
    fn set_song_pos(&self, _position: i64) -> HostResult<()> {
        self.hit();
        Ok(())
    }
}

impl Mixer for StudioHost {
    fn track_volume(&self, track: i64) -> HostResult<f64> {
        self.track(track).map(|_| 0.78)
    }
    fn set_track_volume(&self, track: i64, _volume: f64) -> HostResult<()> {
        self.track(track).map(|_| ())
    }
    fn track_name(&self, track: i64) -> HostResult<String> {
        self.track(track).map(|t| format!("Insert {}", t))
    }
    fn set_track_name(&self, track: i64, _name: &str) -> HostResult<()> {
        self.track(track).map(|_| ())
    }
}

impl Channels for StudioHost {
    fn channel_count(&self) -> HostResult<i64> {
        self.hit();
        Ok(2)
    }
    fn channel_name(&self, channel: i64) -> HostResult<String> {
        self.track(channel).map(|_| "Sampler".to_string())
    }
    fn set_channel_volume(&self, channel: i64, _volume: f64) -> HostResult<()> {
        self.track(channel).map(|_| ())
    }
    fn mute_channel(&self, channel: i64, _mute: bool) -> HostResult<()> {
        self.track(channel).map(|_| ())
    }
}

impl Patterns for StudioHost {
    fn pattern_count(&self) -> HostResult<i64> {
        self.hit();
        Ok(1)
    }
    fn pattern_name(&self, pattern: i64) -> HostResult<String> {
        self.track(pattern).map(|_| "Pattern 1".to_string())
    }
    fn set_pattern_name(&self, pattern: i64, _name: &str) -> HostResult<()> {
        self.track(pattern).map(|_| ())
    }
}

impl General for StudioHost {
    fn project_title(&self) -> HostResult<String> {
        self.hit();
        Ok("untitled".to_string())
    }
    fn version(&self) -> HostResult<String> {
        self.hit();
        Ok("24.1.1".to_string())
    }
}

impl Ui for StudioHost {
    fn show_window(&self, _window_id: i64) -> HostResult<()> {
        self.hit();
        Ok(())
    }
}

impl Playlist for StudioHost {
    fn track_name(&self, track: i64) -> HostResult<String> {
        self.track(track).map(|t| format!("Track {}", t + 1))
    }
}

fn request(id: i64, method: &str, params: Value) -> String {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string()
}

async fn call_tool(mcp: &FlStudioMcp, id: i64, name: &str, arguments: Value) -> Value {
    let line = request(id, "tools/call", json!({ "name": name, "arguments": arguments }));
    let response = handle_jsonrpc_line(&line, mcp)
        .await
        .expect("tools/call must be answered");
    serde_json::from_str(&response).expect("response is JSON")
}

fn text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content")
}

#[tokio::test(start_paused = true)]
async fn midi_only_session_flow() {
    let backend = MemoryBackend::with_port(PORT);
    let mcp = FlStudioMcp::new(
        MidiSession::with_backend(PORT, Box::new(backend.clone())),
        None,
    );

    let init = handle_jsonrpc_line(&request(1, "initialize", json!({})), &mcp)
        .await
        .unwrap();
    assert!(init.contains("flstudio-mcp"));

    let tools: Value = serde_json::from_str(
        &handle_jsonrpc_line(&request(2, "tools/list", json!({})), &mcp)
            .await
            .unwrap(),
    )
    .unwrap();
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 9);
    assert!(names.iter().all(|n| n.starts_with("midi_")));

    let response = call_tool(&mcp, 3, "midi_connect", json!({})).await;
    assert_eq!(text(&response), "Connected to MIDI port: FLStudio_MIDI");

    let response = call_tool(
        &mcp,
        4,
        "midi_send_note",
        json!({ "note": 60, "velocity": 100, "duration": 0.5, "channel": 1 }),
    )
    .await;
    assert_eq!(
        text(&response),
        "Sent MIDI note 60 with velocity 100 for 0.5s on channel 1"
    );
    assert_eq!(response["result"]["isError"], false);

    let response = call_tool(&mcp, 5, "transport_start", json!({})).await;
    assert_eq!(
        text(&response),
        "FL Studio API not available. Tool 'transport_start' cannot be executed."
    );

    let response = call_tool(&mcp, 6, "midi_disconnect", json!({})).await;
    assert_eq!(text(&response), "Disconnected from MIDI port: FLStudio_MIDI");

    assert_eq!(
        backend.sent(),
        vec![
            MidiMessage::NoteOn {
                note: 60,
                velocity: 100,
                channel: 1
            },
            MidiMessage::NoteOff {
                note: 60,
                velocity: 100,
                channel: 1
            },
        ]
    );
    assert_eq!(backend.output_opens(), 1);
}

#[tokio::test]
async fn host_tools_reach_the_surface() {
    let host = Arc::new(StudioHost::default());
    let mcp = FlStudioMcp::new(
        MidiSession::with_backend(PORT, Box::new(MemoryBackend::new())),
        Some(HostSurface::from_api(host.clone())),
    );

    let tools: Value = serde_json::from_str(
        &handle_jsonrpc_line(&request(1, "tools/list", json!({})), &mcp)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(tools["result"]["tools"].as_array().unwrap().len(), 29);

    let response = call_tool(&mcp, 2, "mixer_get_track_name", json!({ "track_num": 2 })).await;
    assert_eq!(text(&response), "Track 2 name: Insert 2");

    let response = call_tool(&mcp, 3, "playlist_get_track_name", json!({ "track_num": 0 })).await;
    assert_eq!(text(&response), "Playlist track 0 name: Track 1");

    let response = call_tool(&mcp, 4, "general_get_version", json!({})).await;
    assert_eq!(text(&response), "FL Studio version: 24.1.1");

    assert_eq!(host.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn host_failure_is_an_error_result() {
    let host = Arc::new(StudioHost::default());
    let mcp = FlStudioMcp::new(
        MidiSession::with_backend(PORT, Box::new(MemoryBackend::new())),
        Some(HostSurface::from_api(host)),
    );

    let response = call_tool(&mcp, 1, "mixer_get_track_volume", json!({ "track_num": 99 })).await;
    assert_eq!(response["result"]["isError"], true);
    assert_eq!(text(&response), "Error: index 99 out of range");
}

#[tokio::test]
async fn unknown_tool_has_no_side_effects() {
    let backend = MemoryBackend::with_port(PORT);
    let host = Arc::new(StudioHost::default());
    let mcp = FlStudioMcp::new(
        MidiSession::with_backend(PORT, Box::new(backend.clone())),
        Some(HostSurface::from_api(host.clone())),
    );

    let response = call_tool(&mcp, 1, "mixer_delete_everything", json!({})).await;
    assert_eq!(response["error"]["code"], -32602);
    assert!(response.get("result").is_none());
    assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.output_opens(), 0);
    assert!(backend.sent().is_empty());
}

#[tokio::test]
async fn connect_fails_when_port_is_missing() {
    let backend = MemoryBackend::with_ports(&["Other In"], &["Other Out"]);
    let mcp = FlStudioMcp::new(
        MidiSession::with_backend(PORT, Box::new(backend.clone())),
        None,
    );

    let response = call_tool(&mcp, 1, "midi_connect", json!({})).await;
    assert_eq!(text(&response), "Failed to connect to MIDI port: FLStudio_MIDI");

    let response = call_tool(&mcp, 2, "midi_list_ports", json!({})).await;
    assert_eq!(
        text(&response),
        "Available MIDI ports:\nInput: [\"Other In\"]\nOutput: [\"Other Out\"]"
    );
    assert!(!mcp.session().lock().is_connected());
}
