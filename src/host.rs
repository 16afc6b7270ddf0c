//! FL Studio scripting surface.
//!
//! The DAW's scripting modules only exist when this code runs embedded in a
//! live FL Studio instance. The embedder implements these traits on top of
//! them and hands a [`HostSurface`] to the dispatcher. A standalone process
//! has no surface at all and passes `None`.

use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("{group}.{call} failed: {message}")]
    CallFailed {
        group: &'static str,
        call: &'static str,
        message: String,
    },

    #[error("index {0} out of range")]
    IndexOutOfRange(i64),
}

pub type HostResult<T> = Result<T, HostError>;

pub trait Transport: Send + Sync {
    fn start(&self) -> HostResult<()>;
    fn stop(&self) -> HostResult<()>;
    /// Toggles recording
    fn record(&self) -> HostResult<()>;
    fn song_pos(&self) -> HostResult<i64>;
    fn set_song_pos(&self, position: i64) -> HostResult<()>;
}

pub trait Mixer: Send + Sync {
    fn track_volume(&self, track: i64) -> HostResult<f64>;
    fn set_track_volume(&self, track: i64, volume: f64) -> HostResult<()>;
    fn track_name(&self, track: i64) -> HostResult<String>;
    fn set_track_name(&self, track: i64, name: &str) -> HostResult<()>;
}

pub trait Channels: Send + Sync {
    fn channel_count(&self) -> HostResult<i64>;
    fn channel_name(&self, channel: i64) -> HostResult<String>;
    fn set_channel_volume(&self, channel: i64, volume: f64) -> HostResult<()>;
    fn mute_channel(&self, channel: i64, mute: bool) -> HostResult<()>;
}

pub trait Patterns: Send + Sync {
    fn pattern_count(&self) -> HostResult<i64>;
    fn pattern_name(&self, pattern: i64) -> HostResult<String>;
    fn set_pattern_name(&self, pattern: i64, name: &str) -> HostResult<()>;
}

pub trait General: Send + Sync {
    fn project_title(&self) -> HostResult<String>;
    fn version(&self) -> HostResult<String>;
}

pub trait Ui: Send + Sync {
    fn show_window(&self, window_id: i64) -> HostResult<()>;
}

pub trait Playlist: Send + Sync {
    fn track_name(&self, track: i64) -> HostResult<String>;
}

/// The seven scripting groups of a detected FL Studio instance
#[derive(Clone)]
pub struct HostSurface {
    pub transport: Arc<dyn Transport>,
    pub mixer: Arc<dyn Mixer>,
    pub channels: Arc<dyn Channels>,
    pub patterns: Arc<dyn Patterns>,
    pub general: Arc<dyn General>,
    pub ui: Arc<dyn Ui>,
    pub playlist: Arc<dyn Playlist>,
}

impl HostSurface {
    /// Build a surface from one object that implements every group
    pub fn from_api<A>(api: Arc<A>) -> Self
    where
        A: Transport + Mixer + Channels + Patterns + General + Ui + Playlist + 'static,
    {
        Self {
            transport: api.clone(),
            mixer: api.clone(),
            channels: api.clone(),
            patterns: api.clone(),
            general: api.clone(),
            ui: api.clone(),
            playlist: api,
        }
    }
}
