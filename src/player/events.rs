//! Player session events and shared state
//!
//! - `PlayerEvent` - notifications fanned out to every subscriber
//! - `SharedPlaybackState` - lock-protected snapshot for non-blocking reads

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::features::PlayMode;

/// Events emitted by [`super::PlayerSession`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A new song became current
    SongChanged { index: usize, path: String },
    /// The current song restarted from the beginning
    Restarted { index: usize },
    /// Sequential playback ran past the last song
    QueueEnded,
    /// Queue contents replaced or extended
    QueueChanged { len: usize },
    PlayStateChanged { is_playing: bool },
    /// Position jumped
    Seeked { position: f64 },
    VolumeChanged { volume: f64 },
    PlayModeChanged { mode: PlayMode },
    /// A lyric track was installed
    LyricsLoaded { line_count: usize },
    LyricsCleared,
    /// Highlighted lyric line changed; `None` means nothing highlighted
    ActiveLineChanged { index: Option<usize> },
}

pub type EventSender = mpsc::UnboundedSender<PlayerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PlayerEvent>;

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub current_path: Option<String>,
    pub current_index: Option<usize>,
    /// Seconds
    pub position: f64,
    pub is_playing: bool,
    pub volume: f64,
    pub play_mode: PlayMode,
    /// Queue as song paths
    pub queue: Vec<String>,
    pub active_line: Option<usize>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            current_path: None,
            current_index: None,
            position: 0.0,
            is_playing: false,
            volume: 0.5,
            play_mode: PlayMode::Sequential,
            queue: Vec::new(),
            active_line: None,
        }
    }
}

/// Thread-safe snapshot, written by the session and read anywhere
#[derive(Debug, Clone, Default)]
pub struct SharedPlaybackState {
    inner: Arc<RwLock<PlaybackSnapshot>>,
}

impl SharedPlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.read().clone()
    }

    pub fn position(&self) -> f64 {
        self.inner.read().position
    }

    pub fn active_line(&self) -> Option<usize> {
        self.inner.read().active_line
    }

    pub(super) fn store(&self, snapshot: PlaybackSnapshot) {
        *self.inner.write() = snapshot;
    }
}
