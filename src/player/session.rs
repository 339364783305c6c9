//! Headless playback session
//!
//! Owns the queue, the transport state and the lyric highlight. The caller
//! supplies playback time (from whatever actually plays the audio) through
//! `on_time_update`; every state change is broadcast to subscribers.

use crate::database::{PlaybackState, Song};
use crate::features::lyrics::{HighlightChange, LyricSync, LyricTrack};
use crate::features::{PlayMode, Settings};

use super::events::{EventReceiver, EventSender, PlaybackSnapshot, PlayerEvent, SharedPlaybackState};
use super::queue::{QueueNavigator, ShuffleCache, Step};

/// Played paths kept in the session history
const HISTORY_LIMIT: usize = 100;

/// Volume restored by unmute when none was saved
const DEFAULT_UNMUTE_VOLUME: f64 = 0.5;

#[derive(Debug, Default)]
pub struct PlayerSession {
    queue: Vec<Song>,
    current_index: Option<usize>,
    play_mode: PlayMode,
    shuffle_cache: ShuffleCache,
    position: f64,
    is_playing: bool,
    volume: f64,
    previous_volume: Option<f64>,
    lyrics: LyricSync,
    history: Vec<String>,
    subscribers: Vec<EventSender>,
    shared: SharedPlaybackState,
}

impl PlayerSession {
    pub fn new() -> Self {
        Self {
            volume: DEFAULT_UNMUTE_VOLUME,
            ..Default::default()
        }
    }

    /// Session with the saved volume and play mode
    pub fn from_settings(settings: &Settings) -> Self {
        let mut session = Self::new();
        session.volume = settings.volume.clamp(0.0, 1.0);
        session.play_mode = settings.play_mode;
        session.publish();
        session
    }

    // ============ Observers ============

    /// Attach a new subscriber
    pub fn subscribe(&mut self) -> EventReceiver {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Lock-protected snapshot that other threads can read
    pub fn shared_state(&self) -> SharedPlaybackState {
        self.shared.clone()
    }

    fn emit(&mut self, event: PlayerEvent) {
        tracing::trace!("Player event: {:?}", event);
        // closed receivers are dropped
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn publish(&self) {
        self.shared.store(self.snapshot());
    }

    // ============ Queue ============

    /// Replace the queue and start playing at `start`
    pub fn set_queue(&mut self, songs: Vec<Song>, start: usize) -> Option<&Song> {
        self.queue = songs;
        self.shuffle_cache.clear();
        self.emit(PlayerEvent::QueueChanged {
            len: self.queue.len(),
        });

        if self.queue.is_empty() {
            self.stop();
            return None;
        }

        let start = start.min(self.queue.len() - 1);
        self.play_index(start)
    }

    pub fn add_to_queue(&mut self, songs: Vec<Song>) {
        if songs.is_empty() {
            return;
        }
        self.queue.extend(songs);
        self.shuffle_cache.regenerate(self.queue.len());
        self.emit(PlayerEvent::QueueChanged {
            len: self.queue.len(),
        });
        self.publish();
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.shuffle_cache.clear();
        self.emit(PlayerEvent::QueueChanged { len: 0 });
        self.stop();
    }

    fn stop(&mut self) {
        self.current_index = None;
        self.position = 0.0;
        self.clear_lyrics();
        self.set_playing(false);
        self.publish();
    }

    /// Make the song at `index` current and start playing it
    ///
    /// The previous song's lyrics are dropped; load the new track with
    /// [`Self::load_lyrics`].
    pub fn play_index(&mut self, index: usize) -> Option<&Song> {
        let path = self.queue.get(index)?.path.clone();

        self.current_index = Some(index);
        self.position = 0.0;
        self.clear_lyrics();
        self.shuffle_cache.regenerate(self.queue.len());

        self.history.push(path.clone());
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }

        tracing::debug!("Playing queue index {}: {}", index, path);
        self.emit(PlayerEvent::SongChanged { index, path });
        self.set_playing(true);
        self.publish();
        self.queue.get(index)
    }

    fn navigator(&self) -> QueueNavigator<'_> {
        QueueNavigator::new(
            self.queue.len(),
            self.current_index,
            self.play_mode,
            &self.shuffle_cache,
        )
    }

    fn apply_step(&mut self, step: Step) -> Step {
        match step {
            Step::Play(index) => {
                self.play_index(index);
            }
            Step::Restart => {
                if let Some(index) = self.current_index {
                    self.seek(0.0);
                    self.emit(PlayerEvent::Restarted { index });
                    self.set_playing(true);
                    self.publish();
                }
            }
            Step::End => {
                if !self.queue.is_empty() {
                    self.set_playing(false);
                    self.emit(PlayerEvent::QueueEnded);
                    self.publish();
                }
            }
        }
        step
    }

    /// Skip forward according to the play mode
    pub fn next(&mut self) -> Step {
        let step = self.navigator().next_step();
        self.apply_step(step)
    }

    /// Skip backward according to the play mode
    pub fn previous(&mut self) -> Step {
        let step = self.navigator().prev_step();
        self.apply_step(step)
    }

    /// Track finished; advances only when auto-play is on
    pub fn on_song_ended(&mut self, auto_play_next: bool) -> Option<Step> {
        if auto_play_next {
            Some(self.next())
        } else {
            self.pause();
            None
        }
    }

    // ============ Transport ============

    fn set_playing(&mut self, is_playing: bool) {
        if self.is_playing != is_playing {
            self.is_playing = is_playing;
            self.emit(PlayerEvent::PlayStateChanged { is_playing });
        }
    }

    /// Resume; false when there is nothing to play
    pub fn play(&mut self) -> bool {
        if self.current_index.is_none() {
            return false;
        }
        self.set_playing(true);
        self.publish();
        true
    }

    pub fn pause(&mut self) {
        self.set_playing(false);
        self.publish();
    }

    pub fn toggle_play(&mut self) -> bool {
        if self.is_playing {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    /// Clock tick from the audio backend
    ///
    /// Non-finite times are ignored; negative times count as zero.
    pub fn on_time_update(&mut self, current_time_secs: f64) -> Option<HighlightChange> {
        if !current_time_secs.is_finite() {
            return None;
        }
        self.position = current_time_secs.max(0.0);
        let change = self.sync_lyrics();
        self.publish();
        change
    }

    /// Jump to `position_secs`, clamped to the song when its duration is known
    pub fn seek(&mut self, position_secs: f64) -> Option<HighlightChange> {
        if !position_secs.is_finite() {
            return None;
        }

        let mut position = position_secs.max(0.0);
        if let Some(duration) = self
            .current_song()
            .map(|s| s.duration_secs as f64)
            .filter(|d| *d > 0.0)
        {
            position = position.min(duration);
        }

        self.position = position;
        self.emit(PlayerEvent::Seeked { position });
        let change = self.sync_lyrics();
        self.publish();
        change
    }

    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        if volume != self.volume {
            self.volume = volume;
            self.emit(PlayerEvent::VolumeChanged { volume });
            self.publish();
        }
    }

    /// Mute, or restore the volume saved by the last mute
    pub fn toggle_mute(&mut self) {
        if self.volume > 0.0 {
            self.previous_volume = Some(self.volume);
            self.set_volume(0.0);
        } else {
            let restore = self
                .previous_volume
                .take()
                .filter(|v| *v > 0.0)
                .unwrap_or(DEFAULT_UNMUTE_VOLUME);
            self.set_volume(restore);
        }
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        if mode == self.play_mode {
            return;
        }
        self.play_mode = mode;
        if mode == PlayMode::Shuffle {
            self.shuffle_cache.regenerate(self.queue.len());
        } else {
            self.shuffle_cache.clear();
        }
        self.emit(PlayerEvent::PlayModeChanged { mode });
        self.publish();
    }

    pub fn cycle_play_mode(&mut self) -> PlayMode {
        self.set_play_mode(self.play_mode.next());
        self.play_mode
    }

    // ============ Lyrics ============

    /// Install the lyric track for the current song
    pub fn load_lyrics(&mut self, track: LyricTrack) -> Option<HighlightChange> {
        let line_count = track.len();
        self.lyrics.load(track);
        self.emit(PlayerEvent::LyricsLoaded { line_count });
        let change = self.sync_lyrics();
        self.publish();
        change
    }

    pub fn clear_lyrics(&mut self) {
        let had_highlight = self.lyrics.current_index().is_some();
        let had_track = self.lyrics.track().is_some();
        self.lyrics.clear();
        if had_highlight {
            self.emit(PlayerEvent::ActiveLineChanged { index: None });
        }
        if had_track {
            self.emit(PlayerEvent::LyricsCleared);
        }
    }

    fn sync_lyrics(&mut self) -> Option<HighlightChange> {
        let change = self.lyrics.update(self.position)?;
        self.emit(PlayerEvent::ActiveLineChanged {
            index: change.current.index(),
        });
        Some(change)
    }

    pub fn lyrics(&self) -> &LyricSync {
        &self.lyrics
    }

    // ============ Accessors ============

    pub fn current_song(&self) -> Option<&Song> {
        self.current_index.and_then(|i| self.queue.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn queue(&self) -> &[Song] {
        &self.queue
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    // ============ Persistence ============

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_path: self.current_song().map(|s| s.path.clone()),
            current_index: self.current_index,
            position: self.position,
            is_playing: self.is_playing,
            volume: self.volume,
            play_mode: self.play_mode,
            queue: self.queue.iter().map(|s| s.path.clone()).collect(),
            active_line: self.lyrics.current_index(),
        }
    }

    /// State to persist with `Database::update_playback_state`
    pub fn to_playback_state(&self) -> PlaybackState {
        let snapshot = self.snapshot();
        PlaybackState {
            current_song: snapshot.current_path,
            current_time: snapshot.position,
            is_playing: snapshot.is_playing,
            queue: snapshot.queue,
            current_index: snapshot.current_index,
            history: self.history.clone(),
            volume: snapshot.volume,
            play_mode: snapshot.play_mode,
        }
    }

    /// Rebuild the queue from saved state, paused at the saved position
    ///
    /// Paths no longer in `library` are dropped from the queue.
    pub fn restore(&mut self, state: &PlaybackState, library: &[Song]) {
        let find = |path: &str| library.iter().find(|s| s.path == path).cloned();

        self.queue = state.queue.iter().filter_map(|p| find(p)).collect();
        self.current_index = state
            .current_song
            .as_deref()
            .and_then(|path| self.queue.iter().position(|s| s.path == path));
        self.position = if self.current_index.is_some() {
            state.current_time.max(0.0)
        } else {
            0.0
        };
        self.history = state.history.clone();
        self.volume = state.volume.clamp(0.0, 1.0);
        self.play_mode = state.play_mode;
        self.set_playing(false);
        self.lyrics.clear();
        self.shuffle_cache.regenerate(self.queue.len());

        tracing::debug!(
            "Restored queue of {} songs (current {:?})",
            self.queue.len(),
            self.current_index
        );
        self.emit(PlayerEvent::QueueChanged {
            len: self.queue.len(),
        });
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::lyrics::build_track;

    fn song(path: &str, duration: u64) -> Song {
        Song {
            duration_secs: duration,
            ..Song::new(path)
        }
    }

    fn queue(n: usize) -> Vec<Song> {
        (0..n).map(|i| song(&format!("/music/{}.mp3", i), 180)).collect()
    }

    fn drain(rx: &mut EventReceiver) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_set_queue_plays_start() {
        let mut session = PlayerSession::new();
        let mut rx = session.subscribe();

        let current = session.set_queue(queue(3), 1).map(|s| s.path.clone());
        assert_eq!(current.as_deref(), Some("/music/1.mp3"));
        assert!(session.is_playing());

        let events = drain(&mut rx);
        assert!(events.contains(&PlayerEvent::QueueChanged { len: 3 }));
        assert!(events.contains(&PlayerEvent::SongChanged {
            index: 1,
            path: "/music/1.mp3".to_string()
        }));
    }

    #[test]
    fn test_sequential_end_of_queue() {
        let mut session = PlayerSession::new();
        session.set_queue(queue(2), 1);
        let mut rx = session.subscribe();

        assert_eq!(session.next(), Step::End);
        assert!(!session.is_playing());
        assert_eq!(session.current_index(), Some(1));
        assert!(drain(&mut rx).contains(&PlayerEvent::QueueEnded));
    }

    #[test]
    fn test_sequential_previous_at_start() {
        let mut session = PlayerSession::new();
        session.set_queue(queue(3), 0);
        assert_eq!(session.previous(), Step::Play(0));
        assert_eq!(session.current_index(), Some(0));
    }

    #[test]
    fn test_loop_modes() {
        let mut session = PlayerSession::new();
        session.set_queue(queue(3), 2);

        session.set_play_mode(PlayMode::LoopAll);
        assert_eq!(session.next(), Step::Play(0));
        assert_eq!(session.previous(), Step::Play(2));

        session.set_play_mode(PlayMode::LoopOne);
        session.on_time_update(42.0);
        assert_eq!(session.next(), Step::Restart);
        assert_eq!(session.current_index(), Some(2));
        assert_eq!(session.position(), 0.0);
    }

    #[test]
    fn test_song_ended_respects_auto_play() {
        let mut session = PlayerSession::new();
        session.set_queue(queue(3), 0);

        assert_eq!(session.on_song_ended(false), None);
        assert!(!session.is_playing());
        assert_eq!(session.current_index(), Some(0));

        assert_eq!(session.on_song_ended(true), Some(Step::Play(1)));
        assert!(session.is_playing());
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut session = PlayerSession::new();
        session.set_queue(vec![song("/a.mp3", 100)], 0);

        session.seek(250.0);
        assert_eq!(session.position(), 100.0);
        session.seek(-5.0);
        assert_eq!(session.position(), 0.0);

        // unknown duration: no upper bound
        session.set_queue(vec![song("/b.mp3", 0)], 0);
        session.seek(250.0);
        assert_eq!(session.position(), 250.0);
    }

    #[test]
    fn test_volume_and_mute() {
        let mut session = PlayerSession::new();
        session.set_volume(1.7);
        assert_eq!(session.volume(), 1.0);
        session.set_volume(0.8);

        session.toggle_mute();
        assert_eq!(session.volume(), 0.0);
        session.toggle_mute();
        assert_eq!(session.volume(), 0.8);

        // muted without a saved volume
        session.set_volume(0.0);
        session.toggle_mute();
        assert_eq!(session.volume(), 0.5);
    }

    #[test]
    fn test_lyrics_follow_clock_and_seek() {
        let mut session = PlayerSession::new();
        session.set_queue(queue(1), 0);
        let mut rx = session.subscribe();

        session.load_lyrics(build_track("[00:01.00]Line one\n[00:03.00]Line two"));
        assert!(drain(&mut rx).contains(&PlayerEvent::LyricsLoaded { line_count: 2 }));

        assert!(session.on_time_update(0.5).is_none());
        assert!(drain(&mut rx).is_empty());

        session.on_time_update(1.5);
        assert_eq!(
            drain(&mut rx),
            vec![PlayerEvent::ActiveLineChanged { index: Some(0) }]
        );

        // same line, no event
        assert!(session.on_time_update(2.0).is_none());

        session.on_time_update(3.2);
        assert_eq!(session.lyrics().current_index(), Some(1));
        drain(&mut rx);

        session.seek(0.0);
        assert_eq!(session.lyrics().current_index(), None);
        assert_eq!(
            drain(&mut rx),
            vec![
                PlayerEvent::Seeked { position: 0.0 },
                PlayerEvent::ActiveLineChanged { index: None }
            ]
        );
    }

    #[test]
    fn test_song_change_drops_lyrics() {
        let mut session = PlayerSession::new();
        session.set_queue(queue(2), 0);
        session.load_lyrics(build_track("[00:00.00]Intro"));
        assert_eq!(session.lyrics().current_index(), Some(0));

        let mut rx = session.subscribe();
        session.next();
        assert!(session.lyrics().track().is_none());

        let events = drain(&mut rx);
        assert!(events.contains(&PlayerEvent::LyricsCleared));
        assert!(events.contains(&PlayerEvent::ActiveLineChanged { index: None }));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut session = PlayerSession::new();
        let rx = session.subscribe();
        let mut kept = session.subscribe();
        drop(rx);

        session.set_volume(0.9);
        assert_eq!(session.subscribers.len(), 1);
        assert_eq!(drain(&mut kept), vec![PlayerEvent::VolumeChanged { volume: 0.9 }]);
    }

    #[test]
    fn test_shared_state_tracks_session() {
        let mut session = PlayerSession::new();
        let shared = session.shared_state();
        session.set_queue(queue(2), 1);
        session.on_time_update(12.5);

        assert_eq!(shared.position(), 12.5);
        assert_eq!(shared.snapshot().current_path.as_deref(), Some("/music/1.mp3"));
    }

    #[test]
    fn test_playback_state_restore() {
        let library = queue(3);
        let mut session = PlayerSession::new();
        session.set_queue(library.clone(), 2);
        session.on_time_update(33.0);
        let state = session.to_playback_state();
        assert_eq!(state.current_song.as_deref(), Some("/music/2.mp3"));

        let mut restored = PlayerSession::new();
        restored.restore(&state, &library[1..]);
        assert_eq!(restored.queue().len(), 2);
        assert_eq!(restored.current_index(), Some(1));
        assert_eq!(restored.position(), 33.0);
        assert!(!restored.is_playing());
    }

    #[test]
    fn test_restore_pauses_playing_session() {
        let library = queue(2);
        let state = PlaybackState {
            current_song: Some("/music/0.mp3".to_string()),
            queue: vec!["/music/0.mp3".to_string(), "/music/1.mp3".to_string()],
            volume: 0.5,
            ..Default::default()
        };

        let mut session = PlayerSession::new();
        session.set_queue(library.clone(), 1);
        assert!(session.is_playing());
        let mut rx = session.subscribe();

        session.restore(&state, &library);
        assert!(!session.is_playing());
        assert!(!session.shared_state().snapshot().is_playing);
        assert!(
            drain(&mut rx).contains(&PlayerEvent::PlayStateChanged { is_playing: false })
        );
    }
}
