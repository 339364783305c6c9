//! Playback state operations

use anyhow::Result;

use super::KEY_PLAYBACK_STATE;
use crate::database::{KvStore, PlaybackState};

/// Get saved playback state, defaults when absent
pub async fn get_playback_state(store: &KvStore) -> Result<PlaybackState> {
    Ok(store.get(KEY_PLAYBACK_STATE).await.unwrap_or_default())
}

pub async fn set_playback_state(store: &KvStore, state: &PlaybackState) -> Result<()> {
    store.set(KEY_PLAYBACK_STATE, state).await
}

/// Apply `f` to the saved state and persist the result
pub async fn update_playback_state<F>(store: &KvStore, f: F) -> Result<PlaybackState>
where
    F: FnOnce(&mut PlaybackState),
{
    let mut state = get_playback_state(store).await?;
    f(&mut state);
    set_playback_state(store, &state).await?;
    Ok(state)
}
