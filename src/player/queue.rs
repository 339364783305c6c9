//! Queue navigation - one place for next/prev index calculations
//!
//! Every path that needs to know which song comes next (skip buttons,
//! end-of-track, previews) goes through [`QueueNavigator`].

use rand::Rng;

use crate::features::PlayMode;

/// Cached shuffle indices
///
/// In shuffle mode the next/prev picks are drawn ahead of time so a preview
/// and the actual skip agree.
#[derive(Debug, Clone, Default)]
pub struct ShuffleCache {
    /// Pre-drawn next index
    pub next: Option<usize>,
    /// Pre-drawn prev index
    pub prev: Option<usize>,
}

impl ShuffleCache {
    /// Draw new random indices
    pub fn regenerate(&mut self, queue_len: usize) {
        if queue_len == 0 {
            self.clear();
            return;
        }

        let mut rng = rand::rng();
        self.next = Some(rng.random_range(0..queue_len));
        self.prev = Some(rng.random_range(0..queue_len));

        tracing::debug!(
            "ShuffleCache regenerated: next={:?}, prev={:?}",
            self.next,
            self.prev
        );
    }

    /// Clear the cache (queue or play mode changed)
    pub fn clear(&mut self) {
        self.next = None;
        self.prev = None;
    }
}

/// Where a skip leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Play the song at this index
    Play(usize),
    /// Restart the current song from the beginning
    Restart,
    /// Nothing left to play
    End,
}

/// Computes next/prev targets for a play mode
pub struct QueueNavigator<'a> {
    queue_len: usize,
    current_idx: usize,
    play_mode: PlayMode,
    shuffle_cache: &'a ShuffleCache,
}

impl<'a> QueueNavigator<'a> {
    pub fn new(
        queue_len: usize,
        current_idx: Option<usize>,
        play_mode: PlayMode,
        shuffle_cache: &'a ShuffleCache,
    ) -> Self {
        Self {
            queue_len,
            current_idx: current_idx.unwrap_or(0),
            play_mode,
            shuffle_cache,
        }
    }

    fn random_index(&self, cached: Option<usize>) -> usize {
        cached
            .filter(|&i| i < self.queue_len)
            .unwrap_or_else(|| rand::rng().random_range(0..self.queue_len))
    }

    /// Calculate the next track index
    ///
    /// Sequential mode returns `None` past the last song.
    pub fn next_index(&self) -> Option<usize> {
        if self.queue_len == 0 {
            return None;
        }

        match self.play_mode {
            PlayMode::Shuffle => Some(self.random_index(self.shuffle_cache.next)),
            PlayMode::LoopOne => Some(self.current_idx),
            PlayMode::LoopAll => Some((self.current_idx + 1) % self.queue_len),
            PlayMode::Sequential => {
                let next = self.current_idx + 1;
                if next >= self.queue_len { None } else { Some(next) }
            }
        }
    }

    /// Calculate the previous track index
    ///
    /// Sequential mode stays on the first song instead of wrapping.
    pub fn prev_index(&self) -> Option<usize> {
        if self.queue_len == 0 {
            return None;
        }

        match self.play_mode {
            PlayMode::Shuffle => Some(self.random_index(self.shuffle_cache.prev)),
            PlayMode::LoopOne => Some(self.current_idx),
            PlayMode::LoopAll => {
                if self.current_idx == 0 {
                    Some(self.queue_len - 1)
                } else {
                    Some(self.current_idx - 1)
                }
            }
            PlayMode::Sequential => Some(self.current_idx.saturating_sub(1)),
        }
    }

    pub fn next_step(&self) -> Step {
        if self.is_loop_one() && self.queue_len > 0 {
            return Step::Restart;
        }
        self.next_index().map(Step::Play).unwrap_or(Step::End)
    }

    pub fn prev_step(&self) -> Step {
        if self.is_loop_one() && self.queue_len > 0 {
            return Step::Restart;
        }
        self.prev_index().map(Step::Play).unwrap_or(Step::End)
    }

    /// Check if LoopOne mode (same song repeats)
    pub fn is_loop_one(&self) -> bool {
        self.play_mode == PlayMode::LoopOne
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(len: usize, idx: usize, mode: PlayMode, cache: &ShuffleCache) -> QueueNavigator<'_> {
        QueueNavigator::new(len, Some(idx), mode, cache)
    }

    #[test]
    fn test_sequential() {
        let cache = ShuffleCache::default();
        assert_eq!(nav(3, 0, PlayMode::Sequential, &cache).next_index(), Some(1));
        assert_eq!(nav(3, 2, PlayMode::Sequential, &cache).next_index(), None);
        assert_eq!(nav(3, 2, PlayMode::Sequential, &cache).next_step(), Step::End);
        assert_eq!(nav(3, 0, PlayMode::Sequential, &cache).prev_index(), Some(0));
        assert_eq!(nav(3, 2, PlayMode::Sequential, &cache).prev_index(), Some(1));
    }

    #[test]
    fn test_loop_all_wraps() {
        let cache = ShuffleCache::default();
        assert_eq!(nav(3, 2, PlayMode::LoopAll, &cache).next_index(), Some(0));
        assert_eq!(nav(3, 0, PlayMode::LoopAll, &cache).prev_index(), Some(2));
    }

    #[test]
    fn test_loop_one_restarts() {
        let cache = ShuffleCache::default();
        assert_eq!(nav(3, 1, PlayMode::LoopOne, &cache).next_step(), Step::Restart);
        assert_eq!(nav(3, 1, PlayMode::LoopOne, &cache).prev_step(), Step::Restart);
    }

    #[test]
    fn test_shuffle_uses_cache() {
        let mut cache = ShuffleCache::default();
        cache.regenerate(5);
        let next = cache.next.unwrap();
        assert!(next < 5);
        assert_eq!(nav(5, 0, PlayMode::Shuffle, &cache).next_index(), Some(next));

        // a stale cache from a longer queue is ignored
        let stale = ShuffleCache { next: Some(9), prev: Some(9) };
        assert!(nav(3, 0, PlayMode::Shuffle, &stale).next_index().unwrap() < 3);
    }

    #[test]
    fn test_empty_queue() {
        let cache = ShuffleCache::default();
        for mode in [PlayMode::Sequential, PlayMode::LoopAll, PlayMode::LoopOne, PlayMode::Shuffle] {
            assert_eq!(nav(0, 0, mode, &cache).next_index(), None);
            assert_eq!(nav(0, 0, mode, &cache).next_step(), Step::End);
        }
    }
}
