//! Lyrics discovery for local audio files

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use std::fs;
use std::path::{Path, PathBuf};

use crate::features::import::decode_string;

/// Where raw lyrics were found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsOrigin {
    /// Same-name `.lrc` file
    Sidecar(PathBuf),
    /// Lyrics tag inside the audio file
    Embedded,
}

/// Raw lyric text plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct FoundLyrics {
    pub raw: String,
    pub origin: LyricsOrigin,
}

/// Find lyrics for an audio file
///
/// A sidecar file wins over embedded lyrics. Blank results are ignored.
pub fn find_lyrics(audio_path: &Path) -> Option<FoundLyrics> {
    if let Some(lyrics_path) = find_lyrics_file(audio_path) {
        match fs::read(&lyrics_path) {
            Ok(bytes) => {
                let raw = decode_string(&bytes);
                if !raw.trim().is_empty() {
                    tracing::debug!("Loaded lyrics from {:?}", lyrics_path);
                    return Some(FoundLyrics {
                        raw,
                        origin: LyricsOrigin::Sidecar(lyrics_path),
                    });
                }
            }
            Err(e) => tracing::warn!("Failed to read {:?}: {}", lyrics_path, e),
        }
    }

    let raw = extract_embedded_lyrics(audio_path)?;
    tracing::debug!("Loaded embedded lyrics from {:?}", audio_path);
    Some(FoundLyrics {
        raw,
        origin: LyricsOrigin::Embedded,
    })
}

/// Same-name `.lrc` (or `.LRC`) next to the audio file
pub fn find_lyrics_file(audio_path: &Path) -> Option<PathBuf> {
    let parent = audio_path.parent()?;
    let stem = audio_path.file_stem()?.to_str()?;

    ["lrc", "LRC"]
        .iter()
        .map(|ext| parent.join(format!("{}.{}", stem, ext)))
        .find(|path| path.is_file())
}

fn extract_embedded_lyrics(audio_path: &Path) -> Option<String> {
    let tagged_file = Probe::open(audio_path).ok()?.read().ok()?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    tag.get_string(&ItemKey::Lyrics)
        .filter(|lyrics| !lyrics.trim().is_empty())
        .map(|lyrics| lyrics.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_sidecar_lyrics() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("song.mp3");
        std::fs::write(&audio, b"x").unwrap();
        assert_eq!(find_lyrics_file(&audio), None);

        let lrc = dir.path().join("song.LRC");
        std::fs::write(&lrc, "[00:01.00]Hello").unwrap();

        let found = find_lyrics(&audio).unwrap();
        assert_eq!(found.raw, "[00:01.00]Hello");
        assert_eq!(found.origin, LyricsOrigin::Sidecar(lrc));
    }

    #[test]
    fn test_blank_sidecar_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("song.flac");
        std::fs::write(&audio, b"x").unwrap();
        std::fs::write(dir.path().join("song.lrc"), "  \n").unwrap();
        assert_eq!(find_lyrics(&audio), None);
    }

    #[test]
    fn test_missing_audio_file() {
        assert_eq!(find_lyrics(Path::new("/definitely/not/here.mp3")), None);
    }
}
