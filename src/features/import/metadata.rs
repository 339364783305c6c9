//! Audio metadata extraction with encoding fallback
//!
//! Uses lofty for tag and stream properties. Missing titles and artists are
//! filled from the filename.

use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::Path;

use super::encoding::{decode_string, normalize_string};
use crate::database::{UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_GENRE, UNKNOWN_TITLE};

/// Metadata read from an audio file
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: Option<String>,
    pub year: Option<u32>,
    pub genre: Option<String>,
    pub track: Option<u32>,
    pub track_total: Option<u32>,
    pub disc: Option<u32>,
    pub disc_total: Option<u32>,
    /// Whole seconds
    pub duration_secs: u64,
    /// kbps
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub codec: Option<String>,
    pub container: Option<String>,
    pub comment: Option<String>,
    pub composer: Option<String>,
    /// Embedded lyrics (USLT / LYRICS)
    pub lyrics: Option<String>,
}

impl Default for AudioMetadata {
    fn default() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            album_artist: None,
            year: None,
            genre: None,
            track: None,
            track_total: None,
            disc: None,
            disc_total: None,
            duration_secs: 0,
            bitrate: None,
            sample_rate: None,
            codec: None,
            container: None,
            comment: None,
            composer: None,
            lyrics: None,
        }
    }
}

fn clean(value: &str) -> Option<String> {
    let s = normalize_string(&decode_string(value.as_bytes()));
    if s.is_empty() { None } else { Some(s) }
}

fn get_item(tag: &Tag, key: ItemKey) -> Option<String> {
    tag.get_string(&key).and_then(clean)
}

/// Extract metadata from an audio file
pub fn extract_metadata(path: &Path) -> Result<AudioMetadata> {
    let tagged_file = Probe::open(path)
        .context("Failed to open audio file")?
        .read()
        .context("Failed to read audio file")?;

    let properties = tagged_file.properties();

    let mut metadata = AudioMetadata {
        duration_secs: properties.duration().as_secs_f64().round() as u64,
        bitrate: properties.audio_bitrate().or(properties.overall_bitrate()),
        sample_rate: properties.sample_rate(),
        codec: Some(format!("{:?}", tagged_file.file_type())),
        container: path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_uppercase()),
        ..Default::default()
    };

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    if let Some(tag) = tag {
        if let Some(title) = tag.title().as_deref().and_then(clean) {
            metadata.title = title;
        }
        if let Some(artist) = tag.artist().as_deref().and_then(clean) {
            metadata.artist = artist;
        }
        if let Some(album) = tag.album().as_deref().and_then(clean) {
            metadata.album = album;
        }
        metadata.genre = tag.genre().as_deref().and_then(clean);
        metadata.comment = tag.comment().as_deref().and_then(clean);
        metadata.year = tag.year();
        metadata.track = tag.track();
        metadata.track_total = tag.track_total();
        metadata.disc = tag.disk();
        metadata.disc_total = tag.disk_total();
        metadata.album_artist = get_item(tag, ItemKey::AlbumArtist);
        metadata.composer = get_item(tag, ItemKey::Composer);

        // Lyrics keep their line breaks, only the encoding is fixed up
        metadata.lyrics = tag
            .get_string(&ItemKey::Lyrics)
            .map(|l| decode_string(l.as_bytes()))
            .filter(|l| !l.trim().is_empty());
    }

    if metadata.title == UNKNOWN_TITLE {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            metadata.title = stem.to_string();
        }
    }

    Ok(metadata)
}

/// Try to parse artist and title from filename
///
/// Common patterns:
/// - "Artist - Title.mp3"
/// - "Artist_-_Title.mp3"
/// - "01 - Title.mp3"
/// - "01. Title.mp3"
/// - "Title.mp3"
pub fn parse_filename(filename: &str) -> (Option<String>, Option<String>) {
    let name = filename
        .rsplit_once('.')
        .map(|(name, _)| name)
        .unwrap_or(filename);

    if let Some((artist, title)) = name.split_once(" - ") {
        let artist = artist.trim();
        // "01 - Title": the left side is a track number
        if !artist.is_empty() && artist.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return (None, Some(normalize_string(title)));
        }
        return (Some(normalize_string(artist)), Some(normalize_string(title)));
    }

    if let Some((artist, title)) = name.split_once("_-_") {
        return (Some(normalize_string(artist)), Some(normalize_string(title)));
    }

    let trimmed = name.trim();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if (1..=3).contains(&digits) {
        let rest = trimmed[digits..].trim_start_matches(['.', ' ', '_']);
        if !rest.is_empty() && rest.len() < trimmed.len() - digits {
            return (None, Some(normalize_string(rest)));
        }
    }

    (None, Some(normalize_string(name)))
}

/// Fill metadata still at its defaults from the filename
pub fn apply_smart_parsing(metadata: &mut AudioMetadata, filename: &str) {
    let (parsed_artist, parsed_title) = parse_filename(filename);
    let stem = filename
        .rsplit_once('.')
        .map(|(name, _)| name)
        .unwrap_or(filename);

    if metadata.artist == UNKNOWN_ARTIST {
        if let Some(artist) = parsed_artist {
            metadata.artist = artist;
        }
    }

    // extract_metadata falls back to the raw stem; a parsed title is better
    if metadata.title == UNKNOWN_TITLE || metadata.title == stem {
        if let Some(title) = parsed_title {
            metadata.title = title;
        }
    }
}

/// Genre with the library's default for untagged files
pub fn genre_or_default(metadata: &AudioMetadata) -> String {
    metadata
        .genre
        .clone()
        .unwrap_or_else(|| UNKNOWN_GENRE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filename_artist_title() {
        let (artist, title) = parse_filename("周杰伦 - 七里香.mp3");
        assert_eq!(artist, Some("周杰伦".to_string()));
        assert_eq!(title, Some("七里香".to_string()));
    }

    #[test]
    fn test_parse_filename_track_number() {
        let (artist, title) = parse_filename("01 - 七里香.mp3");
        assert_eq!(artist, None);
        assert_eq!(title, Some("七里香".to_string()));
    }

    #[test]
    fn test_parse_filename_numbered() {
        let (artist, title) = parse_filename("01. Yellow.flac");
        assert_eq!(artist, None);
        assert_eq!(title, Some("Yellow".to_string()));
    }

    #[test]
    fn test_parse_filename_simple() {
        assert_eq!(parse_filename("Yellow.mp3"), (None, Some("Yellow".to_string())));
        assert_eq!(parse_filename("1999.mp3"), (None, Some("1999".to_string())));
    }

    #[test]
    fn test_apply_smart_parsing() {
        let mut metadata = AudioMetadata {
            title: "Coldplay - Yellow".to_string(),
            ..Default::default()
        };
        apply_smart_parsing(&mut metadata, "Coldplay - Yellow.mp3");
        assert_eq!(metadata.artist, "Coldplay");
        assert_eq!(metadata.title, "Yellow");

        let mut tagged = AudioMetadata {
            title: "Real Title".to_string(),
            artist: "Real Artist".to_string(),
            ..Default::default()
        };
        apply_smart_parsing(&mut tagged, "x - y.mp3");
        assert_eq!(tagged.title, "Real Title");
        assert_eq!(tagged.artist, "Real Artist");
    }

    #[test]
    fn test_extract_metadata_rejects_non_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(extract_metadata(&path).is_err());
    }
}
