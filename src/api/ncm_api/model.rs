//! NCM API Model types
//!
//! Response parsing is kept separate from the HTTP client so it can be
//! exercised against fixtures.

use anyhow::{Context, Ok, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::OnlineSongInfo;

trait DeVal<'a>: Sized {
    fn dval(v: &'a Value) -> Result<Self>;
}

impl<'a> DeVal<'a> for i64 {
    fn dval(v: &Value) -> Result<Self> {
        Ok(Self::deserialize(v)?)
    }
}

impl<'a> DeVal<'a> for u64 {
    fn dval(v: &Value) -> Result<Self> {
        Ok(Self::deserialize(v)?)
    }
}

impl<'a> DeVal<'a> for String {
    fn dval(v: &Value) -> Result<Self> {
        Ok(Self::deserialize(v)?)
    }
}

impl<'a> DeVal<'a> for &'a Vec<Value> {
    fn dval(v: &'a Value) -> Result<Self> {
        match v {
            Value::Array(v) => Ok(v),
            _ => Err(anyhow!("json not a array")),
        }
    }
}

fn get_val_chain<'a, T>(v: &'a Value, names: &[&str]) -> Result<T>
where
    T: DeVal<'a>,
{
    let v = names.iter().fold(std::result::Result::Ok(v), |v, n| {
        v?.get(n)
            .ok_or_else(|| anyhow!("key '{}' not found, in chain {:?}", n, names))
    })?;
    T::dval(v)
}

macro_rules! get_val {
    (@as $t:ty, $v:expr, $($n:expr),+) => {
        get_val_chain::<$t>($v, &[$($n),+]).context(format!("at {}:{}", file!(), line!()))
    };
    ($v:expr, $($n:expr),+) => {
        get_val_chain($v, &[$($n),+]).context(format!("at {}:{}", file!(), line!()))
    };
}

/// A song found by the search endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SongMatch {
    pub id: u64,
    pub name: String,
    /// Artist names joined with ", "
    pub artist: String,
    pub album: String,
    /// Milliseconds
    pub duration: u64,
}

impl From<SongMatch> for OnlineSongInfo {
    fn from(m: SongMatch) -> Self {
        OnlineSongInfo {
            id: m.id,
            name: m.name,
            artist: m.artist,
            album: m.album,
            duration: m.duration,
        }
    }
}

/// Raw LRC text as returned by the lyric endpoint
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RawLyrics {
    pub lyric: String,
    /// Translation, when the service has one
    pub translated: Option<String>,
}

/// Search match plus its lyrics
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineLyrics {
    pub song: SongMatch,
    pub lyrics: RawLyrics,
}

fn check_code(value: &Value) -> Result<()> {
    let code: i64 = get_val!(value, "code")?;
    if code != 200 {
        return Err(anyhow!("API returned code {}", code));
    }
    Ok(())
}

/// Parse a `/api/search/get/web` response
pub fn to_song_matches(json: &str) -> Result<Vec<SongMatch>> {
    let value = &serde_json::from_str::<Value>(json)?;
    check_code(value)?;

    let unk = "unknown".to_string();
    let empty = vec![];
    let array: &Vec<Value> = get_val!(value, "result", "songs").unwrap_or(&empty);

    let mut vec = Vec::with_capacity(array.len());
    for v in array.iter() {
        let artist = get_val!(@as &Vec<Value>, v, "artists")
            .map(|artists| {
                artists
                    .iter()
                    .filter_map(|a| get_val!(@as String, a, "name").ok())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|_| unk.clone());

        vec.push(SongMatch {
            id: get_val!(v, "id")?,
            name: get_val!(v, "name")?,
            artist,
            album: get_val!(v, "album", "name").unwrap_or_else(|_| unk.clone()),
            duration: get_val!(v, "duration").unwrap_or_default(),
        });
    }
    Ok(vec)
}

/// Parse a `/api/song/lyric` response
///
/// Fails when the code is not 200 or the main lyric is missing or blank.
/// An absent or blank translation is `None`.
pub fn to_lyric(json: &str) -> Result<RawLyrics> {
    let value = &serde_json::from_str::<Value>(json)?;
    check_code(value)?;

    let lyric: String = get_val!(value, "lrc", "lyric").unwrap_or_default();
    if lyric.trim().is_empty() {
        return Err(anyhow!("lyrics unavailable"));
    }

    let translated = get_val!(@as String, value, "tlyric", "lyric")
        .ok()
        .filter(|t| !t.trim().is_empty());

    Ok(RawLyrics { lyric, translated })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_JSON: &str = r#"{
        "result": {
            "songs": [
                {"id": 186016, "name": "晴天",
                 "artists": [{"id": 6452, "name": "周杰伦"}, {"id": 1, "name": "Guest"}],
                 "album": {"id": 18905, "name": "叶惠美"}, "duration": 269000},
                {"id": 2, "name": "Other", "artists": [], "album": {"name": "X"}}
            ],
            "songCount": 2
        },
        "code": 200
    }"#;

    #[test]
    fn test_to_song_matches() {
        let matches = to_song_matches(SEARCH_JSON).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, 186016);
        assert_eq!(matches[0].artist, "周杰伦, Guest");
        assert_eq!(matches[0].album, "叶惠美");
        assert_eq!(matches[0].duration, 269000);
        assert_eq!(matches[1].artist, "");
        assert_eq!(matches[1].duration, 0);
    }

    #[test]
    fn test_to_song_matches_empty_and_error() {
        assert!(to_song_matches(r#"{"result":{"songCount":0},"code":200}"#).unwrap().is_empty());
        assert!(to_song_matches(r#"{"code":400}"#).is_err());
        assert!(to_song_matches("<html>").is_err());
    }

    #[test]
    fn test_to_lyric() {
        let json = r#"{"lrc":{"version":1,"lyric":"[00:01.00]Hello\n"},
                       "tlyric":{"version":1,"lyric":"[00:01.00]你好\n"},"code":200}"#;
        let lyrics = to_lyric(json).unwrap();
        assert_eq!(lyrics.lyric, "[00:01.00]Hello\n");
        assert_eq!(lyrics.translated.as_deref(), Some("[00:01.00]你好\n"));
    }

    #[test]
    fn test_to_lyric_without_translation() {
        let json = r#"{"lrc":{"lyric":"[00:01.00]Hello"},"tlyric":{"lyric":""},"code":200}"#;
        assert_eq!(to_lyric(json).unwrap().translated, None);

        let json = r#"{"lrc":{"lyric":"[00:01.00]Hello"},"code":200}"#;
        assert_eq!(to_lyric(json).unwrap().translated, None);
    }

    #[test]
    fn test_to_lyric_unavailable() {
        assert!(to_lyric(r#"{"nolyric":true,"code":200}"#).is_err());
        assert!(to_lyric(r#"{"lrc":{"lyric":"  "},"code":200}"#).is_err());
        assert!(to_lyric(r#"{"code":-460}"#).is_err());
    }
}
