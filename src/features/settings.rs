//! Application settings persistence
//!
//! Handles saving and loading user preferences. Stored values are merged
//! over defaults, so settings files from older versions keep loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Interface theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    /// Volume level (0.0 to 1.0)
    pub volume: f64,
    /// Play mode (sequential, loop all, loop one, shuffle)
    pub play_mode: PlayMode,
    /// Advance to the next song when one ends
    pub auto_play_next: bool,
    pub crossfade: bool,
    pub notifications: bool,
    /// Equalizer preset name
    pub equalizer: String,
    /// Show translated lyric lines under the original
    pub show_lyrics_translation: bool,
    pub lyrics: LyricsSettings,
    pub network: NetworkSettings,
}

/// Lyrics lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsSettings {
    /// Search the online service when no local lyrics exist
    pub auto_fetch: bool,
    /// HTTP timeout for lyric requests
    pub timeout_secs: u64,
    /// Keep fetched lyrics in the on-disk cache
    pub cache_enabled: bool,
}

/// Proxy type for network settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyType {
    /// No proxy
    #[default]
    None,
    Http,
    Https,
    Socks5,
    /// Use system proxy settings
    System,
}

impl std::fmt::Display for ProxyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyType::None => write!(f, "None"),
            ProxyType::Http => write!(f, "HTTP"),
            ProxyType::Https => write!(f, "HTTPS"),
            ProxyType::Socks5 => write!(f, "SOCKS5"),
            ProxyType::System => write!(f, "System"),
        }
    }
}

/// Network settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub proxy_type: ProxyType,
    pub proxy_host: String,
    pub proxy_port: u16,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
}

impl NetworkSettings {
    /// Build proxy URL string from settings
    /// Returns None if proxy is disabled or invalid
    pub fn proxy_url(&self) -> Option<String> {
        let scheme = match self.proxy_type {
            ProxyType::None => return None,
            ProxyType::System => {
                return std::env::var("HTTP_PROXY")
                    .or_else(|_| std::env::var("http_proxy"))
                    .or_else(|_| std::env::var("HTTPS_PROXY"))
                    .or_else(|_| std::env::var("https_proxy"))
                    .ok();
            }
            ProxyType::Http => "http",
            ProxyType::Https => "https",
            ProxyType::Socks5 => "socks5",
        };

        if self.proxy_host.is_empty() || self.proxy_port == 0 {
            return None;
        }

        let auth = match (&self.proxy_username, &self.proxy_password) {
            (Some(user), Some(pass)) if !user.is_empty() => format!("{}:{}@", user, pass),
            (Some(user), None) if !user.is_empty() => format!("{}@", user),
            _ => String::new(),
        };

        Some(format!(
            "{}://{}{}:{}",
            scheme, auth, self.proxy_host, self.proxy_port
        ))
    }
}

/// Play mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Play in order, stop at end
    #[default]
    Sequential,
    /// Play in order, loop back to start
    LoopAll,
    /// Repeat current song
    LoopOne,
    /// Random order
    Shuffle,
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "sequential" | "none" => Ok(PlayMode::Sequential),
            "loopall" | "all" => Ok(PlayMode::LoopAll),
            "loopone" | "one" => Ok(PlayMode::LoopOne),
            "shuffle" => Ok(PlayMode::Shuffle),
            other => Err(format!("unknown play mode: {}", other)),
        }
    }
}

impl PlayMode {
    /// Get the next play mode in cycle order
    pub fn next(self) -> Self {
        match self {
            PlayMode::Sequential => PlayMode::LoopAll,
            PlayMode::LoopAll => PlayMode::LoopOne,
            PlayMode::LoopOne => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::Sequential,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlayMode::Sequential => "Sequential",
            PlayMode::LoopAll => "Loop All",
            PlayMode::LoopOne => "Loop One",
            PlayMode::Shuffle => "Shuffle",
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            volume: 0.5,
            play_mode: PlayMode::Sequential,
            auto_play_next: true,
            crossfade: true,
            notifications: true,
            equalizer: "normal".to_string(),
            show_lyrics_translation: true,
            lyrics: LyricsSettings::default(),
            network: NetworkSettings::default(),
        }
    }
}

impl Default for LyricsSettings {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            timeout_secs: 10,
            cache_enabled: true,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mymusic", "MyMusic")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .and_then(|path| match Self::load_from_file(&path) {
                Ok(settings) => Some(settings),
                Err(SettingsError::Io(_)) => None,
                Err(e) => {
                    tracing::warn!("Ignoring settings file {:?}: {}", path, e);
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(path) = Self::file_path() {
            self.save_to_file(&path)
        } else {
            Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ))
        }
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Errors that can occur with settings
#[derive(Debug, Clone)]
pub enum SettingsError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"volume":0.8,"lyrics":{"auto_fetch":false}}"#).unwrap();
        assert_eq!(settings.volume, 0.8);
        assert!(!settings.lyrics.auto_fetch);
        assert_eq!(settings.lyrics.timeout_secs, 10);
        assert!(settings.auto_play_next);
        assert_eq!(settings.equalizer, "normal");
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            play_mode: PlayMode::Shuffle,
            ..Default::default()
        };
        settings.save_to_file(&path).unwrap();
        assert_eq!(Settings::load_from_file(&path).unwrap(), settings);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Settings::load_from_file(&path),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_proxy_url() {
        let mut network = NetworkSettings::default();
        assert_eq!(network.proxy_url(), None);

        network.proxy_type = ProxyType::Socks5;
        network.proxy_host = "127.0.0.1".into();
        assert_eq!(network.proxy_url(), None);

        network.proxy_port = 1080;
        network.proxy_username = Some("u".into());
        network.proxy_password = Some("p".into());
        assert_eq!(network.proxy_url().as_deref(), Some("socks5://u:p@127.0.0.1:1080"));
    }

    #[test]
    fn test_play_mode_cycle_and_parse() {
        let mut mode = PlayMode::Sequential;
        for _ in 0..4 {
            mode = mode.next();
        }
        assert_eq!(mode, PlayMode::Sequential);
        assert_eq!("loop-one".parse::<PlayMode>(), Ok(PlayMode::LoopOne));
        assert_eq!("all".parse::<PlayMode>(), Ok(PlayMode::LoopAll));
    }
}
