//! Netease Cloud Music API - lyric lookup client
//!
//! Uses the unauthenticated web endpoints, so no encryption or cookies.

pub mod model;

use anyhow::{Context, Result, anyhow};
pub use model::*;
use reqwest::{Client, header};
use std::fmt;
use std::time::Duration;

static BASE_URL: &str = "https://music.163.com";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 10;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Search results requested per query
const SEARCH_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct LyricsApi {
    client: Client,
    base_url: String,
}

impl fmt::Debug for LyricsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LyricsApi")
            .field("client", &"<HttpClient>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl LyricsApi {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Self::with_proxy(timeout_secs, None)
    }

    /// Build a client, optionally routed through `proxy`
    pub fn with_proxy(timeout_secs: u64, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true);

        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy).context("Invalid proxy URL")?);
        }

        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (mirrors, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(&self, path_and_query: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "*/*")
            .header(header::REFERER, "https://music.163.com")
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {}", status));
        }

        response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))
    }

    /// Search songs by "artist title"
    pub async fn search_songs(&self, title: &str, artist: Option<&str>) -> Result<Vec<SongMatch>> {
        let query = search_query(title, artist);
        let path = format!(
            "/api/search/get/web?csrf_token=hlpretag=&hlposttag=&s={}&type=1&offset=0&total=true&limit={}",
            urlencoding::encode(&query),
            SEARCH_LIMIT
        );
        to_song_matches(&self.get(&path).await?)
    }

    /// First search match
    pub async fn search_song(&self, title: &str, artist: Option<&str>) -> Result<SongMatch> {
        self.search_songs(title, artist)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No matching song for '{}'", search_query(title, artist)))
    }

    /// Lyrics (and translation, when present) for an online song id
    pub async fn fetch_lyrics(&self, song_id: u64) -> Result<RawLyrics> {
        let path = format!("/api/song/lyric?os=pc&id={}&lv=-1&tv=-1", song_id);
        to_lyric(&self.get(&path).await?).with_context(|| format!("Song {}", song_id))
    }

    /// Search then fetch lyrics for the first match
    pub async fn auto_search_lyrics(&self, title: &str, artist: Option<&str>) -> Result<OnlineLyrics> {
        let song = self.search_song(title, artist).await?;
        tracing::info!("Matched '{}' by {} (id {})", song.name, song.artist, song.id);
        let lyrics = self.fetch_lyrics(song.id).await?;
        Ok(OnlineLyrics { song, lyrics })
    }
}

/// Query string sent to the search endpoint
pub fn search_query(title: &str, artist: Option<&str>) -> String {
    match artist.map(str::trim).filter(|a| !a.is_empty()) {
        Some(artist) => format!("{} {}", artist, title.trim()),
        None => title.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query() {
        assert_eq!(search_query("Yellow", Some("Coldplay")), "Coldplay Yellow");
        assert_eq!(search_query(" Yellow ", Some("  ")), "Yellow");
        assert_eq!(search_query("Yellow", None), "Yellow");
    }

    #[test]
    fn test_client_builds_with_proxy() {
        assert!(LyricsApi::with_proxy(5, Some("http://127.0.0.1:8080")).is_ok());
        assert!(LyricsApi::new(DEFAULT_TIMEOUT).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_error() {
        let api = LyricsApi::new(1)
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        assert!(api.fetch_lyrics(1).await.is_err());
    }
}
