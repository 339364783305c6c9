//! Utility functions

use rand::Rng;
use std::path::PathBuf;

// ============================================================================
// Formatting
// ============================================================================

/// Format seconds as `m:ss`
///
/// Negative, NaN and infinite values render as `0:00`.
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Human readable size (B, KB, MB, GB)
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

// ============================================================================
// Search & Ids
// ============================================================================

/// Case-insensitive fuzzy match
///
/// Matches when `term` is a substring of `text`, or when its characters
/// appear in `text` in order. An empty term matches everything.
pub fn fuzzy_match(term: &str, text: &str) -> bool {
    let term = term.to_lowercase();
    let text = text.to_lowercase();

    if text.contains(&term) {
        return true;
    }

    let mut chars = text.chars();
    term.chars().all(|wanted| chars.any(|c| c == wanted))
}

/// Current Unix time in milliseconds
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Unique-enough id: base-36 timestamp plus a random base-36 suffix
pub fn generate_id() -> String {
    let suffix: u64 = rand::rng().random_range(0..36u64.pow(7));
    format!(
        "{}{:0>7}",
        to_base36(current_timestamp_ms().max(0) as u64),
        to_base36(suffix)
    )
}

// ============================================================================
// Paths
// ============================================================================

/// Default directory for the JSON store
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "mymusic", "MyMusic")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join("mymusic-data"))
}

/// Get the base cache directory for mymusic
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mymusic")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(62.9), "1:02");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_fuzzy_match() {
        assert!(fuzzy_match("cold", "Coldplay"));
        assert!(fuzzy_match("cdpl", "Coldplay"));
        assert!(fuzzy_match("", "anything"));
        assert!(!fuzzy_match("lpc", "Coldplay"));
        assert!(fuzzy_match("七香", "七里香"));
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(a.len() > 7);
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
