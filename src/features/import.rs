//! Local music library import module
//!
//! Handles:
//! - Recursive folder scanning
//! - Metadata extraction with encoding fallback
//! - File deduplication
//! - Smart filename parsing

mod encoding;
mod metadata;
mod progress;
mod scanner;

pub use encoding::{decode_string, normalize_string};
pub use metadata::{AudioMetadata, apply_smart_parsing, extract_metadata, parse_filename};
pub use progress::{
    ProgressReceiver, ProgressSender, ScanHandle, ScanProgress, ScanState, ScanStats, SkipReason,
    progress_channel,
};
pub use scanner::{
    ScanConfig, compute_partial_hash, discover_audio_files, import_files, import_paths,
    scan_and_import,
};

use std::path::Path;

/// Supported audio file extensions
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "m4a", "ogg", "wma"];

/// Check if a file extension is a supported audio format
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("/a/b.mp3")));
        assert!(is_audio_file(Path::new("B.FLAC")));
        assert!(is_audio_file(Path::new("c.wma")));
        assert!(!is_audio_file(Path::new("c.opus")));
        assert!(!is_audio_file(Path::new("song.lrc")));
        assert!(!is_audio_file(Path::new("noext")));
    }
}
