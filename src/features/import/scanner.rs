//! Recursive folder scanner with parallel processing
//!
//! Scans directories for audio files, extracts metadata in parallel,
//! and reports progress via channels.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

use super::is_audio_file;
use super::metadata::{AudioMetadata, apply_smart_parsing, extract_metadata, genre_or_default};
use super::progress::{ProgressSender, ScanProgress, ScanState, SkipReason};
use crate::database::{Database, Song, song_id_for_path};

/// Files processed per rayon batch
const BATCH_SIZE: usize = 100;

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to compute file hashes for deduplication
    pub compute_hash: bool,
    /// Whether to apply smart filename parsing
    pub smart_parsing: bool,
    /// Maximum depth to scan (None = unlimited)
    pub max_depth: Option<usize>,
    /// File extensions to include (empty = all supported)
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            compute_hash: true,
            smart_parsing: true,
            max_depth: None,
            extensions: Vec::new(),
        }
    }
}

/// Result of reading a single file
#[derive(Debug)]
pub struct ScanResult {
    pub path: PathBuf,
    pub metadata: AudioMetadata,
    pub file_size: u64,
    pub file_hash: Option<String>,
    /// Unix millis
    pub modified: Option<i64>,
}

impl ScanResult {
    /// Build the library record for this file
    pub fn into_song(self, date_added: i64) -> Song {
        let path = self.path.to_string_lossy().to_string();
        let format = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_uppercase())
            .unwrap_or_default();
        let genre = genre_or_default(&self.metadata);
        let m = self.metadata;

        Song {
            id: song_id_for_path(&path),
            album_artist: m.album_artist.unwrap_or_else(|| m.artist.clone()),
            title: m.title,
            artist: m.artist,
            album: m.album,
            year: m.year,
            genre,
            track: m.track,
            track_total: m.track_total,
            disc: m.disc,
            disc_total: m.disc_total,
            duration_secs: m.duration_secs,
            bitrate: m.bitrate,
            sample_rate: m.sample_rate,
            codec: m.codec,
            container: m.container,
            file_size: self.file_size,
            file_hash: self.file_hash,
            format,
            date_added,
            date_modified: self.modified.unwrap_or(date_added),
            lyrics: m.lyrics,
            comment: m.comment,
            composer: m.composer,
            path,
            ..Default::default()
        }
    }
}

/// Find audio files below `root`
pub fn discover_audio_files(root: &Path, config: &ScanConfig) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).follow_links(true);
    if let Some(max_depth) = config.max_depth {
        walker = walker.max_depth(max_depth);
    }

    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            if config.extensions.is_empty() {
                return is_audio_file(p);
            }
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| config.extensions.iter().any(|ext| ext.eq_ignore_ascii_case(e)))
        })
        .collect()
}

/// Compute partial file hash (size + first 64KB + last 64KB)
pub fn compute_partial_hash(path: &Path) -> Result<String> {
    use std::io::{Read, Seek, SeekFrom};

    const CHUNK_SIZE: usize = 64 * 1024;

    let mut file = std::fs::File::open(path)?;
    let file_size = file.metadata()?.len();

    let mut hasher_data = Vec::with_capacity(CHUNK_SIZE * 2 + 8);
    hasher_data.extend_from_slice(&file_size.to_le_bytes());

    let mut first_chunk = vec![0u8; CHUNK_SIZE.min(file_size as usize)];
    file.read_exact(&mut first_chunk)?;
    hasher_data.extend_from_slice(&first_chunk);

    if file_size > CHUNK_SIZE as u64 * 2 {
        file.seek(SeekFrom::End(-(CHUNK_SIZE as i64)))?;
        let mut last_chunk = vec![0u8; CHUNK_SIZE];
        file.read_exact(&mut last_chunk)?;
        hasher_data.extend_from_slice(&last_chunk);
    }

    Ok(format!("{:016x}", xxh3_64(&hasher_data)))
}

#[derive(Debug)]
enum ProcessError {
    Empty,
    Failed(anyhow::Error),
}

impl From<anyhow::Error> for ProcessError {
    fn from(e: anyhow::Error) -> Self {
        ProcessError::Failed(e)
    }
}

impl ProcessError {
    fn into_reason(self) -> SkipReason {
        match self {
            ProcessError::Empty => SkipReason::EmptyFile,
            ProcessError::Failed(e) => SkipReason::MetadataError(format!("{:#}", e)),
        }
    }
}

/// Read one audio file
fn process_file(path: &Path, config: &ScanConfig) -> std::result::Result<ScanResult, ProcessError> {
    let file_meta = std::fs::metadata(path).context("Failed to read file metadata")?;
    if file_meta.len() == 0 {
        return Err(ProcessError::Empty);
    }

    let mut metadata = extract_metadata(path)?;

    if config.smart_parsing {
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            apply_smart_parsing(&mut metadata, filename);
        }
    }

    let file_hash = if config.compute_hash {
        Some(compute_partial_hash(path)?)
    } else {
        None
    };

    let modified = file_meta
        .modified()
        .ok()
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis());

    Ok(ScanResult {
        path: path.to_path_buf(),
        metadata,
        file_size: file_meta.len(),
        file_hash,
        modified,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Import an explicit list of files, reporting progress per file
///
/// Used both by the folder scan and by direct file imports.
pub async fn import_paths(
    db: Arc<Database>,
    files: Vec<PathBuf>,
    config: ScanConfig,
    state: Arc<ScanState>,
    progress_tx: ProgressSender,
) -> Result<()> {
    let start_time = Instant::now();
    let total_files = files.len() as u64;
    state.set_total(total_files);

    let _ = progress_tx.send(ScanProgress::Started { total_files });

    let mut existing_paths: HashSet<String> = db
        .get_all_songs()
        .await?
        .into_iter()
        .map(|s| s.path)
        .collect();

    for batch in files.chunks(BATCH_SIZE) {
        if state.is_cancelled() {
            let _ = progress_tx.send(ScanProgress::Cancelled);
            return Ok(());
        }

        let batch: Vec<PathBuf> = batch.to_vec();
        let config = config.clone();

        let results: Vec<(PathBuf, std::result::Result<ScanResult, ProcessError>)> =
            tokio::task::spawn_blocking(move || {
                batch
                    .par_iter()
                    .map(|path| (path.clone(), process_file(path, &config)))
                    .collect()
            })
            .await?;

        let now = crate::utils::current_timestamp_ms();
        let mut new_songs = Vec::new();
        let mut pending = Vec::new();

        for (path, result) in results {
            let current = state.increment_current();
            let path_str = path.to_string_lossy().to_string();

            if existing_paths.contains(&path_str) {
                state.increment_skipped();
                let _ = progress_tx.send(ScanProgress::Skipped {
                    current,
                    total: total_files,
                    file_name: display_name(&path),
                    reason: SkipReason::AlreadyExists,
                });
                continue;
            }

            match result {
                Ok(scan_result) => {
                    existing_paths.insert(path_str);
                    let song = scan_result.into_song(now);
                    pending.push((current, song.title.clone(), song.artist.clone(), path));
                    new_songs.push(song);
                }
                Err(e) => {
                    state.increment_errors();
                    let reason = e.into_reason();
                    tracing::warn!("Skipping {:?}: {}", path, reason);
                    let _ = progress_tx.send(ScanProgress::Skipped {
                        current,
                        total: total_files,
                        file_name: display_name(&path),
                        reason,
                    });
                }
            }
        }

        if new_songs.is_empty() {
            continue;
        }

        match db.add_songs(new_songs).await {
            Ok(_) => {
                for (current, title, artist, _) in pending {
                    state.increment_imported();
                    let _ = progress_tx.send(ScanProgress::Imported {
                        current,
                        total: total_files,
                        title,
                        artist,
                    });
                }
            }
            Err(e) => {
                tracing::error!("Failed to save imported songs: {:#}", e);
                for (current, _, _, path) in pending {
                    state.increment_errors();
                    let _ = progress_tx.send(ScanProgress::Skipped {
                        current,
                        total: total_files,
                        file_name: display_name(&path),
                        reason: SkipReason::MetadataError(e.to_string()),
                    });
                }
            }
        }
    }

    let stats = state.stats();
    tracing::info!(
        "Import finished: {} imported, {} skipped, {} errors",
        stats.imported,
        stats.skipped,
        stats.errors
    );
    let _ = progress_tx.send(ScanProgress::Completed {
        imported: stats.imported,
        skipped: stats.skipped,
        errors: stats.errors,
        duration_secs: start_time.elapsed().as_secs_f64(),
    });

    Ok(())
}

/// Scan a directory and import songs to database
///
/// This is the main entry point for folder scanning.
/// It runs in a background task and reports progress via the channel.
pub async fn scan_and_import(
    db: Arc<Database>,
    root: PathBuf,
    config: ScanConfig,
    state: Arc<ScanState>,
    progress_tx: ProgressSender,
) -> Result<()> {
    let files = tokio::task::spawn_blocking({
        let root = root.clone();
        let config = config.clone();
        move || discover_audio_files(&root, &config)
    })
    .await?;

    tracing::info!("Found {} audio files under {:?}", files.len(), root);
    import_paths(db, files, config, state, progress_tx).await
}

/// Import selected files, ignoring non-audio paths
pub async fn import_files(
    db: Arc<Database>,
    paths: Vec<PathBuf>,
    state: Arc<ScanState>,
    progress_tx: ProgressSender,
) -> Result<()> {
    let files: Vec<PathBuf> = paths
        .into_iter()
        .filter(|p| {
            let ok = is_audio_file(p);
            if !ok {
                tracing::warn!("Not a supported audio file: {:?}", p);
            }
            ok
        })
        .collect();
    import_paths(db, files, ScanConfig::default(), state, progress_tx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::import::progress_channel;

    #[test]
    fn test_discover_audio_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("one.MP3"), b"x").unwrap();
        std::fs::write(nested.join("two.flac"), b"x").unwrap();
        std::fs::write(nested.join("cover.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.lrc"), b"x").unwrap();

        let mut found = discover_audio_files(dir.path(), &ScanConfig::default());
        found.sort();
        assert_eq!(found.len(), 2);

        let shallow = ScanConfig {
            max_depth: Some(1),
            ..Default::default()
        };
        assert_eq!(discover_audio_files(dir.path(), &shallow).len(), 1);

        let only_flac = ScanConfig {
            extensions: vec!["flac".into()],
            ..Default::default()
        };
        assert_eq!(discover_audio_files(dir.path(), &only_flac), vec![nested.join("two.flac")]);
    }

    #[test]
    fn test_compute_partial_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, vec![1u8; 200 * 1024]).unwrap();
        std::fs::write(&b, vec![2u8; 200 * 1024]).unwrap();

        let hash_a = compute_partial_hash(&a).unwrap();
        assert_eq!(hash_a.len(), 16);
        assert_eq!(hash_a, compute_partial_hash(&a).unwrap());
        assert_ne!(hash_a, compute_partial_hash(&b).unwrap());
    }

    #[tokio::test]
    async fn test_scan_reports_skips() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        std::fs::create_dir_all(&music).unwrap();
        std::fs::write(music.join("empty.mp3"), b"").unwrap();
        std::fs::write(music.join("garbage.xyz.ogg"), b"not an ogg stream").unwrap();

        let db = Arc::new(Database::open(&dir.path().join("data")).await.unwrap());
        let state = Arc::new(ScanState::new());
        let (tx, mut rx) = progress_channel();

        scan_and_import(db.clone(), music, ScanConfig::default(), state.clone(), tx)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.first(), Some(&ScanProgress::Started { total_files: 2 }));
        assert!(events.iter().any(|e| matches!(
            e,
            ScanProgress::Skipped { reason: SkipReason::EmptyFile, .. }
        )));
        assert!(matches!(
            events.last(),
            Some(ScanProgress::Completed { imported: 0, errors: 2, .. })
        ));
        assert!(db.get_all_songs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();

        let db = Arc::new(Database::open(&dir.path().join("data")).await.unwrap());
        let state = Arc::new(ScanState::new());
        state.cancel();
        let (tx, mut rx) = progress_channel();

        scan_and_import(db, dir.path().to_path_buf(), ScanConfig::default(), state, tx)
            .await
            .unwrap();

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(ScanProgress::Cancelled));
    }

    #[test]
    fn test_into_song_fills_defaults() {
        let result = ScanResult {
            path: PathBuf::from("/music/Artist - Song.flac"),
            metadata: AudioMetadata {
                title: "Song".into(),
                artist: "Artist".into(),
                ..Default::default()
            },
            file_size: 10,
            file_hash: None,
            modified: None,
        };
        let song = result.into_song(42);
        assert_eq!(song.path, "/music/Artist - Song.flac");
        assert_eq!(song.album_artist, "Artist");
        assert_eq!(song.genre, crate::database::UNKNOWN_GENRE);
        assert_eq!(song.format, "FLAC");
        assert_eq!(song.date_added, 42);
        assert_eq!(song.date_modified, 42);
        assert_eq!(song.id, song_id_for_path("/music/Artist - Song.flac"));
    }
}
