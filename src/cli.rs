//! Command line interface

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mymusic::api::LyricsApi;
use mymusic::database::{Database, ExportData, FavoriteToggle, PlaylistFormat, Song, SortBy};
use mymusic::features::Settings;
use mymusic::features::import::{
    ProgressReceiver, ScanConfig, ScanHandle, ScanProgress, ScanState, decode_string,
    import_files, is_audio_file, progress_channel, scan_and_import,
};
use mymusic::features::lyrics::{
    LyricTrack, LyricsSource, ResolvedLyrics, active_index, build_track_with_translation,
    lyrics_cache_dir, resolve_lyrics,
};
use mymusic::features::media::LyricsOrigin;
use mymusic::player::{PlayerEvent, PlayerSession};
use mymusic::utils::{self, format_file_size, format_time};

#[derive(Parser, Debug)]
#[command(name = "mymusic")]
#[command(about = "Local music library with synchronized LRC lyrics", long_about = None)]
pub struct Cli {
    /// Directory holding the library JSON files
    #[arg(long, global = true, env = "MYMUSIC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a folder recursively and import audio files
    Scan {
        dir: PathBuf,
        /// Skip partial content hashing
        #[arg(long)]
        no_hash: bool,
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Import specific audio files
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List library songs
    Library {
        /// Fuzzy search over title, artist, album and genre
        #[arg(short, long)]
        search: Option<String>,
        /// title, artist, album, duration or date-added
        #[arg(long, default_value = "title")]
        sort: SortBy,
        /// Show grouped summaries instead of songs
        #[arg(long)]
        group: Option<Group>,
    },

    /// Show the lyric track of an .lrc or audio file
    Lyrics {
        file: PathBuf,
        /// Translation .lrc to merge
        #[arg(short, long)]
        translation: Option<PathBuf>,
        /// Print the active line at these playback times (seconds)
        #[arg(long = "at", allow_negative_numbers = true)]
        at: Vec<f64>,
        /// Fetch online when nothing is found locally
        #[arg(long)]
        online: bool,
    },

    /// Replay a playback clock over a lyric track and print highlight changes
    Simulate {
        file: PathBuf,
        /// Clock step in seconds
        #[arg(long, default_value_t = 0.25)]
        step: f64,
        /// Stop at this time (default: a few seconds past the last line)
        #[arg(long)]
        until: Option<f64>,
        /// Seek back to this time once the clock passes `--seek-at`
        #[arg(long, requires = "seek_at")]
        seek_to: Option<f64>,
        #[arg(long)]
        seek_at: Option<f64>,
    },

    /// Search the online service and print lyrics
    Fetch {
        title: String,
        #[arg(short, long)]
        artist: Option<String>,
        /// Write the lyrics to this .lrc file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(subcommand)]
    Playlist(PlaylistCommand),

    #[command(subcommand)]
    Favorite(FavoriteCommand),

    /// Show listening stats and storage usage
    Stats,

    /// Show or clear the search history
    History {
        #[arg(long)]
        clear: bool,
    },

    /// Back up library, playlists, favorites, settings and stats
    Export { file: PathBuf },

    /// Restore a backup made with `export`
    ImportData { file: PathBuf },

    /// Remove songs whose files no longer exist
    Cleanup,
}

#[derive(Subcommand, Debug)]
pub enum PlaylistCommand {
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Playlist of every song by an artist or in a genre
    Smart {
        name: String,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        genre: Option<String>,
    },
    List,
    Show { id: String },
    Add {
        id: String,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    Remove { id: String, path: String },
    Rename {
        id: String,
        name: String,
    },
    Export {
        id: String,
        #[arg(short, long, default_value = "m3u")]
        format: PlaylistFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    Import {
        file: PathBuf,
        /// Defaults to the file extension
        #[arg(short, long)]
        format: Option<PlaylistFormat>,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum FavoriteCommand {
    Toggle { path: String },
    List,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Group {
    Artists,
    Albums,
    Genres,
}

pub async fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir.unwrap_or_else(utils::data_dir);
    let db = Arc::new(
        Database::open(&data_dir)
            .await
            .with_context(|| format!("Failed to open library at {:?}", data_dir))?,
    );

    match cli.command {
        Command::Scan {
            dir,
            no_hash,
            max_depth,
        } => {
            if !dir.is_dir() {
                bail!("Not a directory: {}", dir.display());
            }
            let config = ScanConfig {
                compute_hash: !no_hash,
                max_depth,
                ..Default::default()
            };
            let state = Arc::new(ScanState::new());
            let (tx, rx) = progress_channel();
            let task = tokio::spawn(scan_and_import(db, dir, config, state.clone(), tx));
            watch_progress(rx, ScanHandle::new(state)).await;
            task.await.context("Scan task panicked")?
        }
        Command::Import { files } => {
            let state = Arc::new(ScanState::new());
            let (tx, rx) = progress_channel();
            let task = tokio::spawn(import_files(db, files, state.clone(), tx));
            watch_progress(rx, ScanHandle::new(state)).await;
            task.await.context("Import task panicked")?
        }
        Command::Library {
            search,
            sort,
            group,
        } => cmd_library(&db, search, sort, group).await,
        Command::Lyrics {
            file,
            translation,
            at,
            online,
        } => cmd_lyrics(&db, &file, translation.as_deref(), &at, online).await,
        Command::Simulate {
            file,
            step,
            until,
            seek_to,
            seek_at,
        } => cmd_simulate(&db, &file, step, until, seek_at.zip(seek_to)).await,
        Command::Fetch {
            title,
            artist,
            output,
        } => cmd_fetch(&title, artist.as_deref(), output.as_deref()).await,
        Command::Playlist(cmd) => cmd_playlist(&db, cmd).await,
        Command::Favorite(FavoriteCommand::Toggle { path }) => {
            match db.toggle_favorite(&path).await? {
                FavoriteToggle::Added => println!("Added to favorites: {}", path),
                FavoriteToggle::Removed => println!("Removed from favorites: {}", path),
            }
            Ok(())
        }
        Command::Favorite(FavoriteCommand::List) => {
            for path in db.get_favorites().await? {
                println!("{}", path);
            }
            Ok(())
        }
        Command::Stats => {
            let stats = db.get_stats().await?;
            let songs = db.get_all_songs().await?;
            println!("Songs in library: {}", songs.len());
            println!("Songs played:     {}", stats.songs_played);
            println!("Listening time:   {}", format_time(stats.total_play_time));
            if let Some(artist) = stats.favorite_artist {
                println!("Favorite artist:  {}", artist);
            }
            if let Some(genre) = stats.favorite_genre {
                println!("Favorite genre:   {}", genre);
            }
            println!("Storage used:     {}", format_file_size(db.storage_size().await?));
            Ok(())
        }
        Command::History { clear } => {
            if clear {
                db.clear_search_history().await?;
            } else {
                for query in db.get_search_history().await? {
                    println!("{}", query);
                }
            }
            Ok(())
        }
        Command::Export { file } => {
            let data = db.export_data(&Settings::load()).await?;
            let json = serde_json::to_string_pretty(&data)?;
            tokio::fs::write(&file, json)
                .await
                .with_context(|| format!("Failed to write {:?}", file))?;
            println!("Exported to {}", file.display());
            Ok(())
        }
        Command::ImportData { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {:?}", file))?;
            let data: ExportData = serde_json::from_str(&content).context("Invalid backup file")?;
            if let Some(settings) = db.import_data(data).await? {
                settings.save()?;
            }
            println!("Imported {}", file.display());
            Ok(())
        }
        Command::Cleanup => {
            let report = db.cleanup().await?;
            println!(
                "Removed {} missing songs, {} remain",
                report.removed_songs, report.total_songs
            );
            Ok(())
        }
    }
}

/// Print scan progress until the sender side closes; Ctrl-C cancels
async fn watch_progress(mut rx: ProgressReceiver, handle: ScanHandle) {
    loop {
        tokio::select! {
            progress = rx.recv() => match progress {
                Some(progress) => print_progress(&progress),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !handle.is_cancelled() => {
                tracing::info!("Cancelling scan");
                handle.cancel();
            }
        }
    }
}

fn print_progress(progress: &ScanProgress) {
    match progress {
        ScanProgress::Started { total_files } => println!("Found {} audio files", total_files),
        ScanProgress::Imported {
            current,
            total,
            title,
            artist,
        } => println!("[{}/{}] {} - {}", current, total, artist, title),
        ScanProgress::Skipped {
            current,
            total,
            file_name,
            reason,
        } => println!("[{}/{}] skipped {}: {}", current, total, file_name, reason),
        ScanProgress::Completed {
            imported,
            skipped,
            errors,
            duration_secs,
        } => println!(
            "Done in {:.1}s: {} imported, {} skipped, {} errors",
            duration_secs, imported, skipped, errors
        ),
        ScanProgress::Cancelled => println!("Scan cancelled"),
    }
}

async fn cmd_library(
    db: &Database,
    search: Option<String>,
    sort: SortBy,
    group: Option<Group>,
) -> Result<()> {
    match group {
        Some(Group::Artists) => {
            for a in db.artists().await? {
                println!(
                    "{}  ({} songs, {} albums, {})",
                    a.name,
                    a.song_count,
                    a.album_count,
                    format_time(a.total_duration as f64)
                );
            }
            return Ok(());
        }
        Some(Group::Albums) => {
            for a in db.albums().await? {
                println!("{} - {}  ({} songs)", a.artist, a.title, a.song_count);
            }
            return Ok(());
        }
        Some(Group::Genres) => {
            for g in db.genres().await? {
                println!("{}  ({} songs)", g.name, g.song_count);
            }
            return Ok(());
        }
        None => {}
    }

    let songs = match search.as_deref() {
        Some(query) => db.search_songs(query).await?,
        None => db.sorted_songs(sort).await?,
    };
    for song in &songs {
        print_song(song);
    }
    println!("{} songs", songs.len());
    Ok(())
}

fn print_song(song: &Song) {
    println!(
        "{:>6}  {} - {}  [{}]  {}",
        format_time(song.duration_secs as f64),
        song.artist,
        song.title,
        song.album,
        song.path
    );
}

/// Raw lyrics for an .lrc file or an audio file
async fn load_lyrics(
    db: &Database,
    file: &Path,
    translation: Option<&Path>,
    online: bool,
) -> Result<Option<ResolvedLyrics>> {
    let mut resolved = if is_audio_file(file) {
        let settings = Settings::load();
        let api = if online {
            Some(LyricsApi::with_proxy(
                settings.lyrics.timeout_secs,
                settings.network.proxy_url().as_deref(),
            )?)
        } else {
            None
        };
        let path = file.to_string_lossy();
        let song = db
            .get_song_by_path(&path)
            .await?
            .unwrap_or_else(|| Song::new(path.as_ref()));
        resolve_lyrics(db, api.as_ref(), &song, &settings, &lyrics_cache_dir()).await?
    } else {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {:?}", file))?;
        Some(ResolvedLyrics {
            raw: decode_string(&bytes),
            translation: None,
            source: LyricsSource::Local(LyricsOrigin::Sidecar(file.to_path_buf())),
        })
    };

    if let (Some(resolved), Some(path)) = (resolved.as_mut(), translation) {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        resolved.translation = Some(decode_string(&bytes));
    }

    Ok(resolved)
}

fn print_track(track: &LyricTrack) {
    for (idx, line) in track.iter().enumerate() {
        match &line.translated_text {
            Some(t) => println!("{:>4} [{:>8.2}] {} / {}", idx, line.offset_seconds, line.text, t),
            None => println!("{:>4} [{:>8.2}] {}", idx, line.offset_seconds, line.text),
        }
    }
}

async fn cmd_lyrics(
    db: &Database,
    file: &Path,
    translation: Option<&Path>,
    at: &[f64],
    online: bool,
) -> Result<()> {
    let Some(resolved) = load_lyrics(db, file, translation, online).await? else {
        bail!("No lyrics found for {}", file.display());
    };
    let track = resolved.to_track(true);
    tracing::info!("Loaded {} lyrics lines ({:?})", track.len(), resolved.source);

    if at.is_empty() {
        print_track(&track);
        return Ok(());
    }

    for &t in at {
        match active_index(&track, t) {
            Some(idx) => println!("{:>8.2}s -> {} {}", t, idx, track.lines[idx].text),
            None => println!("{:>8.2}s -> (none)", t),
        }
    }
    Ok(())
}

async fn cmd_simulate(
    db: &Database,
    file: &Path,
    step: f64,
    until: Option<f64>,
    seek: Option<(f64, f64)>,
) -> Result<()> {
    if !(step.is_finite() && step > 0.0) {
        bail!("--step must be a positive number");
    }
    let Some(resolved) = load_lyrics(db, file, None, false).await? else {
        bail!("No lyrics found for {}", file.display());
    };
    let track = resolved.to_track(true);
    let end = until.unwrap_or_else(|| track.last_offset().unwrap_or(0.0) + 3.0);

    let mut session = PlayerSession::new();
    let mut events = session.subscribe();
    session.set_queue(vec![Song::new(file.to_string_lossy())], 0);
    session.load_lyrics(track.clone());

    let mut pending_seek = seek;
    let mut clock = 0.0;
    while clock <= end {
        session.on_time_update(clock);

        if let Some((_, to)) = pending_seek.filter(|(at, _)| clock >= *at) {
            println!("-- seek {} -> {}", format_time(clock), format_time(to));
            session.seek(to);
            clock = session.position();
            pending_seek = None;
        }

        while let Ok(event) = events.try_recv() {
            if let PlayerEvent::ActiveLineChanged { index } = event {
                let text = index
                    .and_then(|i| track.get(i))
                    .map(|l| l.text.as_str())
                    .unwrap_or("(none)");
                println!("{:>8.2}s  {}", session.position(), text);
            }
        }

        clock += step;
    }
    Ok(())
}

async fn cmd_fetch(title: &str, artist: Option<&str>, output: Option<&Path>) -> Result<()> {
    let settings = Settings::load();
    let api = LyricsApi::with_proxy(
        settings.lyrics.timeout_secs,
        settings.network.proxy_url().as_deref(),
    )?;

    let online = api.auto_search_lyrics(title, artist).await?;
    println!(
        "{} - {} [{}] (id {}, {})",
        online.song.artist,
        online.song.name,
        online.song.album,
        online.song.id,
        format_time(online.song.duration as f64 / 1000.0)
    );

    if let Some(path) = output {
        tokio::fs::write(path, &online.lyrics.lyric)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        println!("Saved to {}", path.display());
        return Ok(());
    }

    let track = build_track_with_translation(
        &online.lyrics.lyric,
        online.lyrics.translated.as_deref(),
    );
    print_track(&track);
    Ok(())
}

async fn cmd_playlist(db: &Database, cmd: PlaylistCommand) -> Result<()> {
    match cmd {
        PlaylistCommand::Create { name, description } => {
            let playlist = db.create_playlist(&name, &description).await?;
            println!("Created playlist {} ({})", playlist.name, playlist.id);
        }
        PlaylistCommand::Smart {
            name,
            artist,
            genre,
        } => {
            if artist.is_none() && genre.is_none() {
                bail!("Give --artist or --genre");
            }
            let matches = |song: &Song| {
                artist
                    .as_deref()
                    .is_none_or(|a| song.artist.eq_ignore_ascii_case(a))
                    && genre
                        .as_deref()
                        .is_none_or(|g| song.genre.eq_ignore_ascii_case(g))
            };
            match db.create_smart_playlist(&name, matches).await? {
                Some(p) => println!("Created {} with {} songs ({})", p.name, p.songs.len(), p.id),
                None => println!("No songs matched"),
            }
        }
        PlaylistCommand::List => {
            for p in db.get_playlists().await? {
                println!("{}  {}  ({} songs)", p.id, p.name, p.songs.len());
            }
        }
        PlaylistCommand::Show { id } => {
            let Some(playlist) = db.get_playlist(&id).await? else {
                bail!("No playlist {}", id);
            };
            println!("{}", playlist.name);
            if !playlist.description.is_empty() {
                println!("{}", playlist.description);
            }
            for song in db.playlist_songs(&id).await? {
                print_song(&song);
            }
            if let Some(stats) = db.playlist_stats(&id).await? {
                println!(
                    "{} songs, {} total, {} artists, {} albums",
                    stats.song_count,
                    format_time(stats.total_duration as f64),
                    stats.artist_count,
                    stats.album_count
                );
            }
        }
        PlaylistCommand::Add { id, paths } => {
            let added = db.add_to_playlist(&id, &paths).await?;
            println!("Added {} songs", added);
        }
        PlaylistCommand::Remove { id, path } => {
            if !db.remove_from_playlist(&id, &path).await? {
                bail!("{} is not in playlist {}", path, id);
            }
        }
        PlaylistCommand::Rename { id, name } => {
            if !db.update_playlist(&id, Some(&name), None).await? {
                bail!("No playlist {}", id);
            }
        }
        PlaylistCommand::Export { id, format, output } => {
            let Some(content) = db.export_playlist(&id, format).await? else {
                bail!("No playlist {}", id);
            };
            match output {
                Some(path) => tokio::fs::write(&path, content)
                    .await
                    .with_context(|| format!("Failed to write {:?}", path))?,
                None => print!("{}", content),
            }
        }
        PlaylistCommand::Import { file, format } => {
            let format = match format {
                Some(format) => format,
                None => file
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default()
                    .parse()
                    .map_err(anyhow::Error::msg)?,
            };
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {:?}", file))?;
            match db.import_playlist(&decode_string(&content), format).await? {
                Some(p) => println!("Imported {} with {} songs ({})", p.name, p.songs.len(), p.id),
                None => println!("No songs from {} are in the library", file.display()),
            }
        }
        PlaylistCommand::Delete { id } => {
            if !db.delete_playlist(&id).await? {
                bail!("No playlist {}", id);
            }
        }
    }
    Ok(())
}
