//! Scan progress tracking and reporting

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Progress update sent during scanning
#[derive(Debug, Clone, PartialEq)]
pub enum ScanProgress {
    /// Discovery finished, import begins
    Started { total_files: u64 },
    /// A file was added to the library
    Imported {
        current: u64,
        total: u64,
        title: String,
        artist: String,
    },
    /// A file was not added
    Skipped {
        current: u64,
        total: u64,
        file_name: String,
        reason: SkipReason,
    },
    /// Scanning completed
    Completed {
        imported: u64,
        skipped: u64,
        errors: u64,
        duration_secs: f64,
    },
    /// Scanning was cancelled
    Cancelled,
}

/// Reason why a file was skipped
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Path already in the library
    AlreadyExists,
    /// File is empty (0 bytes)
    EmptyFile,
    /// Tags or stream could not be read
    MetadataError(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyExists => write!(f, "already in library"),
            SkipReason::EmptyFile => write!(f, "empty file"),
            SkipReason::MetadataError(e) => write!(f, "metadata error: {}", e),
        }
    }
}

/// Snapshot of the scan counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanStats {
    pub total: u64,
    pub current: u64,
    pub imported: u64,
    pub skipped: u64,
    pub errors: u64,
}

/// Shared state for tracking scan progress
#[derive(Debug, Default)]
pub struct ScanState {
    total: AtomicU64,
    current: AtomicU64,
    imported: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
    cancelled: AtomicBool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub fn increment_current(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn increment_imported(&self) {
        self.imported.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> ScanStats {
        ScanStats {
            total: self.total.load(Ordering::SeqCst),
            current: self.current.load(Ordering::SeqCst),
            imported: self.imported.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            errors: self.errors.load(Ordering::SeqCst),
        }
    }
}

/// Handle for controlling and monitoring a scan operation
#[derive(Debug, Clone)]
pub struct ScanHandle {
    state: Arc<ScanState>,
}

impl ScanHandle {
    pub fn new(state: Arc<ScanState>) -> Self {
        Self { state }
    }

    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    pub fn stats(&self) -> ScanStats {
        self.state.stats()
    }
}

/// Progress sender for reporting scan updates
pub type ProgressSender = mpsc::UnboundedSender<ScanProgress>;
/// Progress receiver for receiving scan updates
pub type ProgressReceiver = mpsc::UnboundedReceiver<ScanProgress>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}
