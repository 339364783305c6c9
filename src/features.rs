//! Feature modules - business logic separated from the CLI
//!
//! Each feature module contains the core logic for a specific functionality.

pub mod import;
pub mod lyrics;
pub mod media;
pub mod settings;

pub use settings::{LyricsSettings, NetworkSettings, PlayMode, ProxyType, Settings, Theme};
