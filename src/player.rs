//! Headless player: queue navigation, transport state and lyric sync

mod events;
mod queue;
mod session;

pub use events::{EventReceiver, EventSender, PlaybackSnapshot, PlayerEvent, SharedPlaybackState};
pub use queue::{QueueNavigator, ShuffleCache, Step};
pub use session::PlayerSession;
