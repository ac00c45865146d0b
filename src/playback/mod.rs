pub mod controller;
pub mod events;
pub mod state;

pub use controller::{PlaybackController, PlaybackSnapshot};
pub use events::{CurrentLimits, PlaybackEvent, SessionSummary};
pub use state::{PlaybackState, PlaybackStatus, TickOutcome, DEFAULT_FTP};
