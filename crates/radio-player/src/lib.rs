//! Station directory client and playback controller for the world radio player.

pub mod controller;
pub mod directory;
pub mod error;
pub mod mpv;
pub mod sink;

pub use controller::{Notice, PlayTransition, PlaybackOutcome, PlayerController, Snapshot};
pub use directory::DirectoryClient;
pub use error::{DirectoryError, SinkError};
pub use sink::{AudioOutput, AudioSink};
