//! Audio output seam.
//!
//! The controller owns at most one [`AudioOutput`] at a time.  Dropping an
//! output stops it and releases whatever it holds (process, socket, device).

use async_trait::async_trait;

use crate::error::SinkError;

#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    /// Load `url` and start it at `volume` (0.0..=1.0).  Resolves once audio
    /// is flowing or the attempt has failed.
    async fn open(&self, url: &str, volume: f32) -> Result<Box<dyn AudioOutput>, SinkError>;
}

/// A live stream.  Calls never block; implementations dispatch in the background.
pub trait AudioOutput: Send {
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
}
