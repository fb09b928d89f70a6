//! Audio output trait and error types.

use bl_engine::{BlockDispatcher, Processor};
use thiserror::Error;

/// The dispatcher type handed to a backend.
pub type DynDispatcher = BlockDispatcher<Box<dyn Processor>>;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No audio device available
    #[error("no audio output device available")]
    NoDevice,
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("playback error: {0}")]
    Playback(String),
    /// Device only offers a sample format the backend cannot write
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Settings reported by the device when it is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Largest buffer the device may deliver, if it says
    pub buffer_size: Option<u32>,
}

/// Trait for audio output backends.
///
/// A started backend owns the dispatcher until it is stopped.
pub trait AudioOutput {
    fn info(&self) -> DeviceInfo;

    /// Prepare `dispatcher` for the device with `channels` work channels and
    /// start pulling buffers from it.
    fn start(&mut self, dispatcher: DynDispatcher, channels: u16) -> Result<(), AudioError>;

    /// Stop pulling buffers. The dispatcher sees `stopped()` before the
    /// stream is torn down.
    fn stop(&mut self) -> Result<(), AudioError>;

    fn is_running(&self) -> bool;

    /// Samples delivered since `start`.
    fn position(&self) -> u64;
}
