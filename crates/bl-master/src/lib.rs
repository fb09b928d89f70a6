//! Headless controller for the beatloop player.
//!
//! Provides a single API for loading sessions, live playback and offline
//! rendering that the CLI and tests share.

mod config;
mod wav;

use std::path::Path;

use bl_audio::{AudioOutput, CpalOutput, DynDispatcher};
use bl_engine::{BeatClock, BlockDispatcher};
use thiserror::Error;

// Re-export common types so callers don't need bl-ir/bl-engine directly.
pub use bl_audio::{AudioError, DeviceInfo};
pub use bl_engine::LoopPosition;
pub use bl_ir::{EventTable, Note, TableError, BLOCK_SIZE};
pub use config::{ConfigError, SessionConfig, SynthKind, DEMO_NOTES};
pub use wav::{samples_to_wav, write_wav};

/// Longest offline render accepted by [`Controller::render_to_wav`].
pub const MAX_RENDER_SECONDS: f64 = 3600.0;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("failed to write WAV: {0}")]
    Wav(#[from] hound::Error),
    #[error("sample rate must be positive")]
    InvalidSampleRate,
    #[error("render length must be between 0 and 3600 seconds, got {0}")]
    InvalidDuration(f64),
}

/// Headless loop controller: owns a session and manages playback.
pub struct Controller {
    session: SessionConfig,
    table: EventTable,
    playback: Option<Box<dyn AudioOutput>>,
}

impl Controller {
    /// Validate `session` and build its event table.
    pub fn new(session: SessionConfig) -> Result<Self, ConfigError> {
        let table = session.build_table()?;
        Ok(Self {
            session,
            table,
            playback: None,
        })
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    pub fn table(&self) -> &EventTable {
        &self.table
    }

    /// A fresh, unprepared dispatcher for this session.
    pub fn dispatcher(&self) -> DynDispatcher {
        BlockDispatcher::new(
            self.session.tempo_bpm,
            self.table.clone(),
            self.session.synth.processor(),
        )
    }

    // --- Real-time playback ---

    /// Start looping on the default output device, restarting from beat 0
    /// if already playing.
    pub fn play(&mut self) -> Result<DeviceInfo, MasterError> {
        self.stop();

        let mut output = CpalOutput::open_default()?;
        output.start(self.dispatcher(), self.session.channels)?;
        let info = output.info();
        log::info!(
            "playing {} notes at {} BPM over a {}-beat loop",
            self.table.len(),
            self.session.tempo_bpm,
            self.table.loop_beats()
        );

        self.playback = Some(Box::new(output));
        Ok(info)
    }

    pub fn stop(&mut self) {
        if let Some(mut output) = self.playback.take() {
            if let Err(e) = output.stop() {
                log::warn!("error while stopping playback: {}", e);
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_running())
    }

    /// Loop cycle and beat of the last delivered buffer.
    pub fn position(&self) -> Option<LoopPosition> {
        let output = self.playback.as_ref()?;
        let mut clock =
            BeatClock::with_sample_rate(self.session.tempo_bpm, output.info().sample_rate as f64);
        clock.advance(output.position() as usize);
        Some(clock.loop_position(self.table.loop_beats()))
    }

    // --- Offline rendering ---

    /// Render `frames` frames as interleaved samples, pulling `block_size`
    /// frames at a time the way a device would.
    pub fn render_frames(&self, sample_rate: u32, frames: usize, block_size: usize) -> Vec<f32> {
        let channels = self.session.channels as usize;
        let block_size = block_size.max(1);

        let mut dispatcher = self.dispatcher();
        dispatcher.prepare(sample_rate as f64, block_size, self.session.channels);

        let mut samples = vec![0.0f32; frames * channels];
        for chunk in samples.chunks_mut(block_size * channels) {
            dispatcher.render_interleaved(chunk, channels);
        }
        dispatcher.stopped();

        if dispatcher.dropped_events() > 0 {
            log::warn!(
                "{} events dropped: more than {} events in one block",
                dispatcher.dropped_events(),
                bl_engine::MAX_BLOCK_EVENTS
            );
        }
        samples
    }

    /// Render `seconds` of the loop to a 16-bit WAV file. Returns the number
    /// of frames written.
    pub fn render_to_wav(
        &self,
        path: &Path,
        sample_rate: u32,
        seconds: f64,
        block_size: usize,
    ) -> Result<usize, MasterError> {
        if sample_rate == 0 {
            return Err(MasterError::InvalidSampleRate);
        }
        if !(0.0..=MAX_RENDER_SECONDS).contains(&seconds) {
            return Err(MasterError::InvalidDuration(seconds));
        }

        let frames = (sample_rate as f64 * seconds).round() as usize;
        let samples = self.render_frames(sample_rate, frames, block_size);

        let file = std::fs::File::create(path).map_err(hound::Error::IoError)?;
        write_wav(
            std::io::BufWriter::new(file),
            &samples,
            self.session.channels,
            sample_rate,
        )?;

        log::info!("rendered {} frames to {}", frames, path.display());
        Ok(frames)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_session() -> SessionConfig {
        SessionConfig {
            synth: SynthKind::Silence,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn demo_session_controller() {
        let c = Controller::new(SessionConfig::default()).unwrap();
        assert_eq!(c.table().len(), 7);
        assert_eq!(c.table().loop_beats(), 5.0);
        assert!(!c.is_playing());
        assert!(c.position().is_none());
    }

    #[test]
    fn render_frames_has_requested_length() {
        let c = Controller::new(SessionConfig::default()).unwrap();
        let samples = c.render_frames(44_100, 1000, 256);
        assert_eq!(samples.len(), 2000);
        assert!(samples.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn silence_synth_renders_zeros() {
        let c = Controller::new(silent_session()).unwrap();
        let samples = c.render_frames(48_000, 4096, 512);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn render_is_deterministic() {
        let c = Controller::new(SessionConfig::default()).unwrap();
        let a = c.render_frames(44_100, 30_000, 333);
        let b = c.render_frames(44_100, 30_000, 333);
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_session_is_rejected() {
        let session = SessionConfig {
            tempo_bpm: -1.0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            Controller::new(session),
            Err(ConfigError::InvalidTempo(_))
        ));
    }

    #[test]
    fn zero_sample_rate_is_an_error() {
        let c = Controller::new(silent_session()).unwrap();
        let path = std::env::temp_dir().join("bl-master-zero-rate.wav");
        assert!(matches!(
            c.render_to_wav(&path, 0, 1.0, 512),
            Err(MasterError::InvalidSampleRate)
        ));
    }

    #[test]
    fn unbounded_duration_is_an_error() {
        let c = Controller::new(silent_session()).unwrap();
        let path = std::env::temp_dir().join("bl-master-bad-duration.wav");
        for seconds in [f64::INFINITY, f64::NAN, 1e300, -1.0, MAX_RENDER_SECONDS + 1.0] {
            assert!(
                matches!(
                    c.render_to_wav(&path, 44_100, seconds, 512),
                    Err(MasterError::InvalidDuration(_))
                ),
                "{seconds} seconds"
            );
        }
        assert!(!path.exists());
    }
}
