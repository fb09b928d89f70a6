//! Session files.
//!
//! A session fixes everything the player needs before it starts: tempo, loop
//! length, output channels, the synth and the note table. Any field missing
//! from the TOML falls back to the built-in demo session.

use std::path::{Path, PathBuf};

use bl_engine::{Processor, Silence, SineSynth};
use bl_ir::{EventTable, Note, TableError, MAX_CHANNELS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a session.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("tempo must be a positive number of beats per minute, got {0}")]
    InvalidTempo(f64),
    #[error("channel count must be between 1 and 8, got {0}")]
    InvalidChannels(u16),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Which built-in processor renders the notes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthKind {
    #[default]
    Sine,
    Silence,
}

impl SynthKind {
    pub fn processor(self) -> Box<dyn Processor> {
        match self {
            SynthKind::Sine => Box::new(SineSynth::new()),
            SynthKind::Silence => Box::new(Silence),
        }
    }
}

/// The demo melody: C4 E4 G4 C5 G4 E4 C4 over a five-beat loop. The last
/// note runs to the loop boundary.
pub const DEMO_NOTES: [Note; 7] = [
    Note::new(60, 0.0, 0.5, 0.8),
    Note::new(64, 0.5, 0.5, 0.8),
    Note::new(67, 1.0, 0.5, 0.8),
    Note::new(72, 1.5, 1.0, 0.9),
    Note::new(67, 2.5, 0.5, 0.7),
    Note::new(64, 3.0, 0.5, 0.7),
    Note::new(60, 3.5, 1.5, 0.8),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub tempo_bpm: f64,
    pub loop_beats: f64,
    pub channels: u16,
    pub synth: SynthKind,
    pub notes: Vec<Note>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            loop_beats: 5.0,
            channels: 2,
            synth: SynthKind::Sine,
            notes: DEMO_NOTES.to_vec(),
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a session file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!(
            "loaded session {}: {} notes, {} BPM, {}-beat loop",
            path.display(),
            config.notes.len(),
            config.tempo_bpm,
            config.loop_beats
        );
        Ok(config)
    }

    /// Check the settings the event table does not cover.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tempo_bpm.is_finite() || self.tempo_bpm <= 0.0 {
            return Err(ConfigError::InvalidTempo(self.tempo_bpm));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ConfigError::InvalidChannels(self.channels));
        }
        Ok(())
    }

    /// Validate the notes against the loop and build the immutable table.
    pub fn build_table(&self) -> Result<EventTable, ConfigError> {
        self.validate()?;
        Ok(EventTable::new(self.notes.clone(), self.loop_beats)?)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
