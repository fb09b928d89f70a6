//! Immutable note table describing one loop cycle.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::note::{Note, MAX_PITCH};

/// Error raised when building an [`EventTable`].
#[derive(Clone, Debug, PartialEq)]
pub enum TableError {
    /// Loop length is zero, negative or not finite
    InvalidLoopLength(f64),
    /// Pitch above 127
    PitchOutOfRange { index: usize, pitch: u8 },
    /// Start beat is negative or not finite
    NegativeStart { index: usize, start_beat: f64 },
    /// Start beat at or past the loop end, so the note could never trigger
    StartBeyondLoop { index: usize, start_beat: f64, loop_beats: f64 },
    /// Duration is zero, negative or not finite
    NonPositiveDuration { index: usize, duration: f64 },
    /// Velocity outside (0, 1]
    VelocityOutOfRange { index: usize, velocity: f32 },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::InvalidLoopLength(len) => {
                write!(f, "loop length must be a positive number of beats, got {}", len)
            }
            TableError::PitchOutOfRange { index, pitch } => {
                write!(f, "note {}: pitch {} is above {}", index, pitch, MAX_PITCH)
            }
            TableError::NegativeStart { index, start_beat } => {
                write!(f, "note {}: start beat {} is negative", index, start_beat)
            }
            TableError::StartBeyondLoop {
                index,
                start_beat,
                loop_beats,
            } => write!(
                f,
                "note {}: start beat {} is outside the {}-beat loop",
                index, start_beat, loop_beats
            ),
            TableError::NonPositiveDuration { index, duration } => {
                write!(f, "note {}: duration {} must be positive", index, duration)
            }
            TableError::VelocityOutOfRange { index, velocity } => {
                write!(f, "note {}: velocity {} is outside (0, 1]", index, velocity)
            }
        }
    }
}

impl core::error::Error for TableError {}

/// The notes of one loop cycle together with the loop length.
///
/// Built once and never mutated. Cloning shares the underlying notes, so a
/// copy can be handed to the audio thread without duplicating the table.
/// Entries keep their insertion order; duplicates are scheduled independently.
#[derive(Clone, Debug)]
pub struct EventTable {
    notes: Arc<[Note]>,
    loop_beats: f64,
}

impl EventTable {
    /// Validate `notes` against `loop_beats` and build the table.
    pub fn new(notes: Vec<Note>, loop_beats: f64) -> Result<Self, TableError> {
        if !(loop_beats.is_finite() && loop_beats > 0.0) {
            return Err(TableError::InvalidLoopLength(loop_beats));
        }

        for (index, note) in notes.iter().enumerate() {
            validate_note(index, note, loop_beats)?;
        }

        Ok(Self {
            notes: notes.into(),
            loop_beats,
        })
    }

    /// A table with no notes (plays silence).
    pub fn empty(loop_beats: f64) -> Result<Self, TableError> {
        Self::new(Vec::new(), loop_beats)
    }

    /// Loop length in beats.
    pub fn loop_beats(&self) -> f64 {
        self.loop_beats
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Note> {
        self.notes.iter()
    }
}

impl<'a> IntoIterator for &'a EventTable {
    type Item = &'a Note;
    type IntoIter = core::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate_note(index: usize, note: &Note, loop_beats: f64) -> Result<(), TableError> {
    if note.pitch > MAX_PITCH {
        return Err(TableError::PitchOutOfRange {
            index,
            pitch: note.pitch,
        });
    }
    if !(note.start_beat.is_finite() && note.start_beat >= 0.0) {
        return Err(TableError::NegativeStart {
            index,
            start_beat: note.start_beat,
        });
    }
    if note.start_beat >= loop_beats {
        return Err(TableError::StartBeyondLoop {
            index,
            start_beat: note.start_beat,
            loop_beats,
        });
    }
    if !(note.duration.is_finite() && note.duration > 0.0) {
        return Err(TableError::NonPositiveDuration {
            index,
            duration: note.duration,
        });
    }
    if !(note.velocity > 0.0 && note.velocity <= 1.0) {
        return Err(TableError::VelocityOutOfRange {
            index,
            velocity: note.velocity,
        });
    }
    Ok(())
}
