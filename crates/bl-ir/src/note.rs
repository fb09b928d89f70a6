//! Symbolic note definitions.

/// Highest valid MIDI pitch.
pub const MAX_PITCH: u8 = 127;

/// A note in one loop cycle, addressed in beats.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Note {
    /// MIDI note number (0-127)
    pub pitch: u8,
    /// Onset within the loop cycle, in beats
    pub start_beat: f64,
    /// Length in beats; may run past the loop end
    pub duration: f64,
    /// Normalized velocity in (0, 1]
    pub velocity: f32,
}

impl Note {
    pub const fn new(pitch: u8, start_beat: f64, duration: f64, velocity: f32) -> Self {
        Self {
            pitch,
            start_beat,
            duration,
            velocity,
        }
    }

    /// Beat at which the note is released, before wrapping into the loop.
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration
    }

    /// Velocity scaled to the 1-127 MIDI range.
    pub fn midi_velocity(&self) -> u8 {
        let scaled = (self.velocity * 127.0 + 0.5) as i32;
        scaled.clamp(1, 127) as u8
    }
}
