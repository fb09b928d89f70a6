//! Sample-accurate events handed to the processing engine.

/// What an event does.
///
/// Variant order is the tie-break order inside a buffer: at the same sample
/// offset every NoteOn sorts before every NoteOff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// Start a note
    NoteOn,
    /// Release a note
    NoteOff,
}

/// A note event positioned inside the current buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    /// Sample index into the current buffer
    pub offset: usize,
    pub kind: EventKind,
    /// MIDI note number
    pub pitch: u8,
    /// Normalized velocity (release velocity for NoteOff)
    pub velocity: f32,
}

impl NoteEvent {
    pub const fn note_on(offset: usize, pitch: u8, velocity: f32) -> Self {
        Self {
            offset,
            kind: EventKind::NoteOn,
            pitch,
            velocity,
        }
    }

    pub const fn note_off(offset: usize, pitch: u8, velocity: f32) -> Self {
        Self {
            offset,
            kind: EventKind::NoteOff,
            pitch,
            velocity,
        }
    }

    /// Ordering key within a buffer: offset first, then kind.
    pub fn sort_key(&self) -> (usize, EventKind) {
        (self.offset, self.kind)
    }

    pub fn is_note_on(&self) -> bool {
        self.kind == EventKind::NoteOn
    }
}
