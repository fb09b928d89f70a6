//! Loop-to-buffer scheduling.
//!
//! Works out which note-on and note-off events of an [`EventTable`] land in a
//! buffer and at which sample offset. Stateless: every call looks only at the
//! buffer's [`LoopWindow`], so on and off events of one note are tested
//! independently and may land in different buffers.

use bl_ir::{EventTable, NoteEvent};

use crate::event_queue::EventQueue;
use crate::window::LoopWindow;

/// Tolerance (in samples) for snapping an offset that rounded down to just
/// below a whole sample.
pub const OFFSET_SNAP: f64 = 1e-6;

/// Longest buffer, in samples, that wraps the loop at most once.
///
/// Always at least one sample.
pub fn max_block_samples(samples_per_beat: f64, loop_beats: f64) -> usize {
    let loop_samples = libm::floor(samples_per_beat * loop_beats);
    if loop_samples >= 2.0 {
        loop_samples as usize - 1
    } else {
        1
    }
}

/// Convert a beat distance from the buffer start into a sample offset.
///
/// Returns `None` when the offset falls outside `[0, num_samples)`.
pub fn sample_offset(beat_offset: f64, samples_per_beat: f64, num_samples: usize) -> Option<usize> {
    let raw = beat_offset * samples_per_beat;
    let mut offset = libm::floor(raw + OFFSET_SNAP);
    if offset >= num_samples as f64 {
        offset = libm::floor(raw);
    }
    if offset >= 0.0 && offset < num_samples as f64 {
        Some(offset as usize)
    } else {
        None
    }
}

/// Emit every event of `table` that falls inside `window`.
///
/// Events are passed to `emit` in table order, each note's on event before
/// its off event; callers that need offset order insert them into an
/// [`EventQueue`]. `num_samples` is the buffer length the window was built
/// from.
///
/// Window membership alone decides whether an event belongs to this buffer.
/// Consecutive windows share their boundary beat exactly, so every event
/// lands in exactly one of them; an offset that rounds to or past the end of
/// the buffer is clamped to its last sample.
pub fn schedule_block<F>(
    window: &LoopWindow,
    table: &EventTable,
    samples_per_beat: f64,
    num_samples: usize,
    mut emit: F,
) where
    F: FnMut(NoteEvent),
{
    debug_assert!(
        window.span() < window.loop_beats,
        "buffer spans more than one loop cycle"
    );

    let loop_beats = window.loop_beats;

    for note in table {
        let on_beat = libm::fmod(note.start_beat, loop_beats);
        if let Some(offset) = locate(window, on_beat, samples_per_beat, num_samples) {
            emit(NoteEvent::note_on(offset, note.pitch, note.velocity));
        }

        let off_beat = libm::fmod(note.end_beat(), loop_beats);
        if let Some(offset) = locate(window, off_beat, samples_per_beat, num_samples) {
            emit(NoteEvent::note_off(offset, note.pitch, note.velocity));
        }
    }
}

/// Schedule into `queue`, which ends up sorted by offset.
///
/// Returns the number of events dropped because the queue was full.
pub fn schedule_into(
    window: &LoopWindow,
    table: &EventTable,
    samples_per_beat: f64,
    num_samples: usize,
    queue: &mut EventQueue,
) -> usize {
    let mut dropped = 0;
    schedule_block(window, table, samples_per_beat, num_samples, |event| {
        if queue.push(event).is_err() {
            dropped += 1;
        }
    });
    dropped
}

fn locate(window: &LoopWindow, beat: f64, samples_per_beat: f64, num_samples: usize) -> Option<usize> {
    if num_samples == 0 || !window.contains(beat) {
        return None;
    }
    // beat_offset is never negative, so a miss can only be past the end
    Some(
        sample_offset(window.beat_offset(beat), samples_per_beat, num_samples)
            .unwrap_or(num_samples - 1),
    )
}
