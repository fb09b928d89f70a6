//! Bounded per-buffer event queue.

use bl_ir::NoteEvent;

/// Maximum number of events one buffer can carry.
pub const MAX_BLOCK_EVENTS: usize = 256;

/// Events for the current buffer, kept sorted by sample offset.
///
/// Storage is inline and fixed-size, so filling and clearing the queue on the
/// audio thread never allocates. Events with equal sort keys stay in
/// insertion order.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: heapless::Vec<NoteEvent, MAX_BLOCK_EVENTS>,
}

impl EventQueue {
    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self {
            events: heapless::Vec::new(),
        }
    }

    /// Insert an event after every event that sorts at or before it.
    ///
    /// Hands the event back if the queue is full.
    pub fn push(&mut self, event: NoteEvent) -> Result<(), NoteEvent> {
        let key = event.sort_key();
        let pos = self.events.partition_point(|e| e.sort_key() <= key);
        self.events.insert(pos, event)
    }

    /// Remove all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Events in offset order.
    pub fn as_slice(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn iter(&self) -> core::slice::Iter<'_, NoteEvent> {
        self.events.iter()
    }

    /// Events whose offset lies in `start..end`.
    pub fn in_range(&self, start: usize, end: usize) -> &[NoteEvent] {
        let lo = self.events.partition_point(|e| e.offset < start);
        let hi = self.events.partition_point(|e| e.offset < end);
        &self.events[lo..hi.max(lo)]
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the number of events in the queue.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_full(&self) -> bool {
        self.events.is_full()
    }
}
