//! Processor trait for the audio engine that renders scheduled notes.

use alloc::boxed::Box;
use bl_ir::{AudioBuffer, NoteEvent};

/// Static metadata about a processor.
pub struct ProcessorInfo {
    pub name: &'static str,
    pub short_name: &'static str,
}

/// The downstream engine that turns note events into audio.
///
/// The dispatcher calls `prepare` before the first buffer (and whenever the
/// device reconfigures), `process` once per block, and `release` after the
/// device stops. `prepare` may run on the control thread before the stream
/// starts; `process` and `release` run on the audio thread. The calls never
/// overlap, since the dispatcher owns the processor.
pub trait Processor: Send {
    fn info(&self) -> &ProcessorInfo;

    /// Allocate and reset for the given device settings.
    fn prepare(&mut self, sample_rate: f64, max_block_size: usize);

    /// Render into `buffer`, which arrives zeroed. `events` are sorted by
    /// offset and every offset is below `buffer.frames()`.
    fn process(&mut self, buffer: &mut AudioBuffer, events: &[NoteEvent]);

    /// Drop any sounding notes and free device-dependent state.
    fn release(&mut self) {}
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn info(&self) -> &ProcessorInfo {
        (**self).info()
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        (**self).prepare(sample_rate, max_block_size)
    }

    fn process(&mut self, buffer: &mut AudioBuffer, events: &[NoteEvent]) {
        (**self).process(buffer, events)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
