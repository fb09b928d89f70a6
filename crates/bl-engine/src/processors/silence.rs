//! Silent processor.
//!
//! Leaves the zeroed buffer untouched. Used where only the scheduled events
//! matter, such as benches and allocation checks.

use bl_ir::{AudioBuffer, NoteEvent};

use crate::processor::{Processor, ProcessorInfo};

static INFO: ProcessorInfo = ProcessorInfo {
    name: "Silence",
    short_name: "Mute",
};

pub struct Silence;

impl Processor for Silence {
    fn info(&self) -> &ProcessorInfo { &INFO }
    fn prepare(&mut self, _sample_rate: f64, _max_block_size: usize) {}
    fn process(&mut self, _buffer: &mut AudioBuffer, _events: &[NoteEvent]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_leaves_buffer_unchanged() {
        let mut p = Silence;
        p.prepare(44100.0, 4);
        let mut buf = AudioBuffer::new(2, 4);
        p.process(&mut buf, &[NoteEvent::note_on(0, 60, 1.0)]);
        assert_eq!(buf.peak(), 0.0);
    }
}
