//! Per-callback entry point.
//!
//! The [`BlockDispatcher`] owns everything one output stream needs: the beat
//! clock, the event table, a bounded event queue and a work buffer sized at
//! [`prepare`](BlockDispatcher::prepare). Rendering a device buffer runs one
//! or more schedule/process/advance rounds without allocating or locking.

use bl_ir::{AudioBuffer, EventTable};

use crate::clock::{BeatClock, LoopPosition};
use crate::event_queue::EventQueue;
use crate::processor::Processor;
use crate::scheduler::{max_block_samples, schedule_into};
use crate::window::LoopWindow;

/// Drives a [`Processor`] from a looping [`EventTable`].
pub struct BlockDispatcher<P> {
    clock: BeatClock,
    table: EventTable,
    queue: EventQueue,
    buffer: AudioBuffer,
    processor: P,
    /// Longest sub-block that still wraps the loop at most once
    max_sub_block: usize,
    /// Events lost to a full queue since playback started
    dropped_events: u64,
}

impl<P: Processor> BlockDispatcher<P> {
    /// Create an unprepared dispatcher. Until [`prepare`](Self::prepare) is
    /// called it renders silence.
    pub fn new(tempo: f64, table: EventTable, processor: P) -> Self {
        Self {
            clock: BeatClock::new(tempo),
            table,
            queue: EventQueue::new(),
            buffer: AudioBuffer::new(0, 0),
            processor,
            max_sub_block: 0,
            dropped_events: 0,
        }
    }

    /// Device is about to start.
    ///
    /// Allocates the work buffer, so call it off the audio thread or before
    /// the first buffer is delivered.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize, channels: u16) {
        self.clock.set_sample_rate(sample_rate);
        let max_block_size = max_block_size.max(1);
        self.buffer = AudioBuffer::new(channels, max_block_size);
        self.max_sub_block = if self.clock.is_ready() {
            max_block_size.min(max_block_samples(
                self.clock.samples_per_beat(),
                self.table.loop_beats(),
            ))
        } else {
            0
        };
        self.processor.prepare(sample_rate, max_block_size);
    }

    /// Device has stopped. The clock keeps its position.
    pub fn stopped(&mut self) {
        self.processor.release();
    }

    /// True once a sample rate is known and audio can be produced.
    pub fn is_prepared(&self) -> bool {
        self.max_sub_block > 0
    }

    /// Render one device buffer given as one slice per channel.
    ///
    /// All slices should have the same length; the shortest one sets the
    /// frame count.
    pub fn render_planar(&mut self, outputs: &mut [&mut [f32]]) {
        guarded(|| self.render_planar_inner(outputs))
    }

    /// Render one device buffer in interleaved layout with `channels`
    /// samples per frame.
    pub fn render_interleaved(&mut self, output: &mut [f32], channels: usize) {
        guarded(|| self.render_interleaved_inner(output, channels))
    }

    fn render_planar_inner(&mut self, outputs: &mut [&mut [f32]]) {
        let num_samples = outputs.iter().map(|o| o.len()).min().unwrap_or(0);
        if !self.is_prepared() {
            for out in outputs.iter_mut() {
                out.fill(0.0);
            }
            return;
        }

        let mut done = 0;
        while done < num_samples {
            let n = self.max_sub_block.min(num_samples - done);
            self.process_block(n);

            for (ch, out) in outputs.iter_mut().enumerate() {
                let dest = &mut out[done..done + n];
                if ch < self.buffer.channels() as usize {
                    dest.copy_from_slice(self.buffer.channel(ch as u16));
                } else {
                    dest.fill(0.0);
                }
            }
            done += n;
        }
    }

    fn render_interleaved_inner(&mut self, output: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        if !self.is_prepared() {
            output.fill(0.0);
            return;
        }

        let num_samples = output.len() / channels;
        let work_channels = self.buffer.channels() as usize;
        let mut done = 0;
        while done < num_samples {
            let n = self.max_sub_block.min(num_samples - done);
            self.process_block(n);

            let frames = &mut output[done * channels..(done + n) * channels];
            for (i, frame) in frames.chunks_exact_mut(channels).enumerate() {
                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample = if ch < work_channels {
                        self.buffer.channel(ch as u16)[i]
                    } else {
                        0.0
                    };
                }
            }
            done += n;
        }
        output[num_samples * channels..].fill(0.0);
    }

    /// One schedule/process/advance round. `num_samples` never exceeds
    /// `max_sub_block`.
    fn process_block(&mut self, num_samples: usize) {
        let window = LoopWindow::new(
            self.clock.beat_at(0),
            self.clock.beat_at(num_samples),
            self.table.loop_beats(),
        );

        self.queue.clear();
        let dropped = schedule_into(
            &window,
            &self.table,
            self.clock.samples_per_beat(),
            num_samples,
            &mut self.queue,
        );
        self.dropped_events += dropped as u64;

        self.buffer.set_frames(num_samples);
        self.buffer.silence();
        self.processor.process(&mut self.buffer, self.queue.as_slice());

        self.clock.advance(num_samples);
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    pub fn table(&self) -> &EventTable {
        &self.table
    }

    /// Current loop cycle and beat.
    pub fn loop_position(&self) -> LoopPosition {
        self.clock.loop_position(self.table.loop_beats())
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    /// Longest sub-block the device buffer is split into.
    pub fn max_sub_block(&self) -> usize {
        self.max_sub_block
    }
}

#[cfg(feature = "alloc_check")]
#[inline]
fn guarded<R>(f: impl FnOnce() -> R) -> R {
    assert_no_alloc::assert_no_alloc(f)
}

#[cfg(not(feature = "alloc_check"))]
#[inline(always)]
fn guarded<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ProcessorInfo;
    use crate::processors::SineSynth;
    use alloc::vec;
    use alloc::vec::Vec;
    use bl_ir::{EventKind, Note, NoteEvent};

    static INFO: ProcessorInfo = ProcessorInfo {
        name: "Recorder",
        short_name: "Rec",
    };

    /// Records every event with its absolute sample position.
    #[derive(Default)]
    struct Recorder {
        frames: u64,
        events: Vec<(u64, NoteEvent)>,
        blocks: Vec<usize>,
        prepared: Option<(f64, usize)>,
        releases: usize,
    }

    impl Processor for Recorder {
        fn info(&self) -> &ProcessorInfo {
            &INFO
        }

        fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
            self.prepared = Some((sample_rate, max_block_size));
        }

        fn process(&mut self, buffer: &mut AudioBuffer, events: &[NoteEvent]) {
            for e in events {
                assert!(e.offset < buffer.frames());
                self.events.push((self.frames + e.offset as u64, *e));
            }
            self.blocks.push(buffer.frames());
            self.frames += buffer.frames() as u64;
            buffer.add_to_all(0, 1.0);
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    fn melody() -> EventTable {
        EventTable::new(
            vec![
                Note::new(60, 0.0, 0.5, 0.8),
                Note::new(64, 0.5, 0.5, 0.8),
                Note::new(67, 1.0, 0.5, 0.8),
                Note::new(72, 1.5, 1.0, 0.9),
                Note::new(67, 2.5, 0.5, 0.7),
                Note::new(64, 3.0, 0.5, 0.7),
                Note::new(60, 3.5, 1.5, 0.8),
            ],
            5.0,
        )
        .unwrap()
    }

    #[test]
    fn unprepared_renders_silence_without_advancing() {
        let mut d = BlockDispatcher::new(120.0, melody(), Recorder::default());
        let mut out = vec![1.0f32; 256];
        d.render_interleaved(&mut out, 2);

        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(d.clock().position(), 0);
        assert!(d.processor().blocks.is_empty());
    }

    #[test]
    fn prepare_forwards_device_settings() {
        let mut d = BlockDispatcher::new(120.0, melody(), Recorder::default());
        d.prepare(44_100.0, 512, 2);
        assert!(d.is_prepared());
        assert_eq!(d.processor().prepared, Some((44_100.0, 512)));
        assert_eq!(d.clock().samples_per_beat(), 22_050.0);

        d.stopped();
        assert_eq!(d.processor().releases, 1);
    }

    #[test]
    fn one_cycle_emits_each_event_once() {
        let mut d = BlockDispatcher::new(120.0, melody(), Recorder::default());
        d.prepare(44_100.0, 512, 1);

        // 5 beats at 22050 samples per beat
        let cycle = 110_250;
        let mut out = vec![0.0f32; 512];
        let mut rendered = 0;
        while rendered < cycle {
            let n = (cycle - rendered).min(512);
            let mut chans = [&mut out[..n]];
            d.render_planar(&mut chans);
            rendered += n;
        }
        assert_eq!(d.clock().position(), cycle as u64);

        let events = &d.processor().events;
        let ons: Vec<_> = events.iter().filter(|(_, e)| e.kind == EventKind::NoteOn).collect();
        let offs: Vec<_> = events.iter().filter(|(_, e)| e.kind == EventKind::NoteOff).collect();
        assert_eq!(ons.len(), 7);
        // The last note ends on the loop boundary, so its off event lands at 0
        assert_eq!(offs.len(), 7);

        for note in d.table().iter() {
            let expected = (note.start_beat * 22_050.0) as i64;
            assert!(
                ons.iter()
                    .any(|(pos, e)| e.pitch == note.pitch && (*pos as i64 - expected).abs() <= 1),
                "missing note on for pitch {} at beat {}",
                note.pitch,
                note.start_beat
            );
        }
    }

    #[test]
    fn off_event_after_wrap_lands_in_next_cycle() {
        let mut d = BlockDispatcher::new(120.0, melody(), Recorder::default());
        d.prepare(44_100.0, 512, 1);

        let total = 110_250 + 512;
        let mut out = vec![0.0f32; total];
        for chunk in out.chunks_mut(441) {
            d.render_planar(&mut [chunk]);
        }

        let last_off = d
            .processor()
            .events
            .iter()
            .filter(|(_, e)| e.kind == EventKind::NoteOff && e.pitch == 60)
            .map(|(pos, _)| *pos)
            .max();
        assert_eq!(last_off, Some(110_250));
    }

    #[test]
    fn buffers_longer_than_loop_are_split() {
        // 1 kHz at 120 BPM: 500 samples per beat, so the loop is 500 samples
        let table = EventTable::new(vec![Note::new(60, 0.0, 0.25, 1.0)], 1.0).unwrap();
        let mut d = BlockDispatcher::new(120.0, table, Recorder::default());
        d.prepare(1_000.0, 2_048, 1);
        assert_eq!(d.max_sub_block(), 499);

        let mut out = vec![0.0f32; 2_000];
        d.render_planar(&mut [&mut out[..]]);

        let ons: Vec<u64> = d
            .processor()
            .events
            .iter()
            .filter(|(_, e)| e.is_note_on())
            .map(|(pos, _)| *pos)
            .collect();
        assert_eq!(ons, vec![0, 500, 1000, 1500]);
        assert!(d.processor().blocks.iter().all(|&n| n <= 499));
        assert_eq!(d.clock().position(), 2_000);
    }

    #[test]
    fn device_buffer_larger_than_work_buffer_is_split() {
        let mut d = BlockDispatcher::new(120.0, melody(), Recorder::default());
        d.prepare(44_100.0, 128, 2);

        let mut out = vec![0.0f32; 300 * 2];
        d.render_interleaved(&mut out, 2);
        assert_eq!(d.processor().blocks, vec![128, 128, 44]);
        // The recorder marks the first frame of every sub-block
        assert_eq!(out[0], 1.0);
        assert_eq!(out[128 * 2 + 1], 1.0);
        assert_eq!(out[256 * 2], 1.0);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn extra_device_channels_are_silent() {
        let mut d = BlockDispatcher::new(120.0, melody(), SineSynth::new());
        d.prepare(48_000.0, 256, 2);

        let mut out = vec![1.0f32; 256 * 3];
        d.render_interleaved(&mut out, 3);
        for frame in out.chunks_exact(3) {
            assert_eq!(frame[0], frame[1]);
            assert_eq!(frame[2], 0.0);
        }
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[cfg(feature = "std")]
    #[test]
    fn prepared_on_control_thread_runs_on_another() {
        // Same hand-over as a device backend: prepare, then move the
        // dispatcher into the callback thread
        let mut d = BlockDispatcher::new(120.0, melody(), Recorder::default());
        d.prepare(44_100.0, 512, 1);

        let d = std::thread::spawn(move || {
            let mut out = vec![0.0f32; 512];
            for _ in 0..4 {
                d.render_planar(&mut [&mut out[..]]);
            }
            d.stopped();
            d
        })
        .join()
        .unwrap();

        let rec = d.processor();
        assert_eq!(rec.prepared, Some((44_100.0, 512)));
        assert_eq!(rec.blocks, vec![512; 4]);
        assert_eq!(rec.releases, 1);
        assert_eq!(rec.events.first(), Some(&(0, NoteEvent::note_on(0, 60, 0.8))));
    }

    #[test]
    fn loop_position_wraps() {
        let mut d = BlockDispatcher::new(120.0, melody(), Recorder::default());
        d.prepare(44_100.0, 512, 1);
        let mut out = vec![0.0f32; 512];
        // 6 beats: one full cycle plus one beat
        for _ in 0..(6 * 22_050 / 512) {
            d.render_planar(&mut [&mut out[..]]);
        }
        let pos = d.loop_position();
        assert_eq!(pos.cycle, 1);
        assert!(pos.beat > 0.9 && pos.beat < 1.0);
    }
}
