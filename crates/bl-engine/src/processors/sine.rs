//! Sine voice bank.
//!
//! A small built-in synth so the player is audible without a plugin. Events
//! are applied at their exact sample offset: the block is rendered in
//! segments between consecutive events.

use arrayvec::ArrayVec;
use bl_ir::{AudioBuffer, EventKind, NoteEvent};

use crate::processor::{Processor, ProcessorInfo};

/// Number of simultaneous voices.
pub const MAX_VOICES: usize = 32;

const ATTACK_SECONDS: f64 = 0.005;
const RELEASE_SECONDS: f64 = 0.06;
const OUTPUT_GAIN: f32 = 0.2;

static INFO: ProcessorInfo = ProcessorInfo {
    name: "Sine Synth",
    short_name: "Sine",
};

/// Convert a MIDI note to frequency in Hz (A4 = 440 Hz).
pub fn note_to_hz(pitch: u8) -> f64 {
    440.0 * libm::pow(2.0, (pitch as f64 - 69.0) / 12.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VoiceState {
    Held,
    Released,
}

#[derive(Clone, Debug)]
struct SineVoice {
    pitch: u8,
    /// Phase in cycles, [0, 1)
    phase: f64,
    /// Phase increment per sample
    increment: f64,
    /// Envelope level
    level: f32,
    /// Peak level while held (velocity)
    peak: f32,
    state: VoiceState,
    /// Start order, for stealing and release matching
    age: u64,
    /// Sample time the voice started at
    started: u64,
}

impl SineVoice {
    fn next_sample(&mut self, attack_step: f32, release_step: f32) -> f32 {
        match self.state {
            VoiceState::Held => self.level = (self.level + attack_step * self.peak).min(self.peak),
            VoiceState::Released => self.level = (self.level - release_step * self.peak).max(0.0),
        }
        let s = libm::sin(self.phase * core::f64::consts::TAU) as f32 * self.level;
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        s
    }

    fn is_finished(&self) -> bool {
        self.state == VoiceState::Released && self.level <= 0.0
    }
}

/// Polyphonic sine synth with linear attack and release.
pub struct SineSynth {
    voices: ArrayVec<SineVoice, MAX_VOICES>,
    sample_rate: f64,
    attack_step: f32,
    release_step: f32,
    next_age: u64,
    /// Samples rendered since `prepare`
    time: u64,
}

impl SineSynth {
    pub fn new() -> Self {
        Self {
            voices: ArrayVec::new(),
            sample_rate: 0.0,
            attack_step: 1.0,
            release_step: 1.0,
            next_age: 0,
            time: 0,
        }
    }

    /// Number of voices still producing sound (held or releasing).
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Number of voices whose note-off has not arrived yet.
    pub fn held_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.state == VoiceState::Held).count()
    }

    fn note_on(&mut self, pitch: u8, velocity: f32, at: u64) {
        if self.voices.is_full() {
            // Steal the oldest voice
            if let Some(idx) = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.age)
                .map(|(idx, _)| idx)
            {
                self.voices.remove(idx);
            }
        }

        let voice = SineVoice {
            pitch,
            phase: 0.0,
            increment: note_to_hz(pitch) / self.sample_rate,
            level: 0.0,
            peak: velocity.clamp(0.0, 1.0),
            state: VoiceState::Held,
            age: self.next_age,
            started: at,
        };
        self.next_age += 1;
        let _ = self.voices.try_push(voice);
    }

    /// Release the oldest held voice playing `pitch`.
    ///
    /// A voice that started at this very sample belongs to a new note, so the
    /// off event must be for an earlier one.
    fn note_off(&mut self, pitch: u8, at: u64) {
        if let Some(voice) = self
            .voices
            .iter_mut()
            .filter(|v| v.pitch == pitch && v.state == VoiceState::Held && v.started != at)
            .min_by_key(|v| v.age)
        {
            voice.state = VoiceState::Released;
        }
    }

    fn render_segment(&mut self, buffer: &mut AudioBuffer, start: usize, end: usize) {
        let (attack, release) = (self.attack_step, self.release_step);
        for voice in self.voices.iter_mut() {
            for frame in start..end {
                let s = voice.next_sample(attack, release) * OUTPUT_GAIN;
                buffer.add_to_all(frame, s);
            }
        }
        self.voices.retain(|v| !v.is_finished());
    }
}

impl Default for SineSynth {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for SineSynth {
    fn info(&self) -> &ProcessorInfo {
        &INFO
    }

    fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.attack_step = (1.0 / (ATTACK_SECONDS * sample_rate).max(1.0)) as f32;
        self.release_step = (1.0 / (RELEASE_SECONDS * sample_rate).max(1.0)) as f32;
        self.voices.clear();
        self.time = 0;
    }

    fn process(&mut self, buffer: &mut AudioBuffer, events: &[NoteEvent]) {
        if self.sample_rate <= 0.0 {
            return;
        }

        let frames = buffer.frames();
        let mut cursor = 0;
        for event in events {
            let at = event.offset.min(frames);
            if at > cursor {
                self.render_segment(buffer, cursor, at);
                cursor = at;
            }
            let time = self.time + at as u64;
            match event.kind {
                EventKind::NoteOn => self.note_on(event.pitch, event.velocity, time),
                EventKind::NoteOff => self.note_off(event.pitch, time),
            }
        }
        if cursor < frames {
            self.render_segment(buffer, cursor, frames);
        }
        self.time += frames as u64;
    }

    fn release(&mut self) {
        self.voices.clear();
    }
}
