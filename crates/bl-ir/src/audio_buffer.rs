//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Maximum number of audio channels per buffer.
pub const MAX_CHANNELS: u16 = 8;

/// Default work buffer size in frames.
pub const BLOCK_SIZE: usize = 512;

/// A multichannel f32 audio buffer in planar layout.
///
/// Storage is allocated once for `capacity` frames per channel. The active
/// length (`frames`) can then be changed per block without reallocating.
/// `data[ch * capacity + frame]` gives the sample for channel `ch` at `frame`.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    capacity: usize,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: usize) -> Self {
        let channels = channels.min(MAX_CHANNELS);
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            capacity: frames,
            frames,
        }
    }

    /// Set the active frame count, clamped to capacity.
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames.min(self.capacity);
    }

    /// Fill the active frames of every channel with zero.
    pub fn silence(&mut self) {
        for ch in 0..self.channels {
            self.channel_mut(ch).fill(0.0);
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Active number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Frames allocated per channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read-only access to one channel's active samples.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.capacity;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's active samples.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.capacity;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Add `value` to every channel at `frame`.
    pub fn add_to_all(&mut self, frame: usize, value: f32) {
        if frame >= self.frames {
            return;
        }
        for ch in 0..self.channels as usize {
            self.data[ch * self.capacity + frame] += value;
        }
    }

    /// Scale all active samples by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for ch in 0..self.channels {
            for s in self.channel_mut(ch) {
                *s *= gain;
            }
        }
    }

    /// Largest absolute sample value across active frames.
    pub fn peak(&self) -> f32 {
        (0..self.channels)
            .flat_map(|ch| self.channel(ch).iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}
