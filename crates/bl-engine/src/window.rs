//! The part of the loop cycle covered by one buffer.

/// Beat interval of a buffer, folded into the loop cycle.
///
/// Rebuilt for every buffer and never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopWindow {
    /// Continuous beat at the first sample of the buffer
    pub block_start_beat: f64,
    /// Continuous beat one past the last sample of the buffer
    pub block_end_beat: f64,
    /// Loop length in beats
    pub loop_beats: f64,
    /// `block_start_beat mod loop_beats`
    pub loop_start_beat: f64,
    /// `block_end_beat mod loop_beats`
    pub loop_end_beat: f64,
    /// The buffer crosses the loop boundary
    pub wrapped: bool,
}

impl LoopWindow {
    /// Fold `[block_start_beat, block_end_beat)` into a loop of `loop_beats`.
    ///
    /// The interval must be shorter than one loop cycle; a longer buffer would
    /// wrap more than once and the membership test can only see one wrap.
    pub fn new(block_start_beat: f64, block_end_beat: f64, loop_beats: f64) -> Self {
        debug_assert!(loop_beats > 0.0);
        debug_assert!(block_end_beat >= block_start_beat);

        let loop_start_beat = libm::fmod(block_start_beat, loop_beats);
        let loop_end_beat = libm::fmod(block_end_beat, loop_beats);

        Self {
            block_start_beat,
            block_end_beat,
            loop_beats,
            loop_start_beat,
            loop_end_beat,
            wrapped: loop_end_beat < loop_start_beat,
        }
    }

    /// Build a window directly from loop-relative bounds.
    pub fn from_loop_bounds(loop_start_beat: f64, loop_end_beat: f64, loop_beats: f64) -> Self {
        let block_end_beat = if loop_end_beat < loop_start_beat {
            loop_end_beat + loop_beats
        } else {
            loop_end_beat
        };
        Self::new(loop_start_beat, block_end_beat, loop_beats)
    }

    /// Whether loop-relative `beat` falls in `[loop_start_beat, loop_end_beat)`,
    /// taking the wrap into account.
    pub fn contains(&self, beat: f64) -> bool {
        if self.wrapped {
            beat >= self.loop_start_beat || beat < self.loop_end_beat
        } else {
            beat >= self.loop_start_beat && beat < self.loop_end_beat
        }
    }

    /// Distance in beats from the window start to loop-relative `beat`.
    pub fn beat_offset(&self, beat: f64) -> f64 {
        let offset = beat - self.loop_start_beat;
        if offset < 0.0 {
            offset + self.loop_beats
        } else {
            offset
        }
    }

    /// Length of the window in beats.
    pub fn span(&self) -> f64 {
        self.block_end_beat - self.block_start_beat
    }
}
