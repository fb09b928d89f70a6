//! Sample-to-beat conversion.

/// Position within the looping timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoopPosition {
    /// Completed loop cycles since playback started
    pub cycle: u64,
    /// Beat within the current cycle, in [0, loop_beats)
    pub beat: f64,
}

/// Converts the running sample count into beats at a fixed tempo.
///
/// The position only moves forward. Looping is handled by the scheduler's
/// modulo arithmetic, never by resetting the counter.
#[derive(Clone, Debug)]
pub struct BeatClock {
    /// Device sample rate (0 until the device reports one)
    sample_rate: f64,
    /// Tempo in beats per minute
    tempo: f64,
    /// Derived: sample_rate * 60 / tempo
    samples_per_beat: f64,
    /// Samples delivered since playback started
    position: u64,
}

impl BeatClock {
    /// Create a clock with no sample rate yet. It is not ready until
    /// [`set_sample_rate`](Self::set_sample_rate) is called.
    pub fn new(tempo: f64) -> Self {
        Self {
            sample_rate: 0.0,
            tempo,
            samples_per_beat: 0.0,
            position: 0,
        }
    }

    /// Create a clock that is ready to run at `sample_rate`.
    pub fn with_sample_rate(tempo: f64, sample_rate: f64) -> Self {
        let mut clock = Self::new(tempo);
        clock.set_sample_rate(sample_rate);
        clock
    }

    /// Update the device sample rate and the derived conversion.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_samples_per_beat();
    }

    fn update_samples_per_beat(&mut self) {
        self.samples_per_beat = if self.sample_rate > 0.0 && self.tempo > 0.0 {
            self.sample_rate * 60.0 / self.tempo
        } else {
            0.0
        };
    }

    /// True once a usable sample rate is known.
    pub fn is_ready(&self) -> bool {
        self.samples_per_beat > 0.0
    }

    /// Move the position forward by one delivered buffer.
    pub fn advance(&mut self, num_samples: usize) {
        self.position += num_samples as u64;
    }

    /// Beat position `offset` samples after the current position.
    pub fn beat_at(&self, offset: usize) -> f64 {
        if !self.is_ready() {
            return 0.0;
        }
        (self.position + offset as u64) as f64 / self.samples_per_beat
    }

    /// Split the current position into loop cycle and beat within the cycle.
    pub fn loop_position(&self, loop_beats: f64) -> LoopPosition {
        let beat = self.beat_at(0);
        if loop_beats <= 0.0 {
            return LoopPosition { cycle: 0, beat };
        }
        let cycle = libm::floor(beat / loop_beats);
        LoopPosition {
            cycle: cycle as u64,
            beat: libm::fmod(beat, loop_beats),
        }
    }

    pub fn samples_per_beat(&self) -> f64 {
        self.samples_per_beat
    }

    pub fn beats_per_sample(&self) -> f64 {
        if self.is_ready() {
            1.0 / self.samples_per_beat
        } else {
            0.0
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
