//! Built-in processor implementations.

mod silence;
mod sine;

pub use silence::Silence;
pub use sine::{note_to_hz, SineSynth, MAX_VOICES};
