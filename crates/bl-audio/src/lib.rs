//! Audio output backends for the beatloop player.

mod cpal_backend;
mod traits;

pub use cpal_backend::CpalOutput;
pub use traits::{AudioError, AudioOutput, DeviceInfo, DynDispatcher};
