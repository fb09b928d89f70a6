//! Loop scheduling and block dispatch for the beatloop player.
//!
//! Turns a looping table of notes into sample-accurate note events for each
//! audio buffer and hands them to a [`Processor`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clock;
mod dispatcher;
mod event_queue;
mod processor;
pub mod processors;
pub mod scheduler;
mod window;

pub use clock::{BeatClock, LoopPosition};
pub use dispatcher::BlockDispatcher;
pub use event_queue::{EventQueue, MAX_BLOCK_EVENTS};
pub use processor::{Processor, ProcessorInfo};
pub use processors::{Silence, SineSynth};
pub use scheduler::{schedule_block, schedule_into};
pub use window::LoopWindow;
