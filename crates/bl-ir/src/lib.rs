//! Core types for the beatloop player.
//!
//! Defines the symbolic side of playback (notes and the event table of one
//! loop cycle) and the sample side (offset-tagged note events and planar
//! audio buffers). The engine consumes these types on the audio thread.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod event;
mod event_table;
mod note;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE, MAX_CHANNELS};
pub use event::{EventKind, NoteEvent};
pub use event_table::{EventTable, TableError};
pub use note::{Note, MAX_PITCH};
