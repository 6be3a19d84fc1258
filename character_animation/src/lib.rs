//! Skeletal track selection, fuzzy resolution, and timed crossfading.
#![forbid(unsafe_code)]

pub mod blender;
pub mod deck;

pub use blender::AnimationBlender;
pub use deck::{resolve_track, TrackDeck, TrackHandle};
