//! Timeline data model
//!
//! Tracks, clips and the editing operations that mutate them.

mod clip;
mod model;
mod track;

pub use clip::{BlendMode, Clip, ClipPatch, ClipProperties, ColorGrade};
pub use model::{ClipSource, ClipTemplate, TimelineModel};
pub use track::{Track, TrackId, TrackKind};
