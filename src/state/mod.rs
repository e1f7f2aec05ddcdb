//! State management module
//!
//! This module contains the editor's data structures:
//! - Timeline: tracks, clips and their editing operations
//! - Asset: decoded media supplied by the import/generation side
//! - History: bounded undo/redo snapshots
//! - Selection and built-in presets

mod asset;
mod history;
pub mod presets;
mod selection;
mod timeline;

pub use asset::*;
pub use history::*;
pub use selection::*;
pub use timeline::*;
