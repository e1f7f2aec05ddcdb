//! NeonCut compositor core
//!
//! Timeline model, undo history, transport, CPU compositing, canvas and
//! timeline interaction, and frame export for the NeonCut video editor.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod hotkeys;
pub mod session;
pub mod state;
pub mod timeline;
pub mod utils;

pub use config::EditorConfig;
pub use error::{EditorError, EditorResult, ExportError, ExportResult};
pub use session::{EditorRuntime, EditorSession, LiveSession};
