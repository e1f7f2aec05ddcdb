//! Error types for timeline edits and export (thiserror-based).

use thiserror::Error;

use crate::state::{MediaKind, TrackId, TrackKind};

/// Errors raised by timeline mutations.
///
/// Out-of-range splits, deletes without a selection and undo past the stack
/// bounds are silent no-ops and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("Track {0} is locked")]
    TrackLocked(TrackId),

    #[error("{clip:?} clips cannot be placed on a {track:?} track")]
    KindMismatch { clip: MediaKind, track: TrackKind },

    #[error("No track accepts {0:?} clips")]
    NoCompatibleTrack(MediaKind),

    #[error("Unknown asset: {0}")]
    UnknownAsset(uuid::Uuid),

    #[error("Invalid clip timing: {0}")]
    InvalidTiming(String),
}

/// Errors surfaced to the host when an export cannot complete.
///
/// Any partial output has already been discarded by the time one of these is
/// returned.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("An export is already running")]
    AlreadyExporting,

    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("Encode failed at frame {frame}: {reason}")]
    EncodeFailed { frame: u64, reason: String },

    #[error("Export cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type EditorResult<T> = Result<T, EditorError>;
pub type ExportResult<T> = Result<T, ExportError>;
