use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::MediaKind;

/// The type of track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Video track - holds video and image clips
    Video,
    /// Audio track - holds audio clips, never drawn
    Audio,
    /// Text track - holds titles and stickers
    Text,
}

impl TrackKind {
    /// Whether a clip of `kind` may live on a track of this type.
    pub fn accepts(self, kind: MediaKind) -> bool {
        matches!(
            (self, kind),
            (TrackKind::Video, MediaKind::Video)
                | (TrackKind::Video, MediaKind::Image)
                | (TrackKind::Audio, MediaKind::Audio)
                | (TrackKind::Text, MediaKind::Text)
        )
    }
}

impl MediaKind {
    /// The track type that hosts clips of this kind.
    pub fn track_kind(self) -> TrackKind {
        match self {
            MediaKind::Video | MediaKind::Image => TrackKind::Video,
            MediaKind::Audio => TrackKind::Audio,
            MediaKind::Text => TrackKind::Text,
        }
    }
}

/// Track identifier. Ordering of ids is the compositing z-order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A track in the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier (e.g. "t1")
    pub id: TrackId,
    /// Type of track
    pub kind: TrackKind,
    /// Display name (e.g., "Text", "Main Video")
    pub name: String,
    /// Muted tracks drive their media at zero volume.
    #[serde(default)]
    pub muted: bool,
    /// Locked tracks reject new clips and drag edits.
    #[serde(default)]
    pub locked: bool,
}

impl Track {
    /// Create a new track
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId::new(id),
            kind,
            name: name.into(),
            muted: false,
            locked: false,
        }
    }

    /// The three tracks every new timeline starts with.
    pub fn defaults() -> Vec<Track> {
        vec![
            Self::new("t1", "Text", TrackKind::Text),
            Self::new("t2", "Main Video", TrackKind::Video),
            Self::new("t3", "Audio", TrackKind::Audio),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_accepts() {
        assert!(TrackKind::Video.accepts(MediaKind::Image));
        assert!(TrackKind::Video.accepts(MediaKind::Video));
        assert!(!TrackKind::Video.accepts(MediaKind::Text));
        assert!(!TrackKind::Text.accepts(MediaKind::Audio));
    }

    #[test]
    fn test_track_id_order() {
        let mut ids = vec![TrackId::from("t3"), TrackId::from("t10"), TrackId::from("t1")];
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(TrackId::as_str).collect();
        assert_eq!(ordered, vec!["t1", "t10", "t3"]);
    }
}
