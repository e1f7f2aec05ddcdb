//! Media assets
//!
//! Assets are decoded media supplied by the import/generation collaborators.
//! The core never fetches or decodes files on its own; it only consumes the
//! `MediaAsset` record and hands its source to a `MediaLoader`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use uuid::Uuid;

use crate::constants::{DEFAULT_IMAGE_DURATION_SECONDS, DEFAULT_MEDIA_DURATION_SECONDS};

/// The kind of media a clip or asset carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Audio,
    Text,
}

impl MediaKind {
    /// Guess the kind from a file name using its MIME type.
    ///
    /// Unknown types fall back to `Text`, matching how the import panel
    /// classifies files it cannot identify.
    pub fn from_path(path: &Path) -> Self {
        let Some(mime) = mime_guess::from_path(path).first() else {
            return MediaKind::Text;
        };
        let top = mime.type_();
        if top == mime_guess::mime::VIDEO {
            MediaKind::Video
        } else if top == mime_guess::mime::IMAGE {
            MediaKind::Image
        } else if top == mime_guess::mime::AUDIO {
            MediaKind::Audio
        } else {
            MediaKind::Text
        }
    }

    /// Returns true if clips of this kind are drawn on the canvas
    pub fn is_visual(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Image | MediaKind::Text)
    }

    /// Returns true if clips of this kind need a decode handle
    pub fn needs_handle(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Image | MediaKind::Audio)
    }

    /// Placement length used when the source reports no duration.
    pub fn default_duration(self) -> f64 {
        match self {
            MediaKind::Image => DEFAULT_IMAGE_DURATION_SECONDS,
            _ => DEFAULT_MEDIA_DURATION_SECONDS,
        }
    }
}

/// Where an asset's media comes from.
#[derive(Clone, Default)]
pub enum MediaSource {
    /// No decodable media (presets, placeholders).
    #[default]
    None,
    /// A single decoded still.
    Image(Arc<RgbaImage>),
    /// Decoded frames at a fixed rate, as delivered by a generation backend.
    Frames {
        frames: Arc<Vec<Arc<RgbaImage>>>,
        fps: f64,
    },
    /// A file on disk, decoded by the loader.
    File(PathBuf),
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::None => write!(f, "None"),
            MediaSource::Image(image) => write!(f, "Image({}x{})", image.width(), image.height()),
            MediaSource::Frames { frames, fps } => {
                write!(f, "Frames({} @ {} fps)", frames.len(), fps)
            }
            MediaSource::File(path) => write!(f, "File({:?})", path),
        }
    }
}

/// An asset in the media library
#[derive(Debug, Clone)]
pub struct MediaAsset {
    /// Unique identifier
    pub id: Uuid,
    /// User-facing display name
    pub name: String,
    pub kind: MediaKind,
    pub source: MediaSource,
    /// Native duration in seconds (stills report their default placement length)
    pub native_duration: f64,
    /// Native pixel size, if known
    pub native_size: Option<(u32, u32)>,
    pub thumbnail: Option<Arc<RgbaImage>>,
}

impl MediaAsset {
    /// Create an asset from a decoded still image
    pub fn from_image(name: impl Into<String>, image: RgbaImage) -> Self {
        let size = (image.width(), image.height());
        let image = Arc::new(image);
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: MediaKind::Image,
            source: MediaSource::Image(Arc::clone(&image)),
            native_duration: DEFAULT_IMAGE_DURATION_SECONDS,
            native_size: Some(size),
            thumbnail: Some(image),
        }
    }

    /// Create a video asset from decoded frames at `fps`
    pub fn from_frames(name: impl Into<String>, frames: Vec<RgbaImage>, fps: f64) -> Self {
        let fps = fps.max(1.0);
        let native_size = frames.first().map(|frame| (frame.width(), frame.height()));
        let frames: Vec<Arc<RgbaImage>> = frames.into_iter().map(Arc::new).collect();
        let native_duration = frames.len() as f64 / fps;
        let thumbnail = frames.first().cloned();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: MediaKind::Video,
            source: MediaSource::Frames {
                frames: Arc::new(frames),
                fps,
            },
            native_duration,
            native_size,
            thumbnail,
        }
    }

    /// Create an asset that points at a file; the kind is guessed from the name
    pub fn from_file(path: impl Into<PathBuf>, native_duration: Option<f64>) -> Self {
        let path = path.into();
        let kind = MediaKind::from_path(&path);
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("import")
            .to_string();
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            source: MediaSource::File(path),
            native_duration: native_duration
                .filter(|duration| *duration > 0.0)
                .unwrap_or_else(|| kind.default_duration()),
            native_size: None,
            thumbnail: None,
        }
    }

    /// Create an audio asset with no decodable samples attached
    pub fn silent_audio(name: impl Into<String>, native_duration: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: MediaKind::Audio,
            source: MediaSource::None,
            native_duration,
            native_size: None,
            thumbnail: None,
        }
    }

    /// True when trims must stay inside the source (video and audio)
    pub fn is_trimmable(&self) -> bool {
        matches!(self.kind, MediaKind::Video | MediaKind::Audio)
    }
}
