use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TrackId;
use crate::constants::{
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_TEXT_COLOR, MIN_CLIP_DURATION_SECONDS,
    MIN_PLAYBACK_SPEED,
};
use crate::state::MediaKind;

/// Compositing operator applied when a clip is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    #[serde(alias = "source-over")]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    /// Additive blending.
    #[serde(alias = "lighter")]
    Add,
    Difference,
}

/// Color grade applied as a filter chain: brightness, contrast, saturation, hue, blur.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorGrade {
    /// 1.0 is neutral.
    pub brightness: f32,
    /// 1.0 is neutral.
    pub contrast: f32,
    /// 1.0 is neutral, 0.0 is greyscale.
    pub saturation: f32,
    /// Hue rotation in degrees.
    pub hue: f32,
    /// Gaussian blur radius in pixels.
    pub blur: f32,
}

impl Default for ColorGrade {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            hue: 0.0,
            blur: 0.0,
        }
    }
}

impl ColorGrade {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-clip properties edited from the inspector and the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClipProperties {
    /// Offset from the canvas centre, logical pixels.
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Opacity from 0.0 (transparent) to 1.0 (opaque).
    pub opacity: f32,
    /// Volume multiplier for audio and video.
    pub volume: f32,
    /// Fade-in length in seconds.
    pub fade_in: f64,
    /// Fade-out length in seconds.
    pub fade_out: f64,
    pub blend_mode: BlendMode,
    #[serde(flatten)]
    pub grade: ColorGrade,
    /// Source playback rate.
    pub speed: f64,

    /// Text content; falls back to the clip name when unset.
    pub text: Option<String>,
    pub font_size: f32,
    pub text_color: String,
    pub font_family: String,
}

impl Default for ClipProperties {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            opacity: 1.0,
            volume: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            blend_mode: BlendMode::Normal,
            grade: ColorGrade::default(),
            speed: 1.0,
            text: None,
            font_size: DEFAULT_FONT_SIZE,
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }
}

/// A clip placed on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Unique identifier
    pub id: Uuid,
    /// The track this clip is on
    pub track_id: TrackId,
    /// Display name (also the rendered string for text clips)
    pub name: String,
    pub kind: MediaKind,
    /// Start time on the timeline in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Trim-in time in seconds (offset into source media)
    #[serde(default)]
    pub offset: f64,
    /// Reference to the asset this clip uses; presets have none
    #[serde(default)]
    pub asset_id: Option<Uuid>,
    #[serde(default)]
    pub properties: ClipProperties,
}

impl Clip {
    /// Create a new clip
    pub fn new(
        track_id: TrackId,
        kind: MediaKind,
        name: impl Into<String>,
        start: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            track_id,
            name: name.into(),
            kind,
            start: start.max(0.0),
            duration,
            offset: 0.0,
            asset_id: None,
            properties: ClipProperties::default(),
        }
    }

    /// Get the end time of this clip
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Active clips cover the half-open interval `[start, end)`.
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }

    /// Check if this clip overlaps with a time range
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end && self.end() > start
    }

    /// String drawn for text clips.
    pub fn display_text(&self) -> &str {
        self.properties.text.as_deref().unwrap_or(&self.name)
    }
}

/// Partial clip update sent by the inspector or produced by a drag.
///
/// Every field is optional; missing fields leave the clip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClipPatch {
    pub name: Option<String>,
    pub start: Option<f64>,
    pub duration: Option<f64>,
    pub offset: Option<f64>,

    pub x: Option<f32>,
    pub y: Option<f32>,
    pub scale: Option<f32>,
    pub rotation: Option<f32>,
    pub opacity: Option<f32>,
    pub volume: Option<f32>,
    pub fade_in: Option<f64>,
    pub fade_out: Option<f64>,
    pub blend_mode: Option<BlendMode>,
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub hue: Option<f32>,
    pub blur: Option<f32>,
    pub speed: Option<f64>,

    pub text: Option<String>,
    pub font_size: Option<f32>,
    pub text_color: Option<String>,
    pub font_family: Option<String>,
}

fn assign<T: PartialEq>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) if *slot != value => {
            *slot = value;
            true
        }
        _ => false,
    }
}

impl ClipPatch {
    /// A patch that only moves the clip on the canvas.
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Timing fields present in this patch.
    pub fn touches_timing(&self) -> bool {
        self.start.is_some() || self.duration.is_some() || self.offset.is_some()
    }

    /// Merge into `clip`. Returns true if any field actually changed.
    pub fn apply(&self, clip: &mut Clip) -> bool {
        let props = &mut clip.properties;
        let mut changed = false;
        changed |= assign(&mut clip.name, self.name.clone());
        changed |= assign(&mut clip.start, self.start.map(|start| start.max(0.0)));
        changed |= assign(
            &mut clip.duration,
            self.duration.map(|duration| duration.max(MIN_CLIP_DURATION_SECONDS)),
        );
        changed |= assign(&mut clip.offset, self.offset.map(|offset| offset.max(0.0)));

        changed |= assign(&mut props.x, self.x);
        changed |= assign(&mut props.y, self.y);
        changed |= assign(&mut props.scale, self.scale);
        changed |= assign(&mut props.rotation, self.rotation);
        changed |= assign(&mut props.opacity, self.opacity.map(|o| o.clamp(0.0, 1.0)));
        changed |= assign(&mut props.volume, self.volume.map(|v| v.max(0.0)));
        changed |= assign(&mut props.fade_in, self.fade_in.map(|f| f.max(0.0)));
        changed |= assign(&mut props.fade_out, self.fade_out.map(|f| f.max(0.0)));
        changed |= assign(&mut props.blend_mode, self.blend_mode);
        changed |= assign(&mut props.grade.brightness, self.brightness);
        changed |= assign(&mut props.grade.contrast, self.contrast);
        changed |= assign(&mut props.grade.saturation, self.saturation);
        changed |= assign(&mut props.grade.hue, self.hue);
        changed |= assign(&mut props.grade.blur, self.blur.map(|b| b.max(0.0)));
        changed |= assign(&mut props.speed, self.speed.map(|s| s.max(MIN_PLAYBACK_SPEED)));

        changed |= assign(&mut props.text, self.text.clone().map(Some));
        changed |= assign(&mut props.font_size, self.font_size);
        changed |= assign(&mut props.text_color, self.text_color.clone());
        changed |= assign(&mut props.font_family, self.font_family.clone());
        changed
    }
}
