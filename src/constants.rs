//! Shared editor constants: canvas geometry, timing tolerances and limits.

/// Logical canvas width. Pointer input and clip positions live in this space.
pub const CANVAS_WIDTH: u32 = 1920;
/// Logical canvas height.
pub const CANVAS_HEIGHT: u32 = 1080;

pub const HISTORY_LIMIT: usize = 20;

pub const TIMELINE_END_MARGIN_SECONDS: f64 = 5.0;
pub const DEFAULT_TIMELINE_DURATION_SECONDS: f64 = 30.0;
pub const MIN_CLIP_DURATION_SECONDS: f64 = 0.1;
/// Slowest playback speed a clip can be set to.
pub const MIN_PLAYBACK_SPEED: f64 = 0.1;

pub const DEFAULT_IMAGE_DURATION_SECONDS: f64 = 5.0;
pub const DEFAULT_MEDIA_DURATION_SECONDS: f64 = 10.0;
pub const DEFAULT_PRESET_DURATION_SECONDS: f64 = 5.0;
pub const STICKER_DURATION_SECONDS: f64 = 3.0;

/// Drift allowed between a media handle and its target before a seek while playing.
pub const PLAYING_DRIFT_TOLERANCE_SECONDS: f64 = 0.4;
/// Drift allowed while paused. Scrubbing needs to land close to the playhead.
pub const PAUSED_DRIFT_TOLERANCE_SECONDS: f64 = 0.05;

pub const HIT_BOX_MEDIA: (f32, f32) = (400.0, 400.0);
pub const HIT_BOX_TEXT: (f32, f32) = (600.0, 200.0);

pub const DEFAULT_FONT_SIZE: f32 = 120.0;
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const TEXT_BOX_PADDING: f32 = 40.0;
pub const TEXT_LINE_HEIGHT: f32 = 1.2;
/// Rough advance width per glyph when no font is loaded.
pub const FALLBACK_GLYPH_WIDTH: f32 = 0.6;

pub const TEXT_SHADOW_ALPHA: f32 = 0.7;
pub const TEXT_SHADOW_BLUR: f32 = 8.0;
pub const TEXT_SHADOW_OFFSET: f32 = 2.0;

pub const MEDIA_SELECTION_LINE_WIDTH: f32 = 4.0;
pub const MEDIA_SELECTION_DASH: f32 = 10.0;
pub const TEXT_SELECTION_LINE_WIDTH: f32 = 2.0;
pub const TEXT_SELECTION_DASH: f32 = 5.0;

pub const TIMELINE_MIN_ZOOM: f64 = 10.0;
pub const TIMELINE_MAX_ZOOM: f64 = 200.0;
pub const TIMELINE_DEFAULT_ZOOM: f64 = 50.0;
pub const TIMELINE_ZOOM_STEP: f64 = 10.0;
/// Snap distance on the timeline, in pixels at the current zoom.
pub const SNAP_THRESHOLD_PX: f64 = 15.0;

pub const PLAYBACK_TICK_INTERVAL_MS: u64 = 16;
pub const RENDER_FPS: u32 = 60;
pub const EXPORT_FPS: u32 = 30;
/// Frame rate used for the `HH:MM:SS:FF` readout.
pub const TIMECODE_FPS: f64 = 30.0;

pub const PRODUCT_NAME: &str = "neoncut";
