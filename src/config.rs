//! Editor configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{
    CANVAS_HEIGHT, CANVAS_WIDTH, DEFAULT_TIMELINE_DURATION_SECONDS, EXPORT_FPS, HISTORY_LIMIT,
    PAUSED_DRIFT_TOLERANCE_SECONDS, PLAYING_DRIFT_TOLERANCE_SECONDS, PRODUCT_NAME, RENDER_FPS,
    TIMELINE_END_MARGIN_SECONDS,
};

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Logical canvas width in pixels
    pub canvas_width: u32,
    /// Logical canvas height in pixels
    pub canvas_height: u32,
    /// Preview render rate
    pub render_fps: u32,
    /// Export frame rate
    pub export_fps: u32,
    /// Maximum undo depth
    pub history_limit: usize,
    /// Space kept after the last clip, seconds
    pub timeline_margin_seconds: f64,
    /// Shortest timeline the editor reports, seconds
    pub min_timeline_seconds: f64,
    pub playing_drift_tolerance: f64,
    pub paused_drift_tolerance: f64,
    /// Directory export files are written to
    pub export_dir: PathBuf,
    /// Export files are named `<product_name>-export.<ext>`
    pub product_name: String,
    /// Font used for every text family instead of searching system fonts
    pub font_path: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            render_fps: RENDER_FPS,
            export_fps: EXPORT_FPS,
            history_limit: HISTORY_LIMIT,
            timeline_margin_seconds: TIMELINE_END_MARGIN_SECONDS,
            min_timeline_seconds: DEFAULT_TIMELINE_DURATION_SECONDS,
            playing_drift_tolerance: PLAYING_DRIFT_TOLERANCE_SECONDS,
            paused_drift_tolerance: PAUSED_DRIFT_TOLERANCE_SECONDS,
            export_dir: PathBuf::from("."),
            product_name: PRODUCT_NAME.to_string(),
            font_path: None,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, fallback: T) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(fallback)
}

impl EditorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source. Unset or unparsable
    /// values keep their defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            canvas_width: parsed(&lookup, "NEONCUT_CANVAS_WIDTH", defaults.canvas_width).max(1),
            canvas_height: parsed(&lookup, "NEONCUT_CANVAS_HEIGHT", defaults.canvas_height).max(1),
            render_fps: parsed(&lookup, "NEONCUT_RENDER_FPS", defaults.render_fps).max(1),
            export_fps: parsed(&lookup, "NEONCUT_EXPORT_FPS", defaults.export_fps).max(1),
            history_limit: parsed(&lookup, "NEONCUT_HISTORY_LIMIT", defaults.history_limit).max(1),
            timeline_margin_seconds: parsed(
                &lookup,
                "NEONCUT_TIMELINE_MARGIN_SECONDS",
                defaults.timeline_margin_seconds,
            ),
            min_timeline_seconds: parsed(
                &lookup,
                "NEONCUT_MIN_TIMELINE_SECONDS",
                defaults.min_timeline_seconds,
            ),
            playing_drift_tolerance: parsed(
                &lookup,
                "NEONCUT_PLAYING_DRIFT",
                defaults.playing_drift_tolerance,
            ),
            paused_drift_tolerance: parsed(
                &lookup,
                "NEONCUT_PAUSED_DRIFT",
                defaults.paused_drift_tolerance,
            ),
            export_dir: lookup("NEONCUT_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            product_name: lookup("NEONCUT_PRODUCT_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.product_name),
            font_path: lookup("NEONCUT_FONT_PATH")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Logical canvas size as floats.
    pub fn canvas_size(&self) -> (f32, f32) {
        (self.canvas_width as f32, self.canvas_height as f32)
    }

    /// Final export path for a sink producing files with `extension`.
    pub fn export_path(&self, extension: &str) -> PathBuf {
        self.export_dir
            .join(format!("{}-export.{}", self.product_name, extension))
    }
}
