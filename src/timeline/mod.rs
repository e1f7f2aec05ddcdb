//! Timeline view state: zoom, pixel/time mapping, ruler seeks and clip
//! dragging with snapping.

mod drag;
mod snap;

pub use drag::{ClipPreview, DragMode, TimelineDrag};
pub use snap::{
    best_snap_delta, collect_targets, snap_clip_start, threshold_seconds, SnapMatch, SnapTarget,
    SnapTargetKind,
};

use crate::constants::{TIMELINE_DEFAULT_ZOOM, TIMELINE_MAX_ZOOM, TIMELINE_MIN_ZOOM, TIMELINE_ZOOM_STEP};

/// Clamp a zoom level (px per second) to the supported range.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(TIMELINE_MIN_ZOOM, TIMELINE_MAX_ZOOM)
    } else {
        TIMELINE_DEFAULT_ZOOM
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineView {
    zoom: f64,
}

impl Default for TimelineView {
    fn default() -> Self {
        Self {
            zoom: TIMELINE_DEFAULT_ZOOM,
        }
    }
}

impl TimelineView {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = clamp_zoom(zoom);
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_zoom(self.zoom + TIMELINE_ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_zoom(self.zoom - TIMELINE_ZOOM_STEP)
    }

    pub fn time_to_px(&self, time: f64) -> f64 {
        time * self.zoom
    }

    pub fn px_to_time(&self, x: f64) -> f64 {
        (x / self.zoom).max(0.0)
    }

    /// Width of the track area for a timeline of `duration` seconds.
    pub fn content_width(&self, duration: f64) -> f64 {
        (duration * self.zoom).max(0.0)
    }

    /// Time under a click on the ruler, clamped to the timeline.
    pub fn ruler_seek(&self, x: f64, duration: f64) -> f64 {
        crate::utils::clamp_finite(x / self.zoom, 0.0, duration.max(0.0))
    }
}
