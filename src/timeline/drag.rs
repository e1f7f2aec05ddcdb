use uuid::Uuid;

use super::snap::{snap_clip_start, threshold_seconds, SnapTarget};
use crate::constants::{MIN_CLIP_DURATION_SECONDS, SNAP_THRESHOLD_PX};
use crate::state::TimelineModel;

/// Which part of a clip is being dragged on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    TrimStart,
    TrimEnd,
}

/// Where the clip would land if the drag ended now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPreview {
    pub start: f64,
    pub duration: f64,
    /// Time of the snap guide to show, if snapped.
    pub snap_time: Option<f64>,
}

impl ClipPreview {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// An in-progress timeline drag. The model is only touched on `commit`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineDrag {
    clip_id: Uuid,
    mode: DragMode,
    pointer_x: f64,
    start: f64,
    duration: f64,
    preview: ClipPreview,
}

impl TimelineDrag {
    /// Start dragging a clip. None when the clip is gone or its track is locked.
    pub fn begin(model: &TimelineModel, clip_id: Uuid, mode: DragMode, pointer_x: f64) -> Option<Self> {
        let clip = model.clip(clip_id)?;
        if model.is_track_locked(&clip.track_id) {
            return None;
        }
        Some(Self {
            clip_id,
            mode,
            pointer_x,
            start: clip.start,
            duration: clip.duration,
            preview: ClipPreview {
                start: clip.start,
                duration: clip.duration,
                snap_time: None,
            },
        })
    }

    pub fn clip_id(&self) -> Uuid {
        self.clip_id
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    pub fn preview(&self) -> ClipPreview {
        self.preview
    }

    /// Recompute the preview for a pointer at `pointer_x` (px) at `zoom` px/s.
    pub fn update(&mut self, pointer_x: f64, zoom: f64, targets: &[SnapTarget]) -> ClipPreview {
        let delta = if zoom > 0.0 {
            (pointer_x - self.pointer_x) / zoom
        } else {
            0.0
        };
        let end = self.start + self.duration;
        self.preview = match self.mode {
            DragMode::Move => {
                let threshold = threshold_seconds(SNAP_THRESHOLD_PX, zoom);
                let (start, hit) = snap_clip_start(self.start + delta, self.duration, targets, threshold);
                ClipPreview {
                    start,
                    duration: self.duration,
                    snap_time: hit.map(|hit| hit.target.time),
                }
            }
            DragMode::TrimStart => {
                let max_time = end - MIN_CLIP_DURATION_SECONDS;
                let time = (self.start + delta).max(0.0).min(max_time);
                ClipPreview {
                    start: time,
                    duration: end - time,
                    snap_time: None,
                }
            }
            DragMode::TrimEnd => {
                let time = (end + delta).max(self.start + MIN_CLIP_DURATION_SECONDS);
                ClipPreview {
                    start: self.start,
                    duration: time - self.start,
                    snap_time: None,
                }
            }
        };
        self.preview
    }

    /// Apply the previewed change. Returns whether the model changed.
    pub fn commit(&self, model: &mut TimelineModel) -> bool {
        let changed = match self.mode {
            DragMode::Move => model.move_clip(self.clip_id, self.preview.start),
            DragMode::TrimStart => model.trim_start(self.clip_id, self.preview.start),
            DragMode::TrimEnd => model.trim_end(self.clip_id, self.preview.end()),
        };
        if changed {
            tracing::debug!(clip_id = %self.clip_id, mode = ?self.mode, "Timeline drag committed");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{presets, ClipSource, TrackId};
    use crate::timeline::snap::collect_targets;

    fn model_with_two_clips() -> (TimelineModel, Uuid, Uuid) {
        let mut model = TimelineModel::default();
        let template = presets::TEXT_PRESETS[0].template();
        let a = model.add_clip(ClipSource::Preset(template.clone()), 0.0).unwrap();
        let b = model.add_clip(ClipSource::Preset(template), 10.0).unwrap();
        (model, a, b)
    }

    #[test]
    fn test_move_snaps_to_neighbour_edge() {
        let (mut model, a, b) = model_with_two_clips();
        let mut drag = TimelineDrag::begin(&model, b, DragMode::Move, 500.0).unwrap();
        let targets = collect_targets(&model, 20.0, Some(b));
        // 10s -> 4.8s at 50 px/s lands within 0.3s of the end of clip a.
        let preview = drag.update(240.0, 50.0, &targets);
        assert_eq!(preview.start, 5.0);
        assert_eq!(preview.snap_time, Some(5.0));
        assert!(drag.commit(&mut model));
        assert_eq!(model.clip(b).unwrap().start, 5.0);
        assert_eq!(model.clip(a).unwrap().start, 0.0);
    }

    #[test]
    fn test_trim_handles_keep_minimum_length() {
        let (mut model, a, _) = model_with_two_clips();
        let mut drag = TimelineDrag::begin(&model, a, DragMode::TrimEnd, 250.0).unwrap();
        let preview = drag.update(-1000.0, 50.0, &[]);
        assert!((preview.duration - MIN_CLIP_DURATION_SECONDS).abs() < 1e-9);
        assert!(drag.commit(&mut model));
        assert!((model.clip(a).unwrap().duration - MIN_CLIP_DURATION_SECONDS).abs() < 1e-9);

        let mut drag = TimelineDrag::begin(&model, a, DragMode::TrimStart, 0.0).unwrap();
        let preview = drag.update(1000.0, 50.0, &[]);
        assert!(preview.duration >= MIN_CLIP_DURATION_SECONDS - 1e-9);
    }

    #[test]
    fn test_locked_track_refuses_drag() {
        let (mut model, a, _) = model_with_two_clips();
        model.set_track_locked(&TrackId::from("t1"), true).unwrap();
        assert!(TimelineDrag::begin(&model, a, DragMode::Move, 0.0).is_none());
    }
}
