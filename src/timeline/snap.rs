use uuid::Uuid;

use crate::state::TimelineModel;

/// Category of snap target used for tie-breaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapTargetKind {
    /// Clip start or end edge.
    ClipEdge,
    /// Playhead position.
    Playhead,
    /// The start of the timeline.
    Origin,
}

impl SnapTargetKind {
    /// Priority for tie-breaking when distances are equal.
    pub fn priority(self) -> i32 {
        match self {
            SnapTargetKind::ClipEdge => 3,
            SnapTargetKind::Playhead => 2,
            SnapTargetKind::Origin => 1,
        }
    }
}

/// Snap target in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapTarget {
    pub time: f64,
    pub kind: SnapTargetKind,
    /// Clip id if this target comes from a clip edge.
    pub clip_id: Option<Uuid>,
}

impl SnapTarget {
    pub fn clip_edge(time: f64, clip_id: Uuid) -> Self {
        Self {
            time,
            kind: SnapTargetKind::ClipEdge,
            clip_id: Some(clip_id),
        }
    }

    pub fn playhead(time: f64) -> Self {
        Self {
            time,
            kind: SnapTargetKind::Playhead,
            clip_id: None,
        }
    }

    pub fn origin() -> Self {
        Self {
            time: 0.0,
            kind: SnapTargetKind::Origin,
            clip_id: None,
        }
    }
}

/// Result of a snap query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapMatch {
    /// Delta in seconds that should be applied to the source.
    pub delta: f64,
    /// The target that was snapped to.
    pub target: SnapTarget,
}

/// Timeline origin, the playhead and the edges of every clip except `exclude`.
pub fn collect_targets(model: &TimelineModel, playhead: f64, exclude: Option<Uuid>) -> Vec<SnapTarget> {
    let mut targets = vec![SnapTarget::origin(), SnapTarget::playhead(playhead)];
    for clip in model.clips() {
        if Some(clip.id) == exclude {
            continue;
        }
        targets.push(SnapTarget::clip_edge(clip.start, clip.id));
        targets.push(SnapTarget::clip_edge(clip.end(), clip.id));
    }
    targets
}

/// Snap distance in seconds for a pixel threshold at `zoom` px/s.
pub fn threshold_seconds(threshold_px: f64, zoom: f64) -> f64 {
    if zoom > 0.0 {
        threshold_px / zoom
    } else {
        0.0
    }
}

/// Find the best snap delta between sources and targets strictly within a threshold.
pub fn best_snap_delta(sources: &[f64], targets: &[SnapTarget], threshold: f64) -> Option<SnapMatch> {
    if sources.is_empty() || targets.is_empty() || threshold <= 0.0 {
        return None;
    }

    let mut best_match: Option<SnapMatch> = None;
    let mut best_distance = f64::INFINITY;
    let mut best_priority = i32::MIN;
    let epsilon = 1e-6;

    for &source in sources {
        for &target in targets {
            let delta = target.time - source;
            let distance = delta.abs();
            if distance >= threshold {
                continue;
            }
            let priority = target.kind.priority();
            let should_take = distance + epsilon < best_distance
                || ((distance - best_distance).abs() <= epsilon && priority > best_priority);
            if should_take {
                best_distance = distance;
                best_priority = priority;
                best_match = Some(SnapMatch { delta, target });
            }
        }
    }

    best_match
}

/// Snap a moving clip: its start edge is tried first, then its end edge.
/// Returns the adjusted start and the match, if any.
pub fn snap_clip_start(
    start: f64,
    duration: f64,
    targets: &[SnapTarget],
    threshold: f64,
) -> (f64, Option<SnapMatch>) {
    let start = start.max(0.0);
    let hit = best_snap_delta(&[start], targets, threshold)
        .or_else(|| best_snap_delta(&[start + duration], targets, threshold));
    match hit {
        Some(hit) => ((start + hit.delta).max(0.0), Some(hit)),
        None => (start, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_nearest_then_priority() {
        let clip = Uuid::new_v4();
        let targets = vec![
            SnapTarget::playhead(10.0),
            SnapTarget::clip_edge(10.0, clip),
            SnapTarget::clip_edge(10.2, clip),
        ];
        let hit = best_snap_delta(&[10.05], &targets, 0.3).unwrap();
        assert_eq!(hit.target.kind, SnapTargetKind::ClipEdge);
        assert!((hit.delta + 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let targets = vec![SnapTarget::playhead(5.0)];
        assert!(best_snap_delta(&[4.6], &targets, 0.3).is_none());
        assert!(best_snap_delta(&[4.8], &targets, 0.3).is_some());
    }

    #[test]
    fn test_start_edge_wins_over_end_edge() {
        let other = Uuid::new_v4();
        let targets = vec![SnapTarget::clip_edge(4.0, other), SnapTarget::clip_edge(12.0, other)];
        // Start is 0.2 from 4.0, end is 0.1 from 12.0; start is still tried first.
        let (start, hit) = snap_clip_start(4.2, 7.9, &targets, 0.3);
        assert_eq!(start, 4.0);
        assert_eq!(hit.unwrap().target.time, 4.0);

        let (start, _) = snap_clip_start(6.0, 5.9, &targets, 0.3);
        assert!((start - 6.1).abs() < 1e-9);
    }

    #[test]
    fn test_collect_targets_skips_dragged_clip() {
        let mut model = TimelineModel::default();
        let a = model
            .add_clip(
                crate::state::ClipSource::Preset(crate::state::presets::TEXT_PRESETS[0].template()),
                2.0,
            )
            .unwrap();
        let targets = collect_targets(&model, 1.5, Some(a));
        assert_eq!(targets.len(), 2);
        let targets = collect_targets(&model, 1.5, None);
        assert!(targets.iter().any(|t| t.time == 7.0 && t.clip_id == Some(a)));
        assert_eq!(threshold_seconds(15.0, 50.0), 0.3);
    }
}
