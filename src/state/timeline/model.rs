use uuid::Uuid;

use super::{Clip, ClipPatch, ClipProperties, Track, TrackId, TrackKind};
use crate::constants::{
    DEFAULT_TIMELINE_DURATION_SECONDS, MIN_CLIP_DURATION_SECONDS, TIMELINE_END_MARGIN_SECONDS,
};
use crate::error::{EditorError, EditorResult};
use crate::state::{MediaAsset, MediaKind};

/// A clip description that does not come from a library asset (text presets,
/// stickers, stock audio).
#[derive(Debug, Clone, PartialEq)]
pub struct ClipTemplate {
    pub name: String,
    pub kind: MediaKind,
    pub duration: f64,
    pub properties: ClipProperties,
}

/// What a new clip is created from.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipSource {
    /// An asset already registered with `add_asset`.
    Asset(Uuid),
    Preset(ClipTemplate),
}

/// Authoritative tracks, clips and the asset library for one edit.
#[derive(Debug, Clone)]
pub struct TimelineModel {
    /// All tracks (ordered top to bottom in the panel)
    tracks: Vec<Track>,
    /// All clips placed on tracks, in insertion order
    clips: Vec<Clip>,
    /// All assets known to the editor
    assets: Vec<MediaAsset>,
    /// Empty space kept after the last clip
    end_margin: f64,
    /// Floor for the reported timeline duration
    min_duration: f64,
}

impl Default for TimelineModel {
    fn default() -> Self {
        Self::with_tracks(Track::defaults())
    }
}

impl TimelineModel {
    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            clips: Vec::new(),
            assets: Vec::new(),
            end_margin: TIMELINE_END_MARGIN_SECONDS,
            min_duration: DEFAULT_TIMELINE_DURATION_SECONDS,
        }
    }

    /// Override the end margin and the duration floor.
    pub fn with_duration_limits(mut self, end_margin: f64, min_duration: f64) -> Self {
        self.end_margin = end_margin.max(0.0);
        self.min_duration = min_duration.max(0.0);
        self
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn assets(&self) -> &[MediaAsset] {
        &self.assets
    }

    /// Find a track by ID
    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| &track.id == id)
    }

    /// Find a clip by ID
    pub fn clip(&self, id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|clip| clip.id == id)
    }

    pub fn contains_clip(&self, id: Uuid) -> bool {
        self.clip(id).is_some()
    }

    /// Find an asset by ID
    pub fn asset(&self, id: Uuid) -> Option<&MediaAsset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    /// Asset backing a clip, if any.
    pub fn clip_asset(&self, clip: &Clip) -> Option<&MediaAsset> {
        clip.asset_id.and_then(|id| self.asset(id))
    }

    /// Total timeline duration: the last clip end plus the margin, never
    /// below the configured floor.
    pub fn duration(&self) -> f64 {
        let clip_end = self.clips.iter().map(Clip::end).fold(0.0, f64::max);
        (clip_end + self.end_margin).max(self.min_duration)
    }

    /// Clips covering `time`, sorted by track id (the compositing z-order).
    ///
    /// Clips on the same track keep their insertion order.
    pub fn active_clips(&self, time: f64) -> Vec<&Clip> {
        let mut active: Vec<&Clip> = self
            .clips
            .iter()
            .filter(|clip| clip.is_active_at(time))
            .collect();
        active.sort_by(|a, b| a.track_id.cmp(&b.track_id));
        active
    }

    /// Clips on a track, in insertion order
    pub fn clips_on_track(&self, track_id: &TrackId) -> Vec<&Clip> {
        self.clips
            .iter()
            .filter(|clip| &clip.track_id == track_id)
            .collect()
    }

    pub fn is_track_locked(&self, track_id: &TrackId) -> bool {
        self.track(track_id).is_some_and(|track| track.locked)
    }

    pub fn is_track_muted(&self, track_id: &TrackId) -> bool {
        self.track(track_id).is_some_and(|track| track.muted)
    }

    /// Mute or unmute a track. Returns whether the flag changed.
    pub fn set_track_muted(&mut self, track_id: &TrackId, muted: bool) -> EditorResult<bool> {
        let track = self.track_mut(track_id)?;
        let changed = track.muted != muted;
        track.muted = muted;
        Ok(changed)
    }

    /// Lock or unlock a track. Returns whether the flag changed.
    pub fn set_track_locked(&mut self, track_id: &TrackId, locked: bool) -> EditorResult<bool> {
        let track = self.track_mut(track_id)?;
        let changed = track.locked != locked;
        track.locked = locked;
        Ok(changed)
    }

    fn track_mut(&mut self, track_id: &TrackId) -> EditorResult<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| &track.id == track_id)
            .ok_or_else(|| EditorError::UnknownTrack(track_id.clone()))
    }

    /// Register an asset with the library
    pub fn add_asset(&mut self, asset: MediaAsset) -> Uuid {
        let id = asset.id;
        tracing::debug!(asset_id = %id, name = %asset.name, kind = ?asset.kind, "Asset added");
        self.assets.push(asset);
        id
    }

    /// Create a clip from `source` at `start` on the first track that accepts it.
    pub fn add_clip(&mut self, source: ClipSource, start: f64) -> EditorResult<Uuid> {
        let kind = self.source_kind(&source)?;
        let track_id = self
            .tracks
            .iter()
            .find(|track| track.kind.accepts(kind))
            .map(|track| track.id.clone())
            .ok_or(EditorError::NoCompatibleTrack(kind))?;
        self.add_clip_on_track(source, &track_id, start)
    }

    /// Create a clip from `source` at `start` on a specific track.
    pub fn add_clip_on_track(
        &mut self,
        source: ClipSource,
        track_id: &TrackId,
        start: f64,
    ) -> EditorResult<Uuid> {
        let clip = match source {
            ClipSource::Asset(asset_id) => {
                let asset = self
                    .asset(asset_id)
                    .ok_or(EditorError::UnknownAsset(asset_id))?;
                let mut clip = Clip::new(
                    track_id.clone(),
                    asset.kind,
                    asset.name.clone(),
                    start,
                    asset.native_duration,
                );
                clip.asset_id = Some(asset_id);
                clip
            }
            ClipSource::Preset(template) => {
                let mut clip = Clip::new(
                    track_id.clone(),
                    template.kind,
                    template.name,
                    start,
                    template.duration,
                );
                clip.properties = template.properties;
                clip
            }
        };
        self.insert_clip(clip)
    }

    /// Insert a fully built clip after validating its track and timing.
    pub fn insert_clip(&mut self, clip: Clip) -> EditorResult<Uuid> {
        let track = self
            .track(&clip.track_id)
            .ok_or_else(|| EditorError::UnknownTrack(clip.track_id.clone()))?;
        if track.locked {
            return Err(EditorError::TrackLocked(track.id.clone()));
        }
        if !track.kind.accepts(clip.kind) {
            return Err(EditorError::KindMismatch {
                clip: clip.kind,
                track: track.kind,
            });
        }
        if !(clip.duration > 0.0) || clip.start < 0.0 {
            return Err(EditorError::InvalidTiming(format!(
                "start {} duration {}",
                clip.start, clip.duration
            )));
        }

        let id = clip.id;
        tracing::debug!(clip_id = %id, track = %clip.track_id, start = clip.start, "Clip added");
        self.clips.push(clip);
        Ok(id)
    }

    fn source_kind(&self, source: &ClipSource) -> EditorResult<MediaKind> {
        match source {
            ClipSource::Asset(id) => self
                .asset(*id)
                .map(|asset| asset.kind)
                .ok_or(EditorError::UnknownAsset(*id)),
            ClipSource::Preset(template) => Ok(template.kind),
        }
    }

    /// Upper bound on `offset + duration` for clips backed by trimmable media.
    fn source_limit(&self, clip: &Clip) -> Option<f64> {
        self.clip_asset(clip)
            .filter(|asset| asset.is_trimmable())
            .map(|asset| asset.native_duration)
            .filter(|duration| *duration > 0.0)
    }

    /// Merge a partial update into a clip. Returns true if anything changed;
    /// an empty patch or an unknown id is a no-op.
    pub fn update_clip(&mut self, id: Uuid, patch: &ClipPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        let Some(index) = self.clips.iter().position(|clip| clip.id == id) else {
            return false;
        };
        let limit = self.source_limit(&self.clips[index]);
        let clip = &mut self.clips[index];
        let mut changed = patch.apply(clip);
        if patch.touches_timing() {
            if let Some(limit) = limit {
                changed |= clamp_to_source(clip, limit);
            }
        }
        if changed {
            tracing::debug!(clip_id = %id, "Clip updated");
        }
        changed
    }

    /// Remove a clip by ID
    pub fn delete_clip(&mut self, id: Uuid) -> bool {
        let len = self.clips.len();
        self.clips.retain(|clip| clip.id != id);
        let removed = self.clips.len() < len;
        if removed {
            tracing::debug!(clip_id = %id, "Clip deleted");
        }
        removed
    }

    /// Remove a clip and pull later clips on the same track left by its duration.
    /// A clip that overlapped the removed one stops at zero.
    pub fn ripple_delete_clip(&mut self, id: Uuid) -> bool {
        let Some(index) = self.clips.iter().position(|clip| clip.id == id) else {
            return false;
        };
        let removed = self.clips.remove(index);
        for clip in self
            .clips
            .iter_mut()
            .filter(|clip| clip.track_id == removed.track_id && clip.start > removed.start)
        {
            clip.start = (clip.start - removed.duration).max(0.0);
        }
        tracing::debug!(clip_id = %id, shift = removed.duration, "Clip ripple deleted");
        true
    }

    /// Cut a clip in two at `at`. The left half keeps the id; the right half is
    /// appended with a fresh id, which is returned.
    ///
    /// Does nothing unless `start < at < end`.
    pub fn split_clip(&mut self, id: Uuid, at: f64) -> Option<Uuid> {
        let index = self.clips.iter().position(|clip| clip.id == id)?;
        let clip = &mut self.clips[index];
        if !(at > clip.start && at < clip.end()) {
            return None;
        }

        let left = at - clip.start;
        let mut right = clip.clone();
        right.id = Uuid::new_v4();
        right.start = at;
        right.duration = clip.duration - left;
        right.offset = clip.offset + left;
        clip.duration = left;

        let right_id = right.id;
        tracing::debug!(clip_id = %id, new_clip_id = %right_id, at, "Clip split");
        self.clips.push(right);
        Some(right_id)
    }

    /// Move a clip to a new start time
    pub fn move_clip(&mut self, id: Uuid, new_start: f64) -> bool {
        let Some(clip) = self.clips.iter_mut().find(|clip| clip.id == id) else {
            return false;
        };
        let new_start = new_start.max(0.0);
        if clip.start == new_start {
            return false;
        }
        clip.start = new_start;
        true
    }

    /// Drag the left edge to `time`. The source offset follows the edge so the
    /// remaining frames stay in place.
    pub fn trim_start(&mut self, id: Uuid, time: f64) -> bool {
        let Some(index) = self.clips.iter().position(|clip| clip.id == id) else {
            return false;
        };
        let trimmable = self.source_limit(&self.clips[index]).is_some();
        let clip = &mut self.clips[index];

        let max_time = clip.end() - MIN_CLIP_DURATION_SECONDS;
        // Media cannot be extended before its first frame.
        let min_time = if trimmable {
            (clip.start - clip.offset).max(0.0)
        } else {
            0.0
        };
        let time = time.clamp(min_time, max_time.max(min_time));
        let delta = time - clip.start;
        if delta == 0.0 {
            return false;
        }
        clip.start = time;
        clip.duration -= delta;
        clip.offset = (clip.offset + delta).max(0.0);
        true
    }

    /// Drag the right edge to `time`, keeping at least the minimum length and
    /// staying inside the source for trimmable media.
    pub fn trim_end(&mut self, id: Uuid, time: f64) -> bool {
        let Some(index) = self.clips.iter().position(|clip| clip.id == id) else {
            return false;
        };
        let limit = self.source_limit(&self.clips[index]);
        let clip = &mut self.clips[index];

        let mut duration = (time - clip.start).max(MIN_CLIP_DURATION_SECONDS);
        if let Some(limit) = limit {
            duration = duration.min((limit - clip.offset).max(MIN_CLIP_DURATION_SECONDS));
        }
        if duration == clip.duration {
            return false;
        }
        clip.duration = duration;
        true
    }

    /// Snapshot of the clip list for history.
    pub fn snapshot(&self) -> Vec<Clip> {
        self.clips.clone()
    }

    /// Replace the clip list with a history snapshot.
    pub fn restore_clips(&mut self, clips: Vec<Clip>) {
        self.clips = clips;
    }
}

fn clamp_to_source(clip: &mut Clip, limit: f64) -> bool {
    let mut changed = false;
    let max_offset = (limit - MIN_CLIP_DURATION_SECONDS).max(0.0);
    if clip.offset > max_offset {
        clip.offset = max_offset;
        changed = true;
    }
    let max_duration = limit - clip.offset;
    if clip.duration > max_duration {
        clip.duration = max_duration;
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MediaAsset;

    fn video_model() -> (TimelineModel, Uuid) {
        let mut model = TimelineModel::default();
        let asset = model.add_asset(MediaAsset::from_file("take.mp4", Some(20.0)));
        (model, asset)
    }

    fn text_template(duration: f64) -> ClipTemplate {
        ClipTemplate {
            name: "Title".to_string(),
            kind: MediaKind::Text,
            duration,
            properties: ClipProperties::default(),
        }
    }

    #[test]
    fn test_default_tracks() {
        let model = TimelineModel::default();
        let ids: Vec<&str> = model.tracks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert_eq!(model.tracks()[1].kind, TrackKind::Video);
        assert_eq!(model.duration(), DEFAULT_TIMELINE_DURATION_SECONDS);
    }

    #[test]
    fn test_add_clip_places_on_matching_track() {
        let (mut model, asset) = video_model();
        let id = model.add_clip(ClipSource::Asset(asset), 3.0).unwrap();
        let clip = model.clip(id).unwrap();
        assert_eq!(clip.track_id.as_str(), "t2");
        assert_eq!(clip.start, 3.0);
        assert_eq!(clip.duration, 20.0);
        assert_eq!(clip.asset_id, Some(asset));

        let text = model
            .add_clip(ClipSource::Preset(text_template(5.0)), 0.0)
            .unwrap();
        assert_eq!(model.clip(text).unwrap().track_id.as_str(), "t1");
    }

    #[test]
    fn test_add_clip_errors() {
        let mut model = TimelineModel::with_tracks(vec![Track::new("t1", "Text", TrackKind::Text)]);
        let audio = model.add_asset(MediaAsset::silent_audio("Drone", 10.0));
        assert_eq!(
            model.add_clip(ClipSource::Asset(audio), 0.0),
            Err(EditorError::NoCompatibleTrack(MediaKind::Audio))
        );
        assert_eq!(
            model.add_clip_on_track(ClipSource::Asset(audio), &TrackId::from("t1"), 0.0),
            Err(EditorError::KindMismatch {
                clip: MediaKind::Audio,
                track: TrackKind::Text
            })
        );

        model.set_track_locked(&TrackId::from("t1"), true).unwrap();
        assert_eq!(
            model.add_clip(ClipSource::Preset(text_template(5.0)), 0.0),
            Err(EditorError::TrackLocked(TrackId::from("t1")))
        );
        assert!(model.clips().is_empty());
    }

    #[test]
    fn test_update_clip_idempotent() {
        let (mut model, asset) = video_model();
        let id = model.add_clip(ClipSource::Asset(asset), 0.0).unwrap();
        let patch = ClipPatch {
            opacity: Some(0.4),
            scale: Some(2.0),
            ..Default::default()
        };
        assert!(model.update_clip(id, &patch));
        let once = model.snapshot();
        assert!(!model.update_clip(id, &patch));
        assert_eq!(model.snapshot(), once);

        assert!(!model.update_clip(id, &ClipPatch::default()));
        assert!(!model.update_clip(Uuid::new_v4(), &patch));
    }

    #[test]
    fn test_update_clip_respects_source_bounds() {
        let (mut model, asset) = video_model();
        let id = model.add_clip(ClipSource::Asset(asset), 0.0).unwrap();
        model.update_clip(
            id,
            &ClipPatch {
                offset: Some(15.0),
                ..Default::default()
            },
        );
        let clip = model.clip(id).unwrap();
        assert_eq!(clip.offset, 15.0);
        assert!((clip.offset + clip.duration - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_clip() {
        let mut model = TimelineModel::default();
        let mut clip = Clip::new(TrackId::from("t2"), MediaKind::Video, "A", 5.0, 10.0);
        clip.offset = 1.0;
        let id = model.insert_clip(clip).unwrap();

        let right = model.split_clip(id, 9.0).unwrap();
        let a = model.clip(id).unwrap();
        let b = model.clip(right).unwrap();
        assert_eq!((a.start, a.duration, a.offset), (5.0, 4.0, 1.0));
        assert_eq!((b.start, b.duration, b.offset), (9.0, 6.0, 5.0));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_split_outside_bounds_is_noop() {
        let mut model = TimelineModel::default();
        let id = model
            .insert_clip(Clip::new(TrackId::from("t2"), MediaKind::Video, "A", 5.0, 10.0))
            .unwrap();
        let before = model.snapshot();
        assert!(model.split_clip(id, 5.0).is_none());
        assert!(model.split_clip(id, 15.0).is_none());
        assert!(model.split_clip(id, 20.0).is_none());
        assert_eq!(model.snapshot(), before);
    }

    #[test]
    fn test_ripple_delete_shifts_later_clips_on_same_track() {
        let mut model = TimelineModel::default();
        let track = TrackId::from("t2");
        let before = model
            .insert_clip(Clip::new(track.clone(), MediaKind::Video, "Intro", 0.0, 2.0))
            .unwrap();
        let a = model
            .insert_clip(Clip::new(track.clone(), MediaKind::Video, "A", 2.0, 4.0))
            .unwrap();
        let level = model
            .insert_clip(Clip::new(track.clone(), MediaKind::Video, "Level", 2.0, 1.0))
            .unwrap();
        let b = model
            .insert_clip(Clip::new(track.clone(), MediaKind::Video, "B", 6.0, 3.0))
            .unwrap();
        let c = model
            .insert_clip(Clip::new(track.clone(), MediaKind::Video, "C", 12.0, 2.0))
            .unwrap();
        let other = model
            .insert_clip(Clip::new(TrackId::from("t1"), MediaKind::Text, "T", 6.0, 2.0))
            .unwrap();

        assert!(model.ripple_delete_clip(a));
        assert!(model.clip(a).is_none());
        // Clips starting at or before the removed start stay put.
        assert_eq!(model.clip(before).unwrap().start, 0.0);
        assert_eq!(model.clip(level).unwrap().start, 2.0);
        assert_eq!(model.clip(b).unwrap().start, 2.0);
        assert_eq!(model.clip(c).unwrap().start, 8.0);
        assert_eq!(model.clip(other).unwrap().start, 6.0);
        assert!(!model.ripple_delete_clip(a));
    }

    #[test]
    fn test_ripple_delete_stops_overlapping_clip_at_zero() {
        let mut model = TimelineModel::default();
        let track = TrackId::from("t2");
        let long = model
            .insert_clip(Clip::new(track.clone(), MediaKind::Video, "Long", 0.0, 5.0))
            .unwrap();
        let overlap = model
            .insert_clip(Clip::new(track, MediaKind::Video, "Overlap", 3.0, 4.0))
            .unwrap();

        assert!(model.ripple_delete_clip(long));
        // 3 - 5 would be negative; starts never go below zero.
        assert_eq!(model.clip(overlap).unwrap().start, 0.0);
        assert_eq!(model.clip(overlap).unwrap().duration, 4.0);
    }

    #[test]
    fn test_duration_tracks_last_clip_end() {
        let mut model = TimelineModel::default();
        model
            .insert_clip(Clip::new(TrackId::from("t2"), MediaKind::Video, "A", 40.0, 10.0))
            .unwrap();
        assert_eq!(model.duration(), 55.0);

        let short = TimelineModel::default().with_duration_limits(0.0, 0.0);
        assert_eq!(short.duration(), 0.0);
    }

    #[test]
    fn test_active_clips_sorted_by_track_id() {
        let mut model = TimelineModel::default();
        let text = model
            .insert_clip(Clip::new(TrackId::from("t1"), MediaKind::Text, "T", 0.0, 10.0))
            .unwrap();
        let video = model
            .insert_clip(Clip::new(TrackId::from("t2"), MediaKind::Video, "V", 0.0, 10.0))
            .unwrap();
        // Inserted after t2 but still below it.
        let text_late = model
            .insert_clip(Clip::new(TrackId::from("t1"), MediaKind::Text, "T2", 2.0, 3.0))
            .unwrap();

        let order: Vec<Uuid> = model.active_clips(2.5).iter().map(|c| c.id).collect();
        assert_eq!(order, vec![text, text_late, video]);
        assert!(model.active_clips(10.0).is_empty());
    }

    #[test]
    fn test_trim_handles_keep_minimum_length() {
        let (mut model, asset) = video_model();
        let id = model.add_clip(ClipSource::Asset(asset), 2.0).unwrap();
        model.trim_end(id, 6.0);
        assert_eq!(model.clip(id).unwrap().duration, 4.0);

        assert!(model.trim_start(id, 100.0));
        let clip = model.clip(id).unwrap();
        assert!((clip.duration - MIN_CLIP_DURATION_SECONDS).abs() < 1e-9);
        assert!((clip.offset - (4.0 - MIN_CLIP_DURATION_SECONDS)).abs() < 1e-9);

        // Dragging the left edge back cannot reach before the first source frame.
        model.trim_start(id, 0.0);
        let clip = model.clip(id).unwrap();
        assert!((clip.start - 2.0).abs() < 1e-9);
        assert!(clip.offset.abs() < 1e-9);

        model.trim_end(id, 100.0);
        let clip = model.clip(id).unwrap();
        assert!((clip.offset + clip.duration - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_move_clip_clamps_to_zero() {
        let mut model = TimelineModel::default();
        let id = model
            .add_clip(ClipSource::Preset(text_template(5.0)), 4.0)
            .unwrap();
        assert!(model.move_clip(id, -3.0));
        assert_eq!(model.clip(id).unwrap().start, 0.0);
        assert!(!model.move_clip(id, 0.0));
    }
}
