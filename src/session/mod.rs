//! Editor session: the single owner of timeline, history, transport and
//! render state. Every user command goes through here so history, the
//! asset cache and the transport stay consistent.

mod live;

pub use live::{EditorRuntime, FrameTask, LiveSession};

use std::path::PathBuf;

use image::RgbaImage;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::core::asset_cache::AssetCache;
use crate::core::compositor::{Compositor, FrameStats, RenderContext};
use crate::core::export::{open_sink, ExportFormat, ExportMode, ExportPipeline, FrameSink};
use crate::core::interaction::{InteractionController, PointerDown, ViewportRect};
use crate::core::media::{DecodedMediaLoader, MediaLoader};
use crate::core::playback::{PlaybackClock, TickOutcome};
use crate::core::surface::{FontBook, RasterSurface, Surface};
use crate::error::{EditorResult, ExportError, ExportResult};
use crate::hotkeys::{handle_hotkey, HotkeyAction, HotkeyContext, HotkeyResult, Key};
use crate::state::presets::{self, MotionEffect};
use crate::state::{
    Clip, ClipPatch, ClipSource, HistoryStack, MediaAsset, Selection, TimelineModel, TrackId,
};
use crate::timeline::{collect_targets, ClipPreview, DragMode, TimelineDrag, TimelineView};

/// Progress of a deterministic export after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStep {
    Idle,
    /// A frame was pushed; more remain.
    Running,
    /// The export ended; the outcome is in `take_export_result`.
    Finished,
}

pub struct EditorSession {
    config: EditorConfig,
    model: TimelineModel,
    history: HistoryStack<Vec<Clip>>,
    selection: Selection,
    clock: PlaybackClock,
    view: TimelineView,
    cache: AssetCache,
    compositor: Compositor,
    surface: RasterSurface,
    interaction: InteractionController,
    viewport: ViewportRect,
    timeline_drag: Option<TimelineDrag>,
    export: Option<ExportPipeline>,
    export_result: Option<ExportResult<PathBuf>>,
    last_stats: FrameStats,
    last_pump: Option<Instant>,
}

fn default_loader(config: &EditorConfig) -> Box<dyn MediaLoader> {
    #[cfg(feature = "ffmpeg")]
    {
        Box::new(DecodedMediaLoader::with_video_decoder(
            config.canvas_width,
            config.canvas_height,
        ))
    }
    #[cfg(not(feature = "ffmpeg"))]
    {
        let _ = config;
        Box::new(DecodedMediaLoader::new())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        let loader = default_loader(&config);
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: EditorConfig, loader: Box<dyn MediaLoader>) -> Self {
        let model = TimelineModel::default()
            .with_duration_limits(config.timeline_margin_seconds, config.min_timeline_seconds);
        let surface = RasterSurface::with_fonts(
            config.canvas_width,
            config.canvas_height,
            FontBook::new(config.font_path.clone()),
        );
        let mut session = Self {
            history: HistoryStack::new(config.history_limit),
            selection: Selection::default(),
            clock: PlaybackClock::new(model.duration()),
            view: TimelineView::default(),
            cache: AssetCache::new(loader),
            compositor: Compositor::from_config(&config),
            surface,
            interaction: InteractionController::new(config.canvas_size()),
            viewport: ViewportRect::identity(config.canvas_size()),
            timeline_drag: None,
            export: None,
            export_result: None,
            last_stats: FrameStats::default(),
            last_pump: None,
            model,
            config,
        };
        session.after_model_change();
        tracing::info!(
            width = session.config.canvas_width,
            height = session.config.canvas_height,
            "Editor session created"
        );
        session
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn model(&self) -> &TimelineModel {
        &self.model
    }

    pub fn selection(&self) -> Option<Uuid> {
        self.selection.clip()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn view(&self) -> &TimelineView {
        &self.view
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    pub fn export_mode(&self) -> Option<ExportMode> {
        self.export.as_ref().map(ExportPipeline::mode)
    }

    /// The most recently rendered frame.
    pub fn frame(&self) -> &RgbaImage {
        self.surface.canvas()
    }

    pub fn last_stats(&self) -> &FrameStats {
        &self.last_stats
    }

    pub fn timeline_drag_preview(&self) -> Option<ClipPreview> {
        self.timeline_drag.as_ref().map(TimelineDrag::preview)
    }

    /// Bring derived state in line with the model: transport length, selection,
    /// media handles and any drag whose clip disappeared.
    pub fn after_model_change(&mut self) {
        self.clock.set_duration(self.model.duration());
        let model = &self.model;
        if self.selection.retain(|id| model.contains_clip(id)) {
            tracing::debug!("Selection cleared: clip removed");
        }
        if let Some(drag) = &self.timeline_drag {
            if !self.model.contains_clip(drag.clip_id()) {
                self.timeline_drag = None;
            }
        }
        self.cache.sync(&self.model);
    }

    /// State to record before a discrete edit. An open canvas drag is
    /// committed first so the edit gets its own undo step.
    fn edit_snapshot(&mut self) -> Vec<Clip> {
        self.end_canvas_drag();
        self.model.snapshot()
    }

    /// Record `before` as one undo step if the model changed.
    fn record(&mut self, label: &str, before: Vec<Clip>, changed: bool) -> bool {
        if changed {
            self.history.push(label, before);
            self.after_model_change();
        }
        changed
    }

    // ═══════════════════════════════════════════════════════════════
    // Library and clip creation
    // ═══════════════════════════════════════════════════════════════

    /// Register an asset with the library. Not an undoable edit.
    pub fn add_asset(&mut self, asset: MediaAsset) -> Uuid {
        self.model.add_asset(asset)
    }

    /// Place a clip at the playhead.
    pub fn add_clip(&mut self, source: ClipSource) -> EditorResult<Uuid> {
        let before = self.edit_snapshot();
        let id = self.model.add_clip(source, self.clock.current_time())?;
        self.record("Add clip", before, true);
        Ok(id)
    }

    /// Place a clip at the playhead on a specific track.
    pub fn add_clip_on_track(&mut self, source: ClipSource, track_id: &TrackId) -> EditorResult<Uuid> {
        let before = self.edit_snapshot();
        let id = self
            .model
            .add_clip_on_track(source, track_id, self.clock.current_time())?;
        self.record("Add clip", before, true);
        Ok(id)
    }

    /// Add a text clip from a named preset. None for an unknown preset name.
    pub fn add_text_preset(&mut self, name: &str) -> Option<EditorResult<Uuid>> {
        let preset = presets::find_text_preset(name)?;
        Some(self.add_clip(ClipSource::Preset(preset.template())))
    }

    pub fn add_sticker(&mut self, icon: &str) -> EditorResult<Uuid> {
        self.add_clip(ClipSource::Preset(presets::sticker_template(icon)))
    }

    /// Add a stock audio item. None for an unknown item.
    pub fn add_library_audio(&mut self, name: &str) -> Option<EditorResult<Uuid>> {
        let (name, duration) = presets::AUDIO_LIBRARY
            .iter()
            .find(|(item, _)| item.eq_ignore_ascii_case(name))?;
        Some(self.add_clip(ClipSource::Preset(presets::audio_template(name, *duration))))
    }

    // ═══════════════════════════════════════════════════════════════
    // Clip edits
    // ═══════════════════════════════════════════════════════════════

    /// Merge an inspector patch into a clip.
    pub fn update_clip(&mut self, id: Uuid, patch: &ClipPatch) -> bool {
        let before = self.edit_snapshot();
        let changed = self.model.update_clip(id, patch);
        self.record("Edit clip", before, changed)
    }

    /// Apply a patch to the selected clip. No-op without a selection.
    pub fn update_selected(&mut self, patch: &ClipPatch) -> bool {
        match self.selection.clip() {
            Some(id) => self.update_clip(id, patch),
            None => false,
        }
    }

    pub fn apply_filter_preset(&mut self, name: &str) -> bool {
        match presets::find_filter_preset(name) {
            Some(preset) => self.update_selected(&preset.patch()),
            None => false,
        }
    }

    pub fn apply_transition(&mut self, seconds: f64) -> bool {
        self.update_selected(&presets::transition_patch(seconds))
    }

    pub fn apply_motion(&mut self, effect: MotionEffect) -> bool {
        self.update_selected(&effect.patch())
    }

    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selection.clip() else {
            return false;
        };
        let before = self.edit_snapshot();
        let changed = self.model.delete_clip(id);
        self.record("Delete clip", before, changed)
    }

    /// Delete the selected clip and close the gap it leaves on its track.
    pub fn ripple_delete_selected(&mut self) -> bool {
        let Some(id) = self.selection.clip() else {
            return false;
        };
        let before = self.edit_snapshot();
        let changed = self.model.ripple_delete_clip(id);
        self.record("Ripple delete", before, changed)
    }

    /// Split the selected clip at the playhead. Returns the new right half.
    pub fn split_selected_at_playhead(&mut self) -> Option<Uuid> {
        let id = self.selection.clip()?;
        let before = self.edit_snapshot();
        let right = self.model.split_clip(id, self.clock.current_time());
        self.record("Split clip", before, right.is_some());
        right
    }

    pub fn undo(&mut self) -> bool {
        self.end_canvas_drag();
        let Some(snapshot) = self.history.undo(self.model.snapshot()) else {
            return false;
        };
        self.model.restore_clips(snapshot);
        self.after_model_change();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.end_canvas_drag();
        let Some(snapshot) = self.history.redo(self.model.snapshot()) else {
            return false;
        };
        self.model.restore_clips(snapshot);
        self.after_model_change();
        true
    }

    pub fn set_track_muted(&mut self, track_id: &TrackId, muted: bool) -> EditorResult<bool> {
        self.model.set_track_muted(track_id, muted)
    }

    pub fn set_track_locked(&mut self, track_id: &TrackId, locked: bool) -> EditorResult<bool> {
        self.model.set_track_locked(track_id, locked)
    }

    pub fn select_clip(&mut self, id: Uuid) -> bool {
        if !self.model.contains_clip(id) {
            return false;
        }
        self.selection.select_clip(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ═══════════════════════════════════════════════════════════════
    // Canvas pointer
    // ═══════════════════════════════════════════════════════════════

    /// Where the canvas is shown on screen. Pointer events arrive in these
    /// client coordinates.
    pub fn set_viewport(&mut self, viewport: ViewportRect) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> ViewportRect {
        self.viewport
    }

    fn client_to_canvas(&self, client: (f32, f32)) -> (f32, f32) {
        self.viewport
            .to_canvas(client.0, client.1, self.interaction.canvas())
    }

    /// Pointer pressed at a client point. A hit on an unlocked clip opens a
    /// history batch so the whole drag undoes in one step.
    pub fn canvas_pointer_down(&mut self, client: (f32, f32)) -> PointerDown {
        self.end_canvas_drag();
        let point = self.client_to_canvas(client);
        let result = self.interaction.pointer_down(
            &self.model,
            self.clock.current_time(),
            &mut self.selection,
            point,
        );
        if let PointerDown::Hit { dragging: true, .. } = result {
            self.history.begin_batch("Move clip", self.model.snapshot());
        }
        result
    }

    pub fn canvas_pointer_move(&mut self, client: (f32, f32)) -> bool {
        let point = self.client_to_canvas(client);
        let was_dragging = self.interaction.is_dragging();
        let changed = self.interaction.pointer_move(&mut self.model, point);
        if was_dragging && !self.interaction.is_dragging() {
            // The clip vanished mid-drag; keep whatever the drag moved.
            if self.history.end_batch(&self.model.snapshot()) {
                self.after_model_change();
            }
        }
        changed
    }

    /// Pointer released (or left the canvas). Returns whether the drag
    /// produced an undo entry.
    pub fn canvas_pointer_up(&mut self) -> bool {
        self.end_canvas_drag()
    }

    fn end_canvas_drag(&mut self) -> bool {
        if self.interaction.pointer_up().is_none() {
            return false;
        }
        let recorded = self.history.end_batch(&self.model.snapshot());
        if recorded {
            self.after_model_change();
        }
        recorded
    }

    // ═══════════════════════════════════════════════════════════════
    // Timeline panel
    // ═══════════════════════════════════════════════════════════════

    /// Start moving or trimming a clip on the timeline. False when the clip
    /// is missing or its track is locked.
    pub fn timeline_drag_begin(&mut self, clip_id: Uuid, mode: DragMode, pointer_x: f64) -> bool {
        self.timeline_drag = TimelineDrag::begin(&self.model, clip_id, mode, pointer_x);
        if self.timeline_drag.is_some() {
            self.selection.select_clip(clip_id);
        }
        self.timeline_drag.is_some()
    }

    pub fn timeline_drag_update(&mut self, pointer_x: f64) -> Option<ClipPreview> {
        let drag = self.timeline_drag.as_mut()?;
        let targets = collect_targets(&self.model, self.clock.current_time(), Some(drag.clip_id()));
        Some(drag.update(pointer_x, self.view.zoom(), &targets))
    }

    /// Commit the previewed drag as one undo step.
    pub fn timeline_drag_end(&mut self) -> bool {
        let Some(drag) = self.timeline_drag.take() else {
            return false;
        };
        let before = self.edit_snapshot();
        let changed = drag.commit(&mut self.model);
        let label = match drag.mode() {
            DragMode::Move => "Move clip",
            DragMode::TrimStart | DragMode::TrimEnd => "Trim clip",
        };
        self.record(label, before, changed)
    }

    pub fn timeline_drag_cancel(&mut self) {
        self.timeline_drag = None;
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.view.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.view.zoom_out()
    }

    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.view.set_zoom(zoom)
    }

    /// Seek to the time under a ruler click at `x` pixels.
    pub fn seek_from_ruler(&mut self, x: f64) {
        let time = self.view.ruler_seek(x, self.model.duration());
        self.seek(time);
    }

    // ═══════════════════════════════════════════════════════════════
    // Transport
    // ═══════════════════════════════════════════════════════════════

    /// Transport commands are ignored while an export owns the clock.
    pub fn seek(&mut self, time: f64) {
        if self.is_exporting() {
            return;
        }
        self.clock.seek(time);
    }

    pub fn toggle_playback(&mut self) -> bool {
        if !self.is_exporting() {
            self.clock.toggle();
        }
        self.clock.is_playing()
    }

    pub fn play(&mut self) {
        if !self.is_exporting() {
            self.clock.play();
        }
    }

    pub fn pause(&mut self) {
        if !self.is_exporting() {
            self.clock.pause();
        }
    }

    /// Advance the transport by wall time and let media handles catch up.
    /// A real-time export is finalized when the transport reaches the end.
    /// Does nothing while a deterministic export runs.
    pub fn playback_tick(&mut self, now: Instant) -> TickOutcome {
        let dt = self
            .last_pump
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_pump = Some(now);
        // A deterministic export steps the clock and the handles itself.
        if self.export_mode() == Some(ExportMode::Deterministic) {
            return TickOutcome::Idle;
        }
        self.cache.pump(dt);

        let outcome = self.clock.tick(now);
        if outcome == TickOutcome::Finished && self.is_exporting() {
            self.finish_export();
        }
        outcome
    }

    // ═══════════════════════════════════════════════════════════════
    // Rendering
    // ═══════════════════════════════════════════════════════════════

    /// Composite the frame at the playhead. During a real-time export the
    /// frame is also pushed to the sink.
    pub fn render_frame(&mut self) -> &FrameStats {
        self.draw();
        if self.export_mode() == Some(ExportMode::RealTime) {
            let time = self.clock.current_time();
            self.push_export_frame(time);
        }
        &self.last_stats
    }

    fn draw(&mut self) {
        let ctx = RenderContext {
            model: &self.model,
            time: self.clock.current_time(),
            playing: self.clock.is_playing(),
            // The selection outline is an editing aid and stays out of exports.
            selected: if self.export.is_some() {
                None
            } else {
                self.selection.clip()
            },
        };
        self.last_stats = self.compositor.render(&mut self.surface, &mut self.cache, &ctx);
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        self.surface.size()
    }

    // ═══════════════════════════════════════════════════════════════
    // Export
    // ═══════════════════════════════════════════════════════════════

    /// Open the built-in sink for `format` at `<export_dir>/<product>-export.<ext>`
    /// and start exporting from 0.
    pub fn start_export(&mut self, format: ExportFormat, mode: ExportMode) -> ExportResult<PathBuf> {
        if self.is_exporting() {
            return Err(ExportError::AlreadyExporting);
        }
        let path = self.config.export_path(format.extension());
        let sink = open_sink(format, &path, self.surface.size(), self.config.export_fps)?;
        self.start_export_with_sink(sink, mode)?;
        Ok(path)
    }

    /// Start exporting into a caller-supplied sink.
    pub fn start_export_with_sink(
        &mut self,
        sink: Box<dyn FrameSink>,
        mode: ExportMode,
    ) -> ExportResult<()> {
        if self.is_exporting() {
            sink.abort();
            return Err(ExportError::AlreadyExporting);
        }
        self.end_canvas_drag();
        self.timeline_drag = None;
        self.export_result = None;
        self.export = Some(ExportPipeline::new(sink, self.config.export_fps, mode));
        self.clock.reset();
        self.clock.play();
        tracing::info!(mode = ?mode, fps = self.config.export_fps, duration = self.clock.duration(), "Export started");
        Ok(())
    }

    /// Render and push the next deterministic frame, or finalize once the
    /// transport has covered the whole timeline.
    pub fn export_step(&mut self) -> ExportStep {
        let Some(export) = self.export.as_ref() else {
            return ExportStep::Idle;
        };
        if export.mode() != ExportMode::Deterministic {
            return ExportStep::Running;
        }
        let time = export.next_frame_time();
        let step = export.frame_step();
        if time >= self.clock.duration() {
            self.finish_export();
            return ExportStep::Finished;
        }

        self.clock.play();
        self.clock.seek(time);
        self.draw();
        if !self.push_export_frame(time) {
            return ExportStep::Finished;
        }
        self.cache.pump(step);
        ExportStep::Running
    }

    /// Run a deterministic export to completion.
    pub fn run_export(&mut self) -> ExportResult<PathBuf> {
        while self.export_step() == ExportStep::Running {}
        self.take_export_result().unwrap_or(Err(ExportError::Cancelled))
    }

    /// Stop the running export and discard its output.
    pub fn cancel_export(&mut self) -> bool {
        let Some(mut export) = self.export.take() else {
            return false;
        };
        export.abort();
        self.clock.reset();
        self.cache.pause_all();
        self.export_result = Some(Err(ExportError::Cancelled));
        true
    }

    /// Outcome of the last export, once it has ended.
    pub fn take_export_result(&mut self) -> Option<ExportResult<PathBuf>> {
        self.export_result.take()
    }

    fn push_export_frame(&mut self, time: f64) -> bool {
        let Some(export) = self.export.as_mut() else {
            return false;
        };
        match export.push(self.surface.canvas(), time) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "Export failed");
                self.export = None;
                self.clock.reset();
                self.cache.pause_all();
                self.export_result = Some(Err(err));
                false
            }
        }
    }

    fn finish_export(&mut self) {
        let Some(export) = self.export.take() else {
            return;
        };
        let result = export.finish();
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Export finalize failed");
        }
        self.clock.reset();
        self.cache.pause_all();
        self.export_result = Some(result);
    }

    // ═══════════════════════════════════════════════════════════════
    // Hotkeys
    // ═══════════════════════════════════════════════════════════════

    /// Map a key event to an action and run it.
    pub fn handle_key(
        &mut self,
        key: &Key,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        input_focused: bool,
    ) -> HotkeyResult {
        let context = HotkeyContext {
            has_selection: self.selection.clip().is_some(),
            input_focused,
        };
        let result = handle_hotkey(key, shift, ctrl, alt, meta, &context);
        if let HotkeyResult::Action(action) = result {
            self.apply_hotkey(action);
        }
        result
    }

    pub fn apply_hotkey(&mut self, action: HotkeyAction) {
        tracing::debug!(?action, "Hotkey");
        match action {
            HotkeyAction::Undo => {
                self.undo();
            }
            HotkeyAction::Redo => {
                self.redo();
            }
            HotkeyAction::SplitAtPlayhead => {
                self.split_selected_at_playhead();
            }
            HotkeyAction::DeleteSelection => {
                self.delete_selected();
            }
            HotkeyAction::RippleDeleteSelection => {
                self.ripple_delete_selected();
            }
            HotkeyAction::PlayPause => {
                self.toggle_playback();
            }
            HotkeyAction::TimelineZoomIn => {
                self.zoom_in();
            }
            HotkeyAction::TimelineZoomOut => {
                self.zoom_out();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::tests::RecordingSink;
    use crate::core::export::partial_path;
    use crate::state::{MediaKind, TrackId};
    use image::Rgba;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn small_config() -> EditorConfig {
        EditorConfig {
            canvas_width: 64,
            canvas_height: 36,
            export_fps: 10,
            timeline_margin_seconds: 0.0,
            min_timeline_seconds: 0.0,
            ..Default::default()
        }
    }

    fn session() -> EditorSession {
        EditorSession::new(small_config())
    }

    fn recording_sink() -> (Box<dyn FrameSink>, Rc<RefCell<Vec<f64>>>) {
        let timestamps = Rc::new(RefCell::new(Vec::new()));
        let sink = RecordingSink {
            timestamps: Rc::clone(&timestamps),
            fail_at: None,
            path: PathBuf::from("neoncut-export.gif"),
        };
        (Box::new(sink), timestamps)
    }

    #[test]
    fn test_add_clip_at_playhead_and_undo_redo() {
        let mut session = session();
        let first = session.add_text_preset("Default Text").unwrap().unwrap();
        session.seek(2.0);
        let second = session.add_text_preset("Neon Blue").unwrap().unwrap();
        assert_eq!(session.model().clip(second).unwrap().start, 2.0);
        assert!(session.add_text_preset("Unknown").is_none());

        assert!(session.undo());
        assert!(!session.model().contains_clip(second));
        assert!(session.model().contains_clip(first));
        assert!(session.redo());
        assert!(session.model().contains_clip(second));
        assert!(!session.redo());
    }

    #[test]
    fn test_undo_redo_walks_every_mutation() {
        let mut session = session();
        let mut states = vec![session.model().clips().to_vec()];

        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        states.push(session.model().clips().to_vec());
        session.select_clip(id);
        session.update_clip(id, &ClipPatch { opacity: Some(0.5), ..Default::default() });
        states.push(session.model().clips().to_vec());
        session.seek(2.0);
        session.split_selected_at_playhead().unwrap();
        states.push(session.model().clips().to_vec());
        assert!(session.apply_filter_preset("Noir"));
        states.push(session.model().clips().to_vec());
        assert!(session.delete_selected());
        states.push(session.model().clips().to_vec());

        for expected in states.iter().rev().skip(1) {
            assert!(session.undo());
            assert_eq!(session.model().clips(), expected.as_slice());
        }
        assert!(!session.undo());
        for expected in states.iter().skip(1) {
            assert!(session.redo());
            assert_eq!(session.model().clips(), expected.as_slice());
        }
        assert!(!session.redo());
    }

    #[test]
    fn test_split_at_playhead_needs_selection() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        session.seek(2.0);
        assert_eq!(session.split_selected_at_playhead(), None);

        session.select_clip(id);
        let right = session.split_selected_at_playhead().unwrap();
        assert_eq!(session.model().clips().len(), 2);
        assert_eq!(session.model().clip(right).unwrap().start, 2.0);

        assert!(session.undo());
        assert_eq!(session.model().clips().len(), 1);
        assert_eq!(session.model().clip(id).unwrap().duration, 5.0);
    }

    #[test]
    fn test_delete_without_selection_records_nothing() {
        let mut session = session();
        session.add_text_preset("Default Text").unwrap().unwrap();
        assert!(!session.delete_selected());
        assert!(!session.ripple_delete_selected());
        assert!(session.undo());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_undo_of_add_clears_selection_and_handle() {
        let mut session = session();
        let id = session
            .add_library_audio("Lo-Fi Chill")
            .unwrap()
            .unwrap();
        assert_eq!(session.model().clip(id).unwrap().kind, MediaKind::Audio);
        session.select_clip(id);
        session.undo();
        assert_eq!(session.selection(), None);
        assert!(!session.cache.contains(id));
    }

    #[test]
    fn test_canvas_drag_is_one_undo_step() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        let down = session.canvas_pointer_down((32.0, 18.0));
        assert_eq!(down, PointerDown::Hit { clip_id: id, dragging: true });
        assert!(session.canvas_pointer_move((37.0, 18.0)));
        assert!(session.canvas_pointer_move((42.0, 20.0)));
        assert!(session.canvas_pointer_up());

        let props = &session.model().clip(id).unwrap().properties;
        assert_eq!((props.x, props.y), (10.0, 2.0));
        assert!(session.undo());
        let props = &session.model().clip(id).unwrap().properties;
        assert_eq!((props.x, props.y), (0.0, 0.0));
        // The add is still there.
        assert!(session.model().contains_clip(id));
    }

    #[test]
    fn test_delete_during_canvas_drag_is_undoable() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        session.canvas_pointer_down((32.0, 18.0));
        assert!(session.canvas_pointer_move((37.0, 18.0)));
        assert!(session.delete_selected());
        assert!(!session.canvas_pointer_move((40.0, 18.0)));
        assert!(!session.canvas_pointer_up());

        assert!(session.undo());
        assert_eq!(session.model().clip(id).unwrap().properties.x, 5.0);
        assert!(session.undo());
        assert_eq!(session.model().clip(id).unwrap().properties.x, 0.0);
        assert!(session.undo());
        assert!(!session.model().contains_clip(id));
    }

    #[test]
    fn test_split_during_canvas_drag_is_its_own_step() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        session.canvas_pointer_down((32.0, 18.0));
        assert!(session.canvas_pointer_move((37.0, 18.0)));
        session.seek(2.0);
        let right = session.split_selected_at_playhead().unwrap();
        assert!(!session.canvas_pointer_up());

        assert!(session.undo());
        assert!(!session.model().contains_clip(right));
        assert_eq!(session.model().clip(id).unwrap().properties.x, 5.0);
        assert!(session.undo());
        assert_eq!(session.model().clip(id).unwrap().properties.x, 0.0);
    }

    #[test]
    fn test_pointer_maps_through_half_size_viewport() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        session.set_viewport(ViewportRect {
            left: 100.0,
            top: 50.0,
            width: 32.0,
            height: 18.0,
        });
        // Client origin lands above the text hit box once mapped.
        assert_eq!(session.canvas_pointer_down((0.0, 0.0)), PointerDown::Miss);

        let down = session.canvas_pointer_down((116.0, 59.0));
        assert_eq!(down, PointerDown::Hit { clip_id: id, dragging: true });
        assert!(session.canvas_pointer_move((121.0, 60.0)));
        assert!(session.canvas_pointer_up());
        let props = &session.model().clip(id).unwrap().properties;
        assert_eq!((props.x, props.y), (10.0, 2.0));
    }

    #[test]
    fn test_canvas_miss_deselects() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        session.select_clip(id);
        session.seek(10.0);
        assert_eq!(session.canvas_pointer_down((32.0, 18.0)), PointerDown::Miss);
        assert_eq!(session.selection(), None);
        assert!(!session.canvas_pointer_up());
    }

    #[test]
    fn test_timeline_drag_commits_one_entry() {
        let mut session = session();
        let a = session.add_text_preset("Default Text").unwrap().unwrap();
        session.seek(8.0);
        let b = session.add_text_preset("Yellow Bold").unwrap().unwrap();
        let depth = session.history.undo_depth();

        assert!(session.timeline_drag_begin(b, DragMode::Move, 400.0));
        // 8s -> 5.1s at 50 px/s, within snapping distance of a's end.
        let preview = session.timeline_drag_update(255.0).unwrap();
        assert_eq!(preview.start, 5.0);
        assert!(session.timeline_drag_end());
        assert_eq!(session.model().clip(b).unwrap().start, 5.0);
        assert_eq!(session.history.undo_depth(), depth + 1);
        assert_eq!(session.model().clip(a).unwrap().start, 0.0);
    }

    #[test]
    fn test_locked_track_blocks_timeline_drag() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        let track = session.model().clip(id).unwrap().track_id.clone();
        session.set_track_locked(&track, true).unwrap();
        assert!(!session.timeline_drag_begin(id, DragMode::TrimEnd, 0.0));
        assert!(session.add_text_preset("Default Text").unwrap().is_err());
        assert!(session.set_track_locked(&TrackId::from("missing"), true).is_err());
    }

    #[test]
    fn test_filter_preset_applies_to_selection() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        assert!(!session.apply_filter_preset("Noir"));
        session.select_clip(id);
        assert!(session.apply_filter_preset("Noir"));
        assert_eq!(session.model().clip(id).unwrap().properties.grade.saturation, 0.0);
        assert!(!session.apply_filter_preset("Noir"));
        assert!(session.apply_transition(1.0));
        assert!(session.apply_motion(MotionEffect::Tilt));
    }

    #[test]
    fn test_hotkeys_drive_session() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        session.select_clip(id);

        let space = Key::character(" ");
        session.handle_key(&space, false, false, false, false, false);
        assert!(session.clock().is_playing());
        session.handle_key(&space, false, false, false, false, false);
        assert!(!session.clock().is_playing());

        session.handle_key(&Key::Delete, false, false, false, false, false);
        assert!(!session.model().contains_clip(id));
        session.handle_key(&Key::character("z"), false, true, false, false, false);
        assert!(session.model().contains_clip(id));

        let result = session.handle_key(&Key::Delete, false, false, false, false, true);
        assert_eq!(result, HotkeyResult::Suppressed);
        assert!(session.model().contains_clip(id));

        session.handle_key(&Key::character("+"), false, false, false, false, false);
        assert_eq!(session.view().zoom(), 60.0);
    }

    #[test]
    fn test_render_draws_active_clips() {
        let mut session = session();
        let asset = MediaAsset::from_image("red", RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])));
        let asset_id = session.add_asset(asset);
        let id = session.add_clip(ClipSource::Asset(asset_id)).unwrap();
        let stats = session.render_frame().clone();
        assert_eq!(stats.drawn, vec![id]);
        assert_eq!(session.frame().get_pixel(32, 18), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_deterministic_export_pushes_every_frame() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        session
            .update_clip(id, &ClipPatch { duration: Some(1.0), ..Default::default() });
        session.select_clip(id);
        assert_eq!(session.clock().duration(), 1.0);

        let (sink, timestamps) = recording_sink();
        session.start_export_with_sink(sink, ExportMode::Deterministic).unwrap();
        assert!(session.is_exporting());
        assert!(session.clock().is_playing());
        let (second, _) = recording_sink();
        assert!(matches!(
            session.start_export_with_sink(second, ExportMode::Deterministic),
            Err(ExportError::AlreadyExporting)
        ));

        let path = session.run_export().unwrap();
        assert_eq!(path, PathBuf::from("neoncut-export.gif"));
        assert_eq!(timestamps.borrow().len(), 10);
        assert!((timestamps.borrow()[9] - 0.9).abs() < 1e-9);
        assert!(!session.is_exporting());
        assert!(!session.clock().is_playing());
        assert_eq!(session.clock().current_time(), 0.0);
        assert_eq!(session.selection(), Some(id));
    }

    #[test]
    fn test_exporting_flag_holds_until_last_frame() {
        let mut session = session();
        session.add_text_preset("Default Text").unwrap().unwrap();
        assert_eq!(session.clock().duration(), 5.0);
        let (sink, timestamps) = recording_sink();
        session.start_export_with_sink(sink, ExportMode::Deterministic).unwrap();

        let mut steps = 0;
        while session.export_step() == ExportStep::Running {
            assert!(session.is_exporting());
            steps += 1;
        }
        assert_eq!(steps, 50);
        assert!(!session.is_exporting());
        assert_eq!(timestamps.borrow().len(), 50);
        assert!(session.take_export_result().unwrap().is_ok());
    }

    #[test]
    fn test_deterministic_export_ignores_wall_clock_pump() {
        let mut session = session();
        let frames = (0..20)
            .map(|_| RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])))
            .collect();
        let asset = session.add_asset(MediaAsset::from_frames("Footage", frames, 10.0));
        let id = session.add_clip(ClipSource::Asset(asset)).unwrap();
        let (sink, _) = recording_sink();
        session.start_export_with_sink(sink, ExportMode::Deterministic).unwrap();

        assert_eq!(session.export_step(), ExportStep::Running);
        let position = |session: &EditorSession| session.cache.get(id).unwrap().current_time();
        assert!((position(&session) - 0.1).abs() < 1e-9);

        let now = Instant::now();
        session.playback_tick(now);
        assert_eq!(
            session.playback_tick(now + std::time::Duration::from_secs(1)),
            TickOutcome::Idle
        );
        assert!((position(&session) - 0.1).abs() < 1e-9);

        assert_eq!(session.export_step(), ExportStep::Running);
        assert!((position(&session) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_export_failure_resets_state() {
        let mut session = session();
        session.add_text_preset("Default Text").unwrap().unwrap();
        let sink = RecordingSink {
            timestamps: Rc::new(RefCell::new(Vec::new())),
            fail_at: Some(3),
            path: PathBuf::from("unused.gif"),
        };
        session
            .start_export_with_sink(Box::new(sink), ExportMode::Deterministic)
            .unwrap();
        assert!(matches!(
            session.run_export(),
            Err(ExportError::EncodeFailed { frame: 3, .. })
        ));
        assert!(!session.is_exporting());
        assert_eq!(session.clock().current_time(), 0.0);
    }

    #[test]
    fn test_cancel_export() {
        let mut session = session();
        session.add_text_preset("Default Text").unwrap().unwrap();
        let (sink, _) = recording_sink();
        session.start_export_with_sink(sink, ExportMode::Deterministic).unwrap();
        assert_eq!(session.export_step(), ExportStep::Running);
        session.seek(3.0);
        assert!(session.cancel_export());
        assert!(matches!(session.take_export_result(), Some(Err(ExportError::Cancelled))));
        assert!(!session.cancel_export());
        assert_eq!(session.export_step(), ExportStep::Idle);
    }

    #[test]
    fn test_realtime_export_finishes_on_transport_end() {
        let mut session = session();
        let id = session.add_text_preset("Default Text").unwrap().unwrap();
        session.update_clip(id, &ClipPatch { duration: Some(0.5), ..Default::default() });
        let (sink, timestamps) = recording_sink();
        session.start_export_with_sink(sink, ExportMode::RealTime).unwrap();

        let start = Instant::now();
        let mut now = start;
        for _ in 0..10 {
            session.playback_tick(now);
            session.render_frame();
            now += std::time::Duration::from_millis(100);
        }
        assert!(!session.is_exporting());
        assert!(session.take_export_result().unwrap().is_ok());
        let pushed = timestamps.borrow();
        assert!(pushed.len() >= 5);
        assert!(pushed.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_gif_export_writes_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig {
            export_dir: dir.path().to_path_buf(),
            ..small_config()
        };
        let mut session = EditorSession::new(config);
        let asset = MediaAsset::from_image("blue", RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])));
        let asset_id = session.add_asset(asset);
        let id = session.add_clip(ClipSource::Asset(asset_id)).unwrap();
        session.update_clip(id, &ClipPatch { duration: Some(0.3), ..Default::default() });

        let expected = dir.path().join("neoncut-export.gif");
        let path = session
            .start_export(ExportFormat::Gif, ExportMode::Deterministic)
            .unwrap();
        assert_eq!(path, expected);
        assert_eq!(session.run_export().unwrap(), expected);
        assert!(expected.exists());
        assert!(!partial_path(&expected).exists());
    }
}
