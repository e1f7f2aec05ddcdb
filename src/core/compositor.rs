//! Per-frame compositing of the active clips.
//!
//! Clips are drawn in track-id order onto a black canvas. Each clip gets a
//! transform around the canvas centre, a faded global alpha, its blend mode
//! and (except text) its color grade. Media handles are driven toward the
//! clip's source time as a side effect of drawing.

use image::Rgba;
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::constants::{
    MEDIA_SELECTION_DASH, MEDIA_SELECTION_LINE_WIDTH, MIN_PLAYBACK_SPEED,
    PAUSED_DRIFT_TOLERANCE_SECONDS, PLAYING_DRIFT_TOLERANCE_SECONDS, TEXT_BOX_PADDING,
    TEXT_LINE_HEIGHT, TEXT_SELECTION_DASH, TEXT_SELECTION_LINE_WIDTH, TEXT_SHADOW_ALPHA,
    TEXT_SHADOW_BLUR, TEXT_SHADOW_OFFSET,
};
use crate::core::asset_cache::AssetCache;
use crate::core::media::MediaHandle;
use crate::core::surface::{Affine, DrawState, FilterChain, Shadow, StrokeStyle, Surface, TextStyle};
use crate::state::{Clip, MediaKind, TimelineModel};
use crate::utils::{clamp_finite, parse_color};

const SELECTION_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Seek thresholds between a handle's position and its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftTolerance {
    pub playing: f64,
    pub paused: f64,
}

impl Default for DriftTolerance {
    fn default() -> Self {
        Self {
            playing: PLAYING_DRIFT_TOLERANCE_SECONDS,
            paused: PAUSED_DRIFT_TOLERANCE_SECONDS,
        }
    }
}

/// Everything a frame needs besides the surface and the handles.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub model: &'a TimelineModel,
    pub time: f64,
    pub playing: bool,
    pub selected: Option<Uuid>,
}

/// What happened while rendering one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Clips drawn (or driven, for audio) in z-order.
    pub drawn: Vec<Uuid>,
    /// Active clips whose handle was missing or not ready.
    pub skipped: Vec<Uuid>,
    /// Seeks issued to media handles.
    pub seeks: usize,
}

/// Clip opacity with the fade-in and fade-out ramps applied.
pub fn fade_alpha(clip: &Clip, time: f64) -> f32 {
    let props = &clip.properties;
    let mut alpha = props.opacity.clamp(0.0, 1.0) as f64;
    let into_clip = time - clip.start;
    let remaining = clip.end() - time;
    if props.fade_in > 0.0 && into_clip < props.fade_in {
        alpha *= (into_clip / props.fade_in).max(0.0);
    }
    if props.fade_out > 0.0 && remaining < props.fade_out {
        alpha *= (remaining / props.fade_out).max(0.0);
    }
    alpha as f32
}

/// Playback speed of `clip`. Clips deserialized with a zero or negative
/// speed play at the slowest supported rate.
fn clip_speed(clip: &Clip) -> f64 {
    clip.properties.speed.max(MIN_PLAYBACK_SPEED)
}

/// Position in the source media for timeline time `time`, clamped to the
/// media length.
pub fn source_time(clip: &Clip, time: f64, media_duration: f64) -> f64 {
    let target = (time - clip.start) * clip_speed(clip) + clip.offset;
    clamp_finite(target, 0.0, media_duration.max(0.0))
}

/// Drive a handle toward the clip's source time. Returns true when a seek
/// was issued.
pub fn sync_media_handle(
    handle: &mut dyn MediaHandle,
    clip: &Clip,
    time: f64,
    playing: bool,
    muted: bool,
    alpha: f32,
    tolerance: DriftTolerance,
) -> bool {
    let target = source_time(clip, time, handle.duration());
    let volume = if muted {
        0.0
    } else {
        (clip.properties.volume * alpha).clamp(0.0, 1.0)
    };
    handle.set_volume(volume);

    let drift = (handle.current_time() - target).abs();
    let threshold = if playing {
        let speed = clip_speed(clip);
        if handle.playback_rate() != speed {
            handle.set_playback_rate(speed);
        }
        if handle.is_paused() && handle.is_ready() {
            handle.play();
        }
        tolerance.playing
    } else {
        handle.pause();
        tolerance.paused
    };

    if drift > threshold && !handle.is_seeking() {
        handle.seek(target);
        return true;
    }
    false
}

/// Draws active clips onto a surface.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    tolerance: DriftTolerance,
}

impl Compositor {
    pub fn new(tolerance: DriftTolerance) -> Self {
        Self { tolerance }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(DriftTolerance {
            playing: config.playing_drift_tolerance,
            paused: config.paused_drift_tolerance,
        })
    }

    /// Clear the surface and draw one frame at `ctx.time`.
    pub fn render(
        &self,
        surface: &mut dyn Surface,
        cache: &mut AssetCache,
        ctx: &RenderContext<'_>,
    ) -> FrameStats {
        surface.clear(Rgba([0, 0, 0, 255]));
        let mut stats = FrameStats::default();
        let active = ctx.model.active_clips(ctx.time);

        // Handles of clips outside the playhead must not keep playing.
        for clip in ctx.model.clips() {
            if clip.is_active_at(ctx.time) {
                continue;
            }
            if let Some(handle) = cache.get_mut(clip.id) {
                if !handle.is_paused() {
                    handle.pause();
                }
            }
        }

        let (width, height) = surface.size();
        let centre = (width as f32 / 2.0, height as f32 / 2.0);

        for clip in active {
            let alpha = fade_alpha(clip, ctx.time);
            let state = draw_state(clip, centre, alpha);
            let selected = ctx.selected == Some(clip.id);

            let drawn = match clip.kind {
                MediaKind::Text => {
                    draw_text_clip(surface, clip, &state, selected);
                    true
                }
                MediaKind::Video | MediaKind::Image | MediaKind::Audio => {
                    let Some(handle) = cache.get_mut(clip.id) else {
                        stats.skipped.push(clip.id);
                        continue;
                    };
                    if clip.kind != MediaKind::Image {
                        let muted = ctx.model.is_track_muted(&clip.track_id);
                        if sync_media_handle(
                            &mut *handle,
                            clip,
                            ctx.time,
                            ctx.playing,
                            muted,
                            alpha,
                            self.tolerance,
                        ) {
                            stats.seeks += 1;
                        }
                    }
                    if !handle.is_ready() {
                        false
                    } else if clip.kind == MediaKind::Audio {
                        true
                    } else {
                        draw_media_clip(surface, &*handle, &state, selected)
                    }
                }
            };

            if drawn {
                stats.drawn.push(clip.id);
            } else {
                stats.skipped.push(clip.id);
            }
        }

        tracing::trace!(
            time = ctx.time,
            drawn = stats.drawn.len(),
            skipped = stats.skipped.len(),
            seeks = stats.seeks,
            "Rendered frame"
        );
        stats
    }
}

fn draw_state(clip: &Clip, centre: (f32, f32), alpha: f32) -> DrawState {
    let props = &clip.properties;
    let transform = Affine::IDENTITY
        .translate(centre.0 + props.x, centre.1 + props.y)
        .rotate_deg(props.rotation)
        .scale(props.scale, props.scale);
    let filter = if clip.kind == MediaKind::Text {
        FilterChain::identity()
    } else {
        FilterChain::from(&props.grade)
    };
    DrawState {
        transform,
        alpha,
        blend: props.blend_mode,
        filter,
    }
}

fn draw_media_clip(
    surface: &mut dyn Surface,
    handle: &dyn MediaHandle,
    state: &DrawState,
    selected: bool,
) -> bool {
    let Some(frame) = handle.frame() else {
        return false;
    };
    surface.draw_image(&frame, state);
    if selected {
        let (w, h) = handle
            .native_size()
            .unwrap_or((frame.width(), frame.height()));
        let (w, h) = (w as f32, h as f32);
        surface.stroke_rect(
            (-w / 2.0, -h / 2.0, w, h),
            &StrokeStyle {
                color: SELECTION_COLOR,
                width: MEDIA_SELECTION_LINE_WIDTH,
                dash: Some(MEDIA_SELECTION_DASH),
            },
            state,
        );
    }
    true
}

fn draw_text_clip(surface: &mut dyn Surface, clip: &Clip, state: &DrawState, selected: bool) {
    let props = &clip.properties;
    let style = TextStyle {
        font_family: props.font_family.clone(),
        font_size: props.font_size,
        color: parse_color(&props.text_color).unwrap_or(Rgba([255, 255, 255, 255])),
        shadow: Some(Shadow {
            color: Rgba([0, 0, 0, (TEXT_SHADOW_ALPHA * 255.0).round() as u8]),
            blur: TEXT_SHADOW_BLUR,
            offset_x: TEXT_SHADOW_OFFSET,
            offset_y: TEXT_SHADOW_OFFSET,
        }),
    };
    let text = clip.display_text();
    surface.draw_text(text, &style, state);

    if selected {
        let (text_width, _) = surface.measure_text(text, &style);
        let w = text_width + TEXT_BOX_PADDING;
        let h = props.font_size * TEXT_LINE_HEIGHT;
        surface.stroke_rect(
            (-w / 2.0, -h / 2.0, w, h),
            &StrokeStyle {
                color: SELECTION_COLOR,
                width: TEXT_SELECTION_LINE_WIDTH,
                dash: Some(TEXT_SELECTION_DASH),
            },
            state,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::{DecodedMediaLoader, FrameSequence, MediaLoader};
    use crate::core::surface::RasterSurface;
    use crate::state::{presets, ClipSource, MediaAsset, TrackId};
    use image::RgbaImage;
    use std::sync::Arc;

    fn clip_with_fades() -> Clip {
        let mut clip = Clip::new(TrackId::from("t2"), MediaKind::Video, "Clip", 0.0, 10.0);
        clip.properties.fade_in = 2.0;
        clip.properties.fade_out = 2.0;
        clip
    }

    #[test]
    fn test_fade_ramps() {
        let clip = clip_with_fades();
        assert!((fade_alpha(&clip, 1.0) - 0.5).abs() < 1e-6);
        assert_eq!(fade_alpha(&clip, 5.0), 1.0);
        assert!((fade_alpha(&clip, 9.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_source_time_applies_speed_and_offset() {
        let mut clip = Clip::new(TrackId::from("t2"), MediaKind::Video, "Clip", 2.0, 10.0);
        clip.offset = 1.0;
        clip.properties.speed = 2.0;
        assert_eq!(source_time(&clip, 4.0, 60.0), 5.0);
        assert_eq!(source_time(&clip, 11.0, 8.0), 8.0);
    }

    #[test]
    fn test_source_time_never_runs_backwards() {
        let mut clip = Clip::new(TrackId::from("t2"), MediaKind::Video, "Clip", 0.0, 10.0);
        clip.properties.speed = -1.0;
        assert!((source_time(&clip, 2.0, 60.0) - 2.0 * MIN_PLAYBACK_SPEED).abs() < 1e-9);
        assert!(source_time(&clip, 4.0, 60.0) > source_time(&clip, 2.0, 60.0));
    }

    struct SlowLoader;

    impl MediaLoader for SlowLoader {
        fn load(&self, clip: &Clip, asset: Option<&MediaAsset>) -> Option<Box<dyn MediaHandle>> {
            let frames = Arc::new(vec![Arc::new(RgbaImage::from_pixel(
                2,
                2,
                Rgba([255, 0, 0, 255]),
            ))]);
            match asset {
                Some(_) => Some(Box::new(FrameSequence::new(frames, 1.0).with_load_delay(1.0))),
                None => DecodedMediaLoader::new().load(clip, None),
            }
        }
    }

    #[test]
    fn test_sync_seeks_only_past_tolerance() {
        let clip = Clip::new(TrackId::from("t3"), MediaKind::Audio, "Drone", 0.0, 10.0);
        let loader = DecodedMediaLoader::new();
        let mut handle = loader.load(&clip, None).unwrap();
        let tolerance = DriftTolerance::default();

        assert!(!sync_media_handle(handle.as_mut(), &clip, 0.3, true, false, 1.0, tolerance));
        assert!(!handle.is_paused());
        assert!(sync_media_handle(handle.as_mut(), &clip, 0.5, true, false, 1.0, tolerance));
        // A seek in flight is not repeated.
        assert!(!sync_media_handle(handle.as_mut(), &clip, 2.0, true, false, 1.0, tolerance));
        handle.pump(0.0);

        assert!(sync_media_handle(handle.as_mut(), &clip, 0.6, false, true, 1.0, tolerance));
        assert!(handle.is_paused());
        assert_eq!(handle.volume(), 0.0);
    }

    #[test]
    fn test_track_order_puts_text_under_video() {
        let mut model = TimelineModel::default();
        let asset = model.add_asset(MediaAsset::from_image(
            "Backdrop",
            RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])),
        ));
        let text = model
            .add_clip(ClipSource::Preset(presets::TEXT_PRESETS[0].template()), 0.0)
            .unwrap();
        let image = model.add_clip(ClipSource::Asset(asset), 0.0).unwrap();

        let mut cache = AssetCache::new(Box::new(DecodedMediaLoader::new()));
        cache.sync(&model);
        let mut surface = RasterSurface::new(64, 36);
        let stats = Compositor::default().render(
            &mut surface,
            &mut cache,
            &RenderContext {
                model: &model,
                time: 1.0,
                playing: false,
                selected: None,
            },
        );
        assert_eq!(stats.drawn, vec![text, image]);
        assert_eq!(*surface.read_pixels().get_pixel(32, 18), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_text_over_running_video_keeps_track_order() {
        let mut model = TimelineModel::default();
        let frames = (0..8)
            .map(|_| RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])))
            .collect();
        let asset = model.add_asset(MediaAsset::from_frames("Footage", frames, 1.0));
        let video = model
            .add_clip_on_track(ClipSource::Asset(asset), &TrackId::from("t2"), 0.0)
            .unwrap();
        assert_eq!(model.clip(video).unwrap().duration, 8.0);
        let text = model
            .insert_clip(Clip::new(TrackId::from("t1"), MediaKind::Text, "Title", 2.0, 3.0))
            .unwrap();

        let mut cache = AssetCache::new(Box::new(DecodedMediaLoader::new()));
        cache.sync(&model);
        let mut surface = RasterSurface::new(32, 18);
        let stats = Compositor::default().render(
            &mut surface,
            &mut cache,
            &RenderContext {
                model: &model,
                time: 3.0,
                playing: false,
                selected: None,
            },
        );
        assert_eq!(stats.drawn, vec![text, video]);
        assert!(stats.skipped.is_empty());
    }

    #[test]
    fn test_unready_handles_are_skipped() {
        let mut model = TimelineModel::default();
        let asset = model.add_asset(MediaAsset::from_image("Still", RgbaImage::new(2, 2)));
        let clip = model.add_clip(ClipSource::Asset(asset), 0.0).unwrap();

        let mut cache = AssetCache::new(Box::new(SlowLoader));
        cache.sync(&model);
        let mut surface = RasterSurface::new(16, 16);
        let ctx = RenderContext {
            model: &model,
            time: 0.5,
            playing: false,
            selected: Some(clip),
        };
        let stats = Compositor::default().render(&mut surface, &mut cache, &ctx);
        assert!(stats.drawn.is_empty());
        assert_eq!(stats.skipped, vec![clip]);

        cache.pump(1.0);
        let stats = Compositor::default().render(&mut surface, &mut cache, &ctx);
        assert_eq!(stats.drawn, vec![clip]);
        assert_eq!(surface.read_pixels().get_pixel(8, 8)[0], 255);
    }
}
