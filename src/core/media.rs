//! Media decode handles.
//!
//! A handle is the per-clip playback object the compositor drives: it owns a
//! playhead, play/pause state, rate and volume, and exposes the current frame.
//! Seeks are non-blocking; a handle may report `is_seeking` until a later
//! `pump` lands the new position.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use image::RgbaImage;

use crate::state::{Clip, MediaAsset, MediaKind, MediaSource};

pub trait MediaHandle {
    /// False while the source is still loading; unready handles are skipped.
    fn is_ready(&self) -> bool;
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    /// Request a new position. Completion may be deferred to `pump`.
    fn seek(&mut self, time: f64);
    fn is_seeking(&self) -> bool {
        false
    }
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    /// Let the handle make progress: finish loads and seeks, advance playback
    /// by `dt` seconds of wall time.
    fn pump(&mut self, dt: f64);
    /// Frame at the current position, for visual media.
    fn frame(&self) -> Option<Arc<RgbaImage>>;
    fn native_size(&self) -> Option<(u32, u32)>;
}

/// Creates handles for clips as they first appear on the timeline.
pub trait MediaLoader {
    fn load(&self, clip: &Clip, asset: Option<&MediaAsset>) -> Option<Box<dyn MediaHandle>>;
}

/// Shared transport bookkeeping for the built-in handles.
#[derive(Debug, Clone)]
struct Transport {
    position: f64,
    duration: f64,
    paused: bool,
    rate: f64,
    volume: f32,
}

impl Transport {
    fn new(duration: f64) -> Self {
        Self {
            position: 0.0,
            duration: duration.max(0.0),
            paused: true,
            rate: 1.0,
            volume: 1.0,
        }
    }

    fn clamp(&self, time: f64) -> f64 {
        crate::utils::clamp_finite(time, 0.0, self.duration)
    }

    fn advance(&mut self, dt: f64) {
        if self.paused {
            return;
        }
        self.position = self.clamp(self.position + dt * self.rate);
        if self.position >= self.duration {
            self.paused = true;
        }
    }
}

/// A decoded still image. Always ready; time has no effect on the frame.
pub struct StillImage {
    image: Arc<RgbaImage>,
    transport: Transport,
}

impl StillImage {
    pub fn new(image: Arc<RgbaImage>, duration: f64) -> Self {
        Self {
            image,
            transport: Transport::new(duration),
        }
    }
}

impl MediaHandle for StillImage {
    fn is_ready(&self) -> bool {
        true
    }
    fn duration(&self) -> f64 {
        self.transport.duration
    }
    fn current_time(&self) -> f64 {
        self.transport.position
    }
    fn is_paused(&self) -> bool {
        self.transport.paused
    }
    fn play(&mut self) {
        self.transport.paused = false;
    }
    fn pause(&mut self) {
        self.transport.paused = true;
    }
    fn playback_rate(&self) -> f64 {
        self.transport.rate
    }
    fn set_playback_rate(&mut self, rate: f64) {
        self.transport.rate = rate;
    }
    fn seek(&mut self, time: f64) {
        self.transport.position = self.transport.clamp(time);
    }
    fn volume(&self) -> f32 {
        self.transport.volume
    }
    fn set_volume(&mut self, volume: f32) {
        self.transport.volume = volume;
    }
    fn pump(&mut self, dt: f64) {
        self.transport.advance(dt);
    }
    fn frame(&self) -> Option<Arc<RgbaImage>> {
        Some(Arc::clone(&self.image))
    }
    fn native_size(&self) -> Option<(u32, u32)> {
        Some((self.image.width(), self.image.height()))
    }
}

/// Decoded frames at a fixed rate. Seeks land on the next `pump`, and an
/// optional load delay keeps the handle unready for a while.
pub struct FrameSequence {
    frames: Arc<Vec<Arc<RgbaImage>>>,
    fps: f64,
    transport: Transport,
    pending_seek: Option<f64>,
    load_remaining: f64,
}

impl FrameSequence {
    pub fn new(frames: Arc<Vec<Arc<RgbaImage>>>, fps: f64) -> Self {
        let fps = fps.max(1.0);
        let duration = frames.len() as f64 / fps;
        Self {
            frames,
            fps,
            transport: Transport::new(duration),
            pending_seek: None,
            load_remaining: 0.0,
        }
    }

    /// Stay unready until `seconds` of pumping have elapsed.
    pub fn with_load_delay(mut self, seconds: f64) -> Self {
        self.load_remaining = seconds.max(0.0);
        self
    }

    fn frame_index(&self) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        let index = (self.transport.position * self.fps).floor() as usize;
        Some(index.min(self.frames.len() - 1))
    }
}

impl MediaHandle for FrameSequence {
    fn is_ready(&self) -> bool {
        self.load_remaining <= 0.0 && !self.frames.is_empty()
    }
    fn duration(&self) -> f64 {
        self.transport.duration
    }
    fn current_time(&self) -> f64 {
        self.transport.position
    }
    fn is_paused(&self) -> bool {
        self.transport.paused
    }
    fn play(&mut self) {
        self.transport.paused = false;
    }
    fn pause(&mut self) {
        self.transport.paused = true;
    }
    fn playback_rate(&self) -> f64 {
        self.transport.rate
    }
    fn set_playback_rate(&mut self, rate: f64) {
        self.transport.rate = rate;
    }
    fn seek(&mut self, time: f64) {
        self.pending_seek = Some(self.transport.clamp(time));
    }
    fn is_seeking(&self) -> bool {
        self.pending_seek.is_some()
    }
    fn volume(&self) -> f32 {
        self.transport.volume
    }
    fn set_volume(&mut self, volume: f32) {
        self.transport.volume = volume;
    }
    fn pump(&mut self, dt: f64) {
        if self.load_remaining > 0.0 {
            self.load_remaining -= dt.max(0.0);
            return;
        }
        if let Some(target) = self.pending_seek.take() {
            self.transport.position = target;
            return;
        }
        self.transport.advance(dt);
    }
    fn frame(&self) -> Option<Arc<RgbaImage>> {
        if !self.is_ready() {
            return None;
        }
        self.frame_index()
            .and_then(|index| self.frames.get(index))
            .cloned()
    }
    fn native_size(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|frame| (frame.width(), frame.height()))
    }
}

/// Audio transport with no frames. Sample output belongs to the host.
pub struct AudioTransport {
    transport: Transport,
    pending_seek: Option<f64>,
}

impl AudioTransport {
    pub fn new(duration: f64) -> Self {
        Self {
            transport: Transport::new(duration),
            pending_seek: None,
        }
    }
}

impl MediaHandle for AudioTransport {
    fn is_ready(&self) -> bool {
        true
    }
    fn duration(&self) -> f64 {
        self.transport.duration
    }
    fn current_time(&self) -> f64 {
        self.transport.position
    }
    fn is_paused(&self) -> bool {
        self.transport.paused
    }
    fn play(&mut self) {
        self.transport.paused = false;
    }
    fn pause(&mut self) {
        self.transport.paused = true;
    }
    fn playback_rate(&self) -> f64 {
        self.transport.rate
    }
    fn set_playback_rate(&mut self, rate: f64) {
        self.transport.rate = rate;
    }
    fn seek(&mut self, time: f64) {
        self.pending_seek = Some(self.transport.clamp(time));
    }
    fn is_seeking(&self) -> bool {
        self.pending_seek.is_some()
    }
    fn volume(&self) -> f32 {
        self.transport.volume
    }
    fn set_volume(&mut self, volume: f32) {
        self.transport.volume = volume;
    }
    fn pump(&mut self, dt: f64) {
        if let Some(target) = self.pending_seek.take() {
            self.transport.position = target;
            return;
        }
        self.transport.advance(dt);
    }
    fn frame(&self) -> Option<Arc<RgbaImage>> {
        None
    }
    fn native_size(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Loader for the sources the core understands natively. File-backed video
/// needs the `ffmpeg` feature; without it such clips never get a handle.
#[derive(Debug, Default, Clone)]
pub struct DecodedMediaLoader {
    #[cfg(feature = "ffmpeg")]
    video: Option<crate::core::video_decode::VideoDecodeWorker>,
}

impl DecodedMediaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode file-backed video in-process, scaled to fit the canvas.
    #[cfg(feature = "ffmpeg")]
    pub fn with_video_decoder(max_width: u32, max_height: u32) -> Self {
        Self {
            video: Some(crate::core::video_decode::VideoDecodeWorker::new(
                max_width, max_height,
            )),
        }
    }

    fn load_file(&self, path: &Path, asset: &MediaAsset) -> Option<Box<dyn MediaHandle>> {
        match asset.kind {
            MediaKind::Image => match image::open(path) {
                Ok(image) => Some(Box::new(StillImage::new(
                    Arc::new(image.to_rgba8()),
                    asset.native_duration,
                ))),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Failed to decode image");
                    None
                }
            },
            MediaKind::Audio => Some(Box::new(AudioTransport::new(asset.native_duration))),
            MediaKind::Video => self.load_video_file(path, asset),
            MediaKind::Text => None,
        }
    }

    #[cfg(feature = "ffmpeg")]
    fn load_video_file(&self, path: &Path, asset: &MediaAsset) -> Option<Box<dyn MediaHandle>> {
        let worker = self.video.clone()?;
        Some(Box::new(crate::core::video_decode::DecodedVideo::new(
            worker,
            path.to_path_buf(),
            asset.native_duration,
        )))
    }

    #[cfg(not(feature = "ffmpeg"))]
    fn load_video_file(&self, path: &Path, _asset: &MediaAsset) -> Option<Box<dyn MediaHandle>> {
        tracing::warn!(path = %path.display(), "Video files need the ffmpeg feature");
        None
    }
}

impl MediaLoader for DecodedMediaLoader {
    fn load(&self, clip: &Clip, asset: Option<&MediaAsset>) -> Option<Box<dyn MediaHandle>> {
        if !clip.kind.needs_handle() {
            return None;
        }
        let Some(asset) = asset else {
            // Library audio without samples still needs a transport to drive.
            return (clip.kind == MediaKind::Audio)
                .then(|| Box::new(AudioTransport::new(clip.offset + clip.duration)) as Box<dyn MediaHandle>);
        };
        match &asset.source {
            MediaSource::Image(image) => Some(Box::new(StillImage::new(
                Arc::clone(image),
                asset.native_duration,
            ))),
            MediaSource::Frames { frames, fps } => {
                Some(Box::new(FrameSequence::new(Arc::clone(frames), *fps)))
            }
            MediaSource::File(path) => self.load_file(path, asset),
            MediaSource::None => (asset.kind == MediaKind::Audio)
                .then(|| Box::new(AudioTransport::new(asset.native_duration)) as Box<dyn MediaHandle>),
        }
    }
}

/// Probe media duration in seconds using ffprobe.
pub fn probe_duration_seconds(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.trim().parse::<f64>().ok().filter(|d| *d > 0.0)
}

/// Build an asset for a file, probing its duration off the async thread.
pub async fn import_file(path: impl AsRef<Path>) -> MediaAsset {
    let path = path.as_ref().to_path_buf();
    let probe_path = path.clone();
    let duration = tokio::task::spawn_blocking(move || probe_duration_seconds(&probe_path))
        .await
        .ok()
        .flatten();
    MediaAsset::from_file(path, duration)
}
