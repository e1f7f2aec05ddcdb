//! In-process video decoding with FFmpeg.
//!
//! One worker thread owns every open decoder. Handles post requests and poll
//! for the reply from `pump`, so a seek never blocks the frame loop.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use ffmpeg_next as ffmpeg;
use image::RgbaImage;

use crate::core::media::MediaHandle;

const AV_TIME_BASE: i64 = 1_000_000;

struct DecodeRequest {
    path: PathBuf,
    time_seconds: f64,
    respond_to: mpsc::Sender<Option<RgbaImage>>,
}

/// A dedicated worker for in-process video decoding with FFmpeg.
#[derive(Clone, Debug)]
pub struct VideoDecodeWorker {
    sender: mpsc::Sender<DecodeRequest>,
}

impl VideoDecodeWorker {
    /// Create a worker that decodes frames scaled to fit `max_width` x `max_height`.
    pub fn new(max_width: u32, max_height: u32) -> Self {
        let (sender, receiver) = mpsc::channel::<DecodeRequest>();

        thread::spawn(move || {
            if let Err(err) = ffmpeg::init() {
                tracing::error!(error = %err, "FFmpeg init failed");
            }
            let mut decoders: HashMap<PathBuf, VideoDecoder> = HashMap::new();

            for request in receiver {
                let DecodeRequest {
                    path,
                    time_seconds,
                    respond_to,
                } = request;

                let image = match decoders.entry(path.clone()) {
                    Entry::Occupied(mut entry) => entry.get_mut().decode_frame_at_time(time_seconds),
                    Entry::Vacant(entry) => match VideoDecoder::open(&path, max_width, max_height) {
                        Ok(mut decoder) => {
                            let image = decoder.decode_frame_at_time(time_seconds);
                            entry.insert(decoder);
                            image
                        }
                        Err(err) => {
                            tracing::warn!(path = %path.display(), error = %err, "Failed to open video");
                            None
                        }
                    },
                };

                // The handle may have been dropped while we decoded.
                let _ = respond_to.send(image);
            }
        });

        Self { sender }
    }

    /// Queue a decode and return the channel the frame will arrive on.
    pub fn request(&self, path: &Path, time_seconds: f64) -> Option<mpsc::Receiver<Option<RgbaImage>>> {
        let (respond_to, response) = mpsc::channel();
        let request = DecodeRequest {
            path: path.to_path_buf(),
            time_seconds,
            respond_to,
        };
        self.sender.send(request).ok()?;
        Some(response)
    }
}

/// A file-backed video clip decoded on the worker thread.
pub struct DecodedVideo {
    worker: VideoDecodeWorker,
    path: PathBuf,
    duration: f64,
    position: f64,
    paused: bool,
    rate: f64,
    volume: f32,
    frame: Option<Arc<RgbaImage>>,
    /// Source time of `frame`.
    frame_time: f64,
    pending: Option<(f64, mpsc::Receiver<Option<RgbaImage>>)>,
    /// Set by an explicit seek until its frame arrives.
    seeking: bool,
    fps_hint: f64,
}

impl DecodedVideo {
    pub fn new(worker: VideoDecodeWorker, path: PathBuf, duration: f64) -> Self {
        let mut video = Self {
            worker,
            path,
            duration: duration.max(0.0),
            position: 0.0,
            paused: true,
            rate: 1.0,
            volume: 1.0,
            frame: None,
            frame_time: f64::NEG_INFINITY,
            pending: None,
            seeking: false,
            fps_hint: 30.0,
        };
        video.request_frame(0.0);
        video
    }

    fn request_frame(&mut self, time: f64) {
        if let Some(receiver) = self.worker.request(&self.path, time) {
            self.pending = Some((time, receiver));
        }
    }

    fn poll_pending(&mut self) {
        let Some((time, receiver)) = self.pending.as_ref() else {
            return;
        };
        match receiver.try_recv() {
            Ok(image) => {
                let time = *time;
                if let Some(image) = image {
                    self.frame = Some(Arc::new(image));
                    self.frame_time = time;
                }
                self.pending = None;
                self.seeking = false;
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.pending = None;
                self.seeking = false;
            }
        }
    }
}

impl MediaHandle for DecodedVideo {
    fn is_ready(&self) -> bool {
        self.frame.is_some()
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn current_time(&self) -> f64 {
        self.position
    }
    fn is_paused(&self) -> bool {
        self.paused
    }
    fn play(&mut self) {
        self.paused = false;
    }
    fn pause(&mut self) {
        self.paused = true;
    }
    fn playback_rate(&self) -> f64 {
        self.rate
    }
    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }
    fn seek(&mut self, time: f64) {
        self.position = crate::utils::clamp_finite(time, 0.0, self.duration);
        self.seeking = true;
        self.request_frame(self.position);
    }
    fn is_seeking(&self) -> bool {
        self.seeking
    }
    fn volume(&self) -> f32 {
        self.volume
    }
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
    fn pump(&mut self, dt: f64) {
        self.poll_pending();
        if !self.paused {
            self.position = (self.position + dt * self.rate).min(self.duration);
            if self.position >= self.duration {
                self.paused = true;
            }
        }
        let stale = (self.position - self.frame_time).abs() >= 1.0 / self.fps_hint;
        if self.pending.is_none() && stale {
            self.request_frame(self.position);
        }
    }
    fn frame(&self) -> Option<Arc<RgbaImage>> {
        self.frame.clone()
    }
    fn native_size(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|frame| (frame.width(), frame.height()))
    }
}

struct VideoDecoder {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    time_base: ffmpeg::Rational,
}

impl VideoDecoder {
    fn open(path: &Path, max_width: u32, max_height: u32) -> Result<Self, ffmpeg::Error> {
        let input = ffmpeg::format::input(path)?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(ffmpeg::Error::StreamNotFound)?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context.decoder().video()?;

        let src_width = decoder.width().max(1);
        let src_height = decoder.height().max(1);
        let (target_width, target_height) =
            fit_dimensions(src_width, src_height, max_width, max_height);

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            src_width,
            src_height,
            ffmpeg::util::format::Pixel::RGBA,
            target_width,
            target_height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            time_base,
        })
    }

    fn decode_frame_at_time(&mut self, time_seconds: f64) -> Option<RgbaImage> {
        let target_ts = (time_seconds.max(0.0) * AV_TIME_BASE as f64).round() as i64;
        self.input.seek(target_ts, ..).ok()?;
        self.decoder.flush();

        let target_pts = seconds_to_pts(time_seconds.max(0.0), self.time_base);
        let mut decoded = ffmpeg::util::frame::Video::empty();
        let mut rgba_frame = ffmpeg::util::frame::Video::empty();

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if let Some(frame_pts) = decoded.timestamp().or(decoded.pts()) {
                    if frame_pts < target_pts {
                        continue;
                    }
                }
                if self.scaler.run(&decoded, &mut rgba_frame).is_err() {
                    continue;
                }
                return frame_to_rgba(&rgba_frame);
            }
        }

        None
    }
}

/// Scale `src` down to fit inside the bounds, keeping the aspect ratio.
pub fn fit_dimensions(src_width: u32, src_height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let max_width = max_width.max(1);
    let max_height = max_height.max(1);

    if src_width <= max_width && src_height <= max_height {
        return (src_width, src_height);
    }

    let scale = (max_width as f64 / src_width as f64)
        .min(max_height as f64 / src_height as f64)
        .max(0.01);

    (
        (src_width as f64 * scale).round().max(1.0) as u32,
        (src_height as f64 * scale).round().max(1.0) as u32,
    )
}

fn seconds_to_pts(time_seconds: f64, time_base: ffmpeg::Rational) -> i64 {
    let numerator = time_base.numerator() as f64;
    let denominator = time_base.denominator() as f64;
    if numerator <= 0.0 || denominator <= 0.0 {
        return 0;
    }
    (time_seconds * denominator / numerator).round() as i64
}

fn frame_to_rgba(frame: &ffmpeg::util::frame::Video) -> Option<RgbaImage> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    if width == 0 || height == 0 {
        return None;
    }

    let stride = frame.stride(0);
    let row_bytes = width * 4;
    if stride < row_bytes {
        return None;
    }

    let data = frame.data(0);
    let mut buffer = Vec::with_capacity(row_bytes * height);
    for y in 0..height {
        let src_offset = y * stride;
        buffer.extend_from_slice(data.get(src_offset..src_offset + row_bytes)?);
    }

    RgbaImage::from_vec(width as u32, height as u32, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_dimensions() {
        assert_eq!(fit_dimensions(640, 360, 1920, 1080), (640, 360));
        assert_eq!(fit_dimensions(3840, 2160, 1920, 1080), (1920, 1080));
        assert_eq!(fit_dimensions(1000, 4000, 1920, 1080), (270, 1080));
    }
}
