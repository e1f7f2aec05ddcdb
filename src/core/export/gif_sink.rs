use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{resize, FilterType};
use image::{Delay, Frame, RgbaImage};

use super::{commit_partial, discard_partial, partial_path, FrameSink};
use crate::error::{ExportError, ExportResult};

/// Animated GIF sink built on the `image` crate's encoder.
///
/// Each frame is held until the next one arrives so its delay can be taken
/// from the timestamp difference.
pub struct GifSink {
    encoder: Option<GifEncoder<BufWriter<File>>>,
    file: File,
    partial: PathBuf,
    final_path: PathBuf,
    frame_interval: f64,
    max_width: Option<u32>,
    pending: Option<(RgbaImage, f64)>,
    frames: u64,
}

impl GifSink {
    pub fn create(final_path: &Path, fps: u32) -> ExportResult<Self> {
        let partial = partial_path(final_path);
        let file = File::create(&partial)?;
        let handle = file.try_clone()?;
        let mut encoder = GifEncoder::new(BufWriter::new(file));
        if let Err(err) = encoder.set_repeat(Repeat::Infinite) {
            discard_partial(&partial);
            return Err(err.into());
        }
        tracing::debug!(path = %partial.display(), fps, "Opened GIF sink");
        Ok(Self {
            encoder: Some(encoder),
            file: handle,
            partial,
            final_path: final_path.to_path_buf(),
            frame_interval: 1.0 / fps.max(1) as f64,
            max_width: None,
            pending: None,
            frames: 0,
        })
    }

    /// Downscale frames wider than `width`, keeping the aspect ratio.
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.max_width = Some(width.max(1));
        self
    }

    fn prepare(&self, frame: &RgbaImage) -> RgbaImage {
        match self.max_width {
            Some(max_width) if frame.width() > max_width => {
                let height = (frame.height() as u64 * max_width as u64 / frame.width() as u64).max(1);
                resize(frame, max_width, height as u32, FilterType::Triangle)
            }
            _ => frame.clone(),
        }
    }

    fn write(&mut self, image: RgbaImage, seconds: f64) -> ExportResult<()> {
        let encoder = self.encoder.as_mut().ok_or(ExportError::Cancelled)?;
        let delay = Delay::from_saturating_duration(Duration::from_secs_f64(seconds.max(0.01)));
        encoder
            .encode_frame(Frame::from_parts(image, 0, 0, delay))
            .map_err(|err| ExportError::EncodeFailed {
                frame: self.frames,
                reason: err.to_string(),
            })?;
        self.frames += 1;
        Ok(())
    }
}

impl FrameSink for GifSink {
    fn push(&mut self, frame: &RgbaImage, timestamp: f64) -> ExportResult<()> {
        let image = self.prepare(frame);
        if let Some((previous, previous_time)) = self.pending.take() {
            self.write(previous, timestamp - previous_time)?;
        }
        self.pending = Some((image, timestamp));
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> ExportResult<PathBuf> {
        if let Some((last, _)) = self.pending.take() {
            let interval = self.frame_interval;
            if let Err(err) = self.write(last, interval) {
                self.abort();
                return Err(err);
            }
        }
        // Dropping the encoder writes the trailer and flushes the buffer.
        drop(self.encoder.take());
        if let Err(err) = self.file.sync_all() {
            discard_partial(&self.partial);
            return Err(err.into());
        }
        commit_partial(&self.partial, &self.final_path)
    }

    fn abort(mut self: Box<Self>) {
        drop(self.encoder.take());
        discard_partial(&self.partial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_gif_written_on_finalize_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neoncut-export.gif");
        let mut sink = Box::new(GifSink::create(&path, 10).unwrap());
        let frame = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        sink.push(&frame, 0.0).unwrap();
        sink.push(&frame, 0.1).unwrap();
        assert!(!path.exists());
        assert!(partial_path(&path).exists());

        let written = sink.finalize().unwrap();
        assert_eq!(written, path);
        assert!(!partial_path(&path).exists());
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn test_abort_removes_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neoncut-export.gif");
        let mut sink = Box::new(GifSink::create(&path, 10).unwrap().with_max_width(2));
        sink.push(&RgbaImage::new(4, 4), 0.0).unwrap();
        sink.abort();
        assert!(!partial_path(&path).exists());
        assert!(!path.exists());
    }
}
