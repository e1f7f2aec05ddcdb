//! Export: composited frames are pushed into a `FrameSink`, which writes to
//! a `.partial` file and only moves it into place on `finalize`.

mod gif_sink;
mod mp4_sink;

pub use gif_sink::GifSink;
pub use mp4_sink::Mp4Sink;

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::{ExportError, ExportResult};

/// Destination for exported frames.
pub trait FrameSink {
    /// Push one frame shown at `timestamp` seconds.
    fn push(&mut self, frame: &RgbaImage, timestamp: f64) -> ExportResult<()>;
    /// Flush and move the output to its final path.
    fn finalize(self: Box<Self>) -> ExportResult<PathBuf>;
    /// Stop and remove any partial output.
    fn abort(self: Box<Self>);
}

/// Output formats with a built-in sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Gif,
    Mp4,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Gif => "gif",
            ExportFormat::Mp4 => "mp4",
        }
    }
}

/// How the transport moves while exporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// Exactly one frame interval per pushed frame, independent of wall time.
    #[default]
    Deterministic,
    /// The playback loop drives the clock; frames are captured as rendered.
    RealTime,
}

/// Where a sink writes before `finalize`.
pub fn partial_path(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    final_path.with_file_name(name)
}

/// Move a finished partial file into place, replacing an older export.
pub(crate) fn commit_partial(partial: &Path, final_path: &Path) -> ExportResult<PathBuf> {
    if final_path.exists() {
        std::fs::remove_file(final_path)?;
    }
    std::fs::rename(partial, final_path)?;
    Ok(final_path.to_path_buf())
}

/// Remove a partial file, ignoring a file that was never created.
pub(crate) fn discard_partial(partial: &Path) {
    if let Err(err) = std::fs::remove_file(partial) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %partial.display(), error = %err, "Failed to remove partial export");
        }
    }
}

/// Open the built-in sink for `format`, writing to `final_path`.
pub fn open_sink(
    format: ExportFormat,
    final_path: &Path,
    size: (u32, u32),
    fps: u32,
) -> ExportResult<Box<dyn FrameSink>> {
    if let Some(parent) = final_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let sink: Box<dyn FrameSink> = match format {
        ExportFormat::Gif => Box::new(GifSink::create(final_path, fps)?),
        ExportFormat::Mp4 => Box::new(Mp4Sink::spawn(final_path, size, fps)?),
    };
    Ok(sink)
}

/// One running export: the sink plus frame bookkeeping.
pub struct ExportPipeline {
    sink: Option<Box<dyn FrameSink>>,
    fps: u32,
    mode: ExportMode,
    frames_written: u64,
    last_timestamp: Option<f64>,
}

impl ExportPipeline {
    pub fn new(sink: Box<dyn FrameSink>, fps: u32, mode: ExportMode) -> Self {
        Self {
            sink: Some(sink),
            fps: fps.max(1),
            mode,
            frames_written: 0,
            last_timestamp: None,
        }
    }

    pub fn mode(&self) -> ExportMode {
        self.mode
    }

    /// Transport step per frame in deterministic mode.
    pub fn frame_step(&self) -> f64 {
        1.0 / self.fps as f64
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Timestamp of the next frame in deterministic mode. Computed from the
    /// frame index so long exports do not accumulate rounding error.
    pub fn next_frame_time(&self) -> f64 {
        self.frames_written as f64 / self.fps as f64
    }

    /// Push a rendered frame. A frame at the same timestamp as the previous
    /// one is dropped. On failure the sink is aborted.
    pub fn push(&mut self, frame: &RgbaImage, timestamp: f64) -> ExportResult<()> {
        if self.last_timestamp.is_some_and(|last| timestamp <= last) {
            return Ok(());
        }
        let Some(sink) = self.sink.as_mut() else {
            return Err(ExportError::Cancelled);
        };
        if let Err(err) = sink.push(frame, timestamp) {
            tracing::warn!(frame = self.frames_written, error = %err, "Export frame failed");
            self.abort();
            return Err(err);
        }
        self.frames_written += 1;
        self.last_timestamp = Some(timestamp);
        Ok(())
    }

    /// Finalize the sink and return the exported file.
    pub fn finish(mut self) -> ExportResult<PathBuf> {
        let sink = self.sink.take().ok_or(ExportError::Cancelled)?;
        let path = sink.finalize()?;
        tracing::info!(path = %path.display(), frames = self.frames_written, "Export finished");
        Ok(path)
    }

    /// Discard the export.
    pub fn abort(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.abort();
            tracing::info!(frames = self.frames_written, "Export aborted");
        }
    }
}

impl Drop for ExportPipeline {
    fn drop(&mut self) {
        self.abort();
    }
}
