use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use image::imageops::{resize, FilterType};
use image::RgbaImage;

use super::{commit_partial, discard_partial, partial_path, FrameSink};
use crate::error::{ExportError, ExportResult};

/// Read a pipe to the end on its own thread so the writer never blocks on a
/// full pipe buffer.
fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = reader.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).trim().to_string()
    })
}

/// H.264 MP4 sink that streams raw RGBA frames into a system `ffmpeg`.
///
/// Frames are encoded at a constant rate; timestamps are not used.
pub struct Mp4Sink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    partial: PathBuf,
    final_path: PathBuf,
    size: (u32, u32),
    frames: u64,
}

impl Mp4Sink {
    pub fn spawn(final_path: &Path, size: (u32, u32), fps: u32) -> ExportResult<Self> {
        let partial = partial_path(final_path);
        // yuv420p needs even dimensions.
        let size = ((size.0.max(2) / 2) * 2, (size.1.max(2) / 2) * 2);
        let mut child = Command::new("ffmpeg")
            .args(["-y", "-loglevel", "error", "-hide_banner"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{}x{}", size.0, size.1)])
            .args(["-r", &fps.max(1).to_string()])
            .args(["-i", "-"])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-movflags", "+faststart"])
            .args(["-f", "mp4"])
            .arg(&partial)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => {
                    ExportError::EncoderUnavailable("ffmpeg was not found on PATH".to_string())
                }
                _ => ExportError::Io(err),
            })?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(drain);
        tracing::debug!(path = %partial.display(), width = size.0, height = size.1, fps, "Spawned ffmpeg sink");
        Ok(Self {
            child,
            stdin,
            stderr,
            partial,
            final_path: final_path.to_path_buf(),
            size,
            frames: 0,
        })
    }

    /// Everything ffmpeg wrote to stderr. Call only after the process exited.
    fn stderr_text(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default()
    }
}

impl FrameSink for Mp4Sink {
    fn push(&mut self, frame: &RgbaImage, _timestamp: f64) -> ExportResult<()> {
        let (width, height) = self.size;
        let resized;
        let frame = if frame.dimensions() == (width, height) {
            frame
        } else {
            resized = resize(frame, width, height, FilterType::Triangle);
            &resized
        };
        let stdin = self.stdin.as_mut().ok_or(ExportError::Cancelled)?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|err| ExportError::EncodeFailed {
                frame: self.frames,
                reason: err.to_string(),
            })?;
        self.frames += 1;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> ExportResult<PathBuf> {
        // Closing stdin tells ffmpeg the stream is complete.
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let reason = self.stderr_text();
        if !status.success() {
            discard_partial(&self.partial);
            return Err(ExportError::EncodeFailed {
                frame: self.frames,
                reason: if reason.is_empty() {
                    format!("ffmpeg exited with {status}")
                } else {
                    reason
                },
            });
        }
        commit_partial(&self.partial, &self.final_path)
    }

    fn abort(mut self: Box<Self>) {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = self.stderr_text();
        discard_partial(&self.partial);
    }
}
