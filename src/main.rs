//! NeonCut headless renderer
//!
//! Builds a short edit from the media files given on the command line (plus a
//! generated title and color bars) and exports it next to the working
//! directory. Pass `--mp4` to encode through the system ffmpeg.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use neoncut::core::export::{ExportFormat, ExportMode};
use neoncut::core::media::import_file;
use neoncut::state::presets::MotionEffect;
use neoncut::state::{ClipPatch, ClipSource, MediaAsset};
use neoncut::utils::format_timecode;
use neoncut::{EditorConfig, EditorRuntime, EditorSession, LiveSession};
use tracing_subscriber::EnvFilter;

/// Two seconds of scrolling color bars.
fn color_bars(width: u32, height: u32, frames: u32) -> Vec<RgbaImage> {
    const BARS: [[u8; 3]; 6] = [
        [236, 72, 153],
        [34, 211, 238],
        [250, 204, 21],
        [74, 222, 128],
        [168, 85, 247],
        [239, 68, 68],
    ];
    (0..frames)
        .map(|frame| {
            RgbaImage::from_fn(width, height, |x, _| {
                let bar = ((x + frame * 4) * BARS.len() as u32 / width) as usize % BARS.len();
                let [r, g, b] = BARS[bar];
                Rgba([r, g, b, 255])
            })
        })
        .collect()
}

async fn build_edit(session: &mut EditorSession, paths: Vec<PathBuf>) -> Result<(), Box<dyn Error>> {
    for path in paths {
        let asset = import_file(&path).await;
        tracing::info!(path = %path.display(), kind = ?asset.kind, duration = asset.native_duration, "Imported");
        let asset_id = session.add_asset(asset);
        let clip_id = session.add_clip(ClipSource::Asset(asset_id))?;
        if let Some(end) = session.model().clip(clip_id).map(|clip| clip.end()) {
            session.seek(end);
        }
    }

    session.seek(0.0);
    let bars = MediaAsset::from_frames("Color Bars", color_bars(640, 360, 48), 24.0);
    let bars_id = session.add_asset(bars);
    let bars_clip = session.add_clip(ClipSource::Asset(bars_id))?;
    session.select_clip(bars_clip);
    session.apply_filter_preset("Vivid");
    session.apply_transition(0.5);

    if let Some(Ok(title)) = session.add_text_preset("Neon Blue") {
        session.update_clip(
            title,
            &ClipPatch {
                text: Some("NeonCut".to_string()),
                duration: Some(2.0),
                y: Some(-300.0),
                ..Default::default()
            },
        );
        session.select_clip(title);
        session.apply_motion(MotionEffect::Tilt);
    }
    Ok(())
}

async fn render(
    config: EditorConfig,
    paths: Vec<PathBuf>,
    format: ExportFormat,
) -> Result<PathBuf, Box<dyn Error>> {
    let mut session = EditorSession::new(config);
    build_edit(&mut session, paths).await?;
    tracing::info!(
        clips = session.model().clips().len(),
        length = %format_timecode(session.clock().duration()),
        "Edit ready"
    );

    let live = LiveSession::new(session);
    live.update(|session| session.start_export(format, ExportMode::Deterministic))?;
    let _render = live.start_render_loop();
    loop {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Some(result) = live.update(|session| session.take_export_result()) {
            return Ok(result?);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("neoncut=info")),
        )
        .init();

    let mut format = ExportFormat::Gif;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--mp4" => format = ExportFormat::Mp4,
            _ => paths.push(PathBuf::from(arg)),
        }
    }

    let config = EditorConfig::from_env();
    let runtime = EditorRuntime::new()?;
    let path = runtime.block_on(render(config, paths, format))?;

    println!("Exported {}", path.display());
    Ok(())
}
