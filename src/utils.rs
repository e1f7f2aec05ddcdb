use image::Rgba;

use crate::constants::TIMECODE_FPS;

/// Format seconds as `HH:MM:SS:FF` at the readout frame rate.
pub fn format_timecode(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let total_frames = (seconds * TIMECODE_FPS).floor() as u64;
    let fps = TIMECODE_FPS as u64;
    let frames = total_frames % fps;
    let total_seconds = total_frames / fps;
    format!(
        "{:02}:{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60,
        frames
    )
}

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or a handful of named colors.
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "white" => return Some(Rgba([255, 255, 255, 255])),
        "black" => return Some(Rgba([0, 0, 0, 255])),
        "transparent" => return Some(Rgba([0, 0, 0, 0])),
        _ => {}
    }

    let hex = value.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match hex.len() {
        3 => {
            let expand = |index: usize| channel(index..index + 1).map(|v| v * 17);
            Some(Rgba([expand(0)?, expand(1)?, expand(2)?, 255]))
        }
        6 => Some(Rgba([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255])),
        8 => Some(Rgba([
            channel(0..2)?,
            channel(2..4)?,
            channel(4..6)?,
            channel(6..8)?,
        ])),
        _ => None,
    }
}

/// Clamp a possibly non-finite value into `[min, max]`.
pub fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max.max(min))
}
