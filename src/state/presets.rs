//! Built-in presets offered by the editor sidebar.
//!
//! Clip presets become new clips through `ClipSource::Preset`; look presets
//! (filters, transitions, motion) are plain `ClipPatch` values applied to the
//! selected clip.

use crate::constants::{DEFAULT_PRESET_DURATION_SECONDS, STICKER_DURATION_SECONDS};
use crate::state::{ClipPatch, ClipProperties, ClipTemplate, MediaKind};

/// A text style preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPreset {
    pub name: &'static str,
    pub font_family: &'static str,
    pub font_size: f32,
    pub color: &'static str,
}

pub const TEXT_PRESETS: &[TextPreset] = &[
    TextPreset { name: "Default Text", font_family: "Arial", font_size: 120.0, color: "#ffffff" },
    TextPreset { name: "Yellow Bold", font_family: "Impact", font_size: 140.0, color: "#facc15" },
    TextPreset { name: "Neon Blue", font_family: "Verdana", font_size: 130.0, color: "#22d3ee" },
    TextPreset { name: "Red Warning", font_family: "Arial", font_size: 150.0, color: "#ef4444" },
    TextPreset { name: "Subtle Grey", font_family: "Courier New", font_size: 80.0, color: "#a1a1aa" },
];

impl TextPreset {
    pub fn template(&self) -> ClipTemplate {
        ClipTemplate {
            name: self.name.to_string(),
            kind: MediaKind::Text,
            duration: DEFAULT_PRESET_DURATION_SECONDS,
            properties: ClipProperties {
                font_size: self.font_size,
                text_color: self.color.to_string(),
                font_family: self.font_family.to_string(),
                ..Default::default()
            },
        }
    }
}

/// Emoji stickers, placed as large text clips.
pub const STICKERS: &[(&str, &str)] = &[
    ("🔥", "Fire"),
    ("😂", "Laugh"),
    ("❤️", "Love"),
    ("👍", "Like"),
    ("🎉", "Party"),
    ("👀", "Eyes"),
    ("⭐", "Star"),
    ("💡", "Idea"),
    ("🔴", "Record"),
];

pub const STICKER_FONT_SIZE: f32 = 150.0;

pub fn sticker_template(icon: &str) -> ClipTemplate {
    ClipTemplate {
        name: icon.to_string(),
        kind: MediaKind::Text,
        duration: STICKER_DURATION_SECONDS,
        properties: ClipProperties {
            font_size: STICKER_FONT_SIZE,
            ..Default::default()
        },
    }
}

/// Stock audio: (name, duration in seconds).
pub const AUDIO_LIBRARY: &[(&str, f64)] = &[
    ("Upbeat Corporate", 15.0),
    ("Cinematic Whoosh", 2.0),
    ("Lo-Fi Chill", 30.0),
    ("Suspense Drone", 10.0),
];

pub fn audio_template(name: &str, duration: f64) -> ClipTemplate {
    ClipTemplate {
        name: name.to_string(),
        kind: MediaKind::Audio,
        duration,
        properties: ClipProperties::default(),
    }
}

/// A color grade preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPreset {
    pub name: &'static str,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub hue: f32,
}

pub const FILTER_PRESETS: &[FilterPreset] = &[
    FilterPreset { name: "None", brightness: 1.0, contrast: 1.0, saturation: 1.0, hue: 0.0 },
    FilterPreset { name: "Vivid", brightness: 1.1, contrast: 1.2, saturation: 1.3, hue: 0.0 },
    FilterPreset { name: "Noir", brightness: 1.0, contrast: 1.2, saturation: 0.0, hue: 0.0 },
    FilterPreset { name: "Vintage", brightness: 0.9, contrast: 0.9, saturation: 0.8, hue: 30.0 },
    FilterPreset { name: "Cool", brightness: 1.0, contrast: 1.0, saturation: 1.0, hue: 180.0 },
    FilterPreset { name: "Warm", brightness: 1.1, contrast: 1.0, saturation: 1.2, hue: -20.0 },
];

impl FilterPreset {
    /// Blur is left alone.
    pub fn patch(&self) -> ClipPatch {
        ClipPatch {
            brightness: Some(self.brightness),
            contrast: Some(self.contrast),
            saturation: Some(self.saturation),
            hue: Some(self.hue),
            ..Default::default()
        }
    }
}

/// Symmetric fade transitions: (name, seconds).
pub const TRANSITIONS: &[(&str, f64)] = &[
    ("Cross Dissolve", 1.0),
    ("Quick Fade", 0.5),
    ("Slow Fade", 2.0),
];

pub fn transition_patch(seconds: f64) -> ClipPatch {
    ClipPatch {
        fade_in: Some(seconds),
        fade_out: Some(seconds),
        ..Default::default()
    }
}

/// One-click motion effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEffect {
    ZoomIn,
    Tilt,
}

impl MotionEffect {
    pub fn patch(self) -> ClipPatch {
        match self {
            MotionEffect::ZoomIn => ClipPatch {
                scale: Some(1.5),
                ..Default::default()
            },
            MotionEffect::Tilt => ClipPatch {
                rotation: Some(15.0),
                ..Default::default()
            },
        }
    }
}

pub fn find_text_preset(name: &str) -> Option<&'static TextPreset> {
    TEXT_PRESETS.iter().find(|preset| preset.name.eq_ignore_ascii_case(name))
}

pub fn find_filter_preset(name: &str) -> Option<&'static FilterPreset> {
    FILTER_PRESETS.iter().find(|preset| preset.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_preset_template() {
        let preset = find_text_preset("yellow bold").unwrap();
        let template = preset.template();
        assert_eq!(template.kind, MediaKind::Text);
        assert_eq!(template.duration, DEFAULT_PRESET_DURATION_SECONDS);
        assert_eq!(template.properties.font_family, "Impact");
        assert_eq!(template.properties.text_color, "#facc15");
    }

    #[test]
    fn test_filter_patch_keeps_blur() {
        let patch = find_filter_preset("Noir").unwrap().patch();
        assert_eq!(patch.saturation, Some(0.0));
        assert_eq!(patch.blur, None);
    }

    #[test]
    fn test_sticker_and_audio_templates() {
        let sticker = sticker_template(STICKERS[0].0);
        assert_eq!(sticker.duration, STICKER_DURATION_SECONDS);
        assert_eq!(sticker.properties.font_size, STICKER_FONT_SIZE);

        let (name, duration) = AUDIO_LIBRARY[2];
        let audio = audio_template(name, duration);
        assert_eq!(audio.kind, MediaKind::Audio);
        assert_eq!(audio.duration, 30.0);
    }
}
