use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::RgbaImage;

use crate::constants::FALLBACK_GLYPH_WIDTH;

const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts",
    "/usr/local/share/fonts",
    "/Library/Fonts",
    "/System/Library/Fonts",
    "C:\\Windows\\Fonts",
];

/// Maximum directory depth searched below each font dir.
const MAX_FONT_DEPTH: usize = 4;

/// Bold faces tried for a family, most specific first.
fn candidates(family: &str) -> &'static [&'static str] {
    match family.trim().to_ascii_lowercase().as_str() {
        "impact" => &["impact.ttf", "Impact.ttf", "Anton-Regular.ttf", "DejaVuSans-Bold.ttf"],
        "verdana" => &["verdanab.ttf", "Verdana Bold.ttf", "DejaVuSans-Bold.ttf"],
        "courier new" => &[
            "courbd.ttf",
            "Courier New Bold.ttf",
            "LiberationMono-Bold.ttf",
            "DejaVuSansMono-Bold.ttf",
        ],
        _ => &[
            "arialbd.ttf",
            "Arial Bold.ttf",
            "LiberationSans-Bold.ttf",
            "DejaVuSans-Bold.ttf",
        ],
    }
}

fn find_file(dir: &Path, name: &str, depth: usize) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path
            .file_name()
            .and_then(|file| file.to_str())
            .is_some_and(|file| file.eq_ignore_ascii_case(name))
        {
            return Some(path);
        }
    }
    if depth == 0 {
        return None;
    }
    subdirs
        .iter()
        .find_map(|subdir| find_file(subdir, name, depth - 1))
}

/// Resolves font families to loaded faces, caching lookups (including misses).
#[derive(Default)]
pub struct FontBook {
    override_path: Option<PathBuf>,
    loaded: RefCell<HashMap<String, Option<FontArc>>>,
}

impl FontBook {
    /// `override_path` is used for every family when set.
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            loaded: RefCell::new(HashMap::new()),
        }
    }

    fn load_path(path: &Path) -> Option<FontArc> {
        let bytes = fs::read(path).ok()?;
        match FontArc::try_from_vec(bytes) {
            Ok(font) => Some(font),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Unreadable font file");
                None
            }
        }
    }

    fn locate(&self, family: &str) -> Option<FontArc> {
        if let Some(path) = &self.override_path {
            return Self::load_path(path);
        }
        candidates(family).iter().find_map(|name| {
            FONT_DIRS
                .iter()
                .find_map(|dir| find_file(Path::new(dir), name, MAX_FONT_DEPTH))
                .and_then(|path| Self::load_path(&path))
        })
    }

    /// Font for `family`, or `None` when nothing usable is installed.
    pub fn font(&self, family: &str) -> Option<FontArc> {
        let key = family.trim().to_ascii_lowercase();
        if let Some(cached) = self.loaded.borrow().get(&key) {
            return cached.clone();
        }
        let font = self.locate(family);
        if font.is_none() {
            tracing::warn!(family, "No font found; text will be measured but not drawn");
        }
        self.loaded.borrow_mut().insert(key, font.clone());
        font
    }

    /// Width and line height of `text` at `size` px.
    pub fn measure(&self, text: &str, family: &str, size: f32) -> (f32, f32) {
        match self.font(family) {
            Some(font) => {
                let (width, _) = imageproc::drawing::text_size(PxScale::from(size), &font, text);
                (width as f32, size)
            }
            None => (text.chars().count() as f32 * size * FALLBACK_GLYPH_WIDTH, size),
        }
    }

    /// Rasterize one line of text into a tight bitmap, or `None` without a font.
    pub fn render(&self, text: &str, family: &str, size: f32, color: image::Rgba<u8>) -> Option<RgbaImage> {
        let font = self.font(family)?;
        let scale = PxScale::from(size);
        let (width, _) = imageproc::drawing::text_size(scale, &font, text);
        // Leave room for ascenders and descenders around the em box.
        let height = (size * 1.25).ceil() as u32;
        let mut bitmap = RgbaImage::new(width.max(1) + 2, height.max(1));
        imageproc::drawing::draw_text_mut(&mut bitmap, color, 1, (size * 0.05) as i32, scale, &font, text);
        Some(bitmap)
    }
}
