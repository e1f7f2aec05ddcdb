//! Drawing surface abstraction.
//!
//! The compositor talks to a `Surface` with canvas-2D-like semantics: every
//! draw call carries a transform, a global alpha, a blend mode and a filter
//! chain. `RasterSurface` is the CPU implementation used for preview frames
//! and export.

mod blend;
mod filters;
mod raster;
mod text;

pub use blend::{blend_channel, composite_pixel};
pub use filters::FilterChain;
pub use raster::RasterSurface;
pub use text::FontBook;

use image::{Rgba, RgbaImage};

use crate::state::BlendMode;

/// 2D affine transform in canvas order: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// `self` applied after `inner`.
    pub fn multiply(&self, inner: &Affine) -> Affine {
        Affine {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    /// Post-multiply a translation, like `ctx.translate`.
    pub fn translate(&self, tx: f32, ty: f32) -> Affine {
        self.multiply(&Affine {
            e: tx,
            f: ty,
            ..Affine::IDENTITY
        })
    }

    /// Post-multiply a clockwise rotation in degrees, like `ctx.rotate`.
    pub fn rotate_deg(&self, degrees: f32) -> Affine {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.multiply(&Affine {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        })
    }

    /// Post-multiply a scale, like `ctx.scale`.
    pub fn scale(&self, sx: f32, sy: f32) -> Affine {
        self.multiply(&Affine {
            a: sx,
            d: sy,
            ..Affine::IDENTITY
        })
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// None for degenerate transforms (e.g. zero scale).
    pub fn invert(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-9 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }

    /// Device-space bounding box of a local rectangle: (min_x, min_y, max_x, max_y).
    pub fn bounds(&self, x: f32, y: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
        let corners = [
            self.apply(x, y),
            self.apply(x + w, y),
            self.apply(x, y + h),
            self.apply(x + w, y + h),
        ];
        corners.iter().fold(
            (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(px, py)| {
                (min_x.min(px), min_y.min(py), max_x.max(px), max_y.max(py))
            },
        )
    }
}

/// Per-draw state, the equivalent of a saved canvas context.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawState {
    pub transform: Affine,
    /// Global alpha in [0, 1].
    pub alpha: f32,
    pub blend: BlendMode,
    pub filter: FilterChain,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            alpha: 1.0,
            blend: BlendMode::Normal,
            filter: FilterChain::default(),
        }
    }
}

/// Drop shadow drawn beneath a shape, offset in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Rgba<u8>,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub color: Rgba<u8>,
    pub shadow: Option<Shadow>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba<u8>,
    pub width: f32,
    /// Equal on/off dash length; solid when `None`.
    pub dash: Option<f32>,
}

/// A 2D drawing target. Shapes are positioned in local coordinates and
/// centred on the origin; the draw state maps them to the device.
pub trait Surface {
    fn size(&self) -> (u32, u32);
    fn clear(&mut self, color: Rgba<u8>);
    /// Draw `image` at its native size, centred on the local origin.
    fn draw_image(&mut self, image: &RgbaImage, state: &DrawState);
    /// Draw a single line of text centred on the local origin.
    fn draw_text(&mut self, text: &str, style: &TextStyle, state: &DrawState);
    /// Width and height of `text` in local units.
    fn measure_text(&self, text: &str, style: &TextStyle) -> (f32, f32);
    /// Outline a local rectangle.
    fn stroke_rect(&mut self, rect: (f32, f32, f32, f32), stroke: &StrokeStyle, state: &DrawState);
    fn read_pixels(&self) -> RgbaImage;
}
