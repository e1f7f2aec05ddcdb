use image::{Rgba, Rgba32FImage, RgbaImage};

use super::{composite_pixel, Affine, DrawState, FontBook, Shadow, StrokeStyle, Surface, TextStyle};
use crate::state::BlendMode;

/// Premultiplied scratch layer positioned on the canvas.
struct Layer {
    pixels: Rgba32FImage,
    x: i32,
    y: i32,
}

/// CPU canvas. Each draw call is rasterized into a layer covering only the
/// shape's device bounds, filtered, then composited onto the canvas.
pub struct RasterSurface {
    canvas: RgbaImage,
    fonts: FontBook,
}

fn premultiplied(pixel: &Rgba<u8>) -> [f32; 4] {
    let alpha = pixel[3] as f32 / 255.0;
    [
        pixel[0] as f32 / 255.0 * alpha,
        pixel[1] as f32 / 255.0 * alpha,
        pixel[2] as f32 / 255.0 * alpha,
        alpha,
    ]
}

fn sample_bilinear(image: &RgbaImage, sx: f32, sy: f32) -> [f32; 4] {
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);
    let fetch = |x: i64, y: i64| -> [f32; 4] {
        if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
            return [0.0; 4];
        }
        premultiplied(image.get_pixel(x as u32, y as u32))
    };
    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);
    let mut out = [0.0; 4];
    for i in 0..4 {
        let top = p00[i] * (1.0 - fx) + p10[i] * fx;
        let bottom = p01[i] * (1.0 - fx) + p11[i] * fx;
        out[i] = top * (1.0 - fy) + bottom * fy;
    }
    out
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_fonts(width, height, FontBook::default())
    }

    pub fn with_fonts(width: u32, height: u32, fonts: FontBook) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([0, 0, 0, 255])),
            fonts,
        }
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Device rectangle covering `bounds` plus `margin`, clipped to the canvas.
    fn device_rect(&self, bounds: (f32, f32, f32, f32), margin: f32) -> Option<(i32, i32, u32, u32)> {
        let (min_x, min_y, max_x, max_y) = bounds;
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }
        let x0 = ((min_x - margin).floor() as i64).max(0);
        let y0 = ((min_y - margin).floor() as i64).max(0);
        let x1 = ((max_x + margin).ceil() as i64).min(self.canvas.width() as i64);
        let y1 = ((max_y + margin).ceil() as i64).min(self.canvas.height() as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Resample `image` (centred on the local origin) through `transform`.
    fn rasterize(&self, image: &RgbaImage, transform: &Affine, margin: f32) -> Option<Layer> {
        let inverse = transform.invert()?;
        let (w, h) = (image.width() as f32, image.height() as f32);
        let bounds = transform.bounds(-w / 2.0, -h / 2.0, w, h);
        let (x, y, width, height) = self.device_rect(bounds, margin)?;

        let mut pixels = Rgba32FImage::new(width, height);
        for (px, py, pixel) in pixels.enumerate_pixels_mut() {
            let (lx, ly) = inverse.apply(x as f32 + px as f32 + 0.5, y as f32 + py as f32 + 0.5);
            let sx = lx + w / 2.0 - 0.5;
            let sy = ly + h / 2.0 - 0.5;
            if sx < -1.0 || sy < -1.0 || sx > w || sy > h {
                continue;
            }
            pixel.0 = sample_bilinear(image, sx, sy);
        }
        Some(Layer { pixels, x, y })
    }

    fn composite(&mut self, layer: &Layer, dx: i32, dy: i32, alpha: f32, blend: BlendMode) {
        let (canvas_w, canvas_h) = (self.canvas.width() as i32, self.canvas.height() as i32);
        for (px, py, pixel) in layer.pixels.enumerate_pixels() {
            let cx = layer.x + px as i32 + dx;
            let cy = layer.y + py as i32 + dy;
            if cx < 0 || cy < 0 || cx >= canvas_w || cy >= canvas_h {
                continue;
            }
            composite_pixel(self.canvas.get_pixel_mut(cx as u32, cy as u32), pixel.0, blend, alpha);
        }
    }

    fn draw_shadow(&mut self, layer: &Layer, shadow: &Shadow, state: &DrawState) {
        let tint = premultiplied(&shadow.color);
        let mut silhouette = Rgba32FImage::new(layer.pixels.width(), layer.pixels.height());
        for (src, dst) in layer.pixels.pixels().zip(silhouette.pixels_mut()) {
            let coverage = src[3];
            dst.0 = tint.map(|channel| channel * coverage);
        }
        // Canvas shadowBlur is twice the gaussian sigma.
        if shadow.blur > 0.0 {
            silhouette = imageproc::filter::gaussian_blur_f32(&silhouette, shadow.blur / 2.0);
        }
        let shadow_layer = Layer {
            pixels: silhouette,
            x: layer.x,
            y: layer.y,
        };
        self.composite(
            &shadow_layer,
            shadow.offset_x.round() as i32,
            shadow.offset_y.round() as i32,
            state.alpha,
            state.blend,
        );
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn clear(&mut self, color: Rgba<u8>) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = color;
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, state: &DrawState) {
        if state.alpha <= 0.0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let margin = state.filter.blur * 3.0 + 1.0;
        let Some(mut layer) = self.rasterize(image, &state.transform, margin) else {
            return;
        };
        state.filter.apply_layer(&mut layer.pixels);
        self.composite(&layer, 0, 0, state.alpha, state.blend);
    }

    fn draw_text(&mut self, text: &str, style: &TextStyle, state: &DrawState) {
        if state.alpha <= 0.0 || text.is_empty() {
            return;
        }
        let Some(bitmap) = self
            .fonts
            .render(text, &style.font_family, style.font_size, style.color)
        else {
            return;
        };
        let shadow_margin = style
            .shadow
            .map(|shadow| shadow.blur * 1.5 + shadow.offset_x.abs().max(shadow.offset_y.abs()))
            .unwrap_or(0.0);
        let margin = state.filter.blur * 3.0 + shadow_margin + 1.0;
        let Some(mut layer) = self.rasterize(&bitmap, &state.transform, margin) else {
            return;
        };
        state.filter.apply_layer(&mut layer.pixels);
        if let Some(shadow) = &style.shadow {
            self.draw_shadow(&layer, shadow, state);
        }
        self.composite(&layer, 0, 0, state.alpha, state.blend);
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> (f32, f32) {
        self.fonts.measure(text, &style.font_family, style.font_size)
    }

    fn stroke_rect(&mut self, rect: (f32, f32, f32, f32), stroke: &StrokeStyle, state: &DrawState) {
        let (x, y, w, h) = rect;
        let Some(inverse) = state.transform.invert() else {
            return;
        };
        let half = stroke.width.max(0.0) / 2.0;
        let t = &state.transform;
        let device_scale = (t.a * t.d - t.b * t.c).abs().sqrt();
        let bounds = t.bounds(x, y, w, h);
        let Some((dx, dy, width, height)) = self.device_rect(bounds, half * device_scale + 1.0) else {
            return;
        };

        let color = premultiplied(&stroke.color);
        let (canvas_w, canvas_h) = (self.canvas.width(), self.canvas.height());
        for py in 0..height {
            for px in 0..width {
                let cx = dx as u32 + px;
                let cy = dy as u32 + py;
                if cx >= canvas_w || cy >= canvas_h {
                    continue;
                }
                let (lx, ly) = inverse.apply(cx as f32 + 0.5, cy as f32 + 0.5);
                let outside_outer = lx < x - half || lx > x + w + half || ly < y - half || ly > y + h + half;
                let inside_inner =
                    lx > x + half && lx < x + w - half && ly > y + half && ly < y + h - half;
                if outside_outer || inside_inner {
                    continue;
                }
                if let Some(dash) = stroke.dash.filter(|dash| *dash > 0.0) {
                    if !dash_on(lx - x, ly - y, w, h, dash) {
                        continue;
                    }
                }
                composite_pixel(self.canvas.get_pixel_mut(cx, cy), color, BlendMode::Normal, state.alpha);
            }
        }
    }

    fn read_pixels(&self) -> RgbaImage {
        self.canvas.clone()
    }
}

/// Whether a point near the rectangle outline falls on a dash. The pattern
/// runs clockwise from the top-left corner.
fn dash_on(lx: f32, ly: f32, w: f32, h: f32, dash: f32) -> bool {
    let edges = [ly.abs(), (lx - w).abs(), (ly - h).abs(), lx.abs()];
    let (edge, _) = edges
        .iter()
        .enumerate()
        .fold((0, f32::INFINITY), |best, (index, distance)| {
            if *distance < best.1 {
                (index, *distance)
            } else {
                best
            }
        });
    let along = match edge {
        0 => lx,
        1 => w + ly,
        2 => w + h + (w - lx),
        _ => 2.0 * w + h + (h - ly),
    };
    along.rem_euclid(2.0 * dash) < dash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::surface::FilterChain;

    fn centred(surface: &RasterSurface) -> DrawState {
        let (w, h) = surface.size();
        DrawState {
            transform: Affine::IDENTITY.translate(w as f32 / 2.0, h as f32 / 2.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_draw_image_centred() {
        let mut surface = RasterSurface::new(20, 20);
        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let state = centred(&surface);
        surface.draw_image(&red, &state);
        let pixels = surface.read_pixels();
        assert_eq!(*pixels.get_pixel(10, 10), Rgba([255, 0, 0, 255]));
        assert_eq!(*pixels.get_pixel(8, 8), Rgba([255, 0, 0, 255]));
        assert_eq!(*pixels.get_pixel(2, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_global_alpha_and_filter() {
        let mut surface = RasterSurface::new(10, 10);
        let white = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let state = DrawState {
            alpha: 0.5,
            filter: FilterChain {
                brightness: 0.5,
                ..Default::default()
            },
            ..centred(&surface)
        };
        surface.draw_image(&white, &state);
        let pixel = *surface.read_pixels().get_pixel(5, 5);
        assert!((pixel[0] as i32 - 64).abs() <= 1, "got {:?}", pixel);
    }

    #[test]
    fn test_zero_scale_draws_nothing() {
        let mut surface = RasterSurface::new(10, 10);
        let white = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let mut state = centred(&surface);
        state.transform = state.transform.scale(0.0, 0.0);
        surface.draw_image(&white, &state);
        assert!(surface.read_pixels().pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_dashed_stroke_has_gaps() {
        let mut surface = RasterSurface::new(40, 40);
        let state = centred(&surface);
        let stroke = StrokeStyle {
            color: Rgba([255, 255, 255, 255]),
            width: 2.0,
            dash: Some(5.0),
        };
        surface.stroke_rect((-15.0, -15.0, 30.0, 30.0), &stroke, &state);
        let pixels = surface.read_pixels();
        // Top edge runs along y = 5: on for [5, 10), off for [10, 15).
        assert_eq!(pixels.get_pixel(7, 5)[0], 255);
        assert_eq!(pixels.get_pixel(12, 5)[0], 0);
        // Interior untouched.
        assert_eq!(pixels.get_pixel(20, 20)[0], 0);
    }

    #[test]
    fn test_text_without_font_is_skipped() {
        let fonts = FontBook::new(Some("/nonexistent/font.ttf".into()));
        let mut surface = RasterSurface::with_fonts(10, 10, fonts);
        let style = TextStyle {
            font_family: "Arial".to_string(),
            font_size: 12.0,
            color: Rgba([255, 255, 255, 255]),
            shadow: None,
        };
        let state = centred(&surface);
        surface.draw_text("Hi", &style, &state);
        assert!(surface.read_pixels().pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
        assert!(surface.measure_text("Hi", &style).0 > 0.0);
    }
}
