use image::Rgba32FImage;

use crate::state::ColorGrade;

/// CSS-style filter chain, applied in order: brightness, contrast, saturate,
/// hue-rotate, blur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterChain {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub hue_deg: f32,
    /// Gaussian standard deviation in device pixels.
    pub blur: f32,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            hue_deg: 0.0,
            blur: 0.0,
        }
    }
}

impl From<&ColorGrade> for FilterChain {
    fn from(grade: &ColorGrade) -> Self {
        Self {
            brightness: grade.brightness.max(0.0),
            contrast: grade.contrast.max(0.0),
            saturation: grade.saturation.max(0.0),
            hue_deg: grade.hue,
            blur: grade.blur.max(0.0),
        }
    }
}

type Matrix3 = [[f32; 3]; 3];

fn saturate_matrix(s: f32) -> Matrix3 {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn hue_rotate_matrix(degrees: f32) -> Matrix3 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn apply_matrix(m: &Matrix3, rgb: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (row, value) in m.iter().zip(out.iter_mut()) {
        *value = (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]).clamp(0.0, 1.0);
    }
    out
}

impl FilterChain {
    pub fn identity() -> Self {
        Self::default()
    }

    /// True when the color stage leaves pixels untouched.
    pub fn is_color_identity(&self) -> bool {
        self.brightness == 1.0
            && self.contrast == 1.0
            && self.saturation == 1.0
            && self.hue_deg.rem_euclid(360.0) == 0.0
    }

    pub fn is_identity(&self) -> bool {
        self.is_color_identity() && self.blur <= 0.0
    }

    /// Color stage for one straight-alpha RGB triple in [0, 1].
    pub fn apply_color(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut rgb = rgb.map(|v| (v * self.brightness).clamp(0.0, 1.0));
        rgb = rgb.map(|v| ((v - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0));
        if self.saturation != 1.0 {
            rgb = apply_matrix(&saturate_matrix(self.saturation), rgb);
        }
        if self.hue_deg.rem_euclid(360.0) != 0.0 {
            rgb = apply_matrix(&hue_rotate_matrix(self.hue_deg), rgb);
        }
        rgb
    }

    /// Run the whole chain over a premultiplied layer.
    pub fn apply_layer(&self, layer: &mut Rgba32FImage) {
        if !self.is_color_identity() {
            for pixel in layer.pixels_mut() {
                let alpha = pixel[3];
                if alpha <= 0.0 {
                    continue;
                }
                let straight = [pixel[0] / alpha, pixel[1] / alpha, pixel[2] / alpha];
                let [r, g, b] = self.apply_color(straight);
                pixel.0 = [r * alpha, g * alpha, b * alpha, alpha];
            }
        }
        if self.blur > 0.0 {
            *layer = imageproc::filter::gaussian_blur_f32(layer, self.blur);
        }
    }
}
