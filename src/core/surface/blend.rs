use image::Rgba;

use crate::state::BlendMode;

/// Separable blend function `B(cb, cs)` on straight colors in [0, 1].
pub fn blend_channel(mode: BlendMode, cb: f32, cs: f32) -> f32 {
    match mode {
        BlendMode::Normal | BlendMode::Add => cs,
        BlendMode::Multiply => cb * cs,
        BlendMode::Screen => cb + cs - cb * cs,
        BlendMode::Overlay => {
            // Hard-light with the layers swapped.
            if cb <= 0.5 {
                2.0 * cb * cs
            } else {
                let s = 2.0 * cb - 1.0;
                s + cs - s * cs
            }
        }
        BlendMode::Darken => cb.min(cs),
        BlendMode::Lighten => cb.max(cs),
        BlendMode::Difference => (cb - cs).abs(),
    }
}

/// Composite one premultiplied source pixel over `dst` (straight alpha, 8-bit)
/// with an extra global alpha.
pub fn composite_pixel(dst: &mut Rgba<u8>, src: [f32; 4], mode: BlendMode, global_alpha: f32) {
    let alpha_s = (src[3] * global_alpha).clamp(0.0, 1.0);
    if alpha_s <= 0.0 {
        return;
    }
    let straight_s = [src[0] / src[3], src[1] / src[3], src[2] / src[3]];
    let alpha_b = dst[3] as f32 / 255.0;
    let cb = [
        dst[0] as f32 / 255.0,
        dst[1] as f32 / 255.0,
        dst[2] as f32 / 255.0,
    ];

    let (alpha_o, co): (f32, [f32; 3]) = if mode == BlendMode::Add {
        let alpha_o = (alpha_s + alpha_b).min(1.0);
        let co = [0, 1, 2].map(|i| (alpha_s * straight_s[i] + alpha_b * cb[i]).min(1.0));
        (alpha_o, co)
    } else {
        let alpha_o = alpha_s + alpha_b * (1.0 - alpha_s);
        let co = [0, 1, 2].map(|i| {
            let mixed = blend_channel(mode, cb[i], straight_s[i].clamp(0.0, 1.0));
            alpha_s * (1.0 - alpha_b) * straight_s[i]
                + alpha_s * alpha_b * mixed
                + (1.0 - alpha_s) * alpha_b * cb[i]
        });
        (alpha_o, co)
    };

    if alpha_o <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    *dst = Rgba([
        to_u8(co[0] / alpha_o),
        to_u8(co[1] / alpha_o),
        to_u8(co[2] / alpha_o),
        to_u8(alpha_o),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_half_alpha_over_black() {
        let mut dst = Rgba([0, 0, 0, 255]);
        composite_pixel(&mut dst, [1.0, 1.0, 1.0, 1.0], BlendMode::Normal, 0.5);
        assert_eq!(dst, Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn test_multiply_and_screen() {
        let mut dst = Rgba([128, 255, 0, 255]);
        composite_pixel(&mut dst, [0.5, 0.5, 0.5, 1.0], BlendMode::Multiply, 1.0);
        assert_eq!(dst, Rgba([64, 128, 0, 255]));

        let mut dst = Rgba([0, 255, 51, 255]);
        composite_pixel(&mut dst, [0.5, 0.5, 0.5, 1.0], BlendMode::Screen, 1.0);
        assert_eq!(dst, Rgba([128, 255, 153, 255]));
    }

    #[test]
    fn test_add_saturates() {
        let mut dst = Rgba([200, 10, 0, 255]);
        composite_pixel(&mut dst, [0.4, 0.4, 0.4, 1.0], BlendMode::Add, 1.0);
        assert_eq!(dst, Rgba([255, 112, 102, 255]));
    }

    #[test]
    fn test_transparent_source_leaves_destination() {
        let mut dst = Rgba([10, 20, 30, 255]);
        composite_pixel(&mut dst, [0.0, 0.0, 0.0, 0.0], BlendMode::Difference, 1.0);
        assert_eq!(dst, Rgba([10, 20, 30, 255]));
    }
}
