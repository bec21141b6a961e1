//! Blend modes and pixel compositing used by the software renderer

use image::{Rgba, RgbaImage};

/// How a layer combines with what is already drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Standard alpha compositing (source over destination)
    #[default]
    Normal,
    /// Darkens underlying colors: result = base * blend
    Multiply,
    /// Lightens underlying colors: result = 1 - (1 - base) * (1 - blend)
    Screen,
    /// Combines multiply/screen based on base brightness
    Overlay,
}

impl BlendMode {
    /// Apply blend mode to a single color channel (values are 0.0-1.0)
    pub(crate) fn blend_channel(&self, base: f32, blend: f32) -> f32 {
        match self {
            BlendMode::Normal => blend,
            BlendMode::Multiply => base * blend,
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - blend),
            BlendMode::Overlay => {
                if base < 0.5 {
                    2.0 * base * blend
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - blend)
                }
            }
        }
    }
}

/// Per-pixel coverage applied on top of layer opacity.
///
/// `alpha_at` receives canvas coordinates and returns 0.0-1.0.
pub(crate) trait Coverage {
    fn alpha_at(&self, x: u32, y: u32) -> f32;
}

/// Full coverage everywhere.
pub(crate) struct Opaque;

impl Coverage for Opaque {
    fn alpha_at(&self, _x: u32, _y: u32) -> f32 {
        1.0
    }
}

/// Coverage taken from the alpha channel of an image placed on the canvas.
pub(crate) struct AlphaMask<'a> {
    pub image: &'a RgbaImage,
    pub x: i64,
    pub y: i64,
}

impl Coverage for AlphaMask<'_> {
    fn alpha_at(&self, x: u32, y: u32) -> f32 {
        let mx = x as i64 - self.x;
        let my = y as i64 - self.y;
        if mx < 0 || my < 0 || mx >= self.image.width() as i64 || my >= self.image.height() as i64 {
            return 0.0;
        }
        self.image.get_pixel(mx as u32, my as u32)[3] as f32 / 255.0
    }
}

/// Blit a sprite onto the canvas with blend mode, opacity and coverage.
///
/// `x`/`y` may be negative or extend past the canvas; out-of-bounds pixels are
/// clipped.
pub(crate) fn blit_blended(
    canvas: &mut RgbaImage,
    sprite: &RgbaImage,
    x: i64,
    y: i64,
    blend_mode: BlendMode,
    opacity: f32,
    coverage: &dyn Coverage,
) {
    let canvas_width = canvas.width() as i64;
    let canvas_height = canvas.height() as i64;
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity == 0.0 {
        return;
    }

    for (sy, row) in sprite.rows().enumerate() {
        let dest_y = y + sy as i64;
        if dest_y < 0 {
            continue;
        }
        if dest_y >= canvas_height {
            break;
        }

        for (sx, src) in row.enumerate() {
            let dest_x = x + sx as i64;
            if dest_x < 0 {
                continue;
            }
            if dest_x >= canvas_width {
                break;
            }
            // Fully transparent source, skip
            if src[3] == 0 {
                continue;
            }

            let (dx, dy) = (dest_x as u32, dest_y as u32);
            let src_alpha = (src[3] as f32 / 255.0) * opacity * coverage.alpha_at(dx, dy);
            if src_alpha <= 0.0 {
                continue;
            }

            let dst = canvas.get_pixel(dx, dy);
            let blended = blend_pixels(src, dst, blend_mode, src_alpha);
            canvas.put_pixel(dx, dy, blended);
        }
    }
}

/// Blend source pixel over destination using the specified blend mode and opacity.
pub(crate) fn blend_pixels(src: &Rgba<u8>, dst: &Rgba<u8>, mode: BlendMode, src_alpha: f32) -> Rgba<u8> {
    let dst_alpha = dst[3] as f32 / 255.0;

    let src_r = src[0] as f32 / 255.0;
    let src_g = src[1] as f32 / 255.0;
    let src_b = src[2] as f32 / 255.0;

    let dst_r = dst[0] as f32 / 255.0;
    let dst_g = dst[1] as f32 / 255.0;
    let dst_b = dst[2] as f32 / 255.0;

    // Blend against the backdrop only where there is one
    let mix = |d: f32, s: f32| -> f32 {
        let b = mode.blend_channel(d, s);
        s * (1.0 - dst_alpha) + b * dst_alpha
    };
    let blended_r = mix(dst_r, src_r);
    let blended_g = mix(dst_g, src_g);
    let blended_b = mix(dst_b, src_b);

    // out_alpha = src_alpha + dst_alpha * (1 - src_alpha)
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    if out_alpha == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let composite = |blended: f32, dst: f32| -> u8 {
        let result = (blended * src_alpha + dst * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        (result.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    Rgba([
        composite(blended_r, dst_r),
        composite(blended_g, dst_g),
        composite(blended_b, dst_b),
        (out_alpha * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_over_transparent() {
        let out = blend_pixels(&Rgba([255, 0, 0, 255]), &Rgba([0, 0, 0, 0]), BlendMode::Normal, 1.0);
        assert_eq!(out, Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_multiply_over_transparent_keeps_source() {
        // Nothing to multiply against: the source shows through unchanged.
        let out =
            blend_pixels(&Rgba([100, 150, 200, 255]), &Rgba([0, 0, 0, 0]), BlendMode::Multiply, 1.0);
        assert_eq!(out, Rgba([100, 150, 200, 255]));
    }

    #[test]
    fn test_screen_and_overlay_channels() {
        assert_eq!(BlendMode::Screen.blend_channel(0.5, 0.5), 0.75);
        assert_eq!(BlendMode::Overlay.blend_channel(0.25, 0.5), 0.25);
        assert_eq!(BlendMode::Overlay.blend_channel(0.75, 0.5), 0.75);
    }

    #[test]
    fn test_multiply_over_opaque() {
        let out =
            blend_pixels(&Rgba([128, 255, 0, 255]), &Rgba([255, 128, 255, 255]), BlendMode::Multiply, 1.0);
        assert_eq!(out, Rgba([128, 128, 0, 255]));
    }

    #[test]
    fn test_blit_clips_negative_offsets() {
        let mut canvas = RgbaImage::new(2, 2);
        let sprite = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        blit_blended(&mut canvas, &sprite, -1, -1, BlendMode::Normal, 1.0, &Opaque);
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(1, 1)[3], 0);
    }

    #[test]
    fn test_alpha_mask_limits_coverage() {
        let mut canvas = RgbaImage::new(2, 1);
        let sprite = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
        let mut mask = RgbaImage::new(2, 1);
        mask.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        let coverage = AlphaMask { image: &mask, x: 0, y: 0 };
        blit_blended(&mut canvas, &sprite, 0, 0, BlendMode::Normal, 1.0, &coverage);
        assert_eq!(canvas.get_pixel(0, 0)[3], 255);
        assert_eq!(canvas.get_pixel(1, 0)[3], 0);
    }
}
