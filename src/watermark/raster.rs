//! Pixel-level helpers shared by the renderers and the compositor.
//!
//! All layers are straight (non-premultiplied) RGBA8. Interpolation is done
//! on premultiplied values so transparent neighbours never bleed black into
//! anti-aliased edges.

use super::config::normalize_rotation;
use super::position::PlacementPosition;
use image::{imageops, Rgba, RgbaImage};

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
pub fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let opacity = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        1.0
    };

    if foreground[3] == 255 && opacity >= 1.0 {
        return foreground;
    }

    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity;
    if fg_alpha <= 0.0 {
        return background;
    }
    let bg_alpha = background[3] as f32 / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}

/// Blend `layer` onto `target` with its top-left at `position`.
///
/// Parts of the layer outside the target are skipped.
pub fn blend_layer(target: &mut RgbaImage, layer: &RgbaImage, position: PlacementPosition) {
    let target_width = target.width() as i64;
    let target_height = target.height() as i64;
    let (px, py) = (position.x as i64, position.y as i64);

    // Calculate the visible region (clamp to target bounds)
    let x_start = px.max(0);
    let y_start = py.max(0);
    let x_end = (px + layer.width() as i64).min(target_width);
    let y_end = (py + layer.height() as i64).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wm_pixel = *layer.get_pixel((tx - px) as u32, (ty - py) as u32);
            if wm_pixel[3] == 0 {
                continue;
            }
            let target_pixel = target.get_pixel_mut(tx as u32, ty as u32);
            *target_pixel = blend_pixels(*target_pixel, wm_pixel, 1.0);
        }
    }
}

/// Multiply every pixel's alpha by `factor` in place.
pub fn multiply_alpha(image: &mut RgbaImage, factor: f32) {
    let factor = if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        1.0
    };
    if factor >= 1.0 {
        return;
    }
    for pixel in image.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * factor) as u8;
    }
}

/// Tight bounding box `(left, top, width, height)` of pixels with alpha > 0.
pub fn alpha_bbox(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Rotate an image by `degrees`, positive is visually clockwise.
///
/// The canvas grows to hold every source pixel; newly exposed pixels are
/// transparent. The angle is normalized first, so 0/360 return an unchanged
/// copy and quarter turns are exact pixel permutations.
pub fn rotate_expand(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let normalized = normalize_rotation(degrees);
    if normalized == 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    if normalized == 90.0 {
        return imageops::rotate90(image);
    }
    if normalized == 180.0 {
        return imageops::rotate180(image);
    }
    if normalized == -90.0 {
        return imageops::rotate270(image);
    }

    let radians = normalized.to_radians() as f64;
    let cos = radians.cos();
    let sin = radians.sin();

    let src_w = image.width() as f64;
    let src_h = image.height() as f64;

    // Rotated bounding box
    let dst_w_f = src_w * cos.abs() + src_h * sin.abs();
    let dst_h_f = src_w * sin.abs() + src_h * cos.abs();
    let dst_w = ((dst_w_f - 1e-6).ceil() as u32).max(1);
    let dst_h = ((dst_h_f - 1e-6).ceil() as u32).max(1);

    let mut rotated = RgbaImage::new(dst_w, dst_h);

    let src_cx = src_w / 2.0;
    let src_cy = src_h / 2.0;
    let dst_cx = dst_w as f64 / 2.0;
    let dst_cy = dst_h as f64 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Inverse rotation of the destination pixel center
            let rx = dx as f64 + 0.5 - dst_cx;
            let ry = dy as f64 + 0.5 - dst_cy;

            let sx = rx * cos + ry * sin + src_cx - 0.5;
            let sy = -rx * sin + ry * cos + src_cy - 0.5;

            if let Some(pixel) = sample_bilinear(image, sx, sy) {
                rotated.put_pixel(dx, dy, pixel);
            }
        }
    }

    rotated
}

/// Bilinear sample at pixel-index coordinates, treating out-of-bounds
/// neighbours as transparent. Returns `None` when the result is transparent.
fn sample_bilinear(image: &RgbaImage, sx: f64, sy: f64) -> Option<Rgba<u8>> {
    let x0 = sx.floor();
    let y0 = sy.floor();
    if x0 < -1.0 || y0 < -1.0 || x0 >= image.width() as f64 || y0 >= image.height() as f64 {
        return None;
    }

    let fx = sx - x0;
    let fy = sy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let mut alpha = 0.0f64;
    let mut channels = [0.0f64; 3];

    for (x, y, weight) in taps {
        if weight <= 0.0
            || x < 0
            || y < 0
            || x >= image.width() as i64
            || y >= image.height() as i64
        {
            continue;
        }
        let p = image.get_pixel(x as u32, y as u32);
        let a = p[3] as f64 * weight;
        alpha += a;
        for (c, channel) in channels.iter_mut().enumerate() {
            *channel += p[c] as f64 * a;
        }
    }

    if alpha < 0.5 {
        return None;
    }

    let unpremultiply = |v: f64| (v / alpha).round().clamp(0.0, 255.0) as u8;
    Some(Rgba([
        unpremultiply(channels[0]),
        unpremultiply(channels[1]),
        unpremultiply(channels[2]),
        alpha.round().clamp(0.0, 255.0) as u8,
    ]))
}
