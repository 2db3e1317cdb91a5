//! Text watermark rendering.
//!
//! Text is laid out line by line, rasterized once into a coverage mask and
//! then stamped onto a padded RGBA layer in three passes: shadow, stroke,
//! fill. Rotation happens last, around the layer center.
//!
//! # Example
//!
//! ```
//! use photomark::watermark::fonts::FontHandle;
//! use photomark::watermark::position::PlacementPosition;
//! use photomark::watermark::text_renderer::{layout_text, render_text_layer};
//! use photomark::watermark::TextStyle;
//!
//! let font = FontHandle::builtin(27.0);
//! let style = TextStyle::new("(C) 2025");
//! let layout = layout_text(&font, &style.text);
//!
//! let layer = render_text_layer(&font, &layout, &style, PlacementPosition::new(40, 40), 10);
//! assert_eq!(layer.offset, PlacementPosition::new(30, 30));
//! ```

use super::color::{alpha_to_u8, resolve_color, Color};
use super::config::{normalize_rotation, ShadowStyle, StrokeStyle, TextStyle};
use super::fonts::FontHandle;
use super::position::{PlacementPosition, WatermarkDimensions};
use super::raster::{blend_layer, rotate_expand};
use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};

/// Gap between lines as a fraction of the line height.
pub const LINE_SPACING_RATIO: f32 = 0.2;

/// One laid-out line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub text: String,
    /// Advance width in pixels, kerning included
    pub width: f32,
}

/// Measured text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<LineLayout>,
    pub ascent: f32,
    pub line_height: f32,
    pub line_spacing: f32,
    /// Content box: widest line by the stacked line heights
    pub width: u32,
    pub height: u32,
}

impl TextLayout {
    /// True when there is nothing to draw.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.text.trim().is_empty())
    }

    pub fn dimensions(&self) -> WatermarkDimensions {
        WatermarkDimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Baseline of line `index` relative to the content box top.
    pub fn baseline(&self, index: usize) -> f32 {
        index as f32 * (self.line_height + self.line_spacing) + self.ascent
    }
}

/// Measure `text` (split on line breaks) with `font`.
///
/// Whitespace-only text yields an empty layout with a zero content box.
pub fn layout_text(font: &FontHandle, text: &str) -> TextLayout {
    let ascent = font.ascent();
    let line_height = font.line_height();
    let line_spacing = line_height * LINE_SPACING_RATIO;

    if text.trim().is_empty() {
        return TextLayout {
            lines: Vec::new(),
            ascent,
            line_height,
            line_spacing,
            width: 0,
            height: 0,
        };
    }

    let lines: Vec<LineLayout> = text
        .lines()
        .map(|line| LineLayout {
            text: line.to_string(),
            width: font.line_width(line),
        })
        .collect();

    let widest = lines.iter().map(|l| l.width).fold(0.0_f32, f32::max);
    let count = lines.len() as f32;
    let height = count * line_height + (count - 1.0).max(0.0) * line_spacing;

    TextLayout {
        lines,
        ascent,
        line_height,
        line_spacing,
        width: widest.ceil().max(0.0) as u32,
        height: height.ceil().max(0.0) as u32,
    }
}

/// Transparent border around the content box so effects are not clipped:
/// base padding plus stroke width, the larger shadow offset, three blur
/// radii and the overhang of synthesized bold/italic.
pub fn text_padding(font: &FontHandle, style: &TextStyle, base_padding: u32) -> u32 {
    let stroke = style.stroke.as_ref().map_or(0, |s| s.width);
    let shadow = style.shadow.as_ref().map_or(0, |s| {
        s.offset_x
            .unsigned_abs()
            .max(s.offset_y.unsigned_abs())
            .saturating_add(s.blur.saturating_mul(3))
    });
    base_padding
        .saturating_add(stroke)
        .saturating_add(shadow)
        .saturating_add(font.synthetic_overhang())
}

/// A rendered text layer and where its top-left goes on the base image.
#[derive(Debug, Clone)]
pub struct TextLayer {
    pub image: RgbaImage,
    pub offset: PlacementPosition,
}

/// Render a laid-out text block whose content box has its top-left at
/// `anchor`.
///
/// The returned offset accounts for padding and, when rotated, keeps the
/// rotated layer centered where the unrotated one would have been.
pub fn render_text_layer(
    font: &FontHandle,
    layout: &TextLayout,
    style: &TextStyle,
    anchor: PlacementPosition,
    base_padding: u32,
) -> TextLayer {
    let pad = text_padding(font, style, base_padding);
    let width = layout.width.saturating_add(pad.saturating_mul(2)).max(1);
    let height = layout.height.saturating_add(pad.saturating_mul(2)).max(1);

    let mut layer = RgbaImage::new(width, height);
    if !layout.is_blank() {
        let mask = rasterize(font, layout, pad, width, height);

        if let Some(shadow) = &style.shadow {
            draw_shadow(&mut layer, &mask, shadow);
        }
        if let Some(stroke) = &style.stroke {
            draw_stroke(&mut layer, &mask, stroke);
        }
        let fill = resolve_color(&style.color, Color::white());
        stamp(&mut layer, &mask, 0, 0, fill, alpha_to_u8(style.alpha));
    }

    let origin_x = anchor.x as f64 - pad as f64;
    let origin_y = anchor.y as f64 - pad as f64;

    let degrees = normalize_rotation(style.rotation);
    if degrees == 0.0 {
        return TextLayer {
            image: layer,
            offset: PlacementPosition::new(round_i32(origin_x), round_i32(origin_y)),
        };
    }

    let rotated = rotate_expand(&layer, degrees);
    let dx = (width as f64 - rotated.width() as f64) / 2.0;
    let dy = (height as f64 - rotated.height() as f64) / 2.0;
    tracing::debug!(
        degrees,
        width = rotated.width(),
        height = rotated.height(),
        "Rotated text layer"
    );

    TextLayer {
        image: rotated,
        offset: PlacementPosition::new(round_i32(origin_x + dx), round_i32(origin_y + dy)),
    }
}

fn round_i32(value: f64) -> i32 {
    value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

/// Coverage of every line, drawn once.
fn rasterize(font: &FontHandle, layout: &TextLayout, pad: u32, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let left = pad as f32;

    for (index, line) in layout.lines.iter().enumerate() {
        let baseline = pad as f32 + layout.baseline(index);
        font.draw_line(&line.text, left, baseline, &mut |x, y, coverage| {
            if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
                return;
            }
            let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
            let pixel = mask.get_pixel_mut(x as u32, y as u32);
            pixel[0] = pixel[0].max(value);
        });
    }

    mask
}

/// Paint `color` at `alpha` through `mask` moved by `(dx, dy)`.
///
/// Each pixel moves toward the ink in proportion to coverage, alpha
/// included, so a translucent fill drawn over the stroke stays translucent.
/// Fully transparent pixels take the ink color outright.
fn stamp(layer: &mut RgbaImage, mask: &GrayImage, dx: i32, dy: i32, color: Color, alpha: u8) {
    let (width, height) = layer.dimensions();
    let ink = [color.r, color.g, color.b, alpha];

    for (x, y, Luma([coverage])) in mask.enumerate_pixels() {
        if *coverage == 0 {
            continue;
        }
        let tx = x as i64 + dx as i64;
        let ty = y as i64 + dy as i64;
        if tx < 0 || ty < 0 || tx >= width as i64 || ty >= height as i64 {
            continue;
        }
        let dst = layer.get_pixel_mut(tx as u32, ty as u32);
        *dst = paint_pixel(*dst, ink, *coverage);
    }
}

fn paint_pixel(dst: Rgba<u8>, ink: [u8; 4], coverage: u8) -> Rgba<u8> {
    let lerp = |from: u8, to: u8, weight: u32| -> u8 {
        let from = from as i32;
        let delta = (to as i32 - from) * weight as i32;
        (from + (delta + delta.signum() * 127) / 255) as u8
    };
    let color_weight = if dst[3] == 0 { 255 } else { coverage as u32 };
    Rgba([
        lerp(dst[0], ink[0], color_weight),
        lerp(dst[1], ink[1], color_weight),
        lerp(dst[2], ink[2], color_weight),
        lerp(dst[3], ink[3], coverage as u32),
    ])
}

fn draw_shadow(layer: &mut RgbaImage, mask: &GrayImage, shadow: &ShadowStyle) {
    let color = resolve_color(&shadow.color, Color::black());
    let alpha = alpha_to_u8(shadow.alpha);

    if shadow.blur == 0 {
        stamp(layer, mask, shadow.offset_x, shadow.offset_y, color, alpha);
        return;
    }

    // Transparent pixels carry the shadow color so the blur never pulls
    // another color into the soft edge.
    let (width, height) = layer.dimensions();
    let mut shadow_layer = RgbaImage::from_pixel(width, height, Rgba([color.r, color.g, color.b, 0]));
    stamp(&mut shadow_layer, mask, shadow.offset_x, shadow.offset_y, color, alpha);
    let blurred = imageops::blur(&shadow_layer, shadow.blur as f32);
    blend_layer(layer, &blurred, PlacementPosition::default());
}

/// Opaque outline: the mask dilated by `width` in every direction.
fn draw_stroke(layer: &mut RgbaImage, mask: &GrayImage, stroke: &StrokeStyle) {
    if stroke.width == 0 {
        return;
    }
    let color = resolve_color(&stroke.color, Color::black());
    let reach = stroke.width.min(i32::MAX as u32) as i32;
    let (width, height) = mask.dimensions();

    let mut outline = GrayImage::new(width, height);
    for (x, y, Luma([coverage])) in mask.enumerate_pixels() {
        if *coverage == 0 {
            continue;
        }
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let tx = x as i64 + dx as i64;
                let ty = y as i64 + dy as i64;
                if tx < 0 || ty < 0 || tx >= width as i64 || ty >= height as i64 {
                    continue;
                }
                let target = outline.get_pixel_mut(tx as u32, ty as u32);
                target[0] = target[0].max(*coverage);
            }
        }
    }

    stamp(layer, &outline, 0, 0, color, 255);
}
