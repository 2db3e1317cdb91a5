//! Watermark compositing and output format adaptation.
//!
//! The base image is never touched: a working RGBA8 copy receives the
//! overlay with the "over" operator, then the result is narrowed to what
//! the destination can store.
//!
//! # Output layouts
//!
//! | Destination | Result |
//! |---|---|
//! | no alpha (JPEG, BMP) | RGB8, flattened onto white |
//! | alpha capable, or none given | the source's own layout (RGBA8, RGB8, L8, LA8); other layouts stay RGBA8 |

use super::config::OutputFormat;
use super::position::PlacementPosition;
use super::raster::blend_layer;
use image::{ColorType, DynamicImage, Rgb, RgbImage, RgbaImage};

/// Merge `layer` onto a copy of `base` with its top-left at `offset`.
pub fn composite(base: &DynamicImage, layer: &RgbaImage, offset: PlacementPosition) -> RgbaImage {
    let mut working = base.to_rgba8();
    blend_layer(&mut working, layer, offset);
    working
}

/// Narrow a composited RGBA8 image for `output`.
pub fn adapt_format(
    composited: RgbaImage,
    source: &DynamicImage,
    output: Option<OutputFormat>,
) -> DynamicImage {
    if let Some(format) = output {
        if !format.supports_alpha() {
            return DynamicImage::ImageRgb8(flatten_on_white(&composited));
        }
    }
    restore_layout(composited, source.color())
}

fn restore_layout(composited: RgbaImage, layout: ColorType) -> DynamicImage {
    let rgba = DynamicImage::ImageRgba8(composited);
    match layout {
        ColorType::Rgb8 => DynamicImage::ImageRgb8(rgba.to_rgb8()),
        ColorType::L8 => DynamicImage::ImageLuma8(rgba.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(rgba.to_luma_alpha8()),
        _ => rgba,
    }
}

/// Composite onto an opaque white background, using alpha as the mask.
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    let mut flat = RgbImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let channel = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        flat.put_pixel(x, y, Rgb([channel(pixel[0]), channel(pixel[1]), channel(pixel[2])]));
    }
    flat
}
