//! Image watermark preparation: scale, flip, rotate, fade.
//!
//! The asset is resampled with Lanczos3 on premultiplied alpha so
//! transparent surroundings never darken the logo's anti-aliased edge.

use super::config::{normalize_rotation, ImageWatermarkStyle, ScaleMode};
use super::position::ImageDimensions;
use super::raster::{multiply_alpha, rotate_expand};
use super::WatermarkError;
use fast_image_resize as fr;
use image::{imageops, DynamicImage, RgbaImage};
use std::num::NonZeroU32;
use std::path::Path;

/// Smallest side a scaled watermark may have.
pub const MIN_WATERMARK_SIDE: u32 = 20;

/// Pixel size of the scaled watermark, before flips and rotation.
///
/// Every side is at least [`MIN_WATERMARK_SIDE`]. Oversized results shrink,
/// keeping their aspect, until both sides fit [`max_watermark_side`]. Zero, negative or
/// non-finite parameters are an error; see [`target_size`] for the
/// degrading variant.
pub fn scaled_size(
    scale: &ScaleMode,
    watermark: (u32, u32),
    target: &ImageDimensions,
) -> Result<(u32, u32), WatermarkError> {
    let (w, h) = watermark;
    if w == 0 || h == 0 {
        return Err(WatermarkError::InvalidScale(format!(
            "watermark image is {}x{}",
            w, h
        )));
    }
    let (wf, hf) = (w as f64, h as f64);

    let (sw, sh) = match *scale {
        ScaleMode::Percentage { percent } => {
            if !percent.is_finite() || percent <= 0.0 {
                return Err(WatermarkError::InvalidScale(format!(
                    "percentage {}",
                    percent
                )));
            }
            let factor = percent as f64 / 100.0;
            ((wf * factor).floor(), (hf * factor).floor())
        }
        ScaleMode::PixelExact {
            width,
            height,
            keep_aspect_ratio,
        } => {
            if width == 0 || height == 0 {
                return Err(WatermarkError::InvalidScale(format!(
                    "pixel size {}x{}",
                    width, height
                )));
            }
            if keep_aspect_ratio {
                let ratio = (width as f64 / wf).min(height as f64 / hf);
                ((wf * ratio).floor(), (hf * ratio).floor())
            } else {
                (width as f64, height as f64)
            }
        }
        ScaleMode::AdaptiveToTarget => {
            let max_side = (target.width.min(target.height) / 4) as f64;
            let ratio = (max_side / wf).min(max_side / hf);
            ((wf * ratio).floor(), (hf * ratio).floor())
        }
    };

    let cap = max_watermark_side(target) as f64;
    let shrink = (cap / sw).min(cap / sh).min(1.0);
    let (sw, sh) = if shrink < 1.0 {
        tracing::warn!(
            requested_width = sw,
            requested_height = sh,
            max_side = cap,
            "Watermark size capped"
        );
        ((sw * shrink).floor(), (sh * shrink).floor())
    } else {
        (sw, sh)
    };

    Ok((
        (sw as u32).max(MIN_WATERMARK_SIDE),
        (sh as u32).max(MIN_WATERMARK_SIDE),
    ))
}

/// Largest side a scaled watermark may have: twice the target's longer side.
pub fn max_watermark_side(target: &ImageDimensions) -> u32 {
    target
        .width
        .max(target.height)
        .saturating_mul(2)
        .max(MIN_WATERMARK_SIDE)
}

/// [`scaled_size`], degrading invalid parameters to the minimum size.
pub fn target_size(scale: &ScaleMode, watermark: (u32, u32), target: &ImageDimensions) -> (u32, u32) {
    scaled_size(scale, watermark, target).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Using minimum watermark size");
        (MIN_WATERMARK_SIDE, MIN_WATERMARK_SIDE)
    })
}

/// Open the watermark asset.
pub fn load_watermark_asset(path: &Path) -> Result<DynamicImage, WatermarkError> {
    if !path.is_file() {
        return Err(WatermarkError::MissingAsset(path.to_path_buf()));
    }
    image::open(path).map_err(|e| WatermarkError::decode(path.display().to_string(), e))
}

/// Resize with Lanczos3 on premultiplied alpha.
pub fn resize_rgba(image: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, WatermarkError> {
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }

    let non_zero = |value: u32, what: &str| {
        NonZeroU32::new(value).ok_or_else(|| WatermarkError::Resize(format!("{} is 0", what)))
    };
    let src_width = non_zero(image.width(), "Source width")?;
    let src_height = non_zero(image.height(), "Source height")?;
    let dst_width = non_zero(width, "Target width")?;
    let dst_height = non_zero(height, "Target height")?;

    let mut src_image = fr::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| WatermarkError::Resize(format!("Failed to create source image: {:?}", e)))?;

    let mul_div = fr::MulDiv::default();
    mul_div
        .multiply_alpha_inplace(&mut src_image.view_mut())
        .map_err(|e| WatermarkError::Resize(format!("Failed to premultiply alpha: {:?}", e)))?;

    let mut dst_image = fr::Image::new(dst_width, dst_height, fr::PixelType::U8x4);
    let mut resizer = fr::Resizer::new(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| WatermarkError::Resize(format!("Resize operation failed: {:?}", e)))?;

    mul_div
        .divide_alpha_inplace(&mut dst_image.view_mut())
        .map_err(|e| WatermarkError::Resize(format!("Failed to unpremultiply alpha: {:?}", e)))?;

    RgbaImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| WatermarkError::Resize("Failed to create output image buffer".to_string()))
}

/// Scale, flip, rotate and fade the asset for a target image.
///
/// Order matters: flips apply to the upright image, rotation follows,
/// and the global alpha multiplies the asset's own alpha last.
pub fn transform_watermark(
    asset: &DynamicImage,
    style: &ImageWatermarkStyle,
    target: &ImageDimensions,
) -> Result<RgbaImage, WatermarkError> {
    let (width, height) = target_size(&style.scale, (asset.width(), asset.height()), target);
    let mut image = resize_rgba(&asset.to_rgba8(), width, height)?;

    if style.flip_horizontal {
        imageops::flip_horizontal_in_place(&mut image);
    }
    if style.flip_vertical {
        imageops::flip_vertical_in_place(&mut image);
    }

    let degrees = normalize_rotation(style.rotation);
    if degrees != 0.0 {
        image = rotate_expand(&image, degrees);
    }

    multiply_alpha(&mut image, style.alpha);

    tracing::debug!(
        source_width = asset.width(),
        source_height = asset.height(),
        width = image.width(),
        height = image.height(),
        rotation = degrees,
        "Prepared image watermark"
    );
    Ok(image)
}
