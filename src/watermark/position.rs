//! Position calculation for watermark placement.
//!
//! Converts a [`PositionSpec`] into the top-left pixel of a content box.
//!
//! # Position Modes
//!
//! - **9-grid anchors**: TopLeft, TopCenter, TopRight, CenterLeft, Center,
//!   CenterRight, BottomLeft, BottomCenter, BottomRight, offset by a margin
//! - **Explicit override**: a pixel coordinate returned as-is
//!
//! No clamping is performed. Coordinates may be negative or past the far
//! edge, e.g. while a watermark is dragged partially off-canvas.
//!
//! # Example
//!
//! ```
//! use photomark::watermark::position::{calculate_position, ImageDimensions, WatermarkDimensions};
//! use photomark::watermark::WatermarkPosition;
//!
//! let image = ImageDimensions { width: 800, height: 600 };
//! let watermark = WatermarkDimensions { width: 100, height: 50 };
//!
//! let pos = calculate_position(WatermarkPosition::BottomRight, &image, &watermark, 10);
//! assert_eq!((pos.x, pos.y), (690, 540)); // 800 - 100 - 10, 600 - 50 - 10
//! ```

use super::{PositionSpec, WatermarkPosition};

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn of(image: &image::DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Dimensions of the watermark content box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// A position where a watermark's top-left corner is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Resolve a [`PositionSpec`]: the explicit override if present, otherwise
/// the anchor formula.
pub fn resolve_position(
    spec: &PositionSpec,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> PlacementPosition {
    match spec.custom {
        Some((x, y)) => PlacementPosition::new(x, y),
        None => calculate_position(spec.anchor, image, watermark, spec.margin),
    }
}

/// Calculate the position for an anchored watermark.
///
/// # Arguments
///
/// * `position` - The 9-grid anchor
/// * `image` - Dimensions of the target image
/// * `watermark` - Dimensions of the watermark content box
/// * `margin` - Margin from edges in pixels
///
/// Centering halves with floor division, so a watermark larger than the
/// image gets the same (negative) coordinate on every platform.
pub fn calculate_position(
    position: WatermarkPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    margin: u32,
) -> PlacementPosition {
    let img_w = image.width as i64;
    let img_h = image.height as i64;
    let wm_w = watermark.width as i64;
    let wm_h = watermark.height as i64;
    let m = margin as i64;

    let center_x = (img_w - wm_w).div_euclid(2);
    let center_y = (img_h - wm_h).div_euclid(2);
    let right = img_w - wm_w - m;
    let bottom = img_h - wm_h - m;

    let (x, y) = match position {
        // Top row
        WatermarkPosition::TopLeft => (m, m),
        WatermarkPosition::TopCenter => (center_x, m),
        WatermarkPosition::TopRight => (right, m),

        // Center row
        WatermarkPosition::CenterLeft => (m, center_y),
        WatermarkPosition::Center => (center_x, center_y),
        WatermarkPosition::CenterRight => (right, center_y),

        // Bottom row
        WatermarkPosition::BottomLeft => (m, bottom),
        WatermarkPosition::BottomCenter => (center_x, bottom),
        WatermarkPosition::BottomRight => (right, bottom),
    };

    PlacementPosition::new(saturate(x), saturate(y))
}

fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Check if a placed box is at least partially visible within the image.
pub fn is_visible(
    pos: &PlacementPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> bool {
    let wm_right = pos.x as i64 + watermark.width as i64;
    let wm_bottom = pos.y as i64 + watermark.height as i64;

    (pos.x as i64) < image.width as i64
        && (pos.y as i64) < image.height as i64
        && wm_right > 0
        && wm_bottom > 0
}
