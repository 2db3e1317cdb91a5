//! Preview coordinate mapping.
//!
//! An interactive caller shows the rendered photo scaled down on a canvas.
//! [`overlay_bbox`] finds the watermark's visible pixels in source space;
//! [`PreviewTransform`] maps between source pixels and canvas coordinates
//! so the box can be drawn on the canvas and drags can move the watermark.
//!
//! ```
//! use photomark::watermark::position::ImageDimensions;
//! use photomark::watermark::preview::PreviewTransform;
//!
//! let source = ImageDimensions { width: 4000, height: 3000 };
//! let canvas = ImageDimensions { width: 800, height: 800 };
//! let transform = PreviewTransform::fit(source, canvas);
//!
//! // 4000x3000 shown at 800x600, centered vertically
//! assert_eq!(transform.to_canvas_point(0, 0), (0.0, 100.0));
//! assert_eq!(transform.to_source_point(400.0, 400.0), (2000, 1500));
//! ```

use super::position::{ImageDimensions, PlacementPosition};
use super::raster::alpha_bbox;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Rectangle in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelBBox {
    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && y >= self.top && (x as i64) < self.right() && (y as i64) < self.bottom()
    }
}

/// Tight box around the overlay's non-transparent pixels once pasted at
/// `offset`, clipped to the base image. `None` when nothing is visible.
pub fn overlay_bbox(
    overlay: &RgbaImage,
    offset: PlacementPosition,
    canvas: ImageDimensions,
) -> Option<PixelBBox> {
    let (left, top, width, height) = alpha_bbox(overlay)?;

    let x0 = (offset.x as i64 + left as i64).max(0);
    let y0 = (offset.y as i64 + top as i64).max(0);
    let x1 = (offset.x as i64 + left as i64 + width as i64).min(canvas.width as i64);
    let y1 = (offset.y as i64 + top as i64 + height as i64).min(canvas.height as i64);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(PixelBBox {
        left: x0 as i32,
        top: y0 as i32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

/// Rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Mapping between source pixels and a scaled preview placed on a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewTransform {
    source: ImageDimensions,
    scale_x: f64,
    scale_y: f64,
    offset_x: f64,
    offset_y: f64,
    display_width: f64,
    display_height: f64,
}

impl PreviewTransform {
    /// A preview of `source` displayed at `preview` size with its top-left
    /// at `canvas_offset`.
    pub fn new(source: ImageDimensions, preview: ImageDimensions, canvas_offset: (f64, f64)) -> Self {
        let ratio = |shown: u32, full: u32| {
            if full == 0 {
                1.0
            } else {
                shown as f64 / full as f64
            }
        };
        Self {
            source,
            scale_x: ratio(preview.width, source.width),
            scale_y: ratio(preview.height, source.height),
            offset_x: canvas_offset.0,
            offset_y: canvas_offset.1,
            display_width: preview.width as f64,
            display_height: preview.height as f64,
        }
    }

    /// Scale `source` down to fit `canvas` (never up) and center it.
    pub fn fit(source: ImageDimensions, canvas: ImageDimensions) -> Self {
        if source.width == 0 || source.height == 0 {
            return Self::new(source, source, (0.0, 0.0));
        }
        let scale = (canvas.width as f64 / source.width as f64)
            .min(canvas.height as f64 / source.height as f64)
            .min(1.0);
        let preview = ImageDimensions {
            width: ((source.width as f64 * scale).round() as u32).max(1),
            height: ((source.height as f64 * scale).round() as u32).max(1),
        };
        let offset = (
            ((canvas.width as f64 - preview.width as f64) / 2.0).floor(),
            ((canvas.height as f64 - preview.height as f64) / 2.0).floor(),
        );
        Self::new(source, preview, offset)
    }

    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    pub fn canvas_offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// Source pixel to canvas point.
    pub fn to_canvas_point(&self, x: i32, y: i32) -> (f64, f64) {
        (
            self.offset_x + x as f64 * self.scale_x,
            self.offset_y + y as f64 * self.scale_y,
        )
    }

    /// Both corners of a source box, mapped to the canvas.
    pub fn to_canvas_rect(&self, bbox: &PixelBBox) -> CanvasRect {
        let (x, y) = self.to_canvas_point(bbox.left, bbox.top);
        CanvasRect {
            x,
            y,
            width: bbox.width as f64 * self.scale_x,
            height: bbox.height as f64 * self.scale_y,
        }
    }

    /// Canvas point to source pixel. Points outside the displayed image are
    /// clamped onto its edge first.
    pub fn to_source_point(&self, canvas_x: f64, canvas_y: f64) -> (i32, i32) {
        let clamp = |value: f64, start: f64, extent: f64| {
            if value.is_nan() {
                start
            } else {
                value.clamp(start, start + extent)
            }
        };
        let cx = clamp(canvas_x, self.offset_x, self.display_width);
        let cy = clamp(canvas_y, self.offset_y, self.display_height);

        let x = ((cx - self.offset_x) / self.scale_x).round();
        let y = ((cy - self.offset_y) / self.scale_y).round();
        (
            x.clamp(0.0, self.source.width as f64) as i32,
            y.clamp(0.0, self.source.height as f64) as i32,
        )
    }

    /// Canvas drag from `from` to `to`, in source pixels. Not clamped, so a
    /// watermark can be dragged partially off the image.
    pub fn drag_delta(&self, from: (f64, f64), to: (f64, f64)) -> (i32, i32) {
        let delta = |a: f64, b: f64, scale: f64| {
            let value = ((b - a) / scale).round();
            if value.is_finite() {
                value.clamp(i32::MIN as f64, i32::MAX as f64) as i32
            } else {
                0
            }
        };
        (
            delta(from.0, to.0, self.scale_x),
            delta(from.1, to.1, self.scale_y),
        )
    }
}
