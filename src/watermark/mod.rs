//! Watermark composition engine.
//!
//! Overlays a text, capture-timestamp or image watermark onto a photo and
//! maps the result back to an interactive preview.
//!
//! # Features
//!
//! - **Text watermarks** with multi-line layout, drop shadow, stroke and
//!   rotation, in any installed font (bold/italic synthesized when missing)
//! - **Timestamp watermarks** formatted from a supplied capture time
//! - **Image watermarks** scaled by percentage, exact pixels or to fit the
//!   target, with flips, rotation and opacity
//! - **9-grid positioning** with margin, or an explicit pixel position
//! - **Preview mapping** between source pixels and a scaled canvas
//!
//! # Example
//!
//! ```yaml
//! type: text
//! text: "Copyright 2025\nPhotomark"
//! size: 40
//! color: "#FFFFFF"
//! alpha: 0.7
//! shadow:
//!   blur: 3
//! rotation: -15
//! ```
//!
//! # Pipeline
//!
//! `WatermarkSpec` → font + position resolution → overlay layer and paste
//! offset → source-over composite on an RGBA copy → output format
//! adaptation → bounding box for preview feedback.

pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod fonts;
pub mod image_transform;
pub mod position;
pub mod preview;
pub mod processor;
pub mod raster;
pub mod text_renderer;

// Re-export main types for convenience
pub use color::{parse_color, parse_hex_color, resolve_color, Color};
pub use compositor::{adapt_format, composite, flatten_on_white};
pub use config::{
    auto_font_size, max_font_size, normalize_rotation, DateFormat, ImageWatermarkStyle, OutputFormat,
    PositionSpec, ScaleMode, ShadowStyle, StrokeStyle, TextStyle, TimestampStyle, WatermarkPosition,
    WatermarkSpec,
};
pub use error::WatermarkError;
pub use fonts::{FontHandle, FontQuery, FontResolver, FontResolverConfig};
pub use image_transform::{max_watermark_side, scaled_size, transform_watermark, MIN_WATERMARK_SIDE};
pub use position::{
    calculate_position, is_visible, resolve_position, ImageDimensions, PlacementPosition,
    WatermarkDimensions,
};
pub use preview::{overlay_bbox, CanvasRect, PixelBBox, PreviewTransform};
pub use processor::{RenderResult, WatermarkEngine};
pub use text_renderer::{layout_text, render_text_layer, TextLayer, TextLayout};
