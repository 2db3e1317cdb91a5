//! Watermark engine: the render entrypoints.
//!
//! One [`WatermarkEngine`] is shared by every render. It owns the font
//! resolver (the only state shared between renders) and the layout
//! defaults from [`EngineConfig`].
//!
//! Rendering never fails. Each problem has a fallback, logged at `warn`:
//!
//! - unknown color or font: default color, fallback font
//! - missing or undecodable watermark asset: the base image, unchanged
//! - timestamp without a capture time: the base image, unchanged
//! - invalid scale parameters: minimum watermark size
//!
//! # Example
//!
//! ```no_run
//! use photomark::config::EngineConfig;
//! use photomark::watermark::{PositionSpec, TextStyle, WatermarkEngine, WatermarkPosition, WatermarkSpec};
//!
//! let engine = WatermarkEngine::new(&EngineConfig::default());
//! let photo = image::open("photo.jpg").unwrap();
//!
//! let spec = WatermarkSpec::Text(TextStyle::new("(C) 2025 Photomark"));
//! let position = PositionSpec::anchored(WatermarkPosition::BottomRight, 20);
//!
//! let (result, bbox) = engine.render_with_bbox(&photo, &spec, &position);
//! result.image.save("photo-marked.jpg").unwrap();
//! println!("watermark covers {:?}", bbox);
//! ```

use super::compositor::{adapt_format, composite, flatten_on_white};
use super::config::{ImageWatermarkStyle, OutputFormat, PositionSpec, TextStyle, WatermarkSpec};
use super::fonts::{FontQuery, FontResolver, FontResolverConfig};
use super::image_transform::{load_watermark_asset, transform_watermark};
use super::position::{is_visible, resolve_position, ImageDimensions, PlacementPosition, WatermarkDimensions};
use super::preview::{overlay_bbox, PixelBBox};
use super::text_renderer::{layout_text, render_text_layer};
use crate::config::EngineConfig;
use image::{DynamicImage, RgbaImage};
use std::time::Instant;
use tracing::{debug, warn};

/// Output of a render.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Fresh image; the base passed in is never modified
    pub image: DynamicImage,
    /// Visible watermark pixels in source coordinates
    pub bbox: Option<PixelBBox>,
    /// Resolved top-left of the watermark's content box, for turning a
    /// preset anchor into an explicit position when a drag starts
    pub anchor: Option<PlacementPosition>,
}

/// A rendered watermark ready to paste.
struct Overlay {
    image: RgbaImage,
    offset: PlacementPosition,
    anchor: PlacementPosition,
}

/// Renders watermark specs onto images.
#[derive(Debug)]
pub struct WatermarkEngine {
    fonts: FontResolver,
    base_padding: u32,
    output_format: Option<OutputFormat>,
}

impl Default for WatermarkEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl WatermarkEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fonts: FontResolver::new(FontResolverConfig {
                font_dirs: config.font_dirs.clone(),
                system_fonts: config.system_fonts,
                default_font: config.default_font.clone(),
            }),
            base_padding: config.base_padding,
            output_format: config.output_format,
        }
    }

    /// Engine around an existing resolver, with default layout settings.
    pub fn with_fonts(fonts: FontResolver) -> Self {
        let defaults = EngineConfig::default();
        Self {
            fonts,
            base_padding: defaults.base_padding,
            output_format: defaults.output_format,
        }
    }

    pub fn fonts(&self) -> &FontResolver {
        &self.fonts
    }

    /// Render for the configured output format (the source layout when
    /// none is configured).
    pub fn render(&self, base: &DynamicImage, spec: &WatermarkSpec, position: &PositionSpec) -> RenderResult {
        self.render_to(base, spec, position, self.output_format)
    }

    /// Render for a specific output format.
    pub fn render_as(
        &self,
        base: &DynamicImage,
        spec: &WatermarkSpec,
        position: &PositionSpec,
        format: OutputFormat,
    ) -> RenderResult {
        self.render_to(base, spec, position, Some(format))
    }

    /// Render and return the watermark's bounding box alongside.
    pub fn render_with_bbox(
        &self,
        base: &DynamicImage,
        spec: &WatermarkSpec,
        position: &PositionSpec,
    ) -> (RenderResult, Option<PixelBBox>) {
        let result = self.render(base, spec, position);
        let bbox = result.bbox;
        (result, bbox)
    }

    fn render_to(
        &self,
        base: &DynamicImage,
        spec: &WatermarkSpec,
        position: &PositionSpec,
        output: Option<OutputFormat>,
    ) -> RenderResult {
        let started = Instant::now();
        let dims = ImageDimensions::of(base);

        let Some(overlay) = self.prepare_overlay(base, spec, position) else {
            return RenderResult {
                image: unchanged(base, output),
                bbox: None,
                anchor: None,
            };
        };

        let overlay_size = WatermarkDimensions {
            width: overlay.image.width(),
            height: overlay.image.height(),
        };
        if !is_visible(&overlay.offset, &dims, &overlay_size) {
            debug!(
                offset_x = overlay.offset.x,
                offset_y = overlay.offset.y,
                "Watermark lies outside the image, nothing to draw"
            );
            return RenderResult {
                image: unchanged(base, output),
                bbox: None,
                anchor: Some(overlay.anchor),
            };
        }

        let composited = composite(base, &overlay.image, overlay.offset);
        let bbox = overlay_bbox(&overlay.image, overlay.offset, dims);
        let image = adapt_format(composited, base, output);

        debug!(
            kind = spec.kind(),
            width = dims.width,
            height = dims.height,
            offset_x = overlay.offset.x,
            offset_y = overlay.offset.y,
            bbox = ?bbox,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered watermark"
        );

        RenderResult {
            image,
            bbox,
            anchor: Some(overlay.anchor),
        }
    }

    fn prepare_overlay(&self, base: &DynamicImage, spec: &WatermarkSpec, position: &PositionSpec) -> Option<Overlay> {
        match spec {
            WatermarkSpec::Timestamp(timestamp) => match timestamp.to_text_style() {
                Some(style) => self.text_overlay(base, &style, position),
                None => {
                    warn!("Timestamp watermark has no capture time, leaving image unchanged");
                    None
                }
            },
            WatermarkSpec::Text(style) => self.text_overlay(base, style, position),
            WatermarkSpec::Image(style) => self.image_overlay(base, style, position),
        }
    }

    fn text_overlay(&self, base: &DynamicImage, style: &TextStyle, position: &PositionSpec) -> Option<Overlay> {
        let dims = ImageDimensions::of(base);
        let size = style.effective_size(dims.width, dims.height);
        let font = self.fonts.resolve_for_text(
            &FontQuery {
                path: style.font_path.as_deref(),
                family: style.font_family.as_deref(),
                bold: style.bold,
                italic: style.italic,
                text: &style.text,
            },
            size,
        );

        let layout = layout_text(&font, &style.text);
        if layout.is_blank() {
            debug!("Blank watermark text, nothing to draw");
            return None;
        }

        let anchor = resolve_position(position, &dims, &layout.dimensions());
        let layer = render_text_layer(&font, &layout, style, anchor, self.base_padding);
        Some(Overlay {
            image: layer.image,
            offset: layer.offset,
            anchor,
        })
    }

    fn image_overlay(
        &self,
        base: &DynamicImage,
        style: &ImageWatermarkStyle,
        position: &PositionSpec,
    ) -> Option<Overlay> {
        let dims = ImageDimensions::of(base);
        let prepared = load_watermark_asset(&style.path)
            .and_then(|asset| transform_watermark(&asset, style, &dims));

        let image = match prepared {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    path = %style.path.display(),
                    error = %e,
                    "Skipping image watermark, leaving image unchanged"
                );
                return None;
            }
        };

        let size = WatermarkDimensions {
            width: image.width(),
            height: image.height(),
        };
        let anchor = resolve_position(position, &dims, &size);
        Some(Overlay {
            image,
            offset: anchor,
            anchor,
        })
    }
}

/// The base image as the result of a render that drew nothing.
fn unchanged(base: &DynamicImage, output: Option<OutputFormat>) -> DynamicImage {
    match output {
        Some(format) if !format.supports_alpha() && base.color().has_alpha() => {
            DynamicImage::ImageRgb8(flatten_on_white(&base.to_rgba8()))
        }
        _ => base.clone(),
    }
}
