//! Watermark specification types.
//!
//! This module defines the in-memory watermark request:
//! - [`WatermarkSpec`]: exactly one of timestamp, text or image watermark
//! - Text styling with optional shadow and stroke effects
//! - Image watermark scaling, flipping and rotation
//! - [`PositionSpec`]: 9-grid anchor with margin, or an explicit pixel override
//!
//! All enums serialize as lowercase hyphenated strings so the structures can
//! be persisted by a template store without a separate mapping layer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Default values
fn default_text_color() -> String {
    "white".to_string()
}

fn default_effect_color() -> String {
    "black".to_string()
}

fn default_alpha() -> f32 {
    0.8
}

fn default_shadow_alpha() -> f32 {
    0.5
}

fn default_shadow_offset() -> i32 {
    2
}

fn default_shadow_blur() -> u32 {
    2
}

fn default_stroke_width() -> u32 {
    1
}

fn default_margin() -> u32 {
    20
}

fn default_scale_percent() -> f32 {
    20.0
}

fn default_pixel_size() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

/// Normalize an angle in degrees to `(-180, 180]`.
///
/// Non-finite angles normalize to `0`.
pub fn normalize_rotation(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Watermark anchor on the image (9-grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

impl WatermarkPosition {
    pub const ALL: [WatermarkPosition; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// The persisted (kebab-case) name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopCenter => "top-center",
            Self::TopRight => "top-right",
            Self::CenterLeft => "center-left",
            Self::Center => "center",
            Self::CenterRight => "center-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomCenter => "bottom-center",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl std::str::FromStr for WatermarkPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown position '{}'", s))
    }
}

/// Where the watermark's content box goes.
///
/// `custom`, when present, is the top-left pixel of the content box and
/// takes precedence over `anchor`/`margin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSpec {
    #[serde(default)]
    pub anchor: WatermarkPosition,

    /// Margin from the edges in pixels (default: 20)
    #[serde(default = "default_margin")]
    pub margin: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<(i32, i32)>,
}

impl Default for PositionSpec {
    fn default() -> Self {
        Self {
            anchor: WatermarkPosition::default(),
            margin: default_margin(),
            custom: None,
        }
    }
}

impl PositionSpec {
    pub fn anchored(anchor: WatermarkPosition, margin: u32) -> Self {
        Self {
            anchor,
            margin,
            custom: None,
        }
    }

    /// Explicit pixel placement; keeps the default anchor for when the
    /// override is later cleared.
    pub fn explicit(x: i32, y: i32) -> Self {
        Self {
            custom: Some((x, y)),
            ..Self::default()
        }
    }

    /// Explicit placement at `anchor` moved by `delta` source pixels.
    ///
    /// Used when a drag starts on a preset position: the resolved anchor of
    /// the previous render becomes the starting point.
    pub fn dragged_from(&self, anchor: (i32, i32), delta: (i32, i32)) -> Self {
        Self {
            custom: Some((anchor.0.saturating_add(delta.0), anchor.1.saturating_add(delta.1))),
            ..*self
        }
    }
}

/// Drop shadow drawn beneath the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowStyle {
    #[serde(default = "default_effect_color")]
    pub color: String,

    #[serde(default = "default_shadow_alpha")]
    pub alpha: f32,

    #[serde(default = "default_shadow_offset")]
    pub offset_x: i32,

    #[serde(default = "default_shadow_offset")]
    pub offset_y: i32,

    /// Gaussian blur radius in pixels; 0 draws a hard shadow
    #[serde(default = "default_shadow_blur")]
    pub blur: u32,
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            color: default_effect_color(),
            alpha: default_shadow_alpha(),
            offset_x: default_shadow_offset(),
            offset_y: default_shadow_offset(),
            blur: default_shadow_blur(),
        }
    }
}

/// Opaque outline around the glyphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    #[serde(default = "default_effect_color")]
    pub color: String,

    #[serde(default = "default_stroke_width")]
    pub width: u32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: default_effect_color(),
            width: default_stroke_width(),
        }
    }
}

/// Text watermark style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Text content; `\n` starts a new line
    #[serde(default)]
    pub text: String,

    /// Font file; sibling files in its directory are searched for bold/italic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    /// Font family, used when no `font_path` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,

    /// Font size in pixels; derived from the image when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Fill color, hex or named (default: "white")
    #[serde(default = "default_text_color")]
    pub color: String,

    /// Fill opacity from 0.0 to 1.0 (default: 0.8)
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<ShadowStyle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<StrokeStyle>,

    /// Rotation in degrees, positive is clockwise
    #[serde(default)]
    pub rotation: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_path: None,
            font_family: None,
            size: None,
            color: default_text_color(),
            alpha: default_alpha(),
            bold: false,
            italic: false,
            shadow: None,
            stroke: None,
            rotation: 0.0,
        }
    }
}

impl TextStyle {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Rotation normalized to `(-180, 180]` for display.
    pub fn display_rotation(&self) -> f32 {
        normalize_rotation(self.rotation)
    }

    /// Font size for an image of the given dimensions.
    ///
    /// An explicit size wins, up to [`max_font_size`]; otherwise 1/30 of
    /// the shorter side, kept within 16..=72 pixels.
    pub fn effective_size(&self, image_width: u32, image_height: u32) -> u32 {
        match self.size {
            Some(size) if size > 0 => {
                let cap = max_font_size(image_width, image_height);
                if size > cap {
                    tracing::warn!(requested = size, max = cap, "Font size capped");
                    cap
                } else {
                    size
                }
            }
            _ => auto_font_size(image_width, image_height),
        }
    }
}

/// Default font size: the shorter side / 30, clamped to `[16, 72]`.
pub fn auto_font_size(image_width: u32, image_height: u32) -> u32 {
    (image_width.min(image_height) / 30).clamp(16, 72)
}

/// Largest explicit font size: twice the longer side, never below 72.
pub fn max_font_size(image_width: u32, image_height: u32) -> u32 {
    image_width.max(image_height).saturating_mul(2).max(72)
}

/// Date layouts for timestamp watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateFormat {
    /// 2024-03-15
    #[default]
    YyyyMmDd,
    /// 2024/03/15
    YyyyMmDdSlash,
    /// 15-03-2024
    DdMmYyyy,
    /// 15/03/2024
    DdMmYyyySlash,
    /// Mar 15, 2024
    MmmDdYyyy,
    /// 15 Mar 2024
    DdMmmYyyy,
}

impl DateFormat {
    fn pattern(&self) -> &'static str {
        match self {
            Self::YyyyMmDd => "%Y-%m-%d",
            Self::YyyyMmDdSlash => "%Y/%m/%d",
            Self::DdMmYyyy => "%d-%m-%Y",
            Self::DdMmYyyySlash => "%d/%m/%Y",
            Self::MmmDdYyyy => "%b %d, %Y",
            Self::DdMmmYyyy => "%d %b %Y",
        }
    }

    pub fn format(&self, captured_at: &NaiveDateTime) -> String {
        captured_at.format(self.pattern()).to_string()
    }
}

/// Capture-time watermark. The caller supplies the capture time (usually
/// read from the photo's metadata); the text is derived from it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimestampStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<NaiveDateTime>,

    #[serde(default)]
    pub date_format: DateFormat,

    /// Appearance; its `text` is replaced by the formatted timestamp
    #[serde(flatten)]
    pub style: TextStyle,
}

impl TimestampStyle {
    /// The text style to render, or `None` when no capture time is known.
    pub fn to_text_style(&self) -> Option<TextStyle> {
        let captured_at = self.captured_at.as_ref()?;
        Some(TextStyle {
            text: self.date_format.format(captured_at),
            ..self.style.clone()
        })
    }
}

/// How an image watermark's pixel size is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ScaleMode {
    /// Both sides multiplied by `percent / 100`
    Percentage {
        #[serde(default = "default_scale_percent")]
        percent: f32,
    },
    /// Explicit size; with `keep_aspect_ratio` the limiting axis wins
    PixelExact {
        #[serde(default = "default_pixel_size")]
        width: u32,
        #[serde(default = "default_pixel_size")]
        height: u32,
        #[serde(default = "default_true")]
        keep_aspect_ratio: bool,
    },
    /// Longer side at most 1/4 of the target's shorter side
    AdaptiveToTarget,
}

impl Default for ScaleMode {
    fn default() -> Self {
        Self::Percentage {
            percent: default_scale_percent(),
        }
    }
}

/// Image watermark style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageWatermarkStyle {
    /// Path to the watermark image (PNG with alpha works best)
    pub path: PathBuf,

    #[serde(default)]
    pub scale: ScaleMode,

    /// Global opacity multiplied into the image's own alpha (default: 0.8)
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Rotation in degrees, positive is clockwise
    #[serde(default)]
    pub rotation: f32,

    #[serde(default)]
    pub flip_horizontal: bool,

    #[serde(default)]
    pub flip_vertical: bool,
}

impl ImageWatermarkStyle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scale: ScaleMode::default(),
            alpha: default_alpha(),
            rotation: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }
}

/// A watermark request - exactly one kind is active.
///
/// Uses serde tag to distinguish between kinds:
/// ```yaml
/// type: text
/// text: "Copyright 2025"
/// color: "#FFFFFF"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WatermarkSpec {
    Timestamp(TimestampStyle),
    Text(TextStyle),
    Image(ImageWatermarkStyle),
}

impl WatermarkSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timestamp(_) => "timestamp",
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }
}

/// Encoded output format the composited image is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Bmp,
    Tiff,
}

impl OutputFormat {
    /// Whether the format can store an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        matches!(self, Self::Png | Self::Webp | Self::Tiff)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Webp => image::ImageFormat::WebP,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tiff => image::ImageFormat::Tiff,
        }
    }
}
