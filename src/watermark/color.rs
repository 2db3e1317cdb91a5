//! Color parsing for watermark styles.
//!
//! Styles carry colors as strings so they survive the persisted template
//! form unchanged. Accepted forms:
//!
//! - `#RGB` and `#RRGGBB` hex
//! - CSS/X11 names for the common colors (`white`, `black`, `red`, `gray`, ...)
//!
//! A color that fails to parse is a style resolution failure; renderers call
//! [`resolve_color`] which logs the failure and substitutes a fallback.

use super::WatermarkError;
use image::Rgba;

/// Parsed RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// White color.
    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color.
    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Combine with an opacity in `[0, 1]` into an RGBA pixel.
    pub fn with_alpha(self, alpha: f32) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha_to_u8(alpha)])
    }
}

/// Convert a `[0, 1]` opacity into an 8-bit alpha, truncating like `int(a * 255)`.
pub fn alpha_to_u8(alpha: f32) -> u8 {
    if !alpha.is_finite() {
        return 255;
    }
    (alpha.clamp(0.0, 1.0) * 255.0) as u8
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("white", Color::new(255, 255, 255)),
    ("black", Color::new(0, 0, 0)),
    ("red", Color::new(255, 0, 0)),
    ("green", Color::new(0, 128, 0)),
    ("lime", Color::new(0, 255, 0)),
    ("blue", Color::new(0, 0, 255)),
    ("yellow", Color::new(255, 255, 0)),
    ("cyan", Color::new(0, 255, 255)),
    ("aqua", Color::new(0, 255, 255)),
    ("magenta", Color::new(255, 0, 255)),
    ("fuchsia", Color::new(255, 0, 255)),
    ("gray", Color::new(128, 128, 128)),
    ("grey", Color::new(128, 128, 128)),
    ("lightgray", Color::new(211, 211, 211)),
    ("lightgrey", Color::new(211, 211, 211)),
    ("darkgray", Color::new(169, 169, 169)),
    ("darkgrey", Color::new(169, 169, 169)),
    ("silver", Color::new(192, 192, 192)),
    ("orange", Color::new(255, 165, 0)),
    ("purple", Color::new(128, 0, 128)),
    ("pink", Color::new(255, 192, 203)),
    ("brown", Color::new(165, 42, 42)),
    ("navy", Color::new(0, 0, 128)),
    ("maroon", Color::new(128, 0, 0)),
    ("olive", Color::new(128, 128, 0)),
    ("teal", Color::new(0, 128, 128)),
    ("gold", Color::new(255, 215, 0)),
];

/// Parse a color string (hex or named).
pub fn parse_color(value: &str) -> Result<Color, WatermarkError> {
    let trimmed = value.trim();
    if trimmed.starts_with('#') {
        return parse_hex_color(trimmed);
    }

    let lowered = trimmed.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, color)| *color)
        .ok_or_else(|| WatermarkError::StyleResolution(format!("unknown color '{}'", value)))
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::StyleResolution("Color must start with '#'".to_string()))?;

    let digit = |s: &str| {
        u8::from_str_radix(s, 16).map_err(|_| {
            WatermarkError::StyleResolution(format!("Invalid hex digit in '#{}'", hex))
        })
    };

    // from_str_radix accepts a leading '+', which is never a valid digit here
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WatermarkError::StyleResolution(format!(
            "Invalid hex digit in '#{}'",
            hex
        )));
    }

    match hex.len() {
        // #RGB - each digit doubled: 0xF -> 0xFF, 0xA -> 0xAA
        3 => Ok(Color::new(
            digit(&hex[0..1])? * 17,
            digit(&hex[1..2])? * 17,
            digit(&hex[2..3])? * 17,
        )),
        6 => Ok(Color::new(
            digit(&hex[0..2])?,
            digit(&hex[2..4])?,
            digit(&hex[4..6])?,
        )),
        _ => Err(WatermarkError::StyleResolution(format!(
            "Color must be #RGB or #RRGGBB format, got {} characters",
            hex.len()
        ))),
    }
}

/// Parse a color, substituting `fallback` when it cannot be resolved.
pub fn resolve_color(value: &str, fallback: Color) -> Color {
    match parse_color(value) {
        Ok(color) => color,
        Err(e) => {
            tracing::warn!(color = %value, error = %e, "Falling back to default color");
            fallback
        }
    }
}
