//! Font catalog and variant resolution.
//!
//! A [`FontResolver`] turns a loose font request (a file, a family name, or
//! nothing at all) plus bold/italic flags into a [`FontHandle`] that can
//! measure and rasterize text. Resolution never fails:
//!
//! 1. exact family + style match (the requested file's siblings first)
//! 2. same family, best scoring face; missing traits are synthesized
//!    (double strike for bold, shear for italic)
//! 3. a catalog font whose glyphs cover the text
//! 4. the first loadable catalog font
//! 5. the built-in bitmap glyph set
//!
//! Faces are classified by file name only (`Arial-BoldItalic.ttf` is family
//! `arial`, bold, italic), which keeps the catalog scan cheap.
//!
//! Loaded fonts and resolutions are cached behind `parking_lot` read-write
//! locks. Two renders racing on the same miss both load the file; the second
//! insert is dropped.

pub mod builtin;

use super::WatermarkError;
use ab_glyph::{point, Font, FontArc, FontVec, GlyphId, PxScale, ScaleFont};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use builtin::BuiltinMetrics;

/// Horizontal shift per pixel of height used for synthesized italics.
pub const ITALIC_SHEAR: f32 = 0.2;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "otc"];

/// Removed from file stems to get the family key. Compounds come first so
/// `semibold` does not leave `semi` behind.
const STYLE_KEYWORDS: &[&str] = &[
    "semibold",
    "demibold",
    "extrabold",
    "ultrabold",
    "extralight",
    "ultralight",
    "hairline",
    "bold",
    "italic",
    "oblique",
    "slanted",
    "regular",
    "normal",
    "medium",
    "light",
    "thin",
    "heavy",
    "black",
    "book",
];

/// Weight class detected from a font file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FontWeight {
    Thin,
    Light,
    Regular,
    Medium,
    SemiBold,
    Bold,
    Heavy,
}

impl FontWeight {
    fn detect(stem: &str) -> Self {
        let has = |needle: &str| stem.contains(needle);
        if has("heavy") || has("black") || has("extrabold") || has("ultrabold") {
            Self::Heavy
        } else if has("semibold") || has("demibold") {
            Self::SemiBold
        } else if has("bold") {
            Self::Bold
        } else if has("medium") {
            Self::Medium
        } else if has("thin") || has("hairline") || has("extralight") || has("ultralight") {
            Self::Thin
        } else if has("light") {
            Self::Light
        } else {
            Self::Regular
        }
    }
}

/// One font file in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub path: PathBuf,
    /// Normalized family key, see [`family_key`]
    pub family: String,
    pub weight: FontWeight,
    pub bold: bool,
    pub italic: bool,
}

impl FontFace {
    /// Classify a font file by its name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?.to_lowercase();
        let weight = FontWeight::detect(&stem);
        Some(Self {
            path: path.to_path_buf(),
            family: family_key(&stem),
            weight,
            bold: weight >= FontWeight::SemiBold,
            italic: ["italic", "oblique", "slanted"]
                .iter()
                .any(|k| stem.contains(k)),
        })
    }

    /// Like [`FontFace::from_path`], but only for font file extensions.
    pub fn from_font_file(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if !FONT_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        Self::from_path(path)
    }
}

/// Family key of a file stem or family name: lowercase, style words
/// removed, separators collapsed to single spaces.
pub fn family_key(name: &str) -> String {
    let mut key = name.to_lowercase();
    for keyword in STYLE_KEYWORDS {
        key = key.replace(keyword, "");
    }
    key.replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ranking of a face for a styled request. Wanted traits count +2; a trait
/// the face has but the request does not want counts -3, since synthesis can
/// add traits but never remove them.
pub fn variant_score(face: &FontFace, bold: bool, italic: bool) -> i32 {
    let trait_score = |wanted: bool, present: bool| match (wanted, present) {
        (true, true) => 2,
        (false, true) => -3,
        _ => 0,
    };
    trait_score(bold, face.bold) + trait_score(italic, face.italic)
}

/// Platform font directories scanned when `system_fonts` is enabled.
pub fn system_font_dirs() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut dirs = Vec::new();

    if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = &home {
            dirs.push(home.join("Library/Fonts"));
        }
    } else if cfg!(target_os = "windows") {
        let windir = std::env::var_os("WINDIR").unwrap_or_else(|| "C:\\Windows".into());
        dirs.push(PathBuf::from(windir).join("Fonts"));
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            dirs.push(PathBuf::from(local).join("Microsoft\\Windows\\Fonts"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = &home {
            dirs.push(home.join(".fonts"));
            dirs.push(home.join(".local/share/fonts"));
        }
    }

    dirs
}

/// All font files under `dir`, sorted by file name within each directory.
pub fn scan_directory(dir: &Path) -> Vec<FontFace> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| FontFace::from_font_file(entry.path()))
        .collect()
}

/// Read and parse a font file (first face of a collection).
pub fn load_font_file(path: &Path) -> Result<FontArc, WatermarkError> {
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WatermarkError::MissingAsset(path.to_path_buf())
        } else {
            WatermarkError::decode(path.display().to_string(), e)
        }
    })?;
    FontVec::try_from_vec_and_index(data, 0)
        .map(FontArc::new)
        .map_err(|e| WatermarkError::decode(path.display().to_string(), e))
}

/// Font resolver settings.
#[derive(Debug, Clone)]
pub struct FontResolverConfig {
    /// Extra directories scanned before the platform ones
    pub font_dirs: Vec<PathBuf>,
    /// Scan the platform font directories
    pub system_fonts: bool,
    /// Tried before the catalog when a request names no usable font
    pub default_font: Option<PathBuf>,
}

impl Default for FontResolverConfig {
    fn default() -> Self {
        Self {
            font_dirs: Vec::new(),
            system_fonts: true,
            default_font: None,
        }
    }
}

/// A font request.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontQuery<'a> {
    pub path: Option<&'a Path>,
    pub family: Option<&'a str>,
    pub bold: bool,
    pub italic: bool,
    /// Text that will be drawn; steers the fallback toward a covering font
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    path: Option<PathBuf>,
    family: Option<String>,
    bold: bool,
    italic: bool,
    /// Distinct non-ASCII characters of the text
    script: String,
}

impl ResolutionKey {
    fn new(query: &FontQuery<'_>) -> Self {
        let script: BTreeSet<char> = query
            .text
            .chars()
            .filter(|c| !c.is_ascii() && !c.is_whitespace())
            .collect();
        Self {
            path: query.path.map(Path::to_path_buf),
            family: query.family.map(family_key),
            bold: query.bold,
            italic: query.italic,
            script: script.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolution {
    /// `None` selects the built-in glyph set
    face: Option<PathBuf>,
    synthetic_bold: bool,
    synthetic_italic: bool,
}

impl Resolution {
    fn for_face(face: &FontFace, query: &FontQuery<'_>) -> Self {
        Self {
            face: Some(face.path.clone()),
            synthetic_bold: query.bold && !face.bold,
            synthetic_italic: query.italic && !face.italic,
        }
    }

    fn builtin(query: &FontQuery<'_>) -> Self {
        Self {
            face: None,
            synthetic_bold: query.bold,
            synthetic_italic: query.italic,
        }
    }
}

/// Resolves font requests against a lazily built catalog.
pub struct FontResolver {
    config: FontResolverConfig,
    catalog: OnceLock<Vec<FontFace>>,
    directories: RwLock<HashMap<PathBuf, Vec<FontFace>>>,
    loaded: RwLock<HashMap<PathBuf, Option<FontArc>>>,
    resolutions: RwLock<HashMap<ResolutionKey, Resolution>>,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::new(FontResolverConfig::default())
    }
}

impl std::fmt::Debug for FontResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontResolver")
            .field("config", &self.config)
            .field("catalog_size", &self.catalog.get().map(Vec::len))
            .field("loaded", &self.loaded.read().len())
            .finish()
    }
}

impl FontResolver {
    pub fn new(config: FontResolverConfig) -> Self {
        Self {
            config,
            catalog: OnceLock::new(),
            directories: RwLock::new(HashMap::new()),
            loaded: RwLock::new(HashMap::new()),
            resolutions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FontResolverConfig {
        &self.config
    }

    /// Resolve a font file (or the default chain when `None`) in a style.
    pub fn resolve(&self, font_path: Option<&Path>, size: u32, bold: bool, italic: bool) -> FontHandle {
        self.resolve_for_text(
            &FontQuery {
                path: font_path,
                bold,
                italic,
                ..FontQuery::default()
            },
            size,
        )
    }

    /// Resolve a full query; the text steers the fallback toward a font
    /// that has its glyphs.
    pub fn resolve_for_text(&self, query: &FontQuery<'_>, size: u32) -> FontHandle {
        let size = size.max(1) as f32;
        let key = ResolutionKey::new(query);
        let cached = self.resolutions.read().get(&key).cloned();

        let resolution = match cached {
            Some(resolution) => resolution,
            None => {
                let resolution = self.resolve_uncached(query);
                debug!(
                    font = ?resolution.face,
                    bold = query.bold,
                    italic = query.italic,
                    synthetic_bold = resolution.synthetic_bold,
                    synthetic_italic = resolution.synthetic_italic,
                    "Resolved font"
                );
                self.resolutions.write().insert(key, resolution.clone());
                resolution
            }
        };

        let font = resolution.face.as_deref().and_then(|path| {
            self.load(path)
                .map(|font| (font, path.to_path_buf()))
        });
        match font {
            Some((font, path)) => FontHandle {
                source: FontSource::Outline(font),
                size,
                synthetic_bold: resolution.synthetic_bold,
                synthetic_italic: resolution.synthetic_italic,
                path: Some(path),
            },
            None => FontHandle::builtin(size)
                .with_synthesis(resolution.synthetic_bold, resolution.synthetic_italic),
        }
    }

    /// The catalog of configured and platform font directories, scanned on
    /// first use.
    pub fn catalog(&self) -> &[FontFace] {
        self.catalog.get_or_init(|| {
            let mut dirs = self.config.font_dirs.clone();
            if self.config.system_fonts {
                dirs.extend(system_font_dirs());
            }

            let mut seen = HashSet::new();
            let faces: Vec<FontFace> = dirs
                .iter()
                .flat_map(|dir| scan_directory(dir))
                .filter(|face| seen.insert(face.path.clone()))
                .collect();

            info!(fonts = faces.len(), directories = dirs.len(), "Font catalog built");
            faces
        })
    }

    fn directory_faces(&self, dir: &Path) -> Vec<FontFace> {
        if let Some(faces) = self.directories.read().get(dir) {
            return faces.clone();
        }
        let faces = scan_directory(dir);
        self.directories
            .write()
            .entry(dir.to_path_buf())
            .or_insert(faces)
            .clone()
    }

    /// Load a font file through the cache. Failures are cached too.
    fn load(&self, path: &Path) -> Option<FontArc> {
        if let Some(entry) = self.loaded.read().get(path) {
            return entry.clone();
        }
        let loaded = match load_font_file(path) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!(font = %path.display(), error = %e, "Failed to load font");
                None
            }
        };
        self.loaded
            .write()
            .entry(path.to_path_buf())
            .or_insert(loaded)
            .clone()
    }

    fn resolve_uncached(&self, query: &FontQuery<'_>) -> Resolution {
        if let Some(path) = query.path {
            if let Some(resolution) = self.resolve_from_file(path, query) {
                return resolution;
            }
            warn!(font = %path.display(), "Requested font unavailable, using fallback");
        }

        if let Some(family) = query.family {
            let key = family_key(family);
            let candidates: Vec<FontFace> = self
                .catalog()
                .iter()
                .filter(|face| face.family == key)
                .cloned()
                .collect();
            if let Some(resolution) = self.pick_variant(&candidates, None, query) {
                return resolution;
            }
            warn!(family = %family, "Font family not found, using fallback");
        }

        if let Some(default_font) = self.config.default_font.as_deref() {
            if query.path != Some(default_font) {
                if let Some(resolution) = self.resolve_from_file(default_font, query) {
                    return resolution;
                }
            }
        }

        self.fallback(query)
    }

    fn resolve_from_file(&self, path: &Path, query: &FontQuery<'_>) -> Option<Resolution> {
        let base = FontFace::from_path(path)?;
        if !query.bold && !query.italic {
            self.load(path)?;
            return Some(Resolution {
                face: Some(path.to_path_buf()),
                synthetic_bold: false,
                synthetic_italic: false,
            });
        }

        let mut candidates = vec![base.clone()];
        let siblings = path
            .parent()
            .map(|dir| self.directory_faces(dir))
            .unwrap_or_default();
        candidates.extend(
            siblings
                .into_iter()
                .chain(self.catalog().iter().cloned())
                .filter(|face| face.family == base.family && face.path != base.path),
        );

        let mut seen = HashSet::new();
        candidates.retain(|face| seen.insert(face.path.clone()));
        self.pick_variant(&candidates, Some(path), query)
    }

    fn pick_variant(
        &self,
        candidates: &[FontFace],
        preferred: Option<&Path>,
        query: &FontQuery<'_>,
    ) -> Option<Resolution> {
        if let Some(face) = candidates.iter().find(|face| {
            face.bold == query.bold && face.italic == query.italic && self.load(&face.path).is_some()
        }) {
            return Some(Resolution::for_face(face, query));
        }

        let mut ranked: Vec<&FontFace> = candidates.iter().collect();
        ranked.sort_by_key(|face| {
            (
                std::cmp::Reverse(variant_score(face, query.bold, query.italic)),
                preferred != Some(face.path.as_path()),
            )
        });
        ranked
            .into_iter()
            .find(|face| self.load(&face.path).is_some())
            .map(|face| Resolution::for_face(face, query))
    }

    fn fallback(&self, query: &FontQuery<'_>) -> Resolution {
        let catalog = self.catalog();
        let style_match = |face: &&FontFace| face.bold == query.bold && face.italic == query.italic;
        let ordered = catalog
            .iter()
            .filter(style_match)
            .chain(catalog.iter().filter(|face| !style_match(face)));

        let mut first_loadable = None;
        for face in ordered {
            let Some(font) = self.load(&face.path) else {
                continue;
            };
            if outline_covers(&font, query.text) {
                return Resolution::for_face(face, query);
            }
            first_loadable.get_or_insert(face);
        }

        match first_loadable {
            Some(face) if !builtin::covers(query.text) => {
                warn!(font = %face.path.display(), "No font covers the text, glyphs may be missing");
                Resolution::for_face(face, query)
            }
            _ => {
                warn!("No usable font found, using built-in glyphs");
                Resolution::builtin(query)
            }
        }
    }
}

fn outline_covers(font: &FontArc, text: &str) -> bool {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .all(|c| font.glyph_id(c).0 != 0)
}

/// Pixel scale that makes `size` the em size, like point sizes in most
/// imaging libraries. `PxScale` alone would make it the ascent-to-descent
/// height.
fn em_scale(font: &FontArc, size: f32) -> PxScale {
    match font.units_per_em() {
        Some(units) if units > 0.0 => PxScale::from(size * font.height_unscaled() / units),
        _ => PxScale::from(size),
    }
}

#[derive(Clone)]
enum FontSource {
    Outline(FontArc),
    Builtin(BuiltinMetrics),
}

/// A resolved font at a pixel size, with its synthesized traits.
#[derive(Clone)]
pub struct FontHandle {
    source: FontSource,
    size: f32,
    synthetic_bold: bool,
    synthetic_italic: bool,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontHandle")
            .field("path", &self.path)
            .field("builtin", &self.is_builtin())
            .field("size", &self.size)
            .field("synthetic_bold", &self.synthetic_bold)
            .field("synthetic_italic", &self.synthetic_italic)
            .finish()
    }
}

impl FontHandle {
    /// The built-in glyph set at `size` pixels.
    pub fn builtin(size: f32) -> Self {
        Self {
            source: FontSource::Builtin(BuiltinMetrics::for_size(size)),
            size,
            synthetic_bold: false,
            synthetic_italic: false,
            path: None,
        }
    }

    pub fn with_synthesis(mut self, bold: bool, italic: bool) -> Self {
        self.synthetic_bold = bold;
        self.synthetic_italic = italic;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, FontSource::Builtin(_))
    }

    pub fn synthetic_bold(&self) -> bool {
        self.synthetic_bold
    }

    pub fn synthetic_italic(&self) -> bool {
        self.synthetic_italic
    }

    /// Distance of the second strike of a synthesized bold.
    pub fn bold_offset(&self) -> f32 {
        (self.size / 24.0).round().max(1.0)
    }

    /// Pixels that synthesized styles may draw past the measured line box
    /// on either side: the italic shear at the ascent (or descent) plus the
    /// second bold strike.
    pub fn synthetic_overhang(&self) -> u32 {
        let mut overhang = 0.0;
        if self.synthetic_italic {
            overhang += (self.ascent().max(-self.descent()) * ITALIC_SHEAR).ceil() + 1.0;
        }
        if self.synthetic_bold {
            overhang += self.bold_offset();
        }
        overhang as u32
    }

    /// Height above the baseline.
    pub fn ascent(&self) -> f32 {
        match &self.source {
            FontSource::Outline(font) => font.as_scaled(em_scale(font, self.size)).ascent(),
            FontSource::Builtin(metrics) => metrics.ascent(),
        }
    }

    /// Depth below the baseline, negative.
    pub fn descent(&self) -> f32 {
        match &self.source {
            FontSource::Outline(font) => font.as_scaled(em_scale(font, self.size)).descent(),
            FontSource::Builtin(metrics) => metrics.descent(),
        }
    }

    /// Ascent minus descent.
    pub fn line_height(&self) -> f32 {
        self.ascent() - self.descent()
    }

    /// Advance width of one line, kerning included.
    pub fn line_width(&self, line: &str) -> f32 {
        let width = match &self.source {
            FontSource::Outline(font) => {
                let scaled = font.as_scaled(em_scale(font, self.size));
                let mut width = 0.0;
                let mut previous: Option<GlyphId> = None;
                for c in line.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                width
            }
            FontSource::Builtin(metrics) => metrics.line_width(line),
        };
        if self.synthetic_bold && !line.is_empty() {
            width + self.bold_offset()
        } else {
            width
        }
    }

    /// Whether every non-whitespace character has a glyph.
    pub fn covers(&self, text: &str) -> bool {
        match &self.source {
            FontSource::Outline(font) => outline_covers(font, text),
            FontSource::Builtin(_) => builtin::covers(text),
        }
    }

    /// Rasterize one line with its pen starting at `x` on `baseline`.
    ///
    /// `plot` receives pixel coordinates and a coverage in `[0, 1]`; pixels
    /// may be reported more than once when bold is synthesized.
    pub fn draw_line(&self, line: &str, x: f32, baseline: f32, plot: &mut dyn FnMut(i32, i32, f32)) {
        let strikes = if self.synthetic_bold { 2 } else { 1 };
        let shear = self.synthetic_italic;

        for strike in 0..strikes {
            let pen_x = x + strike as f32 * self.bold_offset();
            let mut sheared = |px: i32, py: i32, coverage: f32| {
                let shift = if shear {
                    ((baseline - py as f32) * ITALIC_SHEAR).round() as i32
                } else {
                    0
                };
                plot(px + shift, py, coverage);
            };

            match &self.source {
                FontSource::Outline(font) => {
                    draw_outline_line(font, em_scale(font, self.size), line, pen_x, baseline, &mut sheared)
                }
                FontSource::Builtin(metrics) => metrics.draw_line(line, pen_x, baseline, &mut sheared),
            }
        }
    }
}

fn draw_outline_line(
    font: &FontArc,
    scale: PxScale,
    line: &str,
    x: f32,
    baseline: f32,
    plot: &mut dyn FnMut(i32, i32, f32),
) {
    let scaled = font.as_scaled(scale);
    let mut cursor = x;
    let mut previous: Option<GlyphId> = None;

    for c in line.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            cursor += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(cursor, baseline));
        cursor += scaled.h_advance(id);
        previous = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            let (left, top) = (bounds.min.x as i32, bounds.min.y as i32);
            outlined.draw(|gx, gy, coverage| plot(left + gx as i32, top + gy as i32, coverage));
        }
    }
}
