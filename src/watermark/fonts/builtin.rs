//! Minimal built-in glyph set.
//!
//! The last link of the font fallback chain: a 5x7 bitmap face covering
//! digits, Latin capitals (lowercase letters render as capitals) and the
//! punctuation timestamps and captions need. Anything else renders as a
//! hollow box so missing glyphs stay visible instead of vanishing.

/// Bitmap rows, top to bottom; bit 4 is the leftmost column.
type Glyph = [u8; 7];

const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
/// Advance in cells (glyph plus one column of spacing).
const ADVANCE_CELLS: u32 = 6;
/// Line height in cells (glyph plus two rows below the baseline).
const LINE_CELLS: u32 = 9;

const MISSING: Glyph = [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F];

const GLYPHS: &[(char, Glyph)] = &[
    (' ', [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
    ('!', [0x04, 0x04, 0x04, 0x04, 0x00, 0x00, 0x04]),
    ('"', [0x0A, 0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00]),
    ('#', [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A]),
    ('%', [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03]),
    ('&', [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D]),
    ('\'', [0x0C, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00]),
    ('(', [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02]),
    (')', [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08]),
    ('*', [0x00, 0x04, 0x15, 0x0E, 0x15, 0x04, 0x00]),
    ('+', [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00]),
    (',', [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08]),
    ('-', [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00]),
    ('.', [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C]),
    ('/', [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00]),
    ('0', [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E]),
    ('1', [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E]),
    ('2', [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F]),
    ('3', [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E]),
    ('4', [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02]),
    ('5', [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E]),
    ('6', [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E]),
    ('7', [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08]),
    ('8', [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E]),
    ('9', [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C]),
    (':', [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00]),
    (';', [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x04, 0x08]),
    ('<', [0x02, 0x04, 0x08, 0x10, 0x08, 0x04, 0x02]),
    ('=', [0x00, 0x00, 0x1F, 0x00, 0x1F, 0x00, 0x00]),
    ('>', [0x08, 0x04, 0x02, 0x01, 0x02, 0x04, 0x08]),
    ('?', [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04]),
    ('@', [0x0E, 0x11, 0x01, 0x0D, 0x15, 0x15, 0x0E]),
    ('A', [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11]),
    ('B', [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E]),
    ('C', [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E]),
    ('D', [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C]),
    ('E', [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F]),
    ('F', [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10]),
    ('G', [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F]),
    ('H', [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11]),
    ('I', [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E]),
    ('J', [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C]),
    ('K', [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11]),
    ('L', [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F]),
    ('M', [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11]),
    ('N', [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11]),
    ('O', [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E]),
    ('P', [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10]),
    ('Q', [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D]),
    ('R', [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11]),
    ('S', [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E]),
    ('T', [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04]),
    ('U', [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E]),
    ('V', [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04]),
    ('W', [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A]),
    ('X', [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11]),
    ('Y', [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04]),
    ('Z', [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F]),
    ('[', [0x0E, 0x08, 0x08, 0x08, 0x08, 0x08, 0x0E]),
    (']', [0x0E, 0x02, 0x02, 0x02, 0x02, 0x02, 0x0E]),
    ('_', [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F]),
];

fn lookup(c: char) -> Option<&'static Glyph> {
    let c = c.to_ascii_uppercase();
    GLYPHS.iter().find(|(g, _)| *g == c).map(|(_, rows)| rows)
}

/// Whether every character has a real glyph.
pub fn covers(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || lookup(c).is_some())
}

/// Metrics of the bitmap face at a pixel size; one cell is an integer
/// number of pixels so glyphs stay crisp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinMetrics {
    pub cell: u32,
}

impl BuiltinMetrics {
    pub fn for_size(size: f32) -> Self {
        let cell = (size / LINE_CELLS as f32).round();
        Self {
            cell: if cell.is_finite() && cell >= 1.0 {
                cell as u32
            } else {
                1
            },
        }
    }

    pub fn ascent(&self) -> f32 {
        (GLYPH_ROWS * self.cell) as f32
    }

    /// Negative, like font descents.
    pub fn descent(&self) -> f32 {
        -(((LINE_CELLS - GLYPH_ROWS) * self.cell) as f32)
    }

    pub fn advance(&self) -> f32 {
        (ADVANCE_CELLS * self.cell) as f32
    }

    pub fn line_width(&self, line: &str) -> f32 {
        line.chars().count() as f32 * self.advance()
    }

    /// Plot every lit pixel of `line` with its left edge at `x` and its
    /// baseline at `baseline`.
    pub fn draw_line(&self, line: &str, x: f32, baseline: f32, plot: &mut dyn FnMut(i32, i32, f32)) {
        let cell = self.cell as i32;
        let top = (baseline - self.ascent()).round() as i32;
        let mut cursor = x.round() as i32;

        for c in line.chars() {
            if !c.is_whitespace() {
                let rows = lookup(c).unwrap_or(&MISSING);
                for (row, bits) in rows.iter().enumerate() {
                    for col in 0..GLYPH_COLUMNS {
                        if bits & (1 << (GLYPH_COLUMNS - 1 - col)) == 0 {
                            continue;
                        }
                        let px = cursor + col as i32 * cell;
                        let py = top + row as i32 * cell;
                        for dy in 0..cell {
                            for dx in 0..cell {
                                plot(px + dx, py + dy, 1.0);
                            }
                        }
                    }
                }
            }
            cursor += ADVANCE_CELLS as i32 * cell;
        }
    }
}
