//! Text metrics for the drawing font (Helvetica-Bold, one of the PDF base
//! fonts, so nothing needs embedding).

/// Advance widths in 1/1000 em for ASCII 32..=126.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

/// Width used for characters outside printable ASCII.
const FALLBACK_WIDTH: u16 = 556;

pub const DEFAULT_MIN_FONT_SIZE: f64 = 5.0;
pub const DEFAULT_FONT_STEP: f64 = 0.5;
/// Extra room a bracket label may use beyond the bracket span.
pub const BRACKET_TEXT_BUFFER: f64 = 10.0;

fn glyph_width(c: char) -> u16 {
    match c as u32 {
        code @ 32..=126 => HELVETICA_BOLD[(code - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` at `size` points.
pub fn text_width(text: &str, size: f64) -> f64 {
    let units: u32 = text.chars().map(|c| glyph_width(c) as u32).sum();
    units as f64 * size / 1000.0
}

/// Shrink from `start` in `step` decrements until `text` fits `max_width`,
/// never going below `min`.
pub fn fit_font_size(text: &str, max_width: f64, start: f64, min: f64, step: f64) -> f64 {
    let step = if step > 0.0 { step } else { DEFAULT_FONT_STEP };
    let mut size = start;
    while size > min {
        if text_width(text, size) <= max_width {
            return size;
        }
        size -= step;
    }
    min
}
