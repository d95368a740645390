//! Standard-font metrics for text measurement.
//!
//! The print adapter only ever uses Helvetica and Helvetica-Bold, two of the
//! 14 standard PDF fonts that need no embedding. Their AFM advance widths
//! (thousandths of an em) are compiled in so measurement needs no font
//! files.
//!
//! [`LockedFont`] is the important type here: font and size are chosen once
//! per text instruction and that same state serves both the measurement and
//! the draw call. The flanking rules of a `dividerLine` decorator are placed
//! from the measured text width — if measurement and drawing ever used
//! different font state, the rules would visibly misalign with the text.

use crate::schema::FontWeight;

/// Helvetica advance widths for chars 0x20..=0x7E, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for chars 0x20..=0x7E, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333,
    584, 584, 584, 611, 975, 722, 722, 722, 722, 667, 611, 778, 722, 278,
    556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556,
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Advance width used for characters outside the compiled table.
const DEFAULT_WIDTH: u16 = 556;

/// Helvetica ascender, in 1/1000 em. Baselines are placed this far below
/// the instruction's top edge (same value for both weights).
const ASCENDER: f64 = 0.718;

/// One of the two standard fonts the print adapter draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdFont {
    Helvetica,
    HelveticaBold,
}

impl StdFont {
    pub fn from_weight(weight: FontWeight) -> Self {
        match weight {
            FontWeight::Bold => StdFont::HelveticaBold,
            FontWeight::Normal => StdFont::Helvetica,
        }
    }

    /// PostScript name used in the font dictionary.
    pub fn postscript_name(&self) -> &'static str {
        match self {
            StdFont::Helvetica => "Helvetica",
            StdFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name referenced by `Tf` operators.
    pub fn resource_name(&self) -> &'static str {
        match self {
            StdFont::Helvetica => "F0",
            StdFont::HelveticaBold => "F1",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            StdFont::Helvetica => &HELVETICA_WIDTHS,
            StdFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Advance width of a character at `font_size` points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let cp = ch as u32;
        let units = if (0x20..=0x7E).contains(&cp) {
            self.widths()[(cp - 0x20) as usize]
        } else {
            DEFAULT_WIDTH
        };
        units as f64 / 1000.0 * font_size
    }
}

/// Font state locked once per text instruction.
///
/// Measurement ([`width_of`](Self::width_of)) and the `Tf` operator both
/// read this single value, so the two can never drift.
#[derive(Debug, Clone, Copy)]
pub struct LockedFont {
    pub font: StdFont,
    pub size_pt: f64,
}

impl LockedFont {
    pub fn lock(weight: FontWeight, size_pt: f64) -> Self {
        Self {
            font: StdFont::from_weight(weight),
            size_pt,
        }
    }

    /// Measured width of `text` at the locked size.
    pub fn width_of(&self, text: &str) -> f64 {
        text.chars()
            .map(|ch| self.font.char_width(ch, self.size_pt))
            .sum()
    }

    /// Baseline offset below the instruction's top edge.
    pub fn ascent(&self) -> f64 {
        self.size_pt * ASCENDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_width_matches_afm() {
        let f = LockedFont::lock(FontWeight::Normal, 1000.0);
        assert_eq!(f.width_of(" "), 278.0);
    }

    #[test]
    fn test_bold_is_wider_than_regular() {
        let regular = LockedFont::lock(FontWeight::Normal, 12.0);
        let bold = LockedFont::lock(FontWeight::Bold, 12.0);
        assert!(bold.width_of("Switch-A") > regular.width_of("Switch-A"));
    }

    #[test]
    fn test_width_scales_linearly_with_size() {
        let small = LockedFont::lock(FontWeight::Normal, 6.0);
        let big = LockedFont::lock(FontWeight::Normal, 12.0);
        let w1 = small.width_of("Port 1/0/1");
        let w2 = big.width_of("Port 1/0/1");
        assert!((w2 - 2.0 * w1).abs() < 1e-9);
    }

    #[test]
    fn test_non_ascii_uses_default_width() {
        let f = LockedFont::lock(FontWeight::Normal, 1000.0);
        assert_eq!(f.width_of("→"), 556.0);
    }

    #[test]
    fn test_resource_names() {
        assert_eq!(StdFont::Helvetica.resource_name(), "F0");
        assert_eq!(StdFont::HelveticaBold.resource_name(), "F1");
    }
}
