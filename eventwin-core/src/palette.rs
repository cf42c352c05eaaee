//! Color names used in study files.
//!
//! Kept free of any drawing backend so studies can be validated without
//! rendering. The renderer converts [`Rgb`] into its own color type.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Default line colors, assigned in asset order when a study gives none.
pub const DEFAULT_CYCLE: [Rgb; 10] = [
    Rgb(0x1f, 0x77, 0xb4),
    Rgb(0xff, 0x7f, 0x0e),
    Rgb(0x2c, 0xa0, 0x2c),
    Rgb(0xd6, 0x27, 0x28),
    Rgb(0x94, 0x67, 0xbd),
    Rgb(0x8c, 0x56, 0x4b),
    Rgb(0xe3, 0x77, 0xc2),
    Rgb(0x7f, 0x7f, 0x7f),
    Rgb(0xbc, 0xbd, 0x22),
    Rgb(0x17, 0xbe, 0xcf),
];

const NAMED: &[(&str, Rgb)] = &[
    ("black", Rgb(0, 0, 0)),
    ("white", Rgb(255, 255, 255)),
    ("red", Rgb(255, 0, 0)),
    ("green", Rgb(0, 128, 0)),
    ("blue", Rgb(0, 0, 255)),
    ("orange", Rgb(255, 165, 0)),
    ("purple", Rgb(128, 0, 128)),
    ("gray", Rgb(128, 128, 128)),
    ("grey", Rgb(128, 128, 128)),
    ("gold", Rgb(255, 215, 0)),
    ("dodgerblue", Rgb(30, 144, 255)),
    ("seagreen", Rgb(46, 139, 87)),
    ("crimson", Rgb(220, 20, 60)),
    ("teal", Rgb(0, 128, 128)),
    ("navy", Rgb(0, 0, 128)),
    ("brown", Rgb(165, 42, 42)),
    ("magenta", Rgb(255, 0, 255)),
    ("cyan", Rgb(0, 255, 255)),
];

impl Rgb {
    /// Parse a CSS-style color name or `#rrggbb`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return None;
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            return Some(Rgb(channel(0)?, channel(2)?, channel(4)?));
        }
        let lower = s.to_ascii_lowercase();
        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, rgb)| *rgb)
    }

    /// Default color for the `index`-th series.
    pub fn cycle(index: usize) -> Self {
        DEFAULT_CYCLE[index % DEFAULT_CYCLE.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(Rgb::parse("DodgerBlue"), Some(Rgb(30, 144, 255)));
        assert_eq!(Rgb::parse("red"), Some(Rgb(255, 0, 0)));
        assert_eq!(Rgb::parse("chartreuse-ish"), None);
    }

    #[test]
    fn parses_hex() {
        assert_eq!(Rgb::parse("#348dc1"), Some(Rgb(0x34, 0x8d, 0xc1)));
        assert_eq!(Rgb::parse("#34"), None);
        assert_eq!(Rgb::parse("#zzzzzz"), None);
    }

    #[test]
    fn cycle_wraps() {
        assert_eq!(Rgb::cycle(0), Rgb::cycle(10));
        assert_ne!(Rgb::cycle(0), Rgb::cycle(1));
    }
}
