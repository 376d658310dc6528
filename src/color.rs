// src/color.rs

//! Defines the color representation used by drawing primitives (`Color`)
//! and the index-to-RGB `Palette` consulted when the remote side is not
//! sending true-color data.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A packed RGB triple.
pub type Rgb = [u8; 3];

/// Color used for a palette index that was never populated.
pub const FALLBACK_RGB: Rgb = [0, 0, 0];

/// A color argument of a fill or tile primitive.
///
/// In true-color mode the protocol layer hands over `Rgb` values directly;
/// in indexed mode it hands over `Indexed` palette slots which are resolved
/// at draw time against the active `Palette`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// A direct RGB true color, with each component from 0 to 255.
    Rgb(u8, u8, u8),
    /// An entry of the active palette.
    Indexed(u16),
}

impl Color {
    /// Resolves this color to a concrete RGB triple.
    ///
    /// `true_color` is the display mode: direct `Rgb` values are only
    /// meaningful in true-color mode and palette slots only in indexed
    /// mode. A color of the other kind is logged and drawn as
    /// `FALLBACK_RGB`.
    pub fn resolve(self, palette: &Palette, true_color: bool) -> Rgb {
        match (self, true_color) {
            (Color::Rgb(r, g, b), true) => [r, g, b],
            (Color::Indexed(idx), false) => palette.lookup(idx),
            (color, true) => {
                warn!("Color {:?} given in true-color mode, drawing {:?}", color, FALLBACK_RGB);
                FALLBACK_RGB
            }
            (color, false) => {
                warn!("Color {:?} given in indexed mode, drawing {:?}", color, FALLBACK_RGB);
                FALLBACK_RGB
            }
        }
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb(rgb[0], rgb[1], rgb[2])
    }
}

/// Index to RGB mapping, replaced wholesale by `set_palette`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    entries: HashMap<u16, Rgb>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every entry with the given mapping. Entries that are not
    /// part of `mapping` are dropped, not kept from the previous table.
    pub fn replace<I>(&mut self, mapping: I)
    where
        I: IntoIterator<Item = (u16, Rgb)>,
    {
        self.entries = mapping.into_iter().collect();
    }

    /// Looks up a palette slot.
    ///
    /// An undefined slot means the server referenced a color it never sent.
    /// Debug builds treat that as a bug and panic; release builds log it and
    /// fall back to `FALLBACK_RGB`.
    pub fn lookup(&self, idx: u16) -> Rgb {
        match self.entries.get(&idx) {
            Some(rgb) => *rgb,
            None => {
                debug_assert!(false, "palette index {} is not defined", idx);
                warn!(
                    "Palette index {} is not defined, drawing {:?} instead",
                    idx, FALLBACK_RGB
                );
                FALLBACK_RGB
            }
        }
    }

    pub fn get(&self, idx: u16) -> Option<Rgb> {
        self.entries.get(&idx).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(u16, Rgb)> for Palette {
    fn from_iter<I: IntoIterator<Item = (u16, Rgb)>>(iter: I) -> Self {
        Palette {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn replace_discards_previous_entries() {
        let mut palette: Palette = [(0, [1, 2, 3]), (1, [4, 5, 6])].into_iter().collect();
        palette.replace([(2, [7, 8, 9])]);
        assert_eq!(palette.len(), 1);
        assert_eq!(palette.get(0), None);
        assert_eq!(palette.get(2), Some([7, 8, 9]));
    }

    #[test]
    fn colors_resolve_according_to_mode() {
        let palette: Palette = [(3, [0x10, 0x20, 0x30])].into_iter().collect();
        assert_eq!(Color::Indexed(3).resolve(&palette, false), [0x10, 0x20, 0x30]);
        assert_eq!(Color::Rgb(9, 8, 7).resolve(&palette, true), [9, 8, 7]);
    }

    #[test]
    fn color_of_the_wrong_kind_for_the_mode_is_not_interpreted() {
        let palette: Palette = [(3, [0x10, 0x20, 0x30])].into_iter().collect();
        assert_eq!(Color::Indexed(3).resolve(&palette, true), FALLBACK_RGB);
        assert_eq!(Color::Rgb(9, 8, 7).resolve(&palette, false), FALLBACK_RGB);
    }

    #[test]
    fn palette_holds_more_than_256_entries() {
        let palette: Palette = (0..300u16).map(|i| (i, [i as u8, 0, 0])).collect();
        assert_eq!(palette.len(), 300);
        assert_eq!(palette.lookup(299), [43, 0, 0]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "palette index 42 is not defined")]
    fn undefined_index_fails_loudly_in_debug_builds() {
        Palette::new().lookup(42);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn undefined_index_degrades_to_fallback_in_release_builds() {
        assert_eq!(Palette::new().lookup(42), FALLBACK_RGB);
    }
}
