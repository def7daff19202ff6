// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The one color representation used everywhere, and the palette that
//! holds an ordered run of them.

use image::Rgba;
use std::ops::Deref;
use std::sync::Arc;

/// A color with 8-bit red, green, blue and alpha channels.  The
/// default is fully transparent black.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha; 0xff is opaque.
    pub a: u8,
}

impl Color {
    /// A color from all four channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 0xff }
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Rgba<u8> {
        Rgba([c.r, c.g, c.b, c.a])
    }
}

/// An ordered, fixed-length sequence of colors.  Palettes are
/// immutable once built, and cloning one only bumps a reference
/// count, so the same palette can be attached to any number of
/// images.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette(Arc<[Color]>);

impl Palette {
    /// Wraps a finished color sequence.
    pub fn new(colors: Vec<Color>) -> Palette {
        Palette(colors.into())
    }

    /// True if every color in the palette is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.0.iter().all(|c| c.a == 0xff)
    }
}

impl From<Vec<Color>> for Palette {
    fn from(colors: Vec<Color>) -> Palette {
        Palette::new(colors)
    }
}

impl Deref for Palette {
    type Target = [Color];

    fn deref(&self) -> &[Color] {
        &self.0
    }
}
